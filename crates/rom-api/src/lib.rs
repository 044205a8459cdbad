//! JSON REST API for ROM tracking.
//!
//! Exposes an axum [`Router`] backed by any [`rom_core::store::RomStore`]:
//! the measurement-ingestion endpoint (which runs the risk engine after each
//! save) and the clinician endpoints for reviewing and resolving warnings.
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rom_api::api_router(store.clone(), engine.clone()))
//! ```

pub mod error;
pub mod measurements;
pub mod warnings;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rom_core::{RiskEngine, store::RomStore};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub engine: Arc<RiskEngine>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), engine: self.engine.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, engine: Arc<RiskEngine>) -> Router<()>
where
  S: RomStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Measurements
    .route(
      "/subjects/{id}/measurements",
      get(measurements::list::<S>).post(measurements::create::<S>),
    )
    .route("/subjects/{id}/assess", post(measurements::assess::<S>))
    // Warnings
    .route("/warnings", get(warnings::list::<S>))
    .route("/warnings/{id}", get(warnings::get_one::<S>))
    .route("/warnings/{id}/resolve", post(warnings::resolve::<S>))
    .route("/warnings/{id}/unresolve", post(warnings::unresolve::<S>))
    .with_state(ApiState { store, engine })
}
