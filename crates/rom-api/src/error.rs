//! Errors a handler can return, and how each one reaches the client.
//!
//! Every error renders as `{"error": <message>, "code": <code>}`; `code` is
//! a stable snake_case tag clients can branch on without parsing messages.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("warning {0} not found")]
  WarningNotFound(Uuid),

  #[error("measurement must include at least one channel")]
  EmptyMeasurement,

  /// The store, or an assessment that read from it, failed.
  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl ApiError {
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::WarningNotFound(_) => StatusCode::NOT_FOUND,
      Self::EmptyMeasurement => StatusCode::BAD_REQUEST,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::WarningNotFound(_) => "warning_not_found",
      Self::EmptyMeasurement => "empty_measurement",
      Self::Store(_) => "store_unavailable",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let Self::Store(source) = &self {
      tracing::error!(error = %source, "request failed in the store");
    }
    let body = json!({ "error": self.to_string(), "code": self.code() });
    (self.status(), Json(body)).into_response()
  }
}
