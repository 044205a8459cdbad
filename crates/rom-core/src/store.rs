//! The `RomStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `rom-store-sqlite`).
//! The risk engine and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  measurement::{Measurement, NewMeasurement},
  warning::{NewWarning, Warning, WarningType},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RomStore::list_warnings`]. Every filter is optional; an
/// empty query lists every warning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarningQuery {
  pub subject_id:   Option<Uuid>,
  /// `Some(false)` lists only open warnings (the clinician work queue).
  pub resolved:     Option<bool>,
  pub warning_type: Option<WarningType>,
  pub date:         Option<NaiveDate>,
  /// Case-insensitive substring match over the warning type label and
  /// the details text.
  pub text:         Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a ROM store backend.
///
/// Measurements are append-only. Warnings are created only through
/// [`RomStore::create_warning_if_absent`], and afterwards only their
/// `resolved` flag changes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RomStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Measurements ──────────────────────────────────────────────────────

  /// Persist a reading. `recorded_at` defaults to the store's clock when the
  /// input leaves it unset.
  fn record_measurement(
    &self,
    input: NewMeasurement,
  ) -> impl Future<Output = Result<Measurement, Self::Error>> + Send + '_;

  /// The `limit` most recent readings for a subject, newest first. Readings
  /// with equal `recorded_at` come back in reverse insertion order.
  fn recent_measurements(
    &self,
    subject_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Measurement>, Self::Error>> + Send + '_;

  /// Every reading for a subject, oldest first.
  fn list_measurements(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Measurement>, Self::Error>> + Send + '_;

  // ── Warnings ──────────────────────────────────────────────────────────

  /// Atomically insert a warning unless one already exists for its
  /// `(subject_id, date, warning_type)` key.
  ///
  /// Returns `Some` with the new row when inserted, `None` when the key was
  /// already taken. An existing row is never modified.
  fn create_warning_if_absent(
    &self,
    input: NewWarning,
  ) -> impl Future<Output = Result<Option<Warning>, Self::Error>> + Send + '_;

  /// Retrieve a warning by UUID. Returns `None` if not found.
  fn get_warning(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Warning>, Self::Error>> + Send + '_;

  /// List warnings matching `query`, most recently created first.
  fn list_warnings<'a>(
    &'a self,
    query: &'a WarningQuery,
  ) -> impl Future<Output = Result<Vec<Warning>, Self::Error>> + Send + 'a;

  /// Set the `resolved` flag. Returns the updated warning, or `None` if no
  /// warning has that id.
  fn set_resolved(
    &self,
    id: Uuid,
    resolved: bool,
  ) -> impl Future<Output = Result<Option<Warning>, Self::Error>> + Send + '_;
}
