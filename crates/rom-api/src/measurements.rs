//! Handlers for `/subjects/{id}/...` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects/{id}/measurements` | Body: [`MeasurementBody`]; returns 201 + measurement + assessment |
//! | `GET`  | `/subjects/{id}/measurements` | Optional `?order=asc\|desc` (default `asc`) |
//! | `POST` | `/subjects/{id}/assess` | Runs the risk engine on demand |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rom_core::{
  Assessment,
  measurement::{Measurement, NewMeasurement},
  store::RomStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Ingest ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /subjects/{id}/measurements`. Channels are in
/// degrees; omit a channel that was not measured.
#[derive(Debug, Deserialize)]
pub struct MeasurementBody {
  /// Backfill time; defaults to now.
  pub recorded_at: Option<DateTime<Utc>>,
  pub flexion:     Option<f64>,
  pub extension:   Option<f64>,
  pub abduction:   Option<f64>,
  pub adduction:   Option<f64>,
}

impl MeasurementBody {
  fn into_new(self, subject_id: Uuid) -> NewMeasurement {
    NewMeasurement {
      subject_id,
      recorded_at: self.recorded_at,
      flexion: self.flexion,
      extension: self.extension,
      abduction: self.abduction,
      adduction: self.adduction,
    }
  }
}

/// Outcome of the assessment that follows a save. A failed assessment does
/// not undo the save.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AssessmentReport {
  Completed(Assessment),
  Failed { status: &'static str, error: String },
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
  pub measurement: Measurement,
  pub assessment:  AssessmentReport,
}

/// `POST /subjects/{id}/measurements`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Path(subject_id): Path<Uuid>,
  Json(body): Json<MeasurementBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let input = body.into_new(subject_id);
  if !input.has_any_channel() {
    return Err(ApiError::EmptyMeasurement);
  }

  let measurement = state
    .store
    .record_measurement(input)
    .await
    .map_err(ApiError::store)?;

  let assessment = match state.engine.assess(state.store.as_ref(), subject_id).await {
    Ok(outcome) => AssessmentReport::Completed(outcome),
    Err(e) => {
      tracing::error!(
        %subject_id,
        measurement_id = %measurement.measurement_id,
        error = %e,
        "risk assessment failed after saving measurement"
      );
      AssessmentReport::Failed { status: "failed", error: e.to_string() }
    }
  };

  Ok((StatusCode::CREATED, Json(IngestResponse { measurement, assessment })))
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
  #[default]
  Asc,
  Desc,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  #[serde(default)]
  pub order: Order,
}

/// `GET /subjects/{id}/measurements[?order=asc|desc]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Path(subject_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Measurement>>, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut history = state
    .store
    .list_measurements(subject_id)
    .await
    .map_err(ApiError::store)?;

  if let Order::Desc = params.order {
    history.reverse();
  }

  Ok(Json(history))
}

// ─── Assess ───────────────────────────────────────────────────────────────────

/// `POST /subjects/{id}/assess`
pub async fn assess<S>(
  State(state): State<ApiState<S>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Assessment>, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let outcome = state
    .engine
    .assess(state.store.as_ref(), subject_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}
