//! Handlers for `/warnings` endpoints, the clinician side of the warning
//! lifecycle.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/warnings` | Optional `subject_id`, `resolved`, `warning_type`, `date`, `text`, `limit`, `offset` |
//! | `GET`  | `/warnings/{id}` | 404 if not found |
//! | `POST` | `/warnings/{id}/resolve` | Marks resolved; returns the warning |
//! | `POST` | `/warnings/{id}/unresolve` | Reopens; returns the warning |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use rom_core::{
  store::{RomStore, WarningQuery},
  warning::Warning,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /warnings[?subject_id=...][&resolved=false][&warning_type=...][&date=YYYY-MM-DD][&text=...]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(query): Query<WarningQuery>,
) -> Result<Json<Vec<Warning>>, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let warnings = state
    .store
    .list_warnings(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(warnings))
}

/// `GET /warnings/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Warning>, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let warning = state
    .store
    .get_warning(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::WarningNotFound(id))?;
  Ok(Json(warning))
}

/// `POST /warnings/{id}/resolve`
pub async fn resolve<S>(
  state: State<ApiState<S>>,
  id: Path<Uuid>,
) -> Result<Json<Warning>, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  set_resolved(state, id, true).await
}

/// `POST /warnings/{id}/unresolve`
pub async fn unresolve<S>(
  state: State<ApiState<S>>,
  id: Path<Uuid>,
) -> Result<Json<Warning>, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  set_resolved(state, id, false).await
}

async fn set_resolved<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  resolved: bool,
) -> Result<Json<Warning>, ApiError>
where
  S: RomStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let warning = state
    .store
    .set_resolved(id, resolved)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::WarningNotFound(id))?;

  tracing::info!(
    warning_id = %id,
    subject_id = %warning.subject_id,
    warning_type = %warning.warning_type,
    resolved,
    "warning status changed"
  );
  Ok(Json(warning))
}
