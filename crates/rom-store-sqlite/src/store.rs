//! The SQLite implementation of [`RomStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rom_core::{
  measurement::{Measurement, NewMeasurement},
  store::{RomStore, WarningQuery},
  warning::{NewWarning, Warning},
};

use crate::{
  encode::{
    MEASUREMENT_COLUMNS, RawMeasurement, RawWarning, WARNING_COLUMNS, encode_date,
    encode_dt, encode_uuid, encode_warning_type,
  },
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ROM store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_measurements(
    &self,
    sql: String,
    subject_id: Uuid,
    limit: i64,
  ) -> Result<Vec<Measurement>> {
    let subject_id_str = encode_uuid(subject_id);

    let raws: Vec<RawMeasurement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![subject_id_str, limit],
            RawMeasurement::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMeasurement::into_measurement).collect()
  }
}

/// A `LIKE` pattern matching `text` anywhere, with the wildcard characters
/// in `text` taken literally.
fn like_pattern(text: &str) -> String {
  let escaped = text
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("%{escaped}%")
}

// ─── RomStore impl ───────────────────────────────────────────────────────────

impl RomStore for SqliteStore {
  type Error = crate::Error;

  // ── Measurements ──────────────────────────────────────────────────────────

  async fn record_measurement(&self, input: NewMeasurement) -> Result<Measurement> {
    // Timestamps are stored at microsecond precision; truncate up front so
    // the returned record equals the row.
    let measurement = Measurement {
      measurement_id: Uuid::new_v4(),
      subject_id:     input.subject_id,
      recorded_at:    input.recorded_at.unwrap_or_else(Utc::now).trunc_subsecs(6),
      flexion:        input.flexion,
      extension:      input.extension,
      abduction:      input.abduction,
      adduction:      input.adduction,
    };

    let id_str         = encode_uuid(measurement.measurement_id);
    let subject_id_str = encode_uuid(measurement.subject_id);
    let at_str         = encode_dt(measurement.recorded_at);
    let values         = [
      measurement.flexion,
      measurement.extension,
      measurement.abduction,
      measurement.adduction,
    ];

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO measurements (
             measurement_id, subject_id, recorded_at,
             flexion, extension, abduction, adduction
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            subject_id_str,
            at_str,
            values[0],
            values[1],
            values[2],
            values[3],
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(measurement)
  }

  async fn recent_measurements(
    &self,
    subject_id: Uuid,
    limit:      usize,
  ) -> Result<Vec<Measurement>> {
    let sql = format!(
      "SELECT {MEASUREMENT_COLUMNS} FROM measurements
       WHERE subject_id = ?1
       ORDER BY recorded_at DESC, rowid DESC
       LIMIT ?2"
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    self.query_measurements(sql, subject_id, limit).await
  }

  async fn list_measurements(&self, subject_id: Uuid) -> Result<Vec<Measurement>> {
    // A negative LIMIT means "no limit" in SQLite.
    let sql = format!(
      "SELECT {MEASUREMENT_COLUMNS} FROM measurements
       WHERE subject_id = ?1
       ORDER BY recorded_at ASC, rowid ASC
       LIMIT ?2"
    );
    self.query_measurements(sql, subject_id, -1).await
  }

  // ── Warnings ──────────────────────────────────────────────────────────────

  async fn create_warning_if_absent(&self, input: NewWarning) -> Result<Option<Warning>> {
    let warning = Warning {
      warning_id:   Uuid::new_v4(),
      subject_id:   input.subject_id,
      date:         input.date,
      warning_type: input.warning_type,
      details:      input.details,
      resolved:     false,
      created_at:   Utc::now().trunc_subsecs(6),
    };

    let id_str         = encode_uuid(warning.warning_id);
    let subject_id_str = encode_uuid(warning.subject_id);
    let date_str       = encode_date(warning.date);
    let type_str       = encode_warning_type(warning.warning_type);
    let details        = warning.details.clone();
    let at_str         = encode_dt(warning.created_at);

    // The UNIQUE key makes this a single atomic create-if-absent; a
    // conflicting row is left untouched and reports zero changes.
    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO warnings (
             warning_id, subject_id, date, warning_type,
             details, resolved, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
           ON CONFLICT (subject_id, date, warning_type) DO NOTHING",
          rusqlite::params![id_str, subject_id_str, date_str, type_str, details, at_str],
        )?;
        Ok(changed == 1)
      })
      .await?;

    Ok(inserted.then_some(warning))
  }

  async fn get_warning(&self, id: Uuid) -> Result<Option<Warning>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawWarning> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {WARNING_COLUMNS} FROM warnings WHERE warning_id = ?1"),
              rusqlite::params![id_str],
              RawWarning::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawWarning::into_warning).transpose()
  }

  async fn list_warnings(&self, query: &WarningQuery) -> Result<Vec<Warning>> {
    let subject_str = query.subject_id.map(encode_uuid);
    let resolved    = query.resolved;
    let type_str    = query.warning_type.map(encode_warning_type);
    let date_str    = query.date.map(encode_date);
    let text_like   = query.text.as_deref().map(like_pattern);
    let limit_val   = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset_val  = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));

    let raws: Vec<RawWarning> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {WARNING_COLUMNS} FROM warnings
           WHERE (?1 IS NULL OR subject_id   = ?1)
             AND (?2 IS NULL OR resolved     = ?2)
             AND (?3 IS NULL OR warning_type = ?3)
             AND (?4 IS NULL OR date         = ?4)
             AND (?7 IS NULL
                  OR warning_type LIKE ?7 ESCAPE '\\'
                  OR details      LIKE ?7 ESCAPE '\\')
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?5 OFFSET ?6"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              subject_str,
              resolved,
              type_str,
              date_str,
              limit_val,
              offset_val,
              text_like,
            ],
            RawWarning::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawWarning::into_warning).collect()
  }

  async fn set_resolved(&self, id: Uuid, resolved: bool) -> Result<Option<Warning>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawWarning> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE warnings SET resolved = ?2 WHERE warning_id = ?1
                 RETURNING {WARNING_COLUMNS}"
              ),
              rusqlite::params![id_str, resolved],
              RawWarning::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawWarning::into_warning).transpose()
  }
}
