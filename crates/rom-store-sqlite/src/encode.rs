//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order in SQL matches chronological order. Dates are
//! `YYYY-MM-DD`. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rom_core::{
  measurement::Measurement,
  warning::{Warning, WarningType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── WarningType ─────────────────────────────────────────────────────────────

pub fn encode_warning_type(wt: WarningType) -> &'static str { wt.label() }

pub fn decode_warning_type(s: &str) -> Result<WarningType> {
  Ok(WarningType::from_label(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawMeasurement::from_row`].
pub const MEASUREMENT_COLUMNS: &str = "measurement_id, subject_id, recorded_at, \
                                       flexion, extension, abduction, adduction";

/// Raw values read directly from a `measurements` row.
pub struct RawMeasurement {
  pub measurement_id: String,
  pub subject_id:     String,
  pub recorded_at:    String,
  pub flexion:        Option<f64>,
  pub extension:      Option<f64>,
  pub abduction:      Option<f64>,
  pub adduction:      Option<f64>,
}

impl RawMeasurement {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      measurement_id: row.get(0)?,
      subject_id:     row.get(1)?,
      recorded_at:    row.get(2)?,
      flexion:        row.get(3)?,
      extension:      row.get(4)?,
      abduction:      row.get(5)?,
      adduction:      row.get(6)?,
    })
  }

  pub fn into_measurement(self) -> Result<Measurement> {
    Ok(Measurement {
      measurement_id: decode_uuid(&self.measurement_id)?,
      subject_id:     decode_uuid(&self.subject_id)?,
      recorded_at:    decode_dt(&self.recorded_at)?,
      flexion:        self.flexion,
      extension:      self.extension,
      abduction:      self.abduction,
      adduction:      self.adduction,
    })
  }
}

/// Column list matching [`RawWarning::from_row`].
pub const WARNING_COLUMNS: &str = "warning_id, subject_id, date, warning_type, \
                                   details, resolved, created_at";

/// Raw values read directly from a `warnings` row.
pub struct RawWarning {
  pub warning_id:   String,
  pub subject_id:   String,
  pub date:         String,
  pub warning_type: String,
  pub details:      String,
  pub resolved:     bool,
  pub created_at:   String,
}

impl RawWarning {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      warning_id:   row.get(0)?,
      subject_id:   row.get(1)?,
      date:         row.get(2)?,
      warning_type: row.get(3)?,
      details:      row.get(4)?,
      resolved:     row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_warning(self) -> Result<Warning> {
    Ok(Warning {
      warning_id:   decode_uuid(&self.warning_id)?,
      subject_id:   decode_uuid(&self.subject_id)?,
      date:         decode_date(&self.date)?,
      warning_type: decode_warning_type(&self.warning_type)?,
      details:      self.details,
      resolved:     self.resolved,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::milliseconds(1500);
    let c = a + chrono::Duration::days(1);
    let (ea, eb, ec) = (encode_dt(a), encode_dt(b), encode_dt(c));
    assert!(ea < eb && eb < ec, "{ea} {eb} {ec}");
    assert_eq!(ea, "2024-01-01T09:00:00.000000Z");
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn unknown_warning_type_is_a_core_error() {
    assert!(matches!(
      decode_warning_type("Shrug Low"),
      Err(Error::Core(rom_core::Error::UnknownWarningType(_)))
    ));
  }
}
