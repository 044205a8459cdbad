//! Measurement types: a single range-of-motion reading for a subject.
//!
//! Measurements are immutable. The store assigns `measurement_id` and, unless
//! the caller backfills one, `recorded_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};
use uuid::Uuid;

// ─── Channel ─────────────────────────────────────────────────────────────────

/// One of the four shoulder movements captured in a reading.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
  Flexion,
  Extension,
  Abduction,
  Adduction,
}

// ─── Measurement ─────────────────────────────────────────────────────────────

/// A persisted ROM reading. Channel values are in degrees; a channel that was
/// not captured in this session is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
  pub measurement_id: Uuid,
  pub subject_id:     Uuid,
  pub recorded_at:    DateTime<Utc>,
  pub flexion:        Option<f64>,
  pub extension:      Option<f64>,
  pub abduction:      Option<f64>,
  pub adduction:      Option<f64>,
}

impl Measurement {
  /// The reading for `channel`, if it was captured.
  pub fn value(&self, channel: Channel) -> Option<f64> {
    match channel {
      Channel::Flexion => self.flexion,
      Channel::Extension => self.extension,
      Channel::Abduction => self.abduction,
      Channel::Adduction => self.adduction,
    }
  }
}

// ─── NewMeasurement ──────────────────────────────────────────────────────────

/// Input to [`crate::store::RomStore::record_measurement`].
#[derive(Debug, Clone, Default)]
pub struct NewMeasurement {
  pub subject_id:  Uuid,
  /// Backfilled reading time. `None` means "now", as seen by the store.
  pub recorded_at: Option<DateTime<Utc>>,
  pub flexion:     Option<f64>,
  pub extension:   Option<f64>,
  pub abduction:   Option<f64>,
  pub adduction:   Option<f64>,
}

impl NewMeasurement {
  /// A reading with all four channels captured.
  pub fn new(
    subject_id: Uuid,
    flexion: f64,
    extension: f64,
    abduction: f64,
    adduction: f64,
  ) -> Self {
    Self {
      subject_id,
      recorded_at: None,
      flexion: Some(flexion),
      extension: Some(extension),
      abduction: Some(abduction),
      adduction: Some(adduction),
    }
  }

  /// Pin the reading to a specific instant.
  pub fn at(mut self, recorded_at: DateTime<Utc>) -> Self {
    self.recorded_at = Some(recorded_at);
    self
  }

  /// Whether at least one channel carries a value.
  pub fn has_any_channel(&self) -> bool {
    [self.flexion, self.extension, self.abduction, self.adduction]
      .iter()
      .any(Option::is_some)
  }
}
