//! Clinical warnings raised by the risk engine.
//!
//! A warning is keyed by `(subject_id, date, warning_type)`; at most one row
//! exists per key. Only `resolved` ever changes after creation, and only the
//! clinician-facing side changes it.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, measurement::Channel};

// ─── WarningType ─────────────────────────────────────────────────────────────

/// The fixed set of warning kinds. The label is what clinicians see and what
/// the store persists in the `warning_type` column.
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
  EnumIter,
  EnumString,
)]
pub enum WarningType {
  #[serde(rename = "Flexion Low")]
  #[strum(serialize = "Flexion Low")]
  FlexionLow,
  #[serde(rename = "Extension Low")]
  #[strum(serialize = "Extension Low")]
  ExtensionLow,
  #[serde(rename = "Abduction Low")]
  #[strum(serialize = "Abduction Low")]
  AbductionLow,
  #[serde(rename = "Adduction Low")]
  #[strum(serialize = "Adduction Low")]
  AdductionLow,
  #[serde(rename = "Abduction Dropped >50%")]
  #[strum(serialize = "Abduction Dropped >50%")]
  AbductionDropped,
}

impl WarningType {
  pub fn label(&self) -> &'static str {
    match self {
      Self::FlexionLow => "Flexion Low",
      Self::ExtensionLow => "Extension Low",
      Self::AbductionLow => "Abduction Low",
      Self::AdductionLow => "Adduction Low",
      Self::AbductionDropped => "Abduction Dropped >50%",
    }
  }

  /// The channel a warning of this type is about.
  pub fn channel(&self) -> Channel {
    match self {
      Self::FlexionLow => Channel::Flexion,
      Self::ExtensionLow => Channel::Extension,
      Self::AbductionLow | Self::AbductionDropped => Channel::Abduction,
      Self::AdductionLow => Channel::Adduction,
    }
  }

  /// Whether the type names a drop relative to earlier readings rather
  /// than a reading below a fixed threshold.
  pub fn is_relative(&self) -> bool { matches!(self, Self::AbductionDropped) }

  /// Parse a stored label back into a [`WarningType`].
  pub fn from_label(label: &str) -> Result<Self> {
    Self::from_str(label).map_err(|_| Error::UnknownWarningType(label.to_owned()))
  }
}

impl std::fmt::Display for WarningType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// The uniqueness key of a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarningKey {
  pub subject_id:   Uuid,
  pub date:         NaiveDate,
  pub warning_type: WarningType,
}

// ─── Warning ─────────────────────────────────────────────────────────────────

/// A persisted warning awaiting (or past) clinician review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
  pub warning_id:   Uuid,
  pub subject_id:   Uuid,
  /// Calendar date (UTC) of the measurement that triggered the warning.
  pub date:         NaiveDate,
  pub warning_type: WarningType,
  pub details:      String,
  pub resolved:     bool,
  pub created_at:   DateTime<Utc>,
}

impl Warning {
  pub fn key(&self) -> WarningKey {
    WarningKey {
      subject_id:   self.subject_id,
      date:         self.date,
      warning_type: self.warning_type,
    }
  }
}

// ─── NewWarning ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::RomStore::create_warning_if_absent`]. New
/// warnings always start unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWarning {
  pub subject_id:   Uuid,
  pub date:         NaiveDate,
  pub warning_type: WarningType,
  pub details:      String,
}

impl NewWarning {
  pub fn key(&self) -> WarningKey {
    WarningKey {
      subject_id:   self.subject_id,
      date:         self.date,
      warning_type: self.warning_type,
    }
  }
}
