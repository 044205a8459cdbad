//! Error types for `rom-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown warning type: {0:?}")]
  UnknownWarningType(String),

  #[error("rule set is empty")]
  EmptyRuleSet,

  #[error("more than one rule raises {0:?}")]
  DuplicateWarningType(String),

  #[error("invalid rule for {warning_type:?}: {reason}")]
  InvalidRule {
    warning_type: String,
    reason:       String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
