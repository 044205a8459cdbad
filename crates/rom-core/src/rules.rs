//! Risk rules, with thresholds expressed as data.
//!
//! A [`Rule`] pairs a [`WarningType`] with a [`Channel`] and a [`Criterion`].
//! The criterion is a predicate over the channel's newest-first window of
//! [`WINDOW`] values and also renders the `details` text for the warning it
//! raises. A [`RuleSet`] is an ordered list of rules; its `Default` is the
//! standard clinic table, and deployments may replace it from configuration.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  measurement::{Channel, Measurement},
  warning::WarningType,
};

/// Number of most-recent measurements every rule looks at.
pub const WINDOW: usize = 3;

// ─── Criterion ───────────────────────────────────────────────────────────────

/// A predicate over a newest-first window of channel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
  /// Every value in the window is strictly below `threshold`.
  AllBelow { threshold: f64 },
  /// The newest value is strictly below `ratio` times the mean of the older
  /// values, and that mean is positive.
  DropBelowRatio { ratio: f64 },
}

impl Criterion {
  /// Returns the warning details if the criterion holds for `window`.
  pub fn evaluate(&self, window: &[f64; WINDOW]) -> Option<String> {
    match *self {
      Self::AllBelow { threshold } => {
        if !window.iter().all(|v| *v < threshold) {
          return None;
        }
        let values = window
          .iter()
          .map(|v| decimal_repr(*v))
          .collect::<Vec<_>>()
          .join(", ");
        Some(format!("Last {WINDOW}: [{values}]"))
      }
      Self::DropBelowRatio { ratio } => {
        let (today, older) = window.split_first()?;
        let prev_avg = older.iter().sum::<f64>() / older.len() as f64;
        if prev_avg > 0.0 && *today < ratio * prev_avg {
          Some(format!("Today: {today:.1}, Prev avg: {prev_avg:.1}"))
        } else {
          None
        }
      }
    }
  }
}

/// Shortest round-trip rendering of `v` that always reads as a float:
/// `5.0`, `89.9`, and for magnitudes outside `[1e-4, 1e16)` a signed
/// two-digit exponent such as `1e-05` or `1.5e+16`.
fn decimal_repr(v: f64) -> String {
  if v.is_nan() {
    return "nan".to_owned();
  }
  let magnitude = v.abs();
  if v.is_infinite() || magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
    return format!("{v:?}");
  }
  let scientific = format!("{v:e}");
  let Some((mantissa, exponent)) = scientific.split_once('e') else {
    return scientific;
  };
  let (sign, digits) = match exponent.strip_prefix('-') {
    Some(digits) => ('-', digits),
    None => ('+', exponent),
  };
  format!("{mantissa}e{sign}{digits:0>2}")
}

// ─── Rule ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
  pub warning_type: WarningType,
  pub channel:      Channel,
  pub criterion:    Criterion,
}

impl Rule {
  pub fn all_below(
    warning_type: WarningType,
    channel: Channel,
    threshold: f64,
  ) -> Self {
    Self { warning_type, channel, criterion: Criterion::AllBelow { threshold } }
  }

  pub fn drop_below_ratio(
    warning_type: WarningType,
    channel: Channel,
    ratio: f64,
  ) -> Self {
    Self { warning_type, channel, criterion: Criterion::DropBelowRatio { ratio } }
  }

  /// Evaluate against a newest-first history. Returns the details text if
  /// the rule fires; `None` if it does not or if the channel lacks a full
  /// window of values.
  pub fn evaluate(&self, history: &[Measurement]) -> Option<String> {
    let window = channel_window(history, self.channel)?;
    self.criterion.evaluate(&window)
  }

  fn validate(&self) -> Result<()> {
    let invalid = |reason: String| Error::InvalidRule {
      warning_type: self.warning_type.label().to_owned(),
      reason,
    };
    if self.channel != self.warning_type.channel() {
      return Err(invalid(format!(
        "channel {} does not match, expected {}",
        self.channel,
        self.warning_type.channel()
      )));
    }
    let relative = matches!(self.criterion, Criterion::DropBelowRatio { .. });
    if relative != self.warning_type.is_relative() {
      return Err(invalid(format!(
        "criterion {} does not fit this warning type",
        if relative { "drop_below_ratio" } else { "all_below" }
      )));
    }
    match self.criterion {
      Criterion::AllBelow { threshold } if !threshold.is_finite() => {
        Err(invalid(format!("threshold {threshold} is not finite")))
      }
      Criterion::DropBelowRatio { ratio } if !(ratio > 0.0 && ratio <= 1.0) => {
        Err(invalid(format!("ratio {ratio} is outside (0, 1]")))
      }
      _ => Ok(()),
    }
  }
}

/// The first [`WINDOW`] values of `channel`, newest first. A missing reading
/// anywhere in the window leaves the channel without a window.
fn channel_window(
  history: &[Measurement],
  channel: Channel,
) -> Option<[f64; WINDOW]> {
  if history.len() < WINDOW {
    return None;
  }
  let mut window = [0.0; WINDOW];
  for (slot, m) in window.iter_mut().zip(history) {
    *slot = m.value(channel)?;
  }
  Some(window)
}

// ─── RuleSet ─────────────────────────────────────────────────────────────────

/// An ordered, injectable collection of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
  rules: Vec<Rule>,
}

impl RuleSet {
  pub fn new(rules: Vec<Rule>) -> Self { Self { rules } }

  pub fn rules(&self) -> &[Rule] { &self.rules }

  /// Reject rule sets that could never behave sensibly.
  pub fn validate(&self) -> Result<()> {
    if self.rules.is_empty() {
      return Err(Error::EmptyRuleSet);
    }
    for (i, rule) in self.rules.iter().enumerate() {
      rule.validate()?;
      if self.rules[..i].iter().any(|r| r.warning_type == rule.warning_type) {
        return Err(Error::DuplicateWarningType(rule.warning_type.label().to_owned()));
      }
    }
    Ok(())
  }
}

impl Default for RuleSet {
  /// The standard shoulder-rehab thresholds.
  fn default() -> Self {
    Self::new(vec![
      Rule::all_below(WarningType::FlexionLow, Channel::Flexion, 90.0),
      Rule::all_below(WarningType::ExtensionLow, Channel::Extension, 30.0),
      Rule::all_below(WarningType::AbductionLow, Channel::Abduction, 90.0),
      // Normal adduction tops out near 30°, hence the low bar.
      Rule::all_below(WarningType::AdductionLow, Channel::Adduction, 10.0),
      Rule::drop_below_ratio(WarningType::AbductionDropped, Channel::Abduction, 0.5),
    ])
  }
}
