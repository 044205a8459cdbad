//! The risk-assessment engine.
//!
//! [`RiskEngine::evaluate`] is pure: it maps a newest-first history to the
//! warnings that should exist. [`RiskEngine::assess`] fetches that history
//! from a [`RomStore`] and persists each candidate with the store's atomic
//! create-if-absent, so repeated or concurrent assessments of the same
//! subject never duplicate a warning.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  measurement::Measurement,
  rules::{RuleSet, WINDOW},
  store::RomStore,
  warning::{NewWarning, Warning, WarningKey},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of the pure evaluation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
  /// Fewer than [`WINDOW`] measurements; nothing was evaluated.
  InsufficientHistory { available: usize },
  /// Warnings whose rules fired, in rule-set order. May be empty.
  Candidates(Vec<NewWarning>),
}

/// Result of a full assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Assessment {
  InsufficientHistory {
    available: usize,
  },
  Evaluated {
    /// Warnings created by this call.
    raised:          Vec<Warning>,
    /// Keys that fired but already had a warning; those rows were left as is.
    already_present: Vec<WarningKey>,
  },
}

impl Assessment {
  /// Warnings created by this call.
  pub fn raised(&self) -> &[Warning] {
    match self {
      Self::InsufficientHistory { .. } => &[],
      Self::Evaluated { raised, .. } => raised,
    }
  }
}

#[derive(Debug, Error)]
pub enum AssessError<E: std::error::Error + 'static> {
  /// A read or write against the store failed. The assessment is incomplete
  /// and the caller decides whether to retry.
  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] E),
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Stateless apart from its rules; share one instance across requests.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
  rules: RuleSet,
}

impl RiskEngine {
  pub fn new(rules: RuleSet) -> Self { Self { rules } }

  pub fn rules(&self) -> &RuleSet { &self.rules }

  /// Evaluate every rule against `history`, which must be ordered newest
  /// first. Only the first [`WINDOW`] entries are considered.
  pub fn evaluate(&self, subject_id: Uuid, history: &[Measurement]) -> Evaluation {
    let Some(window) = history.get(..WINDOW) else {
      return Evaluation::InsufficientHistory { available: history.len() };
    };
    let date = window[0].recorded_at.date_naive();

    let candidates = self
      .rules
      .rules()
      .iter()
      .filter_map(|rule| {
        rule.evaluate(window).map(|details| NewWarning {
          subject_id,
          date,
          warning_type: rule.warning_type,
          details,
        })
      })
      .collect();

    Evaluation::Candidates(candidates)
  }

  /// Assess a subject's latest measurements and persist any warnings that
  /// do not exist yet.
  pub async fn assess<S: RomStore>(
    &self,
    store: &S,
    subject_id: Uuid,
  ) -> Result<Assessment, AssessError<S::Error>> {
    let history = store
      .recent_measurements(subject_id, WINDOW)
      .await
      .map_err(AssessError::StorageUnavailable)?;

    let candidates = match self.evaluate(subject_id, &history) {
      Evaluation::InsufficientHistory { available } => {
        tracing::debug!(%subject_id, available, "not enough history to assess");
        return Ok(Assessment::InsufficientHistory { available });
      }
      Evaluation::Candidates(candidates) => candidates,
    };

    let mut raised = Vec::new();
    let mut already_present = Vec::new();
    for candidate in candidates {
      let key = candidate.key();
      match store
        .create_warning_if_absent(candidate)
        .await
        .map_err(AssessError::StorageUnavailable)?
      {
        Some(warning) => {
          tracing::info!(
            %subject_id,
            warning_type = %warning.warning_type,
            date = %warning.date,
            details = %warning.details,
            "raised warning"
          );
          raised.push(warning);
        }
        None => {
          tracing::debug!(
            %subject_id,
            warning_type = %key.warning_type,
            date = %key.date,
            "warning already present"
          );
          already_present.push(key);
        }
      }
    }

    Ok(Assessment::Evaluated { raised, already_present })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

  use super::*;
  use crate::{
    measurement::NewMeasurement,
    store::WarningQuery,
    warning::WarningType,
  };

  // ─── In-memory store ─────────────────────────────────────────────────────

  #[derive(Debug, Error)]
  #[error("store offline")]
  struct Offline;

  #[derive(Default)]
  struct MemoryStore {
    measurements: Mutex<Vec<Measurement>>,
    warnings:     Mutex<Vec<Warning>>,
    offline:      bool,
  }

  impl MemoryStore {
    fn check(&self) -> Result<(), Offline> {
      if self.offline { Err(Offline) } else { Ok(()) }
    }
  }

  impl RomStore for MemoryStore {
    type Error = Offline;

    async fn record_measurement(&self, input: NewMeasurement) -> Result<Measurement, Offline> {
      self.check()?;
      let m = Measurement {
        measurement_id: Uuid::new_v4(),
        subject_id:     input.subject_id,
        recorded_at:    input.recorded_at.unwrap_or_else(Utc::now),
        flexion:        input.flexion,
        extension:      input.extension,
        abduction:      input.abduction,
        adduction:      input.adduction,
      };
      self.measurements.lock().unwrap().push(m.clone());
      Ok(m)
    }

    async fn recent_measurements(
      &self,
      subject_id: Uuid,
      limit: usize,
    ) -> Result<Vec<Measurement>, Offline> {
      let mut all = self.list_measurements(subject_id).await?;
      all.reverse();
      all.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
      all.truncate(limit);
      Ok(all)
    }

    async fn list_measurements(&self, subject_id: Uuid) -> Result<Vec<Measurement>, Offline> {
      self.check()?;
      let all = self.measurements.lock().unwrap();
      Ok(all.iter().filter(|m| m.subject_id == subject_id).cloned().collect())
    }

    async fn create_warning_if_absent(
      &self,
      input: NewWarning,
    ) -> Result<Option<Warning>, Offline> {
      self.check()?;
      let mut warnings = self.warnings.lock().unwrap();
      if warnings.iter().any(|w| w.key() == input.key()) {
        return Ok(None);
      }
      let w = Warning {
        warning_id:   Uuid::new_v4(),
        subject_id:   input.subject_id,
        date:         input.date,
        warning_type: input.warning_type,
        details:      input.details,
        resolved:     false,
        created_at:   Utc::now(),
      };
      warnings.push(w.clone());
      Ok(Some(w))
    }

    async fn get_warning(&self, id: Uuid) -> Result<Option<Warning>, Offline> {
      self.check()?;
      let warnings = self.warnings.lock().unwrap();
      Ok(warnings.iter().find(|w| w.warning_id == id).cloned())
    }

    async fn list_warnings(&self, query: &WarningQuery) -> Result<Vec<Warning>, Offline> {
      self.check()?;
      let warnings = self.warnings.lock().unwrap();
      Ok(
        warnings
          .iter()
          .filter(|w| query.subject_id.is_none_or(|s| s == w.subject_id))
          .cloned()
          .collect(),
      )
    }

    async fn set_resolved(&self, id: Uuid, resolved: bool) -> Result<Option<Warning>, Offline> {
      self.check()?;
      let mut warnings = self.warnings.lock().unwrap();
      Ok(warnings.iter_mut().find(|w| w.warning_id == id).map(|w| {
        w.resolved = resolved;
        w.clone()
      }))
    }
  }

  // ─── Helpers ─────────────────────────────────────────────────────────────

  fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, n, 10, 30, 0).unwrap()
  }

  /// Build a newest-first history from `(flexion, extension, abduction,
  /// adduction)` tuples, one day apart, newest on 2024-01-03.
  fn history(subject_id: Uuid, rows: [(f64, f64, f64, f64); 3]) -> Vec<Measurement> {
    rows
      .iter()
      .enumerate()
      .map(|(i, &(flexion, extension, abduction, adduction))| Measurement {
        measurement_id: Uuid::new_v4(),
        subject_id,
        recorded_at: day(3) - Duration::days(i as i64),
        flexion: Some(flexion),
        extension: Some(extension),
        abduction: Some(abduction),
        adduction: Some(adduction),
      })
      .collect()
  }

  fn fired(eval: Evaluation) -> Vec<NewWarning> {
    match eval {
      Evaluation::Candidates(c) => c,
      other => panic!("expected candidates, got {other:?}"),
    }
  }

  const NORMAL: (f64, f64, f64, f64) = (150.0, 55.0, 160.0, 15.0);

  // ─── evaluate ────────────────────────────────────────────────────────────

  #[test]
  fn fewer_than_three_measurements_is_insufficient() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    let full = history(subject, [(10.0, 1.0, 1.0, 1.0); 3]);
    for n in 0..3 {
      assert_eq!(
        engine.evaluate(subject, &full[..n]),
        Evaluation::InsufficientHistory { available: n }
      );
    }
  }

  #[test]
  fn normal_readings_fire_nothing() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    assert!(fired(engine.evaluate(subject, &history(subject, [NORMAL; 3]))).is_empty());
  }

  #[test]
  fn low_adduction_fires_with_listed_values() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    let low = (150.0, 55.0, 160.0, 5.0);
    let warnings = fired(engine.evaluate(subject, &history(subject, [low; 3])));
    assert_eq!(warnings, vec![NewWarning {
      subject_id:   subject,
      date:         NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
      warning_type: WarningType::AdductionLow,
      details:      "Last 3: [5.0, 5.0, 5.0]".into(),
    }]);
  }

  #[test]
  fn flexion_boundary_is_strict() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();

    let below = history(subject, [(89.9, 55.0, 160.0, 15.0); 3]);
    let warnings = fired(engine.evaluate(subject, &below));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].warning_type, WarningType::FlexionLow);
    assert_eq!(warnings[0].details, "Last 3: [89.9, 89.9, 89.9]");

    let touching = history(subject, [
      (90.0, 55.0, 160.0, 15.0),
      (89.0, 55.0, 160.0, 15.0),
      (89.0, 55.0, 160.0, 15.0),
    ]);
    assert!(fired(engine.evaluate(subject, &touching)).is_empty());
  }

  #[test]
  fn abduction_drop_reports_rounded_values() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();

    let dropped = history(subject, [
      (150.0, 55.0, 40.0, 15.0),
      (150.0, 55.0, 100.0, 15.0),
      (150.0, 55.0, 100.0, 15.0),
    ]);
    let warnings = fired(engine.evaluate(subject, &dropped));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].warning_type, WarningType::AbductionDropped);
    assert_eq!(warnings[0].details, "Today: 40.0, Prev avg: 100.0");

    let held = history(subject, [
      (150.0, 55.0, 60.0, 15.0),
      (150.0, 55.0, 100.0, 15.0),
      (150.0, 55.0, 100.0, 15.0),
    ]);
    assert!(fired(engine.evaluate(subject, &held)).is_empty());
  }

  #[test]
  fn rules_fire_independently() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    let h = history(subject, [
      (80.0, 55.0, 40.0, 15.0),
      (80.0, 55.0, 100.0, 15.0),
      (80.0, 55.0, 100.0, 15.0),
    ]);
    let types: Vec<_> = fired(engine.evaluate(subject, &h))
      .into_iter()
      .map(|w| w.warning_type)
      .collect();
    assert_eq!(types, vec![WarningType::FlexionLow, WarningType::AbductionDropped]);
  }

  #[test]
  fn all_five_rules_can_fire_together() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    let h = history(subject, [
      (10.0, 5.0, 20.0, 1.0),
      (10.0, 5.0, 80.0, 1.0),
      (10.0, 5.0, 80.0, 1.0),
    ]);
    assert_eq!(fired(engine.evaluate(subject, &h)).len(), 5);
  }

  #[test]
  fn warning_is_dated_on_newest_measurement() {
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    let mut h = history(subject, [(10.0, 55.0, 160.0, 15.0); 3]);
    h[0].recorded_at = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
    let warnings = fired(engine.evaluate(subject, &h));
    assert_eq!(warnings[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
  }

  #[test]
  fn custom_rules_replace_defaults() {
    let engine = RiskEngine::new(RuleSet::new(vec![crate::rules::Rule::all_below(
      WarningType::FlexionLow,
      crate::measurement::Channel::Flexion,
      160.0,
    )]));
    let subject = Uuid::new_v4();
    let warnings = fired(engine.evaluate(subject, &history(subject, [NORMAL; 3])));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].details, "Last 3: [150.0, 150.0, 150.0]");
  }

  // ─── assess ──────────────────────────────────────────────────────────────

  async fn seed(store: &MemoryStore, subject: Uuid, rows: [(f64, f64, f64, f64); 3]) {
    for (i, &(f, e, ab, ad)) in rows.iter().rev().enumerate() {
      store
        .record_measurement(NewMeasurement::new(subject, f, e, ab, ad).at(day(1 + i as u32)))
        .await
        .unwrap();
    }
  }

  #[tokio::test]
  async fn assess_with_short_history_is_a_no_op() {
    let store = MemoryStore::default();
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    store
      .record_measurement(NewMeasurement::new(subject, 10.0, 1.0, 1.0, 1.0))
      .await
      .unwrap();

    let outcome = engine.assess(&store, subject).await.unwrap();
    assert_eq!(outcome, Assessment::InsufficientHistory { available: 1 });
    assert!(store.warnings.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn assess_twice_reports_existing_keys() {
    let store = MemoryStore::default();
    let engine = RiskEngine::default();
    let subject = Uuid::new_v4();
    seed(&store, subject, [(80.0, 55.0, 160.0, 15.0); 3]).await;

    let first = engine.assess(&store, subject).await.unwrap();
    assert_eq!(first.raised().len(), 1);

    let second = engine.assess(&store, subject).await.unwrap();
    match second {
      Assessment::Evaluated { raised, already_present } => {
        assert!(raised.is_empty());
        assert_eq!(already_present, vec![first.raised()[0].key()]);
      }
      other => panic!("unexpected {other:?}"),
    }
    assert_eq!(store.warnings.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn assess_propagates_store_failure() {
    let store = MemoryStore { offline: true, ..Default::default() };
    let engine = RiskEngine::default();
    let err = engine.assess(&store, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AssessError::StorageUnavailable(Offline)));
    assert_eq!(err.to_string(), "storage unavailable: store offline");
  }
}
