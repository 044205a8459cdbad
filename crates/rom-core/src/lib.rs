//! Core types, rules, and the risk engine for ROM tracking.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::RomStore`]; the engine only talks to
//! that trait.

pub mod engine;
pub mod error;
pub mod measurement;
pub mod rules;
pub mod store;
pub mod warning;

pub use engine::{AssessError, Assessment, Evaluation, RiskEngine};
pub use error::{Error, Result};
