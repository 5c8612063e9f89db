//! Exam notification tracking with periodic status reconciliation.
//!
//! The [`exams`] module holds the reconciliation engine: status resolution from
//! application windows, change detection against an ingestion source, notification
//! emission, and a single-flight scheduler that drives passes on a fixed cadence.

pub mod config;
pub mod error;
pub mod exams;
pub mod telemetry;
