//! Core domain types for MER kill statistics.
//!
//! Security classes, normalized records and statistics snapshots, the error
//! taxonomy, classification rulesets, month tokens, settings and the
//! per-class report calculations shared by every other crate.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod month;
pub mod ruleset;
pub mod settings;

pub use error::{MerError, Result};
