//! Runtime layer for MER statistics.
//!
//! Builds monthly series over the normalized dump directory, sequentially or
//! on the blocking pool, and runs those builds in the background for the UI.

pub mod orchestrator;
pub mod series;

pub use mer_core as core;
pub use mer_data as data;
