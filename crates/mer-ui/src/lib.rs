//! Terminal UI layer for MER statistics.
//!
//! Provides themes, the per-month class report table, the monthly series
//! chart and the application event loops, built on [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod table_view;
pub mod themes;

pub use mer_core as core;
