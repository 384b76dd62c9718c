//! Data layer for MER kill dumps.
//!
//! Normalizes raw dumps from every publication epoch, converts them into
//! the canonical monthly files and analyses those files into per-class
//! snapshots.

pub mod analyzer;
pub mod classifier;
pub mod converter;
pub mod normalizer;
pub mod reader;

pub use analyzer::{analyze_file, Analyzer};
pub use classifier::Classifier;
pub use converter::{convert_dir, Converter};
pub use mer_core as core;
pub use normalizer::RawFormat;
