//! Normalized-file analyser.
//!
//! Streams a `<YYYYMM>_kill_dump.csv` file, classifies every row and returns
//! the per-class totals as a [`StatsSnapshot`].

use std::path::Path;

use csv::StringRecord;
use mer_core::error::{MerError, Result};
use mer_core::models::{ClassCounter, NormalizedRecord, StatsSnapshot};
use tracing::debug;

use crate::classifier::Classifier;
use crate::normalizer::{parse_kills, parse_security, parse_system_id, Field, RowError};
use crate::reader::RowReader;

// ── Analyzer ──────────────────────────────────────────────────────────────────

/// One-shot analysis of a single normalized file.
///
/// Construction opens the file; [`Analyzer::analyze`] consumes the analyser
/// so the handle is released as soon as the snapshot is returned.
pub struct Analyzer {
    reader: RowReader,
    classifier: Classifier,
}

impl Analyzer {
    /// Open `path` without reading any content yet.
    pub fn open(path: impl AsRef<Path>, classifier: Classifier) -> Result<Self> {
        Ok(Self {
            reader: RowReader::open(path.as_ref(), false)?,
            classifier,
        })
    }

    /// Classify every row and total the kills per class.
    ///
    /// The first bad row fails the whole file; no partial snapshot is returned.
    pub fn analyze(mut self) -> Result<StatsSnapshot> {
        let path = self.reader.path().to_path_buf();
        let headers = self.reader.headers()?.clone();
        let mut counter = ClassCounter::new();

        if headers.is_empty() {
            debug!("{} is empty", path.display());
            return Ok(counter.finish());
        }

        let columns = NormalizedColumns::resolve(&headers).map_err(|column| {
            MerError::MissingColumn {
                path: path.clone(),
                column: column.to_string(),
            }
        })?;

        while let Some((row, record)) = self.reader.next_row()? {
            let parsed = columns.parse(record).map_err(|e| e.at(&path, row))?;
            counter
                .add(self.classifier.classify(&parsed), parsed.kills)
                .map_err(|e| RowError::new(Field::Kills, e.to_string()).at(&path, row))?;
        }

        let snapshot = counter.finish();
        debug!(
            "Analyzed {}: {} rows, {} kills",
            path.display(),
            snapshot.rows(),
            snapshot.total_kills()
        );
        Ok(snapshot)
    }
}

/// Convenience wrapper: open and analyse in one call.
pub fn analyze_file(path: impl AsRef<Path>, classifier: &Classifier) -> Result<StatsSnapshot> {
    Analyzer::open(path, classifier.clone())?.analyze()
}

// ── NormalizedColumns ─────────────────────────────────────────────────────────

/// Header positions in a normalized file. `system` and `kills` are required.
#[derive(Debug, Clone, Copy)]
struct NormalizedColumns {
    system: usize,
    system_id: Option<usize>,
    region: Option<usize>,
    security_status: Option<usize>,
    kills: usize,
}

impl NormalizedColumns {
    fn resolve(headers: &StringRecord) -> std::result::Result<Self, &'static str> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };
        Ok(Self {
            system: position("system").ok_or("system")?,
            system_id: position("system_id"),
            region: position("region"),
            security_status: position("security_status"),
            kills: position("kills").ok_or("kills")?,
        })
    }

    fn parse(&self, record: &StringRecord) -> std::result::Result<NormalizedRecord, RowError> {
        let cell = |i: usize| record.get(i).unwrap_or("");
        let optional = |i: Option<usize>| i.map(cell).filter(|v| !v.is_empty());

        let system = cell(self.system);
        if system.is_empty() {
            return Err(RowError::new(Field::SystemName, "empty system"));
        }

        Ok(NormalizedRecord {
            system: system.to_string(),
            system_id: optional(self.system_id).map(parse_system_id).transpose()?,
            region: optional(self.region).map(str::to_string),
            security_status: optional(self.security_status).map(parse_security).transpose()?,
            kills: parse_kills(cell(self.kills))?,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
