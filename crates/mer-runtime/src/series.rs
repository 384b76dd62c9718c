//! Monthly series builder.
//!
//! Probes `<YYYYMM>_kill_dump.csv` files month by month from a start month,
//! analyses each one and collects the snapshots in month order. Discovery is
//! gap-free: the first missing month ends the series.

use std::path::{Path, PathBuf};

use mer_core::error::{MerError, Result};
use mer_core::models::StatsSnapshot;
use mer_core::month::MonthKey;
use mer_data::{analyze_file, Classifier};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// What to do when a month fails analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failure aborts the whole series.
    #[default]
    Abort,
    /// Failed months are logged, recorded and left out of the series.
    Skip,
}

/// One analysed month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub month: MonthKey,
    pub snapshot: StatsSnapshot,
}

/// A month left out under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMonth {
    pub month: MonthKey,
    pub path: PathBuf,
    pub reason: String,
}

/// Snapshots for consecutive months, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub points: Vec<SeriesPoint>,
    #[serde(default)]
    pub skipped: Vec<SkippedMonth>,
}

impl MonthlySeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Write the series as pretty JSON, atomically.
    pub fn export_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| MerError::OutputWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| MerError::OutputWrite {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            MerError::OutputWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;

        info!("Exported {} months to {}", self.len(), path.display());
        Ok(())
    }
}

// ── SeriesBuilder ─────────────────────────────────────────────────────────────

/// Builds a [`MonthlySeries`] from a directory of normalized monthly files.
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    data_dir: PathBuf,
    start: MonthKey,
    until: Option<MonthKey>,
    policy: FailurePolicy,
    classifier: Classifier,
}

impl SeriesBuilder {
    pub fn new(data_dir: impl Into<PathBuf>, start: MonthKey, classifier: Classifier) -> Self {
        Self {
            data_dir: data_dir.into(),
            start,
            until: None,
            policy: FailurePolicy::Abort,
            classifier,
        }
    }

    /// Stop after `until` (inclusive) even if later files exist.
    pub fn until(mut self, until: Option<MonthKey>) -> Self {
        self.until = until;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Consecutive months from the start month whose file exists.
    pub fn discover(&self) -> Vec<(MonthKey, PathBuf)> {
        let mut found = Vec::new();
        let mut month = Some(self.start);

        while let Some(current) = month {
            if self.until.is_some_and(|until| current > until) {
                break;
            }
            let path = self.data_dir.join(current.file_name());
            if !path.is_file() {
                debug!("No dump for {}; series ends", current);
                break;
            }
            found.push((current, path));
            month = current.next();
        }

        debug!(
            "Discovered {} monthly files in {}",
            found.len(),
            self.data_dir.display()
        );
        found
    }

    /// Analyse every discovered month in order on the current thread.
    pub fn build(&self) -> Result<MonthlySeries> {
        let results = self
            .discover()
            .into_iter()
            .map(|(month, path)| {
                let result = analyze_file(&path, &self.classifier);
                (month, path, result)
            });
        self.assemble(results)
    }

    /// Analyse every discovered month on the blocking thread pool.
    ///
    /// Results are reassembled in month order, so the outcome matches
    /// [`SeriesBuilder::build`].
    pub async fn build_parallel(&self) -> Result<MonthlySeries> {
        let months = self.discover();
        let mut tasks = JoinSet::new();

        for (index, (month, path)) in months.into_iter().enumerate() {
            let classifier = self.classifier.clone();
            tasks.spawn_blocking(move || {
                let result = analyze_file(&path, &classifier);
                (index, month, path, result)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| MerError::Other(anyhow::anyhow!("analysis task failed: {}", e)))?;
            results.push(outcome);
        }
        results.sort_by_key(|(index, ..)| *index);

        self.assemble(
            results
                .into_iter()
                .map(|(_, month, path, result)| (month, path, result)),
        )
    }

    /// Apply the failure policy to per-month results given in month order.
    fn assemble<I>(&self, results: I) -> Result<MonthlySeries>
    where
        I: IntoIterator<Item = (MonthKey, PathBuf, Result<StatsSnapshot>)>,
    {
        let mut series = MonthlySeries::default();

        for (month, path, result) in results {
            match result {
                Ok(snapshot) => {
                    info!("Analyzed {}: {} kills", month, snapshot.total_kills());
                    series.points.push(SeriesPoint { month, snapshot });
                }
                Err(e) if self.policy == FailurePolicy::Skip => {
                    warn!("Skipping {}: {}", month, e);
                    series.skipped.push(SkippedMonth {
                        month,
                        path,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(series)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
