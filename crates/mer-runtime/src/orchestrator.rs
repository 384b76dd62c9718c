//! Background series orchestrator.
//!
//! Runs a [`SeriesBuilder`] in a tokio task and delivers the outcome through
//! an `mpsc` channel, so the chart view can draw a loading state while months
//! are analysed and swap in the series once it arrives.

use std::path::PathBuf;

use mer_core::error::Result;
use tokio::sync::mpsc;

use crate::series::{MonthlySeries, SeriesBuilder};

// ── Public types ──────────────────────────────────────────────────────────────

/// Outcome of one background series build, forwarded to the UI layer.
#[derive(Debug, Clone)]
pub enum SeriesUpdate {
    Loaded(MonthlySeries),
    Failed(String),
}

// ── SeriesOrchestrator ────────────────────────────────────────────────────────

/// Builds the monthly series off the UI task, optionally exporting it.
pub struct SeriesOrchestrator {
    builder: SeriesBuilder,
    parallel: bool,
    export: Option<PathBuf>,
}

impl SeriesOrchestrator {
    pub fn new(builder: SeriesBuilder, parallel: bool) -> Self {
        Self {
            builder,
            parallel,
            export: None,
        }
    }

    /// Also write the finished series to `path` as JSON.
    pub fn with_export(mut self, path: Option<PathBuf>) -> Self {
        self.export = path;
        self
    }

    /// Build (and export) the series on the current task.
    pub async fn run(&self) -> Result<MonthlySeries> {
        let series = if self.parallel {
            self.builder.build_parallel().await?
        } else {
            let builder = self.builder.clone();
            tokio::task::spawn_blocking(move || builder.build())
                .await
                .map_err(|e| anyhow::anyhow!("series task failed: {}", e))??
        };

        if let Some(path) = &self.export {
            series.export_json(path)?;
        }
        Ok(series)
    }

    /// Spawn the build in a dedicated tokio task.
    ///
    /// Returns the receiving end of the update channel and a handle that
    /// aborts the build.
    pub fn start(self) -> (mpsc::Receiver<SeriesUpdate>, SeriesHandle) {
        let (tx, rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            let update = match self.run().await {
                Ok(series) => SeriesUpdate::Loaded(series),
                Err(e) => {
                    tracing::error!("Series build failed: {}", e);
                    SeriesUpdate::Failed(e.to_string())
                }
            };
            if tx.send(update).await.is_err() {
                tracing::debug!("series receiver dropped before delivery");
            }
        });

        (rx, SeriesHandle { handle })
    }
}

// ── SeriesHandle ──────────────────────────────────────────────────────────────

/// A handle to the background build task.
pub struct SeriesHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl SeriesHandle {
    /// Immediately abort the build.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
