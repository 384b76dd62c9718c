//! Per-class report figures derived from a [`StatsSnapshot`] and the
//! configured population and system counts.

use serde::Serialize;

use crate::models::{SecurityClass, StatsSnapshot};
use crate::settings::ReportConfig;

/// Classes shown as rows in the report, in display order.
pub const REPORT_CLASSES: [SecurityClass; 5] = [
    SecurityClass::Highsec,
    SecurityClass::Lowsec,
    SecurityClass::Nullsec,
    SecurityClass::Wormhole,
    SecurityClass::Abyssal,
];

/// One row of the class report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassRow {
    pub class: SecurityClass,
    /// Kills (ship losses) in this class.
    pub losses: u64,
    /// Configured number of systems in this class.
    pub systems: u32,
    /// Losses divided by the system count; `None` when there are no systems.
    pub losses_per_system: Option<f64>,
    /// Configured share of characters in this class; `None` for Abyssal space.
    pub distribution: Option<f64>,
    /// Losses per resident character; `None` when the population is zero.
    pub losses_per_character: Option<f64>,
}

/// Report for one analysed month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub rows: Vec<ClassRow>,
    pub total_losses: u64,
    /// Kills that could not be classified.
    pub unknown_losses: u64,
}

impl ClassReport {
    /// Build the report rows for `snapshot` using `config`.
    pub fn build(snapshot: &StatsSnapshot, config: &ReportConfig) -> Self {
        let rows = REPORT_CLASSES
            .iter()
            .map(|&class| {
                let losses = snapshot.kills(class);
                let systems = system_count(config, class);
                let distribution = distribution_share(config, class);
                let population = distribution.map(|share| config.mau as f64 * share);

                ClassRow {
                    class,
                    losses,
                    systems,
                    losses_per_system: ratio(losses as f64, f64::from(systems)),
                    distribution,
                    losses_per_character: population.and_then(|p| ratio(losses as f64, p)),
                }
            })
            .collect();

        Self {
            rows,
            total_losses: snapshot.total_kills(),
            unknown_losses: snapshot.unknown_kills(),
        }
    }

    /// Row for a single class, if it is part of the report.
    pub fn row(&self, class: SecurityClass) -> Option<&ClassRow> {
        self.rows.iter().find(|r| r.class == class)
    }
}

fn system_count(config: &ReportConfig, class: SecurityClass) -> u32 {
    let s = &config.systems;
    match class {
        SecurityClass::Highsec => s.highsec,
        SecurityClass::Lowsec => s.lowsec,
        SecurityClass::Nullsec => s.nullsec,
        SecurityClass::Wormhole => s.wormhole,
        SecurityClass::Abyssal => s.abyssal,
        SecurityClass::Unknown => 0,
    }
}

fn distribution_share(config: &ReportConfig, class: SecurityClass) -> Option<f64> {
    let d = &config.distribution;
    match class {
        SecurityClass::Highsec => Some(d.highsec),
        SecurityClass::Lowsec => Some(d.lowsec),
        SecurityClass::Nullsec => Some(d.nullsec),
        SecurityClass::Wormhole => Some(d.wormhole),
        SecurityClass::Abyssal | SecurityClass::Unknown => None,
    }
}

/// `numerator / denominator`, or `None` when the denominator is not positive.
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}
