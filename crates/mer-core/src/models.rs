use serde::{Deserialize, Serialize};
use std::fmt;

/// Security class a star system is assigned to for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityClass {
    /// Security status at or above the highsec threshold.
    Highsec,
    /// Security status strictly between the nullsec and highsec thresholds.
    Lowsec,
    /// Security status at or below the nullsec threshold.
    Nullsec,
    /// Wormhole (J-space) systems, including Thera.
    Wormhole,
    /// Special space: Abyssal deadspace and Pochven.
    Abyssal,
    /// No lookup-table match and no security status to fall back on.
    Unknown,
}

impl SecurityClass {
    pub const COUNT: usize = 6;

    /// Every class, in reporting order.
    pub const ALL: [SecurityClass; Self::COUNT] = [
        SecurityClass::Highsec,
        SecurityClass::Lowsec,
        SecurityClass::Nullsec,
        SecurityClass::Wormhole,
        SecurityClass::Abyssal,
        SecurityClass::Unknown,
    ];

    /// Stable position of the class inside [`SecurityClass::ALL`].
    pub const fn index(self) -> usize {
        match self {
            SecurityClass::Highsec => 0,
            SecurityClass::Lowsec => 1,
            SecurityClass::Nullsec => 2,
            SecurityClass::Wormhole => 3,
            SecurityClass::Abyssal => 4,
            SecurityClass::Unknown => 5,
        }
    }

    /// Human-readable label used by tables and charts.
    pub fn label(self) -> &'static str {
        match self {
            SecurityClass::Highsec => "Highsec",
            SecurityClass::Lowsec => "Lowsec",
            SecurityClass::Nullsec => "Nullsec",
            SecurityClass::Wormhole => "Wormhole",
            SecurityClass::Abyssal => "Abyssal",
            SecurityClass::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SecurityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A dump row in the canonical schema consumed by the analyzer.
///
/// Every record carries enough information to be classified on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// System name, or the numeric ID as text when no name was published.
    pub system: String,
    /// Numeric solar-system ID, if the dump carried one.
    #[serde(default)]
    pub system_id: Option<u64>,
    /// Region name, if the dump carried one.
    #[serde(default)]
    pub region: Option<String>,
    /// Security status in [-1.0, 1.0], `None` when unknown.
    #[serde(default)]
    pub security_status: Option<f64>,
    /// Number of kills attributed to this row.
    pub kills: u64,
}

impl NormalizedRecord {
    /// Numeric ID of the system: the explicit `system_id`, or `system` itself
    /// when it is all digits.
    pub fn numeric_id(&self) -> Option<u64> {
        self.system_id.or_else(|| self.system.parse().ok())
    }
}

/// Column names of the normalized file, in write order.
pub const NORMALIZED_HEADER: [&str; 5] = ["system", "system_id", "region", "security_status", "kills"];

// ── StatsSnapshot ──────────────────────────────────────────────────────────────

/// Immutable per-file kill totals broken down by [`SecurityClass`].
///
/// Built once by [`ClassCounter::finish`]; the total always equals the sum of
/// all six class counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    highsec_kills: u64,
    lowsec_kills: u64,
    nullsec_kills: u64,
    wormhole_kills: u64,
    abyssal_kills: u64,
    unknown_kills: u64,
    total_kills: u64,
    rows: u64,
}

impl StatsSnapshot {
    pub fn highsec_kills(&self) -> u64 {
        self.highsec_kills
    }

    pub fn lowsec_kills(&self) -> u64 {
        self.lowsec_kills
    }

    pub fn nullsec_kills(&self) -> u64 {
        self.nullsec_kills
    }

    pub fn wormhole_kills(&self) -> u64 {
        self.wormhole_kills
    }

    pub fn abyssal_kills(&self) -> u64 {
        self.abyssal_kills
    }

    /// Kills that could not be placed in any class; non-zero is a data-quality signal.
    pub fn unknown_kills(&self) -> u64 {
        self.unknown_kills
    }

    pub fn total_kills(&self) -> u64 {
        self.total_kills
    }

    /// Number of data rows that contributed to this snapshot.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Kill count for a single class.
    pub fn kills(&self, class: SecurityClass) -> u64 {
        match class {
            SecurityClass::Highsec => self.highsec_kills,
            SecurityClass::Lowsec => self.lowsec_kills,
            SecurityClass::Nullsec => self.nullsec_kills,
            SecurityClass::Wormhole => self.wormhole_kills,
            SecurityClass::Abyssal => self.abyssal_kills,
            SecurityClass::Unknown => self.unknown_kills,
        }
    }
}

// ── ClassCounter ───────────────────────────────────────────────────────────────

/// Per-call accumulator behind a [`StatsSnapshot`].
///
/// Memory is fixed by the number of classes, not by the input size.
#[derive(Debug, Clone, Default)]
pub struct ClassCounter {
    kills: [u64; SecurityClass::COUNT],
    total: u64,
    rows: u64,
}

/// The running kill total no longer fits in a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("kill total overflows")]
pub struct KillOverflow;

impl ClassCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `kills` to `class` and count one row.
    ///
    /// Leaves the counter untouched when the total would overflow. Every
    /// class count is bounded by the total, so checking the total suffices.
    pub fn add(&mut self, class: SecurityClass, kills: u64) -> Result<(), KillOverflow> {
        self.total = self.total.checked_add(kills).ok_or(KillOverflow)?;
        self.kills[class.index()] += kills;
        self.rows += 1;
        Ok(())
    }

    /// Freeze the counters into a snapshot.
    pub fn finish(self) -> StatsSnapshot {
        let k = self.kills;
        StatsSnapshot {
            highsec_kills: k[SecurityClass::Highsec.index()],
            lowsec_kills: k[SecurityClass::Lowsec.index()],
            nullsec_kills: k[SecurityClass::Nullsec.index()],
            wormhole_kills: k[SecurityClass::Wormhole.index()],
            abyssal_kills: k[SecurityClass::Abyssal.index()],
            unknown_kills: k[SecurityClass::Unknown.index()],
            total_kills: self.total,
            rows: self.rows,
        }
    }
}
