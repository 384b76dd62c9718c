//! Classification rulesets: the static lookup tables and security thresholds
//! the classifier is handed at construction time.
//!
//! The shipped [`StaticRuleset`] is loaded from a versioned JSON file so new
//! systems and expansions can be added without rebuilding.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MerError, Result};
use crate::models::NormalizedRecord;

// ── Thresholds ────────────────────────────────────────────────────────────────

/// Numeric security-status boundaries between highsec, lowsec and nullsec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityThresholds {
    /// Statuses at or above this value are highsec.
    pub highsec_min: f64,
    /// Statuses at or below this value are nullsec.
    pub nullsec_max: f64,
    /// Round the status the way the game client displays it before comparing.
    pub round_to_display: bool,
}

impl Default for SecurityThresholds {
    fn default() -> Self {
        Self {
            highsec_min: 0.5,
            nullsec_max: 0.0,
            round_to_display: false,
        }
    }
}

impl SecurityThresholds {
    /// Apply display rounding when enabled, otherwise return `status` unchanged.
    ///
    /// The client shows one decimal, except that any positive status below
    /// 0.05 is shown as 0.1 rather than 0.0.
    pub fn effective(&self, status: f64) -> f64 {
        if !self.round_to_display {
            return status;
        }
        if status > 0.0 && status < 0.05 {
            return 0.1;
        }
        (status * 10.0).round() / 10.0
    }

    fn validate(&self) -> Result<()> {
        if !(self.highsec_min.is_finite() && self.nullsec_max.is_finite()) {
            return Err(MerError::Config("thresholds must be finite".to_string()));
        }
        if self.nullsec_max >= self.highsec_min {
            return Err(MerError::Config(format!(
                "nullsec_max ({}) must be below highsec_min ({})",
                self.nullsec_max, self.highsec_min
            )));
        }
        Ok(())
    }
}

// ── ClassificationRuleset ─────────────────────────────────────────────────────

/// The lookup capability the classifier depends on.
///
/// Implementations must be pure: the answer may depend only on the record and
/// on data fixed at construction time.
pub trait ClassificationRuleset: Send + Sync {
    /// Whether the record belongs to special space (Pochven / Abyssal).
    fn is_special_space(&self, record: &NormalizedRecord) -> bool;

    /// Whether the record belongs to wormhole space.
    fn is_wormhole_space(&self, record: &NormalizedRecord) -> bool;

    /// Numeric security boundaries.
    fn thresholds(&self) -> SecurityThresholds;
}

// ── SpaceTable ────────────────────────────────────────────────────────────────

/// On-disk shape of one lookup table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceTableDef {
    /// Exact system names (case-insensitive).
    pub names: Vec<String>,
    /// Regular expressions matched against the system name.
    pub name_patterns: Vec<String>,
    /// Exact region names (case-insensitive).
    pub regions: Vec<String>,
    /// Regular expressions matched against the region name.
    pub region_patterns: Vec<String>,
    /// Inclusive `[low, high]` solar-system ID ranges.
    pub id_ranges: Vec<[u64; 2]>,
}

/// A compiled lookup table.
#[derive(Debug, Clone, Default)]
pub struct SpaceTable {
    names: Vec<String>,
    name_patterns: Vec<Regex>,
    regions: Vec<String>,
    region_patterns: Vec<Regex>,
    id_ranges: Vec<(u64, u64)>,
}

impl SpaceTable {
    /// Compile a table, rejecting invalid patterns and inverted ranges.
    pub fn compile(table: &str, def: &SpaceTableDef) -> Result<Self> {
        let compile_all = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        MerError::Config(format!("{}: invalid pattern '{}': {}", table, p, e))
                    })
                })
                .collect()
        };

        let mut id_ranges = Vec::with_capacity(def.id_ranges.len());
        for [low, high] in &def.id_ranges {
            if low > high {
                return Err(MerError::Config(format!(
                    "{}: inverted id range [{}, {}]",
                    table, low, high
                )));
            }
            id_ranges.push((*low, *high));
        }

        Ok(Self {
            names: def.names.iter().map(|n| n.to_lowercase()).collect(),
            name_patterns: compile_all(&def.name_patterns)?,
            regions: def.regions.iter().map(|r| r.to_lowercase()).collect(),
            region_patterns: compile_all(&def.region_patterns)?,
            id_ranges,
        })
    }

    /// Whether any of the record's identifiers hit this table.
    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        if let Some(id) = record.numeric_id() {
            if self.id_ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&id)) {
                return true;
            }
        }

        let system = record.system.trim();
        let system_lower = system.to_lowercase();
        if self.names.iter().any(|n| *n == system_lower)
            || self.name_patterns.iter().any(|re| re.is_match(system))
        {
            return true;
        }

        match record.region.as_deref().map(str::trim) {
            Some(region) if !region.is_empty() => {
                let region_lower = region.to_lowercase();
                self.regions.iter().any(|r| *r == region_lower)
                    || self.region_patterns.iter().any(|re| re.is_match(region))
            }
            _ => false,
        }
    }

    /// Number of exact names in the table.
    pub fn name_count(&self) -> usize {
        self.names.len()
    }
}

// ── StaticRuleset ─────────────────────────────────────────────────────────────

/// On-disk ruleset document (`ruleset.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesetFile {
    /// Free-form version tag of the table data, e.g. the expansion name.
    pub version: String,
    pub thresholds: SecurityThresholds,
    pub special_space: SpaceTableDef,
    pub wormhole_space: SpaceTableDef,
}

/// Ruleset backed by static, versioned lookup tables.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleset {
    version: String,
    thresholds: SecurityThresholds,
    special_space: SpaceTable,
    wormhole_space: SpaceTable,
}

impl StaticRuleset {
    /// Compile a parsed ruleset document.
    pub fn from_document(file: &RulesetFile) -> Result<Self> {
        file.thresholds.validate()?;
        Ok(Self {
            version: file.version.clone(),
            thresholds: file.thresholds,
            special_space: SpaceTable::compile("special_space", &file.special_space)?,
            wormhole_space: SpaceTable::compile("wormhole_space", &file.wormhole_space)?,
        })
    }

    /// Parse and compile a ruleset from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: RulesetFile = serde_json::from_str(json)?;
        Self::from_document(&file)
    }

    /// Load a ruleset from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MerError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let ruleset = Self::from_json_str(&content)?;
        debug!(
            "Loaded ruleset '{}' from {} ({} special, {} wormhole names)",
            ruleset.version,
            path.display(),
            ruleset.special_space.name_count(),
            ruleset.wormhole_space.name_count()
        );
        Ok(ruleset)
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl ClassificationRuleset for StaticRuleset {
    fn is_special_space(&self, record: &NormalizedRecord) -> bool {
        self.special_space.matches(record)
    }

    fn is_wormhole_space(&self, record: &NormalizedRecord) -> bool {
        self.wormhole_space.matches(record)
    }

    fn thresholds(&self) -> SecurityThresholds {
        self.thresholds
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
