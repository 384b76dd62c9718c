//! Security-class classifier.
//!
//! Maps one [`NormalizedRecord`] to exactly one [`SecurityClass`]. Lookup
//! tables and thresholds come from the [`ClassificationRuleset`] handed over
//! at construction; the classifier itself holds no other state.

use std::sync::Arc;

use mer_core::models::{NormalizedRecord, SecurityClass};
use mer_core::ruleset::{ClassificationRuleset, SecurityThresholds};
use tracing::debug;

/// Pure record → class mapping backed by a shared ruleset.
#[derive(Clone)]
pub struct Classifier {
    ruleset: Arc<dyn ClassificationRuleset>,
}

impl Classifier {
    pub fn new<R>(ruleset: R) -> Self
    where
        R: ClassificationRuleset + 'static,
    {
        Self {
            ruleset: Arc::new(ruleset),
        }
    }

    /// Build from an already shared ruleset, e.g. one used by several workers.
    pub fn from_shared(ruleset: Arc<dyn ClassificationRuleset>) -> Self {
        Self { ruleset }
    }

    /// Classify a record. First match wins: special space, wormhole space,
    /// then the numeric security thresholds.
    pub fn classify(&self, record: &NormalizedRecord) -> SecurityClass {
        if self.ruleset.is_special_space(record) {
            return SecurityClass::Abyssal;
        }
        if self.ruleset.is_wormhole_space(record) {
            return SecurityClass::Wormhole;
        }
        match record.security_status {
            Some(status) => classify_status(&self.ruleset.thresholds(), status),
            None => {
                debug!("No security status for system {}", record.system);
                SecurityClass::Unknown
            }
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("thresholds", &self.ruleset.thresholds())
            .finish()
    }
}

/// Threshold step for a known status.
pub fn classify_status(thresholds: &SecurityThresholds, status: f64) -> SecurityClass {
    if !status.is_finite() {
        return SecurityClass::Unknown;
    }
    let s = thresholds.effective(status);
    if s >= thresholds.highsec_min {
        SecurityClass::Highsec
    } else if s > thresholds.nullsec_max {
        SecurityClass::Lowsec
    } else {
        SecurityClass::Nullsec
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
