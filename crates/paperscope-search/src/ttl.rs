//! Cache TTL policy.
//!
//! The cache executes whichever TTL class it is told; choosing the
//! class from the query's detected fields happens here. Clinical
//! literature moves slowly enough for a week, methods and foundational
//! topics for a month, everything else gets the default day.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use paperscope_config::CacheConfig;

use crate::fields::FieldScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// 24 hours.
    Default,
    /// 7 days.
    Extended,
    /// 30 days.
    Archival,
}

impl TtlClass {
    pub fn duration(&self, cfg: &CacheConfig) -> Duration {
        let hours = match self {
            TtlClass::Default  => cfg.ttl_default_hours,
            TtlClass::Extended => cfg.ttl_extended_hours,
            TtlClass::Archival => cfg.ttl_archival_hours,
        };
        Duration::from_secs(hours * 3600)
    }
}

/// Field tags whose results stay fresh for a week.
const EXTENDED_FIELDS: &[&str] = &["epilepsy_ieeg", "clinical_neuroscience", "genomics"];

/// Field tags whose results stay fresh for a month.
const ARCHIVAL_FIELDS: &[&str] = &["machine_learning", "dynamical_systems", "signal_processing"];

/// Pick the TTL class for a query from its detected fields. The
/// top-ranked field decides; no detection means the default class.
pub fn ttl_class_for(fields: &[FieldScore]) -> TtlClass {
    let Some(top) = fields.first() else {
        return TtlClass::Default;
    };

    if EXTENDED_FIELDS.contains(&top.field.as_str()) {
        TtlClass::Extended
    } else if ARCHIVAL_FIELDS.contains(&top.field.as_str()) {
        TtlClass::Archival
    } else {
        TtlClass::Default
    }
}
