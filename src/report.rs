use serde::{Deserialize, Serialize};

use crate::convert::ConvertCounts;

/// Structured counts returned on a successful run. Every skipped pair,
/// synthesized parent, and per-field fallback is reflected here; nothing is
/// swallowed silently.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStats {
    pub labels: u64,
    pub homes: u64,
    pub policies: u64,
    pub locations: u64,
    pub items: u64,
    pub item_labels: u64,
    pub home_policies: u64,

    pub skipped_item_labels: u64,
    pub skipped_home_policies: u64,
    pub backfilled_item_homes: u64,
    pub single_home_assignments: u64,
    pub synthesized_homes: u64,

    pub color_fallbacks: u64,
    pub photo_list_fallbacks: u64,
    pub money_fallbacks: u64,
}

impl MigrationStats {
    pub fn absorb_convert_counts(&mut self, counts: &ConvertCounts) {
        self.color_fallbacks += counts.color_fallbacks;
        self.photo_list_fallbacks += counts.photo_list_fallbacks;
        self.money_fallbacks += counts.money_fallbacks;
    }
}
