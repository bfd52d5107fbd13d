use std::collections::{HashMap, HashSet};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::MigrationError;
use crate::id::new_stable_id;
use crate::model::{HomeRecord, LegacySnapshot};
use crate::probe::SchemaCapabilities;
use crate::report::MigrationStats;

/// Join rows with both endpoints resolved to stable identifiers.
#[derive(Debug, Default)]
pub struct ResolvedJoins {
    pub item_labels: Vec<(Uuid, Uuid)>,
    pub home_policies: Vec<(Uuid, Uuid)>,
}

/// Reconstruct every cross-entity link from whichever representation the
/// detected generation used, repairing what the legacy schema failed to
/// record. Runs only after all readers have completed, so every identifier
/// map is available.
pub fn resolve(
    snapshot: &mut LegacySnapshot,
    caps: &SchemaCapabilities,
    stats: &mut MigrationStats,
) -> Result<ResolvedJoins, MigrationError> {
    let mut joins = ResolvedJoins::default();

    resolve_direct_links(snapshot);
    backfill_item_homes(snapshot, stats);

    if !caps.multi_home() && !snapshot.homes.is_empty() {
        apply_single_home_rule(snapshot, stats);
    }

    let synthesized = synthesize_orphan_parent(snapshot, stats);

    joins.item_labels = resolve_item_labels(snapshot, caps, stats);
    joins.home_policies = resolve_home_policies(snapshot, caps, stats, synthesized);

    // Synthesis above guarantees a home whenever content exists; this guard
    // is the hard backstop should that invariant ever break.
    debug_assert!(!snapshot.has_content() || !snapshot.homes.is_empty());
    if snapshot.homes.is_empty() && snapshot.has_content() {
        return Err(MigrationError::NoHomes);
    }

    info!(
        target: "hearthbook",
        event = "relationships_resolved",
        item_labels = joins.item_labels.len(),
        home_policies = joins.home_policies.len(),
        skipped_item_labels = stats.skipped_item_labels,
        skipped_home_policies = stats.skipped_home_policies,
        backfilled_item_homes = stats.backfilled_item_homes,
        single_home_assignments = stats.single_home_assignments,
        synthesized_homes = stats.synthesized_homes
    );

    Ok(joins)
}

fn resolve_direct_links(snapshot: &mut LegacySnapshot) {
    for location in &mut snapshot.locations {
        location.home_id = location
            .legacy_home_id
            .and_then(|id| snapshot.maps.homes.get(id));
    }
    for item in &mut snapshot.items {
        item.location_id = item
            .legacy_location_id
            .and_then(|id| snapshot.maps.locations.get(id));
        item.home_id = item
            .legacy_home_id
            .and_then(|id| snapshot.maps.homes.get(id));
    }
}

/// Repair schemas from the generation that recorded location→home but not
/// item→home: an item inherits its location's home transitively.
fn backfill_item_homes(snapshot: &mut LegacySnapshot, stats: &mut MigrationStats) {
    let location_homes: HashMap<Uuid, Uuid> = snapshot
        .locations
        .iter()
        .filter_map(|l| l.home_id.map(|h| (l.id, h)))
        .collect();

    for item in &mut snapshot.items {
        if item.home_id.is_none() {
            if let Some(home) = item.location_id.and_then(|l| location_homes.get(&l)) {
                item.home_id = Some(*home);
                stats.backfilled_item_homes += 1;
            }
        }
    }
}

/// The generation predating multi-home support recorded no parent links at
/// all. Mirror the legacy single-active-home selection: the first home the
/// user demonstrably touched, else the most recently created one.
fn apply_single_home_rule(snapshot: &mut LegacySnapshot, stats: &mut MigrationStats) {
    let chosen = snapshot
        .homes
        .iter()
        .find(|h| h.looks_real())
        .or_else(|| {
            snapshot.homes.iter().max_by(|a, b| {
                let a_created = a.created_offset.unwrap_or(f64::MIN);
                let b_created = b.created_offset.unwrap_or(f64::MIN);
                a_created
                    .partial_cmp(&b_created)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        })
        .map(|h| h.id);

    let Some(home) = chosen else { return };

    for location in &mut snapshot.locations {
        if location.home_id.is_none() {
            location.home_id = Some(home);
            stats.single_home_assignments += 1;
        }
    }
    for item in &mut snapshot.items {
        if item.home_id.is_none() {
            item.home_id = Some(home);
            stats.single_home_assignments += 1;
        }
    }
}

/// Repeated legacy first-run flows could leave user content with no home row
/// at all. Synthesize exactly one placeholder parent so every row written
/// has a valid relationship; counted as an addition, never a loss.
fn synthesize_orphan_parent(
    snapshot: &mut LegacySnapshot,
    stats: &mut MigrationStats,
) -> Option<Uuid> {
    if !snapshot.homes.is_empty() || !snapshot.has_content() {
        return None;
    }

    let home = HomeRecord {
        id: new_stable_id(),
        ..HomeRecord::default()
    };
    let home_id = home.id;
    warn!(
        target: "hearthbook",
        event = "orphan_home_synthesized",
        home_id = %home_id
    );
    snapshot.homes.push(home);
    stats.synthesized_homes += 1;

    for location in &mut snapshot.locations {
        location.home_id = Some(home_id);
    }
    for item in &mut snapshot.items {
        if item.home_id.is_none() {
            item.home_id = Some(home_id);
        }
    }

    Some(home_id)
}

fn resolve_item_labels(
    snapshot: &LegacySnapshot,
    caps: &SchemaCapabilities,
    stats: &mut MigrationStats,
) -> Vec<(Uuid, Uuid)> {
    let legacy_pairs: Vec<(i64, i64)> = if caps.item_labels_table {
        snapshot.item_label_pairs.clone()
    } else if caps.items_label_column {
        snapshot
            .items
            .iter()
            .filter_map(|i| i.legacy_label_id.map(|l| (i.legacy_id, l)))
            .collect()
    } else {
        Vec::new()
    };

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for (item_legacy, label_legacy) in legacy_pairs {
        match (
            snapshot.maps.items.get(item_legacy),
            snapshot.maps.labels.get(label_legacy),
        ) {
            (Some(item), Some(label)) => {
                if seen.insert((item, label)) {
                    resolved.push((item, label));
                }
            }
            _ => stats.skipped_item_labels += 1,
        }
    }
    resolved
}

fn resolve_home_policies(
    snapshot: &LegacySnapshot,
    caps: &SchemaCapabilities,
    stats: &mut MigrationStats,
    synthesized: Option<Uuid>,
) -> Vec<(Uuid, Uuid)> {
    let legacy_pairs: Vec<(i64, i64)> = if caps.home_policies_table {
        snapshot.home_policy_pairs.clone()
    } else if caps.policies_home_column {
        snapshot
            .policies
            .iter()
            .filter_map(|p| p.legacy_home_id.map(|h| (h, p.legacy_id)))
            .collect()
    } else {
        Vec::new()
    };

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    let mut covered: HashSet<Uuid> = HashSet::new();
    for (home_legacy, policy_legacy) in legacy_pairs {
        match (
            snapshot.maps.homes.get(home_legacy),
            snapshot.maps.policies.get(policy_legacy),
        ) {
            (Some(home), Some(policy)) => {
                if seen.insert((home, policy)) {
                    resolved.push((home, policy));
                    covered.insert(policy);
                }
            }
            _ => stats.skipped_home_policies += 1,
        }
    }

    // Policies the generation had no way to place: attach to the single
    // surviving home (pre-multi-home stores and the synthesized parent).
    let fallback = if let Some(home) = synthesized {
        Some(home)
    } else if !caps.home_policies_table && !caps.policies_home_column {
        snapshot
            .locations
            .iter()
            .find_map(|l| l.home_id)
            .or_else(|| snapshot.items.iter().find_map(|i| i.home_id))
            .or_else(|| snapshot.homes.first().map(|h| h.id))
    } else {
        None
    };
    if let Some(home) = fallback {
        for policy in &snapshot.policies {
            if !covered.contains(&policy.id) && seen.insert((home, policy.id)) {
                resolved.push((home, policy.id));
            }
        }
    }

    resolved
}
