//! Group collector: assigns each resource of one type to a duplicate group.

use crate::assembly::Placed;
use crate::config::{DedupConfig, MissingDatePolicy};
use crate::key::{Exclusion, GroupKey, KeyOutcome, describe};
use crate::rules::EquivalenceRule;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Resources judged equivalent, richest first.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub key: GroupKey,
    pub members: Vec<Placed>,
}

impl DuplicateGroup {
    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }
}

#[derive(Debug, Default)]
pub struct Collected {
    pub groups: Vec<DuplicateGroup>,
    /// Kept as-is, outside of any group
    pub singles: Vec<Placed>,
    pub excluded: Vec<(Placed, Exclusion)>,
}

impl Collected {
    /// Every kept resource, grouped or not.
    pub fn kept_mut(&mut self) -> impl Iterator<Item = &mut Placed> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.members.iter_mut())
            .chain(self.singles.iter_mut())
    }

    /// Every kept resource back in entry order, e.g. to collect again.
    pub fn into_kept(self) -> Vec<Placed> {
        let mut kept: Vec<Placed> = self
            .groups
            .into_iter()
            .flat_map(|group| group.members)
            .chain(self.singles)
            .collect();
        kept.sort_by_key(|p| p.position);
        kept
    }
}

struct Slot {
    key: GroupKey,
    members: Vec<(usize, Placed)>,
}

/// Group one type's resources with its rule.
///
/// Resources are ordered richest-first (stable, so entry order breaks ties) before
/// grouping. Exact keys land in their bucket directly; overlap keys are compared with
/// the groups sharing their date. A resource matching several groups joins them into
/// one, so the outcome does not depend on scan order.
pub fn collect(rule: &dyn EquivalenceRule, resources: Vec<Placed>, config: &DedupConfig) -> Collected {
    let mut resources = resources;
    resources.sort_by_key(|p| std::cmp::Reverse(rule.richness(&p.resource)));

    let mut collected = Collected::default();
    let mut slots: Vec<Option<Slot>> = Vec::new();
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();

    for (rank, placed) in resources.into_iter().enumerate() {
        let key = match rule.key(&placed.resource) {
            Ok(KeyOutcome::Keyed(key)) => key,
            Ok(KeyOutcome::Unique) => {
                collected.singles.push(placed);
                continue;
            }
            Ok(KeyOutcome::Excluded(Exclusion::UnrecognizedCode)) if !config.drop_unrecognized => {
                collected.singles.push(placed);
                continue;
            }
            Ok(KeyOutcome::Excluded(reason)) => {
                debug!(resource = %describe(&placed.resource), %reason, "excluding resource");
                collected.excluded.push((placed, reason));
                continue;
            }
            Err(e) => {
                match config.missing_date_policy {
                    MissingDatePolicy::KeepSingleton => {
                        warn!(error = %e, "keeping resource ungrouped");
                        collected.singles.push(placed);
                    }
                    MissingDatePolicy::Exclude => {
                        warn!(error = %e, "excluding resource");
                        collected.excluded.push((placed, Exclusion::MissingDate));
                    }
                }
                continue;
            }
        };

        let bucket = buckets.entry(key.bucket().to_string()).or_default();
        let matching: Vec<usize> = bucket
            .iter()
            .copied()
            .filter(|&i| slots[i].as_ref().is_some_and(|slot| rule.matches(&slot.key, &key)))
            .collect();

        let Some((&target, others)) = matching.split_first() else {
            bucket.push(slots.len());
            slots.push(Some(Slot {
                key,
                members: vec![(rank, placed)],
            }));
            continue;
        };

        for &other in others {
            if let Some(absorbed) = slots[other].take() {
                bucket.retain(|&i| i != other);
                if let Some(slot) = slots[target].as_mut() {
                    slot.key.absorb(&absorbed.key);
                    slot.members.extend(absorbed.members);
                }
            }
        }
        if let Some(slot) = slots[target].as_mut() {
            slot.key.absorb(&key);
            slot.members.push((rank, placed));
        }
    }

    collected.groups = slots
        .into_iter()
        .flatten()
        .map(|mut slot| {
            slot.members.sort_by_key(|(rank, _)| *rank);
            DuplicateGroup {
                key: slot.key,
                members: slot.members.into_iter().map(|(_, placed)| placed).collect(),
            }
        })
        .collect();
    collected
}
