//! Ordered pass pipeline.
//!
//! Catalog types are deduplicated first and references to them rewritten, so that
//! clinical facts pointing at different copies of the same catalog entry get the same
//! key when their own pass groups them. Aggregates that reference clinical facts come
//! last for the same reason.

use crate::assembly::{Partition, Placed};
use crate::collector::{Collected, DuplicateGroup, collect};
use crate::config::DedupConfig;
use crate::error::Result;
use crate::key::describe;
use crate::merge::merge_group;
use crate::provenance;
use crate::reconcile::ReconciliationTable;
use crate::references::{ReferenceMap, ReferenceRewriter};
use crate::report::DedupReport;
use crate::rules::{EquivalenceRule, ResourceRole, RuleRegistry};
use crate::sweep::{drop_dangling, hard_dependencies, prune_fields, prune_partition};
use octofhir_core::{Bundle, ResourceType};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

/// One step of the pipeline: the types it deduplicates, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub name: &'static str,
    pub types: Vec<ResourceType>,
}

impl Pass {
    pub fn new(name: &'static str, types: impl IntoIterator<Item = ResourceType>) -> Self {
        Self {
            name,
            types: types.into_iter().collect(),
        }
    }
}

/// Catalog entries, then clinical facts, then the aggregates referencing them.
pub fn standard_passes() -> Vec<Pass> {
    vec![
        Pass::new(
            "catalog",
            [
                ResourceType::Medication,
                ResourceType::Practitioner,
                ResourceType::Organization,
            ],
        ),
        Pass::new(
            "clinical-facts",
            [
                ResourceType::Condition,
                ResourceType::AllergyIntolerance,
                ResourceType::Immunization,
                ResourceType::Procedure,
                ResourceType::Observation,
                ResourceType::FamilyMemberHistory,
                ResourceType::MedicationStatement,
                ResourceType::MedicationRequest,
                ResourceType::MedicationAdministration,
            ],
        ),
        Pass::new(
            "aggregates",
            [ResourceType::DiagnosticReport, ResourceType::Encounter],
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub bundle: Bundle,
    pub report: DedupReport,
}

/// Redirects and removals produced by one pass.
#[derive(Debug, Default)]
struct PassState {
    redirects: ReferenceMap,
    removed: HashSet<String>,
}

/// Deduplication engine.
///
/// Holds no state between runs; one instance can process any number of bundles.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    config: DedupConfig,
    rules: RuleRegistry,
    reconciliation: ReconciliationTable,
    passes: Vec<Pass>,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            rules: RuleRegistry::standard(),
            reconciliation: ReconciliationTable::standard(),
            passes: standard_passes(),
        }
    }

    pub fn with_passes(mut self, passes: Vec<Pass>) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_reconciliation(mut self, reconciliation: ReconciliationTable) -> Self {
        self.reconciliation = reconciliation;
        self
    }

    /// Register an extra rule; its type still has to appear in a pass.
    pub fn with_rule<R: EquivalenceRule + 'static>(mut self, rule: R) -> Self {
        self.rules.register(rule);
        self
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Deduplicate one patient's bundle.
    pub fn deduplicate(&self, bundle: Bundle) -> DedupOutcome {
        let mut partition = Partition::new(bundle);
        let mut report = DedupReport {
            input_resources: partition.len(),
            ..Default::default()
        };

        for pass in &self.passes {
            let mut state = PassState::default();
            for resource_type in &pass.types {
                let Some(rule) = self.rules.get(resource_type) else {
                    debug!(pass = pass.name, %resource_type, "no rule registered, passing through");
                    continue;
                };
                self.deduplicate_type(rule, &mut partition, &mut state, &mut report);
            }

            let rewriter = ReferenceRewriter::new(&state.redirects, &self.config.provenance_url);
            let (rewritten, collapsed) = partition
                .resources_mut()
                .map(|placed| rewriter.rewrite_fields(&mut placed.resource.data))
                .fold((0, 0), |(r, c), stats| (r + stats.rewritten, c + stats.collapsed));
            let pruned = prune_partition(&mut partition, &state.removed, &self.config.provenance_url);
            report.pruned_references += pruned;

            debug!(
                pass = pass.name,
                redirects = state.redirects.redirects(),
                removed = state.removed.len(),
                rewritten,
                collapsed,
                pruned,
                "pass finished"
            );
        }

        let dropped = drop_dangling(&mut partition);
        if !dropped.is_empty() {
            let removed: HashSet<String> = dropped.iter().cloned().collect();
            report.pruned_references +=
                prune_partition(&mut partition, &removed, &self.config.provenance_url);
        }
        report.dangling_removed = dropped;

        let bundle = partition.reassemble();
        report.output_resources = bundle.resources().count();

        info!(
            input = report.input_resources,
            output = report.output_resources,
            merged = report.merged(),
            excluded = report.excluded(),
            dangling = report.dangling_removed.len(),
            pruned = report.pruned_references,
            "bundle deduplicated"
        );

        DedupOutcome { bundle, report }
    }

    fn deduplicate_type(
        &self,
        rule: &dyn EquivalenceRule,
        partition: &mut Partition,
        state: &mut PassState,
        report: &mut DedupReport,
    ) {
        let resource_type = rule.resource_type();
        let resources = partition.take(&resource_type);
        if resources.is_empty() {
            return;
        }
        let input = resources.len();

        let (collected, excluded, pruned) = self.settle(rule, resources, state);
        report.pruned_references += pruned;

        let mut survivors: Vec<Placed> = Vec::with_capacity(input);
        let mut groups = 0;
        let mut merged = 0;
        for group in collected.groups {
            if !group.is_duplicate() {
                survivors.extend(group.members);
                continue;
            }
            groups += 1;
            merged += group.members.len() - 1;
            if let Some(master) = self.merge(rule, group, state) {
                survivors.push(master);
            }
        }
        survivors.extend(collected.singles);

        for placed in &mut survivors {
            rule.scrub(&mut placed.resource);
        }
        survivors.sort_by_key(|placed| placed.position);
        partition.put(resource_type.clone(), survivors);

        let stats = report.stats_mut(resource_type.as_str());
        stats.input += input;
        stats.groups += groups;
        stats.merged += merged;
        stats.excluded += excluded;
    }

    /// Collect until grouping is stable.
    ///
    /// Excluding a resource prunes references to it from the remaining resources of the
    /// same type, and references between them are pointed at their group's seed; either
    /// can change a key (an `Observation` whose members were removed or merged), so the
    /// type is collected again until neither happens.
    fn settle(
        &self,
        rule: &dyn EquivalenceRule,
        mut pending: Vec<Placed>,
        state: &mut PassState,
    ) -> (Collected, usize, usize) {
        let resource_type = rule.resource_type();
        let url = self.config.provenance_url.as_str();
        let skip = hard_dependencies(&resource_type);
        let limit = pending.len() + 1;
        let mut excluded = 0;
        let mut pruned = 0;
        let mut round = 0;

        loop {
            round += 1;
            let mut collected = collect(rule, pending, &self.config);

            excluded += collected.excluded.len();
            let removed: HashSet<String> = collected
                .excluded
                .drain(..)
                .map(|(placed, _)| describe(&placed.resource))
                .collect();

            let mut siblings = ReferenceMap::new();
            for group in &collected.groups {
                record_redirects(group, &mut siblings);
            }
            let rewriter = ReferenceRewriter::new(&siblings, url);

            let mut changed = false;
            for placed in collected.kept_mut() {
                let count = prune_fields(&mut placed.resource.data, &removed, skip, url);
                let stats = rewriter.rewrite_fields(&mut placed.resource.data);
                pruned += count;
                changed |= count > 0 || stats.rewritten > 0 || stats.collapsed > 0;
            }
            state.removed.extend(removed);

            if !changed || round >= limit {
                return (collected, excluded, pruned);
            }
            debug!(%resource_type, round, "references changed, collecting again");
            pending = collected.into_kept();
        }
    }

    fn merge(
        &self,
        rule: &dyn EquivalenceRule,
        group: DuplicateGroup,
        state: &mut PassState,
    ) -> Option<Placed> {
        let position = group.members.first()?.position;
        let mut master = merge_group(
            group.members.iter().map(|placed| &placed.resource),
            &self.reconciliation,
        )?;

        if rule.role() == ResourceRole::Fact {
            let originals: Vec<String> = group
                .members
                .iter()
                .filter_map(|placed| placed.resource.reference())
                .collect();
            provenance::attach(
                &mut master,
                originals.iter().map(String::as_str),
                &self.config.provenance_url,
            );
        }
        record_redirects(&group, &mut state.redirects);

        debug!(
            resource_type = %master.resource_type,
            key = %group.key,
            members = group.members.len(),
            master = %describe(&master),
            "merged duplicate group"
        );
        Some(Placed::new(position, master))
    }
}

/// Point every member of a group at its seed.
fn record_redirects(group: &DuplicateGroup, map: &mut ReferenceMap) {
    let Some(target) = group.members.first().and_then(|seed| seed.resource.reference()) else {
        return;
    };
    for member in &group.members {
        if let Some(reference) = member.resource.reference() {
            map.insert(reference, target.clone());
        }
    }
}

/// Deduplicate a bundle with the default configuration.
pub fn deduplicate(bundle: Bundle) -> Bundle {
    Deduplicator::default().deduplicate(bundle).bundle
}

/// Deduplicate a bundle document.
///
/// Fails only when `value` is not a Bundle.
pub fn deduplicate_json(value: Value) -> Result<Value> {
    let bundle = Bundle::from_value(value)?;
    Ok(deduplicate(bundle).to_value()?)
}
