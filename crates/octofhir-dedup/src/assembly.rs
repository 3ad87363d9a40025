//! Partitioning a bundle into per-type working sets and putting it back together.

use indexmap::IndexMap;
use octofhir_core::{Bundle, BundleEntry, Resource, ResourceType};

/// A resource together with the index of the entry it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub position: usize,
    pub resource: Resource,
}

impl Placed {
    pub fn new(position: usize, resource: Resource) -> Self {
        Self { position, resource }
    }
}

/// Working state of one run: resources by type, plus what is needed to rebuild the
/// bundle around them.
#[derive(Debug)]
pub struct Partition {
    header: Bundle,
    envelopes: Vec<BundleEntry>,
    working: IndexMap<ResourceType, Vec<Placed>>,
}

impl Partition {
    pub fn new(mut bundle: Bundle) -> Self {
        let entries = std::mem::take(&mut bundle.entries);
        let mut envelopes = Vec::with_capacity(entries.len());
        let mut working: IndexMap<ResourceType, Vec<Placed>> = IndexMap::new();

        for mut entry in entries {
            let Some(resource) = entry.resource.take() else {
                continue;
            };
            let position = envelopes.len();
            envelopes.push(entry);
            working
                .entry(resource.resource_type.clone())
                .or_default()
                .push(Placed::new(position, resource));
        }

        Self {
            header: bundle,
            envelopes,
            working,
        }
    }

    pub fn len(&self) -> usize {
        self.working.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_of(&self, resource_type: &ResourceType) -> usize {
        self.working.get(resource_type).map(Vec::len).unwrap_or(0)
    }

    /// Remove and return every resource of a type, in entry order.
    pub fn take(&mut self, resource_type: &ResourceType) -> Vec<Placed> {
        self.working
            .get_mut(resource_type)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn put(&mut self, resource_type: ResourceType, resources: Vec<Placed>) {
        self.working.entry(resource_type).or_default().extend(resources);
    }

    pub fn resources(&self) -> impl Iterator<Item = &Placed> {
        self.working.values().flatten()
    }

    pub fn resources_mut(&mut self) -> impl Iterator<Item = &mut Placed> {
        self.working.values_mut().flatten()
    }

    /// Keep only the resources for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Placed) -> bool) {
        for resources in self.working.values_mut() {
            resources.retain(&mut keep);
        }
    }

    /// Rebuild the bundle in original entry order.
    ///
    /// Each resource goes back into the envelope of the entry it arrived in; a merged
    /// master sits where its seed member was. `total` is set to the surviving entry count.
    pub fn reassemble(self) -> Bundle {
        let Partition {
            mut header,
            mut envelopes,
            working,
        } = self;

        let mut placed: Vec<Placed> = working.into_values().flatten().collect();
        placed.sort_by_key(|p| p.position);

        header.entries = placed
            .into_iter()
            .map(|Placed { position, resource }| {
                let mut entry = envelopes
                    .get_mut(position)
                    .map(std::mem::take)
                    .unwrap_or_default();
                entry.resource = Some(resource);
                entry
            })
            .collect();

        header.total = Some(u32::try_from(header.entries.len()).unwrap_or(u32::MAX));
        header
    }
}
