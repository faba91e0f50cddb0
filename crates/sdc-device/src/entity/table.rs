// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The entity table (spec.md S4.1): multi-index concurrent storage for
//! `Entity` values, guarded by a single reader-writer lock (S5
//! "Shared-resource policy": "one reader-writer lock; writers acquire
//! exclusively, readers may be multiple").
//!
//! Grounded on the teacher's `LocalEndpointRegistry`
//! (`crates/hdds/src/dds/local_registry.rs`): a `RwLock`-guarded
//! `HashMap`-of-indices with small, focused accessor methods, generalized
//! here from a single topic-name index to the full index set S4.1 names.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::{CodedValue, Entity, Handle, NodeType, Version};

/// A single staged mutation for `EntityTable::apply_batch`.
pub enum BatchOp {
    Add(Entity),
    Update(Entity),
    Remove(Handle),
}

/// Secondary index selector for `EntityTable::get_by`.
pub enum Index<'a> {
    NodeType(NodeType),
    CodedValue(&'a CodedValue),
    ConditionSignaled(&'a Handle),
    Source(&'a Handle),
}

#[derive(Default)]
struct Inner {
    by_handle: HashMap<Handle, Entity>,
    by_parent: HashMap<Handle, HashSet<Handle>>,
    by_node_type: HashMap<NodeType, HashSet<Handle>>,
    by_coded_value: HashMap<CodedValue, HashSet<Handle>>,
    by_condition_signaled: HashMap<Handle, HashSet<Handle>>,
    by_source: HashMap<Handle, HashSet<Handle>>,
    /// Context-state handle -> owning descriptor handle (S4.1 "by child-state handle").
    by_context_state_handle: HashMap<Handle, Handle>,
    last_descriptor_version: HashMap<Handle, Version>,
    last_state_version: HashMap<Handle, Version>,
}

impl Inner {
    fn index_entity(&mut self, entity: &Entity) {
        let handle = entity.handle().clone();
        let descriptor = entity.descriptor();
        if let Some(parent) = descriptor.parent_handle() {
            self.by_parent.entry(parent.clone()).or_default().insert(handle.clone());
        }
        self.by_node_type
            .entry(descriptor.node_type())
            .or_default()
            .insert(handle.clone());
        if let Some(coded_type) = descriptor.core().coded_type.clone() {
            self.by_coded_value.entry(coded_type).or_default().insert(handle.clone());
        }
        if let Some(cond) = descriptor.core().references.condition_signaled.clone() {
            self.by_condition_signaled.entry(cond).or_default().insert(handle.clone());
        }
        for source in &descriptor.core().references.source {
            self.by_source.entry(source.clone()).or_default().insert(handle.clone());
        }
        if let Entity::Multi { states, .. } = entity {
            for state_handle in states.keys() {
                self.by_context_state_handle.insert(state_handle.clone(), handle.clone());
            }
        }
    }

    /// Records last-seen descriptor/state versions for every state this
    /// entity carries (single or, for context descriptors, every context
    /// state in its map) so a later remove-then-readd resumes numbering.
    fn record_last_seen(&mut self, entity: &Entity) {
        let handle = entity.handle().clone();
        self.last_descriptor_version
            .insert(handle.clone(), entity.descriptor().core().descriptor_version);
        match entity {
            Entity::Single { state: Some(state), .. } => {
                self.last_state_version.insert(handle, state.core().state_version);
            }
            Entity::Single { state: None, .. } => {}
            Entity::Multi { states, .. } => {
                for (state_handle, state) in states {
                    self.last_state_version.insert(state_handle.clone(), state.state_version);
                }
            }
        }
    }

    fn deindex_entity(&mut self, entity: &Entity) {
        let handle = entity.handle().clone();
        let descriptor = entity.descriptor();
        if let Some(parent) = descriptor.parent_handle() {
            if let Some(set) = self.by_parent.get_mut(parent) {
                set.remove(&handle);
                if set.is_empty() {
                    self.by_parent.remove(parent);
                }
            }
        }
        if let Some(set) = self.by_node_type.get_mut(&descriptor.node_type()) {
            set.remove(&handle);
        }
        if let Some(coded_type) = descriptor.core().coded_type.as_ref() {
            if let Some(set) = self.by_coded_value.get_mut(coded_type) {
                set.remove(&handle);
            }
        }
        if let Some(cond) = descriptor.core().references.condition_signaled.as_ref() {
            if let Some(set) = self.by_condition_signaled.get_mut(cond) {
                set.remove(&handle);
            }
        }
        for source in &descriptor.core().references.source {
            if let Some(set) = self.by_source.get_mut(source) {
                set.remove(&handle);
            }
        }
        if let Entity::Multi { states, .. } = entity {
            for state_handle in states.keys() {
                self.by_context_state_handle.remove(state_handle);
            }
        }
    }
}

/// The multi-index entity table.
#[derive(Default)]
pub struct EntityTable {
    inner: RwLock<Inner>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if `handle` collides with a live entity (S4.1).
    pub fn add(&self, entity: Entity) -> Result<()> {
        let mut inner = self.inner.write();
        let handle = entity.handle().clone();
        if inner.by_handle.contains_key(&handle) {
            return Err(Error::conflict(format!("handle already present: {handle}")));
        }
        inner.record_last_seen(&entity);
        inner.index_entity(&entity);
        inner.by_handle.insert(handle, entity);
        Ok(())
    }

    /// Removes an entity from every index; last-seen versions are preserved
    /// so a later re-add under the same handle resumes numbering (S3).
    pub fn remove(&self, handle: &Handle) -> Option<Entity> {
        let mut inner = self.inner.write();
        let entity = inner.by_handle.remove(handle)?;
        inner.deindex_entity(&entity);
        Some(entity)
    }

    /// Re-indexes `entity` in place. The caller guarantees `entity`'s handle
    /// is already present (identity preserved) — this is a full
    /// deindex/reindex pass so changed parent/coded-type/source fields are
    /// reflected.
    pub fn update(&self, entity: Entity) -> Result<()> {
        let mut inner = self.inner.write();
        let handle = entity.handle().clone();
        let Some(old) = inner.by_handle.remove(&handle) else {
            return Err(Error::not_found(handle));
        };
        inner.deindex_entity(&old);
        inner.record_last_seen(&entity);
        inner.index_entity(&entity);
        inner.by_handle.insert(handle, entity);
        Ok(())
    }

    pub fn get(&self, handle: &Handle) -> Option<Entity> {
        self.inner.read().by_handle.get(handle).cloned()
    }

    /// Asserts cardinality: `Ok(None)` only when `allow_none` and nothing matched.
    pub fn get_one(&self, handle: &Handle, allow_none: bool) -> Result<Option<Entity>> {
        match self.get(handle) {
            Some(entity) => Ok(Some(entity)),
            None if allow_none => Ok(None),
            None => Err(Error::not_found(handle.clone())),
        }
    }

    pub fn children_of(&self, handle: &Handle) -> Vec<Entity> {
        let inner = self.inner.read();
        inner
            .by_parent
            .get(handle)
            .map(|set| set.iter().filter_map(|h| inner.by_handle.get(h).cloned()).collect())
            .unwrap_or_default()
    }

    /// Recursively collects `handle` and every descendant (S3 cascading delete).
    pub fn subtree_handles(&self, handle: &Handle) -> Vec<Handle> {
        let inner = self.inner.read();
        let mut out = vec![handle.clone()];
        let mut frontier = vec![handle.clone()];
        while let Some(current) = frontier.pop() {
            if let Some(children) = inner.by_parent.get(&current) {
                for child in children {
                    out.push(child.clone());
                    frontier.push(child.clone());
                }
            }
        }
        out
    }

    pub fn get_by(&self, index: Index<'_>) -> Vec<Entity> {
        let inner = self.inner.read();
        let handles: Vec<Handle> = match index {
            Index::NodeType(nt) => inner.by_node_type.get(&nt).into_iter().flatten().cloned().collect(),
            Index::CodedValue(cv) => inner.by_coded_value.get(cv).into_iter().flatten().cloned().collect(),
            Index::ConditionSignaled(h) => inner
                .by_condition_signaled
                .get(h)
                .into_iter()
                .flatten()
                .cloned()
                .collect(),
            Index::Source(h) => inner.by_source.get(h).into_iter().flatten().cloned().collect(),
        };
        handles.into_iter().filter_map(|h| inner.by_handle.get(&h).cloned()).collect()
    }

    /// Owning descriptor handle for a context-state handle (S4.1 "by
    /// child-state handle").
    pub fn owner_of_context_state(&self, state_handle: &Handle) -> Option<Handle> {
        self.inner.read().by_context_state_handle.get(state_handle).cloned()
    }

    /// Descends matching each coding level; returns descendants of level N
    /// whose parent chain matches level N-1 ... 0 (S4.1).
    pub fn select_by_code_path(&self, codings: &[CodedValue]) -> Result<Vec<Entity>> {
        let Some((first, rest)) = codings.split_first() else {
            return Ok(Vec::new());
        };
        let mut candidates: Vec<Handle> = self
            .get_by(Index::CodedValue(first))
            .into_iter()
            .map(|e| e.handle().clone())
            .collect();
        for coding in rest {
            let matching_at_level: HashSet<Handle> = self
                .get_by(Index::CodedValue(coding))
                .into_iter()
                .map(|e| e.handle().clone())
                .collect();
            let mut next = Vec::new();
            for parent in &candidates {
                for child in self.children_of(parent) {
                    if matching_at_level.contains(child.handle()) {
                        next.push(child.handle().clone());
                    }
                }
            }
            candidates = next;
        }
        let inner = self.inner.read();
        Ok(candidates.into_iter().filter_map(|h| inner.by_handle.get(&h).cloned()).collect())
    }

    pub fn last_seen_descriptor_version(&self, handle: &Handle) -> Option<Version> {
        self.inner.read().last_descriptor_version.get(handle).copied()
    }

    pub fn last_seen_state_version(&self, handle: &Handle) -> Option<Version> {
        self.inner.read().last_state_version.get(handle).copied()
    }

    /// Applies every op under a single write-lock acquisition, so a
    /// transaction's commit (S4.2 step 4) is one atomic critical section
    /// rather than one lock acquisition per entity.
    pub fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut inner = self.inner.write();
        for op in &ops {
            if let BatchOp::Add(entity) = op {
                if inner.by_handle.contains_key(entity.handle()) {
                    return Err(Error::conflict(format!(
                        "handle already present: {}",
                        entity.handle()
                    )));
                }
            }
        }
        for op in ops {
            match op {
                BatchOp::Add(entity) => {
                    let handle = entity.handle().clone();
                    inner.record_last_seen(&entity);
                    inner.index_entity(&entity);
                    inner.by_handle.insert(handle, entity);
                }
                BatchOp::Update(entity) => {
                    let handle = entity.handle().clone();
                    if let Some(old) = inner.by_handle.remove(&handle) {
                        inner.deindex_entity(&old);
                    }
                    inner.record_last_seen(&entity);
                    inner.index_entity(&entity);
                    inner.by_handle.insert(handle, entity);
                }
                BatchOp::Remove(handle) => {
                    if let Some(entity) = inner.by_handle.remove(&handle) {
                        inner.deindex_entity(&entity);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_handle.is_empty()
    }

    /// Drops every entity and every last-seen version, for a cold restart
    /// (S4.6 "reload_all" / provider-side sequence_id rotation).
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        *inner = Inner::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::descriptor::{Descriptor, DescriptorCore, PlainDescriptor};

    fn mds(handle: &str) -> Entity {
        Entity::new_single(Descriptor::Mds(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), None),
        }))
    }

    fn vmd(handle: &str, parent: &str) -> Entity {
        Entity::new_single(Descriptor::Vmd(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), Some(Handle::from(parent))),
        }))
    }

    #[test]
    fn add_then_get_round_trips() {
        let table = EntityTable::new();
        table.add(mds("mds.0")).unwrap();
        assert!(table.get(&Handle::from("mds.0")).is_some());
    }

    #[test]
    fn duplicate_handle_is_rejected() {
        let table = EntityTable::new();
        table.add(mds("mds.0")).unwrap();
        assert!(table.add(mds("mds.0")).is_err());
    }

    #[test]
    fn children_of_returns_only_direct_children() {
        let table = EntityTable::new();
        table.add(mds("mds.0")).unwrap();
        table.add(vmd("vmd.0", "mds.0")).unwrap();
        table.add(vmd("vmd.1", "mds.0")).unwrap();
        let children = table.children_of(&Handle::from("mds.0"));
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn subtree_handles_includes_root_and_descendants() {
        let table = EntityTable::new();
        table.add(mds("mds.0")).unwrap();
        table.add(vmd("vmd.0", "mds.0")).unwrap();
        let subtree = table.subtree_handles(&Handle::from("mds.0"));
        assert_eq!(subtree.len(), 2);
    }

    #[test]
    fn remove_then_readd_preserves_last_seen_version() {
        let table = EntityTable::new();
        let mut entity = mds("mds.0");
        entity.descriptor_mut().core_mut().descriptor_version = Version(3);
        table.add(entity).unwrap();
        table.remove(&Handle::from("mds.0"));
        assert_eq!(
            table.last_seen_descriptor_version(&Handle::from("mds.0")),
            Some(Version(3))
        );
    }
}
