// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The scoped write session (S4.2 "Public contract" and "Commit algorithm").

use std::collections::{HashMap, HashSet};

use crate::entity::BatchOp;
use crate::error::{Error, Result};
use crate::model::{
    ContextAssociation, ContextKind, ContextState, Descriptor, Entity, Handle, MdibVersion, NodeType, State, Version,
};
use crate::report::{
    ContextReport, DescriptionModificationPart, DescriptionModificationReport, InvocationErrorKind, ModificationType,
    ReportBody, StateReport,
};

use super::mdib::Mdib;
use super::CommitOutcome;

/// A state touched through `get_state`/`add_state`, tracked against its
/// baseline (the value at transaction start, or `None` if newly created) so
/// the commit can tell an untouched copy from a real edit.
struct StagedState {
    baseline: Option<State>,
    working: State,
}

struct StagedContextState {
    baseline: Option<ContextState>,
    working: ContextState,
}

enum DescriptorEdit {
    Add { descriptor: Descriptor, initial_state: Option<State> },
    Update(Descriptor),
}

/// What an `OperationHandler::execute` (`provider::operation`) stages via
/// `Transaction::stage_execution_outcome`, carried through `commit` into
/// `CommitOutcome` so the provider runtime can translate it into the final
/// `InvocationState` without the transaction layer depending on the
/// provider layer (S4.7 step 3: `Fin`, `FinMod`, `Cnclld`, `CnclldMan`, `Fail`).
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Finished,
    FinishedWithModification,
    Cancelled,
    CancelledManually,
    Failed { kind: InvocationErrorKind, message: String },
}

/// A scoped write session against one `Mdib`. Changes are only visible to
/// the entity table once `commit` runs; dropping a `Transaction` without
/// committing discards everything staged so far, matching the "failure
/// discards all changes" rule without needing exception-style unwinding.
pub struct Transaction<'m> {
    mdib: &'m Mdib,
    states: HashMap<Handle, StagedState>,
    context_states: HashMap<Handle, StagedContextState>,
    descriptor_edits: HashMap<Handle, DescriptorEdit>,
    descriptor_removes: HashSet<Handle>,
    execution_outcome: Option<ExecutionOutcome>,
}

impl<'m> Transaction<'m> {
    pub(super) fn new(mdib: &'m Mdib) -> Self {
        Self {
            mdib,
            states: HashMap::new(),
            context_states: HashMap::new(),
            descriptor_edits: HashMap::new(),
            descriptor_removes: HashSet::new(),
            execution_outcome: None,
        }
    }

    /// Records the operation-invocation outcome this transaction's body is
    /// executing on behalf of (`provider::operation::OperationHandler::execute`),
    /// so `commit` can hand it back to the provider runtime in
    /// `CommitOutcome::staged_execution_outcome` (S4.7 step 3).
    pub fn stage_execution_outcome(&mut self, outcome: ExecutionOutcome) {
        self.execution_outcome = Some(outcome);
    }

    /// Working copy of a single state. First access snapshots the baseline
    /// from the table; later calls within the same transaction return the
    /// same staged copy.
    pub fn get_state(&mut self, handle: &Handle) -> Result<&mut State> {
        if !self.states.contains_key(handle) {
            let entity = self.mdib.table.get(handle).ok_or_else(|| Error::not_found(handle.clone()))?;
            let Entity::Single { state, .. } = entity else {
                return Err(Error::conflict(format!("{handle} addresses a multi-state descriptor")));
            };
            let state = state.ok_or_else(|| Error::not_found(handle.clone()))?;
            self.states.insert(
                handle.clone(),
                StagedState {
                    baseline: Some(state.clone()),
                    working: state,
                },
            );
        }
        Ok(&mut self.states.get_mut(handle).expect("just inserted").working)
    }

    /// Introduces a state for a descriptor that has none yet (S4.2
    /// `add_state`). Rejects a handle already staged to avoid silently
    /// clobbering an in-flight `get_state` copy.
    pub fn add_state(&mut self, state: State) -> Result<()> {
        let handle = state.core().descriptor_handle.clone();
        if self.states.contains_key(&handle) {
            return Err(Error::conflict(format!("state for {handle} already staged in this transaction")));
        }
        self.states.insert(handle, StagedState { baseline: None, working: state });
        Ok(())
    }

    /// Working copy of an existing context state, looked up by its own
    /// handle (distinct from the owning descriptor's handle).
    pub fn get_context_state(&mut self, state_handle: &Handle) -> Result<&mut ContextState> {
        if !self.context_states.contains_key(state_handle) {
            let owner = self
                .mdib
                .table
                .owner_of_context_state(state_handle)
                .ok_or_else(|| Error::not_found(state_handle.clone()))?;
            let entity = self.mdib.table.get(&owner).ok_or_else(|| Error::not_found(owner.clone()))?;
            let Entity::Multi { states, .. } = entity else {
                return Err(Error::conflict(format!("{owner} is not a context descriptor")));
            };
            let cs = states
                .get(state_handle)
                .cloned()
                .ok_or_else(|| Error::not_found(state_handle.clone()))?;
            self.context_states.insert(
                state_handle.clone(),
                StagedContextState {
                    baseline: Some(cs.clone()),
                    working: cs,
                },
            );
        }
        Ok(&mut self.context_states.get_mut(state_handle).expect("just inserted").working)
    }

    /// Creates a brand-new context state under an existing context
    /// descriptor, with a freshly generated handle.
    pub fn mk_context_state(&mut self, descriptor_handle: &Handle) -> Result<&mut ContextState> {
        let entity = self
            .mdib
            .table
            .get(descriptor_handle)
            .ok_or_else(|| Error::not_found(descriptor_handle.clone()))?;
        if !entity.descriptor().node_type().is_multi_state() {
            return Err(Error::conflict(format!("{descriptor_handle} is not a context descriptor")));
        }
        let descriptor_version = entity.descriptor().core().descriptor_version;
        let kind = context_kind_for(entity.descriptor().node_type())?;
        let new_handle = Handle::new(format!("{descriptor_handle}.ctxt.{}", uuid::Uuid::new_v4()))
            .expect("generated handle is never empty");
        let cs = ContextState::new(new_handle.clone(), descriptor_handle.clone(), descriptor_version, kind);
        self.context_states
            .insert(new_handle.clone(), StagedContextState { baseline: None, working: cs });
        Ok(&mut self.context_states.get_mut(&new_handle).expect("just inserted").working)
    }

    /// Stages a new descriptor, with an optional initial single state
    /// (ignored for context descriptors, which start with zero states).
    pub fn add_descriptor(&mut self, descriptor: Descriptor, state: Option<State>) -> Result<()> {
        let handle = descriptor.handle().clone();
        if self.descriptor_edits.contains_key(&handle) {
            return Err(Error::conflict(format!("{handle} already staged in this transaction")));
        }
        self.descriptor_edits
            .insert(handle, DescriptorEdit::Add { descriptor, initial_state: state });
        Ok(())
    }

    pub fn update_descriptor(&mut self, descriptor: Descriptor) -> Result<()> {
        let handle = descriptor.handle().clone();
        if matches!(self.descriptor_edits.get(&handle), Some(DescriptorEdit::Add { .. })) {
            return Err(Error::conflict(format!("{handle} was added in this transaction; cannot also update")));
        }
        self.descriptor_edits.insert(handle, DescriptorEdit::Update(descriptor));
        Ok(())
    }

    pub fn remove_descriptor(&mut self, handle: &Handle) -> Result<()> {
        if self.descriptor_edits.contains_key(handle) {
            return Err(Error::conflict(format!("{handle} already staged for add/update in this transaction")));
        }
        self.descriptor_removes.insert(handle.clone());
        Ok(())
    }

    /// Read-through: pending descriptor (if staged this transaction) or the
    /// table's committed copy (S4.2 `actual_descriptor`).
    pub fn actual_descriptor(&self, handle: &Handle) -> Result<Descriptor> {
        match self.descriptor_edits.get(handle) {
            Some(DescriptorEdit::Add { descriptor, .. }) => Ok(descriptor.clone()),
            Some(DescriptorEdit::Update(descriptor)) => Ok(descriptor.clone()),
            None => self
                .mdib
                .table
                .get(handle)
                .map(|e| e.descriptor().clone())
                .ok_or_else(|| Error::not_found(handle.clone())),
        }
    }

    fn is_empty(&self) -> bool {
        self.states.is_empty()
            && self.context_states.is_empty()
            && self.descriptor_edits.is_empty()
            && self.descriptor_removes.is_empty()
            && self.execution_outcome.is_none()
    }

    /// Runs the five-step commit algorithm (S4.2) and applies the result to
    /// the table in one `apply_batch` call.
    pub(super) fn commit(self) -> Result<CommitOutcome> {
        if self.is_empty() {
            return Ok(CommitOutcome {
                version_group: self.mdib.version_group(),
                reports: Vec::new(),
                staged_execution_outcome: None,
            });
        }

        // Step 3 (validated before any version is bumped, so a failed
        // commit never consumes mdib_version).
        self.validate()?;

        let next_mdib_version: MdibVersion = self.mdib.current_mdib_version().next();

        let mut added_handles = HashSet::new();
        let mut entities: HashMap<Handle, Entity> = HashMap::new();
        let mut description_parts = Vec::new();

        // Step 2 + apply step 1: descriptor adds/updates, each carrying its
        // own initial single state when supplied.
        for (handle, edit) in self.descriptor_edits {
            match edit {
                DescriptorEdit::Add { mut descriptor, initial_state } => {
                    let last_seen = self.mdib.table.last_seen_descriptor_version(&handle);
                    descriptor.core_mut().descriptor_version = Version::resume_after(last_seen);
                    let entity = if descriptor.node_type().is_multi_state() {
                        Entity::new_multi(descriptor.clone())
                    } else {
                        let state = initial_state.map(|mut s| {
                            let last_seen_state = self.mdib.table.last_seen_state_version(&handle);
                            s.core_mut().state_version = Version::resume_after(last_seen_state);
                            s.core_mut().descriptor_version = descriptor.core().descriptor_version;
                            s
                        });
                        Entity::Single { descriptor: descriptor.clone(), state }
                    };
                    description_parts.push(DescriptionModificationPart {
                        modification_type: ModificationType::Crt,
                        descriptor: descriptor.clone(),
                        states: match &entity {
                            Entity::Single { state: Some(s), .. } => vec![s.clone()],
                            _ => Vec::new(),
                        },
                        context_states: Vec::new(),
                    });
                    added_handles.insert(handle.clone());
                    entities.insert(handle, entity);
                }
                DescriptorEdit::Update(staged) => {
                    let mut entity = self
                        .mdib
                        .table
                        .get(&handle)
                        .ok_or_else(|| Error::not_found(handle.clone()))?;
                    let bumped = entity.descriptor().core().descriptor_version.next();
                    let core = entity.descriptor_mut().core_mut();
                    core.parent_handle = staged.core().parent_handle.clone();
                    core.coded_type = staged.core().coded_type.clone();
                    core.references = staged.core().references.clone();
                    core.retrievability = staged.core().retrievability.clone();
                    core.descriptor_version = bumped;
                    // A descriptor's owned state(s) carry their own copy of
                    // DescriptorVersion (S3: "every state's DescriptorHandle
                    // resolves to an existing descriptor with matching
                    // DescriptorVersion"); re-stamp them to the bumped value
                    // so the invariant holds even when nothing else about
                    // the state changed in this transaction.
                    match &mut entity {
                        Entity::Single { state: Some(s), .. } => s.core_mut().descriptor_version = bumped,
                        Entity::Multi { states, .. } => {
                            for state in states.values_mut() {
                                state.descriptor_version = bumped;
                            }
                        }
                        _ => {}
                    }
                    description_parts.push(DescriptionModificationPart {
                        modification_type: ModificationType::Upt,
                        descriptor: entity.descriptor().clone(),
                        states: match &entity {
                            Entity::Single { state: Some(s), .. } => vec![s.clone()],
                            _ => Vec::new(),
                        },
                        context_states: match &entity {
                            Entity::Multi { states, .. } => states.values().cloned().collect(),
                            _ => Vec::new(),
                        },
                    });
                    entities.insert(handle, entity);
                }
            }
        }

        // Removes: cascading subtree, captured before mutation for the Del parts.
        let mut removed_handles = HashSet::new();
        for root in &self.descriptor_removes {
            for handle in self.mdib.table.subtree_handles(root) {
                if let Some(entity) = self.mdib.table.get(&handle) {
                    description_parts.push(DescriptionModificationPart {
                        modification_type: ModificationType::Del,
                        descriptor: entity.descriptor().clone(),
                        states: match &entity {
                            Entity::Single { state: Some(s), .. } => vec![s.clone()],
                            _ => Vec::new(),
                        },
                        context_states: match &entity {
                            Entity::Multi { states, .. } => states.values().cloned().collect(),
                            _ => Vec::new(),
                        },
                    });
                }
                removed_handles.insert(handle);
            }
        }

        // Step 2 + apply: single-state touches, grouped for the report pass.
        let mut changed_single_states: Vec<State> = Vec::new();
        for (handle, staged) in self.states {
            let mut working = staged.working;
            let unchanged = staged
                .baseline
                .as_ref()
                .map(|b| b.data_eq(&working))
                .unwrap_or(false);
            if unchanged {
                continue;
            }
            let bumped = match &staged.baseline {
                Some(baseline) => baseline.core().state_version.next(),
                None => Version::resume_after(self.mdib.table.last_seen_state_version(&handle)),
            };
            working.core_mut().state_version = bumped;

            if let Some(entity) = entities.get_mut(&handle) {
                if let Entity::Single { state, .. } = entity {
                    *state = Some(working.clone());
                }
            } else {
                let mut entity = self.mdib.table.get(&handle).ok_or_else(|| Error::not_found(handle.clone()))?;
                working.core_mut().descriptor_version = entity.descriptor().core().descriptor_version;
                if let Entity::Single { state, .. } = &mut entity {
                    *state = Some(working.clone());
                } else {
                    return Err(Error::conflict(format!("{handle} is not a single-state descriptor")));
                }
                entities.insert(handle, entity);
            }
            changed_single_states.push(working);
        }

        // Step 2 + apply: context-state touches, merged into their owning
        // entity's state map. Association transitions stamp the binding /
        // unbinding MdibVersion automatically, since the caller cannot know
        // the committed version in advance.
        let mut changed_context_states: Vec<ContextState> = Vec::new();
        for (state_handle, staged) in self.context_states {
            let mut working = staged.working;
            let transitioned_to_assoc =
                working.association == ContextAssociation::Assoc
                    && staged.baseline.as_ref().map(|b| b.association) != Some(ContextAssociation::Assoc);
            let transitioned_away =
                staged.baseline.as_ref().map(|b| b.association) == Some(ContextAssociation::Assoc)
                    && working.association != ContextAssociation::Assoc;
            if transitioned_to_assoc {
                working.binding_mdib_version = Some(next_mdib_version);
            }
            if transitioned_away {
                working.unbinding_mdib_version = Some(next_mdib_version);
            }

            let unchanged = staged.baseline.as_ref().map(|b| b.data_eq(&working)).unwrap_or(false);
            if unchanged {
                continue;
            }
            let bumped = match &staged.baseline {
                Some(baseline) => baseline.state_version.next(),
                None => Version::resume_after(self.mdib.table.last_seen_state_version(&state_handle)),
            };
            working.state_version = bumped;

            let owner = working.descriptor_handle.clone();
            if let Some(entity) = entities.get_mut(&owner) {
                if let Entity::Multi { states, .. } = entity {
                    states.insert(state_handle, working.clone());
                }
            } else {
                let mut entity = self.mdib.table.get(&owner).ok_or_else(|| Error::not_found(owner.clone()))?;
                working.descriptor_version = entity.descriptor().core().descriptor_version;
                if let Entity::Multi { states, .. } = &mut entity {
                    states.insert(state_handle, working.clone());
                } else {
                    return Err(Error::conflict(format!("{owner} is not a context descriptor")));
                }
                entities.insert(owner, entity);
            }
            changed_context_states.push(working);
        }

        let mut ops: Vec<BatchOp> = Vec::new();
        for (handle, entity) in entities {
            if removed_handles.contains(&handle) {
                continue;
            }
            if added_handles.contains(&handle) {
                ops.push(BatchOp::Add(entity));
            } else {
                ops.push(BatchOp::Update(entity));
            }
        }
        for handle in &removed_handles {
            ops.push(BatchOp::Remove(handle.clone()));
        }

        self.mdib.table.apply_batch(ops)?;

        let mut version_group = self.mdib.version_group();
        version_group.mdib_version = next_mdib_version;
        self.mdib.set_version(version_group.clone());

        let reports = build_reports(version_group, description_parts, changed_single_states, changed_context_states);
        Ok(CommitOutcome {
            version_group: self.mdib.version_group(),
            reports,
            staged_execution_outcome: self.execution_outcome,
        })
    }

    /// Step 3: parent existence/profile fit, handle uniqueness (left to
    /// `EntityTable::apply_batch` for new descriptors, enforced here for
    /// conflicting dual edits), and context-association uniqueness.
    fn validate(&self) -> Result<()> {
        for (handle, edit) in &self.descriptor_edits {
            if let DescriptorEdit::Add { descriptor, .. } = edit {
                if let Some(parent_handle) = descriptor.parent_handle() {
                    let parent = self
                        .mdib
                        .table
                        .get(parent_handle)
                        .or_else(|| match self.descriptor_edits.get(parent_handle) {
                            Some(DescriptorEdit::Add { descriptor, .. }) => {
                                Some(Entity::new_single(descriptor.clone()))
                            }
                            _ => None,
                        })
                        .ok_or_else(|| Error::conflict(format!("{handle}: parent {parent_handle} does not exist")))?;
                    if !parent.descriptor().node_type().accepts_child(descriptor.node_type()) {
                        return Err(Error::conflict(format!(
                            "{handle}: {:?} does not accept a {:?} child",
                            parent.descriptor().node_type(),
                            descriptor.node_type()
                        )));
                    }
                } else if descriptor.node_type() != NodeType::Mds {
                    return Err(Error::conflict(format!("{handle}: only Mds may have no parent")));
                }
            }
            if self.mdib.table.get(handle).is_some() && matches!(edit, DescriptorEdit::Add { .. }) {
                return Err(Error::conflict(format!("handle already present: {handle}")));
            }
        }

        if self.descriptor_removes.intersection(&self.descriptor_edits.keys().cloned().collect()).next().is_some() {
            return Err(Error::conflict("a handle cannot be both removed and added/updated in one transaction"));
        }

        let mut touched_owners: HashSet<Handle> = HashSet::new();
        for cs in self.context_states.values() {
            touched_owners.insert(cs.working.descriptor_handle.clone());
        }
        for owner in touched_owners {
            let mut by_handle: HashMap<Handle, ContextAssociation> = HashMap::new();
            if let Some(Entity::Multi { states, .. }) = self.mdib.table.get(&owner) {
                for (h, s) in states {
                    by_handle.insert(h, s.association);
                }
            }
            for (h, staged) in &self.context_states {
                if staged.working.descriptor_handle == owner {
                    by_handle.insert(h.clone(), staged.working.association);
                }
            }
            let associated = by_handle.values().filter(|a| **a == ContextAssociation::Assoc).count();
            if associated > 1 {
                return Err(Error::conflict(format!("{owner}: more than one Associated context state")));
            }
        }
        Ok(())
    }
}

fn context_kind_for(node_type: NodeType) -> Result<ContextKind> {
    match node_type {
        NodeType::PatientContext => Ok(ContextKind::Patient),
        NodeType::LocationContext => Ok(ContextKind::Location),
        NodeType::EnsembleContext => Ok(ContextKind::Ensemble),
        NodeType::WorkflowContext => Ok(ContextKind::Workflow),
        NodeType::OperatorContext => Ok(ContextKind::Operator),
        NodeType::MeansContext => Ok(ContextKind::Means),
        other => Err(Error::conflict(format!("{other:?} is not a context descriptor type"))),
    }
}

/// Step 5: description-modification report first (if any descriptor
/// changed), then state reports grouped by report family.
fn build_reports(
    version_group: crate::model::MdibVersionGroup,
    description_parts: Vec<DescriptionModificationPart>,
    single_states: Vec<State>,
    context_states: Vec<ContextState>,
) -> Vec<ReportBody> {
    let mut reports = Vec::new();
    if !description_parts.is_empty() {
        reports.push(ReportBody::DescriptionModification(DescriptionModificationReport {
            version_group: version_group.clone(),
            parts: description_parts,
        }));
    }

    let mut by_family: HashMap<crate::model::ReportFamily, Vec<State>> = HashMap::new();
    let mut waveform_states = Vec::new();
    for state in single_states {
        match state.report_family() {
            crate::model::ReportFamily::Waveform => waveform_states.push(state),
            family => by_family.entry(family).or_default().push(state),
        }
    }
    use crate::model::ReportFamily;
    for family in [ReportFamily::Metric, ReportFamily::Alert, ReportFamily::Component, ReportFamily::Operational] {
        if let Some(states) = by_family.remove(&family) {
            let report = StateReport { family, version_group: version_group.clone(), states };
            reports.push(match family {
                ReportFamily::Metric => ReportBody::EpisodicMetric(report),
                ReportFamily::Alert => ReportBody::EpisodicAlert(report),
                ReportFamily::Component => ReportBody::EpisodicComponent(report),
                ReportFamily::Operational => ReportBody::EpisodicOperationalState(report),
                _ => unreachable!(),
            });
        }
    }
    if !waveform_states.is_empty() {
        reports.push(ReportBody::Waveform(crate::report::WaveformReport {
            version_group: version_group.clone(),
            states: waveform_states,
        }));
    }
    if !context_states.is_empty() {
        reports.push(ReportBody::EpisodicContext(ContextReport { version_group, states: context_states }));
    }
    reports
}
