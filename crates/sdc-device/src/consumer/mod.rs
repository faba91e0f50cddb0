// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The consumer mirror (spec.md S4.8): maintains an up-to-date replica of a
//! single provider's MDIB from incoming reports, with strict version
//! discipline. Grounded on `sdc11073.entitymdib.consumermdib.EntityConsumerMdib`.

pub mod waveform;

pub use waveform::{RtSample, WaveformRing};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::adapters::get_service::GetServiceClient;
use crate::adapters::logging::{DeviceLogger, LogLevel};
use crate::config::ConsumerConfig;
use crate::entity::EntityTable;
use crate::error::Result;
use crate::model::state::RtsaMetricState;
use crate::model::{
    ContextState, Descriptor, Entity, Handle, MdibVersion, MdibVersionGroup, State, Version,
};
use crate::report::{DescriptionModificationPart, ModificationType, ReportBody};

const LOG_TARGET: &str = "sdc.consumer.mdib";

/// The bootstrap/live-gate state (S9 "Buffered notifications during
/// consumer bootstrap"): the gate starts `Buffering`, flips to `Live` once
/// `init_mdib` drains the buffer, and latches to `SequenceChanged` on a
/// `sequence_id` mismatch until the application calls `reload_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Gate {
    Buffering,
    Live,
    SequenceChanged { old: String, new: String },
}

/// A mirror of a single provider's MDIB, updated from incoming reports
/// (S4.8). Owns no threads and no network connection of its own: the host
/// application feeds it via `on_notification` as messages arrive, exactly
/// as `Provider::execute_pending` is host-driven (S5).
pub struct Consumer {
    table: EntityTable,
    version: RwLock<MdibVersionGroup>,
    gate: RwLock<Gate>,
    buffer: Mutex<Vec<ReportBody>>,
    waveforms: Mutex<HashMap<Handle, WaveformRing>>,
    apply_mutex: Mutex<()>,
    get_service: Arc<dyn GetServiceClient>,
    config: ConsumerConfig,
    logger: Arc<dyn DeviceLogger>,
    /// `sdc11073`'s `SdcConsumer.all_subscribed`, supplemented per
    /// SPEC_FULL S2: only log a version-gap warning once the consumer
    /// believes it is subscribed to everything.
    all_subscribed: AtomicBool,
}

impl Consumer {
    /// Constructs a mirror in the `Buffering` gate. Incoming reports may be
    /// handed to `on_notification` immediately, before `init_mdib` runs
    /// (S4.8 step 1: "bind to the provider's observable report streams
    /// *before* issuing GetMdib, to avoid missing notifications").
    pub fn new(get_service: Arc<dyn GetServiceClient>, config: ConsumerConfig, logger: Arc<dyn DeviceLogger>) -> Self {
        Self {
            table: EntityTable::new(),
            version: RwLock::new(MdibVersionGroup::new(MdibVersion::initial(), String::new())),
            gate: RwLock::new(Gate::Buffering),
            buffer: Mutex::new(Vec::new()),
            waveforms: Mutex::new(HashMap::new()),
            apply_mutex: Mutex::new(()),
            get_service,
            config,
            logger,
            all_subscribed: AtomicBool::new(true),
        }
    }

    pub fn table(&self) -> &EntityTable {
        &self.table
    }

    pub fn version_group(&self) -> MdibVersionGroup {
        self.version.read().clone()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.gate.read(), Gate::Live)
    }

    pub fn sequence_id_changed(&self) -> bool {
        matches!(*self.gate.read(), Gate::SequenceChanged { .. })
    }

    /// S9 "Open questions" supplement: only warn on a forward version gap
    /// once the application believes every report family is subscribed.
    pub fn set_all_subscribed(&self, value: bool) {
        self.all_subscribed.store(value, Ordering::Relaxed);
    }

    /// S4.8 steps 2-5: `GetMdib`, optional `GetContextStates`, drains the
    /// buffer, marks the mirror initialized.
    pub fn init_mdib(&self) -> Result<()> {
        self.bootstrap()
    }

    /// Re-runs the full bootstrap sequence, clearing all existing data
    /// first (S4.8, S7 "SequenceIdChanged: halt report application; require
    /// explicit reload_all"; S9 "explicit application-initiated reload").
    pub fn reload_all(&self) -> Result<()> {
        let _guard = self.apply_mutex.lock();
        self.table.clear();
        self.waveforms.lock().clear();
        *self.gate.write() = Gate::Buffering;
        self.bootstrap_locked()
    }

    fn bootstrap(&self) -> Result<()> {
        let _guard = self.apply_mutex.lock();
        self.bootstrap_locked()
    }

    /// Caller must already hold `apply_mutex`.
    fn bootstrap_locked(&self) -> Result<()> {
        let response = self.get_service.get_mdib()?;
        let has_context_states = response
            .entities
            .iter()
            .any(|e| matches!(e, Entity::Multi { states, .. } if !states.is_empty()));

        for entity in response.entities {
            self.table.add(entity)?;
        }
        *self.version.write() = response.version_group;

        if !has_context_states {
            let response = self.get_service.get_context_states(&[])?;
            for state in response.states {
                self.merge_bootstrap_context_state(state);
            }
        } else {
            self.logger.log(
                LogLevel::Info,
                LOG_TARGET,
                "found context states in GetMdib result, skipping GetContextStates",
            );
        }

        let buffered: Vec<ReportBody> = std::mem::take(&mut *self.buffer.lock());
        for report in buffered {
            self.apply_report(report, true);
        }

        *self.gate.write() = Gate::Live;
        self.logger.log(LogLevel::Info, LOG_TARGET, "initializing mdib done");
        Ok(())
    }

    fn merge_bootstrap_context_state(&self, state: ContextState) {
        let Some(mut entity) = self.table.get(&state.descriptor_handle) else {
            self.logger.log(
                LogLevel::Error,
                LOG_TARGET,
                &format!("GetContextStates returned a state for unknown descriptor {}", state.descriptor_handle),
            );
            return;
        };
        if let Entity::Multi { states, .. } = &mut entity {
            states.insert(state.handle.clone(), state);
            let _ = self.table.update(entity);
        }
    }

    /// Entry point for every incoming notification (S4.8, S9 "Buffered
    /// notifications during consumer bootstrap"). Buffers while bootstrap
    /// is in flight, drops while a `sequence_id` change is latched, applies
    /// immediately once live.
    pub fn on_notification(&self, report: ReportBody) {
        let gate = self.gate.read().clone();
        match gate {
            Gate::Buffering => self.buffer.lock().push(report),
            Gate::SequenceChanged { .. } => {
                self.logger.log(
                    LogLevel::Warn,
                    LOG_TARGET,
                    "dropping report: sequence_id changed, awaiting reload_all",
                );
            }
            Gate::Live => {
                let _guard = self.apply_mutex.lock();
                self.apply_report(report, false);
            }
        }
    }

    /// Per-report version gate (S4.8 "Per-report version gate") plus
    /// dispatch into the per-family merge rules. Caller holds
    /// `apply_mutex`.
    fn apply_report(&self, report: ReportBody, buffered: bool) {
        if !self.check_gate(report.version_group(), buffered) {
            return;
        }
        match report {
            ReportBody::DescriptionModification(r) => {
                for part in r.parts {
                    self.apply_description_modification(part);
                }
            }
            ReportBody::EpisodicMetric(r) | ReportBody::EpisodicAlert(r) | ReportBody::EpisodicComponent(r)
            | ReportBody::EpisodicOperationalState(r) => {
                for state in r.states {
                    self.apply_single_state(state, buffered);
                }
            }
            ReportBody::EpisodicContext(r) => {
                for state in r.states {
                    self.apply_context_state(state, buffered);
                }
            }
            ReportBody::Waveform(r) => {
                for state in r.states {
                    self.apply_waveform_state(state, buffered);
                }
            }
            ReportBody::PeriodicMetric(r) | ReportBody::PeriodicAlert(r) | ReportBody::PeriodicComponent(r)
            | ReportBody::PeriodicOperationalState(r) => {
                for entry in r.entries {
                    for state in entry.items {
                        self.apply_single_state(state, true);
                    }
                }
            }
            ReportBody::PeriodicContext(r) => {
                for entry in r.entries {
                    for state in entry.items {
                        self.apply_context_state(state, true);
                    }
                }
            }
            ReportBody::OperationInvoked(_) => {
                // No MDIB mutation; invocation lifecycle is observed, not mirrored.
            }
        }
    }

    /// Mirrors `_can_accept_version` (S4.8 "Per-report version gate").
    fn check_gate(&self, incoming: &MdibVersionGroup, buffered: bool) -> bool {
        if self.config.mdib_version_check_disabled {
            return true;
        }
        {
            let current = self.version.read();
            if incoming.sequence_id != current.sequence_id && !buffered {
                drop(current);
                self.logger.log(
                    LogLevel::Warn,
                    LOG_TARGET,
                    &format!(
                        "sequence_id changed: {} -> {}, halting until reload_all",
                        self.version.read().sequence_id,
                        incoming.sequence_id
                    ),
                );
                *self.gate.write() = Gate::SequenceChanged {
                    old: self.version.read().sequence_id.clone(),
                    new: incoming.sequence_id.clone(),
                };
                return false;
            }
            if incoming.mdib_version < current.mdib_version {
                self.logger.log(
                    LogLevel::Warn,
                    LOG_TARGET,
                    &format!(
                        "ignoring too old mdib version, have {}, got {}",
                        current.mdib_version, incoming.mdib_version
                    ),
                );
                return false;
            }
            if incoming.mdib_version.0 > current.mdib_version.0 + 1 && self.all_subscribed.load(Ordering::Relaxed) {
                self.logger.log(
                    LogLevel::Warn,
                    LOG_TARGET,
                    &format!("expected mdib_version {}, got {}", current.mdib_version.next(), incoming.mdib_version),
                );
            }
        }
        *self.version.write() = incoming.clone();
        true
    }

    /// S4.8 "State update rules inside an accepted report", for single-state descriptors.
    fn apply_single_state(&self, incoming: State, buffered: bool) -> bool {
        let handle = incoming.core().descriptor_handle.clone();
        let Some(mut entity) = self.table.get(&handle) else {
            self.logger.log(
                LogLevel::Error,
                LOG_TARGET,
                &format!("got a state for unknown descriptor {handle}"),
            );
            return false;
        };
        let Entity::Single { state, .. } = &mut entity else {
            self.logger.log(
                LogLevel::Error,
                LOG_TARGET,
                &format!("got a single state for multi-state descriptor {handle}"),
            );
            return false;
        };
        match state {
            Some(old) => {
                let same_data = old.data_eq(&incoming);
                if !usable_state_version(old.core().state_version, incoming.core().state_version, buffered, same_data, &handle, self.logger.as_ref()) {
                    return false;
                }
                *state = Some(incoming);
            }
            None => {
                self.logger.log(LogLevel::Error, LOG_TARGET, &format!("got a new state {handle}"));
                *state = Some(incoming);
            }
        }
        self.table.update(entity).is_ok()
    }

    fn apply_context_state(&self, incoming: ContextState, buffered: bool) -> bool {
        let Some(mut entity) = self.table.get(&incoming.descriptor_handle) else {
            self.logger.log(
                LogLevel::Error,
                LOG_TARGET,
                &format!("got a context state for unknown descriptor {}", incoming.descriptor_handle),
            );
            return false;
        };
        let Entity::Multi { states, .. } = &mut entity else {
            self.logger.log(
                LogLevel::Error,
                LOG_TARGET,
                &format!("got a context state for single-state descriptor {}", incoming.descriptor_handle),
            );
            return false;
        };
        match states.get_mut(&incoming.handle) {
            Some(old) => {
                let same_data = old.data_eq(&incoming);
                if !usable_state_version(old.state_version, incoming.state_version, buffered, same_data, &incoming.handle, self.logger.as_ref()) {
                    return false;
                }
                *old = incoming;
            }
            None => {
                self.logger.log(
                    LogLevel::Info,
                    LOG_TARGET,
                    &format!("new context state {} for descriptor {}", incoming.handle, incoming.descriptor_handle),
                );
                states.insert(incoming.handle.clone(), incoming);
            }
        }
        self.table.update(entity).is_ok()
    }

    /// S4.8 "Waveform handling": applies the state like any other single
    /// state, then appends its samples to the per-handle ring.
    fn apply_waveform_state(&self, incoming: State, buffered: bool) {
        let State::RealTimeSampleArrayMetric(rtsa) = &incoming else {
            self.logger.log(LogLevel::Error, LOG_TARGET, "waveform report carried a non-RTSA state");
            return;
        };
        let handle = rtsa.core.descriptor_handle.clone();
        let sample_period_ms = self
            .table
            .get(&handle)
            .and_then(|e| match e.descriptor() {
                Descriptor::RealTimeSampleArrayMetric(d) => Some(d.sample_period_ms),
                _ => None,
            })
            .unwrap_or(0);
        let rtsa = rtsa.clone();
        if !self.apply_single_state(incoming, buffered) {
            return;
        }
        let mut waveforms = self.waveforms.lock();
        let ring = waveforms
            .entry(handle)
            .or_insert_with(|| WaveformRing::new(self.config.max_realtime_samples, sample_period_ms));
        ring.extend_from_state(&rtsa);
    }

    /// S4.8 "Description modifications": CRT adds, UPT replaces fields and
    /// applies state updates, DEL removes the subtree.
    fn apply_description_modification(&self, part: DescriptionModificationPart) {
        match part.modification_type {
            ModificationType::Crt => self.apply_create(part),
            ModificationType::Upt => self.apply_update(part),
            ModificationType::Del => self.apply_delete(part),
        }
    }

    fn apply_create(&self, part: DescriptionModificationPart) {
        let handle = part.descriptor.handle().clone();
        let is_multi_state = part.descriptor.node_type().is_multi_state();
        let mut entity = if is_multi_state {
            Entity::new_multi(part.descriptor)
        } else {
            Entity::new_single(part.descriptor)
        };
        match &mut entity {
            Entity::Multi { states, .. } => {
                for state in part.context_states {
                    states.insert(state.handle.clone(), state);
                }
            }
            Entity::Single { state, .. } => {
                *state = part.states.into_iter().next();
            }
        }
        if !entity.descriptor_handles_consistent() {
            self.logger.log(LogLevel::Error, LOG_TARGET, &format!("created entity {handle} has inconsistent descriptor handles"));
        }
        if let Err(err) = self.table.add(entity) {
            self.logger.log(LogLevel::Error, LOG_TARGET, &format!("could not create entity {handle}: {err}"));
        }
    }

    fn apply_update(&self, part: DescriptionModificationPart) {
        let handle = part.descriptor.handle().clone();
        let Some(mut entity) = self.table.get(&handle) else {
            self.logger.log(LogLevel::Error, LOG_TARGET, &format!("got update of descriptor {handle}, but it did not exist"));
            return;
        };
        *entity.descriptor_mut() = part.descriptor;
        match &mut entity {
            Entity::Single { state, .. } => {
                if let Some(new_state) = part.states.into_iter().next() {
                    *state = Some(new_state);
                }
            }
            Entity::Multi { states, .. } => {
                let updated_handles: Vec<Handle> = part.context_states.iter().map(|s| s.handle.clone()).collect();
                for state in part.context_states {
                    states.insert(state.handle.clone(), state);
                }
                states.retain(|h, _| updated_handles.contains(h));
            }
        }
        if let Err(err) = self.table.update(entity) {
            self.logger.log(LogLevel::Error, LOG_TARGET, &format!("could not update entity {handle}: {err}"));
        }
    }

    fn apply_delete(&self, part: DescriptionModificationPart) {
        let handle = part.descriptor.handle().clone();
        for descendant in self.table.subtree_handles(&handle) {
            self.table.remove(&descendant);
            self.waveforms.lock().remove(&descendant);
        }
    }
}

/// Mirrors `_has_new_state_usable_state_version` (S4.8 "State update rules
/// inside an accepted report"): `true` means the caller should replace the
/// old state with the new one.
fn usable_state_version(
    old_version: Version,
    new_version: Version,
    buffered: bool,
    same_data: bool,
    handle: &Handle,
    logger: &dyn DeviceLogger,
) -> bool {
    if new_version.0 == old_version.0 + 1 {
        return true;
    }
    if new_version.0 > old_version.0 + 1 {
        logger.log(
            LogLevel::Warn,
            LOG_TARGET,
            &format!(
                "missed {} state updates for {handle} ({old_version}->{new_version})",
                new_version.0 - old_version.0 - 1
            ),
        );
        return true;
    }
    if new_version.0 < old_version.0 {
        if !buffered {
            logger.log(
                LogLevel::Warn,
                LOG_TARGET,
                &format!("reduced state version for {handle} ({old_version}->{new_version})"),
            );
        }
        return false;
    }
    if !same_data {
        logger.log(
            LogLevel::Error,
            LOG_TARGET,
            &format!("repeated state version {new_version} for {handle}, but data differs"),
        );
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::logging::FacadeLogger;
    use crate::error::Result as SdcResult;
    use crate::model::descriptor::{DescriptorCore, PlainDescriptor};
    use crate::model::state::{MetricQuality, NumericMetricState, StateCore, Validity};
    use crate::model::Descriptor;

    struct StubGetService {
        entities: Vec<Entity>,
        version_group: MdibVersionGroup,
    }

    impl GetServiceClient for StubGetService {
        fn get_mdib(&self) -> SdcResult<crate::adapters::get_service::GetMdibResponse> {
            Ok(crate::adapters::get_service::GetMdibResponse {
                version_group: self.version_group.clone(),
                entities: self.entities.clone(),
            })
        }

        fn get_context_states(&self, _handles: &[Handle]) -> SdcResult<crate::adapters::get_service::GetContextStatesResponse> {
            Ok(crate::adapters::get_service::GetContextStatesResponse::default())
        }
    }

    fn metric_entity(handle: &str, value: Option<f64>) -> Entity {
        let mut entity = Entity::new_single(Descriptor::NumericMetric(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), None),
        }));
        if let Entity::Single { state, .. } = &mut entity {
            *state = Some(State::NumericMetric(NumericMetricState {
                core: StateCore::new(Handle::from(handle), Version::initial()),
                value,
                quality: MetricQuality { validity: Validity::Valid },
            }));
        }
        entity
    }

    fn consumer_with_one_metric() -> Consumer {
        let get_service = Arc::new(StubGetService {
            entities: vec![metric_entity("num.0", Some(1.0))],
            version_group: MdibVersionGroup::new(MdibVersion(5), "seq-a"),
        });
        let consumer = Consumer::new(get_service, ConsumerConfig::default(), Arc::new(FacadeLogger));
        consumer.init_mdib().unwrap();
        consumer
    }

    #[test]
    fn init_mdib_populates_table_and_version() {
        let consumer = consumer_with_one_metric();
        assert!(consumer.is_initialized());
        assert_eq!(consumer.version_group().mdib_version, MdibVersion(5));
        assert_eq!(consumer.table().len(), 1);
    }

    #[test]
    fn notification_before_init_is_buffered_then_applied() {
        let get_service = Arc::new(StubGetService {
            entities: vec![metric_entity("num.0", Some(1.0))],
            version_group: MdibVersionGroup::new(MdibVersion(5), "seq-a"),
        });
        let consumer = Consumer::new(get_service, ConsumerConfig::default(), Arc::new(FacadeLogger));
        let report = ReportBody::EpisodicMetric(crate::report::StateReport {
            family: crate::model::ReportFamily::Metric,
            version_group: MdibVersionGroup::new(MdibVersion(6), "seq-a"),
            states: vec![State::NumericMetric(NumericMetricState {
                core: StateCore {
                    descriptor_handle: Handle::from("num.0"),
                    descriptor_version: Version::initial(),
                    state_version: Version(1),
                },
                value: Some(2.0),
                quality: MetricQuality { validity: Validity::Valid },
            })],
        });
        consumer.on_notification(report);
        assert!(!consumer.is_initialized());
        consumer.init_mdib().unwrap();
        assert!(consumer.is_initialized());
        let entity = consumer.table().get(&Handle::from("num.0")).unwrap();
        let Entity::Single { state: Some(State::NumericMetric(s)), .. } = entity else {
            panic!("expected numeric metric state");
        };
        assert_eq!(s.value, Some(2.0));
    }

    #[test]
    fn sequence_id_change_latches_until_reload() {
        let consumer = consumer_with_one_metric();
        let report = ReportBody::EpisodicMetric(crate::report::StateReport {
            family: crate::model::ReportFamily::Metric,
            version_group: MdibVersionGroup::new(MdibVersion(1), "seq-b"),
            states: vec![],
        });
        consumer.on_notification(report);
        assert!(consumer.sequence_id_changed());
        let second = ReportBody::EpisodicMetric(crate::report::StateReport {
            family: crate::model::ReportFamily::Metric,
            version_group: MdibVersionGroup::new(MdibVersion(2), "seq-b"),
            states: vec![],
        });
        consumer.on_notification(second);
        assert!(consumer.sequence_id_changed());
    }

    #[test]
    fn equal_state_version_is_dropped_silently() {
        let consumer = consumer_with_one_metric();
        let report = ReportBody::EpisodicMetric(crate::report::StateReport {
            family: crate::model::ReportFamily::Metric,
            version_group: MdibVersionGroup::new(MdibVersion(6), "seq-a"),
            states: vec![State::NumericMetric(NumericMetricState {
                core: StateCore {
                    descriptor_handle: Handle::from("num.0"),
                    descriptor_version: Version::initial(),
                    state_version: Version::initial(),
                },
                value: Some(99.0),
                quality: MetricQuality { validity: Validity::Valid },
            })],
        });
        consumer.on_notification(report);
        let entity = consumer.table().get(&Handle::from("num.0")).unwrap();
        let Entity::Single { state: Some(State::NumericMetric(s)), .. } = entity else {
            panic!("expected numeric metric state");
        };
        assert_eq!(s.value, Some(1.0));
    }
}
