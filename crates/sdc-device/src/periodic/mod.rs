// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The periodic-report aggregator (spec.md S4.6), grounded on
//! `PeriodicReportsHandler` in `periodicreports.py`. Unlike the source's
//! own daemon thread, this crate exposes `tick()`/`sample()` for the host
//! application to drive from whatever scheduler it already runs (matching
//! this crate's library-not-daemon shape, S5).

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::model::{ContextState, Handle, MdibVersion, NodeType, ReportFamily, State};
use crate::report::{ContextReport, PeriodicContextReport, PeriodicEntry, PeriodicStateReport, ReportBody};
use crate::txn::Mdib;

/// One accumulated `(mdib_version, states)` entry awaiting its next tick,
/// per period (`PeriodicStates` namedtuple in the source).
#[derive(Debug, Clone)]
struct QueuedStates {
    mdib_version: MdibVersion,
    states: Vec<State>,
}

#[derive(Debug, Clone)]
struct QueuedContextStates {
    mdib_version: MdibVersion,
    states: Vec<ContextState>,
}

#[derive(Default)]
struct PeriodQueue {
    metric: Vec<QueuedStates>,
    alert: Vec<QueuedStates>,
    component: Vec<QueuedStates>,
    operational: Vec<QueuedStates>,
    context: Vec<QueuedContextStates>,
}

/// Queue-drain mode state: one `PeriodQueue` per configured period in
/// milliseconds (S4.6 step 1-3).
#[derive(Default)]
pub struct RetrievabilityAggregator {
    queues: Mutex<HashMap<u32, PeriodQueue>>,
}

impl RetrievabilityAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `period_ms` as a tracked period, creating an empty queue
    /// if none exists yet. Called at MDIB load and after description
    /// modifications touch retrievability metadata (S4.6 step 1).
    pub fn ensure_period(&self, period_ms: u32) {
        self.queues.lock().entry(period_ms).or_default();
    }

    pub fn tracked_periods(&self) -> Vec<u32> {
        self.queues.lock().keys().copied().collect()
    }

    pub fn store_metric_states(&self, period_ms: u32, mdib_version: MdibVersion, states: Vec<State>) {
        self.push(period_ms, mdib_version, states, |q| &mut q.metric);
    }

    pub fn store_alert_states(&self, period_ms: u32, mdib_version: MdibVersion, states: Vec<State>) {
        self.push(period_ms, mdib_version, states, |q| &mut q.alert);
    }

    pub fn store_component_states(&self, period_ms: u32, mdib_version: MdibVersion, states: Vec<State>) {
        self.push(period_ms, mdib_version, states, |q| &mut q.component);
    }

    pub fn store_operational_states(&self, period_ms: u32, mdib_version: MdibVersion, states: Vec<State>) {
        self.push(period_ms, mdib_version, states, |q| &mut q.operational);
    }

    pub fn store_context_states(&self, period_ms: u32, mdib_version: MdibVersion, states: Vec<ContextState>) {
        let mut queues = self.queues.lock();
        let queue = queues.entry(period_ms).or_default();
        if !states.is_empty() {
            queue.context.push(QueuedContextStates { mdib_version, states });
        }
    }

    fn push<F>(&self, period_ms: u32, mdib_version: MdibVersion, states: Vec<State>, select: F)
    where
        F: FnOnce(&mut PeriodQueue) -> &mut Vec<QueuedStates>,
    {
        if states.is_empty() {
            return;
        }
        let mut queues = self.queues.lock();
        let queue = queues.entry(period_ms).or_default();
        select(queue).push(QueuedStates { mdib_version, states });
    }

    /// Drains every non-empty queue for `period_ms` and builds the
    /// periodic reports due this tick (S4.6 step 3). Returns at most one
    /// report per family, in a fixed order.
    pub fn drain(&self, period_ms: u32, version_group: &crate::model::MdibVersionGroup) -> Vec<ReportBody> {
        let queue = {
            let mut queues = self.queues.lock();
            match queues.get_mut(&period_ms) {
                Some(q) => std::mem::take(q),
                None => return Vec::new(),
            }
        };
        let mut reports = Vec::new();
        if !queue.metric.is_empty() {
            reports.push(ReportBody::PeriodicMetric(build_state_report(
                ReportFamily::Metric,
                version_group.clone(),
                queue.metric,
            )));
        }
        if !queue.alert.is_empty() {
            reports.push(ReportBody::PeriodicAlert(build_state_report(
                ReportFamily::Alert,
                version_group.clone(),
                queue.alert,
            )));
        }
        if !queue.component.is_empty() {
            reports.push(ReportBody::PeriodicComponent(build_state_report(
                ReportFamily::Component,
                version_group.clone(),
                queue.component,
            )));
        }
        if !queue.operational.is_empty() {
            reports.push(ReportBody::PeriodicOperationalState(build_state_report(
                ReportFamily::Operational,
                version_group.clone(),
                queue.operational,
            )));
        }
        if !queue.context.is_empty() {
            let entries = queue
                .context
                .into_iter()
                .map(|q| PeriodicEntry {
                    mdib_version: q.mdib_version,
                    items: q.states,
                })
                .collect();
            reports.push(ReportBody::PeriodicContext(PeriodicContextReport {
                version_group: version_group.clone(),
                entries,
            }));
        }
        reports
    }
}

fn build_state_report(family: ReportFamily, version_group: crate::model::MdibVersionGroup, queued: Vec<QueuedStates>) -> PeriodicStateReport {
    let entries = queued
        .into_iter()
        .map(|q| PeriodicEntry {
            mdib_version: q.mdib_version,
            items: q.states,
        })
        .collect();
    PeriodicStateReport {
        family,
        version_group,
        entries,
    }
}

/// Fixed-interval mode (S4.6 step 4): ignores retrievability metadata and
/// snapshots every tracked handle's current state on each `sample()` call.
pub struct FixedIntervalAggregator {
    metric_handles: Mutex<Vec<Handle>>,
    alert_handles: Mutex<Vec<Handle>>,
    component_handles: Mutex<Vec<Handle>>,
    operational_handles: Mutex<Vec<Handle>>,
    context_handles: Mutex<Vec<Handle>>,
    pub interval: Duration,
}

impl FixedIntervalAggregator {
    pub fn new(interval: Duration) -> Self {
        Self {
            metric_handles: Mutex::new(Vec::new()),
            alert_handles: Mutex::new(Vec::new()),
            component_handles: Mutex::new(Vec::new()),
            operational_handles: Mutex::new(Vec::new()),
            context_handles: Mutex::new(Vec::new()),
            interval,
        }
    }

    pub fn track(&self, node_type: NodeType, handle: Handle) {
        let bucket = match node_type {
            NodeType::NumericMetric
            | NodeType::StringMetric
            | NodeType::EnumStringMetric
            | NodeType::RealTimeSampleArrayMetric => &self.metric_handles,
            NodeType::AlertSystem | NodeType::AlertCondition | NodeType::LimitAlertCondition | NodeType::AlertSignal => {
                &self.alert_handles
            }
            NodeType::SetValueOperation
            | NodeType::SetStringOperation
            | NodeType::SetMetricStateOperation
            | NodeType::SetAlertStateOperation
            | NodeType::SetComponentStateOperation
            | NodeType::SetContextStateOperation
            | NodeType::ActivateOperation => &self.operational_handles,
            NodeType::PatientContext
            | NodeType::LocationContext
            | NodeType::EnsembleContext
            | NodeType::WorkflowContext
            | NodeType::OperatorContext
            | NodeType::MeansContext => &self.context_handles,
            NodeType::Mds | NodeType::Vmd | NodeType::Channel | NodeType::Battery | NodeType::Clock
            | NodeType::SystemContext | NodeType::Sco => &self.component_handles,
        };
        bucket.lock().push(handle);
    }

    /// Snapshots every tracked handle's current state under the MDIB's own
    /// read lock (S4.6 step 4) and builds one report per non-empty family.
    pub fn sample(&self, mdib: &Mdib) -> Vec<ReportBody> {
        let version_group = mdib.version_group();
        let mut reports = Vec::new();
        reports.extend(self.sample_family(mdib, &self.metric_handles, ReportFamily::Metric, &version_group));
        reports.extend(self.sample_family(mdib, &self.alert_handles, ReportFamily::Alert, &version_group));
        reports.extend(self.sample_family(mdib, &self.component_handles, ReportFamily::Component, &version_group));
        reports.extend(self.sample_family(
            mdib,
            &self.operational_handles,
            ReportFamily::Operational,
            &version_group,
        ));
        if let Some(report) = self.sample_context(mdib, &version_group) {
            reports.push(report);
        }
        reports
    }

    fn sample_family(
        &self,
        mdib: &Mdib,
        handles: &Mutex<Vec<Handle>>,
        family: ReportFamily,
        version_group: &crate::model::MdibVersionGroup,
    ) -> Option<ReportBody> {
        let handles = handles.lock();
        if handles.is_empty() {
            return None;
        }
        let states: Vec<State> = handles
            .iter()
            .filter_map(|h| mdib.table().get(h))
            .filter_map(|entity| match entity {
                crate::model::Entity::Single { state: Some(state), .. } => Some(state),
                _ => None,
            })
            .collect();
        if states.is_empty() {
            return None;
        }
        let entry = PeriodicEntry {
            mdib_version: version_group.mdib_version,
            items: states,
        };
        let report = PeriodicStateReport {
            family,
            version_group: version_group.clone(),
            entries: vec![entry],
        };
        Some(match family {
            ReportFamily::Metric => ReportBody::PeriodicMetric(report),
            ReportFamily::Alert => ReportBody::PeriodicAlert(report),
            ReportFamily::Component => ReportBody::PeriodicComponent(report),
            ReportFamily::Operational => ReportBody::PeriodicOperationalState(report),
            _ => unreachable!("sample_family is only called with single-state families"),
        })
    }

    fn sample_context(&self, mdib: &Mdib, version_group: &crate::model::MdibVersionGroup) -> Option<ReportBody> {
        let handles = self.context_handles.lock();
        if handles.is_empty() {
            return None;
        }
        let mut states = Vec::new();
        for handle in handles.iter() {
            if let Some(crate::model::Entity::Multi { states: context_states, .. }) = mdib.table().get(handle) {
                states.extend(context_states.into_values());
            }
        }
        if states.is_empty() {
            return None;
        }
        Some(ReportBody::PeriodicContext(PeriodicContextReport {
            version_group: version_group.clone(),
            entries: vec![PeriodicEntry {
                mdib_version: version_group.mdib_version,
                items: states,
            }],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::descriptor::{DescriptorCore, PlainDescriptor};
    use crate::model::state::NumericMetricState;
    use crate::model::{Descriptor, StateCore, Version};

    fn numeric_state(handle: &str, version: u64) -> State {
        State::NumericMetric(NumericMetricState {
            core: StateCore {
                descriptor_handle: Handle::from(handle),
                descriptor_version: Version::initial(),
                state_version: Version(version),
            },
            quality: crate::model::state::MetricQuality {
                validity: crate::model::state::Validity::Valid,
            },
            value: Some(1.0),
        })
    }

    #[test]
    fn drain_empty_period_returns_nothing() {
        let aggregator = RetrievabilityAggregator::new();
        aggregator.ensure_period(1000);
        let vg = crate::model::MdibVersionGroup::new(MdibVersion::initial(), "urn:uuid:test");
        assert!(aggregator.drain(1000, &vg).is_empty());
    }

    #[test]
    fn stored_states_drain_into_one_periodic_metric_report() {
        let aggregator = RetrievabilityAggregator::new();
        let state = numeric_state("metric.1", 3);
        aggregator.store_metric_states(1000, MdibVersion::from(3), vec![state]);
        let vg = crate::model::MdibVersionGroup::new(MdibVersion::from(3), "urn:uuid:test");
        let reports = aggregator.drain(1000, &vg);
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0], ReportBody::PeriodicMetric(_)));
        // a second drain on the same period is empty again (take-and-clear).
        assert!(aggregator.drain(1000, &vg).is_empty());
    }

    #[test]
    fn fixed_interval_aggregator_snapshots_tracked_metric() {
        let mdib = Mdib::new();
        mdib
            .transaction(|txn| {
                txn.add_descriptor(
                    Descriptor::Mds(PlainDescriptor {
                        core: DescriptorCore::new(Handle::from("mds"), None),
                    }),
                    None,
                )?;
                txn.add_descriptor(
                    Descriptor::Vmd(PlainDescriptor {
                        core: DescriptorCore::new(Handle::from("vmd"), Some(Handle::from("mds"))),
                    }),
                    None,
                )?;
                txn.add_descriptor(
                    Descriptor::Channel(PlainDescriptor {
                        core: DescriptorCore::new(Handle::from("chan"), Some(Handle::from("vmd"))),
                    }),
                    None,
                )?;
                txn.add_descriptor(
                    Descriptor::NumericMetric(PlainDescriptor {
                        core: DescriptorCore::new(Handle::from("metric.1"), Some(Handle::from("chan"))),
                    }),
                    Some(numeric_state("metric.1", 1)),
                )?;
                Ok(())
            })
            .unwrap();
        let aggregator = FixedIntervalAggregator::new(Duration::from_secs(1));
        aggregator.track(NodeType::NumericMetric, Handle::from("metric.1"));
        let reports = aggregator.sample(&mdib);
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0], ReportBody::PeriodicMetric(_)));
    }
}
