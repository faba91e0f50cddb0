// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The provider runtime (spec.md S4.7): binds transaction commits to
//! report fan-out, and carries the asynchronous operation-invocation path.
//! Grounded on the teacher's MPSC-producer pattern
//! (`crates/hdds/src/engine/hub.rs`): invocations are queued on a
//! `crossbeam::channel` and drained by `execute_pending`, which the host
//! application drives from its own event loop (this crate owns no threads
//! of its own, S5).

pub mod operation;

pub use operation::{OperationArgs, OperationHandler};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::{Handle, ReportFamily, State};
use crate::periodic::{FixedIntervalAggregator, RetrievabilityAggregator};
use crate::report::{InvocationErrorKind, OperationInvokedReportBody, ReportBody};
use crate::subscription::SubscriptionManager;
use crate::txn::{CommitOutcome, ExecutionOutcome, Mdib, Transaction};

/// Profile identifier stamped on every `OperationInvokedReport`
/// (S4.7 step 4).
pub const INVOCATION_SOURCE: &str = "AnonymousSdcParticipant";

struct PendingInvocation {
    transaction_id: u64,
    operation_handle: Handle,
    handler: Arc<dyn OperationHandler>,
    args: OperationArgs,
}

/// Binds `Mdib` commits to `SubscriptionManager` fan-out and to the
/// periodic-report aggregator, and runs the operation-invocation queue
/// (S4.7).
pub struct Provider {
    mdib: Arc<Mdib>,
    subscriptions: Arc<SubscriptionManager>,
    retrievability: RetrievabilityAggregator,
    fixed_interval: Option<FixedIntervalAggregator>,
    handlers: RwLock<HashMap<Handle, Arc<dyn OperationHandler>>>,
    invocation_tx: Sender<PendingInvocation>,
    invocation_rx: Receiver<PendingInvocation>,
    next_transaction_id: AtomicU64,
}

impl Provider {
    pub fn new(mdib: Arc<Mdib>, subscriptions: Arc<SubscriptionManager>) -> Self {
        let (invocation_tx, invocation_rx) = channel::unbounded();
        Self {
            mdib,
            subscriptions,
            retrievability: RetrievabilityAggregator::new(),
            fixed_interval: None,
            handlers: RwLock::new(HashMap::new()),
            invocation_tx,
            invocation_rx,
            next_transaction_id: AtomicU64::new(1),
        }
    }

    /// Switches to fixed-interval periodic mode (S4.6 step 4, S9 "Open
    /// questions": both modes are implemented; this picks one).
    pub fn with_fixed_interval_periodic(mut self, aggregator: FixedIntervalAggregator) -> Self {
        self.fixed_interval = Some(aggregator);
        self
    }

    pub fn mdib(&self) -> &Mdib {
        &self.mdib
    }

    pub fn retrievability_aggregator(&self) -> &RetrievabilityAggregator {
        &self.retrievability
    }

    pub fn register_operation_handler(&self, operation_handle: Handle, handler: Arc<dyn OperationHandler>) {
        self.handlers.write().insert(operation_handle, handler);
    }

    /// Runs `body` as a transaction, commits it, fans the resulting reports
    /// out to subscribers, and feeds periodic-retrievable states into the
    /// retrievability aggregator (S4.2 step 5, S4.6 step 2 "this is a
    /// *separate* path from episodic delivery").
    pub fn commit<F>(&self, body: F) -> Result<CommitOutcome>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<()>,
    {
        let outcome = self.mdib.transaction(body)?;
        for report in &outcome.reports {
            self.subscriptions.send_to_subscribers(report);
            self.feed_periodic(report);
        }
        Ok(outcome)
    }

    fn feed_periodic(&self, report: &ReportBody) {
        if !ReportFamily::PERIODIC_ELIGIBLE.contains(&report.family()) {
            return;
        }
        let version_group = report.version_group().clone();
        let states_by_period = |states: &[State]| -> HashMap<u32, Vec<State>> {
            let mut by_period: HashMap<u32, Vec<State>> = HashMap::new();
            for state in states {
                let Some(entity) = self.mdib.table().get(&state.core().descriptor_handle) else {
                    continue;
                };
                let Some(retrievability) = entity.descriptor().core().retrievability.clone() else {
                    continue;
                };
                for period_ms in retrievability.periodic_ms {
                    self.retrievability.ensure_period(period_ms);
                    by_period.entry(period_ms).or_default().push(state.clone());
                }
            }
            by_period
        };
        match report {
            ReportBody::EpisodicMetric(r) => {
                for (period_ms, states) in states_by_period(&r.states) {
                    self.retrievability.store_metric_states(period_ms, version_group.mdib_version, states);
                }
            }
            ReportBody::EpisodicAlert(r) => {
                for (period_ms, states) in states_by_period(&r.states) {
                    self.retrievability.store_alert_states(period_ms, version_group.mdib_version, states);
                }
            }
            ReportBody::EpisodicComponent(r) => {
                for (period_ms, states) in states_by_period(&r.states) {
                    self.retrievability.store_component_states(period_ms, version_group.mdib_version, states);
                }
            }
            ReportBody::EpisodicOperationalState(r) => {
                for (period_ms, states) in states_by_period(&r.states) {
                    self.retrievability.store_operational_states(period_ms, version_group.mdib_version, states);
                }
            }
            ReportBody::EpisodicContext(r) => {
                let mut by_period: HashMap<u32, Vec<crate::model::ContextState>> = HashMap::new();
                for state in &r.states {
                    let Some(entity) = self.mdib.table().get(&state.descriptor_handle) else { continue };
                    let Some(retrievability) = entity.descriptor().core().retrievability.clone() else {
                        continue;
                    };
                    for period_ms in retrievability.periodic_ms {
                        self.retrievability.ensure_period(period_ms);
                        by_period.entry(period_ms).or_default().push(state.clone());
                    }
                }
                for (period_ms, states) in by_period {
                    self.retrievability.store_context_states(period_ms, version_group.mdib_version, states);
                }
            }
            _ => {}
        }
    }

    /// Ticks period `period_ms`: drains its queue and fans the resulting
    /// periodic reports out (S4.6 step 3).
    pub fn tick_periodic(&self, period_ms: u32) {
        let version_group = self.mdib.version_group();
        for report in self.retrievability.drain(period_ms, &version_group) {
            self.subscriptions.send_to_subscribers(&report);
        }
    }

    /// Samples every handle tracked by the fixed-interval aggregator, if
    /// configured (S4.6 step 4).
    pub fn sample_fixed_interval(&self) {
        if let Some(aggregator) = &self.fixed_interval {
            for report in aggregator.sample(&self.mdib) {
                self.subscriptions.send_to_subscribers(&report);
            }
        }
    }

    /// S4.7 step 1-2: resolves the handler, assigns a fresh
    /// `transaction_id`, and queues the invocation for asynchronous
    /// execution. Returns the immediate `(transaction_id, Wait)` the
    /// synchronous SOAP response carries.
    pub fn invoke_operation(&self, operation_handle: Handle, args: OperationArgs) -> Result<u64> {
        let handler = self
            .handlers
            .read()
            .get(&operation_handle)
            .cloned()
            .ok_or_else(|| Error::not_found(operation_handle.clone()))?;
        let transaction_id = self.next_transaction_id.fetch_add(1, Ordering::Relaxed);
        self.invocation_tx
            .send(PendingInvocation {
                transaction_id,
                operation_handle,
                handler,
                args,
            })
            .map_err(|_| Error::ApiMisuse("invocation queue closed".to_string()))?;
        Ok(transaction_id)
    }

    /// Drains every queued invocation, executes each inside its own
    /// transaction, and fans out the resulting `OperationInvokedReport`s
    /// (S4.7 step 3-4). The host application calls this from its own event
    /// loop; nothing in this crate spawns a thread for it (S5).
    pub fn execute_pending(&self) -> Vec<ReportBody> {
        let mut reports = Vec::new();
        while let Ok(pending) = self.invocation_rx.try_recv() {
            reports.push(self.execute_one(pending));
        }
        reports
    }

    fn execute_one(&self, pending: PendingInvocation) -> ReportBody {
        let PendingInvocation {
            transaction_id,
            operation_handle,
            handler,
            args,
        } = pending;
        let outcome = self.mdib.transaction(|txn| {
            let outcome = handler.execute(txn, &operation_handle, &args)?;
            txn.stage_execution_outcome(outcome);
            Ok(())
        });
        let (version_group, invocation_state, error) = match outcome {
            Ok(commit) => {
                for report in &commit.reports {
                    self.subscriptions.send_to_subscribers(report);
                    self.feed_periodic(report);
                }
                match commit.staged_execution_outcome {
                    Some(ExecutionOutcome::Finished) | None => {
                        (commit.version_group, crate::model::state::InvocationState::Fin, None)
                    }
                    Some(ExecutionOutcome::FinishedWithModification) => {
                        (commit.version_group, crate::model::state::InvocationState::FinMod, None)
                    }
                    Some(ExecutionOutcome::Cancelled) => {
                        (commit.version_group, crate::model::state::InvocationState::Cnclld, None)
                    }
                    Some(ExecutionOutcome::CancelledManually) => {
                        (commit.version_group, crate::model::state::InvocationState::CnclldMan, None)
                    }
                    Some(ExecutionOutcome::Failed { kind, message }) => (
                        commit.version_group,
                        crate::model::state::InvocationState::Fail,
                        Some((kind, message)),
                    ),
                }
            }
            Err(err) => (
                self.mdib.version_group(),
                crate::model::state::InvocationState::Fail,
                Some((InvocationErrorKind::Other, err.to_string())),
            ),
        };
        ReportBody::OperationInvoked(OperationInvokedReportBody {
            version_group,
            transaction_id,
            operation_handle,
            invocation_state,
            invocation_source: INVOCATION_SOURCE,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::codec::{NotificationCodec, ReferenceParameter};
    use crate::adapters::logging::{DeviceLogger, FacadeLogger};
    use crate::adapters::transport::{SoapTransport, SoapTransportFactory};
    use crate::client_pool::SoapClientPool;
    use crate::config::SubscriptionConfig;
    use crate::model::descriptor::{DescriptorCore, OperationDescriptor, PlainDescriptor};
    use crate::model::state::{ComponentGenericState, NumericMetricState, Validity};
    use crate::model::{Descriptor, NodeType, StateCore, Version};
    use crate::subscription::DispatchStrategy;

    struct NullTransport;
    impl SoapTransport for NullTransport {
        fn netloc(&self) -> &str {
            "unused"
        }
        fn post_message_to(&self, _path: &str, _message: &[u8]) -> Result<()> {
            Ok(())
        }
        fn close(&self) {}
    }
    struct NullFactory;
    impl SoapTransportFactory for NullFactory {
        fn create(&self, _netloc: &str, _encodings: &[String]) -> Result<Arc<dyn SoapTransport>> {
            Ok(Arc::new(NullTransport))
        }
    }
    struct NullCodec;
    impl NotificationCodec for NullCodec {
        fn encode_notification(&self, _r: &ReportBody, _n: &str, _p: &[ReferenceParameter]) -> Vec<u8> {
            Vec::new()
        }
        fn encode_subscription_end(&self, _c: &str, _r: &str) -> Vec<u8> {
            Vec::new()
        }
    }

    struct AlwaysFinish;
    impl OperationHandler for AlwaysFinish {
        fn execute(&self, txn: &mut Transaction<'_>, handle: &Handle, args: &OperationArgs) -> Result<ExecutionOutcome> {
            let OperationArgs::SetValue(value) = args else {
                return Ok(ExecutionOutcome::Failed {
                    kind: InvocationErrorKind::InvalidValue,
                    message: "expected SetValue".to_string(),
                });
            };
            let state = txn.get_state(handle)?;
            if let State::NumericMetric(numeric) = state {
                numeric.value = Some(*value);
            }
            Ok(ExecutionOutcome::Finished)
        }
    }

    fn provider_with_one_metric() -> (Provider, Handle) {
        let mdib = Arc::new(Mdib::new());
        let client_pool = Arc::new(SoapClientPool::new(Arc::new(NullFactory)));
        let subscriptions = Arc::new(SubscriptionManager::new(
            client_pool,
            Arc::new(NullCodec),
            Arc::new(FacadeLogger) as Arc<dyn DeviceLogger>,
            DispatchStrategy::ReferenceParameter,
            SubscriptionConfig::default(),
        ));
        let handle = Handle::from("metric.1");
        mdib.transaction(|txn| {
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
                    core: DescriptorCore::new(handle.clone(), Some(Handle::from("chan"))),
                }),
                Some(State::NumericMetric(NumericMetricState {
                    core: StateCore::new(handle.clone(), Version::initial()),
                    value: Some(0.0),
                    quality: crate::model::state::MetricQuality { validity: Validity::Valid },
                })),
            )?;
            Ok(())
        })
        .unwrap();
        let provider = Provider::new(mdib, subscriptions);
        provider.register_operation_handler(Handle::from("op.set"), Arc::new(AlwaysFinish));
        (provider, handle)
    }

    #[test]
    fn invoke_then_execute_pending_emits_fin_report() {
        let (provider, metric_handle) = provider_with_one_metric();
        let tx_id = provider
            .invoke_operation(Handle::from("op.set"), OperationArgs::SetValue(42.0))
            .unwrap();
        let reports = provider.execute_pending();
        assert_eq!(reports.len(), 1);
        let ReportBody::OperationInvoked(body) = &reports[0] else {
            panic!("expected OperationInvokedReport");
        };
        assert_eq!(body.transaction_id, tx_id);
        assert!(matches!(body.invocation_state, crate::model::state::InvocationState::Fin));
        let entity = provider.mdib().table().get(&metric_handle).unwrap();
        let crate::model::Entity::Single { state: Some(State::NumericMetric(numeric)), .. } = entity else {
            panic!("expected numeric metric state");
        };
        assert_eq!(numeric.value, Some(42.0));
    }

    #[test]
    fn invoke_unknown_operation_fails_immediately() {
        let (provider, _) = provider_with_one_metric();
        let result = provider.invoke_operation(Handle::from("op.missing"), OperationArgs::SetValue(1.0));
        assert!(result.is_err());
    }
}
