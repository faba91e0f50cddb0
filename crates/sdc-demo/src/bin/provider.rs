// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! A tiny provider that builds an MDS/VMD/Channel/NumericMetric tree, sets
//! one metric every tick, and fans the resulting reports out over a
//! logging-only `SoapTransport`. Grounded on `tutorial/provider/provider.py`:
//! build the MDIB tree, seed initial state, then loop setting a metric
//! value on an interval. The XML codec, the HTTP transport, and
//! WS-Discovery are out of scope for this crate, so this binary stands in
//! its own in-memory/log-only implementations of those seams.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sdc_device::adapters::codec::{NotificationCodec, ReferenceParameter};
use sdc_device::adapters::logging::FacadeLogger;
use sdc_device::adapters::transport::{SoapTransport, SoapTransportFactory};
use sdc_device::client_pool::SoapClientPool;
use sdc_device::config::SubscriptionConfig;
use sdc_device::error::Result;
use sdc_device::model::descriptor::{Descriptor, DescriptorCore, PlainDescriptor};
use sdc_device::model::state::{MetricQuality, NumericMetricState, Validity};
use sdc_device::model::{Handle, State, StateCore, Version};
use sdc_device::provider::Provider;
use sdc_device::subscription::{DispatchStrategy, SubscribeRequest, SubscriptionManager};
use sdc_device::txn::Mdib;

/// Logs every notification instead of opening a socket.
struct LoggingTransport {
    netloc: String,
}

impl SoapTransport for LoggingTransport {
    fn netloc(&self) -> &str {
        &self.netloc
    }

    fn post_message_to(&self, path: &str, message: &[u8]) -> Result<()> {
        log::info!("-> {} {} ({} bytes)", self.netloc, path, message.len());
        Ok(())
    }

    fn close(&self) {
        log::info!("closing transport to {}", self.netloc);
    }
}

struct LoggingTransportFactory;

impl SoapTransportFactory for LoggingTransportFactory {
    fn create(&self, netloc: &str, _accepted_encodings: &[String]) -> Result<Arc<dyn SoapTransport>> {
        Ok(Arc::new(LoggingTransport {
            netloc: netloc.to_string(),
        }))
    }
}

/// A codec that renders each report as a short debug string rather than a
/// SOAP envelope; real XML construction is out of scope for this crate.
struct DebugCodec;

impl NotificationCodec for DebugCodec {
    fn encode_notification(
        &self,
        report: &sdc_device::report::ReportBody,
        notify_to: &str,
        _ref_params: &[ReferenceParameter],
    ) -> Vec<u8> {
        format!("{:?} -> {notify_to}", report).into_bytes()
    }

    fn encode_subscription_end(&self, code: &str, reason: &str) -> Vec<u8> {
        format!("SubscriptionEnd[{code}]: {reason}").into_bytes()
    }
}

fn build_mdib() -> (Mdib, Handle) {
    let mdib = Mdib::new();
    let metric_handle = Handle::from("metric.heartrate");
    mdib.transaction(|txn| {
        txn.add_descriptor(
            Descriptor::Mds(PlainDescriptor {
                core: DescriptorCore::new(Handle::from("mds.0"), None),
            }),
            None,
        )?;
        txn.add_descriptor(
            Descriptor::Vmd(PlainDescriptor {
                core: DescriptorCore::new(Handle::from("vmd.0"), Some(Handle::from("mds.0"))),
            }),
            None,
        )?;
        txn.add_descriptor(
            Descriptor::Channel(PlainDescriptor {
                core: DescriptorCore::new(Handle::from("chan.0"), Some(Handle::from("vmd.0"))),
            }),
            None,
        )?;
        txn.add_descriptor(
            Descriptor::NumericMetric(PlainDescriptor {
                core: DescriptorCore::new(metric_handle.clone(), Some(Handle::from("chan.0"))),
            }),
            Some(State::NumericMetric(NumericMetricState {
                core: StateCore::new(metric_handle.clone(), Version::initial()),
                value: Some(60.0),
                quality: MetricQuality { validity: Validity::Valid },
            })),
        )?;
        Ok(())
    })
    .expect("initial mdib build never fails");
    (mdib, metric_handle)
}

fn main() {
    env_logger::init();

    let (mdib, metric_handle) = build_mdib();
    let client_pool = Arc::new(SoapClientPool::new(Arc::new(LoggingTransportFactory)));
    let subscriptions = Arc::new(SubscriptionManager::new(
        client_pool,
        Arc::new(DebugCodec),
        Arc::new(FacadeLogger),
        DispatchStrategy::ReferenceParameter,
        SubscriptionConfig::default(),
    ));

    // a local subscriber, standing in for a remote consumer that has
    // already completed WS-Eventing Subscribe against this provider.
    subscriptions.subscribe(SubscribeRequest {
        notify_to: "http://127.0.0.1:9999/notify".to_string(),
        notify_ref_params: vec![],
        end_to: None,
        end_to_ref_params: vec![],
        expires: None,
        filters: vec!["EpisodicMetricReport".to_string()],
        accepted_encodings: vec![],
    });

    let provider = Provider::new(Arc::new(mdib), subscriptions);

    log::info!("provider running");
    let mut value = 60.0_f64;
    loop {
        value += 1.0;
        let handle = metric_handle.clone();
        provider
            .commit(move |txn| {
                let state = txn.get_state(&handle)?;
                if let State::NumericMetric(numeric) = state {
                    numeric.value = Some(value);
                }
                Ok(())
            })
            .expect("commit against the local mdib never fails");
        thread::sleep(Duration::from_secs(5));
    }
}
