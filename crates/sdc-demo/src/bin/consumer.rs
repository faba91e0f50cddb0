// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! A tiny consumer that bootstraps a mirror from a fixed `GetMdib` snapshot,
//! then feeds it a handful of notifications to watch a metric value change.
//! Grounded on `tutorial/consumer/consumer.py`: discover a provider, bind to
//! its MDIB, and observe report traffic. WS-Discovery and the network
//! transport are out of scope for this crate, so this binary stands in a
//! fixed snapshot where the tutorial would run a discovery search.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sdc_device::adapters::get_service::{GetContextStatesResponse, GetMdibResponse, GetServiceClient};
use sdc_device::adapters::logging::FacadeLogger;
use sdc_device::config::ConsumerConfig;
use sdc_device::error::Result;
use sdc_device::model::descriptor::{Descriptor, DescriptorCore, PlainDescriptor};
use sdc_device::model::state::{MetricQuality, NumericMetricState, Validity};
use sdc_device::model::{Entity, Handle, MdibVersion, MdibVersionGroup, ReportFamily, State, StateCore, Version};
use sdc_device::report::{ReportBody, StateReport};
use sdc_device::Consumer;

/// Hands back one fixed snapshot, standing in for the network round trip a
/// real `GetServiceClient` would make against a discovered provider.
struct FixedSnapshot {
    metric_handle: Handle,
}

impl GetServiceClient for FixedSnapshot {
    fn get_mdib(&self) -> Result<GetMdibResponse> {
        let mds = Entity::new_single(
            Descriptor::Mds(PlainDescriptor {
                core: DescriptorCore::new(Handle::from("mds.0"), None),
            }),
        );
        let vmd = Entity::new_single(
            Descriptor::Vmd(PlainDescriptor {
                core: DescriptorCore::new(Handle::from("vmd.0"), Some(Handle::from("mds.0"))),
            }),
        );
        let chan = Entity::new_single(
            Descriptor::Channel(PlainDescriptor {
                core: DescriptorCore::new(Handle::from("chan.0"), Some(Handle::from("vmd.0"))),
            }),
        );
        let mut metric = Entity::new_single(Descriptor::NumericMetric(PlainDescriptor {
            core: DescriptorCore::new(self.metric_handle.clone(), Some(Handle::from("chan.0"))),
        }));
        if let Entity::Single { state, .. } = &mut metric {
            *state = Some(State::NumericMetric(NumericMetricState {
                core: StateCore::new(self.metric_handle.clone(), Version::initial()),
                value: Some(60.0),
                quality: MetricQuality { validity: Validity::Valid },
            }));
        }

        Ok(GetMdibResponse {
            version_group: MdibVersionGroup::new(MdibVersion::initial(), "urn:uuid:consumer-demo".to_string()),
            entities: vec![mds, vmd, chan, metric],
        })
    }

    fn get_context_states(&self, _handles: &[Handle]) -> Result<GetContextStatesResponse> {
        Ok(GetContextStatesResponse::default())
    }
}

fn notify_metric_value(version: MdibVersion, sequence_id: &str, handle: &Handle, value: f64) -> ReportBody {
    ReportBody::EpisodicMetric(StateReport {
        family: ReportFamily::Metric,
        version_group: MdibVersionGroup::new(version, sequence_id.to_string()),
        states: vec![State::NumericMetric(NumericMetricState {
            core: StateCore::new(handle.clone(), Version::initial().next()),
            value: Some(value),
            quality: MetricQuality { validity: Validity::Valid },
        })],
    })
}

fn main() {
    env_logger::init();

    let metric_handle = Handle::from("metric.heartrate");
    let get_service = Arc::new(FixedSnapshot {
        metric_handle: metric_handle.clone(),
    });
    let consumer = Consumer::new(get_service, ConsumerConfig::default(), Arc::new(FacadeLogger));

    consumer.init_mdib().expect("bootstrap against the fixed snapshot never fails");
    log::info!("mirror initialized at {:?}", consumer.version_group());

    let sequence_id = consumer.version_group().sequence_id.clone();
    for step in 1..=3 {
        let value = 60.0 + step as f64;
        let mdib_version = MdibVersion(step);
        consumer.on_notification(notify_metric_value(mdib_version, &sequence_id, &metric_handle, value));

        if let Some(entity) = consumer.table().get(&metric_handle) {
            if let Entity::Single { state: Some(State::NumericMetric(metric)), .. } = entity {
                log::info!("metric {} now reads {:?}", metric_handle, metric.value);
            }
        }
        thread::sleep(Duration::from_secs(1));
    }
}
