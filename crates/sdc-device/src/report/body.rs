// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Report body shapes (spec.md S4.3): fixed per report family, each
//! identified by a unique action URI (`report::action`).

use crate::model::{ContextState, Descriptor, Handle, MdibVersion, MdibVersionGroup, ReportFamily, State};

use super::action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationType {
    Crt,
    Upt,
    Del,
}

/// One changed descriptor plus the states it carries (S4.3).
#[derive(Debug, Clone)]
pub struct DescriptionModificationPart {
    pub modification_type: ModificationType,
    pub descriptor: Descriptor,
    pub states: Vec<State>,
    pub context_states: Vec<ContextState>,
}

#[derive(Debug, Clone)]
pub struct DescriptionModificationReport {
    pub version_group: MdibVersionGroup,
    pub parts: Vec<DescriptionModificationPart>,
}

/// `ReportPart[]` of single states for one of the five episodic/periodic
/// single-state families (metric, alert, component, operational).
#[derive(Debug, Clone)]
pub struct StateReport {
    pub family: ReportFamily,
    pub version_group: MdibVersionGroup,
    pub states: Vec<State>,
}

#[derive(Debug, Clone)]
pub struct ContextReport {
    pub version_group: MdibVersionGroup,
    pub states: Vec<ContextState>,
}

/// No `ReportPart` wrapping (S4.3: "WaveformStream: state[] ... no
/// ReportPart wrapping").
#[derive(Debug, Clone)]
pub struct WaveformReport {
    pub version_group: MdibVersionGroup,
    pub states: Vec<State>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationErrorKind {
    Unspecified,
    InvalidValue,
    Other,
}

#[derive(Debug, Clone)]
pub struct OperationInvokedReportBody {
    pub version_group: MdibVersionGroup,
    pub transaction_id: u64,
    pub operation_handle: Handle,
    pub invocation_state: crate::model::state::InvocationState,
    /// Fixed to the "AnonymousSdcParticipant" profile identifier (S4.7).
    pub invocation_source: &'static str,
    pub error: Option<(InvocationErrorKind, String)>,
}

/// One earlier commit's snapshot, tagged with its original `MdibVersion`
/// (S4.3: "preserving their original MdibVersion per report part").
#[derive(Debug, Clone)]
pub struct PeriodicEntry<T> {
    pub mdib_version: MdibVersion,
    pub items: Vec<T>,
}

#[derive(Debug, Clone)]
pub struct PeriodicStateReport {
    pub family: ReportFamily,
    pub version_group: MdibVersionGroup,
    pub entries: Vec<PeriodicEntry<State>>,
}

#[derive(Debug, Clone)]
pub struct PeriodicContextReport {
    pub version_group: MdibVersionGroup,
    pub entries: Vec<PeriodicEntry<ContextState>>,
}

/// The full set of report bodies a commit (or the periodic aggregator) may emit.
#[derive(Debug, Clone)]
pub enum ReportBody {
    EpisodicMetric(StateReport),
    EpisodicAlert(StateReport),
    EpisodicComponent(StateReport),
    EpisodicContext(ContextReport),
    EpisodicOperationalState(StateReport),
    DescriptionModification(DescriptionModificationReport),
    Waveform(WaveformReport),
    OperationInvoked(OperationInvokedReportBody),
    PeriodicMetric(PeriodicStateReport),
    PeriodicAlert(PeriodicStateReport),
    PeriodicComponent(PeriodicStateReport),
    PeriodicContext(PeriodicContextReport),
    PeriodicOperationalState(PeriodicStateReport),
}

impl ReportBody {
    pub fn action(&self) -> &'static str {
        match self {
            Self::EpisodicMetric(_) => action::EPISODIC_METRIC_REPORT,
            Self::EpisodicAlert(_) => action::EPISODIC_ALERT_REPORT,
            Self::EpisodicComponent(_) => action::EPISODIC_COMPONENT_REPORT,
            Self::EpisodicContext(_) => action::EPISODIC_CONTEXT_REPORT,
            Self::EpisodicOperationalState(_) => action::EPISODIC_OPERATIONAL_STATE_REPORT,
            Self::DescriptionModification(_) => action::DESCRIPTION_MODIFICATION_REPORT,
            Self::Waveform(_) => action::WAVEFORM_STREAM,
            Self::OperationInvoked(_) => action::OPERATION_INVOKED_REPORT,
            Self::PeriodicMetric(_) => action::PERIODIC_METRIC_REPORT,
            Self::PeriodicAlert(_) => action::PERIODIC_ALERT_REPORT,
            Self::PeriodicComponent(_) => action::PERIODIC_COMPONENT_REPORT,
            Self::PeriodicContext(_) => action::PERIODIC_CONTEXT_REPORT,
            Self::PeriodicOperationalState(_) => action::PERIODIC_OPERATIONAL_STATE_REPORT,
        }
    }

    pub fn family(&self) -> ReportFamily {
        match self {
            Self::EpisodicMetric(_) | Self::PeriodicMetric(_) => ReportFamily::Metric,
            Self::EpisodicAlert(_) | Self::PeriodicAlert(_) => ReportFamily::Alert,
            Self::EpisodicComponent(_) | Self::PeriodicComponent(_) => ReportFamily::Component,
            Self::EpisodicContext(_) | Self::PeriodicContext(_) => ReportFamily::Context,
            Self::EpisodicOperationalState(_) | Self::PeriodicOperationalState(_) => {
                ReportFamily::Operational
            }
            Self::DescriptionModification(_) => ReportFamily::Description,
            Self::Waveform(_) => ReportFamily::Waveform,
            Self::OperationInvoked(_) => ReportFamily::OperationInvoked,
        }
    }

    pub fn version_group(&self) -> &MdibVersionGroup {
        match self {
            Self::EpisodicMetric(r) | Self::EpisodicAlert(r) | Self::EpisodicComponent(r)
            | Self::EpisodicOperationalState(r) => &r.version_group,
            Self::EpisodicContext(r) => &r.version_group,
            Self::DescriptionModification(r) => &r.version_group,
            Self::Waveform(r) => &r.version_group,
            Self::OperationInvoked(r) => &r.version_group,
            Self::PeriodicMetric(r) | Self::PeriodicAlert(r) | Self::PeriodicComponent(r)
            | Self::PeriodicOperationalState(r) => &r.version_group,
            Self::PeriodicContext(r) => &r.version_group,
        }
    }
}
