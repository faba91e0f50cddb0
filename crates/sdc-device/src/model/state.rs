// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! State subtypes (S3): runtime values bound to a descriptor, single or multi.

use super::handle::Handle;
use super::version::{MdibVersion, Version};

/// Fields common to every single-state subtype.
#[derive(Debug, Clone)]
pub struct StateCore {
    pub descriptor_handle: Handle,
    pub descriptor_version: Version,
    pub state_version: Version,
}

impl StateCore {
    pub fn new(descriptor_handle: Handle, descriptor_version: Version) -> Self {
        Self {
            descriptor_handle,
            descriptor_version,
            state_version: Version::initial(),
        }
    }
}

/// Numeric metric runtime value plus a coarse quality indicator, matching
/// the field granularity this engine cares about (full BICEPS carries many
/// more; out of scope per spec.md S1's exclusion of codec/validation detail).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricQuality {
    pub validity: Validity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Valid,
    Invalid,
    Questionable,
    NotAvailable,
}

#[derive(Debug, Clone)]
pub struct NumericMetricState {
    pub core: StateCore,
    pub value: Option<f64>,
    pub quality: MetricQuality,
}

#[derive(Debug, Clone)]
pub struct StringMetricState {
    pub core: StateCore,
    pub value: Option<String>,
    pub quality: MetricQuality,
}

#[derive(Debug, Clone)]
pub struct EnumStringMetricState {
    pub core: StateCore,
    pub value: Option<String>,
    pub quality: MetricQuality,
}

/// One timestamped sample batch for a real-time sample array metric.
#[derive(Debug, Clone)]
pub struct RtsaMetricState {
    pub core: StateCore,
    pub samples: Vec<f64>,
    pub determination_time_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AlertSystemState {
    pub core_opt: Option<StateCore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertActivation {
    On,
    Off,
    Paused,
}

#[derive(Debug, Clone)]
pub struct AlertConditionState {
    pub core: StateCore,
    pub presence: bool,
    pub activation: AlertActivation,
}

#[derive(Debug, Clone)]
pub struct AlertSignalState {
    pub core: StateCore,
    pub activation: AlertActivation,
}

#[derive(Debug, Clone)]
pub struct LimitAlertConditionState {
    pub core: StateCore,
    pub presence: bool,
    pub activation: AlertActivation,
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentActivation {
    On,
    NotReady,
    StandBy,
    Off,
    Shutdown,
    Failure,
}

#[derive(Debug, Clone)]
pub struct ComponentGenericState {
    pub core: StateCore,
    pub activation: ComponentActivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Charging,
    Discharging,
    Full,
    Depleted,
}

#[derive(Debug, Clone)]
pub struct BatteryState {
    pub core: StateCore,
    pub activation: ComponentActivation,
    pub capacity_remaining_percent: Option<f64>,
    pub charge_status: Option<ChargeStatus>,
}

/// Invocation lifecycle states (S4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Wait,
    Start,
    Fin,
    FinMod,
    Cnclld,
    CnclldMan,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Enabled,
    Disabled,
    NotAvailable,
}

#[derive(Debug, Clone)]
pub struct OperationState {
    pub core: StateCore,
    pub operating_mode: OperatingMode,
}

/// A closed family of single-state subtypes (S3, S9).
#[derive(Debug, Clone)]
pub enum State {
    Mds(ComponentGenericState),
    Vmd(ComponentGenericState),
    Channel(ComponentGenericState),
    NumericMetric(NumericMetricState),
    StringMetric(StringMetricState),
    EnumStringMetric(EnumStringMetricState),
    RealTimeSampleArrayMetric(RtsaMetricState),
    AlertSystem(ComponentGenericState),
    AlertCondition(AlertConditionState),
    AlertSignal(AlertSignalState),
    LimitAlertCondition(LimitAlertConditionState),
    Battery(BatteryState),
    Clock(ComponentGenericState),
    SystemContext(ComponentGenericState),
    Sco(ComponentGenericState),
    Operation(OperationState),
}

impl State {
    pub fn core(&self) -> &StateCore {
        match self {
            Self::Mds(s)
            | Self::Vmd(s)
            | Self::Channel(s)
            | Self::AlertSystem(s)
            | Self::Clock(s)
            | Self::SystemContext(s)
            | Self::Sco(s) => &s.core,
            Self::NumericMetric(s) => &s.core,
            Self::StringMetric(s) => &s.core,
            Self::EnumStringMetric(s) => &s.core,
            Self::RealTimeSampleArrayMetric(s) => &s.core,
            Self::AlertCondition(s) => &s.core,
            Self::AlertSignal(s) => &s.core,
            Self::LimitAlertCondition(s) => &s.core,
            Self::Battery(s) => &s.core,
            Self::Operation(s) => &s.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut StateCore {
        match self {
            Self::Mds(s)
            | Self::Vmd(s)
            | Self::Channel(s)
            | Self::AlertSystem(s)
            | Self::Clock(s)
            | Self::SystemContext(s)
            | Self::Sco(s) => &mut s.core,
            Self::NumericMetric(s) => &mut s.core,
            Self::StringMetric(s) => &mut s.core,
            Self::EnumStringMetric(s) => &mut s.core,
            Self::RealTimeSampleArrayMetric(s) => &mut s.core,
            Self::AlertCondition(s) => &mut s.core,
            Self::AlertSignal(s) => &mut s.core,
            Self::LimitAlertCondition(s) => &mut s.core,
            Self::Battery(s) => &mut s.core,
            Self::Operation(s) => &mut s.core,
        }
    }

    /// Report family this state belongs to (S4.3).
    pub fn report_family(&self) -> super::report_family::ReportFamily {
        use super::report_family::ReportFamily;
        match self {
            Self::NumericMetric(_) | Self::StringMetric(_) | Self::EnumStringMetric(_) => {
                ReportFamily::Metric
            }
            Self::RealTimeSampleArrayMetric(_) => ReportFamily::Waveform,
            Self::AlertSystem(_)
            | Self::AlertCondition(_)
            | Self::AlertSignal(_)
            | Self::LimitAlertCondition(_) => ReportFamily::Alert,
            Self::Mds(_) | Self::Vmd(_) | Self::Channel(_) | Self::Clock(_) | Self::SystemContext(_)
            | Self::Sco(_) | Self::Battery(_) => ReportFamily::Component,
            Self::Operation(_) => ReportFamily::Operational,
        }
    }

    /// Structural-equality check used by the consumer's same-version
    /// comparison (S4.8: "if identical, silently drop").
    pub fn data_eq(&self, other: &State) -> bool {
        match (self, other) {
            (Self::NumericMetric(a), Self::NumericMetric(b)) => {
                a.value.map(f64::to_bits) == b.value.map(f64::to_bits) && a.quality == b.quality
            }
            (Self::StringMetric(a), Self::StringMetric(b)) => {
                a.value == b.value && a.quality == b.quality
            }
            (Self::EnumStringMetric(a), Self::EnumStringMetric(b)) => {
                a.value == b.value && a.quality == b.quality
            }
            (Self::AlertCondition(a), Self::AlertCondition(b)) => {
                a.presence == b.presence && a.activation == b.activation
            }
            (Self::AlertSignal(a), Self::AlertSignal(b)) => a.activation == b.activation,
            (Self::Battery(a), Self::Battery(b)) => {
                a.activation == b.activation
                    && a.capacity_remaining_percent.map(f64::to_bits)
                        == b.capacity_remaining_percent.map(f64::to_bits)
                    && a.charge_status == b.charge_status
            }
            (Self::Operation(a), Self::Operation(b)) => a.operating_mode == b.operating_mode,
            _ => false,
        }
    }
}

/// Context-state association lifecycle (S3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextAssociation {
    #[default]
    No,
    Pre,
    Assoc,
    Dis,
}

/// A multi-state: addressed by its own `Handle`, distinct from
/// `DescriptorHandle`, carrying its own association lifetime (S3).
#[derive(Debug, Clone)]
pub struct ContextState {
    pub handle: Handle,
    pub descriptor_handle: Handle,
    pub descriptor_version: Version,
    pub state_version: Version,
    pub association: ContextAssociation,
    pub binding_mdib_version: Option<MdibVersion>,
    pub unbinding_mdib_version: Option<MdibVersion>,
    pub kind: ContextKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Patient,
    Location,
    Ensemble,
    Workflow,
    Operator,
    Means,
}

impl ContextState {
    pub fn new(handle: Handle, descriptor_handle: Handle, descriptor_version: Version, kind: ContextKind) -> Self {
        Self {
            handle,
            descriptor_handle,
            descriptor_version,
            state_version: Version::initial(),
            association: ContextAssociation::No,
            binding_mdib_version: None,
            unbinding_mdib_version: None,
            kind,
        }
    }

    pub fn data_eq(&self, other: &ContextState) -> bool {
        self.association == other.association
            && self.binding_mdib_version == other.binding_mdib_version
            && self.unbinding_mdib_version == other.unbinding_mdib_version
    }
}
