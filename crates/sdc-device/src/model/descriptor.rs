// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Descriptor subtypes (S3, S9 "Dynamic typing -> tagged variants").
//!
//! The source identifies descriptor subtypes by an XSI `NODETYPE` QName;
//! here that discriminator is the enum tag itself, which doubles as the
//! `NODETYPE` index key in the entity table (`entity::Index::NodeType`).

use super::coded_value::{CodedValue, DescriptorReferences, Retrievability};
use super::handle::Handle;
use super::version::Version;

/// `NODETYPE` discriminator, closed per the SDC/BICEPS profile (S3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Mds,
    Vmd,
    Channel,
    NumericMetric,
    StringMetric,
    EnumStringMetric,
    RealTimeSampleArrayMetric,
    AlertSystem,
    AlertCondition,
    AlertSignal,
    LimitAlertCondition,
    Battery,
    Clock,
    SystemContext,
    Sco,
    PatientContext,
    LocationContext,
    EnsembleContext,
    WorkflowContext,
    OperatorContext,
    MeansContext,
    SetValueOperation,
    SetStringOperation,
    SetMetricStateOperation,
    SetAlertStateOperation,
    SetComponentStateOperation,
    SetContextStateOperation,
    ActivateOperation,
}

impl NodeType {
    /// Whether this subtype addresses states by their own `Handle` (multi-state,
    /// i.e. a context descriptor) rather than at most one state per descriptor.
    pub fn is_multi_state(self) -> bool {
        matches!(
            self,
            Self::PatientContext
                | Self::LocationContext
                | Self::EnsembleContext
                | Self::WorkflowContext
                | Self::OperatorContext
                | Self::MeansContext
        )
    }

    pub fn is_operation(self) -> bool {
        matches!(
            self,
            Self::SetValueOperation
                | Self::SetStringOperation
                | Self::SetMetricStateOperation
                | Self::SetAlertStateOperation
                | Self::SetComponentStateOperation
                | Self::SetContextStateOperation
                | Self::ActivateOperation
        )
    }

    /// Fixed parent-child tag pairs from the profile (S3: "Parent-child tag
    /// pairs are fixed by the profile"). `Mds` is the only type with no
    /// required parent (it may be a tree root).
    pub fn accepts_child(self, child: NodeType) -> bool {
        use NodeType::*;
        match self {
            Mds => matches!(
                child,
                Vmd | AlertSystem | SystemContext | Sco | Clock | Battery
            ),
            Vmd => matches!(child, Channel | AlertSystem | Sco),
            Channel => matches!(
                child,
                NumericMetric | StringMetric | EnumStringMetric | RealTimeSampleArrayMetric
            ),
            AlertSystem => matches!(child, AlertCondition | AlertSignal | LimitAlertCondition),
            SystemContext => matches!(
                child,
                PatientContext
                    | LocationContext
                    | EnsembleContext
                    | WorkflowContext
                    | OperatorContext
                    | MeansContext
            ),
            Sco => child.is_operation(),
            _ => false,
        }
    }
}

/// Fields common to every descriptor subtype.
#[derive(Debug, Clone)]
pub struct DescriptorCore {
    pub handle: Handle,
    pub parent_handle: Option<Handle>,
    pub descriptor_version: Version,
    pub coded_type: Option<CodedValue>,
    pub references: DescriptorReferences,
    pub retrievability: Option<Retrievability>,
}

impl DescriptorCore {
    pub fn new(handle: Handle, parent_handle: Option<Handle>) -> Self {
        Self {
            handle,
            parent_handle,
            descriptor_version: Version::initial(),
            coded_type: None,
            references: DescriptorReferences::default(),
            retrievability: None,
        }
    }
}

/// Which operation an `OperationDescriptor` targets and invokes.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub core: DescriptorCore,
    pub kind: NodeType,
    pub operation_target: Handle,
}

/// A real-time sample array metric descriptor carries a sample period used
/// by the consumer's waveform ring buffer (S4.8).
#[derive(Debug, Clone)]
pub struct RtsaMetricDescriptor {
    pub core: DescriptorCore,
    pub sample_period_ms: u32,
}

/// Descriptor subtypes with no fields beyond the common core.
#[derive(Debug, Clone)]
pub struct PlainDescriptor {
    pub core: DescriptorCore,
}

/// A closed family of descriptor subtypes (S3, S9).
#[derive(Debug, Clone)]
pub enum Descriptor {
    Mds(PlainDescriptor),
    Vmd(PlainDescriptor),
    Channel(PlainDescriptor),
    NumericMetric(PlainDescriptor),
    StringMetric(PlainDescriptor),
    EnumStringMetric(PlainDescriptor),
    RealTimeSampleArrayMetric(RtsaMetricDescriptor),
    AlertSystem(PlainDescriptor),
    AlertCondition(PlainDescriptor),
    AlertSignal(PlainDescriptor),
    LimitAlertCondition(PlainDescriptor),
    Battery(PlainDescriptor),
    Clock(PlainDescriptor),
    SystemContext(PlainDescriptor),
    Sco(PlainDescriptor),
    PatientContext(PlainDescriptor),
    LocationContext(PlainDescriptor),
    EnsembleContext(PlainDescriptor),
    WorkflowContext(PlainDescriptor),
    OperatorContext(PlainDescriptor),
    MeansContext(PlainDescriptor),
    Operation(OperationDescriptor),
}

impl Descriptor {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Mds(_) => NodeType::Mds,
            Self::Vmd(_) => NodeType::Vmd,
            Self::Channel(_) => NodeType::Channel,
            Self::NumericMetric(_) => NodeType::NumericMetric,
            Self::StringMetric(_) => NodeType::StringMetric,
            Self::EnumStringMetric(_) => NodeType::EnumStringMetric,
            Self::RealTimeSampleArrayMetric(_) => NodeType::RealTimeSampleArrayMetric,
            Self::AlertSystem(_) => NodeType::AlertSystem,
            Self::AlertCondition(_) => NodeType::AlertCondition,
            Self::AlertSignal(_) => NodeType::AlertSignal,
            Self::LimitAlertCondition(_) => NodeType::LimitAlertCondition,
            Self::Battery(_) => NodeType::Battery,
            Self::Clock(_) => NodeType::Clock,
            Self::SystemContext(_) => NodeType::SystemContext,
            Self::Sco(_) => NodeType::Sco,
            Self::PatientContext(_) => NodeType::PatientContext,
            Self::LocationContext(_) => NodeType::LocationContext,
            Self::EnsembleContext(_) => NodeType::EnsembleContext,
            Self::WorkflowContext(_) => NodeType::WorkflowContext,
            Self::OperatorContext(_) => NodeType::OperatorContext,
            Self::MeansContext(_) => NodeType::MeansContext,
            Self::Operation(op) => op.kind,
        }
    }

    pub fn core(&self) -> &DescriptorCore {
        match self {
            Self::Mds(d)
            | Self::Vmd(d)
            | Self::Channel(d)
            | Self::NumericMetric(d)
            | Self::StringMetric(d)
            | Self::EnumStringMetric(d)
            | Self::AlertSystem(d)
            | Self::AlertCondition(d)
            | Self::AlertSignal(d)
            | Self::LimitAlertCondition(d)
            | Self::Battery(d)
            | Self::Clock(d)
            | Self::SystemContext(d)
            | Self::Sco(d)
            | Self::PatientContext(d)
            | Self::LocationContext(d)
            | Self::EnsembleContext(d)
            | Self::WorkflowContext(d)
            | Self::OperatorContext(d)
            | Self::MeansContext(d) => &d.core,
            Self::RealTimeSampleArrayMetric(d) => &d.core,
            Self::Operation(d) => &d.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut DescriptorCore {
        match self {
            Self::Mds(d)
            | Self::Vmd(d)
            | Self::Channel(d)
            | Self::NumericMetric(d)
            | Self::StringMetric(d)
            | Self::EnumStringMetric(d)
            | Self::AlertSystem(d)
            | Self::AlertCondition(d)
            | Self::AlertSignal(d)
            | Self::LimitAlertCondition(d)
            | Self::Battery(d)
            | Self::Clock(d)
            | Self::SystemContext(d)
            | Self::Sco(d)
            | Self::PatientContext(d)
            | Self::LocationContext(d)
            | Self::EnsembleContext(d)
            | Self::WorkflowContext(d)
            | Self::OperatorContext(d)
            | Self::MeansContext(d) => &mut d.core,
            Self::RealTimeSampleArrayMetric(d) => &mut d.core,
            Self::Operation(d) => &mut d.core,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.core().handle
    }

    pub fn parent_handle(&self) -> Option<&Handle> {
        self.core().parent_handle.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mds_accepts_vmd_but_not_metric() {
        assert!(NodeType::Mds.accepts_child(NodeType::Vmd));
        assert!(!NodeType::Mds.accepts_child(NodeType::NumericMetric));
    }

    #[test]
    fn context_descriptors_are_multi_state() {
        assert!(NodeType::PatientContext.is_multi_state());
        assert!(!NodeType::NumericMetric.is_multi_state());
    }
}
