// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Identifier, version, descriptor, state, and entity types (spec.md S3).

pub mod coded_value;
pub mod descriptor;
pub mod entity;
pub mod handle;
pub mod mdib_version_group;
pub mod report_family;
pub mod state;
pub mod version;

pub use coded_value::{CodedValue, DescriptorReferences, Retrievability};
pub use descriptor::{Descriptor, DescriptorCore, NodeType, OperationDescriptor, PlainDescriptor, RtsaMetricDescriptor};
pub use entity::Entity;
pub use handle::Handle;
pub use mdib_version_group::MdibVersionGroup;
pub use report_family::ReportFamily;
pub use state::{ContextAssociation, ContextKind, ContextState, State, StateCore};
pub use version::{MdibVersion, Version};
