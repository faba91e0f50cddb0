// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Report builders (spec.md S4.3): translate committed diffs into report
//! bodies of fixed shapes, each carrying an action URI.

pub mod action;
pub mod body;

pub use body::{
    ContextReport, DescriptionModificationPart, DescriptionModificationReport, InvocationErrorKind,
    ModificationType, OperationInvokedReportBody, PeriodicContextReport, PeriodicEntry, PeriodicStateReport,
    ReportBody, StateReport, WaveformReport,
};
