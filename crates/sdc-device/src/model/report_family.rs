// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Report family tags (S4.3, GLOSSARY "Report family").

/// One of the fixed report families; also used as the periodic-report
/// queue key (S4.6) and the subscription filter matching key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFamily {
    Metric,
    Alert,
    Component,
    Context,
    Operational,
    Waveform,
    Description,
    OperationInvoked,
}

impl ReportFamily {
    /// All families that are ever queued by the periodic-report aggregator
    /// (S4.6); waveform streams and `OperationInvokedReport` have no
    /// periodic counterpart.
    pub const PERIODIC_ELIGIBLE: &'static [ReportFamily] = &[
        ReportFamily::Metric,
        ReportFamily::Alert,
        ReportFamily::Component,
        ReportFamily::Context,
        ReportFamily::Operational,
    ];
}
