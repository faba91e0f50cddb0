// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Action URIs (spec.md S6): "Each report family ... has a distinct action
//! URI defined by the SDC profile." `Subscription::matches` suffix-matches
//! against these (S6, S9 "two dispatch identities").

pub const EPISODIC_METRIC_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/EpisodicMetricReport";
pub const PERIODIC_METRIC_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/PeriodicMetricReport";
pub const EPISODIC_ALERT_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/EpisodicAlertReport";
pub const PERIODIC_ALERT_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/PeriodicAlertReport";
pub const EPISODIC_COMPONENT_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/EpisodicComponentReport";
pub const PERIODIC_COMPONENT_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/PeriodicComponentReport";
pub const EPISODIC_CONTEXT_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/EpisodicContextReport";
pub const PERIODIC_CONTEXT_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/PeriodicContextReport";
pub const EPISODIC_OPERATIONAL_STATE_REPORT: &str =
    "http://standard.org/glue/biceps/MessageModel/EpisodicOperationalStateReport";
pub const PERIODIC_OPERATIONAL_STATE_REPORT: &str =
    "http://standard.org/glue/biceps/MessageModel/PeriodicOperationalStateReport";
pub const DESCRIPTION_MODIFICATION_REPORT: &str =
    "http://standard.org/glue/biceps/MessageModel/DescriptionModificationReport";
pub const WAVEFORM_STREAM: &str = "http://standard.org/glue/biceps/MessageModel/WaveformStream";
pub const OPERATION_INVOKED_REPORT: &str = "http://standard.org/glue/biceps/MessageModel/OperationInvokedReport";

pub const SET_VALUE: &str = "http://standard.org/glue/biceps/MessageModel/SetValue";
pub const SET_STRING: &str = "http://standard.org/glue/biceps/MessageModel/SetString";
pub const SET_METRIC_STATE: &str = "http://standard.org/glue/biceps/MessageModel/SetMetricState";
pub const SET_ALERT_STATE: &str = "http://standard.org/glue/biceps/MessageModel/SetAlertState";
pub const SET_COMPONENT_STATE: &str = "http://standard.org/glue/biceps/MessageModel/SetComponentState";
pub const SET_CONTEXT_STATE: &str = "http://standard.org/glue/biceps/MessageModel/SetContextState";
pub const ACTIVATE: &str = "http://standard.org/glue/biceps/MessageModel/Activate";
