// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The XML wire codec seam (spec.md S1: "Out of scope ... the XML wire
//! codec (SOAP envelope build/parse, XML-Schema validation)"). Report
//! bodies, subscribe responses, and faults are built as plain Rust values
//! (`report::ReportBody`, `subscription::Subscription`, ...); a
//! `NotificationCodec` turns one into the encoded bytes this crate hands to
//! `adapters::transport::SoapTransport::post_message_to`.
//!
//! Grounded on `sdc11073.pysoap.msgfactory.MessageFactoryDevice`: one
//! `mk_*_message` method per wire shape, each returning an opaque encoded
//! message rather than exposing the XML tree to callers.

use crate::report::ReportBody;

/// A WS-Addressing reference parameter echoed back on every message to a
/// reference-parameter-dispatched subscription (spec.md S6: "elements
/// included in the Subscribe EPR MUST be echoed as SOAP headers ... with
/// the attribute IsReferenceParameter=true").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceParameter {
    pub qname: String,
    pub text: String,
}

/// Encodes report bodies and subscription-lifecycle messages into bytes
/// ready for `SoapTransport::post_message_to`. Implemented outside this
/// crate by the real SOAP envelope builder + XML-Schema validator.
pub trait NotificationCodec: Send + Sync {
    /// Encodes a committed or periodic report as a WS-Eventing notification
    /// addressed to `notify_to`, carrying `ref_params` as reference
    /// parameter headers (S6).
    fn encode_notification(
        &self,
        report: &ReportBody,
        notify_to: &str,
        ref_params: &[ReferenceParameter],
    ) -> Vec<u8>;

    /// Encodes a `SubscriptionEnd` message (S4.4) with one of the three
    /// status tokens named in S6.
    fn encode_subscription_end(&self, code: &str, reason: &str) -> Vec<u8>;
}
