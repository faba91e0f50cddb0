// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! One subscription's state (spec.md S4.4), grounded on `SubscriptionBase` /
//! `DevSubscription` in `subscriptionmgr.py`.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::adapters::codec::ReferenceParameter;
use crate::report::ReportBody;

use super::roundtrip::{RoundtripStats, RoundtripTracker};

/// How a subscription is addressed on inbound Renew/GetStatus/Unsubscribe
/// and fault dispatch (spec.md S9 "two dispatch identities").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// The subscription is identified by an echoed reference parameter
    /// (`IDENT_TAG` in the source).
    ReferenceParameter,
    /// The subscription is identified by a per-subscription path suffix
    /// appended to the notification endpoint.
    PathSuffix,
}

/// `(ref_param_text, path_suffix)`: the compound key
/// `_mk_dispatch_identifier` builds in the source, generalized to a
/// first-class type so `subscription::table` can index on it directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchIdentifier {
    pub ref_param_text: Option<String>,
    pub path_suffix: Option<String>,
}

/// What the consumer asked for in its `Subscribe` request.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub notify_to: String,
    pub notify_ref_params: Vec<ReferenceParameter>,
    pub end_to: Option<String>,
    pub end_to_ref_params: Vec<ReferenceParameter>,
    pub expires: Option<Duration>,
    /// Action-URI suffixes this subscription wants notified about
    /// (`short_filter_names`, S9).
    pub filters: Vec<String>,
    pub accepted_encodings: Vec<String>,
}

/// One active WS-Eventing subscription and the delivery bookkeeping the
/// manager needs (SubscriptionBase/DevSubscription in the source).
#[derive(Debug, Clone)]
pub struct Subscription {
    pub identifier: Uuid,
    pub dispatch_strategy: DispatchStrategy,
    pub notify_to: String,
    pub notify_ref_params: Vec<ReferenceParameter>,
    pub end_to: Option<String>,
    pub end_to_ref_params: Vec<ReferenceParameter>,
    pub filters: Vec<String>,
    pub accepted_encodings: Vec<String>,
    started_at: Instant,
    expire_seconds: u64,
    max_subscription_duration: Duration,
    notify_errors: u32,
    max_notify_errors: u32,
    closed: bool,
    connection_error: bool,
    roundtrip: RoundtripTracker,
}

impl Subscription {
    pub fn new(
        request: SubscribeRequest,
        dispatch_strategy: DispatchStrategy,
        max_subscription_duration: Duration,
        max_notify_errors: u32,
        max_roundtrip_samples: usize,
    ) -> Self {
        let expire_seconds = request
            .expires
            .unwrap_or(max_subscription_duration)
            .min(max_subscription_duration)
            .as_secs();
        Self {
            identifier: Uuid::new_v4(),
            dispatch_strategy,
            notify_to: request.notify_to,
            notify_ref_params: request.notify_ref_params,
            end_to: request.end_to,
            end_to_ref_params: request.end_to_ref_params,
            filters: request.filters,
            accepted_encodings: request.accepted_encodings,
            started_at: Instant::now(),
            expire_seconds,
            max_subscription_duration,
            notify_errors: 0,
            max_notify_errors,
            closed: false,
            connection_error: false,
            roundtrip: RoundtripTracker::new(max_roundtrip_samples),
        }
    }

    /// The reference parameter text this subscription should be dispatched
    /// on, once a `ReferenceParameter` dispatch strategy assigns one
    /// (`set_reference_parameter` in the source).
    pub fn reference_parameter_text(&self) -> Option<String> {
        match self.dispatch_strategy {
            DispatchStrategy::ReferenceParameter => Some(self.identifier.simple().to_string()),
            DispatchStrategy::PathSuffix => None,
        }
    }

    pub fn path_suffix(&self) -> Option<String> {
        match self.dispatch_strategy {
            DispatchStrategy::PathSuffix => Some(self.identifier.simple().to_string()),
            DispatchStrategy::ReferenceParameter => None,
        }
    }

    /// The compound dispatch key this subscription answers to.
    pub fn dispatch_identifier(&self) -> DispatchIdentifier {
        let hex = self.identifier.simple().to_string();
        match self.dispatch_strategy {
            DispatchStrategy::ReferenceParameter => DispatchIdentifier {
                ref_param_text: Some(hex),
                path_suffix: None,
            },
            DispatchStrategy::PathSuffix => DispatchIdentifier {
                ref_param_text: None,
                path_suffix: Some(hex),
            },
        }
    }

    /// Resets `started_at` and clamps `expires_in` to the configured
    /// maximum (spec.md S4.4 Renew).
    pub fn renew(&mut self, expires: Option<Duration>) {
        self.started_at = Instant::now();
        self.expire_seconds = expires
            .unwrap_or(self.max_subscription_duration)
            .min(self.max_subscription_duration)
            .as_secs();
    }

    pub fn remaining(&self) -> Duration {
        let elapsed = self.started_at.elapsed().as_secs();
        let total = self.expire_seconds;
        if elapsed >= total {
            Duration::ZERO
        } else {
            Duration::from_secs(total - elapsed)
        }
    }

    pub fn has_delivery_failure(&self) -> bool {
        self.notify_errors >= self.max_notify_errors
    }

    pub fn has_connection_error(&self) -> bool {
        self.connection_error
    }

    /// S4.4: "valid iff not expired, not closed, and `notify_errors <
    /// MAX_NOTIFY_ERRORS`".
    pub fn is_valid(&self) -> bool {
        !self.closed && self.remaining() > Duration::ZERO && !self.has_delivery_failure()
    }

    /// Suffix-matches `action` against this subscription's filters (S6,
    /// S9 "two dispatch identities"; filter matching itself is
    /// strategy-independent).
    pub fn matches(&self, action: &str) -> bool {
        let action = action.trim();
        self.filters.iter().any(|f| action.ends_with(f.as_str()))
    }

    /// `short_filter_names` in the source: the last path segment of each
    /// filter URI, for log lines.
    pub fn short_filter_names(&self) -> Vec<&str> {
        self.filters
            .iter()
            .map(|f| f.rsplit('/').next().unwrap_or(f.as_str()))
            .collect()
    }

    pub fn record_notify_success(&mut self, roundtrip: Option<Duration>) {
        self.notify_errors = 0;
        self.connection_error = false;
        if let Some(roundtrip) = roundtrip {
            self.roundtrip.record(roundtrip);
        }
    }

    pub fn record_notify_failure(&mut self, is_connection_error: bool) {
        self.notify_errors += 1;
        self.connection_error = is_connection_error;
    }

    pub fn roundtrip_stats(&self) -> RoundtripStats {
        self.roundtrip.stats()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn notify_to_netloc(&self) -> &str {
        netloc_of(&self.notify_to)
    }

    /// `action` is checked against `matches` by the caller before building
    /// this; it's threaded through only to let the codec stamp the WS-A
    /// header.
    pub fn report_action<'a>(&self, report: &'a ReportBody) -> &'a str {
        report.action()
    }
}

/// Strips scheme and path from a URL, leaving `host:port`
/// (`urlparse(...).netloc` in the source).
pub fn netloc_of(url: &str) -> &str {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme.split(['/', '?']).next().unwrap_or(without_scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(filters: &[&str]) -> SubscribeRequest {
        SubscribeRequest {
            notify_to: "http://10.0.0.5:8080/notify".to_string(),
            notify_ref_params: vec![],
            end_to: None,
            end_to_ref_params: vec![],
            expires: None,
            filters: filters.iter().map(|s| s.to_string()).collect(),
            accepted_encodings: vec![],
        }
    }

    #[test]
    fn netloc_extracted_from_url() {
        assert_eq!(netloc_of("http://10.0.0.5:8080/notify"), "10.0.0.5:8080");
    }

    #[test]
    fn new_subscription_is_valid() {
        let sub = Subscription::new(
            req(&["EpisodicMetricReport"]),
            DispatchStrategy::ReferenceParameter,
            Duration::from_secs(7200),
            1,
            20,
        );
        assert!(sub.is_valid());
        assert_eq!(sub.notify_to_netloc(), "10.0.0.5:8080");
    }

    #[test]
    fn expires_param_is_clamped_to_max() {
        let mut request = req(&[]);
        request.expires = Some(Duration::from_secs(99_999));
        let sub = Subscription::new(
            request,
            DispatchStrategy::PathSuffix,
            Duration::from_secs(7200),
            1,
            20,
        );
        assert_eq!(sub.remaining(), Duration::from_secs(7200));
    }

    #[test]
    fn matches_suffix_of_action_uri() {
        let sub = Subscription::new(
            req(&["EpisodicMetricReport"]),
            DispatchStrategy::ReferenceParameter,
            Duration::from_secs(7200),
            1,
            20,
        );
        assert!(sub.matches("http://standard.org/glue/biceps/MessageModel/EpisodicMetricReport"));
        assert!(!sub.matches("http://standard.org/glue/biceps/MessageModel/EpisodicAlertReport"));
    }

    #[test]
    fn delivery_failure_after_max_notify_errors() {
        let mut sub = Subscription::new(
            req(&[]),
            DispatchStrategy::ReferenceParameter,
            Duration::from_secs(7200),
            1,
            20,
        );
        sub.record_notify_failure(false);
        assert!(sub.has_delivery_failure());
        assert!(!sub.is_valid());
    }

    #[test]
    fn path_suffix_strategy_populates_path_suffix_only() {
        let sub = Subscription::new(
            req(&[]),
            DispatchStrategy::PathSuffix,
            Duration::from_secs(7200),
            1,
            20,
        );
        let id = sub.dispatch_identifier();
        assert!(id.ref_param_text.is_none());
        assert!(id.path_suffix.is_some());
    }
}
