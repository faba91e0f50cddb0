// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The subscription lifecycle and report fan-out (spec.md S4.4), grounded
//! on `SubscriptionsManagerBase`/`SubscriptionsManagerPath`/
//! `SubscriptionsManagerReferenceParam` in `subscriptionmgr.py`.

pub mod roundtrip;
pub mod subscription;
pub mod table;

pub use roundtrip::{RoundtripStats, RoundtripTracker};
pub use subscription::{DispatchIdentifier, DispatchStrategy, SubscribeRequest, Subscription};
pub use table::SubscriptionTable;

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::adapters::codec::{NotificationCodec, ReferenceParameter};
use crate::adapters::logging::{DeviceLogger, LogLevel};
use crate::client_pool::SoapClientPool;
use crate::config::SubscriptionConfig;
use crate::error::{Error, Result};
use crate::report::ReportBody;

/// A unique reference-parameter QName stamped on every notification to a
/// `ReferenceParameter`-dispatched subscription (`IDENT_TAG` in the
/// source).
pub const IDENTIFIER_QNAME: &str = "http.local.com:MyDevIdentifier";

/// Subscribe/Renew/GetStatus/Unsubscribe plus report fan-out (S4.4).
/// Holds one `SubscriptionTable`, the shared `SoapClientPool`, and the
/// dispatch strategy new subscriptions are created with.
pub struct SubscriptionManager {
    table: SubscriptionTable,
    client_pool: Arc<SoapClientPool>,
    codec: Arc<dyn NotificationCodec>,
    logger: Arc<dyn DeviceLogger>,
    dispatch_strategy: DispatchStrategy,
    config: SubscriptionConfig,
}

impl SubscriptionManager {
    pub fn new(
        client_pool: Arc<SoapClientPool>,
        codec: Arc<dyn NotificationCodec>,
        logger: Arc<dyn DeviceLogger>,
        dispatch_strategy: DispatchStrategy,
        config: SubscriptionConfig,
    ) -> Self {
        Self {
            table: SubscriptionTable::new(),
            client_pool,
            codec,
            logger,
            dispatch_strategy,
            config,
        }
    }

    /// Registers a new subscription and assigns it a soap-client slot in
    /// the pool (S4.4).
    pub fn subscribe(&self, request: SubscribeRequest) -> Uuid {
        let subscription = Subscription::new(
            request,
            self.dispatch_strategy,
            self.config.max_subscription_duration,
            self.config.max_notify_errors,
            self.config.max_roundtrip_samples,
        );
        let netloc = subscription.notify_to_netloc().to_string();
        let id = subscription.identifier;
        let accepted_encodings = subscription.accepted_encodings.clone();
        self.client_pool
            .register(&netloc, &id.simple().to_string(), Arc::new(|| {}));
        // assigns a soap client slot eagerly, mirroring the source
        // (`on_subscribe_request` calls `get_soap_client` before storing
        // the subscription, not lazily at first notification).
        let _ = self.client_pool.get(&netloc, &accepted_encodings);
        self.logger.log(
            LogLevel::Info,
            "sdc.device.subscrMgr",
            &format!("new subscription {id} notify_to={netloc}"),
        );
        self.table.insert(subscription);
        id
    }

    /// Looks a subscription up by its wire-level dispatch key; `Err` maps
    /// to `Error::invalid_message`/`Error::unable_to_renew` at call sites
    /// (S6 "Receiver, subcode InvalidMessage or UnableToRenew").
    fn find_by_dispatch(&self, dispatch: &DispatchIdentifier) -> Option<Uuid> {
        self.table.get_by_dispatch(dispatch)
    }

    pub fn renew(&self, dispatch: &DispatchIdentifier, expires: Option<std::time::Duration>) -> Result<std::time::Duration> {
        let id = self
            .find_by_dispatch(dispatch)
            .ok_or_else(|| Error::unable_to_renew("unknown subscription identifier"))?;
        self.table
            .with_mut(id, |s| {
                s.renew(expires);
                s.remaining()
            })
            .ok_or_else(|| Error::unable_to_renew("unknown subscription identifier"))
    }

    pub fn get_status(&self, dispatch: &DispatchIdentifier) -> Result<std::time::Duration> {
        let id = self
            .find_by_dispatch(dispatch)
            .ok_or_else(|| Error::invalid_message("unknown subscription identifier"))?;
        self.table
            .with(id, |s| s.remaining())
            .ok_or_else(|| Error::invalid_message("unknown subscription identifier"))
    }

    /// S4.4: well-formed fault, not a crash, on an already-removed
    /// subscription ("Unsubscribe on an already-removed subscription
    /// yields a well-formed fault").
    pub fn unsubscribe(&self, dispatch: &DispatchIdentifier) -> Result<()> {
        let id = self
            .find_by_dispatch(dispatch)
            .ok_or_else(|| Error::invalid_message("unknown subscription identifier"))?;
        let subscription = self.table.remove(id).expect("looked up under the same table");
        let netloc = subscription.notify_to_netloc().to_string();
        self.logger.log(
            LogLevel::Info,
            "sdc.device.subscrMgr",
            &format!("unsubscribe: {id} removed (notify_to={netloc})"),
        );
        if self.table.netloc_subscriber_count(&netloc) == 0 {
            self.client_pool.forget_epr(&netloc, &id.simple().to_string());
        }
        Ok(())
    }

    /// Builds the reference parameters and/or path suffix the subscribe
    /// response must echo back, per the active dispatch strategy.
    pub fn response_addressing(&self, id: Uuid) -> Option<(Vec<ReferenceParameter>, Option<String>)> {
        self.table.with(id, |s| {
            let ref_params = s
                .reference_parameter_text()
                .map(|text| {
                    vec![ReferenceParameter {
                        qname: IDENTIFIER_QNAME.to_string(),
                        text,
                    }]
                })
                .unwrap_or_default();
            (ref_params, s.path_suffix())
        })
    }

    /// Fans a committed or periodic report out to every matching
    /// subscription, then runs housekeeping (`send_to_subscribers` in the
    /// source).
    pub fn send_to_subscribers(&self, report: &ReportBody) {
        let action = report.action();
        for id in self.table.ids_matching(action) {
            self.send_one(id, report);
        }
        self.housekeeping();
    }

    fn send_one(&self, id: Uuid, report: &ReportBody) {
        let Some((notify_to, ref_params, valid)) = self.table.with(id, |s| {
            (s.notify_to.clone(), s.notify_ref_params.clone(), s.is_valid())
        }) else {
            return;
        };
        if !valid {
            return;
        }
        let netloc = self
            .table
            .with(id, |s| s.notify_to_netloc().to_string())
            .unwrap_or_default();
        let path = notify_to.split_once("://").map(|(_, rest)| rest).unwrap_or(&notify_to);
        let path = path.splitn(2, '/').nth(1).map(|p| format!("/{p}")).unwrap_or_default();
        let message = self.codec.encode_notification(report, &notify_to, &ref_params);
        let started = Instant::now();
        let outcome = self
            .client_pool
            .get(&netloc, &[])
            .and_then(|transport| transport.post_message_to(&path, &message));
        match outcome {
            Ok(()) => {
                let roundtrip = started.elapsed();
                self.table.with_mut(id, |s| s.record_notify_success(Some(roundtrip)));
            }
            Err(Error::Transport(reason)) => {
                self.logger.log(
                    LogLevel::Error,
                    "sdc.device.subscrMgr",
                    &format!("could not send notification report: {reason}"),
                );
                self.table.with_mut(id, |s| s.record_notify_failure(true));
            }
            Err(other) => {
                self.logger.log(
                    LogLevel::Error,
                    "sdc.device.subscrMgr",
                    &format!("could not send notification report: {other}"),
                );
                self.table.with_mut(id, |s| s.record_notify_failure(false));
            }
        }
    }

    /// Removes expired/invalid subscriptions and any other subscription
    /// sharing a now-unreachable netloc (`_do_housekeeping` in the
    /// source).
    fn housekeeping(&self) {
        let invalid: Vec<Uuid> = self
            .table
            .all_ids()
            .into_iter()
            .filter(|&id| !self.table.with(id, |s| s.is_valid()).unwrap_or(false))
            .collect();

        let mut unreachable_netlocs = Vec::new();
        for id in invalid {
            let Some(subscription) = self.table.remove(id) else { continue };
            if subscription.has_connection_error() {
                unreachable_netlocs.push(subscription.notify_to_netloc().to_string());
            }
            self.logger.log(
                LogLevel::Info,
                "sdc.device.subscrMgr",
                &format!("deleting subscription {id}"),
            );
        }

        for netloc in &unreachable_netlocs {
            let also_unreachable: Vec<Uuid> = self
                .table
                .all_ids()
                .into_iter()
                .filter(|&id| self.table.with(id, |s| s.notify_to_netloc() == netloc).unwrap_or(false))
                .collect();
            for id in also_unreachable {
                self.logger.log(
                    LogLevel::Info,
                    "sdc.device.subscrMgr",
                    &format!("deleting also subscription {id}, same endpoint"),
                );
                self.table.remove(id);
            }
            self.client_pool.report_unreachable_netloc(netloc);
        }
    }

    /// `SubscriptionEnd` fallback per spec.md S6: one of three status
    /// codes the codec encodes into the wire message.
    pub fn send_subscription_end(&self, id: Uuid, code: SubscriptionEndCode, reason: &str) {
        let Some((notify_to, ref_params, valid)) = self.table.with(id, |s| {
            (s.notify_to.clone(), s.notify_ref_params.clone(), s.is_valid())
        }) else {
            return;
        };
        if !valid {
            return;
        }
        let message = self.codec.encode_subscription_end(code.as_str(), reason);
        let netloc = self
            .table
            .with(id, |s| s.notify_to_netloc().to_string())
            .unwrap_or_default();
        let path = notify_to.split_once("://").map(|(_, rest)| rest).unwrap_or(&notify_to);
        let path = path.splitn(2, '/').nth(1).map(|p| format!("/{p}")).unwrap_or_default();
        let _ = ref_params;
        if let Ok(transport) = self.client_pool.get(&netloc, &[]) {
            let _ = transport.post_message_to(&path, &message);
        }
        self.table.with_mut(id, |s| s.close());
    }

    /// `end_all_subscriptions` in the source: closes every subscription,
    /// optionally notifying each first.
    pub fn end_all_subscriptions(&self, send_subscription_end: bool) {
        if send_subscription_end {
            for id in self.table.all_ids() {
                self.send_subscription_end(id, SubscriptionEndCode::SourceShuttingDown, "Event source going off line.");
            }
        }
        self.table.clear();
    }

    /// `on_unreachable` in the source: called back when the client pool
    /// reports a netloc dead from outside this manager (e.g. another
    /// manager instance sharing the pool).
    pub fn on_unreachable(&self, netloc: &str) {
        let ids: Vec<Uuid> = self
            .table
            .all_ids()
            .into_iter()
            .filter(|&id| self.table.with(id, |s| s.notify_to_netloc() == netloc).unwrap_or(false))
            .collect();
        for id in ids {
            self.table.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// The three `SubscriptionEnd` status tokens spec.md S6 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEndCode {
    SourceShuttingDown,
    DeliveryFailure,
    Cancelled,
}

impl SubscriptionEndCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceShuttingDown => "SourceShuttingDown",
            Self::DeliveryFailure => "DeliveryFailure",
            Self::Cancelled => "Cancelled",
        }
    }
}
