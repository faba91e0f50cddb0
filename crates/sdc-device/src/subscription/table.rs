// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The subscription multi-index table (spec.md S4.4), grounded on
//! `multikey.MultiKeyLookup` as used by `SubscriptionsManagerBase`: one
//! unique index by dispatch identifier and by subscription identifier, one
//! non-unique index by notify-to netloc. Reused from the same
//! one-`RwLock`-guarding-several-HashMaps pattern as `entity::table`.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use super::subscription::{DispatchIdentifier, Subscription};

struct Inner {
    by_identifier: HashMap<Uuid, Subscription>,
    by_dispatch: HashMap<DispatchIdentifier, Uuid>,
    by_netloc: HashMap<String, Vec<Uuid>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            by_identifier: HashMap::new(),
            by_dispatch: HashMap::new(),
            by_netloc: HashMap::new(),
        }
    }
}

#[derive(Default)]
pub struct SubscriptionTable {
    inner: RwLock<Inner>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }

    pub fn insert(&self, subscription: Subscription) {
        let mut inner = self.inner.write();
        let id = subscription.identifier;
        inner.by_dispatch.insert(subscription.dispatch_identifier(), id);
        inner
            .by_netloc
            .entry(subscription.notify_to_netloc().to_string())
            .or_default()
            .push(id);
        inner.by_identifier.insert(id, subscription);
    }

    pub fn get_by_dispatch(&self, dispatch: &DispatchIdentifier) -> Option<Uuid> {
        self.inner.read().by_dispatch.get(dispatch).copied()
    }

    pub fn with<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&Subscription) -> R,
    {
        self.inner.read().by_identifier.get(&id).map(f)
    }

    pub fn with_mut<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut Subscription) -> R,
    {
        self.inner.write().by_identifier.get_mut(&id).map(f)
    }

    /// Removes one subscription by identifier; returns it for callers that
    /// need a final look (e.g. to send `SubscriptionEnd`).
    pub fn remove(&self, id: Uuid) -> Option<Subscription> {
        let mut inner = self.inner.write();
        let subscription = inner.by_identifier.remove(&id)?;
        inner.by_dispatch.remove(&subscription.dispatch_identifier());
        if let Some(ids) = inner.by_netloc.get_mut(subscription.notify_to_netloc()) {
            ids.retain(|&i| i != id);
            if ids.is_empty() {
                inner.by_netloc.remove(subscription.notify_to_netloc());
            }
        }
        Some(subscription)
    }

    pub fn netloc_subscriber_count(&self, netloc: &str) -> usize {
        self.inner.read().by_netloc.get(netloc).map(Vec::len).unwrap_or(0)
    }

    /// All identifiers whose subscription matches `action`, snapshot at
    /// call time (`_get_subscriptions_for_action` in the source).
    pub fn ids_matching(&self, action: &str) -> Vec<Uuid> {
        self.inner
            .read()
            .by_identifier
            .values()
            .filter(|s| s.matches(action))
            .map(|s| s.identifier)
            .collect()
    }

    pub fn all_ids(&self) -> Vec<Uuid> {
        self.inner.read().by_identifier.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_identifier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Vec<Subscription> {
        let mut inner = self.inner.write();
        inner.by_dispatch.clear();
        inner.by_netloc.clear();
        inner.by_identifier.drain().map(|(_, s)| s).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::subscription::{DispatchStrategy, SubscribeRequest};
    use std::time::Duration;

    fn sub(strategy: DispatchStrategy) -> Subscription {
        Subscription::new(
            SubscribeRequest {
                notify_to: "http://10.0.0.5:8080/notify".to_string(),
                notify_ref_params: vec![],
                end_to: None,
                end_to_ref_params: vec![],
                expires: None,
                filters: vec!["EpisodicMetricReport".to_string()],
                accepted_encodings: vec![],
            },
            strategy,
            Duration::from_secs(7200),
            1,
            20,
        )
    }

    #[test]
    fn insert_then_find_by_dispatch_identifier() {
        let table = SubscriptionTable::new();
        let subscription = sub(DispatchStrategy::ReferenceParameter);
        let dispatch_id = subscription.dispatch_identifier();
        let id = subscription.identifier;
        table.insert(subscription);
        assert_eq!(table.get_by_dispatch(&dispatch_id), Some(id));
    }

    #[test]
    fn remove_clears_all_indices() {
        let table = SubscriptionTable::new();
        let subscription = sub(DispatchStrategy::PathSuffix);
        let dispatch_id = subscription.dispatch_identifier();
        let id = subscription.identifier;
        table.insert(subscription);
        table.remove(id);
        assert_eq!(table.get_by_dispatch(&dispatch_id), None);
        assert_eq!(table.netloc_subscriber_count("10.0.0.5:8080"), 0);
    }

    #[test]
    fn ids_matching_filters_by_action_suffix() {
        let table = SubscriptionTable::new();
        table.insert(sub(DispatchStrategy::ReferenceParameter));
        let matches = table.ids_matching("http://standard.org/glue/biceps/MessageModel/EpisodicMetricReport");
        assert_eq!(matches.len(), 1);
        assert!(table
            .ids_matching("http://standard.org/glue/biceps/MessageModel/EpisodicAlertReport")
            .is_empty());
    }
}
