// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The SOAP client pool (spec.md S4.5): one transport per peer netloc,
//! reference-counted by interested callers (subscriptions, one-shot
//! requests). Propagates unreachability to every registered callback and
//! tears down idle transports.
//!
//! Grounded on `sdc11073.pysoap.soapclientpool.SoapClientPool` /
//! `_SoapClientEntry`: a netloc-keyed map of `(transport, callbacks-by-epr)`
//! entries, generalized here from Python's "callback is any hashable
//! object" to an explicit `CallbackId` the caller holds onto (S5 "one lock
//! protecting the netloc->entry map").

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::adapters::{SoapTransport, SoapTransportFactory};
use crate::error::{Error, Result};

/// Identifies one `register()` call so `forget_callback` can remove it
/// without requiring the callback closure to be comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

struct Entry {
    transport: Option<Arc<dyn SoapTransport>>,
    /// epr -> callbacks registered against that epr, in registration order.
    callbacks: HashMap<String, Vec<(CallbackId, Arc<dyn Fn() + Send + Sync>)>>,
}

impl Entry {
    fn is_empty(&self) -> bool {
        self.callbacks.values().all(Vec::is_empty)
    }

    fn close_if_empty(&mut self) {
        if self.is_empty() {
            if let Some(transport) = self.transport.take() {
                transport.close();
            }
        }
    }
}

/// The pool itself. One `parking_lot::Mutex` guards the whole netloc map,
/// matching spec.md S5's "one lock protecting the netloc->entry map;
/// transport objects themselves are thread-safe or externally serialized".
pub struct SoapClientPool {
    factory: Arc<dyn SoapTransportFactory>,
    entries: Mutex<HashMap<String, Entry>>,
    next_callback_id: AtomicU64,
}

impl SoapClientPool {
    pub fn new(factory: Arc<dyn SoapTransportFactory>) -> Self {
        Self {
            factory,
            entries: Mutex::new(HashMap::new()),
            next_callback_id: AtomicU64::new(1),
        }
    }

    /// Reserves a slot for `netloc`/`epr`; does not open the connection yet
    /// (S4.5: "does not open the connection yet").
    pub fn register(
        &self,
        netloc: &str,
        epr: &str,
        on_unreachable: Arc<dyn Fn() + Send + Sync>,
    ) -> CallbackId {
        let id = CallbackId(self.next_callback_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock();
        let entry = entries.entry(netloc.to_string()).or_insert_with(|| Entry {
            transport: None,
            callbacks: HashMap::new(),
        });
        entry.callbacks.entry(epr.to_string()).or_default().push((id, on_unreachable));
        id
    }

    /// Lazily creates the underlying transport on first use; fails if
    /// `netloc` was never `register`ed (S4.5).
    pub fn get(&self, netloc: &str, accepted_encodings: &[String]) -> Result<Arc<dyn SoapTransport>> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(netloc)
            .ok_or_else(|| Error::UnreachableNetloc(netloc.to_string()))?;
        if entry.transport.is_none() {
            entry.transport = Some(self.factory.create(netloc, accepted_encodings)?);
        }
        Ok(entry.transport.as_ref().expect("just set").clone())
    }

    /// Decrements the reference count for `id`; closes the transport once
    /// no callback remains for its netloc (S4.5).
    pub fn forget_callback(&self, id: CallbackId) {
        let mut entries = self.entries.lock();
        let mut empty_netloc = None;
        for (netloc, entry) in entries.iter_mut() {
            let mut found = false;
            for callbacks in entry.callbacks.values_mut() {
                if let Some(pos) = callbacks.iter().position(|(cb_id, _)| *cb_id == id) {
                    callbacks.remove(pos);
                    found = true;
                    break;
                }
            }
            if found {
                entry.callbacks.retain(|_, v| !v.is_empty());
                entry.close_if_empty();
                if entry.is_empty() {
                    empty_netloc = Some(netloc.clone());
                }
                break;
            }
        }
        if let Some(netloc) = empty_netloc {
            entries.remove(&netloc);
        }
    }

    /// Decrements the reference count for one `(netloc, epr)` pair; closes
    /// the transport only if the netloc becomes empty (S4.5).
    pub fn forget_epr(&self, netloc: &str, epr: &str) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(netloc) else { return };
        entry.callbacks.remove(epr);
        entry.close_if_empty();
        if entry.is_empty() {
            entries.remove(netloc);
        }
    }

    /// Invokes every callback for `netloc`, drops the slot, and closes the
    /// transport (S4.5). After this call, `get(netloc, ..)` fails until a
    /// new `register`.
    pub fn report_unreachable_netloc(&self, netloc: &str) {
        let entry = {
            let mut entries = self.entries.lock();
            entries.remove(netloc)
        };
        let Some(mut entry) = entry else { return };
        for callbacks in entry.callbacks.values() {
            for (_, cb) in callbacks {
                cb();
            }
        }
        entry.callbacks.clear();
        entry.close_if_empty();
    }

    /// Invokes callbacks for `epr` only; closes the transport only if
    /// `netloc` becomes empty afterward (S4.5).
    pub fn report_unreachable_epr(&self, netloc: &str, epr: &str) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(netloc) else { return };
        if let Some(callbacks) = entry.callbacks.remove(epr) {
            for (_, cb) in &callbacks {
                cb();
            }
        }
        entry.close_if_empty();
        if entry.is_empty() {
            entries.remove(netloc);
        }
    }

    pub fn is_registered(&self, netloc: &str) -> bool {
        self.entries.lock().contains_key(netloc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct StubTransport {
        netloc: String,
        closed: Arc<AtomicBool>,
    }

    impl SoapTransport for StubTransport {
        fn netloc(&self) -> &str {
            &self.netloc
        }
        fn post_message_to(&self, _path: &str, _message: &[u8]) -> Result<()> {
            Ok(())
        }
        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct StubFactory {
        closed: Arc<AtomicBool>,
    }

    impl SoapTransportFactory for StubFactory {
        fn create(&self, netloc: &str, _accepted_encodings: &[String]) -> Result<Arc<dyn SoapTransport>> {
            Ok(Arc::new(StubTransport {
                netloc: netloc.to_string(),
                closed: self.closed.clone(),
            }))
        }
    }

    #[test]
    fn get_without_register_fails() {
        let closed = Arc::new(AtomicBool::new(false));
        let pool = SoapClientPool::new(Arc::new(StubFactory { closed }));
        assert!(pool.get("host:1", &[]).is_err());
    }

    #[test]
    fn forget_last_callback_closes_transport() {
        let closed = Arc::new(AtomicBool::new(false));
        let pool = SoapClientPool::new(Arc::new(StubFactory { closed: closed.clone() }));
        let id = pool.register("host:1", "epr-a", Arc::new(|| {}));
        pool.get("host:1", &[]).unwrap();
        pool.forget_callback(id);
        assert!(closed.load(Ordering::SeqCst));
        assert!(!pool.is_registered("host:1"));
    }

    #[test]
    fn report_unreachable_netloc_invokes_every_callback() {
        let closed = Arc::new(AtomicBool::new(false));
        let pool = SoapClientPool::new(Arc::new(StubFactory { closed }));
        let fired_a = Arc::new(AtomicBool::new(false));
        let fired_b = Arc::new(AtomicBool::new(false));
        let (fa, fb) = (fired_a.clone(), fired_b.clone());
        pool.register("host:1", "epr-a", Arc::new(move || fa.store(true, Ordering::SeqCst)));
        pool.register("host:1", "epr-b", Arc::new(move || fb.store(true, Ordering::SeqCst)));
        pool.get("host:1", &[]).unwrap();
        pool.report_unreachable_netloc("host:1");
        assert!(fired_a.load(Ordering::SeqCst));
        assert!(fired_b.load(Ordering::SeqCst));
        assert!(pool.get("host:1", &[]).is_err());
    }

    #[test]
    fn report_unreachable_epr_keeps_netloc_alive_for_other_eprs() {
        let closed = Arc::new(AtomicBool::new(false));
        let pool = SoapClientPool::new(Arc::new(StubFactory { closed: closed.clone() }));
        pool.register("host:1", "epr-a", Arc::new(|| {}));
        pool.register("host:1", "epr-b", Arc::new(|| {}));
        pool.get("host:1", &[]).unwrap();
        pool.report_unreachable_epr("host:1", "epr-a");
        assert!(!closed.load(Ordering::SeqCst));
        assert!(pool.is_registered("host:1"));
    }
}
