// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The reconnect supervisor (spec.md S4.9): watches a set of consumers for
//! disconnection and restarts them against a rediscovered endpoint.
//! Grounded on `sdc11073.reconnect.ReconnectAgent`. The source runs this as
//! a daemon thread sleeping between cycles; this crate spawns no threads of
//! its own (S5), so `tick()` runs one cycle and returns the `Duration` the
//! host should wait before calling it again (see DESIGN.md).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::adapters::discovery::DiscoveryClient;
use crate::adapters::logging::{DeviceLogger, LogLevel};
use crate::config::ReconnectConfig;
use crate::error::{Error, Result};

const LOG_TARGET: &str = "sdc.reconnect";

/// A tracked consumer, addressed by its provider's stable endpoint
/// reference (`ConsumerEntry` in the source).
pub trait ReconnectableConsumer: Send + Sync {
    /// The provider's stable endpoint reference, used to match discovery results.
    fn epr(&self) -> &str;
    fn is_connected(&self) -> bool;
    /// Re-establishes the connection against a freshly discovered transport address.
    fn restart(&self, new_device_location: &str);
}

struct Entry {
    service_epr: String,
    consumer: Arc<dyn ReconnectableConsumer>,
}

/// Watches registered consumers and restarts any that drop their
/// connection, once WS-Discovery reports the provider reachable again
/// (S4.9).
pub struct ReconnectSupervisor {
    discovery: Arc<dyn DiscoveryClient>,
    types: Vec<String>,
    scopes: Vec<String>,
    config: ReconnectConfig,
    logger: Arc<dyn DeviceLogger>,
    entries: Mutex<Vec<Entry>>,
}

impl ReconnectSupervisor {
    pub fn new(
        discovery: Arc<dyn DiscoveryClient>,
        types: Vec<String>,
        scopes: Vec<String>,
        config: ReconnectConfig,
        logger: Arc<dyn DeviceLogger>,
    ) -> Self {
        Self {
            discovery,
            types,
            scopes,
            config,
            logger,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Starts watching `consumer`, addressed by the provider's stable
    /// endpoint reference `service_epr`. Fails if `consumer` is already
    /// tracked (identity comparison, per the source's `ValueError`).
    pub fn keep_connected(&self, service_epr: impl Into<String>, consumer: Arc<dyn ReconnectableConsumer>) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| Arc::ptr_eq(&e.consumer, &consumer)) {
            return Err(Error::ApiMisuse("consumer is already tracked for reconnect".to_string()));
        }
        entries.push(Entry {
            service_epr: service_epr.into(),
            consumer,
        });
        Ok(())
    }

    /// Stops watching `consumer`. Fails if it was never tracked.
    pub fn forget(&self, consumer: &Arc<dyn ReconnectableConsumer>) -> Result<()> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| !Arc::ptr_eq(&e.consumer, consumer));
        if entries.len() == before {
            return Err(Error::ApiMisuse("consumer is not tracked for reconnect".to_string()));
        }
        Ok(())
    }

    pub fn tracked_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Runs one supervision cycle (S4.9): snapshots disconnected consumers,
    /// probes discovery if any exist, restarts those now reachable, and
    /// returns how long the host should sleep before the next call.
    pub fn tick(&self) -> Duration {
        let disconnected: Vec<usize> = self
            .entries
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.consumer.is_connected())
            .map(|(i, _)| i)
            .collect();

        if disconnected.is_empty() {
            return self.config.idle_poll_interval;
        }

        let discovered = self
            .discovery
            .search_services(&self.types, &self.scopes, self.config.search_timeout);

        let entries = self.entries.lock();
        for index in disconnected {
            let Some(entry) = entries.get(index) else { continue };
            if entry.consumer.is_connected() {
                continue;
            }
            let Some(found) = discovered.iter().find(|d| d.epr == entry.service_epr) else {
                continue;
            };
            let Some(x_addr) = found.x_addrs.first() else { continue };
            self.logger.log(
                LogLevel::Info,
                LOG_TARGET,
                &format!("restarting consumer for {} at {x_addr}", entry.service_epr),
            );
            entry.consumer.restart(x_addr);
        }

        self.config.reconnect_cooloff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::discovery::DiscoveredService;
    use crate::adapters::logging::FacadeLogger;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubDiscovery {
        services: Vec<DiscoveredService>,
    }

    impl DiscoveryClient for StubDiscovery {
        fn search_services(&self, _types: &[String], _scopes: &[String], _timeout: Duration) -> Vec<DiscoveredService> {
            self.services.clone()
        }
    }

    struct StubConsumer {
        connected: AtomicBool,
        restarted_at: Mutex<Option<String>>,
    }

    impl ReconnectableConsumer for StubConsumer {
        fn epr(&self) -> &str {
            "urn:uuid:provider-1"
        }
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
        fn restart(&self, new_device_location: &str) {
            self.connected.store(true, Ordering::SeqCst);
            *self.restarted_at.lock() = Some(new_device_location.to_string());
        }
    }

    #[test]
    fn connected_consumers_yield_idle_poll_interval() {
        let discovery = Arc::new(StubDiscovery { services: vec![] });
        let config = ReconnectConfig::default();
        let idle = config.idle_poll_interval;
        let supervisor = ReconnectSupervisor::new(discovery, vec![], vec![], config, Arc::new(FacadeLogger));
        let consumer = Arc::new(StubConsumer {
            connected: AtomicBool::new(true),
            restarted_at: Mutex::new(None),
        });
        supervisor.keep_connected("urn:uuid:provider-1", consumer).unwrap();
        assert_eq!(supervisor.tick(), idle);
    }

    #[test]
    fn disconnected_consumer_restarts_once_rediscovered() {
        let discovery = Arc::new(StubDiscovery {
            services: vec![DiscoveredService {
                epr: "urn:uuid:provider-1".to_string(),
                x_addrs: vec!["https://10.0.0.9:443/device".to_string()],
            }],
        });
        let config = ReconnectConfig::default();
        let cooloff = config.reconnect_cooloff;
        let supervisor = ReconnectSupervisor::new(discovery, vec![], vec![], config, Arc::new(FacadeLogger));
        let consumer = Arc::new(StubConsumer {
            connected: AtomicBool::new(false),
            restarted_at: Mutex::new(None),
        });
        supervisor.keep_connected("urn:uuid:provider-1", consumer.clone()).unwrap();
        assert_eq!(supervisor.tick(), cooloff);
        assert!(consumer.is_connected());
        assert_eq!(
            *consumer.restarted_at.lock(),
            Some("https://10.0.0.9:443/device".to_string())
        );
    }

    #[test]
    fn disconnected_consumer_not_yet_discovered_stays_disconnected() {
        let discovery = Arc::new(StubDiscovery { services: vec![] });
        let supervisor = ReconnectSupervisor::new(
            discovery,
            vec![],
            vec![],
            ReconnectConfig::default(),
            Arc::new(FacadeLogger),
        );
        let consumer = Arc::new(StubConsumer {
            connected: AtomicBool::new(false),
            restarted_at: Mutex::new(None),
        });
        supervisor.keep_connected("urn:uuid:provider-1", consumer.clone()).unwrap();
        supervisor.tick();
        assert!(!consumer.is_connected());
    }

    #[test]
    fn keep_connected_twice_for_same_consumer_is_rejected() {
        let discovery = Arc::new(StubDiscovery { services: vec![] });
        let supervisor = ReconnectSupervisor::new(
            discovery,
            vec![],
            vec![],
            ReconnectConfig::default(),
            Arc::new(FacadeLogger),
        );
        let consumer = Arc::new(StubConsumer {
            connected: AtomicBool::new(true),
            restarted_at: Mutex::new(None),
        });
        supervisor.keep_connected("urn:uuid:provider-1", consumer.clone()).unwrap();
        assert!(supervisor.keep_connected("urn:uuid:provider-1", consumer).is_err());
    }
}
