// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Device-side runtime for IEEE 11073 SDC over MDPWS (spec.md S0 OVERVIEW).
//!
//! This crate is the in-process core of an SDC participant: the MDIB entity
//! table and transaction manager (`txn`, `entity`), report construction and
//! fan-out (`report`, `subscription`, `periodic`), the asynchronous
//! operation-invocation path (`provider`), a consumer-side MDIB mirror
//! (`consumer`), and a reconnect supervisor for a disconnected consumer
//! (`reconnect`). It owns no sockets, no XML codec, and no threads of its
//! own (S1, S5): the host application supplies those through the trait
//! seams in `adapters` and drives every periodic/invocation path from its
//! own event loop.

pub mod adapters;
pub mod client_pool;
pub mod config;
pub mod consumer;
pub mod entity;
pub mod error;
pub mod model;
pub mod namespaces;
pub mod periodic;
pub mod provider;
pub mod reconnect;
pub mod report;
pub mod subscription;
pub mod txn;

pub use config::{ConsumerConfig, DeviceConfig, PeriodicMode, ReconnectConfig, SubscriptionConfig};
pub use consumer::Consumer;
pub use entity::EntityTable;
pub use error::{Error, Result};
pub use model::{Entity, Handle, MdibVersion, MdibVersionGroup};
pub use provider::Provider;
pub use reconnect::ReconnectSupervisor;
pub use subscription::SubscriptionManager;
pub use txn::{Mdib, Transaction};
