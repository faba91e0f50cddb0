// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Trait seams to the out-of-scope collaborators named in spec.md S1: the
//! XML wire codec, the HTTP(S) transport, WS-Discovery, and the injected
//! logger interface (S5: "Logging is via an injected logger interface").
//!
//! None of these traits are implemented by this crate; `sdc-demo` wires a
//! minimal in-memory stand-in for each so the tutorial binaries can run
//! end-to-end without a real network stack.

pub mod codec;
pub mod discovery;
pub mod get_service;
pub mod logging;
pub mod transport;

pub use codec::{NotificationCodec, ReferenceParameter};
pub use discovery::{DiscoveredService, DiscoveryClient};
pub use get_service::{GetContextStatesResponse, GetMdibResponse, GetServiceClient};
pub use logging::DeviceLogger;
pub use transport::{SoapTransport, SoapTransportFactory};
