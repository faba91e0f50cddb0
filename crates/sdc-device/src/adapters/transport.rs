// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The HTTP(S) transport seam (spec.md S1: "Out of scope ... the HTTP(S)
//! transport"). `client_pool::SoapClientPool` holds `Arc<dyn SoapTransport>`
//! handles produced by a `SoapTransportFactory`; both are out-of-scope
//! collaborators the real stack backs with an HTTP client plus TLS loader.

use crate::error::Result;

/// One transport connection to a single peer netloc (`host:port`).
///
/// Grounded on `sdc11073.pysoap.soapclient.SoapClientProtocol`: a
/// `post_message_to(path, message)` call plus `close()`; `netloc()` is
/// added here so the client pool never has to store the string twice.
pub trait SoapTransport: Send + Sync {
    fn netloc(&self) -> &str;

    /// POSTs an already-encoded SOAP envelope to `path`. Implementations
    /// surface socket timeouts, refused connections, and non-2xx HTTP
    /// status as `Error::Transport` (S7).
    fn post_message_to(&self, path: &str, message: &[u8]) -> Result<()>;

    /// Idle-teardown hook; called by the pool once no callback references
    /// this netloc any more (S4.5).
    fn close(&self);
}

/// Builds a `SoapTransport` for a netloc the first time it is needed (S4.5
/// "lazily create the underlying transport on first use").
pub trait SoapTransportFactory: Send + Sync {
    fn create(&self, netloc: &str, accepted_encodings: &[String]) -> Result<std::sync::Arc<dyn SoapTransport>>;
}
