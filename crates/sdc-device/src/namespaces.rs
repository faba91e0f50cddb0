// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The BICEPS/WS-* XML namespace table and the canonical-URI normalization
//! pass (spec.md S6: "maintains a helper that tracks SOAP, WS-Addressing,
//! WS-Eventing, DPWS, MDPWS, WS-Discovery, WS-MetadataExchange, and the SDC
//! participant, message, and extension namespaces ... A normalization pass
//! may rewrite provider-declared BICEPS namespace URIs to the local
//! canonical URIs on inbound, and reverse on outbound").
//!
//! Grounded on `sdc11073`'s `namespaces.py` / `NamespaceHelper`, narrowed to
//! the constant table and the normalization map the in-scope core needs;
//! the actual XML prefix bookkeeping stays with the codec adapter.

/// Canonical namespace URIs this engine's internal code is written against,
/// independent of which BICEPS profile version a peer declares on the wire.
pub mod canonical {
    pub const SOAP12: &str = "http://www.w3.org/2003/05/soap-envelope";
    pub const WSA: &str = "http://www.w3.org/2005/08/addressing";
    pub const WSE: &str = "http://schemas.xmlsoap.org/ws/2004/08/eventing";
    pub const DPWS: &str = "http://docs.oasis-open.org/ws-dd/ns/dpws/2009/01";
    pub const MDPWS: &str = "http://standard.org/ssn/mdpws";
    pub const WSD: &str = "http://docs.oasis-open.org/ws-dd/ns/discovery/2009/01";
    pub const WSX: &str = "http://schemas.xmlsoap.org/ws/2004/09/mex";
    pub const MSG: &str = "http://standard.org/glue/biceps/MessageModel";
    pub const PM: &str = "http://standard.org/glue/biceps/ParticipantModel";
    pub const EXT: &str = "http://standard.org/glue/biceps/ExtensionPoint";
}

/// A single BICEPS profile-version namespace pairing: the URI a peer may
/// declare on the wire, and the canonical URI this engine maps it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceAlias {
    pub wire_uri: String,
    pub canonical_uri: &'static str,
}

/// Rewrites provider-declared namespace URIs to the canonical set on
/// inbound, and reverses the mapping on outbound (S6), so in-scope code
/// (entity table, transaction manager, subscription fan-out) never has to
/// branch on profile-version URIs.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    aliases: Vec<NamespaceAlias>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an additional profile-version alias for `canonical_uri`
    /// (e.g. an older BICEPS draft's `ParticipantModel` URI).
    pub fn register_alias(&mut self, wire_uri: impl Into<String>, canonical_uri: &'static str) {
        self.aliases.push(NamespaceAlias {
            wire_uri: wire_uri.into(),
            canonical_uri,
        });
    }

    /// Inbound normalization: maps a wire-declared URI to the canonical one
    /// this engine is written against, or returns it unchanged if no alias
    /// matches (it may already be canonical).
    pub fn canonicalize<'a>(&'a self, wire_uri: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|a| a.wire_uri == wire_uri)
            .map(|a| a.canonical_uri)
            .unwrap_or(wire_uri)
    }

    /// Outbound normalization: maps a canonical URI back to the
    /// profile-version URI the peer declared, if one was registered for it;
    /// otherwise the canonical URI is emitted as-is.
    pub fn decanonicalize<'a>(&'a self, canonical_uri: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|a| a.canonical_uri == canonical_uri)
            .map(|a| a.wire_uri.as_str())
            .unwrap_or(canonical_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_uri_passes_through_unchanged() {
        let table = NamespaceTable::new();
        assert_eq!(table.canonicalize(canonical::PM), canonical::PM);
    }

    #[test]
    fn registered_alias_round_trips() {
        let mut table = NamespaceTable::new();
        table.register_alias("urn:old-biceps:participant", canonical::PM);
        assert_eq!(table.canonicalize("urn:old-biceps:participant"), canonical::PM);
        assert_eq!(table.decanonicalize(canonical::PM), "urn:old-biceps:participant");
    }
}
