// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Error taxonomy (spec.md S7), grounded on the teacher's hand-rolled
//! `Display` + `std::error::Error` enums (`crates/hdds/src/rpc/error.rs`)
//! rather than a derive macro, matching the core crate's no-`thiserror` style.

use std::fmt;

use crate::model::Handle;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy from spec.md S7. Variants map 1:1 onto the spec's
/// named categories so call sites can match on them directly.
#[derive(Debug)]
pub enum Error {
    /// Inbound message fails XML-Schema validation (codec adapter boundary).
    Schema(String),
    /// A referenced handle is missing.
    NotFound(Handle),
    /// `get_one` found more than one entity for a key that should be unique.
    Ambiguous(Handle),
    /// Invariant violation: duplicate handle, missing parent, bad
    /// parent/child pairing, or a context-association rule violation.
    Conflict(String),
    /// The consumer mirror observed a forward version gap; non-fatal.
    VersionGap { handle: Handle, expected: u64, got: u64 },
    /// The consumer mirror observed a version regression; the report is dropped.
    VersionRegression { handle: Handle, have: u64, got: u64 },
    /// `sequence_id` changed; the mirror has stopped applying reports.
    SequenceIdChanged { old: String, new: String },
    /// Socket timeout, refused connection, or HTTP status error.
    Transport(String),
    /// A netloc was reported unreachable and no longer accepts `get()`.
    UnreachableNetloc(String),
    /// Caller violated an API contract (double-init, commit outside scope, ...).
    ApiMisuse(String),
    /// Subscribe/Renew/GetStatus/Unsubscribe addressed a dispatch identity
    /// with no matching subscription (S6 "Receiver, subcode InvalidMessage
    /// or UnableToRenew").
    UnknownSubscription { subcode: SubscriptionFaultSubcode, reason: String },
}

/// The two SOAP fault subcodes spec.md S6 distinguishes for an unknown
/// subscription identifier, depending on which operation hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionFaultSubcode {
    /// Renew against an unknown identifier (S4.4, S8 scenario 3).
    UnableToRenew,
    /// GetStatus/Unsubscribe/dispatch against an unknown identifier.
    InvalidMessage,
}

impl fmt::Display for SubscriptionFaultSubcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnableToRenew => write!(f, "UnableToRenew"),
            Self::InvalidMessage => write!(f, "InvalidMessage"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(msg) => write!(f, "schema validation failed: {msg}"),
            Self::NotFound(handle) => write!(f, "handle not found: {handle}"),
            Self::Ambiguous(handle) => write!(f, "ambiguous handle: {handle}"),
            Self::Conflict(msg) => write!(f, "invariant violation: {msg}"),
            Self::VersionGap {
                handle,
                expected,
                got,
            } => write!(
                f,
                "version gap for {handle}: expected >= {expected}, got {got}"
            ),
            Self::VersionRegression { handle, have, got } => write!(
                f,
                "version regression for {handle}: have {have}, got {got}"
            ),
            Self::SequenceIdChanged { old, new } => {
                write!(f, "sequence_id changed: {old} -> {new}")
            }
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::UnreachableNetloc(netloc) => write!(f, "unreachable netloc: {netloc}"),
            Self::ApiMisuse(msg) => write!(f, "API misuse: {msg}"),
            Self::UnknownSubscription { subcode, reason } => {
                write!(f, "unknown subscription ({subcode}): {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn not_found(handle: impl Into<Handle>) -> Self {
        Self::NotFound(handle.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unable_to_renew(reason: impl Into<String>) -> Self {
        Self::UnknownSubscription {
            subcode: SubscriptionFaultSubcode::UnableToRenew,
            reason: reason.into(),
        }
    }

    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::UnknownSubscription {
            subcode: SubscriptionFaultSubcode::InvalidMessage,
            reason: reason.into(),
        }
    }
}
