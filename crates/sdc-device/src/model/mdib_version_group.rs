// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! `MdibVersionGroup` (S3, GLOSSARY): the triple accompanying every report.

use super::version::MdibVersion;

/// `(mdib_version, sequence_id, instance_id?)`.
///
/// `sequence_id` changes on a cold provider restart; consumers must never
/// merge reports across a `sequence_id` change (S3, S8 scenario 5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdibVersionGroup {
    pub mdib_version: MdibVersion,
    pub sequence_id: String,
    pub instance_id: Option<u32>,
}

impl MdibVersionGroup {
    pub fn new(mdib_version: MdibVersion, sequence_id: impl Into<String>) -> Self {
        Self {
            mdib_version,
            sequence_id: sequence_id.into(),
            instance_id: None,
        }
    }

    pub fn with_instance_id(mut self, instance_id: u32) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    /// A fresh `sequence_id`, assigned at cold start or on `reload_all`.
    pub fn fresh_sequence_id() -> String {
        format!("urn:uuid:{}", uuid::Uuid::new_v4())
    }
}
