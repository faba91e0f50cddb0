// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! Coded values and retrievability metadata (S3, S6 GLOSSARY "Retrievability").

use super::handle::Handle;

/// A BICEPS `CodedValue`: a coding-system-qualified code, used for
/// `Descriptor::Type` and for `select_by_code_path` (S4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodedValue {
    pub code: String,
    pub coding_system: Option<String>,
}

impl CodedValue {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            coding_system: None,
        }
    }

    pub fn with_coding_system(mut self, coding_system: impl Into<String>) -> Self {
        self.coding_system = Some(coding_system.into());
        self
    }
}

/// How a descriptor's state may be retrieved (GLOSSARY "Retrievability").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrievability {
    pub episodic: bool,
    pub get: bool,
    /// Periods (ms) at which the state is also delivered via a periodic
    /// report, keyed into the periodic-report aggregator's per-period lists.
    pub periodic_ms: Vec<u32>,
}

impl Retrievability {
    pub fn episodic() -> Self {
        Self {
            episodic: true,
            ..Self::default()
        }
    }
}

/// A condition-signaled or "source" back-reference between descriptors,
/// indexed in the entity table (S4.1: "by condition-signaled reference, by
/// source reference").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorReferences {
    pub source: Vec<Handle>,
    pub condition_signaled: Option<Handle>,
}
