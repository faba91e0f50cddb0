// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! `Entity` (S3): the unit of addressing in the entity table.

use std::collections::HashMap;

use super::descriptor::Descriptor;
use super::handle::Handle;
use super::state::{ContextState, State};

/// `(descriptor, state?)` for single-state descriptors, or
/// `(descriptor, states[handle->state])` for context descriptors.
#[derive(Debug, Clone)]
pub enum Entity {
    Single {
        descriptor: Descriptor,
        state: Option<State>,
    },
    Multi {
        descriptor: Descriptor,
        states: HashMap<Handle, ContextState>,
    },
}

impl Entity {
    pub fn new_single(descriptor: Descriptor) -> Self {
        Self::Single {
            descriptor,
            state: None,
        }
    }

    pub fn new_multi(descriptor: Descriptor) -> Self {
        Self::Multi {
            descriptor,
            states: HashMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        match self {
            Self::Single { descriptor, .. } | Self::Multi { descriptor, .. } => descriptor,
        }
    }

    pub fn descriptor_mut(&mut self) -> &mut Descriptor {
        match self {
            Self::Single { descriptor, .. } | Self::Multi { descriptor, .. } => descriptor,
        }
    }

    pub fn handle(&self) -> &Handle {
        self.descriptor().handle()
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi { .. })
    }

    /// Invariant check (S8): every state's `DescriptorHandle` matches the
    /// owning descriptor's `Handle`.
    pub fn descriptor_handles_consistent(&self) -> bool {
        match self {
            Self::Single {
                descriptor,
                state: Some(state),
            } => state.core().descriptor_handle == *descriptor.handle(),
            Self::Single { state: None, .. } => true,
            Self::Multi { descriptor, states } => states
                .values()
                .all(|s| s.descriptor_handle == *descriptor.handle()),
        }
    }

    /// At most one `Associated` context state per context descriptor (S3, S8).
    pub fn associated_count(&self) -> usize {
        match self {
            Self::Multi { states, .. } => states
                .values()
                .filter(|s| s.association == super::state::ContextAssociation::Assoc)
                .count(),
            Self::Single { .. } => 0,
        }
    }
}
