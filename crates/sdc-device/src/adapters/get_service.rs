// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The GetService/ContextService seam (spec.md S1 "Out of scope ... the XML
//! wire codec" / "the HTTP(S) transport"): the consumer mirror's bootstrap
//! (S4.8 steps 2-3) needs a `GetMdib` call and, when the snapshot carries no
//! context states, a `GetContextStates` call. This crate never builds or
//! parses the SOAP request/response itself.
//!
//! Grounded on `sdc11073.sdcclient.getservice.GetServiceClient.get_mdib` and
//! `sdc11073.sdcclient.contextservice.ContextServiceClient.get_context_states`
//! (`entitymdib/consumermdib.py`'s `reload_all`/`_get_context_states`).

use crate::error::Result;
use crate::model::{ContextState, Entity, Handle, MdibVersionGroup};

/// The full MDIB snapshot a `GetMdib` call returns (S6 "GetMdib response":
/// "the full MDIB snapshot (descriptors + single states; optionally context
/// states)").
#[derive(Debug, Clone)]
pub struct GetMdibResponse {
    pub version_group: MdibVersionGroup,
    pub entities: Vec<Entity>,
}

/// The context states a `GetContextStates` call returns, keyed implicitly by
/// each state's own `descriptor_handle` (S4.8 step 3).
#[derive(Debug, Clone, Default)]
pub struct GetContextStatesResponse {
    pub states: Vec<ContextState>,
}

/// Issues the two bootstrap calls the consumer mirror needs (S4.8 steps 2-3).
pub trait GetServiceClient: Send + Sync {
    fn get_mdib(&self) -> Result<GetMdibResponse>;

    /// An empty `handles` slice requests every context state, matching the
    /// source's `handles: list[str] | None = None`.
    fn get_context_states(&self, handles: &[Handle]) -> Result<GetContextStatesResponse>;
}
