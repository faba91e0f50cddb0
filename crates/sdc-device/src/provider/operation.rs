// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The operation execution path (spec.md S4.7): a typed request targets an
//! operation descriptor by handle; the registered handler mutates the MDIB
//! inside a transaction and the result is reported back as an
//! `OperationInvokedReport`.

use crate::error::Result;
use crate::model::{ContextState, Handle, State};
use crate::txn::{ExecutionOutcome, Transaction};

/// The payload of one of the seven typed requests S4.7 names.
#[derive(Debug, Clone)]
pub enum OperationArgs {
    SetValue(f64),
    SetString(String),
    SetMetricState(State),
    SetAlertState(State),
    SetComponentState(State),
    SetContextState(ContextState),
    Activate(Vec<String>),
}

/// A handler bound to one operation descriptor. Implementations mutate the
/// MDIB through the transaction they are given and report back which of
/// the five terminal `InvocationState`s the attempt landed on; the
/// provider runtime takes care of committing, versioning, and report
/// fan-out around them.
pub trait OperationHandler: Send + Sync {
    /// Performs the operation's effect. Returning `Err` is equivalent to
    /// `Ok(ExecutionOutcome::Failed { .. })` but lets ordinary `?`
    /// propagation from `txn` calls report as a plain failure
    /// (S4.7 step 3).
    fn execute(
        &self,
        txn: &mut Transaction<'_>,
        operation_handle: &Handle,
        args: &OperationArgs,
    ) -> Result<ExecutionOutcome>;
}
