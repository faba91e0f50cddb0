// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! `Mdib` (S4.2): the entity table plus the version-group state a
//! transaction commits against.

use parking_lot::{Mutex, RwLock};

use crate::entity::EntityTable;
use crate::error::Result;
use crate::model::{MdibVersion, MdibVersionGroup};

use super::transaction::Transaction;

/// Owns the entity table and the `MdibVersionGroup` counters. Every mutation
/// goes through a `Transaction` obtained from `transaction()`.
///
/// Grounded on the teacher's `Hub` (`crates/hdds/src/engine/hub.rs`): a
/// single struct owning the shared table plus a dedicated mutex
/// serializing the operation that actually mutates it, while plain reads
/// go straight through the table's own lock.
pub struct Mdib {
    pub(crate) table: EntityTable,
    version: RwLock<MdibVersionGroup>,
    /// Serializes whole transactions (S4.2 "only one transaction may commit
    /// at a time"); held for the transaction's entire scope rather than
    /// just the final apply step, since this engine has no separate
    /// prepare/commit phases to interleave.
    commit_mutex: Mutex<()>,
}

impl Default for Mdib {
    fn default() -> Self {
        Self::new()
    }
}

impl Mdib {
    pub fn new() -> Self {
        Self {
            table: EntityTable::new(),
            version: RwLock::new(MdibVersionGroup::new(
                MdibVersion::initial(),
                MdibVersionGroup::fresh_sequence_id(),
            )),
            commit_mutex: Mutex::new(()),
        }
    }

    pub fn table(&self) -> &EntityTable {
        &self.table
    }

    pub fn version_group(&self) -> MdibVersionGroup {
        self.version.read().clone()
    }

    pub(super) fn current_mdib_version(&self) -> MdibVersion {
        self.version.read().mdib_version
    }

    pub(super) fn set_version(&self, group: MdibVersionGroup) {
        *self.version.write() = group;
    }

    /// Cold restart (S4.6 "reload_all"): clears the table and rotates
    /// `sequence_id`, so consumers mirroring this provider must resync from
    /// scratch rather than apply a stale diff.
    pub fn reload(&self) {
        let _guard = self.commit_mutex.lock();
        self.table.clear();
        self.set_version(MdibVersionGroup::new(
            MdibVersion::initial(),
            MdibVersionGroup::fresh_sequence_id(),
        ));
    }

    /// Opens a scoped write session, runs `body` against it, and commits on
    /// `Ok` or discards every staged change on `Err` (S4.2 "Failure: a
    /// raised error inside the scope discards all changes").
    pub fn transaction<F>(&self, body: F) -> Result<super::CommitOutcome>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<()>,
    {
        let guard = self.commit_mutex.lock();
        let mut txn = Transaction::new(self);
        let outcome = match body(&mut txn) {
            Ok(()) => txn.commit(),
            Err(err) => Err(err),
        };
        drop(guard);
        outcome
    }
}
