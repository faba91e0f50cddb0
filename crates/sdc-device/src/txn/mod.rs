// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 sdc-device contributors

//! The transaction manager (spec.md S4.2).

pub mod mdib;
pub mod transaction;

pub use mdib::Mdib;
pub use transaction::{ExecutionOutcome, Transaction};

use crate::model::MdibVersionGroup;
use crate::report::ReportBody;

/// Result of a successful commit: the new version group plus every report
/// the change produced, in emission order (S4.2 step 5), plus whatever
/// operation-invocation outcome the transaction body staged (S4.7 step 3).
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub version_group: MdibVersionGroup,
    pub reports: Vec<ReportBody>,
    pub staged_execution_outcome: Option<ExecutionOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::descriptor::{Descriptor, DescriptorCore, PlainDescriptor};
    use crate::model::state::NumericMetricState;
    use crate::model::{ContextAssociation, Handle, State, StateCore};

    fn mds(handle: &str) -> Descriptor {
        Descriptor::Mds(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), None),
        })
    }

    fn vmd(handle: &str, parent: &str) -> Descriptor {
        Descriptor::Vmd(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), Some(Handle::from(parent))),
        })
    }

    fn channel(handle: &str, parent: &str) -> Descriptor {
        Descriptor::Channel(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), Some(Handle::from(parent))),
        })
    }

    fn metric(handle: &str, parent: &str) -> Descriptor {
        Descriptor::NumericMetric(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), Some(Handle::from(parent))),
        })
    }

    fn system_context(handle: &str, parent: &str) -> Descriptor {
        Descriptor::SystemContext(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), Some(Handle::from(parent))),
        })
    }

    fn patient_context(handle: &str, parent: &str) -> Descriptor {
        Descriptor::PatientContext(PlainDescriptor {
            core: DescriptorCore::new(Handle::from(handle), Some(Handle::from(parent))),
        })
    }

    #[test]
    fn adding_a_tree_emits_one_description_modification_report() {
        let mdib = Mdib::new();
        let outcome = mdib
            .transaction(|txn| {
                txn.add_descriptor(mds("mds.0"), None)?;
                txn.add_descriptor(vmd("vmd.0", "mds.0"), None)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome.version_group.mdib_version.0, 1);
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(mdib.table().len(), 2);
    }

    #[test]
    fn rejecting_a_bad_parent_child_pairing_discards_all_changes() {
        let mdib = Mdib::new();
        mdib.transaction(|txn| txn.add_descriptor(mds("mds.0"), None)).unwrap();
        let result = mdib.transaction(|txn| {
            txn.add_descriptor(metric("num.0", "mds.0"), None)?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(mdib.table().len(), 1);
        assert_eq!(mdib.version_group().mdib_version.0, 1);
    }

    #[test]
    fn updating_a_metric_state_bumps_state_version_and_reports_metric() {
        let mdib = Mdib::new();
        mdib.transaction(|txn| {
            txn.add_descriptor(mds("mds.0"), None)?;
            txn.add_descriptor(vmd("vmd.0", "mds.0"), None)?;
            txn.add_descriptor(channel("chan.0", "vmd.0"), None)?;
            txn.add_descriptor(
                metric("num.0", "chan.0"),
                Some(State::NumericMetric(NumericMetricState {
                    core: StateCore::new(Handle::from("num.0"), crate::model::Version::initial()),
                    value: None,
                    quality: Default::default(),
                })),
            )?;
            Ok(())
        })
        .unwrap();

        let outcome = mdib
            .transaction(|txn| {
                let state = txn.get_state(&Handle::from("num.0"))?;
                if let State::NumericMetric(s) = state {
                    s.value = Some(37.0);
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome.reports.len(), 1);
        assert!(matches!(outcome.reports[0], ReportBody::EpisodicMetric(_)));
        let entity = mdib.table().get(&Handle::from("num.0")).unwrap();
        if let crate::model::Entity::Single {
            state: Some(State::NumericMetric(s)),
            ..
        } = entity
        {
            assert_eq!(s.value, Some(37.0));
            assert_eq!(s.core.state_version.0, 1);
        } else {
            panic!("expected a numeric metric state");
        }
    }

    #[test]
    fn creating_a_context_state_emits_one_context_report() {
        let mdib = Mdib::new();
        mdib.transaction(|txn| {
            txn.add_descriptor(mds("mds.0"), None)?;
            txn.add_descriptor(
                system_context("sys.0", "mds.0"),
                None,
            )?;
            Ok(())
        })
        .unwrap();
        mdib.transaction(|txn| {
            txn.add_descriptor(patient_context("pat.0", "sys.0"), None)?;
            Ok(())
        })
        .unwrap();
        let outcome = mdib
            .transaction(|txn| {
                let _ = txn.mk_context_state(&Handle::from("pat.0"))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome.reports.len(), 1);
        assert!(matches!(outcome.reports[0], ReportBody::EpisodicContext(_)));
    }

    #[test]
    fn associating_two_context_states_at_once_is_rejected() {
        let mdib = Mdib::new();
        mdib.transaction(|txn| {
            txn.add_descriptor(mds("mds.0"), None)?;
            txn.add_descriptor(system_context("sys.0", "mds.0"), None)?;
            txn.add_descriptor(patient_context("pat.0", "sys.0"), None)?;
            Ok(())
        })
        .unwrap();
        let result = mdib.transaction(|txn| {
            let a = txn.mk_context_state(&Handle::from("pat.0"))?;
            a.association = ContextAssociation::Assoc;
            let b = txn.mk_context_state(&Handle::from("pat.0"))?;
            b.association = ContextAssociation::Assoc;
            Ok(())
        });
        assert!(result.is_err());
    }

    #[test]
    fn an_empty_transaction_does_not_bump_mdib_version() {
        let mdib = Mdib::new();
        let before = mdib.version_group();
        let outcome = mdib.transaction(|_txn| Ok(())).unwrap();
        assert_eq!(outcome.version_group, before);
        assert!(outcome.reports.is_empty());
    }

    #[test]
    fn removing_a_parent_cascades_to_its_children() {
        let mdib = Mdib::new();
        mdib.transaction(|txn| {
            txn.add_descriptor(mds("mds.0"), None)?;
            txn.add_descriptor(vmd("vmd.0", "mds.0"), None)?;
            Ok(())
        })
        .unwrap();
        mdib.transaction(|txn| txn.remove_descriptor(&Handle::from("mds.0"))).unwrap();
        assert!(mdib.table().is_empty());
    }
}
