// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in Migration Chain
//!
//! The platform schema as an ordered list of migration units, plus the
//! versioned supersedes manifest consumed by `switchyard repair`.
//!
//! # Architecture
//!
//! - **Layer:** Domain data
//! - **Purpose:** Single source of truth for the physical entity schema
//!
//! # Adding a Unit
//!
//! Create `mNNNN_<name>.rs` exposing `ID` and `unit()`, set its parent to the
//! current head, and append it to [`builtin_units`]. Units are immutable once
//! released; checksum drift is reported by `migrate status`. When a unit is
//! removed from history, list its id in `supersedes.yaml`.

use crate::domain::migration::{ChainError, MigrationChain, MigrationUnit};
use crate::domain::repair::{RepairError, SupersedesManifest};

pub mod m0001_core_entities;
pub mod m0002_agent_performance;
pub mod m0003_coordination_strategies;
pub mod m0004_beta_applications;
pub mod m0005_api_audit_log;
pub mod m0006_audit_auth_method;
pub mod m0007_audit_events;

const SUPERSEDES_YAML: &str = include_str!("supersedes.yaml");

pub fn builtin_units() -> Vec<MigrationUnit> {
    vec![
        m0001_core_entities::unit(),
        m0002_agent_performance::unit(),
        m0003_coordination_strategies::unit(),
        m0004_beta_applications::unit(),
        m0005_api_audit_log::unit(),
        m0006_audit_auth_method::unit(),
        m0007_audit_events::unit(),
    ]
}

pub fn builtin_chain() -> Result<MigrationChain, ChainError> {
    MigrationChain::new(builtin_units())
}

pub fn builtin_supersedes() -> Result<SupersedesManifest, RepairError> {
    SupersedesManifest::from_yaml_str(SUPERSEDES_YAML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::migration::{SchemaOp, VersionId};

    #[test]
    fn test_builtin_chain_is_linear() {
        let chain = builtin_chain().unwrap();
        assert_eq!(chain.len(), 7);
        assert_eq!(chain.units()[0].id, VersionId::from(m0001_core_entities::ID));
        assert_eq!(chain.head(), Some(&VersionId::from(m0007_audit_events::ID)));
    }

    #[test]
    fn test_every_unit_is_reversible() {
        for unit in builtin_units() {
            assert!(!unit.upgrade.is_empty(), "{} has no upgrade", unit.id);
            assert!(!unit.downgrade.is_empty(), "{} has no downgrade", unit.id);
        }
    }

    #[test]
    fn test_auth_method_backfill_is_marker_bounded() {
        let unit = m0006_audit_auth_method::unit();
        let backfills: Vec<_> = unit
            .upgrade
            .iter()
            .filter_map(|op| match op {
                SchemaOp::Backfill(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(backfills.len(), 2);
        for backfill in backfills {
            assert!(backfill.predicate.contains("auth_method_migrated = FALSE"));
            assert!(backfill.assignments.iter().any(|a| a.column == "auth_method_migrated"));
        }
    }

    #[test]
    fn test_builtin_supersedes_matches_chain() {
        let chain = builtin_chain().unwrap();
        let manifest = builtin_supersedes().unwrap();
        manifest.validate_against(&chain).unwrap();
        assert_eq!(manifest.fallback, VersionId::from(m0005_api_audit_log::ID));
        assert_eq!(
            manifest.fallback_for(&VersionId::from("3f2a9c1b7d4e")),
            &VersionId::from(m0006_audit_auth_method::ID)
        );
        assert_eq!(
            manifest.fallback_for(&VersionId::from("9d0c4e7f1a23")),
            &VersionId::from(m0005_api_audit_log::ID)
        );
    }
}
