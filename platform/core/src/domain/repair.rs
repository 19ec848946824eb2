// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Ledger Repair Model
//!
//! Migration history is occasionally rewritten (squashed, renamed) after it
//! has already been applied in long-lived environments. Those environments
//! end up with a ledger pointing at an id the chain no longer contains.
//!
//! The set of ids that were removed is versioned data: a YAML manifest that
//! maps each removed id to the unit that supersedes it, plus a default
//! fallback for ids with no direct replacement.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::ledger::LedgerError;
use crate::domain::migration::{MigrationChain, VersionId};

#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Migration lock unavailable: {0}")]
    Lock(String),

    #[error("Invalid supersedes manifest: {0}")]
    Manifest(String),
}

/// Result of a repair invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepairOutcome {
    Fixed { from: VersionId, to: VersionId },
    NoActionNeeded { current: Option<VersionId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededVersion {
    pub id: VersionId,
    /// Unit whose schema effect includes the removed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<VersionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersedesManifest {
    pub manifest_version: u32,
    pub fallback: VersionId,
    #[serde(default)]
    pub superseded: Vec<SupersededVersion>,
}

impl SupersedesManifest {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RepairError> {
        serde_yaml::from_str(yaml).map_err(|e| RepairError::Manifest(e.to_string()))
    }

    pub fn known_removed(&self) -> BTreeSet<VersionId> {
        self.superseded.iter().map(|s| s.id.clone()).collect()
    }

    /// Where a ledger pointing at `removed` should be relinked.
    pub fn fallback_for(&self, removed: &VersionId) -> &VersionId {
        self.superseded
            .iter()
            .find(|s| &s.id == removed)
            .and_then(|s| s.replaced_by.as_ref())
            .unwrap_or(&self.fallback)
    }

    /// Removed ids must be absent from the chain and every relink target
    /// must be present in it.
    pub fn validate_against(&self, chain: &MigrationChain) -> Result<(), RepairError> {
        if !chain.contains(&self.fallback) {
            return Err(RepairError::Manifest(format!(
                "fallback '{}' is not part of the migration chain",
                self.fallback
            )));
        }
        for entry in &self.superseded {
            if chain.contains(&entry.id) {
                return Err(RepairError::Manifest(format!(
                    "'{}' is listed as removed but is still in the migration chain",
                    entry.id
                )));
            }
            if let Some(target) = &entry.replaced_by {
                if !chain.contains(target) {
                    return Err(RepairError::Manifest(format!(
                        "'{}' is superseded by unknown version '{}'",
                        entry.id, target
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::migration::MigrationUnit;

    const MANIFEST: &str = r#"
manifest_version: 1
fallback: b
superseded:
  - id: old1
    replaced_by: a
    reason: squashed
  - id: old2
"#;

    fn chain() -> MigrationChain {
        MigrationChain::new(vec![
            MigrationUnit::new("a", None, "a"),
            MigrationUnit::new("b", Some("a"), "b"),
        ])
        .unwrap()
    }

    #[test]
    fn test_manifest_parsing_and_fallbacks() {
        let manifest = SupersedesManifest::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(manifest.known_removed().len(), 2);
        assert_eq!(manifest.fallback_for(&VersionId::from("old1")), &VersionId::from("a"));
        assert_eq!(manifest.fallback_for(&VersionId::from("old2")), &VersionId::from("b"));
        assert!(manifest.validate_against(&chain()).is_ok());
    }

    #[test]
    fn test_manifest_rejects_live_ids_and_unknown_targets() {
        let mut manifest = SupersedesManifest::from_yaml_str(MANIFEST).unwrap();
        manifest.superseded.push(SupersededVersion {
            id: VersionId::from("a"),
            replaced_by: None,
            reason: None,
        });
        assert!(matches!(manifest.validate_against(&chain()), Err(RepairError::Manifest(_))));

        let mut manifest = SupersedesManifest::from_yaml_str(MANIFEST).unwrap();
        manifest.fallback = VersionId::from("nope");
        assert!(matches!(manifest.validate_against(&chain()), Err(RepairError::Manifest(_))));
    }
}
