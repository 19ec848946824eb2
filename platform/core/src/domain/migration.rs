// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Migration Units and the Migration Chain
//!
//! A migration unit is one atomic schema transformation expressed as data: an
//! ordered list of [`SchemaOp`]s for the forward direction and another for the
//! inverse. Units are linked to their predecessor through `parent`, and the
//! full set must form a single linear chain (no branches, no merges).
//!
//! Units are content-addressed: the checksum of a unit is the SHA-256 of its
//! canonical JSON form. The history log stores that checksum alongside the
//! version id so later runs can detect a unit that was edited after being
//! applied.
//!
//! # Architecture
//!
//! - **Layer:** Domain
//! - **Purpose:** Schema transformation model, chain validation and planning

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ============================================================================
// Value Objects
// ============================================================================

/// Opaque identifier of a migration unit (e.g. `0004_beta_applications`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Upgrade => "upgrade",
            Direction::Downgrade => "downgrade",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upgrade" => Some(Direction::Upgrade),
            "downgrade" => Some(Direction::Downgrade),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a migration run should leave the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Newest unit of the chain
    Head,
    /// Before the root unit (empty schema)
    Base,
    Version(VersionId),
}

impl Target {
    /// Parses CLI input: `head`, `base`, or a version id.
    pub fn parse(value: &str) -> Self {
        match value {
            "head" => Target::Head,
            "base" => Target::Base,
            other => Target::Version(VersionId::new(other)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Head => f.write_str("head"),
            Target::Base => f.write_str("base"),
            Target::Version(id) => write!(f, "{}", id),
        }
    }
}

// ============================================================================
// Schema Operations
// ============================================================================

/// Portable column types. Each dialect renders them to its own DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "length", rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Varchar(u32),
    /// UUID stored in its canonical 36 character text form
    Uuid,
    BigInt,
    Double,
    Boolean,
    Timestamp,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    CurrentTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    /// Nullable column with no default.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            primary_key: false,
            references: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn references(mut self, table: &str, column: &str, on_delete: OnDelete) -> Self {
        self.references = Some(ForeignKey {
            table: table.to_string(),
            column: column.to_string(),
            on_delete,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self { name: name.into(), columns }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: &str, table: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    /// Portable SQL expression evaluated per row
    pub expression: String,
}

/// A data-mutating step. The predicate is mandatory and is the complete
/// contract for which rows the step may touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backfill {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub predicate: String,
    pub description: String,
}

impl Backfill {
    pub fn new(table: &str, predicate: &str, description: &str) -> Self {
        Self {
            table: table.to_string(),
            assignments: Vec::new(),
            predicate: predicate.to_string(),
            description: description.to_string(),
        }
    }

    pub fn set(mut self, column: &str, expression: &str) -> Self {
        self.assignments.push(Assignment {
            column: column.to_string(),
            expression: expression.to_string(),
        });
        self
    }
}

/// One existence-guarded schema step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaOp {
    CreateTable(TableDef),
    DropTable { name: String },
    AddColumn { table: String, column: ColumnDef },
    DropColumn { table: String, column: String },
    CreateIndex(IndexDef),
    DropIndex { name: String },
    Backfill(Backfill),
}

impl SchemaOp {
    pub fn drop_table(name: &str) -> Self {
        SchemaOp::DropTable { name: name.to_string() }
    }

    pub fn add_column(table: &str, column: ColumnDef) -> Self {
        SchemaOp::AddColumn { table: table.to_string(), column }
    }

    pub fn drop_column(table: &str, column: &str) -> Self {
        SchemaOp::DropColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn drop_index(name: &str) -> Self {
        SchemaOp::DropIndex { name: name.to_string() }
    }

    /// Short human description used in plans and logs.
    pub fn summary(&self) -> String {
        match self {
            SchemaOp::CreateTable(t) => format!("create table {}", t.name),
            SchemaOp::DropTable { name } => format!("drop table {}", name),
            SchemaOp::AddColumn { table, column } => format!("add column {}.{}", table, column.name),
            SchemaOp::DropColumn { table, column } => format!("drop column {}.{}", table, column),
            SchemaOp::CreateIndex(i) => format!("create index {} on {}", i.name, i.table),
            SchemaOp::DropIndex { name } => format!("drop index {}", name),
            SchemaOp::Backfill(b) => format!("backfill {} where {}", b.table, b.predicate),
        }
    }
}

// ============================================================================
// Migration Unit
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
    pub id: VersionId,
    pub parent: Option<VersionId>,
    pub description: String,
    pub upgrade: Vec<SchemaOp>,
    pub downgrade: Vec<SchemaOp>,
}

impl MigrationUnit {
    pub fn new(id: &str, parent: Option<&str>, description: &str) -> Self {
        Self {
            id: VersionId::new(id),
            parent: parent.map(VersionId::new),
            description: description.to_string(),
            upgrade: Vec::new(),
            downgrade: Vec::new(),
        }
    }

    pub fn upgrade(mut self, op: SchemaOp) -> Self {
        self.upgrade.push(op);
        self
    }

    pub fn downgrade(mut self, op: SchemaOp) -> Self {
        self.downgrade.push(op);
        self
    }

    pub fn operations(&self, direction: Direction) -> &[SchemaOp] {
        match direction {
            Direction::Upgrade => &self.upgrade,
            Direction::Downgrade => &self.downgrade,
        }
    }

    /// Hex SHA-256 of the unit's canonical JSON.
    pub fn checksum(&self) -> Result<String, serde_json::Error> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}

// ============================================================================
// Migration Chain
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Duplicate migration id: {0}")]
    DuplicateVersion(VersionId),

    #[error("Migration chain has no root unit")]
    NoRoot,

    #[error("Migration chain has multiple roots: {0:?}")]
    MultipleRoots(Vec<VersionId>),

    #[error("Migration '{unit}' revises unknown parent '{parent}'")]
    BrokenLink { unit: VersionId, parent: VersionId },

    #[error("Migration '{parent}' has more than one child: {children:?}")]
    Branch { parent: VersionId, children: Vec<VersionId> },

    #[error("Migration chain is not connected; unreachable units: {0:?}")]
    Disconnected(Vec<VersionId>),

    #[error("Backfill in migration '{0}' has no row predicate")]
    UnboundedBackfill(VersionId),

    #[error("Unknown migration version: {0}")]
    UnknownVersion(VersionId),

    #[error("Failed to compute checksum for '{unit}': {message}")]
    Checksum { unit: VersionId, message: String },
}

/// Ordered list of units to run from one ledger position to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    pub from: Option<VersionId>,
    pub to: Option<VersionId>,
    pub direction: Direction,
    pub steps: Vec<VersionId>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Validated linear history, ordered root first.
#[derive(Debug, Clone)]
pub struct MigrationChain {
    units: Vec<MigrationUnit>,
    checksums: Vec<String>,
    positions: HashMap<VersionId, usize>,
}

impl MigrationChain {
    /// Builds a chain from units in any order, rejecting anything that is
    /// not a single parent→child line.
    pub fn new(units: Vec<MigrationUnit>) -> Result<Self, ChainError> {
        if units.is_empty() {
            return Ok(Self {
                units,
                checksums: Vec::new(),
                positions: HashMap::new(),
            });
        }

        let mut by_id: HashMap<VersionId, MigrationUnit> = HashMap::new();
        for unit in units {
            for op in unit.upgrade.iter().chain(unit.downgrade.iter()) {
                if let SchemaOp::Backfill(b) = op {
                    if b.predicate.trim().is_empty() {
                        return Err(ChainError::UnboundedBackfill(unit.id.clone()));
                    }
                }
            }
            if by_id.contains_key(&unit.id) {
                return Err(ChainError::DuplicateVersion(unit.id));
            }
            by_id.insert(unit.id.clone(), unit);
        }

        let mut roots: Vec<VersionId> = Vec::new();
        let mut children: HashMap<VersionId, Vec<VersionId>> = HashMap::new();
        for unit in by_id.values() {
            match &unit.parent {
                None => roots.push(unit.id.clone()),
                Some(parent) => {
                    if !by_id.contains_key(parent) {
                        return Err(ChainError::BrokenLink {
                            unit: unit.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                    children.entry(parent.clone()).or_default().push(unit.id.clone());
                }
            }
        }

        roots.sort();
        let root = match roots.len() {
            0 => return Err(ChainError::NoRoot),
            1 => roots.remove(0),
            _ => return Err(ChainError::MultipleRoots(roots)),
        };

        if let Some((parent, kids)) = children.iter().find(|(_, kids)| kids.len() > 1) {
            let mut kids = kids.clone();
            kids.sort();
            return Err(ChainError::Branch {
                parent: parent.clone(),
                children: kids,
            });
        }

        let mut ordered = Vec::with_capacity(by_id.len());
        let mut visited: HashSet<VersionId> = HashSet::new();
        let mut cursor = Some(root);
        while let Some(id) = cursor {
            if !visited.insert(id.clone()) {
                break;
            }
            cursor = children.get(&id).and_then(|kids| kids.first().cloned());
            if let Some(unit) = by_id.remove(&id) {
                ordered.push(unit);
            }
        }

        if !by_id.is_empty() {
            let mut unreachable: Vec<VersionId> = by_id.into_keys().collect();
            unreachable.sort();
            return Err(ChainError::Disconnected(unreachable));
        }

        let mut checksums = Vec::with_capacity(ordered.len());
        let mut positions = HashMap::with_capacity(ordered.len());
        for (position, unit) in ordered.iter().enumerate() {
            let checksum = unit.checksum().map_err(|e| ChainError::Checksum {
                unit: unit.id.clone(),
                message: e.to_string(),
            })?;
            checksums.push(checksum);
            positions.insert(unit.id.clone(), position);
        }

        Ok(Self {
            units: ordered,
            checksums,
            positions,
        })
    }

    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn head(&self) -> Option<&VersionId> {
        self.units.last().map(|u| &u.id)
    }

    pub fn contains(&self, id: &VersionId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &VersionId) -> Option<&MigrationUnit> {
        self.positions.get(id).map(|&p| &self.units[p])
    }

    pub fn checksum_of(&self, id: &VersionId) -> Option<&str> {
        self.positions.get(id).map(|&p| self.checksums[p].as_str())
    }

    /// Resolves a target to a ledger value (`None` = base).
    pub fn resolve(&self, target: &Target) -> Result<Option<VersionId>, ChainError> {
        match target {
            Target::Head => Ok(self.head().cloned()),
            Target::Base => Ok(None),
            Target::Version(id) if self.contains(id) => Ok(Some(id.clone())),
            Target::Version(id) => Err(ChainError::UnknownVersion(id.clone())),
        }
    }

    /// Computes the units between `current` and `target`, in execution order.
    pub fn plan(&self, current: Option<&VersionId>, target: &Target) -> Result<MigrationPlan, ChainError> {
        let current_pos = match current {
            Some(id) => Some(
                *self
                    .positions
                    .get(id)
                    .ok_or_else(|| ChainError::UnknownVersion(id.clone()))?,
            ),
            None => None,
        };
        let to = self.resolve(target)?;
        let target_pos = to.as_ref().and_then(|id| self.positions.get(id).copied());

        // base sits at -1 so the arithmetic stays uniform
        let from_idx = current_pos.map(|p| p as i64).unwrap_or(-1);
        let to_idx = target_pos.map(|p| p as i64).unwrap_or(-1);

        let (direction, steps) = if to_idx > from_idx {
            let start = (from_idx + 1) as usize;
            let end = to_idx as usize;
            let steps = self.units[start..=end].iter().map(|u| u.id.clone()).collect();
            (Direction::Upgrade, steps)
        } else if to_idx < from_idx {
            let start = (to_idx + 1) as usize;
            let end = from_idx as usize;
            let steps = self.units[start..=end].iter().rev().map(|u| u.id.clone()).collect();
            (Direction::Downgrade, steps)
        } else {
            (Direction::Upgrade, Vec::new())
        };

        Ok(MigrationPlan {
            from: current.cloned(),
            to,
            direction,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, parent: Option<&str>) -> MigrationUnit {
        MigrationUnit::new(id, parent, id)
            .upgrade(SchemaOp::CreateTable(TableDef::new(
                format!("t_{}", id),
                vec![ColumnDef::new("id", ColumnType::Uuid).primary_key()],
            )))
            .downgrade(SchemaOp::drop_table(&format!("t_{}", id)))
    }

    fn chain() -> MigrationChain {
        MigrationChain::new(vec![unit("c", Some("b")), unit("a", None), unit("b", Some("a"))]).unwrap()
    }

    #[test]
    fn test_chain_orders_units_from_root() {
        let chain = chain();
        let ids: Vec<&str> = chain.units().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(chain.head(), Some(&VersionId::from("c")));
    }

    #[test]
    fn test_chain_rejects_branches_and_broken_links() {
        let err = MigrationChain::new(vec![unit("a", None), unit("b", Some("a")), unit("c", Some("a"))]).unwrap_err();
        assert!(matches!(err, ChainError::Branch { .. }));

        let err = MigrationChain::new(vec![unit("a", None), unit("b", Some("zz"))]).unwrap_err();
        assert_eq!(
            err,
            ChainError::BrokenLink {
                unit: VersionId::from("b"),
                parent: VersionId::from("zz")
            }
        );

        let err = MigrationChain::new(vec![unit("a", None), unit("b", None)]).unwrap_err();
        assert!(matches!(err, ChainError::MultipleRoots(_)));

        let err = MigrationChain::new(vec![unit("a", None), unit("a", None)]).unwrap_err();
        assert_eq!(err, ChainError::DuplicateVersion(VersionId::from("a")));
    }

    #[test]
    fn test_chain_rejects_cycle_detached_from_root() {
        let err = MigrationChain::new(vec![unit("a", None), unit("x", Some("y")), unit("y", Some("x"))]).unwrap_err();
        assert!(matches!(err, ChainError::Disconnected(_)));
    }

    #[test]
    fn test_backfill_requires_predicate() {
        let bad = MigrationUnit::new("a", None, "bad").upgrade(SchemaOp::Backfill(
            Backfill::new("t", "  ", "everything").set("x", "1"),
        ));
        assert_eq!(
            MigrationChain::new(vec![bad]).unwrap_err(),
            ChainError::UnboundedBackfill(VersionId::from("a"))
        );
    }

    #[test]
    fn test_plan_upgrade_and_downgrade() {
        let chain = chain();

        let plan = chain.plan(None, &Target::Head).unwrap();
        assert_eq!(plan.direction, Direction::Upgrade);
        assert_eq!(plan.steps, vec![VersionId::from("a"), VersionId::from("b"), VersionId::from("c")]);

        let plan = chain.plan(Some(&VersionId::from("c")), &Target::Version(VersionId::from("a"))).unwrap();
        assert_eq!(plan.direction, Direction::Downgrade);
        assert_eq!(plan.steps, vec![VersionId::from("c"), VersionId::from("b")]);
        assert_eq!(plan.to, Some(VersionId::from("a")));

        let plan = chain.plan(Some(&VersionId::from("b")), &Target::Base).unwrap();
        assert_eq!(plan.steps, vec![VersionId::from("b"), VersionId::from("a")]);
        assert_eq!(plan.to, None);

        let plan = chain.plan(Some(&VersionId::from("c")), &Target::Head).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_rejects_unknown_current() {
        let chain = chain();
        let err = chain.plan(Some(&VersionId::from("gone")), &Target::Head).unwrap_err();
        assert_eq!(err, ChainError::UnknownVersion(VersionId::from("gone")));
    }

    #[test]
    fn test_checksum_tracks_content() {
        let a = unit("a", None);
        let mut edited = a.clone();
        edited.description = "edited".to_string();
        assert_eq!(a.checksum().unwrap(), unit("a", None).checksum().unwrap());
        assert_ne!(a.checksum().unwrap(), edited.checksum().unwrap());
        assert_eq!(a.checksum().unwrap().len(), 64);
    }
}
