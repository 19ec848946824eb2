// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod dispatch;
pub mod migrator;
pub mod repair;

pub use dispatch::{AuditEmitter, EmailDispatcher};
pub use migrator::{MigrationError, MigrationReport, MigrationStatus, Migrator};
pub use repair::{repair, repair_with_manifest, RepairService};
