// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod audit;
pub mod db;
pub mod dialect;
pub mod email;
pub mod executor;
pub mod history;
pub mod introspect;
pub mod ledger;
pub mod lock;
pub mod repositories;

pub use db::Database;
pub use dialect::Dialect;
