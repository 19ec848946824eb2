// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Switchyard Core
//!
//! Schema lifecycle, entity persistence and side-effect dispatch for the
//! Switchyard agent coordination platform.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, migration engine, repositories and adapters
//!
//! | Module | Contents |
//! |--------|----------|
//! | `domain` | Entities, migration model, ledger and repair types, ports |
//! | `application` | Migrator, repair service, audit/email dispatch |
//! | `infrastructure` | sqlx (`Any`) adapters, SendGrid client, audit sinks |
//! | `migrations` | The built-in unit chain and supersedes manifest |

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod migrations;
