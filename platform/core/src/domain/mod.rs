// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Entities, schema-lifecycle types and the ports implemented by
//! infrastructure.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and traits, no I/O

pub mod agent;
pub mod audit;
pub mod beta;
pub mod config;
pub mod coordination;
pub mod ledger;
pub mod migration;
pub mod notification;
pub mod performance;
pub mod repair;
pub mod repository;
pub mod workflow;
