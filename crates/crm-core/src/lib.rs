// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! CRM Core - Data Model, Validation and Persistence
//!
//! This crate owns everything the CRM backend knows about its data:
//! customers, products and orders, the rules that guard them, and the
//! storage backends that persist them.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │              crm-server (GraphQL API, scheduled jobs)          │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      crm-core (This Crate)                     │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────────┐   │
//! │  │ CrmService  │──▶│  validation  │   │       seed         │   │
//! │  └──────┬──────┘   └──────────────┘   └────────────────────┘   │
//! │         │ Arc<dyn Persistence>                                 │
//! │         ▼                                                      │
//! │  ┌─────────────────────┐   ┌─────────────────────┐             │
//! │  │ PostgresPersistence │   │  SqlitePersistence  │             │
//! │  └─────────────────────┘   └─────────────────────┘             │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Mutation Semantics
//!
//! Mutations never fail a request because of bad input. The service collects
//! user-facing messages into an `errors` list and writes nothing when that
//! list is non-empty. Multi-row writes run inside one transaction:
//!
//! | Operation | Transaction shape |
//! |-----------|-------------------|
//! | `create_order` | order row, product links and total in one transaction |
//! | `bulk_create_customers` | one transaction, one savepoint per item |
//! | `update_low_stock_products` | select and update in one transaction |
//!
//! # Modules
//!
//! - [`error`]: Error type shared by persistence and service
//! - [`migrations`]: Embedded PostgreSQL and SQLite migrations
//! - [`model`]: Customers, products, orders, filters and ordering
//! - [`persistence`]: Storage trait and its backends
//! - [`seed`]: Demo data for local development
//! - [`service`]: Validation-then-persist operations behind the API
//! - [`validation`]: Phone, money and stock rules

#![deny(missing_docs)]

/// Error types for CRM operations.
pub mod error;

/// Embedded database migrations.
pub mod migrations;

/// Domain records, filters and ordering.
pub mod model;

/// Persistence trait and PostgreSQL/SQLite backends.
pub mod persistence;

/// Demo data seeding.
pub mod seed;

/// Query and mutation service used by the API layer.
pub mod service;

/// Input validation rules.
pub mod validation;

pub use error::{CrmError, Result};
pub use persistence::Persistence;
pub use service::CrmService;
