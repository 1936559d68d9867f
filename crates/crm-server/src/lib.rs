// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! CRM Server - GraphQL API and Scheduled Jobs
//!
//! This crate exposes [`crm_core`] over GraphQL and runs the periodic jobs
//! that keep the CRM healthy.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        HTTP clients                           │
//! └──────────────────────────────────────────────────────────────┘
//!                │ POST /graphql                 ▲
//!                ▼                               │ CrmClient
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  crm-server (This Crate)                      │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │
//! │  │ axum server  │──▶│ GraphQL      │   │  JobScheduler    │   │
//! │  │ /graphql     │   │ schema       │   │  heartbeat       │   │
//! │  │ /health      │   └──────┬───────┘   │  low-stock       │   │
//! │  └──────────────┘          │           │  order-reminders │   │
//! │                            │           │  report          │   │
//! │                            ▼           └──────────────────┘   │
//! │                     ┌──────────────┐                          │
//! │                     │  CrmService  │                          │
//! │                     └──────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The jobs never touch the database directly: they call the API like any
//! other client and write their results to plain-text log files.
//!
//! # Modules
//!
//! - [`client`]: GraphQL-over-HTTP client used by the jobs
//! - [`config`]: Environment configuration
//! - [`graphql`]: Schema, resolvers and input types
//! - [`jobs`]: The scheduled jobs
//! - [`runtime`]: Embeddable server plus scheduler
//! - [`scheduler`]: Cron loop
//! - [`server`]: axum router

pub mod client;
pub mod config;
pub mod error;
pub mod graphql;
pub mod jobs;
pub mod runtime;
pub mod scheduler;
pub mod server;

pub use error::{Error, Result};
