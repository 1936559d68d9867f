// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for crm-server.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Core data layer failed.
    #[error("Core error: {0}")]
    Core(#[from] crm_core::CrmError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// GraphQL client call failed.
    #[error("Client error: {0}")]
    Client(#[from] crate::client::ClientError),

    /// Scheduler setup failed.
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] crate::scheduler::SchedulerError),

    /// No job has this name.
    #[error("Unknown job: {0}")]
    UnknownJob(String),
}

/// Result type using server Error.
pub type Result<T> = std::result::Result<T, Error>;
