// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for the CRM server.
//!
//! [`CrmRuntime`] runs the GraphQL HTTP server and, optionally, the job
//! scheduler inside an existing tokio application.
//!
//! # Example
//!
//! ```rust,ignore
//! use crm_server::runtime::CrmRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let persistence = crm_core::persistence::connect("sqlite:crm.db", 5).await?;
//!
//!     let runtime = CrmRuntime::builder()
//!         .persistence(persistence)
//!         .bind_addr("127.0.0.1:8000".parse()?)
//!         .log_dir("/var/log/crm")
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... run your application ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crm_core::{CrmService, Persistence};
use tokio::net::TcpListener;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::client::CrmClient;
use crate::config::{Config, JobSchedules};
use crate::graphql::build_schema;
use crate::jobs::{JobContext, all_jobs};
use crate::scheduler::JobScheduler;
use crate::server::{self, AppState};

/// Builder for a [`CrmRuntime`].
pub struct CrmRuntimeBuilder {
    persistence: Option<Arc<dyn Persistence>>,
    bind_addr: SocketAddr,
    graphql_url: Option<String>,
    log_dir: PathBuf,
    scheduler_enabled: bool,
    schedules: JobSchedules,
    client_timeout: Duration,
    client_retries: u32,
}

impl Default for CrmRuntimeBuilder {
    fn default() -> Self {
        Self {
            persistence: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            graphql_url: None,
            log_dir: PathBuf::from("/tmp"),
            scheduler_enabled: true,
            schedules: JobSchedules::default(),
            client_timeout: Duration::from_secs(5),
            client_retries: 3,
        }
    }
}

impl CrmRuntimeBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every setting except persistence from a loaded [`Config`].
    pub fn config(self, config: &Config) -> Self {
        self.bind_addr(config.http_addr)
            .graphql_url(config.graphql_url.clone())
            .log_dir(config.log_dir.clone())
            .scheduler_enabled(config.scheduler_enabled)
            .schedules(config.schedules.clone())
            .client_timeout(config.client_timeout)
            .client_retries(config.client_retries)
    }

    /// Set the storage backend (required).
    pub fn persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Set the HTTP bind address. Port 0 picks a free port.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the GraphQL URL the jobs call.
    ///
    /// Defaults to the runtime's own `/graphql` route on the loopback address.
    pub fn graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = Some(url.into());
        self
    }

    /// Set the directory of the job log files.
    pub fn log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = path.into();
        self
    }

    /// Enable or disable the job scheduler.
    pub fn scheduler_enabled(mut self, enabled: bool) -> Self {
        self.scheduler_enabled = enabled;
        self
    }

    /// Set per-job schedule overrides.
    pub fn schedules(mut self, schedules: JobSchedules) -> Self {
        self.schedules = schedules;
        self
    }

    /// Set the per-request timeout of the jobs' GraphQL client.
    pub fn client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = timeout;
        self
    }

    /// Set how often the jobs' client retries a failed request.
    pub fn client_retries(mut self, retries: u32) -> Self {
        self.client_retries = retries;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if persistence is missing.
    pub fn build(self) -> Result<CrmRuntimeConfig> {
        let persistence = self
            .persistence
            .ok_or_else(|| anyhow::anyhow!("persistence is required"))?;

        Ok(CrmRuntimeConfig {
            persistence,
            bind_addr: self.bind_addr,
            graphql_url: self.graphql_url,
            log_dir: self.log_dir,
            scheduler_enabled: self.scheduler_enabled,
            schedules: self.schedules,
            client_timeout: self.client_timeout,
            client_retries: self.client_retries,
        })
    }
}

/// Configuration for a [`CrmRuntime`].
pub struct CrmRuntimeConfig {
    persistence: Arc<dyn Persistence>,
    bind_addr: SocketAddr,
    graphql_url: Option<String>,
    log_dir: PathBuf,
    scheduler_enabled: bool,
    schedules: JobSchedules,
    client_timeout: Duration,
    client_retries: u32,
}

impl CrmRuntimeConfig {
    /// Start the runtime, spawning the HTTP server and scheduler tasks.
    pub async fn start(self) -> Result<CrmRuntime> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let graphql_url = self
            .graphql_url
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/graphql", local_addr.port()));

        let service = CrmService::new(self.persistence);

        // Scheduler first: a bad cron expression must fail startup before
        // the server accepts requests.
        let scheduler = if self.scheduler_enabled {
            let client = CrmClient::new(&graphql_url, self.client_timeout, self.client_retries)?;
            let ctx = JobContext::new(client, self.log_dir.clone());

            let mut scheduler = JobScheduler::new();
            for job in all_jobs(&ctx) {
                let schedule = self.schedules.for_job(job.name());
                scheduler.add(job, schedule)?;
            }

            for (name, expression) in scheduler.entries() {
                info!(job = name, schedule = expression, "Scheduled job");
            }
            Some(scheduler)
        } else {
            debug!("Job scheduler disabled");
            None
        };

        let (scheduler_shutdown, scheduler_handle) = match scheduler {
            Some(scheduler) => {
                let shutdown = scheduler.shutdown_handle();
                let handle = tokio::spawn(async move {
                    scheduler.run().await;
                });
                (Some(shutdown), Some(handle))
            }
            None => (None, None),
        };

        let (server_shutdown_tx, server_shutdown_rx) = watch::channel(false);
        let state = AppState::new(build_schema(service.clone()));
        let server_handle = tokio::spawn(server::serve(listener, state, server_shutdown_rx));

        info!(
            addr = %local_addr,
            graphql_url = %graphql_url,
            log_dir = %self.log_dir.display(),
            scheduler = scheduler_handle.is_some(),
            "CrmRuntime started"
        );

        Ok(CrmRuntime {
            server_handle,
            scheduler_handle,
            server_shutdown_tx,
            scheduler_shutdown,
            service,
            local_addr,
            graphql_url,
        })
    }
}

/// A running CRM server.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct CrmRuntime {
    server_handle: JoinHandle<crate::error::Result<()>>,
    scheduler_handle: Option<JoinHandle<()>>,
    server_shutdown_tx: watch::Sender<bool>,
    scheduler_shutdown: Option<Arc<Notify>>,
    service: CrmService,
    local_addr: SocketAddr,
    graphql_url: String,
}

impl CrmRuntime {
    /// Create a builder for configuring the runtime.
    pub fn builder() -> CrmRuntimeBuilder {
        CrmRuntimeBuilder::new()
    }

    /// Address the HTTP server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// GraphQL URL the jobs call.
    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    /// Service shared with the GraphQL schema.
    pub fn service(&self) -> &CrmService {
        &self.service
    }

    /// Whether the scheduler was started.
    pub fn scheduler_running(&self) -> bool {
        self.scheduler_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Gracefully shut down the runtime.
    ///
    /// Signals the scheduler and the HTTP server, then waits for both.
    pub async fn shutdown(self) -> Result<()> {
        info!("CrmRuntime shutting down...");

        let _ = self.server_shutdown_tx.send(true);

        if let Some(shutdown) = &self.scheduler_shutdown {
            shutdown.notify_one();
        }

        if let Some(handle) = self.scheduler_handle
            && let Err(e) = handle.await
        {
            error!("Job scheduler task panicked: {}", e);
        }

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("CrmRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("CrmRuntime server error during shutdown: {}", e);
                Err(e.into())
            }
            Err(e) => {
                error!("CrmRuntime server task panicked: {}", e);
                Err(anyhow::anyhow!("server task panicked: {}", e))
            }
        }
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        let scheduler_running = self
            .scheduler_handle
            .as_ref()
            .is_none_or(|h| !h.is_finished());

        !self.server_handle.is_finished() && scheduler_running
    }
}
