// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scheduled background jobs.
//!
//! Each job calls the GraphQL API through [`CrmClient`] and appends
//! plain-text lines to its own file in the log directory. API failures end
//! up in that file, never in the caller.
//!
//! | Job | Default schedule | Log file |
//! |-----|------------------|----------|
//! | `heartbeat` | `*/5 * * * *` | `crm_heartbeat_log.txt` |
//! | `low-stock` | `0 */12 * * *` | `low_stock_updates_log.txt` |
//! | `order-reminders` | `0 8 * * *` | `order_reminders_log.txt` |
//! | `report` | `0 6 * * MON` | `crm_report_log.txt` |

pub mod heartbeat;
pub mod low_stock;
pub mod order_reminders;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::io::AsyncWriteExt;

use crate::client::CrmClient;
use crate::error::{Error, Result};

pub use heartbeat::HeartbeatJob;
pub use low_stock::LowStockJob;
pub use order_reminders::OrderRemindersJob;
pub use report::ReportJob;

/// A unit of scheduled work.
#[async_trait]
pub trait Job: Send + Sync {
    /// Name used by the CLI and in logs.
    fn name(&self) -> &'static str;

    /// Cron expression used when no override is configured.
    fn default_schedule(&self) -> &'static str;

    /// Run once.
    ///
    /// Errors are limited to failing to write the job's own log file.
    async fn run(&self) -> Result<()>;
}

/// Append-only log file of one job.
#[derive(Debug, Clone)]
pub struct JobLog {
    path: PathBuf,
}

impl JobLog {
    /// Log file `file_name` inside `dir`.
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append lines, creating the file and its directory when missing.
    pub async fn append(&self, lines: &[String]) -> std::io::Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut buf = String::new();
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }
}

/// Local time as `%Y-%m-%d %H:%M:%S`.
pub(crate) fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// What every job needs: the API client and where to write.
#[derive(Clone)]
pub struct JobContext {
    /// GraphQL client.
    pub client: CrmClient,
    /// Directory of the job log files.
    pub log_dir: PathBuf,
}

impl JobContext {
    /// Create a job context.
    pub fn new(client: CrmClient, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            log_dir: log_dir.into(),
        }
    }

    fn log(&self, file_name: &str) -> JobLog {
        JobLog::new(&self.log_dir, file_name)
    }
}

/// Every job, in a fixed order.
pub fn all_jobs(ctx: &JobContext) -> Vec<Arc<dyn Job>> {
    vec![
        Arc::new(HeartbeatJob::new(ctx)),
        Arc::new(LowStockJob::new(ctx)),
        Arc::new(OrderRemindersJob::new(ctx)),
        Arc::new(ReportJob::new(ctx)),
    ]
}

/// Find a job by name.
pub fn find_job(ctx: &JobContext, name: &str) -> Result<Arc<dyn Job>> {
    all_jobs(ctx)
        .into_iter()
        .find(|job| job.name() == name)
        .ok_or_else(|| Error::UnknownJob(name.to_string()))
}
