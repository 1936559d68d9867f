// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Liveness heartbeat.

use async_trait::async_trait;
use chrono::Local;
use tracing::{info, warn};

use super::{Job, JobContext, JobLog};
use crate::client::{ClientError, CrmClient};
use crate::error::Result;

const LOG_FILE: &str = "crm_heartbeat_log.txt";

/// Writes "CRM is alive" and checks that the GraphQL endpoint answers `hello`.
pub struct HeartbeatJob {
    client: CrmClient,
    log: JobLog,
}

impl HeartbeatJob {
    pub fn new(ctx: &JobContext) -> Self {
        Self {
            client: ctx.client.clone(),
            log: ctx.log(LOG_FILE),
        }
    }
}

#[async_trait]
impl Job for HeartbeatJob {
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    fn default_schedule(&self) -> &'static str {
        "*/5 * * * *"
    }

    async fn run(&self) -> Result<()> {
        let ts = Local::now().format("%d/%m/%Y-%H:%M:%S").to_string();
        let mut lines = vec![format!("{ts} CRM is alive")];

        match self.client.hello().await {
            Ok(hello) => {
                info!(%hello, "GraphQL endpoint responsive");
                lines.push(format!("{ts} GraphQL endpoint responsive: {hello}"));
            }
            Err(ClientError::Status { status, .. }) => {
                warn!(status, "GraphQL endpoint returned an error status");
                lines.push(format!("{ts} GraphQL endpoint error: {status}"));
            }
            Err(e) => {
                warn!(error = %e, "GraphQL check failed");
                lines.push(format!("{ts} GraphQL check failed: {e}"));
            }
        }

        self.log.append(&lines).await?;
        Ok(())
    }
}
