// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Weekly summary report.

use async_trait::async_trait;
use tracing::{error, info};

use super::{Job, JobContext, JobLog, timestamp};
use crate::client::CrmClient;
use crate::error::Result;

const LOG_FILE: &str = "crm_report_log.txt";

/// Logs customer count, order count and total revenue.
pub struct ReportJob {
    client: CrmClient,
    log: JobLog,
}

impl ReportJob {
    pub fn new(ctx: &JobContext) -> Self {
        Self {
            client: ctx.client.clone(),
            log: ctx.log(LOG_FILE),
        }
    }
}

#[async_trait]
impl Job for ReportJob {
    fn name(&self) -> &'static str {
        "report"
    }

    fn default_schedule(&self) -> &'static str {
        "0 6 * * MON"
    }

    async fn run(&self) -> Result<()> {
        let ts = timestamp();

        let line = match self.client.report_summary().await {
            Ok(summary) => {
                info!(
                    customers = summary.customers,
                    orders = summary.orders,
                    revenue = %summary.revenue,
                    "Generated CRM report"
                );
                format!(
                    "{ts} - Report: {} customers, {} orders, {} revenue",
                    summary.customers, summary.orders, summary.revenue
                )
            }
            Err(e) => {
                error!(error = %e, "Failed to generate CRM report");
                format!("{ts} - Error generating report: {e}")
            }
        };

        self.log.append(&[line]).await?;
        Ok(())
    }
}
