// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Daily reminders for recent orders.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{error, info};

use super::{Job, JobContext, JobLog, timestamp};
use crate::client::CrmClient;
use crate::error::Result;

const LOG_FILE: &str = "order_reminders_log.txt";

/// How far back an order still gets a reminder.
const LOOKBACK_DAYS: i64 = 7;

/// Logs one line per order placed in the last week.
pub struct OrderRemindersJob {
    client: CrmClient,
    log: JobLog,
}

impl OrderRemindersJob {
    pub fn new(ctx: &JobContext) -> Self {
        Self {
            client: ctx.client.clone(),
            log: ctx.log(LOG_FILE),
        }
    }
}

#[async_trait]
impl Job for OrderRemindersJob {
    fn name(&self) -> &'static str {
        "order-reminders"
    }

    fn default_schedule(&self) -> &'static str {
        "0 8 * * *"
    }

    async fn run(&self) -> Result<()> {
        let since = Utc::now() - Duration::days(LOOKBACK_DAYS);
        let ts = timestamp();

        let lines: Vec<String> = match self.client.recent_orders(since).await {
            Ok(orders) => {
                info!(count = orders.len(), "Processed order reminders");
                orders
                    .iter()
                    .map(|o| format!("{ts} - Order {} for {}", o.id, o.customer_email))
                    .collect()
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch recent orders");
                vec![format!("{ts} - Error processing order reminders: {e}")]
            }
        };

        self.log.append(&lines).await?;
        Ok(())
    }
}
