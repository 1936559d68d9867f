// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Periodic restock of products running low.

use async_trait::async_trait;
use tracing::{error, info};

use super::{Job, JobContext, JobLog, timestamp};
use crate::client::CrmClient;
use crate::error::Result;

const LOG_FILE: &str = "low_stock_updates_log.txt";

/// Runs `updateLowStockProducts` and logs every restocked product.
pub struct LowStockJob {
    client: CrmClient,
    log: JobLog,
}

impl LowStockJob {
    pub fn new(ctx: &JobContext) -> Self {
        Self {
            client: ctx.client.clone(),
            log: ctx.log(LOG_FILE),
        }
    }
}

#[async_trait]
impl Job for LowStockJob {
    fn name(&self) -> &'static str {
        "low-stock"
    }

    fn default_schedule(&self) -> &'static str {
        "0 */12 * * *"
    }

    async fn run(&self) -> Result<()> {
        let ts = timestamp();

        let lines = match self.client.restock_low_stock().await {
            Ok(result) if result.products.is_empty() => {
                info!("No low-stock products found");
                vec![format!("{ts} - No low-stock products found")]
            }
            Ok(result) => {
                info!(count = result.products.len(), "Restocked low-stock products");
                result
                    .products
                    .iter()
                    .map(|p| format!("{ts} - Updated {}: new stock {}", p.name, p.stock))
                    .collect()
            }
            Err(e) => {
                error!(error = %e, "Failed to update low-stock products");
                vec![format!("{ts} - Error updating low stock products: {e}")]
            }
        };

        self.log.append(&lines).await?;
        Ok(())
    }
}
