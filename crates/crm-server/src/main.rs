// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! CRM Server
//!
//! Commands:
//! - `serve` (default): GraphQL API plus scheduled jobs
//! - `migrate`: apply database migrations and exit
//! - `seed`: insert demo customers and products
//! - `run-job <name>`: run one scheduled job now

use std::time::Duration;

use clap::{Parser, Subcommand};
use crm_core::CrmService;
use tracing::{info, warn};

use crm_server::client::CrmClient;
use crm_server::config::Config;
use crm_server::jobs::{JobContext, find_job};
use crm_server::runtime::CrmRuntime;

/// CRM backend: GraphQL API, scheduled jobs and maintenance commands.
#[derive(Debug, Parser)]
#[command(name = "crm", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the GraphQL API and run the job scheduler
    Serve,

    /// Apply database migrations
    Migrate,

    /// Insert the demo customer and products if missing
    Seed,

    /// Run one job immediately
    ///
    /// Jobs: heartbeat, low-stock, order-reminders, report.
    RunJob {
        /// Job name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_server=info,crm_core=info,tower_http=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            crm_core::persistence::connect(&config.database_url, config.db_max_connections)
                .await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::Seed => {
            let persistence =
                crm_core::persistence::connect(&config.database_url, config.db_max_connections)
                    .await?;
            let report = crm_core::seed::run(&CrmService::new(persistence)).await?;
            info!(
                customers = report.customers_created,
                products = report.products_created,
                "Seed finished"
            );
            println!("Seeded customers and products.");
            Ok(())
        }
        Command::RunJob { name } => run_job(&config, &name).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        http_addr = %config.http_addr,
        graphql_url = %config.graphql_url,
        log_dir = %config.log_dir.display(),
        scheduler = config.scheduler_enabled,
        "Starting CRM server"
    );

    let persistence =
        crm_core::persistence::connect(&config.database_url, config.db_max_connections).await?;

    let runtime = CrmRuntime::builder()
        .config(&config)
        .persistence(persistence)
        .build()?
        .start()
        .await?;

    info!(addr = %runtime.local_addr(), "CRM server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("CRM server shut down");
    Ok(())
}

async fn run_job(config: &Config, name: &str) -> anyhow::Result<()> {
    let client = CrmClient::new(
        &config.graphql_url,
        config.client_timeout,
        config.client_retries,
    )?
    .with_retry_delay(Duration::from_millis(500));
    let ctx = JobContext::new(client, config.log_dir.clone());

    let job = find_job(&ctx, name)?;
    info!(job = job.name(), "Running job");
    job.run().await?;

    if job.name() == "order-reminders" {
        println!("Order reminders processed!");
    }
    Ok(())
}
