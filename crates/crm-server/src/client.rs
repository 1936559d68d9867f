// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! GraphQL client used by the scheduled jobs.
//!
//! Requests are plain `{query, variables}` JSON posts. Transport failures
//! (connection refused, timeouts) are retried; HTTP and GraphQL errors are not.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("HTTP status {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response carried GraphQL errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),

    /// The response had neither data nor errors.
    #[error("GraphQL response has no data")]
    MissingData,

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLErrorMessage>,
}

#[derive(Deserialize)]
struct GraphQLErrorMessage {
    message: String,
}

/// Product touched by the restock mutation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestockedProduct {
    /// Product name.
    pub name: String,
    /// Stock after the restock.
    pub stock: i32,
}

/// Result of the restock mutation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestockResult {
    /// Whether the mutation ran.
    pub success: bool,
    /// Status message.
    pub message: String,
    /// Restocked products.
    pub products: Vec<RestockedProduct>,
}

/// An order that needs a reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReminder {
    /// Order id.
    pub id: String,
    /// Email of the ordering customer.
    pub customer_email: String,
}

/// Totals for the weekly report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    /// Number of customers.
    pub customers: i64,
    /// Number of orders.
    pub orders: i64,
    /// Sum of all order totals.
    pub revenue: Decimal,
}

const HELLO_QUERY: &str = "{ hello }";

const RESTOCK_MUTATION: &str = r#"
mutation {
    updateLowStockProducts {
        success
        message
        products { name stock }
    }
}
"#;

const RECENT_ORDERS_QUERY: &str = r#"
query RecentOrders($since: DateTime!) {
    orders(filter: { orderDateGte: $since }, orderBy: ["orderDate"]) {
        nodes {
            id
            customer { email }
        }
    }
}
"#;

const REPORT_QUERY: &str = r#"
query {
    customers { totalCount }
    orders { totalCount totalRevenue }
}
"#;

/// GraphQL-over-HTTP client for the CRM API.
#[derive(Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    endpoint: String,
    retries: u32,
    retry_delay: Duration,
}

impl CrmClient {
    /// Create a client for `endpoint` with a per-request timeout and a
    /// number of retries on transport failures.
    pub fn new(endpoint: impl Into<String>, timeout: Duration, retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            retries,
            retry_delay: Duration::from_millis(250),
        })
    }

    /// Set the delay before the first retry. Later retries wait longer.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a query and decode its `data`.
    pub async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let body = json!({ "query": query, "variables": variables });

        let mut attempt = 0u32;
        let response = loop {
            match self.http.post(&self.endpoint).json(&body).send().await {
                Ok(response) => break response,
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        endpoint = %self.endpoint,
                        attempt,
                        error = %e,
                        "GraphQL request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let decoded: GraphQLResponse<T> = serde_json::from_str(&text)?;
        if !decoded.errors.is_empty() {
            return Err(ClientError::GraphQL(
                decoded.errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        debug!(endpoint = %self.endpoint, "GraphQL request succeeded");
        decoded.data.ok_or(ClientError::MissingData)
    }

    /// Run the `hello` query.
    pub async fn hello(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Data {
            hello: String,
        }

        let data: Data = self.execute(HELLO_QUERY, json!({})).await?;
        Ok(data.hello)
    }

    /// Run the `updateLowStockProducts` mutation.
    pub async fn restock_low_stock(&self) -> Result<RestockResult> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            update_low_stock_products: RestockResult,
        }

        let data: Data = self.execute(RESTOCK_MUTATION, json!({})).await?;
        Ok(data.update_low_stock_products)
    }

    /// Orders placed at or after `since`, oldest first.
    pub async fn recent_orders(&self, since: DateTime<Utc>) -> Result<Vec<OrderReminder>> {
        #[derive(Deserialize)]
        struct Customer {
            email: String,
        }
        #[derive(Deserialize)]
        struct Node {
            id: String,
            customer: Customer,
        }
        #[derive(Deserialize)]
        struct Orders {
            nodes: Vec<Node>,
        }
        #[derive(Deserialize)]
        struct Data {
            orders: Orders,
        }

        let variables = json!({ "since": since.to_rfc3339() });
        let data: Data = self.execute(RECENT_ORDERS_QUERY, variables).await?;

        Ok(data
            .orders
            .nodes
            .into_iter()
            .map(|node| OrderReminder {
                id: node.id,
                customer_email: node.customer.email,
            })
            .collect())
    }

    /// Customer count, order count and revenue.
    pub async fn report_summary(&self) -> Result<ReportSummary> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Customers {
            total_count: i64,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Orders {
            total_count: i64,
            total_revenue: Decimal,
        }
        #[derive(Deserialize)]
        struct Data {
            customers: Customers,
            orders: Orders,
        }

        let data: Data = self.execute(REPORT_QUERY, json!({})).await?;

        Ok(ReportSummary {
            customers: data.customers.total_count,
            orders: data.orders.total_count,
            revenue: data.orders.total_revenue,
        })
    }
}
