// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for crm-server integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crm_core::CrmService;
use crm_core::persistence::SqlitePersistence;
use crm_server::client::CrmClient;
use crm_server::graphql::{CrmSchema, build_schema};
use crm_server::jobs::JobContext;
use serde_json::Value;

/// Schema backed by a fresh in-memory SQLite database.
pub async fn sqlite_schema() -> CrmSchema {
    let persistence = SqlitePersistence::in_memory()
        .await
        .expect("Failed to create in-memory database");
    build_schema(CrmService::new(Arc::new(persistence)))
}

/// Execute a request and return its `data` as JSON, failing on GraphQL errors.
pub async fn execute(schema: &CrmSchema, query: &str) -> Value {
    let response = schema.execute(query).await;
    assert!(
        response.errors.is_empty(),
        "unexpected errors: {:?}",
        response.errors
    );
    response.data.into_json().expect("data is valid JSON")
}

/// Execute a request that must fail; returns the error messages.
pub async fn execute_err(schema: &CrmSchema, query: &str) -> Vec<String> {
    let response = schema.execute(query).await;
    assert!(!response.errors.is_empty(), "expected errors");
    response.errors.into_iter().map(|e| e.message).collect()
}

/// Create a customer and return its id.
pub async fn create_customer(schema: &CrmSchema, name: &str, email: &str) -> String {
    let data = execute(
        schema,
        &format!(
            r#"mutation {{ createCustomer(input: {{ name: "{name}", email: "{email}" }}) {{ customer {{ id }} errors }} }}"#
        ),
    )
    .await;
    data["createCustomer"]["customer"]["id"]
        .as_str()
        .expect("customer id")
        .to_string()
}

/// Create a product and return its id.
pub async fn create_product(schema: &CrmSchema, name: &str, price: &str, stock: i32) -> String {
    let data = execute(
        schema,
        &format!(
            r#"mutation {{ createProduct(input: {{ name: "{name}", price: "{price}", stock: {stock} }}) {{ product {{ id }} errors }} }}"#
        ),
    )
    .await;
    data["createProduct"]["product"]["id"]
        .as_str()
        .expect("product id")
        .to_string()
}

/// Client without retries, for fast failures.
pub fn client(endpoint: &str) -> CrmClient {
    CrmClient::new(endpoint, Duration::from_secs(2), 0).expect("Failed to build client")
}

pub fn job_context(endpoint: &str, log_dir: &Path) -> JobContext {
    JobContext::new(client(endpoint), log_dir)
}

/// Read a job log, empty when the file does not exist.
pub fn read_log(dir: &Path, file_name: &str) -> String {
    std::fs::read_to_string(dir.join(file_name)).unwrap_or_default()
}
