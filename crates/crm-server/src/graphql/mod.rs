// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! GraphQL schema for the CRM API.
//!
//! The schema carries a [`CrmService`] as context data; every resolver goes
//! through it.

pub mod inputs;
pub mod mutation;
pub mod query;
pub mod scalars;
pub mod types;

use async_graphql::{EmptySubscription, Schema};
use crm_core::CrmService;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

/// GraphQL schema type.
pub type CrmSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema around a service.
pub fn build_schema(service: CrmService) -> CrmSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crm_core::persistence::SqlitePersistence;

    #[tokio::test]
    async fn test_schema_exposes_expected_operations() {
        let persistence = SqlitePersistence::in_memory().await.unwrap();
        let schema = build_schema(CrmService::new(Arc::new(persistence)));
        let sdl = schema.sdl();

        for field in [
            "hello: String!",
            "createCustomer(",
            "bulkCreateCustomers(",
            "createProduct(",
            "createOrder(",
            "updateLowStockProducts:",
            "scalar Decimal",
            "totalRevenue: Decimal!",
        ] {
            assert!(sdl.contains(field), "schema is missing {field}");
        }
    }
}
