// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL backend tests.
//!
//! These run only when `TEST_CRM_DATABASE_URL` points at a disposable
//! database. Emails and names carry a random suffix so runs do not collide.

mod common;

use std::sync::Arc;

use common::*;
use crm_core::CrmService;
use crm_core::model::{OrderFilter, ProductFilter};
use crm_core::persistence::{Persistence, PostgresPersistence};
use crm_core::service::OrderInput;

/// Skip test if database URL is not set
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_CRM_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_CRM_DATABASE_URL not set");
            return;
        }
    };
}

async fn postgres_service() -> Option<CrmService> {
    let database_url = std::env::var("TEST_CRM_DATABASE_URL").ok()?;
    let persistence = PostgresPersistence::connect(&database_url, 5).await.ok()?;
    Some(CrmService::new(Arc::new(persistence)))
}

fn unique_suffix() -> String {
    format!(
        "{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}

#[tokio::test]
async fn test_postgres_customer_conflict_and_bulk() {
    skip_if_no_db!();

    let Some(service) = postgres_service().await else {
        eprintln!("Skipping test: failed to connect to database");
        return;
    };
    assert_eq!(service.persistence().backend(), "postgres");

    let suffix = unique_suffix();
    let email = format!("pg-{}@example.com", suffix);
    create_customer(&service, "Pg", &email).await;

    let duplicate = service
        .create_customer(customer_input("Pg", &email.to_uppercase(), None))
        .await
        .unwrap();
    assert_eq!(duplicate.errors, vec!["Email already exists".to_string()]);

    let outcome = service
        .bulk_create_customers(vec![
            customer_input("One", &format!("one-{}@example.com", suffix), None),
            customer_input("Two", &format!("two-{}@example.com", suffix), Some("bad")),
        ])
        .await
        .unwrap();
    assert_eq!(outcome.customers.len(), 1);
    assert_eq!(outcome.errors, vec!["[2] Invalid phone format: bad".to_string()]);
}

#[tokio::test]
async fn test_postgres_order_total_and_restock() {
    skip_if_no_db!();

    let Some(service) = postgres_service().await else {
        eprintln!("Skipping test: failed to connect to database");
        return;
    };

    let suffix = unique_suffix();
    let customer =
        create_customer(&service, "Buyer", &format!("buyer-{}@example.com", suffix)).await;
    let laptop = create_product(&service, &format!("Laptop {}", suffix), "999.99", 1).await;
    let mouse = create_product(&service, &format!("Mouse {}", suffix), "19.99", 100).await;

    let order = service
        .create_order(OrderInput {
            customer_id: customer.id.to_string(),
            product_ids: vec![laptop.id.to_string(), mouse.id.to_string()],
            order_date: None,
        })
        .await
        .unwrap()
        .order
        .unwrap();
    assert_eq!(order.total_amount, money("1019.98"));

    let mine = OrderFilter {
        customer_id: Some(customer.id),
        ..Default::default()
    };
    assert_eq!(service.total_revenue(&mine).await.unwrap(), money("1019.98"));

    let restocked = service.update_low_stock_products().await.unwrap();
    assert!(restocked.products.iter().any(|p| p.id == laptop.id && p.stock == 11));

    let named = ProductFilter {
        name_icontains: Some(suffix.clone()),
        low_stock: Some(true),
        ..Default::default()
    };
    assert_eq!(service.count_products(&named).await.unwrap(), 0);
}
