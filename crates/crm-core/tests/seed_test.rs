// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Seeding tests.

mod common;

use common::*;
use crm_core::model::{CustomerFilter, ProductFilter};
use crm_core::seed::{self, SeedReport};

#[tokio::test]
async fn test_seed_creates_demo_data_once() {
    let service = sqlite_service().await;

    let first = seed::run(&service).await.unwrap();
    assert_eq!(
        first,
        SeedReport {
            customers_created: 1,
            products_created: 2,
        }
    );

    let second = seed::run(&service).await.unwrap();
    assert!(second.is_empty());

    assert_eq!(
        service
            .count_customers(&CustomerFilter::default())
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        service
            .count_products(&ProductFilter::default())
            .await
            .unwrap(),
        2
    );

    let demo = service
        .persistence()
        .find_customer_by_email("DEMO@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(demo.name, "Demo User");
    assert_eq!(demo.phone.as_deref(), Some("+1234567890"));

    let laptop = service
        .persistence()
        .find_product_by_name("Laptop")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(laptop.price.to_string(), "999.99");
    assert_eq!(laptop.stock, 10);
}

#[tokio::test]
async fn test_seed_keeps_existing_rows() {
    let service = sqlite_service().await;
    create_product(&service, "Mouse", "25.00", 1).await;

    let report = seed::run(&service).await.unwrap();
    assert_eq!(report.products_created, 1);

    let mouse = service
        .persistence()
        .find_product_by_name("Mouse")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mouse.price.to_string(), "25.00");
    assert_eq!(mouse.stock, 1);
}
