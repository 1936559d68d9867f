// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service tests against an in-memory SQLite database.
//!
//! These tests cover validation, transactional writes and the list queries
//! the GraphQL layer builds on.

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::*;
use crm_core::model::{
    CustomerFilter, CustomerSortField, OrderBy, OrderFilter, OrderSortField, Page, ProductFilter,
    ProductSortField,
};
use crm_core::service::{OrderInput, ProductInput};
use crm_core::validation::messages;

// ============================================================================
// Customers
// ============================================================================

#[tokio::test]
async fn test_create_customer_trims_and_stores() {
    let service = sqlite_service().await;

    let outcome = service
        .create_customer(customer_input(
            "  Alice  ",
            " alice@example.com ",
            Some(" +1234567890 "),
        ))
        .await
        .unwrap();

    assert!(outcome.errors.is_empty(), "errors: {:?}", outcome.errors);
    assert_eq!(outcome.message.as_deref(), Some("Customer created successfully"));

    let customer = outcome.customer.unwrap();
    assert_eq!(customer.name, "Alice");
    assert_eq!(customer.email, "alice@example.com");
    assert_eq!(customer.phone.as_deref(), Some("+1234567890"));

    let stored = service.customer(customer.id).await.unwrap();
    assert_eq!(stored, Some(customer));
}

#[tokio::test]
async fn test_blank_phone_is_stored_as_null() {
    let service = sqlite_service().await;

    let outcome = service
        .create_customer(customer_input("Bob", "bob@example.com", Some("   ")))
        .await
        .unwrap();

    assert_eq!(outcome.customer.unwrap().phone, None);
}

#[tokio::test]
async fn test_duplicate_email_is_case_insensitive() {
    let service = sqlite_service().await;
    create_customer(&service, "Alice", "alice@example.com").await;

    let outcome = service
        .create_customer(customer_input("Other Alice", "ALICE@Example.com", None))
        .await
        .unwrap();

    assert!(outcome.customer.is_none());
    assert!(outcome.message.is_none());
    assert_eq!(outcome.errors, vec![messages::EMAIL_EXISTS.to_string()]);
    assert_eq!(
        service
            .count_customers(&CustomerFilter::default())
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_invalid_phone_and_duplicate_email_are_both_reported() {
    let service = sqlite_service().await;
    create_customer(&service, "Alice", "alice@example.com").await;

    let outcome = service
        .create_customer(customer_input("Alice", "alice@example.com", Some("12345")))
        .await
        .unwrap();

    assert_eq!(
        outcome.errors,
        vec![
            "Email already exists".to_string(),
            "Invalid phone format. Use +1234567890 or 123-456-7890".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_bulk_create_partial_success() {
    let service = sqlite_service().await;
    create_customer(&service, "Demo", "demo@example.com").await;

    let outcome = service
        .bulk_create_customers(vec![
            customer_input("Alice", "alice@example.com", Some("+1234567890")),
            customer_input("Bob", "bob@example.com", Some("12345")),
            customer_input("Demo Again", "Demo@example.com", None),
            customer_input("Alice Twin", "ALICE@example.com", None),
            customer_input("Carol", "carol@example.com", Some("123-456-7890")),
        ])
        .await
        .unwrap();

    let emails: Vec<&str> = outcome.customers.iter().map(|c| c.email.as_str()).collect();
    assert_eq!(emails, vec!["alice@example.com", "carol@example.com"]);
    assert_eq!(
        outcome.errors,
        vec![
            "[2] Invalid phone format: 12345".to_string(),
            "[3] Email already exists: Demo@example.com".to_string(),
            "[4] Email already exists: ALICE@example.com".to_string(),
        ]
    );
    assert_eq!(
        service
            .count_customers(&CustomerFilter::default())
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_bulk_create_reports_every_error_of_an_item() {
    let service = sqlite_service().await;
    create_customer(&service, "Alice", "alice@example.com").await;

    let outcome = service
        .bulk_create_customers(vec![customer_input(
            "Alice",
            "alice@example.com",
            Some("nope"),
        )])
        .await
        .unwrap();

    assert!(outcome.customers.is_empty());
    assert_eq!(
        outcome.errors,
        vec![
            "[1] Email already exists: alice@example.com".to_string(),
            "[1] Invalid phone format: nope".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_bulk_create_rolls_back_only_the_failing_item() {
    let service = sqlite_service().await;
    let long_name = "x".repeat(151);

    let outcome = service
        .bulk_create_customers(vec![
            customer_input("A", "a@example.com", None),
            customer_input(&long_name, "long@example.com", None),
            customer_input("C", "c@example.com", None),
        ])
        .await
        .unwrap();

    let names: Vec<&str> = outcome.customers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["A", "C"]);
    assert_eq!(outcome.errors.len(), 1);
    assert!(
        outcome.errors[0].starts_with("[2] Failed to create customer: "),
        "errors: {:?}",
        outcome.errors
    );
    assert_eq!(
        service
            .count_customers(&CustomerFilter::default())
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_bulk_phone_error_echoes_submitted_value() {
    let service = sqlite_service().await;

    let outcome = service
        .bulk_create_customers(vec![customer_input(
            "Bob",
            "bob@example.com",
            Some(" 12345 "),
        )])
        .await
        .unwrap();

    assert!(outcome.customers.is_empty());
    assert_eq!(
        outcome.errors,
        vec!["[1] Invalid phone format:  12345 ".to_string()]
    );
}

#[tokio::test]
async fn test_bulk_create_empty_input() {
    let service = sqlite_service().await;

    let outcome = service.bulk_create_customers(Vec::new()).await.unwrap();

    assert!(outcome.customers.is_empty());
    assert!(outcome.errors.is_empty());
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_create_product_quantizes_price_and_defaults_stock() {
    let service = sqlite_service().await;

    let outcome = service
        .create_product(ProductInput {
            name: " Keyboard ".to_string(),
            price: money("49.995"),
            stock: None,
        })
        .await
        .unwrap();

    assert!(outcome.errors.is_empty());
    let product = outcome.product.unwrap();
    assert_eq!(product.name, "Keyboard");
    assert_eq!(product.price.to_string(), "50.00");
    assert_eq!(product.stock, 0);
}

#[tokio::test]
async fn test_create_product_rejects_bad_price_and_stock() {
    let service = sqlite_service().await;

    let outcome = service
        .create_product(ProductInput {
            name: "Broken".to_string(),
            price: money("0.004"),
            stock: Some(-1),
        })
        .await
        .unwrap();

    assert!(outcome.product.is_none());
    assert_eq!(
        outcome.errors,
        vec![
            "Price must be positive".to_string(),
            "Stock cannot be negative".to_string(),
        ]
    );

    let outcome = service
        .create_product(ProductInput {
            name: "Yacht".to_string(),
            price: money("100000000"),
            stock: Some(1),
        })
        .await
        .unwrap();
    assert_eq!(outcome.errors, vec![messages::PRICE_TOO_LARGE.to_string()]);

    assert_eq!(
        service
            .count_products(&ProductFilter::default())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_restock_low_stock_products() {
    let service = sqlite_service().await;
    let low = create_product(&service, "Low", "1.00", 3).await;
    let edge = create_product(&service, "Edge", "1.00", 9).await;
    create_product(&service, "Exact", "1.00", 10).await;
    create_product(&service, "Plenty", "1.00", 50).await;

    let outcome = service.update_low_stock_products().await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.message, "Low stock products restocked successfully.");
    let updated: Vec<(i64, i32)> = outcome.products.iter().map(|p| (p.id, p.stock)).collect();
    assert_eq!(updated, vec![(low.id, 13), (edge.id, 19)]);

    let again = service.update_low_stock_products().await.unwrap();
    assert!(again.success);
    assert!(again.products.is_empty());
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_create_order_totals_distinct_products() {
    let service = sqlite_service().await;
    let customer = create_customer(&service, "Alice", "alice@example.com").await;
    let laptop = create_product(&service, "Laptop", "999.99", 10).await;
    let mouse = create_product(&service, "Mouse", "19.99", 100).await;

    let outcome = service
        .create_order(OrderInput {
            customer_id: customer.id.to_string(),
            product_ids: vec![
                laptop.id.to_string(),
                mouse.id.to_string(),
                laptop.id.to_string(),
            ],
            order_date: None,
        })
        .await
        .unwrap();

    assert!(outcome.errors.is_empty(), "errors: {:?}", outcome.errors);
    let order = outcome.order.unwrap();
    assert_eq!(order.customer_id, customer.id);
    assert_eq!(order.total_amount.to_string(), "1019.98");

    let products = service.order_products(order.id).await.unwrap();
    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Laptop", "Mouse"]);

    assert_eq!(service.order_customer(&order).await.unwrap(), customer);
    assert_eq!(service.customer_orders(customer.id).await.unwrap(), vec![order]);
}

#[tokio::test]
async fn test_create_order_keeps_given_date() {
    let service = sqlite_service().await;
    let customer = create_customer(&service, "Alice", "alice@example.com").await;
    let mouse = create_product(&service, "Mouse", "19.99", 100).await;
    let date = Utc.with_ymd_and_hms(2024, 12, 24, 18, 30, 0).unwrap();

    let order = service
        .create_order(OrderInput {
            customer_id: customer.id.to_string(),
            product_ids: vec![mouse.id.to_string()],
            order_date: Some(date),
        })
        .await
        .unwrap()
        .order
        .unwrap();

    assert_eq!(order.order_date, date);
    assert_eq!(service.order(order.id).await.unwrap(), Some(order));
}

#[tokio::test]
async fn test_create_order_reports_invalid_references_in_input_order() {
    let service = sqlite_service().await;
    let mouse = create_product(&service, "Mouse", "19.99", 100).await;

    let outcome = service
        .create_order(OrderInput {
            customer_id: "999".to_string(),
            product_ids: vec!["abc".to_string(), mouse.id.to_string(), "12345".to_string()],
            order_date: None,
        })
        .await
        .unwrap();

    assert!(outcome.order.is_none());
    assert_eq!(
        outcome.errors,
        vec![
            "Invalid customer ID".to_string(),
            "Invalid product ID(s): abc, 12345".to_string(),
        ]
    );
    assert_eq!(service.count_orders(&OrderFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_order_requires_products() {
    let service = sqlite_service().await;
    let customer = create_customer(&service, "Alice", "alice@example.com").await;

    let outcome = service
        .create_order(OrderInput {
            customer_id: customer.id.to_string(),
            product_ids: Vec::new(),
            order_date: None,
        })
        .await
        .unwrap();

    assert!(outcome.order.is_none());
    assert_eq!(
        outcome.errors,
        vec!["At least one product must be selected".to_string()]
    );
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_customer_filters_ordering_and_pages() {
    let service = sqlite_service().await;
    for (name, email, phone) in [
        ("Alice", "alice@example.com", Some("+1234567890")),
        ("Malika", "malika@corp.test", Some("555-123-4567")),
        ("Bob", "bob@example.com", None),
    ] {
        service
            .create_customer(customer_input(name, email, phone))
            .await
            .unwrap();
    }

    let by_name = CustomerFilter {
        name_icontains: Some("ALI".to_string()),
        ..Default::default()
    };
    let order = OrderBy::<CustomerSortField>::parse_all(&["-name"]).unwrap();
    let found = service
        .customers(&by_name, &order, Page::default())
        .await
        .unwrap();
    let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Malika", "Alice"]);
    assert_eq!(service.count_customers(&by_name).await.unwrap(), 2);

    let by_phone = CustomerFilter {
        phone_pattern: Some("+1".to_string()),
        ..Default::default()
    };
    let found = service
        .customers(&by_phone, &[], Page::default())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Alice");

    let page = Page {
        first: Some(1),
        offset: 1,
    };
    let order = OrderBy::<CustomerSortField>::parse_all(&["email"]).unwrap();
    let found = service
        .customers(&CustomerFilter::default(), &order, page)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "bob@example.com");

    let only_offset = Page {
        first: None,
        offset: 2,
    };
    let found = service
        .customers(&CustomerFilter::default(), &order, only_offset)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "malika@corp.test");
}

#[tokio::test]
async fn test_product_filters() {
    let service = sqlite_service().await;
    create_product(&service, "Laptop", "999.99", 10).await;
    create_product(&service, "Mouse", "19.99", 100).await;
    create_product(&service, "Mouse Pad", "5.00", 2).await;

    let low = ProductFilter {
        low_stock: Some(true),
        ..Default::default()
    };
    let found = service.products(&low, &[], Page::default()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Mouse Pad");

    let range = ProductFilter {
        price_gte: Some(money("5.00")),
        price_lte: Some(money("19.99")),
        ..Default::default()
    };
    let order = OrderBy::<ProductSortField>::parse_all(&["-price"]).unwrap();
    let found = service
        .products(&range, &order, Page::default())
        .await
        .unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Mouse", "Mouse Pad"]);

    let named = ProductFilter {
        name_icontains: Some("mouse".to_string()),
        stock_gte: Some(50),
        ..Default::default()
    };
    assert_eq!(service.count_products(&named).await.unwrap(), 1);
}

#[tokio::test]
async fn test_order_filters_and_revenue() {
    let service = sqlite_service().await;
    let alice = create_customer(&service, "Alice", "alice@example.com").await;
    let bob = create_customer(&service, "Bob", "bob@example.com").await;
    let laptop = create_product(&service, "Laptop", "999.99", 10).await;
    let mouse = create_product(&service, "Mouse", "19.99", 100).await;

    let now = Utc::now();
    let old = now - Duration::days(30);

    for (customer, products, date) in [
        (&alice, vec![&laptop, &mouse], now),
        (&bob, vec![&mouse], old),
    ] {
        service
            .create_order(OrderInput {
                customer_id: customer.id.to_string(),
                product_ids: products.iter().map(|p| p.id.to_string()).collect(),
                order_date: Some(date),
            })
            .await
            .unwrap()
            .order
            .unwrap();
    }

    let all = OrderFilter::default();
    assert_eq!(service.count_orders(&all).await.unwrap(), 2);
    assert_eq!(service.total_revenue(&all).await.unwrap().to_string(), "1039.97");

    let recent = OrderFilter {
        order_date_gte: Some(now - Duration::days(7)),
        ..Default::default()
    };
    let found = service.orders(&recent, &[], Page::default()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].customer_id, alice.id);

    let by_product = OrderFilter {
        product_name: Some("mou".to_string()),
        ..Default::default()
    };
    assert_eq!(service.count_orders(&by_product).await.unwrap(), 2);

    let by_laptop = OrderFilter {
        product_id: Some(laptop.id),
        ..Default::default()
    };
    assert_eq!(service.count_orders(&by_laptop).await.unwrap(), 1);

    let by_customer = OrderFilter {
        customer_name: Some("BO".to_string()),
        ..Default::default()
    };
    assert_eq!(
        service.total_revenue(&by_customer).await.unwrap().to_string(),
        "19.99"
    );

    let expensive = OrderFilter {
        total_amount_gte: Some(money("100")),
        ..Default::default()
    };
    assert_eq!(service.count_orders(&expensive).await.unwrap(), 1);

    let order = OrderBy::<OrderSortField>::parse_all(&["orderDate"]).unwrap();
    let found = service.orders(&all, &order, Page::default()).await.unwrap();
    assert_eq!(found[0].customer_id, bob.id);
}

#[tokio::test]
async fn test_negative_offset_is_rejected() {
    let service = sqlite_service().await;

    let result = service
        .customers(
            &CustomerFilter::default(),
            &[],
            Page {
                first: None,
                offset: -5,
            },
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_revenue_is_zero() {
    let service = sqlite_service().await;
    assert_eq!(
        service
            .total_revenue(&OrderFilter::default())
            .await
            .unwrap()
            .to_string(),
        "0.00"
    );
}

#[tokio::test]
async fn test_money_filters_beyond_storage_range() {
    let service = sqlite_service().await;
    let customer = create_customer(&service, "Alice", "alice@example.com").await;
    let mouse = create_product(&service, "Mouse", "19.99", 100).await;
    service
        .create_order(OrderInput {
            customer_id: customer.id.to_string(),
            product_ids: vec![mouse.id.to_string()],
            order_date: None,
        })
        .await
        .unwrap();

    // 1e27 is far above i64::MAX cents.
    let huge = money("1000000000000000000000000000");

    let above = ProductFilter {
        price_gte: Some(huge),
        ..Default::default()
    };
    assert!(
        service
            .products(&above, &[], Page::default())
            .await
            .unwrap()
            .is_empty()
    );

    let below = ProductFilter {
        price_lte: Some(huge),
        price_gte: Some(-huge),
        ..Default::default()
    };
    assert_eq!(service.count_products(&below).await.unwrap(), 1);

    let orders = OrderFilter {
        total_amount_lte: Some(huge),
        ..Default::default()
    };
    assert_eq!(service.count_orders(&orders).await.unwrap(), 1);

    let none = OrderFilter {
        total_amount_gte: Some(huge),
        ..Default::default()
    };
    assert_eq!(service.count_orders(&none).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_order_rejects_total_above_column_limit() {
    let service = sqlite_service().await;
    let customer = create_customer(&service, "Alice", "alice@example.com").await;

    let mut product_ids = Vec::new();
    for i in 0..101 {
        let product = create_product(&service, &format!("Yacht {i}"), "99999999.99", 1).await;
        product_ids.push(product.id.to_string());
    }

    let outcome = service
        .create_order(OrderInput {
            customer_id: customer.id.to_string(),
            product_ids: product_ids.clone(),
            order_date: None,
        })
        .await
        .unwrap();

    assert!(outcome.order.is_none());
    assert_eq!(
        outcome.errors,
        vec![messages::ORDER_TOTAL_TOO_LARGE.to_string()]
    );
    assert_eq!(service.count_orders(&OrderFilter::default()).await.unwrap(), 0);

    // One hundred of them still fit.
    product_ids.pop();
    let outcome = service
        .create_order(OrderInput {
            customer_id: customer.id.to_string(),
            product_ids,
            order_date: None,
        })
        .await
        .unwrap();
    assert!(outcome.errors.is_empty(), "errors: {:?}", outcome.errors);
    assert_eq!(
        outcome.order.unwrap().total_amount.to_string(),
        "9999999999.00"
    );
}
