// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for crm-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use crm_core::CrmService;
use crm_core::model::{Customer, Product};
use crm_core::persistence::SqlitePersistence;
use crm_core::service::{CustomerInput, ProductInput};
use rust_decimal::Decimal;

/// Service backed by a fresh in-memory SQLite database.
pub async fn sqlite_service() -> CrmService {
    let persistence = SqlitePersistence::in_memory()
        .await
        .expect("Failed to create in-memory database");
    CrmService::new(Arc::new(persistence))
}

pub fn customer_input(name: &str, email: &str, phone: Option<&str>) -> CustomerInput {
    CustomerInput {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.map(str::to_string),
    }
}

/// Parse a money literal like `"19.99"`.
pub fn money(raw: &str) -> Decimal {
    raw.parse().expect("valid decimal literal")
}

pub async fn create_customer(service: &CrmService, name: &str, email: &str) -> Customer {
    service
        .create_customer(customer_input(name, email, None))
        .await
        .expect("Failed to create customer")
        .customer
        .expect("Customer should be created")
}

pub async fn create_product(service: &CrmService, name: &str, price: &str, stock: i32) -> Product {
    service
        .create_product(ProductInput {
            name: name.to_string(),
            price: money(price),
            stock: Some(stock),
        })
        .await
        .expect("Failed to create product")
        .product
        .expect("Product should be created")
}
