// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Demo data for local development.
//!
//! Seeding is get-or-create: rows that already exist are left alone, so
//! running it repeatedly is harmless.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::error::{CrmError, Result};
use crate::model::{NewCustomer, NewProduct};
use crate::service::CrmService;

/// What a seeding run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Customers inserted by this run.
    pub customers_created: usize,
    /// Products inserted by this run.
    pub products_created: usize,
}

impl SeedReport {
    /// Whether the run changed anything.
    pub fn is_empty(&self) -> bool {
        self.customers_created == 0 && self.products_created == 0
    }
}

fn demo_customers() -> Vec<NewCustomer> {
    vec![NewCustomer {
        name: "Demo User".to_string(),
        email: "demo@example.com".to_string(),
        phone: Some("+1234567890".to_string()),
    }]
}

fn demo_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Laptop".to_string(),
            price: Decimal::new(99999, 2),
            stock: 10,
        },
        NewProduct {
            name: "Mouse".to_string(),
            price: Decimal::new(1999, 2),
            stock: 100,
        },
    ]
}

/// Insert the demo customer and products unless they already exist.
pub async fn run(service: &CrmService) -> Result<SeedReport> {
    let persistence = service.persistence();
    let mut report = SeedReport::default();

    for customer in demo_customers() {
        if persistence
            .find_customer_by_email(&customer.email)
            .await?
            .is_some()
        {
            continue;
        }
        match persistence.insert_customer(&customer).await {
            Ok(_) => report.customers_created += 1,
            // Another seeder got there first.
            Err(CrmError::Conflict { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    for product in demo_products() {
        if persistence
            .find_product_by_name(&product.name)
            .await?
            .is_some()
        {
            continue;
        }
        persistence.insert_product(&product).await?;
        report.products_created += 1;
    }

    info!(
        customers_created = report.customers_created,
        products_created = report.products_created,
        "Seeded customers and products"
    );

    Ok(report)
}
