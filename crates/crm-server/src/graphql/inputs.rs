// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! GraphQL input objects and their conversion into core types.

use async_graphql::{ID, InputObject};
use chrono::{DateTime, Utc};
use crm_core::model::{CustomerFilter, OrderFilter, ProductFilter};
use crm_core::service::{CustomerInput, OrderInput, ProductInput, parse_id};

use super::scalars::Money;

/// Fields of a new customer.
#[derive(Debug, Clone, InputObject)]
#[graphql(name = "CreateCustomerInput")]
pub struct CreateCustomerInput {
    /// Customer name.
    pub name: String,
    /// Email, unique ignoring case.
    pub email: String,
    /// `+1234567890` or `123-456-7890`.
    pub phone: Option<String>,
}

impl From<CreateCustomerInput> for CustomerInput {
    fn from(input: CreateCustomerInput) -> Self {
        Self {
            name: input.name,
            email: input.email,
            phone: input.phone,
        }
    }
}

/// Fields of a new product.
#[derive(Debug, Clone, InputObject)]
#[graphql(name = "CreateProductInput")]
pub struct CreateProductInput {
    /// Product name.
    pub name: String,
    /// Unit price.
    pub price: Money,
    /// Initial stock, 0 when omitted.
    pub stock: Option<i32>,
}

impl From<CreateProductInput> for ProductInput {
    fn from(input: CreateProductInput) -> Self {
        Self {
            name: input.name,
            price: input.price.0,
            stock: input.stock,
        }
    }
}

/// Fields of a new order.
#[derive(Debug, Clone, InputObject)]
#[graphql(name = "CreateOrderInput")]
pub struct CreateOrderInput {
    /// Ordering customer.
    pub customer_id: ID,
    /// Ordered products.
    pub product_ids: Vec<ID>,
    /// Defaults to now.
    pub order_date: Option<DateTime<Utc>>,
}

impl From<CreateOrderInput> for OrderInput {
    fn from(input: CreateOrderInput) -> Self {
        Self {
            customer_id: input.customer_id.0,
            product_ids: input.product_ids.into_iter().map(|id| id.0).collect(),
            order_date: input.order_date,
        }
    }
}

/// Customer list filter.
#[derive(Debug, Clone, Default, InputObject)]
#[graphql(name = "CustomerFilter")]
pub struct CustomerFilterInput {
    /// Name contains, ignoring case.
    pub name_icontains: Option<String>,
    /// Email contains, ignoring case.
    pub email_icontains: Option<String>,
    /// Phone starts with.
    pub phone_pattern: Option<String>,
}

impl From<CustomerFilterInput> for CustomerFilter {
    fn from(input: CustomerFilterInput) -> Self {
        Self {
            name_icontains: input.name_icontains,
            email_icontains: input.email_icontains,
            phone_pattern: input.phone_pattern,
        }
    }
}

/// Product list filter.
#[derive(Debug, Clone, Default, InputObject)]
#[graphql(name = "ProductFilter")]
pub struct ProductFilterInput {
    /// Name contains, ignoring case.
    pub name_icontains: Option<String>,
    /// Minimum price.
    pub price_gte: Option<Money>,
    /// Maximum price.
    pub price_lte: Option<Money>,
    /// Minimum stock.
    pub stock_gte: Option<i32>,
    /// Maximum stock.
    pub stock_lte: Option<i32>,
    /// Stock below 10 when true, at least 10 when false.
    pub low_stock: Option<bool>,
}

impl From<ProductFilterInput> for ProductFilter {
    fn from(input: ProductFilterInput) -> Self {
        Self {
            name_icontains: input.name_icontains,
            price_gte: input.price_gte.map(|m| m.0),
            price_lte: input.price_lte.map(|m| m.0),
            stock_gte: input.stock_gte,
            stock_lte: input.stock_lte,
            low_stock: input.low_stock,
        }
    }
}

/// Order list filter.
#[derive(Debug, Clone, Default, InputObject)]
#[graphql(name = "OrderFilter")]
pub struct OrderFilterInput {
    /// Orders of this customer.
    pub customer_id: Option<ID>,
    /// Customer name contains, ignoring case.
    pub customer_name: Option<String>,
    /// Some product name contains, ignoring case.
    pub product_name: Option<String>,
    /// Orders containing this product.
    pub product_id: Option<ID>,
    /// Minimum total.
    pub total_amount_gte: Option<Money>,
    /// Maximum total.
    pub total_amount_lte: Option<Money>,
    /// Placed at or after.
    pub order_date_gte: Option<DateTime<Utc>>,
    /// Placed at or before.
    pub order_date_lte: Option<DateTime<Utc>>,
}

impl TryFrom<OrderFilterInput> for OrderFilter {
    type Error = async_graphql::Error;

    fn try_from(input: OrderFilterInput) -> Result<Self, Self::Error> {
        let customer_id = input
            .customer_id
            .map(|id| parse_id(&id).ok_or_else(|| invalid_id("customerId", &id)))
            .transpose()?;
        let product_id = input
            .product_id
            .map(|id| parse_id(&id).ok_or_else(|| invalid_id("productId", &id)))
            .transpose()?;

        Ok(Self {
            customer_id,
            customer_name: input.customer_name,
            product_name: input.product_name,
            product_id,
            total_amount_gte: input.total_amount_gte.map(|m| m.0),
            total_amount_lte: input.total_amount_lte.map(|m| m.0),
            order_date_gte: input.order_date_gte,
            order_date_lte: input.order_date_lte,
        })
    }
}

fn invalid_id(field: &str, id: &ID) -> async_graphql::Error {
    async_graphql::Error::new(format!("Invalid {}: {}", field, id.as_str()))
}
