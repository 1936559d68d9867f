// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain records for customers, products and orders.
//!
//! Records are plain data. Backends map their rows into these types so the
//! service and API layers never see driver-specific representations (money is
//! `NUMERIC` in PostgreSQL and integer cents in SQLite).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CrmError;

/// Customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    /// Database identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address, unique ignoring case.
    pub email: String,
    /// Optional phone number.
    pub phone: Option<String>,
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    /// Database identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unit price with two decimal places.
    pub price: Decimal,
    /// Units in stock, never negative.
    pub stock: i32,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.price)
    }
}

/// Order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    /// Database identifier.
    pub id: i64,
    /// Customer that placed the order.
    pub customer_id: i64,
    /// Sum of the linked products' prices at creation time.
    pub total_amount: Decimal,
    /// When the order was placed.
    pub order_date: DateTime<Utc>,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order #{}", self.id)
    }
}

/// Customer insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    /// Trimmed name.
    pub name: String,
    /// Trimmed email.
    pub email: String,
    /// Trimmed phone, `None` when blank.
    pub phone: Option<String>,
}

/// Product insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    /// Trimmed name.
    pub name: String,
    /// Quantized price.
    pub price: Decimal,
    /// Initial stock.
    pub stock: i32,
}

/// Order insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Existing customer.
    pub customer_id: i64,
    /// Existing, distinct products. The total is computed from their prices.
    pub product_ids: Vec<i64>,
    /// Order timestamp.
    pub order_date: DateTime<Utc>,
}

// ============================================================================
// Filters
// ============================================================================

/// Customer list filter. Set fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    /// Case-insensitive substring of the name.
    pub name_icontains: Option<String>,
    /// Case-insensitive substring of the email.
    pub email_icontains: Option<String>,
    /// Phone prefix, e.g. `+1`.
    pub phone_pattern: Option<String>,
}

/// Product list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name.
    pub name_icontains: Option<String>,
    /// Minimum price, inclusive.
    pub price_gte: Option<Decimal>,
    /// Maximum price, inclusive.
    pub price_lte: Option<Decimal>,
    /// Minimum stock, inclusive.
    pub stock_gte: Option<i32>,
    /// Maximum stock, inclusive.
    pub stock_lte: Option<i32>,
    /// Only products below the restock threshold.
    pub low_stock: Option<bool>,
}

/// Order list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Orders of one customer.
    pub customer_id: Option<i64>,
    /// Case-insensitive substring of the customer's name.
    pub customer_name: Option<String>,
    /// Orders containing a product whose name contains this (case-insensitive).
    pub product_name: Option<String>,
    /// Orders containing this product.
    pub product_id: Option<i64>,
    /// Minimum total, inclusive.
    pub total_amount_gte: Option<Decimal>,
    /// Maximum total, inclusive.
    pub total_amount_lte: Option<Decimal>,
    /// Placed at or after.
    pub order_date_gte: Option<DateTime<Utc>>,
    /// Placed at or before.
    pub order_date_lte: Option<DateTime<Utc>>,
}

// ============================================================================
// Ordering and paging
// ============================================================================

/// Offset pagination. `first: None` means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of rows.
    pub first: Option<i64>,
    /// Rows to skip.
    pub offset: i64,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// SQL keyword.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A column that list queries may sort on.
pub trait SortField: Copy + FromStr<Err = CrmError> {
    /// Qualified column name used in `ORDER BY`.
    fn column(self) -> &'static str;
}

/// One `ORDER BY` term, parsed from `"field"` or `"-field"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    /// Sorted column.
    pub field: F,
    /// Direction.
    pub direction: SortDirection,
}

impl<F: SortField> OrderBy<F> {
    /// Parse an ordering key: a leading `-` means descending.
    pub fn parse(key: &str) -> Result<Self, CrmError> {
        let key = key.trim();
        let (direction, name) = match key.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, key),
        };
        Ok(Self {
            field: name.parse()?,
            direction,
        })
    }

    /// Parse a list of ordering keys.
    pub fn parse_all<S: AsRef<str>>(keys: &[S]) -> Result<Vec<Self>, CrmError> {
        keys.iter().map(|k| Self::parse(k.as_ref())).collect()
    }
}

fn unknown_sort_key(entity: &str, key: &str) -> CrmError {
    CrmError::InvalidRequest(format!("Cannot order {} by '{}'", entity, key))
}

/// Customer sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSortField {
    /// Primary key.
    Id,
    /// Name.
    Name,
    /// Email.
    Email,
}

impl FromStr for CustomerSortField {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            other => Err(unknown_sort_key("customers", other)),
        }
    }
}

impl SortField for CustomerSortField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "c.id",
            Self::Name => "c.name",
            Self::Email => "c.email",
        }
    }
}

/// Product sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSortField {
    /// Primary key.
    Id,
    /// Name.
    Name,
    /// Price.
    Price,
    /// Stock.
    Stock,
}

impl FromStr for ProductSortField {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "stock" => Ok(Self::Stock),
            other => Err(unknown_sort_key("products", other)),
        }
    }
}

impl SortField for ProductSortField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "p.id",
            Self::Name => "p.name",
            Self::Price => "p.price",
            Self::Stock => "p.stock",
        }
    }
}

/// Order sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSortField {
    /// Primary key.
    Id,
    /// Total amount.
    TotalAmount,
    /// Order date.
    OrderDate,
}

impl FromStr for OrderSortField {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Both the column name and the GraphQL field name are accepted.
        match s {
            "id" => Ok(Self::Id),
            "total_amount" | "totalAmount" => Ok(Self::TotalAmount),
            "order_date" | "orderDate" => Ok(Self::OrderDate),
            other => Err(unknown_sort_key("orders", other)),
        }
    }
}

impl SortField for OrderSortField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "o.id",
            Self::TotalAmount => "o.total_amount",
            Self::OrderDate => "o.order_date",
        }
    }
}
