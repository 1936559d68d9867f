//! Persistence interfaces and backends for crm-core.
//!
//! This module defines the persistence abstraction and backend implementations.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresPersistence;
pub use self::sqlite::SqlitePersistence;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Database, QueryBuilder};
use tracing::info;

use crate::error::{CrmError, Result};
use crate::model::{
    Customer, CustomerFilter, CustomerSortField, NewCustomer, NewOrder, NewProduct, Order,
    OrderBy, OrderFilter, OrderSortField, Page, Product, ProductFilter, ProductSortField,
    SortField,
};

/// Storage interface used by [`crate::CrmService`].
///
/// Every method is one unit of work. Methods that touch several rows run them
/// inside a single transaction.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Short backend name for logs (`postgres`, `sqlite`).
    fn backend(&self) -> &'static str;

    // ------------------------------------------------------------------
    // Customers
    // ------------------------------------------------------------------

    /// Whether a customer with this email exists, ignoring case.
    async fn customer_email_exists(&self, email: &str) -> Result<bool>;

    /// Insert one customer. A duplicate email yields [`CrmError::Conflict`].
    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer>;

    /// Insert customers inside one transaction with a savepoint per item.
    ///
    /// The outer result fails only when the transaction itself cannot be
    /// opened or committed. Each inner result is either the stored customer
    /// or the reason its insert was rolled back.
    async fn insert_customers_partial(
        &self,
        customers: &[NewCustomer],
    ) -> Result<Vec<std::result::Result<Customer, String>>>;

    /// Get a customer by id.
    async fn get_customer(&self, id: i64) -> Result<Option<Customer>>;

    /// Find a customer by email, ignoring case.
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;

    /// List customers.
    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        order: &[OrderBy<CustomerSortField>],
        page: Page,
    ) -> Result<Vec<Customer>>;

    /// Count customers matching a filter.
    async fn count_customers(&self, filter: &CustomerFilter) -> Result<i64>;

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Insert one product.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product>;

    /// Get a product by id.
    async fn get_product(&self, id: i64) -> Result<Option<Product>>;

    /// Get the products whose ids appear in `ids`, ordered by id.
    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>>;

    /// Find the first product with exactly this name.
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>>;

    /// List products.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        order: &[OrderBy<ProductSortField>],
        page: Page,
    ) -> Result<Vec<Product>>;

    /// Count products matching a filter.
    async fn count_products(&self, filter: &ProductFilter) -> Result<i64>;

    /// Add `amount` to the stock of every product whose stock is below
    /// `threshold`. Returns the updated products ordered by id.
    async fn restock_products_below(&self, threshold: i32, amount: i32) -> Result<Vec<Product>>;

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Insert an order, link its products and store the total of their
    /// current prices, all in one transaction.
    async fn insert_order(&self, order: &NewOrder) -> Result<Order>;

    /// Get an order by id.
    async fn get_order(&self, id: i64) -> Result<Option<Order>>;

    /// List orders.
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        order: &[OrderBy<OrderSortField>],
        page: Page,
    ) -> Result<Vec<Order>>;

    /// Count orders matching a filter.
    async fn count_orders(&self, filter: &OrderFilter) -> Result<i64>;

    /// Sum of `total_amount` over orders matching a filter.
    async fn sum_order_totals(&self, filter: &OrderFilter) -> Result<Decimal>;

    /// Products linked to an order, ordered by id.
    async fn order_products(&self, order_id: i64) -> Result<Vec<Product>>;

    /// Orders placed by a customer, oldest first.
    async fn customer_orders(&self, customer_id: i64) -> Result<Vec<Order>>;
}

/// Connect to the database named by `database_url`, apply migrations and
/// return the matching backend.
///
/// Supported schemes: `postgres://`, `postgresql://`, `sqlite:`.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<Arc<dyn Persistence>> {
    let persistence: Arc<dyn Persistence> =
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            Arc::new(PostgresPersistence::connect(database_url, max_connections).await?)
        } else if database_url.starts_with("sqlite:") {
            Arc::new(SqlitePersistence::connect(database_url, max_connections).await?)
        } else {
            // Only the scheme: the rest of the URL may carry credentials.
            let scheme = database_url.split(':').next().unwrap_or_default();
            return Err(CrmError::UnsupportedDatabase(format!("{}:", scheme)));
        };

    info!(backend = persistence.backend(), "Database ready");
    Ok(persistence)
}

// ============================================================================
// Query building helpers shared by the backends
// ============================================================================

/// `LIKE` pattern matching `term` anywhere, with wildcards escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// `LIKE` pattern matching values that start with `term`.
pub(crate) fn prefix_pattern(term: &str) -> String {
    format!("{}%", escape_like(term))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Emits ` WHERE ` before the first condition and ` AND ` before the rest.
#[derive(Default)]
pub(crate) struct Conditions {
    started: bool,
}

impl Conditions {
    pub(crate) fn next<DB: Database>(&mut self, qb: &mut QueryBuilder<'_, DB>) {
        qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}

/// Append `ORDER BY`, always ending with the primary key so pages are stable.
pub(crate) fn push_order_by<DB: Database, F: SortField>(
    qb: &mut QueryBuilder<'_, DB>,
    order: &[OrderBy<F>],
    primary_key: &str,
) {
    qb.push(" ORDER BY ");
    for term in order {
        qb.push(term.field.column())
            .push(" ")
            .push(term.direction.as_sql())
            .push(", ");
    }
    qb.push(primary_key).push(" ASC");
}

/// Reason reported for a rolled-back item insert.
pub(crate) fn write_failure_reason(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    }
}
