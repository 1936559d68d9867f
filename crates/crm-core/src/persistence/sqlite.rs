//! SQLite-backed persistence implementation.
//!
//! Money columns hold integer cents and timestamps hold RFC 3339 text with
//! microsecond precision, so both compare correctly as stored.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Connection, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::error::{CrmError, Result};
use crate::migrations;
use crate::model::{
    Customer, CustomerFilter, CustomerSortField, NewCustomer, NewOrder, NewProduct, Order,
    OrderBy, OrderFilter, OrderSortField, Page, Product, ProductFilter, ProductSortField,
};
use crate::validation::{LOW_STOCK_THRESHOLD, from_cents, to_cents};

use super::{
    Conditions, Persistence, contains_pattern, prefix_pattern, push_order_by,
    write_failure_reason,
};

const CUSTOMER_COLUMNS: &str = "c.id, c.name, c.email, c.phone";
const PRODUCT_COLUMNS: &str = "p.id, p.name, p.price, p.stock";
const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.total_amount, o.order_date";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: i64,
    stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: from_cents(row.price),
            stock: row.stock,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: i64,
    total_amount: i64,
    order_date: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = CrmError;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            customer_id: row.customer_id,
            total_amount: from_cents(row.total_amount),
            order_date: decode_timestamp(&row.order_date)?,
        })
    }
}

fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CrmError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn into_products(rows: Vec<ProductRow>) -> Vec<Product> {
    rows.into_iter().map(Product::from).collect()
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

/// SQLite-backed persistence provider.
#[derive(Clone)]
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    /// Create a new SQLite persistence provider from an existing pool.
    ///
    /// The caller is responsible for running [`migrations::run_sqlite`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a `sqlite:` URL, run migrations and return the provider.
    ///
    /// In-memory databases live only as long as their connection, so they
    /// get a single connection that is never recycled.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        migrations::run_sqlite(&pool).await?;

        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create and initialize a SQLite database file, creating parent
    /// directories when needed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let persistence = SqlitePersistence::from_path(".data/crm.db").await?;
    /// ```
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        Self::connect(&url, 5).await
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn push_customer_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CustomerFilter) {
    let mut conditions = Conditions::default();

    if let Some(name) = &filter.name_icontains {
        conditions.next(qb);
        qb.push("LOWER(c.name) LIKE LOWER(")
            .push_bind(contains_pattern(name))
            .push(") ESCAPE '\\'");
    }
    if let Some(email) = &filter.email_icontains {
        conditions.next(qb);
        qb.push("LOWER(c.email) LIKE LOWER(")
            .push_bind(contains_pattern(email))
            .push(") ESCAPE '\\'");
    }
    if let Some(phone) = &filter.phone_pattern {
        conditions.next(qb);
        qb.push("c.phone LIKE ")
            .push_bind(prefix_pattern(phone))
            .push(" ESCAPE '\\'");
    }
}

fn push_product_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    let mut conditions = Conditions::default();

    if let Some(name) = &filter.name_icontains {
        conditions.next(qb);
        qb.push("LOWER(p.name) LIKE LOWER(")
            .push_bind(contains_pattern(name))
            .push(") ESCAPE '\\'");
    }
    if let Some(price) = filter.price_gte {
        conditions.next(qb);
        qb.push("p.price >= ").push_bind(to_cents(price));
    }
    if let Some(price) = filter.price_lte {
        conditions.next(qb);
        qb.push("p.price <= ").push_bind(to_cents(price));
    }
    if let Some(stock) = filter.stock_gte {
        conditions.next(qb);
        qb.push("p.stock >= ").push_bind(stock);
    }
    if let Some(stock) = filter.stock_lte {
        conditions.next(qb);
        qb.push("p.stock <= ").push_bind(stock);
    }
    match filter.low_stock {
        Some(true) => {
            conditions.next(qb);
            qb.push("p.stock < ").push_bind(LOW_STOCK_THRESHOLD);
        }
        Some(false) => {
            conditions.next(qb);
            qb.push("p.stock >= ").push_bind(LOW_STOCK_THRESHOLD);
        }
        None => {}
    }
}

fn push_order_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    let mut conditions = Conditions::default();

    if let Some(customer_id) = filter.customer_id {
        conditions.next(qb);
        qb.push("o.customer_id = ").push_bind(customer_id);
    }
    if let Some(name) = &filter.customer_name {
        conditions.next(qb);
        qb.push(
            "EXISTS (SELECT 1 FROM customers fc WHERE fc.id = o.customer_id \
             AND LOWER(fc.name) LIKE LOWER(",
        )
        .push_bind(contains_pattern(name))
        .push(") ESCAPE '\\')");
    }
    if let Some(name) = &filter.product_name {
        conditions.next(qb);
        qb.push(
            "EXISTS (SELECT 1 FROM order_products fop JOIN products fp ON fp.id = fop.product_id \
             WHERE fop.order_id = o.id AND LOWER(fp.name) LIKE LOWER(",
        )
        .push_bind(contains_pattern(name))
        .push(") ESCAPE '\\')");
    }
    if let Some(product_id) = filter.product_id {
        conditions.next(qb);
        qb.push(
            "EXISTS (SELECT 1 FROM order_products fop WHERE fop.order_id = o.id \
             AND fop.product_id = ",
        )
        .push_bind(product_id)
        .push(")");
    }
    if let Some(total) = filter.total_amount_gte {
        conditions.next(qb);
        qb.push("o.total_amount >= ").push_bind(to_cents(total));
    }
    if let Some(total) = filter.total_amount_lte {
        conditions.next(qb);
        qb.push("o.total_amount <= ").push_bind(to_cents(total));
    }
    if let Some(date) = &filter.order_date_gte {
        conditions.next(qb);
        qb.push("o.order_date >= ").push_bind(encode_timestamp(date));
    }
    if let Some(date) = &filter.order_date_lte {
        conditions.next(qb);
        qb.push("o.order_date <= ").push_bind(encode_timestamp(date));
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, page: Page) {
    match page.first {
        Some(first) => {
            qb.push(" LIMIT ").push_bind(first.max(0));
        }
        // SQLite only accepts OFFSET after a LIMIT.
        None if page.offset > 0 => {
            qb.push(" LIMIT -1");
        }
        None => {}
    }
    if page.offset > 0 {
        qb.push(" OFFSET ").push_bind(page.offset);
    }
}

#[async_trait::async_trait]
impl Persistence for SqlitePersistence {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn customer_email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM customers WHERE LOWER(email) = LOWER(?))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, email, phone)
            VALUES (?, ?, ?)
            RETURNING id, name, email, phone
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CrmError::from_write("customers", e))
    }

    async fn insert_customers_partial(
        &self,
        customers: &[NewCustomer],
    ) -> Result<Vec<std::result::Result<Customer, String>>> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(customers.len());

        for customer in customers {
            let mut savepoint = tx.begin().await?;

            let inserted = sqlx::query_as::<_, Customer>(
                r#"
                INSERT INTO customers (name, email, phone)
                VALUES (?, ?, ?)
                RETURNING id, name, email, phone
                "#,
            )
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .fetch_one(&mut *savepoint)
            .await;

            match inserted {
                Ok(row) => {
                    savepoint.commit().await?;
                    results.push(Ok(row));
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    warn!(email = %customer.email, error = %e, "Customer insert rolled back");
                    results.push(Err(write_failure_reason(&e)));
                }
            }
        }

        tx.commit().await?;

        debug!(
            requested = customers.len(),
            created = results.iter().filter(|r| r.is_ok()).count(),
            "Bulk customer insert committed"
        );

        Ok(results)
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, phone FROM customers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, phone FROM customers WHERE LOWER(email) = LOWER(?)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        order: &[OrderBy<CustomerSortField>],
        page: Page,
    ) -> Result<Vec<Customer>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM customers c",
            CUSTOMER_COLUMNS
        ));
        push_customer_filter(&mut qb, filter);
        push_order_by(&mut qb, order, "c.id");
        push_page(&mut qb, page);

        let customers = qb
            .build_query_as::<Customer>()
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    async fn count_customers(&self, filter: &CustomerFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM customers c");
        push_customer_filter(&mut qb, filter);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (name, price, stock)
            VALUES (?, ?, ?)
            RETURNING id, name, price, stock
            "#,
        )
        .bind(&product.name)
        .bind(to_cents(product.price))
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CrmError::from_write("products", e))?;

        Ok(row.into())
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, stock FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT id, name, price, stock FROM products WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(into_products(rows))
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, stock FROM products WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        order: &[OrderBy<ProductSortField>],
        page: Page,
    ) -> Result<Vec<Product>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM products p", PRODUCT_COLUMNS));
        push_product_filter(&mut qb, filter);
        push_order_by(&mut qb, order, "p.id");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(into_products(rows))
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products p");
        push_product_filter(&mut qb, filter);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn restock_products_below(&self, threshold: i32, amount: i32) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET stock = stock + ?2
            WHERE stock < ?1
            RETURNING id, name, price, stock
            "#,
        )
        .bind(threshold)
        .bind(amount)
        .fetch_all(&self.pool)
        .await?;

        let mut products = into_products(rows);
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (customer_id, total_amount, order_date)
            VALUES (?, 0, ?)
            RETURNING id
            "#,
        )
        .bind(order.customer_id)
        .bind(encode_timestamp(&order.order_date))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| CrmError::from_write("orders", e))?;

        for product_id in &order.product_ids {
            sqlx::query("INSERT OR IGNORE INTO order_products (order_id, product_id) VALUES (?, ?)")
                .bind(order_id)
                .bind(product_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| CrmError::from_write("order_products", e))?;
        }

        // Total from the prices as stored, inside the same transaction.
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders
            SET total_amount = (
                SELECT COALESCE(SUM(p.price), 0)
                FROM order_products op
                JOIN products p ON p.id = op.product_id
                WHERE op.order_id = orders.id
            )
            WHERE id = ?
            RETURNING id, customer_id, total_amount, order_date
            "#,
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let stored = Order::try_from(row)?;
        debug!(
            order_id = stored.id,
            customer_id = stored.customer_id,
            products = order.product_ids.len(),
            "Order stored"
        );

        Ok(stored)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, total_amount, order_date FROM orders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        order: &[OrderBy<OrderSortField>],
        page: Page,
    ) -> Result<Vec<Order>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM orders o", ORDER_COLUMNS));
        push_order_filter(&mut qb, filter);
        push_order_by(&mut qb, order, "o.id");
        push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;

        into_orders(rows)
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders o");
        push_order_filter(&mut qb, filter);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn sum_order_totals(&self, filter: &OrderFilter) -> Result<Decimal> {
        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT COALESCE(SUM(o.total_amount), 0) FROM orders o");
        push_order_filter(&mut qb, filter);

        let cents = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(from_cents(cents))
    }

    async fn order_products(&self, order_id: i64) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT p.id, p.name, p.price, p.stock
            FROM products p
            JOIN order_products op ON op.product_id = p.id
            WHERE op.order_id = ?
            ORDER BY p.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_products(rows))
    }

    async fn customer_orders(&self, customer_id: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, customer_id, total_amount, order_date
            FROM orders
            WHERE customer_id = ?
            ORDER BY order_date, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }
}
