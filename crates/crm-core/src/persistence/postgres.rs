// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed persistence implementation.

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};

use crate::error::{CrmError, Result};
use crate::migrations;
use crate::model::{
    Customer, CustomerFilter, CustomerSortField, NewCustomer, NewOrder, NewProduct, Order,
    OrderBy, OrderFilter, OrderSortField, Page, Product, ProductFilter, ProductSortField,
};
use crate::validation::LOW_STOCK_THRESHOLD;

use super::{
    Conditions, Persistence, contains_pattern, prefix_pattern, push_order_by,
    write_failure_reason,
};

const CUSTOMER_COLUMNS: &str = "c.id, c.name, c.email, c.phone";
const PRODUCT_COLUMNS: &str = "p.id, p.name, p.price, p.stock";
const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.total_amount, o.order_date";

/// PostgreSQL-backed persistence provider.
#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Create a new PostgreSQL persistence provider from an existing pool.
    ///
    /// The caller is responsible for running [`migrations::run_postgres`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, run migrations and return the provider.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        migrations::run_postgres(&pool).await?;

        Ok(Self { pool })
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn push_customer_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
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

fn push_product_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    let mut conditions = Conditions::default();

    if let Some(name) = &filter.name_icontains {
        conditions.next(qb);
        qb.push("LOWER(p.name) LIKE LOWER(")
            .push_bind(contains_pattern(name))
            .push(") ESCAPE '\\'");
    }
    if let Some(price) = filter.price_gte {
        conditions.next(qb);
        qb.push("p.price >= ").push_bind(price);
    }
    if let Some(price) = filter.price_lte {
        conditions.next(qb);
        qb.push("p.price <= ").push_bind(price);
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

fn push_order_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
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
        qb.push("o.total_amount >= ").push_bind(total);
    }
    if let Some(total) = filter.total_amount_lte {
        conditions.next(qb);
        qb.push("o.total_amount <= ").push_bind(total);
    }
    if let Some(date) = filter.order_date_gte {
        conditions.next(qb);
        qb.push("o.order_date >= ").push_bind(date);
    }
    if let Some(date) = filter.order_date_lte {
        conditions.next(qb);
        qb.push("o.order_date <= ").push_bind(date);
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    if let Some(first) = page.first {
        qb.push(" LIMIT ").push_bind(first.max(0));
    }
    if page.offset > 0 {
        qb.push(" OFFSET ").push_bind(page.offset);
    }
}

#[async_trait::async_trait]
impl Persistence for PostgresPersistence {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn customer_email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM customers WHERE LOWER(email) = LOWER($1))",
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
            VALUES ($1, $2, $3)
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
            // A failed statement aborts the whole PostgreSQL transaction
            // unless it ran under its own savepoint.
            let mut savepoint = tx.begin().await?;

            let inserted = sqlx::query_as::<_, Customer>(
                r#"
                INSERT INTO customers (name, email, phone)
                VALUES ($1, $2, $3)
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
            "SELECT id, name, email, phone FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, phone FROM customers WHERE LOWER(email) = LOWER($1)",
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
        let mut qb = QueryBuilder::<Postgres>::new(format!(
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
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers c");
        push_customer_filter(&mut qb, filter);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, price, stock)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, stock
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CrmError::from_write("products", e))
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, stock FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn get_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, stock FROM products WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, stock FROM products WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        order: &[OrderBy<ProductSortField>],
        page: Page,
    ) -> Result<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM products p",
            PRODUCT_COLUMNS
        ));
        push_product_filter(&mut qb, filter);
        push_order_by(&mut qb, order, "p.id");
        push_page(&mut qb, page);

        let products = qb
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_product_filter(&mut qb, filter);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn restock_products_below(&self, threshold: i32, amount: i32) -> Result<Vec<Product>> {
        let mut products = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET stock = stock + $2
            WHERE stock < $1
            RETURNING id, name, price, stock
            "#,
        )
        .bind(threshold)
        .bind(amount)
        .fetch_all(&self.pool)
        .await?;

        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (customer_id, total_amount, order_date)
            VALUES ($1, 0, $2)
            RETURNING id
            "#,
        )
        .bind(order.customer_id)
        .bind(order.order_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| CrmError::from_write("orders", e))?;

        sqlx::query(
            r#"
            INSERT INTO order_products (order_id, product_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(order_id)
        .bind(&order.product_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| CrmError::from_write("order_products", e))?;

        // Total from the prices as stored, inside the same transaction.
        let stored = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders o
            SET total_amount = (
                SELECT COALESCE(SUM(p.price), 0)
                FROM order_products op
                JOIN products p ON p.id = op.product_id
                WHERE op.order_id = o.id
            )
            WHERE o.id = $1
            RETURNING o.id, o.customer_id, o.total_amount, o.order_date
            "#,
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            order_id = stored.id,
            customer_id = stored.customer_id,
            products = order.product_ids.len(),
            "Order stored"
        );

        Ok(stored)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, customer_id, total_amount, order_date FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        order: &[OrderBy<OrderSortField>],
        page: Page,
    ) -> Result<Vec<Order>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM orders o", ORDER_COLUMNS));
        push_order_filter(&mut qb, filter);
        push_order_by(&mut qb, order, "o.id");
        push_page(&mut qb, page);

        let orders = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;

        Ok(orders)
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        push_order_filter(&mut qb, filter);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn sum_order_totals(&self, filter: &OrderFilter) -> Result<Decimal> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COALESCE(SUM(o.total_amount), 0)::NUMERIC(14, 2) FROM orders o",
        );
        push_order_filter(&mut qb, filter);

        let total = qb
            .build_query_scalar::<Decimal>()
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    async fn order_products(&self, order_id: i64) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.name, p.price, p.stock
            FROM products p
            JOIN order_products op ON op.product_id = p.id
            WHERE op.order_id = $1
            ORDER BY p.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn customer_orders(&self, customer_id: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, total_amount, order_date
            FROM orders
            WHERE customer_id = $1
            ORDER BY order_date, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

