// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Query and mutation service for the CRM API.
//!
//! Mutations validate their input first and return an outcome carrying
//! user-facing errors. Nothing is written when validation fails. Only
//! infrastructure failures surface as [`CrmError`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{CrmError, Result};
use crate::model::{
    Customer, CustomerFilter, CustomerSortField, NewCustomer, NewOrder, NewProduct, Order,
    OrderBy, OrderFilter, OrderSortField, Page, Product, ProductFilter, ProductSortField,
};
use crate::persistence::Persistence;
use crate::validation::{
    LOW_STOCK_THRESHOLD, MAX_ORDER_TOTAL, MAX_PRICE, RESTOCK_AMOUNT, invalid_product_ids, messages,
    normalize_optional, quantize_money, validate_phone,
};

// ============================================================================
// Inputs and outcomes
// ============================================================================

/// Customer fields as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInput {
    /// Name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Phone, optional.
    pub phone: Option<String>,
}

impl CustomerInput {
    fn normalize(&self) -> NewCustomer {
        NewCustomer {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: normalize_optional(self.phone.as_deref()),
        }
    }
}

/// Product fields as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    /// Name.
    pub name: String,
    /// Price, quantized to cents before validation.
    pub price: Decimal,
    /// Initial stock, 0 when absent.
    pub stock: Option<i32>,
}

/// Order fields as submitted by a client. Ids are raw GraphQL `ID` values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInput {
    /// Customer id.
    pub customer_id: String,
    /// Product ids.
    pub product_ids: Vec<String>,
    /// Order timestamp, now when absent.
    pub order_date: Option<DateTime<Utc>>,
}

/// Result of [`CrmService::create_customer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateCustomerOutcome {
    /// Created customer.
    pub customer: Option<Customer>,
    /// Success message.
    pub message: Option<String>,
    /// Validation errors.
    pub errors: Vec<String>,
}

/// Result of [`CrmService::bulk_create_customers`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkCreateOutcome {
    /// Customers that were created, in input order.
    pub customers: Vec<Customer>,
    /// Per-item errors prefixed with the 1-based item index.
    pub errors: Vec<String>,
}

/// Result of [`CrmService::create_product`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateProductOutcome {
    /// Created product.
    pub product: Option<Product>,
    /// Validation errors.
    pub errors: Vec<String>,
}

/// Result of [`CrmService::create_order`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateOrderOutcome {
    /// Created order.
    pub order: Option<Order>,
    /// Validation errors.
    pub errors: Vec<String>,
}

/// Result of [`CrmService::update_low_stock_products`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestockOutcome {
    /// Always true once the update committed.
    pub success: bool,
    /// Status message.
    pub message: String,
    /// Restocked products with their new stock.
    pub products: Vec<Product>,
}

// ============================================================================
// Service
// ============================================================================

/// The CRM service. Cheap to clone.
#[derive(Clone)]
pub struct CrmService {
    persistence: Arc<dyn Persistence>,
}

impl CrmService {
    /// Create a service on top of a persistence backend.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    /// The backend this service writes to.
    pub fn persistence(&self) -> &Arc<dyn Persistence> {
        &self.persistence
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create one customer.
    #[instrument(skip(self, input), fields(email = %input.email.trim()))]
    pub async fn create_customer(&self, input: CustomerInput) -> Result<CreateCustomerOutcome> {
        let customer = input.normalize();
        let mut errors = Vec::new();

        // 1. Email must be unique ignoring case
        if self
            .persistence
            .customer_email_exists(&customer.email)
            .await?
        {
            errors.push(messages::EMAIL_EXISTS.to_string());
        }

        // 2. Phone format
        if !validate_phone(customer.phone.as_deref()) {
            errors.push(messages::INVALID_PHONE.to_string());
        }

        if !errors.is_empty() {
            debug!(?errors, "Customer rejected");
            return Ok(CreateCustomerOutcome {
                errors,
                ..Default::default()
            });
        }

        // 3. Insert. A concurrent insert of the same email loses the race here.
        match self.persistence.insert_customer(&customer).await {
            Ok(created) => {
                info!(customer_id = created.id, "Customer created");
                Ok(CreateCustomerOutcome {
                    customer: Some(created),
                    message: Some(messages::CUSTOMER_CREATED.to_string()),
                    errors: Vec::new(),
                })
            }
            Err(e) if e.is_conflict() => Ok(CreateCustomerOutcome {
                errors: vec![messages::EMAIL_EXISTS.to_string()],
                ..Default::default()
            }),
            Err(e) => Err(e),
        }
    }

    /// Create many customers with partial success.
    ///
    /// Invalid items are reported and skipped; the valid ones are inserted in
    /// one transaction with a savepoint per item.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn bulk_create_customers(
        &self,
        inputs: Vec<CustomerInput>,
    ) -> Result<BulkCreateOutcome> {
        let mut errors: Vec<(usize, String)> = Vec::new();
        let mut accepted: Vec<(usize, NewCustomer)> = Vec::new();
        let mut batch_emails: HashSet<String> = HashSet::new();

        // 1. Validate every item, numbering from 1
        for (idx, input) in inputs.iter().enumerate().map(|(i, c)| (i + 1, c)) {
            let customer = input.normalize();
            let mut item_valid = true;

            let email_key = customer.email.to_lowercase();
            if batch_emails.contains(&email_key)
                || self
                    .persistence
                    .customer_email_exists(&customer.email)
                    .await?
            {
                errors.push((
                    idx,
                    format!("[{}] Email already exists: {}", idx, customer.email),
                ));
                item_valid = false;
            }

            if !validate_phone(customer.phone.as_deref()) {
                errors.push((
                    idx,
                    format!(
                        "[{}] Invalid phone format: {}",
                        idx,
                        input.phone.as_deref().unwrap_or_default()
                    ),
                ));
                item_valid = false;
            }

            if item_valid {
                batch_emails.insert(email_key);
                accepted.push((idx, customer));
            }
        }

        // 2. Insert the valid ones
        let rows: Vec<NewCustomer> = accepted.iter().map(|(_, c)| c.clone()).collect();
        let results = if rows.is_empty() {
            Vec::new()
        } else {
            self.persistence.insert_customers_partial(&rows).await?
        };

        let mut customers = Vec::with_capacity(results.len());
        for ((idx, _), result) in accepted.iter().zip(results) {
            match result {
                Ok(customer) => customers.push(customer),
                Err(reason) => errors.push((
                    *idx,
                    format!("[{}] Failed to create customer: {}", idx, reason),
                )),
            }
        }

        // 3. Report errors in item order
        errors.sort_by_key(|(idx, _)| *idx);

        info!(
            requested = inputs.len(),
            created = customers.len(),
            failed = errors.len(),
            "Bulk customer creation finished"
        );

        Ok(BulkCreateOutcome {
            customers,
            errors: errors.into_iter().map(|(_, e)| e).collect(),
        })
    }

    /// Create one product.
    #[instrument(skip(self, input), fields(name = %input.name.trim()))]
    pub async fn create_product(&self, input: ProductInput) -> Result<CreateProductOutcome> {
        let mut errors = Vec::new();

        // 1. Price
        let price = quantize_money(input.price);
        if price <= Decimal::ZERO {
            errors.push(messages::PRICE_NOT_POSITIVE.to_string());
        } else if price > MAX_PRICE {
            errors.push(messages::PRICE_TOO_LARGE.to_string());
        }

        // 2. Stock
        let stock = input.stock.unwrap_or(0);
        if stock < 0 {
            errors.push(messages::NEGATIVE_STOCK.to_string());
        }

        if !errors.is_empty() {
            debug!(?errors, "Product rejected");
            return Ok(CreateProductOutcome {
                product: None,
                errors,
            });
        }

        let product = self
            .persistence
            .insert_product(&NewProduct {
                name: input.name.trim().to_string(),
                price,
                stock,
            })
            .await?;

        info!(product_id = product.id, "Product created");

        Ok(CreateProductOutcome {
            product: Some(product),
            errors: Vec::new(),
        })
    }

    /// Create an order for existing products.
    ///
    /// The total is the sum of the distinct referenced products' current
    /// prices.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(&self, input: OrderInput) -> Result<CreateOrderOutcome> {
        let mut errors = Vec::new();

        // 1. Customer
        let customer = match parse_id(&input.customer_id) {
            Some(id) => self.persistence.get_customer(id).await?,
            None => None,
        };
        if customer.is_none() {
            errors.push(messages::INVALID_CUSTOMER.to_string());
        }

        // 2. Products
        let mut product_ids: Vec<i64> = Vec::new();
        if input.product_ids.is_empty() {
            errors.push(messages::NO_PRODUCTS.to_string());
        } else {
            let mut requested: Vec<i64> =
                input.product_ids.iter().filter_map(|id| parse_id(id)).collect();
            requested.sort_unstable();
            requested.dedup();

            let products = self.persistence.get_products_by_ids(&requested).await?;
            let found: HashSet<i64> = products.iter().map(|p| p.id).collect();

            let missing: Vec<String> = input
                .product_ids
                .iter()
                .filter(|raw| !parse_id(raw).is_some_and(|id| found.contains(&id)))
                .cloned()
                .collect();

            if !missing.is_empty() {
                errors.push(invalid_product_ids(&missing));
            } else {
                let total = products
                    .iter()
                    .try_fold(Decimal::ZERO, |sum, p| sum.checked_add(p.price));
                if total.is_none_or(|total| total > MAX_ORDER_TOTAL) {
                    errors.push(messages::ORDER_TOTAL_TOO_LARGE.to_string());
                }
            }

            product_ids = requested;
        }

        let customer = match customer {
            Some(customer) if errors.is_empty() => customer,
            _ => {
                debug!(?errors, "Order rejected");
                return Ok(CreateOrderOutcome {
                    order: None,
                    errors,
                });
            }
        };

        // 3. Insert order, links and total atomically
        let order = self
            .persistence
            .insert_order(&NewOrder {
                customer_id: customer.id,
                product_ids,
                order_date: input.order_date.unwrap_or_else(Utc::now),
            })
            .await?;

        info!(
            order_id = order.id,
            total_amount = %order.total_amount,
            "Order created"
        );

        Ok(CreateOrderOutcome {
            order: Some(order),
            errors: Vec::new(),
        })
    }

    /// Add [`RESTOCK_AMOUNT`] to every product with stock below
    /// [`LOW_STOCK_THRESHOLD`].
    #[instrument(skip(self))]
    pub async fn update_low_stock_products(&self) -> Result<RestockOutcome> {
        let products = self
            .persistence
            .restock_products_below(LOW_STOCK_THRESHOLD, RESTOCK_AMOUNT)
            .await?;

        if products.is_empty() {
            debug!("No low-stock products");
        } else {
            info!(restocked = products.len(), "Low-stock products restocked");
        }

        Ok(RestockOutcome {
            success: true,
            message: messages::RESTOCKED.to_string(),
            products,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Customer by id.
    pub async fn customer(&self, id: i64) -> Result<Option<Customer>> {
        self.persistence.get_customer(id).await
    }

    /// Product by id.
    pub async fn product(&self, id: i64) -> Result<Option<Product>> {
        self.persistence.get_product(id).await
    }

    /// Order by id.
    pub async fn order(&self, id: i64) -> Result<Option<Order>> {
        self.persistence.get_order(id).await
    }

    /// Filtered, ordered page of customers.
    pub async fn customers(
        &self,
        filter: &CustomerFilter,
        order: &[OrderBy<CustomerSortField>],
        page: Page,
    ) -> Result<Vec<Customer>> {
        check_page(page)?;
        self.persistence.list_customers(filter, order, page).await
    }

    /// Filtered, ordered page of products.
    pub async fn products(
        &self,
        filter: &ProductFilter,
        order: &[OrderBy<ProductSortField>],
        page: Page,
    ) -> Result<Vec<Product>> {
        check_page(page)?;
        self.persistence.list_products(filter, order, page).await
    }

    /// Filtered, ordered page of orders.
    pub async fn orders(
        &self,
        filter: &OrderFilter,
        order: &[OrderBy<OrderSortField>],
        page: Page,
    ) -> Result<Vec<Order>> {
        check_page(page)?;
        self.persistence.list_orders(filter, order, page).await
    }

    /// Number of customers matching a filter.
    pub async fn count_customers(&self, filter: &CustomerFilter) -> Result<i64> {
        self.persistence.count_customers(filter).await
    }

    /// Number of products matching a filter.
    pub async fn count_products(&self, filter: &ProductFilter) -> Result<i64> {
        self.persistence.count_products(filter).await
    }

    /// Number of orders matching a filter.
    pub async fn count_orders(&self, filter: &OrderFilter) -> Result<i64> {
        self.persistence.count_orders(filter).await
    }

    /// Sum of order totals matching a filter, with two decimal places.
    pub async fn total_revenue(&self, filter: &OrderFilter) -> Result<Decimal> {
        let total = self.persistence.sum_order_totals(filter).await?;
        Ok(quantize_money(total))
    }

    /// Products of an order.
    pub async fn order_products(&self, order_id: i64) -> Result<Vec<Product>> {
        self.persistence.order_products(order_id).await
    }

    /// Customer that placed an order.
    pub async fn order_customer(&self, order: &Order) -> Result<Customer> {
        self.persistence
            .get_customer(order.customer_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    order_id = order.id,
                    customer_id = order.customer_id,
                    "Order without customer"
                );
                CrmError::InvalidRequest(format!("Customer {} not found", order.customer_id))
            })
    }

    /// Orders placed by a customer, oldest first.
    pub async fn customer_orders(&self, customer_id: i64) -> Result<Vec<Order>> {
        self.persistence.customer_orders(customer_id).await
    }
}

/// Parse a GraphQL `ID` into a database id.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

fn check_page(page: Page) -> Result<()> {
    if page.offset < 0 {
        return Err(CrmError::InvalidRequest(
            "offset cannot be negative".to_string(),
        ));
    }
    if page.first.is_some_and(|first| first < 0) {
        return Err(CrmError::InvalidRequest(
            "first cannot be negative".to_string(),
        ));
    }
    Ok(())
}
