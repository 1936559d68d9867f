// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! GraphQL output objects.
//!
//! Nodes wrap the core records; relations and connection fields are resolved
//! lazily through the [`CrmService`] stored in the schema data.

use async_graphql::{Context, ID, Object, Result, SimpleObject};
use chrono::{DateTime, Utc};
use crm_core::CrmService;
use crm_core::model::{
    Customer, CustomerFilter, CustomerSortField, Order, OrderBy, OrderFilter, OrderSortField,
    Page, Product, ProductFilter, ProductSortField,
};

use super::scalars::Money;

/// Customer node.
pub struct CustomerNode(pub Customer);

#[Object(name = "Customer")]
impl CustomerNode {
    async fn id(&self) -> ID {
        ID::from(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn phone(&self) -> Option<&str> {
        self.0.phone.as_deref()
    }

    /// Orders placed by this customer, oldest first.
    async fn orders(&self, ctx: &Context<'_>) -> Result<Vec<OrderNode>> {
        let service = ctx.data::<CrmService>()?;
        let orders = service.customer_orders(self.0.id).await?;
        Ok(orders.into_iter().map(OrderNode).collect())
    }
}

/// Product node.
pub struct ProductNode(pub Product);

#[Object(name = "Product")]
impl ProductNode {
    async fn id(&self) -> ID {
        ID::from(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn price(&self) -> Money {
        Money(self.0.price)
    }

    async fn stock(&self) -> i32 {
        self.0.stock
    }
}

/// Order node.
pub struct OrderNode(pub Order);

#[Object(name = "Order")]
impl OrderNode {
    async fn id(&self) -> ID {
        ID::from(self.0.id.to_string())
    }

    async fn customer(&self, ctx: &Context<'_>) -> Result<CustomerNode> {
        let service = ctx.data::<CrmService>()?;
        Ok(CustomerNode(service.order_customer(&self.0).await?))
    }

    async fn products(&self, ctx: &Context<'_>) -> Result<Vec<ProductNode>> {
        let service = ctx.data::<CrmService>()?;
        let products = service.order_products(self.0.id).await?;
        Ok(products.into_iter().map(ProductNode).collect())
    }

    async fn total_amount(&self) -> Money {
        Money(self.0.total_amount)
    }

    async fn order_date(&self) -> DateTime<Utc> {
        self.0.order_date
    }
}

// ============================================================================
// Connections
// ============================================================================

/// A filtered, ordered page of customers.
pub struct CustomerConnection {
    pub(crate) filter: CustomerFilter,
    pub(crate) order: Vec<OrderBy<CustomerSortField>>,
    pub(crate) page: Page,
}

#[Object]
impl CustomerConnection {
    /// Customers matching the filter, ignoring pagination.
    async fn total_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let service = ctx.data::<CrmService>()?;
        Ok(service.count_customers(&self.filter).await?)
    }

    async fn nodes(&self, ctx: &Context<'_>) -> Result<Vec<CustomerNode>> {
        let service = ctx.data::<CrmService>()?;
        let customers = service
            .customers(&self.filter, &self.order, self.page)
            .await?;
        Ok(customers.into_iter().map(CustomerNode).collect())
    }
}

/// A filtered, ordered page of products.
pub struct ProductConnection {
    pub(crate) filter: ProductFilter,
    pub(crate) order: Vec<OrderBy<ProductSortField>>,
    pub(crate) page: Page,
}

#[Object]
impl ProductConnection {
    /// Products matching the filter, ignoring pagination.
    async fn total_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let service = ctx.data::<CrmService>()?;
        Ok(service.count_products(&self.filter).await?)
    }

    async fn nodes(&self, ctx: &Context<'_>) -> Result<Vec<ProductNode>> {
        let service = ctx.data::<CrmService>()?;
        let products = service
            .products(&self.filter, &self.order, self.page)
            .await?;
        Ok(products.into_iter().map(ProductNode).collect())
    }
}

/// A filtered, ordered page of orders.
pub struct OrderConnection {
    pub(crate) filter: OrderFilter,
    pub(crate) order: Vec<OrderBy<OrderSortField>>,
    pub(crate) page: Page,
}

#[Object]
impl OrderConnection {
    /// Orders matching the filter, ignoring pagination.
    async fn total_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let service = ctx.data::<CrmService>()?;
        Ok(service.count_orders(&self.filter).await?)
    }

    /// Sum of `totalAmount` over every matching order.
    async fn total_revenue(&self, ctx: &Context<'_>) -> Result<Money> {
        let service = ctx.data::<CrmService>()?;
        Ok(Money(service.total_revenue(&self.filter).await?))
    }

    async fn nodes(&self, ctx: &Context<'_>) -> Result<Vec<OrderNode>> {
        let service = ctx.data::<CrmService>()?;
        let orders = service.orders(&self.filter, &self.order, self.page).await?;
        Ok(orders.into_iter().map(OrderNode).collect())
    }
}

// ============================================================================
// Mutation payloads
// ============================================================================

/// Result of `createCustomer`.
#[derive(SimpleObject)]
pub struct CreateCustomerPayload {
    /// Created customer, null on validation errors.
    pub customer: Option<CustomerNode>,
    /// Success message.
    pub message: Option<String>,
    /// Validation errors.
    pub errors: Vec<String>,
}

/// Result of `bulkCreateCustomers`.
#[derive(SimpleObject)]
pub struct BulkCreateCustomersPayload {
    /// Customers that were created.
    pub customers: Vec<CustomerNode>,
    /// Per-item errors such as `[2] Invalid phone format: 12345`.
    pub errors: Vec<String>,
}

/// Result of `createProduct`.
#[derive(SimpleObject)]
pub struct CreateProductPayload {
    /// Created product, null on validation errors.
    pub product: Option<ProductNode>,
    /// Validation errors.
    pub errors: Vec<String>,
}

/// Result of `createOrder`.
#[derive(SimpleObject)]
pub struct CreateOrderPayload {
    /// Created order, null on validation errors.
    pub order: Option<OrderNode>,
    /// Validation errors.
    pub errors: Vec<String>,
}

/// Result of `updateLowStockProducts`.
#[derive(SimpleObject)]
pub struct UpdateLowStockProductsPayload {
    /// Whether the update ran.
    pub success: bool,
    /// Status message.
    pub message: String,
    /// Restocked products.
    pub products: Vec<ProductNode>,
}
