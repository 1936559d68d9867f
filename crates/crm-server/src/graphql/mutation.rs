// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mutation root.
//!
//! Validation problems come back in each payload's `errors` list. Only
//! infrastructure failures become GraphQL errors.

use async_graphql::{Context, Object, Result};
use crm_core::CrmService;

use super::inputs::{CreateCustomerInput, CreateOrderInput, CreateProductInput};
use super::types::{
    BulkCreateCustomersPayload, CreateCustomerPayload, CreateOrderPayload, CreateProductPayload,
    CustomerNode, OrderNode, ProductNode, UpdateLowStockProductsPayload,
};

/// Write entry points.
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create one customer.
    async fn create_customer(
        &self,
        ctx: &Context<'_>,
        input: CreateCustomerInput,
    ) -> Result<CreateCustomerPayload> {
        let service = ctx.data::<CrmService>()?;
        let outcome = service.create_customer(input.into()).await?;

        Ok(CreateCustomerPayload {
            customer: outcome.customer.map(CustomerNode),
            message: outcome.message,
            errors: outcome.errors,
        })
    }

    /// Create several customers; valid ones are saved even when others fail.
    async fn bulk_create_customers(
        &self,
        ctx: &Context<'_>,
        input: Vec<CreateCustomerInput>,
    ) -> Result<BulkCreateCustomersPayload> {
        let service = ctx.data::<CrmService>()?;
        let outcome = service
            .bulk_create_customers(input.into_iter().map(Into::into).collect())
            .await?;

        Ok(BulkCreateCustomersPayload {
            customers: outcome.customers.into_iter().map(CustomerNode).collect(),
            errors: outcome.errors,
        })
    }

    /// Create one product.
    async fn create_product(
        &self,
        ctx: &Context<'_>,
        input: CreateProductInput,
    ) -> Result<CreateProductPayload> {
        let service = ctx.data::<CrmService>()?;
        let outcome = service.create_product(input.into()).await?;

        Ok(CreateProductPayload {
            product: outcome.product.map(ProductNode),
            errors: outcome.errors,
        })
    }

    /// Create an order; its total is computed from the products' prices.
    async fn create_order(
        &self,
        ctx: &Context<'_>,
        input: CreateOrderInput,
    ) -> Result<CreateOrderPayload> {
        let service = ctx.data::<CrmService>()?;
        let outcome = service.create_order(input.into()).await?;

        Ok(CreateOrderPayload {
            order: outcome.order.map(OrderNode),
            errors: outcome.errors,
        })
    }

    /// Add 10 units to every product with fewer than 10 in stock.
    async fn update_low_stock_products(
        &self,
        ctx: &Context<'_>,
    ) -> Result<UpdateLowStockProductsPayload> {
        let service = ctx.data::<CrmService>()?;
        let outcome = service.update_low_stock_products().await?;

        Ok(UpdateLowStockProductsPayload {
            success: outcome.success,
            message: outcome.message,
            products: outcome.products.into_iter().map(ProductNode).collect(),
        })
    }
}
