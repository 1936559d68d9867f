// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Query root.

use async_graphql::{Context, ID, Object, Result};
use crm_core::CrmService;
use crm_core::model::{OrderBy, Page};
use crm_core::service::parse_id;

use super::inputs::{CustomerFilterInput, OrderFilterInput, ProductFilterInput};
use super::types::{
    CustomerConnection, CustomerNode, OrderConnection, OrderNode, ProductConnection, ProductNode,
};

/// Read-only entry points.
pub struct QueryRoot;

fn page(first: Option<i32>, offset: Option<i32>) -> Result<Page> {
    let page = Page {
        first: first.map(i64::from),
        offset: offset.map(i64::from).unwrap_or(0),
    };
    if page.offset < 0 || page.first.is_some_and(|f| f < 0) {
        return Err("first and offset cannot be negative".into());
    }
    Ok(page)
}

#[Object]
impl QueryRoot {
    /// Liveness probe used by the heartbeat job.
    async fn hello(&self) -> String {
        "Hello, GraphQL!".to_string()
    }

    /// Customer by id.
    async fn customer(&self, ctx: &Context<'_>, id: ID) -> Result<Option<CustomerNode>> {
        let Some(id) = parse_id(&id) else {
            return Ok(None);
        };
        let service = ctx.data::<CrmService>()?;
        Ok(service.customer(id).await?.map(CustomerNode))
    }

    /// Product by id.
    async fn product(&self, ctx: &Context<'_>, id: ID) -> Result<Option<ProductNode>> {
        let Some(id) = parse_id(&id) else {
            return Ok(None);
        };
        let service = ctx.data::<CrmService>()?;
        Ok(service.product(id).await?.map(ProductNode))
    }

    /// Order by id.
    async fn order(&self, ctx: &Context<'_>, id: ID) -> Result<Option<OrderNode>> {
        let Some(id) = parse_id(&id) else {
            return Ok(None);
        };
        let service = ctx.data::<CrmService>()?;
        Ok(service.order(id).await?.map(OrderNode))
    }

    /// Customers. `orderBy` takes keys like `"name"` or `"-email"`.
    async fn customers(
        &self,
        filter: Option<CustomerFilterInput>,
        order_by: Option<Vec<String>>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> Result<CustomerConnection> {
        Ok(CustomerConnection {
            filter: filter.unwrap_or_default().into(),
            order: OrderBy::parse_all(order_by.unwrap_or_default().as_slice())?,
            page: page(first, offset)?,
        })
    }

    /// Products. `orderBy` takes keys like `"price"` or `"-stock"`.
    async fn products(
        &self,
        filter: Option<ProductFilterInput>,
        order_by: Option<Vec<String>>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> Result<ProductConnection> {
        Ok(ProductConnection {
            filter: filter.unwrap_or_default().into(),
            order: OrderBy::parse_all(order_by.unwrap_or_default().as_slice())?,
            page: page(first, offset)?,
        })
    }

    /// Orders. `orderBy` takes keys like `"-orderDate"` or `"totalAmount"`.
    async fn orders(
        &self,
        filter: Option<OrderFilterInput>,
        order_by: Option<Vec<String>>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> Result<OrderConnection> {
        Ok(OrderConnection {
            filter: filter.unwrap_or_default().try_into()?,
            order: OrderBy::parse_all(order_by.unwrap_or_default().as_slice())?,
            page: page(first, offset)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_rejects_negatives() {
        assert_eq!(page(None, None).unwrap(), Page::default());
        assert_eq!(
            page(Some(5), Some(10)).unwrap(),
            Page {
                first: Some(5),
                offset: 10
            }
        );
        assert!(page(Some(-1), None).is_err());
        assert!(page(None, Some(-1)).is_err());
    }
}
