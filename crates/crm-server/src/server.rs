// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP server for the GraphQL API.
//!
//! Routes:
//! - `POST /graphql`: execute a GraphQL request
//! - `GET /graphql`: GraphiQL IDE
//! - `GET /health`: liveness probe

use std::net::SocketAddr;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Router;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;
use crate::graphql::CrmSchema;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Executable GraphQL schema.
    pub schema: CrmSchema,
}

impl AppState {
    /// Create handler state around a schema.
    pub fn new(schema: CrmSchema) -> Self {
        Self { schema }
    }
}

/// Build the axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind `addr` and serve until the shutdown flag flips to `true`.
pub async fn run_server_with_shutdown(
    addr: SocketAddr,
    state: AppState,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown_rx).await
}

/// Serve on an already bound listener until the shutdown flag flips.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "GraphQL server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    info!(addr = %local_addr, "GraphQL server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use crm_core::CrmService;
    use crm_core::persistence::SqlitePersistence;
    use tower::ServiceExt;

    use crate::graphql::build_schema;

    async fn app() -> Router {
        let persistence = SqlitePersistence::in_memory().await.unwrap();
        let schema = build_schema(CrmService::new(Arc::new(persistence)));
        build_router(AppState::new(schema))
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_graphiql_page() {
        let response = app()
            .await
            .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_graphql() {
        let request = Request::post("/graphql")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"query":"{ hello }"}"#))
            .unwrap();

        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"]["hello"], "Hello, GraphQL!");
    }

    #[tokio::test]
    async fn test_run_server_stops_on_shutdown_flag() {
        let persistence = SqlitePersistence::in_memory().await.unwrap();
        let state = AppState::new(build_schema(CrmService::new(Arc::new(persistence))));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run_server_with_shutdown(
            "127.0.0.1:0".parse().unwrap(),
            state,
            rx,
        ));

        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
