//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional OpenAPI document (disable with `GENIE_ENABLE_DOCS=false`)
//! - Health / heartbeat route
//! - Genie proxy routes under `/api/genie`

pub mod doc;
mod genie;
mod health;

use axum::routing::get;
use axum::{middleware, Json, Router};
use crate::middleware::{cors, trace};
use crate::state::AppState;
use std::sync::Arc;
use tower::ServiceBuilder;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .nest("/api/genie", genie::router(state.config.results_strategy));

    let mut app = Router::new().merge(api_router);

    // ── OpenAPI document ─────────────────────────────────────────────────────
    if state.config.enable_docs {
        let api_doc = doc::get_docs();
        app = app.route(
            "/api-docs/openapi.json",
            get(move || async move { Json(api_doc) }),
        );
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}

// ── Test helpers ──────────────────────────────────────────────────────────────
