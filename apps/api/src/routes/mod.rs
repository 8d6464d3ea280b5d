//! # HTTP Routes
//!
//! ```text
//! GET    /health
//!
//! POST   /sales                          create an order (1+ lines)
//! GET    /sales/{id}                     the order containing a sale
//! PUT    /sales/{id}                     full edit of one row
//! PUT    /sales/{id}/status              status / channel / notes, whole order
//! PUT    /sales/{id}/multi-product       replace the order's lines
//! DELETE /sales/{id}                     delete the whole order
//!
//! GET    /invoices
//! GET    /invoices/{id}
//! POST   /invoices/generate-from-sale    { "saleId": "..." }
//! POST   /invoices/preview-number
//! PUT    /invoices/{id}/status
//! DELETE /invoices/{id}
//! ```
//!
//! Every route except `/health` requires the `x-identity-id` header.

pub mod invoices;
pub mod sales;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Sales
        .route("/sales", post(sales::create_sale))
        .route(
            "/sales/{id}",
            get(sales::get_sale)
                .put(sales::update_sale)
                .delete(sales::delete_sale),
        )
        .route("/sales/{id}/status", put(sales::update_sale_status))
        .route("/sales/{id}/multi-product", put(sales::update_multi_product))
        // Invoices
        .route("/invoices", get(invoices::list_invoices))
        .route(
            "/invoices/generate-from-sale",
            post(invoices::generate_from_sale),
        )
        .route("/invoices/preview-number", post(invoices::preview_number))
        .route(
            "/invoices/{id}",
            get(invoices::get_invoice).delete(invoices::delete_invoice),
        )
        .route("/invoices/{id}/status", put(invoices::update_invoice_status))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// Liveness plus database reachability.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
