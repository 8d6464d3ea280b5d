//! # Invoice Routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::CurrentActor;
use crate::error::ApiResult;
use crate::state::AppState;
use harvest_core::{Invoice, InvoiceStatus, InvoiceWithItems};
use harvest_db::ledger::InvoiceDeletion;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceRequest {
    pub sale_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewNumberResponse {
    pub invoice_number: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusRequest {
    pub status: InvoiceStatus,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.db.invoicing().list(&actor).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(invoice_id): Path<String>,
) -> ApiResult<Json<InvoiceWithItems>> {
    Ok(Json(state.db.invoicing().get_with_items(&actor, &invoice_id).await?))
}

pub async fn generate_from_sale(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(request): Json<GenerateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<InvoiceWithItems>)> {
    info!(identity = %actor.identity_id, sale_id = %request.sale_id, "POST /invoices/generate-from-sale");

    let invoice = state
        .db
        .orders()
        .generate_invoice(&actor, &request.sale_id)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn preview_number(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Json<PreviewNumberResponse>> {
    let invoice_number = state.db.invoicing().preview_number(&actor).await?;
    Ok(Json(PreviewNumberResponse { invoice_number }))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(invoice_id): Path<String>,
    Json(request): Json<InvoiceStatusRequest>,
) -> ApiResult<Json<Invoice>> {
    info!(identity = %actor.identity_id, invoice_id = %invoice_id, status = %request.status, "PUT /invoices/{{id}}/status");

    Ok(Json(
        state
            .db
            .invoicing()
            .update_status(&actor, &invoice_id, request.status)
            .await?,
    ))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(invoice_id): Path<String>,
) -> ApiResult<Json<InvoiceDeletion>> {
    info!(identity = %actor.identity_id, invoice_id = %invoice_id, "DELETE /invoices/{{id}}");

    Ok(Json(state.db.invoicing().delete_invoice(&actor, &invoice_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::testing::{fixture, Fixture, ACCOUNT};
    use harvest_core::{Actor, OrderLine, SaleStatus};
    use harvest_db::ledger::NewOrder;

    fn owner() -> CurrentActor {
        CurrentActor(Actor::owner(ACCOUNT))
    }

    async fn sale(fx: &Fixture) -> String {
        let outcome = fx
            .state
            .db
            .orders()
            .create_order(
                &owner(),
                NewOrder {
                    customer_id: fx.customer.id.clone(),
                    status: SaleStatus::Unpaid,
                    sale_date: None,
                    platform_source: None,
                    notes: None,
                    lines: vec![
                        OrderLine {
                            product_id: fx.corn.id.clone(),
                            quantity: 3,
                            unit_price_cents: 1000,
                            discount_cents: 0,
                        },
                        OrderLine {
                            product_id: fx.honey.id.clone(),
                            quantity: 1,
                            unit_price_cents: 500,
                            discount_cents: 0,
                        },
                    ],
                },
            )
            .await
            .unwrap();
        outcome.sales[0].id.clone()
    }

    #[tokio::test]
    async fn test_generate_preview_delete_cycle() {
        let fx = fixture().await;
        let sale_id = sale(&fx).await;

        let Json(preview) = preview_number(State(fx.state.clone()), owner()).await.unwrap();
        assert_eq!(preview.invoice_number, "INV-0001");

        let (status, Json(generated)) = generate_from_sale(
            State(fx.state.clone()),
            owner(),
            Json(GenerateInvoiceRequest { sale_id: sale_id.clone() }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(generated.invoice.invoice_number, "INV-0001");
        assert_eq!(generated.invoice.subtotal_cents, 3500);
        assert_eq!(generated.items.len(), 2);

        let Json(next) = preview_number(State(fx.state.clone()), owner()).await.unwrap();
        assert_eq!(next.invoice_number, "INV-0002");

        let Json(deleted) = delete_invoice(
            State(fx.state.clone()),
            owner(),
            Path(generated.invoice.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(deleted.invoice_number, "INV-0001");
        assert!(deleted.counter_reset);

        let Json(again) = preview_number(State(fx.state.clone()), owner()).await.unwrap();
        assert_eq!(again.invoice_number, "INV-0001");

        let body = serde_json::to_value(&deleted).unwrap();
        assert_eq!(body["invoiceNumber"], "INV-0001");
        assert_eq!(body["counterReset"], true);
    }

    #[tokio::test]
    async fn test_second_generation_is_conflict() {
        let fx = fixture().await;
        let sale_id = sale(&fx).await;
        let request = || Json(GenerateInvoiceRequest { sale_id: sale_id.clone() });

        generate_from_sale(State(fx.state.clone()), owner(), request())
            .await
            .unwrap();
        let err = generate_from_sale(State(fx.state.clone()), owner(), request())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.message.contains("INV-0001"));
    }

    #[tokio::test]
    async fn test_status_and_reads() {
        let fx = fixture().await;
        let sale_id = sale(&fx).await;
        let (_, Json(generated)) = generate_from_sale(
            State(fx.state.clone()),
            owner(),
            Json(GenerateInvoiceRequest { sale_id }),
        )
        .await
        .unwrap();
        let id = generated.invoice.id.clone();

        let Json(sent) = update_invoice_status(
            State(fx.state.clone()),
            owner(),
            Path(id.clone()),
            Json(InvoiceStatusRequest { status: InvoiceStatus::Sent }),
        )
        .await
        .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);

        let err = update_invoice_status(
            State(fx.state.clone()),
            owner(),
            Path(id.clone()),
            Json(InvoiceStatusRequest { status: InvoiceStatus::Draft }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let Json(listed) = list_invoices(State(fx.state.clone()), owner()).await.unwrap();
        assert_eq!(listed.len(), 1);

        let Json(fetched) = get_invoice(State(fx.state.clone()), owner(), Path(id))
            .await
            .unwrap();
        assert_eq!(fetched.items.len(), 2);

        let err = get_invoice(State(fx.state.clone()), owner(), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
