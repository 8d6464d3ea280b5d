//! # Sale Routes
//!
//! | Method | Path                        | Workflow          |
//! |--------|-----------------------------|-------------------|
//! | POST   | /sales                      | `create_order`    |
//! | GET    | /sales/{id}                 | `get_order`       |
//! | PUT    | /sales/{id}                 | `update_sale`     |
//! | PUT    | /sales/{id}/status          | `update_status`   |
//! | PUT    | /sales/{id}/multi-product   | `update_order`    |
//! | DELETE | /sales/{id}                 | `delete_order`    |

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::auth::CurrentActor;
use crate::error::ApiResult;
use crate::state::AppState;
use harvest_core::Sale;
use harvest_db::ledger::{
    NewOrder, OrderDeletion, OrderEdit, OrderOutcome, OrderView, SaleEdit, SaleEditOutcome,
    StatusUpdate,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub updated_count: usize,
    pub sales: Vec<Sale>,
}

pub async fn create_sale(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(order): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<OrderOutcome>)> {
    info!(identity = %actor.identity_id, lines = order.lines.len(), "POST /sales");

    let outcome = state.db.orders().create_order(&actor, order).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(sale_id): Path<String>,
) -> ApiResult<Json<OrderView>> {
    Ok(Json(state.db.orders().get_order(&actor, &sale_id).await?))
}

pub async fn update_sale(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(sale_id): Path<String>,
    Json(edit): Json<SaleEdit>,
) -> ApiResult<Json<SaleEditOutcome>> {
    info!(identity = %actor.identity_id, sale_id = %sale_id, "PUT /sales/{{id}}");

    Ok(Json(state.db.orders().update_sale(&actor, &sale_id, edit).await?))
}

pub async fn update_sale_status(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(sale_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<StatusUpdateResponse>> {
    info!(identity = %actor.identity_id, sale_id = %sale_id, status = %update.status, "PUT /sales/{{id}}/status");

    let sales = state.db.orders().update_status(&actor, &sale_id, update).await?;
    Ok(Json(StatusUpdateResponse {
        updated_count: sales.len(),
        sales,
    }))
}

pub async fn update_multi_product(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(sale_id): Path<String>,
    Json(edit): Json<OrderEdit>,
) -> ApiResult<Json<OrderOutcome>> {
    info!(identity = %actor.identity_id, sale_id = %sale_id, lines = edit.lines.len(), "PUT /sales/{{id}}/multi-product");

    Ok(Json(state.db.orders().update_order(&actor, &sale_id, edit).await?))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(sale_id): Path<String>,
) -> ApiResult<Json<OrderDeletion>> {
    info!(identity = %actor.identity_id, sale_id = %sale_id, "DELETE /sales/{{id}}");

    Ok(Json(state.db.orders().delete_order(&actor, &sale_id).await?))
}
