use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use serde_json::json;

use stockhouse_core::{ProductId, Warehouse};
use stockhouse_infra::ledger::StockTarget;
use stockhouse_inventory::StockScope;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/matrix", get(stock_matrix))
        .route("/inbound", post(receive))
        .route("/outbound", post(issue))
        .route("/adjust", post(adjust))
        .route("/note", put(set_note))
        .route("/:warehouse/:product_id", get(get_product_note))
        .route("/:warehouse/:product_id/:size", get(get_stock))
}

pub async fn get_product_note(
    Extension(services): Extension<Arc<AppServices>>,
    Path((warehouse, product_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let product_id: ProductId = product_id.parse()?;
    let warehouse: Warehouse = warehouse.parse()?;
    let note = services.ledger().product_note(product_id, warehouse).await?;
    Ok(Json(json!({
        "product_id": product_id,
        "warehouse": warehouse,
        "note": note,
    })))
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((warehouse, product_id, size)): Path<(String, String, i64)>,
) -> ApiResult<impl IntoResponse> {
    let target = StockTarget {
        product_id: product_id.parse::<ProductId>()?,
        warehouse: warehouse.parse::<Warehouse>()?,
        size,
    };
    let entry = services.ledger().stock(target).await?;
    Ok(Json(dto::stock_entry_to_json(&entry)))
}

pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::StockMovementRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = services
        .ledger()
        .receive(ctx.actor(), body.target(), body.quantity, body.note)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn issue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::StockMovementRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = services
        .ledger()
        .issue(ctx.actor(), body.target(), body.quantity, body.note)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn adjust(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::StockAdjustRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = services
        .ledger()
        .adjust(ctx.actor(), body.target(), body.delta, body.note)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn set_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::StockNoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let ledger = services.ledger();
    let entry = match body.size {
        Some(size) => {
            let target = StockTarget {
                product_id: body.product_id,
                warehouse: body.warehouse,
                size,
            };
            ledger.set_note(ctx.actor(), target, body.note).await?
        }
        None => {
            ledger
                .set_product_note(ctx.actor(), body.product_id, body.warehouse, body.note)
                .await?
        }
    };
    Ok(Json(dto::stock_entry_to_json(&entry)))
}

pub async fn stock_matrix(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::MatrixQuery>,
) -> ApiResult<impl IntoResponse> {
    let scope = match query.warehouse.as_deref().map(str::trim) {
        None | Some("") | Some("all") => StockScope::All,
        Some(raw) => StockScope::Warehouse(raw.parse()?),
    };
    Ok(Json(services.ledger().stock_matrix(scope, query.search).await?))
}
