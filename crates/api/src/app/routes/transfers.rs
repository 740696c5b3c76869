use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

use stockhouse_core::TransferId;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(pending_transfers).post(create_transfer))
        .route("/archive", get(transfer_archive))
        .route("/pending-count", get(pending_count))
        .route("/:id", get(get_transfer))
        .route("/:id/confirm", post(confirm_transfer))
        .route("/:id/document", get(transfer_document))
}

/// In-transit transfers headed to the caller (everything for admin/hub).
pub async fn pending_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    let transfers = services.ledger().pending_transfers(ctx.actor()).await?;
    let out: Vec<Value> = transfers.iter().map(dto::transfer_to_json).collect();
    Ok(Json(out))
}

pub async fn transfer_archive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    let transfers = services.ledger().transfer_archive(ctx.actor()).await?;
    let out: Vec<Value> = transfers.iter().map(dto::transfer_to_json).collect();
    Ok(Json(out))
}

pub async fn pending_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    let count = services.ledger().pending_count(ctx.actor()).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::CreateTransferRequest>,
) -> ApiResult<impl IntoResponse> {
    let transfer = services
        .ledger()
        .create_transfer(ctx.actor(), body.source, body.target, body.lines)
        .await?;
    Ok((StatusCode::CREATED, Json(dto::transfer_to_json(&transfer))))
}

pub async fn get_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: TransferId = id.parse()?;
    let transfer = services.ledger().transfer(ctx.actor(), id).await?;
    Ok(Json(dto::transfer_to_json(&transfer)))
}

pub async fn confirm_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: TransferId = id.parse()?;
    let (transfer, applied) = services.ledger().confirm_transfer(ctx.actor(), id).await?;
    let mut body = dto::transfer_to_json(&transfer);
    body["applied"] = json!(applied);
    Ok(Json(body))
}

pub async fn transfer_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: TransferId = id.parse()?;
    let document = services.ledger().transfer_document(ctx.actor(), id).await?;
    Ok(Json(document))
}
