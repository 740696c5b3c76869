//! Inventory count draft: record observed quantities, preview, confirm.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/draft", get(get_count).put(record_count).delete(discard_count))
        .route("/draft/preview", post(preview_count))
        .route("/draft/confirm", post(confirm_count))
}

pub async fn get_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> impl IntoResponse {
    match services.ledger().count_draft(ctx.actor()) {
        Some(count) => Json(dto::count_to_json(&count)),
        None => Json(json!({ "warehouse": ctx.actor().warehouse, "lines": [] })),
    }
}

pub async fn record_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::CountRequest>,
) -> ApiResult<impl IntoResponse> {
    let count = services
        .ledger()
        .record_count(ctx.actor(), body.warehouse, &body.lines)
        .await?;
    Ok(Json(dto::count_to_json(&count)))
}

pub async fn preview_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(services.ledger().preview_count(ctx.actor()).await?))
}

pub async fn confirm_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    let applied = services.ledger().confirm_count(ctx.actor()).await?;
    Ok(Json(json!({ "corrections": applied })))
}

pub async fn discard_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> StatusCode {
    services.ledger().discard_count(ctx.actor());
    StatusCode::NO_CONTENT
}
