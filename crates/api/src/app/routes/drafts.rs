//! Transfer basket: the caller's draft transfer, kept server-side.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use stockhouse_core::ProductId;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/draft", get(get_basket).delete(discard_basket))
        .route("/draft/route", put(set_route))
        .route(
            "/draft/products/:id",
            post(add_product).put(set_quantities).delete(remove_product),
        )
        .route("/draft/submit", post(submit_basket))
}

pub async fn get_basket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    let draft = services.ledger().basket(ctx.actor()).await?;
    Ok(Json(dto::basket_to_json(&draft)))
}

pub async fn discard_basket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<StatusCode> {
    services.ledger().discard_basket(ctx.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::RouteRequest>,
) -> ApiResult<impl IntoResponse> {
    let draft = services
        .ledger()
        .set_basket_route(ctx.actor(), body.source, body.target)
        .await?;
    Ok(Json(dto::basket_to_json(&draft)))
}

pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = id.parse()?;
    let draft = services.ledger().add_to_basket(ctx.actor(), id).await?;
    Ok(Json(dto::basket_to_json(&draft)))
}

pub async fn set_quantities(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::BasketQuantitiesRequest>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = id.parse()?;
    let quantities: Vec<(i64, i64)> = body
        .quantities
        .iter()
        .map(|q| (q.size, q.quantity))
        .collect();
    let draft = services
        .ledger()
        .set_basket_quantities(ctx.actor(), id, &quantities)
        .await?;
    Ok(Json(dto::basket_to_json(&draft)))
}

pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = id.parse()?;
    let draft = services.ledger().remove_from_basket(ctx.actor(), id).await?;
    Ok(Json(dto::basket_to_json(&draft)))
}

pub async fn submit_basket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    let transfer = services.ledger().submit_basket(ctx.actor()).await?;
    Ok((StatusCode::CREATED, Json(dto::transfer_to_json(&transfer))))
}
