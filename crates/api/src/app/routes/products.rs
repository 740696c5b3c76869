use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockhouse_catalog::{Category, NewProduct, ProductFilter, ProductUpdate};
use stockhouse_core::ProductId;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ProductQuery>,
) -> ApiResult<impl IntoResponse> {
    let category = match query.category.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<Category>()?),
        _ => None,
    };
    let products = services
        .ledger()
        .products(&ProductFilter {
            category,
            search: query.search,
        })
        .await?;
    Ok(Json(products))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    let product = services.ledger().create_product(ctx.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = id.parse()?;
    Ok(Json(services.ledger().product(id).await?))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<ProductUpdate>,
) -> ApiResult<impl IntoResponse> {
    let id: ProductId = id.parse()?;
    let product = services
        .ledger()
        .update_product(ctx.actor(), id, body)
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: ProductId = id.parse()?;
    services.ledger().delete_product(ctx.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
