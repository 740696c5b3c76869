use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use stockhouse_auth::{NewUser, UserUpdate};
use stockhouse_core::UserId;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(services.ledger().users(ctx.actor()).await?))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let user = services.ledger().create_user(ctx.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<impl IntoResponse> {
    let id: UserId = id.parse()?;
    Ok(Json(services.ledger().update_user(ctx.actor(), id, body).await?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: UserId = id.parse()?;
    services.ledger().delete_user(ctx.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
