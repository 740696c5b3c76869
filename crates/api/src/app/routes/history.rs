use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

/// Append-only history, newest first.
pub async fn list_history(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.into_filter()?;
    Ok(Json(services.ledger().history(&filter).await?))
}
