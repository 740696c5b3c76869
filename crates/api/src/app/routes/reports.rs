use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
};

use stockhouse_core::Warehouse;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/inventory/:warehouse", get(inventory_sheet))
}

pub async fn inventory_sheet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(warehouse): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let warehouse: Warehouse = warehouse.parse()?;
    let sheet = services
        .ledger()
        .inventory_sheet(ctx.actor(), warehouse)
        .await?;
    Ok(Json(sheet))
}
