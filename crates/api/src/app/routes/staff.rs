//! Sales and overtime tallies.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{Datelike, Utc};

use stockhouse_infra::ledger::TallyTarget;

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/sales", get(sales_summary).post(record_sales))
        .route("/overtime", get(overtime_summary).post(record_overtime))
}

pub async fn sales_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PeriodQuery>,
) -> ApiResult<impl IntoResponse> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(Json(services.ledger().sales_summary(year, query.month).await?))
}

pub async fn record_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::SalesRequest>,
) -> ApiResult<impl IntoResponse> {
    let target = TallyTarget {
        username: body.username,
        month: body.month,
    };
    let tally = services
        .ledger()
        .record_sales(ctx.actor(), target, body.tries, body.sales)
        .await?;
    Ok((StatusCode::CREATED, Json(tally)))
}

pub async fn overtime_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PeriodQuery>,
) -> ApiResult<impl IntoResponse> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(Json(services.ledger().overtime_summary(year, query.month).await?))
}

pub async fn record_overtime(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::OvertimeRequest>,
) -> ApiResult<impl IntoResponse> {
    let target = TallyTarget {
        username: body.username,
        month: body.month,
    };
    let tally = services
        .ledger()
        .record_overtime(ctx.actor(), target, body.classic, body.deluxe)
        .await?;
    Ok((StatusCode::CREATED, Json(tally)))
}
