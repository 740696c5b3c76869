use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stockhouse_core::DomainError;
use stockhouse_infra::LedgerError;
use stockhouse_infra::store::StoreError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Handler error; renders as `{ "error", "message" }`.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(value: LedgerError) -> Self {
        Self(value)
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self(LedgerError::Domain(value))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_and_code(err: &LedgerError) -> (StatusCode, &'static str) {
    match err {
        LedgerError::Domain(d) => match d {
            DomainError::InsufficientStock { .. } => (StatusCode::CONFLICT, "insufficient_stock"),
            DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            DomainError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, "invalid_quantity"),
            DomainError::InvalidSize { .. } => (StatusCode::BAD_REQUEST, "invalid_size"),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
            DomainError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "forbidden"),
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        },
        LedgerError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
        LedgerError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = status_and_code(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        json_error(status, code, self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhouse_core::Warehouse;

    #[test]
    fn shortages_and_conflicts_are_409() {
        let shortage = LedgerError::Domain(DomainError::InsufficientStock {
            product: "Belt".to_string(),
            size: "-".to_string(),
            warehouse: Warehouse::Brno,
            available: 0,
            requested: 1,
        });
        assert_eq!(status_and_code(&shortage), (StatusCode::CONFLICT, "insufficient_stock"));
        assert_eq!(
            status_and_code(&LedgerError::Store(StoreError::Conflict("dup".to_string()))).0,
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn backend_failures_are_500() {
        let err = LedgerError::Store(StoreError::Backend("down".to_string()));
        assert_eq!(status_and_code(&err), (StatusCode::INTERNAL_SERVER_ERROR, "store_error"));
    }

    #[test]
    fn input_errors_are_400() {
        for err in [
            DomainError::invalid_quantity("x"),
            DomainError::validation("x"),
            DomainError::invalid_id("x"),
            DomainError::InvalidSize {
                category: "shoe".to_string(),
                size: 50,
            },
        ] {
            assert_eq!(status_and_code(&LedgerError::Domain(err)).0, StatusCode::BAD_REQUEST);
        }
    }
}
