//! Domain error model.

use thiserror::Error;

use crate::Warehouse;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Storage and transport concerns have
/// their own error types in the infra and api crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An outbound movement would take a stock entry below zero.
    #[error(
        "insufficient stock: {product}, size {size} in {warehouse} (available {available}, requested {requested})"
    )]
    InsufficientStock {
        product: String,
        size: String,
        warehouse: Warehouse,
        available: i64,
        requested: i64,
    },

    /// A quantity was negative, zero where it must be positive, or otherwise unusable.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A size outside the size range of the product's category.
    #[error("size {size} is not valid for category {category}")]
    InvalidSize { category: String, size: i64 },

    /// The actor may not act on the requested warehouse or resource.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Unknown product, transfer, user or draft.
    #[error("{0} not found")]
    NotFound(String),

    /// A value failed validation (e.g. empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request conflicts with current state (duplicate username, non-empty stock, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Replace the product reference of an `InsufficientStock` error with a
    /// human-readable label. Other variants pass through untouched.
    pub fn with_product_label(self, label: &str) -> Self {
        match self {
            DomainError::InsufficientStock {
                size,
                warehouse,
                available,
                requested,
                ..
            } => DomainError::InsufficientStock {
                product: label.to_string(),
                size,
                warehouse,
                available,
                requested,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_the_shortage() {
        let err = DomainError::InsufficientStock {
            product: "Aurora-ivory".to_string(),
            size: "38".to_string(),
            warehouse: Warehouse::Prague,
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock: Aurora-ivory, size 38 in prague (available 2, requested 5)"
        );
    }

    #[test]
    fn relabel_only_touches_insufficient_stock() {
        let err = DomainError::InsufficientStock {
            product: "0190".to_string(),
            size: "-".to_string(),
            warehouse: Warehouse::Brno,
            available: 0,
            requested: 1,
        }
        .with_product_label("Belt");
        assert!(matches!(err, DomainError::InsufficientStock { ref product, .. } if product == "Belt"));

        let other = DomainError::not_found("product").with_product_label("Belt");
        assert_eq!(other, DomainError::NotFound("product".to_string()));
    }
}
