use actix_web::HttpResponse;
use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy of the fulfillment pipeline.
///
/// Validation failures carry the offending identifiers so the client can
/// correct the request; stock failures name the product at fault so the
/// client can retry with adjusted quantities.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: Uuid },

    #[error("Cart not found")]
    CartNotFound,

    #[error("Item not found in cart")]
    ItemNotFound,

    #[error("Cart is empty")]
    CartEmpty,

    #[error("Invalid cart item IDs: {}", format_ids(.invalid_ids))]
    InvalidSelection { invalid_ids: Vec<Uuid> },

    #[error("Order not found")]
    OrderNotFound,

    #[error("Shipping address not found")]
    ShippingNotFound,

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// Store-level failures (connection loss, lock timeout, constraint trips on
// racy writes) are classified as TransactionAborted; the enclosing diesel
// transaction has already been rolled back when these surface.

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        AppError::TransactionAborted(e.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::TransactionAborted(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({ "error": self.to_string() });
        match self {
            AppError::InvalidQuantity | AppError::InvalidSelection { .. } => {
                HttpResponse::BadRequest().json(body)
            }
            AppError::ProductNotFound
            | AppError::CartNotFound
            | AppError::ItemNotFound
            | AppError::CartEmpty
            | AppError::OrderNotFound
            | AppError::ShippingNotFound => HttpResponse::NotFound().json(body),
            AppError::InsufficientStock { .. } => HttpResponse::Conflict().json(body),
            AppError::TransactionAborted(_) | AppError::Internal(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Internal server error"
                }))
            }
        }
    }
}
