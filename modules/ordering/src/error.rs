use crate::entities::order::OrderStatus;
use crate::entities::payment::PaymentStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use framework::error::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum OrderingError {
    #[error("cannot change order status from '{current}' to '{requested}'")]
    InvalidTransition {
        current: OrderStatus,
        requested: OrderStatus,
    },

    #[error("product '{0}' is not available")]
    ProductUnavailable(String),

    #[error("product {0} does not exist")]
    ProductNotFound(i32),

    #[error("an order needs at least one product")]
    EmptyOrder,

    #[error("this order already has an active payment")]
    PaymentAlreadyExists,

    #[error("order is {0}, expected pending")]
    OrderNotPending(OrderStatus),

    #[error("payment is {0}, expected pending")]
    PaymentNotPending(PaymentStatus),

    #[error("transaction id is already recorded on another payment")]
    TransactionIdTaken,

    #[error("permission denied")]
    PermissionDenied,

    #[error("not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Framework(#[from] framework::Error),
}

impl From<sqlx::Error> for OrderingError {
    fn from(err: sqlx::Error) -> Self {
        Self::Framework(framework::Error::Database(err))
    }
}

impl From<anyhow::Error> for OrderingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Framework(framework::Error::BusinessPanic(err))
    }
}

impl OrderingError {
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput(detail.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::EmptyOrder
            | Self::ProductNotFound(_)
            | Self::ProductUnavailable(_) => StatusCode::BAD_REQUEST,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. }
            | Self::PaymentAlreadyExists
            | Self::OrderNotPending(_)
            | Self::PaymentNotPending(_)
            | Self::TransactionIdTaken => StatusCode::CONFLICT,
            Self::Framework(e) => e.status_code(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ProductUnavailable(_) => "product_unavailable",
            Self::ProductNotFound(_) => "product_not_found",
            Self::EmptyOrder => "empty_order",
            Self::PaymentAlreadyExists => "payment_already_exists",
            Self::OrderNotPending(_) => "order_not_pending",
            Self::PaymentNotPending(_) => "payment_not_pending",
            Self::TransactionIdTaken => "transaction_id_taken",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Framework(e) => e.code(),
        }
    }
}

impl IntoResponse for OrderingError {
    fn into_response(self) -> Response {
        match self {
            Self::Framework(e) => e.into_response(),
            Self::InvalidTransition { current, requested } => {
                let err = Self::InvalidTransition { current, requested };
                ErrorBody::new(err.code(), err.to_string())
                    .with_extra(serde_json::json!({
                        "current": current,
                        "requested": requested,
                    }))
                    .into_response_with(err.status_code())
            }
            other => ErrorBody::new(other.code(), other.to_string())
                .into_response_with(other.status_code()),
        }
    }
}
