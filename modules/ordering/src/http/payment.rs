use super::views::{PaymentSummaryView, PaymentView};
use super::{OrderingState, optional_json};
use crate::OrderingError;
use crate::services::payment::{
    CancelOrderPayment, ConfirmOrderPayment, CreatePayment, GetPayment, ListVisiblePayments,
};
use crate::services::{Actor, OrderingStore};
use crate::utils::qr::QrRenderer;
use auth::http::middleware::CurrentUser;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kanau::processor::Processor;
use serde::{Deserialize, Serialize};

pub(super) fn routes<S: OrderingStore, R: QrRenderer>() -> Router<OrderingState<S, R>> {
    Router::new()
        .route("/api/payments", get(list::<S, R>))
        .route("/api/payments/create-qr", post(create_qr::<S, R>))
        .route("/api/payments/{id}", get(detail::<S, R>))
        .route("/api/payments/{id}/confirm", post(confirm::<S, R>))
        .route("/api/payments/{id}/cancel", post(cancel::<S, R>))
}

async fn list<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
) -> Result<Json<Vec<PaymentSummaryView>>, OrderingError> {
    let payments = state
        .payments
        .process(ListVisiblePayments {
            actor: Actor::from(&user.0),
        })
        .await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateQrRequest {
    pub order_id: i64,
}

async fn create_qr<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Json(body): Json<CreateQrRequest>,
) -> Result<(StatusCode, Json<PaymentView>), OrderingError> {
    let detail = state
        .payments
        .process(CreatePayment {
            actor: Actor::from(&user.0),
            order_id: body.order_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

async fn detail<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Path(payment_id): Path<i64>,
) -> Result<Json<PaymentView>, OrderingError> {
    let detail = state
        .payments
        .process(GetPayment {
            actor: Actor::from(&user.0),
            payment_id,
        })
        .await?;
    Ok(Json(detail.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub message: &'static str,
    pub order_status: &'static str,
    pub payment: PaymentView,
}

async fn confirm<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Path(payment_id): Path<i64>,
    body: Bytes,
) -> Result<Json<ConfirmResponse>, OrderingError> {
    let body: ConfirmRequest = optional_json(&body)?;
    let detail = state
        .payments
        .process(ConfirmOrderPayment {
            actor: Actor::from(&user.0),
            payment_id,
            transaction_id: body.transaction_id,
        })
        .await?;
    Ok(Json(ConfirmResponse {
        message: "Payment confirmed, order confirmed",
        order_status: detail.order_status.display_name(),
        payment: detail.into(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

async fn cancel<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Path(payment_id): Path<i64>,
    body: Bytes,
) -> Result<Json<PaymentView>, OrderingError> {
    let body: CancelRequest = optional_json(&body)?;
    let detail = state
        .payments
        .process(CancelOrderPayment {
            actor: Actor::from(&user.0),
            payment_id,
            reason: body.reason,
        })
        .await?;
    Ok(Json(detail.into()))
}
