use super::views::{OrderSummaryView, OrderView};
use super::{OrderingState, optional_json};
use crate::OrderingError;
use crate::entities::order::OrderStatus;
use crate::services::order::{
    CancelOrder, ChangeDeliveryFee, ChangeOrderStatus, GetOrder, ListMyDeliveries, ListMyOrders,
    ListVisibleOrders, OrderLine, PlaceOrder,
};
use crate::services::{Actor, OrderingStore};
use crate::utils::qr::QrRenderer;
use auth::http::middleware::CurrentUser;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(super) fn routes<S: OrderingStore, R: QrRenderer>() -> Router<OrderingState<S, R>> {
    Router::new()
        .route("/api/orders", get(list::<S, R>).post(create::<S, R>))
        .route("/api/orders/my-orders", get(my_orders::<S, R>))
        .route("/api/orders/my-deliveries", get(my_deliveries::<S, R>))
        .route("/api/orders/{id}", get(detail::<S, R>))
        .route("/api/orders/{id}/update-status", post(update_status::<S, R>))
        .route("/api/orders/{id}/cancel", post(cancel::<S, R>))
        .route("/api/orders/{id}/delivery-fee", patch(delivery_fee::<S, R>))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct OrderCollection {
    pub count: usize,
    pub orders: Vec<OrderView>,
}

impl OrderCollection {
    fn new(orders: Vec<OrderView>) -> Self {
        Self {
            count: orders.len(),
            orders,
        }
    }
}

async fn list<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<OrderSummaryView>>, OrderingError> {
    let orders = state
        .orders
        .process(ListVisibleOrders {
            actor: Actor::from(&user.0),
            status: filter.status,
        })
        .await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub delivery_latitude: Decimal,
    pub delivery_longitude: Decimal,
    #[serde(default)]
    pub delivery_reference: String,
    #[serde(default)]
    pub delivery_fee: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
    pub items: Vec<OrderLine>,
}

async fn create<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), OrderingError> {
    let detail = state
        .orders
        .process(PlaceOrder {
            actor: Actor::from(&user.0),
            delivery_latitude: body.delivery_latitude,
            delivery_longitude: body.delivery_longitude,
            delivery_reference: body.delivery_reference,
            delivery_fee: body.delivery_fee,
            notes: body.notes,
            items: body.items,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

async fn my_orders<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<OrderCollection>, OrderingError> {
    let orders = state
        .orders
        .process(ListMyOrders {
            actor: Actor::from(&user.0),
            status: filter.status,
        })
        .await?;
    Ok(Json(OrderCollection::new(
        orders.into_iter().map(Into::into).collect(),
    )))
}

async fn my_deliveries<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
) -> Result<Json<OrderCollection>, OrderingError> {
    let orders = state
        .orders
        .process(ListMyDeliveries {
            actor: Actor::from(&user.0),
        })
        .await?;
    Ok(Json(OrderCollection::new(
        orders.into_iter().map(Into::into).collect(),
    )))
}

async fn detail<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderView>, OrderingError> {
    let detail = state
        .orders
        .process(GetOrder {
            actor: Actor::from(&user.0),
            order_id,
        })
        .await?;
    Ok(Json(detail.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
}

async fn update_status<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Path(order_id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<OrderView>, OrderingError> {
    let detail = state
        .orders
        .process(ChangeOrderStatus {
            actor: Actor::from(&user.0),
            order_id,
            status: body.status,
            notes: body.notes,
            driver_id: body.driver_id,
        })
        .await?;
    Ok(Json(detail.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

async fn cancel<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Path(order_id): Path<i64>,
    body: Bytes,
) -> Result<Json<OrderView>, OrderingError> {
    let body: CancelRequest = optional_json(&body)?;
    let detail = state
        .orders
        .process(CancelOrder {
            actor: Actor::from(&user.0),
            order_id,
            reason: body.reason,
        })
        .await?;
    Ok(Json(detail.into()))
}

#[derive(Debug, Deserialize)]
pub struct DeliveryFeeRequest {
    pub delivery_fee: Decimal,
}

async fn delivery_fee<S: OrderingStore, R: QrRenderer>(
    State(state): State<OrderingState<S, R>>,
    user: CurrentUser,
    Path(order_id): Path<i64>,
    Json(body): Json<DeliveryFeeRequest>,
) -> Result<Json<OrderView>, OrderingError> {
    let detail = state
        .orders
        .process(ChangeDeliveryFee {
            actor: Actor::from(&user.0),
            order_id,
            delivery_fee: body.delivery_fee,
        })
        .await?;
    Ok(Json(detail.into()))
}
