use crate::entities::order::{OrderItem, OrderStatus, OrderStatusHistory, UserOrder};
use crate::entities::payment::{Payment, PaymentHistory, PaymentStatus};
use crate::services::order::OrderDetail;
use crate::services::payment::PaymentDetail;
use framework::to_utc;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub id: i64,
    pub product: i32,
    pub product_name: String,
    pub product_image: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub notes: String,
}

impl From<OrderItem> for OrderItemView {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product: item.product_id,
            product_name: item.product_name,
            product_image: item.product_image,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
            notes: item.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusHistoryView {
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub changed_by: Option<String>,
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<OrderStatusHistory> for StatusHistoryView {
    fn from(row: OrderStatusHistory) -> Self {
        Self {
            status: row.status,
            status_display: row.status.display_name(),
            changed_by: row.changed_by_email,
            notes: row.notes,
            created_at: to_utc(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: i64,
    pub order_number: String,
    pub client: Uuid,
    pub client_email: String,
    pub driver: Option<Uuid>,
    pub driver_email: Option<String>,
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub delivery_latitude: Decimal,
    pub delivery_longitude: Decimal,
    pub delivery_address: String,
    pub delivery_reference: String,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub notes: String,
    pub items: Vec<OrderItemView>,
    pub status_history: Vec<StatusHistoryView>,
    pub estimated_preparation_time: i32,
    pub total_items: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub confirmed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub assigned_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<OrderDetail> for OrderView {
    fn from(detail: OrderDetail) -> Self {
        let estimated_preparation_time = detail.estimated_preparation_time();
        let total_items = detail.total_items();
        let OrderDetail {
            order,
            items,
            history,
        } = detail;
        Self {
            id: order.id,
            order_number: order.order_number,
            client: order.client_id,
            client_email: order.client_email,
            driver: order.driver_id,
            driver_email: order.driver_email,
            status: order.status,
            status_display: order.status.display_name(),
            delivery_latitude: order.delivery_latitude,
            delivery_longitude: order.delivery_longitude,
            delivery_address: order.delivery_address,
            delivery_reference: order.delivery_reference,
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            total: order.total,
            notes: order.notes,
            items: items.into_iter().map(Into::into).collect(),
            status_history: history.into_iter().map(Into::into).collect(),
            estimated_preparation_time,
            total_items,
            created_at: to_utc(order.created_at),
            confirmed_at: order.confirmed_at.map(to_utc),
            assigned_at: order.assigned_at.map(to_utc),
            delivered_at: order.delivered_at.map(to_utc),
            updated_at: to_utc(order.updated_at),
        }
    }
}

/// List shape, without items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummaryView {
    pub id: i64,
    pub order_number: String,
    pub client_email: String,
    pub driver_email: Option<String>,
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub total: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserOrder> for OrderSummaryView {
    fn from(order: UserOrder) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            client_email: order.client_email,
            driver_email: order.driver_email,
            status: order.status,
            status_display: order.status.display_name(),
            total: order.total,
            created_at: to_utc(order.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentHistoryView {
    pub old_status: String,
    pub new_status: String,
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<PaymentHistory> for PaymentHistoryView {
    fn from(row: PaymentHistory) -> Self {
        Self {
            old_status: row.old_status,
            new_status: row.new_status,
            notes: row.notes,
            created_at: to_utc(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub id: i64,
    pub order: i64,
    pub order_number: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub status_display: &'static str,
    pub qr_code: String,
    pub qr_reference: String,
    pub transaction_id: Option<String>,
    pub history: Vec<PaymentHistoryView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub confirmed_at: Option<OffsetDateTime>,
}

impl From<PaymentDetail> for PaymentView {
    fn from(detail: PaymentDetail) -> Self {
        let payment = detail.payment;
        Self {
            id: payment.id,
            order: payment.order_id,
            order_number: detail.order_number,
            amount: payment.amount,
            status: payment.status,
            status_display: payment.status.display_name(),
            qr_code: payment.qr_image,
            qr_reference: payment.qr_reference,
            transaction_id: payment.transaction_id,
            history: detail.history.into_iter().map(Into::into).collect(),
            created_at: to_utc(payment.created_at),
            confirmed_at: payment.confirmed_at.map(to_utc),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummaryView {
    pub id: i64,
    pub order: i64,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub status_display: &'static str,
    pub qr_reference: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Payment> for PaymentSummaryView {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            order: payment.order_id,
            amount: payment.amount,
            status: payment.status,
            status_display: payment.status.display_name(),
            qr_reference: payment.qr_reference,
            created_at: to_utc(payment.created_at),
        }
    }
}
