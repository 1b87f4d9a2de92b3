use crate::entities::order::{
    FindOrderById, InsertOrder, ListOrderHistory, ListOrderItems, ListOrders, OrderItem,
    OrderStatusHistory, TransitionOrderStatus, UpdateDeliveryFee, UserOrder,
};
use crate::entities::payment::{
    AttachPaymentQr, CancelPayment, CancelPaymentOutcome, ConfirmPayment, ConfirmPaymentOutcome,
    FindPaymentById, InsertPayment, InsertPaymentOutcome, ListPaymentHistory, ListPayments,
    Payment, PaymentHistory,
};
use auth::entities::db::user_account::{FindUserAccountById, UserAccount, UserRole};
use kanau::processor::Processor;
use menu::CatalogLookup;
use uuid::Uuid;

pub mod order;
pub mod payment;

/// Who is acting on an order or payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
    pub is_staff: bool,
}

impl From<&UserAccount> for Actor {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id,
            role: user.role,
            is_staff: user.is_staff,
        }
    }
}

impl Actor {
    /// Staff, the client or the assigned driver.
    pub fn can_see(&self, order: &UserOrder) -> bool {
        self.is_staff || order.client_id == self.id || order.driver_id == Some(self.id)
    }

    pub fn is_driver_of(&self, order: &UserOrder) -> bool {
        order.driver_id == Some(self.id)
    }
}

/// Storage the ordering services run against.
pub trait OrderingStore:
    CatalogLookup
    + Processor<FindUserAccountById, Output = Option<UserAccount>, Error = sqlx::Error>
    + Processor<InsertOrder, Output = Option<UserOrder>, Error = sqlx::Error>
    + Processor<FindOrderById, Output = Option<UserOrder>, Error = sqlx::Error>
    + Processor<ListOrderItems, Output = Vec<OrderItem>, Error = sqlx::Error>
    + Processor<ListOrderHistory, Output = Vec<OrderStatusHistory>, Error = sqlx::Error>
    + Processor<ListOrders, Output = Vec<UserOrder>, Error = sqlx::Error>
    + Processor<TransitionOrderStatus, Output = Option<UserOrder>, Error = sqlx::Error>
    + Processor<UpdateDeliveryFee, Output = Option<UserOrder>, Error = sqlx::Error>
    + Processor<InsertPayment, Output = InsertPaymentOutcome, Error = sqlx::Error>
    + Processor<AttachPaymentQr, Output = (), Error = sqlx::Error>
    + Processor<ConfirmPayment, Output = ConfirmPaymentOutcome, Error = sqlx::Error>
    + Processor<CancelPayment, Output = CancelPaymentOutcome, Error = sqlx::Error>
    + Processor<FindPaymentById, Output = Option<Payment>, Error = sqlx::Error>
    + Processor<ListPayments, Output = Vec<Payment>, Error = sqlx::Error>
    + Processor<ListPaymentHistory, Output = Vec<PaymentHistory>, Error = sqlx::Error>
{
}

impl<T> OrderingStore for T where
    T: CatalogLookup
        + Processor<FindUserAccountById, Output = Option<UserAccount>, Error = sqlx::Error>
        + Processor<InsertOrder, Output = Option<UserOrder>, Error = sqlx::Error>
        + Processor<FindOrderById, Output = Option<UserOrder>, Error = sqlx::Error>
        + Processor<ListOrderItems, Output = Vec<OrderItem>, Error = sqlx::Error>
        + Processor<ListOrderHistory, Output = Vec<OrderStatusHistory>, Error = sqlx::Error>
        + Processor<ListOrders, Output = Vec<UserOrder>, Error = sqlx::Error>
        + Processor<TransitionOrderStatus, Output = Option<UserOrder>, Error = sqlx::Error>
        + Processor<UpdateDeliveryFee, Output = Option<UserOrder>, Error = sqlx::Error>
        + Processor<InsertPayment, Output = InsertPaymentOutcome, Error = sqlx::Error>
        + Processor<AttachPaymentQr, Output = (), Error = sqlx::Error>
        + Processor<ConfirmPayment, Output = ConfirmPaymentOutcome, Error = sqlx::Error>
        + Processor<CancelPayment, Output = CancelPaymentOutcome, Error = sqlx::Error>
        + Processor<FindPaymentById, Output = Option<Payment>, Error = sqlx::Error>
        + Processor<ListPayments, Output = Vec<Payment>, Error = sqlx::Error>
        + Processor<ListPaymentHistory, Output = Vec<PaymentHistory>, Error = sqlx::Error>
{
}
