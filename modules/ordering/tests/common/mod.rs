#![allow(dead_code)]

use auth::entities::db::user_account::{FindUserAccountById, UserAccount, UserRole};
use kanau::processor::Processor;
use menu::entities::product::{CatalogProduct, FindCatalogProducts};
use ordering::entities::order::{
    FindOrderById, InsertOrder, ListOrderHistory, ListOrderItems, ListOrders, OrderItem,
    OrderScope, OrderStatus, OrderStatusHistory, TransitionOrderStatus, UpdateDeliveryFee,
    UserOrder,
};
use ordering::entities::payment::{
    AttachPaymentQr, CancelPayment, CancelPaymentOutcome, ConfirmPayment, ConfirmPaymentOutcome,
    FindPaymentById, InsertPayment, InsertPaymentOutcome, ListPaymentHistory, ListPayments,
    Payment, PaymentHistory, PaymentStatus,
};
use ordering::services::Actor;
use ordering::utils::qr::{QrError, QrRenderer};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    next_id: i64,
    products: Vec<CatalogProduct>,
    users: Vec<UserAccount>,
    orders: Vec<UserOrder>,
    items: Vec<OrderItem>,
    history: Vec<OrderStatusHistory>,
    payments: Vec<Payment>,
    payment_history: Vec<PaymentHistory>,
    /// Status another request moves the order to right before the next guarded update.
    interfering_status: Option<OrderStatus>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_of(&self, id: Uuid) -> Option<String> {
        self.users.iter().find(|u| u.id == id).map(|u| u.email.clone())
    }

    fn order_mut(&mut self, id: i64) -> Option<&mut UserOrder> {
        self.orders.iter_mut().find(|o| o.id == id)
    }

    fn push_history(&mut self, order_id: i64, status: OrderStatus, changed_by: Option<Uuid>, notes: &str) {
        let id = self.next_id();
        let changed_by_email = changed_by.and_then(|u| self.email_of(u));
        self.history.push(OrderStatusHistory {
            id,
            order_id,
            status,
            changed_by,
            changed_by_email,
            notes: notes.to_owned(),
            created_at: framework::now_time(),
        });
    }

    fn push_payment_history(&mut self, payment_id: i64, old: &str, new: PaymentStatus, notes: &str) {
        let id = self.next_id();
        self.payment_history.push(PaymentHistory {
            id,
            payment_id,
            old_status: old.to_owned(),
            new_status: new.as_str().to_owned(),
            notes: notes.to_owned(),
            created_at: framework::now_time(),
        });
    }
}

/// In-memory stand-in for the shop tables, mirroring the SQL guards.
#[derive(Clone, Default)]
pub struct MemoryShop {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryShop {
    pub fn with_catalog() -> Self {
        let shop = Self::default();
        shop.add_product(1, "Salteña", Decimal::new(800, 2), true, 15);
        shop.add_product(2, "Pique macho", Decimal::new(4500, 2), true, 30);
        shop.add_product(3, "Api morado", Decimal::new(600, 2), false, 5);
        shop
    }

    pub fn add_product(&self, id: i32, name: &str, price: Decimal, is_available: bool, preparation_time: i32) {
        self.tables.lock().products.push(CatalogProduct {
            id,
            name: name.to_owned(),
            price,
            is_available,
            preparation_time,
        });
    }

    pub fn add_user(&self, email: &str, role: UserRole, is_staff: bool) -> UserAccount {
        let now = framework::now_time();
        let user = UserAccount {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            role,
            phone: None,
            first_name: String::new(),
            last_name: String::new(),
            telegram_chat_id: None,
            telegram_username: None,
            is_telegram_verified: false,
            is_active: true,
            is_staff,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().users.push(user.clone());
        user
    }

    pub fn deactivate(&self, id: Uuid) {
        if let Some(user) = self.tables.lock().users.iter_mut().find(|u| u.id == id) {
            user.is_active = false;
        }
    }

    pub fn interfere_with_next_transition(&self, status: OrderStatus) {
        self.tables.lock().interfering_status = Some(status);
    }

    pub fn order(&self, id: i64) -> Option<UserOrder> {
        self.tables.lock().orders.iter().find(|o| o.id == id).cloned()
    }

    pub fn orders(&self) -> Vec<UserOrder> {
        self.tables.lock().orders.clone()
    }

    pub fn order_history(&self, order_id: i64) -> Vec<OrderStatusHistory> {
        self.tables
            .lock()
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn payment_history(&self, payment_id: i64) -> Vec<PaymentHistory> {
        self.tables
            .lock()
            .payment_history
            .iter()
            .filter(|h| h.payment_id == payment_id)
            .cloned()
            .collect()
    }

    pub fn set_order_status(&self, order_id: i64, status: OrderStatus) {
        if let Some(order) = self.tables.lock().order_mut(order_id) {
            order.status = status;
        }
    }
}

pub fn actor(user: &UserAccount) -> Actor {
    Actor::from(user)
}

impl Processor<FindCatalogProducts> for MemoryShop {
    type Output = Vec<CatalogProduct>;
    type Error = sqlx::Error;
    async fn process(&self, input: FindCatalogProducts) -> Result<Vec<CatalogProduct>, sqlx::Error> {
        Ok(self
            .tables
            .lock()
            .products
            .iter()
            .filter(|p| input.ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

impl Processor<FindUserAccountById> for MemoryShop {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    async fn process(&self, input: FindUserAccountById) -> Result<Option<UserAccount>, sqlx::Error> {
        Ok(self.tables.lock().users.iter().find(|u| u.id == input.id).cloned())
    }
}

impl Processor<InsertOrder> for MemoryShop {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    async fn process(&self, input: InsertOrder) -> Result<Option<UserOrder>, sqlx::Error> {
        let mut tables = self.tables.lock();
        if tables.orders.iter().any(|o| o.order_number == input.order_number) {
            return Ok(None);
        }
        let id = tables.next_id();
        let subtotal: Decimal = input
            .items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        let now = framework::now_time();
        let order = UserOrder {
            id,
            order_number: input.order_number,
            client_id: input.client_id,
            client_email: tables.email_of(input.client_id).unwrap_or_default(),
            driver_id: None,
            driver_email: None,
            status: OrderStatus::Pending,
            delivery_latitude: input.delivery_latitude,
            delivery_longitude: input.delivery_longitude,
            delivery_address: input.delivery_address,
            delivery_reference: input.delivery_reference,
            subtotal,
            delivery_fee: input.delivery_fee,
            total: subtotal + input.delivery_fee,
            notes: input.notes,
            created_at: now,
            confirmed_at: None,
            assigned_at: None,
            delivered_at: None,
            updated_at: now,
        };
        for item in input.items {
            let item_id = tables.next_id();
            let preparation_time = tables
                .products
                .iter()
                .find(|p| p.id == item.product_id)
                .map_or(0, |p| p.preparation_time);
            tables.items.push(OrderItem {
                id: item_id,
                order_id: id,
                product_id: item.product_id,
                product_name: item.product_name,
                product_image: String::new(),
                preparation_time,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.unit_price * Decimal::from(item.quantity),
                notes: item.notes,
            });
        }
        tables.orders.push(order.clone());
        tables.push_history(id, OrderStatus::Pending, Some(input.client_id), &input.history_note);
        Ok(Some(order))
    }
}

impl Processor<FindOrderById> for MemoryShop {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    async fn process(&self, input: FindOrderById) -> Result<Option<UserOrder>, sqlx::Error> {
        Ok(self.order(input.id))
    }
}

impl Processor<ListOrderItems> for MemoryShop {
    type Output = Vec<OrderItem>;
    type Error = sqlx::Error;
    async fn process(&self, input: ListOrderItems) -> Result<Vec<OrderItem>, sqlx::Error> {
        Ok(self
            .tables
            .lock()
            .items
            .iter()
            .filter(|i| i.order_id == input.order_id)
            .cloned()
            .collect())
    }
}

impl Processor<ListOrderHistory> for MemoryShop {
    type Output = Vec<OrderStatusHistory>;
    type Error = sqlx::Error;
    async fn process(&self, input: ListOrderHistory) -> Result<Vec<OrderStatusHistory>, sqlx::Error> {
        Ok(self.order_history(input.order_id))
    }
}

impl Processor<ListOrders> for MemoryShop {
    type Output = Vec<UserOrder>;
    type Error = sqlx::Error;
    async fn process(&self, input: ListOrders) -> Result<Vec<UserOrder>, sqlx::Error> {
        let mut orders: Vec<UserOrder> = self
            .tables
            .lock()
            .orders
            .iter()
            .filter(|o| match input.scope {
                OrderScope::All => true,
                OrderScope::Client(id) => o.client_id == id,
                OrderScope::Driver(id) => o.driver_id == Some(id),
            })
            .filter(|o| input.statuses.is_empty() || input.statuses.contains(&o.status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(orders)
    }
}

impl Processor<TransitionOrderStatus> for MemoryShop {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    async fn process(&self, input: TransitionOrderStatus) -> Result<Option<UserOrder>, sqlx::Error> {
        let mut tables = self.tables.lock();
        if let Some(status) = tables.interfering_status.take() {
            if let Some(order) = tables.order_mut(input.order_id) {
                order.status = status;
            }
        }
        let driver_email = input.driver_id.and_then(|id| tables.email_of(id));
        let now = framework::now_time();
        let Some(order) = tables
            .order_mut(input.order_id)
            .filter(|o| o.status == input.from)
        else {
            return Ok(None);
        };
        order.status = input.to;
        if let Some(driver_id) = input.driver_id {
            order.driver_id = Some(driver_id);
            order.driver_email = driver_email;
        }
        match input.to {
            OrderStatus::Confirmed => order.confirmed_at = Some(now),
            OrderStatus::Assigned => order.assigned_at = Some(now),
            OrderStatus::Delivered => order.delivered_at = Some(now),
            _ => {}
        }
        order.updated_at = now;
        let updated = order.clone();
        tables.push_history(input.order_id, input.to, input.changed_by, &input.notes);
        Ok(Some(updated))
    }
}

impl Processor<UpdateDeliveryFee> for MemoryShop {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    async fn process(&self, input: UpdateDeliveryFee) -> Result<Option<UserOrder>, sqlx::Error> {
        let mut tables = self.tables.lock();
        Ok(tables
            .order_mut(input.order_id)
            .filter(|o| !o.status.is_terminal())
            .map(|order| {
                order.delivery_fee = input.delivery_fee;
                order.total = order.subtotal + input.delivery_fee;
                order.clone()
            }))
    }
}

impl Processor<InsertPayment> for MemoryShop {
    type Output = InsertPaymentOutcome;
    type Error = sqlx::Error;
    async fn process(&self, input: InsertPayment) -> Result<InsertPaymentOutcome, sqlx::Error> {
        let mut tables = self.tables.lock();
        let Some(order) = tables.orders.iter().find(|o| o.id == input.order_id).cloned() else {
            return Ok(InsertPaymentOutcome::OrderMissing);
        };
        if order.status != OrderStatus::Pending {
            return Ok(InsertPaymentOutcome::OrderNotPending(order.status));
        }
        if tables
            .payments
            .iter()
            .any(|p| p.order_id == order.id && p.status.is_active())
        {
            return Ok(InsertPaymentOutcome::AlreadyExists);
        }
        if tables.payments.iter().any(|p| p.qr_reference == input.qr_reference) {
            return Ok(InsertPaymentOutcome::ReferenceTaken);
        }
        let id = tables.next_id();
        let now = framework::now_time();
        let payment = Payment {
            id,
            order_id: order.id,
            amount: order.total,
            status: PaymentStatus::Pending,
            qr_reference: input.qr_reference,
            qr_image: String::new(),
            transaction_id: None,
            created_at: now,
            confirmed_at: None,
            updated_at: now,
        };
        tables.payments.push(payment.clone());
        tables.push_payment_history(id, "", PaymentStatus::Pending, &input.notes);
        Ok(InsertPaymentOutcome::Created(payment))
    }
}

impl Processor<AttachPaymentQr> for MemoryShop {
    type Output = ();
    type Error = sqlx::Error;
    async fn process(&self, input: AttachPaymentQr) -> Result<(), sqlx::Error> {
        if let Some(payment) = self
            .tables
            .lock()
            .payments
            .iter_mut()
            .find(|p| p.id == input.payment_id)
        {
            payment.qr_image = input.qr_image;
        }
        Ok(())
    }
}

impl Processor<ConfirmPayment> for MemoryShop {
    type Output = ConfirmPaymentOutcome;
    type Error = sqlx::Error;
    async fn process(&self, input: ConfirmPayment) -> Result<ConfirmPaymentOutcome, sqlx::Error> {
        let mut tables = self.tables.lock();
        let Some(payment) = tables.payments.iter().find(|p| p.id == input.payment_id).cloned()
        else {
            return Ok(ConfirmPaymentOutcome::PaymentMissing);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(ConfirmPaymentOutcome::PaymentNotPending(payment.status));
        }
        let order_status = tables
            .orders
            .iter()
            .find(|o| o.id == payment.order_id)
            .map_or(OrderStatus::Cancelled, |o| o.status);
        if order_status != OrderStatus::Pending {
            return Ok(ConfirmPaymentOutcome::OrderNotPending(order_status));
        }
        if let Some(transaction_id) = &input.transaction_id {
            let taken = tables
                .payments
                .iter()
                .any(|p| p.id != payment.id && p.transaction_id.as_ref() == Some(transaction_id));
            if taken {
                return Ok(ConfirmPaymentOutcome::TransactionIdTaken);
            }
        }
        let now = framework::now_time();
        let mut confirmed = payment;
        confirmed.status = PaymentStatus::Completed;
        confirmed.confirmed_at = Some(now);
        if input.transaction_id.is_some() {
            confirmed.transaction_id = input.transaction_id;
        }
        if let Some(stored) = tables.payments.iter_mut().find(|p| p.id == confirmed.id) {
            *stored = confirmed.clone();
        }
        tables.push_payment_history(
            confirmed.id,
            PaymentStatus::Pending.as_str(),
            PaymentStatus::Completed,
            &input.payment_note,
        );
        if let Some(order) = tables.order_mut(confirmed.order_id) {
            order.status = OrderStatus::Confirmed;
            order.confirmed_at = Some(now);
        }
        tables.push_history(
            confirmed.order_id,
            OrderStatus::Confirmed,
            Some(input.changed_by),
            &input.order_note,
        );
        Ok(ConfirmPaymentOutcome::Confirmed(confirmed))
    }
}

impl Processor<CancelPayment> for MemoryShop {
    type Output = CancelPaymentOutcome;
    type Error = sqlx::Error;
    async fn process(&self, input: CancelPayment) -> Result<CancelPaymentOutcome, sqlx::Error> {
        let mut tables = self.tables.lock();
        let Some(payment) = tables
            .payments
            .iter_mut()
            .find(|p| p.id == input.payment_id)
        else {
            return Ok(CancelPaymentOutcome::PaymentMissing);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(CancelPaymentOutcome::PaymentNotPending(payment.status));
        }
        payment.status = PaymentStatus::Cancelled;
        let cancelled = payment.clone();
        tables.push_payment_history(
            cancelled.id,
            PaymentStatus::Pending.as_str(),
            PaymentStatus::Cancelled,
            &input.notes,
        );
        Ok(CancelPaymentOutcome::Cancelled(cancelled))
    }
}

impl Processor<FindPaymentById> for MemoryShop {
    type Output = Option<Payment>;
    type Error = sqlx::Error;
    async fn process(&self, input: FindPaymentById) -> Result<Option<Payment>, sqlx::Error> {
        Ok(self
            .tables
            .lock()
            .payments
            .iter()
            .find(|p| p.id == input.id)
            .cloned())
    }
}

impl Processor<ListPayments> for MemoryShop {
    type Output = Vec<Payment>;
    type Error = sqlx::Error;
    async fn process(&self, input: ListPayments) -> Result<Vec<Payment>, sqlx::Error> {
        let tables = self.tables.lock();
        Ok(tables
            .payments
            .iter()
            .filter(|p| {
                input.client_id.is_none_or(|client| {
                    tables
                        .orders
                        .iter()
                        .any(|o| o.id == p.order_id && o.client_id == client)
                })
            })
            .cloned()
            .collect())
    }
}

impl Processor<ListPaymentHistory> for MemoryShop {
    type Output = Vec<PaymentHistory>;
    type Error = sqlx::Error;
    async fn process(&self, input: ListPaymentHistory) -> Result<Vec<PaymentHistory>, sqlx::Error> {
        Ok(self.payment_history(input.payment_id))
    }
}

/// Renderer that always fails, for the degraded QR path.
pub struct BrokenRenderer;

impl QrRenderer for BrokenRenderer {
    fn render(&self, _content: &str) -> Result<String, QrError> {
        Err(QrError::Encode(qrcode::types::QrError::DataTooLong))
    }
}
