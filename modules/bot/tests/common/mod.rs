use bot::BotError;
use bot::api::{
    AuthSession, BotMenu, BotUser, ConfirmPayment, ConfirmedPayment, CreateOrder, CreatePayment,
    GetMenu, GetOrder, MenuCategory, MenuProduct, OrderPayload, OrderSummary, PaymentSummary,
    TelegramAuth,
};
use kanau::processor::Processor;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Backend with a two-product menu that records the orders it takes.
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub orders: Arc<Mutex<Vec<(String, OrderPayload)>>>,
    pub reject_orders: bool,
}

impl Processor<TelegramAuth> for FakeBackend {
    type Output = AuthSession;
    type Error = BotError;

    async fn process(&self, input: TelegramAuth) -> Result<AuthSession, BotError> {
        Ok(AuthSession {
            user: BotUser {
                id: Uuid::new_v4(),
                email: format!("telegram_{}@placeholder.invalid", input.chat_id),
                first_name: String::new(),
            },
            created: true,
            access: "access-token".to_owned(),
            refresh: "refresh-token".to_owned(),
        })
    }
}

impl Processor<GetMenu> for FakeBackend {
    type Output = BotMenu;
    type Error = BotError;

    async fn process(&self, _: GetMenu) -> Result<BotMenu, BotError> {
        Ok(BotMenu {
            categories: vec![MenuCategory {
                id: 1,
                name: "Mains".to_owned(),
                products: vec![
                    MenuProduct {
                        id: 1,
                        name: "Salteña".to_owned(),
                        description: String::new(),
                        price: Decimal::new(800, 2),
                        preparation_time: 15,
                    },
                    MenuProduct {
                        id: 2,
                        name: "Pique macho".to_owned(),
                        description: String::new(),
                        price: Decimal::new(4500, 2),
                        preparation_time: 30,
                    },
                ],
            }],
        })
    }
}

impl Processor<CreateOrder> for FakeBackend {
    type Output = OrderSummary;
    type Error = BotError;

    async fn process(&self, input: CreateOrder) -> Result<OrderSummary, BotError> {
        if self.reject_orders {
            return Err(BotError::Status {
                status: 400,
                body: r#"{"error":"product_unavailable"}"#.to_owned(),
            });
        }
        let subtotal: Decimal = input
            .payload
            .items
            .iter()
            .map(|i| {
                let price = if i.product_id == 1 { 800 } else { 4500 };
                Decimal::new(price, 2) * Decimal::from(i.quantity)
            })
            .sum();
        let mut orders = self.orders.lock();
        orders.push((input.access, input.payload));
        Ok(OrderSummary {
            id: orders.len() as i64,
            order_number: "ORD-20261018-AB12".to_owned(),
            status: "pending".to_owned(),
            status_display: "Pending".to_owned(),
            total: subtotal + Decimal::new(1000, 2),
        })
    }
}

impl Processor<GetOrder> for FakeBackend {
    type Output = OrderSummary;
    type Error = BotError;

    async fn process(&self, input: GetOrder) -> Result<OrderSummary, BotError> {
        Ok(OrderSummary {
            id: input.order_id,
            order_number: "ORD-20261018-AB12".to_owned(),
            status: "confirmed".to_owned(),
            status_display: "Confirmed".to_owned(),
            total: Decimal::new(7100, 2),
        })
    }
}

impl Processor<CreatePayment> for FakeBackend {
    type Output = PaymentSummary;
    type Error = BotError;

    async fn process(&self, input: CreatePayment) -> Result<PaymentSummary, BotError> {
        Ok(PaymentSummary {
            id: 9,
            order: input.order_id,
            amount: Decimal::new(7100, 2),
            status: "pending".to_owned(),
            qr_reference: "QR-0123456789AB".to_owned(),
            qr_code: "data:image/svg+xml;base64,".to_owned(),
        })
    }
}

impl Processor<ConfirmPayment> for FakeBackend {
    type Output = ConfirmedPayment;
    type Error = BotError;

    async fn process(&self, input: ConfirmPayment) -> Result<ConfirmedPayment, BotError> {
        Ok(ConfirmedPayment {
            message: "Payment confirmed, order confirmed".to_owned(),
            order_status: "Confirmed".to_owned(),
            payment: PaymentSummary {
                id: input.payment_id,
                order: 1,
                amount: Decimal::new(7100, 2),
                status: "completed".to_owned(),
                qr_reference: "QR-0123456789AB".to_owned(),
                qr_code: String::new(),
            },
        })
    }
}
