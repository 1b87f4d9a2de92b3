//! Drives one chat through the ordering conversation.
//!
//! The session mutex is never held across a backend call: each turn checks
//! the transition, talks to the backend, then commits the new state.

use crate::api::{
    BotApi, BotMenu, ConfirmPayment, ConfirmedPayment, CreateOrder, CreatePayment, GetMenu,
    GetOrder, OrderSummary, PaymentSummary, TelegramAuth,
};
use crate::cart::CartLine;
use crate::config::{BotConfig, BotMode};
use crate::conversation::{ConversationState, Event, UnexpectedEvent};
use crate::error::BotError;
use crate::session::{BotSession, PendingLine, SessionStore};
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{info, instrument, warn};

const MAX_QUANTITY: u32 = 99;

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Unexpected(#[from] UnexpectedEvent),
    #[error(transparent)]
    Backend(#[from] BotError),
    #[error("product {0} is not on the menu")]
    UnknownProduct(i32),
    #[error("quantity must be a whole number between 1 and 99")]
    InvalidQuantity,
    #[error("the cart is empty")]
    EmptyCart,
    #[error("location could not be read")]
    InvalidLocation,
    #[error("there is no order to pay for")]
    NoOrder,
}

#[derive(Debug)]
pub enum Reply {
    OpenMiniApp { url: String },
    Welcome { email: String, created: bool },
    Menu(BotMenu),
    AskQuantity { product: String },
    AskNotes,
    Cart { lines: Vec<CartLine>, subtotal: Decimal },
    AskLocation,
    OrderPlaced(OrderSummary),
    PaymentQr(PaymentSummary),
    PaymentConfirmed(ConfirmedPayment),
    OrderStatus(OrderSummary),
    BackToMenu,
    /// Input that fits no step; repeats what the current step wants.
    Prompt(ConversationState),
}

pub struct Dispatcher<A> {
    api: A,
    mode: BotMode,
    sessions: SessionStore,
}

impl<A: BotApi> Dispatcher<A> {
    pub fn new(api: A, config: &BotConfig) -> Self {
        Self {
            api,
            mode: config.mode.clone(),
            sessions: SessionStore::new(config.session_capacity, config.session_ttl()),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Where the chat is in the conversation.
    pub fn state(&self, chat_id: i64) -> ConversationState {
        self.with(chat_id, |s| s.state)
    }

    fn with<R>(&self, chat_id: i64, f: impl FnOnce(&mut BotSession) -> R) -> R {
        self.sessions.with_session(chat_id, Instant::now(), f)
    }

    /// Validates `event` against the current state without applying it.
    fn expect(&self, chat_id: i64, event: Event) -> Result<ConversationState, TurnError> {
        Ok(self.with(chat_id, |s| s.state.next(event))?)
    }

    fn access(&self, chat_id: i64) -> Result<String, TurnError> {
        self.with(chat_id, |s| s.access.clone())
            .ok_or(TurnError::Backend(BotError::NotAuthenticated))
    }

    #[instrument(skip(self, username), err)]
    pub async fn start(&self, chat_id: i64, username: Option<String>) -> Result<Reply, TurnError> {
        self.with(chat_id, BotSession::reset);
        if let BotMode::MiniApp { web_app_url } = &self.mode {
            return Ok(Reply::OpenMiniApp {
                url: web_app_url.clone(),
            });
        }
        let session = self
            .api
            .process(TelegramAuth { chat_id, username })
            .await?;
        info!(created = session.created, "chat signed in");
        let email = session.user.email.clone();
        self.with(chat_id, |s| {
            s.access = Some(session.access);
            s.refresh = Some(session.refresh);
            s.email = Some(session.user.email);
        });
        Ok(Reply::Welcome {
            email,
            created: session.created,
        })
    }

    pub async fn browse_menu(&self, chat_id: i64) -> Result<Reply, TurnError> {
        let next = self.expect(chat_id, Event::BrowseMenu)?;
        let menu = self.api.process(GetMenu).await?;
        self.with(chat_id, |s| s.state = next);
        Ok(Reply::Menu(menu))
    }

    pub async fn choose_product(&self, chat_id: i64, product_id: i32) -> Result<Reply, TurnError> {
        let next = self.expect(chat_id, Event::ChooseProduct)?;
        let menu = self.api.process(GetMenu).await?;
        let product = menu
            .product(product_id)
            .ok_or(TurnError::UnknownProduct(product_id))?;
        self.with(chat_id, |s| {
            s.pending = Some(PendingLine {
                product_id,
                quantity: None,
            });
            s.state = next;
        });
        Ok(Reply::AskQuantity {
            product: product.name.clone(),
        })
    }

    pub fn enter_quantity(&self, chat_id: i64, text: &str) -> Result<Reply, TurnError> {
        self.with(chat_id, |s| {
            let next = s.state.next(Event::EnterQuantity)?;
            let quantity = text
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|q| (1..=MAX_QUANTITY).contains(q))
                .ok_or(TurnError::InvalidQuantity)?;
            let pending = s.pending.as_mut().ok_or(TurnError::InvalidQuantity)?;
            pending.quantity = Some(quantity);
            s.state = next;
            Ok(Reply::AskNotes)
        })
    }

    pub async fn enter_notes(&self, chat_id: i64, text: &str) -> Result<Reply, TurnError> {
        let next = self.expect(chat_id, Event::EnterNotes)?;
        let pending = self.with(chat_id, |s| s.pending.clone());
        let Some(PendingLine {
            product_id,
            quantity: Some(quantity),
        }) = pending
        else {
            return Err(TurnError::InvalidQuantity);
        };
        let menu = self.api.process(GetMenu).await?;
        let product = menu
            .product(product_id)
            .ok_or(TurnError::UnknownProduct(product_id))?;
        Ok(self.with(chat_id, |s| {
            s.cart.add(product, quantity, text);
            s.pending = None;
            s.state = next;
            cart_reply(s)
        }))
    }

    pub async fn add_more(&self, chat_id: i64) -> Result<Reply, TurnError> {
        let next = self.expect(chat_id, Event::AddMore)?;
        let menu = self.api.process(GetMenu).await?;
        self.with(chat_id, |s| s.state = next);
        Ok(Reply::Menu(menu))
    }

    pub fn checkout(&self, chat_id: i64) -> Result<Reply, TurnError> {
        self.with(chat_id, |s| {
            let next = s.state.next(Event::Checkout)?;
            if s.cart.is_empty() {
                return Err(TurnError::EmptyCart);
            }
            s.state = next;
            Ok(Reply::AskLocation)
        })
    }

    pub fn clear_cart(&self, chat_id: i64) -> Result<Reply, TurnError> {
        self.with(chat_id, |s| {
            s.state = s.state.next(Event::ClearCart)?;
            s.cart.clear();
            Ok(Reply::BackToMenu)
        })
    }

    #[instrument(skip(self, reference), err)]
    pub async fn share_location(
        &self,
        chat_id: i64,
        latitude: f64,
        longitude: f64,
        reference: &str,
    ) -> Result<Reply, TurnError> {
        let next = self.expect(chat_id, Event::ShareLocation)?;
        let access = self.access(chat_id)?;
        let payload = self
            .with(chat_id, |s| {
                s.cart.to_order_payload(latitude, longitude, reference, "")
            })
            .ok_or(TurnError::InvalidLocation)?;
        let order = self.api.process(CreateOrder { access, payload }).await?;
        info!(order_id = order.id, order_number = %order.order_number, "order placed from chat");
        self.with(chat_id, |s| {
            s.cart.clear();
            s.last_order_id = Some(order.id);
            s.last_payment_id = None;
            s.state = next;
        });
        Ok(Reply::OrderPlaced(order))
    }

    pub async fn pay_with_qr(&self, chat_id: i64) -> Result<Reply, TurnError> {
        let next = self.expect(chat_id, Event::PayWithQr)?;
        let access = self.access(chat_id)?;
        let order_id = self
            .with(chat_id, |s| s.last_order_id)
            .ok_or(TurnError::NoOrder)?;
        let payment = self.api.process(CreatePayment { access, order_id }).await?;
        self.with(chat_id, |s| {
            s.last_payment_id = Some(payment.id);
            s.state = next;
        });
        Ok(Reply::PaymentQr(payment))
    }

    pub async fn confirm_payment(&self, chat_id: i64) -> Result<Reply, TurnError> {
        let next = self.expect(chat_id, Event::PaymentConfirmed)?;
        let access = self.access(chat_id)?;
        let payment_id = self
            .with(chat_id, |s| s.last_payment_id)
            .ok_or(TurnError::NoOrder)?;
        let confirmed = self
            .api
            .process(ConfirmPayment { access, payment_id })
            .await?;
        self.with(chat_id, |s| s.state = next);
        Ok(Reply::PaymentConfirmed(confirmed))
    }

    pub fn cancel_payment(&self, chat_id: i64) -> Result<Reply, TurnError> {
        self.with(chat_id, |s| {
            s.state = s.state.next(Event::CancelPayment)?;
            Ok(Reply::BackToMenu)
        })
    }

    /// Abandons the current step, keeping the sign-in and the last order.
    pub fn back_to_menu(&self, chat_id: i64) -> Reply {
        self.with(chat_id, BotSession::reset);
        Reply::BackToMenu
    }

    /// Status of the last order placed from this chat. Does not move the conversation.
    pub async fn order_status(&self, chat_id: i64) -> Result<Reply, TurnError> {
        let access = self.access(chat_id)?;
        let order_id = self
            .with(chat_id, |s| s.last_order_id)
            .ok_or(TurnError::NoOrder)?;
        match self.api.process(GetOrder { access, order_id }).await {
            Ok(order) => Ok(Reply::OrderStatus(order)),
            Err(err) => {
                warn!(%err, order_id, "order lookup failed");
                Err(err.into())
            }
        }
    }
}

fn cart_reply(session: &BotSession) -> Reply {
    Reply::Cart {
        lines: session.cart.lines().to_vec(),
        subtotal: session.cart.subtotal(),
    }
}
