//! Turns dispatcher replies into chat messages with keyboards.

use crate::api::BotMenu;
use crate::cart::CartLine;
use crate::conversation::ConversationState;
use crate::dispatcher::{Reply, TurnError};
use crate::error::BotError;
use crate::telegram::{InlineButton, KeyboardButton, ReplyMarkup, SendMessage};
use rust_decimal::Decimal;
use std::fmt::Write;

/// Callback data prefix of the product buttons under the menu.
pub const PRODUCT_CALLBACK: &str = "product:";

/// Reply-keyboard buttons. The chat sends the label back as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Menu,
    MyOrder,
    NoNotes,
    AddMore,
    Checkout,
    ClearCart,
    ShareLocation,
    PayWithQr,
    Paid,
    Cancel,
}

impl Button {
    const ALL: [Self; 10] = [
        Self::Menu,
        Self::MyOrder,
        Self::NoNotes,
        Self::AddMore,
        Self::Checkout,
        Self::ClearCart,
        Self::ShareLocation,
        Self::PayWithQr,
        Self::Paid,
        Self::Cancel,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Menu => "Menu",
            Self::MyOrder => "My order",
            Self::NoNotes => "No notes",
            Self::AddMore => "Add more",
            Self::Checkout => "Checkout",
            Self::ClearCart => "Clear cart",
            Self::ShareLocation => "Share location",
            Self::PayWithQr => "Pay with QR",
            Self::Paid => "I have paid",
            Self::Cancel => "Cancel",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.label().eq_ignore_ascii_case(text))
    }

    fn key(self) -> KeyboardButton {
        match self {
            Self::ShareLocation => KeyboardButton::location(self.label()),
            _ => KeyboardButton::text(self.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

impl Outgoing {
    pub fn into_message(self, chat_id: i64) -> SendMessage {
        SendMessage {
            chat_id,
            text: self.text,
            reply_markup: self.markup,
        }
    }
}

fn rows(rows: &[&[Button]]) -> ReplyMarkup {
    ReplyMarkup::Keyboard {
        keyboard: rows
            .iter()
            .map(|row| row.iter().map(|b| b.key()).collect())
            .collect(),
        resize_keyboard: true,
    }
}

/// The reply keyboard offered while the chat sits in `state`.
pub fn keyboard(state: ConversationState) -> ReplyMarkup {
    use Button as B;
    use ConversationState as S;
    match state {
        S::Menu | S::Completed => rows(&[&[B::Menu, B::MyOrder]]),
        S::SelectingProduct => rows(&[&[B::Cancel]]),
        S::Quantity => ReplyMarkup::Keyboard {
            keyboard: vec![
                ["1", "2", "3"].map(KeyboardButton::text).to_vec(),
                ["4", "5"].map(KeyboardButton::text).to_vec(),
                vec![B::Cancel.key()],
            ],
            resize_keyboard: true,
        },
        S::Notes => rows(&[&[B::NoNotes], &[B::Cancel]]),
        S::Cart => rows(&[&[B::AddMore, B::Checkout], &[B::ClearCart]]),
        S::Location => rows(&[&[B::ShareLocation], &[B::Cancel]]),
        S::Payment => rows(&[&[B::PayWithQr], &[B::Cancel]]),
        S::AwaitingPayment => rows(&[&[B::Paid], &[B::Cancel]]),
    }
}

fn money(amount: Decimal) -> String {
    format!("Bs. {amount:.2}")
}

fn menu(menu: &BotMenu) -> Outgoing {
    let mut text = String::from("Our menu. Tap a product to add it.\n");
    let mut buttons = Vec::new();
    for category in menu.categories.iter().filter(|c| !c.products.is_empty()) {
        let _ = write!(text, "\n{}\n", category.name);
        for product in &category.products {
            let label = format!("{} - {}", product.name, money(product.price));
            let _ = writeln!(text, "  {label}");
            buttons.push(vec![InlineButton::callback(
                label,
                format!("{PRODUCT_CALLBACK}{}", product.id),
            )]);
        }
    }
    if buttons.is_empty() {
        return Outgoing {
            text: "Nothing is available right now.".to_owned(),
            markup: Some(keyboard(ConversationState::SelectingProduct)),
        };
    }
    Outgoing {
        text,
        markup: Some(ReplyMarkup::Inline {
            inline_keyboard: buttons,
        }),
    }
}

fn cart(lines: &[CartLine], subtotal: Decimal) -> String {
    let mut text = String::from("Your cart:\n");
    for line in lines {
        let _ = write!(text, "\n{} x {}", line.quantity, line.name);
        if !line.notes.is_empty() {
            let _ = write!(text, " ({})", line.notes);
        }
        let _ = write!(text, " - {}", money(line.subtotal()));
    }
    let _ = write!(text, "\n\nSubtotal: {}", money(subtotal));
    text
}

/// `state` is where the turn left the chat; it picks the reply keyboard.
pub fn reply(reply: &Reply, state: ConversationState) -> Outgoing {
    let text = match reply {
        Reply::Menu(m) => return menu(m),
        Reply::OpenMiniApp { url } => {
            return Outgoing {
                text: "Order from the shop app.".to_owned(),
                markup: Some(ReplyMarkup::Inline {
                    inline_keyboard: vec![vec![InlineButton::web_app("Open the shop", url)]],
                }),
            };
        }
        Reply::Welcome { email, created } => {
            let greeting = if *created { "Welcome!" } else { "Welcome back!" };
            format!("{greeting} You are signed in as {email}.")
        }
        Reply::AskQuantity { product } => format!("How many {product} would you like?"),
        Reply::AskNotes => state.prompt().to_owned(),
        Reply::Cart { lines, subtotal } => cart(lines, *subtotal),
        Reply::AskLocation => state.prompt().to_owned(),
        Reply::OrderPlaced(order) => format!(
            "Order {} placed. Total: {}.\nPay with a QR code?",
            order.order_number,
            money(order.total)
        ),
        Reply::PaymentQr(payment) => format!(
            "Pay {} using QR reference {}.\nTap \"{}\" once it is done.",
            money(payment.amount),
            payment.qr_reference,
            Button::Paid.label()
        ),
        Reply::PaymentConfirmed(confirmed) => format!(
            "{}\nOrder status: {}",
            confirmed.message, confirmed.order_status
        ),
        Reply::OrderStatus(order) => {
            let status = if order.status_display.is_empty() {
                &order.status
            } else {
                &order.status_display
            };
            format!(
                "Order {}: {status}. Total: {}.",
                order.order_number,
                money(order.total)
            )
        }
        Reply::BackToMenu => format!("Back to the menu. {}", state.prompt()),
        Reply::Prompt(at) => at.prompt().to_owned(),
    };
    Outgoing {
        text,
        markup: Some(keyboard(state)),
    }
}

/// What the chat sees when a turn fails. The state did not move.
pub fn failure(err: &TurnError, state: ConversationState) -> Outgoing {
    let text = match err {
        TurnError::Unexpected(_) => format!("That does not fit right now. {}", state.prompt()),
        TurnError::Backend(BotError::NotAuthenticated) => {
            "You are not signed in. Send /start to begin.".to_owned()
        }
        TurnError::Backend(e) if e.is_unauthorized() => {
            "Your session has expired. Send /start to sign in again.".to_owned()
        }
        TurnError::Backend(BotError::Status { .. }) => {
            "The shop could not take that. Please try again.".to_owned()
        }
        TurnError::Backend(_) => {
            "The shop is unreachable right now. Please try again in a moment.".to_owned()
        }
        TurnError::UnknownProduct(_) => "That product is no longer on the menu.".to_owned(),
        TurnError::InvalidQuantity => "Send a whole number between 1 and 99.".to_owned(),
        TurnError::EmptyCart => "Your cart is empty.".to_owned(),
        TurnError::InvalidLocation => "That location could not be read. Share it again.".to_owned(),
        TurnError::NoOrder => "You have no order yet.".to_owned(),
    };
    Outgoing {
        text,
        markup: Some(keyboard(state)),
    }
}
