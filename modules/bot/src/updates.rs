//! Routes Telegram updates to dispatcher turns.

use crate::api::BotApi;
use crate::conversation::ConversationState;
use crate::dispatcher::{Dispatcher, Reply, TurnError};
use crate::render::{self, Button, Outgoing, PRODUCT_CALLBACK};
use crate::telegram::Update;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Start { username: Option<String> },
    Product(i32),
    Text(String),
    Location { latitude: f64, longitude: f64 },
    /// A tap on a button this bot no longer knows.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatUpdate {
    pub chat_id: i64,
    /// Set for button taps; Telegram keeps a spinner until it is answered.
    pub callback_id: Option<String>,
    pub incoming: Incoming,
}

impl ChatUpdate {
    /// `None` for updates that carry nothing the bot acts on.
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(query) = update.callback_query {
            let chat_id = query.message.map_or(query.from.id, |m| m.chat.id);
            let incoming = query
                .data
                .as_deref()
                .and_then(|d| d.strip_prefix(PRODUCT_CALLBACK))
                .and_then(|id| id.parse().ok())
                .map_or(Incoming::Unknown, Incoming::Product);
            return Some(Self {
                chat_id,
                callback_id: Some(query.id),
                incoming,
            });
        }
        let message = update.message?;
        let incoming = if let Some(location) = message.location {
            Incoming::Location {
                latitude: location.latitude,
                longitude: location.longitude,
            }
        } else {
            let text = message.text?;
            if is_start(&text) {
                Incoming::Start {
                    username: message.from.and_then(|u| u.username),
                }
            } else {
                Incoming::Text(text)
            }
        };
        Some(Self {
            chat_id: message.chat.id,
            callback_id: None,
            incoming,
        })
    }
}

/// `/start`, `/start <payload>` and `/start@SomeBot`.
fn is_start(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}

/// Runs one turn and renders whatever it produced.
pub async fn handle<A: BotApi>(
    dispatcher: &Dispatcher<A>,
    chat_id: i64,
    incoming: Incoming,
) -> Outgoing {
    match route(dispatcher, chat_id, incoming).await {
        Ok(reply) => render::reply(&reply, dispatcher.state(chat_id)),
        Err(err) => {
            match &err {
                TurnError::Backend(e) => warn!(chat_id, error = %e, "turn failed"),
                e => debug!(chat_id, error = %e, "turn rejected"),
            }
            render::failure(&err, dispatcher.state(chat_id))
        }
    }
}

async fn route<A: BotApi>(
    dispatcher: &Dispatcher<A>,
    chat_id: i64,
    incoming: Incoming,
) -> Result<Reply, TurnError> {
    use ConversationState as S;
    match incoming {
        Incoming::Start { username } => dispatcher.start(chat_id, username).await,
        Incoming::Product(id) => dispatcher.choose_product(chat_id, id).await,
        Incoming::Location {
            latitude,
            longitude,
        } => {
            dispatcher
                .share_location(chat_id, latitude, longitude, "")
                .await
        }
        Incoming::Unknown => Ok(Reply::Prompt(dispatcher.state(chat_id))),
        Incoming::Text(text) => {
            let state = dispatcher.state(chat_id);
            // Free-text steps take anything but their own buttons as the answer.
            match (state, Button::from_label(&text)) {
                (_, Some(Button::Cancel)) => press(dispatcher, chat_id, Button::Cancel).await,
                (S::Notes, Some(Button::NoNotes)) => dispatcher.enter_notes(chat_id, "").await,
                (S::Quantity, _) => dispatcher.enter_quantity(chat_id, &text),
                (S::Notes, _) => dispatcher.enter_notes(chat_id, &text).await,
                (_, Some(button)) => press(dispatcher, chat_id, button).await,
                (state, None) => Ok(Reply::Prompt(state)),
            }
        }
    }
}

async fn press<A: BotApi>(
    dispatcher: &Dispatcher<A>,
    chat_id: i64,
    button: Button,
) -> Result<Reply, TurnError> {
    match button {
        Button::Menu => dispatcher.browse_menu(chat_id).await,
        Button::MyOrder => dispatcher.order_status(chat_id).await,
        Button::AddMore => dispatcher.add_more(chat_id).await,
        Button::Checkout => dispatcher.checkout(chat_id),
        Button::ClearCart => dispatcher.clear_cart(chat_id),
        Button::PayWithQr => dispatcher.pay_with_qr(chat_id).await,
        Button::Paid => dispatcher.confirm_payment(chat_id).await,
        Button::Cancel => match dispatcher.state(chat_id) {
            ConversationState::Payment | ConversationState::AwaitingPayment => {
                dispatcher.cancel_payment(chat_id)
            }
            ConversationState::Cart => dispatcher.clear_cart(chat_id),
            _ => Ok(dispatcher.back_to_menu(chat_id)),
        },
        // Typed outside the notes step, or a location button on a client that sent text.
        Button::NoNotes | Button::ShareLocation => Ok(Reply::Prompt(dispatcher.state(chat_id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::decode_envelope;

    fn parse(json: &str) -> Option<ChatUpdate> {
        let body = format!(r#"{{"ok": true, "result": [{json}]}}"#);
        let mut updates: Vec<Update> = decode_envelope(&body).unwrap();
        ChatUpdate::from_update(updates.remove(0))
    }

    #[test]
    fn start_command_variants() {
        assert!(is_start("/start"));
        assert!(is_start("/start web"));
        assert!(is_start("/start@DeliveryBot"));
        assert!(!is_start("/started"));
        assert!(!is_start("start"));
    }

    #[test]
    fn messages_become_chat_inputs() {
        let start = parse(
            r#"{"update_id": 1, "message": {"message_id": 1, "chat": {"id": 7},
                "from": {"id": 7, "username": "ana"}, "text": "/start"}}"#,
        )
        .unwrap();
        assert_eq!(start.chat_id, 7);
        assert_eq!(
            start.incoming,
            Incoming::Start {
                username: Some("ana".to_owned())
            }
        );

        let location = parse(
            r#"{"update_id": 2, "message": {"message_id": 2, "chat": {"id": 7},
                "location": {"latitude": -16.5, "longitude": -68.15}}}"#,
        )
        .unwrap();
        assert_eq!(
            location.incoming,
            Incoming::Location {
                latitude: -16.5,
                longitude: -68.15
            }
        );

        let sticker = parse(r#"{"update_id": 3, "message": {"message_id": 3, "chat": {"id": 7}}}"#);
        assert!(sticker.is_none());
        assert!(parse(r#"{"update_id": 4}"#).is_none());
    }

    #[test]
    fn taps_keep_their_callback_id() {
        let tap = parse(
            r#"{"update_id": 5, "callback_query": {"id": "cb-9", "from": {"id": 7},
                "message": {"message_id": 4, "chat": {"id": -100}}, "data": "product:12"}}"#,
        )
        .unwrap();
        assert_eq!(tap.chat_id, -100);
        assert_eq!(tap.callback_id.as_deref(), Some("cb-9"));
        assert_eq!(tap.incoming, Incoming::Product(12));

        let stale = parse(
            r#"{"update_id": 6, "callback_query": {"id": "cb-10", "from": {"id": 7},
                "data": "prod_3"}}"#,
        )
        .unwrap();
        assert_eq!(stale.chat_id, 7);
        assert_eq!(stale.incoming, Incoming::Unknown);
    }
}
