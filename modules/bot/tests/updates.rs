mod common;

use bot::config::BotConfig;
use bot::conversation::ConversationState;
use bot::dispatcher::Dispatcher;
use bot::render::{self, Outgoing};
use bot::telegram::ReplyMarkup;
use bot::updates::{self, Incoming};
use common::FakeBackend;

const CHAT: i64 = 7;

fn dispatcher(backend: FakeBackend) -> Dispatcher<FakeBackend> {
    Dispatcher::new(backend, &BotConfig::default())
}

async fn send(d: &Dispatcher<FakeBackend>, incoming: Incoming) -> Outgoing {
    updates::handle(d, CHAT, incoming).await
}

async fn say(d: &Dispatcher<FakeBackend>, text: &str) -> Outgoing {
    send(d, Incoming::Text(text.to_owned())).await
}

fn location() -> Incoming {
    Incoming::Location {
        latitude: -16.5,
        longitude: -68.15,
    }
}

/// Signed in, one Salteña in the cart, waiting for the location.
async fn ready_to_deliver(d: &Dispatcher<FakeBackend>) {
    send(d, Incoming::Start { username: None }).await;
    say(d, "Menu").await;
    send(d, Incoming::Product(1)).await;
    say(d, "1").await;
    say(d, "No notes").await;
    say(d, "Checkout").await;
    assert_eq!(d.state(CHAT), ConversationState::Location);
}

#[tokio::test]
async fn chat_orders_and_pays_through_buttons() {
    let backend = FakeBackend::default();
    let d = dispatcher(backend.clone());

    let welcome = send(
        &d,
        Incoming::Start {
            username: Some("ana".to_owned()),
        },
    )
    .await;
    assert!(welcome.text.contains("telegram_7@placeholder.invalid"));
    assert_eq!(welcome.markup, Some(render::keyboard(ConversationState::Menu)));

    let menu = say(&d, "menu").await;
    let Some(ReplyMarkup::Inline { inline_keyboard }) = menu.markup else {
        panic!("the menu should list products: {menu:?}");
    };
    assert_eq!(
        inline_keyboard[0][0].callback_data.as_deref(),
        Some("product:1")
    );

    let ask = send(&d, Incoming::Product(1)).await;
    assert_eq!(ask.text, "How many Salteña would you like?");

    let wrong = say(&d, "two").await;
    assert!(wrong.text.contains("whole number"));
    assert_eq!(d.state(CHAT), ConversationState::Quantity);

    say(&d, "2").await;
    let cart = say(&d, "No notes").await;
    assert!(cart.text.contains("2 x Salteña - Bs. 16.00"), "{}", cart.text);
    assert_eq!(cart.markup, Some(render::keyboard(ConversationState::Cart)));

    let where_to = say(&d, "Checkout").await;
    assert_eq!(
        where_to.markup,
        Some(render::keyboard(ConversationState::Location))
    );
    let typed = say(&d, "next to the market").await;
    assert_eq!(typed.text, ConversationState::Location.prompt());

    let placed = send(&d, location()).await;
    assert!(placed.text.contains("ORD-20261018-AB12"), "{}", placed.text);
    assert!(placed.text.contains("Bs. 26.00"));
    assert_eq!(backend.orders.lock().len(), 1);

    let qr = say(&d, "Pay with QR").await;
    assert!(qr.text.contains("QR-0123456789AB"));
    let paid = say(&d, "I have paid").await;
    assert!(paid.text.contains("Order status: Confirmed"));
    assert_eq!(d.state(CHAT), ConversationState::Completed);

    let status = say(&d, "My order").await;
    assert!(status.text.starts_with("Order ORD-20261018-AB12: Confirmed."));
}

#[tokio::test]
async fn free_text_steps_take_labels_as_answers() {
    let d = dispatcher(FakeBackend::default());
    send(&d, Incoming::Start { username: None }).await;
    say(&d, "Menu").await;
    send(&d, Incoming::Product(2)).await;

    let not_a_number = say(&d, "Checkout").await;
    assert!(not_a_number.text.contains("whole number"));
    say(&d, "1").await;

    let cart = say(&d, "Menu").await;
    assert!(cart.text.contains("1 x Pique macho (Menu)"), "{}", cart.text);
}

#[tokio::test]
async fn cancel_backs_out_of_the_current_step() {
    let d = dispatcher(FakeBackend::default());
    send(&d, Incoming::Start { username: None }).await;
    say(&d, "Menu").await;
    send(&d, Incoming::Product(1)).await;
    let back = say(&d, "Cancel").await;
    assert_eq!(d.state(CHAT), ConversationState::Menu);
    assert_eq!(back.markup, Some(render::keyboard(ConversationState::Menu)));

    ready_to_deliver(&d).await;
    send(&d, location()).await;
    say(&d, "Pay with QR").await;
    assert_eq!(d.state(CHAT), ConversationState::AwaitingPayment);
    say(&d, "cancel").await;
    assert_eq!(d.state(CHAT), ConversationState::Menu);
    assert!(say(&d, "My order").await.text.contains("ORD-20261018-AB12"));
}

#[tokio::test]
async fn out_of_turn_input_repeats_the_prompt() {
    let d = dispatcher(FakeBackend::default());
    send(&d, Incoming::Start { username: None }).await;

    let early = say(&d, "I have paid").await;
    assert!(early.text.starts_with("That does not fit right now."));
    assert_eq!(d.state(CHAT), ConversationState::Menu);

    let stale = send(&d, Incoming::Unknown).await;
    assert_eq!(stale.text, ConversationState::Menu.prompt());
    let chatter = say(&d, "hello?").await;
    assert_eq!(chatter.text, ConversationState::Menu.prompt());
}

#[tokio::test]
async fn orders_need_a_signed_in_chat() {
    let backend = FakeBackend::default();
    let d = dispatcher(backend.clone());
    say(&d, "Menu").await;
    send(&d, Incoming::Product(1)).await;
    say(&d, "3").await;
    say(&d, "").await;
    say(&d, "Checkout").await;

    let refused = send(&d, location()).await;
    assert!(refused.text.contains("/start"), "{}", refused.text);
    assert_eq!(d.state(CHAT), ConversationState::Location);
    assert!(backend.orders.lock().is_empty());
}

#[tokio::test]
async fn rejected_order_says_so_and_keeps_the_cart() {
    let d = dispatcher(FakeBackend {
        reject_orders: true,
        ..FakeBackend::default()
    });
    ready_to_deliver(&d).await;
    let refused = send(&d, location()).await;
    assert!(refused.text.contains("could not take that"));
    assert_eq!(
        refused.markup,
        Some(render::keyboard(ConversationState::Location))
    );
}
