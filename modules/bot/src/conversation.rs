use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Menu,
    SelectingProduct,
    Quantity,
    Notes,
    Cart,
    Location,
    Payment,
    AwaitingPayment,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// `/start`, valid everywhere.
    Start,
    BrowseMenu,
    ChooseProduct,
    EnterQuantity,
    EnterNotes,
    AddMore,
    Checkout,
    ClearCart,
    ShareLocation,
    PayWithQr,
    CancelPayment,
    PaymentConfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{event:?} is not expected while in {state}")]
pub struct UnexpectedEvent {
    pub state: ConversationState,
    pub event: Event,
}

impl ConversationState {
    pub fn next(self, event: Event) -> Result<Self, UnexpectedEvent> {
        use ConversationState as S;
        use Event as E;
        let next = match (self, event) {
            (_, E::Start) => S::Menu,
            (S::Menu | S::Completed, E::BrowseMenu) => S::SelectingProduct,
            (S::SelectingProduct, E::ChooseProduct) => S::Quantity,
            (S::Quantity, E::EnterQuantity) => S::Notes,
            (S::Notes, E::EnterNotes) => S::Cart,
            (S::Cart, E::AddMore) => S::SelectingProduct,
            (S::Cart, E::Checkout) => S::Location,
            (S::Cart, E::ClearCart) => S::Menu,
            (S::Location, E::ShareLocation) => S::Payment,
            (S::Payment, E::PayWithQr) => S::AwaitingPayment,
            (S::Payment | S::AwaitingPayment, E::CancelPayment) => S::Menu,
            (S::AwaitingPayment, E::PaymentConfirmed) => S::Completed,
            (state, event) => return Err(UnexpectedEvent { state, event }),
        };
        Ok(next)
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Self::Menu => "What would you like to do?",
            Self::SelectingProduct => "Pick a product from the menu.",
            Self::Quantity => "How many would you like?",
            Self::Notes => "Any notes for this item? Tap \"No notes\" to skip.",
            Self::Cart => "Add more, check out, or clear the cart.",
            Self::Location => "Share your delivery location.",
            Self::Payment => "Pay with a QR code?",
            Self::AwaitingPayment => "Scan the QR code, then confirm the payment.",
            Self::Completed => "Your order is confirmed.",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Menu => "menu",
            Self::SelectingProduct => "selecting_product",
            Self::Quantity => "quantity",
            Self::Notes => "notes",
            Self::Cart => "cart",
            Self::Location => "location",
            Self::Payment => "payment",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::ConversationState as S;
    use super::Event as E;
    use super::*;

    #[test]
    fn happy_path_reaches_completed() {
        let path = [
            E::BrowseMenu,
            E::ChooseProduct,
            E::EnterQuantity,
            E::EnterNotes,
            E::AddMore,
            E::ChooseProduct,
            E::EnterQuantity,
            E::EnterNotes,
            E::Checkout,
            E::ShareLocation,
            E::PayWithQr,
            E::PaymentConfirmed,
        ];
        let end = path
            .into_iter()
            .try_fold(S::Menu, ConversationState::next)
            .unwrap();
        assert_eq!(end, S::Completed);
        assert_eq!(end.next(E::BrowseMenu), Ok(S::SelectingProduct));
    }

    #[test]
    fn start_resets_from_anywhere() {
        for state in [S::Quantity, S::Location, S::AwaitingPayment, S::Completed] {
            assert_eq!(state.next(E::Start), Ok(S::Menu));
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        assert_eq!(
            S::Menu.next(E::Checkout),
            Err(UnexpectedEvent {
                state: S::Menu,
                event: E::Checkout
            })
        );
        assert!(S::Quantity.next(E::ShareLocation).is_err());
        assert!(S::Payment.next(E::PaymentConfirmed).is_err());
        assert!(S::Completed.next(E::PayWithQr).is_err());
    }

    #[test]
    fn cart_can_be_abandoned() {
        assert_eq!(S::Cart.next(E::ClearCart), Ok(S::Menu));
        assert_eq!(S::AwaitingPayment.next(E::CancelPayment), Ok(S::Menu));
    }
}
