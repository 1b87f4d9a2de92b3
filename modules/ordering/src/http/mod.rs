use crate::config::OrderingConfig;
use crate::services::OrderingStore;
use crate::services::order::OrderService;
use crate::services::payment::PaymentService;
use crate::utils::qr::{QrRenderer, SvgQrRenderer};
use axum::Router;
use axum::body::Bytes;
use framework::sqlx::DatabaseProcessor;
use serde::de::DeserializeOwned;

mod order;
mod payment;
pub mod views;

pub struct OrderingState<S = DatabaseProcessor, R = SvgQrRenderer> {
    pub orders: OrderService<S>,
    pub payments: PaymentService<S, R>,
}

impl<S: Clone, R> Clone for OrderingState<S, R> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            payments: self.payments.clone(),
        }
    }
}

impl<S: OrderingStore, R: QrRenderer> OrderingState<S, R> {
    pub fn new(config: &OrderingConfig, store: S, renderer: R) -> Self {
        Self {
            orders: OrderService::new(store.clone(), config.default_delivery_fee),
            payments: PaymentService::new(store, renderer),
        }
    }
}

pub fn router<S: OrderingStore, R: QrRenderer>(state: OrderingState<S, R>) -> Router {
    order::routes::<S, R>()
        .merge(payment::routes::<S, R>())
        .with_state(state)
}

/// Bodies that may be left out entirely.
fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, crate::OrderingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| crate::OrderingError::invalid_input(format!("malformed body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, serde::Deserialize, PartialEq)]
    struct Reason {
        reason: Option<String>,
    }

    #[test]
    fn empty_body_means_defaults() {
        let parsed: Reason = optional_json(&Bytes::new()).unwrap();
        assert_eq!(parsed, Reason::default());
    }

    #[test]
    fn present_body_is_parsed() {
        let parsed: Reason = optional_json(&Bytes::from_static(br#"{"reason":"late"}"#)).unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("late"));
        assert!(optional_json::<Reason>(&Bytes::from_static(b"{nope")).is_err());
    }
}
