use rust_decimal::Decimal;
use serde::Deserialize;

fn default_delivery_fee() -> Decimal {
    Decimal::new(1000, 2)
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderingConfig {
    /// Applied when an order is placed without an explicit fee.
    #[serde(default = "default_delivery_fee")]
    pub default_delivery_fee: Decimal,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            default_delivery_fee: default_delivery_fee(),
        }
    }
}
