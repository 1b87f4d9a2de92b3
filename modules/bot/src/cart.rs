use crate::api::{MenuProduct, OrderItemPayload, OrderPayload};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub notes: String,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Lines picked in chat before the order exists on the backend.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

/// Free-text answers that mean "no notes".
pub fn normalize_notes(raw: &str) -> String {
    let trimmed = raw.trim();
    if ["none", "no", "-"]
        .iter()
        .any(|skip| trimmed.eq_ignore_ascii_case(skip))
    {
        String::new()
    } else {
        trimmed.to_owned()
    }
}

impl Cart {
    /// Same product with the same notes merges into one line.
    pub fn add(&mut self, product: &MenuProduct, quantity: u32, notes: &str) {
        let notes = normalize_notes(notes);
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product.id && l.notes == notes)
        {
            line.quantity += quantity;
            return;
        }
        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            notes,
        });
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Coordinates come from Telegram as floats; the backend stores six decimals.
    pub fn to_order_payload(
        &self,
        latitude: f64,
        longitude: f64,
        reference: &str,
        notes: &str,
    ) -> Option<OrderPayload> {
        let delivery_latitude = Decimal::try_from(latitude).ok()?.round_dp(6);
        let delivery_longitude = Decimal::try_from(longitude).ok()?.round_dp(6);
        Some(OrderPayload {
            delivery_latitude,
            delivery_longitude,
            delivery_reference: reference.trim().to_owned(),
            notes: normalize_notes(notes),
            items: self
                .lines
                .iter()
                .map(|l| OrderItemPayload {
                    product_id: l.product_id,
                    quantity: l.quantity,
                    notes: l.notes.clone(),
                })
                .collect(),
        })
    }
}
