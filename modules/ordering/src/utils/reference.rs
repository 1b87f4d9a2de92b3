use time::Date;
use time::macros::format_description;
use uuid::Uuid;

fn random_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex.make_ascii_uppercase();
    hex
}

/// `ORD-<YYYYMMDD>-<4 upper hex>`.
pub fn order_number(date: Date) -> String {
    let day = date
        .format(format_description!("[year][month][day]"))
        .unwrap_or_default();
    format!("ORD-{day}-{}", random_hex(4))
}

/// `QR-<12 upper hex>`.
pub fn qr_reference() -> String {
    format!("QR-{}", random_hex(12))
}
