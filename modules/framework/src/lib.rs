#![forbid(unsafe_code, clippy::unwrap_used, clippy::panic, clippy::expect_used)]

pub mod error;
pub mod shutdown;
pub mod sqlx;
pub mod telemetry;

pub use error::Error;

pub fn now_time() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}

/// Render a stored UTC timestamp for API responses.
pub fn to_utc(time: time::PrimitiveDateTime) -> time::OffsetDateTime {
    time.assume_utc()
}
