pub mod qr;
pub mod reference;
