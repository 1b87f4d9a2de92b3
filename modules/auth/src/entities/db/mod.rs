pub mod user_account;
pub mod user_password;
