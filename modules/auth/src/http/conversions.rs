//! JSON views of account types.

use crate::entities::db::user_account::{UserAccount, UserRole};
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub role_display: &'static str,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub telegram_chat_id: Option<String>,
    pub telegram_username: Option<String>,
    pub is_telegram_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

impl From<UserAccount> for UserView {
    fn from(user: UserAccount) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            role_display: user.role.display_name(),
            phone: user.phone,
            first_name: user.first_name,
            last_name: user.last_name,
            telegram_chat_id: user.telegram_chat_id,
            telegram_username: user.telegram_username,
            is_telegram_verified: user.is_telegram_verified,
            created_at: framework::to_utc(user.created_at),
        }
    }
}
