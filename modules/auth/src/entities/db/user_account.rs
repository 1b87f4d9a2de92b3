use framework::sqlx::{DatabaseProcessor, is_unique_violation};
use kanau::processor::Processor;
use tracing::instrument;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    Driver,
}

impl UserRole {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Driver => "Driver",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, sqlx::FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub telegram_chat_id: Option<String>,
    pub telegram_username: Option<String>,
    pub is_telegram_verified: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub struct FindUserAccountByEmail {
    pub email: String,
}

impl Processor<FindUserAccountByEmail> for DatabaseProcessor {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindUserAccountByEmail", err)]
    async fn process(
        &self,
        input: FindUserAccountByEmail,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, email, role, phone, first_name, last_name, telegram_chat_id,
                   telegram_username, is_telegram_verified, is_active, is_staff,
                   created_at, updated_at
            FROM "auth"."user_account"
            WHERE email = $1
            "#,
        )
        .bind(&input.email)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindUserAccountById {
    pub id: Uuid,
}

impl Processor<FindUserAccountById> for DatabaseProcessor {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindUserAccountById", err)]
    async fn process(&self, input: FindUserAccountById) -> Result<Option<UserAccount>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, email, role, phone, first_name, last_name, telegram_chat_id,
                   telegram_username, is_telegram_verified, is_active, is_staff,
                   created_at, updated_at
            FROM "auth"."user_account"
            WHERE id = $1
            "#,
        )
        .bind(input.id)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone)]
pub struct FindUserAccountByTelegramChatId {
    pub chat_id: String,
}

impl Processor<FindUserAccountByTelegramChatId> for DatabaseProcessor {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindUserAccountByTelegramChatId", err)]
    async fn process(
        &self,
        input: FindUserAccountByTelegramChatId,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, email, role, phone, first_name, last_name, telegram_chat_id,
                   telegram_username, is_telegram_verified, is_active, is_staff,
                   created_at, updated_at
            FROM "auth"."user_account"
            WHERE telegram_chat_id = $1
            "#,
        )
        .bind(&input.chat_id)
        .fetch_optional(self.db())
        .await
    }
}

/// Create a customer for a Telegram identity seen for the first time.
///
/// Returns `None` when a concurrent request created the row first.
#[derive(Debug, Clone)]
pub struct InsertTelegramUserAccount {
    pub chat_id: String,
    pub email: String,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl Processor<InsertTelegramUserAccount> for DatabaseProcessor {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:InsertTelegramUserAccount", err)]
    async fn process(
        &self,
        input: InsertTelegramUserAccount,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>(
            r#"
            INSERT INTO "auth"."user_account"
                (email, role, first_name, last_name, telegram_chat_id, telegram_username,
                 is_telegram_verified)
            VALUES ($1, 'CUSTOMER', $2, $3, $4, $5, TRUE)
            ON CONFLICT DO NOTHING
            RETURNING id, email, role, phone, first_name, last_name, telegram_chat_id,
                      telegram_username, is_telegram_verified, is_active, is_staff,
                      created_at, updated_at
            "#,
        )
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.chat_id)
        .bind(&input.username)
        .fetch_optional(self.db())
        .await
    }
}

/// Overwrite only the profile fields that are `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTelegramProfile {
    pub id: Uuid,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Processor<UpdateTelegramProfile> for DatabaseProcessor {
    type Output = UserAccount;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:UpdateTelegramProfile", err)]
    async fn process(&self, input: UpdateTelegramProfile) -> Result<UserAccount, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>(
            r#"
            UPDATE "auth"."user_account"
            SET telegram_username = COALESCE($2, telegram_username),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, role, phone, first_name, last_name, telegram_chat_id,
                      telegram_username, is_telegram_verified, is_active, is_staff,
                      created_at, updated_at
            "#,
        )
        .bind(input.id)
        .bind(&input.username)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .fetch_one(self.db())
        .await
    }
}

/// Attach a Telegram chat to an existing account.
///
/// Returns `None` when the chat id already belongs to another account.
#[derive(Debug, Clone)]
pub struct LinkTelegramAccount {
    pub id: Uuid,
    pub chat_id: String,
    pub username: Option<String>,
}

impl Processor<LinkTelegramAccount> for DatabaseProcessor {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:LinkTelegramAccount", err)]
    async fn process(&self, input: LinkTelegramAccount) -> Result<Option<UserAccount>, sqlx::Error> {
        let result = sqlx::query_as::<_, UserAccount>(
            r#"
            UPDATE "auth"."user_account"
            SET telegram_chat_id = $2,
                telegram_username = $3,
                is_telegram_verified = TRUE,
                updated_at = NOW()
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM "auth"."user_account"
                  WHERE telegram_chat_id = $2 AND id <> $1
              )
            RETURNING id, email, role, phone, first_name, last_name, telegram_chat_id,
                      telegram_username, is_telegram_verified, is_active, is_staff,
                      created_at, updated_at
            "#,
        )
        .bind(input.id)
        .bind(&input.chat_id)
        .bind(&input.username)
        .fetch_optional(self.db())
        .await;
        match result {
            Err(e) if is_unique_violation(&e) => Ok(None),
            other => other,
        }
    }
}
