use super::user_account::{UserAccount, UserRole};
use framework::sqlx::{DatabaseProcessor, commit};
use kanau::processor::Processor;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone, Eq, PartialEq, sqlx::FromRow)]
pub struct UserPassword {
    pub user_id: Uuid,
    pub password_hash: String,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl core::fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPassword")
            .field("user_id", &self.user_id)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Create an account together with its password.
///
/// Returns `None` if the email is taken.
#[derive(Clone)]
pub struct RegisterUserWithPassword {
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub password_hash: String,
}

impl core::fmt::Debug for RegisterUserWithPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterUserWithPassword")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("phone", &self.phone)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

impl Processor<RegisterUserWithPassword> for DatabaseProcessor {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:RegisterUserWithPassword", err)]
    async fn process(
        &self,
        input: RegisterUserWithPassword,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        let mut tx = self.begin().await?;
        let Some(user_account) = sqlx::query_as::<_, UserAccount>(
            r#"
            INSERT INTO "auth"."user_account" (email, role, phone)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, role, phone, first_name, last_name, telegram_chat_id,
                      telegram_username, is_telegram_verified, is_active, is_staff,
                      created_at, updated_at
            "#,
        )
        .bind(&input.email)
        .bind(input.role)
        .bind(&input.phone)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };
        sqlx::query(
            r#"
            INSERT INTO "auth"."user_password" (user_id, password_hash)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_account.id)
        .bind(&input.password_hash)
        .execute(&mut *tx)
        .await?;
        commit(tx).await?;
        Ok(Some(user_account))
    }
}

#[derive(Debug, Clone)]
pub struct FindUserPasswordByEmail {
    pub email: String,
}

impl Processor<FindUserPasswordByEmail> for DatabaseProcessor {
    type Output = Option<UserPassword>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindUserPasswordByEmail", err)]
    async fn process(
        &self,
        input: FindUserPasswordByEmail,
    ) -> Result<Option<UserPassword>, sqlx::Error> {
        sqlx::query_as::<_, UserPassword>(
            r#"
            SELECT user_id, password_hash, created_at, updated_at
            FROM "auth"."user_password"
            WHERE user_id = (SELECT id FROM "auth"."user_account" WHERE email = $1)
            "#,
        )
        .bind(&input.email)
        .fetch_optional(self.db())
        .await
    }
}
