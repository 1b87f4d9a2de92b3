use super::UserStore;
use super::identity::is_placeholder_email;
use crate::entities::db::user_account::{
    FindUserAccountByEmail, FindUserAccountById, LinkTelegramAccount, UserAccount, UserRole,
};
use crate::entities::db::user_password::{FindUserPasswordByEmail, RegisterUserWithPassword};
use crate::utils::password::{MIN_PASSWORD_LEN, fake_verify, hash_password, verify_password};
use framework::sqlx::DatabaseProcessor;
use kanau::processor::Processor;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserAccountService<S = DatabaseProcessor> {
    pub store: S,
}

impl<S: UserStore> UserAccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[derive(Clone)]
pub struct RegisterUser {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: UserRole,
    pub phone: Option<String>,
}

impl core::fmt::Debug for RegisterUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterUser")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl<S: UserStore> Processor<RegisterUser> for UserAccountService<S> {
    type Output = UserAccount;
    type Error = framework::Error;
    #[instrument(skip_all, name = "RegisterUser", err)]
    async fn process(&self, input: RegisterUser) -> Result<UserAccount, framework::Error> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(framework::Error::invalid_input("a valid email is required"));
        }
        if is_placeholder_email(&email) {
            return Err(framework::Error::invalid_input("this email domain is reserved"));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(framework::Error::invalid_input(format!(
                "password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if input.password != input.password_confirm {
            return Err(framework::Error::invalid_input("passwords do not match"));
        }
        let password_hash = hash_password(&input.password)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
        self.store
            .process(RegisterUserWithPassword {
                email,
                role: input.role,
                phone: input.phone.filter(|phone| !phone.trim().is_empty()),
                password_hash,
            })
            .await?
            .ok_or_else(|| framework::Error::Conflict("email is already registered".to_owned()))
    }
}

#[derive(Clone)]
pub struct LoginWithPassword {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for LoginWithPassword {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginWithPassword")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    Success(UserAccount),
    WrongCredential,
    Inactive,
}

impl<S: UserStore> Processor<LoginWithPassword> for UserAccountService<S> {
    type Output = LoginResult;
    type Error = framework::Error;
    #[instrument(skip_all, name = "LoginWithPassword", err)]
    async fn process(&self, input: LoginWithPassword) -> Result<LoginResult, framework::Error> {
        let email = input.email.trim().to_lowercase();
        let Some(password) = self
            .store
            .process(FindUserPasswordByEmail {
                email: email.clone(),
            })
            .await?
        else {
            fake_verify(&input.password);
            return Ok(LoginResult::WrongCredential);
        };
        if verify_password(&input.password, &password.password_hash).is_err() {
            return Ok(LoginResult::WrongCredential);
        }
        let Some(user) = self.store.process(FindUserAccountByEmail { email }).await? else {
            return Ok(LoginResult::WrongCredential);
        };
        if !user.is_active {
            return Ok(LoginResult::Inactive);
        }
        Ok(LoginResult::Success(user))
    }
}

#[derive(Debug, Clone)]
pub struct LinkTelegram {
    pub user_id: Uuid,
    pub chat_id: String,
    pub username: Option<String>,
}

impl<S: UserStore> Processor<LinkTelegram> for UserAccountService<S> {
    type Output = UserAccount;
    type Error = framework::Error;
    #[instrument(skip_all, name = "LinkTelegram", err)]
    async fn process(&self, input: LinkTelegram) -> Result<UserAccount, framework::Error> {
        let chat_id = input.chat_id.trim().to_owned();
        if chat_id.is_empty() {
            return Err(framework::Error::invalid_input("telegram_chat_id is required"));
        }
        self.store
            .process(LinkTelegramAccount {
                id: input.user_id,
                chat_id,
                username: Some(input.username.unwrap_or_default()),
            })
            .await?
            .ok_or_else(|| {
                framework::Error::Conflict(
                    "this telegram account is linked to another user".to_owned(),
                )
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindActiveUser {
    pub user_id: Uuid,
}

impl<S: UserStore> Processor<FindActiveUser> for UserAccountService<S> {
    type Output = UserAccount;
    type Error = framework::Error;
    async fn process(&self, input: FindActiveUser) -> Result<UserAccount, framework::Error> {
        let user = self
            .store
            .process(FindUserAccountById { id: input.user_id })
            .await?
            .ok_or(framework::Error::Unauthenticated("invalid"))?;
        if !user.is_active {
            return Err(framework::Error::PermissionsDenied);
        }
        Ok(user)
    }
}
