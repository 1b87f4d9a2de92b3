#![allow(dead_code)]

use auth::entities::db::user_account::{
    FindUserAccountByEmail, FindUserAccountById, FindUserAccountByTelegramChatId,
    InsertTelegramUserAccount, LinkTelegramAccount, UpdateTelegramProfile, UserAccount, UserRole,
};
use auth::entities::db::user_password::{
    FindUserPasswordByEmail, RegisterUserWithPassword, UserPassword,
};
use kanau::processor::Processor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

pub const BOT_TOKEN: &str = "7012345678:AAHk-integration-token";
pub const BOT_SECRET: &str = "bot-shared-secret";

#[derive(Default)]
struct Tables {
    users: Vec<UserAccount>,
    passwords: HashMap<Uuid, String>,
    race_on_next_insert: bool,
}

/// In-memory stand-in for the user tables, with the same conflict semantics.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    tables: Arc<Mutex<Tables>>,
    pub profile_updates: Arc<AtomicUsize>,
}

impl MemoryUserStore {
    pub fn users(&self) -> Vec<UserAccount> {
        self.tables.lock().users.clone()
    }

    /// Make the next Telegram insert behave as if another request inserted first.
    pub fn lose_next_insert_race(&self) {
        self.tables.lock().race_on_next_insert = true;
    }

    pub fn seed(&self, user: UserAccount) {
        self.tables.lock().users.push(user);
    }

    pub fn set_active(&self, id: Uuid, active: bool) {
        let mut tables = self.tables.lock();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.is_active = active;
        }
    }
}

pub fn account(email: &str, role: UserRole) -> UserAccount {
    let now = framework::now_time();
    UserAccount {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        role,
        phone: None,
        first_name: String::new(),
        last_name: String::new(),
        telegram_chat_id: None,
        telegram_username: None,
        is_telegram_verified: false,
        is_active: true,
        is_staff: false,
        created_at: now,
        updated_at: now,
    }
}

fn telegram_account(input: &InsertTelegramUserAccount) -> UserAccount {
    let mut user = account(&input.email, UserRole::Customer);
    user.first_name = input.first_name.clone();
    user.last_name = input.last_name.clone();
    user.telegram_chat_id = Some(input.chat_id.clone());
    user.telegram_username = input.username.clone();
    user.is_telegram_verified = true;
    user
}

impl Processor<FindUserAccountById> for MemoryUserStore {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    async fn process(&self, input: FindUserAccountById) -> Result<Option<UserAccount>, sqlx::Error> {
        Ok(self.tables.lock().users.iter().find(|u| u.id == input.id).cloned())
    }
}

impl Processor<FindUserAccountByEmail> for MemoryUserStore {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        input: FindUserAccountByEmail,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        Ok(self
            .tables
            .lock()
            .users
            .iter()
            .find(|u| u.email == input.email)
            .cloned())
    }
}

impl Processor<FindUserAccountByTelegramChatId> for MemoryUserStore {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        input: FindUserAccountByTelegramChatId,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        Ok(self
            .tables
            .lock()
            .users
            .iter()
            .find(|u| u.telegram_chat_id.as_deref() == Some(input.chat_id.as_str()))
            .cloned())
    }
}

impl Processor<InsertTelegramUserAccount> for MemoryUserStore {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        input: InsertTelegramUserAccount,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        let mut tables = self.tables.lock();
        if std::mem::take(&mut tables.race_on_next_insert) {
            tables.users.push(telegram_account(&input));
            return Ok(None);
        }
        let taken = tables.users.iter().any(|u| {
            u.email == input.email || u.telegram_chat_id.as_deref() == Some(input.chat_id.as_str())
        });
        if taken {
            return Ok(None);
        }
        let user = telegram_account(&input);
        tables.users.push(user.clone());
        Ok(Some(user))
    }
}

impl Processor<UpdateTelegramProfile> for MemoryUserStore {
    type Output = UserAccount;
    type Error = sqlx::Error;
    async fn process(&self, input: UpdateTelegramProfile) -> Result<UserAccount, sqlx::Error> {
        self.profile_updates.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == input.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        if let Some(username) = input.username {
            user.telegram_username = Some(username);
        }
        if let Some(first_name) = input.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            user.last_name = last_name;
        }
        Ok(user.clone())
    }
}

impl Processor<LinkTelegramAccount> for MemoryUserStore {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    async fn process(&self, input: LinkTelegramAccount) -> Result<Option<UserAccount>, sqlx::Error> {
        let mut tables = self.tables.lock();
        let taken = tables.users.iter().any(|u| {
            u.id != input.id && u.telegram_chat_id.as_deref() == Some(input.chat_id.as_str())
        });
        if taken {
            return Ok(None);
        }
        let Some(user) = tables.users.iter_mut().find(|u| u.id == input.id) else {
            return Ok(None);
        };
        user.telegram_chat_id = Some(input.chat_id);
        user.telegram_username = input.username;
        user.is_telegram_verified = true;
        Ok(Some(user.clone()))
    }
}

impl Processor<RegisterUserWithPassword> for MemoryUserStore {
    type Output = Option<UserAccount>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        input: RegisterUserWithPassword,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        let mut tables = self.tables.lock();
        if tables.users.iter().any(|u| u.email == input.email) {
            return Ok(None);
        }
        let mut user = account(&input.email, input.role);
        user.phone = input.phone;
        tables.passwords.insert(user.id, input.password_hash);
        tables.users.push(user.clone());
        Ok(Some(user))
    }
}

impl Processor<FindUserPasswordByEmail> for MemoryUserStore {
    type Output = Option<UserPassword>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        input: FindUserPasswordByEmail,
    ) -> Result<Option<UserPassword>, sqlx::Error> {
        let tables = self.tables.lock();
        let Some(user) = tables.users.iter().find(|u| u.email == input.email) else {
            return Ok(None);
        };
        Ok(tables.passwords.get(&user.id).map(|hash| UserPassword {
            user_id: user.id,
            password_hash: hash.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }))
    }
}
