use crate::entities::db::user_account::{
    FindUserAccountByEmail, FindUserAccountById, FindUserAccountByTelegramChatId,
    InsertTelegramUserAccount, LinkTelegramAccount, UpdateTelegramProfile, UserAccount,
};
use crate::entities::db::user_password::{
    FindUserPasswordByEmail, RegisterUserWithPassword, UserPassword,
};
use kanau::processor::Processor;

pub mod identity;
pub mod user_account;

/// Every user-account operation the services need from storage.
///
/// `DatabaseProcessor` is the production implementation.
pub trait UserStore:
    Processor<FindUserAccountById, Output = Option<UserAccount>, Error = sqlx::Error>
    + Processor<FindUserAccountByEmail, Output = Option<UserAccount>, Error = sqlx::Error>
    + Processor<FindUserAccountByTelegramChatId, Output = Option<UserAccount>, Error = sqlx::Error>
    + Processor<InsertTelegramUserAccount, Output = Option<UserAccount>, Error = sqlx::Error>
    + Processor<UpdateTelegramProfile, Output = UserAccount, Error = sqlx::Error>
    + Processor<LinkTelegramAccount, Output = Option<UserAccount>, Error = sqlx::Error>
    + Processor<RegisterUserWithPassword, Output = Option<UserAccount>, Error = sqlx::Error>
    + Processor<FindUserPasswordByEmail, Output = Option<UserPassword>, Error = sqlx::Error>
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> UserStore for T where
    T: Processor<FindUserAccountById, Output = Option<UserAccount>, Error = sqlx::Error>
        + Processor<FindUserAccountByEmail, Output = Option<UserAccount>, Error = sqlx::Error>
        + Processor<
            FindUserAccountByTelegramChatId,
            Output = Option<UserAccount>,
            Error = sqlx::Error,
        > + Processor<InsertTelegramUserAccount, Output = Option<UserAccount>, Error = sqlx::Error>
        + Processor<UpdateTelegramProfile, Output = UserAccount, Error = sqlx::Error>
        + Processor<LinkTelegramAccount, Output = Option<UserAccount>, Error = sqlx::Error>
        + Processor<RegisterUserWithPassword, Output = Option<UserAccount>, Error = sqlx::Error>
        + Processor<FindUserPasswordByEmail, Output = Option<UserPassword>, Error = sqlx::Error>
        + Clone
        + Send
        + Sync
        + 'static
{
}
