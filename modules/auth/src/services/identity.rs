use super::UserStore;
use crate::entities::db::user_account::{
    FindUserAccountByTelegramChatId, InsertTelegramUserAccount, UpdateTelegramProfile,
    UserAccount,
};
use crate::utils::init_data::ParsedIdentity;
use framework::sqlx::DatabaseProcessor;
use kanau::processor::Processor;
use tracing::{debug, info, instrument};

/// What a caller knows about a Telegram user. `None` fields are left as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramProfile {
    pub chat_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&ParsedIdentity> for TelegramProfile {
    fn from(identity: &ParsedIdentity) -> Self {
        Self {
            chat_id: identity.id.to_string(),
            username: Some(identity.username.clone()),
            first_name: Some(identity.first_name.clone()),
            last_name: Some(identity.last_name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user: UserAccount,
    pub created: bool,
}

/// Domain of the addresses given to Telegram-only accounts. Nobody may
/// register under it, so a placeholder can never already be taken.
pub const PLACEHOLDER_DOMAIN: &str = "placeholder.invalid";

pub fn placeholder_email(chat_id: &str) -> String {
    format!("telegram_{chat_id}@{PLACEHOLDER_DOMAIN}")
}

pub fn is_placeholder_email(email: &str) -> bool {
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(PLACEHOLDER_DOMAIN))
}

/// Build an update holding only the fields that differ from what is stored.
pub fn profile_changes(user: &UserAccount, profile: &TelegramProfile) -> Option<UpdateTelegramProfile> {
    let changed = |supplied: &Option<String>, stored: &str| {
        supplied.as_ref().filter(|value| value.as_str() != stored).cloned()
    };
    let update = UpdateTelegramProfile {
        id: user.id,
        username: changed(
            &profile.username,
            user.telegram_username.as_deref().unwrap_or_default(),
        ),
        first_name: changed(&profile.first_name, &user.first_name),
        last_name: changed(&profile.last_name, &user.last_name),
    };
    let untouched = update.username.is_none()
        && update.first_name.is_none()
        && update.last_name.is_none();
    (!untouched).then_some(update)
}

/// Maps verified Telegram identities to local accounts, creating them on first sight.
#[derive(Debug, Clone)]
pub struct IdentityService<S = DatabaseProcessor> {
    pub store: S,
}

impl<S: UserStore> IdentityService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[derive(Debug, Clone)]
pub struct ResolveTelegramIdentity {
    pub profile: TelegramProfile,
}

impl<S: UserStore> Processor<ResolveTelegramIdentity> for IdentityService<S> {
    type Output = ResolvedIdentity;
    type Error = framework::Error;
    #[instrument(skip_all, name = "ResolveTelegramIdentity", fields(chat_id = %input.profile.chat_id), err)]
    async fn process(
        &self,
        input: ResolveTelegramIdentity,
    ) -> Result<ResolvedIdentity, framework::Error> {
        let profile = input.profile;
        let existing = self
            .store
            .process(FindUserAccountByTelegramChatId {
                chat_id: profile.chat_id.clone(),
            })
            .await?;
        if let Some(user) = existing {
            return self.refresh_profile(user, &profile).await;
        }

        let inserted = self
            .store
            .process(InsertTelegramUserAccount {
                chat_id: profile.chat_id.clone(),
                email: placeholder_email(&profile.chat_id),
                username: profile.username.clone(),
                first_name: profile.first_name.clone().unwrap_or_default(),
                last_name: profile.last_name.clone().unwrap_or_default(),
            })
            .await?;
        if let Some(user) = inserted {
            info!(user_id = %user.id, "created account for telegram user");
            return Ok(ResolvedIdentity {
                user,
                created: true,
            });
        }

        // Lost the insert race; the winner's row is visible now.
        debug!("telegram account created concurrently, re-reading");
        let user = self
            .store
            .process(FindUserAccountByTelegramChatId {
                chat_id: profile.chat_id.clone(),
            })
            .await?
            .ok_or_else(|| {
                framework::Error::Conflict("telegram account could not be created".to_owned())
            })?;
        self.refresh_profile(user, &profile).await
    }
}

impl<S: UserStore> IdentityService<S> {
    async fn refresh_profile(
        &self,
        user: UserAccount,
        profile: &TelegramProfile,
    ) -> Result<ResolvedIdentity, framework::Error> {
        let user = match profile_changes(&user, profile) {
            Some(update) => self.store.process(update).await?,
            None => user,
        };
        Ok(ResolvedIdentity {
            user,
            created: false,
        })
    }
}
