use crate::config::AuthConfig;
use crate::services::UserStore;
use crate::services::identity::IdentityService;
use crate::services::user_account::UserAccountService;
use crate::utils::init_data::InitDataVerifier;
use crate::utils::jwt::TokenIssuer;
use framework::sqlx::DatabaseProcessor;
use policy::GatePolicy;
use std::sync::Arc;

pub mod conversions;
pub mod middleware;
pub mod policy;
pub mod user;

/// Everything the gate and the `/api/users` handlers share.
#[derive(Clone)]
pub struct AuthState<S = DatabaseProcessor> {
    pub verifier: InitDataVerifier,
    pub tokens: TokenIssuer,
    pub identity: IdentityService<S>,
    pub accounts: UserAccountService<S>,
    pub policy: Arc<GatePolicy>,
    bot_secret: Arc<str>,
}

impl<S: UserStore> AuthState<S> {
    pub fn new(config: &AuthConfig, store: S) -> Self {
        Self {
            verifier: InitDataVerifier::new(config.telegram_bot_token.as_str())
                .with_max_age(config.init_data_max_age()),
            tokens: TokenIssuer::new(&config.jwt),
            identity: IdentityService::new(store.clone()),
            accounts: UserAccountService::new(store),
            policy: Arc::new(GatePolicy::default()),
            bot_secret: Arc::from(config.bot_secret.as_str()),
        }
    }

    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn bot_secret(&self) -> &str {
        &self.bot_secret
    }
}
