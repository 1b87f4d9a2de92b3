use compact_str::CompactString;

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: CompactString,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_hours")]
    pub refresh_ttl_hours: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: default_issuer(),
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_hours: default_refresh_ttl_hours(),
        }
    }
}

impl core::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_hours", &self.refresh_ttl_hours)
            .finish()
    }
}

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AuthConfig {
    /// Token of the Telegram bot whose Mini App signs `initData`.
    #[serde(default)]
    pub telegram_bot_token: String,

    /// Shared secret the bot presents in `X-Bot-Token`.
    #[serde(default)]
    pub bot_secret: String,

    #[serde(default)]
    pub jwt: JwtConfig,

    /// Reject `initData` older than this many seconds. Unset disables the check.
    #[serde(default)]
    pub init_data_max_age_secs: Option<u64>,
}

impl AuthConfig {
    pub fn init_data_max_age(&self) -> Option<time::Duration> {
        self.init_data_max_age_secs
            .map(|secs| time::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("telegram_bot_token", &"[REDACTED]")
            .field("bot_secret", &"[REDACTED]")
            .field("jwt", &self.jwt)
            .field("init_data_max_age_secs", &self.init_data_max_age_secs)
            .finish()
    }
}

fn default_issuer() -> CompactString {
    CompactString::const_new("delivery-api")
}

fn default_access_ttl_minutes() -> i64 {
    60
}

fn default_refresh_ttl_hours() -> i64 {
    24
}
