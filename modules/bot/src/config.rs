use framework::telemetry::LogConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

fn default_api_base_url() -> String {
    "http://localhost:8000/api/".to_owned()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_session_capacity() -> usize {
    10_000
}

/// How `/start` behaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BotMode {
    /// Ordering happens in the chat.
    #[default]
    Conversational,
    /// `/start` hands the user a button that opens the web app.
    MiniApp { web_app_url: String },
}

#[derive(Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub bot_secret: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub mode: BotMode,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    /// How long one `getUpdates` call may wait for new messages.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default)]
    pub log: LogConfig,
}

impl BotConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Reads the TOML file when given, then applies secrets from the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("failed to read config {}: {e}", path.display())
                })?;
                Self::parse(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 3] = [
            ("TELEGRAM_BOT_TOKEN", &mut self.telegram_bot_token),
            ("TELEGRAM_BOT_SECRET", &mut self.bot_secret),
            ("BOT_API_URL", &mut self.api_base_url),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.telegram_bot_token.is_empty() {
            anyhow::bail!(
                "telegram bot token is not set (telegram_bot_token or TELEGRAM_BOT_TOKEN)"
            );
        }
        match &self.mode {
            BotMode::Conversational if self.bot_secret.is_empty() => {
                anyhow::bail!("bot secret is not set (bot_secret or TELEGRAM_BOT_SECRET)");
            }
            BotMode::MiniApp { web_app_url } if !web_app_url.starts_with("https://") => {
                anyhow::bail!("mode.web_app_url must be an https url");
            }
            _ => {}
        }
        if self.poll_timeout_secs == 0 {
            anyhow::bail!("poll_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            bot_secret: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            mode: BotMode::default(),
            session_ttl_secs: default_session_ttl_secs(),
            session_capacity: default_session_capacity(),
            telegram_bot_token: String::new(),
            telegram_api_url: default_telegram_api_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
            log: LogConfig::default(),
        }
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("api_base_url", &self.api_base_url)
            .field("bot_secret", &"[REDACTED]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("mode", &self.mode)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_capacity", &self.session_capacity)
            .field("telegram_bot_token", &"[REDACTED]")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("log", &self.log)
            .finish()
    }
}
