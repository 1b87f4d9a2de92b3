use auth::config::AuthConfig;
use framework::telemetry::LogConfig;
use ordering::config::OrderingConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
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
        let secrets: [(&str, &mut String); 4] = [
            ("TELEGRAM_BOT_TOKEN", &mut self.auth.telegram_bot_token),
            ("TELEGRAM_BOT_SECRET", &mut self.auth.bot_secret),
            ("JWT_SECRET", &mut self.auth.jwt.secret),
            ("DATABASE_URL", &mut self.database.url),
        ];
        for (key, slot) in secrets {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("database url is not set (database.url or DATABASE_URL)");
        }
        if self.auth.jwt.secret.is_empty() {
            anyhow::bail!("jwt secret is not set (auth.jwt.secret or JWT_SECRET)");
        }
        if self.ordering.default_delivery_fee.is_sign_negative() {
            anyhow::bail!("ordering.default_delivery_fee must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [http]
        bind = "127.0.0.1:9000"
        cors_origins = ["https://shop.example.com"]

        [database]
        url = "postgres://file@localhost/delivery"

        [auth]
        bot_secret = "from-file"
        init_data_max_age_secs = 86400

        [auth.jwt]
        secret = "jwt-from-file"

        [ordering]
        default_delivery_fee = "12.50"

        [log]
        json = true
    "#;

    #[test]
    fn file_sections_are_read() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.http.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.http.cors_origins, ["https://shop.example.com"]);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.init_data_max_age_secs, Some(86400));
        assert_eq!(config.ordering.default_delivery_fee.to_string(), "12.50");
        assert!(config.log.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_secrets() {
        let mut config = AppConfig::parse(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("TELEGRAM_BOT_SECRET", "from-env"),
            ("DATABASE_URL", "postgres://env@db/delivery"),
            ("JWT_SECRET", ""),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| (*v).to_owned()));
        assert_eq!(config.auth.bot_secret, "from-env");
        assert_eq!(config.database.url, "postgres://env@db/delivery");
        assert_eq!(config.auth.jwt.secret, "jwt-from-file");
        assert!(config.auth.telegram_bot_token.is_empty());
    }

    #[test]
    fn missing_secrets_fail_validation() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.http.bind.port(), 8000);
        assert!(config.validate().is_err());
        assert!(!format!("{:?}", AppConfig::parse(SAMPLE).unwrap()).contains("postgres://"));
    }
}
