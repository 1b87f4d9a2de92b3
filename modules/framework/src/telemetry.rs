use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit one JSON object per line instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info,sqlx=warn,tower_http=info".to_owned()
}

/// Install the global subscriber. Call once, at process start.
pub fn init(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
