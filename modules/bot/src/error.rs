#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("telegram rejected the call ({code}): {description}")]
    Telegram { code: u16, description: String },
}

impl BotError {
    /// Whether the backend rejected the credentials of the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}
