//! The slice of the Telegram Bot API the bot needs: long polling for
//! updates, sending messages with keyboards, and acknowledging button taps.

use crate::config::BotConfig;
use crate::error::BotError;
use kanau::processor::Processor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    /// `<api>/bot<token>/`. Carries the token, so it is never logged.
    base_url: Url,
    request_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("host", &self.base_url.host_str())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(config: &BotConfig) -> Result<Self, BotError> {
        let client = reqwest::Client::builder().build()?;
        let api = config.telegram_api_url.trim_end_matches('/');
        let base_url = Url::parse(&format!("{api}/bot{}/", config.telegram_bot_token))?;
        Ok(Self {
            client,
            base_url,
            request_timeout: config.request_timeout(),
        })
    }

    async fn call<P: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> Result<T, BotError> {
        let url = self.base_url.join(method)?;
        // reqwest errors print their url, which would leak the token.
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        debug!(method, status = status.as_u16(), "telegram answered");
        decode_envelope(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: u16,
    #[serde(default)]
    description: String,
}

/// Every Bot API answer is `{"ok": .., "result": ..}` regardless of the HTTP status.
pub(crate) fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, BotError> {
    match serde_json::from_str::<Envelope<T>>(body)? {
        Envelope {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        Envelope {
            error_code,
            description,
            ..
        } => Err(BotError::Telegram {
            code: error_code,
            description,
        }),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// The message the tapped button belongs to.
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline {
        inline_keyboard: Vec<Vec<InlineButton>>,
    },
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            web_app: None,
        }
    }

    pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            web_app: Some(WebAppInfo { url: url.into() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub request_location: bool,
}

impl KeyboardButton {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_location: false,
        }
    }

    pub fn location(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_location: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Seconds the server may hold the request open.
    pub timeout: u64,
    pub allowed_updates: [&'static str; 2],
}

impl GetUpdates {
    pub fn long_poll(offset: Option<i64>, timeout: u64) -> Self {
        Self {
            offset,
            timeout,
            allowed_updates: ["message", "callback_query"],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerCallbackQuery {
    pub callback_query_id: String,
}

impl Processor<GetUpdates> for TelegramClient {
    type Output = Vec<Update>;
    type Error = BotError;

    #[instrument(skip_all, name = "Telegram:GetUpdates", fields(offset = ?input.offset), err)]
    async fn process(&self, input: GetUpdates) -> Result<Vec<Update>, BotError> {
        let timeout = Duration::from_secs(input.timeout) + self.request_timeout;
        self.call("getUpdates", &input, timeout).await
    }
}

impl Processor<SendMessage> for TelegramClient {
    type Output = Message;
    type Error = BotError;

    #[instrument(skip_all, name = "Telegram:SendMessage", fields(chat_id = input.chat_id), err)]
    async fn process(&self, input: SendMessage) -> Result<Message, BotError> {
        self.call("sendMessage", &input, self.request_timeout).await
    }
}

impl Processor<AnswerCallbackQuery> for TelegramClient {
    type Output = bool;
    type Error = BotError;

    #[instrument(skip_all, name = "Telegram:AnswerCallbackQuery", err)]
    async fn process(&self, input: AnswerCallbackQuery) -> Result<bool, BotError> {
        self.call("answerCallbackQuery", &input, self.request_timeout)
            .await
    }
}
