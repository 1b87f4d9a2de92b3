//! Backend calls the bot makes, one request type per endpoint.

use crate::config::BotConfig;
use crate::error::BotError;
use kanau::processor::Processor;
use reqwest::{Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

const BOT_TOKEN_HEADER: &str = "x-bot-token";

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    bot_secret: Arc<str>,
}

impl ApiClient {
    pub fn new(config: &BotConfig) -> Result<Self, BotError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url(&config.api_base_url)?,
            bot_secret: Arc::from(config.bot_secret.as_str()),
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, BotError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BotError> {
        Ok(self.client.request(method, self.endpoint(path)?))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        expected: &[StatusCode],
    ) -> Result<T, BotError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "backend answered");
        decode_response(status, expected, &body)
    }
}

/// Joined paths are resolved relative to the base, so it must end in a slash.
fn base_url(raw: &str) -> Result<Url, BotError> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{raw}/"))?)
    }
}

pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    expected: &[StatusCode],
    body: &str,
) -> Result<T, BotError> {
    if !expected.contains(&status) {
        return Err(BotError::Status {
            status: status.as_u16(),
            body: body.to_owned(),
        });
    }
    Ok(serde_json::from_str(body)?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub user: BotUser,
    #[serde(default)]
    pub created: bool,
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuProduct {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub preparation_time: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuCategory {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub products: Vec<MenuProduct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotMenu {
    pub categories: Vec<MenuCategory>,
}

impl BotMenu {
    pub fn product(&self, id: i32) -> Option<&MenuProduct> {
        self.categories
            .iter()
            .flat_map(|c| c.products.iter())
            .find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub status: String,
    #[serde(default)]
    pub status_display: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSummary {
    pub id: i64,
    pub order: i64,
    pub amount: Decimal,
    pub status: String,
    pub qr_reference: String,
    #[serde(default)]
    pub qr_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmedPayment {
    pub message: String,
    pub order_status: String,
    pub payment: PaymentSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemPayload {
    pub product_id: i32,
    pub quantity: u32,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    pub delivery_latitude: Decimal,
    pub delivery_longitude: Decimal,
    pub delivery_reference: String,
    pub notes: String,
    pub items: Vec<OrderItemPayload>,
}

/// Get-or-create the account bound to a Telegram chat.
#[derive(Debug, Clone)]
pub struct TelegramAuth {
    pub chat_id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetMenu;

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub access: String,
    pub payload: OrderPayload,
}

#[derive(Debug, Clone)]
pub struct GetOrder {
    pub access: String,
    pub order_id: i64,
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub access: String,
    pub order_id: i64,
}

#[derive(Debug, Clone)]
pub struct ConfirmPayment {
    pub access: String,
    pub payment_id: i64,
}

impl Processor<TelegramAuth> for ApiClient {
    type Output = AuthSession;
    type Error = BotError;

    #[instrument(skip_all, name = "API:TelegramAuth", err)]
    async fn process(&self, input: TelegramAuth) -> Result<AuthSession, BotError> {
        let request = self
            .request(Method::POST, "users/telegram/auth")?
            .header(BOT_TOKEN_HEADER, &*self.bot_secret)
            .json(&serde_json::json!({
                "telegram_chat_id": input.chat_id,
                "telegram_username": input.username,
            }));
        self.send(request, &[StatusCode::OK, StatusCode::CREATED])
            .await
    }
}

impl Processor<GetMenu> for ApiClient {
    type Output = BotMenu;
    type Error = BotError;

    #[instrument(skip_all, name = "API:GetMenu", err)]
    async fn process(&self, _: GetMenu) -> Result<BotMenu, BotError> {
        let request = self.request(Method::GET, "menu/categories/bot-menu")?;
        self.send(request, &[StatusCode::OK]).await
    }
}

impl Processor<CreateOrder> for ApiClient {
    type Output = OrderSummary;
    type Error = BotError;

    #[instrument(skip_all, name = "API:CreateOrder", err)]
    async fn process(&self, input: CreateOrder) -> Result<OrderSummary, BotError> {
        let request = self
            .request(Method::POST, "orders")?
            .bearer_auth(&input.access)
            .json(&input.payload);
        self.send(request, &[StatusCode::CREATED]).await
    }
}

impl Processor<GetOrder> for ApiClient {
    type Output = OrderSummary;
    type Error = BotError;

    #[instrument(skip_all, name = "API:GetOrder", fields(order_id = input.order_id), err)]
    async fn process(&self, input: GetOrder) -> Result<OrderSummary, BotError> {
        let request = self
            .request(Method::GET, &format!("orders/{}", input.order_id))?
            .bearer_auth(&input.access);
        self.send(request, &[StatusCode::OK]).await
    }
}

impl Processor<CreatePayment> for ApiClient {
    type Output = PaymentSummary;
    type Error = BotError;

    #[instrument(skip_all, name = "API:CreatePayment", fields(order_id = input.order_id), err)]
    async fn process(&self, input: CreatePayment) -> Result<PaymentSummary, BotError> {
        let request = self
            .request(Method::POST, "payments/create-qr")?
            .bearer_auth(&input.access)
            .json(&serde_json::json!({ "order_id": input.order_id }));
        self.send(request, &[StatusCode::CREATED]).await
    }
}

impl Processor<ConfirmPayment> for ApiClient {
    type Output = ConfirmedPayment;
    type Error = BotError;

    #[instrument(skip_all, name = "API:ConfirmPayment", fields(payment_id = input.payment_id), err)]
    async fn process(&self, input: ConfirmPayment) -> Result<ConfirmedPayment, BotError> {
        let request = self
            .request(Method::POST, &format!("payments/{}/confirm", input.payment_id))?
            .bearer_auth(&input.access);
        self.send(request, &[StatusCode::OK]).await
    }
}

/// Everything the conversation needs from the backend.
pub trait BotApi:
    Processor<TelegramAuth, Output = AuthSession, Error = BotError>
    + Processor<GetMenu, Output = BotMenu, Error = BotError>
    + Processor<CreateOrder, Output = OrderSummary, Error = BotError>
    + Processor<GetOrder, Output = OrderSummary, Error = BotError>
    + Processor<CreatePayment, Output = PaymentSummary, Error = BotError>
    + Processor<ConfirmPayment, Output = ConfirmedPayment, Error = BotError>
    + Send
    + Sync
{
}

impl<T> BotApi for T where
    T: Processor<TelegramAuth, Output = AuthSession, Error = BotError>
        + Processor<GetMenu, Output = BotMenu, Error = BotError>
        + Processor<CreateOrder, Output = OrderSummary, Error = BotError>
        + Processor<GetOrder, Output = OrderSummary, Error = BotError>
        + Processor<CreatePayment, Output = PaymentSummary, Error = BotError>
        + Processor<ConfirmPayment, Output = ConfirmedPayment, Error = BotError>
        + Send
        + Sync
{
}
