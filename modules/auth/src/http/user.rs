use super::AuthState;
use super::conversions::UserView;
use super::middleware::CurrentUser;
use crate::entities::db::user_account::UserRole;
use crate::services::UserStore;
use crate::services::identity::{ResolveTelegramIdentity, TelegramProfile};
use crate::services::user_account::{LinkTelegram, LoginResult, LoginWithPassword, RegisterUser};
use crate::utils::jwt::{AccessToken, RefreshToken, TokenError, TokenPair};
use crate::utils::secret::{BOT_TOKEN_HEADER, secrets_match};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use framework::error::ErrorBody;
use kanau::processor::Processor;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub fn router<S: UserStore>(state: AuthState<S>) -> Router {
    Router::new()
        .route("/api/users/register", post(register::<S>))
        .route("/api/users/login", post(login::<S>))
        .route("/api/users/refresh", post(refresh::<S>))
        .route("/api/users/me", get(me))
        .route("/api/users/telegram/link", post(link_telegram::<S>))
        .route("/api/users/telegram/auth", post(telegram_auth::<S>))
        .with_state(state)
}

fn token_failure(err: TokenError) -> framework::Error {
    match err {
        TokenError::Invalid => framework::Error::Unauthenticated("invalid"),
        TokenError::Encode(e) => anyhow::Error::new(e).context("failed to sign token").into(),
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserView,
    #[serde(flatten)]
    pub tokens: TokenPair,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

async fn register<S: UserStore>(
    State(state): State<AuthState<S>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), framework::Error> {
    let user = state
        .accounts
        .process(RegisterUser {
            email: body.email,
            password: body.password,
            password_confirm: body.password_confirm,
            role: body.role.unwrap_or(UserRole::Customer),
            phone: body.phone,
        })
        .await?;
    info!(user_id = %user.id, "user registered");
    let tokens = state.tokens.issue_pair(user.id).map_err(token_failure)?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: user.into(),
            tokens,
            message: Some("User registered successfully"),
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login<S: UserStore>(
    State(state): State<AuthState<S>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, framework::Error> {
    let result = state
        .accounts
        .process(LoginWithPassword {
            email: body.email,
            password: body.password,
        })
        .await?;
    let user = match result {
        LoginResult::Success(user) => user,
        LoginResult::WrongCredential => {
            return Err(framework::Error::Unauthenticated("invalid credentials"));
        }
        LoginResult::Inactive => return Err(framework::Error::PermissionsDenied),
    };
    let tokens = state.tokens.issue_pair(user.id).map_err(token_failure)?;
    Ok(Json(SessionResponse {
        user: user.into(),
        tokens,
        message: None,
    }))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: RefreshToken,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: AccessToken,
}

async fn refresh<S: UserStore>(
    State(state): State<AuthState<S>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, framework::Error> {
    let access = state.tokens.refresh(&body.refresh).map_err(token_failure)?;
    Ok(Json(RefreshResponse { access }))
}

async fn me(user: CurrentUser) -> Json<UserView> {
    Json(user.into_inner().into())
}

/// Telegram chat ids arrive as JSON numbers from some clients and strings from others.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatIdInput {
    Number(i64),
    Text(String),
}

impl ChatIdInput {
    fn into_chat_id(self) -> Option<String> {
        let chat_id = match self {
            Self::Number(id) => id.to_string(),
            Self::Text(text) => text.trim().to_owned(),
        };
        (!chat_id.is_empty()).then_some(chat_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct TelegramAccountRequest {
    #[serde(default)]
    pub telegram_chat_id: Option<ChatIdInput>,
    #[serde(default)]
    pub telegram_username: Option<String>,
}

impl TelegramAccountRequest {
    fn chat_id(&self) -> Result<String, framework::Error> {
        self.telegram_chat_id
            .clone()
            .and_then(ChatIdInput::into_chat_id)
            .ok_or_else(|| framework::Error::invalid_input("telegram_chat_id is required"))
    }
}

#[derive(Debug, Serialize)]
pub struct LinkTelegramResponse {
    pub message: &'static str,
    pub user: UserView,
}

async fn link_telegram<S: UserStore>(
    State(state): State<AuthState<S>>,
    user: CurrentUser,
    Json(body): Json<TelegramAccountRequest>,
) -> Result<Json<LinkTelegramResponse>, framework::Error> {
    let chat_id = body.chat_id()?;
    let user = state
        .accounts
        .process(LinkTelegram {
            user_id: user.id(),
            chat_id,
            username: body.telegram_username,
        })
        .await?;
    Ok(Json(LinkTelegramResponse {
        message: "Telegram linked successfully",
        user: user.into(),
    }))
}

#[derive(Debug, Serialize)]
pub struct TelegramAuthResponse {
    pub user: UserView,
    pub created: bool,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Server-to-server get-or-create used by the bot, authenticated by the shared secret.
async fn telegram_auth<S: UserStore>(
    State(state): State<AuthState<S>>,
    headers: HeaderMap,
    Json(body): Json<TelegramAccountRequest>,
) -> Result<Response, framework::Error> {
    let presented = headers
        .get(BOT_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(state.bot_secret(), presented) {
        warn!("bot authentication rejected");
        return Ok(ErrorBody::new("permission_denied", "invalid").into_response_with(StatusCode::FORBIDDEN));
    }

    let chat_id = body.chat_id()?;
    let resolved = state
        .identity
        .process(ResolveTelegramIdentity {
            profile: TelegramProfile {
                chat_id,
                username: Some(body.telegram_username.unwrap_or_default()),
                first_name: None,
                last_name: None,
            },
        })
        .await?;
    if !resolved.user.is_active {
        return Err(framework::Error::PermissionsDenied);
    }
    let tokens = state
        .tokens
        .issue_pair(resolved.user.id)
        .map_err(token_failure)?;
    let status = if resolved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = TelegramAuthResponse {
        user: resolved.user.into(),
        created: resolved.created,
        tokens,
    };
    Ok((status, Json(body)).into_response())
}
