use super::AuthState;
use super::policy::{Credential, GateDecision, decide};
use crate::entities::db::user_account::{UserAccount, UserRole};
use crate::services::UserStore;
use crate::services::identity::{ResolveTelegramIdentity, TelegramProfile};
use crate::services::user_account::FindActiveUser;
use crate::utils::jwt::TokenKind;
use axum::extract::{FromRequestParts, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use framework::error::ErrorBody;
use futures_util::future::BoxFuture;
use kanau::processor::Processor;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct UserAuthLayer<S> {
    state: AuthState<S>,
}

impl<S> UserAuthLayer<S> {
    pub fn new(state: AuthState<S>) -> Self {
        Self { state }
    }
}

impl<I, S: Clone> tower::Layer<I> for UserAuthLayer<S> {
    type Service = UserAuthMiddleware<I, S>;
    fn layer(&self, inner: I) -> Self::Service {
        UserAuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct UserAuthMiddleware<I, S> {
    inner: I,
    state: AuthState<S>,
}

impl<I, S> tower::Service<Request> for UserAuthMiddleware<I, S>
where
    I: tower::Service<Request, Response = Response> + Clone + Send + 'static,
    I::Future: Send + 'static,
    S: UserStore,
{
    type Response = Response;
    type Error = I::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let state = self.state.clone();
        let inner_clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner_clone);
        Box::pin(async move {
            let decision = decide(&state.policy, req.method(), req.uri().path(), req.headers());
            match decision {
                GateDecision::PassThrough => {}
                GateDecision::Reject(status) => {
                    debug!(path = req.uri().path(), %status, "request rejected by gate");
                    return Ok(reject(status));
                }
                GateDecision::Authenticate(credential) => {
                    match authenticate(&state, credential).await {
                        Ok(user) => {
                            req.extensions_mut().insert(user);
                        }
                        Err(response) => return Ok(response),
                    }
                }
            }
            inner.call(req).await
        })
    }
}

fn reject(status: StatusCode) -> Response {
    let code = if status == StatusCode::UNAUTHORIZED {
        "unauthenticated"
    } else {
        "permission_denied"
    };
    ErrorBody::new(code, "invalid").into_response_with(status)
}

/// Turn a credential into the account it belongs to, or the response to send instead.
pub async fn authenticate<S: UserStore>(
    state: &AuthState<S>,
    credential: Credential,
) -> Result<CurrentUser, Response> {
    let user = match credential {
        Credential::InitData(init_data) => {
            let identity = state.verifier.verify(&init_data).map_err(|e| {
                warn!(reason = %e, "telegram init data rejected");
                reject(StatusCode::FORBIDDEN)
            })?;
            state
                .identity
                .process(ResolveTelegramIdentity {
                    profile: TelegramProfile::from(&identity),
                })
                .await
                .map_err(IntoResponse::into_response)?
                .user
        }
        Credential::Bearer(token) => {
            let user_id = state
                .tokens
                .verify(&token, TokenKind::Access)
                .map_err(|_| reject(StatusCode::UNAUTHORIZED))?;
            return state
                .accounts
                .process(FindActiveUser { user_id })
                .await
                .map(CurrentUser)
                .map_err(|e| match e {
                    framework::Error::Unauthenticated(_) => reject(StatusCode::UNAUTHORIZED),
                    framework::Error::PermissionsDenied => reject(StatusCode::FORBIDDEN),
                    other => other.into_response(),
                });
        }
    };
    if !user.is_active {
        return Err(reject(StatusCode::FORBIDDEN));
    }
    Ok(CurrentUser(user))
}

/// The authenticated account, attached to the request by [`UserAuthMiddleware`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub UserAccount);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    pub fn is_staff(&self) -> bool {
        self.0.is_staff
    }

    pub fn into_inner(self) -> UserAccount {
        self.0
    }

    pub fn read_from_parts(parts: &Parts) -> Result<Self, framework::Error> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(framework::Error::Unauthenticated("missing identity"))
    }
}

impl<St: Send + Sync> FromRequestParts<St> for CurrentUser {
    type Rejection = framework::Error;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        Self::read_from_parts(parts)
    }
}
