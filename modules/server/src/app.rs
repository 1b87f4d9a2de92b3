use crate::config::{AppConfig, HttpConfig};
use auth::http::AuthState;
use auth::http::middleware::UserAuthLayer;
use auth::services::UserStore;
use axum::Router;
use axum::http::HeaderValue;
use menu::MenuStore;
use ordering::http::OrderingState;
use ordering::services::OrderingStore;
use ordering::utils::qr::SvgQrRenderer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Every module's routes behind the request gate.
pub fn app<S>(config: &AppConfig, store: S) -> anyhow::Result<Router>
where
    S: UserStore + MenuStore + OrderingStore,
{
    let auth_state = AuthState::new(&config.auth, store.clone());
    let ordering_state =
        OrderingState::new(&config.ordering, store.clone(), SvgQrRenderer::default());
    Ok(Router::new()
        .merge(auth::http::user::router(auth_state.clone()))
        .merge(menu::http::router(store))
        .merge(ordering::http::router(ordering_state))
        .layer(UserAuthLayer::new(auth_state))
        .layer(cors_layer(&config.http)?)
        .layer(TraceLayer::new_for_http()))
}

pub fn cors_layer(config: &HttpConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }
    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| anyhow::anyhow!("invalid cors origin {origin:?}: {e}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
