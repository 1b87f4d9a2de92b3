use crate::utils::init_data::INIT_DATA_HEADER;
use axum::http::{HeaderMap, Method, StatusCode, header};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// No authentication at all.
    Exempt,
    /// Anonymous `GET`/`HEAD`; other methods need an identity.
    PublicRead,
    /// Verified identity required.
    Protected,
}

/// Longest-match route table. A rule ending in `/` covers that whole subtree;
/// any other rule covers exactly one path, with or without a trailing slash.
/// Paths matching no rule are outside the API and pass.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    rules: Vec<(&'static str, RouteAccess)>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::new(vec![
            ("/admin/", RouteAccess::Exempt),
            ("/static/", RouteAccess::Exempt),
            ("/media/", RouteAccess::Exempt),
            ("/api/users/telegram/auth", RouteAccess::Exempt),
            ("/api/users/login", RouteAccess::Exempt),
            ("/api/users/register", RouteAccess::Exempt),
            ("/api/users/refresh", RouteAccess::Exempt),
            // Menu listings only; single products and writes need an identity.
            ("/api/menu/categories", RouteAccess::PublicRead),
            ("/api/menu/categories/with-products", RouteAccess::PublicRead),
            ("/api/menu/categories/bot-menu", RouteAccess::PublicRead),
            ("/api/menu/products", RouteAccess::PublicRead),
            ("/api/menu/products/available", RouteAccess::PublicRead),
            ("/api/menu/products/featured", RouteAccess::PublicRead),
            ("/api/", RouteAccess::Protected),
        ])
    }
}

fn rule_matches(rule: &str, path: &str) -> bool {
    if rule.ends_with('/') {
        return path.starts_with(rule);
    }
    match path.strip_prefix(rule) {
        Some(rest) => rest.is_empty() || rest == "/",
        None => false,
    }
}

impl GatePolicy {
    pub fn new(rules: Vec<(&'static str, RouteAccess)>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, path: &str) -> Option<RouteAccess> {
        self.rules
            .iter()
            .filter(|(rule, _)| rule_matches(rule, path))
            .max_by_key(|(rule, _)| rule.len())
            .map(|(_, access)| *access)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    InitData(String),
    Bearer(String),
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InitData(_) => write!(f, "InitData([REDACTED])"),
            Self::Bearer(_) => write!(f, "Bearer([REDACTED])"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    PassThrough,
    Authenticate(Credential),
    Reject(StatusCode),
}

/// Decide what to do with a request before any verification runs.
pub fn decide(policy: &GatePolicy, method: &Method, path: &str, headers: &HeaderMap) -> GateDecision {
    match policy.classify(path) {
        None | Some(RouteAccess::Exempt) => return GateDecision::PassThrough,
        Some(RouteAccess::PublicRead) if *method == Method::GET || *method == Method::HEAD => {
            return GateDecision::PassThrough;
        }
        Some(RouteAccess::PublicRead | RouteAccess::Protected) => {}
    }

    if let Some(value) = headers.get(INIT_DATA_HEADER) {
        return match value.to_str() {
            Ok(init_data) if !init_data.is_empty() => {
                GateDecision::Authenticate(Credential::InitData(init_data.to_owned()))
            }
            Ok(_) => GateDecision::Reject(StatusCode::UNAUTHORIZED),
            Err(_) => GateDecision::Reject(StatusCode::FORBIDDEN),
        };
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    match bearer {
        Some(token) => GateDecision::Authenticate(Credential::Bearer(token.to_owned())),
        None => GateDecision::Reject(StatusCode::UNAUTHORIZED),
    }
}
