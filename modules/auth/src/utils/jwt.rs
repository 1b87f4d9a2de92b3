use crate::config::JwtConfig;
use compact_str::CompactString;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

/// Access JWT token string
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl AccessToken {
    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn new(inner: impl AsRef<str>) -> Self {
        Self(inner.as_ref().to_owned())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken([REDACTED])")
    }
}

/// Refresh JWT token string
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl AsRef<str> for RefreshToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl RefreshToken {
    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn new(inner: impl AsRef<str>) -> Self {
        Self(inner.as_ref().to_owned())
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefreshToken([REDACTED])")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims stored in generated JWT tokens
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct TokenClaims {
    /// User ID
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub iss: CompactString,
    pub typ: TokenKind,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenPair {
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is invalid or expired")]
    Invalid,
    #[error("token encoding failed: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// Signs and checks the HS256 tokens handed out by login, registration and
/// the bot path.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: CompactString,
    access_ttl: time::Duration,
    refresh_ttl: time::Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_ttl: time::Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: time::Duration::hours(config.refresh_ttl_hours),
        }
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Ok(TokenPair {
            access: AccessToken(self.issue(user_id, TokenKind::Access, now)?),
            refresh: RefreshToken(self.issue(user_id, TokenKind::Refresh, now)?),
        })
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind, now: i64) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = TokenClaims {
            sub: user_id,
            exp: now + ttl.whole_seconds(),
            iat: now,
            iss: self.issuer.clone(),
            typ: kind,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encode)
    }

    /// Check signature, issuer, expiry and token kind; returns the user id.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Uuid, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_aud = false;
        validation.leeway = 0;
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.typ != kind {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims.sub)
    }

    /// Exchange a refresh token for a fresh access token.
    pub fn refresh(&self, refresh: &RefreshToken) -> Result<AccessToken, TokenError> {
        let user_id = self.verify(refresh.as_ref(), TokenKind::Refresh)?;
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Ok(AccessToken(self.issue(user_id, TokenKind::Access, now)?))
    }
}
