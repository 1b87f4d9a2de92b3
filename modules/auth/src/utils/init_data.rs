//! Telegram Mini-App `initData` verification.
//!
//! The Mini App forwards the query string Telegram handed it. The string is
//! signed with a key derived from the bot token:
//!
//! ```text
//! secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)
//! hash       = hex(HMAC_SHA256(key = secret_key, msg = data_check_string))
//! ```
//!
//! where `data_check_string` is every field except `hash`, sorted by key and
//! joined as `key=value` lines.

use compact_str::CompactString;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the raw `initData` string.
pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";
const DEFAULT_LANGUAGE_CODE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    #[error("init data is malformed")]
    MalformedInput,
    #[error("init data signature does not match")]
    SignatureMismatch,
    #[error("init data carries no user id")]
    MissingUserId,
    #[error("init data is too old")]
    Expired,
}

/// Identity extracted from a verified `initData` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIdentity {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub language_code: String,
    pub auth_date: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
struct TelegramUser {
    id: Option<i64>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    language_code: Option<String>,
}

#[derive(Clone)]
pub struct InitDataVerifier {
    bot_token: CompactString,
    max_age: Option<time::Duration>,
}

impl core::fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("bot_token", &"[REDACTED]")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl InitDataVerifier {
    pub fn new(bot_token: impl Into<CompactString>) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_age: None,
        }
    }

    /// Reject payloads whose `auth_date` is older than `max_age`.
    pub fn with_max_age(mut self, max_age: Option<time::Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn verify(&self, init_data: &str) -> Result<ParsedIdentity, InitDataError> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        self.verify_at(init_data, now)
    }

    /// Same as [`Self::verify`] with an explicit clock, in unix seconds.
    pub fn verify_at(&self, init_data: &str, now: i64) -> Result<ParsedIdentity, InitDataError> {
        let mut fields = parse_fields(init_data);
        let received_hash = fields
            .remove("hash")
            .filter(|hash| !hash.is_empty())
            .ok_or(InitDataError::MalformedInput)?;

        let expected_hash = hex::encode(signature(&fields, &self.bot_token)?);
        let matches: bool = expected_hash
            .as_bytes()
            .ct_eq(received_hash.as_bytes())
            .into();
        if !matches {
            return Err(InitDataError::SignatureMismatch);
        }

        let auth_date = fields
            .get("auth_date")
            .and_then(|value| value.parse::<i64>().ok());
        if let Some(max_age) = self.max_age {
            let auth_date = auth_date.ok_or(InitDataError::MalformedInput)?;
            if now.saturating_sub(auth_date) > max_age.whole_seconds() {
                return Err(InitDataError::Expired);
            }
        }

        let user = fields.get("user").ok_or(InitDataError::MissingUserId)?;
        let user: TelegramUser =
            serde_json::from_str(user).map_err(|_| InitDataError::MalformedInput)?;
        let id = user.id.ok_or(InitDataError::MissingUserId)?;

        Ok(ParsedIdentity {
            id,
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            language_code: user
                .language_code
                .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_owned()),
            auth_date,
        })
    }
}

/// Verify `init_data` signed for `bot_token`, with no age limit.
pub fn verify(init_data: &str, bot_token: &str) -> Result<ParsedIdentity, InitDataError> {
    InitDataVerifier::new(bot_token).verify(init_data)
}

/// Produce a signed `initData` string the way Telegram does.
///
/// Used by the bot tooling and by tests to stand in for a real Telegram client.
pub fn sign(pairs: &[(&str, &str)], bot_token: &str) -> Result<String, InitDataError> {
    let fields: BTreeMap<String, String> = pairs
        .iter()
        .filter(|(key, _)| *key != "hash")
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    let hash = hex::encode(signature(&fields, bot_token)?);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    Ok(serializer.finish())
}

/// Decode the query string once. A repeated key keeps its last value.
fn parse_fields(init_data: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(init_data.as_bytes())
        .into_owned()
        .collect()
}

fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn signature(fields: &BTreeMap<String, String>, bot_token: &str) -> Result<[u8; 32], InitDataError> {
    let secret_key = hmac_sha256(WEB_APP_DATA_KEY, bot_token.as_bytes())?;
    hmac_sha256(&secret_key, data_check_string(fields).as_bytes())
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; 32], InitDataError> {
    // HMAC takes keys of any length; keying never fails for SHA-256.
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| InitDataError::MalformedInput)?;
    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BOT_TOKEN: &str = "7012345678:AAHk-test-token";
    const USER: &str = r#"{"id":424242,"first_name":"Ana","last_name":"Rojas","username":"ana_r","language_code":"es"}"#;

    fn signed(pairs: &[(&str, &str)]) -> String {
        sign(pairs, BOT_TOKEN).unwrap()
    }

    fn sample() -> String {
        signed(&[
            ("auth_date", "1760000000"),
            ("query_id", "AAF0abc"),
            ("user", USER),
        ])
    }

    #[test]
    fn accepts_a_correctly_signed_payload() {
        let identity = verify(&sample(), BOT_TOKEN).unwrap();
        assert_eq!(identity.id, 424242);
        assert_eq!(identity.first_name, "Ana");
        assert_eq!(identity.last_name, "Rojas");
        assert_eq!(identity.username, "ana_r");
        assert_eq!(identity.language_code, "es");
        assert_eq!(identity.auth_date, Some(1760000000));
    }

    #[test]
    fn verification_is_deterministic() {
        let payload = sample();
        assert_eq!(verify(&payload, BOT_TOKEN), verify(&payload, BOT_TOKEN));
    }

    #[test]
    fn check_string_is_sorted_and_newline_joined() {
        let fields: BTreeMap<String, String> = [("user", "u"), ("auth_date", "1"), ("query_id", "q")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        assert_eq!(data_check_string(&fields), "auth_date=1\nquery_id=q\nuser=u");
    }

    #[test]
    fn field_order_in_the_query_string_does_not_matter() {
        let payload = sample();
        let mut parts: Vec<&str> = payload.split('&').collect();
        parts.reverse();
        let reordered = parts.join("&");
        assert!(verify(&reordered, BOT_TOKEN).is_ok());
    }

    #[test]
    fn missing_hash_is_malformed() {
        let payload = "auth_date=1760000000&user=%7B%22id%22%3A1%7D";
        assert_eq!(verify(payload, BOT_TOKEN), Err(InitDataError::MalformedInput));
        assert_eq!(verify("", BOT_TOKEN), Err(InitDataError::MalformedInput));
        assert_eq!(
            verify("auth_date=1&hash=", BOT_TOKEN),
            Err(InitDataError::MalformedInput)
        );
    }

    #[test]
    fn wrong_bot_token_is_a_mismatch() {
        assert_eq!(
            verify(&sample(), "7012345678:other"),
            Err(InitDataError::SignatureMismatch)
        );
    }

    #[test]
    fn uppercase_hash_is_a_mismatch() {
        let payload = sample();
        let (body, hash) = payload.rsplit_once("hash=").unwrap();
        let tampered = format!("{body}hash={}", hash.to_uppercase());
        assert_eq!(verify(&tampered, BOT_TOKEN), Err(InitDataError::SignatureMismatch));
    }

    #[test]
    fn signed_payload_without_user_lacks_identity() {
        let payload = signed(&[("auth_date", "1760000000"), ("query_id", "AAF0abc")]);
        assert_eq!(verify(&payload, BOT_TOKEN), Err(InitDataError::MissingUserId));

        let payload = signed(&[("auth_date", "1760000000"), ("user", r#"{"first_name":"Ana"}"#)]);
        assert_eq!(verify(&payload, BOT_TOKEN), Err(InitDataError::MissingUserId));
    }

    #[test]
    fn signed_payload_with_broken_user_json_is_malformed() {
        let payload = signed(&[("auth_date", "1760000000"), ("user", "{not json")]);
        assert_eq!(verify(&payload, BOT_TOKEN), Err(InitDataError::MalformedInput));
    }

    #[test]
    fn optional_profile_fields_get_defaults() {
        let payload = signed(&[("auth_date", "1760000000"), ("user", r#"{"id":7}"#)]);
        let identity = verify(&payload, BOT_TOKEN).unwrap();
        assert_eq!(identity.first_name, "");
        assert_eq!(identity.username, "");
        assert_eq!(identity.language_code, "en");
    }

    #[test]
    fn values_with_spaces_survive_decoding() {
        let payload = signed(&[
            ("auth_date", "1760000000"),
            ("user", r#"{"id":7,"first_name":"Ana Maria"}"#),
        ]);
        assert!(payload.contains('+') || payload.contains("%20"));
        let identity = verify(&payload, BOT_TOKEN).unwrap();
        assert_eq!(identity.first_name, "Ana Maria");
    }

    #[test]
    fn max_age_rejects_stale_payloads() {
        let verifier =
            InitDataVerifier::new(BOT_TOKEN).with_max_age(Some(time::Duration::hours(1)));
        let payload = sample();
        assert!(verifier.verify_at(&payload, 1760000000 + 60).is_ok());
        assert_eq!(
            verifier.verify_at(&payload, 1760000000 + 7200),
            Err(InitDataError::Expired)
        );

        let undated = signed(&[("user", USER)]);
        assert_eq!(
            verifier.verify_at(&undated, 1760000000),
            Err(InitDataError::MalformedInput)
        );
    }

    #[test]
    fn debug_output_hides_the_bot_token() {
        let rendered = format!("{:?}", InitDataVerifier::new(BOT_TOKEN));
        assert!(!rendered.contains("AAHk"));
    }

    fn replace_char(value: &str, index: usize) -> String {
        let mut chars: Vec<char> = value.chars().collect();
        let index = index % chars.len();
        chars[index] = if chars[index] == 'x' { 'y' } else { 'x' };
        chars.into_iter().collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_single_character_tamper_is_rejected(
            query_id in "[A-Za-z0-9]{4,16}",
            username in "[a-z0-9_]{3,12}",
            auth_date in 1_600_000_000i64..1_800_000_000,
            field in 0usize..4,
            position in 0usize..64,
        ) {
            let auth_date = auth_date.to_string();
            let user = format!(r#"{{"id":99,"username":"{username}"}}"#);
            let mut fields: BTreeMap<String, String> = [
                ("auth_date", auth_date.as_str()),
                ("query_id", query_id.as_str()),
                ("user", user.as_str()),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
            let hash = hex::encode(signature(&fields, BOT_TOKEN).unwrap());
            fields.insert("hash".to_owned(), hash);

            let key = ["auth_date", "query_id", "user", "hash"][field];
            let tampered = replace_char(&fields[key], position);
            fields.insert(key.to_owned(), tampered);

            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in &fields {
                serializer.append_pair(k, v);
            }
            let payload = serializer.finish();
            prop_assert_eq!(verify(&payload, BOT_TOKEN), Err(InitDataError::SignatureMismatch));
        }
    }
}
