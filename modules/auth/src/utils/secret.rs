use subtle::ConstantTimeEq;

/// Header the bot uses to prove it holds the shared secret.
pub const BOT_TOKEN_HEADER: &str = "x-bot-token";

/// Exact, constant-time comparison of a presented secret against the configured one.
///
/// An empty configured secret never matches.
pub fn secrets_match(expected: &str, presented: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}
