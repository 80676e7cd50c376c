//! Cookie session tokens
//!
//! # Architecture
//!
//! - The session payload (user id, username, login flag, expiry) is serialized
//!   as canonical JSON (sorted keys, no whitespace)
//! - The signature is SHA-256 over the canonical JSON followed by the session
//!   secret as a decimal i64 string, as 64 hex characters
//! - Cookie value: `base64url(canonical json) "." signature`
//! - The secret lives in the `settings` table under `session_secret` and is
//!   generated on first start (random, non-zero)
//!
//! # Pure Functions
//!
//! Apart from secret loading, this module has no HTTP framework dependencies;
//! the server wraps it in axum middleware.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// Cookie carrying the session token
pub const SESSION_COOKIE_NAME: &str = "meal-planner-session";

/// Session lifetime: one week
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Settings key holding the signing secret
pub const SESSION_SECRET_KEY: &str = "session_secret";

// ========================================
// Error Types
// ========================================

/// Session token errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Token is not `payload.signature` or payload is not valid base64/JSON
    Malformed(String),

    /// Signature does not match the payload
    InvalidSignature,

    /// Token expiry has passed
    Expired { expires_at: i64, now: i64 },

    /// Payload says the user is not logged in
    NotLoggedIn,

    /// Database error loading the secret
    DatabaseError(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Malformed(reason) => write!(f, "Malformed session token: {}", reason),
            SessionError::InvalidSignature => write!(f, "Invalid session signature"),
            SessionError::Expired { expires_at, now } => {
                write!(f, "Session expired at {} (now {})", expires_at, now)
            }
            SessionError::NotLoggedIn => write!(f, "Session is not logged in"),
            SessionError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for SessionError {}

// ========================================
// Session Data
// ========================================

/// Data stored in the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user_id: i64,
    pub username: String,
    pub is_logged_in: bool,
    /// Unix seconds after which the token is rejected
    pub expires_at: i64,
}

impl SessionData {
    /// Logged-in session valid for [`SESSION_MAX_AGE_SECS`] from `now`
    pub fn logged_in(user_id: i64, username: impl Into<String>, now: i64) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_logged_in: true,
            expires_at: now + SESSION_MAX_AGE_SECS,
        }
    }
}

// ========================================
// Secret Management
// ========================================

/// Load the session secret from database settings
///
/// Generates and stores a new secret when none exists yet.
#[cfg(feature = "sqlx")]
pub async fn load_session_secret(db: &SqlitePool) -> Result<i64, SessionError> {
    let result: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SESSION_SECRET_KEY)
        .fetch_optional(db)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| SessionError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_session_secret(db).await,
    }
}

/// Generate and store a new random non-zero session secret
///
/// Replacing the secret invalidates every outstanding session.
#[cfg(feature = "sqlx")]
pub async fn initialize_session_secret(db: &SqlitePool) -> Result<i64, SessionError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(SESSION_SECRET_KEY)
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

// ========================================
// Signing
// ========================================

/// Convert JSON to canonical form (sorted keys, no whitespace)
///
/// # Examples
///
/// ```
/// use mealplan_common::session::to_canonical_json;
/// use serde_json::json;
///
/// let json = json!({"z": 3, "a": 1, "m": 2});
/// assert_eq!(to_canonical_json(&json), "{\"a\":1,\"m\":2,\"z\":3}");
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", json_string(k), to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::String(s) => json_string(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Escaped JSON string literal
fn json_string(s: &str) -> String {
    Value::from(s).to_string()
}

/// SHA-256 of `canonical + secret`, as 64 hex characters
pub fn calculate_signature(canonical: &str, secret: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(secret.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare two signatures without short-circuiting on the first difference
fn signatures_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

/// Encode and sign a session as a cookie value
pub fn encode_session(session: &SessionData, secret: i64) -> String {
    // Serializing a plain struct into a Value cannot fail
    let value = serde_json::to_value(session).unwrap_or(Value::Null);
    let canonical = to_canonical_json(&value);
    let signature = calculate_signature(&canonical, secret);
    format!("{}.{}", URL_SAFE_NO_PAD.encode(canonical.as_bytes()), signature)
}

/// Verify and decode a cookie value
///
/// `now` is Unix seconds. Rejects malformed tokens, bad signatures, expired
/// sessions and payloads that are not logged in.
pub fn decode_session(token: &str, secret: i64, now: i64) -> Result<SessionData, SessionError> {
    let (payload, signature) = token
        .split_once('.')
        .ok_or_else(|| SessionError::Malformed("missing signature".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| SessionError::Malformed(format!("payload is not base64: {}", e)))?;
    let canonical = String::from_utf8(bytes)
        .map_err(|_| SessionError::Malformed("payload is not UTF-8".to_string()))?;

    let expected = calculate_signature(&canonical, secret);
    if !signatures_match(signature, &expected) {
        return Err(SessionError::InvalidSignature);
    }

    let session: SessionData = serde_json::from_str(&canonical)
        .map_err(|e| SessionError::Malformed(format!("payload is not session JSON: {}", e)))?;

    if !session.is_logged_in {
        return Err(SessionError::NotLoggedIn);
    }
    if session.expires_at <= now {
        return Err(SessionError::Expired {
            expires_at: session.expires_at,
            now,
        });
    }

    Ok(session)
}

// ========================================
// Cookie Headers
// ========================================

/// `Set-Cookie` value establishing a session
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE_NAME, token, SESSION_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE_NAME
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Find a cookie value in a `Cookie` request header
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: i64 = 123456789;
    const NOW: i64 = 1_764_000_000;

    #[test]
    fn test_encode_decode_roundtrip() {
        let session = SessionData::logged_in(7, "admin", NOW);
        let token = encode_session(&session, SECRET);
        let decoded = decode_session(&token, SECRET, NOW + 10).unwrap();
        assert_eq!(decoded, session);
        assert_eq!(decoded.expires_at, NOW + SESSION_MAX_AGE_SECS);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = encode_session(&SessionData::logged_in(1, "admin", NOW), SECRET);
        assert_eq!(
            decode_session(&token, 987654321, NOW),
            Err(SessionError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = encode_session(&SessionData::logged_in(1, "admin", NOW), SECRET);
        let (_, signature) = token.split_once('.').unwrap();
        let forged = SessionData::logged_in(2, "admin", NOW);
        let forged_payload = URL_SAFE_NO_PAD.encode(
            to_canonical_json(&serde_json::to_value(&forged).unwrap()).as_bytes(),
        );
        let forged_token = format!("{}.{}", forged_payload, signature);
        assert_eq!(
            decode_session(&forged_token, SECRET, NOW),
            Err(SessionError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_rejected() {
        let token = encode_session(&SessionData::logged_in(1, "admin", NOW), SECRET);
        let result = decode_session(&token, SECRET, NOW + SESSION_MAX_AGE_SECS);
        assert!(matches!(result, Err(SessionError::Expired { .. })));
    }

    #[test]
    fn test_logged_out_payload_rejected() {
        let mut session = SessionData::logged_in(1, "admin", NOW);
        session.is_logged_in = false;
        let token = encode_session(&session, SECRET);
        assert_eq!(
            decode_session(&token, SECRET, NOW),
            Err(SessionError::NotLoggedIn)
        );
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(matches!(
            decode_session("no-dot-here", SECRET, NOW),
            Err(SessionError::Malformed(_))
        ));
        assert!(matches!(
            decode_session("!!!.abc", SECRET, NOW),
            Err(SessionError::Malformed(_))
        ));
    }

    #[test]
    fn test_roundtrip_with_control_characters() {
        let session = SessionData::logged_in(3, "tab\there\u{1}\"quoted\"\\", NOW);
        let token = encode_session(&session, SECRET);
        assert_eq!(decode_session(&token, SECRET, NOW + 1).unwrap(), session);
    }

    #[test]
    fn test_canonical_json_sorting() {
        let json = serde_json::json!({
            "z_field": "last",
            "a_field": "first",
            "m_field": "middle"
        });

        let canonical = to_canonical_json(&json);
        let a_pos = canonical.find("\"a_field\"").unwrap();
        let m_pos = canonical.find("\"m_field\"").unwrap();
        let z_pos = canonical.find("\"z_field\"").unwrap();
        assert!(a_pos < m_pos);
        assert!(m_pos < z_pos);
        assert!(!canonical.contains(' '));
    }

    #[test]
    fn test_signature_shape() {
        let sig = calculate_signature("{\"a\":1}", SECRET);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(sig, calculate_signature("{\"a\":1}", SECRET + 1));
    }

    #[test]
    fn test_cookie_headers() {
        let set = session_cookie("abc.def", false);
        assert!(set.starts_with("meal-planner-session=abc.def;"));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("SameSite=Lax"));
        assert!(set.contains("Max-Age=604800"));
        assert!(!set.contains("Secure"));
        assert!(session_cookie("x", true).ends_with("; Secure"));

        let clear = clear_session_cookie(false);
        assert!(clear.contains("Max-Age=0"));
    }

    #[test]
    fn test_find_cookie() {
        let header = "theme=dark; meal-planner-session=abc.def; other=1";
        assert_eq!(find_cookie(header, SESSION_COOKIE_NAME), Some("abc.def"));
        assert_eq!(find_cookie(header, "missing"), None);
        assert_eq!(find_cookie("", SESSION_COOKIE_NAME), None);
    }
}
