//! Identity Types

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Authenticated user as reported by the auth provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    /// May be absent for phone-only accounts
    #[serde(default)]
    pub email: Option<String>,
}

/// Profile row owned by the auth provider's database
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Profile {
    /// Full name, treating an empty string as unset
    pub fn display_name(&self) -> Option<&str> {
        self.full_name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Credentials presented with a request (an access token)
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
}

impl Credentials {
    /// Wrap a raw access token; blank tokens are rejected
    pub fn bearer(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            access_token: trimmed.to_string(),
        })
    }

    /// Parse an `Authorization` header value of the form `Bearer <token>`
    pub fn from_authorization(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Self::bearer(token)
    }

    /// Find the Supabase session in a `Cookie` header value
    ///
    /// The browser client stores the session as `sb-<project-ref>-auth-token`,
    /// split into `.0`, `.1`, ... chunks when it is too large for one cookie.
    pub fn from_cookie_header(value: &str) -> Option<Self> {
        let mut whole = None;
        let mut chunks: Vec<(usize, &str)> = Vec::new();

        for (name, cookie) in value.split(';').filter_map(|pair| pair.trim().split_once('=')) {
            let Some(rest) = name.strip_prefix(SESSION_COOKIE_PREFIX) else {
                continue;
            };
            if is_session_cookie(rest) {
                whole = Some(cookie.to_string());
            } else if let Some((base, index)) = rest.rsplit_once('.') {
                if let (true, Ok(index)) = (is_session_cookie(base), index.parse()) {
                    chunks.push((index, cookie));
                }
            }
        }

        let raw = whole.or_else(|| {
            chunks.sort_by_key(|(index, _)| *index);
            (!chunks.is_empty()).then(|| chunks.into_iter().map(|(_, part)| part).collect())
        })?;

        Self::bearer(session_access_token(&raw)?)
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

const SESSION_COOKIE_PREFIX: &str = "sb-";
const SESSION_COOKIE_SUFFIX: &str = "-auth-token";
const BASE64_PREFIX: &str = "base64-";

/// `<project-ref>-auth-token` with a non-empty project ref
fn is_session_cookie(name: &str) -> bool {
    name.strip_suffix(SESSION_COOKIE_SUFFIX)
        .is_some_and(|project| !project.is_empty())
}

/// Access token out of a stored session cookie value
///
/// Values are URL-encoded and either `base64-<base64url JSON>` or the JSON
/// itself: a session object, or the older `[access_token, refresh_token, ..]`
/// array. Anything that is not a session document is taken as the token.
fn session_access_token(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;

    let document = match decoded.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
            String::from_utf8(bytes).ok()?
        }
        None => decoded.into_owned(),
    };

    match serde_json::from_str::<serde_json::Value>(&document) {
        Ok(serde_json::Value::Object(session)) => session
            .get("access_token")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string),
        Ok(serde_json::Value::Array(parts)) => parts
            .first()
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string),
        Ok(_) => None,
        Err(_) => Some(document),
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let creds = Credentials::from_authorization("Bearer abc.def").unwrap();
        assert_eq!(creds.access_token(), "abc.def");

        let creds = Credentials::from_authorization("bearer   xyz").unwrap();
        assert_eq!(creds.access_token(), "xyz");

        assert!(Credentials::from_authorization("Basic dXNlcjpwYXNz").is_none());
        assert!(Credentials::from_authorization("Bearer ").is_none());
        assert!(Credentials::from_authorization("token").is_none());
    }

    fn encoded_session(token: &str) -> String {
        let session = serde_json::json!({
            "access_token": token,
            "refresh_token": "refresh",
            "token_type": "bearer",
            "user": {"id": "u1"}
        });
        format!("base64-{}", URL_SAFE_NO_PAD.encode(session.to_string()))
    }

    #[test]
    fn test_session_cookie_base64() {
        let header = format!(
            "theme=dark; sb-abcdefgh-auth-token={}; other=1",
            encoded_session("tok123")
        );
        let creds = Credentials::from_cookie_header(&header).unwrap();
        assert_eq!(creds.access_token(), "tok123");
    }

    #[test]
    fn test_session_cookie_url_encoded_json() {
        let header = "sb-abcdefgh-auth-token=%7B%22access_token%22%3A%22tok456%22%7D";
        let creds = Credentials::from_cookie_header(header).unwrap();
        assert_eq!(creds.access_token(), "tok456");

        let legacy = "sb-abcdefgh-auth-token=%5B%22tok789%22%2C%22refresh%22%2Cnull%5D";
        let creds = Credentials::from_cookie_header(legacy).unwrap();
        assert_eq!(creds.access_token(), "tok789");
    }

    #[test]
    fn test_session_cookie_chunks_joined_in_order() {
        let value = encoded_session("chunked-token");
        let (first, second) = value.split_at(value.len() / 2);
        let header = format!(
            "sb-abcdefgh-auth-token.1={second}; sb-abcdefgh-auth-token.0={first}"
        );
        let creds = Credentials::from_cookie_header(&header).unwrap();
        assert_eq!(creds.access_token(), "chunked-token");
    }

    #[test]
    fn test_session_cookie_bare_token() {
        let creds = Credentials::from_cookie_header("sb-abcdefgh-auth-token=good").unwrap();
        assert_eq!(creds.access_token(), "good");
    }

    #[test]
    fn test_unrelated_cookies_ignored() {
        assert!(Credentials::from_cookie_header("theme=dark").is_none());
        assert!(Credentials::from_cookie_header("sb-access-token=tok").is_none());
        assert!(Credentials::from_cookie_header("sb--auth-token=tok").is_none());
        assert!(
            Credentials::from_cookie_header("sb-abcdefgh-auth-token-code-verifier=abc").is_none()
        );
        assert!(Credentials::from_cookie_header("sb-abcdefgh-auth-token=%7B%7D").is_none());
        assert!(Credentials::from_cookie_header("sb-abcdefgh-auth-token=base64-%%%").is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::bearer("secret-token").unwrap();
        assert!(!format!("{creds:?}").contains("secret-token"));
    }

    #[test]
    fn test_profile_display_name() {
        let mut profile = Profile {
            id: "u1".into(),
            email: "a@example.com".into(),
            full_name: Some("  ".into()),
        };
        assert_eq!(profile.display_name(), None);
        profile.full_name = Some("Ada".into());
        assert_eq!(profile.display_name(), Some("Ada"));
    }
}
