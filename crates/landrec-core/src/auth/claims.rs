//! Local decoding of access-token claims.
//!
//! The payload segment is decoded but never verified: claims gate UI
//! affordances only, and the backend re-checks authorization on every
//! request. Malformed input of any shape degrades to empty defaults
//! instead of an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Attributes embedded in the access token's payload segment.
///
/// The backend puts `user_id` and `groups` in its tokens; `is_superuser`
/// and `username` are optional extras. Absent fields decode to defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Claims {
    /// Decode the middle of a three-segment signed token.
    pub fn decode(token: &str) -> Self {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next()) {
            (Some(_), Some(payload)) if !payload.is_empty() => payload,
            _ => return Self::default(),
        };
        let bytes = match URL_SAFE_NO_PAD.decode(payload) {
            Ok(bytes) => bytes,
            Err(_) => return Self::default(),
        };
        serde_json::from_slice(&bytes).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &serde_json::Value) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("header.{encoded}.signature")
    }

    #[test]
    fn decodes_backend_claims() {
        let token = token_with_payload(&serde_json::json!({
            "user_id": 42,
            "username": "alice",
            "is_superuser": true,
            "groups": ["Administrators", "Editors"],
        }));
        let claims = Claims::decode(&token);
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "alice");
        assert!(claims.is_superuser);
        assert_eq!(claims.groups, vec!["Administrators", "Editors"]);
    }

    #[test]
    fn absent_fields_default() {
        let token = token_with_payload(&serde_json::json!({ "user_id": 3 }));
        let claims = Claims::decode(&token);
        assert_eq!(claims.user_id, 3);
        assert!(!claims.is_superuser);
        assert!(claims.groups.is_empty());
    }

    #[test]
    fn malformed_tokens_never_panic() {
        for token in ["", "no-dots", "a.b.c", "a.!!!not-base64!!!.c", "a..c"] {
            assert_eq!(Claims::decode(token), Claims::default(), "token {token:?}");
        }
        // valid base64, not JSON
        let token = format!("a.{}.c", URL_SAFE_NO_PAD.encode("not json"));
        assert_eq!(Claims::decode(&token), Claims::default());
    }
}
