//! Token records and credential primitives.
//!
//! A credential is 32 random bytes, hex-encoded to a 64-character string.
//! Only its leading [`TOKEN_KEY_LENGTH`] characters (the token key) are
//! stored in the clear; the rest of the record keeps a SHA-256 digest of
//! the decoded credential bytes. Presenting the full credential is the
//! only way to match the digest.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;

/// Number of leading credential characters used as the public lookup key.
pub const TOKEN_KEY_LENGTH: usize = 15;

/// Length of a plaintext credential in characters.
pub const CREDENTIAL_LENGTH: usize = 64;

/// Rejection message shared by every credential failure, so a malformed
/// credential is indistinguishable from a wrong one.
pub(crate) const CREDENTIAL_REJECTED: &str = "credential rejected";

/// Generates a fresh plaintext credential.
#[must_use]
pub fn generate_credential() -> String {
    let mut bytes = [0u8; CREDENTIAL_LENGTH / 2];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    hex::encode(bytes)
}

/// Extracts the public lookup key from a credential.
///
/// Credentials shorter than [`TOKEN_KEY_LENGTH`] are returned whole; they
/// can never match a stored digest, but key extraction itself must not
/// reject them.
#[must_use]
pub fn token_key(credential: &str) -> &str {
    credential.get(..TOKEN_KEY_LENGTH).unwrap_or(credential)
}

/// Hashes a plaintext credential to its stored digest.
///
/// The credential is hex-decoded first, so anything that is not valid hex
/// fails with the generic invalid-token error.
pub fn hash_credential(credential: &str) -> AuthResult<String> {
    use sha2::{Digest, Sha256};

    let bytes =
        hex::decode(credential).map_err(|_| AuthError::invalid_token(CREDENTIAL_REJECTED))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Compares two digests in constant time.
#[must_use]
pub fn digests_match(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Authoritative token record, as persisted by the token store.
///
/// The plaintext credential is never part of the record. It is returned
/// to the client exactly once at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    /// Public lookup key: the leading characters of the credential.
    /// Not a secret, but not sufficient to authenticate either.
    pub token_key: String,

    /// SHA-256 hex digest of the decoded credential bytes.
    pub digest: String,

    /// Owning user.
    pub user_id: Uuid,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token expires. `None` means the token never expires.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl AuthToken {
    /// Issues a new token for a user.
    ///
    /// Returns the record to persist together with the plaintext
    /// credential to hand to the client.
    pub fn issue(
        user_id: Uuid,
        ttl: Option<std::time::Duration>,
    ) -> AuthResult<(Self, String)> {
        let credential = generate_credential();
        let digest = hash_credential(&credential)?;
        let now = OffsetDateTime::now_utc();
        let token = Self {
            token_key: token_key(&credential).to_string(),
            digest,
            user_id,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        };
        Ok((token, credential))
    }

    /// Returns `true` if the token has an expiry in the past.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| expires_at < OffsetDateTime::now_utc())
            .unwrap_or(false)
    }
}

/// Cache-resident projection of an [`AuthToken`].
///
/// Serialized as a flat JSON object with fixed field names, so entries
/// written by other services sharing the cache stay readable:
///
/// ```json
/// {"digest": "...", "ownerId": "...", "createdAt": "...",
///  "expiresAt": null, "tokenKey": "..."}
/// ```
///
/// `expiresAt` is always present, `null` marking a non-expiring token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedToken {
    /// SHA-256 hex digest of the decoded credential bytes.
    pub digest: String,

    /// Owning user.
    #[serde(rename = "ownerId")]
    pub user_id: Uuid,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token expires. Kept explicit in the wire format: absent
    /// and null are not the same thing, and absent entries are rejected.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,

    /// Public lookup key, echoed into the entry for sweeps that only
    /// have the entry in hand.
    pub token_key: String,
}

impl CachedToken {
    /// Returns `true` if the cached entry has an expiry in the past.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| expires_at < OffsetDateTime::now_utc())
            .unwrap_or(false)
    }
}

impl From<&AuthToken> for CachedToken {
    fn from(token: &AuthToken) -> Self {
        Self {
            digest: token.digest.clone(),
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            token_key: token.token_key.clone(),
        }
    }
}

/// Non-secret view of the token a request authenticated with.
///
/// Handed to callers on success; the digest never leaves this crate's
/// authentication path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    /// Public lookup key.
    pub token_key: String,

    /// Owning user.
    pub user_id: Uuid,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl From<&AuthToken> for TokenView {
    fn from(token: &AuthToken) -> Self {
        Self {
            token_key: token.token_key.clone(),
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
        }
    }
}

impl From<&CachedToken> for TokenView {
    fn from(cached: &CachedToken) -> Self {
        Self {
            token_key: cached.token_key.clone(),
            user_id: cached.user_id,
            created_at: cached.created_at,
            expires_at: cached.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_credential_format() {
        let credential = generate_credential();
        assert_eq!(credential.len(), CREDENTIAL_LENGTH);
        assert!(credential.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(credential, credential.to_lowercase());
    }

    #[test]
    fn test_generate_credential_unique() {
        let a = generate_credential();
        let b = generate_credential();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_key_extraction() {
        let credential = generate_credential();
        let key = token_key(&credential);
        assert_eq!(key.len(), TOKEN_KEY_LENGTH);
        assert!(credential.starts_with(key));

        // Shorter input comes back whole instead of panicking.
        assert_eq!(token_key("abc"), "abc");
        assert_eq!(token_key(""), "");
    }

    #[test]
    fn test_hash_credential_deterministic() {
        let credential = generate_credential();
        let a = hash_credential(&credential).unwrap();
        let b = hash_credential(&credential).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = hash_credential(&generate_credential()).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_hash_credential_rejects_non_hex() {
        let err = hash_credential("not-hex-at-all!").unwrap_err();
        assert!(err.is_invalid_token());

        // Odd-length hex cannot decode either.
        let err = hash_credential("abc").unwrap_err();
        assert!(err.is_invalid_token());
    }

    #[test]
    fn test_digests_match() {
        let digest = hash_credential(&generate_credential()).unwrap();
        assert!(digests_match(&digest, &digest.clone()));
        assert!(!digests_match(&digest, "0000"));
        assert!(!digests_match("", &digest));
    }

    #[test]
    fn test_issue_token() {
        let user_id = Uuid::new_v4();
        let (token, credential) =
            AuthToken::issue(user_id, Some(Duration::from_secs(3600))).unwrap();

        assert_eq!(token.user_id, user_id);
        assert_eq!(token.token_key, token_key(&credential));
        assert_eq!(token.digest, hash_credential(&credential).unwrap());
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_issue_token_without_ttl_never_expires() {
        let (token, _) = AuthToken::issue(Uuid::new_v4(), None).unwrap();
        assert_eq!(token.expires_at, None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_is_expired() {
        let (mut token, _) = AuthToken::issue(Uuid::new_v4(), None).unwrap();
        token.expires_at = Some(OffsetDateTime::now_utc() - Duration::from_secs(1));
        assert!(token.is_expired());

        token.expires_at = Some(OffsetDateTime::now_utc() + Duration::from_secs(60));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_wire_format() {
        let (token, _) = AuthToken::issue(Uuid::new_v4(), None).unwrap();
        let cached = CachedToken::from(&token);
        let json: serde_json::Value = serde_json::to_value(&cached).unwrap();

        let object = json.as_object().unwrap();
        assert!(object.contains_key("digest"));
        assert!(object.contains_key("ownerId"));
        assert!(object.contains_key("createdAt"));
        assert!(object.contains_key("expiresAt"));
        assert!(object.contains_key("tokenKey"));
        assert_eq!(object.len(), 5);

        // A non-expiring token serializes an explicit null.
        assert!(object["expiresAt"].is_null());
        assert_eq!(object["tokenKey"], token.token_key);
    }

    #[test]
    fn test_cached_token_roundtrip() {
        let (token, _) =
            AuthToken::issue(Uuid::new_v4(), Some(Duration::from_secs(600))).unwrap();
        let cached = CachedToken::from(&token);
        let bytes = serde_json::to_vec(&cached).unwrap();
        let decoded: CachedToken = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, cached);
    }

    #[test]
    fn test_cached_token_rejects_missing_expiry_field() {
        let raw = r#"{"digest":"d","ownerId":"8f9f4e58-6b33-4f0e-8f14-7c2f3edbbf11","createdAt":"2026-01-01T00:00:00Z","tokenKey":"k"}"#;
        assert!(serde_json::from_str::<CachedToken>(raw).is_err());
    }

    #[test]
    fn test_token_view_hides_digest() {
        let (token, _) = AuthToken::issue(Uuid::new_v4(), None).unwrap();
        let view = TokenView::from(&token);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains(&token.digest));
        assert!(json.contains(&token.token_key));
    }
}
