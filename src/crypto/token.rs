use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Allowance for clock skew on the issued-at claim, in seconds.
const IAT_LEEWAY_SECS: i64 = 60;

/// The two token kinds carried in the `kind` claim.
///
/// An access token is never persisted; a refresh token is tracked
/// server-side (hashed) so it can be revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Decode failures, categorized so callers can translate uniformly.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    SignatureInvalid,

    #[error("Unexpected token kind")]
    WrongKind,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::SignatureInvalid
            }
            _ => TokenError::Malformed,
        }
    }
}

/// The signed claim set, validated once at decode time.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub sub: Uuid,
    /// Token kind (access or refresh).
    pub kind: TokenKind,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Unique id for this token.
    pub jti: Uuid,
}

/// A freshly issued token together with its expiry.
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access/refresh tokens with HS256.
///
/// Keys are derived once from the configured secret and are immutable
/// for the lifetime of the process.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    /// Creates a new codec from the signing secret and configured TTLs.
    pub fn new(secret: &[u8], access_ttl_minutes: i64, refresh_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    /// Access token lifetime in seconds, for `expires_in` responses.
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Issues a signed token of the given kind for the given subject.
    pub fn issue(&self, subject: Uuid, kind: TokenKind) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires_at = now + ttl;

        let claims = Claims {
            sub: subject,
            kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Decodes a token and checks it against the expected kind.
    ///
    /// Rejects bad signatures, expired tokens, kind mismatches, and
    /// tokens issued in the future beyond a small clock-skew allowance.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        // Strict expiration: an access token one second past `exp` is dead.
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        let claims = data.claims;

        if claims.iat > Utc::now().timestamp() + IAT_LEEWAY_SECS {
            return Err(TokenError::Malformed);
        }

        if claims.kind != expected {
            return Err(TokenError::WrongKind);
        }

        Ok(claims)
    }
}

/// SHA-256 hex fingerprint of a raw refresh token.
///
/// This is what the session store persists; the token itself is
/// high-entropy, so a fast hash is enough here (unlike passwords).
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_for_testing_only_32bytes!";

    fn codec() -> TokenCodec {
        TokenCodec::new(TEST_SECRET, 15, 7)
    }

    #[test]
    fn issue_then_decode_roundtrip() {
        let codec = codec();
        let subject = Uuid::new_v4();

        let issued = codec.issue(subject, TokenKind::Access).unwrap();
        let claims = codec.decode(&issued.token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, subject);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert!(claims.iat <= Utc::now().timestamp());
    }

    #[test]
    fn refresh_outlives_access() {
        let codec = codec();
        let subject = Uuid::new_v4();

        let access = codec.issue(subject, TokenKind::Access).unwrap();
        let refresh = codec.issue(subject, TokenKind::Refresh).unwrap();

        assert!(refresh.expires_at > access.expires_at);
    }

    #[test]
    fn refresh_token_rejected_where_access_expected() {
        let codec = codec();
        let issued = codec.issue(Uuid::new_v4(), TokenKind::Refresh).unwrap();

        let result = codec.decode(&issued.token, TokenKind::Access);
        assert!(matches!(result, Err(TokenError::WrongKind)));
    }

    #[test]
    fn access_token_rejected_where_refresh_expected() {
        let codec = codec();
        let issued = codec.issue(Uuid::new_v4(), TokenKind::Access).unwrap();

        let result = codec.decode(&issued.token, TokenKind::Refresh);
        assert!(matches!(result, Err(TokenError::WrongKind)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new(TEST_SECRET, -1, 7);
        let issued = codec.issue(Uuid::new_v4(), TokenKind::Access).unwrap();

        let result = codec.decode(&issued.token, TokenKind::Access);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issued = codec().issue(Uuid::new_v4(), TokenKind::Access).unwrap();
        let other = TokenCodec::new(b"a_completely_different_secret_32bytes!!!", 15, 7);

        let result = other.decode(&issued.token, TokenKind::Access);
        assert!(matches!(result, Err(TokenError::SignatureInvalid)));
    }

    #[test]
    fn garbage_is_malformed() {
        let result = codec().decode("not.a.token", TokenKind::Access);
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn token_issued_in_the_future_is_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            kind: TokenKind::Access,
            iat: now + 3600,
            exp: now + 7200,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        let result = codec.decode(&token, TokenKind::Access);
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn each_token_gets_a_unique_jti() {
        let codec = codec();
        let subject = Uuid::new_v4();

        let a = codec.issue(subject, TokenKind::Access).unwrap();
        let b = codec.issue(subject, TokenKind::Access).unwrap();

        let claims_a = codec.decode(&a.token, TokenKind::Access).unwrap();
        let claims_b = codec.decode(&b.token, TokenKind::Access).unwrap();
        assert_ne!(claims_a.jti, claims_b.jti);
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishes_tokens() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(fingerprint("abc").len(), 64);
    }
}
