//! HS256 token issuing and verification.
//!
//! Tokens carry a fixed claim set (`sub`, `iat`, `nbf`, `exp`, `iss`, `aud`).
//! Verification rejects on the first violation, in this order:
//!
//! 1. algorithm other than HS256 (including `none`)
//! 2. signature
//! 3. expiry
//! 4. audience
//! 5. issuer
//!
//! Time checks use zero leeway.
//!
//! ## Example
//!
//! ```ignore
//! use gophersocial_auth::token::{Claims, JwtAuthenticator};
//!
//! let auth = JwtAuthenticator::new("secret", "gophersocial", "gophersocial");
//! let token = auth.issue(&auth.claims_for(42))?;
//! let claims = auth.verify(&token)?;
//! assert_eq!(claims.subject_id()?, 42);
//! ```

use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::TokenConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while issuing or verifying tokens.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The token header names an algorithm other than HS256.
    #[error("token algorithm rejected: {algorithm}")]
    AlgorithmRejected {
        /// The algorithm named in the header.
        algorithm: String,
    },

    /// The token signature does not verify against the secret.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The token's `exp` is not in the future.
    #[error("token has expired")]
    TokenExpired,

    /// The token's `aud` is not the configured audience.
    #[error("token audience mismatch")]
    TokenAudienceMismatch,

    /// The token's `iss` is not the configured issuer.
    #[error("token issuer mismatch")]
    TokenIssuerMismatch,

    /// The token is malformed or its claims cannot be used.
    #[error("invalid token: {message}")]
    TokenInvalid {
        /// Description of the defect.
        message: String,
    },

    /// The token could not be signed.
    #[error("failed to sign token: {message}")]
    SigningError {
        /// Description of the signing failure.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `TokenInvalid` error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::TokenInvalid {
            message: message.into(),
        }
    }

    /// Creates a new `SigningError`.
    #[must_use]
    pub fn signing_error(message: impl Into<String>) -> Self {
        Self::SigningError {
            message: message.into(),
        }
    }

    /// Returns `true` if the error means the presented credentials are bad,
    /// `false` for failures on the server side.
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        !matches!(self, Self::SigningError { .. })
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidSignature => Self::SignatureInvalid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::AlgorithmRejected {
                    algorithm: "unsupported".to_string(),
                }
            }
            ErrorKind::ImmatureSignature => Self::invalid("token is not valid yet"),
            _ => Self::invalid(err.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user id, as a string.
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    /// Claims for `user_id`, valid from now for `lifetime`.
    #[must_use]
    pub fn for_subject(
        user_id: i64,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: user_id.to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(lifetime),
            iss: issuer.into(),
            aud: audience.into(),
        }
    }

    /// Parses the subject as a user id.
    ///
    /// # Errors
    ///
    /// `TokenInvalid` if the subject is not numeric.
    pub fn subject_id(&self) -> Result<i64, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::invalid(format!("subject '{}' is not a user id", self.sub)))
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

// ============================================================================
// Authenticator
// ============================================================================

/// Issues and verifies HS256 tokens for a single issuer and audience.
///
/// Pure computation: holds no mutable state and does no I/O, so one instance
/// can be shared across tasks behind an `Arc`.
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secret_is_empty: bool,
    issuer: String,
    audience: String,
    lifetime: Duration,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Creates an authenticator with the default token lifetime.
    #[must_use]
    pub fn new(
        secret: impl AsRef<[u8]>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Audience and issuer are compared after decoding so that the
        // audience failure wins when both are wrong.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            secret_is_empty: secret.is_empty(),
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime: TokenConfig::default().lifetime,
            validation,
        }
    }

    /// Creates an authenticator from configuration.
    #[must_use]
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(&config.secret, &config.issuer, &config.audience).with_lifetime(config.lifetime)
    }

    /// Sets the lifetime used by [`Self::claims_for`].
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Claims for `user_id` with this authenticator's issuer, audience and lifetime.
    #[must_use]
    pub fn claims_for(&self, user_id: i64) -> Claims {
        Claims::for_subject(user_id, &self.issuer, &self.audience, self.lifetime)
    }

    /// Signs `claims` as-is.
    ///
    /// # Errors
    ///
    /// `SigningError` if the secret is empty or encoding fails.
    pub fn issue(&self, claims: &Claims) -> Result<String, JwtError> {
        if self.secret_is_empty {
            return Err(JwtError::signing_error("signing secret is empty"));
        }
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::signing_error(e.to_string()))
    }

    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// The first violated check, see the module documentation.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let algorithm = header_algorithm(token)?;
        if algorithm != "HS256" {
            tracing::debug!(algorithm = %algorithm, "token algorithm rejected");
            return Err(JwtError::AlgorithmRejected { algorithm });
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(JwtError::TokenExpired);
        }
        if claims.aud != self.audience {
            return Err(JwtError::TokenAudienceMismatch);
        }
        if claims.iss != self.issuer {
            return Err(JwtError::TokenIssuerMismatch);
        }

        Ok(claims)
    }

    /// Returns the configured issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the configured audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// Reads `alg` from the header segment without trusting the library's
/// algorithm list, which has no variant for `none`.
fn header_algorithm(token: &str) -> Result<String, JwtError> {
    let header = token
        .split('.')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| JwtError::invalid("token has no header"))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| JwtError::invalid("token header is not base64url"))?;

    let raw: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| JwtError::invalid(format!("token header is not valid JSON: {e}")))?;

    Ok(raw.alg)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> JwtAuthenticator {
        JwtAuthenticator::new("test-secret", "gophersocial", "gophersocial")
    }

    fn now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let auth = authenticator();
        let claims = auth.claims_for(42);

        let token = auth.issue(&claims).unwrap();
        let verified = auth.verify(&token).unwrap();

        assert_eq!(verified, claims);
        assert_eq!(verified.subject_id().unwrap(), 42);
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = authenticator();
        let mut claims = auth.claims_for(1);
        claims.iat = now() - 7200;
        claims.nbf = now() - 7200;
        claims.exp = now() - 3600;

        let token = auth.issue(&claims).unwrap();
        assert!(matches!(auth.verify(&token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = authenticator().issue(&authenticator().claims_for(1)).unwrap();
        let other = JwtAuthenticator::new("other-secret", "gophersocial", "gophersocial");

        assert!(matches!(other.verify(&token), Err(JwtError::SignatureInvalid)));
    }

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let auth = authenticator();
        let token = encode(
            &Header::new(Algorithm::HS384),
            &auth.claims_for(1),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        match auth.verify(&token) {
            Err(JwtError::AlgorithmRejected { algorithm }) => assert_eq!(algorithm, "HS384"),
            other => panic!("expected AlgorithmRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let auth = authenticator();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&auth.claims_for(1)).unwrap());
        let token = format!("{header}.{payload}.");

        assert!(matches!(
            auth.verify(&token),
            Err(JwtError::AlgorithmRejected { .. })
        ));
    }

    #[test]
    fn test_audience_checked_before_issuer() {
        let auth = authenticator();

        let mut claims = auth.claims_for(1);
        claims.aud = "someone-else".to_string();
        let token = auth.issue(&claims).unwrap();
        assert!(matches!(
            auth.verify(&token),
            Err(JwtError::TokenAudienceMismatch)
        ));

        claims.iss = "someone-else".to_string();
        let token = auth.issue(&claims).unwrap();
        assert!(matches!(
            auth.verify(&token),
            Err(JwtError::TokenAudienceMismatch)
        ));

        let mut claims = auth.claims_for(1);
        claims.iss = "someone-else".to_string();
        let token = auth.issue(&claims).unwrap();
        assert!(matches!(
            auth.verify(&token),
            Err(JwtError::TokenIssuerMismatch)
        ));
    }

    #[test]
    fn test_not_yet_valid_token_rejected() {
        let auth = authenticator();
        let mut claims = auth.claims_for(1);
        claims.nbf = now() + 3600;

        let token = auth.issue(&claims).unwrap();
        assert!(matches!(
            auth.verify(&token),
            Err(JwtError::TokenInvalid { .. })
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let auth = authenticator();
        for token in ["", "not-a-token", "a.b.c", "!!!.???.###"] {
            let err = auth.verify(token).unwrap_err();
            assert!(
                matches!(err, JwtError::TokenInvalid { .. }),
                "{token:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_empty_secret_cannot_sign() {
        let auth = JwtAuthenticator::new("", "gophersocial", "gophersocial");
        let err = auth.issue(&auth.claims_for(1)).unwrap_err();

        assert!(matches!(err, JwtError::SigningError { .. }));
        assert!(!err.is_credential_error());
        assert!(JwtError::TokenExpired.is_credential_error());
    }

    #[test]
    fn test_non_numeric_subject() {
        let mut claims = authenticator().claims_for(1);
        claims.sub = "gopher".to_string();
        assert!(matches!(
            claims.subject_id(),
            Err(JwtError::TokenInvalid { .. })
        ));
    }

    #[test]
    fn test_claims_for_subject_lifetime() {
        let claims = Claims::for_subject(7, "iss", "aud", Duration::from_secs(60));
        assert_eq!(claims.exp - claims.iat, 60);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.sub, "7");
    }
}
