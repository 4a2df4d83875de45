//! JWT token generation and verification.
//!
//! Access and refresh tokens share one claims shape. They are told apart by
//! the `token_type` claim and by the secret that signs them: the caller picks
//! the secret when decoding, and the decoded kind must match it as well.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::warn;

use super::AuthError;
use crate::models::auth::{AuthIdentity, TokenClaims, TokenKind};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

/// Value of the `iss` claim on every token this service signs.
pub const TOKEN_ISSUER: &str = "crux-backend";

impl TokenKind {
    /// Lifetime of a token of this kind, in seconds.
    pub fn expiry_secs(self) -> i64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_EXPIRY_SECS,
            TokenKind::Refresh => REFRESH_TOKEN_EXPIRY_SECS,
        }
    }
}

/// Why a token failed to decode. Logged, never shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("signature does not match")]
    BadSignature,

    #[error("signing algorithm is not HMAC")]
    WrongAlgorithm,

    #[error("unexpected issuer")]
    WrongIssuer,

    #[error("expected {expected} token, got {found}")]
    WrongKind {
        expected: TokenKind,
        found: TokenKind,
    },

    #[error("malformed token: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::WrongAlgorithm
            }
            ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
            _ => TokenError::Malformed(e.to_string()),
        }
    }
}

/// Raised at startup when a signing secret is unusable.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("{0} token secret must not be empty")]
    Empty(TokenKind),
}

/// The two HMAC secrets, one per token kind.
#[derive(Clone)]
pub struct JwtSecrets {
    access: Vec<u8>,
    refresh: Vec<u8>,
}

impl JwtSecrets {
    /// Both secrets are required; an empty one refuses to construct.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Result<Self, SecretError> {
        let access = access.into();
        let refresh = refresh.into();
        if access.is_empty() {
            return Err(SecretError::Empty(TokenKind::Access));
        }
        if refresh.is_empty() {
            return Err(SecretError::Empty(TokenKind::Refresh));
        }
        if access == refresh {
            warn!("access and refresh token secrets are identical");
        }
        Ok(Self {
            access: access.into_bytes(),
            refresh: refresh.into_bytes(),
        })
    }

    fn for_kind(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

impl fmt::Debug for JwtSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSecrets")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Stateless encoder/decoder for access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secrets: JwtSecrets,
}

impl TokenCodec {
    pub fn new(secrets: JwtSecrets) -> Self {
        Self { secrets }
    }

    /// Sign a token of `kind` for `identity`, issued now.
    pub fn encode(&self, kind: TokenKind, identity: &AuthIdentity) -> Result<IssuedToken, AuthError> {
        self.encode_at(kind, identity, Utc::now())
    }

    /// Sign a token of `kind` for `identity` as if issued at `issued_at`.
    pub fn encode_at(
        &self,
        kind: TokenKind,
        identity: &AuthIdentity,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at + Duration::seconds(kind.expiry_secs());
        let claims = TokenClaims {
            user_id: identity.user_id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            session_id: identity.session_id.clone(),
            token_type: kind,
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            sub: identity.username.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secrets.for_kind(kind)),
        )
        .map_err(|e| AuthError::Internal(format!("jwt encode ({kind}): {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify `token` with the secret for `expected` and return its claims.
    ///
    /// Rejects non-HMAC algorithms, a foreign issuer, anything outside
    /// `[nbf, exp]` (no leeway), and a `token_type` other than `expected`.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        let key = DecodingKey::from_secret(self.secrets.for_kind(expected));
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        let claims = decode::<TokenClaims>(token, &key, &validation)?.claims;
        if claims.token_type != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.token_type,
            });
        }
        Ok(claims)
    }
}
