use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Months, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::Deserialize;
use serde_json::error::Category;
use thiserror::Error;

use crate::{
    config::JwtConfig,
    models::auth::{TokenClaims, TokenKind, UserClaims},
    services::metrics::{TOKENS_ISSUED_COUNTER, TOKEN_REJECTIONS_COUNTER},
};

/// `iss` claim carried by every token this service signs.
pub const ISSUER: &str = "shop-api";

/// Admin tokens live for five minutes whatever the configuration says.
pub const ADMIN_TOKEN_TTL_SECONDS: i64 = 300;

pub const API_KEY_TTL_MONTHS: u32 = 24;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Only the `alg` field; anything else in the header is left to `decode`.
#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("sign token failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("unknown token type: {0}")]
    UnknownKind(String),
    #[error("{0} token requires user claims")]
    MissingUserClaims(TokenKind),
    #[error("token expiry must be later than its issue time")]
    InvalidExpiry,
    #[error("token format is invalid")]
    Malformed,
    #[error("token had expired")]
    Expired,
    #[error("signing method is invalid")]
    AlgorithmMismatch,
    #[error("claims type is invalid")]
    ClaimShape,
    #[error("parse token failed: {0}")]
    Rejected(String),
}

impl TokenError {
    /// True for failures caused by the presented token rather than by the server.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TokenError::Malformed
                | TokenError::Expired
                | TokenError::AlgorithmMismatch
                | TokenError::ClaimShape
                | TokenError::Rejected(_)
        )
    }

    fn metric_label(&self) -> &'static str {
        match self {
            TokenError::Signing(_) => "signing",
            TokenError::UnknownKind(_) => "unknown_kind",
            TokenError::MissingUserClaims(_) => "missing_claims",
            TokenError::InvalidExpiry => "invalid_expiry",
            TokenError::Malformed => "malformed",
            TokenError::Expired => "expired",
            TokenError::AlgorithmMismatch => "algorithm",
            TokenError::ClaimShape => "claim_shape",
            TokenError::Rejected(_) => "rejected",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                TokenError::Malformed
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::AlgorithmMismatch
            }
            ErrorKind::Json(e) => match e.classify() {
                Category::Syntax | Category::Eof => TokenError::Malformed,
                Category::Data | Category::Io => TokenError::ClaimShape,
            },
            _ => TokenError::Rejected(err.to_string()),
        }
    }
}

/// Issues and verifies the four token kinds. Every call is a pure function of
/// its inputs and the wall clock.
pub struct TokenService;

impl TokenService {
    pub fn issue(
        kind: TokenKind,
        config: &JwtConfig,
        claims: Option<&UserClaims>,
    ) -> Result<String, TokenError> {
        Self::issue_at(kind, config, claims, Utc::now())
    }

    /// Re-sign a refresh token keeping the expiry of the one it replaces.
    pub fn reissue_refresh(
        config: &JwtConfig,
        claims: &UserClaims,
        expires_at: i64,
    ) -> Result<String, TokenError> {
        Self::sign(
            TokenKind::Refresh,
            config,
            Some(claims.clone()),
            Utc::now(),
            expires_at,
        )
    }

    pub fn verify(
        kind: TokenKind,
        config: &JwtConfig,
        token: &str,
    ) -> Result<TokenClaims, TokenError> {
        let result = Self::decode_claims(kind, config, token);
        if let Err(e) = &result {
            TOKEN_REJECTIONS_COUNTER
                .with_label_values(&[kind.as_str(), e.metric_label()])
                .inc();
            tracing::debug!(kind = %kind, error = %e, "token verification failed");
        }
        result
    }

    pub(crate) fn issue_at(
        kind: TokenKind,
        config: &JwtConfig,
        claims: Option<&UserClaims>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = match kind {
            TokenKind::Access => expires_after(now, config.access_expires_secs)?,
            TokenKind::Refresh => expires_after(now, config.refresh_expires_secs)?,
            TokenKind::Admin => now + Duration::seconds(ADMIN_TOKEN_TTL_SECONDS),
            TokenKind::ApiKey => now
                .checked_add_months(Months::new(API_KEY_TTL_MONTHS))
                .ok_or(TokenError::InvalidExpiry)?,
        };

        // Admin tokens and API keys never identify a user.
        let claims = if kind.carries_user_claims() {
            Some(claims.cloned().ok_or(TokenError::MissingUserClaims(kind))?)
        } else {
            None
        };

        Self::sign(kind, config, claims, now, expires_at.timestamp())
    }

    fn sign(
        kind: TokenKind,
        config: &JwtConfig,
        claims: Option<UserClaims>,
        now: DateTime<Utc>,
        expires_at: i64,
    ) -> Result<String, TokenError> {
        let issued_at = now.timestamp();
        if expires_at <= issued_at {
            return Err(TokenError::InvalidExpiry);
        }

        let payload = TokenClaims {
            claims,
            iss: ISSUER.to_string(),
            sub: kind.subject().to_string(),
            aud: kind.audience().iter().map(|a| a.to_string()).collect(),
            exp: expires_at,
            nbf: issued_at,
            iat: issued_at,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(config.secret_for(kind)),
        )
        .map_err(TokenError::Signing)?;

        TOKENS_ISSUED_COUNTER.with_label_values(&[kind.as_str()]).inc();
        Ok(token)
    }

    fn decode_claims(
        kind: TokenKind,
        config: &JwtConfig,
        token: &str,
    ) -> Result<TokenClaims, TokenError> {
        check_algorithm(token)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(kind.audience());
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub", "aud"]);

        let key = DecodingKey::from_secret(config.secret_for(kind));
        let claims = match decode::<TokenClaims>(token, &key, &validation) {
            Ok(data) => data.claims,
            // The signature is checked before `exp`; an expired token reports as
            // expired whichever secret signed it.
            Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) && is_expired(token) => {
                return Err(TokenError::Expired)
            }
            Err(e) => return Err(e.into()),
        };

        if claims.sub != kind.subject() || claims.claims.is_some() != kind.carries_user_claims() {
            return Err(TokenError::ClaimShape);
        }
        Ok(claims)
    }
}

fn expires_after(now: DateTime<Utc>, secs: u64) -> Result<DateTime<Utc>, TokenError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(TokenError::InvalidExpiry)
}

/// Rejects any `alg` outside the HMAC family, including names `decode` cannot
/// parse such as `none`.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    let header = token.split('.').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    match header.alg.as_deref() {
        Some("HS256" | "HS384" | "HS512") => Ok(()),
        _ => Err(TokenError::AlgorithmMismatch),
    }
}

/// Reads `exp` without checking the signature.
fn is_expired(token: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.leeway = 0;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    matches!(
        decode::<serde_json::Value>(token, &DecodingKey::from_secret(&[]), &validation),
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature)
    )
}
