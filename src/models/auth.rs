use serde::{Deserialize, Serialize};

use super::user::UserRole;
use crate::services::token::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
    Admin,
    ApiKey,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Admin => "admin",
            TokenKind::ApiKey => "apikey",
        }
    }

    /// Value of the `sub` claim for this kind.
    pub fn subject(self) -> &'static str {
        match self {
            TokenKind::Access => "access-token",
            TokenKind::Refresh => "refresh-token",
            TokenKind::Admin => "admin-token",
            TokenKind::ApiKey => "api-key",
        }
    }

    /// Roles allowed to present a token of this kind (`aud` claim).
    pub fn audience(self) -> &'static [&'static str] {
        match self {
            TokenKind::Access | TokenKind::Refresh => &["customer", "admin"],
            TokenKind::Admin => &["admin"],
            TokenKind::ApiKey => &["admin", "customer"],
        }
    }

    pub fn carries_user_claims(self) -> bool {
        matches!(self, TokenKind::Access | TokenKind::Refresh)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenKind {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            "admin" => Ok(TokenKind::Admin),
            "apikey" => Ok(TokenKind::ApiKey),
            _ => Err(TokenError::UnknownKind(s.to_string())),
        }
    }
}

/// User identity embedded in access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub id: String,
    pub role: UserRole,
}

/// Full JWT payload. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<UserClaims>,
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
}

/// Extracted from a validated access token by the Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub role: UserRole,
}
