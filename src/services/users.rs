use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    models::{
        auth::{TokenKind, UserClaims},
        user::{Oauth, SignUpRequest, User, UserPassport, UserProfile, UserRole, UserToken},
    },
    services::{
        metrics::SIGNINS_COUNTER,
        token::{TokenError, TokenService},
    },
};

const USER_COLUMNS: &str = "id, email, username, password_hash, role, created_at, updated_at";
const OAUTH_COLUMNS: &str = "id, user_id, access_token, refresh_token, created_at, updated_at";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("email or username has been used")]
    AlreadyExists,
    #[error("email or password is invalid")]
    InvalidCredentials,
    #[error("oauth not found")]
    OauthNotFound,
    #[error("user not found")]
    NotFound,
}

/// Access and refresh tokens for a freshly authenticated user.
fn passport_tokens(jwt: &JwtConfig, claims: &UserClaims) -> Result<(String, String), TokenError> {
    let access = TokenService::issue(TokenKind::Access, jwt, Some(claims))?;
    let refresh = TokenService::issue(TokenKind::Refresh, jwt, Some(claims))?;
    Ok((access, refresh))
}

/// New token pair for a refresh: the access token starts over, the refresh
/// token keeps the expiry of the one being rotated.
fn rotated_tokens(
    jwt: &JwtConfig,
    claims: &UserClaims,
    refresh_expires_at: i64,
) -> Result<(String, String), TokenError> {
    let access = TokenService::issue(TokenKind::Access, jwt, Some(claims))?;
    let refresh = TokenService::reissue_refresh(jwt, claims, refresh_expires_at)?;
    Ok((access, refresh))
}

fn claims_of(profile: &UserProfile) -> UserClaims {
    UserClaims {
        id: profile.id.to_string(),
        role: profile.role,
    }
}

pub struct UsersService;

impl UsersService {
    pub async fn sign_up(
        pool: &PgPool,
        jwt: &JwtConfig,
        req: &SignUpRequest,
        role: UserRole,
    ) -> anyhow::Result<UserPassport> {
        let hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, username, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.email.trim().to_lowercase())
        .bind(req.username.trim())
        .bind(hash)
        .bind(role.to_string())
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => UserError::AlreadyExists.into(),
            other => anyhow::Error::from(other),
        })?;

        tracing::info!(user_id = %user.id, role = %role, "user signed up");
        Self::open_session(pool, jwt, user.try_into()?).await
    }

    pub async fn sign_in(
        pool: &PgPool,
        jwt: &JwtConfig,
        email: &str,
        password: &str,
    ) -> anyhow::Result<UserPassport> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

        let Some(user) = user else {
            SIGNINS_COUNTER.with_label_values(&["failed"]).inc();
            return Err(UserError::InvalidCredentials.into());
        };

        let valid = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
        if !valid {
            SIGNINS_COUNTER.with_label_values(&["failed"]).inc();
            return Err(UserError::InvalidCredentials.into());
        }

        SIGNINS_COUNTER.with_label_values(&["success"]).inc();
        Self::open_session(pool, jwt, user.try_into()?).await
    }

    /// Swap a refresh token for a new token pair on the same oauth row.
    pub async fn refresh_passport(
        pool: &PgPool,
        jwt: &JwtConfig,
        refresh_token: &str,
    ) -> anyhow::Result<UserPassport> {
        let verified = TokenService::verify(TokenKind::Refresh, jwt, refresh_token)?;

        let oauth = sqlx::query_as::<_, Oauth>(&format!(
            "SELECT {OAUTH_COLUMNS} FROM oauth WHERE refresh_token = $1"
        ))
        .bind(refresh_token)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::OauthNotFound)?;

        let profile = Self::find_profile(pool, oauth.user_id).await?;
        let claims = claims_of(&profile);
        let (access_token, refresh_token) = rotated_tokens(jwt, &claims, verified.exp)?;

        sqlx::query(
            "UPDATE oauth SET access_token = $1, refresh_token = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(&access_token)
        .bind(&refresh_token)
        .bind(oauth.id)
        .execute(pool)
        .await?;

        Ok(UserPassport {
            user: profile,
            token: UserToken {
                id: oauth.id,
                access_token,
                refresh_token,
            },
        })
    }

    pub async fn sign_out(pool: &PgPool, oauth_id: Uuid) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM oauth WHERE id = $1")
            .bind(oauth_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::OauthNotFound.into());
        }
        Ok(())
    }

    pub async fn get_profile(pool: &PgPool, user_id: &str) -> anyhow::Result<UserProfile> {
        let id = Uuid::parse_str(user_id).map_err(|_| UserError::NotFound)?;
        Self::find_profile(pool, id).await
    }

    async fn find_profile(pool: &PgPool, id: Uuid) -> anyhow::Result<UserProfile> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound)?;
        user.try_into()
    }

    async fn open_session(
        pool: &PgPool,
        jwt: &JwtConfig,
        profile: UserProfile,
    ) -> anyhow::Result<UserPassport> {
        let (access_token, refresh_token) = passport_tokens(jwt, &claims_of(&profile))?;

        let oauth_id: Uuid = sqlx::query_scalar(
            "INSERT INTO oauth (id, user_id, access_token, refresh_token)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(profile.id)
        .bind(&access_token)
        .bind(&refresh_token)
        .fetch_one(pool)
        .await?;

        Ok(UserPassport {
            user: profile,
            token: UserToken {
                id: oauth_id,
                access_token,
                refresh_token,
            },
        })
    }
}
