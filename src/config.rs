use std::env;

use crate::models::auth::TokenKind;

/// Longest lifetime accepted for access and refresh tokens (ten years).
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Secrets and lifetimes used by the token service.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret_key: String,
    pub admin_key: String,
    pub api_key: String,
    pub access_expires_secs: u64,
    pub refresh_expires_secs: u64,
}

impl JwtConfig {
    /// Secret a token of `kind` is signed and verified with.
    pub fn secret_for(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access | TokenKind::Refresh => self.secret_key.as_bytes(),
            TokenKind::Admin => self.admin_key.as_bytes(),
            TokenKind::ApiKey => self.api_key.as_bytes(),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let secrets = [
            ("JWT_SECRET_KEY", &self.secret_key),
            ("JWT_ADMIN_KEY", &self.admin_key),
            ("JWT_API_KEY", &self.api_key),
        ];
        for (key, value) in secrets {
            if value.is_empty() {
                anyhow::bail!("{key} must not be empty");
            }
        }
        if self.secret_key == self.admin_key
            || self.secret_key == self.api_key
            || self.admin_key == self.api_key
        {
            anyhow::bail!("JWT_SECRET_KEY, JWT_ADMIN_KEY and JWT_API_KEY must all differ");
        }
        if self.access_expires_secs == 0 || self.refresh_expires_secs == 0 {
            anyhow::bail!("JWT_ACCESS_EXPIRES and JWT_REFRESH_EXPIRES must be greater than zero");
        }
        if self.access_expires_secs > MAX_TOKEN_LIFETIME_SECS
            || self.refresh_expires_secs > MAX_TOKEN_LIFETIME_SECS
        {
            anyhow::bail!(
                "JWT_ACCESS_EXPIRES and JWT_REFRESH_EXPIRES must not exceed {MAX_TOKEN_LIFETIME_SECS} seconds"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
    pub body_limit_bytes: usize,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", key))
        };

        let jwt = JwtConfig {
            secret_key: required("JWT_SECRET_KEY")?,
            admin_key: required("JWT_ADMIN_KEY")?,
            api_key: required("JWT_API_KEY")?,
            access_expires_secs: get("JWT_ACCESS_EXPIRES")
                .unwrap_or_else(|| "86400".into())
                .parse()?,
            refresh_expires_secs: get("JWT_REFRESH_EXPIRES")
                .unwrap_or_else(|| "604800".into())
                .parse()?,
        };
        jwt.validate()?;

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or_else(|| "shop-api".into()),
            app_version: get("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: get("PORT").unwrap_or_else(|| "3000".into()).parse()?,
            timeout_seconds: get("APP_TIMEOUT_SECONDS")
                .unwrap_or_else(|| "60".into())
                .parse()?,
            body_limit_bytes: get("APP_BODY_LIMIT_BYTES")
                .unwrap_or_else(|| (10 * 1024 * 1024).to_string())
                .parse()?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "20".into())
                .parse()?,
            jwt,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
