use sqlx::PgPool;

use crate::{
    config::JwtConfig,
    models::{appinfo::Category, auth::TokenKind},
    services::token::TokenService,
};

pub struct AppinfoService;

impl AppinfoService {
    /// Mint a machine credential signed with the API-key secret.
    pub fn generate_api_key(jwt: &JwtConfig) -> anyhow::Result<String> {
        Ok(TokenService::issue(TokenKind::ApiKey, jwt, None)?)
    }

    pub async fn find_categories(pool: &PgPool, title: Option<&str>) -> anyhow::Result<Vec<Category>> {
        let categories = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => {
                sqlx::query_as::<_, Category>(
                    "SELECT id, title FROM categories WHERE title ILIKE $1 ORDER BY id",
                )
                .bind(format!("%{title}%"))
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Category>("SELECT id, title FROM categories ORDER BY id")
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(categories)
    }

    /// Insert all titles in one transaction; nothing is written if any insert fails.
    pub async fn add_categories(pool: &PgPool, titles: &[String]) -> anyhow::Result<Vec<Category>> {
        let mut tx = pool.begin().await?;
        let mut inserted = Vec::with_capacity(titles.len());
        for title in titles {
            let category = sqlx::query_as::<_, Category>(
                "INSERT INTO categories (title) VALUES ($1) RETURNING id, title",
            )
            .bind(title.trim())
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(category);
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Returns false when no category had that id.
    pub async fn remove_category(pool: &PgPool, category_id: i32) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;

    #[test]
    fn test_generated_key_is_an_api_key() {
        let cfg = test_config();
        let key = AppinfoService::generate_api_key(&cfg.jwt).unwrap();

        let claims = TokenService::verify(TokenKind::ApiKey, &cfg.jwt, &key).unwrap();
        assert_eq!(claims.sub, "api-key");
        assert!(claims.claims.is_none());
        assert!(TokenService::verify(TokenKind::Access, &cfg.jwt, &key).is_err());
    }
}
