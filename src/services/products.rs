use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::product::{AddProductRequest, Product, ProductRow, UpdateProductRequest};

const PRODUCT_SELECT: &str = "SELECT p.id, p.title, p.description, p.price,
        c.id AS category_id, c.title AS category_title, p.created_at, p.updated_at
     FROM products p
     JOIN categories c ON c.id = p.category_id";

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("product not found")]
    NotFound,
    #[error("category {0} not found")]
    CategoryNotFound(i32),
}

/// `%term%` for a non-blank search, with LIKE wildcards in the term escaped.
fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

fn parse_id(product_id: &str) -> Result<Uuid, ProductError> {
    Uuid::parse_str(product_id.trim()).map_err(|_| ProductError::NotFound)
}

/// A write naming a category that does not exist trips the foreign key.
fn write_error(err: sqlx::Error, category_id: Option<i32>) -> anyhow::Error {
    match (err, category_id) {
        (sqlx::Error::Database(db), Some(id)) if db.is_foreign_key_violation() => {
            ProductError::CategoryNotFound(id).into()
        }
        (other, _) => anyhow::Error::from(other),
    }
}

pub struct ProductsService;

impl ProductsService {
    pub async fn find_one(pool: &PgPool, product_id: &str) -> anyhow::Result<Product> {
        Self::find_by_id(pool, parse_id(product_id)?).await
    }

    pub async fn find(pool: &PgPool, search: Option<&str>) -> anyhow::Result<Vec<Product>> {
        let rows = match search_pattern(search) {
            Some(pattern) => {
                sqlx::query_as::<_, ProductRow>(&format!(
                    "{PRODUCT_SELECT}
                     WHERE p.title ILIKE $1 OR p.description ILIKE $1
                     ORDER BY p.title"
                ))
                .bind(pattern)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} ORDER BY p.title"))
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn add(pool: &PgPool, req: &AddProductRequest) -> anyhow::Result<Product> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO products (id, title, description, category_id, price)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(req.title.trim())
        .bind(req.description.trim())
        .bind(req.category.id)
        .bind(req.price)
        .fetch_one(pool)
        .await
        .map_err(|e| write_error(e, Some(req.category.id)))?;

        tracing::info!(product_id = %id, category_id = req.category.id, "product added");
        Self::find_by_id(pool, id).await
    }

    pub async fn update(
        pool: &PgPool,
        product_id: &str,
        req: &UpdateProductRequest,
    ) -> anyhow::Result<Product> {
        let id = parse_id(product_id)?;
        let category_id = req.category.map(|c| c.id);

        let result = sqlx::query(
            "UPDATE products SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                price = COALESCE($5, price),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.description.as_deref().map(str::trim))
        .bind(category_id)
        .bind(req.price)
        .execute(pool)
        .await
        .map_err(|e| write_error(e, category_id))?;

        if result.rows_affected() == 0 {
            return Err(ProductError::NotFound.into());
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, product_id: &str) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(parse_id(product_id)?)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ProductError::NotFound.into());
        }
        Ok(())
    }

    async fn find_by_id(pool: &PgPool, id: Uuid) -> anyhow::Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ProductError::NotFound)?;
        Ok(row.into())
    }
}
