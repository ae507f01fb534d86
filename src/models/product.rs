use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::appinfo::Category;

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product joined with its category.
#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category_id: i32,
    pub category_title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            category: Category {
                id: row.category_id,
                title: row.category_title,
            },
            price: row.price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `?search=` matches title or description.
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CategoryRef {
    pub id: i32,
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct AddProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: CategoryRef,
    #[serde(default)]
    pub price: f64,
}

/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<CategoryRef>,
    pub price: Option<f64>,
}
