use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    #[serde(default)]
    pub id: i32,
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}
