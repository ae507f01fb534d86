pub mod appinfo;
pub mod auth;
pub mod product;
pub mod response;
pub mod user;
