pub mod appinfo;
pub mod metrics;
pub mod products;
pub mod token;
pub mod users;
