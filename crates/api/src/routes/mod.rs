//! HTTP handlers grouped by resource.

pub mod accounts;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod vendors;
