//! HTTP handlers for both services.

pub mod admin;
pub mod churn;
pub mod extract;
pub mod forecast;
pub mod health;
