//! Business logic services.

pub mod auth;
pub mod shipping;
pub mod stripe;
pub mod uploads;
