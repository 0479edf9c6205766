//! Core types for Vitrine.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! catalog records shared by the server and the CLI.

pub mod catalog;
pub mod id;
pub mod money;
pub mod postal_code;
pub mod user;

pub use catalog::{
    Banner, BannerInput, BannerPatch, Category, CategoryInput, CategoryPatch, Product,
    ProductInput, ProductPatch, Settings, ValidationError, Variant, merge_settings,
};
pub use id::*;
pub use money::{MoneyError, parse_brl, to_cents};
pub use postal_code::{PostalCode, PostalCodeError, StateCode};
pub use user::{Role, User, UserProfile};
