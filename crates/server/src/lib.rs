//! Vitrine API server library.
//!
//! Catalog, admin and shipping API for the Vitrine storefront, exposed as a
//! library so the router can be driven in-process by tests and the CLI can
//! reuse the stores and carrier client.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
