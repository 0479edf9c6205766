//! CLI command implementations.

pub mod export_sql;
pub mod freight_table;
pub mod import;
pub mod migrate;
pub mod stripe;
pub mod user;

use secrecy::SecretString;

/// Read a non-empty environment variable after loading `.env`.
fn env_var(key: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `DATABASE_URL`, if set.
fn database_url() -> Option<SecretString> {
    env_var("DATABASE_URL").map(SecretString::from)
}
