//! SQL script export.
//!
//! Renders the JSON data directory as a script that can be pasted into a
//! hosted database console. Rows use `ON CONFLICT DO NOTHING` so the script
//! can be re-run; settings are upserted; sequences are moved past the
//! imported ids. Users are not exported.
//!
//! # Usage
//!
//! ```bash
//! vitrine export-sql --data-dir data --out migration_full.sql
//! ```

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use vitrine_server::db::{CatalogSnapshot, JsonStore, StoreError};

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read `data_dir` and write the script to `out`.
pub async fn run(data_dir: &Path, out: &Path) -> Result<(), ExportError> {
    let snapshot = JsonStore::new(data_dir).snapshot().await?;
    let sql = render(&snapshot)?;

    tokio::fs::write(out, sql)
        .await
        .map_err(|source| ExportError::Write {
            path: out.display().to_string(),
            source,
        })?;

    tracing::info!(
        products = snapshot.products.len(),
        categories = snapshot.categories.len(),
        banners = snapshot.banners.len(),
        out = %out.display(),
        "SQL script written"
    );
    Ok(())
}

/// Render a snapshot as SQL.
pub fn render(snapshot: &CatalogSnapshot) -> Result<String, ExportError> {
    let mut sql = String::from("-- Vitrine full data export --\n\n");

    if !snapshot.categories.is_empty() {
        sql.push_str("-- Categories --\n");
        for c in &snapshot.categories {
            writeln!(
                sql,
                r#"INSERT INTO categories (id, name, icon, link, "order") VALUES ({}, {}, {}, {}, {}) ON CONFLICT DO NOTHING;"#,
                text(c.id.as_str()),
                text(&c.name),
                opt_text(c.icon.as_deref()),
                opt_text(c.link.as_deref()),
                c.order,
            )?;
        }
        sql.push('\n');
    }

    if !snapshot.products.is_empty() {
        sql.push_str("-- Products --\n");
        for p in &snapshot.products {
            writeln!(
                sql,
                "INSERT INTO products (id, name, price, old_price, image, images, category, stock, \
                 badge, active, variants, rating, reviews, description, created_at, updated_at) \
                 VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}) \
                 ON CONFLICT DO NOTHING;",
                p.id,
                text(&p.name),
                p.price,
                p.old_price.map_or_else(|| "NULL".to_string(), |v| v.to_string()),
                text(&p.image),
                jsonb(&p.images)?,
                text(p.category.as_str()),
                p.stock,
                opt_text(p.badge.as_deref()),
                boolean(p.active),
                jsonb(&p.variants)?,
                if p.rating.is_finite() { p.rating } else { 0.0 },
                p.reviews,
                text(&p.description),
                timestamp(p.created_at),
                timestamp(p.updated_at),
            )?;
        }
        sql.push('\n');
    }

    if !snapshot.banners.is_empty() {
        sql.push_str("-- Banners --\n");
        for b in &snapshot.banners {
            writeln!(
                sql,
                r#"INSERT INTO banners (id, image, title, subtitle, link, "order", active) VALUES ({}, {}, {}, {}, {}, {}, {}) ON CONFLICT DO NOTHING;"#,
                b.id,
                text(&b.image),
                text(&b.title),
                opt_text(b.subtitle.as_deref()),
                opt_text(b.link.as_deref()),
                b.order,
                boolean(b.active),
            )?;
        }
        sql.push('\n');
    }

    if !snapshot.settings.is_empty() {
        sql.push_str("-- Settings --\n");
        writeln!(
            sql,
            "INSERT INTO settings (id, config) VALUES (1, {}) \
             ON CONFLICT (id) DO UPDATE SET config = EXCLUDED.config;",
            jsonb(&snapshot.settings)?,
        )?;
        sql.push('\n');
    }

    sql.push_str("-- Sequences --\n");
    for table in ["products", "banners", "users"] {
        writeln!(
            sql,
            "SELECT setval('{table}_id_seq', COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false);"
        )?;
    }

    Ok(sql)
}

/// Quoted string literal with single quotes doubled.
fn text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn opt_text(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), text)
}

const fn boolean(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn jsonb<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    Ok(format!("{}::jsonb", text(&serde_json::to_string(value)?)))
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || "NULL".to_string(),
        |t| format!("{}::timestamptz", text(&t.to_rfc3339())),
    )
}
