//! Admin dashboard counters.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use vitrine_core::Product;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Stock level below which a product counts as low.
const LOW_STOCK_THRESHOLD: i32 = 5;

/// Number of products in `recentProducts`.
const RECENT_PRODUCTS: usize = 5;

/// Dashboard statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub active_products: usize,
    pub total_categories: usize,
    pub total_banners: usize,
    pub total_stock: i64,
    pub low_stock_products: usize,
    /// The last products in catalog order, newest first.
    pub recent_products: Vec<Product>,
}

impl DashboardStats {
    fn compute(products: Vec<Product>, total_categories: usize, total_banners: usize) -> Self {
        let total_stock = products.iter().map(|p| i64::from(p.stock)).sum();
        let low_stock_products = products
            .iter()
            .filter(|p| p.stock < LOW_STOCK_THRESHOLD)
            .count();
        let active_products = products.iter().filter(|p| p.active).count();
        let total_products = products.len();
        let recent_products = products.into_iter().rev().take(RECENT_PRODUCTS).collect();

        Self {
            total_products,
            active_products,
            total_categories,
            total_banners,
            total_stock,
            low_stock_products,
            recent_products,
        }
    }
}

/// Dashboard statistics handler.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
#[instrument(skip(state, _admin))]
pub async fn stats(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>> {
    let store = state.store();
    let (products, categories, banners) = tokio::try_join!(
        store.list_products(),
        store.list_categories(),
        store.list_banners(),
    )?;

    Ok(Json(DashboardStats::compute(
        products,
        categories.len(),
        banners.len(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use vitrine_core::{CategoryId, ProductId};

    fn product(id: i32, stock: i32, active: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Produto {id}"),
            price: Decimal::new(9990, 2),
            old_price: None,
            image: String::new(),
            images: Vec::new(),
            category: CategoryId::new("vestidos"),
            stock,
            badge: None,
            active,
            variants: Vec::new(),
            rating: 0.0,
            reviews: 0,
            description: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_compute_counters() {
        let products = vec![
            product(1, 10, true),
            product(2, 0, false),
            product(3, 4, true),
        ];
        let stats = DashboardStats::compute(products, 4, 2);
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.active_products, 2);
        assert_eq!(stats.total_stock, 14);
        assert_eq!(stats.low_stock_products, 2);
        assert_eq!(stats.total_categories, 4);
        assert_eq!(stats.total_banners, 2);
    }

    #[test]
    fn test_recent_products_newest_first() {
        let products = (1..=7).map(|id| product(id, 1, true)).collect();
        let stats = DashboardStats::compute(products, 0, 0);
        let ids: Vec<i32> = stats
            .recent_products
            .iter()
            .map(|p| p.id.as_i32())
            .collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = DashboardStats::compute(Vec::new(), 0, 0);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["lowStockProducts"], 0);
        assert!(json["recentProducts"].as_array().unwrap().is_empty());
    }
}
