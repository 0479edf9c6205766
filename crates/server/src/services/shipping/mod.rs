//! Cart shipping estimates.
//!
//! Postal codes outside every known state range are rejected up front. The
//! resolver then builds a single package from the cart (items are stacked, so
//! height grows with quantity), asks the live carrier for SEDEX and PAC
//! prices under a hard timeout, and falls back to the per-state contingency
//! table when the carrier errors, times out or returns nothing usable.
//! Carrier failures are never surfaced to the caller.
//!
//! Successful live quotes are cached by package and destination for a few
//! minutes since carts are re-quoted on every change.

pub mod correios;
mod fallback;

pub use correios::{
    CarrierError, CarrierQuote, CarrierQuoter, CorreiosClient, DEFAULT_SERVICES, PAC,
    QuoteRequest, SEDEX,
};
pub use fallback::{FallbackRate, rate_for};

use std::sync::Arc;

use moka::future::Cache;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use vitrine_core::money::{self, parse_brl};
use vitrine_core::{PostalCode, PostalCodeError, StateCode};

use crate::config::ShippingConfig;

/// Height of one folded garment.
const ITEM_HEIGHT_CM: u32 = 4;
const PACKAGE_WIDTH_CM: u32 = 11;
const PACKAGE_LENGTH_CM: u32 = 16;
const MIN_HEIGHT_CM: u32 = 2;
const MAX_HEIGHT_CM: u32 = 100;

/// Lead time offered for free shipping when there is no option to derive it from.
const FREE_DEFAULT_DAYS: u32 = 10;
/// Extra days on top of PAC for free shipping.
const FREE_EXTRA_DAYS: u32 = 2;

const FALLBACK_NOTE: &str = "Valor estimado devido a instabilidade nos Correios";

/// Weight of one item (300 g).
fn item_weight_kg() -> Decimal {
    Decimal::new(3, 1)
}

/// Errors returned to the caller. Carrier problems are not among them.
#[derive(Debug, Error)]
pub enum ShippingError {
    #[error(transparent)]
    PostalCode(#[from] PostalCodeError),

    /// The postal code falls outside every known state range.
    #[error("postal code not recognised")]
    UnknownRegion,
}

/// `POST /api/shipping/calculate` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingRequest {
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// A cart line. Both fields are read leniently, the way the storefront
/// sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartItem {
    /// Raw quantity; zero means absent or unparseable.
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Decimal,
}

impl CartItem {
    /// Units in the line; anything unusable counts as one.
    #[must_use]
    pub const fn units(&self) -> u32 {
        if self.quantity == 0 { 1 } else { self.quantity }
    }
}

fn lenient_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).and_then(|f| f.trunc().to_u64()))
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    })
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(|f| money::from_f64(f).ok())
            .unwrap_or_default(),
        Some(Value::String(s)) => parse_brl(&s).unwrap_or_default(),
        _ => Decimal::ZERO,
    })
}

/// The cart collapsed into one parcel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub weight_kg: Decimal,
    /// Stacked height, clamped to the carrier's accepted range.
    pub height_cm: u32,
    pub subtotal: Decimal,
}

impl Package {
    #[must_use]
    pub fn from_items(items: &[CartItem]) -> Self {
        let mut weight_kg = Decimal::ZERO;
        let mut height_cm: u32 = 0;
        let mut subtotal = Decimal::ZERO;
        for item in items {
            let units = item.units();
            weight_kg += item_weight_kg() * Decimal::from(units);
            height_cm = height_cm.saturating_add(ITEM_HEIGHT_CM.saturating_mul(units));
            subtotal += item.price * Decimal::from(units);
        }
        Self {
            weight_kg,
            height_cm: height_cm.clamp(MIN_HEIGHT_CM, MAX_HEIGHT_CM),
            subtotal,
        }
    }

    /// Whole kilograms sent to the carrier, never below one.
    #[must_use]
    pub fn carrier_weight_kg(&self) -> u32 {
        self.weight_kg.ceil().to_u32().unwrap_or(u32::MAX).max(1)
    }
}

/// One shipping choice shown at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingOption {
    pub code: String,
    pub name: String,
    #[serde(with = "money::amount")]
    pub price: Decimal,
    pub days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// `true` when the price comes from the contingency table.
    pub estimated: bool,
}

impl ShippingOption {
    fn live(quote: CarrierQuote) -> Self {
        let name = if quote.code == SEDEX { "SEDEX" } else { "PAC" };
        Self {
            name: name.to_string(),
            code: quote.code,
            price: quote.price,
            days: quote.days,
            note: None,
            estimated: false,
        }
    }

    fn estimated(code: &str, name: &str, price: Decimal, days: u32) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            price,
            days,
            note: Some(FALLBACK_NOTE.to_string()),
            estimated: true,
        }
    }

    /// Free economy shipping derived from the PAC option (or the first one).
    fn free(options: &[Self]) -> Self {
        let base = options
            .iter()
            .find(|o| o.name.contains("PAC"))
            .or_else(|| options.first());
        Self {
            code: "FREE".to_string(),
            name: "Frete Grátis (Econômico)".to_string(),
            price: Decimal::ZERO,
            days: base.map_or(FREE_DEFAULT_DAYS, |o| o.days + FREE_EXTRA_DAYS),
            note: None,
            estimated: base.is_some_and(|o| o.estimated),
        }
    }
}

/// Shipping estimate resolver.
#[derive(Clone)]
pub struct ShippingResolver {
    inner: Arc<ShippingResolverInner>,
}

struct ShippingResolverInner {
    carrier: Arc<dyn CarrierQuoter>,
    config: ShippingConfig,
    cache: Cache<QuoteRequest, Vec<ShippingOption>>,
}

impl ShippingResolver {
    #[must_use]
    pub fn new(carrier: Arc<dyn CarrierQuoter>, config: ShippingConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.quote_cache_ttl)
            .build();

        Self {
            inner: Arc::new(ShippingResolverInner {
                carrier,
                config,
                cache,
            }),
        }
    }

    /// Compute the shipping options for a cart.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::PostalCode` when the postal code is missing or
    /// malformed and `ShippingError::UnknownRegion` when the code maps to no
    /// state. The carrier is not consulted in either case.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn resolve(
        &self,
        request: &ShippingRequest,
    ) -> Result<Vec<ShippingOption>, ShippingError> {
        let cep = PostalCode::parse(request.cep.as_deref().unwrap_or_default())?;
        let state = cep.state().ok_or(ShippingError::UnknownRegion)?;
        let package = Package::from_items(&request.items);

        let quote_request = QuoteRequest {
            origin: self.inner.config.origin_cep.clone(),
            destination: cep.as_str().to_owned(),
            weight_kg: package.carrier_weight_kg(),
            length_cm: PACKAGE_LENGTH_CM,
            height_cm: package.height_cm,
            width_cm: PACKAGE_WIDTH_CM,
        };

        let mut options = match self.live_options(&quote_request).await {
            Some(options) => options,
            None => fallback_options(state),
        };

        if package.subtotal >= self.inner.config.free_threshold {
            let free = ShippingOption::free(&options);
            options.insert(0, free);
        }

        Ok(options)
    }

    /// Live carrier options, or `None` if the carrier should be ignored.
    async fn live_options(&self, request: &QuoteRequest) -> Option<Vec<ShippingOption>> {
        if let Some(options) = self.inner.cache.get(request).await {
            debug!("Cache hit for carrier quote");
            return Some(options);
        }

        let timeout = self.inner.config.timeout;
        let quotes = match tokio::time::timeout(
            timeout,
            self.inner.carrier.quote(request, DEFAULT_SERVICES),
        )
        .await
        {
            Ok(Ok(quotes)) => quotes,
            Ok(Err(e)) => {
                warn!(error = %e, "Carrier quote failed, using contingency table");
                return None;
            }
            Err(_) => {
                #[allow(clippy::cast_possible_truncation)]
                let timeout_ms = timeout.as_millis() as u64;
                warn!(timeout_ms, "Carrier quote timed out, using contingency table");
                return None;
            }
        };

        let options: Vec<ShippingOption> = quotes
            .into_iter()
            .filter(CarrierQuote::is_valid)
            .map(ShippingOption::live)
            .collect();

        if options.is_empty() {
            warn!("Carrier returned no valid service, using contingency table");
            return None;
        }

        self.inner
            .cache
            .insert(request.clone(), options.clone())
            .await;
        Some(options)
    }
}

/// Contingency PAC and SEDEX options for `state`.
fn fallback_options(state: StateCode) -> Vec<ShippingOption> {
    let rate = rate_for(state);
    debug!(%state, "Using contingency rates");
    vec![
        ShippingOption::estimated("PAC_FALLBACK", "PAC (Estimado)", rate.pac, rate.pac_days),
        ShippingOption::estimated(
            "SEDEX_FALLBACK",
            "SEDEX (Estimado)",
            rate.sedex,
            rate.sedex_days,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    enum Behaviour {
        Quotes(Vec<CarrierQuote>),
        Fail,
        Hang,
    }

    struct StubCarrier {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubCarrier {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CarrierQuoter for StubCarrier {
        async fn quote(
            &self,
            _request: &QuoteRequest,
            _services: &[&str],
        ) -> Result<Vec<CarrierQuote>, CarrierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Quotes(q) => Ok(q.clone()),
                Behaviour::Fail => Err(CarrierError::Status(503)),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn quote(code: &str, cents: i64, days: u32) -> CarrierQuote {
        CarrierQuote {
            code: code.to_string(),
            price: Decimal::new(cents, 2),
            days,
            error: "0".to_string(),
        }
    }

    fn resolver(carrier: Arc<dyn CarrierQuoter>) -> ShippingResolver {
        ShippingResolver::new(
            carrier,
            ShippingConfig {
                timeout: Duration::from_millis(50),
                ..ShippingConfig::default()
            },
        )
    }

    fn request(cep: &str, items: serde_json::Value) -> ShippingRequest {
        serde_json::from_value(serde_json::json!({ "cep": cep, "items": items })).unwrap()
    }

    #[test]
    fn test_cart_item_lenient_fields() {
        let items: Vec<CartItem> = serde_json::from_str(
            r#"[{"quantity": "3", "price": "R$ 1.200,50"},
                {"quantity": 0, "price": 10},
                {"price": "abc"},
                {"quantity": 2.0}]"#,
        )
        .unwrap();
        assert_eq!(items[0].units(), 3);
        assert_eq!(items[0].price, Decimal::new(120_050, 2));
        assert_eq!(items[1].units(), 1);
        assert_eq!(items[2].units(), 1);
        assert_eq!(items[2].price, Decimal::ZERO);
        assert_eq!(items[3].units(), 2);
    }

    #[test]
    fn test_package_from_items() {
        let items = vec![
            CartItem {
                quantity: 2,
                price: Decimal::new(5000, 2),
            },
            CartItem {
                quantity: 0,
                price: Decimal::new(2000, 2),
            },
        ];
        let package = Package::from_items(&items);
        assert_eq!(package.weight_kg, Decimal::new(9, 1));
        assert_eq!(package.height_cm, 12);
        assert_eq!(package.subtotal, Decimal::new(12000, 2));
        assert_eq!(package.carrier_weight_kg(), 1);
    }

    #[test]
    fn test_package_height_clamped() {
        assert_eq!(Package::from_items(&[]).height_cm, MIN_HEIGHT_CM);
        let many = CartItem {
            quantity: 40,
            price: Decimal::ZERO,
        };
        let package = Package::from_items(&[many]);
        assert_eq!(package.height_cm, MAX_HEIGHT_CM);
        assert_eq!(package.carrier_weight_kg(), 12);
    }

    #[tokio::test]
    async fn test_live_quotes() {
        let carrier = StubCarrier::new(Behaviour::Quotes(vec![
            quote(SEDEX, 3150, 2),
            quote(PAC, 2410, 6),
        ]));
        let options = resolver(carrier)
            .resolve(&request("01310-100", serde_json::json!([{"price": 100}])))
            .await
            .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].name, "SEDEX");
        assert_eq!(options[1].name, "PAC");
        assert!(options.iter().all(|o| !o.estimated && o.note.is_none()));
    }

    #[tokio::test]
    async fn test_invalid_live_lines_dropped() {
        let mut broken = quote(SEDEX, 0, 0);
        broken.error = "-888".to_string();
        let carrier = StubCarrier::new(Behaviour::Quotes(vec![broken, quote(PAC, 2410, 6)]));
        let options = resolver(carrier)
            .resolve(&request("01310100", serde_json::json!([])))
            .await
            .unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].code, PAC);
    }

    #[tokio::test]
    async fn test_carrier_failure_uses_table() {
        let options = resolver(StubCarrier::new(Behaviour::Fail))
            .resolve(&request("20010-000", serde_json::json!([{"quantity": 1}])))
            .await
            .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].code, "PAC_FALLBACK");
        assert_eq!(options[0].name, "PAC (Estimado)");
        assert_eq!(options[0].price, Decimal::new(2640, 2));
        assert_eq!(options[1].code, "SEDEX_FALLBACK");
        assert_eq!(options[1].days, 2);
        assert!(options.iter().all(|o| o.estimated && o.note.is_some()));
    }

    #[tokio::test]
    async fn test_timeout_marks_every_offer_estimated() {
        let options = resolver(StubCarrier::new(Behaviour::Hang))
            .resolve(&request(
                "69010000",
                serde_json::json!([{"price": "R$ 1.000,00"}]),
            ))
            .await
            .unwrap();
        assert_eq!(options.len(), 3);
        assert!(options.iter().all(|o| o.estimated));
    }

    #[tokio::test]
    async fn test_empty_live_answer_uses_table() {
        let options = resolver(StubCarrier::new(Behaviour::Quotes(Vec::new())))
            .resolve(&request("90010000", serde_json::json!([])))
            .await
            .unwrap();
        assert_eq!(options[0].code, "PAC_FALLBACK");
    }

    #[tokio::test]
    async fn test_unknown_region_with_failing_carrier() {
        let result = resolver(StubCarrier::new(Behaviour::Fail))
            .resolve(&request("00500000", serde_json::json!([])))
            .await;
        assert!(matches!(result, Err(ShippingError::UnknownRegion)));
    }

    #[tokio::test]
    async fn test_unknown_region_with_live_quotes() {
        let carrier = StubCarrier::new(Behaviour::Quotes(vec![quote(PAC, 2410, 6)]));
        let result = resolver(carrier.clone())
            .resolve(&request("00500-000", serde_json::json!([])))
            .await;
        assert!(matches!(result, Err(ShippingError::UnknownRegion)));
        assert_eq!(carrier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_postal_code() {
        let result = resolver(StubCarrier::new(Behaviour::Fail))
            .resolve(&ShippingRequest::default())
            .await;
        assert!(matches!(
            result,
            Err(ShippingError::PostalCode(PostalCodeError::Empty))
        ));
    }

    #[tokio::test]
    async fn test_free_shipping_prepended() {
        let carrier = StubCarrier::new(Behaviour::Quotes(vec![
            quote(SEDEX, 3150, 2),
            quote(PAC, 2410, 6),
        ]));
        let options = resolver(carrier)
            .resolve(&request(
                "01310100",
                serde_json::json!([{"price": 333, "quantity": 3}]),
            ))
            .await
            .unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].code, "FREE");
        assert_eq!(options[0].price, Decimal::ZERO);
        assert_eq!(options[0].days, 8);
        assert!(!options[0].estimated);
        assert_eq!(
            options.iter().filter(|o| o.price == Decimal::ZERO).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_free_shipping_below_threshold() {
        let carrier = StubCarrier::new(Behaviour::Quotes(vec![quote(PAC, 2410, 6)]));
        let options = resolver(carrier)
            .resolve(&request(
                "01310100",
                serde_json::json!([{"price": "998,99"}]),
            ))
            .await
            .unwrap();
        assert!(options.iter().all(|o| o.code != "FREE"));
    }

    #[tokio::test]
    async fn test_free_shipping_from_table_is_estimated() {
        let options = resolver(StubCarrier::new(Behaviour::Fail))
            .resolve(&request("01001000", serde_json::json!([{"price": 999}])))
            .await
            .unwrap();
        assert_eq!(options[0].code, "FREE");
        assert_eq!(options[0].days, 7);
        assert!(options[0].estimated);
    }

    #[tokio::test]
    async fn test_live_quotes_cached() {
        let carrier = StubCarrier::new(Behaviour::Quotes(vec![quote(PAC, 2410, 6)]));
        let resolver = resolver(carrier.clone());
        let req = request("01310100", serde_json::json!([{"quantity": 1}]));
        resolver.resolve(&req).await.unwrap();
        resolver.resolve(&req).await.unwrap();
        assert_eq!(carrier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_option_serialization() {
        let option = ShippingOption::estimated("PAC_FALLBACK", "PAC (Estimado)", Decimal::new(2280, 2), 5);
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["price"], 22.8);
        assert_eq!(json["estimated"], true);
        assert_eq!(json["note"], FALLBACK_NOTE);

        let live = ShippingOption::live(quote(PAC, 2410, 6));
        let json = serde_json::to_value(&live).unwrap();
        assert!(json.get("note").is_none());
    }
}
