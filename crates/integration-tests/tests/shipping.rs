//! Shipping estimates against a stub carrier.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use vitrine_integration_tests::{StubCarrier, TestApp};
use vitrine_server::services::shipping::{CarrierQuote, PAC, SEDEX};

fn quote(code: &str, cents: i64, days: u32, error: &str) -> CarrierQuote {
    CarrierQuote {
        code: code.to_owned(),
        price: Decimal::new(cents, 2),
        days,
        error: error.to_owned(),
    }
}

fn codes(options: &Value) -> Vec<&str> {
    options
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["code"].as_str().unwrap())
        .collect()
}

fn assert_amount(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

#[tokio::test]
async fn test_live_quotes() {
    let carrier = StubCarrier::quoting(vec![
        quote(SEDEX, 4290, 2, "0"),
        quote(PAC, 2640, 7, ""),
    ]);
    let app = TestApp::with_carrier(carrier.clone()).await;

    let (status, options) = app
        .post(
            "/api/shipping/calculate",
            &json!({"cep": "20010-000", "items": [{"quantity": 1, "price": 89.9}]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&options), [SEDEX, PAC]);
    assert_eq!(options[0]["name"], "SEDEX");
    assert_amount(&options[0]["price"], 42.9);
    assert_eq!(options[1]["name"], "PAC");
    assert_eq!(options[1]["days"], 7);
    assert_eq!(options[1]["estimated"], false);
    assert!(options[1].get("note").is_none());
    assert_eq!(carrier.calls(), 1);
}

#[tokio::test]
async fn test_carrier_failure_uses_state_table() {
    let app = TestApp::new().await;

    let (status, options) = app
        .post(
            "/api/shipping/calculate",
            &json!({"cep": "01310-100", "items": [{"quantity": 2, "price": "129,90"}]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&options), ["PAC_FALLBACK", "SEDEX_FALLBACK"]);
    assert_eq!(options[0]["name"], "PAC (Estimado)");
    assert_amount(&options[0]["price"], 22.8);
    assert_eq!(options[0]["days"], 5);
    assert_amount(&options[1]["price"], 28.5);
    assert_eq!(options[1]["days"], 1);
    for option in options.as_array().unwrap() {
        assert_eq!(option["estimated"], true);
        assert_eq!(
            option["note"],
            "Valor estimado devido a instabilidade nos Correios"
        );
    }
}

#[tokio::test]
async fn test_invalid_carrier_lines_fall_back() {
    let carrier = StubCarrier::quoting(vec![
        quote(SEDEX, 0, 0, "-3"),
        quote(PAC, 0, 0, "-3"),
    ]);
    let app = TestApp::with_carrier(carrier).await;

    let (status, options) = app
        .post("/api/shipping/calculate", &json!({"cep": "90010000"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&options), ["PAC_FALLBACK", "SEDEX_FALLBACK"]);
    assert_amount(&options[0]["price"], 35.6);
}

#[tokio::test]
async fn test_free_shipping_over_threshold() {
    let app = TestApp::new().await;

    let (status, options) = app
        .post(
            "/api/shipping/calculate",
            &json!({"cep": "01310100", "items": [{"quantity": "2", "price": "499,50"}]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&options), ["FREE", "PAC_FALLBACK", "SEDEX_FALLBACK"]);
    assert_eq!(options[0]["name"], "Frete Grátis (Econômico)");
    assert_amount(&options[0]["price"], 0.0);
    // PAC lead time plus two days
    assert_eq!(options[0]["days"], 7);
    assert_eq!(options[0]["estimated"], true);
}

#[tokio::test]
async fn test_free_shipping_from_live_pac() {
    let carrier = StubCarrier::quoting(vec![
        quote(SEDEX, 2850, 1, "0"),
        quote(PAC, 2280, 4, "0"),
    ]);
    let app = TestApp::with_carrier(carrier).await;

    let (_, options) = app
        .post(
            "/api/shipping/calculate",
            &json!({"cep": "01310100", "items": [{"quantity": 1, "price": 1200}]}),
        )
        .await;

    assert_eq!(codes(&options), ["FREE", SEDEX, PAC]);
    assert_eq!(options[0]["days"], 6);
    assert_eq!(options[0]["estimated"], false);
}

#[tokio::test]
async fn test_below_threshold_has_no_free_option() {
    let app = TestApp::new().await;
    let (_, options) = app
        .post(
            "/api/shipping/calculate",
            &json!({"cep": "01310100", "items": [{"quantity": 1, "price": "998,99"}]}),
        )
        .await;
    assert!(!codes(&options).contains(&"FREE"));
}

#[tokio::test]
async fn test_quotes_are_cached() {
    let carrier = StubCarrier::quoting(vec![quote(PAC, 2280, 5, "0")]);
    let app = TestApp::with_carrier(carrier.clone()).await;
    let cart = json!({"cep": "01310-100", "items": [{"quantity": 1, "price": 50}]});

    let (_, first) = app.post("/api/shipping/calculate", &cart).await;
    let (_, second) = app.post("/api/shipping/calculate", &cart).await;
    assert_eq!(first, second);
    assert_eq!(carrier.calls(), 1);

    // A taller package is a different quote
    app.post(
        "/api/shipping/calculate",
        &json!({"cep": "01310-100", "items": [{"quantity": 3, "price": 50}]}),
    )
    .await;
    assert_eq!(carrier.calls(), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let carrier = StubCarrier::failing(500);
    let app = TestApp::with_carrier(carrier.clone()).await;
    let cart = json!({"cep": "01310-100"});

    app.post("/api/shipping/calculate", &cart).await;
    app.post("/api/shipping/calculate", &cart).await;
    assert_eq!(carrier.calls(), 2);
}

#[tokio::test]
async fn test_missing_postal_code() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/shipping/calculate",
            &json!({"items": [{"quantity": 1, "price": 10}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "postal code is required");
}

#[tokio::test]
async fn test_unknown_region_without_carrier() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/shipping/calculate", &json!({"cep": "00000-000"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "postal code not recognised");
}

#[tokio::test]
async fn test_unknown_region_even_when_carrier_answers() {
    let carrier = StubCarrier::quoting(vec![quote(PAC, 2410, 6, "0")]);
    let app = TestApp::with_carrier(carrier.clone()).await;

    let (status, body) = app
        .post("/api/shipping/calculate", &json!({"cep": "00500-000"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "postal code not recognised");
    assert_eq!(carrier.calls(), 0);
}

#[tokio::test]
async fn test_unreadable_body_gets_json_error() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/shipping/calculate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("cep=01310100"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Well-formed but mistyped
    let (status, body) = app
        .post("/api/shipping/calculate", &json!({"cep": ["01310100"]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
