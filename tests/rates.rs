//! Rate provider against a local mock HTTP server.

use donation_scan::{AnalyzerConfig, RateProvider, RateSource};
use mockito::Server;
use rust_decimal_macros::dec;
use std::time::Duration;

fn provider() -> RateProvider {
    let mut config = AnalyzerConfig::default();
    config.rate_request_timeout = 2.0;
    RateProvider::new(&config).unwrap()
}

#[tokio::test]
async fn test_live_rates() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v6/latest/USD")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"result":"success","rates":{"USD":1,"INR":80.5,"EUR":0.5,"JPY":150}}"#)
        .create_async()
        .await;

    let url = format!("{}/v6/latest/USD", server.url());
    let table = provider().fetch_rates("USD", &url).await;

    mock.assert_async().await;
    assert_eq!(table.source(), RateSource::Live);
    assert_eq!(table.rate("INR"), Some(dec!(80.5)));
    assert_eq!(table.rate("JPY"), Some(dec!(150)));
    assert_eq!(table.to_reference(dec!(3), "EUR"), Some(dec!(6)));
}

#[tokio::test]
async fn test_live_rates_rebased_onto_reference() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v6/latest/USD")
        .with_status(200)
        .with_body(r#"{"result":"success","rates":{"USD":1,"INR":83,"EUR":0.92}}"#)
        .create_async()
        .await;

    let table = provider()
        .fetch_rates("EUR", &format!("{}/v6/latest/USD", server.url()))
        .await;
    assert_eq!(table.source(), RateSource::Live);
    assert_eq!(table.reference(), "EUR");
    assert_eq!(table.rate("EUR"), Some(dec!(1)));
    // 1 USD = 0.92 EUR
    assert_eq!(table.to_reference(dec!(10), "USD").unwrap().round_dp(2), dec!(9.20));
    assert_eq!(table.to_reference(dec!(83), "INR").unwrap().round_dp(2), dec!(0.92));
    assert_eq!(table.to_reference(dec!(5), "EUR"), Some(dec!(5)));
}

#[tokio::test]
async fn test_reference_missing_from_response_falls_back() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/rates")
        .with_status(200)
        .with_body(r#"{"result":"success","rates":{"USD":1,"INR":83,"EUR":0.9}}"#)
        .create_async()
        .await;

    let table = provider()
        .fetch_rates("GBP", &format!("{}/rates", server.url()))
        .await;
    assert_eq!(table.source(), RateSource::Fallback);
    assert_eq!(table.rate("GBP"), Some(dec!(1)));
}

#[tokio::test]
async fn test_unsuccessful_result_falls_back() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/rates")
        .with_status(200)
        .with_body(r#"{"result":"error","error-type":"unsupported-code"}"#)
        .create_async()
        .await;

    let table = provider()
        .fetch_rates("USD", &format!("{}/rates", server.url()))
        .await;
    assert_eq!(table.source(), RateSource::Fallback);
    assert_eq!(table.rate("INR"), Some(dec!(83)));
}

#[tokio::test]
async fn test_missing_required_currency_falls_back() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/rates")
        .with_status(200)
        .with_body(r#"{"result":"success","rates":{"USD":1,"EUR":0.9}}"#)
        .create_async()
        .await;

    let table = provider()
        .fetch_rates("USD", &format!("{}/rates", server.url()))
        .await;
    assert_eq!(table.source(), RateSource::Fallback);
    assert_eq!(table.rate("EUR"), Some(dec!(0.92)));
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/rates")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let table = provider()
        .fetch_rates("USD", &format!("{}/rates", server.url()))
        .await;
    assert_eq!(table.source(), RateSource::Fallback);
}

#[tokio::test]
async fn test_malformed_body_falls_back() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/rates")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let table = provider()
        .fetch_rates("USD", &format!("{}/rates", server.url()))
        .await;
    assert_eq!(table.source(), RateSource::Fallback);
}

#[tokio::test]
async fn test_network_failure_returns_fallback_table() {
    // Nothing listens on port 1.
    let table = tokio::time::timeout(
        Duration::from_secs(10),
        provider().fetch_rates("USD", "http://127.0.0.1:1/latest/USD"),
    )
    .await
    .expect("fetch_rates must not hang");

    assert_eq!(table.source(), RateSource::Fallback);
    assert_eq!(table.rate("USD"), Some(dec!(1.0)));
    assert_eq!(table.rate("INR"), Some(dec!(83.0)));
}
