use std::{path::PathBuf, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mockito::Matcher;
use quoteboard_market_data::{ClientConfig, Endpoints, SharingPolicy};
use quoteboard_server::{api::app_router, build_state, config::Config};
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

const QUOTE_PATH: &str = "/v7/finance/quote";

fn config_for(server: &mockito::ServerGuard, tickers_file: PathBuf) -> Config {
    Config {
        tickers_file,
        client: ClientConfig {
            endpoints: Endpoints::with_base(&server.url()),
            request_timeout: Duration::from_secs(5),
            crumb_backoff_base: Duration::from_millis(10),
            ..ClientConfig::default()
        },
        ..Config::default()
    }
}

async fn app_for(config: &Config) -> Router {
    let state = build_state(config).await.unwrap();
    app_router(state, config)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn post_quotes(body: Value, client_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/quotes")
        .header("content-type", "application/json");
    if let Some(id) = client_id {
        builder = builder.header("x-client-id", id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn landing(server: &mut mockito::ServerGuard, hits: usize) -> mockito::Mock {
    server
        .mock("GET", "/")
        .with_status(200)
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn quotes_end_to_end_with_missing_symbol() {
    let mut server = mockito::Server::new_async().await;
    let landing = landing(&mut server, 1).await;
    let quote = server
        .mock("GET", QUOTE_PATH)
        .match_query(Matcher::UrlEncoded(
            "symbols".into(),
            "7203.T,9984.T,AAPL".into(),
        ))
        .with_status(200)
        .with_body(
            json!({"quoteResponse": {"result": [
                {"symbol": "AAPL", "shortName": "Apple Inc.", "regularMarketPrice": 189.84,
                 "regularMarketTime": 1_714_543_200, "currency": "USD"},
                {"symbol": "7203.T", "longName": "Toyota Motor Corporation",
                 "regularMarketPrice": 3120.0, "currency": "JPY"}
            ], "error": null}})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let tmp = tempdir().unwrap();
    let config = config_for(&server, tmp.path().join("tickers.txt"));
    let app = app_for(&config).await;

    let (status, json) = send(
        &app,
        post_quotes(json!({"text": "7203\n#comment\n9984\nAAPL\n"}), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["symbols"], json!(["7203.T", "9984.T", "AAPL"]));
    assert_eq!(json["summary"]["total"], 3);
    assert_eq!(json["summary"]["withPrice"], 2);
    assert_eq!(json["summary"]["withoutPrice"], 1);
    assert_eq!(json["fromCache"], false);
    assert!(json.get("warning").is_none());

    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows[0]["name"], "Toyota Motor Corporation");
    assert_eq!(rows[1]["symbol"], "9984.T");
    assert!(rows[1]["price"].is_null());
    assert!(rows[1]["name"].is_null());
    assert!(rows[1]["marketTimeDisplay"].is_null());
    assert_eq!(rows[2]["symbol"], "AAPL");
    assert!(rows[2]["price"].is_number());
    assert_eq!(rows[2]["marketTimeDisplay"], "2024-05-01 15:00:00");

    let (status, json) = send(&app, post_quotes(json!({"text": "AAPL\n9984\n7203"}), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fromCache"], true);

    landing.assert_async().await;
    quote.assert_async().await;
}

#[tokio::test]
async fn empty_ticker_text_warns_without_upstream_calls() {
    let mut server = mockito::Server::new_async().await;
    let landing = landing(&mut server, 0).await;

    let tmp = tempdir().unwrap();
    let config = config_for(&server, tmp.path().join("tickers.txt"));
    let app = app_for(&config).await;

    let (status, json) = send(&app, post_quotes(json!({"text": "# only comments\n\n"}), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rows"], json!([]));
    assert_eq!(json["summary"]["total"], 0);
    assert!(json["warning"].as_str().unwrap().contains("No symbols"));

    landing.assert_async().await;
}

#[tokio::test]
async fn out_of_range_options_are_bad_requests() {
    let server = mockito::Server::new_async().await;
    let tmp = tempdir().unwrap();
    let config = config_for(&server, tmp.path().join("tickers.txt"));
    let app = app_for(&config).await;

    let (status, json) = send(&app, post_quotes(json!({"text": "AAPL", "chunkSize": 0}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "INVALID_OPTION");

    let (status, _) = send(&app, post_quotes(json!({"text": "AAPL", "ttlSecs": 5}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rate_limit_returns_guidance_and_stale_table() {
    let mut server = mockito::Server::new_async().await;
    let _landing = landing(&mut server, 1).await;
    let _ok = server
        .mock("GET", QUOTE_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"quoteResponse":{"result":[{"symbol":"AAPL","regularMarketPrice":1.5}]}}"#)
        .expect(1)
        .create_async()
        .await;
    let _limited = server
        .mock("GET", QUOTE_PATH)
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let tmp = tempdir().unwrap();
    let config = config_for(&server, tmp.path().join("tickers.txt"));
    let app = app_for(&config).await;

    let (status, _) = send(&app, post_quotes(json!({"text": "AAPL"}), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        post_quotes(json!({"text": "AAPL", "forceRefresh": true}), None),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], 429);
    assert_eq!(json["kind"], "RATE_LIMITED");
    assert!(json["guidance"].as_str().unwrap().contains("cache TTL"));
    assert_eq!(json["stale"]["rows"][0]["symbol"], "AAPL");
    assert_eq!(json["stale"]["fromCache"], true);
}

#[tokio::test]
async fn default_ticker_file_is_read_when_no_text() {
    let mut server = mockito::Server::new_async().await;
    let _landing = landing(&mut server, 1).await;
    let quote = server
        .mock("GET", QUOTE_PATH)
        .match_query(Matcher::UrlEncoded("symbols".into(), "6758.T,MSFT".into()))
        .with_status(200)
        .with_body(r#"{"quoteResponse":{"result":[{"symbol":"MSFT","regularMarketPrice":420.0}]}}"#)
        .expect(1)
        .create_async()
        .await;

    let tmp = tempdir().unwrap();
    let path = tmp.path().join("tickers.txt");
    std::fs::write(&path, "# watchlist\nMSFT\n6758\n").unwrap();
    let config = config_for(&server, path);
    let app = app_for(&config).await;

    let (status, json) = send(&app, post_quotes(json!({}), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["symbols"], json!(["6758.T", "MSFT"]));

    quote.assert_async().await;
}

#[tokio::test]
async fn missing_default_ticker_file_is_not_found() {
    let server = mockito::Server::new_async().await;
    let tmp = tempdir().unwrap();
    let config = config_for(&server, tmp.path().join("absent.txt"));
    let app = app_for(&config).await;

    let (status, json) = send(&app, post_quotes(json!({}), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["message"].as_str().unwrap().contains("absent.txt"));
}

#[tokio::test]
async fn session_reset_and_cache_clear() {
    let mut server = mockito::Server::new_async().await;
    let landing = landing(&mut server, 2).await;
    let quote = server
        .mock("GET", QUOTE_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"quoteResponse":{"result":[{"symbol":"AAPL"}]}}"#)
        .expect(2)
        .create_async()
        .await;

    let tmp = tempdir().unwrap();
    let config = config_for(&server, tmp.path().join("tickers.txt"));
    let app = app_for(&config).await;

    let (status, _) = send(&app, post_quotes(json!({"text": "AAPL"}), None)).await;
    assert_eq!(status, StatusCode::OK);

    let reset = Request::builder()
        .method("POST")
        .uri("/api/v1/session/reset")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, reset).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let clear = Request::builder()
        .method("DELETE")
        .uri("/api/v1/cache")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, clear).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Cache cleared and session dropped: fetch again through a new session.
    let (status, json) = send(&app, post_quotes(json!({"text": "AAPL"}), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fromCache"], false);

    landing.assert_async().await;
    quote.assert_async().await;
}

#[tokio::test]
async fn per_caller_sharing_isolates_sessions_and_caches() {
    let mut server = mockito::Server::new_async().await;
    let landing = landing(&mut server, 2).await;
    let quote = server
        .mock("GET", QUOTE_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"quoteResponse":{"result":[{"symbol":"AAPL"}]}}"#)
        .expect(2)
        .create_async()
        .await;

    let tmp = tempdir().unwrap();
    let config = Config {
        sharing: SharingPolicy::PerCaller,
        ..config_for(&server, tmp.path().join("tickers.txt"))
    };
    let app = app_for(&config).await;

    for caller in ["tab-1", "tab-2", "tab-1"] {
        let (status, _) = send(&app, post_quotes(json!({"text": "AAPL"}), Some(caller))).await;
        assert_eq!(status, StatusCode::OK);
    }

    landing.assert_async().await;
    quote.assert_async().await;
}
