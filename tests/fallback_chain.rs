use marketpulse::services::decode;
use marketpulse::{Config, FetchService, Provenance};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TCS: &str = r#"{"symbol":"TCS","name":"Tata Consultancy Services","price":3890.75,"change":-12.45,"changePercent":-0.32,"volume":1890000,"lastUpdated":"2024-01-20T15:30:00Z"}"#;

const LLM_PATH: &str = "/v1/chat/completions";

fn config_for(llm: &MockServer, mock: &MockServer) -> Config {
    Config::new()
        .with_llm(&format!("{}{}", llm.uri(), LLM_PATH), "test-key")
        .with_mock_endpoint(&format!("{}/api", mock.uri()))
        .with_auth_token("user-token")
        .with_source_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn both_sources_unavailable_falls_back_to_mock() {
    let llm = MockServer::start().await;
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LLM_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&llm)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/market-overview"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock)
        .await;

    let service = FetchService::from_config(config_for(&llm, &mock)).unwrap();
    let result = service.fetch_market_snapshot().await;

    assert_eq!(result.provenance, Provenance::Mock);
    assert_eq!(result.source, "synthesizer");
    let json = serde_json::to_value(&result.data).unwrap();
    assert!(decode::decode_snapshot(json).is_ok());
}

#[tokio::test]
async fn primary_success_is_returned_verbatim() {
    let llm = MockServer::start().await;
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LLM_PATH))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TCS))
        .expect(1)
        .mount(&llm)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TCS))
        .expect(0)
        .mount(&mock)
        .await;

    let service = FetchService::from_config(config_for(&llm, &mock)).unwrap();
    let result = service.fetch_quote("TCS").await;

    assert_eq!(result.provenance, Provenance::Live);
    assert_eq!(result.source, "llm");
    let expected: Value = serde_json::from_str(TCS).unwrap();
    assert_eq!(serde_json::to_value(&result.data).unwrap(), expected);
}

#[tokio::test]
async fn search_uses_single_attempt_when_primary_answers() {
    let llm = MockServer::start().await;
    let mock = MockServer::start().await;

    let reliance = json!([{
        "symbol": "RELIANCE",
        "name": "Reliance Industries",
        "price": 2950.1,
        "change": 21.3,
        "changePercent": 0.73,
        "volume": 5400000,
        "marketCap": "₹19.9L Cr",
        "lastUpdated": "2024-01-20T15:30:00Z"
    }]);
    Mock::given(method("POST"))
        .and(path(LLM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(reliance))
        .mount(&llm)
        .await;

    let service = FetchService::from_config(config_for(&llm, &mock)).unwrap();
    let result = service.search_quotes("RELIANCE").await;

    assert_eq!(result.provenance, Provenance::Live);
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.data[0].market_cap.as_deref(), Some("₹19.9L Cr"));
    assert_eq!(llm.received_requests().await.unwrap().len(), 1);
    assert!(mock.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_completion_reply_with_prose_is_extracted() {
    let llm = MockServer::start().await;
    let mock = MockServer::start().await;

    let content = format!(
        "Here is the data:\n```json\n{}\n```\nLet me know if you need more.",
        TCS
    );
    let envelope = json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    });
    Mock::given(method("POST"))
        .and(path(LLM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope))
        .mount(&llm)
        .await;

    let service = FetchService::from_config(config_for(&llm, &mock)).unwrap();
    let result = service.fetch_quote("tcs").await;

    assert_eq!(result.provenance, Provenance::Live);
    assert_eq!(result.data.symbol, "TCS");
    assert_eq!(result.data.change, -12.45);
}

#[tokio::test]
async fn malformed_primary_falls_back_to_mock_endpoint() {
    let llm = MockServer::start().await;
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LLM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("I cannot provide live prices."))
        .expect(1)
        .mount(&llm)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/quote/TCS"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TCS))
        .expect(1)
        .mount(&mock)
        .await;

    let service = FetchService::from_config(config_for(&llm, &mock)).unwrap();
    let result = service.fetch_quote("TCS").await;

    assert_eq!(result.provenance, Provenance::Fallback);
    assert_eq!(result.source, "mock-endpoint");
    assert_eq!(result.data.price, 3890.75);
}

#[tokio::test]
async fn hung_primary_times_out_before_fallback() {
    let llm = MockServer::start().await;
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(TCS)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&llm)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "TCS"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("[{}]", TCS)))
        .mount(&mock)
        .await;

    let config = config_for(&llm, &mock).with_source_timeout(Duration::from_millis(300));
    let service = FetchService::from_config(config).unwrap();
    let result = service.search_quotes("TCS").await;

    assert_eq!(result.provenance, Provenance::Fallback);
    assert_eq!(result.data.len(), 1);
}

#[tokio::test]
async fn unreachable_sources_still_return_data() {
    // 端口上没有服务，连接失败
    let config = Config::new()
        .with_llm("http://127.0.0.1:9/v1/chat/completions", "k")
        .with_mock_endpoint("http://127.0.0.1:9/api")
        .with_source_timeout(Duration::from_secs(2));
    let service = FetchService::from_config(config).unwrap();

    let quote = service.fetch_quote("INFY").await;
    assert_eq!(quote.provenance, Provenance::Mock);
    assert_eq!(quote.data.symbol, "INFY");

    let search = service.search_quotes("%%%garbage%%%").await;
    assert_eq!(search.provenance, Provenance::Mock);
    assert!(!search.data.is_empty());
}

#[tokio::test]
async fn news_api_articles_are_filtered_and_padded() {
    let news = MockServer::start().await;

    let body = json!({
        "status": "ok",
        "totalResults": 3,
        "articles": [
            { "source": { "name": "Mint" }, "title": "Reliance shares rise after AGM", "description": "The stock gained 2% in early trade.", "url": "https://news.test/1", "publishedAt": "2024-01-20T10:00:00Z" },
            { "source": { "name": "ET" }, "title": "Reliance retail arm eyes listing", "description": "", "url": "https://news.test/2", "publishedAt": "2024-01-20T09:00:00Z" },
            { "source": { "id": null, "name": "[Removed]" }, "title": "[Removed]", "description": "[Removed]", "url": "https://removed.com", "publishedAt": "1970-01-01T00:00:00Z" }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("q", "RELIANCE"))
        .and(header("X-Api-Key", "news-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&news)
        .await;

    let config = Config::new().with_news_api(&news.uri(), "news-key");
    let service = FetchService::from_config(config).unwrap();
    let result = service.fetch_news(Some("RELIANCE")).await;

    assert_eq!(result.provenance, Provenance::Live);
    assert_eq!(result.source, "news-api");
    assert_eq!(result.data.len(), 3);
    assert_eq!(result.data[0].title, "Reliance shares rise after AGM");
    assert!(result.data.iter().all(|n| n.title != "[Removed]"));
    assert!(result.data.iter().all(|n| !n.summary.is_empty()));
}
