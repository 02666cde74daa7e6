use crate::config::Config;
use crate::data_provider::ReferenceCatalog;
use crate::errors::{FetchError, Result};
use crate::models::fetch::{FetchResult, Provenance};
use crate::models::market::{MarketSnapshot, QuoteRecord};
use crate::models::news::NewsItem;
use crate::services::decode;
use crate::services::synthesizer::{self, Direction};
use crate::sources::base::{DataRequest, DataSource};
use crate::sources::llm::LlmSource;
use crate::sources::mock_endpoint::MockEndpointSource;
use crate::sources::news_api::NewsApiSource;
use crate::util::json_utils;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

pub type SharedSource = Arc<dyn DataSource + Send + Sync>;

/// 数据获取服务
///
/// 按固定顺序逐个尝试数据源，第一个成功的结果直接返回；全部失败时在本地合成。
/// 四个公开操作都不会返回错误。
pub struct FetchService {
    config: Config,
    market_sources: Vec<SharedSource>,
    news_sources: Vec<SharedSource>,
    catalog: ReferenceCatalog,
}

impl FetchService {
    /// 使用给定的数据源创建服务
    pub fn new(config: Config, market_sources: Vec<SharedSource>, news_sources: Vec<SharedSource>) -> Self {
        Self {
            config,
            market_sources,
            news_sources,
            catalog: ReferenceCatalog::new(),
        }
    }

    /// 根据配置创建数据源，未配置的数据源跳过
    pub fn from_config(config: Config) -> Result<Self> {
        let timeout = config.source_timeout;
        let mut market_sources: Vec<SharedSource> = Vec::new();
        let mut news_sources: Vec<SharedSource> = Vec::new();

        if let (Some(endpoint), Some(key)) = (&config.llm_endpoint, &config.llm_api_key) {
            market_sources.push(Arc::new(LlmSource::new(endpoint, key, &config.llm_model, timeout)?));
        }

        if let Some(key) = &config.news_api_key {
            news_sources.push(Arc::new(NewsApiSource::new(
                &config.news_endpoint,
                key,
                config.news_page_size,
                timeout,
            )?));
        }

        if let Some(endpoint) = &config.mock_endpoint {
            let mock: SharedSource = Arc::new(MockEndpointSource::new(
                endpoint,
                config.auth_token.as_deref(),
                timeout,
            )?);
            market_sources.push(mock.clone());
            news_sources.push(mock);
        }

        info!(
            "Fetch service ready: {} market source(s), {} news source(s)",
            market_sources.len(),
            news_sources.len()
        );
        Ok(Self::new(config, market_sources, news_sources))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    /// 市场概览
    pub async fn fetch_market_snapshot(&self) -> FetchResult<MarketSnapshot> {
        self.run_chain(
            &self.market_sources,
            &DataRequest::MarketSnapshot,
            decode::decode_snapshot,
            || {
                synthesizer::synthesize_snapshot(&self.catalog, self.config.max_drift_pct, &mut rand::thread_rng())
            },
        )
        .await
    }

    /// 按代码或名称搜索股票
    pub async fn search_quotes(&self, query: &str) -> FetchResult<Vec<QuoteRecord>> {
        let query = query.trim();
        let synthesize = || {
            synthesizer::synthesize_search(&self.catalog, query, self.config.max_drift_pct, &mut rand::thread_rng())
        };

        if query.is_empty() {
            debug!("Blank search query, skipping remote sources");
            return FetchResult::mock(synthesize());
        }

        self.run_chain(
            &self.market_sources,
            &DataRequest::SearchQuotes(query.to_string()),
            decode::decode_quote_list,
            synthesize,
        )
        .await
    }

    /// 单只股票行情
    pub async fn fetch_quote(&self, symbol: &str) -> FetchResult<QuoteRecord> {
        let symbol = symbol.trim().to_uppercase();
        let synthesize = || {
            synthesizer::synthesize_quote(
                &self.catalog,
                &symbol,
                Direction::Any,
                self.config.max_drift_pct,
                &mut rand::thread_rng(),
            )
        };

        if symbol.is_empty() {
            debug!("Blank symbol, skipping remote sources");
            return FetchResult::mock(synthesize());
        }

        self.run_chain(
            &self.market_sources,
            &DataRequest::Quote(symbol.clone()),
            |value| decode::decode_quote(value, &symbol),
            synthesize,
        )
        .await
    }

    /// 新闻，可按股票代码或主题过滤
    ///
    /// 过滤掉无效文章后不足 `min_news_items` 条时，用合成条目补足。
    pub async fn fetch_news(&self, topic: Option<&str>) -> FetchResult<Vec<NewsItem>> {
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());
        let min_items = self.config.min_news_items;

        let mut result = self
            .run_chain(
                &self.news_sources,
                &DataRequest::News(topic.map(|t| t.to_string())),
                |value| decode::decode_news(value).map(decode::filter_news),
                || synthesizer::synthesize_news(topic, min_items.max(1), &mut rand::thread_rng()),
            )
            .await;

        if result.data.len() < min_items {
            let missing = min_items - result.data.len();
            debug!("Padding news from {} with {} filler item(s)", result.source, missing);
            let filler = synthesizer::synthesize_news(topic, missing, &mut rand::thread_rng());
            result.data.extend(filler);
        }

        result
    }

    /// 降级链：逐个尝试数据源，全部失败时本地合成
    async fn run_chain<T, D, S>(
        &self,
        sources: &[SharedSource],
        request: &DataRequest,
        decode: D,
        synthesize: S,
    ) -> FetchResult<T>
    where
        D: Fn(Value) -> std::result::Result<T, FetchError>,
        S: FnOnce() -> T,
    {
        for (position, source) in sources.iter().enumerate() {
            match self.attempt(source.as_ref(), request, &decode).await {
                Ok(data) => {
                    let provenance = Provenance::for_position(position);
                    info!("{} served by {} ({})", request, source.name(), provenance);
                    return FetchResult::new(data, provenance, source.name());
                }
                Err(e) => {
                    warn!("[{}] {} failed for {}: {}", source.name(), e.kind(), request, e);
                }
            }
        }

        if sources.is_empty() {
            debug!("No sources configured for {}, synthesizing", request.operation());
        } else {
            warn!("All {} source(s) failed for {}, using synthesized data", sources.len(), request);
        }
        FetchResult::mock(synthesize())
    }

    /// 单个数据源的一次完整尝试：请求、提取、校验
    async fn attempt<T, D>(
        &self,
        source: &(dyn DataSource + Send + Sync),
        request: &DataRequest,
        decode: &D,
    ) -> std::result::Result<T, FetchError>
    where
        D: Fn(Value) -> std::result::Result<T, FetchError>,
    {
        let timeout = self.config.source_timeout;
        let raw = tokio::time::timeout(timeout, source.fetch(request))
            .await
            .map_err(|_| FetchError::Network(format!("timed out after {:?}", timeout)))??;

        let parsed = json_utils::extract_json(&raw)?;
        decode(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// 按脚本返回固定响应的数据源，并记录调用顺序
    struct ScriptedSource {
        name: &'static str,
        response: std::result::Result<String, FetchError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScriptedSource {
        fn new(
            name: &'static str,
            response: std::result::Result<&str, FetchError>,
            log: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                response: response.map(|s| s.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
                log: log.clone(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _request: &DataRequest) -> std::result::Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.name);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.clone()
        }
    }

    fn shared(source: &Arc<ScriptedSource>) -> SharedSource {
        source.clone()
    }

    const TCS: &str = r#"{"symbol":"TCS","name":"Tata Consultancy Services","price":3890.75,"change":-12.45,"changePercent":-0.32,"volume":1890000,"lastUpdated":"2024-01-20T15:30:00Z"}"#;

    fn service(market: Vec<SharedSource>, news: Vec<SharedSource>) -> FetchService {
        FetchService::new(Config::new(), market, news)
    }

    fn http_503() -> FetchError {
        FetchError::Http { status: 503, message: "Service Unavailable".into() }
    }

    fn shape_of(value: &Value) -> Vec<String> {
        let mut keys: Vec<String> = value
            .as_object()
            .map(|o| o.keys().filter(|k| *k != "marketCap").cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_primary_success_is_live() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = ScriptedSource::new("primary", Ok(TCS), &log);
        let secondary = ScriptedSource::new("secondary", Ok(TCS), &log);
        let svc = service(vec![shared(&primary), shared(&secondary)], vec![]);

        let result = svc.fetch_quote("tcs").await;
        assert_eq!(result.provenance, Provenance::Live);
        assert_eq!(result.source, "primary");
        assert_eq!(result.data.price, 3890.75);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_ordering() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = ScriptedSource::new("primary", Err(http_503()), &log);
        let secondary = ScriptedSource::new("secondary", Ok(TCS), &log);
        let svc = service(vec![shared(&primary), shared(&secondary)], vec![]);

        let result = svc.fetch_quote("TCS").await;
        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.source, "secondary");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["primary", "secondary"]);
    }

    #[tokio::test]
    async fn test_every_failure_kind_falls_through_to_mock() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sources: Vec<SharedSource> = vec![
            shared(&ScriptedSource::new("network", Err(FetchError::Network("connection refused".into())), &log)),
            shared(&ScriptedSource::new("http", Err(http_503()), &log)),
            shared(&ScriptedSource::new("prose", Ok("I'm sorry, markets are closed."), &log)),
            shared(&ScriptedSource::new("shape", Ok(r#"{"symbol":"TCS","price":"n/a"}"#), &log)),
        ];
        let svc = service(sources, vec![]);

        let result = svc.fetch_quote("TCS").await;
        assert_eq!(result.provenance, Provenance::Mock);
        assert_eq!(result.source, "synthesizer");
        assert_eq!(result.data.symbol, "TCS");
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_no_sources_configured() {
        let svc = service(vec![], vec![]);

        let snapshot = svc.fetch_market_snapshot().await;
        assert_eq!(snapshot.provenance, Provenance::Mock);
        assert!(!snapshot.data.indices.is_empty());

        let news = svc.fetch_news(None).await;
        assert_eq!(news.provenance, Provenance::Mock);
        assert_eq!(news.data.len(), 3);
    }

    #[tokio::test]
    async fn test_blank_inputs_skip_sources() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = ScriptedSource::new("primary", Ok(TCS), &log);
        let svc = service(vec![shared(&primary)], vec![]);

        let search = svc.search_quotes("   ").await;
        assert_eq!(search.provenance, Provenance::Mock);
        assert!(!search.data.is_empty());

        let quote = svc.fetch_quote("").await;
        assert_eq!(quote.provenance, Provenance::Mock);
        assert!(!quote.data.symbol.is_empty());
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let slow = Arc::new(ScriptedSource {
            name: "slow",
            response: Ok(TCS.to_string()),
            delay: Some(Duration::from_secs(5)),
            calls: AtomicUsize::new(0),
            log: log.clone(),
        });
        let backup = ScriptedSource::new("backup", Ok(TCS), &log);
        let config = Config::new().with_source_timeout(Duration::from_millis(50));
        let svc = FetchService::new(config, vec![shared(&slow), shared(&backup)], vec![]);

        let result = svc.fetch_quote("TCS").await;
        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.source, "backup");
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn test_live_and_mock_quotes_share_shape() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let live_svc = service(vec![shared(&ScriptedSource::new("primary", Ok(TCS), &log))], vec![]);
        let mock_svc = service(vec![shared(&ScriptedSource::new("primary", Err(http_503()), &log))], vec![]);

        let live = live_svc.fetch_quote("TCS").await;
        let mock = mock_svc.fetch_quote("TCS").await;
        assert_eq!(live.provenance, Provenance::Live);
        assert_eq!(mock.provenance, Provenance::Mock);

        let live_json = serde_json::to_value(&live.data).unwrap();
        let mock_json = serde_json::to_value(&mock.data).unwrap();
        assert_eq!(shape_of(&live_json), shape_of(&mock_json));

        // 合成结果可以原样通过同一套校验
        assert!(decode::decode_quote(mock_json, "TCS").is_ok());
    }

    #[tokio::test]
    async fn test_mock_snapshot_passes_validation() {
        let svc = service(vec![], vec![]);
        let snapshot = svc.fetch_market_snapshot().await;
        let json = serde_json::to_value(&snapshot.data).unwrap();
        assert!(decode::decode_snapshot(json).is_ok());
    }

    #[tokio::test]
    async fn test_repeated_mock_quotes_stay_within_drift() {
        let svc = service(vec![], vec![]);
        let bound = svc.config().max_drift_pct / 100.0;

        let mut prev = svc.fetch_quote("TCS").await.data.price;
        for _ in 0..2000 {
            let next = svc.fetch_quote("TCS").await;
            assert_eq!(next.provenance, Provenance::Mock);
            let drift = ((next.data.price - prev) / prev).abs();
            assert!(drift <= bound, "successive mock quotes drifted {:.4}", drift);
            prev = next.data.price;
        }
    }

    #[tokio::test]
    async fn test_repeated_mock_snapshots_stay_within_drift() {
        let svc = service(vec![], vec![]);
        let bound = svc.config().max_drift_pct / 100.0;

        let mut prev = svc.fetch_market_snapshot().await.data;
        for _ in 0..200 {
            let next = svc.fetch_market_snapshot().await.data;
            for quote in next.quotes() {
                if let Some(old) = prev.quotes().find(|q| q.symbol == quote.symbol) {
                    assert!(((quote.price - old.price) / old.price).abs() <= bound);
                }
            }
            for (a, b) in prev.indices.iter().zip(next.indices.iter()) {
                assert!(((b.value - a.value) / a.value).abs() <= bound);
            }
            prev = next;
        }
    }

    #[tokio::test]
    async fn test_search_from_fenced_llm_reply() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let body = format!("Here are the matches:\n```json\n[{}]\n```", TCS);
        let primary = ScriptedSource::new("primary", Ok(body.as_str()), &log);
        let secondary = ScriptedSource::new("secondary", Ok("[]"), &log);
        let svc = service(vec![shared(&primary), shared(&secondary)], vec![]);

        let result = svc.search_quotes("RELIANCE").await;
        assert_eq!(result.provenance, Provenance::Live);
        assert_eq!(result.data.len(), 1);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_news_filtered_and_padded() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let body = r#"[
            {"title":"Nifty ends higher","summary":"IT stocks led gains.","url":"https://n.test/1","publishedAt":"2024-01-20T10:00:00Z"},
            {"title":"RBI holds rates","summary":"","url":"https://n.test/2","publishedAt":"2024-01-20T09:00:00Z"},
            {"title":"[Removed]","summary":"[Removed]","url":"https://removed.com","publishedAt":"2024-01-20T08:00:00Z"}
        ]"#;
        let news = ScriptedSource::new("news", Ok(body), &log);
        let svc = service(vec![], vec![shared(&news)]);

        let result = svc.fetch_news(Some("nifty")).await;
        assert_eq!(result.provenance, Provenance::Live);
        assert_eq!(result.data.len(), 3);
        assert_eq!(result.data[0].title, "Nifty ends higher");
        assert!(result.data.iter().all(|n| n.is_displayable()));
        assert!(result.data.iter().all(|n| n.title != "[Removed]" && n.title != "RBI holds rates"));
    }

    #[tokio::test]
    async fn test_news_item_with_null_summary_keeps_source() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let body = r#"[
            {"title":"Nifty ends higher","summary":"IT stocks led gains.","url":"https://n.test/1","publishedAt":"2024-01-20T10:00:00Z"},
            {"title":"RBI holds rates","summary":null,"url":"https://n.test/2","publishedAt":"2024-01-20T09:00:00Z"}
        ]"#;
        let primary = ScriptedSource::new("primary", Ok(body), &log);
        let backup = ScriptedSource::new("backup", Ok("[]"), &log);
        let svc = service(vec![], vec![shared(&primary), shared(&backup)]);

        let result = svc.fetch_news(None).await;
        assert_eq!(result.provenance, Provenance::Live);
        assert_eq!(result.source, "primary");
        assert_eq!(result.data[0].title, "Nifty ends higher");
        assert!(result.data.iter().all(|n| n.title != "RBI holds rates"));
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = ScriptedSource::new("primary", Ok(TCS), &log);
        let svc = Arc::new(service(vec![shared(&primary)], vec![]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.fetch_quote("TCS").await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap();
            assert_eq!(result.provenance, Provenance::Live);
        }
        assert_eq!(primary.calls(), 8);
    }
}
