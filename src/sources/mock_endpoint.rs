use crate::errors::{FetchError, MarketPulseError, Result};
use crate::sources::base::{read_body, DataRequest, DataSource};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use std::time::Duration;

/// 应用自带的模拟数据接口
pub struct MockEndpointSource {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl MockEndpointSource {
    pub fn new(base_url: &str, auth_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MarketPulseError::ConfigError(format!("mock endpoint {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(MarketPulseError::ConfigError(format!(
                "mock endpoint {} cannot carry a path",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MarketPulseError::RequestError)?;

        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.map(|t| t.to_string()),
        })
    }

    /// 路径段和查询参数，路径段原样给出，拼接时再转义
    fn route(request: &DataRequest) -> (Vec<&str>, Vec<(&'static str, String)>) {
        match request {
            DataRequest::MarketSnapshot => (vec!["market-overview"], vec![]),
            DataRequest::SearchQuotes(query) => (vec!["search"], vec![("q", query.clone())]),
            DataRequest::Quote(symbol) => (vec!["quote", symbol.as_str()], vec![]),
            DataRequest::News(Some(topic)) => (vec!["news"], vec![("topic", topic.clone())]),
            DataRequest::News(None) => (vec!["news"], vec![]),
        }
    }

    fn request_url(&self, segments: &[&str]) -> std::result::Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl DataSource for MockEndpointSource {
    fn name(&self) -> &'static str {
        "mock-endpoint"
    }

    async fn fetch(&self, request: &DataRequest) -> std::result::Result<String, FetchError> {
        let (segments, query) = Self::route(request);
        let url = self.request_url(&segments)?;
        debug!("GET {}", url);

        let mut builder = self.client.get(url).query(&query);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(FetchError::from)?;
        read_body(response).await
    }
}
