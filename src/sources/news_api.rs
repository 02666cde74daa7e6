use crate::errors::{FetchError, MarketPulseError, Result};
use crate::sources::base::{read_body, DataRequest, DataSource};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;

const COUNTRY: &str = "in";
const LANGUAGE: &str = "en";
const SORT_BY: &str = "publishedAt";
const CATEGORY: &str = "business";

/// 关键词新闻搜索接口
///
/// 有主题时按关键词搜索，没有主题时取本国财经头条。
pub struct NewsApiSource {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: usize,
}

impl NewsApiSource {
    pub fn new(base_url: &str, api_key: &str, page_size: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MarketPulseError::RequestError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            page_size,
        })
    }

    fn route(&self, topic: Option<&str>) -> (String, Vec<(&'static str, String)>) {
        let page_size = self.page_size.to_string();
        match topic {
            Some(topic) => (
                format!("{}/v2/everything", self.base_url),
                vec![
                    ("q", topic.to_string()),
                    ("language", LANGUAGE.to_string()),
                    ("sortBy", SORT_BY.to_string()),
                    ("pageSize", page_size),
                ],
            ),
            None => (
                format!("{}/v2/top-headlines", self.base_url),
                vec![
                    ("country", COUNTRY.to_string()),
                    ("category", CATEGORY.to_string()),
                    ("pageSize", page_size),
                ],
            ),
        }
    }
}

#[async_trait]
impl DataSource for NewsApiSource {
    fn name(&self) -> &'static str {
        "news-api"
    }

    async fn fetch(&self, request: &DataRequest) -> std::result::Result<String, FetchError> {
        let topic = match request {
            DataRequest::News(topic) => topic.as_deref(),
            other => {
                warn!("News source asked for {}", other);
                return Err(FetchError::ShapeValidation(format!(
                    "news source cannot serve {}",
                    other.operation()
                )));
            }
        };

        let (url, query) = self.route(topic);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(FetchError::from)?;

        read_body(response).await
    }
}
