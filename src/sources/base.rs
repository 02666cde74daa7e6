use crate::errors::FetchError;
use crate::util;
use async_trait::async_trait;
use log::debug;
use reqwest::Response;
use std::fmt;

/// 一次逻辑数据请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRequest {
    MarketSnapshot,
    SearchQuotes(String),
    Quote(String),
    News(Option<String>),
}

impl DataRequest {
    /// Operation name used in log lines.
    pub fn operation(&self) -> &'static str {
        match self {
            DataRequest::MarketSnapshot => "market_snapshot",
            DataRequest::SearchQuotes(_) => "search_quotes",
            DataRequest::Quote(_) => "quote",
            DataRequest::News(_) => "news",
        }
    }
}

impl fmt::Display for DataRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRequest::MarketSnapshot => write!(f, "market_snapshot"),
            DataRequest::SearchQuotes(q) => write!(f, "search_quotes({})", q),
            DataRequest::Quote(s) => write!(f, "quote({})", s),
            DataRequest::News(Some(t)) => write!(f, "news({})", t),
            DataRequest::News(None) => write!(f, "news"),
        }
    }
}

/// Base trait for remote data sources
///
/// A source performs exactly one request per call and returns the raw
/// response text. Extraction and validation happen in the fetch service.
#[async_trait]
pub trait DataSource {
    /// Name of this source for logs and provenance
    fn name(&self) -> &'static str;

    /// Issue the request and return the response body
    async fn fetch(&self, request: &DataRequest) -> Result<String, FetchError>;
}

/// 检查状态码并读取响应正文
pub async fn read_body(response: Response) -> Result<String, FetchError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
            message: util::truncate_for_log(text.trim(), 200),
        });
    }

    debug!("Received {} bytes (HTTP {})", text.len(), status.as_u16());
    Ok(text)
}
