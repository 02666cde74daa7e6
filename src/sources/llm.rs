use crate::errors::{FetchError, MarketPulseError, Result};
use crate::sources::base::{read_body, DataRequest, DataSource};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a financial data assistant for the Indian stock market (NSE/BSE). \
Respond with JSON only, using exactly the field names requested. Prices are in INR.";

const QUOTE_SHAPE: &str = r#"{"symbol": string, "name": string, "price": number, "change": number, "changePercent": number, "volume": integer, "marketCap": string, "lastUpdated": ISO-8601 string}"#;

const INDEX_SHAPE: &str = r#"{"name": string, "value": number, "change": number, "changePercent": number}"#;

const NEWS_SHAPE: &str = r#"{"title": string, "summary": string, "url": string, "publishedAt": ISO-8601 string}"#;

/// 基于大模型接口的行情数据源
///
/// 用自然语言描述需要的JSON结构，返回的文本中可能夹杂说明文字或代码块。
pub struct LlmSource {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmSource {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MarketPulseError::RequestError)?;

        info!("LLM source configured: {} ({})", endpoint, model);
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// 为每种请求生成提示词
    pub fn prompt(request: &DataRequest) -> String {
        match request {
            DataRequest::MarketSnapshot => format!(
                "Give the current Indian stock market overview as a JSON object with keys \
                 \"indices\" (array of {index}) covering NIFTY 50, SENSEX, NIFTY BANK and NIFTY IT, \
                 and \"topGainers\", \"topLosers\", \"mostActive\" (each an array of 5 {quote}).",
                index = INDEX_SHAPE,
                quote = QUOTE_SHAPE,
            ),
            DataRequest::SearchQuotes(query) => format!(
                "Search NSE-listed stocks matching \"{}\" by symbol or company name. \
                 Return a JSON array of up to 10 objects shaped {}.",
                query, QUOTE_SHAPE,
            ),
            DataRequest::Quote(symbol) => format!(
                "Give the latest quote for the NSE stock \"{}\" as a single JSON object shaped {}.",
                symbol, QUOTE_SHAPE,
            ),
            DataRequest::News(topic) => format!(
                "List the 6 most recent Indian market news items{} as a JSON array of objects shaped {}.",
                topic
                    .as_deref()
                    .map(|t| format!(" about \"{}\"", t))
                    .unwrap_or_default(),
                NEWS_SHAPE,
            ),
        }
    }
}

/// 从对话补全格式的响应中取出回复文本，其他格式原样返回
pub fn unwrap_completion(body: &str) -> String {
    let envelope: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return body.to_string(),
    };

    envelope
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.to_string())
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl DataSource for LlmSource {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn fetch(&self, request: &DataRequest) -> std::result::Result<String, FetchError> {
        debug!("Asking LLM for {}", request);

        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::prompt(request) },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(FetchError::from)?;

        let text = read_body(response).await?;
        Ok(unwrap_completion(&text))
    }
}
