use crate::errors::{MarketPulseError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_NEWS_ENDPOINT: &str = "https://newsapi.org";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// 数据获取层配置，调用期间只读
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub mock_endpoint: Option<String>,
    pub news_endpoint: String,
    pub news_api_key: Option<String>,
    /// 认证服务签发的用户令牌，附加在自有接口请求上
    pub auth_token: Option<String>,
    pub source_timeout: Duration,
    pub poll_interval: Duration,
    pub min_news_items: usize,
    pub news_page_size: usize,
    pub max_drift_pct: f64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            llm_endpoint: None,
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            mock_endpoint: None,
            news_endpoint: DEFAULT_NEWS_ENDPOINT.to_string(),
            news_api_key: None,
            auth_token: None,
            source_timeout: Duration::from_secs(12),
            poll_interval: Duration::from_secs(30),
            min_news_items: 3,
            news_page_size: 10,
            max_drift_pct: 5.0,
        }
    }

    /// 从 `MARKETPULSE_*` 环境变量读取配置，未设置的项保持默认值
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        config.llm_endpoint = env_string("MARKETPULSE_LLM_ENDPOINT");
        config.llm_api_key = env_string("MARKETPULSE_LLM_API_KEY");
        if let Some(model) = env_string("MARKETPULSE_LLM_MODEL") {
            config.llm_model = model;
        }
        config.mock_endpoint = env_string("MARKETPULSE_MOCK_ENDPOINT");
        if let Some(endpoint) = env_string("MARKETPULSE_NEWS_ENDPOINT") {
            config.news_endpoint = endpoint;
        }
        config.news_api_key = env_string("MARKETPULSE_NEWS_API_KEY");
        config.auth_token = env_string("MARKETPULSE_AUTH_TOKEN");

        if let Some(secs) = env_parse::<u64>("MARKETPULSE_TIMEOUT_SECS")? {
            config.source_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("MARKETPULSE_POLL_SECS")? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(min) = env_parse::<usize>("MARKETPULSE_MIN_NEWS_ITEMS")? {
            config.min_news_items = min;
        }
        if let Some(pct) = env_parse::<f64>("MARKETPULSE_MAX_DRIFT_PCT")? {
            config = config.with_max_drift_pct(pct);
        }

        Ok(config)
    }

    pub fn with_llm(mut self, endpoint: &str, api_key: &str) -> Self {
        self.llm_endpoint = Some(endpoint.to_string());
        self.llm_api_key = Some(api_key.to_string());
        self
    }

    pub fn with_llm_model(mut self, model: &str) -> Self {
        self.llm_model = model.to_string();
        self
    }

    pub fn with_mock_endpoint(mut self, endpoint: &str) -> Self {
        self.mock_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_news_api(mut self, endpoint: &str, api_key: &str) -> Self {
        self.news_endpoint = endpoint.to_string();
        self.news_api_key = Some(api_key.to_string());
        self
    }

    pub fn with_auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_min_news_items(mut self, min: usize) -> Self {
        self.min_news_items = min;
        self
    }

    pub fn with_news_page_size(mut self, size: usize) -> Self {
        self.news_page_size = size.max(1);
        self
    }

    // 非法值回退到默认边界，保证随机游走始终有界
    pub fn with_max_drift_pct(mut self, pct: f64) -> Self {
        self.max_drift_pct = if pct.is_finite() && pct > 0.0 { pct } else { 5.0 };
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| MarketPulseError::ConfigError(format!("{}={}: {}", key, raw, e))),
        None => Ok(None),
    }
}
