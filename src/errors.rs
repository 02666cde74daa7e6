use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketPulseError {
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, MarketPulseError>;

/// 单个数据源尝试失败的原因
///
/// 只用于日志诊断，任何一种都只意味着"尝试下一个数据源"。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// 无法连接数据源（连接失败、超时）
    #[error("network error: {0}")]
    Network(String),

    /// 数据源返回非 2xx 状态码
    #[error("HTTP error: status {status}: {message}")]
    Http { status: u16, message: String },

    /// 去除代码块围栏并截取后仍无法解析为 JSON
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// JSON 可解析，但缺少必需字段或字段类型错误
    #[error("shape validation error: {0}")]
    ShapeValidation(String),
}

impl FetchError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "NetworkError",
            FetchError::Http { .. } => "HttpError",
            FetchError::JsonParse(_) => "JsonParseError",
            FetchError::ShapeValidation(_) => "ShapeValidationError",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            FetchError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else if e.is_decode() {
            FetchError::JsonParse(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        // 语法错误属于解析失败，数据类型不匹配属于结构校验失败
        match e.classify() {
            serde_json::error::Category::Data => FetchError::ShapeValidation(e.to_string()),
            _ => FetchError::JsonParse(e.to_string()),
        }
    }
}
