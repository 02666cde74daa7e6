//! 解析后JSON的结构校验
//!
//! 先按预期类型解码（可能的几种外层格式用 untagged 枚举表示），再检查必需字段。
//! 任何不匹配都统一成 `FetchError::ShapeValidation`，不做业务规则校验。

use crate::errors::FetchError;
use crate::models::market::{IndexRecord, MarketSnapshot, QuoteRecord};
use crate::models::news::NewsItem;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum QuotePayload {
    Single(QuoteRecord),
    List(Vec<QuoteRecord>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuoteListPayload {
    Bare(Vec<QuoteRecord>),
    Wrapped {
        #[serde(alias = "stocks")]
        results: Vec<QuoteRecord>,
    },
}

/// 单条新闻，字段缺失或为 null 都接受
///
/// 新闻接口的文章用 `description`，其他数据源用 `summary`。缺失的字段变成空串，
/// 由 `filter_news` 丢弃该条，而不是让整个响应失败。
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNewsItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "description")]
    summary: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<RawNewsSource>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNewsSource {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NewsPayload {
    Items(Vec<RawNewsItem>),
    Articles { articles: Vec<RawNewsItem> },
}

impl From<RawNewsItem> for NewsItem {
    fn from(raw: RawNewsItem) -> Self {
        NewsItem {
            title: raw.title.unwrap_or_default(),
            summary: raw.summary.unwrap_or_default(),
            url: raw.url.unwrap_or_else(|| "#".to_string()),
            published_at: raw.published_at.unwrap_or_default(),
            source: raw.source.and_then(|s| match s {
                RawNewsSource::Name(name) => Some(name),
                RawNewsSource::Object { name } => name,
            }),
        }
    }
}

fn shape_error(what: &str, e: serde_json::Error) -> FetchError {
    FetchError::ShapeValidation(format!("{}: {}", what, e))
}

fn require_text(value: &str, field: &str, context: &str) -> Result<(), FetchError> {
    if value.trim().is_empty() {
        return Err(FetchError::ShapeValidation(format!(
            "{}: field `{}` is empty",
            context, field
        )));
    }
    Ok(())
}

pub fn validate_quote(quote: &QuoteRecord) -> Result<(), FetchError> {
    require_text(&quote.symbol, "symbol", "quote")?;
    require_text(&quote.name, "name", &quote.symbol)
}

pub fn validate_index(index: &IndexRecord) -> Result<(), FetchError> {
    require_text(&index.name, "name", "index")
}

/// 单只股票：对象，或取数组中代码匹配的一项（没有匹配时取第一项）
pub fn decode_quote(value: Value, symbol: &str) -> Result<QuoteRecord, FetchError> {
    let payload: QuotePayload =
        serde_json::from_value(value).map_err(|e| shape_error("quote", e))?;

    let quote = match payload {
        QuotePayload::Single(quote) => quote,
        QuotePayload::List(quotes) => {
            let position = quotes
                .iter()
                .position(|q| q.symbol.eq_ignore_ascii_case(symbol))
                .unwrap_or(0);
            quotes
                .into_iter()
                .nth(position)
                .ok_or_else(|| FetchError::ShapeValidation("quote: empty array".to_string()))?
        }
    };

    validate_quote(&quote)?;
    Ok(quote)
}

pub fn decode_quote_list(value: Value) -> Result<Vec<QuoteRecord>, FetchError> {
    let payload: QuoteListPayload =
        serde_json::from_value(value).map_err(|e| shape_error("quote list", e))?;

    let quotes = match payload {
        QuoteListPayload::Bare(quotes) => quotes,
        QuoteListPayload::Wrapped { results } => results,
    };

    for quote in &quotes {
        validate_quote(quote)?;
    }
    Ok(quotes)
}

pub fn decode_snapshot(value: Value) -> Result<MarketSnapshot, FetchError> {
    let snapshot: MarketSnapshot =
        serde_json::from_value(value).map_err(|e| shape_error("market snapshot", e))?;

    for index in &snapshot.indices {
        validate_index(index)?;
    }
    for quote in snapshot.quotes() {
        validate_quote(quote)?;
    }
    Ok(snapshot)
}

/// 解码新闻列表，未过滤
pub fn decode_news(value: Value) -> Result<Vec<NewsItem>, FetchError> {
    let payload: NewsPayload = serde_json::from_value(value).map_err(|e| shape_error("news", e))?;

    let items = match payload {
        NewsPayload::Items(items) => items,
        NewsPayload::Articles { articles } => articles,
    };
    Ok(items.into_iter().map(NewsItem::from).collect())
}

/// 去掉空标题、空摘要和已删除的文章
pub fn filter_news(items: Vec<NewsItem>) -> Vec<NewsItem> {
    items.into_iter().filter(NewsItem::is_displayable).collect()
}
