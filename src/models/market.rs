use serde::{Deserialize, Serialize};

/// 单只股票的最新行情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    /// 自由格式的市值描述，例如 "₹14.2L Cr"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<String>,
    /// ISO-8601 时间戳
    pub last_updated: String,
}

/// 指数行情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub name: String,
    pub value: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// 某一时点的市场概览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub indices: Vec<IndexRecord>,
    pub top_gainers: Vec<QuoteRecord>,
    pub top_losers: Vec<QuoteRecord>,
    pub most_active: Vec<QuoteRecord>,
}

impl MarketSnapshot {
    /// Iterate over every quote in the three mover lists.
    pub fn quotes(&self) -> impl Iterator<Item = &QuoteRecord> {
        self.top_gainers
            .iter()
            .chain(self.top_losers.iter())
            .chain(self.most_active.iter())
    }
}
