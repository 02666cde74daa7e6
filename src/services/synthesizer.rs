//! 本地合成数据
//!
//! 所有数据源失败时使用。结构与真实数据一致，数值随机但落在合理区间内。
//! 函数都是纯函数，随机数生成器由调用方传入，不会失败。

use crate::data_provider::ReferenceCatalog;
use crate::models::market::{IndexRecord, MarketSnapshot, QuoteRecord};
use crate::models::news::NewsItem;
use crate::util::{self, round2};
use chrono::{Duration, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

const MOVERS_PER_LIST: usize = 5;
const SEARCH_LIMIT: usize = 10;
const PLACEHOLDER_URL: &str = "#";
const UNKNOWN_SYMBOL: &str = "UNKNOWN";

// (指数名称, 基准点位)
const INDICES: &[(&str, f64)] = &[
    ("NIFTY 50", 22000.0),
    ("SENSEX", 72500.0),
    ("NIFTY BANK", 47000.0),
    ("NIFTY IT", 36000.0),
];

const HEADLINES: &[(&str, &str)] = &[
    (
        "{topic} in focus as markets open steady",
        "Traders tracked {topic} closely in early deals while benchmark indices held near record levels.",
    ),
    (
        "Analysts weigh outlook for {topic} ahead of quarterly results",
        "Brokerages expect margins to stabilise, though guidance will drive the next leg of the move.",
    ),
    (
        "FII flows turn positive, lifting sentiment around {topic}",
        "Foreign investors were net buyers for the third straight session, supporting large caps.",
    ),
    (
        "SEBI reminds retail investors to verify advisers before acting on tips about {topic}",
        "The regulator urged investors to check registration details and avoid unsolicited recommendations.",
    ),
    (
        "{topic}: what the latest RBI policy means for your portfolio",
        "Rate-sensitive sectors reacted as the central bank kept its stance unchanged.",
    ),
];

/// 行情方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Any,
}

impl Direction {
    // 相对基准价的涨跌幅区间（百分比），`half_width` 为单边最大幅度
    fn pct_range(self, half_width: f64) -> (f64, f64) {
        let floor = (half_width / 2.0).min(0.1);
        match self {
            Direction::Up => (floor, half_width),
            Direction::Down => (-half_width, -floor),
            Direction::Any => (-half_width, half_width),
        }
    }
}

/// 非法的上限按 5% 处理
fn drift_bound(max_drift_pct: f64) -> f64 {
    if max_drift_pct.is_finite() && max_drift_pct > 0.0 {
        max_drift_pct
    } else {
        5.0
    }
}

/// 新合成数值相对基准价的最大偏离（百分比）
///
/// 所有合成值落在 base·(1 ± h) 之内，任意两次之间的相对变化为 2h/(1-h)，
/// 取 h = d/(2+d) 即不超过 d。再留 2% 余量给两位小数的舍入。
fn fresh_half_width(max_drift_pct: f64) -> f64 {
    let d = drift_bound(max_drift_pct) / 100.0;
    d / (2.0 + d) * 0.98 * 100.0
}

/// 涨跌幅保留两位小数，且与涨跌额同号
fn percent_of(change: f64, reference: f64) -> f64 {
    if reference <= 0.0 || change == 0.0 {
        return 0.0;
    }
    let pct = round2(change / reference * 100.0);
    if pct == 0.0 {
        0.01_f64.copysign(change)
    } else {
        pct
    }
}

/// 单只股票的合成行情
pub fn synthesize_quote<R: Rng + ?Sized>(
    catalog: &ReferenceCatalog,
    symbol: &str,
    direction: Direction,
    max_drift_pct: f64,
    rng: &mut R,
) -> QuoteRecord {
    let symbol = match symbol.trim().to_uppercase() {
        s if s.is_empty() => UNKNOWN_SYMBOL.to_string(),
        s => s,
    };
    let listed = catalog.get_stock_by_symbol(&symbol);
    let base = catalog.base_price_for(&symbol);

    let (lo, hi) = direction.pct_range(fresh_half_width(max_drift_pct));
    let pct = rng.gen_range(lo..hi);
    let price = round2(base * (1.0 + pct / 100.0));
    let mut change = round2(price - base);
    if change == 0.0 && direction != Direction::Any {
        change = if direction == Direction::Up { 0.01 } else { -0.01 };
    }

    QuoteRecord {
        name: listed.map(|s| s.name.clone()).unwrap_or_else(|| symbol.clone()),
        market_cap: listed.map(|s| s.market_cap.clone()),
        symbol,
        price,
        change,
        change_percent: percent_of(change, base),
        volume: rng.gen_range(1_000_000..25_000_000),
        last_updated: util::now_iso(),
    }
}

fn synthesize_index<R: Rng + ?Sized>(name: &str, base: f64, max_drift_pct: f64, rng: &mut R) -> IndexRecord {
    let half_width = fresh_half_width(max_drift_pct).min(1.5);
    let value = round2(base * (1.0 + rng.gen_range(-half_width..half_width) / 100.0));
    let change = round2(value - base);
    IndexRecord {
        name: name.to_string(),
        value,
        change,
        change_percent: percent_of(change, base),
    }
}

/// 合成市场概览
pub fn synthesize_snapshot<R: Rng + ?Sized>(
    catalog: &ReferenceCatalog,
    max_drift_pct: f64,
    rng: &mut R,
) -> MarketSnapshot {
    let indices = INDICES
        .iter()
        .map(|&(name, base)| synthesize_index(name, base, max_drift_pct, rng))
        .collect();

    let mut symbols: Vec<&str> = catalog
        .get_all_stocks()
        .iter()
        .map(|s| s.symbol.as_str())
        .collect();
    symbols.shuffle(rng);

    // 涨幅榜和跌幅榜不重复
    let gainers: Vec<&str> = symbols.iter().take(MOVERS_PER_LIST).copied().collect();
    let losers: Vec<&str> = symbols
        .iter()
        .skip(MOVERS_PER_LIST)
        .take(MOVERS_PER_LIST)
        .copied()
        .collect();
    let active: Vec<&str> = symbols
        .choose_multiple(rng, MOVERS_PER_LIST)
        .copied()
        .collect();

    let mut top_gainers: Vec<QuoteRecord> = gainers
        .iter()
        .map(|s| synthesize_quote(catalog, s, Direction::Up, max_drift_pct, rng))
        .collect();
    top_gainers.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));

    let mut top_losers: Vec<QuoteRecord> = losers
        .iter()
        .map(|s| synthesize_quote(catalog, s, Direction::Down, max_drift_pct, rng))
        .collect();
    top_losers.sort_by(|a, b| a.change_percent.total_cmp(&b.change_percent));

    let mut most_active: Vec<QuoteRecord> = active
        .iter()
        .map(|s| {
            let mut quote = synthesize_quote(catalog, s, Direction::Any, max_drift_pct, rng);
            quote.volume = rng.gen_range(20_000_000..80_000_000);
            quote
        })
        .collect();
    most_active.sort_by(|a, b| b.volume.cmp(&a.volume));

    MarketSnapshot {
        indices,
        top_gainers,
        top_losers,
        most_active,
    }
}

/// 合成搜索结果：目录命中时返回命中的股票，否则按查询词合成一只
pub fn synthesize_search<R: Rng + ?Sized>(
    catalog: &ReferenceCatalog,
    query: &str,
    max_drift_pct: f64,
    rng: &mut R,
) -> Vec<QuoteRecord> {
    let query = query.trim();
    if query.is_empty() {
        return catalog
            .get_all_stocks()
            .iter()
            .take(MOVERS_PER_LIST)
            .map(|s| synthesize_quote(catalog, &s.symbol, Direction::Any, max_drift_pct, rng))
            .collect();
    }

    let hits: Vec<String> = catalog
        .search(query, SEARCH_LIMIT)
        .into_iter()
        .map(|s| s.symbol.clone())
        .collect();

    if hits.is_empty() {
        return vec![synthesize_quote(catalog, query, Direction::Any, max_drift_pct, rng)];
    }

    hits.iter()
        .map(|s| synthesize_quote(catalog, s, Direction::Any, max_drift_pct, rng))
        .collect()
}

/// 合成新闻条目
pub fn synthesize_news<R: Rng + ?Sized>(topic: Option<&str>, count: usize, rng: &mut R) -> Vec<NewsItem> {
    let topic = topic
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Indian equities");

    let mut templates: Vec<&(&str, &str)> = HEADLINES.iter().collect();
    templates.shuffle(rng);

    let now = Utc::now();
    (0..count)
        .map(|i| {
            let (title, summary) = templates[i % templates.len()];
            let minutes_ago = (i as i64) * 35 + rng.gen_range(0..20);
            NewsItem {
                title: title.replace("{topic}", topic),
                summary: summary.replace("{topic}", topic),
                url: PLACEHOLDER_URL.to_string(),
                published_at: (now - Duration::minutes(minutes_ago))
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                source: Some("MarketPulse Desk".to_string()),
            }
        })
        .collect()
}

/// 在上一次数值基础上随机游走一步
///
/// 每一步都不为零，且相对上一次数值的变化不超过 `max_drift_pct`%。
/// 非正的数值没有相对幅度可言，原样返回。
pub fn tick_value<R: Rng + ?Sized>(prev: f64, max_drift_pct: f64, rng: &mut R) -> f64 {
    if !(prev > 0.0) {
        return prev;
    }
    let bound = drift_bound(max_drift_pct);

    let mut step = rng.gen_range(-1.0..=1.0) * bound.min(1.0);
    let min_step = (bound / 100.0).min(0.01);
    if step.abs() < min_step {
        step = min_step.copysign(if step == 0.0 { 1.0 } else { step });
    }
    let step = step.clamp(-bound, bound);

    let raw = prev * (1.0 + step / 100.0);
    let rounded = round2(raw);
    let within = ((rounded - prev) / prev).abs() <= bound / 100.0;
    if rounded != prev && within {
        rounded
    } else {
        raw
    }
}

pub fn tick_quote<R: Rng + ?Sized>(prev: &QuoteRecord, max_drift_pct: f64, rng: &mut R) -> QuoteRecord {
    let prev_close = prev.price - prev.change;
    let price = tick_value(prev.price, max_drift_pct, rng);
    let change = round2(price - prev_close);

    QuoteRecord {
        price,
        change,
        change_percent: percent_of(change, prev_close),
        volume: prev.volume.saturating_add(rng.gen_range(0..50_000)),
        last_updated: util::now_iso(),
        ..prev.clone()
    }
}

pub fn tick_index<R: Rng + ?Sized>(prev: &IndexRecord, max_drift_pct: f64, rng: &mut R) -> IndexRecord {
    let prev_close = prev.value - prev.change;
    let value = tick_value(prev.value, max_drift_pct, rng);
    let change = round2(value - prev_close);

    IndexRecord {
        value,
        change,
        change_percent: percent_of(change, prev_close),
        ..prev.clone()
    }
}

/// 整体推进一个市场概览
pub fn tick_snapshot<R: Rng + ?Sized>(prev: &MarketSnapshot, max_drift_pct: f64, rng: &mut R) -> MarketSnapshot {
    MarketSnapshot {
        indices: prev.indices.iter().map(|i| tick_index(i, max_drift_pct, rng)).collect(),
        top_gainers: prev.top_gainers.iter().map(|q| tick_quote(q, max_drift_pct, rng)).collect(),
        top_losers: prev.top_losers.iter().map(|q| tick_quote(q, max_drift_pct, rng)).collect(),
        most_active: prev.most_active.iter().map(|q| tick_quote(q, max_drift_pct, rng)).collect(),
    }
}
