use std::collections::HashMap;

/// 参考股票信息，用于本地合成行情和本地搜索
#[derive(Debug, Clone, PartialEq)]
pub struct ListedStock {
    pub symbol: String,
    pub name: String,
    /// 合成价格围绕的基准价
    pub base_price: f64,
    pub market_cap: String,
}

// (代码, 名称, 基准价, 市值)
const NSE_LARGE_CAPS: &[(&str, &str, f64, &str)] = &[
    ("RELIANCE", "Reliance Industries", 2950.0, "₹19.9L Cr"),
    ("TCS", "Tata Consultancy Services", 3890.0, "₹14.1L Cr"),
    ("HDFCBANK", "HDFC Bank", 1450.0, "₹11.0L Cr"),
    ("INFY", "Infosys", 1650.0, "₹6.8L Cr"),
    ("ICICIBANK", "ICICI Bank", 1080.0, "₹7.6L Cr"),
    ("HINDUNILVR", "Hindustan Unilever", 2400.0, "₹5.6L Cr"),
    ("ITC", "ITC", 440.0, "₹5.5L Cr"),
    ("SBIN", "State Bank of India", 760.0, "₹6.8L Cr"),
    ("BHARTIARTL", "Bharti Airtel", 1210.0, "₹7.2L Cr"),
    ("LT", "Larsen & Toubro", 3600.0, "₹4.9L Cr"),
    ("WIPRO", "Wipro", 480.0, "₹2.5L Cr"),
    ("TATAMOTORS", "Tata Motors", 980.0, "₹3.6L Cr"),
    ("MARUTI", "Maruti Suzuki India", 12100.0, "₹3.8L Cr"),
    ("ASIANPAINT", "Asian Paints", 2850.0, "₹2.7L Cr"),
    ("SUNPHARMA", "Sun Pharmaceutical Industries", 1540.0, "₹3.7L Cr"),
    ("ADANIENT", "Adani Enterprises", 3150.0, "₹3.6L Cr"),
];

/// 参考股票目录
pub struct ReferenceCatalog {
    data: Vec<ListedStock>,
    // 索引用于快速查找
    symbol_index: HashMap<String, usize>,
}

impl ReferenceCatalog {
    /// 使用内置的大盘股列表创建目录
    pub fn new() -> Self {
        let data = NSE_LARGE_CAPS
            .iter()
            .map(|&(symbol, name, base_price, market_cap)| ListedStock {
                symbol: symbol.to_string(),
                name: name.to_string(),
                base_price,
                market_cap: market_cap.to_string(),
            })
            .collect();

        Self::new_with_data(data)
    }

    /// 使用提供的数据创建目录
    pub fn new_with_data(data: Vec<ListedStock>) -> Self {
        let mut catalog = Self {
            data,
            symbol_index: HashMap::new(),
        };

        catalog.rebuild_indices();
        catalog
    }

    pub fn get_all_stocks(&self) -> &[ListedStock] {
        &self.data
    }

    /// 按代码查找，不区分大小写
    pub fn get_stock_by_symbol(&self, symbol: &str) -> Option<&ListedStock> {
        self.symbol_index
            .get(&symbol.trim().to_uppercase())
            .map(|&idx| &self.data[idx])
    }

    /// 按代码或名称子串搜索，代码完全匹配的排在最前
    pub fn search(&self, query: &str, limit: usize) -> Vec<&ListedStock> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<&ListedStock> = self
            .data
            .iter()
            .filter(|s| {
                s.symbol.to_lowercase().contains(&needle) || s.name.to_lowercase().contains(&needle)
            })
            .collect();

        matches.sort_by_key(|s| s.symbol.to_lowercase() != needle);
        matches.truncate(limit);
        matches
    }

    /// 未知代码的基准价由代码本身推出，同一代码每次相同
    pub fn base_price_for(&self, symbol: &str) -> f64 {
        if let Some(stock) = self.get_stock_by_symbol(symbol) {
            return stock.base_price;
        }

        let hash = symbol
            .trim()
            .to_uppercase()
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        100.0 + (hash % 4900) as f64
    }

    /// 重建索引
    fn rebuild_indices(&mut self) {
        self.symbol_index.clear();

        for (i, stock) in self.data.iter().enumerate() {
            self.symbol_index.insert(stock.symbol.to_uppercase(), i);
        }
    }
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self::new()
    }
}
