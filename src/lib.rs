// 公开导出的模块，供外部使用
pub mod models;
pub mod errors;
pub mod config;
pub mod services;
pub mod sources;

// 内部使用，为了测试和命令行工具保持公开
#[doc(hidden)]
pub mod data_provider;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use errors::{FetchError, MarketPulseError, Result};
pub use models::fetch::{FetchResult, Provenance};
pub use models::market::{IndexRecord, MarketSnapshot, QuoteRecord};
pub use models::news::NewsItem;
pub use services::fetch_service::FetchService;
pub use services::ticker::TickerController;
