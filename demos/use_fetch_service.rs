use marketpulse::{Config, FetchService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 从环境变量读取数据源配置，没有配置时全部使用本地合成数据
    let service = FetchService::from_config(Config::from_env()?)?;

    let overview = service.fetch_market_snapshot().await;
    println!("市场概览 [{}]", overview.provenance.badge());
    for index in &overview.data.indices {
        println!("{:<12} {:>10.2} {:>+8.2} ({:+.2}%)", index.name, index.value, index.change, index.change_percent);
    }

    println!("\n涨幅榜:");
    for quote in &overview.data.top_gainers {
        println!("{:<12} {:>10.2} {:>+8.2}%", quote.symbol, quote.price, quote.change_percent);
    }

    let quote = service.fetch_quote("TCS").await;
    println!("\n{} ({}) {:.2} [{}]", quote.data.name, quote.data.symbol, quote.data.price, quote.provenance);

    let news = service.fetch_news(Some("TCS")).await;
    println!("\n新闻 [{}]:", news.provenance.badge());
    for item in news.data.iter().take(5) {
        println!("- {} ({})", item.title, item.published_at);
    }

    Ok(())
}
