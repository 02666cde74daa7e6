use crate::models::fetch::{FetchResult, Provenance};
use crate::models::market::MarketSnapshot;
use crate::services::fetch_service::FetchService;
use crate::services::synthesizer;
use log::{debug, info};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub type SnapshotReceiver = watch::Receiver<Option<FetchResult<MarketSnapshot>>>;

/// 行情轮询控制器
///
/// 持有定时刷新的全部状态，`start()` 启动后台任务，`stop()` 或析构时停止。
/// 最新结果通过 watch 通道发布，后写入的覆盖先写入的。
pub struct TickerController {
    service: Arc<FetchService>,
    interval: Duration,
    max_drift_pct: f64,
    sender: Arc<watch::Sender<Option<FetchResult<MarketSnapshot>>>>,
    handle: Option<JoinHandle<()>>,
}

impl TickerController {
    pub fn new(service: Arc<FetchService>, interval: Duration) -> Self {
        let max_drift_pct = service.config().max_drift_pct;
        let (sender, _) = watch::channel(None);
        Self {
            service,
            interval: interval.max(Duration::from_millis(1)),
            max_drift_pct,
            sender: Arc::new(sender),
            handle: None,
        }
    }

    /// 使用配置中的轮询间隔
    pub fn with_config_interval(service: Arc<FetchService>) -> Self {
        let interval = service.config().poll_interval;
        Self::new(service, interval)
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.sender.subscribe()
    }

    /// 当前显示的概览
    pub fn latest(&self) -> Option<FetchResult<MarketSnapshot>> {
        self.sender.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 启动轮询，立即获取一次，之后每个间隔获取一次。已在运行时不做任何事。
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Ticker already running");
            return;
        }

        let service = self.service.clone();
        let sender = self.sender.clone();
        let interval = self.interval;
        let max_drift_pct = self.max_drift_pct;

        info!("Starting market ticker every {:?}", interval);
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let fetched = service.fetch_market_snapshot().await;
                let previous = sender.borrow().clone();
                let next = Self::next_display(previous.as_ref(), fetched, max_drift_pct, &mut rand::thread_rng());
                debug!("Ticker published {} snapshot", next.provenance);
                sender.send_replace(Some(next));
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Market ticker stopped");
        }
    }

    /// 决定下一次显示的内容
    ///
    /// 本次是合成数据且已有显示内容时，在原有内容上推进一步，避免演示数据跳变。
    pub fn next_display<R: Rng + ?Sized>(
        previous: Option<&FetchResult<MarketSnapshot>>,
        fetched: FetchResult<MarketSnapshot>,
        max_drift_pct: f64,
        rng: &mut R,
    ) -> FetchResult<MarketSnapshot> {
        match previous {
            Some(prev) if fetched.provenance == Provenance::Mock => FetchResult::mock(
                synthesizer::tick_snapshot(&prev.data, max_drift_pct, rng),
            ),
            _ => fetched,
        }
    }
}

impl Drop for TickerController {
    fn drop(&mut self) {
        self.stop();
    }
}
