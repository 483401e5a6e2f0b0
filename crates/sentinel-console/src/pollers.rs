//! Concrete pollers for the console views

use crate::aggregator;
use crate::api::SoarApi;
use crate::error::ConsoleResult;
use crate::models::{OverviewMetrics, Packet, SystemHealth};
use crate::poller::{PollSource, Poller};
use async_trait::async_trait;
use std::sync::Arc;

/// `/system/health`
pub struct HealthSource {
    api: Arc<dyn SoarApi>,
}

#[async_trait]
impl PollSource for HealthSource {
    type Output = Option<SystemHealth>;

    fn name(&self) -> &'static str {
        "system_health"
    }

    async fn fetch(&self) -> ConsoleResult<Self::Output> {
        self.api.system_health().await.map(Some)
    }
}

/// `/traffic/live`
pub struct LiveTrafficSource {
    api: Arc<dyn SoarApi>,
}

#[async_trait]
impl PollSource for LiveTrafficSource {
    type Output = Vec<Packet>;

    fn name(&self) -> &'static str {
        "live_traffic"
    }

    async fn fetch(&self) -> ConsoleResult<Self::Output> {
        self.api.live_traffic().await
    }
}

/// `/metrics/overview`, derived from the raw feeds when unavailable
pub struct OverviewSource {
    api: Arc<dyn SoarApi>,
}

#[async_trait]
impl PollSource for OverviewSource {
    type Output = OverviewMetrics;

    fn name(&self) -> &'static str {
        "overview_metrics"
    }

    async fn fetch(&self) -> ConsoleResult<Self::Output> {
        aggregator::overview_with_fallback(self.api.as_ref()).await
    }
}

pub fn health_poller(api: Arc<dyn SoarApi>) -> Poller<HealthSource> {
    Poller::new(HealthSource { api }, None)
}

pub fn live_traffic_poller(api: Arc<dyn SoarApi>) -> Poller<LiveTrafficSource> {
    Poller::new(LiveTrafficSource { api }, Vec::new())
}

pub fn overview_poller(api: Arc<dyn SoarApi>) -> Poller<OverviewSource> {
    Poller::new(OverviewSource { api }, OverviewMetrics::default())
}
