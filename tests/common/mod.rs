#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use harvest_oms::domain::model::{
    CompanyId, Enrichment, Order, OrderId, OrderItemSimple, OrderSimple, Page,
    PageOrderConditionQuery,
};
use harvest_oms::domain::ports::{
    OrderCompanyFeatureHandler, OrderPermissionsVerifier, OrderPlatformFeatureHandler,
    OrderRichQueryRepository, OrderSectionHandler,
};
use harvest_oms::{InMemoryOrderRepository, OmsError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

pub const COMPANY: CompanyId = 1;

pub fn order(order_id: OrderId, source: &str) -> OrderSimple {
    OrderSimple {
        company_id: COMPANY,
        order_id,
        order_no: format!("SO{:05}", order_id),
        order_source: source.to_string(),
        created_at: Utc.with_ymd_and_hms(2023, 2, 9, 8, 0, 0).unwrap(),
    }
}

pub fn item(order_id: OrderId) -> OrderItemSimple {
    OrderItemSimple {
        item_id: order_id * 100,
        order_id,
        sku_code: format!("SKU-{}", order_id),
        goods_name: "green tea".to_string(),
        quantity: 2,
        unit_price: 1_250,
    }
}

/// `count` orders with one item each, spread over `sources` distinct order sources
pub fn repository_with(count: i64, sources: usize) -> InMemoryOrderRepository {
    (1..=count).fold(InMemoryOrderRepository::new(), |repo, id| {
        let source = format!("PLATFORM-{}", id as usize % sources.max(1));
        repo.with_order(order(id, &source)).with_item(item(id))
    })
}

/// 記錄調用情況的倉儲
pub struct RecordingRepository {
    inner: InMemoryOrderRepository,
    pub page_calls: AtomicUsize,
    pub item_batches: Mutex<Vec<usize>>,
}

impl RecordingRepository {
    pub fn new(inner: InMemoryOrderRepository) -> Self {
        Self {
            inner,
            page_calls: AtomicUsize::new(0),
            item_batches: Mutex::new(Vec::new()),
        }
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn item_batches(&self) -> Vec<usize> {
        self.item_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderRichQueryRepository for RecordingRepository {
    async fn page_query_order_rich(
        &self,
        company_id: CompanyId,
        condition: &PageOrderConditionQuery,
    ) -> Result<Page<OrderSimple>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.page_query_order_rich(company_id, condition).await
    }

    async fn map_items_by_order_ids(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItemSimple>>> {
        self.item_batches.lock().unwrap().push(order_ids.len());
        self.inner.map_items_by_order_ids(company_id, order_ids).await
    }

    async fn list_items_by_order_id(
        &self,
        company_id: CompanyId,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemSimple>> {
        self.inner.list_items_by_order_id(company_id, order_id).await
    }

    async fn get_order(&self, company_id: CompanyId, order_id: OrderId) -> Result<Option<OrderSimple>> {
        self.inner.get_order(company_id, order_id).await
    }
}

/// Shared observation point for tracked handlers.
#[derive(Default)]
pub struct Tracker {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl Tracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    /// 只回傳不存在的訂單
    Foreign,
}

/// 可配置的可觀測的處理器，同時實現領域填充與平台特性接口
pub struct TrackedHandler {
    name: String,
    tracker: Arc<Tracker>,
    barrier: Option<Arc<Barrier>>,
    delay: Duration,
    behavior: Behavior,
    /// section keys visible on the first order when the handler ran
    pub seen_sections: Mutex<Vec<String>>,
}

impl TrackedHandler {
    pub fn new(name: &str, tracker: &Arc<Tracker>) -> Self {
        Self {
            name: name.to_string(),
            tracker: Arc::clone(tracker),
            barrier: None,
            delay: Duration::from_millis(10),
            behavior: Behavior::Succeed,
            seen_sections: Mutex::new(Vec::new()),
        }
    }

    pub fn with_barrier(mut self, barrier: &Arc<Barrier>) -> Self {
        self.barrier = Some(Arc::clone(barrier));
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn run(&self, orders: &[Order]) -> Result<Enrichment> {
        let now = self.tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.tracker.calls.lock().unwrap().push(self.name.clone());
        if let Some(first) = orders.first() {
            *self.seen_sections.lock().unwrap() = first.sections.keys().cloned().collect();
        }

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        tokio::time::sleep(self.delay).await;
        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Succeed => {
                let mut enrichment = Enrichment::new(&self.name);
                for order in orders {
                    enrichment.insert(order.order_id, serde_json::json!({ "by": self.name }));
                }
                Ok(enrichment)
            }
            Behavior::Fail => Err(OmsError::handler(&self.name, "upstream unavailable")),
            Behavior::Panic => panic!("{} exploded", self.name),
            Behavior::Foreign => Ok(Enrichment::new(&self.name).with(999_999, serde_json::json!(true))),
        }
    }
}

#[async_trait]
impl OrderSectionHandler for TrackedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_fill(&self, _company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        self.run(orders).await
    }
}

#[async_trait]
impl OrderPlatformFeatureHandler for TrackedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_feature_fill(&self, _company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        self.run(orders).await
    }
}

pub struct CountingCompanyHandler {
    name: String,
    matching: bool,
    pub invocations: AtomicUsize,
    fail: bool,
}

impl CountingCompanyHandler {
    pub fn new(name: &str, matching: bool) -> Self {
        Self {
            name: name.to_string(),
            matching,
            invocations: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, true)
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderCompanyFeatureHandler for CountingCompanyHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, _company_id: CompanyId) -> bool {
        self.matching
    }

    async fn batch_feature_fill(&self, _company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OmsError::handler(&self.name, "company rule broken"));
        }
        let mut enrichment = Enrichment::new(&self.name);
        for order in orders {
            enrichment.insert(order.order_id, serde_json::json!(true));
        }
        Ok(enrichment)
    }
}

pub struct DenyAllVerifier;

#[async_trait]
impl OrderPermissionsVerifier for DenyAllVerifier {
    fn name(&self) -> &str {
        "deny_all"
    }

    async fn check(&self, company_id: CompanyId, _condition: &PageOrderConditionQuery) -> Result<()> {
        Err(OmsError::PermissionDenied {
            verifier: self.name().to_string(),
            reason: format!("company {} is suspended", company_id),
        })
    }
}

pub struct CountingVerifier {
    pub checks: AtomicUsize,
}

impl CountingVerifier {
    pub fn new() -> Self {
        Self {
            checks: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OrderPermissionsVerifier for CountingVerifier {
    fn name(&self) -> &str {
        "counting"
    }

    async fn check(&self, _company_id: CompanyId, _condition: &PageOrderConditionQuery) -> Result<()> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 收集日誌輸出，用於斷言告警內容
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
