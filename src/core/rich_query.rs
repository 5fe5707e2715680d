use crate::config::RichQueryConfig;
use crate::core::execution::{
    choose_execution_mode, merge_enrichment, run_enrichment_stage, Enricher, EnrichmentTarget,
    ExecutionMode, PlatformFeatureEnricher, SectionEnricher,
};
use crate::core::partition::partition_map_execute;
use crate::core::worker_pool::WorkerPool;
use crate::domain::model::{CompanyId, Order, OrderId, OrderItem, Page, PageOrderConditionQuery};
use crate::domain::ports::{
    ConfigProvider, OrderCompanyFeatureHandler, OrderPermissionsVerifier,
    OrderPlatformFeatureHandler, OrderRichQueryRepository, OrderSectionHandler,
};
use crate::utils::error::{OmsError, Result};
use crate::utils::monitor::StopWatch;
use std::collections::HashSet;
use std::sync::Arc;

const STAGE_VERIFICATION: &str = "permission verification";
const STAGE_ORDER_QUERY: &str = "order query";
const STAGE_CONVERSION: &str = "model conversion";
const STAGE_ITEM_FILL: &str = "order item fill";
const STAGE_SECTION_FILL: &str = "section fill";
const STAGE_PLATFORM_FEATURE: &str = "platform feature";
const STAGE_COMPANY_FEATURE: &str = "company feature";

/// 訂單豐富查詢服務
///
/// 查詢一頁訂單基礎資訊後，依次填充訂單明細、各領域資訊、平台特性與公司特性。
/// 階段之間嚴格順序執行，只有同一階段內的處理器可能並發。
pub struct OrderRichQueryService {
    repository: Arc<dyn OrderRichQueryRepository>,
    verifiers: Vec<Arc<dyn OrderPermissionsVerifier>>,
    section_handlers: Vec<Arc<dyn OrderSectionHandler>>,
    platform_handlers: Vec<Arc<dyn OrderPlatformFeatureHandler>>,
    company_handlers: Vec<Arc<dyn OrderCompanyFeatureHandler>>,
    pool: Arc<WorkerPool>,
    config: RichQueryConfig,
}

pub struct OrderRichQueryBuilder {
    repository: Arc<dyn OrderRichQueryRepository>,
    verifiers: Vec<Arc<dyn OrderPermissionsVerifier>>,
    section_handlers: Vec<Arc<dyn OrderSectionHandler>>,
    platform_handlers: Vec<Arc<dyn OrderPlatformFeatureHandler>>,
    company_handlers: Vec<Arc<dyn OrderCompanyFeatureHandler>>,
    pool: Option<Arc<WorkerPool>>,
    config: RichQueryConfig,
}

impl OrderRichQueryBuilder {
    pub fn config(mut self, provider: &dyn ConfigProvider) -> Self {
        self.config = RichQueryConfig::from_provider(provider);
        self
    }

    pub fn worker_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn verifier(mut self, verifier: Arc<dyn OrderPermissionsVerifier>) -> Self {
        self.verifiers.push(verifier);
        self
    }

    pub fn section_handler(mut self, handler: Arc<dyn OrderSectionHandler>) -> Self {
        self.section_handlers.push(handler);
        self
    }

    pub fn platform_feature_handler(mut self, handler: Arc<dyn OrderPlatformFeatureHandler>) -> Self {
        self.platform_handlers.push(handler);
        self
    }

    pub fn company_feature_handler(mut self, handler: Arc<dyn OrderCompanyFeatureHandler>) -> Self {
        self.company_handlers.push(handler);
        self
    }

    pub fn build(self) -> OrderRichQueryService {
        OrderRichQueryService {
            repository: self.repository,
            verifiers: self.verifiers,
            section_handlers: self.section_handlers,
            platform_handlers: self.platform_handlers,
            company_handlers: self.company_handlers,
            pool: self.pool.unwrap_or_else(WorkerPool::shared),
            config: self.config,
        }
    }
}

impl OrderRichQueryService {
    pub fn builder(repository: Arc<dyn OrderRichQueryRepository>) -> OrderRichQueryBuilder {
        OrderRichQueryBuilder {
            repository,
            verifiers: Vec::new(),
            section_handlers: Vec::new(),
            platform_handlers: Vec::new(),
            company_handlers: Vec::new(),
            pool: None,
            config: RichQueryConfig::default(),
        }
    }

    pub fn config(&self) -> &RichQueryConfig {
        &self.config
    }

    pub fn worker_pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub async fn page_query_order_rich(
        &self,
        company_id: CompanyId,
        condition: &PageOrderConditionQuery,
    ) -> Result<Page<Order>> {
        let mut watch = StopWatch::new("OrderRichQuery");

        watch.start(STAGE_VERIFICATION);
        self.verification(company_id, condition).await?;

        watch.start(STAGE_ORDER_QUERY);
        let simple_page = self
            .repository
            .page_query_order_rich(company_id, condition)
            .await?;

        watch.start(STAGE_CONVERSION);
        let mut page = simple_page.map(Order::from);

        watch.start(STAGE_ITEM_FILL);
        self.order_item_batch_fill(company_id, &mut page.data).await?;

        watch.start(STAGE_SECTION_FILL);
        self.section_batch_fill(company_id, &mut page.data).await?;

        watch.start(STAGE_PLATFORM_FEATURE);
        self.platform_feature_batch_handler(company_id, &mut page.data)
            .await?;

        watch.start(STAGE_COMPANY_FEATURE);
        self.company_feature_batch_handler(company_id, &mut page.data)
            .await?;
        watch.stop();

        tracing::debug!(
            company_id,
            orders = page.data.len(),
            total = page.count,
            elapsed_ms = watch.total_time_millis() as u64,
            "rich order page query finished"
        );
        self.warn_if_slow(company_id, condition, &watch);

        Ok(page)
    }

    /// 單筆訂單豐富查詢
    pub async fn get_order_rich(&self, company_id: CompanyId, order_id: OrderId) -> Result<Order> {
        let mut condition = PageOrderConditionQuery::page(1, 1);
        condition.order_ids = vec![order_id];
        self.verification(company_id, &condition).await?;

        let simple = self
            .repository
            .get_order(company_id, order_id)
            .await?
            .ok_or(OmsError::OrderNotFound { order_id })?;
        let mut orders = vec![Order::from(simple)];

        self.order_item_batch_fill(company_id, &mut orders).await?;

        for handler in &self.section_handlers {
            let enrichment = handler.fill(company_id, &orders[0]).await?;
            merge_enrichment(&mut orders, EnrichmentTarget::Section, enrichment);
        }

        run_enrichment_stage(
            &self.pool,
            STAGE_PLATFORM_FEATURE,
            ExecutionMode::Sequential,
            company_id,
            &mut orders,
            &self.platform_enrichers(),
        )
        .await?;

        self.company_feature_batch_handler(company_id, &mut orders)
            .await?;

        Ok(orders.remove(0))
    }

    /// 查詢單筆訂單的明細，不做額外填充
    pub async fn query_order_items_rich(
        &self,
        company_id: CompanyId,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>> {
        let items = self
            .repository
            .list_items_by_order_id(company_id, order_id)
            .await?;
        Ok(items.into_iter().map(OrderItem::from).collect())
    }

    async fn verification(&self, company_id: CompanyId, condition: &PageOrderConditionQuery) -> Result<()> {
        for verifier in &self.verifiers {
            if let Err(e) = verifier.check(company_id, condition).await {
                tracing::warn!(
                    company_id,
                    verifier = verifier.name(),
                    error = %e,
                    "order query rejected by permission verifier"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// 訂單明細單獨填充，其他領域處理器可能依賴明細資料
    async fn order_item_batch_fill(&self, company_id: CompanyId, orders: &mut [Order]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }

        let order_ids: Vec<OrderId> = orders.iter().map(|o| o.order_id).collect();
        let repository = &self.repository;
        let mut items_by_order = partition_map_execute(
            &order_ids,
            self.config.item_batch_size,
            |batch| async move { repository.map_items_by_order_ids(company_id, &batch).await },
        )
        .await?;

        for order in orders.iter_mut() {
            order.items = items_by_order
                .remove(&order.order_id)
                .unwrap_or_default()
                .into_iter()
                .map(OrderItem::from)
                .collect();
        }
        Ok(())
    }

    async fn section_batch_fill(&self, company_id: CompanyId, orders: &mut [Order]) -> Result<()> {
        let mode = choose_execution_mode(orders.len(), self.config.section_concurrency_threshold);
        run_enrichment_stage(
            &self.pool,
            STAGE_SECTION_FILL,
            mode,
            company_id,
            orders,
            &self.section_enrichers(),
        )
        .await
    }

    /// 按本次查詢的平台數量決定是否並發
    async fn platform_feature_batch_handler(
        &self,
        company_id: CompanyId,
        orders: &mut [Order],
    ) -> Result<()> {
        if orders.is_empty() || self.platform_handlers.is_empty() {
            return Ok(());
        }

        let sources = orders
            .iter()
            .map(|o| o.order_source.as_str())
            .collect::<HashSet<_>>()
            .len();
        let mode = choose_execution_mode(sources, self.config.platform_concurrency_threshold);
        run_enrichment_stage(
            &self.pool,
            STAGE_PLATFORM_FEATURE,
            mode,
            company_id,
            orders,
            &self.platform_enrichers(),
        )
        .await
    }

    async fn company_feature_batch_handler(
        &self,
        company_id: CompanyId,
        orders: &mut [Order],
    ) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }

        for handler in &self.company_handlers {
            if !handler.matches(company_id) {
                continue;
            }
            let enrichment = handler.batch_feature_fill(company_id, orders).await?;
            merge_enrichment(orders, EnrichmentTarget::Feature, enrichment);
        }
        Ok(())
    }

    fn section_enrichers(&self) -> Vec<Arc<dyn Enricher>> {
        self.section_handlers
            .iter()
            .map(|h| Arc::new(SectionEnricher(Arc::clone(h))) as Arc<dyn Enricher>)
            .collect()
    }

    fn platform_enrichers(&self) -> Vec<Arc<dyn Enricher>> {
        self.platform_handlers
            .iter()
            .map(|h| Arc::new(PlatformFeatureEnricher(Arc::clone(h))) as Arc<dyn Enricher>)
            .collect()
    }

    fn warn_if_slow(&self, company_id: CompanyId, condition: &PageOrderConditionQuery, watch: &StopWatch) {
        if watch.total_time() <= self.config.slow_query_threshold() {
            return;
        }
        let condition_json = serde_json::to_string(condition).unwrap_or_default();
        tracing::warn!(
            company_id,
            condition = %condition_json,
            elapsed_ms = watch.total_time_millis() as u64,
            "⏱️ OrderService#Rich order query timeout\n{}",
            watch.pretty_print()
        );
    }
}
