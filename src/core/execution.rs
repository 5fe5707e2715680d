use crate::core::worker_pool::WorkerPool;
use crate::domain::model::{CompanyId, Enrichment, Order, OrderId};
use crate::domain::ports::{OrderPlatformFeatureHandler, OrderSectionHandler};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Concurrent,
}

/// 數量達到閾值時並發執行，否則順序執行
pub fn choose_execution_mode(count: usize, threshold: usize) -> ExecutionMode {
    if count >= threshold {
        ExecutionMode::Concurrent
    } else {
        ExecutionMode::Sequential
    }
}

/// Which attribute map of [`Order`] an enrichment lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentTarget {
    Section,
    Feature,
}

/// 統一各類處理器的調用方式，供階段執行器使用
#[async_trait]
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    fn target(&self) -> EnrichmentTarget;

    async fn enrich(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment>;
}

pub struct SectionEnricher(pub Arc<dyn OrderSectionHandler>);

#[async_trait]
impl Enricher for SectionEnricher {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn target(&self) -> EnrichmentTarget {
        EnrichmentTarget::Section
    }

    async fn enrich(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        self.0.batch_fill(company_id, orders).await
    }
}

pub struct PlatformFeatureEnricher(pub Arc<dyn OrderPlatformFeatureHandler>);

#[async_trait]
impl Enricher for PlatformFeatureEnricher {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn target(&self) -> EnrichmentTarget {
        EnrichmentTarget::Feature
    }

    async fn enrich(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        self.0.batch_feature_fill(company_id, orders).await
    }
}

/// 按訂單ID把補充資訊合併回訂單，返回實際合併的條數
///
/// 當前批次之外的訂單ID會被丟棄，處理器不能引入新的訂單。
pub fn merge_enrichment(orders: &mut [Order], target: EnrichmentTarget, enrichment: Enrichment) -> usize {
    let index: HashMap<OrderId, usize> = orders
        .iter()
        .enumerate()
        .map(|(i, order)| (order.order_id, i))
        .collect();

    let mut merged = 0;
    for (order_id, value) in enrichment.values {
        match index.get(&order_id) {
            Some(&i) => {
                let order = &mut orders[i];
                let attributes = match target {
                    EnrichmentTarget::Section => &mut order.sections,
                    EnrichmentTarget::Feature => &mut order.features,
                };
                attributes.insert(enrichment.key.clone(), value);
                merged += 1;
            }
            None => {
                tracing::debug!(
                    key = %enrichment.key,
                    order_id,
                    "dropping enrichment for order outside the current batch"
                );
            }
        }
    }
    merged
}

/// 執行一個填充階段
///
/// 順序模式下按註冊順序逐個執行並立即合併，任一處理器失敗即返回錯誤；
/// 並發模式下每個處理器作為一個任務提交到任務池，全部完成後按註冊順序合併，
/// 失敗的處理器只記錄日誌，不影響其他處理器的結果。
pub async fn run_enrichment_stage(
    pool: &WorkerPool,
    stage: &str,
    mode: ExecutionMode,
    company_id: CompanyId,
    orders: &mut [Order],
    enrichers: &[Arc<dyn Enricher>],
) -> Result<()> {
    if orders.is_empty() || enrichers.is_empty() {
        return Ok(());
    }

    match mode {
        ExecutionMode::Sequential => {
            for enricher in enrichers {
                let enrichment = enricher.enrich(company_id, orders).await?;
                merge_enrichment(orders, enricher.target(), enrichment);
            }
        }
        ExecutionMode::Concurrent => {
            tracing::debug!(
                stage,
                handlers = enrichers.len(),
                orders = orders.len(),
                "running enrichment handlers concurrently"
            );
            let snapshot: Arc<[Order]> = orders.to_vec().into();
            let tasks = enrichers
                .iter()
                .map(|enricher| {
                    let enricher = Arc::clone(enricher);
                    let snapshot = Arc::clone(&snapshot);
                    let name = format!("{}#{}", stage, enricher.name());
                    (name, async move { enricher.enrich(company_id, &snapshot).await })
                })
                .collect();

            let results = pool.execute_all(tasks).await;
            for (enricher, result) in enrichers.iter().zip(results) {
                match result.and_then(|enrichment| enrichment) {
                    Ok(enrichment) => {
                        merge_enrichment(orders, enricher.target(), enrichment);
                    }
                    Err(e) => {
                        tracing::error!(
                            stage,
                            handler = enricher.name(),
                            company_id,
                            error = %e,
                            "concurrent enrichment failed, continuing with partial data"
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::OrderSimple;
    use crate::utils::error::OmsError;
    use chrono::Utc;

    fn orders(ids: &[OrderId]) -> Vec<Order> {
        ids.iter()
            .map(|&order_id| {
                Order::from(OrderSimple {
                    company_id: 1,
                    order_id,
                    order_no: format!("NO{}", order_id),
                    order_source: "TMALL".to_string(),
                    created_at: Utc::now(),
                })
            })
            .collect()
    }

    struct Tagging {
        name: String,
        fail: bool,
    }

    #[async_trait]
    impl Enricher for Tagging {
        fn name(&self) -> &str {
            &self.name
        }

        fn target(&self) -> EnrichmentTarget {
            EnrichmentTarget::Section
        }

        async fn enrich(&self, _company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
            if self.fail {
                return Err(OmsError::handler(&self.name, "forced"));
            }
            let mut enrichment = Enrichment::new(&self.name);
            for order in orders {
                enrichment.insert(order.order_id, serde_json::json!(self.name));
            }
            Ok(enrichment)
        }
    }

    fn tagging(name: &str, fail: bool) -> Arc<dyn Enricher> {
        Arc::new(Tagging {
            name: name.to_string(),
            fail,
        })
    }

    #[test]
    fn test_choose_execution_mode() {
        assert_eq!(choose_execution_mode(199, 200), ExecutionMode::Sequential);
        assert_eq!(choose_execution_mode(200, 200), ExecutionMode::Concurrent);
        assert_eq!(choose_execution_mode(9, 10), ExecutionMode::Sequential);
        assert_eq!(choose_execution_mode(10, 10), ExecutionMode::Concurrent);
        assert_eq!(choose_execution_mode(0, 0), ExecutionMode::Concurrent);
    }

    #[test]
    fn test_merge_drops_unknown_orders() {
        let mut batch = orders(&[1, 2]);
        let enrichment = Enrichment::new("logistics")
            .with(1, serde_json::json!({"carrier": "SF"}))
            .with(99, serde_json::json!({"carrier": "YTO"}));

        let merged = merge_enrichment(&mut batch, EnrichmentTarget::Section, enrichment);

        assert_eq!(merged, 1);
        assert_eq!(batch.len(), 2);
        assert!(batch[0].section("logistics").is_some());
        assert!(batch[1].section("logistics").is_none());
    }

    #[test]
    fn test_merge_feature_target() {
        let mut batch = orders(&[5]);
        merge_enrichment(
            &mut batch,
            EnrichmentTarget::Feature,
            Enrichment::new("platform").with(5, serde_json::json!("JD")),
        );
        assert_eq!(batch[0].feature("platform"), Some(&serde_json::json!("JD")));
        assert!(batch[0].sections.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_stage_propagates_failure() {
        let pool = WorkerPool::new("test", 4);
        let mut batch = orders(&[1, 2]);
        let enrichers = vec![tagging("a", false), tagging("b", true), tagging("c", false)];

        let result = run_enrichment_stage(
            &pool,
            "section",
            ExecutionMode::Sequential,
            1,
            &mut batch,
            &enrichers,
        )
        .await;

        assert!(matches!(result, Err(OmsError::HandlerError { .. })));
        assert!(batch[0].section("a").is_some());
        assert!(batch[0].section("c").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_stage_swallows_failure() {
        let pool = WorkerPool::new("test", 4);
        let mut batch = orders(&[1, 2]);
        let enrichers = vec![tagging("a", false), tagging("b", true), tagging("c", false)];

        run_enrichment_stage(
            &pool,
            "section",
            ExecutionMode::Concurrent,
            1,
            &mut batch,
            &enrichers,
        )
        .await
        .unwrap();

        for order in &batch {
            assert!(order.section("a").is_some());
            assert!(order.section("b").is_none());
            assert!(order.section("c").is_some());
        }
    }

    #[tokio::test]
    async fn test_empty_orders_skip_handlers() {
        let pool = WorkerPool::new("test", 1);
        let mut batch: Vec<Order> = Vec::new();
        let enrichers = vec![tagging("fail", true)];
        let result = run_enrichment_stage(
            &pool,
            "section",
            ExecutionMode::Sequential,
            1,
            &mut batch,
            &enrichers,
        )
        .await;
        assert!(result.is_ok());
    }
}
