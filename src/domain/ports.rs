use crate::domain::model::{
    CompanyId, DeclarationInfo, Enrichment, LogisticsInfo, Order, OrderId, OrderItemSimple,
    OrderSimple, Page, PageOrderConditionQuery,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub trait ConfigProvider: Send + Sync {
    fn item_batch_size(&self) -> usize;
    fn section_concurrency_threshold(&self) -> usize;
    fn platform_concurrency_threshold(&self) -> usize;
    fn slow_query_threshold(&self) -> Duration;
    fn worker_pool_size(&self) -> usize;
    fn main_company_ids(&self) -> HashSet<CompanyId>;
}

/// 訂單豐富查詢倉儲
#[async_trait]
pub trait OrderRichQueryRepository: Send + Sync {
    async fn page_query_order_rich(
        &self,
        company_id: CompanyId,
        condition: &PageOrderConditionQuery,
    ) -> Result<Page<OrderSimple>>;

    async fn map_items_by_order_ids(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItemSimple>>>;

    async fn list_items_by_order_id(
        &self,
        company_id: CompanyId,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemSimple>>;

    async fn get_order(&self, company_id: CompanyId, order_id: OrderId) -> Result<Option<OrderSimple>>;
}

/// 權限校驗器，校驗失敗返回 `PermissionDenied`
#[async_trait]
pub trait OrderPermissionsVerifier: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, company_id: CompanyId, condition: &PageOrderConditionQuery) -> Result<()>;
}

/// 訂單領域模型部分資訊填充器
///
/// 每個處理器只負責一類互不重疊的資訊，產出的 [`Enrichment`] 由調用方按訂單ID合併。
#[async_trait]
pub trait OrderSectionHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn batch_fill(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment>;

    async fn fill(&self, company_id: CompanyId, order: &Order) -> Result<Enrichment> {
        self.batch_fill(company_id, std::slice::from_ref(order)).await
    }
}

/// 平台訂單特性處理
#[async_trait]
pub trait OrderPlatformFeatureHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn batch_feature_fill(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment>;
}

/// 公司訂單特性處理，僅對匹配的公司生效
#[async_trait]
pub trait OrderCompanyFeatureHandler: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, company_id: CompanyId) -> bool;

    async fn batch_feature_fill(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment>;
}

#[async_trait]
pub trait LogisticsQuery: Send + Sync {
    async fn map_logistics_by_order_ids(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, LogisticsInfo>>;
}

#[async_trait]
pub trait DeclarationQuery: Send + Sync {
    async fn map_declarations_by_order_ids(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, DeclarationInfo>>;
}
