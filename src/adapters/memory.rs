use crate::domain::model::{
    CompanyId, DeclarationInfo, LogisticsInfo, OrderId, OrderItemSimple, OrderSimple, Page,
    PageOrderConditionQuery,
};
use crate::domain::ports::{DeclarationQuery, LogisticsQuery, OrderRichQueryRepository};
use crate::utils::error::{OmsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// JSON 訂單資料檔
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderFixture {
    pub orders: Vec<OrderSimple>,
    pub items: Vec<OrderItemSimple>,
    pub logistics: Vec<LogisticsInfo>,
    pub declarations: Vec<DeclarationInfo>,
}

/// 記憶體訂單倉儲，資料只讀
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Vec<OrderSimple>,
    items: HashMap<OrderId, Vec<OrderItemSimple>>,
    logistics: HashMap<OrderId, LogisticsInfo>,
    declarations: HashMap<OrderId, DeclarationInfo>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: OrderFixture) -> Self {
        let mut repository = Self::new();
        repository.orders = fixture.orders;
        repository.orders.sort_by_key(|o| o.order_id);
        repository.orders.dedup_by_key(|o| o.order_id);
        for item in fixture.items {
            repository = repository.with_item(item);
        }
        for logistics in fixture.logistics {
            repository.logistics.insert(logistics.order_id, logistics);
        }
        for declaration in fixture.declarations {
            repository.declarations.insert(declaration.order_id, declaration);
        }
        repository
    }

    pub fn from_fixture_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let fixture: OrderFixture = serde_json::from_str(&content)?;
        tracing::info!(
            path = %path.as_ref().display(),
            orders = fixture.orders.len(),
            items = fixture.items.len(),
            "loaded order fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    pub fn with_order(mut self, order: OrderSimple) -> Self {
        self.orders.retain(|o| o.order_id != order.order_id);
        self.orders.push(order);
        self.orders.sort_by_key(|o| o.order_id);
        self
    }

    pub fn with_item(mut self, item: OrderItemSimple) -> Self {
        self.items.entry(item.order_id).or_default().push(item);
        self
    }

    pub fn with_logistics(mut self, logistics: LogisticsInfo) -> Self {
        self.logistics.insert(logistics.order_id, logistics);
        self
    }

    pub fn with_declaration(mut self, declaration: DeclarationInfo) -> Self {
        self.declarations.insert(declaration.order_id, declaration);
        self
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn owned_by(&self, company_id: CompanyId) -> HashSet<OrderId> {
        self.orders
            .iter()
            .filter(|o| o.company_id == company_id)
            .map(|o| o.order_id)
            .collect()
    }

    fn matches(order: &OrderSimple, company_id: CompanyId, condition: &PageOrderConditionQuery) -> bool {
        order.company_id == company_id
            && (condition.order_ids.is_empty() || condition.order_ids.contains(&order.order_id))
            && (condition.order_nos.is_empty() || condition.order_nos.contains(&order.order_no))
            && (condition.order_sources.is_empty()
                || condition.order_sources.contains(&order.order_source))
            && condition.created_from.map_or(true, |from| order.created_at >= from)
            && condition.created_to.map_or(true, |to| order.created_at < to)
    }
}

#[async_trait]
impl OrderRichQueryRepository for InMemoryOrderRepository {
    async fn page_query_order_rich(
        &self,
        company_id: CompanyId,
        condition: &PageOrderConditionQuery,
    ) -> Result<Page<OrderSimple>> {
        if condition.page_size == 0 {
            return Err(OmsError::repository("page size must be positive"));
        }

        let matched: Vec<&OrderSimple> = self
            .orders
            .iter()
            .filter(|o| Self::matches(o, company_id, condition))
            .collect();
        let count = matched.len() as u64;
        let data = matched
            .into_iter()
            .skip(condition.offset())
            .take(condition.page_size as usize)
            .cloned()
            .collect();

        Ok(Page::new(condition.page_no.max(1), condition.page_size, data, count))
    }

    async fn map_items_by_order_ids(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItemSimple>>> {
        let owned = self.owned_by(company_id);
        Ok(order_ids
            .iter()
            .filter(|id| owned.contains(*id))
            .filter_map(|id| self.items.get(id).map(|items| (*id, items.clone())))
            .collect())
    }

    async fn list_items_by_order_id(
        &self,
        company_id: CompanyId,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemSimple>> {
        if !self.owned_by(company_id).contains(&order_id) {
            return Err(OmsError::OrderNotFound { order_id });
        }
        Ok(self.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn get_order(&self, company_id: CompanyId, order_id: OrderId) -> Result<Option<OrderSimple>> {
        Ok(self
            .orders
            .iter()
            .find(|o| o.company_id == company_id && o.order_id == order_id)
            .cloned())
    }
}

#[async_trait]
impl LogisticsQuery for InMemoryOrderRepository {
    async fn map_logistics_by_order_ids(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, LogisticsInfo>> {
        let owned = self.owned_by(company_id);
        Ok(order_ids
            .iter()
            .filter(|id| owned.contains(*id))
            .filter_map(|id| self.logistics.get(id).map(|l| (*id, l.clone())))
            .collect())
    }
}

#[async_trait]
impl DeclarationQuery for InMemoryOrderRepository {
    async fn map_declarations_by_order_ids(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, DeclarationInfo>> {
        let owned = self.owned_by(company_id);
        Ok(order_ids
            .iter()
            .filter(|id| owned.contains(*id))
            .filter_map(|id| self.declarations.get(id).map(|d| (*id, d.clone())))
            .collect())
    }
}
