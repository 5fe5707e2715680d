use crate::domain::model::{CompanyId, DeclarationInfo, DeclarationStatus, Enrichment, Order, OrderId};
use crate::domain::ports::{DeclarationQuery, LogisticsQuery, OrderSectionHandler};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub const LOGISTICS_SECTION: &str = "logistics";
pub const DECLARATION_SECTION: &str = "declaration";

fn order_ids(orders: &[Order]) -> Vec<OrderId> {
    orders.iter().map(|o| o.order_id).collect()
}

/// 物流資訊填充
pub struct LogisticsSectionHandler {
    source: Arc<dyn LogisticsQuery>,
}

impl LogisticsSectionHandler {
    pub fn new(source: Arc<dyn LogisticsQuery>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl OrderSectionHandler for LogisticsSectionHandler {
    fn name(&self) -> &str {
        LOGISTICS_SECTION
    }

    async fn batch_fill(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        let logistics = self
            .source
            .map_logistics_by_order_ids(company_id, &order_ids(orders))
            .await?;

        let mut enrichment = Enrichment::new(LOGISTICS_SECTION);
        for (order_id, info) in logistics {
            enrichment.insert(order_id, serde_json::to_value(info)?);
        }
        Ok(enrichment)
    }
}

/// 申報狀態填充，沒有申報記錄的訂單視為待申報
pub struct DeclarationSectionHandler {
    source: Arc<dyn DeclarationQuery>,
}

impl DeclarationSectionHandler {
    pub fn new(source: Arc<dyn DeclarationQuery>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl OrderSectionHandler for DeclarationSectionHandler {
    fn name(&self) -> &str {
        DECLARATION_SECTION
    }

    async fn batch_fill(&self, company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        let mut declarations = self
            .source
            .map_declarations_by_order_ids(company_id, &order_ids(orders))
            .await?;

        let mut enrichment = Enrichment::new(DECLARATION_SECTION);
        for order in orders {
            let declaration = declarations.remove(&order.order_id).unwrap_or(DeclarationInfo {
                order_id: order.order_id,
                status: DeclarationStatus::Pending,
                declaration_no: None,
            });
            enrichment.insert(order.order_id, serde_json::to_value(declaration)?);
        }
        Ok(enrichment)
    }
}
