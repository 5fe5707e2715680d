use crate::domain::model::{CompanyId, Enrichment, Order};
use crate::domain::ports::{OrderCompanyFeatureHandler, OrderPlatformFeatureHandler};
use crate::utils::error::{OmsError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;

pub const PLATFORM_PROFILE_FEATURE: &str = "platform_profile";
pub const MAIN_COMPANY_FEATURE: &str = "main_company";

/// 平台訂單特性：只處理配置中的訂單來源
pub struct PlatformProfileFeatureHandler {
    sources: HashSet<String>,
}

impl PlatformProfileFeatureHandler {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl OrderPlatformFeatureHandler for PlatformProfileFeatureHandler {
    fn name(&self) -> &str {
        PLATFORM_PROFILE_FEATURE
    }

    async fn batch_feature_fill(&self, _company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        let mut enrichment = Enrichment::new(PLATFORM_PROFILE_FEATURE);
        for order in orders.iter().filter(|o| self.sources.contains(&o.order_source)) {
            enrichment.insert(
                order.order_id,
                json!({
                    "platform": order.order_source,
                    "total_quantity": order.total_quantity(),
                }),
            );
        }
        Ok(enrichment)
    }
}

/// 重點公司特性處理
pub struct MainCompanyFeatureHandler {
    main_companies: HashSet<CompanyId>,
}

impl MainCompanyFeatureHandler {
    pub fn new(main_companies: HashSet<CompanyId>) -> Self {
        Self { main_companies }
    }
}

#[async_trait]
impl OrderCompanyFeatureHandler for MainCompanyFeatureHandler {
    fn name(&self) -> &str {
        MAIN_COMPANY_FEATURE
    }

    fn matches(&self, company_id: CompanyId) -> bool {
        self.main_companies.contains(&company_id)
    }

    async fn batch_feature_fill(&self, _company_id: CompanyId, orders: &[Order]) -> Result<Enrichment> {
        let mut enrichment = Enrichment::new(MAIN_COMPANY_FEATURE);
        for order in orders {
            let amount = order.order_amount().ok_or_else(|| {
                OmsError::handler(
                    MAIN_COMPANY_FEATURE,
                    format!("order amount of {} overflows", order.order_no),
                )
            })?;
            enrichment.insert(order.order_id, json!({ "priority": true, "order_amount": amount }));
        }
        Ok(enrichment)
    }
}
