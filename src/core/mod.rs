pub mod batch;
pub mod execution;
pub mod partition;
pub mod rich_query;
pub mod worker_pool;

pub use crate::domain::model::{Enrichment, Order, OrderItem, Page, PageOrderConditionQuery};
pub use crate::domain::ports::{
    ConfigProvider, OrderCompanyFeatureHandler, OrderPermissionsVerifier,
    OrderPlatformFeatureHandler, OrderRichQueryRepository, OrderSectionHandler,
};
pub use crate::utils::error::Result;
