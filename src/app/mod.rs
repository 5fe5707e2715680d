pub mod handlers;

use crate::config::toml_config::{TomlConfig, DEFAULT_MAX_PAGE_SIZE};
use crate::core::batch::OrderBatchExecutor;
use crate::core::rich_query::OrderRichQueryService;
use crate::core::worker_pool::{WorkerPool, DEFAULT_POOL_NAME};
use crate::domain::model::CompanyId;
use crate::domain::ports::{ConfigProvider, DeclarationQuery, LogisticsQuery, OrderRichQueryRepository};
use handlers::{
    CompanyAccessVerifier, DeclarationSectionHandler, LogisticsSectionHandler,
    MainCompanyFeatureHandler, PageSizeVerifier, PlatformProfileFeatureHandler,
};
use std::collections::HashSet;
use std::sync::Arc;

/// 處理器註冊所需的選項
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    pub pool_name: String,
    pub max_page_size: u32,
    pub allowed_company_ids: HashSet<CompanyId>,
    pub profiled_sources: Vec<String>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            pool_name: DEFAULT_POOL_NAME.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            allowed_company_ids: HashSet::new(),
            profiled_sources: Vec::new(),
        }
    }
}

impl From<&TomlConfig> for HandlerOptions {
    fn from(config: &TomlConfig) -> Self {
        Self {
            pool_name: config.worker_pool_name().to_string(),
            max_page_size: config.max_page_size(),
            allowed_company_ids: config.allowed_company_ids(),
            profiled_sources: config.profiled_sources(),
        }
    }
}

/// 組裝好的訂單查詢服務
pub struct OmsApp {
    pub rich_query: OrderRichQueryService,
    pub batch_executor: OrderBatchExecutor,
}

/// 啟動時註冊全部處理器，註冊順序即執行順序
pub fn bootstrap<R>(repository: Arc<R>, provider: &dyn ConfigProvider, options: &HandlerOptions) -> OmsApp
where
    R: OrderRichQueryRepository + LogisticsQuery + DeclarationQuery + 'static,
{
    let pool = Arc::new(WorkerPool::new(
        options.pool_name.clone(),
        provider.worker_pool_size(),
    ));

    tracing::info!(
        pool = %options.pool_name,
        pool_size = provider.worker_pool_size(),
        max_page_size = options.max_page_size,
        profiled_sources = options.profiled_sources.len(),
        "bootstrapping rich order query"
    );

    let rich_query = OrderRichQueryService::builder(repository.clone())
        .config(provider)
        .worker_pool(Arc::clone(&pool))
        .verifier(Arc::new(CompanyAccessVerifier::new(
            options.allowed_company_ids.clone(),
        )))
        .verifier(Arc::new(PageSizeVerifier::new(options.max_page_size)))
        .section_handler(Arc::new(LogisticsSectionHandler::new(repository.clone())))
        .section_handler(Arc::new(DeclarationSectionHandler::new(repository.clone())))
        .platform_feature_handler(Arc::new(PlatformProfileFeatureHandler::new(
            options.profiled_sources.clone(),
        )))
        .company_feature_handler(Arc::new(MainCompanyFeatureHandler::new(
            provider.main_company_ids(),
        )))
        .build();

    let batch_executor = OrderBatchExecutor::new(repository, pool);

    OmsApp {
        rich_query,
        batch_executor,
    }
}
