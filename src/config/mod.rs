pub mod toml_config;

use crate::core::worker_pool::DEFAULT_POOL_SIZE;
use crate::domain::model::CompanyId;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

pub use toml_config::TomlConfig;

pub const DEFAULT_ITEM_BATCH_SIZE: usize = 200;
pub const DEFAULT_SECTION_CONCURRENCY_THRESHOLD: usize = 200;
pub const DEFAULT_PLATFORM_CONCURRENCY_THRESHOLD: usize = 10;
pub const DEFAULT_SLOW_QUERY_MS: u64 = 3_000;

/// 豐富查詢的閾值設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichQueryConfig {
    pub item_batch_size: usize,
    pub section_concurrency_threshold: usize,
    pub platform_concurrency_threshold: usize,
    pub slow_query_ms: u64,
    pub worker_pool_size: usize,
    pub main_company_ids: Vec<CompanyId>,
}

impl Default for RichQueryConfig {
    fn default() -> Self {
        Self {
            item_batch_size: DEFAULT_ITEM_BATCH_SIZE,
            section_concurrency_threshold: DEFAULT_SECTION_CONCURRENCY_THRESHOLD,
            platform_concurrency_threshold: DEFAULT_PLATFORM_CONCURRENCY_THRESHOLD,
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
            worker_pool_size: DEFAULT_POOL_SIZE,
            main_company_ids: vec![1, 2],
        }
    }
}

impl RichQueryConfig {
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        let mut main_company_ids: Vec<CompanyId> = provider.main_company_ids().into_iter().collect();
        main_company_ids.sort_unstable();
        Self {
            item_batch_size: provider.item_batch_size(),
            section_concurrency_threshold: provider.section_concurrency_threshold(),
            platform_concurrency_threshold: provider.platform_concurrency_threshold(),
            slow_query_ms: provider.slow_query_threshold().as_millis() as u64,
            worker_pool_size: provider.worker_pool_size(),
            main_company_ids,
        }
    }
}

impl ConfigProvider for RichQueryConfig {
    fn item_batch_size(&self) -> usize {
        self.item_batch_size
    }

    fn section_concurrency_threshold(&self) -> usize {
        self.section_concurrency_threshold
    }

    fn platform_concurrency_threshold(&self) -> usize {
        self.platform_concurrency_threshold
    }

    fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_ms)
    }

    fn worker_pool_size(&self) -> usize {
        self.worker_pool_size
    }

    fn main_company_ids(&self) -> HashSet<CompanyId> {
        self.main_company_ids.iter().copied().collect()
    }
}

impl Validate for RichQueryConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("rich_query.item_batch_size", self.item_batch_size, 1)?;
        validate_positive_number(
            "rich_query.section_concurrency_threshold",
            self.section_concurrency_threshold,
            1,
        )?;
        validate_positive_number(
            "rich_query.platform_concurrency_threshold",
            self.platform_concurrency_threshold,
            1,
        )?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use super::*;
    use crate::domain::model::PageOrderConditionQuery;
    use clap::Parser;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "harvest-oms")]
    #[command(about = "Rich order page query over an order fixture")]
    pub struct CliConfig {
        #[arg(long, help = "TOML configuration file; overrides the threshold flags")]
        pub config: Option<String>,

        #[arg(long, help = "JSON order fixture used as the order repository")]
        pub fixture: Option<String>,

        #[arg(long, default_value = "1")]
        pub company_id: CompanyId,

        #[arg(long, default_value = "1")]
        pub page_no: u32,

        #[arg(long, default_value = "20")]
        pub page_size: u32,

        #[arg(long, value_delimiter = ',')]
        pub order_sources: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        pub order_nos: Vec<String>,

        #[arg(long, default_value_t = DEFAULT_ITEM_BATCH_SIZE)]
        pub item_batch_size: usize,

        #[arg(long, default_value_t = DEFAULT_SECTION_CONCURRENCY_THRESHOLD)]
        pub section_concurrency_threshold: usize,

        #[arg(long, default_value_t = DEFAULT_PLATFORM_CONCURRENCY_THRESHOLD)]
        pub platform_concurrency_threshold: usize,

        #[arg(long, default_value_t = DEFAULT_SLOW_QUERY_MS)]
        pub slow_query_ms: u64,

        #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
        pub worker_pool_size: usize,

        #[arg(long, help = "Emit logs as JSON")]
        pub json_logs: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl CliConfig {
        pub fn condition(&self) -> PageOrderConditionQuery {
            PageOrderConditionQuery {
                page_no: self.page_no,
                page_size: self.page_size,
                order_sources: self.order_sources.clone(),
                order_nos: self.order_nos.clone(),
                ..Default::default()
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn item_batch_size(&self) -> usize {
            self.item_batch_size
        }

        fn section_concurrency_threshold(&self) -> usize {
            self.section_concurrency_threshold
        }

        fn platform_concurrency_threshold(&self) -> usize {
            self.platform_concurrency_threshold
        }

        fn slow_query_threshold(&self) -> Duration {
            Duration::from_millis(self.slow_query_ms)
        }

        fn worker_pool_size(&self) -> usize {
            self.worker_pool_size
        }

        fn main_company_ids(&self) -> HashSet<CompanyId> {
            RichQueryConfig::default().main_company_ids()
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if let Some(fixture) = &self.fixture {
                crate::utils::validation::validate_path("fixture", fixture)?;
                crate::utils::validation::validate_file_extension("fixture", fixture, &["json"])?;
            }
            validate_positive_number("page_size", self.page_size as usize, 1)?;
            RichQueryConfig::from_provider(self).validate()
        }
    }
}
