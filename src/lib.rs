pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::InMemoryOrderRepository;
pub use config::{RichQueryConfig, TomlConfig};
pub use core::{batch::OrderBatchExecutor, rich_query::OrderRichQueryService, worker_pool::WorkerPool};
pub use domain::model::{Order, OrderItem, Page, PageOrderConditionQuery};
pub use utils::error::{OmsError, Result};
