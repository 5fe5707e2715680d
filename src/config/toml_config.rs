use crate::config::RichQueryConfig;
use crate::core::worker_pool::DEFAULT_POOL_NAME;
use crate::domain::model::CompanyId;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{OmsError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub rich_query: RichQueryConfig,
    pub worker_pool: Option<WorkerPoolConfig>,
    pub permissions: Option<PermissionsConfig>,
    pub platforms: Option<PlatformsConfig>,
    pub repository: Option<RepositoryConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    pub name: Option<String>,
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    pub max_page_size: Option<u32>,
    /// 為空表示不限制公司
    pub allowed_company_ids: Option<Vec<CompanyId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformsConfig {
    /// 需要做平台特性處理的訂單來源
    pub profiled_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub fixture_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

pub const DEFAULT_MAX_PAGE_SIZE: u32 = 500;

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OmsError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| OmsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OMS_FIXTURE})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn worker_pool_name(&self) -> &str {
        self.worker_pool
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or(DEFAULT_POOL_NAME)
    }

    pub fn max_page_size(&self) -> u32 {
        self.permissions
            .as_ref()
            .and_then(|p| p.max_page_size)
            .unwrap_or(DEFAULT_MAX_PAGE_SIZE)
    }

    pub fn allowed_company_ids(&self) -> HashSet<CompanyId> {
        self.permissions
            .as_ref()
            .and_then(|p| p.allowed_company_ids.clone())
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    pub fn profiled_sources(&self) -> Vec<String> {
        self.platforms
            .as_ref()
            .map(|p| p.profiled_sources.clone())
            .unwrap_or_default()
    }

    pub fn fixture_path(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.fixture_path.as_str())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_non_empty_string("service.name", &self.service.name)?;

        self.rich_query.validate()?;

        crate::utils::validation::validate_non_empty_string("worker_pool.name", self.worker_pool_name())?;

        crate::utils::validation::validate_range("permissions.max_page_size", self.max_page_size(), 1, 10_000)?;

        if let Some(fixture) = self.fixture_path() {
            crate::utils::validation::validate_path("repository.fixture_path", fixture)?;
            crate::utils::validation::validate_file_extension("repository.fixture_path", fixture, &["json"])?;
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.log_level();
        if !valid_levels.contains(&level) {
            return Err(OmsError::InvalidConfigValueError {
                field: "logging.level".to_string(),
                value: level.to_string(),
                reason: format!("Unsupported level. Valid levels: {}", valid_levels.join(", ")),
            });
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn item_batch_size(&self) -> usize {
        self.rich_query.item_batch_size
    }

    fn section_concurrency_threshold(&self) -> usize {
        self.rich_query.section_concurrency_threshold
    }

    fn platform_concurrency_threshold(&self) -> usize {
        self.rich_query.platform_concurrency_threshold
    }

    fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.rich_query.slow_query_ms)
    }

    fn worker_pool_size(&self) -> usize {
        self.worker_pool
            .as_ref()
            .and_then(|p| p.size)
            .unwrap_or(self.rich_query.worker_pool_size)
    }

    fn main_company_ids(&self) -> HashSet<CompanyId> {
        self.rich_query.main_company_ids()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
