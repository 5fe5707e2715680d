use anyhow::Context;
use clap::Parser;
use harvest_oms::app::{bootstrap, HandlerOptions};
use harvest_oms::domain::ports::ConfigProvider;
use harvest_oms::utils::logger;
use harvest_oms::utils::validation::{validate_required_field, Validate};
use harvest_oms::{CliConfig, InMemoryOrderRepository, OmsError, TomlConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let toml_config = match &cli.config {
        Some(path) => Some(
            TomlConfig::from_file(path).with_context(|| format!("failed to load config {}", path))?,
        ),
        None => None,
    };

    // 初始化日誌
    let json_logs = cli.json_logs || toml_config.as_ref().is_some_and(TomlConfig::json_logs);
    if json_logs {
        logger::init_json_logger(toml_config.as_ref().map_or("info", TomlConfig::log_level));
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting harvest-oms rich query");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    let validation = match &toml_config {
        Some(config) => config.validate(),
        None => cli.validate(),
    };
    if let Err(e) = validation {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    let fixture = cli
        .fixture
        .clone()
        .or_else(|| toml_config.as_ref().and_then(|c| c.fixture_path().map(str::to_string)));
    let fixture = validate_required_field("repository.fixture_path", &fixture)
        .context("no order fixture given: pass --fixture or set repository.fixture_path")?;
    let repository = Arc::new(
        InMemoryOrderRepository::from_fixture_file(fixture)
            .with_context(|| format!("failed to load fixture {}", fixture))?,
    );

    let (provider, options): (&dyn ConfigProvider, HandlerOptions) = match &toml_config {
        Some(config) => (config as &dyn ConfigProvider, HandlerOptions::from(config)),
        None => (&cli as &dyn ConfigProvider, HandlerOptions::default()),
    };
    let app = bootstrap(repository, provider, &options);

    let condition = cli.condition();
    match app
        .rich_query
        .page_query_order_rich(cli.company_id, &condition)
        .await
    {
        Ok(page) => {
            tracing::info!(
                "✅ Rich query returned {} of {} orders",
                page.data.len(),
                page.count
            );
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Rich query failed: {} (code: {})", e, e.code());
            eprintln!("❌ {}", e);

            let exit_code = match e {
                OmsError::PermissionDenied { .. } => 3,
                _ if e.is_retryable() => 4,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    }
}
