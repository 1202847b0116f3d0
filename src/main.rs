use clap::Parser;
use sales_etl::config::{Command, QueryKind};
use sales_etl::core::report::write_top_sales_report;
use sales_etl::core::ConfigProvider;
use sales_etl::domain::ports::Warehouse;
use sales_etl::utils::error::{ErrorSeverity, EtlError};
use sales_etl::utils::{logger, validation::Validate};
use sales_etl::{CliArgs, EtlEngine, LocalStorage, SalesPipeline, SqliteWarehouse, TomlConfig};
use serde::Serialize;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if args.json_logs || config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting sales-etl ({})", config.pipeline.name);
    tracing::debug!("CLI args: {:?}", args);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if args.dry_run {
        display_config_summary(&config);
        println!("🔍 DRY RUN MODE - no data was read or written");
        return Ok(());
    }

    let result = match args.command() {
        Command::Run => run_pipeline(&args, config).await,
        Command::Report => rewrite_report(&config).await,
        Command::Query { kind, top_n } => {
            run_query(&config, kind, top_n.unwrap_or_else(|| config.top_n()))
        }
    };

    if let Err(e) = result {
        exit_with(e);
    }
    Ok(())
}

async fn run_pipeline(args: &CliArgs, config: TomlConfig) -> Result<(), EtlError> {
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = SalesPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    let summary = engine.run().await?;
    tracing::info!("✅ ETL process completed successfully!");
    println!("✅ ETL process completed successfully!");
    println!(
        "⭐ {} facts, {} branches, {} customers, {} products",
        summary.records, summary.branches, summary.customers, summary.products
    );
    println!("🗄️  Warehouse: {}", summary.database_path);
    println!("📁 Report: {}", summary.report_path);
    Ok(())
}

async fn rewrite_report(config: &TomlConfig) -> Result<(), EtlError> {
    let rows = open_existing_warehouse(config)?.top_product_lines_by_sales(config.top_n())?;

    let storage = LocalStorage::new(config.output_path().to_string());
    write_top_sales_report(&storage, config.report_filename(), &rows).await?;

    let report_path = storage.full_path(config.report_filename());
    tracing::info!("📁 Report rewritten: {} ({} rows)", report_path, rows.len());
    println!("📁 Report: {}", report_path);
    Ok(())
}

fn run_query(config: &TomlConfig, kind: QueryKind, top_n: usize) -> Result<(), EtlError> {
    let warehouse = open_existing_warehouse(config)?;
    match kind {
        QueryKind::TopSales => print_rows(&warehouse.top_product_lines_by_sales(top_n)?),
        QueryKind::MonthlyTrend => print_rows(&warehouse.monthly_sales_trend()?),
        QueryKind::TopRated => print_rows(&warehouse.top_product_lines_by_rating(top_n)?),
    }
}

fn open_existing_warehouse(config: &TomlConfig) -> Result<SqliteWarehouse, EtlError> {
    let path = config.database_path();
    if !std::path::Path::new(path).exists() {
        return Err(EtlError::ConfigError {
            message: format!("warehouse {} does not exist; run the pipeline first", path),
        });
    }
    SqliteWarehouse::open(path)
}

fn print_rows<T: Serialize>(rows: &[T]) -> Result<(), EtlError> {
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    let dimensions = &config.transform.dimensions;

    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Source: {}", config.source.describe());
    if let Some(url) = config.source.download_url() {
        println!("  Download URL: {}", url);
    }
    println!("  Warehouse: {}", config.database_path());
    println!(
        "  Report: {}/{} (top {})",
        config.output_path(),
        config.report_filename(),
        config.top_n()
    );
    println!("  Branch key: {}", dimensions.branch.join(", "));
    println!("  Customer key: {}", dimensions.customer.join(", "));
    println!("  Product key: {}", dimensions.product.join(", "));

    if let Some(mapping) = &config.extract.field_mapping {
        println!("  Field mapping:");
        for (from, to) in mapping {
            println!("    {} -> {}", from, to);
        }
    }
    println!();
}

fn exit_with(e: EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
