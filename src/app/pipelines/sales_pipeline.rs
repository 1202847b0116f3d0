use crate::adapters::source::{fetch_source_bytes, parse_sales_csv, unpack_csv};
use crate::adapters::warehouse::SqliteWarehouse;
use crate::core::normalizer::normalize;
use crate::core::report::write_top_sales_report;
use crate::core::{ConfigProvider, Pipeline, RawSalesRecord, RunSummary, StarSchema, Storage};
use crate::domain::ports::Warehouse;
use crate::utils::error::Result;
use reqwest::Client;

/// 超市銷售資料的星狀綱要管道
pub struct SalesPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> SalesPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SalesPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<RawSalesRecord>> {
        let source = self.config.source();
        tracing::info!("🚀 Starting extraction from {}", source.describe());

        let raw = fetch_source_bytes(&self.client, source).await?;
        tracing::debug!("Fetched {} bytes", raw.len());

        let csv_data = unpack_csv(raw, source.csv_entry())?;
        let records = parse_sales_csv(&csv_data, self.config.field_mapping())?;

        tracing::info!("📊 Extracted {} records", records.len());
        Ok(records)
    }

    async fn transform(&self, data: Vec<RawSalesRecord>) -> Result<StarSchema> {
        tracing::info!("🔧 Normalizing {} records into star schema", data.len());
        normalize(data, &self.config.dimension_specs())
    }

    async fn load(&self, schema: StarSchema) -> Result<RunSummary> {
        let database_path = self.config.database_path();
        tracing::info!("💾 Loading star schema into {}", database_path);

        // 連線不跨越 await
        let report_rows = {
            let mut warehouse = SqliteWarehouse::open(database_path)?;
            warehouse.replace_star_schema(&schema)?;
            warehouse.top_product_lines_by_sales(self.config.top_n())?
        };

        let report_filename = self.config.report_filename();
        // 倉儲已提交；報表失敗時需以 `report` 子命令重新產生
        if let Err(e) = write_top_sales_report(&self.storage, report_filename, &report_rows).await {
            tracing::error!(
                "❌ Warehouse {} was replaced but writing {} failed: {}",
                database_path,
                report_filename,
                e
            );
            tracing::error!("💡 Run `sales-etl report` to regenerate the report from the warehouse");
            return Err(e);
        }
        let report_path = format!("{}/{}", self.config.output_path(), report_filename);
        tracing::info!("📦 Report saved: {} ({} rows)", report_path, report_rows.len());

        Ok(RunSummary {
            records: schema.facts.len(),
            branches: schema.branches.len(),
            customers: schema.customers.len(),
            products: schema.products.len(),
            database_path: database_path.to_string(),
            report_path,
        })
    }
}
