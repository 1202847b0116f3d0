use crate::config::toml_config::SourceConfig;
use crate::domain::model::{
    DimensionSpec, MonthlySales, ProductLineRating, ProductLineSales, RawSalesRecord, RunSummary,
    StarSchema,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> &SourceConfig;
    fn field_mapping(&self) -> Option<&HashMap<String, String>>;
    /// branch, customer, product
    fn dimension_specs(&self) -> [DimensionSpec; 3];
    fn output_path(&self) -> &str;
    fn database_path(&self) -> &str;
    fn report_filename(&self) -> &str;
    fn top_n(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawSalesRecord>>;
    async fn transform(&self, data: Vec<RawSalesRecord>) -> Result<StarSchema>;
    async fn load(&self, schema: StarSchema) -> Result<RunSummary>;
}

/// Relational sink for the star schema plus the read-only queries over it.
pub trait Warehouse {
    /// Drops and rebuilds all four tables atomically.
    fn replace_star_schema(&mut self, schema: &StarSchema) -> Result<()>;
    fn top_product_lines_by_sales(&self, top_n: usize) -> Result<Vec<ProductLineSales>>;
    fn monthly_sales_trend(&self) -> Result<Vec<MonthlySales>>;
    fn top_product_lines_by_rating(&self, top_n: usize) -> Result<Vec<ProductLineRating>>;
}
