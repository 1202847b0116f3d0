pub mod etl;
pub mod normalizer;
pub mod report;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::app::pipelines::sales_pipeline::SalesPipeline;
pub use crate::domain::model::{RawSalesRecord, RunSummary, StarSchema};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, Warehouse};
pub use crate::utils::error::Result;
