use crate::domain::model::ProductLineSales;
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;

pub const TOP_SALES_HEADER: [&str; 3] = ["branch", "product_line", "total_sales"];

/// 將各分店銷售前 N 名產品線寫成 CSV 報表
pub async fn write_top_sales_report<S: Storage>(
    storage: &S,
    filename: &str,
    rows: &[ProductLineSales],
) -> Result<()> {
    let data = rows_to_csv(&TOP_SALES_HEADER, rows)?;

    tracing::debug!("Writing report {} ({} rows, {} bytes)", filename, rows.len(), data.len());
    storage.write_file(filename, &data).await
}

/// Header is written even when there are no rows.
pub fn rows_to_csv<T: Serialize>(header: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}
