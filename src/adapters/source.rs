use crate::config::toml_config::SourceConfig;
use crate::domain::model::{RawSalesRecord, INPUT_ATTRIBUTES};
use crate::utils::error::{EtlError, Result};
use csv::StringRecord;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::io::Read;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// 原始欄位名稱正規化後的固定更名
const BUILTIN_RENAMES: &[(&str, &str)] = &[("tax_5%", "tax_amount"), ("payment", "payment_mode")];

/// 取得原始資料：本機檔案或 HTTP 下載
pub async fn fetch_source_bytes(client: &Client, source: &SourceConfig) -> Result<Vec<u8>> {
    if let SourceConfig::File { path, .. } = source {
        tracing::debug!("Reading source file: {}", path);
        return Ok(tokio::fs::read(path).await?);
    }

    let url = source.download_url().ok_or_else(|| EtlError::ConfigError {
        message: format!("no download url for {}", source.describe()),
    })?;

    let mut request = client.get(&url);
    if let Some((username, key)) = source.credentials() {
        request = request.basic_auth(username, Some(key));
    }
    if let Some(timeout) = source.timeout_seconds() {
        request = request.timeout(std::time::Duration::from_secs(timeout));
    }

    tracing::debug!("Downloading dataset from: {}", url);
    let response = request.send().await?;
    tracing::debug!("Download response status: {}", response.status());

    if !response.status().is_success() {
        return Err(EtlError::DownloadError {
            url,
            status: response.status().as_u16(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}

/// Returns the CSV payload, unpacking it first when `data` is a ZIP archive.
/// Without an explicit entry name the lexicographically first `*.csv` entry is used.
pub fn unpack_csv(data: Vec<u8>, csv_entry: Option<&str>) -> Result<Vec<u8>> {
    if !data.starts_with(ZIP_MAGIC) {
        return Ok(data);
    }

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))?;
    let entry_name = match csv_entry {
        Some(name) => name.to_string(),
        None => archive
            .file_names()
            .filter(|name| name.to_lowercase().ends_with(".csv"))
            .min()
            .map(str::to_string)
            .ok_or_else(|| EtlError::ProcessingError {
                message: "archive contains no .csv entry".to_string(),
            })?,
    };

    tracing::debug!("Unpacking {} from archive ({} entries)", entry_name, archive.len());
    let mut file = archive.by_name(&entry_name)?;
    let mut csv_data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut csv_data)?;
    Ok(csv_data)
}

pub fn normalize_header(name: &str, field_mapping: Option<&HashMap<String, String>>) -> String {
    let mut normalized = name
        .trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(' ', "_");

    if let Some((_, renamed)) = BUILTIN_RENAMES.iter().find(|(from, _)| *from == normalized) {
        normalized = renamed.to_string();
    }
    if let Some(renamed) = field_mapping.and_then(|mapping| mapping.get(&normalized)) {
        normalized = renamed.clone();
    }
    normalized
}

/// 解析 CSV：正規化標頭、檢查必要欄位，再反序列化每一列
pub fn parse_sales_csv(
    data: &[u8],
    field_mapping: Option<&HashMap<String, String>>,
) -> Result<Vec<RawSalesRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers: StringRecord = reader
        .headers()?
        .iter()
        .map(|h| normalize_header(h, field_mapping))
        .collect();

    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<String> = INPUT_ATTRIBUTES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !present.contains(name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::SchemaError { missing });
    }

    tracing::debug!("Normalized headers: {:?}", headers);
    reader.set_headers(headers);

    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<RawSalesRecord>, csv::Error>>()?;
    Ok(records)
}
