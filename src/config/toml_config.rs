use crate::core::ConfigProvider;
use crate::domain::model::{DimensionSpec, RawSalesRecord};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_positive_number,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_KAGGLE_ENDPOINT: &str = "https://www.kaggle.com/api/v1/datasets/download";
pub const DEFAULT_REPORT_FILENAME: &str = "report.csv";
pub const DEFAULT_TOP_N: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// 資料來源：本機檔案、HTTP 下載，或 Kaggle 資料集
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    File {
        path: String,
        csv_entry: Option<String>,
    },
    Http {
        url: String,
        username: Option<String>,
        key: Option<String>,
        csv_entry: Option<String>,
        timeout_seconds: Option<u64>,
    },
    Kaggle {
        dataset: String,
        #[serde(default = "default_kaggle_endpoint")]
        endpoint: String,
        username: Option<String>,
        key: Option<String>,
        csv_entry: Option<String>,
        timeout_seconds: Option<u64>,
    },
}

fn default_kaggle_endpoint() -> String {
    DEFAULT_KAGGLE_ENDPOINT.to_string()
}

impl SourceConfig {
    /// 下載網址；本機檔案回傳 `None`
    pub fn download_url(&self) -> Option<String> {
        match self {
            SourceConfig::File { .. } => None,
            SourceConfig::Http { url, .. } => Some(url.clone()),
            SourceConfig::Kaggle {
                dataset, endpoint, ..
            } => Some(format!("{}/{}", endpoint.trim_end_matches('/'), dataset)),
        }
    }

    pub fn csv_entry(&self) -> Option<&str> {
        match self {
            SourceConfig::File { csv_entry, .. }
            | SourceConfig::Http { csv_entry, .. }
            | SourceConfig::Kaggle { csv_entry, .. } => csv_entry.as_deref(),
        }
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match self {
            SourceConfig::File { .. } => None,
            SourceConfig::Http { username, key, .. } | SourceConfig::Kaggle { username, key, .. } => {
                match (username, key) {
                    (Some(u), Some(k)) => Some((u.as_str(), k.as_str())),
                    _ => None,
                }
            }
        }
    }

    pub fn timeout_seconds(&self) -> Option<u64> {
        match self {
            SourceConfig::File { .. } => None,
            SourceConfig::Http {
                timeout_seconds, ..
            }
            | SourceConfig::Kaggle {
                timeout_seconds, ..
            } => *timeout_seconds,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceConfig::File { path, .. } => format!("file {}", path),
            SourceConfig::Http { url, .. } => format!("http {}", url),
            SourceConfig::Kaggle { dataset, .. } => format!("kaggle dataset {}", dataset),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Extra header renames applied after lower-casing and the built-in renames.
    pub field_mapping: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub dimensions: DimensionKeys,
}

/// 各維度的自然鍵欄位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionKeys {
    #[serde(default = "default_branch_key")]
    pub branch: Vec<String>,
    #[serde(default = "default_customer_key")]
    pub customer: Vec<String>,
    #[serde(default = "default_product_key")]
    pub product: Vec<String>,
}

fn default_branch_key() -> Vec<String> {
    vec!["branch".to_string(), "city".to_string()]
}

fn default_customer_key() -> Vec<String> {
    vec!["customer_type".to_string(), "gender".to_string()]
}

fn default_product_key() -> Vec<String> {
    vec!["product_line".to_string(), "unit_price".to_string()]
}

impl Default for DimensionKeys {
    fn default() -> Self {
        Self {
            branch: default_branch_key(),
            customer: default_customer_key(),
            product: default_product_key(),
        }
    }
}

impl DimensionKeys {
    pub fn specs(&self) -> [DimensionSpec; 3] {
        [
            DimensionSpec::new("branch_dim", "branch_id", &self.branch),
            DimensionSpec::new("customer_dim", "customer_id", &self.customer),
            DimensionSpec::new("product_dim", "product_id", &self.product),
        ]
    }

    fn validate_keys(&self) -> Result<()> {
        let groups = [
            ("transform.dimensions.branch", &self.branch, Some("branch")),
            ("transform.dimensions.customer", &self.customer, None),
            ("transform.dimensions.product", &self.product, Some("product_line")),
        ];

        for (field, keys, required) in groups {
            if keys.is_empty() {
                return Err(EtlError::ConfigValidationError {
                    field: field.to_string(),
                    message: "natural key needs at least one attribute".to_string(),
                });
            }
            for key in keys {
                if RawSalesRecord::attribute_kind(key).is_none() {
                    return Err(EtlError::InvalidConfigValueError {
                        field: field.to_string(),
                        value: key.clone(),
                        reason: "Not an input attribute".to_string(),
                    });
                }
            }
            // 報表查詢依賴這些欄位
            if let Some(required) = required {
                if !keys.iter().any(|k| k == required) {
                    return Err(EtlError::ConfigValidationError {
                        field: field.to_string(),
                        message: format!("natural key must include '{}'", required),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub database_path: String,
    pub report_filename: Option<String>,
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${KAGGLE_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.validate_source()?;

        validate_path("load.output_path", &self.load.output_path)?;
        validate_path("load.database_path", &self.load.database_path)?;
        validate_non_empty_string("load.report_filename", self.report_filename())?;
        validate_positive_number("load.top_n", self.top_n(), 1)?;

        self.transform.dimensions.validate_keys()
    }

    fn validate_source(&self) -> Result<()> {
        match &self.source {
            SourceConfig::File { path, .. } => {
                validate_path("source.path", path)?;
                validate_file_extensions("source.path", std::slice::from_ref(path), &["csv", "zip"])?;
            }
            SourceConfig::Http { url, .. } => validate_url("source.url", url)?,
            SourceConfig::Kaggle {
                dataset, endpoint, ..
            } => {
                validate_url("source.endpoint", endpoint)?;
                if dataset.split('/').filter(|part| !part.trim().is_empty()).count() != 2 {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "source.dataset".to_string(),
                        value: dataset.clone(),
                        reason: "Expected '<owner>/<dataset>'".to_string(),
                    });
                }
            }
        }

        if let SourceConfig::Http { username, key, .. } | SourceConfig::Kaggle { username, key, .. } =
            &self.source
        {
            for (field, value) in [("source.username", username), ("source.key", key)] {
                if let Some(value) = value {
                    if value.contains("${") {
                        return Err(EtlError::ConfigValidationError {
                            field: field.to_string(),
                            message: format!("environment variable in '{}' is not set", value),
                        });
                    }
                }
            }
            if username.is_some() != key.is_some() {
                return Err(EtlError::ConfigValidationError {
                    field: "source".to_string(),
                    message: "username and key must be provided together".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn source(&self) -> &SourceConfig {
        &self.source
    }

    fn field_mapping(&self) -> Option<&HashMap<String, String>> {
        self.extract.field_mapping.as_ref()
    }

    fn dimension_specs(&self) -> [DimensionSpec; 3] {
        self.transform.dimensions.specs()
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn database_path(&self) -> &str {
        &self.load.database_path
    }

    fn report_filename(&self) -> &str {
        self.load
            .report_filename
            .as_deref()
            .unwrap_or(DEFAULT_REPORT_FILENAME)
    }

    fn top_n(&self) -> usize {
        self.load.top_n.unwrap_or(DEFAULT_TOP_N)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
