use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Download failed with HTTP status {status} from {url}")]
    DownloadError { url: String, status: u16 },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] rusqlite::Error),

    #[error("Schema error: missing attribute(s) {}", .missing.join(", "))]
    SchemaError { missing: Vec<String> },

    #[error("Parse error in {field} of invoice {invoice_id}: '{value}' ({reason})")]
    ParseError {
        invoice_id: String,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Consistency error: no {dimension} row for natural key ({key})")]
    ConsistencyError { dimension: String, key: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Input,
    Transform,
    Storage,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::DownloadError { .. } => ErrorCategory::Network,
            EtlError::ZipError(_)
            | EtlError::CsvError(_)
            | EtlError::SchemaError { .. }
            | EtlError::ParseError { .. }
            | EtlError::ValidationError { .. } => ErrorCategory::Input,
            EtlError::ConsistencyError { .. } | EtlError::ProcessingError { .. } => {
                ErrorCategory::Transform
            }
            EtlError::StorageError(_) | EtlError::SerializationError(_) => ErrorCategory::Storage,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路問題重新執行即可
            EtlError::ApiError(_) | EtlError::DownloadError { .. } => ErrorSeverity::Medium,
            // 內部一致性錯誤代表程式缺陷
            EtlError::ConsistencyError { .. } | EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network access and dataset credentials, then re-run the whole pipeline"
            }
            ErrorCategory::Input => {
                "Verify the extract matches the expected invoice-line layout and re-download it"
            }
            ErrorCategory::Transform => {
                "This indicates a defect in dimension construction; please report it with the input file"
            }
            ErrorCategory::Storage => {
                "The previous tables were left untouched; fix the database path or permissions and re-run"
            }
            ErrorCategory::Configuration => "Fix the configuration file and try again",
            ErrorCategory::System => "Check disk space and file permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::SchemaError { missing } => {
                format!("Input is missing required column(s): {}", missing.join(", "))
            }
            EtlError::ParseError {
                invoice_id, value, ..
            } => format!("Invoice {} has an unreadable date/time: {}", invoice_id, value),
            EtlError::DownloadError { status, .. } => {
                format!("Dataset download was rejected (HTTP {})", status)
            }
            EtlError::StorageError(e) => format!("Writing the warehouse failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_message_lists_columns() {
        let err = EtlError::SchemaError {
            missing: vec!["city".to_string(), "gender".to_string()],
        };
        assert_eq!(err.to_string(), "Schema error: missing attribute(s) city, gender");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_consistency_error_is_critical() {
        let err = EtlError::ConsistencyError {
            dimension: "branch_dim".to_string(),
            key: "A, Yangon".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Transform);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_download_error_is_retryable_severity() {
        let err = EtlError::DownloadError {
            url: "https://example.com/data.zip".to_string(),
            status: 401,
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("401"));
    }
}
