use crate::core::Storage;
use crate::utils::error::Result;
use std::path::Path;

/// 以本機目錄作為輸出位置
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn full_path(&self, path: &str) -> String {
        Path::new(&self.base_path).join(path).display().to_string()
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        storage
            .write_file("reports/report.csv", b"branch,product_line,total_sales\n")
            .await
            .unwrap();

        let data = std::fs::read(storage.full_path("reports/report.csv")).unwrap();
        assert_eq!(data, b"branch,product_line,total_sales\n");
        assert!(temp_dir.path().join("reports").is_dir());
    }

    #[tokio::test]
    async fn test_write_into_file_path_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("blocked"), b"").unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        // 父路徑是檔案，無法建立目錄
        let err = storage.write_file("blocked/report.csv", b"x").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::EtlError::IoError(_)));
    }
}
