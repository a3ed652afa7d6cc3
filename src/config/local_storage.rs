use crate::core::Storage;
use crate::utils::error::Result;
use std::path::Path;

/// 本機檔案系統；相對路徑以 `base_path` 為基準
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    /// 以目前工作目錄為基準
    pub fn current_dir() -> Self {
        Self::new(String::new())
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
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
    async fn test_write_then_read_under_base_path() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());

        storage
            .write_file("reports/reqcheck-report.txt", b"ok\n")
            .await
            .unwrap();
        let data = storage.read_file("reports/reqcheck-report.txt").await.unwrap();
        assert_eq!(data, b"ok\n");
        assert!(storage.read_file("missing.txt").await.is_err());
    }
}
