use crate::domain::model::{OutputFormat, Report, RuleId, Severity, SourceFile};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn manifest_path(&self) -> &str;
    /// `None` 時報告只輸出到 stdout
    fn output_path(&self) -> Option<&str>;
    fn output_formats(&self) -> &[OutputFormat];
    fn max_depth(&self) -> usize;
    fn strict(&self) -> bool;
    /// `None` 表示規則已關閉
    fn rule_severity(&self, rule: RuleId) -> Option<Severity>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<SourceFile>>;
    async fn transform(&self, files: Vec<SourceFile>) -> Result<Report>;
    async fn load(&self, report: Report) -> Result<String>;
}
