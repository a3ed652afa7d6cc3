use crate::core::include::IncludeWalker;
use crate::core::report::{build_report, render};
use crate::core::rules::{check_files, RuleSet};
use crate::core::{ConfigProvider, Pipeline, Report, SourceFile, Storage};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

pub const REPORT_BASENAME: &str = "reqcheck-report";

pub struct CheckPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> CheckPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CheckPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<SourceFile>> {
        let root = Path::new(self.config.manifest_path());
        tracing::debug!(
            "Walking {} (max include depth {})",
            root.display(),
            self.config.max_depth()
        );

        IncludeWalker::new(&self.storage, self.config.max_depth())
            .walk(root)
            .await
    }

    async fn transform(&self, files: Vec<SourceFile>) -> Result<Report> {
        let rules = RuleSet::from_config(&self.config);
        let outcome = check_files(&files, &rules);
        let root = files
            .first()
            .map(|f| f.path.clone())
            .unwrap_or_else(|| PathBuf::from(self.config.manifest_path()));
        Ok(build_report(&root, &files, outcome))
    }

    async fn load(&self, report: Report) -> Result<String> {
        let Some(output_dir) = self.config.output_path() else {
            // 沒有輸出目錄時直接印到 stdout
            for format in self.config.output_formats() {
                print!("{}", render(&report, *format)?);
            }
            return Ok("-".to_string());
        };

        let mut written = Vec::new();
        for format in self.config.output_formats() {
            let content = render(&report, *format)?;
            let path = Path::new(output_dir)
                .join(format!("{}.{}", REPORT_BASENAME, format.extension()))
                .to_string_lossy()
                .into_owned();
            tracing::debug!("Writing {} report to {}", format, path);
            self.storage.write_file(&path, content.as_bytes()).await?;
            written.push(path);
        }

        Ok(written.join(", "))
    }
}
