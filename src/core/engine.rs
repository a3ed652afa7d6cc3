use crate::core::{Pipeline, Report};
use crate::utils::error::Result;
use crate::utils::monitor::PhaseMonitor;

/// 一次完整檢查的結果：報告本體與輸出位置
#[derive(Debug)]
pub struct CheckRun {
    pub report: Report,
    pub output: String,
}

pub struct CheckEngine<P: Pipeline> {
    pipeline: P,
    monitor: PhaseMonitor,
}

impl<P: Pipeline> CheckEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: PhaseMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: PhaseMonitor::new(monitor_enabled),
        }
    }

    /// 只跑 extract 與 transform，不輸出報告
    pub async fn inspect(&self) -> Result<Report> {
        let files = self.pipeline.extract().await?;
        tracing::debug!("Read {} manifest file(s)", files.len());
        self.monitor.finish_phase("Extract");

        let report = self.pipeline.transform(files).await?;
        self.monitor.finish_phase("Transform");
        self.monitor.log_final_stats();
        Ok(report)
    }

    pub async fn run(&self) -> Result<CheckRun> {
        tracing::info!("🚀 Starting manifest check");

        // Extract
        tracing::info!("📥 Reading manifests...");
        let files = self.pipeline.extract().await?;
        tracing::info!("📥 Read {} manifest file(s)", files.len());
        self.monitor.finish_phase("Extract");

        // Transform
        tracing::info!("🔍 Checking declarations...");
        let report = self.pipeline.transform(files).await?;
        tracing::info!(
            "🔍 {} active, {} deactivated, {} finding(s)",
            report.summary.active,
            report.summary.deactivated,
            report.findings.len()
        );
        self.monitor.finish_phase("Transform");

        // Load
        tracing::info!("📤 Writing report...");
        let output = self.pipeline.load(report.clone()).await?;
        self.monitor.finish_phase("Load");
        self.monitor.log_final_stats();

        Ok(CheckRun { report, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceFile;
    use crate::core::parser::parse_manifest;
    use crate::core::report::build_report;
    use crate::core::rules::{check_files, RuleSet};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPipeline {
        content: &'static str,
        loads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pipeline for FixedPipeline {
        async fn extract(&self) -> Result<Vec<SourceFile>> {
            Ok(vec![parse_manifest(Path::new("requirements.txt"), 0, self.content)])
        }

        async fn transform(&self, files: Vec<SourceFile>) -> Result<Report> {
            let outcome = check_files(&files, &RuleSet::default());
            Ok(build_report(Path::new("requirements.txt"), &files, outcome))
        }

        async fn load(&self, _report: Report) -> Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok("-".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_goes_through_all_phases() {
        let engine = CheckEngine::new(FixedPipeline {
            content: "pytest==8.0.0\nhttpx>=0.27\n",
            loads: AtomicUsize::new(0),
        });

        let run = engine.run().await.unwrap();
        assert_eq!(run.output, "-");
        assert_eq!(run.report.summary.errors, 1);
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inspect_skips_load() {
        let engine = CheckEngine::new_with_monitoring(
            FixedPipeline {
                content: "pytest==8.0.0\n",
                loads: AtomicUsize::new(0),
            },
            true,
        );

        let report = engine.inspect().await.unwrap();
        assert_eq!(report.summary.active, 1);
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 0);
    }
}
