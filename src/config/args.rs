use crate::config::toml_config::{CheckConfig, DEFAULT_CONFIG_FILE};
use crate::config::Settings;
use crate::domain::model::OutputFormat;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::Path;

#[derive(Debug, Clone, Parser)]
#[command(name = "reqcheck")]
#[command(about = "Check pinned dependency manifests (requirements*.txt)")]
#[command(version)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every rule against a manifest and its `-r` includes
    Check(CheckArgs),
    /// Print the resolved set of active declarations
    List(ListArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Root manifest to check
    #[arg(default_value = "requirements.txt")]
    pub manifest: String,

    /// Path to TOML configuration file (defaults to ./reqcheck.toml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Maximum `-r` include depth
    #[arg(long)]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Report format(s): text, json, csv
    #[arg(short, long = "format", value_delimiter = ',')]
    pub formats: Vec<OutputFormat>,

    /// Write report files into this directory instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    /// Log phase timings and memory usage
    #[arg(long)]
    pub monitor: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Also print commented-out declarations, grouped by category
    #[arg(long)]
    pub include_deactivated: bool,
}

impl SourceArgs {
    fn load_file_config(&self) -> Result<Option<CheckConfig>> {
        match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                Ok(Some(CheckConfig::from_file(path)?))
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                tracing::info!("📁 Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                Ok(Some(CheckConfig::from_file(DEFAULT_CONFIG_FILE)?))
            }
            None => Ok(None),
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::new(self.manifest.clone());
        if let Some(file_config) = self.load_file_config()? {
            settings.apply_file(&file_config)?;
        }
        if let Some(depth) = self.max_depth {
            settings.max_depth = depth;
        }
        Ok(settings)
    }
}

impl CheckArgs {
    /// 設定檔的值先套用，命令列參數最後覆蓋
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = self.source.settings()?;
        if !self.formats.is_empty() {
            settings.formats = self.formats.clone();
        }
        if let Some(output) = &self.output {
            settings.output_path = Some(output.clone());
        }
        if self.strict {
            settings.strict = true;
        }
        Ok(settings)
    }
}

impl ListArgs {
    pub fn settings(&self) -> Result<Settings> {
        self.source.settings()
    }
}
