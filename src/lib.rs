pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::args::CliConfig;

pub use app::pipelines::check_pipeline::CheckPipeline;
pub use config::{local_storage::LocalStorage, Settings};
pub use core::engine::{CheckEngine, CheckRun};
pub use domain::model::{Finding, OutputFormat, Report, RuleId, Severity};
pub use utils::error::{CheckError, Result};
