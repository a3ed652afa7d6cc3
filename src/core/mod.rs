pub mod engine;
pub mod include;
pub mod parser;
pub mod report;
pub mod rules;

pub use crate::domain::model::{Report, SourceFile};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
