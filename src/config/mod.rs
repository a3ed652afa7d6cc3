#[cfg(feature = "cli")]
pub mod args;
pub mod local_storage;
pub mod toml_config;

use crate::core::include::DEFAULT_MAX_DEPTH;
use crate::core::ConfigProvider;
use crate::domain::model::{OutputFormat, RuleId, Severity};
use crate::utils::error::{CheckError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, Validate,
};
use std::collections::HashMap;
use toml_config::{CheckConfig, MAX_INCLUDE_DEPTH};

/// 合併設定檔與命令列之後的最終設定
#[derive(Debug, Clone)]
pub struct Settings {
    pub manifest: String,
    pub output_path: Option<String>,
    pub formats: Vec<OutputFormat>,
    pub max_depth: usize,
    pub strict: bool,
    pub severities: HashMap<RuleId, Option<Severity>>,
}

impl Settings {
    pub fn new(manifest: impl Into<String>) -> Self {
        Self {
            manifest: manifest.into(),
            output_path: None,
            formats: vec![OutputFormat::Text],
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
            severities: HashMap::new(),
        }
    }

    /// 套用設定檔；之後再由命令列覆蓋
    pub fn apply_file(&mut self, config: &CheckConfig) -> Result<()> {
        config.validate()?;

        if let Some(depth) = config.max_depth() {
            self.max_depth = depth;
        }
        if let Some(strict) = config.strict() {
            self.strict = strict;
        }
        if let Some(path) = config.output_path() {
            self.output_path = Some(path.to_string());
        }
        if let Some(formats) = config.formats()? {
            self.formats = formats;
        }
        for (rule, severity) in config.rule_overrides()? {
            self.severities.insert(rule, severity);
        }
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn manifest_path(&self) -> &str {
        &self.manifest
    }

    fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    fn output_formats(&self) -> &[OutputFormat] {
        &self.formats
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn strict(&self) -> bool {
        self.strict
    }

    fn rule_severity(&self, rule: RuleId) -> Option<Severity> {
        match self.severities.get(&rule) {
            Some(severity) => *severity,
            None => Some(rule.default_severity()),
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("manifest", &self.manifest)?;
        validate_path("manifest", &self.manifest)?;
        validate_positive_number("max_depth", self.max_depth, 1)?;
        validate_range("max_depth", self.max_depth, 1, MAX_INCLUDE_DEPTH)?;

        if let Some(path) = &self.output_path {
            validate_path("output_path", path)?;
        }
        if self.formats.is_empty() {
            return Err(CheckError::ConfigValidationError {
                field: "formats".to_string(),
                message: "At least one output format is required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new("requirements-dev.txt");
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(settings.output_formats(), &[OutputFormat::Text]);
        assert_eq!(settings.rule_severity(RuleId::Duplicate), Some(Severity::Warning));
        assert_eq!(settings.rule_severity(RuleId::Unpinned), Some(Severity::Error));
    }

    #[test]
    fn test_apply_file_overrides_defaults() {
        let config = CheckConfig::from_toml_str(
            "[check]\nmax_depth = 3\nformats = [\"json\"]\n\n[rules]\nunpinned = \"off\"\n",
        )
        .unwrap();

        let mut settings = Settings::new("requirements.txt");
        settings.apply_file(&config).unwrap();

        assert_eq!(settings.max_depth(), 3);
        assert_eq!(settings.output_formats(), &[OutputFormat::Json]);
        assert_eq!(settings.rule_severity(RuleId::Unpinned), None);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Settings::new("").validate().is_err());

        let mut no_formats = Settings::new("requirements.txt");
        no_formats.formats.clear();
        assert!(no_formats.validate().is_err());

        let mut zero_depth = Settings::new("requirements.txt");
        zero_depth.max_depth = 0;
        assert!(zero_depth.validate().is_err());
    }
}
