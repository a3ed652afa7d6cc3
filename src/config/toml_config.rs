use crate::domain::model::{OutputFormat, RuleId, Severity};
use crate::utils::error::{CheckError, Result};
use crate::utils::validation::{validate_path, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "reqcheck.toml";
pub const MAX_INCLUDE_DEPTH: usize = 256;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    pub check: Option<CheckSection>,
    /// 規則名稱 -> 嚴重度（error / warning / info / off）
    pub rules: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckSection {
    pub max_depth: Option<usize>,
    pub strict: Option<bool>,
    pub formats: Option<Vec<String>>,
    pub output_path: Option<String>,
}

/// `off` 回傳 `Ok(None)`
pub fn parse_severity(value: &str) -> std::result::Result<Option<Severity>, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "error" | "deny" => Ok(Some(Severity::Error)),
        "warning" | "warn" => Ok(Some(Severity::Warning)),
        "info" => Ok(Some(Severity::Info)),
        "off" | "allow" | "none" => Ok(None),
        other => Err(format!(
            "Unknown severity '{}'. Valid values: error, warning, info, off",
            other
        )),
    }
}

impl CheckConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| CheckError::ConfigReadError {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${REPORT_DIR})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex"));

        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.check.as_ref().and_then(|c| c.max_depth)
    }

    pub fn strict(&self) -> Option<bool> {
        self.check.as_ref().and_then(|c| c.strict)
    }

    pub fn output_path(&self) -> Option<&str> {
        self.check.as_ref().and_then(|c| c.output_path.as_deref())
    }

    pub fn formats(&self) -> Result<Option<Vec<OutputFormat>>> {
        let Some(raw) = self.check.as_ref().and_then(|c| c.formats.as_ref()) else {
            return Ok(None);
        };
        raw.iter()
            .map(|f| {
                f.parse::<OutputFormat>()
                    .map_err(|reason| CheckError::InvalidConfigValueError {
                        field: "check.formats".to_string(),
                        value: f.clone(),
                        reason,
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// 解析 `[rules]` 區段
    pub fn rule_overrides(&self) -> Result<Vec<(RuleId, Option<Severity>)>> {
        let Some(rules) = &self.rules else {
            return Ok(Vec::new());
        };

        rules
            .iter()
            .map(|(name, value)| {
                let rule = RuleId::from_name(name).ok_or_else(|| {
                    CheckError::InvalidConfigValueError {
                        field: "rules".to_string(),
                        value: name.clone(),
                        reason: format!(
                            "Unknown rule. Known rules: {}",
                            RuleId::ALL.map(|r| r.as_str()).join(", ")
                        ),
                    }
                })?;
                let severity =
                    parse_severity(value).map_err(|reason| CheckError::InvalidConfigValueError {
                        field: format!("rules.{}", name),
                        value: value.clone(),
                        reason,
                    })?;
                Ok((rule, severity))
            })
            .collect()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(depth) = self.max_depth() {
            validate_range("check.max_depth", depth, 1, MAX_INCLUDE_DEPTH)?;
        }

        if let Some(path) = self.output_path() {
            validate_path("check.output_path", path)?;
        }

        self.formats()?;
        self.rule_overrides()?;
        Ok(())
    }
}

impl Validate for CheckConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
