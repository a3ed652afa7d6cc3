use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV rendering error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cannot read config file '{path}': {source}")]
    ConfigReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，用於日誌與退出碼判斷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Output,
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CheckError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CheckError::TomlError(_)
            | CheckError::ConfigReadError { .. }
            | CheckError::ConfigValidationError { .. }
            | CheckError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            CheckError::ManifestNotFound { .. } => ErrorCategory::Input,
            CheckError::IoError(_) => ErrorCategory::Output,
            CheckError::SerializationError(_) | CheckError::CsvError(_) => {
                ErrorCategory::Rendering
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Rendering => ErrorSeverity::High,
            ErrorCategory::Input | ErrorCategory::Output => ErrorSeverity::Critical,
        }
    }

    /// 對應 CLI 退出碼：2 為設定錯誤，3 為 I/O 失敗
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Input | ErrorCategory::Output => 3,
            ErrorCategory::Rendering => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CheckError::ManifestNotFound { path } => {
                format!("Cannot read manifest '{}'", path)
            }
            CheckError::IoError(e) => format!("File operation failed: {}", e),
            CheckError::TomlError(e) => format!("Config file is not valid TOML: {}", e),
            CheckError::ConfigReadError { path, source } => {
                format!("Cannot read config file '{}': {}", path, source)
            }
            CheckError::ConfigValidationError { field, message } => {
                format!("Configuration problem in '{}': {}", field, message)
            }
            CheckError::InvalidConfigValueError {
                field,
                value,
                reason,
            } => format!("'{}' has an invalid value '{}': {}", field, value, reason),
            CheckError::SerializationError(_) | CheckError::CsvError(_) => {
                format!("Could not render the report: {}", self)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the config file and command line flags, then run again"
            }
            ErrorCategory::Input => "Make sure the manifest path exists and is readable",
            ErrorCategory::Output => "Make sure the output directory is writable",
            ErrorCategory::Rendering => "Try a different --format or report this as a bug",
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        let missing = CheckError::ManifestNotFound {
            path: "requirements.txt".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Input);
        assert_eq!(missing.exit_code(), 3);
        assert_eq!(missing.severity(), ErrorSeverity::Critical);

        let bad_value = CheckError::InvalidConfigValueError {
            field: "check.max_depth".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        };
        assert_eq!(bad_value.exit_code(), 2);
        assert!(bad_value.user_friendly_message().contains("check.max_depth"));

        let unreadable_config = CheckError::ConfigReadError {
            path: "nope.toml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(unreadable_config.category(), ErrorCategory::Configuration);
        assert_eq!(unreadable_config.exit_code(), 2);
    }
}
