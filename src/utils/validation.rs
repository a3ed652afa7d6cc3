use crate::utils::error::{CheckError, Result};
use std::path::{Component, Path};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(CheckError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(CheckError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// 檢查 `-r` / `-c` 後面的路徑是否為語法正確的相對路徑。
///
/// 回傳 `Err(reason)` 而非 `CheckError`：這是清單內容的問題，會變成 finding。
pub fn check_relative_path(path: &str) -> std::result::Result<(), String> {
    if path.is_empty() {
        return Err("include path is empty".to_string());
    }
    if path.contains('\0') {
        return Err("include path contains null bytes".to_string());
    }
    if path.chars().any(|c| c.is_control()) {
        return Err("include path contains control characters".to_string());
    }

    // 單一字母的 scheme 視為 Windows 磁碟代號，交給下面的判斷
    if let Ok(url) = Url::parse(path) {
        if url.scheme().len() > 1 {
            return Err(format!(
                "include path is a URL ({}), expected a relative file path",
                url.scheme()
            ));
        }
    }

    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err("include path has a drive prefix".to_string());
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err("include path is absolute".to_string());
    }
    if path.ends_with('/') || path.ends_with('\\') {
        return Err("include path names a directory".to_string());
    }
    if !Path::new(path)
        .components()
        .any(|c| matches!(c, Component::Normal(_)))
    {
        return Err("include path has no file name".to_string());
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(CheckError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CheckError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(CheckError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("manifest", "requirements.txt").is_ok());
        assert!(validate_path("manifest", "").is_err());
        assert!(validate_path("manifest", "bad\0path").is_err());
    }

    #[test]
    fn test_check_relative_path_accepts_plain_relatives() {
        assert!(check_relative_path("requirements.txt").is_ok());
        assert!(check_relative_path("requirements/base.txt").is_ok());
        assert!(check_relative_path("../shared/requirements-dev.txt").is_ok());
        assert!(check_relative_path("./base.txt").is_ok());
    }

    #[test]
    fn test_check_relative_path_rejects_bad_targets() {
        assert!(check_relative_path("").is_err());
        assert!(check_relative_path("/etc/requirements.txt").is_err());
        assert!(check_relative_path("C:\\reqs\\base.txt").is_err());
        assert!(check_relative_path("https://example.com/requirements.txt").is_err());
        assert!(check_relative_path("requirements/").is_err());
        assert!(check_relative_path("..").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("check.max_depth", 5, 1).is_ok());
        assert!(validate_positive_number("check.max_depth", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("check.max_depth", 16, 1, 256).is_ok());
        assert!(validate_range("check.max_depth", 1000, 1, 256).is_err());
    }
}
