use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 版本比較運算子（只有 `==` 算是釘選）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Exact,
    #[serde(rename = "===")]
    Arbitrary,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "~=")]
    Compatible,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "@")]
    DirectReference,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Exact => "==",
            Operator::Arbitrary => "===",
            Operator::AtLeast => ">=",
            Operator::AtMost => "<=",
            Operator::Compatible => "~=",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::DirectReference => "@",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析後的需求敘述，例如 `httpx[http2]==0.27.0 ; python_version >= "3.8"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    /// `None` 表示完全沒有版本限定
    pub operator: Option<Operator>,
    pub version: Option<String>,
    pub marker: Option<String>,
}

impl Requirement {
    /// 是否為 `<identifier>==<version>` 形式的精確釘選
    pub fn is_pinned(&self) -> bool {
        self.operator == Some(Operator::Exact) && self.version.is_some()
    }
}

/// 一筆宣告（啟用或停用），附帶來源位置與分類
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub normalized_name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extras: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    pub location: Location,
}

impl Declaration {
    pub fn specifier(&self) -> String {
        let mut out = self.name.clone();
        if !self.extras.is_empty() {
            out.push('[');
            out.push_str(&self.extras.join(","));
            out.push(']');
        }
        out.push_str("==");
        out.push_str(&self.version);
        if let Some(marker) = &self.marker {
            out.push_str(" ; ");
            out.push_str(marker);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// 單行的分類結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// 分類標題，例如 `# Testing`
    Heading(String),
    /// 被註解掉的宣告；`Err` 帶有無法解析的原文與原因
    Deactivated {
        requirement: std::result::Result<Requirement, ParseProblem>,
        note: Option<String>,
    },
    /// 被註解掉的 `-r` / `-c`，不會被跟進
    DeactivatedDirective(String),
    Active {
        requirement: Requirement,
        comment: Option<String>,
    },
    Include(String),
    Constraint(String),
    /// 其他 `-` 開頭的選項
    Option(String),
    Invalid(ParseProblem),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseProblem {
    pub text: String,
    pub reason: String,
}

impl ParseProblem {
    pub fn new(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine {
    pub number: usize,
    pub raw: String,
    pub kind: LineKind,
    /// 這一行生效時所屬的分類標題
    pub category: Option<String>,
}

/// 一個已讀取並逐行解析的清單檔案
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub depth: usize,
    pub lines: Vec<ManifestLine>,
    /// 追蹤 `-r` 時在這個檔案上發現的問題
    pub include_issues: Vec<IncludeIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeIssue {
    pub line: usize,
    pub target: PathBuf,
    pub kind: IncludeIssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeIssueKind {
    Missing(String),
    Cycle,
    TooDeep { limit: usize },
}

impl SourceFile {
    pub fn includes(&self) -> impl Iterator<Item = (&ManifestLine, &str)> {
        self.lines.iter().filter_map(|line| match &line.kind {
            LineKind::Include(path) => Some((line, path.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    Unpinned,
    InvalidLine,
    IncludePath,
    VersionConflict,
    Duplicate,
    DeactivatedMalformed,
    UnsupportedOption,
    IncludeMissing,
    IncludeCycle,
    IncludeDepth,
}

impl RuleId {
    pub const ALL: [RuleId; 10] = [
        RuleId::Unpinned,
        RuleId::InvalidLine,
        RuleId::IncludePath,
        RuleId::VersionConflict,
        RuleId::Duplicate,
        RuleId::DeactivatedMalformed,
        RuleId::UnsupportedOption,
        RuleId::IncludeMissing,
        RuleId::IncludeCycle,
        RuleId::IncludeDepth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::Unpinned => "unpinned",
            RuleId::InvalidLine => "invalid-line",
            RuleId::IncludePath => "include-path",
            RuleId::VersionConflict => "version-conflict",
            RuleId::Duplicate => "duplicate",
            RuleId::DeactivatedMalformed => "deactivated-malformed",
            RuleId::UnsupportedOption => "unsupported-option",
            RuleId::IncludeMissing => "include-missing",
            RuleId::IncludeCycle => "include-cycle",
            RuleId::IncludeDepth => "include-depth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.as_str() == name)
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            RuleId::Duplicate | RuleId::UnsupportedOption => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: RuleId,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub files: usize,
    pub active: usize,
    pub deactivated: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

/// 一次檢查的完整結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub active: Vec<Declaration>,
    pub deactivated: Vec<Declaration>,
    pub findings: Vec<Finding>,
    pub summary: ReportSummary,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn exit_status(&self) -> i32 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }
}

/// 報告輸出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!(
                "Unsupported format '{}'. Valid formats: text, json, csv",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_names_round_trip_through_from_name() {
        for rule in RuleId::ALL {
            assert_eq!(RuleId::from_name(rule.as_str()), Some(rule));
        }
        assert_eq!(RuleId::from_name("no-such-rule"), None);
    }

    #[test]
    fn test_declaration_spec_includes_extras_and_marker() {
        let decl = Declaration {
            name: "httpx".to_string(),
            normalized_name: "httpx".to_string(),
            version: "0.27.0".to_string(),
            extras: vec!["http2".to_string()],
            marker: Some("python_version >= \"3.8\"".to_string()),
            category: None,
            note: None,
            location: Location::new("requirements.txt", 3),
        };
        assert_eq!(decl.specifier(), "httpx[http2]==0.27.0 ; python_version >= \"3.8\"");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("txt".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
