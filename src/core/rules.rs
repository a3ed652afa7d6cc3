use crate::core::parser::{is_valid_version, normalize_name, normalize_version};
use crate::domain::model::{
    Declaration, Finding, IncludeIssueKind, LineKind, Location, ManifestLine, Requirement,
    RuleId, Severity, SourceFile,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::validation::check_relative_path;
use std::collections::HashMap;

/// 每條規則的嚴重度；`None` 代表關閉
#[derive(Debug, Clone)]
pub struct RuleSet {
    severities: HashMap<RuleId, Option<Severity>>,
    strict: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        let severities = RuleId::ALL
            .into_iter()
            .map(|rule| (rule, Some(rule.default_severity())))
            .collect();
        Self {
            severities,
            strict: false,
        }
    }
}

impl RuleSet {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        let severities = RuleId::ALL
            .into_iter()
            .map(|rule| (rule, config.rule_severity(rule)))
            .collect();
        Self {
            severities,
            strict: config.strict(),
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_severity(mut self, rule: RuleId, severity: Option<Severity>) -> Self {
        self.severities.insert(rule, severity);
        self
    }

    /// strict 模式下 warning 升級為 error
    pub fn severity(&self, rule: RuleId) -> Option<Severity> {
        let severity = self
            .severities
            .get(&rule)
            .copied()
            .unwrap_or(Some(rule.default_severity()))?;
        if self.strict && severity == Severity::Warning {
            Some(Severity::Error)
        } else {
            Some(severity)
        }
    }
}

/// 規則檢查的產出
#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub findings: Vec<Finding>,
    /// 依出現順序排列的啟用宣告（含重複）
    pub active: Vec<Declaration>,
    pub deactivated: Vec<Declaration>,
}

struct Checker<'a> {
    rules: &'a RuleSet,
    outcome: CheckOutcome,
}

impl<'a> Checker<'a> {
    fn report(&mut self, rule: RuleId, location: Location, message: String) {
        if let Some(severity) = self.rules.severity(rule) {
            self.outcome.findings.push(Finding {
                rule,
                severity,
                location,
                message,
            });
        }
    }

    /// 檢查是否為 `<identifier>==<version>`；回傳失敗原因
    fn pin_problem(requirement: &Requirement) -> Option<String> {
        match (&requirement.operator, &requirement.version) {
            (None, _) => Some(format!("'{}' has no version pin", requirement.name)),
            (Some(op), Some(version)) if !requirement.is_pinned() => Some(format!(
                "'{}{}{}' is not an exact '==' pin",
                requirement.name, op, version
            )),
            (_, Some(version)) if !is_valid_version(version) => Some(format!(
                "'{}' is pinned to '{}', which is not a valid version",
                requirement.name, version
            )),
            (_, None) => Some(format!("'{}' has no version", requirement.name)),
            _ => None,
        }
    }

    fn declaration(
        requirement: &Requirement,
        line: &ManifestLine,
        file: &SourceFile,
        note: Option<String>,
    ) -> Declaration {
        Declaration {
            name: requirement.name.clone(),
            normalized_name: normalize_name(&requirement.name),
            version: requirement.version.clone().unwrap_or_default(),
            extras: requirement.extras.clone(),
            marker: requirement.marker.clone(),
            category: line.category.clone(),
            note,
            location: Location::new(&file.path, line.number),
        }
    }

    fn check_line(&mut self, file: &SourceFile, line: &ManifestLine) {
        let location = Location::new(&file.path, line.number);

        match &line.kind {
            LineKind::Blank | LineKind::Heading(_) | LineKind::DeactivatedDirective(_) => {}
            LineKind::Active {
                requirement,
                comment,
            } => match Self::pin_problem(requirement) {
                Some(problem) => self.report(RuleId::Unpinned, location, problem),
                None => {
                    let decl = Self::declaration(requirement, line, file, comment.clone());
                    self.outcome.active.push(decl);
                }
            },
            LineKind::Invalid(problem) => self.report(
                RuleId::InvalidLine,
                location,
                format!("cannot parse '{}': {}", problem.text, problem.reason),
            ),
            LineKind::Include(path) | LineKind::Constraint(path) => {
                if let Err(reason) = check_relative_path(path) {
                    let flag = if matches!(line.kind, LineKind::Include(_)) {
                        "-r"
                    } else {
                        "-c"
                    };
                    self.report(
                        RuleId::IncludePath,
                        location,
                        format!("'{} {}': {}", flag, path, reason),
                    );
                }
            }
            LineKind::Option(text) => self.report(
                RuleId::UnsupportedOption,
                location,
                format!("option '{}' is not supported in a pinned manifest", text),
            ),
            LineKind::Deactivated { requirement, note } => match requirement {
                Ok(requirement) => match Self::pin_problem(requirement) {
                    Some(problem) => self.report(
                        RuleId::DeactivatedMalformed,
                        location,
                        format!("commented-out declaration: {}", problem),
                    ),
                    None => {
                        let decl = Self::declaration(requirement, line, file, note.clone());
                        self.outcome.deactivated.push(decl);
                    }
                },
                Err(problem) => self.report(
                    RuleId::DeactivatedMalformed,
                    location,
                    format!(
                        "commented-out declaration '{}' would not parse: {}",
                        problem.text, problem.reason
                    ),
                ),
            },
        }
    }

    fn check_include_issues(&mut self, file: &SourceFile) {
        for issue in &file.include_issues {
            let location = Location::new(&file.path, issue.line);
            let target = issue.target.display();
            match &issue.kind {
                IncludeIssueKind::Missing(reason) => self.report(
                    RuleId::IncludeMissing,
                    location,
                    format!("included manifest '{}' cannot be read: {}", target, reason),
                ),
                IncludeIssueKind::Cycle => self.report(
                    RuleId::IncludeCycle,
                    location,
                    format!("including '{}' creates a cycle", target),
                ),
                IncludeIssueKind::TooDeep { limit } => self.report(
                    RuleId::IncludeDepth,
                    location,
                    format!(
                        "including '{}' exceeds the maximum include depth of {}",
                        target, limit
                    ),
                ),
            }
        }
    }

    /// 聯集後同名（正規化後）的宣告：PEP 440 版本不同為衝突，相同為重複
    fn check_cross_file(&mut self) {
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut pending = Vec::new();

        for (idx, decl) in self.outcome.active.iter().enumerate() {
            match first_seen.get(&decl.normalized_name) {
                Some(&first_idx) => {
                    let first = &self.outcome.active[first_idx];
                    if normalize_version(&first.version) == normalize_version(&decl.version) {
                        pending.push((
                            RuleId::Duplicate,
                            decl.location.clone(),
                            format!(
                                "'{}' is already declared at {}",
                                decl.specifier(),
                                first.location
                            ),
                        ));
                    } else {
                        pending.push((
                            RuleId::VersionConflict,
                            decl.location.clone(),
                            format!(
                                "'{}' conflicts with '{}' at {}",
                                decl.specifier(),
                                first.specifier(),
                                first.location
                            ),
                        ));
                    }
                }
                None => {
                    first_seen.insert(decl.normalized_name.clone(), idx);
                }
            }
        }

        for (rule, location, message) in pending {
            self.report(rule, location, message);
        }
    }
}

/// 對整棵引用樹執行所有規則
pub fn check_files(files: &[SourceFile], rules: &RuleSet) -> CheckOutcome {
    let mut checker = Checker {
        rules,
        outcome: CheckOutcome::default(),
    };

    for file in files {
        for line in &file.lines {
            checker.check_line(file, line);
        }
        checker.check_include_issues(file);
    }
    checker.check_cross_file();

    tracing::debug!(
        "Rules produced {} findings over {} files",
        checker.outcome.findings.len(),
        files.len()
    );
    checker.outcome
}
