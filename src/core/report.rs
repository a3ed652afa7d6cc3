use crate::core::rules::CheckOutcome;
use crate::domain::model::{
    Declaration, OutputFormat, Report, ReportSummary, Severity, SourceFile,
};
use crate::utils::error::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

pub fn build_report(root: &Path, files: &[SourceFile], outcome: CheckOutcome) -> Report {
    let CheckOutcome {
        mut findings,
        active,
        deactivated,
    } = outcome;

    // 聯集：同名只留第一筆，依正規化名稱排序
    let mut union: BTreeMap<String, Declaration> = BTreeMap::new();
    for decl in active {
        union.entry(decl.normalized_name.clone()).or_insert(decl);
    }
    let active: Vec<Declaration> = union.into_values().collect();

    findings.sort_by(|a, b| {
        let file_order = |path: &Path| files.iter().position(|f| f.path == path);
        file_order(&a.location.file)
            .cmp(&file_order(&b.location.file))
            .then(a.location.line.cmp(&b.location.line))
    });

    let count = |severity: Severity| findings.iter().filter(|f| f.severity == severity).count();
    let summary = ReportSummary {
        files: files.len(),
        active: active.len(),
        deactivated: deactivated.len(),
        errors: count(Severity::Error),
        warnings: count(Severity::Warning),
        infos: count(Severity::Info),
    };

    Report {
        root: root.to_path_buf(),
        files: files.iter().map(|f| f.path.clone()).collect(),
        active,
        deactivated,
        findings,
        summary,
        generated_at: Utc::now(),
    }
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    for finding in &report.findings {
        let _ = writeln!(
            out,
            "{}: {} [{}] {}",
            finding.location, finding.severity, finding.rule, finding.message
        );
    }
    if !report.findings.is_empty() {
        out.push('\n');
    }

    let s = &report.summary;
    let _ = writeln!(
        out,
        "Checked {} file(s): {} active, {} deactivated declaration(s)",
        s.files, s.active, s.deactivated
    );
    let _ = writeln!(
        out,
        "{} error(s), {} warning(s), {} info",
        s.errors, s.warnings, s.infos
    );
    out
}

pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_csv(report: &Report) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["severity", "rule", "file", "line", "message"])?;
    for finding in &report.findings {
        writer.write_record([
            finding.severity.to_string(),
            finding.rule.to_string(),
            finding.location.file.display().to_string(),
            finding.location.line.to_string(),
            finding.message.clone(),
        ])?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| crate::utils::error::CheckError::IoError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Csv => render_csv(report),
    }
}

/// `list` 指令的輸出：啟用宣告的 `name==version`，可選擇附上停用宣告
pub fn render_listing(report: &Report, include_deactivated: bool) -> String {
    let mut out = String::new();
    for decl in &report.active {
        let _ = writeln!(out, "{}", decl.specifier());
    }

    if include_deactivated && !report.deactivated.is_empty() {
        let mut current: Option<&str> = None;
        for decl in &report.deactivated {
            let category = decl.category.as_deref();
            if category != current {
                out.push('\n');
                if let Some(heading) = category {
                    let _ = writeln!(out, "# {}", heading);
                }
                current = category;
            }
            match &decl.note {
                Some(note) => {
                    let _ = writeln!(out, "# {}  # {}", decl.specifier(), note);
                }
                None => {
                    let _ = writeln!(out, "# {}", decl.specifier());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_manifest;
    use crate::core::rules::{check_files, RuleSet};

    fn report_for(content: &str) -> Report {
        let files = vec![parse_manifest(Path::new("requirements-dev.txt"), 0, content)];
        let outcome = check_files(&files, &RuleSet::default());
        build_report(Path::new("requirements-dev.txt"), &files, outcome)
    }

    #[test]
    fn test_summary_and_exit_status() {
        let report = report_for("pytest==8.0.0\nhttpx>=0.27\nsix==1.16.0\nsix==1.16.0\n");
        assert_eq!(report.summary.active, 2);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.exit_status(), 1);

        let clean = report_for("pytest==8.0.0\n");
        assert_eq!(clean.exit_status(), 0);
    }

    #[test]
    fn test_active_union_is_sorted_and_deduplicated() {
        let report = report_for("pytest==8.0.0\nhttpx==0.27.0\nHTTPX==0.27.0\n");
        let names: Vec<_> = report.active.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["httpx", "pytest"]);
    }

    #[test]
    fn test_render_text_lists_findings_with_locations() {
        let text = render_text(&report_for("pytest>=8\n"));
        assert!(text.contains("requirements-dev.txt:1: error [unpinned]"));
        assert!(text.contains("1 error(s), 0 warning(s)"));
    }

    #[test]
    fn test_render_csv_has_header_and_rows() {
        let csv = render_csv(&report_for("pytest>=8\n-e .\n")).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "severity,rule,file,line,message");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("warning,unsupported-option,requirements-dev.txt,2,"));
    }

    #[test]
    fn test_render_json_is_parseable() {
        let json = render_json(&report_for("pytest==8.0.0\n")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["active"][0]["name"], "pytest");
        assert_eq!(value["summary"]["errors"], 0);
    }

    #[test]
    fn test_render_listing_groups_deactivated_by_category() {
        let report = report_for(concat!(
            "# Testing\npytest==8.0.0\n",
            "# Code Quality\n# black==24.1.1  # formatter\n",
            "# Documentation\n# mkdocs==1.5.3\n",
        ));
        let listing = render_listing(&report, true);
        assert_eq!(
            listing,
            concat!(
                "pytest==8.0.0\n\n",
                "# Code Quality\n# black==24.1.1  # formatter\n\n",
                "# Documentation\n# mkdocs==1.5.3\n",
            )
        );
        assert_eq!(render_listing(&report, false), "pytest==8.0.0\n");
    }
}
