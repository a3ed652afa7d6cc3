//! 需求清單（`requirements*.txt`）的逐行解析。
//!
//! 每一行會被分類為空行、分類標題、停用宣告、啟用宣告、
//! `-r` / `-c` 指令、其他選項或無法解析的行。
//! 解析本身不會失敗，問題會留在 `LineKind` 裡交給規則檢查。

use crate::domain::model::{
    LineKind, ManifestLine, Operator, ParseProblem, Requirement, SourceFile,
};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)",
        r"\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<rest>.*)$",
    ))
    .expect("requirement name regex")
});

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("identifier regex")
});

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^v?(?:\d+!)?\d+(?:\.\d+)*",
        r"(?:[-_.]?(?:a|b|c|rc|alpha|beta|pre|preview)[-_.]?\d*)?",
        r"(?:-\d+|[-_.]?(?:post|rev|r)[-_.]?\d*)?",
        r"(?:[-_.]?dev[-_.]?\d*)?",
        r"(?:\+[a-z0-9]+(?:[-_.][a-z0-9]+)*)?$",
    ))
    .expect("version regex")
});

/// 看起來像宣告的註解內容：名稱後面緊接著版本運算子
static DECLARATION_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?",
        r"\s*(?:\[[^\]]*\])?\s*(?:===|==|~=|>=|<=|!=|<|>|@)",
    ))
    .expect("declaration-like regex")
});

static INLINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+#").expect("inline comment regex"));

static NORMALIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("normalize regex"));

/// PEP 503 名稱正規化：小寫，連續的 `-` `_` `.` 折成單一 `-`
pub fn normalize_name(name: &str) -> String {
    NORMALIZE_RE
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.is_match(version)
}

/// 發行號之後的 pre / post / dev 片段
static VERSION_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:[-_.]?(?P<pre>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_n>\d*))?",
        r"(?:-(?P<post_implicit>\d+)|[-_.]?(?:post|rev|r)[-_.]?(?P<post_n>\d*))?",
        r"(?:[-_.]?(?P<dev>dev)[-_.]?(?P<dev_n>\d*))?$",
    ))
    .expect("version suffix regex")
});

fn trim_number(digits: &str) -> &str {
    match digits.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    }
}

/// PEP 440 正規化，讓 `1.0` 與 `1.0.0`、`1.0a1` 與 `1.0.alpha.1` 比較時相等。
///
/// 無法辨識的版本字串只轉小寫後原樣回傳。
pub fn normalize_version(version: &str) -> String {
    let lowered = version.trim().to_ascii_lowercase();
    let unprefixed = lowered.strip_prefix('v').unwrap_or(&lowered);

    let (public, local) = match unprefixed.split_once('+') {
        Some((public, local)) => (public, Some(local.replace(['-', '_'], "."))),
        None => (unprefixed, None),
    };
    let (epoch, rest) = match public.split_once('!') {
        Some((epoch, rest)) => (Some(trim_number(epoch)), rest),
        None => (None, public),
    };

    let release_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    // 發行號結尾的 `.` 屬於後綴分隔符
    let release_text = rest[..release_end].trim_end_matches('.');
    let suffix = &rest[release_text.len()..];

    if release_text.is_empty() {
        return lowered;
    }
    let Some(caps) = VERSION_SUFFIX_RE.captures(suffix) else {
        return lowered;
    };

    let mut release: Vec<&str> = release_text.split('.').map(trim_number).collect();
    while release.len() > 1 && release.last() == Some(&"0") {
        release.pop();
    }

    let mut out = String::new();
    if let Some(epoch) = epoch.filter(|e| *e != "0") {
        out.push_str(epoch);
        out.push('!');
    }
    out.push_str(&release.join("."));

    if let Some(pre) = caps.name("pre") {
        let label = match pre.as_str() {
            "alpha" | "a" => "a",
            "beta" | "b" => "b",
            _ => "rc",
        };
        let number = caps.name("pre_n").map_or("", |m| m.as_str());
        out.push_str(label);
        out.push_str(trim_number(number));
    }

    // 群組有參與比對時即使數字為空也會是 `Some("")`
    if let Some(post) = caps.name("post_implicit").or_else(|| caps.name("post_n")) {
        out.push_str(".post");
        out.push_str(trim_number(post.as_str()));
    }

    if caps.name("dev").is_some() {
        let number = caps.name("dev_n").map_or("", |m| m.as_str());
        out.push_str(".dev");
        out.push_str(trim_number(number));
    }

    if let Some(local) = local {
        out.push('+');
        out.push_str(&local);
    }
    out
}

/// 依 ` #` 切出行內註解
fn split_inline_comment(text: &str) -> (&str, Option<String>) {
    match INLINE_COMMENT_RE.find(text) {
        Some(m) => {
            let note = text[m.end()..].trim();
            let note = (!note.is_empty()).then(|| note.to_string());
            (text[..m.start()].trim_end(), note)
        }
        None => (text, None),
    }
}

fn parse_operator(rest: &str) -> Option<(Operator, &str)> {
    // 長的運算子要先比對
    const OPERATORS: [(&str, Operator); 9] = [
        ("===", Operator::Arbitrary),
        ("==", Operator::Exact),
        ("~=", Operator::Compatible),
        (">=", Operator::AtLeast),
        ("<=", Operator::AtMost),
        ("!=", Operator::NotEqual),
        (">", Operator::Greater),
        ("<", Operator::Less),
        ("@", Operator::DirectReference),
    ];

    OPERATORS
        .iter()
        .find(|(token, _)| rest.starts_with(token))
        .map(|(token, op)| (*op, rest[token.len()..].trim()))
}

/// 解析一段需求敘述（不含行內註解）
pub fn parse_requirement(text: &str) -> std::result::Result<Requirement, ParseProblem> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseProblem::new(text, "empty requirement"));
    }

    let (spec, marker) = match text.split_once(';') {
        Some((spec, marker)) => {
            let marker = marker.trim();
            if marker.is_empty() {
                return Err(ParseProblem::new(text, "empty environment marker after ';'"));
            }
            (spec.trim(), Some(marker.to_string()))
        }
        None => (text, None),
    };

    let caps = NAME_RE
        .captures(spec)
        .ok_or_else(|| ParseProblem::new(text, "package name is not a valid identifier"))?;

    let name = caps["name"].to_string();
    let extras = match caps.name("extras") {
        Some(raw) => {
            let extras: Vec<String> = raw
                .as_str()
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            if extras.iter().any(|e| !IDENT_RE.is_match(e)) {
                return Err(ParseProblem::new(text, "extras must be identifiers"));
            }
            extras
        }
        None => Vec::new(),
    };

    let rest = caps.name("rest").map(|m| m.as_str().trim()).unwrap_or("");
    if rest.is_empty() {
        return Ok(Requirement {
            name,
            extras,
            operator: None,
            version: None,
            marker,
        });
    }

    let (operator, version) = parse_operator(rest).ok_or_else(|| {
        ParseProblem::new(
            text,
            format!("unexpected '{}' after package name", rest),
        )
    })?;

    if version.is_empty() {
        return Err(ParseProblem::new(
            text,
            format!("missing version after '{}'", operator),
        ));
    }

    Ok(Requirement {
        name,
        extras,
        operator: Some(operator),
        version: Some(version.to_string()),
        marker,
    })
}

fn looks_like_declaration(text: &str) -> bool {
    DECLARATION_LIKE_RE.is_match(text)
}

/// 回傳 `(是否為 -c, 路徑)`；不是 `-r` / `-c` 指令時回傳 `None`
fn parse_directive(text: &str) -> Option<(bool, String)> {
    const FORMS: [(&str, bool); 4] = [
        ("--requirement", false),
        ("--constraint", true),
        ("-r", false),
        ("-c", true),
    ];

    for (flag, is_constraint) in FORMS {
        let Some(rest) = text.strip_prefix(flag) else {
            continue;
        };
        // `--requirement=path`、`-r path`、`-rpath` 都合法；`--requirements` 不是
        let value = if let Some(v) = rest.strip_prefix('=') {
            v
        } else if flag.starts_with("--") {
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                continue;
            }
            rest
        } else {
            rest
        };
        let (value, _) = split_inline_comment(value.trim());
        return Some((is_constraint, value.trim().to_string()));
    }
    None
}

/// 分類單一行；`number` 從 1 開始
pub fn parse_line(raw: &str, number: usize) -> ManifestLine {
    let trimmed = raw.trim();

    let kind = if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with('#') {
        let body = trimmed.trim_start_matches('#').trim();
        if body.starts_with('-') && parse_directive(body).is_some() {
            LineKind::DeactivatedDirective(body.to_string())
        } else {
            let (decl, note) = split_inline_comment(body);
            if looks_like_declaration(decl) {
                LineKind::Deactivated {
                    requirement: parse_requirement(decl),
                    note,
                }
            } else {
                LineKind::Heading(body.to_string())
            }
        }
    } else if trimmed.starts_with('-') {
        match parse_directive(trimmed) {
            Some((false, path)) => LineKind::Include(path),
            Some((true, path)) => LineKind::Constraint(path),
            None => LineKind::Option(trimmed.to_string()),
        }
    } else {
        let (decl, comment) = split_inline_comment(trimmed);
        match parse_requirement(decl) {
            Ok(requirement) => LineKind::Active {
                requirement,
                comment,
            },
            Err(problem) => LineKind::Invalid(problem),
        }
    };

    ManifestLine {
        number,
        raw: raw.to_string(),
        kind,
        category: None,
    }
}

/// 解析整份清單內容，並記錄每行所屬的分類標題
pub fn parse_manifest(path: &Path, depth: usize, content: &str) -> SourceFile {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = Vec::new();
    let mut category: Option<String> = None;

    let mut pending: Option<(usize, String)> = None;
    for (idx, raw) in content.lines().enumerate() {
        let number = idx + 1;

        // 以 `\` 結尾的行與下一行接續，行號記在第一行
        let (start, joined) = match pending.take() {
            Some((start, mut buf)) => {
                buf.push(' ');
                buf.push_str(raw.trim());
                (start, buf)
            }
            None => (number, raw.to_string()),
        };
        if let Some(stripped) = joined.trim_end().strip_suffix('\\') {
            if !joined.trim_start().starts_with('#') {
                pending = Some((start, stripped.trim_end().to_string()));
                continue;
            }
        }

        let mut line = parse_line(&joined, start);
        if let LineKind::Heading(text) = &line.kind {
            if !text.is_empty() {
                category = Some(text.clone());
            }
        }
        line.category = category.clone();
        lines.push(line);
    }

    if let Some((start, buf)) = pending {
        let mut line = parse_line(&buf, start);
        line.category = category.clone();
        lines.push(line);
    }

    tracing::debug!("Parsed {} lines from {}", lines.len(), path.display());

    SourceFile {
        path: path.to_path_buf(),
        depth,
        lines,
        include_issues: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pinned_requirement() {
        let line = parse_line("pytest==8.0.0", 1);
        match line.kind {
            LineKind::Active { requirement, comment } => {
                assert_eq!(requirement.name, "pytest");
                assert_eq!(requirement.operator, Some(Operator::Exact));
                assert_eq!(requirement.version.as_deref(), Some("8.0.0"));
                assert!(requirement.is_pinned());
                assert!(comment.is_none());
            }
            other => panic!("expected active line, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_requirement_with_extras_marker_and_comment() {
        let line = parse_line(
            "httpx[http2, socks]==0.27.0 ; python_version >= \"3.8\"  # client",
            4,
        );
        match line.kind {
            LineKind::Active { requirement, comment } => {
                assert_eq!(requirement.extras, vec!["http2", "socks"]);
                assert_eq!(requirement.marker.as_deref(), Some("python_version >= \"3.8\""));
                assert_eq!(comment.as_deref(), Some("client"));
                assert!(requirement.is_pinned());
            }
            other => panic!("expected active line, got {:?}", other),
        }
    }

    #[test]
    fn test_unpinned_requirement_is_still_active() {
        let line = parse_line("pytest-asyncio>=0.23", 2);
        match line.kind {
            LineKind::Active { requirement, .. } => {
                assert_eq!(requirement.operator, Some(Operator::AtLeast));
                assert!(!requirement.is_pinned());
            }
            other => panic!("expected active line, got {:?}", other),
        }

        let bare = parse_line("httpx", 3);
        assert!(matches!(
            bare.kind,
            LineKind::Active { ref requirement, .. } if requirement.operator.is_none()
        ));
    }

    #[test]
    fn test_garbage_line_is_invalid() {
        assert!(matches!(parse_line("!!not a package", 1).kind, LineKind::Invalid(_)));
        assert!(matches!(parse_line("pytest == ", 1).kind, LineKind::Invalid(_)));
        assert!(matches!(parse_line("pytest 8.0", 1).kind, LineKind::Invalid(_)));
    }

    #[test]
    fn test_heading_and_deactivated_comments() {
        assert_eq!(
            parse_line("# Code Quality", 1).kind,
            LineKind::Heading("Code Quality".to_string())
        );

        match parse_line("# black==24.1.1  # formatter", 2).kind {
            LineKind::Deactivated { requirement, note } => {
                let requirement = requirement.expect("deactivated declaration parses");
                assert_eq!(requirement.name, "black");
                assert_eq!(requirement.version.as_deref(), Some("24.1.1"));
                assert_eq!(note.as_deref(), Some("formatter"));
            }
            other => panic!("expected deactivated line, got {:?}", other),
        }

        assert!(matches!(
            parse_line("#mypy>=1.8", 3).kind,
            LineKind::Deactivated { requirement: Ok(ref r), .. } if !r.is_pinned()
        ));
    }

    #[test]
    fn test_directives() {
        assert_eq!(
            parse_line("-r requirements.txt", 1).kind,
            LineKind::Include("requirements.txt".to_string())
        );
        assert_eq!(
            parse_line("--requirement=base.txt  # shared", 1).kind,
            LineKind::Include("base.txt".to_string())
        );
        assert_eq!(
            parse_line("-rbase.txt", 1).kind,
            LineKind::Include("base.txt".to_string())
        );
        assert_eq!(
            parse_line("-c constraints.txt", 1).kind,
            LineKind::Constraint("constraints.txt".to_string())
        );
        assert_eq!(parse_line("-r", 1).kind, LineKind::Include(String::new()));
        assert_eq!(
            parse_line("--index-url https://pypi.org/simple", 1).kind,
            LineKind::Option("--index-url https://pypi.org/simple".to_string())
        );
        assert!(matches!(
            parse_line("# -r dev.txt", 1).kind,
            LineKind::DeactivatedDirective(_)
        ));
    }

    #[test]
    fn test_version_grammar() {
        let valid = [
            "1", "8.0.0", "0.23.5", "1.0rc1", "2.0.post1", "1.0.dev3", "1!2.0", "1.0+local.7",
        ];
        for ok in valid {
            assert!(is_valid_version(ok), "{} should be valid", ok);
        }
        for bad in ["", "latest", "1.0.*", "1..0", "1.0 beta"] {
            assert!(!is_valid_version(bad), "{} should be invalid", bad);
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Pytest_Asyncio"), "pytest-asyncio");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("a-_.b"), "a-b");
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("1.0"), normalize_version("1.0.0"));
        assert_eq!(normalize_version("1.0.0"), "1");
        assert_eq!(normalize_version("V2.01.0"), "2.1");
        assert_eq!(normalize_version("1.0.alpha.1"), "1a1");
        assert_eq!(normalize_version("1.0-beta2"), "1b2");
        assert_eq!(normalize_version("1.0c3"), "1rc3");
        assert_eq!(normalize_version("1.0-1"), "1.post1");
        assert_eq!(normalize_version("1.0.rev"), "1.post0");
        assert_eq!(normalize_version("1.0.DEV"), "1.dev0");
        assert_eq!(normalize_version("0!1.0+Local_7"), "1+local.7");
        assert_ne!(normalize_version("1.0"), normalize_version("1.0.1"));
        assert_ne!(normalize_version("1.0"), normalize_version("1.0rc1"));
        assert_eq!(normalize_version("latest"), "latest");
    }

    #[test]
    fn test_parse_manifest_tracks_categories() {
        let content = "# Testing\npytest==8.0.0\n\n# Code Quality\n# black==24.1.1\n";
        let file = parse_manifest(Path::new("requirements-dev.txt"), 0, content);

        assert_eq!(file.lines.len(), 5);
        assert_eq!(file.lines[1].category.as_deref(), Some("Testing"));
        assert_eq!(file.lines[4].category.as_deref(), Some("Code Quality"));
        assert_eq!(file.lines[4].number, 5);
    }

    #[test]
    fn test_parse_manifest_joins_continuations() {
        let content = "pytest==\\\n    8.0.0\nhttpx==0.27.0\n";
        let file = parse_manifest(Path::new("requirements.txt"), 0, content);

        assert_eq!(file.lines.len(), 2);
        assert_eq!(file.lines[0].number, 1);
        assert!(matches!(
            file.lines[0].kind,
            LineKind::Active { ref requirement, .. }
                if requirement.version.as_deref() == Some("8.0.0")
        ));
        assert_eq!(file.lines[1].number, 3);
    }
}
