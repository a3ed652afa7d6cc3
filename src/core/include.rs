use crate::core::parser::parse_manifest;
use crate::domain::model::{IncludeIssue, IncludeIssueKind, SourceFile};
use crate::domain::ports::Storage;
use crate::utils::error::{CheckError, Result};
use crate::utils::validation::check_relative_path;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_MAX_DEPTH: usize = 16;

/// 只做字面上的 `.` / `..` 化簡，不碰檔案系統
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal =
                    matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else if !matches!(out.components().next_back(), Some(Component::RootDir)) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// 相對路徑以「引用它的檔案所在目錄」為基準
pub fn resolve_include(including_file: &Path, raw_path: &str) -> PathBuf {
    let base = including_file.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&base.join(raw_path))
}

struct Frame {
    file: usize,
    includes: Vec<(usize, String)>,
    cursor: usize,
}

/// 以深度優先順序讀取根清單與所有 `-r` 引用的清單
pub struct IncludeWalker<'a, S: Storage> {
    storage: &'a S,
    max_depth: usize,
}

impl<'a, S: Storage> IncludeWalker<'a, S> {
    pub fn new(storage: &'a S, max_depth: usize) -> Self {
        Self { storage, max_depth }
    }

    async fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = self.storage.read_file(&path.to_string_lossy()).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn frame_for(files: &[SourceFile], index: usize) -> Frame {
        let includes = files[index]
            .includes()
            .map(|(line, raw)| (line.number, raw.to_string()))
            .collect();
        Frame {
            file: index,
            includes,
            cursor: 0,
        }
    }

    /// 根清單讀不到時回傳錯誤；被引用的清單讀不到只記成 `IncludeIssue`
    pub async fn walk(&self, root: &Path) -> Result<Vec<SourceFile>> {
        let root = normalize_path(root);
        let content = self.read_text(&root).await.map_err(|e| {
            tracing::debug!("Failed to read root manifest {}: {}", root.display(), e);
            CheckError::ManifestNotFound {
                path: root.display().to_string(),
            }
        })?;

        let mut files = vec![parse_manifest(&root, 0, &content)];
        let mut visited: HashSet<PathBuf> = HashSet::from([root.clone()]);
        let mut stack = vec![Self::frame_for(&files, 0)];

        while let Some(frame) = stack.last_mut() {
            if frame.cursor >= frame.includes.len() {
                stack.pop();
                continue;
            }
            let (line, raw) = frame.includes[frame.cursor].clone();
            frame.cursor += 1;
            let parent = frame.file;

            // 語法不合法的路徑由 include-path 規則回報，這裡不跟進
            if check_relative_path(&raw).is_err() {
                continue;
            }

            let target = resolve_include(&files[parent].path, &raw);
            let depth = files[parent].depth + 1;

            if stack.iter().any(|f| files[f.file].path == target) {
                tracing::warn!(
                    "🔁 Include cycle: {} -> {}",
                    files[parent].path.display(),
                    target.display()
                );
                files[parent].include_issues.push(IncludeIssue {
                    line,
                    target,
                    kind: IncludeIssueKind::Cycle,
                });
                continue;
            }

            if visited.contains(&target) {
                tracing::debug!("Skipping {} (already read)", target.display());
                continue;
            }

            if depth > self.max_depth {
                files[parent].include_issues.push(IncludeIssue {
                    line,
                    target,
                    kind: IncludeIssueKind::TooDeep {
                        limit: self.max_depth,
                    },
                });
                continue;
            }

            match self.read_text(&target).await {
                Ok(content) => {
                    tracing::debug!(
                        "Reading included manifest {} (depth {})",
                        target.display(),
                        depth
                    );
                    visited.insert(target.clone());
                    files.push(parse_manifest(&target, depth, &content));
                    let index = files.len() - 1;
                    stack.push(Self::frame_for(&files, index));
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Cannot read included manifest {}: {}",
                        target.display(),
                        e
                    );
                    files[parent].include_issues.push(IncludeIssue {
                        line,
                        target,
                        kind: IncludeIssueKind::Missing(e.to_string()),
                    });
                }
            }
        }

        Ok(files)
    }
}
