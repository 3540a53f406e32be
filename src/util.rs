use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

/// Longest prefix of `text` within `max_bytes`, cut on a char boundary.
pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Regular files below `root`, sorted. A missing root yields no files.
pub fn collect_files_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.exists() {
        walk_files(root, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn walk_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    for entry in entries {
        let path = entry.with_context(|| format!("read entry in {}", dir.display()))?.path();
        if path.is_dir() {
            walk_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// `/`-joined form of a path below `root`, matching fixture path spelling.
pub fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("strip {} from {}", root.display(), path.display()))?;
    let segments: Vec<String> = rel
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    Ok(segments.join("/"))
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context("serialize JSON")?;
    text.push('\n');
    write_text(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_string("héllo", 2), "h");
        assert_eq!(truncate_string("héllo", 3), "hé");
        assert_eq!(truncate_string("short", 64), "short");
    }

    #[test]
    fn relative_keys_use_forward_slashes() {
        let root = Path::new("/tmp/out");
        let path = root.join("frontend").join("src").join("App.tsx");
        assert_eq!(relative_key(root, &path).unwrap(), "frontend/src/App.tsx");
    }

    #[test]
    fn collects_nested_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_text(&dir.path().join("b/inner.txt"), "b").unwrap();
        write_text(&dir.path().join("a.txt"), "a").unwrap();
        let files = collect_files_recursive(dir.path()).unwrap();
        let keys: Vec<String> = files
            .iter()
            .map(|file| relative_key(dir.path(), file).unwrap())
            .collect();
        assert_eq!(keys, vec!["a.txt", "b/inner.txt"]);
    }
}
