use std::path::{Component, Path, PathBuf};

/// Truncates `text` to at most `maxlength` characters, appending `...` when
/// truncation happens.
pub fn ellipsis(text: &str, maxlength: usize) -> String {
    if text.chars().count() <= maxlength {
        return text.to_string();
    }
    let keep = maxlength.saturating_sub(3);
    let truncated: String = text.chars().take(keep).collect();
    format!("{}...", truncated)
}

/// Extracts the filesystem path component out of a `:pserver:` / `:ext:` /
/// bare CVSROOT string, e.g. `:pserver:anon@cvs.example.com:/cvsroot` ->
/// `/cvsroot`.
pub fn get_repo_path(cvsroot: &str) -> String {
    let last = cvsroot.rsplit(':').next().unwrap_or("");
    let start = last.find('@').unwrap_or(0);
    match last[start..].find('/') {
        Some(pos) => last[start + pos..].to_string(),
        None => String::new(),
    }
}

pub(crate) fn normalize_unix_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                _ if !absolute => stack.push(".."),
                _ => {}
            },
            other => stack.push(other),
        }
    }
    let joined = stack.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Builds the repository-relative path prefix to strip from `RCS file:`
/// headers emitted by `cvs rlog`, given the `-d` root (if any) and the
/// repository path CVS reports alongside it.
pub fn build_prefix(root: &str, repository: &str) -> String {
    let repository = normalize_unix_path(repository);
    let repository = if repository == "." {
        String::new()
    } else {
        repository
    };
    let prefix = if !root.is_empty() {
        let path = normalize_unix_path(&get_repo_path(root));
        if !repository.is_empty() {
            format!("{}/{}", path.trim_end_matches('/'), repository)
        } else {
            path
        }
    } else {
        repository
    };
    format!("{}/", prefix)
}

/// Strips every `Attic/` path component, wherever it appears.
pub fn rcs_path(path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in Path::new(path).components() {
        if let Component::Normal(c) = comp {
            if c == "Attic" {
                continue;
            }
        }
        out.push(comp.as_os_str());
    }
    out
}
