use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Derives the on-disk cache filename for a `(root, directory)` pair.
///
/// CVSROOT strings can contain slashes, colons, and `@` signs; this keeps
/// only alphanumeric runs (joined with `-` within each `root`/`directory`
/// component, then `.` between components) so that e.g.
/// `:pserver:user@server:/path` and `/pserver/user/server/path` map to
/// different filenames instead of colliding.
pub fn cache_filename(root: &str, directory: &str) -> String {
    let mut parts: Vec<String> = root.split(':').map(str::to_string).collect();
    parts.push(directory.to_string());
    parts.push("cache".to_string());

    parts
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| WORD_RE.find_iter(&s).map(|m| m.as_str()).collect::<Vec<_>>().join("-"))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pserver_root_and_plain_path_do_not_collide() {
        let a = cache_filename(":pserver:user@server:/path", "module");
        let b = cache_filename("/pserver/user/server/path", "module");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_root_drops_empty_components() {
        let name = cache_filename("", "module");
        assert_eq!(name, "module.cache");
    }

    #[test]
    fn pserver_root_keeps_alphanumeric_runs() {
        let name = cache_filename(":pserver:anon@cvs.example.com:/cvsroot", "mod/ule");
        assert_eq!(name, "pserver.anon-cvs-example-com.cvsroot.mod-ule.cache");
    }
}
