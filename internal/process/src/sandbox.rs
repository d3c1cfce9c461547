use std::path::Path;

use crate::error::Error;

/// Repository directory and CVSROOT recovered from a CVS working copy's
/// `CVS/Repository` and `CVS/Root` files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    pub directory: String,
    pub root: Option<String>,
}

/// Reads `CVS/Repository` (required) and `CVS/Root` (optional, falls back to
/// the `CVSROOT` environment variable at the call site) beneath `base`.
pub fn detect(base: &Path) -> Result<Sandbox, Error> {
    let directory = std::fs::read_to_string(base.join("CVS").join("Repository"))
        .map_err(|_| Error::NotASandbox)?
        .trim()
        .to_string();

    let root = std::fs::read_to_string(base.join("CVS").join("Root"))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(Sandbox { directory, root })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_repository_and_root() {
        let dir = tempfile::tempdir().unwrap();
        let cvs = dir.path().join("CVS");
        std::fs::create_dir(&cvs).unwrap();
        std::fs::write(cvs.join("Repository"), "module/sub\n").unwrap();
        std::fs::write(cvs.join("Root"), ":pserver:anon@cvs.example.com:/cvsroot\n").unwrap();

        let sandbox = detect(dir.path()).unwrap();
        assert_eq!(sandbox.directory, "module/sub");
        assert_eq!(sandbox.root.as_deref(), Some(":pserver:anon@cvs.example.com:/cvsroot"));
    }

    #[test]
    fn missing_repository_file_is_not_a_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(detect(dir.path()), Err(Error::NotASandbox)));
    }

    #[test]
    fn missing_root_file_falls_back_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let cvs = dir.path().join("CVS");
        std::fs::create_dir(&cvs).unwrap();
        std::fs::write(cvs.join("Repository"), "module\n").unwrap();

        let sandbox = detect(dir.path()).unwrap();
        assert_eq!(sandbox.root, None);
    }
}
