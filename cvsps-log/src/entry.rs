use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::revision::Revision;

/// One per-file revision record, as emitted by [`crate::parser::parse_log`].
///
/// Immutable once the parser has emitted it; the changeset synthesizer only
/// ever reads these, never mutates them. Serializable so the cache crate can
/// persist accumulated entries between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Repository-relative RCS file path (`,v` stripped, `Attic/` removed).
    pub rcs: PathBuf,
    /// Working-file path derived from `rcs`.
    pub file: PathBuf,
    pub revision: Revision,
    /// Branch name this revision lives on, absent for trunk.
    pub branch: Option<Arc<str>>,
    /// Revisions of branches that start at this revision.
    pub branches: Vec<Revision>,
    /// Names of branches whose first revision is this entry.
    pub branchpoints: BTreeSet<Arc<str>>,
    /// Preceding revision of the same file on the same branch, or the
    /// trunk point the branch sprouted from. Absent only for the very
    /// first trunk revision of a file.
    pub parent: Option<Revision>,
    pub date: (i64, i32),
    pub author: Arc<str>,
    /// True when the file is in CVS's "dead" state on this branch.
    pub dead: bool,
    pub comment: Arc<str>,
    pub commitid: Option<Arc<str>>,
    /// Branch this revision was merged from (CVSNT extension).
    pub mergepoint: Option<Arc<str>>,
    pub lines: Option<(u32, u32)>,
    pub tags: Vec<Arc<str>>,
    /// True for a CVS-generated placeholder ("file X was added on branch
    /// Y"); dropped by the changeset synthesizer.
    pub synthetic: bool,
}

impl LogEntry {
    /// Whether this entry matches the boilerplate CVS emits for a file
    /// added directly on a branch: dead, last revision component 1, and a
    /// single-line comment matching the synthetic pattern.
    pub fn looks_synthetic(dead: bool, revision: &Revision, comment_lines: &[String]) -> bool {
        dead
            && revision.0.last() == Some(&1)
            && comment_lines.len() == 1
            && crate::parser::FILE_ADDED_RE.is_match(&comment_lines[0])
    }
}
