//! Groups the [`cvsps_log::LogEntry`] records from the log-parsing stage
//! into [`Changeset`]s: CVS commits one file at a time, so entries from the
//! same logical commit have to be recovered by author/comment/branch/time
//! proximity (or a shared `commitid`, when the server provides one) and then
//! linked into a parent graph.

mod model;
mod synth;

pub use model::Changeset;
pub use synth::{synthesize, DEFAULT_MERGEFROM, DEFAULT_MERGETO};

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    use cvsps_log::{LogEntry, Revision};

    use super::*;

    fn entry(
        file: &str,
        rev: &str,
        author: &str,
        comment: &str,
        date: (i64, i32),
        branch: Option<&str>,
    ) -> LogEntry {
        LogEntry {
            rcs: PathBuf::from(format!("{}-rcs", file)),
            file: PathBuf::from(file),
            revision: Revision::parse(rev).unwrap(),
            branch: branch.map(Arc::from),
            branches: Vec::new(),
            branchpoints: BTreeSet::new(),
            parent: None,
            date,
            author: Arc::from(author),
            dead: false,
            comment: Arc::from(comment),
            commitid: None,
            mergepoint: None,
            lines: None,
            tags: Vec::new(),
            synthetic: false,
        }
    }

    #[test]
    fn single_trunk_commit_becomes_one_changeset() {
        let log = vec![entry("a.txt", "1.1", "alice", "initial", (1000, 0), None)];
        let changesets = synthesize(log, 300, None, None);
        assert_eq!(changesets.len(), 1);
        assert_eq!(changesets[0].id, Some(1));
        assert_eq!(changesets[0].entries.len(), 1);
    }

    #[test]
    fn two_files_within_fuzz_window_group_together() {
        let log = vec![
            entry("a.txt", "1.1", "alice", "commit", (1000, 0), None),
            entry("b.txt", "1.1", "alice", "commit", (1010, 0), None),
        ];
        let changesets = synthesize(log, 300, None, None);
        assert_eq!(changesets.len(), 1);
        assert_eq!(changesets[0].entries.len(), 2);
    }

    #[test]
    fn commit_outside_fuzz_window_splits() {
        let log = vec![
            entry("a.txt", "1.1", "alice", "commit", (1000, 0), None),
            entry("b.txt", "1.1", "alice", "commit", (2000, 0), None),
        ];
        let changesets = synthesize(log, 300, None, None);
        assert_eq!(changesets.len(), 2);
    }

    #[test]
    fn different_branch_never_covers() {
        let log = vec![
            entry("a.txt", "1.1", "alice", "commit", (1000, 0), None),
            entry("a.txt", "1.1.2.1", "alice", "commit", (1005, 0), Some("FEATURE")),
        ];
        let changesets = synthesize(log, 300, None, None);
        assert_eq!(changesets.len(), 2);
        assert_eq!(changesets[1].branch.as_deref(), Some("FEATURE"));
    }

    #[test]
    fn synthetic_branch_add_is_dropped() {
        let mut added = entry(
            "a.txt",
            "1.1",
            "alice",
            "file a.txt was added on branch FEATURE",
            (1000, 0),
            Some("FEATURE"),
        );
        added.synthetic = true;
        let log = vec![added, entry("a.txt", "1.2", "alice", "real change", (2000, 0), Some("FEATURE"))];
        let changesets = synthesize(log, 300, None, None);
        assert_eq!(changesets.len(), 1);
        assert!(!changesets[0].synthetic);
    }

    #[test]
    fn same_file_twice_never_joins_one_changeset() {
        let log = vec![
            entry("a.txt", "1.1", "alice", "commit", (1000, 0), None),
            entry("a.txt", "1.2", "alice", "commit", (1010, 0), None),
        ];
        let changesets = synthesize(log, 300, None, None);
        assert_eq!(changesets.len(), 2);
    }

    #[test]
    fn commitid_groups_override_comment_and_time() {
        let mut a = entry("a.txt", "1.1", "alice", "commit", (1000, 0), None);
        a.commitid = Some(Arc::from("abc123"));
        let mut b = entry("b.txt", "1.1", "alice", "commit", (5000, 0), None);
        b.commitid = Some(Arc::from("abc123"));
        let changesets = synthesize(vec![a, b], 300, None, None);
        assert_eq!(changesets.len(), 1);
    }

    #[test]
    fn mergeto_marker_inserts_synthetic_merge_changeset() {
        let trunk = entry("a.txt", "1.1", "alice", "base", (1000, 0), None);
        let branch_commit = entry(
            "a.txt",
            "1.1.2.1",
            "alice",
            "work {{mergetobranch HEAD}}",
            (2000, 0),
            Some("FEATURE"),
        );
        let changesets = synthesize(vec![trunk, branch_commit], 300, None, None);
        assert!(changesets.iter().any(|c| c.comment.contains("convert-repo: CVS merge from branch")));
    }

    #[test]
    fn tags_are_assigned_to_last_changeset_only() {
        let mut first = entry("a.txt", "1.1", "alice", "base", (1000, 0), None);
        first.tags = vec![Arc::from("REL_1")];
        let mut second = entry("b.txt", "1.1", "bob", "other", (5000, 0), None);
        second.tags = vec![Arc::from("REL_1")];
        let changesets = synthesize(vec![first, second], 300, None, None);
        assert!(changesets[0].tags.is_empty());
        assert_eq!(changesets[1].tags, vec![Arc::<str>::from("REL_1")]);
    }
}
