use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use cvsps_log::{LogEntry, Revision};

/// A reconstructed commit: one or more [`LogEntry`] records from different
/// files that were committed together.
///
/// `parents` holds indices into the `Vec<Changeset>` the synthesizer
/// returns, not direct references; the graph is built before final
/// numbering, and indices are stable under the synthetic-merge insertion
/// the synthesizer performs (see `synth::synthesize`).
#[derive(Debug, Clone)]
pub struct Changeset {
    /// 1-based, assigned after synthetic changesets are dropped. `None`
    /// until numbering runs.
    pub id: Option<usize>,
    pub author: Arc<str>,
    pub branch: Option<Arc<str>>,
    pub comment: Arc<str>,
    pub date: (i64, i32),
    pub commitid: Option<Arc<str>>,
    pub branchpoints: BTreeSet<Arc<str>>,
    pub mergepoint: Option<Arc<str>>,
    pub entries: Vec<LogEntry>,
    pub parents: Vec<usize>,
    pub tags: Vec<Arc<str>>,
    pub synthetic: bool,
    /// Stable identity assigned once, before the ordering sort, so that
    /// `cscmp` can record a cycle by an identifier that survives both that
    /// sort and the later synthetic-changeset removal.
    pub(crate) seq: usize,
    files: BTreeSet<PathBuf>,
    versions: BTreeSet<(PathBuf, Revision)>,
}

impl Changeset {
    fn new(
        author: Arc<str>,
        branch: Option<Arc<str>>,
        comment: Arc<str>,
        date: (i64, i32),
        commitid: Option<Arc<str>>,
        branchpoints: BTreeSet<Arc<str>>,
        mergepoint: Option<Arc<str>>,
    ) -> Self {
        Changeset {
            id: None,
            author,
            branch,
            comment,
            date,
            commitid,
            branchpoints,
            mergepoint,
            entries: Vec::new(),
            parents: Vec::new(),
            tags: Vec::new(),
            synthetic: false,
            seq: 0,
            files: BTreeSet::new(),
            versions: BTreeSet::new(),
        }
    }

    pub fn from_log_entry(entry: LogEntry) -> Self {
        let mut cs = Changeset::new(
            entry.author.clone(),
            entry.branch.clone(),
            entry.comment.clone(),
            entry.date,
            entry.commitid.clone(),
            entry.branchpoints.clone(),
            entry.mergepoint.clone(),
        );
        cs.add(entry);
        cs
    }

    /// Builds the synthetic two-parent changeset `{{mergetobranch}}`
    /// inserts between `from` and `to`. `from_index`/`to_index` are the
    /// parent indices to record (captured before insertion, since the
    /// insertion point is always after both).
    pub fn from_merge(from: &Changeset, to: &Changeset, from_index: usize, to_index: usize) -> Self {
        let from_branch_label = from.branch.as_deref().unwrap_or("HEAD");
        let mut cs = Changeset::new(
            from.author.clone(),
            to.branch.clone(),
            Arc::from(format!("convert-repo: CVS merge from branch {}", from_branch_label)),
            from.date,
            None,
            BTreeSet::new(),
            None,
        );
        cs.parents.push(from_index);
        cs.parents.push(to_index);
        cs
    }

    fn add(&mut self, entry: LogEntry) {
        self.synthetic = self.entries.is_empty() && entry.synthetic;
        self.date = entry.date;
        self.files.insert(entry.file.clone());
        self.versions.insert((entry.rcs.clone(), entry.revision.clone()));
        self.entries.push(entry);
    }

    fn can_cover(&self, entry: &LogEntry, fuzz: i64) -> bool {
        if entry.branchpoints != self.branchpoints {
            return false;
        }
        if self.commitid.is_some() {
            return entry.commitid == self.commitid;
        }
        entry.commitid.is_none()
            && entry.author == self.author
            && entry.branch == self.branch
            && entry.comment == self.comment
            && !self.files.contains(&entry.file)
            && {
                let lo = self.date.0 + self.date.1 as i64;
                let hi = lo + fuzz;
                let t = entry.date.0 + entry.date.1 as i64;
                lo <= t && t < hi
            }
    }

    /// Attempts to fold `entry` into this changeset. Returns `false` (and
    /// leaves `entry` untouched) when it belongs to a different changeset.
    pub fn add_entry(&mut self, entry: LogEntry, fuzz: i64) -> Result<(), LogEntry> {
        if self.can_cover(&entry, fuzz) {
            self.add(entry);
            Ok(())
        } else {
            Err(entry)
        }
    }

    /// True if any entry in `self` has `other` as its direct file-revision
    /// parent: used to detect vendor-branch/initial-commit ordering
    /// oddities during changeset sorting.
    pub fn is_child(&self, other: &Changeset) -> bool {
        self.entries
            .iter()
            .any(|e| e.parent.as_ref().map_or(false, |p| other.versions.contains(&(e.rcs.clone(), p.clone()))))
    }
}
