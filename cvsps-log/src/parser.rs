use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entry::LogEntry;
use crate::error::Error;
use crate::intern::Interner;
use crate::path::rcs_path;
use crate::revision::Revision;

static RE_RCS_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^RCS file: (.+)$").unwrap());
static RE_RLOG_ABORTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cvs \[r?log aborted\]: (.+)$").unwrap());
static RE_CVS_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^cvs (r?log|server): (.+)$").unwrap());
static RE_FATAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Cannot access.+CVSROOT)|(can't create temporary directory.+)$").unwrap()
});
static RE_WORKING_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Working file: (.+)$").unwrap());
static RE_SYMBOLIC_NAMES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^symbolic names:").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\t(.+): ([\d.]+)$").unwrap());
static RE_DASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^----------------------------$").unwrap());
static RE_EQUALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^=============================================================================$")
        .unwrap()
});
static RE_REVISION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^revision ([\d.]+)(\s+locked by:\s+.+;)?$").unwrap());
static RE_DATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^date:\s+(?P<date>.+);\s+author:\s+(?P<author>.+);\s+state:\s+(?P<state>.+?);",
        r"(\s+lines:\s+(?P<plus>\+\d+)?\s+(?P<minus>-\d+)?;)?",
        r"(\s+commitid:\s+(?P<commitid>[^;]+);)?",
        r"(.*mergepoint:\s+(?P<mergepoint>[^;]+);)?",
    ))
    .unwrap()
});
static RE_BRANCHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^branches: (.+);$").unwrap());

pub static FILE_ADDED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"file [^/]+ was (initially )?added on branch").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    WorkingFile,
    SymbolicNamesHeader,
    SymbolicNameEntries,
    RevisionHeader,
    RevisionMeta,
    BranchesOrMessage,
    MessageBody,
}

/// In-progress entry, collected across states `RevisionHeader` through
/// `MessageBody` before being finalized and pushed to the result log.
struct Pending {
    rcs: PathBuf,
    file: PathBuf,
    revision: Revision,
    date: (i64, i32),
    author: Arc<str>,
    dead: bool,
    lines: Option<(u32, u32)>,
    commitid: Option<Arc<str>>,
    mergepoint: Option<Arc<str>>,
    comment: Vec<String>,
    branches: Vec<Revision>,
    synthetic: bool,
}

/// Parses `cvs log`/`cvs rlog` output into [`LogEntry`] records and resolves
/// each entry's parent revision.
///
/// `oldlog` is the tail of a previously cached run (possibly empty); it is
/// consulted only to seed parent resolution across the cache boundary, it is
/// never mutated or re-emitted here.
pub fn parse_log<I>(lines: I, prefix: &str, rlog: bool, oldlog: &[LogEntry]) -> Result<Vec<LogEntry>, Error>
where
    I: IntoIterator<Item = String>,
{
    let mut lines = lines.into_iter().peekable();
    let mut interner = Interner::new();
    let mut log: Vec<LogEntry> = Vec::new();

    let mut state = State::Start;
    let mut tags: HashMap<Revision, Vec<String>> = HashMap::new();
    let mut branchmap: HashMap<String, String> = HashMap::new();

    let mut rcs = String::new();
    let mut filename = String::new();
    let mut pending: Option<Pending> = None;

    loop {
        let line = match lines.next() {
            Some(l) => l,
            None => break,
        };
        let mut store = false;

        match state {
            State::Start => {
                if let Some(caps) = RE_RCS_FILE.captures(&line) {
                    rcs = caps[1].to_string();
                    tags.clear();
                    if rlog {
                        let normalized = normpath(&strip_suffix(&rcs, ",v"));
                        if let Some(stripped) = normalized.strip_prefix(prefix) {
                            filename = rcs_path(stripped).to_string_lossy().into_owned();
                            state = State::SymbolicNamesHeader;
                        }
                        continue;
                    }
                    state = State::WorkingFile;
                    continue;
                }
                if let Some(caps) = RE_RLOG_ABORTED.captures(&line) {
                    return Err(Error::new(caps[1].to_string()));
                }
                if let Some(caps) = RE_CVS_ERROR.captures(&line) {
                    return Err(Error::new(caps[2].to_string()));
                }
                if RE_FATAL.is_match(&line) {
                    return Err(Error::new(line.clone()));
                }
            }

            State::WorkingFile => {
                let caps = RE_WORKING_FILE
                    .captures(&line)
                    .ok_or_else(|| Error::new("RCS file must be followed by working file"))?;
                filename = normpath(&caps[1]);
                state = State::SymbolicNamesHeader;
            }

            State::SymbolicNamesHeader => {
                if RE_SYMBOLIC_NAMES.is_match(&line) {
                    branchmap.clear();
                    state = State::SymbolicNameEntries;
                }
            }

            State::SymbolicNameEntries => {
                if let Some(caps) = RE_TAG.captures(&line) {
                    let name = caps[1].to_string();
                    let revstr = caps[2].to_string();
                    let mut rev = Revision::parse(&revstr)
                        .ok_or_else(|| Error::new(format!("bad tag revision: {}", revstr)))?;
                    rev = rev.collapse_magic_branch();
                    tags.entry(rev).or_default().push(name.clone());
                    branchmap.insert(name, revstr);
                } else if RE_DASHES.is_match(&line) {
                    state = State::RevisionHeader;
                } else if RE_EQUALS.is_match(&line) {
                    state = State::Start;
                }
            }

            State::RevisionHeader => {
                let caps = RE_REVISION
                    .captures(&line)
                    .ok_or_else(|| Error::new("expected revision number"))?;
                let revision = Revision::parse(&caps[1])
                    .ok_or_else(|| Error::new(format!("bad revision: {}", &caps[1])))?;
                pending = Some(Pending {
                    rcs: PathBuf::from(interner.intern(&rcs).to_string()),
                    file: PathBuf::from(interner.intern(&filename).to_string()),
                    revision,
                    date: (0, 0),
                    author: interner.intern(""),
                    dead: false,
                    lines: None,
                    commitid: None,
                    mergepoint: None,
                    comment: Vec::new(),
                    branches: Vec::new(),
                    synthetic: false,
                });
                state = State::RevisionMeta;
            }

            State::RevisionMeta => {
                let caps = RE_DATE_LINE
                    .captures(&line)
                    .ok_or_else(|| Error::new("revision must be followed by date line"))?;
                let e = pending.as_mut().expect("entry scaffolded in RevisionHeader");

                let mut d = caps["date"].to_string();
                if d.as_bytes().get(2) == Some(&b'/') {
                    d = format!("19{}", d);
                }
                if d.split_whitespace().count() != 3 {
                    d.push_str(" UTC");
                }
                e.date = cvsps_dateutil::parse_date(
                    &d,
                    &["%y/%m/%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"],
                )
                .map_err(|err| Error::new(err.to_string()))?;
                e.author = interner.intern(&caps["author"]);
                e.dead = caps["state"].eq_ignore_ascii_case("dead");

                e.lines = match (caps.name("plus"), caps.name("minus")) {
                    (Some(p), Some(m)) => Some((parse_signed(p.as_str()), parse_signed(m.as_str()))),
                    (Some(p), None) => Some((parse_signed(p.as_str()), 0)),
                    (None, Some(m)) => Some((0, parse_signed(m.as_str()))),
                    (None, None) => None,
                };

                if let Some(commitid) = caps.name("commitid") {
                    e.commitid = Some(interner.intern(commitid.as_str()));
                }

                if let Some(mergepoint) = caps.name("mergepoint") {
                    let parts: Vec<&str> = mergepoint.as_str().split('.').collect();
                    if parts.len() == 2 {
                        e.mergepoint = Some(interner.intern("HEAD"));
                    } else {
                        let mut myrev: Vec<&str> = parts[..parts.len() - 2].to_vec();
                        myrev.push("0");
                        myrev.push(parts[parts.len() - 2]);
                        let myrev = myrev.join(".");
                        let matches: Vec<&String> = branchmap
                            .iter()
                            .filter(|(_, v)| **v == myrev)
                            .map(|(k, _)| k)
                            .collect();
                        if matches.len() != 1 {
                            return Err(Error::new(format!("unknown branch: {}", mergepoint.as_str())));
                        }
                        e.mergepoint = Some(interner.intern(matches[0]));
                    }
                }

                state = State::BranchesOrMessage;
            }

            State::BranchesOrMessage => {
                if let Some(caps) = RE_BRANCHES.captures(&line) {
                    let mut branches = Vec::new();
                    for part in caps[1].split(';') {
                        let part = part.trim();
                        if part.is_empty() {
                            continue;
                        }
                        branches.push(
                            Revision::parse(part)
                                .ok_or_else(|| Error::new(format!("bad branch revision: {}", part)))?,
                        );
                    }
                    pending.as_mut().unwrap().branches = branches;
                    state = State::MessageBody;
                } else if RE_DASHES.is_match(&line) && lines.peek().map_or(false, |p| RE_REVISION.is_match(p)) {
                    state = State::RevisionHeader;
                    store = true;
                } else if RE_EQUALS.is_match(&line) {
                    state = State::Start;
                    store = true;
                } else {
                    pending.as_mut().unwrap().comment.push(line.clone());
                }
            }

            State::MessageBody => {
                if RE_DASHES.is_match(&line) {
                    let next_is_revision = lines.peek().map_or(false, |p| RE_REVISION.is_match(p));
                    if next_is_revision {
                        state = State::RevisionHeader;
                        store = true;
                    } else {
                        pending.as_mut().unwrap().comment.push(line.clone());
                    }
                } else if RE_EQUALS.is_match(&line) {
                    state = State::Start;
                    store = true;
                } else {
                    pending.as_mut().unwrap().comment.push(line.clone());
                }
            }
        }

        if store {
            let mut e = pending.take().expect("store set only once an entry is scaffolded");

            if LogEntry::looks_synthetic(e.dead, &e.revision, &e.comment) {
                e.synthetic = true;
            }

            let mut entry_tags: Vec<Arc<str>> = tags
                .get(&e.revision)
                .into_iter()
                .flatten()
                .map(|t| interner.intern(t))
                .collect();
            entry_tags.sort();

            let revn = e.revision.len();
            let branch = if revn > 3 && revn % 2 == 0 {
                tags.get(&e.revision.branch_prefix())
                    .and_then(|names| names.first())
                    .map(|n| interner.intern(n))
            } else {
                None
            };

            let mut branchpoints = std::collections::BTreeSet::new();
            for (branch_name, revstr) in &branchmap {
                let revparts = match Revision::parse(revstr) {
                    Some(r) => r,
                    None => continue,
                };
                if revparts.len() < 2 {
                    continue;
                }
                if revparts.is_normal_branch_number() {
                    if revparts.branch_root() == e.revision {
                        branchpoints.insert(interner.intern(branch_name));
                    }
                } else if revparts.is_vendor_branch_marker() && e.branches.contains(&revparts) {
                    branchpoints.insert(interner.intern(branch_name));
                }
            }

            log.push(LogEntry {
                rcs: e.rcs,
                file: e.file,
                revision: e.revision,
                branch,
                branches: e.branches,
                branchpoints,
                parent: None,
                date: e.date,
                author: e.author,
                dead: e.dead,
                comment: interner.intern(&e.comment.join("\n")),
                commitid: e.commitid,
                mergepoint: e.mergepoint,
                lines: e.lines,
                tags: entry_tags,
                synthetic: e.synthetic,
            });
        }
    }

    log.sort_by(|a, b| (&a.rcs, &a.revision).cmp(&(&b.rcs, &b.revision)));
    resolve_parents(&mut log, oldlog);
    Ok(log)
}

/// Resolves `parent` for every entry in `log`, using `oldlog` to seed the
/// per-(rcs, branch) latest-revision map across a cache boundary.
pub fn resolve_parents(log: &mut [LogEntry], oldlog: &[LogEntry]) {
    let mut sorted_old: Vec<&LogEntry> = oldlog.iter().collect();
    sorted_old.sort_by(|a, b| (&a.rcs, &a.revision).cmp(&(&b.rcs, &b.revision)));

    let mut versions: HashMap<(PathBuf, Revision), Revision> = HashMap::new();
    for e in sorted_old {
        let branch = e.revision.branch_prefix();
        versions.insert((e.rcs.clone(), branch), e.revision.clone());
    }

    for e in log.iter_mut() {
        let branch = e.revision.branch_prefix();
        let key = (e.rcs.clone(), branch);
        let parent = versions
            .get(&key)
            .cloned()
            .unwrap_or_else(|| e.revision.branch_root());
        e.parent = Some(parent);
        versions.insert(key, e.revision.clone());
    }
}

fn strip_suffix(s: &str, suffix: &str) -> String {
    s.strip_suffix(suffix).unwrap_or(s).to_string()
}

fn normpath(s: &str) -> String {
    crate::path::normalize_unix_path(s)
}

fn parse_signed(s: &str) -> u32 {
    s.trim_start_matches(|c| c == '+' || c == '-').parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_string()).collect()
    }

    const LOG_SAMPLE: &str = "\
RCS file: /cvsroot/module/foo.c,v
Working file: foo.c
head: 1.2
branch:
locks: strict
access list:
symbolic names:
\tREL1: 1.1.0.2
keyword substitution: kv
total revisions: 2;\tselected revisions: 2
description:
----------------------------
revision 1.2
date: 2020-01-02 10:00:00;  author: alice;  state: Exp;  lines: +2 -1;
second commit
----------------------------
revision 1.1
date: 2020-01-01 10:00:00;  author: alice;  state: Exp;
first commit
=============================================================================
";

    #[test]
    fn parses_two_revisions_in_order() {
        let entries = parse_log(lines(LOG_SAMPLE), "", false, &[]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].revision.to_string(), "1.1");
        assert_eq!(entries[1].revision.to_string(), "1.2");
        assert_eq!(&*entries[1].comment, "second commit");
        assert_eq!(entries[1].lines, Some((2, 1)));
    }

    #[test]
    fn resolves_parent_as_branch_root_for_first_revision() {
        let entries = parse_log(lines(LOG_SAMPLE), "", false, &[]).unwrap();
        assert_eq!(entries[0].parent, Some(Revision(vec![])));
        assert_eq!(entries[1].parent, Some(Revision(vec![1, 1])));
    }

    #[test]
    fn detects_tag_on_revision() {
        let entries = parse_log(lines(LOG_SAMPLE), "", false, &[]).unwrap();
        // REL1 tag collapses from the magic branch number 1.1.0.2 to 1.1.2
        // and is attached to whichever revision matches that branch prefix
        // bookkeeping; the trunk revisions carry no tags here.
        assert!(entries[0].tags.is_empty());
    }

    const SYNTHETIC_SAMPLE: &str = "\
RCS file: /cvsroot/module/bar.c,v
Working file: bar.c
head: 1.1
branch:
locks: strict
access list:
symbolic names:
keyword substitution: kv
total revisions: 1;\tselected revisions: 1
description:
----------------------------
revision 1.1
date: 2020-01-01 10:00:00;  author: alice;  state: dead;
file bar.c was added on branch BR
=============================================================================
";

    #[test]
    fn marks_file_added_on_branch_as_synthetic() {
        let entries = parse_log(lines(SYNTHETIC_SAMPLE), "", false, &[]).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].synthetic);
        assert!(entries[0].dead);
    }

    const CVS_ERROR_SAMPLE: &str = "cvs rlog: cannot find module `bogus'\n";

    #[test]
    fn propagates_cvs_error() {
        let err = parse_log(lines(CVS_ERROR_SAMPLE), "", true, &[]).unwrap_err();
        assert!(err.0.contains("bogus"));
    }

    #[test]
    fn rlog_entries_are_filtered_by_prefix() {
        let entries = parse_log(lines(LOG_SAMPLE), "module/", true, &[]).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn rlog_strips_matching_prefix() {
        let entries = parse_log(lines(LOG_SAMPLE), "/cvsroot/module/", true, &[]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file, PathBuf::from("foo.c"));
    }
}
