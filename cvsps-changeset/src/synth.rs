use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use cvsps_log::{ellipsis, LogEntry};

use crate::model::Changeset;

pub static DEFAULT_MERGEFROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{mergefrombranch ([-\w]+)\}\}").unwrap());
pub static DEFAULT_MERGETO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{mergetobranch ([-\w]+)\}\}").unwrap());

/// Groups, orders, and links `log` into changesets.
///
/// `mergefrom`/`mergeto` default to `{{mergefrombranch NAME}}` /
/// `{{mergetobranch NAME}}` when not given.
pub fn synthesize(
    log: Vec<LogEntry>,
    fuzz: i64,
    mergefrom: Option<&Regex>,
    mergeto: Option<&Regex>,
) -> Vec<Changeset> {
    let mergefrom = mergefrom.unwrap_or(&DEFAULT_MERGEFROM);
    let mergeto = mergeto.unwrap_or(&DEFAULT_MERGETO);

    let mut log = log;

    let mut mindate: HashMap<Arc<str>, (i64, i32)> = HashMap::new();
    for e in &log {
        if let Some(commitid) = &e.commitid {
            mindate
                .entry(commitid.clone())
                .and_modify(|d| *d = (*d).min(e.date))
                .or_insert(e.date);
        }
    }

    log.sort_by(|a, b| sort_key(a, &mindate).cmp(&sort_key(b, &mindate)));

    let mut changesets: Vec<Changeset> = Vec::new();
    for e in log {
        let folded = match changesets.last_mut() {
            Some(c) => c.add_entry(e, fuzz),
            None => Err(e),
        };
        if let Err(e) = folded {
            changesets.push(Changeset::from_log_entry(e));
            if changesets.len() % 100 == 0 {
                let preview = format!("{} {}", changesets.len(), changesets.last().unwrap().comment);
                log::info!("{}", ellipsis(&preview, 80));
            }
        }
    }

    for (i, c) in changesets.iter_mut().enumerate() {
        c.seq = i;
    }

    for c in &mut changesets {
        c.entries.sort_by(|a, b| {
            let a_key = (a.file.parent().map(|p| p.to_path_buf()), a.file.file_name().map(|n| n.to_owned()));
            let b_key = (b.file.parent().map(|p| p.to_path_buf()), b.file.file_name().map(|n| n.to_owned()));
            a_key.cmp(&b_key)
        });
    }

    let mut odd: Vec<(usize, usize)> = Vec::new();
    changesets.sort_by(|l, r| cscmp(l, r, &mut odd));

    collect_tags(&mut changesets);
    link_parents(&mut changesets, mergefrom, mergeto);
    drop_synthetic(&mut changesets);
    number(&mut changesets);

    if !odd.is_empty() {
        let id_by_seq: HashMap<usize, usize> =
            changesets.iter().filter_map(|c| c.id.map(|id| (c.seq, id))).collect();
        for (l_seq, r_seq) in odd {
            if let (Some(&lid), Some(&rid)) = (id_by_seq.get(&l_seq), id_by_seq.get(&r_seq)) {
                log::warn!("changeset {} is both before and after {}", lid, rid);
            }
        }
    }

    log::info!("{} changeset entries", changesets.len());
    changesets
}

fn sort_key(e: &LogEntry, mindate: &HashMap<Arc<str>, (i64, i32)>) -> SortKey {
    SortKey {
        mindate: e.commitid.as_ref().and_then(|c| mindate.get(c)).copied().unwrap_or((-1, 0)),
        commitid: e.commitid.clone().unwrap_or_else(|| Arc::from("")),
        comment: e.comment.clone(),
        author: e.author.clone(),
        branch: e.branch.clone().unwrap_or_else(|| Arc::from("")),
        date: e.date,
        branchpoints: e.branchpoints.clone(),
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    mindate: (i64, i32),
    commitid: Arc<str>,
    comment: Arc<str>,
    author: Arc<str>,
    branch: Arc<str>,
    date: (i64, i32),
    branchpoints: BTreeSet<Arc<str>>,
}

/// Orders changesets by date, breaking ties via `is_child` (vendor-branch
/// and initial-commit-on-branch ordering) and then by size/path/branchpoint
/// count for deterministic output. When both directions of `is_child` hold
/// (a genuine cycle), records the pair's `seq` (a stable identity assigned
/// before sorting, since indices move during the sort) for a warning once
/// final changeset numbers are known.
fn cscmp(l: &Changeset, r: &Changeset, odd: &mut Vec<(usize, usize)>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let d = (l.date.0 + l.date.1 as i64) - (r.date.0 + r.date.1 as i64);
    if d != 0 {
        return d.cmp(&0);
    }

    let mut result = Ordering::Equal;
    if l.is_child(r) {
        result = Ordering::Greater;
    }
    if r.is_child(l) {
        if result != Ordering::Equal {
            odd.push((l.seq, r.seq));
        }
        result = Ordering::Less;
    }
    if result != Ordering::Equal {
        return result;
    }

    let by_len = l.entries.len().cmp(&r.entries.len());
    if by_len != Ordering::Equal {
        return by_len.reverse();
    }

    let l_files: Vec<_> = l.entries.iter().map(|e| &e.file).collect();
    let r_files: Vec<_> = r.entries.iter().map(|e| &e.file).collect();
    let by_files = l_files.cmp(&r_files);
    if by_files != Ordering::Equal {
        return by_files;
    }

    l.branchpoints.len().cmp(&r.branchpoints.len())
}

fn collect_tags(changesets: &mut [Changeset]) {
    let mut global: HashMap<Arc<str>, usize> = HashMap::new();
    for (i, c) in changesets.iter().enumerate() {
        for e in &c.entries {
            for tag in &e.tags {
                global.insert(tag.clone(), i);
            }
        }
    }
    for (i, c) in changesets.iter_mut().enumerate() {
        let unique: BTreeSet<Arc<str>> = c.entries.iter().flat_map(|e| e.tags.iter().cloned()).collect();
        let mut tags: Vec<Arc<str>> = unique.into_iter().filter(|t| global.get(t) == Some(&i)).collect();
        tags.sort();
        c.tags = tags;
    }
}

fn link_parents(changesets: &mut Vec<Changeset>, mergefrom: &Regex, mergeto: &Regex) {
    let mut branches: HashMap<Option<Arc<str>>, usize> = HashMap::new();
    let mut n = changesets.len();
    let mut i = 0usize;

    while i < n {
        let branch = changesets[i].branch.clone();

        let mut p = branches.get(&branch).copied();
        if p.is_none() {
            for candidate in 0..i {
                if !changesets[candidate].branchpoints.contains_branch(&branch) {
                    if p.is_some() {
                        break;
                    }
                    continue;
                }
                p = Some(candidate);
            }
        }

        if let Some(mut pidx) = p {
            let mut reachable = true;
            while changesets[pidx].synthetic {
                match changesets[pidx].parents.first().copied() {
                    Some(first) => pidx = first,
                    None => {
                        reachable = false;
                        break;
                    }
                }
            }
            if reachable {
                changesets[i].parents.push(pidx);
            }
        }

        if let Some(mergepoint) = changesets[i].mergepoint.clone() {
            let target = if &*mergepoint == "HEAD" { None } else { Some(mergepoint) };
            changesets[i].mergepoint = if target.is_none() { None } else { changesets[i].mergepoint.clone() };
            match branches.get(&target) {
                Some(&idx) => changesets[i].parents.push(idx),
                None => log::error!(
                    "mergepoint references unknown branch {:?} in changeset at comment {:?}",
                    target,
                    changesets[i].comment
                ),
            }
        }

        if let Some(caps) = mergefrom.captures(&changesets[i].comment.clone()) {
            let captured = caps.get(1).unwrap().as_str();
            let m: Option<Arc<str>> = if captured == "HEAD" { None } else { Some(Arc::from(captured)) };
            match branches.get(&m) {
                Some(&candidate) => {
                    if changesets[i].branch != m && !changesets[candidate].synthetic {
                        changesets[i].parents.push(candidate);
                    }
                }
                None => {
                    log::warn!(
                        "warning: CVS commit message references non-existent branch {:?}:\n{}",
                        m.as_deref().unwrap_or("HEAD"),
                        changesets[i].comment
                    );
                }
            }
        }

        if let Some(caps) = mergeto.captures(&changesets[i].comment.clone()) {
            let m: Option<Arc<str>> = match caps.get(1) {
                Some(g) if g.as_str() != "HEAD" => Some(Arc::from(g.as_str())),
                _ => None,
            };
            if let Some(&target_idx) = branches.get(&m) {
                if changesets[i].branch != m {
                    let cc = Changeset::from_merge(&changesets[i], &changesets[target_idx], i, target_idx);
                    changesets.insert(i + 1, cc);
                    branches.insert(m, i + 1);
                    n += 1;
                    i += 2;
                    continue;
                }
            }
        }

        branches.insert(changesets[i].branch.clone(), i);
        i += 1;
    }
}

trait ContainsBranch {
    fn contains_branch(&self, branch: &Option<Arc<str>>) -> bool;
}

impl ContainsBranch for BTreeSet<Arc<str>> {
    fn contains_branch(&self, branch: &Option<Arc<str>>) -> bool {
        match branch {
            Some(b) => self.contains(b),
            None => false,
        }
    }
}

/// Removes synthetic changesets and remaps every surviving `parents` index.
/// Safe because the parent-linking pass above already walks past any
/// synthetic parent to its nearest non-synthetic ancestor, so no survivor's
/// `parents` can point at a dropped index.
fn drop_synthetic(changesets: &mut Vec<Changeset>) {
    let mut old_to_new = HashMap::new();
    let mut next = 0usize;
    for (old_idx, c) in changesets.iter().enumerate() {
        if !c.synthetic {
            old_to_new.insert(old_idx, next);
            next += 1;
        }
    }
    changesets.retain(|c| !c.synthetic);
    for c in changesets.iter_mut() {
        for p in c.parents.iter_mut() {
            *p = *old_to_new
                .get(p)
                .expect("parent links are resolved past synthetic changesets before dropping");
        }
    }
}

fn number(changesets: &mut [Changeset]) {
    for (i, c) in changesets.iter_mut().enumerate() {
        c.id = Some(i + 1);
    }
}
