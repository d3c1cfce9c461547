//! The `debugcvsps`-style changeset printer: one `PatchSet` block per
//! changeset, in the same layout (including the trailing spaces CVS's own
//! `cvsps` produces on several lines, kept for byte-for-byte compatibility
//! with scripts that scrape this output).

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use cvsps_changeset::Changeset;

pub struct PrintOptions {
    pub branches: Vec<String>,
    pub revisions: Vec<String>,
    pub prefix: String,
    pub parents: bool,
    pub ancestors: bool,
}

pub fn print_changesets<W: Write>(out: &mut W, changesets: &[Changeset], opt: &PrintOptions) -> io::Result<()> {
    let mut off = !opt.revisions.is_empty();

    // branch -> (parent branch, parent changeset id)
    let mut ancestors: HashMap<Option<Arc<str>>, (Option<Arc<str>>, usize)> = HashMap::new();
    // branch -> latest changeset id seen on it so far
    let mut branches: HashMap<Option<Arc<str>>, usize> = HashMap::new();

    for cs in changesets {
        if opt.ancestors {
            if !branches.contains_key(&cs.branch) {
                if let Some(&first_parent) = cs.parents.first() {
                    let parent = &changesets[first_parent];
                    if let Some(parent_id) = parent.id {
                        ancestors.insert(cs.branch.clone(), (parent.branch.clone(), parent_id));
                    }
                }
            }
            if let Some(id) = cs.id {
                branches.insert(cs.branch.clone(), id);
            }
        }

        if !opt.branches.is_empty() {
            let name = cs.branch.as_deref().unwrap_or("HEAD");
            if !opt.branches.iter().any(|b| b == name) {
                continue;
            }
        }

        if !off {
            print_one(out, cs, changesets, opt, &ancestors, &branches)?;
        }

        let id_str = cs.id.map(|id| id.to_string()).unwrap_or_default();
        if !opt.revisions.is_empty() && off {
            if opt.revisions[0] == id_str || cs.tags.iter().any(|t| t.as_ref() == opt.revisions[0]) {
                off = false;
            }
        }
        if opt.revisions.len() > 1 && !off {
            if opt.revisions[1] == id_str || cs.tags.iter().any(|t| t.as_ref() == opt.revisions[1]) {
                break;
            }
        }
    }

    Ok(())
}

fn print_one<W: Write>(
    out: &mut W,
    cs: &Changeset,
    changesets: &[Changeset],
    opt: &PrintOptions,
    ancestors: &HashMap<Option<Arc<str>>, (Option<Arc<str>>, usize)>,
    branches: &HashMap<Option<Arc<str>>, usize>,
) -> io::Result<()> {
    let id = cs.id.expect("changesets are numbered before printing");
    let cs_date = cs.entries.iter().map(|e| e.date).min().unwrap_or(cs.date);

    writeln!(out, "---------------------")?;
    writeln!(out, "PatchSet {} ", id)?;
    writeln!(out, "Date: {}", cvsps_dateutil::date_str(cs_date, "%Y/%m/%d %H:%M:%S %1%2"))?;
    writeln!(out, "Author: {}", cs.author)?;
    writeln!(out, "Branch: {}", cs.branch.as_deref().unwrap_or("HEAD"))?;

    let cs_tags: Vec<&str> = cs.tags.iter().take(1).map(|t| t.as_ref()).collect();
    let tag_label = if cs_tags.len() > 1 { "Tags" } else { "Tag" };
    let tag_value = if cs_tags.is_empty() { "(none)".to_string() } else { cs_tags.join(",") };
    writeln!(out, "{}: {} ", tag_label, tag_value)?;

    if !cs.branchpoints.is_empty() {
        let points: Vec<&str> = cs.branchpoints.iter().map(|b| b.as_ref()).collect();
        writeln!(out, "Branchpoints: {} ", points.join(", "))?;
    }

    if opt.parents && !cs.parents.is_empty() {
        if cs.parents.len() > 1 {
            let ids: Vec<String> = cs
                .parents
                .iter()
                .map(|&p| changesets[p].id.expect("parent is numbered").to_string())
                .collect();
            writeln!(out, "Parents: {}", ids.join(","))?;
        } else {
            let parent_id = changesets[cs.parents[0]].id.expect("parent is numbered");
            writeln!(out, "Parent: {}", parent_id)?;
        }
    }

    if opt.ancestors {
        let mut b = cs.branch.clone();
        let mut r = Vec::new();
        while let Some(branch) = b.clone() {
            match ancestors.get(&Some(branch)) {
                Some((parent_branch, changeset_id)) => {
                    b = parent_branch.clone();
                    let latest = branches.get(&b).copied().unwrap_or(*changeset_id);
                    r.push(format!("{}:{}:{}", b.as_deref().unwrap_or("HEAD"), changeset_id, latest));
                }
                None => break,
            }
        }
        if !r.is_empty() {
            writeln!(out, "Ancestors: {}", r.join(","))?;
        }
    }

    writeln!(out, "Log:")?;
    writeln!(out, "{}\n", cs.comment)?;
    writeln!(out, "Members: ")?;
    for f in &cs.entries {
        let display_path = f.file.to_string_lossy();
        let fn_display = display_path.strip_prefix(opt.prefix.as_str()).unwrap_or(&display_path);
        let parent = match &f.parent {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => "INITIAL".to_string(),
        };
        let dead = if f.dead { "(DEAD)" } else { "" };
        writeln!(out, "\t{}:{}->{}{} ", fn_display, parent, f.revision, dead)?;
    }
    writeln!(out)?;

    Ok(())
}
