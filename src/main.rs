use std::path::{Path, PathBuf};

use cvsps_log::LogEntry;
use structopt::StructOpt;

mod output;

/// Read CVS rlog for current directory or named path in repository, and
/// convert the log to changesets based on matching commit log entries and
/// dates.
#[derive(Debug, StructOpt)]
#[structopt(name = "cvsps")]
struct Opt {
    #[structopt(short = "-A", hidden = true)]
    compat_a: bool,

    #[structopt(long = "cvs-direct", hidden = true)]
    compat_cvs_direct: bool,

    #[structopt(short = "-q", hidden = true)]
    compat_q: bool,

    #[structopt(long = "norc", hidden = true)]
    compat_norc: bool,

    #[structopt(short = "-b", help = "Only return changes on specified branches")]
    branches: Vec<String>,

    #[structopt(short = "-p", default_value = "", help = "Prefix to remove from file names")]
    prefix: String,

    #[structopt(short = "-r", help = "Only return changes after or between specified tags")]
    revisions: Vec<String>,

    #[structopt(short = "-u", help = "Update cvs log cache")]
    update_cache: bool,

    #[structopt(short = "-v", parse(from_occurrences), help = "Be verbose")]
    verbose: u8,

    #[structopt(short = "-x", help = "Create new cvs log cache")]
    new_cache: bool,

    #[structopt(
        short = "-z",
        default_value = "60",
        value_name = "seconds",
        help = "Set commit time fuzz"
    )]
    fuzz: i64,

    #[structopt(long, default_value = "", value_name = "cvsroot", help = "Specify cvsroot")]
    root: String,

    #[structopt(long, help = "Show parent changesets")]
    parents: bool,

    #[structopt(long, help = "Show current changeset in ancestor branches")]
    ancestors: bool,

    #[structopt(parse(from_os_str))]
    paths: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let cache_mode = if opt.new_cache {
        cvsps_cache::CacheMode::Write
    } else if opt.update_cache {
        cvsps_cache::CacheMode::Update
    } else {
        cvsps_cache::CacheMode::Read
    };

    let mut log: Vec<LogEntry> = Vec::new();
    if opt.paths.is_empty() {
        let (directory, root) = resolve_explicit(".", &opt.root)?;
        log.extend(fetch_log(&directory, root.as_deref().unwrap_or(""), cache_mode)?);
    } else {
        for path in &opt.paths {
            let directory = path.to_string_lossy().into_owned();
            let mut root = opt.root.clone();
            if root.is_empty() {
                root = std::env::var("CVSROOT").unwrap_or_default();
            }
            log.extend(fetch_log(&directory, &root, cache_mode)?);
        }
    }

    let changesets = cvsps_changeset::synthesize(log, opt.fuzz, None, None);

    let print_opt = output::PrintOptions {
        branches: opt.branches,
        revisions: opt.revisions,
        prefix: opt.prefix,
        parents: opt.parents,
        ancestors: opt.ancestors,
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    output::print_changesets(&mut handle, &changesets, &print_opt)?;

    Ok(())
}

/// Resolves `(directory, root)` for a sandbox detected at `base` (the
/// current-directory case, when no path was given on the command line).
/// A `CVS/Root` file in the sandbox takes precedence over `--root`.
fn resolve_explicit(base: &str, opt_root: &str) -> anyhow::Result<(String, Option<String>)> {
    let sandbox = cvsps_process::detect_sandbox(Path::new(base))?;
    let mut root = sandbox.root.unwrap_or_else(|| opt_root.to_string());
    if root.is_empty() {
        root = std::env::var("CVSROOT").unwrap_or_default();
    }
    Ok((sandbox.directory, if root.is_empty() { None } else { Some(root) }))
}

fn fetch_log(directory: &str, root: &str, mode: cvsps_cache::CacheMode) -> anyhow::Result<Vec<LogEntry>> {
    let cache = cvsps_cache::Cache::resolve(root, directory)?;

    let mut effective_mode = mode;
    let oldlog = match cache.load() {
        Ok(log) => {
            log::info!("cache has {} log entries", log.len());
            log
        }
        Err(e) => {
            log::info!("error reading cache: {}", e);
            if effective_mode == cvsps_cache::CacheMode::Read {
                effective_mode = cvsps_cache::CacheMode::Update;
            }
            Vec::new()
        }
    };

    if !effective_mode.fetches_new_entries() {
        return Ok(oldlog);
    }

    let since = oldlog.last().map(|e| cvsps_dateutil::date_str(e.date, "%Y/%m/%d %H:%M:%S %1%2"));
    let prefix = cvsps_log::build_prefix(root, directory);

    let root_arg = if root.is_empty() { None } else { Some(root) };
    let mut process = cvsps_process::LogProcess::spawn(root_arg, true, directory, since.as_deref())?;

    let mut lines = Vec::new();
    for line in process.lines() {
        lines.push(line?);
    }

    let new_entries = cvsps_log::parse_log(lines, &prefix, true, &oldlog)?;
    process.wait()?;

    if new_entries.is_empty() {
        log::info!("{} log entries", oldlog.len());
        return Ok(oldlog);
    }

    let merged = cvsps_cache::merge(oldlog, new_entries)?;
    log::info!("{} log entries", merged.len());
    log::info!("writing cvs log cache {}", cache.path().display());
    cache.save(&merged)?;
    Ok(merged)
}

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

    fn render(changesets: &[cvsps_changeset::Changeset]) -> String {
        let opt = output::PrintOptions {
            branches: Vec::new(),
            revisions: Vec::new(),
            prefix: String::new(),
            parents: false,
            ancestors: false,
        };
        let mut buf = Vec::new();
        output::print_changesets(&mut buf, changesets, &opt).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn single_trunk_commit() {
        let log = vec![entry("a", "1.1", "alice", "initial commit", (1000, 0), None)];
        let changesets = cvsps_changeset::synthesize(log, 60, None, None);
        assert_eq!(changesets.len(), 1);
        assert_eq!(changesets[0].id, Some(1));
        assert_eq!(changesets[0].branch, None);

        let out = render(&changesets);
        assert!(out.contains("PatchSet 1 "));
        assert!(out.contains("Branch: HEAD"));
        assert!(out.contains("a:INITIAL->1.1"));
    }

    #[test]
    fn two_files_within_fuzz_window_group_into_one_changeset() {
        let log = vec![
            entry("a", "1.1", "alice", "commit", (1000, 0), None),
            entry("b", "1.1", "alice", "commit", (1010, 0), None),
        ];
        let changesets = cvsps_changeset::synthesize(log, 60, None, None);
        assert_eq!(changesets.len(), 1);
        assert_eq!(changesets[0].entries.len(), 2);

        let out = render(&changesets);
        assert!(out.contains("a:INITIAL->1.1"));
        assert!(out.contains("b:INITIAL->1.1"));
    }

    #[test]
    fn commits_beyond_fuzz_window_split_into_two_changesets() {
        let log = vec![
            entry("a", "1.1", "alice", "commit", (1000, 0), None),
            entry("b", "1.1", "alice", "commit", (1120, 0), None),
        ];
        let changesets = cvsps_changeset::synthesize(log, 60, None, None);
        assert_eq!(changesets.len(), 2);
    }

    #[test]
    fn branch_creation_records_branchpoint_and_orders_after_trunk() {
        let mut trunk = entry("a", "1.1", "alice", "initial commit", (1000, 0), None);
        trunk.branchpoints = BTreeSet::from([Arc::from("BR")]);

        let mut branch_commit = entry("a", "1.1.2.1", "alice", "branch work", (2000, 0), Some("BR"));
        branch_commit.parent = Some(Revision::parse("1.1").unwrap());

        let changesets = cvsps_changeset::synthesize(vec![trunk, branch_commit], 60, None, None);
        assert_eq!(changesets.len(), 2);

        let trunk_cs = changesets.iter().find(|c| c.branch.is_none()).unwrap();
        let branch_cs = changesets.iter().find(|c| c.branch.as_deref() == Some("BR")).unwrap();
        assert!(trunk_cs.branchpoints.contains("BR"));
        assert_eq!(branch_cs.parents, vec![changesets.iter().position(|c| c.branch.is_none()).unwrap()]);
        assert!(trunk_cs.id < branch_cs.id);
    }

    #[test]
    fn synthetic_branch_creation_entry_is_dropped() {
        let mut placeholder = entry("a", "1.1", "alice", "file a was added on branch BR", (1000, 0), None);
        placeholder.dead = true;
        placeholder.synthetic = true;
        placeholder.branchpoints = BTreeSet::from([Arc::from("BR")]);

        let trunk_continuation = entry("a", "1.2", "alice", "real trunk change", (2000, 0), None);

        let mut branch_commit = entry("a", "1.1.2.1", "alice", "real branch change", (1500, 0), Some("BR"));
        branch_commit.parent = Some(Revision::parse("1.1").unwrap());

        let changesets =
            cvsps_changeset::synthesize(vec![placeholder, trunk_continuation, branch_commit], 60, None, None);

        assert_eq!(changesets.len(), 2);
        assert!(changesets.iter().all(|c| !c.synthetic));
    }

    #[test]
    fn mergeto_marker_inserts_two_parent_merge_changeset() {
        let trunk_base = entry("a", "1.1", "alice", "base commit", (1000, 0), None);
        let mut branchpointed_base = trunk_base.clone();
        branchpointed_base.branchpoints = BTreeSet::from([Arc::from("BR")]);

        let branch_commit = entry("a", "1.1.2.1", "alice", "branch commit", (2000, 0), Some("BR"));

        let merging_commit = entry("a", "1.2", "alice", "final {{mergetobranch BR}}", (3000, 0), None);

        let changesets = cvsps_changeset::synthesize(
            vec![branchpointed_base, branch_commit, merging_commit],
            60,
            None,
            None,
        );

        let merge_cs = changesets
            .iter()
            .find(|c| c.comment.starts_with("convert-repo: CVS merge from branch"))
            .expect("a synthesized merge changeset is inserted");
        assert_eq!(merge_cs.comment.as_ref(), "convert-repo: CVS merge from branch HEAD");
        assert_eq!(merge_cs.parents.len(), 2);
    }
}
