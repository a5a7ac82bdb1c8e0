//! sanitizefs - Rename files and directories to portable names.
//!
//! Usage:
//!   sanitizefs [OPTIONS] <PATH>...   Sanitize every name under PATH and PATH itself
//!   sanitizefs --dry-run <PATH>...   Only print what would be renamed
//!   sanitizefs --help                Show help

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use color_eyre::eyre::{Context, Result};
use rustix::process::Uid;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use sanitizefs_core::{Entries, EntryList, Partitioning, RenameConfig};
use sanitizefs_ops::{EventSender, RenameEvent, RenameScheduler, RootFinalizer, sort_events};
use sanitizefs_scan::{CollectStats, TreeCollector};

#[derive(Parser)]
#[command(
    name = "sanitizefs",
    version,
    about = "Rename files and directories to portable, URL-safe names",
    long_about = "sanitizefs walks every given directory and renames each visible file and \
                  directory to a lowercase name made only of [a-z0-9_]. File extensions are \
                  kept as they are. Hidden entries are never touched and an existing name is \
                  never overwritten. Finally the given paths themselves are renamed.",
    after_help = "Examples:\n  \
                  sanitizefs ~/Downloads\n  \
                  sanitizefs --dry-run \"My Photos\" \"Old Backups\"\n  \
                  sanitizefs -j 4 --balanced /srv/media"
)]
struct Cli {
    /// Paths to sanitize
    paths: Vec<PathBuf>,

    /// Print planned renames without changing anything
    #[arg(short, long)]
    dry_run: bool,

    /// Number of rename workers (0 = one per CPU)
    #[arg(short, long, default_value = "0")]
    jobs: usize,

    /// Spread each depth level evenly across workers
    #[arg(long)]
    balanced: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    // Checked before anything is parsed, help and version included.
    if is_refused(rustix::process::getuid()) {
        eprintln!("No root usage.");
        return Ok(ExitCode::from(1));
    }

    color_eyre::install()?;

    let cli = Cli::parse();

    if cli.paths.is_empty() {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    }

    setup_logging(cli.verbose)?;

    let config = RenameConfig::builder()
        .roots(cli.paths)
        .dry_run(cli.dry_run)
        .workers(cli.jobs)
        .partitioning(if cli.balanced {
            Partitioning::DepthBuckets
        } else {
            Partitioning::Static
        })
        .build()
        .context("Invalid arguments")?;

    let notices = run(&config)?;

    let mut stdout = io::stdout().lock();
    for notice in &notices {
        writeln!(stdout, "{notice}\n")?;
    }
    stdout.flush()?;

    Ok(ExitCode::SUCCESS)
}

/// The superuser is never allowed to run the tool.
fn is_refused(uid: Uid) -> bool {
    uid.is_root()
}

/// Event channel for a run. Only dry runs report anything, so real runs get
/// no sender and nothing is buffered.
fn event_channel(dry_run: bool) -> (Option<EventSender>, UnboundedReceiver<RenameEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (dry_run.then_some(tx), rx)
}

/// Collect, rename deepest-first, then rename the roots.
///
/// Returns the dry-run notices in report order; empty for real runs.
fn run(config: &RenameConfig) -> Result<Vec<String>> {
    let entries = collect(config);
    let (events, mut rx) = event_channel(config.dry_run);

    let scheduler = RenameScheduler::new(config.rename_options());
    let report = scheduler
        .run(Arc::new(entries), events.clone())
        .context("Rename pass failed")?;
    debug!(
        workers = report.workers,
        phases = report.phases,
        elapsed = ?report.elapsed,
        "{}",
        report.tally.summary()
    );

    let roots = RootFinalizer::new(config.dry_run).finalize(&config.roots, events.as_ref());
    debug!("roots: {}", roots.summary());
    drop(events);

    let mut planned = Vec::new();
    while let Ok(event) = rx.try_recv() {
        planned.push(event);
    }
    sort_events(&mut planned);

    Ok(planned.iter().filter_map(RenameEvent::notice).collect())
}

/// Collect every root that is a directory into one snapshot.
fn collect(config: &RenameConfig) -> Entries {
    let list = EntryList::new();
    let collector = TreeCollector::new();
    let mut totals = CollectStats::new();

    for root in &config.roots {
        match std::fs::symlink_metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => continue,
            Err(err) => {
                warn!(root = %root.display(), %err, "cannot access root");
                continue;
            }
        }

        match collector.collect(root, &list) {
            Ok(stats) => {
                for warning in &stats.warnings {
                    warn!(path = %warning.path.display(), "{}", warning.message);
                }
                totals.merge(stats);
            }
            Err(err) => warn!(root = %root.display(), "{err}"),
        }
    }

    debug!(
        files = totals.files,
        dirs = totals.dirs,
        ignored = totals.ignored,
        warnings = totals.warnings.len(),
        max_depth = ?totals.max_depth,
        elapsed = ?totals.duration,
        "collected"
    );
    list.freeze()
}

fn setup_logging(verbose: u8) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(match verbose {
            0 => "sanitizefs=warn,sanitizefs_scan=warn,sanitizefs_ops=warn,warn",
            1 => "sanitizefs=debug,sanitizefs_scan=debug,sanitizefs_ops=debug,warn",
            _ => "sanitizefs=trace,sanitizefs_scan=trace,sanitizefs_ops=trace,warn",
        }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: PathBuf, dry_run: bool, workers: usize) -> RenameConfig {
        RenameConfig::builder()
            .roots(vec![root])
            .dry_run(dry_run)
            .workers(workers)
            .build()
            .unwrap()
    }

    fn wide_tree(temp: &TempDir) -> PathBuf {
        let root = temp.path().join("Wide Tree");
        fs::create_dir_all(root.join("Sub Dir")).unwrap();
        for i in 0..400 {
            fs::write(root.join(format!("File {i}.TXT")), "").unwrap();
        }
        fs::write(root.join("Sub Dir/Nested File.md"), "").unwrap();
        root
    }

    #[test]
    fn test_root_refused() {
        assert!(is_refused(Uid::ROOT));
        assert!(!is_refused(Uid::from_raw(1000)));
    }

    #[test]
    fn test_cli_flags() {
        let args = ["sanitizefs", "-d", "-j", "3", "--balanced", "-vv", "a", "b"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.jobs, 3);
        assert!(cli.balanced);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_real_run_buffers_no_events() {
        let (sender, mut rx) = event_channel(false);
        assert!(sender.is_none());
        assert!(rx.try_recv().is_err());

        let temp = TempDir::new().unwrap();
        let root = wide_tree(&temp);
        let notices = run(&config(root, false, 4)).unwrap();

        assert!(notices.is_empty());
        assert!(temp.path().join("wide_tree/sub_dir/nested_file.md").is_file());
        assert!(temp.path().join("wide_tree/file_399.TXT").is_file());
    }

    #[test]
    fn test_dry_run_notices_repeatable() {
        let temp = TempDir::new().unwrap();
        let root = wide_tree(&temp);

        let first = run(&config(root.clone(), true, 8)).unwrap();
        for _ in 0..3 {
            assert_eq!(run(&config(root.clone(), true, 8)).unwrap(), first);
        }
        assert_eq!(run(&config(root.clone(), true, 1)).unwrap(), first);

        // Every entry below the root changes, then the root itself.
        assert_eq!(first.len(), 403);
        assert!(first[0].contains("Nested File.md"));
        assert!(first.last().unwrap().ends_with("--> \"wide_tree\""));
        assert!(root.join("Sub Dir/Nested File.md").is_file());
    }
}
