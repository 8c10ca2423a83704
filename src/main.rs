//! BlockPack CLI entry point.

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use blockpack::cli::{Cli, Commands, PlanArgs};
use blockpack::config::Config;
use blockpack::inode::InodeRef;
use blockpack::logging;
use blockpack::mapper::MmapFileMapper;
use blockpack::ordering::InodeManager;
use blockpack::progress::ProgressReporter;
use blockpack::scanner;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Plan(args) => plan(&args, cli.quiet),
    }
}

/// Progress callback rendering the shared snapshot on a spinner line.
fn spinner_callback() -> impl FnMut(&blockpack::progress::ProgressSnapshot, bool) + Send + 'static
{
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    move |snapshot, final_call| {
        if final_call {
            bar.finish_and_clear();
            return;
        }
        bar.set_message(format!(
            "{} files, {} scanned, {} ordered, depth {}",
            snapshot.files_found.load(Ordering::Relaxed),
            snapshot.inodes_scanned.load(Ordering::Relaxed),
            snapshot.inodes_ordered.load(Ordering::Relaxed),
            snapshot.nilsimsa_depth.load(Ordering::Relaxed),
        ));
    }
}

fn plan(args: &PlanArgs, quiet: bool) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    args.apply_to(&mut config);
    let scan_options = config.effective_inode_options();

    let reporter = if quiet || args.no_progress {
        ProgressReporter::new(|_, _| {})
    } else {
        ProgressReporter::new(spinner_callback())
    };

    // Walk and dedup.
    let files = scanner::walk(&args.input, reporter.snapshot())?;
    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    let (groups, stats) = scanner::dedup_files(files);

    // One inode per content identity.
    let mut manager = InodeManager::new();
    for group in groups {
        let ino = manager.create_inode();
        ino.set_files(group)?;
    }

    // Fingerprint scan.
    if scan_options.needs_scan() {
        let mapper = MmapFileMapper;
        let snapshot = reporter.snapshot();
        let mut scan_result = Ok(());
        manager.for_each_inode(|ino| {
            if scan_result.is_err() {
                return;
            }
            scan_result = ino.scan(&mapper, &scan_options);
            if scan_result.is_ok() {
                snapshot.inodes_scanned.fetch_add(1, Ordering::Relaxed);
                snapshot
                    .bytes_scanned
                    .fetch_add(ino.size().unwrap_or(0), Ordering::Relaxed);
            }
        });
        scan_result.context("fingerprint scan failed")?;
    }

    // Order and number.
    manager.order_inodes(
        None,
        &config.file_order,
        reporter.snapshot(),
        args.first_inode,
        // No packer is attached when planning, so there is no block
        // fill signal to report back.
        &mut |_: &InodeRef| 0,
    )?;

    drop(reporter);

    println!(
        "planned {} inodes from {} files ({}), {} duplicates collapsed, order {}",
        manager.count(),
        stats.total_files,
        ByteSize(total_bytes),
        stats.duplicate_files,
        config.file_order.mode,
    );

    if args.list {
        manager.for_each_inode(|ino| {
            if let Ok(file) = ino.any() {
                println!("{:>8}  {:>12}  {}", ino.num(), file.size, file.path.display());
            }
        });
    }

    Ok(())
}
