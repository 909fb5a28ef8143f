use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use guidance_core::{merge_documents, sanitize_generated, Document, MergeOptions};
use guidance_store::{
    clean_document, decode, decode_fresh, encode, sync_document, GuidanceStore, SyncReport, SyncSummary,
};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Exit status when `sanitize` rejects the generator output
const EXIT_REJECTED: i32 = 2;

#[derive(Parser)]
#[command(name = "guidance")]
#[command(about = "Keep per-file documentation in sync with source", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root holding the guidance directory
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile freshly parsed documents with the store
    Sync(SyncArgs),

    /// Merge two guidance documents without touching the store
    Merge(MergeArgs),

    /// Report the state of stored guidance
    Check(SourcesArgs),

    /// Rewrite stored guidance that contains leaked generator prompts
    Clean(SourcesArgs),

    /// Turn generator output (stdin) into a comment
    Sanitize(SanitizeArgs),
}

#[derive(Args)]
struct SyncArgs {
    /// Fresh documents in guidance format, as produced by the parser
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Args)]
struct MergeArgs {
    /// Freshly parsed document
    #[arg(long)]
    fresh: PathBuf,

    /// Previously persisted document
    #[arg(long)]
    existing: PathBuf,

    /// Write the result here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do not carry persisted comments over
    #[arg(long)]
    no_preserve: bool,
}

#[derive(Args)]
struct SourcesArgs {
    /// Source paths (default: everything in the store)
    sources: Vec<String>,
}

#[derive(Args)]
struct SanitizeArgs {
    /// The generator was not asked for <comment> tags
    #[arg(long)]
    no_tag: bool,
}

#[derive(Serialize)]
struct SyncOutput {
    reports: Vec<SyncReport>,
    summary: SyncSummary,
}

#[derive(Serialize)]
struct CheckEntry {
    source: String,
    status: &'static str,
    leaked_prompt_detected: bool,
    members: usize,
    missing_comments: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Sync(args) => run_sync(&cli.root, args),
        Commands::Merge(args) => run_merge(&cli.root, args),
        Commands::Check(args) => run_check(&cli.root, args),
        Commands::Clean(args) => run_clean(&cli.root, args),
        Commands::Sanitize(args) => run_sanitize(args),
    }
}

fn run_sync(root: &Path, args: SyncArgs) -> Result<()> {
    let store = open_store(root)?;
    let options = store.config().merge_options();

    let mut output = SyncOutput {
        reports: Vec::with_capacity(args.inputs.len()),
        summary: SyncSummary::default(),
    };
    for input in &args.inputs {
        let fresh = read_document(input)?;
        let report = sync_document(&store, &fresh, options)
            .with_context(|| format!("Failed to sync {}", fresh.source))?;
        output.summary.record(&report);
        output.reports.push(report);
    }

    log::info!(
        "synced {} file(s), wrote {}: {}",
        output.summary.files,
        output.summary.written,
        output.summary.stats
    );
    print_json(&output)
}

fn run_merge(root: &Path, args: MergeArgs) -> Result<()> {
    let store = open_store(root)?;
    let options = if args.no_preserve {
        MergeOptions {
            preserve_existing_comments: false,
        }
    } else {
        store.config().merge_options()
    };

    let fresh = read_document(&args.fresh)?;
    let bytes = fs::read(&args.existing)
        .with_context(|| format!("Failed to read {}", args.existing.display()))?;
    let existing = match decode(&bytes) {
        Some(loaded) => {
            if loaded.leaked_prompt_detected {
                log::warn!(
                    "dropped leaked prompt text from {}",
                    args.existing.display()
                );
            }
            loaded.document
        }
        None => {
            log::warn!(
                "{} is not usable guidance; merging against an empty document",
                args.existing.display()
            );
            Document::new(fresh.module.clone(), fresh.source.clone())
        }
    };

    let merged = merge_documents(&fresh, &existing, options);
    let encoded = encode(&merged.document)?;
    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(out, &encoded)
                .with_context(|| format!("Failed to write {}", out.display()))?;
        }
        None => io::stdout().write_all(&encoded)?,
    }
    eprintln!("{}", merged.stats);
    Ok(())
}

fn run_check(root: &Path, args: SourcesArgs) -> Result<()> {
    let store = open_store(root)?;
    let sources = resolve_sources(&store, args.sources)?;

    let mut entries = Vec::with_capacity(sources.len());
    for source in sources {
        let entry = match store.load(&source)? {
            Some(loaded) => CheckEntry {
                status: "ok",
                leaked_prompt_detected: loaded.leaked_prompt_detected,
                members: loaded.document.count_members(),
                missing_comments: loaded.document.members_missing_comments().len(),
                source,
            },
            None => CheckEntry {
                source,
                status: "absent",
                leaked_prompt_detected: false,
                members: 0,
                missing_comments: 0,
            },
        };
        entries.push(entry);
    }
    print_json(&entries)
}

fn run_clean(root: &Path, args: SourcesArgs) -> Result<()> {
    let store = open_store(root)?;
    let sources = resolve_sources(&store, args.sources)?;

    let mut output = SyncOutput {
        reports: Vec::new(),
        summary: SyncSummary::default(),
    };
    for source in sources {
        if let Some(report) = clean_document(&store, &source)? {
            output.summary.record(&report);
            output.reports.push(report);
        }
    }
    print_json(&output)
}

fn run_sanitize(args: SanitizeArgs) -> Result<()> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read generator output from stdin")?;

    match sanitize_generated(&raw, !args.no_tag) {
        Some(comment) => {
            println!("{comment}");
            Ok(())
        }
        None => {
            eprintln!("rejected: generator output is not a usable comment");
            std::process::exit(EXIT_REJECTED);
        }
    }
}

fn open_store(root: &Path) -> Result<GuidanceStore> {
    let store = GuidanceStore::open(root)
        .with_context(|| format!("Failed to open guidance store at {}", root.display()))?;
    log::debug!(
        "guidance store at {} (dir {})",
        store.root().display(),
        store.config().guidance_dir
    );
    Ok(store)
}

fn read_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let Some(document) = decode_fresh(&bytes) else {
        bail!("{} is not a valid guidance document", path.display());
    };
    Ok(document)
}

fn resolve_sources(store: &GuidanceStore, sources: Vec<String>) -> Result<Vec<String>> {
    if sources.is_empty() {
        return Ok(store.list_sources()?);
    }
    Ok(sources)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
