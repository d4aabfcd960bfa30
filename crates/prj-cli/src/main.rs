//! CLI entry point for the prj project browser.
//!
//! This binary discovers software projects under a directory, keeps them in
//! a persistent cache and lets the user annotate them.
//!
//! # Usage
//!
//! ```bash
//! prj [OPTIONS] <COMMAND>
//!
//! # Discover projects under ~/src
//! prj scan ~/src
//!
//! # List favourite Rust projects
//! prj list --language rust --favorites
//!
//! # Rescan projects as they change, until Ctrl-C
//! prj watch
//!
//! # Tag a project and export the collection
//! prj tag ~/src/app add core
//! prj report --format csv --output projects.csv
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::eyre;
use prj_core::{Config, Language, ProjectRecord, DEFAULT_CATEGORY};
use prj_scanner::{CacheStore, ScanEvent, ScanOrchestrator, ScanOutcome};
use prj_watcher::{ProjectFilter, ProjectWatcher, Rescanner};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Config file read when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "prj.json";

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Discover, annotate and report on the software projects on this machine.
#[derive(clap::Parser)]
#[command(name = "prj", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file.
    ///
    /// Defaults to `./prj.json` when it exists.
    #[arg(short, long, global = true, env = "PRJ_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory holding the project cache.
    #[arg(long, global = true, env = "PRJ_DATA_DIR")]
    data_dir: Option<Utf8PathBuf>,

    /// Maximum recursion depth below the scan root.
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Maximum number of parallel metadata jobs.
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Scan a directory tree and merge the projects found into the cache.
    Scan {
        /// Root directory to scan.
        root: Utf8PathBuf,

        /// Show every diagnostic recorded during the scan.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Watch every cached project and rescan it when it changes.
    Watch,

    /// List cached projects.
    List {
        /// Only projects of this language.
        #[arg(short, long)]
        language: Option<String>,

        /// Case-insensitive text matched against name, path and description.
        #[arg(short, long)]
        filter: Option<String>,

        /// Only projects carrying this tag (repeatable).
        #[arg(short, long)]
        tag: Vec<String>,

        /// Require every `--tag` instead of any.
        #[arg(long)]
        all_tags: bool,

        /// Only projects in this category.
        #[arg(long)]
        category: Option<String>,

        /// Only favourites.
        #[arg(long)]
        favorites: bool,
    },

    /// Show collection statistics.
    Stats,

    /// Show the most used dependencies.
    Deps {
        /// Number of dependencies to show.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Add or remove a tag.
    Tag {
        /// Project path.
        path: Utf8PathBuf,

        /// What to do.
        #[arg(value_enum)]
        action: TagAction,

        /// Tag text; normalised before storing.
        tag: String,
    },

    /// Show or set a project's category.
    ///
    /// Without a key, prints the current category and a suggestion.
    Category {
        /// Project path.
        path: Utf8PathBuf,

        /// Category key; `uncategorized` clears the assignment.
        key: Option<String>,
    },

    /// Set a project's note; without text, deletes it.
    Note {
        /// Project path.
        path: Utf8PathBuf,

        /// Note text.
        text: Option<String>,
    },

    /// Toggle a project's favourite flag.
    Favorite {
        /// Project path.
        path: Utf8PathBuf,
    },

    /// Record that a project was opened and print its path.
    Open {
        /// Project path.
        path: Utf8PathBuf,
    },

    /// Remove a project from the cache.
    Remove {
        /// Project path.
        path: Utf8PathBuf,
    },

    /// List recently opened projects.
    Recent,

    /// Export the collection.
    Report {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
}

/// Tag edit.
#[derive(Clone, Copy, clap::ValueEnum)]
enum TagAction {
    /// Add the tag.
    Add,
    /// Remove the tag.
    Remove,
}

/// Report output format.
#[derive(Clone, Copy, clap::ValueEnum)]
enum ReportFormat {
    /// JSON format.
    Json,
    /// CSV format.
    Csv,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the config file and applies command-line overrides.
///
/// # Errors
///
/// Returns an error if the file is unreadable or a value is invalid.
fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Utf8Path::new(DEFAULT_CONFIG_FILE))?,
    };

    if let Some(dir) = &cli.data_dir {
        config.store.data_dir.clone_from(dir);
    }
    if let Some(depth) = cli.max_depth {
        config.scan.max_depth = depth;
    }
    if let Some(jobs) = cli.jobs {
        config.scan.max_parallel_jobs = Some(jobs);
    }
    config.validate()?;
    Ok(config)
}

/// Opens the cache store, logging any file that had to be ignored.
fn open_store(config: &Config) -> color_eyre::Result<Arc<CacheStore>> {
    let (store, warnings) =
        CacheStore::open(&config.store.data_dir, config.store.max_recent_projects)?;
    for warning in &warnings {
        warn!(file = %warning.file, "{}", warning.message);
    }
    Ok(Arc::new(store))
}

/// Resolves a user-supplied path to the canonical form records are keyed by.
fn resolve_project(path: &Utf8Path) -> Utf8PathBuf {
    path.canonicalize_utf8().unwrap_or_else(|_| path.to_owned())
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs a scan in the background, cancelling it on Ctrl-C.
///
/// # Errors
///
/// Returns an error if the scan is rejected or the worker fails.
async fn run_scan(
    orchestrator: &ScanOrchestrator,
    root: &Utf8Path,
    detailed: bool,
) -> color_eyre::Result<()> {
    let mut handle = orchestrator.start_scan(root)?;
    let session = handle.session().clone();
    info!(root = %session.root(), "Scanning");

    loop {
        tokio::select! {
            event = handle.events().recv() => match event {
                Some(ScanEvent::Progress(stats)) => debug!(
                    dirs_visited = stats.dirs_visited,
                    projects_found = stats.projects_found,
                    "Progress"
                ),
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !session.is_cancelled() => {
                info!("Cancelling scan");
                session.cancel();
            }
        }
    }

    let outcome = tokio::task::spawn_blocking(move || handle.wait()).await??;
    print_scan_summary(&outcome, detailed);
    Ok(())
}

/// Watches every cached project and rescans changed ones until Ctrl-C.
///
/// # Errors
///
/// Returns an error if nothing is cached or the watcher cannot start.
async fn run_watch(config: &Config, store: Arc<CacheStore>) -> color_eyre::Result<()> {
    let projects: Vec<Utf8PathBuf> =
        store.with_collection(|c| c.iter().map(|r| r.path.clone()).collect());
    if projects.is_empty() {
        return Err(eyre!("no cached projects to watch; run `prj scan` first"));
    }

    let filter = ProjectFilter::new(&config.watch.ignore)
        .ignoring(resolve_project(&config.store.data_dir));
    let mut watcher = ProjectWatcher::new(projects, &config.watch, filter)?;
    info!(projects = watcher.projects().len(), "Watching; press Ctrl-C to stop");

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });

    let orchestrator = ScanOrchestrator::new(config.scan.clone(), store);
    Rescanner::new(orchestrator, Duration::from_millis(config.watch.debounce_ms))
        .run(&mut watcher, cancel)
        .await;
    watcher.shutdown().await?;
    Ok(())
}

/// Lists projects matching every given filter.
fn run_list(
    store: &CacheStore,
    language: Option<&str>,
    filter: Option<&str>,
    tags: &[String],
    all_tags: bool,
    category: Option<&str>,
    favorites: bool,
) -> color_eyre::Result<()> {
    let language = language
        .map(|label| Language::from_label(label).ok_or_else(|| eyre!("unknown language: {label}")))
        .transpose()?;

    let records: Vec<ProjectRecord> = store.with_collection(|collection| {
        let tagged: Option<Vec<&ProjectRecord>> =
            (!tags.is_empty()).then(|| collection.by_tags(tags, all_tags));
        collection
            .filter(filter, language)
            .into_iter()
            .filter(|r| !favorites || r.user.favorite)
            .filter(|r| category.is_none_or(|c| r.user.category == c))
            .filter(|r| tagged.as_ref().is_none_or(|t| t.iter().any(|x| x.path == r.path)))
            .cloned()
            .collect()
    });

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for record in &records {
        let star = if record.user.favorite { "*" } else { " " };
        let version = record.scan.version.as_ref().map_or("-", |v| v.raw());
        writeln!(
            handle,
            "{star} {:<28} {:<12} {:<12} {}",
            record.name,
            record.language_label(),
            version,
            record.path
        )?;
    }
    writeln!(handle, "{} project(s)", records.len())?;
    Ok(())
}

/// Prints collection and tag statistics.
fn run_stats(store: &CacheStore) -> color_eyre::Result<()> {
    let (summary, tags) = store.with_collection(|c| (c.summary(), c.tag_statistics()));

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle)?;
    writeln!(handle, "Collection Summary")?;
    writeln!(handle, "==================")?;
    writeln!(handle)?;
    writeln!(handle, "Projects:        {}", summary.total)?;
    writeln!(handle, "Total size:      {}", format_size(summary.total_size))?;
    writeln!(handle, "Under VCS:       {}", summary.with_vcs)?;
    writeln!(handle, "Favourites:      {}", summary.favorites)?;

    if !summary.by_language.is_empty() {
        writeln!(handle)?;
        writeln!(handle, "By language:")?;
        for (language, count) in &summary.by_language {
            writeln!(handle, "  {language:<14} {count}")?;
        }
    }
    if !tags.is_empty() {
        writeln!(handle)?;
        writeln!(handle, "Tags:")?;
        for (tag, count) in &tags {
            writeln!(handle, "  {tag:<14} {count}")?;
        }
    }
    Ok(())
}

/// Prints the most used dependencies.
fn run_deps(store: &CacheStore, top: usize) -> color_eyre::Result<()> {
    let stats = store.dependency_statistics();

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(
        handle,
        "{} unique dependencies across {} project(s), {} declarations",
        stats.total_unique, stats.projects_with_dependencies, stats.total_declarations
    )?;
    for (name, count) in stats.top(top) {
        writeln!(handle, "  {name:<32} {count}")?;
    }
    Ok(())
}

/// Shows or sets a category.
fn run_category(store: &CacheStore, path: &Utf8Path, key: Option<&str>) -> color_eyre::Result<()> {
    match key {
        Some(DEFAULT_CATEGORY) => store.clear_category(path)?,
        Some(key) => store.set_category(path, key)?,
        None => {
            let record = store
                .get(path)
                .ok_or_else(|| eyre!("unknown project: {path}"))?;
            let suggestion = store.suggest_category(path)?;

            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", record.user.category)?;
            if let Some(suggestion) = suggestion {
                writeln!(handle, "suggested: {suggestion}")?;
            }
            return Ok(());
        }
    }
    store.save()?;
    Ok(())
}

/// Prints the recent-access list.
fn run_recent(store: &CacheStore) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for entry in store.recent() {
        writeln!(handle, "{:<28} {}", entry.name, entry.path)?;
    }
    Ok(())
}

/// Exports the collection.
fn run_report(
    store: &CacheStore,
    format: ReportFormat,
    output: Option<&Utf8Path>,
) -> color_eyre::Result<()> {
    let collection = store.snapshot();

    let content = match format {
        ReportFormat::Json => generate_json_report(store, &collection.into_records())?,
        ReportFormat::Csv => generate_csv_report(collection.iter()),
    };

    if let Some(output_path) = output {
        std::fs::write(output_path, &content)?;
        info!(path = %output_path, "Report written");
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        write!(handle, "{content}")?;
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints the result of a scan.
fn print_scan_summary(outcome: &ScanOutcome, detailed: bool) {
    let report = outcome.report();
    let status = match outcome {
        ScanOutcome::Completed(_) if report.persisted => "completed",
        ScanOutcome::Completed(_) => "completed (not saved)",
        ScanOutcome::Cancelled(_) => "cancelled, cache untouched",
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Scan of {} {status}", report.root);
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Directories visited: {}", report.stats.dirs_visited);
    let _ = writeln!(handle, "Projects found:      {}", report.stats.projects_found);
    let _ = writeln!(handle, "  Added:             {}", report.merge.added);
    let _ = writeln!(handle, "  Updated:           {}", report.merge.updated);
    let _ = writeln!(handle, "  Removed:           {}", report.merge.removed);
    let _ = writeln!(handle, "Hit rate:            {:.1}%", report.stats.hit_rate());
    let _ = writeln!(handle, "Skipped:             {}", report.stats.skipped);
    let _ = writeln!(handle, "Diagnostics:         {}", report.diagnostics.len());
    let _ = writeln!(handle, "Elapsed:             {} ms", report.elapsed_ms);

    if detailed && !report.diagnostics.is_empty() {
        let _ = writeln!(handle);
        for diagnostic in &report.diagnostics {
            let _ = writeln!(handle, "  {diagnostic}");
        }
    }
}

/// Generates a JSON report.
fn generate_json_report(
    store: &CacheStore,
    projects: &[ProjectRecord],
) -> color_eyre::Result<String> {
    #[derive(serde::Serialize)]
    struct Report<'a> {
        summary: prj_scanner::CollectionSummary,
        dependencies: prj_scanner::DependencyStatistics,
        projects: &'a [ProjectRecord],
    }

    let summary = store.with_collection(prj_scanner::Collection::summary);
    let report = Report {
        summary,
        dependencies: store.dependency_statistics(),
        projects,
    };
    serde_json::to_string_pretty(&report)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| eyre!("Failed to serialize JSON: {e}"))
}

/// Generates a CSV report.
fn generate_csv_report<'a>(records: impl Iterator<Item = &'a ProjectRecord>) -> String {
    use std::fmt::Write;

    let mut output = String::from(
        "name,path,language,version,size,modified,vcs,category,tags,favorite,dependencies\n",
    );

    for record in records {
        let tags = record
            .user
            .tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");
        let _ = writeln!(
            output,
            "{},{},{},{},{},{},{},{},{},{},{}",
            escape_csv(&record.name),
            escape_csv(record.path.as_str()),
            record.language_label(),
            escape_csv(record.scan.version.as_ref().map_or("", |v| v.raw())),
            record.scan.size,
            record.scan.modified,
            record.scan.has_vcs,
            escape_csv(&record.user.category),
            escape_csv(&tags),
            record.user.favorite,
            record.scan.dependencies.count,
        );
    }

    output
}

/// Escapes a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_owned()
    }
}

/// Formats a byte count with a binary unit.
#[allow(clippy::cast_precision_loss)] // Display only
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = <Cli as clap::Parser>::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = load_config(&cli)?;
    let store = open_store(&config)?;

    match &cli.command {
        Commands::Scan { root, detailed } => {
            let orchestrator = ScanOrchestrator::new(config.scan.clone(), store);
            run_scan(&orchestrator, root, *detailed).await
        }
        Commands::Watch => run_watch(&config, store).await,
        Commands::List {
            language,
            filter,
            tag,
            all_tags,
            category,
            favorites,
        } => run_list(
            &store,
            language.as_deref(),
            filter.as_deref(),
            tag,
            *all_tags,
            category.as_deref(),
            *favorites,
        ),
        Commands::Stats => run_stats(&store),
        Commands::Deps { top } => run_deps(&store, *top),
        Commands::Tag { path, action, tag } => {
            let path = resolve_project(path);
            let changed = match action {
                TagAction::Add => store.add_tag(&path, tag)?,
                TagAction::Remove => store.remove_tag(&path, tag)?,
            };
            if changed {
                store.save()?;
            }
            Ok(())
        }
        Commands::Category { path, key } => {
            run_category(&store, &resolve_project(path), key.as_deref())
        }
        Commands::Note { path, text } => {
            let path = resolve_project(path);
            match text {
                Some(text) => store.set_note(&path, text)?,
                None => store.delete_note(&path)?,
            }
            store.save()?;
            Ok(())
        }
        Commands::Favorite { path } => {
            let favorite = store.toggle_favorite(&resolve_project(path))?;
            store.save()?;
            let mut handle = std::io::stdout().lock();
            writeln!(handle, "{}", if favorite { "favourite" } else { "not favourite" })?;
            Ok(())
        }
        Commands::Open { path } => {
            let path = resolve_project(path);
            store.track_access(&path)?;
            store.save()?;
            let mut handle = std::io::stdout().lock();
            writeln!(handle, "{path}")?;
            Ok(())
        }
        Commands::Remove { path } => {
            let record = store.remove_project(&resolve_project(path))?;
            store.save()?;
            info!(path = %record.path, "Removed project");
            Ok(())
        }
        Commands::Recent => run_recent(&store),
        Commands::Report { format, output } => run_report(&store, *format, output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_cli_parses_tag_command() {
        let cli = <Cli as clap::Parser>::try_parse_from(["prj", "tag", "/src/app", "add", "core"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tag { action: TagAction::Add, ref tag, .. } if tag == "core"
        ));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = <Cli as clap::Parser>::try_parse_from([
            "prj",
            "--config",
            "/definitely/missing/prj.json",
            "--max-depth",
            "2",
            "stats",
        ])
        .unwrap();
        assert!(load_config(&cli).is_err());

        let cli = <Cli as clap::Parser>::try_parse_from([
            "prj",
            "--data-dir",
            "/tmp/prj-test",
            "--max-depth",
            "2",
            "--jobs",
            "3",
            "stats",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.scan.max_depth, 2);
        assert_eq!(config.scan.max_parallel_jobs, Some(3));
        assert_eq!(config.store.data_dir, "/tmp/prj-test");
    }

    #[test]
    fn test_csv_report_header_and_row() {
        let mut record = ProjectRecord::new(
            Utf8PathBuf::from("/src/app"),
            prj_core::ScanFacts {
                language: Some(Language::Rust),
                size: 10,
                ..Default::default()
            },
        );
        record.user.tags.insert("core".to_owned());
        record.user.tags.insert("web".to_owned());
        let csv = generate_csv_report(std::iter::once(&record));
        insta::assert_snapshot!(csv, @r"
        name,path,language,version,size,modified,vcs,category,tags,favorite,dependencies
        app,/src/app,Rust,,10,0,false,uncategorized,core;web,false,0
        ");
    }
}
