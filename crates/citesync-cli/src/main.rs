use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use citesync_core::config_file::{self, ConfigFile};
use citesync_core::record::DEFAULT_CHECKED_FIELD;
use citesync_core::site_config::{self, DEFAULT_SITE_CONFIG};
use citesync_core::source::{
    CitationSource, DEFAULT_MAX_PAGES, JsonFileSource, ScholarProfile, SerpApi, SourceKind,
};
use citesync_core::{CoreError, DEFAULT_FUZZY_THRESHOLD, ReconcileOptions, SyncOptions};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

const DEFAULT_PUBLICATIONS: &str = "data/publications.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOP: usize = 5;

/// Citation Sync - Refresh citation counts in a website's publication list
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch citation counts and update the publications file (default)
    Sync(SyncArgs),

    /// Print the resolved configuration and where each value came from
    ShowConfig(SyncArgs),
}

#[derive(Args, Debug, Default)]
struct SyncArgs {
    /// Path to the publications JSON file
    #[arg(short, long)]
    publications: Option<PathBuf>,

    /// Google Scholar author id
    #[arg(long)]
    scholar_id: Option<String>,

    /// Website config.json to read the Scholar id from
    #[arg(long)]
    site_config: Option<PathBuf>,

    /// Citation source: serpapi, scholar or file
    #[arg(long)]
    source: Option<String>,

    /// SerpAPI key
    #[arg(long)]
    serpapi_key: Option<String>,

    /// JSON export of (title, citations) pairs, for the file source
    #[arg(long)]
    citations_file: Option<PathBuf>,

    /// Fuzzy match threshold in [0, 1]
    #[arg(long)]
    threshold: Option<f64>,

    /// Field that records when citations were last checked
    #[arg(long)]
    checked_field: Option<String>,

    /// Maximum result pages to fetch from the source
    #[arg(long)]
    max_pages: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Reconcile and report without writing the publications file
    #[arg(long)]
    dry_run: bool,

    /// Print one line per publication
    #[arg(long)]
    list: bool,

    /// Number of most cited publications to show [default: 5]
    #[arg(long)]
    top: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

/// Settings after applying CLI flags, environment, config files and defaults.
struct Resolved {
    publications: PathBuf,
    scholar_id: Option<String>,
    scholar_id_origin: &'static str,
    source: SourceKind,
    serpapi_key: Option<String>,
    citations_file: Option<PathBuf>,
    threshold: f64,
    checked_field: String,
    max_pages: usize,
    timeout: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => sync(SyncArgs::default()).await,
        Some(Command::Sync(args)) => sync(args).await,
        Some(Command::ShowConfig(args)) => show_config(args),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Non-empty value of an environment variable.
fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve settings. `env` looks up environment variables and returns `None`
/// for unset or empty ones, so the cascade falls through to the next layer.
fn resolve(
    args: &SyncArgs,
    config: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Resolved> {
    let author = config.author.clone().unwrap_or_default();
    let source_cfg = config.source.clone().unwrap_or_default();
    let api_keys = config.api_keys.clone().unwrap_or_default();
    let matching = config.matching.clone().unwrap_or_default();
    let paths = config.paths.clone().unwrap_or_default();

    let publications = args
        .publications
        .clone()
        .or_else(|| env("CITESYNC_PUBLICATIONS").map(PathBuf::from))
        .or_else(|| paths.publications.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLICATIONS));

    // Author id: CLI > env > TOML > site config
    let (scholar_id, scholar_id_origin) = if let Some(id) = args.scholar_id.clone() {
        (Some(id), "command line")
    } else if let Some(id) = env("CITESYNC_SCHOLAR_ID") {
        (Some(id), "CITESYNC_SCHOLAR_ID")
    } else if let Some(id) = author.scholar_id.filter(|id| !id.trim().is_empty()) {
        (Some(id), "config file")
    } else {
        let explicit = args
            .site_config
            .clone()
            .or_else(|| author.site_config.map(PathBuf::from));
        (site_config_id(explicit.as_deref())?, "site config")
    };
    let scholar_id = scholar_id.filter(|id| !id.trim().is_empty());

    let source_name = args.source.clone().or(source_cfg.provider);
    let source = match source_name {
        Some(name) => SourceKind::parse(&name).ok_or_else(|| {
            anyhow::anyhow!("Unknown source '{}'. Expected serpapi, scholar or file", name)
        })?,
        None => SourceKind::default(),
    };

    let serpapi_key = args
        .serpapi_key
        .clone()
        .or_else(|| env("SERP_API_KEY"))
        .or(api_keys.serpapi_key)
        .filter(|k| !k.is_empty());

    let citations_file = args
        .citations_file
        .clone()
        .or_else(|| source_cfg.citations_file.map(PathBuf::from));

    let threshold = args
        .threshold
        .or(matching.threshold)
        .unwrap_or(DEFAULT_FUZZY_THRESHOLD);
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("Fuzzy threshold must be between 0 and 1, got {}", threshold);
    }

    let checked_field = args
        .checked_field
        .clone()
        .or(matching.checked_field)
        .unwrap_or_else(|| DEFAULT_CHECKED_FIELD.to_string());

    let max_pages = args
        .max_pages
        .or(source_cfg.max_pages)
        .unwrap_or(DEFAULT_MAX_PAGES);
    let timeout_secs = args
        .timeout
        .or(source_cfg.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(Resolved {
        publications,
        scholar_id,
        scholar_id_origin,
        source,
        serpapi_key,
        citations_file,
        threshold,
        checked_field,
        max_pages,
        timeout: Duration::from_secs(timeout_secs),
    })
}

/// Read the author id from the website config. A missing default
/// `config.json` is not an error; an explicitly named one is.
fn site_config_id(explicit: Option<&Path>) -> anyhow::Result<Option<String>> {
    match explicit {
        Some(path) => Ok(site_config::load_scholar_id(path)?),
        None => {
            let path = Path::new(DEFAULT_SITE_CONFIG);
            if path.exists() {
                Ok(site_config::load_scholar_id(path)?)
            } else {
                Ok(None)
            }
        }
    }
}

fn build_source(resolved: &Resolved) -> Result<Box<dyn CitationSource>, CoreError> {
    match resolved.source {
        SourceKind::SerpApi => {
            let key = resolved.serpapi_key.clone().ok_or_else(|| {
                CoreError::Configuration(
                    "No SERP_API_KEY found (set it in .env, the environment or --serpapi-key)"
                        .to_string(),
                )
            })?;
            Ok(Box::new(
                SerpApi::new(key)?.with_max_pages(resolved.max_pages),
            ))
        }
        SourceKind::Scholar => Ok(Box::new(
            ScholarProfile::new().with_max_pages(resolved.max_pages),
        )),
        SourceKind::File => {
            let path = resolved.citations_file.clone().ok_or_else(|| {
                CoreError::Configuration(
                    "The file source needs --citations-file or [source] citations_file".to_string(),
                )
            })?;
            Ok(Box::new(JsonFileSource::new(path)))
        }
    }
}

async fn sync(args: SyncArgs) -> anyhow::Result<()> {
    let config = config_file::load_config();
    let resolved = resolve(&args, &config, process_env)?;
    tracing::debug!(
        publications = %resolved.publications.display(),
        source = resolved.source.as_str(),
        threshold = resolved.threshold,
        "resolved settings"
    );

    let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
    let color = ColorMode(use_color);
    let mut writer: Box<dyn Write> = Box::new(std::io::stdout());

    // A file export does not need an author id; the network sources do.
    let author_id = match (&resolved.scholar_id, resolved.source) {
        (Some(id), _) => id.clone(),
        (None, SourceKind::File) => String::from("offline"),
        (None, _) => anyhow::bail!(
            "No Google Scholar author id found. Pass --scholar-id, set CITESYNC_SCHOLAR_ID, \
             or add author.scholarId to {}",
            DEFAULT_SITE_CONFIG
        ),
    };

    let source = build_source(&resolved)?;
    output::print_run_header(
        &mut writer,
        &author_id,
        source.name(),
        &resolved.publications,
        color,
    )?;

    let options = SyncOptions {
        reconcile: ReconcileOptions {
            threshold: resolved.threshold,
            checked_field: resolved.checked_field.clone(),
        },
        timeout: resolved.timeout,
        dry_run: args.dry_run,
    };

    let client = reqwest::Client::builder().timeout(resolved.timeout).build()?;

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap());
    spinner.set_message(format!("Fetching citations from {}...", source.name()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let now = chrono::Local::now().naive_local();
    let result = citesync_core::sync_publications(
        &resolved.publications,
        source.as_ref(),
        &author_id,
        &client,
        &options,
        now,
        cancel,
    )
    .await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(CoreError::Cancelled) => {
            anyhow::bail!(
                "Interrupted; {} was not modified",
                resolved.publications.display()
            )
        }
        Err(CoreError::NotFound(path)) => {
            anyhow::bail!("Publications file not found: {}", path.display())
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(elapsed_ms = report.elapsed.as_millis() as u64, "sync finished");

    if args.list {
        output::print_record_outcomes(&mut writer, &report.reconciliation, color)?;
    }
    output::print_top_cited(
        &mut writer,
        &report.reconciliation,
        args.top.unwrap_or(DEFAULT_TOP),
        color,
    )?;
    output::print_summary(&mut writer, &report, color)?;

    Ok(())
}

fn show_config(args: SyncArgs) -> anyhow::Result<()> {
    let config = config_file::load_config();
    let resolved = resolve(&args, &config, process_env)?;
    let mut w = std::io::stdout();

    let platform = config_file::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(unavailable)".to_string());
    writeln!(w, "Config files: {}, ./.citesync.toml", platform)?;
    writeln!(w)?;
    writeln!(w, "publications   = {}", resolved.publications.display())?;
    match &resolved.scholar_id {
        Some(id) => writeln!(w, "scholar_id     = {} ({})", id, resolved.scholar_id_origin)?,
        None => writeln!(w, "scholar_id     = (not set)")?,
    }
    writeln!(w, "source         = {}", resolved.source.as_str())?;
    writeln!(
        w,
        "serpapi_key    = {}",
        if resolved.serpapi_key.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    )?;
    if let Some(path) = &resolved.citations_file {
        writeln!(w, "citations_file = {}", path.display())?;
    }
    writeln!(w, "threshold      = {}", resolved.threshold)?;
    writeln!(w, "checked_field  = {}", resolved.checked_field)?;
    writeln!(w, "max_pages      = {}", resolved.max_pages)?;
    writeln!(w, "timeout_secs   = {}", resolved.timeout.as_secs())?;
    Ok(())
}
