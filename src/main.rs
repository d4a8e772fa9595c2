//! imgcache - on-demand image transform cache.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

use imgcache::batch::{self, ScanError};
use imgcache::cache::{CachedArtifact, ImageCache, KeyPolicy, Outcome, TransformRequest};
use imgcache::cli::{self, Cli, Commands};
use imgcache::codec::RasterCodec;
use imgcache::config::{self, CacheConfig};
use imgcache::error::{CacheError, Result, ResultExt};
use imgcache::logging::init_logging;
use imgcache::storage::{BoxedStorage, Storage};

type Cache = ImageCache<BoxedStorage, RasterCodec>;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Resize(args)) => cmd_transform(
            cli,
            &args.source,
            TransformRequest::resize(args.width, args.height),
        ),
        Some(Commands::Crop(args)) => cmd_transform(
            cli,
            &args.source,
            TransformRequest::crop(args.width, args.height, args.x, args.y),
        ),
        Some(Commands::Scale(args)) => cmd_transform(
            cli,
            &args.source,
            TransformRequest::scale(args.width, args.height),
        ),
        Some(Commands::Thumbnail(args)) => cmd_transform(
            cli,
            &args.source,
            TransformRequest::thumbnail(args.width, args.height),
        ),
        Some(Commands::Key(args)) => cmd_key(cli, args),
        Some(Commands::Warm(args)) => cmd_warm(cli, args),
        Some(Commands::Config(args)) => cmd_config(cli, args),
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => cmd_completions(cli, args),
    }
}

// === Quick Start ===

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "tool": "imgcache",
                "version": build_info::VERSION,
                "description": "On-demand image transform cache with deterministic cache paths",
                "transforms": {
                    "resize": "imgcache resize <SOURCE> <W> <H>",
                    "crop": "imgcache crop <SOURCE> <W> <H> -x <X> -y <Y>",
                    "scale": "imgcache scale <SOURCE> -W <W> | -H <H>",
                    "thumbnail": "imgcache thumbnail <SOURCE> <W> <H>",
                },
                "inspection": {
                    "key": "imgcache key -m thumbnail -W 64 -H 64 [SOURCE]",
                    "config": "imgcache config",
                },
                "batch": "imgcache warm <DIR> -m <METHOD> -W <W> -H <H> [--recursive]",
                "output_modes": {
                    "human": "--format=text (default)",
                    "robot": "--robot or --format=json",
                    "compact": "--format=json-compact",
                },
            }),
        );
    } else {
        println!(
            "{} {} - image transform cache\n",
            style("imgcache").bold().cyan(),
            build_info::VERSION
        );
        println!("{}", style("QUICK START").bold().underlined());
        println!();
        println!("  {}  Exact resize", style("imgcache resize cat.jpg 800 600").green());
        println!("  {}  Cover-fit thumbnail", style("imgcache thumbnail cat.jpg 64 64").green());
        println!("  {}  Proportional width", style("imgcache scale cat.jpg -W 400").green());
        println!("  {}  Region crop", style("imgcache crop cat.jpg 100 100 -x 10 -y 20").green());
        println!("  {}  Warm a folder", style("imgcache warm photos -W 200 -H 200").green());
        println!();
        println!("{}", style("ROBOT MODE").bold().underlined());
        println!();
        println!("  {}  JSON output", style("imgcache --robot <command>").cyan());
        println!();
        println!("Run {} for full help", style("imgcache --help").yellow());
    }
    Ok(())
}

// === Cache Setup ===

/// Effective config: file (or defaults) with CLI overrides on top.
fn load_settings(cli: &Cli) -> Result<CacheConfig> {
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(base) = &cli.base {
        config.base_folder.clone_from(base);
    }
    if let Some(adapter) = cli.adapter {
        config.adapter = adapter;
    }
    config.validate()?;
    Ok(config)
}

fn open_cache(cli: &Cli) -> Result<Cache> {
    ImageCache::from_config(load_settings(cli)?)
}

// === Transforms ===

/// One served artifact, as reported to the user.
#[derive(Serialize)]
struct ArtifactReport {
    source: String,
    outcome: Outcome,
    path: String,
    absolute_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}

impl ArtifactReport {
    fn new(source: &Path, artifact: &CachedArtifact) -> Self {
        let dimensions = artifact.dimensions();
        Self {
            source: source.display().to_string(),
            outcome: artifact.outcome(),
            path: artifact.public_path(),
            absolute_path: artifact.absolute_artifact_path(),
            key: artifact.key().map(ToString::to_string),
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
        }
    }
}

fn outcome_label(outcome: Outcome) -> String {
    match outcome {
        Outcome::Hit => style("cached").green().to_string(),
        Outcome::Generated => style("generated").cyan().to_string(),
        Outcome::Original => style("original").yellow().to_string(),
        Outcome::Missing => style("missing").dim().to_string(),
    }
}

fn cmd_transform(cli: &Cli, source: &Path, request: TransformRequest) -> Result<()> {
    let cache = open_cache(cli)?;
    let request = cli.request.apply(request);
    let artifact = cache.process(source, &request)?;

    if cli.use_json() {
        output_json(cli, &ArtifactReport::new(source, &artifact));
    } else if cli.quiet {
        println!("{}", artifact.public_path());
    } else {
        println!("{} {}", outcome_label(artifact.outcome()), artifact.public_path());
    }
    Ok(())
}

// === Inspection ===

fn cmd_key(cli: &Cli, args: &cli::KeyArgs) -> Result<()> {
    let request = cli.request.apply(args.transform.to_request());

    let Some(source) = &args.source else {
        let config = load_settings(cli)?;
        let key = KeyPolicy::from_config(&config).derive_cache_key(&request)?;
        if cli.use_json() {
            output_json(cli, &serde_json::json!({ "key": key }));
        } else {
            println!("{key}");
        }
        return Ok(());
    };

    let cache = open_cache(cli)?;
    let located = cache.locate(source, &request)?;
    if cli.use_json() {
        output_json(cli, &ArtifactReport::new(source, &located));
    } else {
        println!("{}", located.public_path());
        if !cli.quiet {
            println!("  key: {}", located.key().map(ToString::to_string).unwrap_or_default());
            println!("  status: {}", outcome_label(located.outcome()));
        }
    }
    Ok(())
}

// === Batch ===

/// Result for a single image in a warm run.
#[derive(Serialize)]
struct WarmItem {
    source: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Result of a warm run.
#[derive(Serialize, Default)]
struct WarmSummary {
    ok: bool,
    dry_run: bool,
    results: Vec<WarmItem>,
    generated: usize,
    cached: usize,
    original: usize,
    missing: usize,
    failed: usize,
}

impl WarmSummary {
    fn record(&mut self, source: &Path, result: &Result<CachedArtifact>) {
        let item = match result {
            Ok(artifact) => {
                match artifact.outcome() {
                    Outcome::Hit => self.cached += 1,
                    Outcome::Generated => self.generated += 1,
                    Outcome::Original => self.original += 1,
                    Outcome::Missing => self.missing += 1,
                }
                WarmItem {
                    source: source.display().to_string(),
                    ok: true,
                    outcome: Some(artifact.outcome()),
                    path: Some(artifact.public_path()),
                    error: None,
                }
            }
            Err(e) => {
                self.failed += 1;
                WarmItem {
                    source: source.display().to_string(),
                    ok: false,
                    outcome: None,
                    path: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.results.push(item);
        self.ok = self.failed == 0;
    }
}

fn scan_error(err: ScanError) -> CacheError {
    match err {
        ScanError::DirectoryNotFound(path) | ScanError::NotADirectory(path) => {
            CacheError::NotFound {
                path: path.display().to_string(),
            }
        }
        other => CacheError::Other(other.to_string()),
    }
}

fn warm_progress(cli: &Cli, len: usize) -> ProgressBar {
    if cli.use_json() || cli.quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(bar_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
    {
        bar.set_style(bar_style.progress_chars("=> "));
    }
    bar
}

fn cmd_warm(cli: &Cli, args: &cli::WarmArgs) -> Result<()> {
    let cache = open_cache(cli)?;
    let request = cli.request.apply(args.transform.to_request());

    // Reject a bad request once instead of once per image
    let key = cache.policy().derive_cache_key(&request)?;
    let bucket_root = key.as_str().split('/').next().unwrap_or_default();

    let scan_root = cache.storage().absolute(&args.dir);
    let scan =
        batch::scan_images(&scan_root, args.recursive, &[bucket_root]).map_err(scan_error)?;

    let mut summary = WarmSummary {
        ok: true,
        dry_run: args.dry_run,
        ..WarmSummary::default()
    };

    if !scan.has_images() {
        if cli.use_json() {
            output_json(cli, &summary);
        } else if !cli.quiet {
            eprintln!("No supported images found in {}", args.dir.display());
        }
        return Ok(());
    }

    let progress = warm_progress(cli, scan.image_count());

    for entry in &scan.images {
        let source = args.dir.join(&entry.relative);
        progress.set_message(source.display().to_string());

        let result = if args.dry_run {
            cache.locate(&source, &request)
        } else {
            cache.process(&source, &request)
        };

        if let Err(e) = &result {
            warn!(source = %source.display(), error = %e, "Warm failed");
        }
        if !cli.use_json() && !cli.quiet {
            let line = match &result {
                Ok(artifact) => {
                    format!("{} {}", outcome_label(artifact.outcome()), artifact.public_path())
                }
                Err(e) => format!("{} {}: {e}", style("failed").red(), source.display()),
            };
            if progress.is_hidden() {
                println!("{line}");
            } else {
                progress.println(line);
            }
        }

        summary.record(&source, &result);
        progress.inc(1);

        match result {
            Err(e) if args.fail_fast => {
                progress.abandon();
                if cli.use_json() {
                    output_json(cli, &summary);
                }
                return Err(e);
            }
            _ => {}
        }
    }

    progress.finish_and_clear();

    if cli.use_json() {
        output_json(cli, &summary);
    } else if !cli.quiet {
        println!(
            "Warmed {} images: {} generated, {} cached, {} original, {} failed",
            scan.image_count(),
            summary.generated,
            summary.cached,
            summary.original,
            summary.failed
        );
    }

    Ok(())
}

// === Configuration ===

fn cmd_config(cli: &Cli, args: &cli::ConfigArgs) -> Result<()> {
    if args.path {
        let path = cli.config.clone().or_else(config::default_config_path);
        let exists = path.as_deref().is_some_and(Path::is_file);
        if cli.use_json() {
            output_json(cli, &serde_json::json!({ "path": path, "exists": exists }));
        } else {
            match path {
                Some(path) if exists => println!("{}", path.display()),
                Some(path) => println!("{} (not present, using defaults)", path.display()),
                None => println!("no config directory on this platform"),
            }
        }
        return Ok(());
    }

    let config = load_settings(cli)?;
    if cli.use_json() {
        output_json(cli, &config);
    } else {
        let text = toml::to_string_pretty(&config).with_context(|| "Failed to render config")?;
        print!("{text}");
    }
    Ok(())
}

// === Utilities ===

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        println!("imgcache {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(_cli: &Cli, args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "imgcache", &mut io::stdout());
    Ok(())
}

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

fn output_error(cli: &Cli, error: &CacheError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json:#}");
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
