//! CLI argument definitions.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cache::{Method, TransformRequest, Visibility};
use crate::storage::AdapterKind;

/// imgcache - on-demand image transform cache.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "imgcache", version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "IMGCACHE_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (default: <config dir>/imgcache/config.toml)
    #[arg(long, short = 'c', global = true, env = "IMGCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base folder that source images and cache buckets live under
    #[arg(long, short = 'b', global = true, env = "IMGCACHE_BASE")]
    pub base: Option<PathBuf>,

    /// Storage adapter
    #[arg(long, global = true)]
    pub adapter: Option<AdapterKind>,

    #[command(flatten)]
    pub request: RequestArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Per-request overrides shared by every transform command.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Bucket name replacing the method folders (e.g. "avatar")
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Extra leading folder for the bucket
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Encoder quality for lossy formats (1-100)
    #[arg(long, global = true)]
    pub quality: Option<u8>,

    /// Allow upscaling past the natural dimensions
    #[arg(long, global = true)]
    pub enlarge: bool,

    /// Put the bucket under the hidden segment
    #[arg(long, global = true, conflicts_with = "visible")]
    pub hidden: bool,

    /// Keep the bucket visible even if the config hides it
    #[arg(long, global = true)]
    pub visible: bool,
}

impl RequestArgs {
    /// Copy the overrides that were given onto `request`.
    pub fn apply(&self, mut request: TransformRequest) -> TransformRequest {
        request.name.clone_from(&self.name);
        request.prefix.clone_from(&self.prefix);
        request.quality = self.quality;
        if self.enlarge {
            request.allow_enlarge = Some(true);
        }
        if self.hidden {
            request.visibility = Some(Visibility::Hidden);
        } else if self.visible {
            request.visibility = Some(Visibility::Visible);
        }
        request
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Transforms ===
    /// Resize to exact dimensions (aspect ratio ignored)
    Resize(SizeArgs),

    /// Cut a region at an offset
    Crop(CropArgs),

    /// Resize proportionally by width, height or both
    Scale(ScaleArgs),

    /// Cover-fit and center-crop to exact dimensions
    #[command(visible_alias = "thumb")]
    Thumbnail(SizeArgs),

    // === Inspection ===
    /// Print the cache key (and location, given a source) without transforming
    Key(KeyArgs),

    // === Batch ===
    /// Generate one transform for every image in a folder
    Warm(WarmArgs),

    // === Configuration ===
    /// Show current configuration
    Config(ConfigArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct SizeArgs {
    /// Source image, relative to the base folder
    pub source: PathBuf,

    /// Target width in pixels
    pub width: u32,

    /// Target height in pixels
    pub height: u32,
}

#[derive(Parser, Debug)]
pub struct CropArgs {
    /// Source image, relative to the base folder
    pub source: PathBuf,

    /// Region width in pixels
    pub width: u32,

    /// Region height in pixels
    pub height: u32,

    /// Left edge of the region
    #[arg(long, short = 'x', default_value = "0")]
    pub x: u32,

    /// Top edge of the region
    #[arg(long, short = 'y', default_value = "0")]
    pub y: u32,
}

#[derive(Parser, Debug)]
pub struct ScaleArgs {
    /// Source image, relative to the base folder
    pub source: PathBuf,

    /// Target width (height follows the aspect ratio if omitted)
    #[arg(long, short = 'W')]
    pub width: Option<u32>,

    /// Target height (width follows the aspect ratio if omitted)
    #[arg(long, short = 'H')]
    pub height: Option<u32>,
}

/// Transform selection shared by `key` and `warm`.
#[derive(Args, Debug, Clone)]
pub struct MethodArgs {
    /// Transform method
    #[arg(long, short = 'm', default_value = "thumbnail")]
    pub method: Method,

    /// Target width in pixels
    #[arg(long, short = 'W')]
    pub width: Option<u32>,

    /// Target height in pixels
    #[arg(long, short = 'H')]
    pub height: Option<u32>,

    /// Crop offset, left edge
    #[arg(long, default_value = "0")]
    pub x: u32,

    /// Crop offset, top edge
    #[arg(long, default_value = "0")]
    pub y: u32,
}

impl MethodArgs {
    /// Build the request; validation happens when the key is derived.
    pub fn to_request(&self) -> TransformRequest {
        TransformRequest {
            method: self.method,
            width: self.width,
            height: self.height,
            offset: (self.x, self.y),
            quality: None,
            name: None,
            prefix: None,
            allow_enlarge: None,
            visibility: None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct KeyArgs {
    #[command(flatten)]
    pub transform: MethodArgs,

    /// Also report where this source's artifact would live
    pub source: Option<PathBuf>,
}

/// Arguments for warming the cache from a directory.
///
/// # Examples
///
/// ```bash
/// # 200x200 thumbnails for every image in photos/
/// imgcache warm photos -W 200 -H 200
///
/// # Proportional 800px-wide copies for the whole tree
/// imgcache warm . --method scaled -W 800 --recursive
///
/// # List what would be generated
/// imgcache warm photos -W 64 -H 64 --dry-run
/// ```
#[derive(Parser, Debug)]
pub struct WarmArgs {
    /// Directory of source images, relative to the base folder
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub transform: MethodArgs,

    /// Descend into subdirectories (cache buckets are skipped)
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// Stop at the first failing image
    #[arg(long)]
    pub fail_fast: bool,

    /// Dry run - show where artifacts would go without generating them
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show configuration file path
    #[arg(long)]
    pub path: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
