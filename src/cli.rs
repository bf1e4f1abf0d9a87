use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape the bibliography, reconcile duplicates, export CSV/HTML.
    Scrape(ScrapeArgs),
    /// Regenerate the HTML report from an existing CSV export.
    Render(RenderArgs),
    /// Delete the on-disk page cache.
    ClearCache(ClearCacheArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Html,
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Works listing URL (default: the configured site's works page).
    #[arg(long)]
    pub url: Option<String>,

    /// Output directory for exported files.
    #[arg(long, default_value = "output")]
    pub out: String,

    /// Output format(s); repeat the flag to export several.
    #[arg(long = "format", value_enum, default_values_t = [OutputFormat::Csv, OutputFormat::Html])]
    pub formats: Vec<OutputFormat>,

    /// Path to a TOML settings file.
    #[arg(long)]
    pub config: Option<String>,

    /// Maximum concurrent detail-page fetches.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Minimum delay between requests (politeness).
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Directory for the page cache.
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Fetch every page fresh, bypassing the cache.
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Input CSV file (default: the most recent export under --out).
    #[arg(long)]
    pub csv: Option<String>,

    /// Directory holding exports; the HTML file is written here too.
    #[arg(long, default_value = "output")]
    pub out: String,
}

#[derive(Debug, Args)]
pub struct ClearCacheArgs {
    /// Directory for the page cache.
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Path to a TOML settings file.
    #[arg(long)]
    pub config: Option<String>,
}
