//! Sumi-Trawl main entry point
//!
//! This is the command-line interface for the Sumi-Trawl crawler.

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use sumi_trawl::config::{load_config_with_hash, validate, Config};
use sumi_trawl::crawler::run_crawl;
use sumi_trawl::output::{print_statistics, DocumentSink, JsonLinesSink};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Sumi-Trawl: a protocol-agnostic crawler for search indexing
///
/// Sumi-Trawl follows links across HTTP(S), FTP, SFTP and the local file
/// system, and writes one JSON document per crawled location with its
/// title, links and main text content.
#[derive(Parser, Debug)]
#[command(name = "sumi-trawl")]
#[command(version)]
#[command(about = "A protocol-agnostic crawler for search indexing", long_about = None)]
struct Cli {
    /// Seed locations (URLs or local paths), added to the configured seeds
    #[arg(value_name = "SEED")]
    seeds: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Frontier queue capacity
    #[arg(long, value_name = "N")]
    buffer: Option<usize>,

    /// Write documents to FILE instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Stop after N documents
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli)?;
    validate(&config).context("Invalid configuration")?;

    if config.seeds.is_empty() {
        anyhow::bail!("No seed locations given; pass them as arguments or set `seeds` in the config");
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&config, cli.limit).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout may be carrying documents.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_trawl=info,warn"),
            1 => EnvFilter::new("sumi_trawl=debug,info"),
            2 => EnvFilter::new("sumi_trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Folds command-line flags into the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(jobs) = cli.jobs {
        config.crawler.workers = jobs;
    }
    if let Some(timeout) = cli.timeout {
        config.protocols.timeout_ms = timeout;
    }
    if let Some(buffer) = cli.buffer {
        config.crawler.queue_buffer = buffer;
    }
    if let Some(output) = &cli.output {
        config.output.path = Some(output.clone());
    }
    if !cli.seeds.is_empty() {
        let cwd = std::env::current_dir().context("Cannot determine the working directory")?;
        let seeds = cli
            .seeds
            .iter()
            .map(|seed| seed_location(seed, &config.protocols.enabled, &cwd))
            .collect::<anyhow::Result<Vec<_>>>()?;
        config.seeds.extend(seeds);
    }
    Ok(())
}

/// Turns a command-line seed into a location
///
/// A URL whose scheme has an enabled protocol is used as is. Anything else
/// that names an existing path (relative to `cwd`) becomes a `file` URL, so
/// `localhost:8080` or `notes:2024` on disk are not mistaken for schemes. A
/// URL with an unknown scheme and no matching path is passed through and
/// reported by the crawler.
fn seed_location(seed: &str, enabled: &[String], cwd: &Path) -> anyhow::Result<String> {
    let parsed = Url::parse(seed);
    if let Ok(url) = &parsed {
        if enabled.iter().any(|scheme| scheme == url.scheme()) {
            return Ok(seed.to_string());
        }
    }

    match cwd.join(seed).canonicalize() {
        Ok(path) => {
            let url = Url::from_file_path(&path)
                .map_err(|()| anyhow::anyhow!("Cannot express {} as a file URL", path.display()))?;
            Ok(url.to_string())
        }
        Err(_) if parsed.is_ok() => Ok(seed.to_string()),
        Err(e) => Err(e)
            .with_context(|| format!("Seed '{}' is neither a URL nor an existing path", seed)),
    }
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Trawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Queue buffer: {}", config.crawler.queue_buffer);
    println!("  Output buffer: {}", config.crawler.output_buffer);
    println!("  Timeout: {}ms", config.protocols.timeout_ms);
    println!("  Protocols: {}", config.protocols.enabled.join(", "));

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    if !config.decoders.is_empty() {
        println!("\nDecoder Overrides ({}):", config.decoders.len());
        for (content_type, kind) in &config.decoders {
            println!("  - {} => {:?}", content_type, kind);
        }
    }

    println!("\nOutput:");
    match &config.output.path {
        Some(path) => println!("  {}", path.display()),
        None => println!("  standard output"),
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, limit: Option<u64>) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} seeds with {} workers",
        config.seeds.len(),
        config.crawler.workers
    );

    let writer: Box<dyn Write + Send> = match &config.output.path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    let mut sink = JsonLinesSink::new(writer);

    let stats = run_crawl(config, &mut sink as &mut dyn DocumentSink, limit)
        .await
        .context("Crawl failed")?;

    tracing::info!("Crawl completed: {} documents", stats.documents);
    print_statistics(&stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn enabled() -> Vec<String> {
        vec!["http".to_string(), "https".to_string(), "file".to_string()]
    }

    #[test]
    fn test_seed_url_with_enabled_scheme_is_kept() {
        let dir = TempDir::new().unwrap();
        let seed = seed_location("https://example.com/a", &enabled(), dir.path()).unwrap();
        assert_eq!(seed, "https://example.com/a");
    }

    #[test]
    fn test_seed_path_becomes_file_url() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();

        let seed = seed_location("docs", &enabled(), dir.path()).unwrap();
        let expected = Url::from_file_path(dir.path().join("docs").canonicalize().unwrap()).unwrap();
        assert_eq!(seed, expected.to_string());
    }

    #[test]
    fn test_seed_path_that_looks_like_a_scheme() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("localhost:8080"), "x").unwrap();

        let seed = seed_location("localhost:8080", &enabled(), dir.path()).unwrap();
        assert!(seed.starts_with("file:///"), "unexpected seed {}", seed);
        assert!(seed.ends_with("/localhost:8080"), "unexpected seed {}", seed);
    }

    #[test]
    fn test_seed_unknown_scheme_without_path_passes_through() {
        let dir = TempDir::new().unwrap();
        let seed = seed_location("gopher://example.com/", &enabled(), dir.path()).unwrap();
        assert_eq!(seed, "gopher://example.com/");
    }

    #[test]
    fn test_seed_neither_url_nor_path_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(seed_location("no/such/dir", &enabled(), dir.path()).is_err());
    }
}
