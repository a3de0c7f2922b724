//! Tieba-Mirror main entry point
//!
//! This is the command-line interface for the Tieba-Mirror thread archiver.

use anyhow::{bail, Context};
use clap::Parser;
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};
use tieba_mirror::config::{
    load_config_with_hash, validate, validate_concurrency, Config, Credentials, Layout,
};
use tieba_mirror::crawler::{
    format_listing, list_forum, select_thread, CrawlContext, CrawlCoordinator, PageRange,
    ScopeFilter,
};
use tieba_mirror::mirror::{collect_image_urls, ImageMirror, MirrorMode};
use tieba_mirror::model::Document;
use tieba_mirror::output::{
    determine_output_path, generate_html, json_path, load_document, save_document,
};
use tieba_mirror::ArchiveError;
use tracing_subscriber::EnvFilter;

/// Tieba-Mirror: archive a discussion thread into one local page
///
/// Crawls every page of a thread together with all nested comments, saves
/// the result as JSON, renders it to HTML, and can mirror every referenced
/// image into content-addressed local storage.
#[derive(Parser, Debug)]
#[command(name = "tieba-mirror")]
#[command(version)]
#[command(about = "Archive a Tieba thread into a single page", long_about = None)]
struct Cli {
    /// Thread id (the number in https://tieba.baidu.com/p/<TID>)
    #[arg(value_name = "TID", required_unless_present_any = ["import_cookies", "tieba"])]
    tid: Option<u64>,

    /// Output file or directory for the rendered page
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Browse a forum by name and pick the thread to archive
    #[arg(short = 't', long, value_name = "NAME", conflicts_with_all = ["tid", "from_json"])]
    tieba: Option<String>,

    /// Forum listing page to browse (0-based)
    #[arg(short = 'p', long, value_name = "PN", default_value_t = 0, requires = "tieba")]
    pn: u32,

    /// Open the rendered page in the default browser when done
    #[arg(short, long)]
    browser: bool,

    /// Only keep posts by the thread author
    #[arg(short = 'l', long)]
    see_lz: bool,

    /// Mirror images into the shared image directory
    #[arg(short, long, conflicts_with = "separate")]
    download: bool,

    /// Mirror images into a directory named after the thread
    #[arg(short, long)]
    separate: bool,

    /// Maximum simultaneous image downloads
    #[arg(short = 'n', long, value_name = "N")]
    img_task_size: Option<usize>,

    /// Page range to keep, e.g. 2-5, 3- or 4
    #[arg(long, value_name = "START-END")]
    pages: Option<PageRange>,

    /// Page layout of the rendered document
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    /// Render from the saved JSON record instead of crawling
    #[arg(long, conflicts_with_all = ["pages", "see_lz"])]
    from_json: bool,

    /// Read a raw Cookie header from stdin, save it as the cookies file and exit
    #[arg(long, conflicts_with_all = ["from_json", "download", "separate"])]
    import_cookies: bool,

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

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    if cli.import_cookies {
        return handle_import_cookies(&config);
    }

    let tid = match (&cli.tieba, cli.tid) {
        (Some(forum), _) => match pick_from_forum(&config, forum, cli.pn).await {
            Ok(tid) => tid,
            Err(e) => {
                tracing::error!("{:#}", e);
                return Err(e);
            }
        },
        (None, Some(tid)) => tid,
        (None, None) => bail!("a thread id is required"),
    };

    match handle_archive(&cli, &config, tid).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("{:#}", e);
            Err(e)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tieba_mirror=info,warn"),
            1 => EnvFilter::new("tieba_mirror=debug,info"),
            2 => EnvFilter::new("tieba_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file when given, defaults otherwise
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("reading {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Handles --import-cookies: stdin header to cookies file
fn handle_import_cookies(config: &Config) -> anyhow::Result<()> {
    let mut header = String::new();
    std::io::stdin()
        .read_to_string(&mut header)
        .context("reading cookie header from stdin")?;

    let credentials = Credentials::parse_cookie_header(&header);
    if credentials.is_empty() {
        bail!("no cookies found in input");
    }

    let path = Path::new(&config.credentials.cookies_path);
    credentials.save(path)?;
    println!("✓ Saved {} cookies to {}", credentials.len(), path.display());
    Ok(())
}

/// Handles --tieba: lists a forum page and asks which thread to archive
async fn pick_from_forum(config: &Config, forum: &str, pn: u32) -> anyhow::Result<u64> {
    let context = CrawlContext::from_config(config, load_credentials(config)?)?;
    let threads = match list_forum(&context, forum, pn).await {
        Ok(threads) => threads,
        Err(e) if e.is_security_challenge() => {
            tracing::error!(
                "The site answered with a security check; import fresh cookies with --import-cookies"
            );
            return Err(ArchiveError::from(e).into());
        }
        Err(e) => return Err(ArchiveError::from(e).into()),
    };
    if threads.is_empty() {
        bail!("forum '{}' page {} lists no threads", forum, pn);
    }

    print!("{}", format_listing(&threads));
    print!("Thread number: ");
    std::io::stdout().flush().context("writing prompt")?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("reading thread number from stdin")?;

    match select_thread(&threads, &answer) {
        Some(tid) => Ok(tid),
        None => bail!(
            "'{}' is not a listed thread number (0-{})",
            answer.trim(),
            threads.len() - 1
        ),
    }
}

/// Loads the saved cookies, anonymous when there are none
fn load_credentials(config: &Config) -> anyhow::Result<Credentials> {
    let cookies_path = Path::new(&config.credentials.cookies_path);
    let credentials = Credentials::load(cookies_path)?;
    if credentials.is_empty() {
        tracing::info!("No cookies at {}, crawling anonymously", cookies_path.display());
    }
    Ok(credentials)
}

/// Crawls (or loads) a thread, mirrors its images and renders it
async fn handle_archive(cli: &Cli, config: &Config, tid: u64) -> anyhow::Result<()> {
    let concurrency = cli.img_task_size.unwrap_or(config.mirror.concurrency);
    validate_concurrency(concurrency)?;

    let json_dir = Path::new(&config.output.json_dir);
    let document = if cli.from_json {
        let path = json_path(json_dir, tid);
        tracing::info!("Rendering from saved record {}", path.display());
        load_document(&path)?
    } else {
        let document = crawl_thread(cli, config, tid).await?;
        save_document(&document, json_dir, tid)?;
        document
    };

    let mode = if cli.separate {
        MirrorMode::PerThread { thread_id: tid }
    } else if cli.download {
        MirrorMode::Combined
    } else {
        MirrorMode::None
    };

    let refs = collect_image_urls(&document);
    tracing::info!("Found {} distinct image references", refs.len());
    let mirror = ImageMirror::from_config(config)?;
    let images = mirror.mirror(&refs, mode, concurrency).await?;

    let layout = cli.layout.unwrap_or(config.output.layout);
    let output_path = determine_output_path(cli.output.as_deref(), &document.title);
    generate_html(&document, &images, layout, &output_path)?;

    println!(
        "✓ {}: {} pages, {} posts, {} comments -> {}",
        document.title,
        document.page_count(),
        document.post_count(),
        document.comment_count(),
        output_path.display()
    );

    if cli.browser {
        if let Err(e) = open::that(&output_path) {
            tracing::warn!("Could not open {} in a browser: {}", output_path.display(), e);
        }
    }
    Ok(())
}

async fn crawl_thread(cli: &Cli, config: &Config, tid: u64) -> anyhow::Result<Document> {
    let credentials = load_credentials(config)?;

    let scope = if cli.see_lz {
        ScopeFilter::ThreadAuthorOnly
    } else {
        ScopeFilter::All
    };

    let coordinator = CrawlCoordinator::from_config(config, credentials)?;
    match coordinator.crawl(tid, cli.pages, scope).await {
        Ok(document) => Ok(document),
        Err(e) if e.is_security_challenge() => {
            tracing::error!(
                "The site answered with a security check; import fresh cookies with --import-cookies"
            );
            Err(ArchiveError::from(e).into())
        }
        Err(e) => Err(ArchiveError::from(e).into()),
    }
}
