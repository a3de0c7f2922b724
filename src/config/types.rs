use serde::Deserialize;

/// Main configuration structure for Tieba-Mirror
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Site root that thread, comment and relative image URLs are built on
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of comments the source serves per comment sub-page
    #[serde(rename = "comment-page-size", default = "default_comment_page_size")]
    pub comment_page_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            comment_page_size: default_comment_page_size(),
        }
    }
}

/// Session credential configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// Path to the JSON cookie jar
    #[serde(rename = "cookies-path", default = "default_cookies_path")]
    pub cookies_path: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            cookies_path: default_cookies_path(),
        }
    }
}

/// Image mirror configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Maximum number of concurrent image downloads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Directory name shared by every thread in combined mode
    #[serde(rename = "combined-dir", default = "default_combined_dir")]
    pub combined_dir: String,

    /// Directory that mirror directories are created under
    #[serde(default = "default_root")]
    pub root: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            combined_dir: default_combined_dir(),
            root: default_root(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that `{tid}.json` records are written to
    #[serde(rename = "json-dir", default = "default_root")]
    pub json_dir: String,

    /// Rendered page layout
    #[serde(default)]
    pub layout: Layout,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_dir: default_root(),
            layout: Layout::default(),
        }
    }
}

/// How the rendered document is laid out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Every post in one continuous flow
    #[default]
    Single,
    /// One section per source page with page navigation
    Paginated,
}

fn default_base_url() -> String {
    "https://tieba.baidu.com".to_string()
}

fn default_user_agent() -> String {
    format!("tieba-mirror/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_comment_page_size() -> usize {
    10
}

fn default_cookies_path() -> String {
    "cookies.json".to_string()
}

fn default_concurrency() -> usize {
    100
}

fn default_combined_dir() -> String {
    "imgs".to_string()
}

fn default_root() -> String {
    ".".to_string()
}
