//! Proxy configuration.
//!
//! Provides [`ProxyConfig`], the immutable configuration shared by every
//! request. Values come from defaults, an optional JSON file named by
//! `S3PROXY_CONFIG`, and environment variable overrides, in that order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Index file names probed when a directory is requested, in order.
pub const DEFAULT_INDEX_NAMES: [&str; 2] = ["index.html", "index.txt"];

/// Largest page size a listing request may ask for.
pub const MAX_LISTING_KEYS: i32 = 1000;

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_FILE_ENV: &str = "S3PROXY_CONFIG";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No bucket was configured.
    #[error("a bucket must be configured (S3PROXY_BUCKET)")]
    MissingBucket,

    /// An error page was keyed by something other than an HTTP status.
    #[error("invalid error page status: {0}")]
    InvalidErrorStatus(String),

    /// An error page entry was not of the form `status=key`.
    #[error("invalid error page entry: {0}")]
    InvalidErrorPage(String),

    /// The configured region is empty.
    #[error("region must not be empty when set")]
    EmptyRegion,

    /// The store backend name is unknown.
    #[error("unknown store backend: {0}")]
    InvalidBackend(String),

    /// The listing page size is outside `1..=1000`.
    #[error("listing page size must be between 1 and 1000, got {0}")]
    InvalidListingMaxKeys(String),

    /// The configuration file could not be read.
    #[error("failed to read config file {}", path.display())]
    ReadFile {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`ProxyConfig`].
    #[error("failed to parse config file {}", path.display())]
    ParseFile {
        /// Path of the file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The listing template file could not be read.
    #[error("failed to read browse template {}", path.display())]
    ReadTemplate {
        /// Path of the template.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The listing template file does not compile.
    #[error("invalid browse template {}", path.display())]
    ParseTemplate {
        /// Path of the template.
        path: PathBuf,
        /// Template syntax error.
        #[source]
        source: minijinja::Error,
    },
}

/// Object store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Amazon S3 or any S3-compatible endpoint.
    #[default]
    Aws,
    /// Process-local in-memory store, for development.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" | "s3" => Ok(Self::Aws),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidBackend(s.to_owned())),
        }
    }
}

/// Proxy configuration.
///
/// # Examples
///
/// ```
/// use s3proxy_core::config::ProxyConfig;
///
/// let config = ProxyConfig::builder().bucket("assets".into()).build();
/// assert_eq!(config.index_names, vec!["index.html", "index.txt"]);
/// assert!(!config.enable_browse);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default, rename_all = "snake_case")]
pub struct ProxyConfig {
    /// Bind address of the server (e.g. `"0.0.0.0:8080"`).
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub gateway_listen: String,

    /// Log level filter string used when `RUST_LOG` is unset.
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Root path template joined in front of every request path.
    #[builder(default)]
    pub root: String,

    /// The bucket objects are served from.
    pub bucket: String,

    /// Store region.
    #[builder(default)]
    pub region: Option<String>,

    /// Non-standard store endpoint.
    #[builder(default)]
    pub endpoint: Option<String>,

    /// Use path-style addressing.
    #[builder(default = false)]
    pub force_path_style: bool,

    /// Use transfer acceleration.
    #[builder(default = false)]
    pub use_accelerate: bool,

    /// Which store implementation to use.
    #[builder(default)]
    pub backend: StoreBackend,

    /// Index file names probed for directory requests.
    #[builder(default = default_index_names())]
    pub index_names: Vec<String>,

    /// Hide patterns; matching keys are reported as not found.
    #[builder(default)]
    pub hide: Vec<String>,

    /// Allow PUT uploads.
    #[builder(default = false)]
    pub enable_put: bool,

    /// Allow DELETE.
    #[builder(default = false)]
    pub enable_delete: bool,

    /// Render directory listings when no index file exists.
    #[builder(default = false)]
    pub enable_browse: bool,

    /// Jinja template file for HTML listings; the built-in page when unset.
    #[builder(default)]
    pub browse_template: Option<PathBuf>,

    /// Fallback object key (or `pass_through`) per HTTP status.
    #[builder(default)]
    pub error_pages: BTreeMap<u16, String>,

    /// Fallback object key (or `pass_through`) for statuses without their own page.
    #[builder(default)]
    pub default_error_page: Option<String>,

    /// Route hidden-key 404s through the error page mechanism.
    #[builder(default = false)]
    pub hidden_error_pages: bool,

    /// Listing page size used when the request does not ask for one.
    #[builder(default)]
    pub listing_max_keys: Option<i32>,
}

fn default_index_names() -> Vec<String> {
    DEFAULT_INDEX_NAMES.iter().map(|s| (*s).to_owned()).collect()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::builder().bucket(String::new()).build()
    }
}

impl ProxyConfig {
    /// Load configuration from the optional config file and the environment, then validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_with(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// The config file named by `S3PROXY_CONFIG` (or defaults) plus overrides, without validation.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Read configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_owned(),
            source,
        })
    }

    /// Apply overrides looked up by variable name.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `GATEWAY_LISTEN` | `gateway_listen` |
    /// | `LOG_LEVEL` | `log_level` |
    /// | `S3PROXY_ROOT` | `root` |
    /// | `S3PROXY_BUCKET` | `bucket` |
    /// | `S3PROXY_REGION`, `AWS_REGION` | `region` |
    /// | `S3PROXY_ENDPOINT` | `endpoint` |
    /// | `S3PROXY_FORCE_PATH_STYLE` | `force_path_style` |
    /// | `S3PROXY_USE_ACCELERATE` | `use_accelerate` |
    /// | `S3PROXY_BACKEND` | `backend` |
    /// | `S3PROXY_INDEX_NAMES` | `index_names` (comma separated) |
    /// | `S3PROXY_HIDE` | `hide` (comma separated) |
    /// | `S3PROXY_ENABLE_PUT` | `enable_put` |
    /// | `S3PROXY_ENABLE_DELETE` | `enable_delete` |
    /// | `S3PROXY_ENABLE_BROWSE` | `enable_browse` |
    /// | `S3PROXY_BROWSE_TEMPLATE` | `browse_template` |
    /// | `S3PROXY_ERROR_PAGES` | `error_pages` (`404=_404.html,500=oops.html`) |
    /// | `S3PROXY_DEFAULT_ERROR_PAGE` | `default_error_page` |
    /// | `S3PROXY_HIDDEN_ERROR_PAGES` | `hidden_error_pages` |
    /// | `S3PROXY_LISTING_MAX_KEYS` | `listing_max_keys` |
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GATEWAY_LISTEN") {
            self.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("S3PROXY_ROOT") {
            self.root = v;
        }
        if let Some(v) = lookup("S3PROXY_BUCKET") {
            self.bucket = v;
        }
        if let Some(v) = lookup("S3PROXY_REGION").or_else(|| lookup("AWS_REGION")) {
            self.region = Some(v);
        }
        if let Some(v) = lookup("S3PROXY_ENDPOINT") {
            self.endpoint = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("S3PROXY_FORCE_PATH_STYLE") {
            self.force_path_style = parse_bool(&v);
        }
        if let Some(v) = lookup("S3PROXY_USE_ACCELERATE") {
            self.use_accelerate = parse_bool(&v);
        }
        if let Some(v) = lookup("S3PROXY_BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = lookup("S3PROXY_INDEX_NAMES") {
            self.index_names = parse_list(&v);
        }
        if let Some(v) = lookup("S3PROXY_HIDE") {
            self.hide = parse_list(&v);
        }
        if let Some(v) = lookup("S3PROXY_ENABLE_PUT") {
            self.enable_put = parse_bool(&v);
        }
        if let Some(v) = lookup("S3PROXY_ENABLE_DELETE") {
            self.enable_delete = parse_bool(&v);
        }
        if let Some(v) = lookup("S3PROXY_ENABLE_BROWSE") {
            self.enable_browse = parse_bool(&v);
        }
        if let Some(v) = lookup("S3PROXY_BROWSE_TEMPLATE") {
            self.browse_template = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some(v) = lookup("S3PROXY_ERROR_PAGES") {
            self.error_pages = parse_error_pages(&v)?;
        }
        if let Some(v) = lookup("S3PROXY_DEFAULT_ERROR_PAGE") {
            self.default_error_page = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("S3PROXY_HIDDEN_ERROR_PAGES") {
            self.hidden_error_pages = parse_bool(&v);
        }
        if let Some(v) = lookup("S3PROXY_LISTING_MAX_KEYS") {
            let n = v
                .trim()
                .parse::<i32>()
                .map_err(|_| ConfigError::InvalidListingMaxKeys(v.clone()))?;
            self.listing_max_keys = Some(n);
        }
        Ok(())
    }

    /// Check the invariants the proxy relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(ConfigError::EmptyRegion);
        }
        if let Some(status) = self.error_pages.keys().find(|s| !(100..=599).contains(*s)) {
            return Err(ConfigError::InvalidErrorStatus(status.to_string()));
        }
        if let Some(n) = self.listing_max_keys {
            if !(1..=MAX_LISTING_KEYS).contains(&n) {
                return Err(ConfigError::InvalidListingMaxKeys(n.to_string()));
            }
        }
        Ok(())
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_error_pages(value: &str) -> Result<BTreeMap<u16, String>, ConfigError> {
    let mut pages = BTreeMap::new();
    for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (status, key) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidErrorPage(entry.to_owned()))?;
        let status = status
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidErrorStatus(status.trim().to_owned()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidErrorPage(entry.to_owned()));
        }
        pages.insert(status, key.to_owned());
    }
    Ok(pages)
}
