use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

/// Origin every request is sent to unless a config file overrides it.
pub const DEFAULT_BASE_URL: &str = "https://invflask-connectorstech7925-12l4k6at.leapcell.dev";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

const CONFIG_ENV: &str = "INVFLASK_CLIENT_CONFIG_DIR";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to determine configuration directory")]
    MissingDirectory,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("{0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("invalid base URL: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("base URL {0} is not an http(s) origin")]
    InvalidBaseUrl(String),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Whether cookies and other credentials travel with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsMode {
    Omit,
    Include,
}

impl CredentialsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsMode::Omit => "omit",
            CredentialsMode::Include => "include",
        }
    }
}

impl From<bool> for CredentialsMode {
    fn from(with_credentials: bool) -> Self {
        if with_credentials {
            CredentialsMode::Include
        } else {
            CredentialsMode::Omit
        }
    }
}

impl fmt::Display for CredentialsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URL, default headers and credentials flag for an [`ApiClient`].
///
/// The setters consume `self` and are meant to be chained before the value is
/// handed to [`ApiClient::new`]; the client only ever lends it out immutably.
///
/// [`ApiClient`]: crate::client::ApiClient
/// [`ApiClient::new`]: crate::client::ApiClient::new
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    default_headers: HeaderMap,
    with_credentials: bool,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self {
            base_url,
            default_headers: default_headers(),
            with_credentials: true,
        })
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn sends_credentials(&self) -> bool {
        self.with_credentials
    }

    pub fn credentials_mode(&self) -> CredentialsMode {
        CredentialsMode::from(self.with_credentials)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        raw.into_config()
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let raw = RawConfig::from_config(self)?;
        Ok(toml::to_string(&raw)?)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is a valid origin"),
            default_headers: default_headers(),
            with_credentials: true,
        }
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers
}

fn parse_base_url(input: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(input.trim())?;
    let is_http = matches!(url.scheme(), "http" | "https");
    if !is_http || url.cannot_be_a_base() || url.host().is_none() {
        return Err(ConfigError::InvalidBaseUrl(input.to_string()));
    }
    Ok(url)
}

// Field order matters for TOML output: plain keys must precede the table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    with_credentials: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

impl RawConfig {
    fn into_config(self) -> Result<ClientConfig, ConfigError> {
        let mut config = match self.base_url {
            Some(base_url) => ClientConfig::new(&base_url)?,
            None => ClientConfig::default(),
        };

        for (name, value) in self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|err| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: err.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|err| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: err.to_string(),
                })?;
            config = config.with_header(header_name, header_value);
        }

        if let Some(enabled) = self.with_credentials {
            config = config.with_credentials(enabled);
        }

        Ok(config)
    }

    fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut headers = BTreeMap::new();
        for (name, value) in config.default_headers() {
            let value = value.to_str().map_err(|err| ConfigError::InvalidHeader {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
            headers.insert(name.to_string(), value.to_string());
        }

        Ok(Self {
            base_url: Some(config.base_url().to_string()),
            with_credentials: Some(config.sends_credentials()),
            headers,
        })
    }
}

/// Reads and writes the optional `config.toml` override used by the CLI.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let dir = determine_base_dir()?;
        Ok(Self { base_dir: dir })
    }

    pub fn with_base_dir<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Load the config file, or `None` when it does not exist.
    pub fn load_optional(&self) -> Result<Option<ClientConfig>, ConfigError> {
        let contents = match fs::read_to_string(self.config_file()) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        ClientConfig::from_toml_str(&contents).map(Some)
    }

    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        Ok(self.load_optional()?.unwrap_or_default())
    }

    pub fn save(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.base_dir)?;
        let contents = config.to_toml_string()?;
        fs::write(self.config_file(), contents)?;
        Ok(())
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn determine_base_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let dirs = ProjectDirs::from("dev", "invflask", "invflask-client")
        .ok_or(ConfigError::MissingDirectory)?;
    Ok(dirs.config_dir().to_path_buf())
}
