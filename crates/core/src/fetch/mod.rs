use std::path::PathBuf;

use crate::{OverlayError, Result, StreamConfig};

/// URL of the canonical configuration of `scene`, or `None` when no config
/// server is configured. The URL doubles as the scene key for persistence.
pub fn config_url(server: Option<&str>, scene: &str) -> Option<String> {
    let server = server?.trim_end_matches('/');
    Some(format!("{server}/{scene}.json"))
}

/// Fetch collaborator: resolves a config URL to a parsed configuration.
pub trait ConfigFetcher {
    fn fetch(&self, url: &str) -> Result<StreamConfig>;
}

impl<T: ConfigFetcher + ?Sized> ConfigFetcher for &T {
    fn fetch(&self, url: &str) -> Result<StreamConfig> {
        (**self).fetch(url)
    }
}

/// Reads configurations from the local filesystem. Accepts plain paths and
/// `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl FileFetcher {
    fn path_of(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

impl ConfigFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<StreamConfig> {
        let path = Self::path_of(url);
        let content = std::fs::read_to_string(&path).map_err(|err| OverlayError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        StreamConfig::from_json(&content)
    }
}

/// Fetches configurations from a config server over HTTP.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OverlayError::msg(format!("cannot build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ConfigFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<StreamConfig> {
        let fetch_error = |reason: String| OverlayError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("server returned {}", response.status())));
        }

        response
            .json::<StreamConfig>()
            .map_err(|e| fetch_error(format!("invalid configuration: {e}")))
    }
}
