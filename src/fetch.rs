//! Artifact retrieval
//!
//! A [`Fetcher`] turns a requirement URL into a byte stream. Nothing is
//! buffered here; the caller pulls bytes straight into the cache.

use crate::error::{BootError, BootResult};
use std::fs::File;
use std::io::Read;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Opens a byte stream for a URL
pub trait Fetcher {
    /// Open `url` for reading
    ///
    /// Connection failures and non-success responses are `Fetch` errors.
    fn open(&self, url: &Url) -> BootResult<Box<dyn Read>>;
}

/// Fetcher for `http`, `https` and `file` URLs
pub struct UrlFetcher {
    agent: ureq::Agent,
}

impl UrlFetcher {
    /// Create a fetcher, optionally bounding each request by `timeout`
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: config.into(),
        }
    }

    fn open_http(&self, url: &Url) -> BootResult<Box<dyn Read>> {
        let response = self.agent.get(url.as_str()).call().map_err(|e| match e {
            ureq::Error::StatusCode(code) => BootError::fetch(url, format!("HTTP status {}", code)),
            other => BootError::fetch(url, other),
        })?;
        debug!("{} answered {}", url, response.status());
        Ok(Box::new(response.into_body().into_reader()))
    }

    fn open_file(&self, url: &Url) -> BootResult<Box<dyn Read>> {
        let path = url
            .to_file_path()
            .map_err(|_| BootError::fetch(url, "not a local file path"))?;
        let file = File::open(&path).map_err(|e| BootError::fetch(url, e))?;
        Ok(Box::new(file))
    }
}

impl Default for UrlFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Fetcher for UrlFetcher {
    fn open(&self, url: &Url) -> BootResult<Box<dyn Read>> {
        match url.scheme() {
            "http" | "https" => self.open_http(url),
            "file" => self.open_file(url),
            other => Err(BootError::fetch(
                url,
                format!("unsupported URL scheme '{}'", other),
            )),
        }
    }
}
