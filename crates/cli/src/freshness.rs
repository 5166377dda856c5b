//! Remote modification time sources.
//!
//! A `modified_url` endpoint answers `GET` with the remote modification time
//! in milliseconds as plain text. When `mark_changed_url` is set, a push
//! notifies it with an empty `POST`. Without an endpoint the CSV remote's
//! file times are used.

use std::time::Duration;

use locasync_io::csv::CsvFreshness;
use locasync_sync::config::RemoteSettings;
use locasync_sync::remote::{Freshness, FreshnessSource};

use crate::CliError;

// ── HTTP endpoint ───────────────────────────────────────────────────

pub struct HttpFreshness {
    client: reqwest::blocking::Client,
    modified_url: String,
    mark_changed_url: Option<String>,
}

impl HttpFreshness {
    pub fn new(
        modified_url: impl Into<String>,
        mark_changed_url: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, CliError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("locasync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliError::io(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            modified_url: modified_url.into(),
            mark_changed_url,
        })
    }

    fn fetch(&self) -> Result<i64, String> {
        let resp = self
            .client
            .get(&self.modified_url)
            .send()
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        let body = resp.text().map_err(|e| e.to_string())?;
        body.trim()
            .parse::<i64>()
            .map_err(|_| format!("not a timestamp: {:?}", body.trim()))
    }
}

impl FreshnessSource for HttpFreshness {
    fn remote_modified(&self) -> Freshness {
        match self.fetch() {
            Ok(millis) => Freshness::Known(millis),
            Err(e) => {
                log::warn!("{}: {e}", self.modified_url);
                Freshness::Undetermined
            }
        }
    }

    fn mark_remote_changed(&self) {
        let Some(url) = &self.mark_changed_url else {
            return;
        };
        match self.client.post(url).send() {
            Ok(resp) if resp.status().is_success() => log::debug!("{url}: remote marked changed"),
            Ok(resp) => log::warn!("{url}: HTTP {}", resp.status()),
            Err(e) => log::warn!("{url}: {e}"),
        }
    }
}

// ── Selection ───────────────────────────────────────────────────────

pub enum RemoteFreshness {
    Http(HttpFreshness),
    Csv(CsvFreshness),
}

impl RemoteFreshness {
    /// The configured endpoint, or `fallback` when there is none.
    pub fn from_settings(settings: &RemoteSettings, fallback: CsvFreshness) -> Result<Self, CliError> {
        match &settings.modified_url {
            Some(url) => Ok(Self::Http(HttpFreshness::new(
                url.clone(),
                settings.mark_changed_url.clone(),
                settings.timeout_ms,
            )?)),
            None => Ok(Self::Csv(fallback)),
        }
    }
}

impl FreshnessSource for RemoteFreshness {
    fn remote_modified(&self) -> Freshness {
        match self {
            Self::Http(http) => http.remote_modified(),
            Self::Csv(csv) => csv.remote_modified(),
        }
    }

    fn mark_remote_changed(&self) {
        match self {
            Self::Http(http) => http.mark_remote_changed(),
            Self::Csv(csv) => csv.mark_remote_changed(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
