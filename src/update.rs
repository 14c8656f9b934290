//! Best-effort check for a newer release.

use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;

pub const RELEASES_URL: &str =
    "https://api.github.com/repos/geek1011/BookBrowser/releases/latest";

/// Version tag of untagged builds. Such builds never check for updates.
pub const DEV_VERSION: &str = "dev";

const TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("bookbrowser/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Development build; nothing was fetched.
    Skipped,
    UpToDate,
    Available(Release),
    /// The release could not be fetched or parsed.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct UpdateChecker {
    endpoint: String,
    current: String,
    timeout: Duration,
}

impl UpdateChecker {
    pub fn new(current: &str) -> Self {
        Self {
            endpoint: RELEASES_URL.to_string(),
            current: current.to_string(),
            timeout: TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compare the running version against the latest release. Never
    /// fails: every problem collapses into [`UpdateStatus::Unavailable`].
    pub async fn check(&self) -> UpdateStatus {
        if self.current == DEV_VERSION {
            return UpdateStatus::Skipped;
        }
        let Some(release) = self.fetch().await else {
            return UpdateStatus::Unavailable;
        };

        if self.current.starts_with(&release.tag_name) {
            tracing::debug!(version = %self.current, "up to date");
            UpdateStatus::UpToDate
        } else {
            tracing::info!(
                "Running version {}. Latest version is {}: {}",
                self.current,
                release.tag_name,
                release.html_url
            );
            UpdateStatus::Available(release)
        }
    }

    /// Run the check in the background. Callers that do not care about the
    /// result drop the handle.
    pub fn spawn(self) -> JoinHandle<UpdateStatus> {
        tokio::spawn(async move { self.check().await })
    }

    async fn fetch(&self) -> Option<Release> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .inspect_err(|e| tracing::debug!("update check: {e}"))
            .ok()?;

        let response = client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .inspect_err(|e| tracing::debug!("update check failed: {e}"))
            .ok()?;

        response
            .json::<Release>()
            .await
            .inspect_err(|e| tracing::debug!("update check: bad release: {e}"))
            .ok()
    }
}
