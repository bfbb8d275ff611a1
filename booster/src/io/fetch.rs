//! Fetching `.gitignore` templates over HTTP.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

pub const GITIGNORE_API_BASE: &str = "https://www.toptal.com/developers/gitignore/api";

/// Source of `.gitignore` content for a list of template names.
pub trait TemplateFetcher {
    fn fetch(&self, templates: &[String]) -> Result<String>;
}

/// Fetches from the gitignore.io API. One attempt, no retries.
#[derive(Debug, Clone)]
pub struct HttpTemplateFetcher {
    base_url: String,
    timeout: Duration,
}

impl Default for HttpTemplateFetcher {
    fn default() -> Self {
        Self {
            base_url: GITIGNORE_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpTemplateFetcher {
    pub fn url_for(&self, templates: &[String]) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), templates.join(","))
    }
}

impl TemplateFetcher for HttpTemplateFetcher {
    #[instrument(skip_all, fields(templates = templates.len()))]
    fn fetch(&self, templates: &[String]) -> Result<String> {
        let url = self.url_for(templates);
        debug!(url = %url, "fetching gitignore templates");
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("booster/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        let body = client
            .get(&url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .with_context(|| format!("GET {url}"))?
            .text()
            .with_context(|| format!("read body of {url}"))?;
        Ok(body)
    }
}
