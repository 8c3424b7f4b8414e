use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::debug;

use crate::graph::{GraphSnapshot, GraphStats};

use super::error::LoadError;
use super::wire::{parse_graph, parse_stats};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_text(&self, path: &str) -> Result<String, LoadError> {
        let url = self.url(path);
        debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|source| LoadError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .map_err(|source| LoadError::Transport { url, source })
    }

    /// Fetches a truncated sample of the entity graph, bounded to `limit` nodes.
    pub fn fetch_graph(&self, limit: usize) -> Result<GraphSnapshot, LoadError> {
        let body = self.get_text(&format!("/graph/entities?limit={limit}"))?;
        Ok(parse_graph(&body)?)
    }

    pub fn fetch_stats(&self) -> Result<GraphStats, LoadError> {
        let body = self.get_text("/graph/stats")?;
        Ok(parse_stats(&body)?)
    }
}
