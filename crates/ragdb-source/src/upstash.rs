//! Upstash-style Redis REST record source.
//!
//! `POST <url>` with `["KEYS","*"]` lists keys; `GET <url>/get/<key>` returns
//! `{"result": <stored string | null>}`. Both send a bearer token. Keys are
//! percent-encoded as one path segment. A rejected token (401/403) is a
//! configuration error, not a transient one.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use ragdb_core::config::SourceConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::RecordSource;
use ragdb_core::types::Record;

use crate::collection::decode_collection_str;

#[derive(Deserialize)]
struct RestResponse<T> {
    result: Option<T>,
}

pub struct UpstashSource {
    client: reqwest::Client,
    url: Url,
    token: String,
}

impl UpstashSource {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Source(anyhow!(e).context("building HTTP client")))?;
        let url = url.into();
        let url = Url::parse(url.trim_end_matches('/'))
            .map_err(|e| Error::InvalidConfig(format!("source url {url:?} is not a valid URL: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!("source url {url} cannot carry a key path")));
        }
        Ok(Self { client, url, token: token.into() })
    }

    /// `<url>/get/<key>` with `key` as a single encoded segment.
    fn get_url(&self, key: &str) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("source url {} cannot carry a key path", self.url)))?
            .pop_if_empty()
            .extend(["get", key]);
        Ok(url)
    }

    /// `url` from config or `url_env`, token from `token_env`.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let url = if config.url.is_empty() {
            std::env::var(&config.url_env)
                .map_err(|_| Error::InvalidConfig(format!("source.url is empty and {} is not set", config.url_env)))?
        } else {
            config.url.clone()
        };
        let token = std::env::var(&config.token_env)
            .map_err(|_| Error::InvalidConfig(format!("{} is not set", config.token_env)))?;
        Self::new(url, token)
    }

    async fn list_keys_inner(&self) -> Result<Vec<String>> {
        let resp = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.token)
            .json(&["KEYS", "*"])
            .send()
            .await
            .context("listing keys")
            .map_err(Error::Source)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, format!("Failed to list keys ({status}): {body}")));
        }
        let parsed: RestResponse<Vec<String>> = resp.json().await.context("decoding key list").map_err(Error::Source)?;
        Ok(parsed.result.unwrap_or_default())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let url = self.get_url(key)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("fetching key {key}"))
            .map_err(Error::Source)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, format!("Failed to fetch key {key} ({status}): {body}")));
        }
        let parsed: RestResponse<String> =
            resp.json().await.with_context(|| format!("decoding value of {key}")).map_err(Error::Source)?;
        Ok(parsed.result)
    }
}

/// Retrying with the same token cannot succeed, so auth failures are not transient.
fn status_error(status: StatusCode, message: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::InvalidConfig(format!("{message}; check the source token"))
        }
        _ => Error::Source(anyhow!(message)),
    }
}

#[async_trait]
impl RecordSource for UpstashSource {
    async fn list_keys(&self) -> Result<Vec<String>> {
        let keys = self.list_keys_inner().await?;
        debug!(count = keys.len(), "listed upstash keys");
        Ok(keys)
    }

    async fn fetch_collection(&self, key: &str) -> Result<Option<Vec<Record>>> {
        match self.get_raw(key).await? {
            None => Ok(Some(Vec::new())),
            Some(raw) => decode_collection_str(key, &raw),
        }
    }
}
