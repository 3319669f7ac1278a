// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use tokio_retry::RetryIf;

use crate::cache::DiskCache;
use crate::retry::RetryConfig;
use crate::{Error, Result};

fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Status { status, .. } => RetryConfig::is_retryable_status(*status),
        Error::Http { .. } | Error::CacheIo { .. } | Error::Io(_) => true,
        Error::Decompress { .. } | Error::Parse { .. } | Error::Cancelled => false,
    }
}

/// Thin wrapper tying together `reqwest`, the [`DiskCache`], and
/// [`RetryConfig`] backoff, per spec §4.4: every fetch first consults the
/// cache, then retries transient failures, then writes the fresh body back.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    cache: DiskCache,
    retry: RetryConfig,
}

impl HttpClient {
    pub fn new(client: reqwest::Client, cache: DiskCache, retry: RetryConfig) -> Self {
        Self {
            client,
            cache,
            retry,
        }
    }

    /// Fetches `url`, serving from cache when fresh, else performing a
    /// retried GET and populating the cache on success.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(cached) = self.cache.get(url).await? {
            tracing::debug!("serving from cache");
            return Ok(cached);
        }

        let client = self.client.clone();
        let url_owned = url.to_string();
        let strategy = self.retry.strategy();
        let body = RetryIf::spawn(
            strategy,
            move || {
                let client = client.clone();
                let url = url_owned.clone();
                async move { fetch_once(&client, &url).await }
            },
            is_retryable,
        )
        .await?;

        self.cache.put(url, &body).await?;
        Ok(body)
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await.map_err(|source| Error::Http {
        url: url.to_string(),
        source,
    })?;
    Ok(bytes.to_vec())
}
