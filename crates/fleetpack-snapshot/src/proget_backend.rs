// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use fleetpack_foundation::SnapshotInfo;
use tokio::sync::Semaphore;

use crate::backend::split_snapshot_id;
use crate::error::{Error, Result};
use crate::retry::RetryBudget;

const BACKEND: &str = "proget";

/// Settings for the ProGet HTTP API backend (spec §4.7 "ProGet backend",
/// §6 "Wire protocols").
#[derive(Clone, Debug)]
pub struct ProGetSettings {
    pub base_url: String,
    pub feed: String,
    pub api_key: Option<String>,
    pub workers: usize,
    pub retry: RetryBudget,
    pub http_timeout: Duration,
}

/// HTTP-API backend. Uploads are parallelised over a bounded worker pool
/// (spec §4.7), each retried per `RetryBudget`; `list`/`delete` go over the
/// literal `GET`/`DELETE` endpoints spec §6 names.
#[derive(Clone)]
pub struct ProGetBackend {
    settings: ProGetSettings,
    client: reqwest::Client,
}

impl ProGetBackend {
    /// `InvalidArgument` if no API key was supplied, per spec §4.7
    /// "Boundary checks".
    pub fn new(settings: ProGetSettings) -> Result<Self> {
        match &settings.api_key {
            Some(key) if !key.is_empty() => {
                let client = reqwest::Client::builder()
                    .timeout(settings.http_timeout)
                    .build()
                    .map_err(|source| Error::Http {
                        backend: BACKEND,
                        source,
                    })?;
                Ok(Self { settings, client })
            }
            _ => Err(Error::MissingCredential {
                backend: BACKEND,
                what: "proget api key",
            }),
        }
    }

    fn api_key(&self) -> &str {
        self.settings.api_key.as_deref().unwrap_or_default()
    }

    fn packages_url(&self) -> String {
        format!("{}/feeds/{}/packages", self.settings.base_url, self.settings.feed)
    }

    async fn upload_one(&self, path: std::path::PathBuf) -> Result<()> {
        let url = self.packages_url();
        self.settings
            .retry
            .run(|| {
                let url = url.clone();
                let path = path.clone();
                async move {
                    let body = tokio::fs::read(&path).await.map_err(|source| Error::Io {
                        backend: BACKEND,
                        path: path.display().to_string(),
                        source,
                    })?;
                    let response = self
                        .client
                        .put(&url)
                        .basic_auth(self.api_key(), Some(""))
                        .body(body)
                        .send()
                        .await
                        .map_err(|source| Error::Http {
                            backend: BACKEND,
                            source,
                        })?;
                    status_to_result(response.status().as_u16(), "upload")
                }
            })
            .await
    }
}

#[async_trait::async_trait]
impl crate::backend::SnapshotBackend for ProGetBackend {
    async fn publish(&self, _id: &str, debs_dir: &Path) -> Result<()> {
        let mut debs = Vec::new();
        if tokio::fs::metadata(debs_dir).await.is_ok() {
            let mut entries = tokio::fs::read_dir(debs_dir)
                .await
                .map_err(|source| Error::Io {
                    backend: BACKEND,
                    path: debs_dir.display().to_string(),
                    source,
                })?;
            while let Some(entry) = entries.next_entry().await.map_err(|source| Error::Io {
                backend: BACKEND,
                path: debs_dir.display().to_string(),
                source,
            })? {
                debs.push(entry.path());
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut set = tokio::task::JoinSet::new();
        for path in debs {
            let permit = semaphore.clone();
            let backend = self.clone();
            set.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                backend.upload_one(path).await
            });
        }
        while let Some(result) = set.join_next().await {
            result.expect("upload task does not panic")?;
        }
        Ok(())
    }

    async fn promote(&self, id: &str, channel: &str) -> Result<()> {
        let url = format!(
            "{}/feeds/{}/channels/{}",
            self.settings.base_url, self.settings.feed, channel
        );
        let response = self
            .client
            .put(&url)
            .basic_auth(self.api_key(), Some(""))
            .json(&promote_body(id))
            .send()
            .await
            .map_err(|source| Error::Http {
                backend: BACKEND,
                source,
            })?;
        status_to_result(response.status().as_u16(), "promote")
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let response = self
            .client
            .get(self.packages_url())
            .basic_auth(self.api_key(), Some(""))
            .send()
            .await
            .map_err(|source| Error::Http {
                backend: BACKEND,
                source,
            })?;
        let status = response.status().as_u16();
        if status >= 400 {
            return status_to_result(status, "list").map(|_| Vec::new());
        }
        #[derive(serde::Deserialize)]
        struct Entry {
            id: String,
            #[serde(default)]
            channel: Option<String>,
            created_at: chrono::DateTime<chrono::Utc>,
        }
        let entries: Vec<Entry> = response.json().await.map_err(|source| Error::Http {
            backend: BACKEND,
            source,
        })?;
        Ok(entries
            .into_iter()
            .map(|e| SnapshotInfo {
                snapshot_id: e.id.clone(),
                prefix: split_snapshot_id(&e.id).to_string(),
                channel: e.channel,
                repository: Some(self.settings.feed.clone()),
                created_at: e.created_at,
            })
            .collect())
    }

    async fn delete_snapshot(&self, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.packages_url(), id);
        let response = self
            .client
            .delete(&url)
            .basic_auth(self.api_key(), Some(""))
            .send()
            .await
            .map_err(|source| Error::Http {
                backend: BACKEND,
                source,
            })?;
        let status = response.status().as_u16();
        if status == 404 {
            return Ok(());
        }
        status_to_result(status, "delete")
    }
}

fn status_to_result(status: u16, action: &str) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(Error::Unauthorized {
            backend: BACKEND,
            message: format!("{action} rejected with status {status}"),
        }),
        404 => Err(Error::Status {
            backend: BACKEND,
            status,
            message: format!("{action}: not found"),
        }),
        _ => Err(Error::Status {
            backend: BACKEND,
            status,
            message: format!("{action} failed"),
        }),
    }
}

fn promote_body(id: &str) -> serde_json::Value {
    serde_json::json!({ "id": id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_an_api_key() {
        let settings = ProGetSettings {
            base_url: "https://proget.example".into(),
            feed: "fleet".into(),
            api_key: None,
            workers: 4,
            retry: RetryBudget::default(),
            http_timeout: Duration::from_secs(30),
        };
        let err = ProGetBackend::new(settings).unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
    }

    #[test]
    fn status_to_result_maps_auth_and_not_found() {
        assert!(matches!(
            status_to_result(401, "upload"),
            Err(Error::Unauthorized { .. })
        ));
        assert!(matches!(
            status_to_result(404, "promote"),
            Err(Error::Status { status: 404, .. })
        ));
        assert!(status_to_result(204, "delete").is_ok());
    }
}
