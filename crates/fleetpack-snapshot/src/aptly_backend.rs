// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;
use std::process::Output;

use fleetpack_foundation::SnapshotInfo;

use crate::backend::split_snapshot_id;
use crate::error::{Error, Result};
use crate::retry::RetryBudget;

const BACKEND: &str = "aptly";

/// Settings needed to drive the external `aptly` tool (spec §4.7 "Aptly
/// backend").
#[derive(Clone, Debug)]
pub struct AptlySettings {
    pub repository: String,
    pub endpoint: String,
    pub gpg_key: Option<String>,
    pub retry: RetryBudget,
}

/// Shells out to the external `aptly` binary. Every call is wrapped in
/// `RetryBudget` (jittered backoff per spec §4.7); a non-zero exit maps to
/// `Internal`.
#[derive(Clone, Debug)]
pub struct AptlyBackend {
    settings: AptlySettings,
}

impl AptlyBackend {
    /// `InvalidArgument` if no GPG key was supplied, per spec §4.7
    /// "Boundary checks".
    pub fn new(settings: AptlySettings) -> Result<Self> {
        match &settings.gpg_key {
            Some(key) if !key.is_empty() => Ok(Self { settings }),
            _ => Err(Error::MissingCredential {
                backend: BACKEND,
                what: "gpg key",
            }),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        let args_owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.settings
            .retry
            .run(|| {
                let args_owned = args_owned.clone();
                async move {
                    tokio::process::Command::new("aptly")
                        .args(&args_owned)
                        .output()
                        .await
                        .map_err(|source| Error::Io {
                            backend: BACKEND,
                            path: "aptly".to_string(),
                            source,
                        })
                }
            })
            .await
    }

    fn gpg_key(&self) -> &str {
        self.settings.gpg_key.as_deref().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl crate::backend::SnapshotBackend for AptlyBackend {
    async fn publish(&self, id: &str, debs_dir: &Path) -> Result<()> {
        let repo = &self.settings.repository;
        let debs_dir = debs_dir.display().to_string();

        let create = self.run(&["repo", "create", repo]).await?;
        if !create.status.success()
            && !String::from_utf8_lossy(&create.stderr).contains("already exists")
        {
            return Err(process_error(&create));
        }

        let add = self.run(&["repo", "add", repo, &debs_dir]).await?;
        if !add.status.success() {
            return Err(process_error(&add));
        }

        let snapshot = self
            .run(&["snapshot", "create", id, "from", "repo", repo])
            .await?;
        if !snapshot.status.success() {
            return Err(process_error(&snapshot));
        }

        let key_flag = format!("-gpg-key={}", self.gpg_key());
        let publish = self
            .run(&["publish", "snapshot", &key_flag, id, &self.settings.endpoint])
            .await?;
        if !publish.status.success() {
            return Err(process_error(&publish));
        }
        Ok(())
    }

    /// Switches the named published channel to point at `id`. Whether this
    /// is invoked unconditionally after `publish` (as documented for Aptly,
    /// spec §9) or only when a channel is configured is an orchestration
    /// decision owned by the pipeline crate, not this backend.
    async fn promote(&self, id: &str, channel: &str) -> Result<()> {
        let switch = self
            .run(&["publish", "switch", channel, &self.settings.endpoint, id])
            .await?;
        if !switch.status.success() {
            return Err(process_error(&switch));
        }
        Ok(())
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let listed = self.run(&["snapshot", "list", "-raw"]).await?;
        if !listed.status.success() {
            return Err(process_error(&listed));
        }
        let stdout = String::from_utf8_lossy(&listed.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|id| SnapshotInfo {
                snapshot_id: id.to_string(),
                prefix: split_snapshot_id(id).to_string(),
                channel: None,
                repository: Some(self.settings.repository.clone()),
                created_at: chrono::Utc::now(),
            })
            .collect())
    }

    async fn delete_snapshot(&self, id: &str) -> Result<()> {
        let dropped = self.run(&["snapshot", "drop", id]).await?;
        if !dropped.status.success()
            && !String::from_utf8_lossy(&dropped.stderr).contains("not found")
        {
            return Err(process_error(&dropped));
        }
        Ok(())
    }
}

fn process_error(output: &Output) -> Error {
    Error::ProcessFailed {
        backend: BACKEND,
        status: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_a_gpg_key() {
        let settings = AptlySettings {
            repository: "fleet".into(),
            endpoint: "prefix/endpoint".into(),
            gpg_key: None,
            retry: RetryBudget::default(),
        };
        let err = AptlyBackend::new(settings).unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
    }

    #[test]
    fn construction_succeeds_with_a_gpg_key() {
        let settings = AptlySettings {
            repository: "fleet".into(),
            endpoint: "prefix/endpoint".into(),
            gpg_key: Some("ABCDEF".into()),
            retry: RetryBudget::default(),
        };
        assert!(AptlyBackend::new(settings).is_ok());
    }
}
