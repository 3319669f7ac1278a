// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetpack_config::{RepoBackend, RunConfig};
use fleetpack_foundation::{SnapshotInfo, SnapshotRetentionPolicy};
use fleetpack_prune::PrunePlan;
use fleetpack_snapshot::{
    AptlyBackend,
    AptlySettings,
    BackendHandle,
    FileBackend,
    ProGetBackend,
    ProGetSettings,
    RetryBudget,
    SnapshotBackend,
};

use crate::error::{Error, Result};

/// A channel with no explicit operator choice falls back to this name
/// (spec is silent on the default; this expansion's concrete choice,
/// consistent with `fleetpack-prune`'s own `"default"` grouping fallback).
const DEFAULT_CHANNEL: &str = "default";

fn retry_budget(config: &RunConfig) -> RetryBudget {
    RetryBudget::new(Duration::from_millis(config.http_retry_base_delay_ms), config.http_retries as usize)
}

/// Builds the backend named by `config.repo_backend`, wiring its retry and
/// HTTP-timeout knobs from the resolved `RunConfig` (spec §9 "Polymorphic
/// backends": "a tagged variant constructed from `RunConfig`").
pub fn build_backend(config: &RunConfig, repository: &str) -> Result<BackendHandle> {
    match config.repo_backend {
        RepoBackend::File => {
            let repo_dir = config
                .repo_dir
                .clone()
                .ok_or_else(|| Error::PublishNotConfigured {
                    stage: "publish",
                    repository: repository.to_string(),
                })?;
            Ok(BackendHandle::File(FileBackend::new(repo_dir, repository.to_string())))
        }
        RepoBackend::Aptly => {
            let flags = config.aptly_settings.clone().ok_or_else(|| Error::PublishNotConfigured {
                stage: "publish",
                repository: repository.to_string(),
            })?;
            let settings = AptlySettings {
                repository: repository.to_string(),
                endpoint: flags.endpoint,
                gpg_key: flags.gpg_key,
                retry: retry_budget(config),
            };
            Ok(BackendHandle::Aptly(AptlyBackend::new(settings)?))
        }
        RepoBackend::ProGet => {
            let flags = config.proget_settings.clone().ok_or_else(|| Error::PublishNotConfigured {
                stage: "publish",
                repository: repository.to_string(),
            })?;
            let settings = ProGetSettings {
                base_url: flags.base_url,
                feed: flags.feed,
                api_key: flags.api_key,
                workers: config.proget_workers,
                retry: retry_budget(config),
                http_timeout: Duration::from_secs(config.http_timeout_secs),
            };
            Ok(BackendHandle::ProGet(ProGetBackend::new(settings)?))
        }
    }
}

/// `publish` stage (spec §2, §4.7): publishes the snapshot, then promotes
/// it per the per-backend rule §9 freezes — Aptly always promotes
/// (defaulting to [`DEFAULT_CHANNEL`] when no channel was configured), File
/// and ProGet only promote when a channel is actually set.
#[tracing::instrument(skip(backend), fields(snapshot_id = %snapshot_id))]
pub async fn publish(
    backend: &BackendHandle,
    snapshot_id: &str,
    debs_dir: &Path,
    channel: Option<&str>,
) -> Result<()> {
    backend.publish(snapshot_id, debs_dir).await?;
    match backend {
        BackendHandle::Aptly(_) => {
            let channel = channel.unwrap_or(DEFAULT_CHANNEL);
            backend.promote(snapshot_id, channel).await?;
        }
        _ => {
            if let Some(channel) = channel {
                backend.promote(snapshot_id, channel).await?;
            }
        }
    }
    Ok(())
}

/// `promote` stage (spec §2, §4.7), exposed on its own for `fleetpack
/// inspect`/manual promotions independent of a fresh publish.
#[tracing::instrument(skip(backend))]
pub async fn promote(backend: &BackendHandle, snapshot_id: &str, channel: &str) -> Result<()> {
    backend.promote(snapshot_id, channel).await?;
    Ok(())
}

/// `prune` stage (spec §2, §4.8): the pure plan, followed by execution
/// unless `policy.dry_run` is set (spec §4.8 "The execution step... `dryRun`
/// short-circuits before any delete").
#[tracing::instrument(skip(snapshots, policy))]
pub fn plan_prune(snapshots: &[SnapshotInfo], policy: &SnapshotRetentionPolicy, now: DateTime<Utc>) -> PrunePlan {
    fleetpack_prune::build_prune_plan(snapshots, policy, now)
}

/// Executes a [`PrunePlan`], deleting every id in `plan.delete` in order.
/// No-ops entirely when `dry_run` is set.
#[tracing::instrument(skip(backend, plan))]
pub async fn execute_prune(backend: &BackendHandle, plan: &PrunePlan, dry_run: bool) -> Result<()> {
    if dry_run {
        return Ok(());
    }
    for snapshot_id in &plan.delete {
        backend.delete_snapshot(snapshot_id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpack_config::Command;

    fn base_config() -> RunConfig {
        RunConfig {
            command: Command::Publish,
            product_spec_path: "product.yaml".into(),
            profile_refs: Vec::new(),
            schema_files: Vec::new(),
            workspace_roots: Vec::new(),
            output_dir: "out".into(),
            repo_backend: RepoBackend::File,
            repo_dir: None,
            aptly_settings: None,
            proget_settings: None,
            use_apt_solver: false,
            emit_preferences: false,
            emit_install_list: false,
            emit_snapshot_sources: false,
            emit_compat_views: false,
            cache_dir: None,
            cache_ttl_minutes: 60,
            http_timeout_secs: 30,
            http_retries: 3,
            http_retry_base_delay_ms: 200,
            apt_workers: 4,
            pip_workers: 4,
            proget_workers: 4,
            target_ubuntu: "jammy".to_string(),
            now: "2024-01-01T00:00:00Z".parse().unwrap(),
            hints: Vec::new(),
        }
    }

    #[test]
    fn file_backend_requires_a_repo_dir() {
        let config = base_config();
        let err = build_backend(&config, "fleet").unwrap_err();
        assert!(matches!(err, Error::PublishNotConfigured { .. }));
    }

    #[test]
    fn file_backend_builds_once_a_repo_dir_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config();
        config.repo_dir = Some(dir.path().to_path_buf());
        let backend = build_backend(&config, "fleet").unwrap();
        assert!(matches!(backend, BackendHandle::File(_)));
    }

    #[test]
    fn aptly_backend_requires_a_gpg_key() {
        let mut config = base_config();
        config.repo_backend = RepoBackend::Aptly;
        config.aptly_settings = Some(fleetpack_config::AptlyFlags {
            repository: "fleet".to_string(),
            endpoint: "s3://bucket".to_string(),
            gpg_key: None,
        });
        let err = build_backend(&config, "fleet").unwrap_err();
        assert!(matches!(err, Error::Snapshot(_)));
    }
}
