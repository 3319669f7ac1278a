// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::PathBuf;

use fleetpack_config::RunConfig;
use fleetpack_depbuild::BuildOutcome;
use fleetpack_foundation::{Dependency, SnapshotInfo, SnapshotIntent, SnapshotRetentionPolicy};
use fleetpack_index::{AptSource, IndexBuildConfig, PypiSource, RepoIndex, RetryConfig};
use fleetpack_output::{EmitFlags, OutputRequest, WrittenFiles};
use fleetpack_prune::PrunePlan;
use fleetpack_resolve::{ResolveOutput, ResolveRequest};
use fleetpack_spec::{ComposedSpec, SpecLoader};

use crate::builder::DebBuilder;
use crate::error::Result;
use crate::snapshot::{build_backend, execute_prune, plan_prune, publish};
use fleetpack_snapshot::SnapshotBackend;
use crate::stages::{build_deps, compose, repo_index, resolve, validate, write_outputs};

/// Everything `run_all` needs beyond `RunConfig`: collaborators and
/// per-domain inputs the generic flag/env/file layer in `fleetpack-config`
/// deliberately doesn't model (spec §3.1's `RunConfig` has no field for
/// "which APT mirrors to crawl" any more than the product spec does — these
/// are operational inputs, not product-declared or CLI-precedence data).
pub struct PipelineInputs<'a> {
    pub loader: &'a dyn SpecLoader,
    pub deb_builder: &'a dyn DebBuilder,
    pub apt_sources: Vec<AptSource>,
    pub pypi_sources: Vec<PypiSource>,
    /// `Some` enables the prune stage; its `dry_run` flag is read only at
    /// execution time (spec §4.8).
    pub retention_policy: Option<SnapshotRetentionPolicy>,
}

/// Everything a full end-to-end run produced, per spec §2's control-flow
/// sentence: load → compose → validate → build-deps → resolve → write
/// outputs → build debs → publish → optionally promote/prune.
pub struct RunOutcome {
    pub composed: ComposedSpec,
    pub dependencies: BuildOutcome,
    pub index: RepoIndex,
    pub resolution: ResolveOutput,
    pub written: WrittenFiles,
    pub debs_dir: PathBuf,
    pub snapshot_intent: Option<SnapshotIntent>,
    pub published: bool,
    pub prune_plan: Option<PrunePlan>,
}

fn emit_flags(config: &RunConfig) -> EmitFlags {
    EmitFlags {
        preferences: config.emit_preferences,
        install_list: config.emit_install_list,
        snapshot_sources: config.emit_snapshot_sources,
        compat_views: config.emit_compat_views,
    }
}

fn dependencies_of(build: &BuildOutcome) -> &[Dependency] {
    &build.dependencies
}

/// Runs every stage in order for one `RunConfig`. Each stage is also
/// independently callable (`crate::stages`, `crate::snapshot`) for
/// subcommands that only need a prefix of the full chain (e.g. `validate`
/// stops after `validate`, `resolve` stops after `write-outputs`).
#[tracing::instrument(skip(config, inputs), fields(product_spec_path = %config.product_spec_path.display()))]
pub async fn run_all(config: &RunConfig, inputs: &PipelineInputs<'_>) -> Result<RunOutcome> {
    let composed = compose(inputs.loader, &config.product_spec_path)?;
    validate(&composed)?;
    let (build_outcome, _resolver) = build_deps(inputs.loader, &composed, &config.schema_files)?;

    let index_config = IndexBuildConfig {
        apt_sources: inputs.apt_sources.clone(),
        pypi_sources: inputs.pypi_sources.clone(),
        cache_dir: config.cache_dir.clone().unwrap_or_else(|| PathBuf::from(".fleetpack-cache")),
        cache_ttl: std::time::Duration::from_secs(config.cache_ttl_minutes.max(0) as u64 * 60),
        retry: RetryConfig {
            base: std::time::Duration::from_millis(config.http_retry_base_delay_ms),
            cap: std::time::Duration::from_secs(30),
            max_attempts: config.http_retries as usize,
        },
        concurrency: config.apt_workers.max(config.pip_workers).max(1),
    };
    let index = repo_index(&index_config).await?;

    let target_ubuntu = fleetpack_resolve::normalize_target_ubuntu(&config.target_ubuntu);
    let resolve_request = ResolveRequest {
        dependencies: dependencies_of(&build_outcome),
        index: &index,
        directives: &composed.resolutions,
        packaging_groups: &composed.packaging,
        target_ubuntu: &target_ubuntu,
        use_apt_solver: config.use_apt_solver,
    };
    let resolution = resolve(&resolve_request)?;

    let snapshot_intent = composed.publish.as_ref().map(|publish_cfg| {
        let snapshot_prefix = publish_cfg
            .snapshot_prefix
            .clone()
            .unwrap_or_else(|| publish_cfg.repository.clone());
        let snapshot_id = fleetpack_snapshot::compute_snapshot_id(
            &publish_cfg.repository,
            publish_cfg.channel.as_deref(),
            &snapshot_prefix,
            &target_ubuntu,
            &resolution.apt_locks,
        );
        SnapshotIntent {
            repository: publish_cfg.repository.clone(),
            channel: publish_cfg.channel.clone(),
            snapshot_prefix,
            snapshot_id,
            created_at: config.now,
            signing_key: config
                .aptly_settings
                .as_ref()
                .and_then(|aptly| aptly.gpg_key.clone()),
        }
    });

    let output_request = OutputRequest {
        output_dir: &config.output_dir,
        resolution: &resolution,
        snapshot_intent: snapshot_intent.as_ref(),
        emit: emit_flags(config),
    };
    let written = write_outputs(&output_request).await?;

    let debs_dir = config.output_dir.join("debs");
    let manifest_path = config.output_dir.join("bundle.manifest");
    inputs.deb_builder.build(&manifest_path, &debs_dir)?;

    let mut published = false;
    let mut prune_plan = None;
    if let Some(intent) = &snapshot_intent {
        let backend = build_backend(config, &intent.repository)?;
        publish(&backend, &intent.snapshot_id, &debs_dir, intent.channel.as_deref()).await?;
        published = true;

        if let Some(policy) = &inputs.retention_policy {
            let snapshots: Vec<SnapshotInfo> = backend.list_snapshots().await?;
            let plan = plan_prune(&snapshots, policy, config.now);
            execute_prune(&backend, &plan, policy.dry_run).await?;
            prune_plan = Some(plan);
        }
    }

    Ok(RunOutcome {
        composed,
        dependencies: build_outcome,
        index,
        resolution,
        written,
        debs_dir,
        snapshot_intent,
        published,
        prune_plan,
    })
}
