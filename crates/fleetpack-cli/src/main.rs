// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! Thin `clap` binary over `fleetpack-pipeline` (C12, spec §4.11): parses
//! arguments, builds a [`fleetpack_config::Flags`], delegates precedence
//! resolution to `fleetpack-config::RunConfig::resolve`, invokes the
//! matching pipeline stage(s), renders any error with `miette`, and maps
//! its [`fleetpack_foundation::HasErrorKind`] to the process exit code.
//!
//! Each subcommand runs a different prefix of spec §2's control-flow
//! sentence: `validate` stops after validation, `resolve` after writing
//! outputs, `build` after building debs, `publish` runs the full chain
//! (including the optional promote/prune `run_all` performs when a
//! retention policy and publish config are both present).

mod args;
mod error;
mod sources;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use fleetpack_config::{Command, RunConfig};
use fleetpack_foundation::{HasErrorKind, SnapshotRetentionPolicy};
use fleetpack_index::{IndexBuildConfig, RetryConfig};
use fleetpack_output::{EmitFlags, OutputRequest, WrittenFiles};
use fleetpack_pipeline::{DebBuilder, ProcessDebBuilder};
use fleetpack_resolve::{ResolveOutput, ResolveRequest};
use fleetpack_snapshot::SnapshotBackend;
use fleetpack_spec::{ComposedSpec, FsSpecLoader};
use tracing::info;

use crate::args::{Cli, Commands, PruneArgs, PublishArgs, RetentionArgs};
use crate::error::{Error, Result};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn retention_policy(args: &RetentionArgs) -> Option<SnapshotRetentionPolicy> {
    if args.keep_last.is_none() && args.keep_days.is_none() {
        return None;
    }
    Some(SnapshotRetentionPolicy {
        keep_last: args.keep_last.unwrap_or(0),
        keep_days: args.keep_days.unwrap_or(0),
        protect_channels: args.protect_channels.clone(),
        protect_prefixes: args.protect_prefixes.clone(),
        dry_run: args.dry_run,
    })
}

fn index_config(config: &RunConfig, sources: sources::SourcesFile) -> IndexBuildConfig {
    IndexBuildConfig {
        apt_sources: sources.apt,
        pypi_sources: sources.pypi,
        cache_dir: config.cache_dir.clone().unwrap_or_else(|| PathBuf::from(".fleetpack-cache")),
        cache_ttl: Duration::from_secs(config.cache_ttl_minutes.max(0) as u64 * 60),
        retry: RetryConfig {
            base: Duration::from_millis(config.http_retry_base_delay_ms),
            cap: Duration::from_secs(30),
            max_attempts: config.http_retries as usize,
        },
        concurrency: config.apt_workers.max(config.pip_workers).max(1),
    }
}

/// The result of running every stage through `write-outputs`, shared by the
/// `resolve` and `build` subcommands (spec §2's chain up to "write
/// outputs").
struct WriteOutputsResult {
    config: RunConfig,
    composed: ComposedSpec,
    resolution: ResolveOutput,
    written: WrittenFiles,
}

async fn run_through_write_outputs(cli: &Cli, command: Command) -> Result<WriteOutputsResult> {
    let loader = FsSpecLoader;
    let composed = fleetpack_pipeline::compose(&loader, &cli.common.product_spec)?;
    fleetpack_pipeline::validate(&composed)?;
    let config = RunConfig::resolve(cli.common.to_flags(command), &composed.defaults)?;

    let (build_outcome, _resolver) = fleetpack_pipeline::build_deps(&loader, &composed, &config.schema_files)?;
    let sources = sources::load_sources(&cli.common.sources_file)?;
    let index = fleetpack_pipeline::repo_index(&index_config(&config, sources)).await?;

    let target_ubuntu = fleetpack_resolve::normalize_target_ubuntu(&config.target_ubuntu);
    let resolve_request = ResolveRequest {
        dependencies: &build_outcome.dependencies,
        index: &index,
        directives: &composed.resolutions,
        packaging_groups: &composed.packaging,
        target_ubuntu: &target_ubuntu,
        use_apt_solver: config.use_apt_solver,
    };
    let resolution = fleetpack_pipeline::resolve(&resolve_request)?;

    let snapshot_intent = composed.publish.as_ref().map(|publish_cfg| {
        let snapshot_prefix = publish_cfg.snapshot_prefix.clone().unwrap_or_else(|| publish_cfg.repository.clone());
        let snapshot_id = fleetpack_snapshot::compute_snapshot_id(
            &publish_cfg.repository,
            publish_cfg.channel.as_deref(),
            &snapshot_prefix,
            &target_ubuntu,
            &resolution.apt_locks,
        );
        fleetpack_foundation::SnapshotIntent {
            repository: publish_cfg.repository.clone(),
            channel: publish_cfg.channel.clone(),
            snapshot_prefix,
            snapshot_id,
            created_at: config.now,
            signing_key: config.aptly_settings.as_ref().and_then(|aptly| aptly.gpg_key.clone()),
        }
    });

    let output_request = OutputRequest {
        output_dir: &config.output_dir,
        resolution: &resolution,
        snapshot_intent: snapshot_intent.as_ref(),
        emit: EmitFlags {
            preferences: config.emit_preferences,
            install_list: config.emit_install_list,
            snapshot_sources: config.emit_snapshot_sources,
            compat_views: config.emit_compat_views,
        },
    };
    let written = fleetpack_pipeline::write_outputs(&output_request).await?;

    Ok(WriteOutputsResult { config, composed, resolution, written })
}

async fn run_publish(cli: &Cli, retention: Option<SnapshotRetentionPolicy>) -> Result<fleetpack_pipeline::RunOutcome> {
    let loader = FsSpecLoader;
    let composed = fleetpack_pipeline::compose(&loader, &cli.common.product_spec)?;
    let config = RunConfig::resolve(cli.common.to_flags(Command::Publish), &composed.defaults)?;
    let sources = sources::load_sources(&cli.common.sources_file)?;
    let deb_builder = ProcessDebBuilder::default();
    let inputs = fleetpack_pipeline::PipelineInputs {
        loader: &loader,
        deb_builder: &deb_builder,
        apt_sources: sources.apt,
        pypi_sources: sources.pypi,
        retention_policy: retention,
    };
    let outcome = fleetpack_pipeline::run_all(&config, &inputs).await?;
    Ok(outcome)
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Validate => {
            let loader = FsSpecLoader;
            let composed = fleetpack_pipeline::compose(&loader, &cli.common.product_spec)?;
            fleetpack_pipeline::validate(&composed)?;
            info!(product = %composed.metadata.name, "validated");
            println!("{} is valid", composed.metadata.name);
        }

        Commands::Resolve => {
            let result = run_through_write_outputs(&cli, Command::Resolve).await?;
            println!(
                "resolved {} dependencies, wrote {} files",
                result.resolution.resolved_deps.len(),
                result.written.paths.len()
            );
        }

        Commands::Build => {
            let result = run_through_write_outputs(&cli, Command::Build).await?;
            let debs_dir = result.config.output_dir.join("debs");
            let manifest_path = result.config.output_dir.join("bundle.manifest");
            ProcessDebBuilder::default().build(&manifest_path, &debs_dir).map_err(Error::Pipeline)?;
            println!("built debs for {} under {}", result.composed.metadata.name, debs_dir.display());
        }

        Commands::Publish(PublishArgs { retention }) => {
            let outcome = run_publish(&cli, retention_policy(retention)).await?;
            match outcome.snapshot_intent {
                Some(intent) => println!("published snapshot {}", intent.snapshot_id),
                None => println!("no publish configuration on this spec; nothing published"),
            }
            if let Some(plan) = outcome.prune_plan {
                println!("prune: kept {}, deleted {}", plan.keep.len(), plan.delete.len());
            }
        }

        Commands::Inspect => {
            let report = fleetpack_pipeline::inspect(&cli.common.output_dir).await?;
            println!("apt.lock: {} packages", report.apt_lock_count);
            for group in &report.groups {
                println!("group {}: {}", group.group, group.packages.join(", "));
            }
            for record in &report.resolution_records {
                println!(
                    "{} {} {} ({}, {})",
                    record.dependency, record.action, record.value, record.reason, record.owner
                );
            }
        }

        Commands::ListSnapshots => {
            let config = RunConfig::resolve(cli.common.to_flags(Command::ListSnapshots), &Default::default())?;
            let repository = cli
                .common
                .repository
                .clone()
                .ok_or(Error::MissingRepository { command: "list-snapshots" })?;
            let backend = fleetpack_pipeline::build_backend(&config, &repository)?;
            let snapshots = backend.list_snapshots().await.map_err(Error::Snapshot)?;
            for snapshot in &snapshots {
                println!(
                    "{}\tprefix={}\tchannel={}\tcreated_at={}",
                    snapshot.snapshot_id,
                    snapshot.prefix,
                    snapshot.channel.as_deref().unwrap_or("-"),
                    snapshot.created_at
                );
            }
        }

        Commands::RepoIndex => {
            let config = RunConfig::resolve(cli.common.to_flags(Command::RepoIndex), &Default::default())?;
            let sources = sources::load_sources(&cli.common.sources_file)?;
            let index = fleetpack_pipeline::repo_index(&index_config(&config, sources)).await?;
            println!("indexed {} apt suites, {} pypi packages", index.apt.len(), index.pip.len());
        }

        Commands::Prune(PruneArgs { retention }) => {
            let config = RunConfig::resolve(cli.common.to_flags(Command::Prune), &Default::default())?;
            let repository = cli.common.repository.clone().ok_or(Error::MissingRepository { command: "prune" })?;
            let policy = retention_policy(retention).unwrap_or(SnapshotRetentionPolicy {
                keep_last: 0,
                keep_days: 0,
                protect_channels: Vec::new(),
                protect_prefixes: Vec::new(),
                dry_run: retention.dry_run,
            });
            let backend = fleetpack_pipeline::build_backend(&config, &repository)?;
            let snapshots = backend.list_snapshots().await.map_err(Error::Snapshot)?;
            let plan = fleetpack_pipeline::plan_prune(&snapshots, &policy, Utc::now());
            fleetpack_pipeline::execute_prune(&backend, &plan, policy.dry_run).await?;
            println!("keeping {}, deleting {}", plan.keep.len(), plan.delete.len());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code as u8)
        }
    }
}
