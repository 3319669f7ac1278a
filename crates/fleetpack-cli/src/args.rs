// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use fleetpack_config::{AptlyFlags, Command, Flags, ProGetFlags, RepoBackend};

/// Reproducible dependency-resolution and packaging pipeline for a
/// ROS-on-Ubuntu product fleet.
#[derive(Debug, Parser)]
#[command(name = "fleetpack", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load and validate a product spec, without resolving or writing anything.
    Validate,
    /// Resolve dependencies and write the bundle manifest, APT locks, and
    /// resolution report, without building or publishing debs.
    #[command(alias = "lock")]
    Resolve,
    /// Resolve and build `.deb` artifacts via the configured deb builder.
    Build,
    /// Build and publish the resulting snapshot to the configured backend.
    Publish(PublishArgs),
    /// Read an existing output directory's apt.lock, bundle.manifest, and
    /// resolution.report back into a summary, without touching a backend.
    Inspect,
    /// List the snapshots currently known to a backend.
    #[command(alias = "snapshots")]
    ListSnapshots,
    /// Crawl the configured APT/PyPI sources into a repo index, without resolving.
    RepoIndex,
    /// Apply a retention policy to an existing backend's snapshots.
    Prune(PruneArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct PublishArgs {
    /// Also prune the backend's snapshots after a successful publish, using
    /// the same retention flags as the standalone `prune` command.
    #[command(flatten)]
    pub retention: RetentionArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct PruneArgs {
    #[command(flatten)]
    pub retention: RetentionArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RetentionArgs {
    /// Keep at least this many most-recent snapshots regardless of age.
    #[arg(long)]
    pub keep_last: Option<i64>,
    /// Delete snapshots older than this many days, subject to `keep_last`
    /// and the protect lists.
    #[arg(long)]
    pub keep_days: Option<i64>,
    /// Never delete a snapshot promoted to one of these channels.
    #[arg(long = "protect-channel")]
    pub protect_channels: Vec<String>,
    /// Never delete a snapshot whose prefix matches one of these values.
    #[arg(long = "protect-prefix")]
    pub protect_prefixes: Vec<String>,
    /// Compute the plan without deleting anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum RepoBackendArg {
    #[default]
    File,
    Aptly,
    Proget,
}

impl From<RepoBackendArg> for RepoBackend {
    fn from(value: RepoBackendArg) -> Self {
        match value {
            RepoBackendArg::File => RepoBackend::File,
            RepoBackendArg::Aptly => RepoBackend::Aptly,
            RepoBackendArg::Proget => RepoBackend::ProGet,
        }
    }
}

/// Flags shared by every subcommand. Precedence beyond these explicit
/// values (env vars, config file, spec `defaults`) is entirely
/// `fleetpack-config`'s job (spec §4.11): this crate never re-implements
/// that layering itself, it only builds the [`Flags`] struct that function
/// takes as input.
#[derive(Debug, Clone, clap::Args)]
pub struct CommonArgs {
    /// Path to the product spec YAML file.
    #[arg(long, default_value = "product.yaml")]
    pub product_spec: PathBuf,

    /// Profile names to apply on top of the product's own declared profiles.
    #[arg(long = "profile")]
    pub profile_refs: Vec<String>,

    /// Extra JSON-Schema files, applied after every schema the spec itself declares.
    #[arg(long = "schema-file")]
    pub schema_files: Vec<PathBuf>,

    /// Workspace roots to walk for `package.xml` files, in addition to any the spec declares.
    #[arg(long = "workspace-root")]
    pub workspace_roots: Vec<PathBuf>,

    /// Directory outputs are written into.
    #[arg(long, default_value = "out")]
    pub output_dir: PathBuf,

    /// Ubuntu codename to resolve against.
    #[arg(long, default_value = "jammy")]
    pub target_ubuntu: String,

    /// Which snapshot backend to use.
    #[arg(long, value_enum, default_value_t = RepoBackendArg::File)]
    pub repo_backend: RepoBackendArg,

    /// Repository name, for commands that talk to a backend directly
    /// (`inspect`, `prune`) rather than reading it from the spec's publish config.
    #[arg(long)]
    pub repository: Option<String>,

    /// Root directory for the `file` backend.
    #[arg(long)]
    pub repo_dir: Option<PathBuf>,

    /// Aptly API endpoint.
    #[arg(long)]
    pub aptly_endpoint: Option<String>,
    /// Aptly GPG signing key id.
    #[arg(long)]
    pub aptly_gpg_key: Option<String>,

    /// ProGet feed base URL.
    #[arg(long)]
    pub proget_base_url: Option<String>,
    /// ProGet feed name.
    #[arg(long)]
    pub proget_feed: Option<String>,
    /// ProGet API key.
    #[arg(long)]
    pub proget_api_key: Option<String>,

    /// Path to the YAML file listing APT/PyPI sources to crawl (spec §4.4).
    #[arg(long, default_value = "fleetpack-sources.yaml")]
    pub sources_file: PathBuf,

    /// Write the preferences view alongside the mandatory outputs.
    #[arg(long)]
    pub emit_preferences: bool,
    /// Write the install-list view alongside the mandatory outputs.
    #[arg(long)]
    pub emit_install_list: bool,
    /// Write the snapshot-sources view alongside the mandatory outputs.
    #[arg(long)]
    pub emit_snapshot_sources: bool,
    /// Write the compat-views view alongside the mandatory outputs.
    #[arg(long)]
    pub emit_compat_views: bool,

    /// Prefer the system APT solver's dependency closure over the built-in SAT step.
    #[arg(long)]
    pub use_apt_solver: Option<bool>,
    /// Directory the repo-index cache is stored under.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// How long a cached repo-index entry stays fresh.
    #[arg(long)]
    pub cache_ttl_minutes: Option<i64>,
    /// Per-request HTTP timeout, in seconds.
    #[arg(long)]
    pub http_timeout_secs: Option<u64>,
    /// Maximum HTTP retry attempts.
    #[arg(long)]
    pub http_retries: Option<u32>,
    /// Base delay for HTTP retry backoff, in milliseconds.
    #[arg(long)]
    pub http_retry_base_delay_ms: Option<u64>,
    /// Concurrent APT crawl workers.
    #[arg(long)]
    pub apt_workers: Option<usize>,
    /// Concurrent PyPI crawl workers.
    #[arg(long)]
    pub pip_workers: Option<usize>,
    /// Concurrent ProGet upload workers.
    #[arg(long)]
    pub proget_workers: Option<usize>,
}

impl CommonArgs {
    fn aptly(&self) -> Option<AptlyFlags> {
        if self.aptly_endpoint.is_none() && self.aptly_gpg_key.is_none() {
            return None;
        }
        Some(AptlyFlags {
            repository: self.repository.clone().unwrap_or_default(),
            endpoint: self.aptly_endpoint.clone().unwrap_or_default(),
            gpg_key: self.aptly_gpg_key.clone(),
        })
    }

    fn proget(&self) -> Option<ProGetFlags> {
        if self.proget_base_url.is_none() && self.proget_feed.is_none() {
            return None;
        }
        Some(ProGetFlags {
            base_url: self.proget_base_url.clone().unwrap_or_default(),
            feed: self.proget_feed.clone().unwrap_or_default(),
            api_key: self.proget_api_key.clone(),
        })
    }

    /// Builds the [`Flags`] `fleetpack-config::RunConfig::resolve` takes,
    /// stamping `now` once per invocation so every stage of one run agrees
    /// on the current time (spec §3.1 `now`).
    pub fn to_flags(&self, command: Command) -> Flags {
        Flags {
            command,
            product_spec_path: self.product_spec.clone(),
            profile_refs: self.profile_refs.clone(),
            schema_files: self.schema_files.clone(),
            workspace_roots: self.workspace_roots.clone(),
            output_dir: self.output_dir.clone(),
            repo_backend: self.repo_backend.into(),
            repo_dir: self.repo_dir.clone(),
            aptly: self.aptly(),
            proget: self.proget(),
            emit_preferences: self.emit_preferences,
            emit_install_list: self.emit_install_list,
            emit_snapshot_sources: self.emit_snapshot_sources,
            emit_compat_views: self.emit_compat_views,
            target_ubuntu: self.target_ubuntu.clone(),
            now: Utc::now(),
            use_apt_solver: self.use_apt_solver,
            cache_dir: self.cache_dir.clone(),
            cache_ttl_minutes: self.cache_ttl_minutes,
            http_timeout_secs: self.http_timeout_secs,
            http_retries: self.http_retries,
            http_retry_base_delay_ms: self.http_retry_base_delay_ms,
            apt_workers: self.apt_workers,
            pip_workers: self.pip_workers,
            proget_workers: self.proget_workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn clap_definition_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_resolve_and_its_lock_alias_to_the_same_subcommand() {
        let resolve = Cli::parse_from(["fleetpack", "resolve"]);
        let lock = Cli::parse_from(["fleetpack", "lock"]);
        assert!(matches!(resolve.command, Commands::Resolve));
        assert!(matches!(lock.command, Commands::Resolve));
    }

    #[test]
    fn aptly_flags_are_absent_unless_an_aptly_flag_was_given() {
        let cli = Cli::parse_from(["fleetpack", "validate"]);
        assert!(cli.common.aptly().is_none());
    }

    #[test]
    fn aptly_flags_are_built_once_an_endpoint_is_given() {
        let cli = Cli::parse_from(["fleetpack", "--aptly-endpoint", "https://aptly.example", "validate"]);
        let aptly = cli.common.aptly().unwrap();
        assert_eq!(aptly.endpoint, "https://aptly.example");
        assert_eq!(aptly.gpg_key, None);
    }

    #[test]
    fn to_flags_carries_the_repo_backend_and_output_dir_through() {
        let cli = Cli::parse_from(["fleetpack", "--repo-backend", "aptly", "--output-dir", "build", "validate"]);
        let flags = cli.common.to_flags(Command::Validate);
        assert_eq!(flags.repo_backend, RepoBackend::Aptly);
        assert_eq!(flags.output_dir, PathBuf::from("build"));
    }
}
