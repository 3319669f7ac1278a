// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// The subcommand surface of spec §6. `Lock` is kept distinct from
/// `Resolve` here even though the CLI treats `lock` as an alias, so a
/// `RunConfig` always records which name the caller typed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Validate,
    Resolve,
    Lock,
    Build,
    Publish,
    Inspect,
    ListSnapshots,
    RepoIndex,
    Prune,
}

/// Which snapshot backend a run targets (spec §4.7, §9 "Polymorphic
/// backends").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RepoBackend {
    File,
    Aptly,
    ProGet,
}

/// Aptly connection details as supplied on the command line. `fleetpack-pipeline`
/// combines these with the resolved HTTP/retry settings to build a
/// `fleetpack_snapshot::AptlySettings`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AptlyFlags {
    pub repository: String,
    pub endpoint: String,
    pub gpg_key: Option<String>,
}

/// ProGet connection details as supplied on the command line, combined the
/// same way as [`AptlyFlags`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProGetFlags {
    pub base_url: String,
    pub feed: String,
    pub api_key: Option<String>,
}

/// Everything a caller (the CLI, or a test harness) can supply explicitly,
/// before environment, file, and spec-default layering is applied by
/// [`crate::RunConfig::resolve`].
///
/// Fields with no config-file or spec-defaults equivalent (paths, the emit
/// flags, backend credentials) are taken as given — only the fields listed
/// under "Config file shape" (spec §3.1) participate in the env/file/defaults
/// layers, so those are `Option` here and `None` means "let the lower layers
/// decide".
#[derive(Clone, Debug)]
pub struct Flags {
    pub command: Command,
    pub product_spec_path: PathBuf,
    pub profile_refs: Vec<String>,
    pub schema_files: Vec<PathBuf>,
    pub workspace_roots: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub repo_backend: RepoBackend,
    pub repo_dir: Option<PathBuf>,
    pub aptly: Option<AptlyFlags>,
    pub proget: Option<ProGetFlags>,
    pub emit_preferences: bool,
    pub emit_install_list: bool,
    pub emit_snapshot_sources: bool,
    pub emit_compat_views: bool,
    pub target_ubuntu: String,
    pub now: DateTime<Utc>,

    pub use_apt_solver: Option<bool>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_minutes: Option<i64>,
    pub http_timeout_secs: Option<u64>,
    pub http_retries: Option<u32>,
    pub http_retry_base_delay_ms: Option<u64>,
    pub apt_workers: Option<usize>,
    pub pip_workers: Option<usize>,
    pub proget_workers: Option<usize>,
}
