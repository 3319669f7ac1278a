// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::flags::{AptlyFlags, Command, Flags, ProGetFlags, RepoBackend};

/// Severity of a [`Diagnostic`] (spec §3.1 "Diagnostics event"). Never
/// affects exit status on its own — only the redundant-flag hint this
/// module emits, currently.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiagnosticLevel {
    Hint,
    Warn,
    Error,
}

/// `{ level, stage, message }` per spec §3.1. Collected on [`RunConfig::hints`]
/// rather than printed directly, so the CLI (or a test) decides what to do
/// with them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub stage: String,
    pub message: String,
}

impl Diagnostic {
    fn hint(stage: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Hint,
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

/// The fully resolved configuration for one run (spec §3.1). Produced only
/// by [`RunConfig::resolve`]; every field is a plain value, not a handle
/// into shared mutable state.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub command: Command,
    pub product_spec_path: PathBuf,
    pub profile_refs: Vec<String>,
    pub schema_files: Vec<PathBuf>,
    pub workspace_roots: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub repo_backend: RepoBackend,
    pub repo_dir: Option<PathBuf>,
    pub aptly_settings: Option<AptlyFlags>,
    pub proget_settings: Option<ProGetFlags>,
    pub use_apt_solver: bool,
    pub emit_preferences: bool,
    pub emit_install_list: bool,
    pub emit_snapshot_sources: bool,
    pub emit_compat_views: bool,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_minutes: i64,
    pub http_timeout_secs: u64,
    pub http_retries: u32,
    pub http_retry_base_delay_ms: u64,
    pub apt_workers: usize,
    pub pip_workers: usize,
    pub proget_workers: usize,
    /// As given on the command line. `target_ubuntu` is only normalised
    /// (stripping a leading `ubuntu-`) at the point each consumer reads it
    /// — see `fleetpack_resolve::normalize_target_ubuntu` — so this field
    /// deliberately stays raw rather than duplicating that rule here.
    pub target_ubuntu: String,
    pub now: DateTime<Utc>,
    /// Hints accumulated while resolving (spec §3.1, §6 "redundant flag").
    pub hints: Vec<Diagnostic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HttpSection {
    timeout_secs: Option<u64>,
    retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CacheSection {
    dir: Option<PathBuf>,
    ttl_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkersSection {
    apt: Option<usize>,
    pip: Option<usize>,
    proget: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SolverSection {
    use_apt_solver: Option<bool>,
}

/// The config-file/env layer (spec §3.1 "Config file shape"): everything a
/// `fleetpack.toml`/`config` file and `FLEETPACK_`-prefixed environment
/// variables can supply. Deliberately narrower than [`RunConfig`] — paths,
/// the command, and backend credentials have no config-file equivalent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    http: HttpSection,
    cache: CacheSection,
    workers: WorkersSection,
    solver: SolverSection,
}

const ENV_PREFIX: &str = "FLEETPACK_";

/// Loads the config-file/env layer: a project-local file, a user config
/// file, both optional, with environment variables layered on top as
/// overrides keyed by `section.name`.
fn load_config_file() -> Result<ConfigFile> {
    use config::{Config as RawConfig, File};

    let user_config = dirs::config_dir().map(|dir| dir.join("fleetpack").join("config"));

    let mut builder = RawConfig::builder().add_source(File::with_name("./fleetpack").required(false));
    if let Some(user_config) = &user_config {
        builder = builder.add_source(File::with_name(&user_config.display().to_string()).required(false));
    }

    for (var, value) in std::env::vars() {
        let Some(tail) = var.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let Some((section, name)) = tail.split_once('_') else {
            continue;
        };
        let key = format!("{}.{}", section.to_lowercase(), name.to_lowercase());
        builder = builder.set_override(key, value)?;
    }

    let built = builder.build()?;
    Ok(ConfigFile::deserialize(built)?)
}

/// Resolves one layered field: flag, then the config-file/env layer, then
/// the spec's own `defaults` section, then a built-in fallback. Records a
/// hint when the flag was given but matches the spec default, since that
/// flag did nothing (spec §6).
fn layered<T>(
    field: &'static str,
    flag: Option<T>,
    file: Option<T>,
    spec_defaults: &IndexMap<String, serde_yaml::Value>,
    builtin: T,
    hints: &mut Vec<Diagnostic>,
) -> T
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    let spec_default: Option<T> = spec_defaults
        .get(field)
        .and_then(|value| serde_yaml::from_value(value.clone()).ok());

    if let (Some(flag_value), Some(default_value)) = (&flag, &spec_default) {
        if flag_value == default_value {
            hints.push(Diagnostic::hint(
                field,
                format!("--{field} matches the spec default; the flag has no effect"),
            ));
        }
    }

    flag.or(file).or(spec_default).unwrap_or(builtin)
}

/// Same as [`layered`] but for fields whose resolved type is itself
/// `Option<T>` (no built-in fallback to fall back to — absence is the
/// final state), e.g. `cache_dir`.
fn layered_opt<T>(
    field: &'static str,
    flag: Option<T>,
    file: Option<T>,
    spec_defaults: &IndexMap<String, serde_yaml::Value>,
    hints: &mut Vec<Diagnostic>,
) -> Option<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    let spec_default: Option<T> = spec_defaults
        .get(field)
        .and_then(|value| serde_yaml::from_value(value.clone()).ok());

    if let (Some(flag_value), Some(default_value)) = (&flag, &spec_default) {
        if flag_value == default_value {
            hints.push(Diagnostic::hint(
                field,
                format!("--{field} matches the spec default; the flag has no effect"),
            ));
        }
    }

    flag.or(file).or(spec_default)
}

impl RunConfig {
    /// `RunConfig::resolve(flags, spec_defaults)` (spec §4.10): a pure
    /// function over its arguments plus whatever the config file and
    /// environment hold at the moment of the call — no global cell is
    /// written or read (spec §9 "Global mutable configuration").
    pub fn resolve(flags: Flags, spec_defaults: &IndexMap<String, serde_yaml::Value>) -> Result<RunConfig> {
        let file = load_config_file()?;
        let mut hints = Vec::new();

        let use_apt_solver = layered(
            "use_apt_solver",
            flags.use_apt_solver,
            file.solver.use_apt_solver,
            spec_defaults,
            false,
            &mut hints,
        );
        let cache_dir = layered_opt("cache_dir", flags.cache_dir, file.cache.dir, spec_defaults, &mut hints);
        let cache_ttl_minutes = layered(
            "cache_ttl_minutes",
            flags.cache_ttl_minutes,
            file.cache.ttl_minutes,
            spec_defaults,
            60,
            &mut hints,
        );
        let http_timeout_secs = layered(
            "http_timeout_secs",
            flags.http_timeout_secs,
            file.http.timeout_secs,
            spec_defaults,
            30,
            &mut hints,
        );
        let http_retries = layered(
            "http_retries",
            flags.http_retries,
            file.http.retries,
            spec_defaults,
            3,
            &mut hints,
        );
        let http_retry_base_delay_ms = layered(
            "http_retry_base_delay_ms",
            flags.http_retry_base_delay_ms,
            file.http.retry_base_delay_ms,
            spec_defaults,
            200,
            &mut hints,
        );
        let apt_workers = layered(
            "apt_workers",
            flags.apt_workers,
            file.workers.apt,
            spec_defaults,
            4,
            &mut hints,
        );
        let pip_workers = layered(
            "pip_workers",
            flags.pip_workers,
            file.workers.pip,
            spec_defaults,
            4,
            &mut hints,
        );
        let proget_workers = layered(
            "proget_workers",
            flags.proget_workers,
            file.workers.proget,
            spec_defaults,
            4,
            &mut hints,
        );

        Ok(RunConfig {
            command: flags.command,
            product_spec_path: flags.product_spec_path,
            profile_refs: flags.profile_refs,
            schema_files: flags.schema_files,
            workspace_roots: flags.workspace_roots,
            output_dir: flags.output_dir,
            repo_backend: flags.repo_backend,
            repo_dir: flags.repo_dir,
            aptly_settings: flags.aptly,
            proget_settings: flags.proget,
            use_apt_solver,
            emit_preferences: flags.emit_preferences,
            emit_install_list: flags.emit_install_list,
            emit_snapshot_sources: flags.emit_snapshot_sources,
            emit_compat_views: flags.emit_compat_views,
            cache_dir,
            cache_ttl_minutes,
            http_timeout_secs,
            http_retries,
            http_retry_base_delay_ms,
            apt_workers,
            pip_workers,
            proget_workers,
            target_ubuntu: flags.target_ubuntu,
            now: flags.now,
            hints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_flags() -> Flags {
        Flags {
            command: Command::Resolve,
            product_spec_path: PathBuf::from("product.yaml"),
            profile_refs: Vec::new(),
            schema_files: Vec::new(),
            workspace_roots: Vec::new(),
            output_dir: PathBuf::from("out"),
            repo_backend: RepoBackend::File,
            repo_dir: None,
            aptly: None,
            proget: None,
            emit_preferences: false,
            emit_install_list: false,
            emit_snapshot_sources: false,
            emit_compat_views: false,
            target_ubuntu: "ubuntu-jammy".to_string(),
            now: "2024-01-01T00:00:00Z".parse().unwrap(),
            use_apt_solver: None,
            cache_dir: None,
            cache_ttl_minutes: None,
            http_timeout_secs: None,
            http_retries: None,
            http_retry_base_delay_ms: None,
            apt_workers: None,
            pip_workers: None,
            proget_workers: None,
        }
    }

    #[test]
    fn built_in_defaults_apply_with_no_flags_file_or_spec_defaults() {
        let spec_defaults = IndexMap::new();
        let config = RunConfig::resolve(base_flags(), &spec_defaults).unwrap();
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.apt_workers, 4);
        assert!(!config.use_apt_solver);
        assert!(config.hints.is_empty());
    }

    #[test]
    fn spec_defaults_fill_in_when_no_flag_or_file_value_is_given() {
        let mut spec_defaults = IndexMap::new();
        spec_defaults.insert("http_retries".to_string(), serde_yaml::Value::from(7));
        let config = RunConfig::resolve(base_flags(), &spec_defaults).unwrap();
        assert_eq!(config.http_retries, 7);
    }

    #[test]
    fn a_flag_matching_the_spec_default_is_recorded_as_a_redundant_hint() {
        let mut spec_defaults = IndexMap::new();
        spec_defaults.insert("apt_workers".to_string(), serde_yaml::Value::from(4));
        let mut flags = base_flags();
        flags.apt_workers = Some(4);
        let config = RunConfig::resolve(flags, &spec_defaults).unwrap();
        assert_eq!(config.apt_workers, 4);
        assert_eq!(config.hints.len(), 1);
        assert_eq!(config.hints[0].stage, "apt_workers");
    }

    #[test]
    fn a_flag_differing_from_the_spec_default_wins_with_no_hint() {
        let mut spec_defaults = IndexMap::new();
        spec_defaults.insert("apt_workers".to_string(), serde_yaml::Value::from(4));
        let mut flags = base_flags();
        flags.apt_workers = Some(9);
        let config = RunConfig::resolve(flags, &spec_defaults).unwrap();
        assert_eq!(config.apt_workers, 9);
        assert!(config.hints.is_empty());
    }
}
