// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::{Path, PathBuf};

use fleetpack_foundation::{ResolutionRecord, SnapshotIntent};
use fleetpack_resolve::{AptLockEntry, BundleManifestEntry, ResolveOutput};

use crate::error::{Error, Result};

/// Which of the optional output files (spec §6) to emit alongside the
/// mandatory four.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmitFlags {
    pub preferences: bool,
    pub install_list: bool,
    pub snapshot_sources: bool,
    pub compat_views: bool,
}

/// Everything one call to [`write_all`] needs: the resolver's output, the
/// intent to publish, which optional views to emit, and where to put them.
pub struct OutputRequest<'a> {
    pub output_dir: &'a Path,
    pub resolution: &'a ResolveOutput,
    pub snapshot_intent: Option<&'a SnapshotIntent>,
    pub emit: EmitFlags,
}

/// The set of files actually written by one [`write_all`] call, relative to
/// `output_dir`.
#[derive(Debug, Default)]
pub struct WrittenFiles {
    pub paths: Vec<PathBuf>,
}

/// Writes every mandatory output file, plus the optional ones `emit`
/// selects, into `output_dir`. Every write is atomic (tmp file + rename),
/// per spec §4.6, mirroring the cache's own tmp+rename convention.
#[tracing::instrument(skip(request), fields(output_dir = %request.output_dir.display()))]
pub async fn write_all(request: &OutputRequest<'_>) -> Result<WrittenFiles> {
    let dir = request.output_dir;
    ensure_dir(dir).await?;

    let mut written = WrittenFiles::default();

    written
        .paths
        .push(write_apt_lock(dir, &request.resolution.apt_locks).await?);
    written
        .paths
        .push(write_bundle_manifest(dir, &request.resolution.bundle_manifest).await?);
    written
        .paths
        .push(write_resolution_report(dir, &request.resolution.resolution_report).await?);

    if let Some(intent) = request.snapshot_intent {
        written.paths.push(write_snapshot_intent(dir, intent).await?);
    }

    if request.emit.preferences {
        written
            .paths
            .push(write_apt_preferences(dir, &request.resolution.apt_locks).await?);
    }
    if request.emit.install_list {
        written
            .paths
            .push(write_apt_install_list(dir, &request.resolution.apt_locks).await?);
    }
    if request.emit.snapshot_sources {
        if let Some(intent) = request.snapshot_intent {
            written
                .paths
                .push(write_snapshot_sources(dir, intent).await?);
        }
    }
    if request.emit.compat_views {
        written
            .paths
            .push(write_get_dependencies_yaml(dir, &request.resolution.apt_locks).await?);
        written
            .paths
            .push(write_rosdep_yaml(dir, &request.resolution.apt_locks).await?);
    }

    tracing::info!(files = written.paths.len(), "wrote output directory");
    Ok(written)
}

/// `apt.lock`: one `name=version` per line, sorted by name (spec §6). Entries
/// arrive pre-sorted from the resolver but we sort again defensively since
/// this is the file whose byte-identical round-trip property (I3) matters
/// most.
async fn write_apt_lock(dir: &Path, entries: &[AptLockEntry]) -> Result<PathBuf> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.package.cmp(&b.package));
    let mut body = String::new();
    for entry in &sorted {
        body.push_str(&entry.package);
        body.push('=');
        body.push_str(&entry.version);
        body.push('\n');
    }
    atomic_write(&dir.join("apt.lock"), body.as_bytes()).await
}

/// `bundle.manifest`: CSV `group,mode,package,version`, one row per entry,
/// no header row (spec §6).
async fn write_bundle_manifest(dir: &Path, entries: &[BundleManifestEntry]) -> Result<PathBuf> {
    let path = dir.join("bundle.manifest");
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for entry in entries {
        writer
            .write_record([&entry.group, &entry.mode, &entry.package, &entry.version])
            .map_err(|source| Error::Csv {
                path: path.display().to_string(),
                source,
            })?;
    }
    let body = writer.into_inner().map_err(|e| Error::Csv {
        path: path.display().to_string(),
        source: e.into_error(),
    })?;
    atomic_write(&path, &body).await
}

/// `resolution.report`: CSV `dependency,action,value,reason,owner`, one row
/// per record, no header row (spec §6).
async fn write_resolution_report(dir: &Path, records: &[ResolutionRecord]) -> Result<PathBuf> {
    let path = dir.join("resolution.report");
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for record in records {
        writer
            .write_record([
                &record.dependency,
                &record.action.to_string(),
                &record.value,
                &record.reason,
                &record.owner,
            ])
            .map_err(|source| Error::Csv {
                path: path.display().to_string(),
                source,
            })?;
    }
    let body = writer.into_inner().map_err(|e| Error::Csv {
        path: path.display().to_string(),
        source: e.into_error(),
    })?;
    atomic_write(&path, &body).await
}

/// `snapshot.intent`: YAML of [`SnapshotIntent`].
async fn write_snapshot_intent(dir: &Path, intent: &SnapshotIntent) -> Result<PathBuf> {
    let path = dir.join("snapshot.intent");
    let body = serde_yaml::to_string(intent).map_err(|source| Error::Yaml {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write(&path, body.as_bytes()).await
}

/// `apt.preferences`: an APT pin-priority stanza per locked package, pinning
/// every package to its locked version at the highest priority.
async fn write_apt_preferences(dir: &Path, entries: &[AptLockEntry]) -> Result<PathBuf> {
    let mut body = String::new();
    for entry in entries {
        body.push_str(&format!(
            "Package: {}\nPin: version {}\nPin-Priority: 1001\n\n",
            entry.package, entry.version
        ));
    }
    atomic_write(&dir.join("apt.preferences"), body.as_bytes()).await
}

/// `apt.install.list`: a single shell-safe `apt-get install` invocation
/// covering every locked package at its exact version.
async fn write_apt_install_list(dir: &Path, entries: &[AptLockEntry]) -> Result<PathBuf> {
    let mut tokens = vec!["apt-get".to_string(), "install".to_string(), "-y".to_string()];
    for entry in entries {
        tokens.push(shell_quote(&format!("{}={}", entry.package, entry.version)));
    }
    let mut body = tokens.join(" ");
    body.push('\n');
    atomic_write(&dir.join("apt.install.list"), body.as_bytes()).await
}

/// `snapshot.sources`: a `sources.list`-style snippet pointing at the
/// published snapshot's channel (or, absent a channel, its snapshot id).
async fn write_snapshot_sources(dir: &Path, intent: &SnapshotIntent) -> Result<PathBuf> {
    let target = intent.channel.as_deref().unwrap_or(&intent.snapshot_id);
    let body = format!(
        "deb [trusted=yes] {repository}/{target} {target} main\n",
        repository = intent.repository,
    );
    atomic_write(&dir.join("snapshot.sources"), body.as_bytes()).await
}

/// `get-dependencies.yaml`: a flat `name: version` compatibility view over
/// the locked APT packages, for tools expecting the legacy dependency
/// report rather than `apt.lock`'s line format.
async fn write_get_dependencies_yaml(dir: &Path, entries: &[AptLockEntry]) -> Result<PathBuf> {
    let path = dir.join("get-dependencies.yaml");
    let map: indexmap::IndexMap<&str, &str> = entries
        .iter()
        .map(|e| (e.package.as_str(), e.version.as_str()))
        .collect();
    let body = serde_yaml::to_string(&map).map_err(|source| Error::Yaml {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write(&path, body.as_bytes()).await
}

/// `rosdep.yaml`: a flat `name: [name]` compatibility view in the shape
/// rosdep's own per-OS package-list rules use, so existing rosdep tooling
/// can consume a fleetpack lock without a format-specific adapter.
async fn write_rosdep_yaml(dir: &Path, entries: &[AptLockEntry]) -> Result<PathBuf> {
    let path = dir.join("rosdep.yaml");
    let map: indexmap::IndexMap<&str, Vec<&str>> = entries
        .iter()
        .map(|e| (e.package.as_str(), vec![e.package.as_str()]))
        .collect();
    let body = serde_yaml::to_string(&map).map_err(|source| Error::Yaml {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write(&path, body.as_bytes()).await
}

fn shell_quote(token: &str) -> String {
    let safe = token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | ':' | '~' | '='));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| Error::Io {
            path: dir.display().to_string(),
            source,
        })
}

/// Writes `body` to `path` atomically: a sibling `.tmp` file, then a rename,
/// the same convention the repo-index cache uses for its own writes.
async fn atomic_write(path: &Path, body: &[u8]) -> Result<PathBuf> {
    let mut tmp_os = path.as_os_str().to_owned();
    tmp_os.push(".tmp");
    let tmp = PathBuf::from(tmp_os);
    tokio::fs::write(&tmp, body)
        .await
        .map_err(|source| Error::Io {
            path: tmp.display().to_string(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fleetpack_foundation::{ResolutionAction, ResolutionRecord};

    fn sample_resolution() -> ResolveOutput {
        ResolveOutput {
            apt_locks: vec![
                AptLockEntry {
                    package: "zlib".into(),
                    version: "1.0.0".into(),
                    arch: "amd64".into(),
                    source: "main".into(),
                    sha256: "sha".into(),
                },
                AptLockEntry {
                    package: "apache2".into(),
                    version: "2.4.0".into(),
                    arch: "amd64".into(),
                    source: "main".into(),
                    sha256: "sha2".into(),
                },
            ],
            bundle_manifest: vec![BundleManifestEntry {
                group: "catch_all".into(),
                mode: "bundled".into(),
                package: "apache2".into(),
                version: "2.4.0".into(),
            }],
            resolution_report: vec![ResolutionRecord {
                dependency: "apache2".into(),
                action: ResolutionAction::Prefer,
                value: "2.4.0".into(),
                reason: "operator override".into(),
                owner: "ops".into(),
            }],
            resolved_deps: vec![],
        }
    }

    #[tokio::test]
    async fn write_all_produces_the_mandatory_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let resolution = sample_resolution();
        let intent = SnapshotIntent {
            repository: "fleet".into(),
            channel: Some("stable".into()),
            snapshot_prefix: "alpha".into(),
            snapshot_id: "alpha-abc123def456".into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            signing_key: None,
        };
        let request = OutputRequest {
            output_dir: dir.path(),
            resolution: &resolution,
            snapshot_intent: Some(&intent),
            emit: EmitFlags::default(),
        };
        let written = write_all(&request).await.unwrap();
        assert_eq!(written.paths.len(), 4);

        let lock = tokio::fs::read_to_string(dir.path().join("apt.lock"))
            .await
            .unwrap();
        assert_eq!(lock, "apache2=2.4.0\nzlib=1.0.0\n");

        let manifest = tokio::fs::read_to_string(dir.path().join("bundle.manifest"))
            .await
            .unwrap();
        assert!(manifest.contains("catch_all,bundled,apache2,2.4.0"));
    }

    #[tokio::test]
    async fn optional_views_are_emitted_only_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let resolution = sample_resolution();
        let request = OutputRequest {
            output_dir: dir.path(),
            resolution: &resolution,
            snapshot_intent: None,
            emit: EmitFlags {
                preferences: true,
                install_list: true,
                snapshot_sources: false,
                compat_views: true,
            },
        };
        let written = write_all(&request).await.unwrap();
        assert_eq!(written.paths.len(), 5);
        assert!(dir.path().join("apt.preferences").exists());
        assert!(dir.path().join("apt.install.list").exists());
        assert!(dir.path().join("get-dependencies.yaml").exists());
        assert!(dir.path().join("rosdep.yaml").exists());
        assert!(!dir.path().join("snapshot.sources").exists());
    }

    #[test]
    fn shell_quote_wraps_tokens_with_special_characters() {
        assert_eq!(shell_quote("libfoo=1.0.0"), "libfoo=1.0.0");
        assert_eq!(shell_quote("lib foo"), "'lib foo'");
    }
}
