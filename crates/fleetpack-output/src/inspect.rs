// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;
use std::str::FromStr;

use fleetpack_foundation::{ResolutionAction, ResolutionRecord};
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// A single locked package, as read back from `apt.lock`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AptLockLine {
    pub package: String,
    pub version: String,
}

/// A packaging group and the packages assigned to it, as read back from
/// `bundle.manifest`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InspectGroup {
    pub group: String,
    pub packages: Vec<String>,
}

/// Everything `inspect` (spec §8 scenario 2) reports back about an existing
/// output directory: the mandatory three files, read and parsed, without
/// touching a snapshot backend.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InspectReport {
    pub apt_lock_count: usize,
    pub apt_locks: Vec<AptLockLine>,
    pub groups: Vec<InspectGroup>,
    pub resolution_records: Vec<ResolutionRecord>,
}

/// Reads `apt.lock`, `bundle.manifest`, and `resolution.report` out of
/// `output_dir` and parses them back into an [`InspectReport`]. The inverse
/// of `write_all`'s three mandatory writers.
pub async fn read_inspect_report(output_dir: &Path) -> Result<InspectReport> {
    let apt_locks = read_apt_lock(&output_dir.join("apt.lock")).await?;
    let groups = read_bundle_manifest(&output_dir.join("bundle.manifest")).await?;
    let resolution_records = read_resolution_report(&output_dir.join("resolution.report")).await?;

    Ok(InspectReport {
        apt_lock_count: apt_locks.len(),
        apt_locks,
        groups,
        resolution_records,
    })
}

async fn read_to_string(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })
}

/// `apt.lock`: one `name=version` per line.
async fn read_apt_lock(path: &Path) -> Result<Vec<AptLockLine>> {
    let body = read_to_string(path).await?;
    body.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_once('=')
                .map(|(package, version)| AptLockLine {
                    package: package.to_string(),
                    version: version.to_string(),
                })
                .ok_or_else(|| Error::Malformed {
                    path: path.display().to_string(),
                    message: format!("expected \"name=version\", got {line:?}"),
                })
        })
        .collect()
}

/// `bundle.manifest`: CSV `group,mode,package,version`, no header row.
/// Packages are grouped by `group` in first-seen order; `mode = skip` rows
/// never reach this file (the resolver omits them from the manifest).
async fn read_bundle_manifest(path: &Path) -> Result<Vec<InspectGroup>> {
    let body = read_to_string(path).await?;
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(body.as_bytes());
    let mut by_group: IndexMap<String, Vec<String>> = IndexMap::new();

    for result in reader.records() {
        let record = result.map_err(|source| Error::ParseCsv {
            path: path.display().to_string(),
            source,
        })?;
        let group = field(&record, 0, path)?;
        let package = field(&record, 2, path)?;
        by_group.entry(group).or_default().push(package);
    }

    Ok(by_group
        .into_iter()
        .map(|(group, packages)| InspectGroup { group, packages })
        .collect())
}

/// `resolution.report`: CSV `dependency,action,value,reason,owner`, no
/// header row.
async fn read_resolution_report(path: &Path) -> Result<Vec<ResolutionRecord>> {
    let body = read_to_string(path).await?;
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(body.as_bytes());
    let mut records = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|source| Error::ParseCsv {
            path: path.display().to_string(),
            source,
        })?;
        let action_field = field(&record, 1, path)?;
        let action = ResolutionAction::from_str(&action_field).map_err(|message| Error::Malformed {
            path: path.display().to_string(),
            message,
        })?;
        records.push(ResolutionRecord {
            dependency: field(&record, 0, path)?,
            action,
            value: field(&record, 2, path)?,
            reason: field(&record, 3, path)?,
            owner: field(&record, 4, path)?,
        });
    }

    Ok(records)
}

fn field(record: &csv::StringRecord, index: usize, path: &Path) -> Result<String> {
    record
        .get(index)
        .map(str::to_string)
        .ok_or_else(|| Error::Malformed {
            path: path.display().to_string(),
            message: format!("row {record:?} is missing field {index}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_back_the_scenario_2_fixture() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("apt.lock"), "libfoo=1.0.0\n").await.unwrap();
        tokio::fs::write(dir.path().join("bundle.manifest"), "group,individual,libfoo,1.0.0\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("resolution.report"), "libfoo,pin,1.0.0,reason,owner\n")
            .await
            .unwrap();

        let report = read_inspect_report(dir.path()).await.unwrap();

        assert_eq!(report.apt_lock_count, 1);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].group, "group");
        assert_eq!(report.groups[0].packages, vec!["libfoo".to_string()]);
        assert_eq!(report.resolution_records.len(), 1);
        assert_eq!(report.resolution_records[0].dependency, "libfoo");
        assert_eq!(report.resolution_records[0].action, ResolutionAction::Pin);
    }

    #[tokio::test]
    async fn round_trips_through_write_all() {
        use fleetpack_foundation::SnapshotIntent;
        use fleetpack_resolve::{AptLockEntry, BundleManifestEntry, ResolveOutput};

        let dir = tempfile::tempdir().unwrap();
        let resolution = ResolveOutput {
            apt_locks: vec![AptLockEntry {
                package: "zlib".into(),
                version: "1.0.0".into(),
                arch: "amd64".into(),
                source: "main".into(),
                sha256: "sha".into(),
            }],
            bundle_manifest: vec![BundleManifestEntry {
                group: "catch_all".into(),
                mode: "bundled".into(),
                package: "zlib".into(),
                version: "1.0.0".into(),
            }],
            resolution_report: vec![ResolutionRecord {
                dependency: "zlib".into(),
                action: ResolutionAction::Prefer,
                value: "1.0.0".into(),
                reason: "operator override".into(),
                owner: "ops".into(),
            }],
            resolved_deps: vec![],
        };
        let request = crate::writer::OutputRequest {
            output_dir: dir.path(),
            resolution: &resolution,
            snapshot_intent: None::<&SnapshotIntent>,
            emit: crate::writer::EmitFlags::default(),
        };
        crate::writer::write_all(&request).await.unwrap();

        let report = read_inspect_report(dir.path()).await.unwrap();
        assert_eq!(report.apt_lock_count, 1);
        assert_eq!(report.groups, vec![InspectGroup {
            group: "catch_all".into(),
            packages: vec!["zlib".into()],
        }]);
        assert_eq!(report.resolution_records.len(), 1);
    }
}
