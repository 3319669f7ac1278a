// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! The dependency resolver (C6, spec §4.5): version selection, directive
//! application, conflict detection, an optional SAT closure over APT
//! dependency graphs, and packaging-group assignment.

mod constraint;
mod error;
mod packaging;
mod sat;
mod select;

pub use error::{Error, Result};
pub use select::Selected;

use fleetpack_foundation::{Dependency, DependencyKind, Origin, ResolutionRecord};
use fleetpack_index::RepoIndex;
use fleetpack_spec::{PackagingGroup, ResolutionDirective};

/// `{ package, version, arch, source, sha256 }`, sorted by `package` on
/// output (spec §3 `AptLockEntry`).
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct AptLockEntry {
    pub package: String,
    pub version: String,
    pub arch: String,
    pub source: String,
    pub sha256: String,
}

/// `{ group, mode, package, version }`, sorted by `(group, package)` on
/// output (spec §3 `BundleManifestEntry`).
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct BundleManifestEntry {
    pub group: String,
    pub mode: String,
    pub package: String,
    pub version: String,
}

/// Everything a single resolution run needs (spec §4.5 "Inputs").
pub struct ResolveRequest<'a> {
    pub dependencies: &'a [Dependency],
    pub index: &'a RepoIndex,
    pub directives: &'a [ResolutionDirective],
    pub packaging_groups: &'a [PackagingGroup],
    pub target_ubuntu: &'a str,
    pub use_apt_solver: bool,
}

/// The full output of one resolution (spec §4.5 step 7: "AptLocks,
/// BundleManifest, ResolutionReport, ResolvedDeps").
#[derive(Debug, Default)]
pub struct ResolveOutput {
    pub apt_locks: Vec<AptLockEntry>,
    pub bundle_manifest: Vec<BundleManifestEntry>,
    pub resolution_report: Vec<ResolutionRecord>,
    pub resolved_deps: Vec<Selected>,
}

/// Strips a single, case-sensitive leading `ubuntu-` prefix. Frozen by this
/// expansion's open-question decision (see `DESIGN.md`): applied once, at
/// every read site, no further normalization.
pub fn normalize_target_ubuntu(target: &str) -> String {
    target.strip_prefix("ubuntu-").unwrap_or(target).to_string()
}

/// Runs the full resolver pipeline of spec §4.5: per-kind candidate
/// selection and directive application (step 1-4), an optional SAT closure
/// over the APT dependency graph (step 5), packaging-group assignment (step
/// 6), and assembly of the four output artifacts (step 7).
#[tracing::instrument(skip(request), fields(target_ubuntu = %request.target_ubuntu))]
pub fn resolve(request: &ResolveRequest<'_>) -> Result<ResolveOutput> {
    let _target = normalize_target_ubuntu(request.target_ubuntu);

    let (mut selected, mut records) =
        select::select_all(request.dependencies, request.index, request.directives)?;

    if request.use_apt_solver {
        let roots: Vec<String> = selected
            .iter()
            .filter(|s| s.kind == DependencyKind::Apt)
            .map(|s| s.name.clone())
            .collect();
        if !roots.is_empty() {
            let closure = sat::solve_closure(&roots, &request.index.apt, request.directives)?;
            let existing: std::collections::HashSet<String> = selected
                .iter()
                .filter(|s| s.kind == DependencyKind::Apt)
                .map(|s| s.name.clone())
                .collect();
            for (name, entry) in closure {
                if existing.contains(&name) {
                    continue;
                }
                selected.push(Selected {
                    kind: DependencyKind::Apt,
                    name: name.clone(),
                    version: entry.version.0.clone(),
                    arch: Some(entry.arch.clone()),
                    component: Some(entry.component.clone()),
                    uri: entry.uri.clone(),
                    sha256: entry.sha256.clone(),
                    origin: Origin::Workspace("apt-dependency-closure".to_string()),
                });
            }
        }
    }

    let mut apt_locks = Vec::new();
    let mut bundle_manifest = Vec::new();
    for dep in &selected {
        if dep.kind != DependencyKind::Apt {
            continue;
        }
        apt_locks.push(AptLockEntry {
            package: dep.name.clone(),
            version: dep.version.clone(),
            arch: dep.arch.clone().unwrap_or_default(),
            source: dep.component.clone().unwrap_or_default(),
            sha256: dep.sha256.clone(),
        });

        let group = packaging::assign_group(&dep.name, request.packaging_groups);
        if packaging::included_in_bundle(group) {
            if let Some(group) = group {
                bundle_manifest.push(BundleManifestEntry {
                    group: group.name.clone(),
                    mode: format!("{:?}", group.mode).to_lowercase(),
                    package: dep.name.clone(),
                    version: dep.version.clone(),
                });
            }
        }
    }

    apt_locks.sort_by(|a, b| a.package.cmp(&b.package));
    bundle_manifest.sort_by(|a, b| (&a.group, &a.package).cmp(&(&b.group, &b.package)));
    selected.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
    records.sort_by(|a, b| a.dependency.cmp(&b.dependency));

    Ok(ResolveOutput {
        apt_locks,
        bundle_manifest,
        resolution_report: records,
        resolved_deps: selected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_a_single_ubuntu_prefix() {
        assert_eq!(normalize_target_ubuntu("ubuntu-jammy"), "jammy");
        assert_eq!(normalize_target_ubuntu("jammy"), "jammy");
        assert_eq!(normalize_target_ubuntu("Ubuntu-jammy"), "Ubuntu-jammy");
    }

    #[test]
    fn resolve_end_to_end_produces_sorted_outputs() {
        use fleetpack_foundation::DebianVersion;
        use fleetpack_index::AptIndexEntry;
        use indexmap::IndexMap;

        let mut apt = IndexMap::new();
        apt.insert(
            "zlib".to_string(),
            vec![AptIndexEntry {
                version: DebianVersion::new("1.0.0"),
                arch: "amd64".into(),
                component: "main".into(),
                uri: "pool/zlib_1.0.0_amd64.deb".into(),
                sha256: "sha".into(),
                depends: vec![],
            }],
        );
        apt.insert(
            "apache2".to_string(),
            vec![AptIndexEntry {
                version: DebianVersion::new("2.4.0"),
                arch: "amd64".into(),
                component: "main".into(),
                uri: "pool/apache2_2.4.0_amd64.deb".into(),
                sha256: "sha".into(),
                depends: vec![],
            }],
        );
        let index = RepoIndex { apt, pip: IndexMap::new() };

        let deps = vec![
            Dependency::new(DependencyKind::Apt, "zlib", Origin::Product),
            Dependency::new(DependencyKind::Apt, "apache2", Origin::Product),
        ];
        let group = PackagingGroup {
            name: "catch_all".into(),
            mode: fleetpack_spec::PackagingMode::Bundled,
            members: vec!["*".into()],
            pin_policy: fleetpack_spec::PinPolicy::Any,
        };

        let request = ResolveRequest {
            dependencies: &deps,
            index: &index,
            directives: &[],
            packaging_groups: std::slice::from_ref(&group),
            target_ubuntu: "ubuntu-jammy",
            use_apt_solver: false,
        };
        let output = resolve(&request).unwrap();
        assert_eq!(output.apt_locks.len(), 2);
        assert_eq!(output.apt_locks[0].package, "apache2");
        assert_eq!(output.bundle_manifest.len(), 2);
    }
}
