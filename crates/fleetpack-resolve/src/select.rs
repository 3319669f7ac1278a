// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{Dependency, DependencyKind, PepVersion};
use fleetpack_foundation::{DebianVersion, Origin, ResolutionRecord};
use fleetpack_foundation::ResolutionAction as RecordAction;
use fleetpack_index::{AptIndexEntry, PipIndexEntry, RepoIndex};
use fleetpack_spec::{ResolutionAction, ResolutionDirective};

use crate::constraint::{combine, satisfies};
use crate::error::{Error, Result};

/// One dependency's winning candidate, still carrying enough provenance to
/// build an `AptLockEntry`/`BundleManifestEntry` downstream.
#[derive(Clone, Debug, PartialEq)]
pub struct Selected {
    pub kind: DependencyKind,
    pub name: String,
    pub version: String,
    pub arch: Option<String>,
    pub component: Option<String>,
    pub uri: String,
    pub sha256: String,
    pub origin: Origin,
}

/// Groups the (already-deduplicated, but defensively re-grouped here per
/// spec §4.5 step 1) dependency list by `(kind, name)`, selects a winning
/// candidate per group, and returns both the selections and every
/// `ResolutionRecord` a directive produced.
pub fn select_all(
    dependencies: &[Dependency],
    index: &RepoIndex,
    directives: &[ResolutionDirective],
) -> Result<(Vec<Selected>, Vec<ResolutionRecord>)> {
    let mut groups: indexmap::IndexMap<(DependencyKind, String), Vec<&Dependency>> =
        indexmap::IndexMap::new();
    for dep in dependencies {
        groups
            .entry((dep.kind, dep.name.clone()))
            .or_default()
            .push(dep);
    }

    let mut selected = Vec::new();
    let mut records = Vec::new();
    for ((kind, name), deps) in groups {
        let directive = directives.iter().find(|d| d.dependency == name);
        match kind {
            DependencyKind::Apt | DependencyKind::Pip => {
                let (candidate, mut recs) = select_indexed(kind, &name, &deps, index, directive)?;
                records.append(&mut recs);
                selected.push(candidate);
            }
            DependencyKind::Source | DependencyKind::Internal => {
                selected.push(select_passthrough(kind, &name, &deps));
            }
        }
    }
    Ok((selected, records))
}

fn select_passthrough(kind: DependencyKind, name: &str, deps: &[&Dependency]) -> Selected {
    let dep = deps[0];
    Selected {
        kind,
        name: name.to_string(),
        version: dep.version_constraint.clone().unwrap_or_else(|| "unspecified".to_string()),
        arch: None,
        component: None,
        uri: dep
            .source
            .as_ref()
            .map(|s| format!("{}@{}", s.repo, s.git_ref))
            .unwrap_or_default(),
        sha256: String::new(),
        origin: dep.origin.clone(),
    }
}

fn select_indexed(
    kind: DependencyKind,
    name: &str,
    deps: &[&Dependency],
    index: &RepoIndex,
    directive: Option<&ResolutionDirective>,
) -> Result<(Selected, Vec<ResolutionRecord>)> {
    let constraints: Vec<Option<&str>> = deps.iter().map(|d| d.version_constraint.as_deref()).collect();
    let effective_constraint = combine(&constraints);
    let distinct_constraints: std::collections::HashSet<&str> =
        constraints.iter().filter_map(|c| *c).collect();

    let mut records = Vec::new();
    let origin = deps[0].origin.clone();

    match kind {
        DependencyKind::Apt => {
            let Some(entries) = index.apt.get(name) else {
                return Err(Error::NoAvailableVersions { name: name.to_string() });
            };
            let picked = select_apt(name, entries, effective_constraint.as_deref(), directive, &mut records)?;
            if picked.is_none() && distinct_constraints.len() > 1 && directive.is_none() {
                return Err(Error::ConflictWithoutDirective { name: name.to_string() });
            }
            let Some(entry) = picked else {
                return Err(Error::NoCompatibleVersion { name: name.to_string() });
            };
            Ok((
                Selected {
                    kind,
                    name: name.to_string(),
                    version: entry.version.0.clone(),
                    arch: Some(entry.arch.clone()),
                    component: Some(entry.component.clone()),
                    uri: entry.uri.clone(),
                    sha256: entry.sha256.clone(),
                    origin,
                },
                records,
            ))
        }
        DependencyKind::Pip => {
            let Some(entries) = index.pip.get(name) else {
                return Err(Error::NoAvailableVersions { name: name.to_string() });
            };
            let picked = select_pip(name, entries, effective_constraint.as_deref(), directive, &mut records)?;
            if picked.is_none() && distinct_constraints.len() > 1 && directive.is_none() {
                return Err(Error::ConflictWithoutDirective { name: name.to_string() });
            }
            let Some(entry) = picked else {
                return Err(Error::NoCompatibleVersion { name: name.to_string() });
            };
            Ok((
                Selected {
                    kind,
                    name: name.to_string(),
                    version: entry.version.0.clone(),
                    arch: None,
                    component: None,
                    uri: entry.uri.clone(),
                    sha256: entry.sha256.clone(),
                    origin,
                },
                records,
            ))
        }
        _ => unreachable!("source/internal handled by select_passthrough"),
    }
}

fn select_apt<'a>(
    name: &str,
    entries: &'a [AptIndexEntry],
    constraint: Option<&str>,
    directive: Option<&ResolutionDirective>,
    records: &mut Vec<ResolutionRecord>,
) -> Result<Option<&'a AptIndexEntry>> {
    if let Some(directive) = directive {
        if directive.action == ResolutionAction::Pin {
            let entry = entries
                .iter()
                .find(|e| e.version.0 == directive.value)
                .ok_or_else(|| Error::InvalidDirective {
                    dependency: name.to_string(),
                    message: format!("pinned version {} not found in index", directive.value),
                })?;
            records.push(directive_record(directive, RecordAction::Pin));
            return Ok(Some(entry));
        }
    }

    let mut candidates: Vec<&AptIndexEntry> = entries
        .iter()
        .filter(|e| satisfies(constraint, &e.version, DebianVersion::new))
        .collect();

    if let Some(directive) = directive {
        match directive.action {
            ResolutionAction::Exclude => {
                candidates.retain(|e| e.version.0 != directive.value);
                records.push(directive_record(directive, RecordAction::Exclude));
            }
            ResolutionAction::Prefer => {
                if let Some(pos) = candidates.iter().position(|e| e.version.0 == directive.value) {
                    let preferred = candidates.remove(pos);
                    candidates.insert(0, preferred);
                    records.push(directive_record(directive, RecordAction::Prefer));
                }
            }
            ResolutionAction::Replace => {
                if let Some((new_name, new_version)) = directive.value.split_once('@') {
                    if new_name == name {
                        if let Some(entry) = entries.iter().find(|e| e.version.0 == new_version) {
                            records.push(directive_record(directive, RecordAction::Replace));
                            return Ok(Some(entry));
                        }
                    }
                }
            }
            ResolutionAction::Pin => unreachable!("handled above"),
        }
    }

    sort_candidates(&mut candidates);
    Ok(candidates.into_iter().next())
}

fn select_pip<'a>(
    name: &str,
    entries: &'a [PipIndexEntry],
    constraint: Option<&str>,
    directive: Option<&ResolutionDirective>,
    records: &mut Vec<ResolutionRecord>,
) -> Result<Option<&'a PipIndexEntry>> {
    if let Some(directive) = directive {
        if directive.action == ResolutionAction::Pin {
            let entry = entries
                .iter()
                .find(|e| e.version.0 == directive.value)
                .ok_or_else(|| Error::InvalidDirective {
                    dependency: name.to_string(),
                    message: format!("pinned version {} not found in index", directive.value),
                })?;
            records.push(directive_record(directive, RecordAction::Pin));
            return Ok(Some(entry));
        }
    }

    let mut candidates: Vec<&PipIndexEntry> = entries
        .iter()
        .filter(|e| !e.yanked)
        .filter(|e| satisfies(constraint, &e.version, PepVersion::new))
        .collect();

    if let Some(directive) = directive {
        match directive.action {
            ResolutionAction::Exclude => {
                candidates.retain(|e| e.version.0 != directive.value);
                records.push(directive_record(directive, RecordAction::Exclude));
            }
            ResolutionAction::Prefer => {
                if let Some(pos) = candidates.iter().position(|e| e.version.0 == directive.value) {
                    let preferred = candidates.remove(pos);
                    candidates.insert(0, preferred);
                    records.push(directive_record(directive, RecordAction::Prefer));
                }
            }
            ResolutionAction::Replace => {
                if let Some((new_name, new_version)) = directive.value.split_once('@') {
                    if new_name == name {
                        if let Some(entry) = entries.iter().find(|e| e.version.0 == new_version) {
                            records.push(directive_record(directive, RecordAction::Replace));
                            return Ok(Some(entry));
                        }
                    }
                }
            }
            ResolutionAction::Pin => unreachable!("handled above"),
        }
    }

    candidates.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| a.uri.cmp(&b.uri)));
    Ok(candidates.into_iter().next())
}

/// Highest version first; ties broken by source order in the index (already
/// the entries' declaration order), then lexicographically by `uri` (spec
/// §4.5 "Tie-breaks").
fn sort_candidates(candidates: &mut [&AptIndexEntry]) {
    candidates.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| a.uri.cmp(&b.uri)));
}

fn directive_record(
    directive: &ResolutionDirective,
    action: RecordAction,
) -> ResolutionRecord {
    ResolutionRecord {
        dependency: directive.dependency.clone(),
        action,
        value: directive.value.clone(),
        reason: directive.reason.clone(),
        owner: directive.owner.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpack_foundation::DependencyKind;
    use indexmap::IndexMap;

    fn entry(version: &str, uri: &str) -> AptIndexEntry {
        AptIndexEntry {
            version: DebianVersion::new(version),
            arch: "amd64".into(),
            component: "main".into(),
            uri: uri.into(),
            sha256: "sha".into(),
            depends: vec![],
        }
    }

    fn index_with(name: &str, entries: Vec<AptIndexEntry>) -> RepoIndex {
        let mut apt = IndexMap::new();
        apt.insert(name.to_string(), entries);
        RepoIndex { apt, pip: IndexMap::new() }
    }

    #[test]
    fn picks_highest_satisfying_version() {
        let index = index_with("libfoo", vec![entry("1.0.0", "a"), entry("2.0.0", "b")]);
        let dep = Dependency::new(DependencyKind::Apt, "libfoo", Origin::Product);
        let (selected, _) = select_all(&[dep], &index, &[]).unwrap();
        assert_eq!(selected[0].version, "2.0.0");
    }

    #[test]
    fn pin_directive_forces_exact_version() {
        let index = index_with("libfoo", vec![entry("1.0.0", "a"), entry("2.0.0", "b")]);
        let dep = Dependency::new(DependencyKind::Apt, "libfoo", Origin::Product);
        let directive = ResolutionDirective {
            dependency: "libfoo".into(),
            action: ResolutionAction::Pin,
            value: "1.0.0".into(),
            reason: "known good".into(),
            owner: "ops".into(),
        };
        let (selected, records) = select_all(&[dep], &index, &[directive]).unwrap();
        assert_eq!(selected[0].version, "1.0.0");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_name_is_not_found() {
        let index = index_with("other", vec![entry("1.0.0", "a")]);
        let dep = Dependency::new(DependencyKind::Apt, "libfoo", Origin::Product);
        let err = select_all(&[dep], &index, &[]).unwrap_err();
        assert!(matches!(err, Error::NoAvailableVersions { .. }));
    }

    #[test]
    fn conflicting_constraints_without_directive_fail() {
        let index = index_with("libfoo", vec![entry("1.0.0", "a"), entry("2.0.0", "b")]);
        let dep_a = Dependency::new(DependencyKind::Apt, "libfoo", Origin::Product).with_constraint("==1.0.0");
        let dep_b = Dependency::new(DependencyKind::Apt, "libfoo", Origin::Profile("p".into())).with_constraint("==2.0.0");
        let err = select_all(&[dep_a, dep_b], &index, &[]).unwrap_err();
        assert!(matches!(err, Error::ConflictWithoutDirective { .. }));
    }
}
