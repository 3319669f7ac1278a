// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::collections::HashMap;

use fleetpack_compose::{ResolveOutcome, SchemaResolver};
use fleetpack_foundation::{Dependency, DependencyKind, Origin, ResolutionAction, ResolutionRecord};
use fleetpack_spec::ComposedSpec;

use crate::error::Result;
use crate::package_xml::{find_package_xml_files, parse_package_xml};

/// Result of `BuildFromSpecs` (spec §4.3): the deduplicated dependency set
/// plus a resolution report entry for every ROS tag that didn't resolve
/// through the schema.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub dependencies: Vec<Dependency>,
    pub unknown_tags: Vec<ResolutionRecord>,
}

/// `BuildFromSpecs(product, profiles, inputs, workspace, inlineSchema?) ->
/// [Dependency]` (spec §4.3). Takes the already-composed spec (which already
/// carries the merged `ros_tags` from product and every profile layer,
/// spec §4.1) plus the schema resolver built from the composed schema
/// layers, and walks `composed.inputs.workspace_roots` for `package.xml`
/// tags.
pub fn build_from_specs(
    composed: &ComposedSpec,
    resolver: &SchemaResolver,
) -> Result<BuildOutcome> {
    let mut candidates: Vec<Dependency> = Vec::new();
    let mut unknown_tags = Vec::new();

    for (key, origin) in &composed.ros_tags {
        resolve_tag(key, dependency_origin(origin), resolver, &mut candidates, &mut unknown_tags);
    }

    let package_xml_files = find_package_xml_files(&composed.inputs.workspace_roots);
    for path in package_xml_files {
        for tag in parse_package_xml(&path)? {
            resolve_tag(
                &tag.key,
                tag.origin,
                resolver,
                &mut candidates,
                &mut unknown_tags,
            );
        }
    }

    let dependencies = dedup_by_kind_and_name(candidates);
    Ok(BuildOutcome {
        dependencies,
        unknown_tags,
    })
}

fn dependency_origin(field_origin: &fleetpack_spec::FieldOrigin) -> Origin {
    match field_origin {
        fleetpack_spec::FieldOrigin::Product => Origin::Product,
        fleetpack_spec::FieldOrigin::Profile(name) => Origin::Profile(name.clone()),
        fleetpack_spec::FieldOrigin::Inline(_) => Origin::Inline,
    }
}

fn resolve_tag(
    key: &str,
    requester_origin: Origin,
    resolver: &SchemaResolver,
    candidates: &mut Vec<Dependency>,
    unknown_tags: &mut Vec<ResolutionRecord>,
) {
    match resolver.resolve(key) {
        ResolveOutcome::Hit(mut dep) => {
            dep.origin = requester_origin;
            candidates.push(dep);
        }
        ResolveOutcome::Unknown(key) => {
            unknown_tags.push(ResolutionRecord {
                dependency: key,
                action: ResolutionAction::Unknown,
                value: String::new(),
                reason: "no schema mapping for this ROS tag key".to_string(),
                owner: "fleetpack-depbuild".to_string(),
            });
        }
    }
}

/// Deduplicates by `(kind, name)` with last-writer-wins by provenance rank
/// (schema < workspace < profile < product, spec §4.3), preserving the
/// dependency with a version constraint over one without when ranks tie,
/// since a present constraint is always at least as strict as an absent
/// one.
fn dedup_by_kind_and_name(candidates: Vec<Dependency>) -> Vec<Dependency> {
    let mut by_key: HashMap<(DependencyKind, String), Dependency> = HashMap::new();
    let mut order: Vec<(DependencyKind, String)> = Vec::new();

    for dep in candidates {
        let key = (dep.kind, dep.name.clone());
        match by_key.get(&key) {
            None => {
                order.push(key.clone());
                by_key.insert(key, dep);
            }
            Some(existing) => {
                if should_replace(existing, &dep) {
                    by_key.insert(key, dep);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

fn should_replace(existing: &Dependency, candidate: &Dependency) -> bool {
    match candidate.origin.rank().cmp(&existing.origin.rank()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => {
            candidate.version_constraint.is_some() && existing.version_constraint.is_none()
        }
    }
}

#[cfg(test)]
mod tests {
    use fleetpack_spec::{InlineSchema, SchemaMappingEntry};
    use indexmap::IndexMap;

    use super::*;

    fn resolver_with(key: &str, package: &str) -> SchemaResolver {
        let mut mappings = IndexMap::new();
        mappings.insert(
            key.to_string(),
            SchemaMappingEntry {
                kind: DependencyKind::Apt,
                package: package.to_string(),
                version_constraint: None,
            },
        );
        let mut resolver = SchemaResolver::new();
        resolver.push_layer(
            "base",
            InlineSchema {
                schema_version: "v1".into(),
                mappings,
            },
        );
        resolver
    }

    #[test]
    fn unknown_tag_becomes_a_warning_record() {
        let resolver = SchemaResolver::new();
        let composed = fleetpack_spec::ComposedSpec {
            metadata: fleetpack_spec::Metadata { name: "p".into() },
            packaging: vec![],
            publish: None,
            resolutions: vec![],
            inputs: fleetpack_spec::InputsConfig::default(),
            inline_schema: None,
            schema_files: vec![],
            defaults: IndexMap::new(),
            ros_tags: vec![(
                "missing_tag".to_string(),
                fleetpack_spec::FieldOrigin::Product,
            )],
            provenance: IndexMap::new(),
        };

        let outcome = build_from_specs(&composed, &resolver).unwrap();
        assert!(outcome.dependencies.is_empty());
        assert_eq!(outcome.unknown_tags.len(), 1);
        assert_eq!(outcome.unknown_tags[0].action, ResolutionAction::Unknown);
    }

    #[test]
    fn known_tag_resolves_to_a_dependency() {
        let resolver = resolver_with("cv_bridge", "ros-cv-bridge");
        let composed = fleetpack_spec::ComposedSpec {
            metadata: fleetpack_spec::Metadata { name: "p".into() },
            packaging: vec![],
            publish: None,
            resolutions: vec![],
            inputs: fleetpack_spec::InputsConfig::default(),
            inline_schema: None,
            schema_files: vec![],
            defaults: IndexMap::new(),
            ros_tags: vec![(
                "cv_bridge".to_string(),
                fleetpack_spec::FieldOrigin::Product,
            )],
            provenance: IndexMap::new(),
        };

        let outcome = build_from_specs(&composed, &resolver).unwrap();
        assert_eq!(outcome.dependencies.len(), 1);
        assert_eq!(outcome.dependencies[0].name, "ros-cv-bridge");
    }
}
