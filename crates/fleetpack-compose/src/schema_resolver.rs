// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::collections::HashSet;
use std::path::Path;

use fleetpack_foundation::{Dependency, DependencyKind, Origin};
use fleetpack_spec::{InlineSchema, SchemaMappingEntry, SpecLoader};

use crate::error::Result;

/// The outcome of resolving one abstract key: either a concrete dependency
/// was found, or the key is unknown to every loaded layer (spec §4.2:
/// "Unknown keys are surfaced separately, not fatal at this layer").
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Hit(Dependency),
    Unknown(String),
}

/// An append-only stack of schema layers with top-down, first-hit lookup
/// (spec §4.2, §9 "Layered schema resolution"). Stateless across runs: a
/// fresh resolver is built per pipeline invocation.
#[derive(Default)]
pub struct SchemaResolver {
    /// Layers in load order; lookups walk from the end (most recently
    /// loaded / highest precedence) backwards.
    layers: Vec<(String, InlineSchema)>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an already-loaded schema as the new highest-precedence layer.
    pub fn push_layer(&mut self, label: impl Into<String>, schema: InlineSchema) {
        self.layers.push((label.into(), schema));
    }

    /// `LoadSchema(path) -> ok|err`: reads a schema file and appends it as a
    /// layer.
    pub fn load_schema(&mut self, loader: &dyn SpecLoader, path: &Path) -> Result<()> {
        let schema = loader.load_schema(path)?;
        self.push_layer(path.display().to_string(), schema);
        Ok(())
    }

    /// `HasKey(key) -> bool`.
    pub fn has_key(&self, key: &str) -> bool {
        self.layers
            .iter()
            .any(|(_, schema)| schema.mappings.contains_key(key))
    }

    /// `Resolve(key) -> (dep, hit, err)`. Walks layers top-down (last loaded
    /// first) and returns the first hit.
    pub fn resolve(&self, key: &str) -> ResolveOutcome {
        for (label, schema) in self.layers.iter().rev() {
            if let Some(mapping) = schema.mappings.get(key) {
                return ResolveOutcome::Hit(to_dependency(key, label, mapping));
            }
        }
        ResolveOutcome::Unknown(key.to_string())
    }

    /// `ResolveAll(keys) -> (resolved, unknown, err)`.
    pub fn resolve_all(&self, keys: &[String]) -> (Vec<Dependency>, Vec<String>) {
        let mut resolved = Vec::new();
        let mut unknown = Vec::new();
        let mut seen = HashSet::new();
        for key in keys {
            if !seen.insert(key.clone()) {
                continue;
            }
            match self.resolve(key) {
                ResolveOutcome::Hit(dep) => resolved.push(dep),
                ResolveOutcome::Unknown(key) => unknown.push(key),
            }
        }
        (resolved, unknown)
    }
}

fn to_dependency(key: &str, layer_label: &str, mapping: &SchemaMappingEntry) -> Dependency {
    let mut dep = Dependency::new(
        mapping.kind,
        mapping.package.clone(),
        Origin::Schema(layer_label.to_string()),
    );
    dep.version_constraint = mapping.version_constraint.clone();
    let _ = key; // key itself is not part of the Dependency identity, only provenance context
    dep
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn schema_with(key: &str, package: &str) -> InlineSchema {
        let mut mappings = IndexMap::new();
        mappings.insert(
            key.to_string(),
            SchemaMappingEntry {
                kind: DependencyKind::Apt,
                package: package.to_string(),
                version_constraint: None,
            },
        );
        InlineSchema {
            schema_version: "v1".into(),
            mappings,
        }
    }

    #[test]
    fn later_layer_shadows_earlier_one() {
        let mut resolver = SchemaResolver::new();
        resolver.push_layer("base", schema_with("cv_bridge", "libopencv-dev"));
        resolver.push_layer("overlay", schema_with("cv_bridge", "ros-cv-bridge"));

        match resolver.resolve("cv_bridge") {
            ResolveOutcome::Hit(dep) => assert_eq!(dep.name, "ros-cv-bridge"),
            ResolveOutcome::Unknown(_) => panic!("expected a hit"),
        }
    }

    #[test]
    fn unknown_key_is_surfaced_not_fatal() {
        let resolver = SchemaResolver::new();
        match resolver.resolve("totally_unknown") {
            ResolveOutcome::Unknown(key) => assert_eq!(key, "totally_unknown"),
            ResolveOutcome::Hit(_) => panic!("expected unknown"),
        }
    }

    #[test]
    fn resolve_all_splits_hits_and_unknowns() {
        let mut resolver = SchemaResolver::new();
        resolver.push_layer("base", schema_with("cv_bridge", "libopencv-dev"));
        let (resolved, unknown) =
            resolver.resolve_all(&["cv_bridge".to_string(), "missing_tag".to_string()]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(unknown, vec!["missing_tag".to_string()]);
    }
}
