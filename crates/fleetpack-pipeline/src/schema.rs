// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::{Path, PathBuf};

use fleetpack_compose::SchemaResolver;
use fleetpack_spec::{ComposedSpec, SpecLoader};

use crate::error::Result;

/// Sibling `schemas/` directory of the product spec file, sorted
/// lexicographically by filename (spec §4.1 "Schema precedence": "auto-
/// discovered schemas (sorted lexicographically by filename)").
pub fn discover_sibling_schemas(product_spec_path: &Path) -> Vec<PathBuf> {
    let Some(parent) = product_spec_path.parent() else {
        return Vec::new();
    };
    let schemas_dir = parent.join("schemas");
    let Ok(entries) = std::fs::read_dir(&schemas_dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

/// Builds the layered schema resolver for one run (spec §4.2, §9 "Layered
/// schema resolution"): the composed spec's inline schema first (lowest
/// precedence), then its already-ordered `schema_files` (auto-discovered
/// then spec-declared, per `fleetpack_compose::compose`'s own doc comment),
/// then CLI-provided schema files last — the one layer the composer can't
/// see because it lives outside the composed spec (spec §4.1 "Schema
/// precedence": "CLI-provided schema files" is the highest layer).
pub fn build_schema_resolver(
    loader: &dyn SpecLoader,
    composed: &ComposedSpec,
    cli_schema_files: &[PathBuf],
) -> Result<SchemaResolver> {
    let mut resolver = SchemaResolver::new();
    if let Some(inline) = &composed.inline_schema {
        resolver.push_layer("inline", inline.clone());
    }
    for path in &composed.schema_files {
        resolver.load_schema(loader, path)?;
    }
    for path in cli_schema_files {
        resolver.load_schema(loader, path)?;
    }
    Ok(resolver)
}
