// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::PathBuf;

use fleetpack_spec::{
    ComposedSpec,
    FieldOrigin,
    InlineSchema,
    InputsConfig,
    PackagingGroup,
    ProductSpec,
    ProfileRef,
    ProfileSpec,
    PublishConfig,
    SpecLoader,
};
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// A resolved profile layer plus the label used for provenance (spec §4.1
/// item 3: `origin = profilePath | "product" | "inline"`).
struct Layer {
    label: String,
    spec: ProfileSpec,
}

/// `Compose(product, profiles) -> composedSpec | error` (spec §4.1).
///
/// Precedence, lowest to highest: product base, each profile in the
/// product's declared order, then the product's own top-level `overrides`
/// section. Maps overwrite per key; sequences append unless the profile
/// names the key in `sequence_replace`, in which case the overlay fully
/// substitutes the base.
pub fn compose(
    product: &ProductSpec,
    loader: &dyn SpecLoader,
    discovered_schemas: &[PathBuf],
) -> Result<ComposedSpec> {
    let mut layers = Vec::with_capacity(product.profiles.len() + 1);
    for profile_ref in &product.profiles {
        match profile_ref {
            ProfileRef::Inline(name) => {
                let spec = product
                    .inline_profiles
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownInlineProfile(name.clone()))?;
                layers.push(Layer {
                    label: format!("inline:{name}"),
                    spec,
                });
            }
            ProfileRef::File(path) => {
                let spec = loader.load_profile(path)?;
                layers.push(Layer {
                    label: path.display().to_string(),
                    spec,
                });
            }
        }
    }
    if let Some(overrides) = &product.overrides {
        layers.push(Layer {
            label: "product".to_string(),
            spec: overrides.clone(),
        });
    }

    let mut packaging = keyed_by_name(product.packaging.clone());
    let mut publish = product.publish.clone();
    let mut resolutions = product.resolutions.clone();
    let mut inputs = product.inputs.clone();
    let mut inline_schema = product.schema.clone();
    let mut schema_files = product.schema_files.clone();
    let mut defaults = product.defaults.clone();
    let mut ros_tags: Vec<(String, FieldOrigin)> = product
        .ros_tags
        .iter()
        .map(|tag| (tag.clone(), FieldOrigin::Product))
        .collect();

    let mut provenance: IndexMap<String, FieldOrigin> = IndexMap::new();
    provenance.insert("metadata".into(), FieldOrigin::Product);

    for layer in &layers {
        let origin = layer_origin(&layer.label);

        if !layer.spec.packaging.is_empty() {
            for group in &layer.spec.packaging {
                packaging.insert(group.name.clone(), group.clone());
            }
            provenance.insert("packaging".into(), origin.clone());
        }

        if let Some(overlay_publish) = &layer.spec.publish {
            publish = Some(merge_publish(publish, overlay_publish.clone()));
            provenance.insert("publish".into(), origin.clone());
        }

        if !layer.spec.resolutions.is_empty() {
            resolutions = merge_sequence(
                resolutions,
                layer.spec.resolutions.clone(),
                layer.spec.sequence_replace.contains("resolutions"),
            );
            provenance.insert("resolutions".into(), origin.clone());
        }

        if let Some(overlay_inputs) = &layer.spec.inputs {
            inputs.workspace_roots = merge_sequence(
                inputs.workspace_roots,
                overlay_inputs.workspace_roots.clone(),
                layer.spec.sequence_replace.contains("workspace_roots"),
            );
            provenance.insert("inputs".into(), origin.clone());
        }

        if let Some(overlay_schema) = &layer.spec.schema {
            inline_schema = Some(merge_schema(inline_schema, overlay_schema.clone()));
            provenance.insert("schema".into(), origin.clone());
        }

        if !layer.spec.schema_files.is_empty() {
            schema_files = merge_sequence(
                schema_files,
                layer.spec.schema_files.clone(),
                layer.spec.sequence_replace.contains("schema_files"),
            );
            provenance.insert("schema_files".into(), origin.clone());
        }

        if !layer.spec.defaults.is_empty() {
            for (key, value) in &layer.spec.defaults {
                defaults.insert(key.clone(), value.clone());
            }
            provenance.insert("defaults".into(), origin.clone());
        }

        if !layer.spec.ros_tags.is_empty() {
            if layer.spec.sequence_replace.contains("ros_tags") {
                ros_tags.clear();
            }
            ros_tags.extend(
                layer
                    .spec
                    .ros_tags
                    .iter()
                    .map(|tag| (tag.clone(), origin.clone())),
            );
            provenance.insert("ros_tags".into(), origin);
        }
    }

    // Schema precedence (spec §4.1 "Schema precedence", lowest to highest):
    // inline schema, auto-discovered schemas (sorted lexicographically by
    // filename), explicit schema_files from the spec. CLI-provided schema
    // files are appended later by the caller (fleetpack-pipeline), since
    // they're outside the composed spec itself.
    let mut sorted_discovered: Vec<PathBuf> = discovered_schemas.to_vec();
    sorted_discovered.sort();
    let mut all_schema_files = sorted_discovered;
    all_schema_files.extend(schema_files);

    Ok(ComposedSpec {
        metadata: product.metadata.clone(),
        packaging: packaging.into_values().collect(),
        publish,
        resolutions,
        inputs,
        inline_schema,
        schema_files: all_schema_files,
        defaults,
        ros_tags,
        provenance,
    })
}

fn layer_origin(label: &str) -> FieldOrigin {
    if label == "product" {
        FieldOrigin::Product
    } else if let Some(name) = label.strip_prefix("inline:") {
        FieldOrigin::Inline(name.to_string())
    } else {
        FieldOrigin::Profile(label.to_string())
    }
}

/// Packaging groups are keyed by name for merge purposes (spec P1: "the set
/// of packaging group names is equal to the union over profile layers, with
/// later layers' declarations winning per name"), while preserving the
/// declaration order of first introduction for deterministic membership
/// resolution downstream (spec §3 "membership resolution is deterministic
/// by group declaration order").
fn keyed_by_name(groups: Vec<PackagingGroup>) -> IndexMap<String, PackagingGroup> {
    let mut map = IndexMap::new();
    for group in groups {
        map.insert(group.name.clone(), group);
    }
    map
}

fn merge_sequence<T>(base: Vec<T>, overlay: Vec<T>, replace: bool) -> Vec<T> {
    if replace {
        overlay
    } else {
        let mut merged = base;
        merged.extend(overlay);
        merged
    }
}

fn merge_publish(base: Option<PublishConfig>, overlay: PublishConfig) -> PublishConfig {
    let mut merged = base.unwrap_or_default();
    if !overlay.repository.is_empty() {
        merged.repository = overlay.repository;
    }
    if overlay.channel.is_some() {
        merged.channel = overlay.channel;
    }
    if overlay.backend.is_some() {
        merged.backend = overlay.backend;
    }
    if overlay.snapshot_prefix.is_some() {
        merged.snapshot_prefix = overlay.snapshot_prefix;
    }
    merged
}

fn merge_schema(base: Option<InlineSchema>, overlay: InlineSchema) -> InlineSchema {
    let mut merged = base.unwrap_or_default();
    if !overlay.schema_version.is_empty() {
        merged.schema_version = overlay.schema_version;
    }
    for (key, mapping) in overlay.mappings {
        merged.mappings.insert(key, mapping);
    }
    merged
}

#[cfg(test)]
mod tests {
    use fleetpack_spec::{FsSpecLoader, Metadata, PackagingMode, PinPolicy};

    use super::*;

    fn group(name: &str, mode: PackagingMode) -> PackagingGroup {
        PackagingGroup {
            name: name.to_string(),
            mode,
            members: vec![],
            pin_policy: PinPolicy::Any,
        }
    }

    #[test]
    fn later_layer_wins_packaging_group_by_name() {
        let mut product = ProductSpec {
            metadata: Metadata {
                name: "sample".into(),
            },
            ..Default::default()
        };
        product.packaging.push(group("core", PackagingMode::Individual));
        product
            .profiles
            .push(ProfileRef::Inline("overlay".into()));
        let mut overlay = ProfileSpec::default();
        overlay.packaging.push(group("core", PackagingMode::Bundled));
        overlay.packaging.push(group("extra", PackagingMode::Skip));
        product.inline_profiles.insert("overlay".into(), overlay);

        let composed = compose(&product, &FsSpecLoader, &[]).unwrap();
        assert_eq!(composed.packaging.len(), 2);
        let core = composed
            .packaging
            .iter()
            .find(|g| g.name == "core")
            .unwrap();
        assert_eq!(core.mode, PackagingMode::Bundled);
    }

    #[test]
    fn unknown_inline_profile_is_an_error() {
        let mut product = ProductSpec {
            metadata: Metadata {
                name: "sample".into(),
            },
            ..Default::default()
        };
        product.packaging.push(group("core", PackagingMode::Individual));
        product.profiles.push(ProfileRef::Inline("missing".into()));

        let err = compose(&product, &FsSpecLoader, &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownInlineProfile(name) if name == "missing"));
    }

    #[test]
    fn sequence_replace_substitutes_instead_of_appending() {
        let mut product = ProductSpec {
            metadata: Metadata {
                name: "sample".into(),
            },
            ..Default::default()
        };
        product.packaging.push(group("core", PackagingMode::Individual));
        product
            .resolutions
            .push(fleetpack_spec::ResolutionDirective {
                dependency: "apt:libfoo".into(),
                action: fleetpack_spec::ResolutionAction::Pin,
                value: "1.0.0".into(),
                reason: "base".into(),
                owner: "base-owner".into(),
            });
        product.profiles.push(ProfileRef::Inline("overlay".into()));

        let mut overlay = ProfileSpec::default();
        overlay.resolutions.push(fleetpack_spec::ResolutionDirective {
            dependency: "apt:libbar".into(),
            action: fleetpack_spec::ResolutionAction::Pin,
            value: "2.0.0".into(),
            reason: "overlay".into(),
            owner: "overlay-owner".into(),
        });
        overlay.sequence_replace.insert("resolutions".into());
        product.inline_profiles.insert("overlay".into(), overlay);

        let composed = compose(&product, &FsSpecLoader, &[]).unwrap();
        assert_eq!(composed.resolutions.len(), 1);
        assert_eq!(composed.resolutions[0].dependency, "apt:libbar");
    }
}
