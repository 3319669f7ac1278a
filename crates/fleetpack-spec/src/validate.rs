// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::DependencyKind;

use crate::error::{Error, Result};
use crate::model::ComposedSpec;

/// `ValidateSpec`: checks the invariants spec §4.1 "Validation" requires of
/// a composed spec, separate from composition itself so each stage can be
/// exercised in isolation (spec §2 "Control flow").
pub fn validate_spec(spec: &ComposedSpec) -> Result<()> {
    if spec.metadata.name.trim().is_empty() {
        return Err(Error::Invalid("metadata.name must not be empty".into()));
    }

    if spec.packaging.is_empty() {
        return Err(Error::Invalid(
            "at least one packaging group must be declared".into(),
        ));
    }

    for group in &spec.packaging {
        if group.name.trim().is_empty() {
            return Err(Error::Invalid(
                "packaging group name must not be empty".into(),
            ));
        }
    }

    if let Some(schema) = &spec.inline_schema {
        if schema.schema_version != "v1" {
            return Err(Error::Invalid(format!(
                "unsupported inline schema_version \"{}\", expected \"v1\"",
                schema.schema_version
            )));
        }
        for (key, mapping) in &schema.mappings {
            if mapping.package.trim().is_empty() {
                return Err(Error::Invalid(format!(
                    "schema mapping \"{key}\" has an empty package"
                )));
            }
            if !matches!(
                mapping.kind,
                DependencyKind::Apt | DependencyKind::Pip | DependencyKind::Source
            ) {
                return Err(Error::Invalid(format!(
                    "schema mapping \"{key}\" has an unsupported type {:?}",
                    mapping.kind
                )));
            }
        }
    }

    if let Some(publish) = &spec.publish {
        if publish.repository.trim().is_empty() {
            return Err(Error::Invalid(
                "publish.repository must not be empty when publish is configured".into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::model::{InputsConfig, Metadata, PackagingGroup, PackagingMode};

    fn minimal_spec() -> ComposedSpec {
        ComposedSpec {
            metadata: Metadata {
                name: "sample-product".into(),
            },
            packaging: vec![PackagingGroup {
                name: "core".into(),
                mode: PackagingMode::Individual,
                members: vec![],
                pin_policy: crate::model::PinPolicy::Any,
            }],
            publish: None,
            resolutions: vec![],
            inputs: InputsConfig::default(),
            inline_schema: None,
            schema_files: vec![],
            defaults: IndexMap::new(),
            ros_tags: vec![],
            provenance: IndexMap::new(),
        }
    }

    #[test]
    fn accepts_a_minimal_valid_spec() {
        assert!(validate_spec(&minimal_spec()).is_ok());
    }

    #[test]
    fn rejects_empty_metadata_name() {
        let mut spec = minimal_spec();
        spec.metadata.name = "".into();
        assert!(validate_spec(&spec).is_err());
    }

    #[test]
    fn rejects_spec_with_no_packaging_groups() {
        let mut spec = minimal_spec();
        spec.packaging.clear();
        assert!(validate_spec(&spec).is_err());
    }

    #[test]
    fn rejects_publish_with_empty_repository() {
        let mut spec = minimal_spec();
        spec.publish = Some(crate::model::PublishConfig::default());
        assert!(validate_spec(&spec).is_err());
    }
}
