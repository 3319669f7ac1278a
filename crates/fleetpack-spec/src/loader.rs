// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{InlineSchema, ProductSpec, ProfileSpec};

/// Loads product specs, profile files, and schema files from wherever they
/// live. The composer (spec §4.1) treats this as an external collaborator;
/// [`FsSpecLoader`] is the filesystem-backed default every stage uses in
/// practice, reading YAML via `serde_yaml`.
pub trait SpecLoader {
    fn load_product(&self, path: &Path) -> Result<ProductSpec>;
    fn load_profile(&self, path: &Path) -> Result<ProfileSpec>;
    fn load_schema(&self, path: &Path) -> Result<InlineSchema>;
}

/// Reads YAML spec files from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSpecLoader;

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| Error::Yaml {
        path: path.display().to_string(),
        source,
    })
}

impl SpecLoader for FsSpecLoader {
    fn load_product(&self, path: &Path) -> Result<ProductSpec> {
        read_yaml(path)
    }

    fn load_profile(&self, path: &Path) -> Result<ProfileSpec> {
        read_yaml(path)
    }

    fn load_schema(&self, path: &Path) -> Result<InlineSchema> {
        read_yaml(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_product_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("product.yaml");
        std::fs::write(
            &path,
            "metadata:\n  name: sample-product\npackaging:\n  - name: core\n    mode: individual\n",
        )
        .unwrap();
        let spec = FsSpecLoader.load_product(&path).unwrap();
        assert_eq!(spec.metadata.name, "sample-product");
        assert_eq!(spec.packaging.len(), 1);
    }
}
