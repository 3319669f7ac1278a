// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;

use fleetpack_index::{AptSource, PypiSource};
use serde::Deserialize;

use crate::error::{Error, Result};

/// The repo-index crawl sources have no equivalent in the product spec or
/// `RunConfig` (spec §4.4's sources are operational inputs, not
/// product-declared data), so the CLI reads them from their own small YAML
/// file instead of threading them through flags one source at a time.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SourcesFile {
    pub apt: Vec<AptSource>,
    pub pypi: Vec<PypiSource>,
}

/// Loads `path` if it exists; a missing file is just "no sources configured"
/// rather than an error, since not every subcommand (e.g. `validate`) needs
/// a repo index at all.
pub fn load_sources(path: &Path) -> Result<SourcesFile> {
    if !path.exists() {
        return Ok(SourcesFile::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| Error::Yaml {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_missing_sources_file_is_empty_rather_than_an_error() {
        let sources = load_sources(Path::new("/nonexistent/fleetpack-sources.yaml")).unwrap();
        assert!(sources.apt.is_empty());
        assert!(sources.pypi.is_empty());
    }

    #[test]
    fn loads_apt_and_pypi_sources_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.yaml");
        std::fs::write(
            &path,
            "apt:\n  - base_url: https://archive.example/ubuntu\n    distribution: jammy\n    components: [main]\n    arch: amd64\npypi:\n  - base_url: https://pypi.example/simple\n    packages: [numpy]\n",
        )
        .unwrap();
        let sources = load_sources(&path).unwrap();
        assert_eq!(sources.apt.len(), 1);
        assert_eq!(sources.pypi[0].packages, vec!["numpy".to_string()]);
    }
}
