// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{DebianVersion, PepVersion};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One version of one APT package, as listed in a `Packages` file (spec
/// §3 `RepoIndex`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AptIndexEntry {
    pub version: DebianVersion,
    pub arch: String,
    pub component: String,
    pub uri: String,
    pub sha256: String,
    #[serde(default)]
    pub depends: Vec<String>,
}

/// One version of one PyPI distribution, as listed on a simple-index
/// package page (spec §3 `RepoIndex`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PipIndexEntry {
    pub version: PepVersion,
    pub uri: String,
    pub sha256: String,
    #[serde(default)]
    pub requires_python: Option<String>,
    #[serde(default)]
    pub yanked: bool,
}

/// `{ Apt[name -> [...]], Pip[name -> [...]] }` (spec §3). Canonical form:
/// package names sorted lexicographically, each package's versions sorted
/// descending by the ecosystem's version ordering (spec §4.4 "Output"),
/// which [`RepoIndex::canonicalize`] enforces before (de)serialization so
/// that `Parse(Serialise(x)) = x` and the reverse hold (spec P3).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RepoIndex {
    #[serde(default)]
    pub apt: IndexMap<String, Vec<AptIndexEntry>>,
    #[serde(default)]
    pub pip: IndexMap<String, Vec<PipIndexEntry>>,
}

impl RepoIndex {
    pub fn canonicalize(&mut self) {
        self.apt.sort_unstable_keys();
        for versions in self.apt.values_mut() {
            versions.sort_unstable_by(|a, b| b.version.cmp(&a.version));
        }
        self.pip.sort_unstable_keys();
        for versions in self.pip.values_mut() {
            versions.sort_unstable_by(|a, b| b.version.cmp(&a.version));
        }
    }

    /// Canonical YAML per spec §4.4/§6 "Repo-index file".
    pub fn to_canonical_yaml(&self) -> crate::Result<String> {
        let mut index = self.clone();
        index.canonicalize();
        Ok(serde_yaml::to_string(&index)?)
    }

    pub fn from_yaml(text: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

impl From<serde_yaml::Error> for crate::Error {
    fn from(source: serde_yaml::Error) -> Self {
        crate::Error::Parse {
            url: "repo-index.yaml".to_string(),
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_sorts_names_and_versions_descending() {
        let mut index = RepoIndex::default();
        index.apt.insert(
            "zlib".to_string(),
            vec![AptIndexEntry {
                version: DebianVersion::new("1.2.11-2"),
                arch: "amd64".into(),
                component: "main".into(),
                uri: "http://example/zlib_1.2.11-2_amd64.deb".into(),
                sha256: "aaa".into(),
                depends: vec![],
            }],
        );
        index.apt.insert(
            "apache2".to_string(),
            vec![
                AptIndexEntry {
                    version: DebianVersion::new("2.4.41-1"),
                    arch: "amd64".into(),
                    component: "main".into(),
                    uri: "http://example/apache2_2.4.41-1_amd64.deb".into(),
                    sha256: "bbb".into(),
                    depends: vec![],
                },
                AptIndexEntry {
                    version: DebianVersion::new("2.4.50-1"),
                    arch: "amd64".into(),
                    component: "main".into(),
                    uri: "http://example/apache2_2.4.50-1_amd64.deb".into(),
                    sha256: "ccc".into(),
                    depends: vec![],
                },
            ],
        );
        index.canonicalize();
        let names: Vec<_> = index.apt.keys().collect();
        assert_eq!(names, vec!["apache2", "zlib"]);
        assert_eq!(index.apt["apache2"][0].version, DebianVersion::new("2.4.50-1"));
    }

    #[test]
    fn yaml_roundtrips_byte_identically_once_canonical() {
        let mut index = RepoIndex::default();
        index.apt.insert(
            "libfoo".to_string(),
            vec![AptIndexEntry {
                version: DebianVersion::new("1.0.0"),
                arch: "amd64".into(),
                component: "main".into(),
                uri: "http://example/libfoo_1.0.0_amd64.deb".into(),
                sha256: "deadbeef".into(),
                depends: vec![],
            }],
        );
        index.canonicalize();
        let yaml = index.to_canonical_yaml().unwrap();
        let parsed = RepoIndex::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, index);
        let reserialized = parsed.to_canonical_yaml().unwrap();
        assert_eq!(reserialized, yaml);
    }
}
