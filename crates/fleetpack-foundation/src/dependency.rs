// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use serde::{Deserialize, Serialize};

/// Which ecosystem a [`Dependency`] belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Apt,
    Pip,
    Source,
    Internal,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DependencyKind::Apt => "apt",
            DependencyKind::Pip => "pip",
            DependencyKind::Source => "source",
            DependencyKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Where a [`Dependency`] was contributed from, used to break ties when the
/// same `(kind, name)` is declared in more than one layer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Schema(String),
    Profile(String),
    Product,
    Inline,
    Workspace(String),
}

impl Origin {
    /// Provenance rank used by the dependency builder's last-writer-wins
    /// policy: schema < profile < product (spec §4.3).
    pub fn rank(&self) -> u8 {
        match self {
            Origin::Schema(_) => 0,
            Origin::Workspace(_) => 1,
            Origin::Profile(_) => 2,
            Origin::Product | Origin::Inline => 3,
        }
    }
}

/// A repo+ref pair identifying a source-kind dependency's checkout location.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub repo: String,
    pub git_ref: String,
}

/// A single resolved or yet-to-be-resolved dependency, keyed uniquely by
/// `(kind, name)` (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub name: String,
    pub version_constraint: Option<String>,
    pub source: Option<SourceRef>,
    pub group: Option<String>,
    pub origin: Origin,
}

impl Dependency {
    pub fn new(kind: DependencyKind, name: impl Into<String>, origin: Origin) -> Self {
        Self {
            kind,
            name: name.into(),
            version_constraint: None,
            source: None,
            group: None,
            origin,
        }
    }

    /// The `(kind, name)` identity used for deduplication and lookups.
    pub fn key(&self) -> (DependencyKind, &str) {
        (self.kind, self.name.as_str())
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.version_constraint = Some(constraint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_rank_orders_schema_below_product() {
        assert!(Origin::Schema("a".into()).rank() < Origin::Product.rank());
        assert!(Origin::Profile("p".into()).rank() < Origin::Product.rank());
    }

    #[test]
    fn dependency_key_is_kind_and_name() {
        let dep = Dependency::new(DependencyKind::Apt, "libfoo", Origin::Product);
        assert_eq!(dep.key(), (DependencyKind::Apt, "libfoo"));
    }
}
