// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::collections::BTreeSet;
use std::path::PathBuf;

use fleetpack_foundation::DependencyKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `metadata.name` and any other bookkeeping carried by a product spec.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingMode {
    Individual,
    Bundled,
    Skip,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinPolicy {
    Strict,
    Floor,
    Any,
}

/// `{ name, mode, members (name patterns), pinPolicy }` (spec §3).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PackagingGroup {
    pub name: String,
    pub mode: PackagingMode,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default = "default_pin_policy")]
    pub pin_policy: PinPolicy,
}

fn default_pin_policy() -> PinPolicy {
    PinPolicy::Any
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Pin,
    Prefer,
    Exclude,
    Replace,
}

/// An operator-authored conflict-breaking override (spec §3).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResolutionDirective {
    pub dependency: String,
    pub action: ResolutionAction,
    pub value: String,
    pub reason: String,
    pub owner: String,
}

/// One entry of a [`InlineSchema`]'s `key -> concrete dependency` mapping.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SchemaMappingEntry {
    #[serde(rename = "type")]
    pub kind: DependencyKind,
    pub package: String,
    #[serde(default)]
    pub version_constraint: Option<String>,
}

/// A single schema layer: `schema_version = "v1"` plus a `key -> mapping`
/// table (spec §3, §4.1 "Validation").
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineSchema {
    pub schema_version: String,
    pub mappings: IndexMap<String, SchemaMappingEntry>,
}

/// Workspace roots the dependency builder walks for `package.xml` files.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub workspace_roots: Vec<PathBuf>,
}

/// Publish-stage configuration: which repository/channel/backend a snapshot
/// targets (spec §4.7, §6).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub repository: String,
    pub channel: Option<String>,
    pub backend: Option<String>,
    pub snapshot_prefix: Option<String>,
}

/// A profile reference declared by a product: either an inline name the
/// product defines itself, or a path to a separate profile file (spec
/// §4.1 "Inputs").
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileRef {
    File(PathBuf),
    Inline(String),
}

/// An overlay profile: the same sections as a product, but every section is
/// optional since a profile only overrides what it declares. `sequence_replace`
/// names which sequence-valued keys should fully substitute rather than
/// append, per spec §4.1 item 2.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSpec {
    pub packaging: Vec<PackagingGroup>,
    pub publish: Option<PublishConfig>,
    pub resolutions: Vec<ResolutionDirective>,
    pub inputs: Option<InputsConfig>,
    pub schema: Option<InlineSchema>,
    pub defaults: IndexMap<String, serde_yaml::Value>,
    pub schema_files: Vec<PathBuf>,
    /// Abstract ROS tag keys (spec §4.3) this layer declares directly,
    /// independent of anything discovered by walking `package.xml` files.
    pub ros_tags: Vec<String>,
    pub sequence_replace: BTreeSet<String>,
}

/// The top-level, as-authored product specification (spec §4.1 "Inputs").
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSpec {
    pub metadata: Metadata,
    pub packaging: Vec<PackagingGroup>,
    pub publish: Option<PublishConfig>,
    pub resolutions: Vec<ResolutionDirective>,
    pub inputs: InputsConfig,
    pub schema: Option<InlineSchema>,
    pub defaults: IndexMap<String, serde_yaml::Value>,
    pub schema_files: Vec<PathBuf>,
    pub ros_tags: Vec<String>,
    pub profiles: Vec<ProfileRef>,
    /// Inline profile bodies the product defines by name, looked up when a
    /// [`ProfileRef::Inline`] is resolved.
    pub inline_profiles: IndexMap<String, ProfileSpec>,
    /// Top-level overrides applied after every profile layer (highest
    /// precedence, spec §4.1 item 2).
    pub overrides: Option<ProfileSpec>,
}

/// Per-field provenance recorded on a [`ComposedSpec`] (spec §4.1 item 3).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FieldOrigin {
    Product,
    Profile(String),
    Inline(String),
}

/// The single, fully merged specification the rest of the pipeline consumes
/// (spec §3 "Lifecycle": immutable, created per run, discarded after the
/// run's outputs are written).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ComposedSpec {
    pub metadata: Metadata,
    pub packaging: Vec<PackagingGroup>,
    pub publish: Option<PublishConfig>,
    pub resolutions: Vec<ResolutionDirective>,
    pub inputs: InputsConfig,
    pub inline_schema: Option<InlineSchema>,
    pub schema_files: Vec<PathBuf>,
    pub defaults: IndexMap<String, serde_yaml::Value>,
    /// Abstract ROS tag keys declared directly by the product or any
    /// profile layer, each paired with the layer that declared it (spec
    /// §4.3's "spec" source, as distinct from the `package.xml` walk).
    pub ros_tags: Vec<(String, FieldOrigin)>,
    pub provenance: IndexMap<String, FieldOrigin>,
}
