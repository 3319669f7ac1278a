// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! Shared types used by every other crate in the workspace: the dependency
//! model of spec §3, version newtypes for the two package ecosystems we
//! track, the error-kind taxonomy of spec §7, and the resolution-record
//! type emitted by both the dependency builder and the resolver.

mod dependency;
mod error;
mod resolution_record;
mod snapshot;
mod version;

pub use dependency::{Dependency, DependencyKind, Origin, SourceRef};
pub use error::{ErrorKind, HasErrorKind};
pub use resolution_record::{ResolutionAction, ResolutionRecord};
pub use snapshot::{SnapshotInfo, SnapshotIntent, SnapshotRetentionPolicy};
pub use version::{DebianVersion, PepVersion};
