// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! The snapshot lifecycle controller (C8, spec §4.7): a backend-polymorphic
//! publish/promote/list/delete surface over the filesystem, Aptly, and
//! ProGet, plus the content-addressed snapshot-id hash of §3 I4.

mod aptly_backend;
mod backend;
mod error;
mod file_backend;
mod id;
mod proget_backend;
mod retry;

pub use aptly_backend::{AptlyBackend, AptlySettings};
pub use backend::{BackendHandle, SnapshotBackend};
pub use error::{Error, Result};
pub use file_backend::FileBackend;
pub use id::compute_snapshot_id;
pub use proget_backend::{ProGetBackend, ProGetSettings};
pub use retry::RetryBudget;
