// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;

use enum_dispatch::enum_dispatch;
use fleetpack_foundation::SnapshotInfo;
use variantly::Variantly;

use crate::aptly_backend::AptlyBackend;
use crate::error::Result;
use crate::file_backend::FileBackend;
use crate::proget_backend::ProGetBackend;

/// Splits a snapshot id of the form `<prefix>-<hex12>` (the only shape I4
/// produces) back into its prefix. Falls back to the whole id if it
/// doesn't look like one of ours (e.g. in tests constructing ids by hand).
pub(crate) fn split_snapshot_id(id: &str) -> &str {
    match id.rsplit_once('-') {
        Some((prefix, suffix))
            if suffix.len() == 12 && suffix.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            prefix
        }
        _ => id,
    }
}

/// A publication/lifecycle backend for snapshots (spec §4.7). Every backend
/// exposes the same four operations; `publish`/`promote` take the
/// identifiers the generic spec names (`id`, `channel`) plus the
/// `debs_dir` every backend's documented behaviour actually needs to
/// ingest debs from, even though §4.7's one-line contract elides it.
#[async_trait::async_trait]
#[enum_dispatch]
pub trait SnapshotBackend {
    async fn publish(&self, id: &str, debs_dir: &Path) -> Result<()>;
    async fn promote(&self, id: &str, channel: &str) -> Result<()>;
    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>>;
    async fn delete_snapshot(&self, id: &str) -> Result<()>;
}

/// The tagged-variant dispatch named in spec §9 "Polymorphic backends":
/// `RunConfig`'s `repoBackend` selects one of these, constructed once per
/// run; no dynamic loading. `enum_dispatch` forwards `SnapshotBackend` calls
/// to whichever concrete backend struct is active, with `Variantly`
/// accessors over the same small set of variants.
#[enum_dispatch(SnapshotBackend)]
#[derive(Clone, Variantly)]
pub enum BackendHandle {
    File(FileBackend),
    Aptly(AptlyBackend),
    ProGet(ProGetBackend),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_a_well_formed_snapshot_id() {
        assert_eq!(split_snapshot_id("alpha-1a2b3c4d5e6f"), "alpha");
        assert_eq!(split_snapshot_id("ros-core-aaaaaaaaaaaa"), "ros-core");
    }

    #[test]
    fn falls_back_to_the_whole_id_when_not_shaped_like_ours() {
        assert_eq!(split_snapshot_id("dev"), "dev");
    }
}
