// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{ repository, channel?, snapshotPrefix, snapshotID, createdAt, signingKey? }`
/// (spec §3): the record written as `snapshot.intent` and handed to a
/// snapshot backend's `Publish` call. `snapshotID` is computed by the
/// snapshot-lifecycle crate per the I4 formula before this value is built.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SnapshotIntent {
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub snapshot_prefix: String,
    pub snapshot_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

/// `{ snapshotID, prefix, channel?, repository?, createdAt }` (spec §3): a
/// published snapshot as reported by `ListSnapshots`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub snapshot_id: String,
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `{ keepLast, keepDays, protectChannels, protectPrefixes, dryRun }` (spec
/// §3), the input to the prune planner's `BuildPrunePlan`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRetentionPolicy {
    pub keep_last: i64,
    pub keep_days: i64,
    pub protect_channels: Vec<String>,
    pub protect_prefixes: Vec<String>,
    pub dry_run: bool,
}

impl SnapshotRetentionPolicy {
    /// Normalises the policy per spec §4.8 step 1: negative `keepLast`/
    /// `keepDays` clamp to zero, protection sets are lowercased and trimmed.
    pub fn normalized(&self) -> Self {
        Self {
            keep_last: self.keep_last.max(0),
            keep_days: self.keep_days.max(0),
            protect_channels: self
                .protect_channels
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            protect_prefixes: self
                .protect_prefixes
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_negatives_and_folds_case() {
        let policy = SnapshotRetentionPolicy {
            keep_last: -3,
            keep_days: -1,
            protect_channels: vec![" Dev ".to_string()],
            protect_prefixes: vec!["CORE".to_string()],
            dry_run: false,
        };
        let normalized = policy.normalized();
        assert_eq!(normalized.keep_last, 0);
        assert_eq!(normalized.keep_days, 0);
        assert_eq!(normalized.protect_channels, vec!["dev".to_string()]);
        assert_eq!(normalized.protect_prefixes, vec!["core".to_string()]);
    }
}
