// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! The prune planner (C9, spec §4.8): a pure function over snapshot
//! metadata and a retention policy, with no I/O of its own — the pipeline
//! crate walks `delete` and calls each backend's `delete_snapshot`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use fleetpack_foundation::{SnapshotInfo, SnapshotRetentionPolicy};

/// The result of [`build_prune_plan`]: which snapshot ids to keep, and
/// which to delete, both in input order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PrunePlan {
    pub keep: Vec<String>,
    pub delete: Vec<String>,
}

/// `BuildPrunePlan(snapshots, policy, now) -> {keep, delete}` (spec §4.8).
/// Pure: takes no clock or filesystem dependency beyond the `now` passed in.
pub fn build_prune_plan(
    snapshots: &[SnapshotInfo],
    policy: &SnapshotRetentionPolicy,
    now: DateTime<Utc>,
) -> PrunePlan {
    let policy = policy.normalized();

    let mut groups: HashMap<String, Vec<&SnapshotInfo>> = HashMap::new();
    for snapshot in snapshots {
        groups.entry(group_key(snapshot)).or_default().push(snapshot);
    }

    let mut kept_by_recency: HashSet<&str> = HashSet::new();
    for members in groups.values() {
        let mut sorted = members.clone();
        sorted.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.snapshot_id.cmp(&b.snapshot_id))
        });
        for snapshot in sorted.into_iter().take(policy.keep_last as usize) {
            kept_by_recency.insert(snapshot.snapshot_id.as_str());
        }
    }

    let mut plan = PrunePlan::default();
    for snapshot in snapshots {
        if is_kept(snapshot, &policy, now, &kept_by_recency) {
            plan.keep.push(snapshot.snapshot_id.clone());
        } else {
            plan.delete.push(snapshot.snapshot_id.clone());
        }
    }
    plan
}

/// Groups by `prefix` (always present), else `channel`, else `repository`,
/// else `"default"` (spec §4.8 step 2) — `prefix` only loses to the others
/// when empty, which `SnapshotInfo` never produces in practice but is
/// handled for robustness against hand-built fixtures.
fn group_key(snapshot: &SnapshotInfo) -> String {
    if !snapshot.prefix.is_empty() {
        snapshot.prefix.clone()
    } else if let Some(channel) = &snapshot.channel {
        channel.clone()
    } else if let Some(repository) = &snapshot.repository {
        repository.clone()
    } else {
        "default".to_string()
    }
}

/// Spec §4.8 step 3: kept if ANY of the four conditions hold.
fn is_kept(
    snapshot: &SnapshotInfo,
    policy: &SnapshotRetentionPolicy,
    now: DateTime<Utc>,
    kept_by_recency: &HashSet<&str>,
) -> bool {
    let channel_protected = snapshot
        .channel
        .as_deref()
        .map(|c| policy.protect_channels.contains(&c.to_lowercase()))
        .unwrap_or(false);
    let prefix_protected = policy.protect_prefixes.contains(&snapshot.prefix.to_lowercase());
    let days_protected = policy.keep_days > 0
        && snapshot.created_at >= now - chrono::Duration::days(policy.keep_days);
    let recency_protected = kept_by_recency.contains(snapshot.snapshot_id.as_str());

    channel_protected || prefix_protected || days_protected || recency_protected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn snapshot(id: &str, prefix: &str, channel: Option<&str>, age: Duration, now: DateTime<Utc>) -> SnapshotInfo {
        SnapshotInfo {
            snapshot_id: id.to_string(),
            prefix: prefix.to_string(),
            channel: channel.map(str::to_string),
            repository: None,
            created_at: now - age,
        }
    }

    fn policy(keep_last: i64, keep_days: i64, protect_channels: &[&str], protect_prefixes: &[&str]) -> SnapshotRetentionPolicy {
        SnapshotRetentionPolicy {
            keep_last,
            keep_days,
            protect_channels: protect_channels.iter().map(|s| s.to_string()).collect(),
            protect_prefixes: protect_prefixes.iter().map(|s| s.to_string()).collect(),
            dry_run: false,
        }
    }

    #[rstest]
    fn keep_last_keeps_the_newest_per_group() {
        let now = Utc::now();
        let snapshots = vec![
            snapshot("alpha-aaa", "alpha", None, Duration::hours(2), now),
            snapshot("alpha-bbb", "alpha", None, Duration::hours(1), now),
            snapshot("beta-ccc", "beta", None, Duration::hours(3), now),
            snapshot("beta-ddd", "beta", None, Duration::minutes(30), now),
        ];
        let plan = build_prune_plan(&snapshots, &policy(1, 0, &[], &[]), now);
        let mut keep = plan.keep.clone();
        keep.sort();
        let mut delete = plan.delete.clone();
        delete.sort();
        assert_eq!(keep, vec!["alpha-bbb".to_string(), "beta-ddd".to_string()]);
        assert_eq!(delete, vec!["alpha-aaa".to_string(), "beta-ccc".to_string()]);
    }

    #[rstest]
    fn keep_days_protects_recent_snapshots_only() {
        let now = Utc::now();
        let snapshots = vec![
            snapshot("pfx-recent", "pfx", None, Duration::days(1), now),
            snapshot("pfx-old", "pfx", None, Duration::days(10), now),
        ];
        let plan = build_prune_plan(&snapshots, &policy(0, 3, &[], &[]), now);
        assert_eq!(plan.keep, vec!["pfx-recent".to_string()]);
        assert_eq!(plan.delete, vec!["pfx-old".to_string()]);
    }

    #[rstest]
    fn protected_channels_and_prefixes_survive_zero_retention() {
        let now = Utc::now();
        let snapshots = vec![
            snapshot("dev-111", "dev", Some("dev"), Duration::hours(1), now),
            snapshot("core-222", "core", None, Duration::hours(1), now),
            snapshot("misc-333", "misc", None, Duration::hours(1), now),
        ];
        let plan = build_prune_plan(&snapshots, &policy(0, 0, &["dev"], &["core"]), now);
        let mut keep = plan.keep.clone();
        keep.sort();
        assert_eq!(keep, vec!["core-222".to_string(), "dev-111".to_string()]);
        assert_eq!(plan.delete, vec!["misc-333".to_string()]);
    }

    #[rstest]
    fn dry_run_does_not_change_the_plan_itself() {
        let now = Utc::now();
        let snapshots = vec![snapshot("alpha-aaa", "alpha", None, Duration::hours(2), now)];
        let mut dry_run_policy = policy(0, 0, &[], &[]);
        dry_run_policy.dry_run = true;
        let plan = build_prune_plan(&snapshots, &dry_run_policy, now);
        assert_eq!(plan.delete, vec!["alpha-aaa".to_string()]);
    }
}
