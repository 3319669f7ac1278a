// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use data_encoding::HEXLOWER;
use fleetpack_resolve::AptLockEntry;
use sha2::{Digest, Sha256};

/// Computes the spec §3 I4 snapshot-ID hash input and returns the full
/// `<prefix>-<hex12>` identifier. `targetUbuntu` must already be normalized
/// (`fleetpack_resolve::normalize_target_ubuntu`) before it reaches here,
/// since I4's hash is defined over the post-normalization value.
///
/// `channel` participates in the hash even when absent (as an empty
/// string), so two snapshots that differ only by having vs. lacking a
/// channel still hash differently.
pub fn compute_snapshot_id(
    repository: &str,
    channel: Option<&str>,
    snapshot_prefix: &str,
    target_ubuntu: &str,
    locks: &[AptLockEntry],
) -> String {
    let mut sorted: Vec<&AptLockEntry> = locks.iter().collect();
    sorted.sort_by(|a, b| a.package.cmp(&b.package));

    let mut input = String::new();
    input.push_str(repository);
    input.push('\n');
    input.push_str(channel.unwrap_or(""));
    input.push('\n');
    input.push_str(snapshot_prefix);
    input.push('\n');
    input.push_str(target_ubuntu);
    input.push('\n');
    for entry in sorted {
        input.push_str(&entry.package);
        input.push('=');
        input.push_str(&entry.version);
        input.push('\n');
    }

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = HEXLOWER.encode(&hasher.finalize());
    format!("{}-{}", snapshot_prefix, &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock(package: &str, version: &str) -> AptLockEntry {
        AptLockEntry {
            package: package.to_string(),
            version: version.to_string(),
            arch: "amd64".to_string(),
            source: "main".to_string(),
            sha256: "sha".to_string(),
        }
    }

    #[test]
    fn identical_inputs_produce_identical_ids() {
        let locks = vec![lock("zlib", "1.0.0"), lock("apache2", "2.4.0")];
        let a = compute_snapshot_id("fleet", Some("stable"), "alpha", "jammy", &locks);
        let b = compute_snapshot_id("fleet", Some("stable"), "alpha", "jammy", &locks);
        assert_eq!(a, b);
        assert!(a.starts_with("alpha-"));
        assert_eq!(a.len(), "alpha-".len() + 12);
    }

    #[test]
    fn lock_order_does_not_affect_the_id() {
        let forward = vec![lock("apache2", "2.4.0"), lock("zlib", "1.0.0")];
        let reverse = vec![lock("zlib", "1.0.0"), lock("apache2", "2.4.0")];
        let a = compute_snapshot_id("fleet", None, "alpha", "jammy", &forward);
        let b = compute_snapshot_id("fleet", None, "alpha", "jammy", &reverse);
        assert_eq!(a, b);
    }

    #[test]
    fn flipping_one_byte_of_one_lock_entry_changes_the_id() {
        let locks = vec![lock("zlib", "1.0.0")];
        let mutated = vec![lock("zlib", "1.0.1")];
        let a = compute_snapshot_id("fleet", None, "alpha", "jammy", &locks);
        let b = compute_snapshot_id("fleet", None, "alpha", "jammy", &mutated);
        assert_ne!(a, b);
    }

    #[test]
    fn channel_presence_changes_the_id() {
        let locks = vec![lock("zlib", "1.0.0")];
        let with_channel = compute_snapshot_id("fleet", Some("stable"), "alpha", "jammy", &locks);
        let without_channel = compute_snapshot_id("fleet", None, "alpha", "jammy", &locks);
        assert_ne!(with_channel, without_channel);
    }
}
