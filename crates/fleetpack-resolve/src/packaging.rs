// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_spec::{PackagingGroup, PackagingMode};

/// Matches `name` against a packaging group's `members` patterns: an exact
/// name, or a trailing-`*` prefix match.
fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

/// Assigns `name` to the first packaging group (in declaration order) whose
/// `members` pattern matches it (spec §4.5 step 6: "first match wins").
pub fn assign_group<'a>(name: &str, groups: &'a [PackagingGroup]) -> Option<&'a PackagingGroup> {
    groups
        .iter()
        .find(|group| group.members.iter().any(|pattern| pattern_matches(pattern, name)))
}

/// Whether a group's mode keeps the dependency in the bundle manifest
/// (`skip` omits it there while still keeping it in `apt.lock`, spec §4.5
/// step 6).
pub fn included_in_bundle(group: Option<&PackagingGroup>) -> bool {
    !matches!(group.map(|g| g.mode), Some(PackagingMode::Skip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpack_spec::PinPolicy;

    fn group(name: &str, mode: PackagingMode, members: &[&str]) -> PackagingGroup {
        PackagingGroup {
            name: name.to_string(),
            mode,
            members: members.iter().map(|s| s.to_string()).collect(),
            pin_policy: PinPolicy::Any,
        }
    }

    #[test]
    fn first_matching_group_wins() {
        let groups = vec![
            group("ros", PackagingMode::Bundled, &["ros-*"]),
            group("catch_all", PackagingMode::Individual, &["*"]),
        ];
        let picked = assign_group("ros-cv-bridge", &groups).unwrap();
        assert_eq!(picked.name, "ros");
        let picked = assign_group("libfoo", &groups).unwrap();
        assert_eq!(picked.name, "catch_all");
    }

    #[test]
    fn skip_mode_is_excluded_from_bundle_but_not_a_failure() {
        let skip_group = group("skip", PackagingMode::Skip, &["*"]);
        assert!(!included_in_bundle(Some(&skip_group)));
        assert!(included_in_bundle(None));
    }
}
