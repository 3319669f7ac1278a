// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

/// A single comparison within a (possibly comma-joined, AND-combined)
/// version constraint, e.g. `>=1.0.0,<2.0.0`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Comparator {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
}

fn parse_clauses(constraint: &str) -> Vec<(Comparator, String)> {
    const PREFIXES: &[(&str, Comparator)] = &[
        ("==", Comparator::Eq),
        (">=", Comparator::Ge),
        ("<=", Comparator::Le),
        (">", Comparator::Gt),
        ("<", Comparator::Lt),
    ];
    constraint
        .split(',')
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            for (prefix, cmp) in PREFIXES {
                if let Some(rest) = raw.strip_prefix(prefix) {
                    return Some((*cmp, rest.trim().to_string()));
                }
            }
            Some((Comparator::Eq, raw.to_string()))
        })
        .collect()
}

/// Whether `candidate` satisfies every clause of `constraint`, using `parse`
/// to turn each clause's bound string into a comparable version value. A
/// `None` constraint is satisfied by anything.
pub fn satisfies<T, F>(constraint: Option<&str>, candidate: &T, parse: F) -> bool
where
    T: Ord,
    F: Fn(&str) -> T,
{
    let Some(constraint) = constraint else {
        return true;
    };
    parse_clauses(constraint).iter().all(|(cmp, value)| {
        let bound = parse(value);
        match cmp {
            Comparator::Eq => *candidate == bound,
            Comparator::Ge => *candidate >= bound,
            Comparator::Gt => *candidate > bound,
            Comparator::Le => *candidate <= bound,
            Comparator::Lt => *candidate < bound,
        }
    })
}

/// Joins two optional constraints into one AND-combined constraint string,
/// used when more than one dependency in a resolution group names the same
/// `(kind, name)` (spec §4.5 step 2's "if `pinPolicy = strict`... all must
/// intersect").
pub fn combine(constraints: &[Option<&str>]) -> Option<String> {
    let joined: Vec<&str> = constraints.iter().filter_map(|c| *c).collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpack_foundation::DebianVersion;

    #[test]
    fn single_ge_clause_matches() {
        let ok = satisfies(Some(">=1.0.0"), &DebianVersion::new("1.5.0"), DebianVersion::new);
        assert!(ok);
        let no = satisfies(Some(">=2.0.0"), &DebianVersion::new("1.5.0"), DebianVersion::new);
        assert!(!no);
    }

    #[test]
    fn combined_range_intersects() {
        let ok = satisfies(
            Some(">=1.0.0,<2.0.0"),
            &DebianVersion::new("1.9.9"),
            DebianVersion::new,
        );
        assert!(ok);
        let no = satisfies(
            Some(">=1.0.0,<2.0.0"),
            &DebianVersion::new("2.0.0"),
            DebianVersion::new,
        );
        assert!(!no);
    }

    #[test]
    fn bare_version_means_exact_equality() {
        let ok = satisfies(Some("1.2.3"), &DebianVersion::new("1.2.3"), DebianVersion::new);
        assert!(ok);
    }

    #[test]
    fn no_constraint_matches_anything() {
        assert!(satisfies(None, &DebianVersion::new("9.9.9"), DebianVersion::new));
    }

    #[test]
    fn combine_joins_present_constraints_only() {
        assert_eq!(combine(&[Some(">=1.0.0"), None, Some("<2.0.0")]).as_deref(), Some(">=1.0.0,<2.0.0"));
        assert_eq!(combine(&[None, None]), None);
    }
}
