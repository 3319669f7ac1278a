// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A Debian package version, compared per Debian policy §5.6.12: split into
/// `epoch:upstream-revision`, compare epoch numerically, then compare the
/// upstream and revision strings by alternating runs of digits (compared
/// numerically) and non-digits (compared by ASCII value, with `~` sorting
/// before everything, including the empty string).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebianVersion(pub String);

impl DebianVersion {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn epoch_and_rest(&self) -> (u64, &str) {
        match self.0.split_once(':') {
            Some((epoch, rest)) => (epoch.parse().unwrap_or(0), rest),
            None => (0, self.0.as_str()),
        }
    }
}

impl std::fmt::Display for DebianVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compares two Debian version fragments per the digit/non-digit run rule,
/// with `~` sorting before the end of string.
fn compare_fragment(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        // Compare a run of non-digit characters.
        let (ra, rb) = (take_non_digits(&mut a), take_non_digits(&mut b));
        match compare_non_digit_runs(&ra, &rb) {
            Ordering::Equal => {}
            other => return other,
        }
        if a.peek().is_none() && b.peek().is_none() {
            return Ordering::Equal;
        }
        // Compare a run of digit characters numerically.
        let (na, nb) = (take_digits(&mut a), take_digits(&mut b));
        let na: u64 = na.parse().unwrap_or(0);
        let nb: u64 = nb.parse().unwrap_or(0);
        match na.cmp(&nb) {
            Ordering::Equal => {}
            other => return other,
        }
        if a.peek().is_none() && b.peek().is_none() {
            return Ordering::Equal;
        }
    }
}

fn take_non_digits(it: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut out = String::new();
    while let Some(&c) = it.peek() {
        if c.is_ascii_digit() {
            break;
        }
        out.push(c);
        it.next();
    }
    out
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut out = String::new();
    while let Some(&c) = it.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        out.push(c);
        it.next();
    }
    out
}

/// `~` sorts before everything, including the empty string; otherwise plain
/// character-by-character comparison, with a shorter run that has exhausted
/// sorting after a longer one unless the longer one's extra char is `~`.
fn compare_non_digit_runs(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars();
    let mut bi = b.chars();
    loop {
        let ca = ai.next();
        let cb = bi.next();
        return match (ca, cb) {
            (None, None) => Ordering::Equal,
            (None, Some('~')) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (Some('~'), None) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some('~'), Some('~')) => continue,
            (Some('~'), Some(_)) => Ordering::Less,
            (Some(_), Some('~')) => Ordering::Greater,
            (Some(x), Some(y)) if x == y => continue,
            (Some(x), Some(y)) => x.cmp(&y),
        };
    }
}

impl Ord for DebianVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ea, ra) = self.epoch_and_rest();
        let (eb, rb) = other.epoch_and_rest();
        match ea.cmp(&eb) {
            Ordering::Equal => {}
            other => return other,
        }
        let (ua, da) = match ra.rsplit_once('-') {
            Some((u, d)) => (u, d),
            None => (ra, ""),
        };
        let (ub, db) = match rb.rsplit_once('-') {
            Some((u, d)) => (u, d),
            None => (rb, ""),
        };
        match compare_fragment(ua, ub) {
            Ordering::Equal => compare_fragment(da, db),
            other => other,
        }
    }
}

impl PartialOrd for DebianVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A PEP 440 Python package version. Parsed into its release-segment tuple
/// plus an optional pre/post/dev marker, following PEP 440's normalized
/// ordering (release segments compared component-wise, with a missing
/// trailing segment treated as `0`; pre-releases sort before the final
/// release, post-releases and dev-releases are ordered accordingly).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PepVersion(pub String);

#[derive(Debug, Eq, PartialEq, PartialOrd, Ord)]
enum PreMarker {
    Dev(u64),
    A(u64),
    B(u64),
    Rc(u64),
    Final,
    Post(u64),
}

impl PepVersion {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn parse(&self) -> (Vec<u64>, PreMarker) {
        let s = self.0.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let (release_part, rest) = split_release(s);
        let release = release_part
            .split('.')
            .filter_map(|seg| seg.parse::<u64>().ok())
            .collect();
        let marker = parse_marker(rest);
        (release, marker)
    }
}

fn split_release(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    (&s[..end], &s[end..])
}

fn parse_marker(rest: &str) -> PreMarker {
    let rest = rest.trim_start_matches(['.', '-', '_']);
    let lower = rest.to_ascii_lowercase();
    if lower.is_empty() {
        return PreMarker::Final;
    }
    if let Some(n) = lower.strip_prefix("dev") {
        return PreMarker::Dev(n.parse().unwrap_or(0));
    }
    if let Some(n) = lower.strip_prefix("post") {
        return PreMarker::Post(n.parse().unwrap_or(0));
    }
    if let Some(n) = lower.strip_prefix("rc") {
        return PreMarker::Rc(n.parse().unwrap_or(0));
    }
    if let Some(n) = lower.strip_prefix('a') {
        return PreMarker::A(n.parse().unwrap_or(0));
    }
    if let Some(n) = lower.strip_prefix('b') {
        return PreMarker::B(n.parse().unwrap_or(0));
    }
    PreMarker::Final
}

impl std::fmt::Display for PepVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for PepVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ra, ma) = self.parse();
        let (rb, mb) = other.parse();
        let len = ra.len().max(rb.len());
        for i in 0..len {
            let a = ra.get(i).copied().unwrap_or(0);
            let b = rb.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        ma.cmp(&mb)
    }
}

impl PartialOrd for PepVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0.0", "1.0.1", Ordering::Less)]
    #[case("1.0.0-1", "1.0.0-2", Ordering::Less)]
    #[case("1:1.0.0", "2.0.0", Ordering::Greater)]
    #[case("1.0.0~beta", "1.0.0", Ordering::Less)]
    #[case("1.0.0", "1.0.0", Ordering::Equal)]
    fn debian_version_orders(#[case] a: &str, #[case] b: &str, #[case] expect: Ordering) {
        assert_eq!(DebianVersion::new(a).cmp(&DebianVersion::new(b)), expect);
    }

    #[rstest]
    #[case("1.0.0", "1.0.1", Ordering::Less)]
    #[case("1.0.0a1", "1.0.0", Ordering::Less)]
    #[case("1.0.0.dev1", "1.0.0a1", Ordering::Less)]
    #[case("1.0.0.post1", "1.0.0", Ordering::Greater)]
    #[case("1.0", "1.0.0", Ordering::Equal)]
    fn pep_version_orders(#[case] a: &str, #[case] b: &str, #[case] expect: Ordering) {
        assert_eq!(PepVersion::new(a).cmp(&PepVersion::new(b)), expect);
    }
}
