// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::io::Read;

use fleetpack_foundation::DebianVersion;
use serde::{Deserialize, Serialize};

use crate::http_client::HttpClient;
use crate::model::AptIndexEntry;
use crate::{Error, Result};

/// One configured APT suite to crawl: a base repository URL, a distribution
/// (e.g. `jammy`), and the components to fetch `Packages` for (spec §4.4
/// "Sources").
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AptSource {
    pub base_url: String,
    pub distribution: String,
    pub components: Vec<String>,
    pub arch: String,
}

impl AptSource {
    fn packages_url(&self, component: &str, suffix: &str) -> String {
        format!(
            "{}/dists/{}/{}/binary-{}/Packages{}",
            self.base_url.trim_end_matches('/'),
            self.distribution,
            component,
            self.arch,
            suffix
        )
    }

    /// Fetches and parses every component's `Packages` file, preferring the
    /// `.xz` form, falling back to `.gz`, then the uncompressed file — the
    /// same fallback chain `apt` itself uses when indexing a suite.
    pub async fn fetch(&self, client: &HttpClient) -> Result<Vec<(String, AptIndexEntry)>> {
        let mut entries = Vec::new();
        for component in &self.components {
            let bytes = self.fetch_component(client, component).await?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            entries.extend(parse_packages_text(&text, component)?);
        }
        Ok(entries)
    }

    async fn fetch_component(&self, client: &HttpClient, component: &str) -> Result<Vec<u8>> {
        for suffix in [".xz", ".gz", ""] {
            let url = self.packages_url(component, suffix);
            match client.get_bytes(&url).await {
                Ok(bytes) => return decompress(&url, suffix, bytes),
                Err(Error::Status { status: 404, .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::Status {
            url: self.packages_url(component, ""),
            status: 404,
        })
    }
}

fn decompress(url: &str, suffix: &str, bytes: Vec<u8>) -> Result<Vec<u8>> {
    match suffix {
        ".xz" => {
            let mut out = Vec::new();
            xz2::read::XzDecoder::new(bytes.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| Error::Decompress {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(out)
        }
        ".gz" => {
            let mut out = Vec::new();
            flate2::read::GzDecoder::new(bytes.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| Error::Decompress {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(out)
        }
        _ => Ok(bytes),
    }
}

/// Parses an RFC822-style `Packages` file: stanzas separated by a blank
/// line, `Field: value` pairs, continuation lines indented with a space.
fn parse_packages_text(text: &str, component: &str) -> Result<Vec<(String, AptIndexEntry)>> {
    let mut entries = Vec::new();
    for stanza in text.split("\n\n") {
        if stanza.trim().is_empty() {
            continue;
        }
        let fields = parse_stanza_fields(stanza);
        let name = fields.get("Package").cloned();
        let version = fields.get("Version").cloned();
        let (Some(name), Some(version)) = (name, version) else {
            continue;
        };
        let filename = fields.get("Filename").cloned().unwrap_or_default();
        let sha256 = fields.get("SHA256").cloned().unwrap_or_default();
        let arch = fields.get("Architecture").cloned().unwrap_or_default();
        let depends = fields
            .get("Depends")
            .map(|d| split_relation_field(d))
            .unwrap_or_default();
        entries.push((
            name,
            AptIndexEntry {
                version: DebianVersion::new(version),
                arch,
                component: component.to_string(),
                uri: filename,
                sha256,
                depends,
            },
        ));
    }
    Ok(entries)
}

fn parse_stanza_fields(stanza: &str) -> std::collections::HashMap<String, String> {
    let mut fields = std::collections::HashMap::new();
    let mut current_key: Option<String> = None;
    for line in stanza.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some(key) = &current_key {
                if let Some(value) = fields.get_mut(key) {
                    let value: &mut String = value;
                    value.push(' ');
                    value.push_str(rest.trim());
                }
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_string();
            fields.insert(key.clone(), value.trim().to_string());
            current_key = Some(key);
        }
    }
    fields
}

/// Splits a `Depends`-style relation field (`foo (>= 1.0), bar | baz`) into
/// package names, dropping version constraints and alternatives beyond the
/// first choice — the resolver treats `|` alternatives as a single hint.
fn split_relation_field(field: &str) -> Vec<String> {
    field
        .split(',')
        .filter_map(|entry| entry.split('|').next())
        .map(|entry| entry.trim())
        .filter_map(|entry| entry.split_whitespace().next())
        .map(|name| name.to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_stanza() {
        let text = "Package: libfoo\nVersion: 1.0.0-1\nArchitecture: amd64\nFilename: pool/libfoo_1.0.0-1_amd64.deb\nSHA256: abc123\nDepends: libbar (>= 2.0), libbaz\n";
        let entries = parse_packages_text(text, "main").unwrap();
        assert_eq!(entries.len(), 1);
        let (name, entry) = &entries[0];
        assert_eq!(name, "libfoo");
        assert_eq!(entry.version, DebianVersion::new("1.0.0-1"));
        assert_eq!(entry.depends, vec!["libbar", "libbaz"]);
    }

    #[test]
    fn parses_multiple_stanzas_separated_by_blank_lines() {
        let text = "Package: a\nVersion: 1.0\nArchitecture: amd64\n\nPackage: b\nVersion: 2.0\nArchitecture: amd64\n";
        let entries = parse_packages_text(text, "main").unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn alternatives_take_the_first_choice() {
        let split = split_relation_field("libssl1.1 | libssl3, zlib1g");
        assert_eq!(split, vec!["libssl1.1", "zlib1g"]);
    }
}
