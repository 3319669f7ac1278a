// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::PepVersion;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::http_client::HttpClient;
use crate::model::PipIndexEntry;
use crate::Result;

/// One configured PyPI-compatible simple index to crawl for a set of
/// package names (spec §4.4 "Sources").
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PypiSource {
    pub base_url: String,
    pub packages: Vec<String>,
}

impl PypiSource {
    fn package_page_url(&self, package: &str) -> String {
        format!("{}/{}/", self.base_url.trim_end_matches('/'), package)
    }

    /// Fetches every configured package's simple-index page and parses its
    /// file links into [`PipIndexEntry`] values.
    pub async fn fetch(&self, client: &HttpClient) -> Result<Vec<(String, PipIndexEntry)>> {
        let mut entries = Vec::new();
        for package in &self.packages {
            let url = self.package_page_url(package);
            let bytes = client.get_bytes(&url).await?;
            let html = String::from_utf8_lossy(&bytes).into_owned();
            for link in parse_simple_index_page(&html) {
                if let Some(version) = version_from_filename(package, &link.filename) {
                    entries.push((
                        package.clone(),
                        PipIndexEntry {
                            version,
                            uri: link.href,
                            sha256: link.sha256.unwrap_or_default(),
                            requires_python: link.requires_python,
                            yanked: link.yanked,
                        },
                    ));
                }
            }
        }
        Ok(entries)
    }
}

struct SimpleIndexLink {
    href: String,
    filename: String,
    sha256: Option<String>,
    requires_python: Option<String>,
    yanked: bool,
}

static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?is)<a\b([^>]*)>([^<]*)</a>"#).unwrap());
static ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([a-zA-Z0-9_-]+)\s*=\s*"([^"]*)""#).unwrap());

/// Parses PEP 503/PEP 691 simple-index HTML: a flat list of `<a>` tags, one
/// per distribution file, carrying `href`, an optional `data-requires-python`
/// attribute, and an optional `data-yanked` marker.
fn parse_simple_index_page(html: &str) -> Vec<SimpleIndexLink> {
    let mut links = Vec::new();
    for capture in ANCHOR.captures_iter(html) {
        let attrs_raw = &capture[1];
        let text = capture[2].trim().to_string();
        let mut href = None;
        let mut requires_python = None;
        let mut yanked = false;
        for attr in ATTR.captures_iter(attrs_raw) {
            let key = attr[1].to_ascii_lowercase();
            let value = html_unescape(&attr[2]);
            match key.as_str() {
                "href" => href = Some(value),
                "data-requires-python" => requires_python = Some(value),
                "data-yanked" => yanked = true,
                _ => {}
            }
        }
        let Some(href) = href else { continue };
        let sha256 = href
            .split_once("#sha256=")
            .map(|(_, digest)| digest.to_string());
        let filename = if text.is_empty() {
            href.split('/').next_back().unwrap_or(&href).to_string()
        } else {
            text
        };
        links.push(SimpleIndexLink {
            href,
            filename,
            sha256,
            requires_python,
            yanked,
        });
    }
    links
}

fn html_unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Extracts the version component from a distribution filename such as
/// `package_name-1.2.3-py3-none-any.whl` or `package-name-1.2.3.tar.gz`,
/// given the package name it belongs to.
fn version_from_filename(package: &str, filename: &str) -> Option<PepVersion> {
    let stem = filename
        .strip_suffix(".tar.gz")
        .or_else(|| filename.strip_suffix(".whl"))
        .or_else(|| filename.strip_suffix(".zip"))
        .unwrap_or(filename);
    let normalized_prefix = package.replace(['-', '.'], "_").to_ascii_lowercase();
    let normalized_stem = stem.replace(['-', '.'], "_").to_ascii_lowercase();
    let rest = normalized_stem.strip_prefix(&normalized_prefix)?.trim_start_matches('_');
    let version_part = rest.split('_').next()?;
    if version_part.is_empty() {
        return None;
    }
    Some(PepVersion::new(version_part.replace('_', ".")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_simple_index_links() {
        let html = r#"<!DOCTYPE html><html><body>
            <a href="https://files/pkg-1.0.0.tar.gz#sha256=deadbeef" data-requires-python="&gt;=3.8">pkg-1.0.0.tar.gz</a>
            <a href="https://files/pkg-1.1.0-py3-none-any.whl" data-yanked="reason">pkg-1.1.0-py3-none-any.whl</a>
        </body></html>"#;
        let links = parse_simple_index_page(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].sha256.as_deref(), Some("deadbeef"));
        assert_eq!(links[0].requires_python.as_deref(), Some(">=3.8"));
        assert!(links[1].yanked);
    }

    #[test]
    fn extracts_version_from_sdist_and_wheel_filenames() {
        assert_eq!(
            version_from_filename("pkg", "pkg-1.2.3.tar.gz"),
            Some(PepVersion::new("1.2.3"))
        );
        assert_eq!(
            version_from_filename("my-pkg", "my_pkg-2.0.0-py3-none-any.whl"),
            Some(PepVersion::new("2.0.0"))
        );
    }
}
