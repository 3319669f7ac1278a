// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// On-disk cache keyed by `sha256(url)`, written atomically (tmp file +
/// rename) and expired by mtime + TTL, per spec §4.4 "Cache".
#[derive(Clone, Debug)]
pub struct DiskCache {
    root: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
        }
    }

    fn key_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = HEXLOWER.encode(&hasher.finalize());
        self.root.join(digest)
    }

    /// Returns the cached body for `url` if present and not yet expired.
    pub async fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(url);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::CacheIo {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .unwrap_or(Duration::MAX);
        if age > self.ttl {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| Error::CacheIo {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Some(bytes))
    }

    /// Writes `body` for `url` atomically: write to a sibling `.tmp` file,
    /// then rename over the final path.
    pub async fn put(&self, url: &str, body: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| Error::CacheIo {
                path: self.root.display().to_string(),
                source,
            })?;
        let path = self.key_path(url);
        let tmp = tmp_path(&path);
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|source| Error::CacheIo {
                path: tmp.display().to_string(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| Error::CacheIo {
                path: path.display().to_string(),
                source,
            })?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_the_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(60));
        cache.put("http://example/Packages", b"hello").await.unwrap();
        let got = cache.get("http://example/Packages").await.unwrap();
        assert_eq!(got, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(60));
        let got = cache.get("http://example/missing").await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(0));
        cache.put("http://example/Packages", b"hello").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let got = cache.get("http://example/Packages").await.unwrap();
        assert_eq!(got, None);
    }
}
