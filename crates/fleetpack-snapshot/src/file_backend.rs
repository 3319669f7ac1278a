// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::{Path, PathBuf};

use chrono::Utc;
use fleetpack_foundation::SnapshotInfo;

use crate::backend::split_snapshot_id;
use crate::error::{Error, Result};

const BACKEND: &str = "file";

/// Filesystem snapshot backend (spec §4.7 "File backend"): snapshots are
/// directories, channels are symlinks (falling back to a small marker file
/// where symlinks aren't available).
#[derive(Clone, Debug)]
pub struct FileBackend {
    repo_dir: PathBuf,
    repository: String,
}

impl FileBackend {
    pub fn new(repo_dir: impl Into<PathBuf>, repository: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            repository: repository.into(),
        }
    }

    fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.repo_dir.join("snapshots").join(format!("{id}.snapshot"))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.snapshot_dir(id).join("snapshot.meta")
    }

    fn channels_dir(&self) -> PathBuf {
        self.repo_dir.join("channels")
    }

    fn channel_path(&self, channel: &str) -> PathBuf {
        self.channels_dir().join(channel)
    }

    fn io_err(path: &Path) -> impl Fn(std::io::Error) -> Error + '_ {
        move |source| Error::Io {
            backend: BACKEND,
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl crate::backend::SnapshotBackend for FileBackend {
    async fn publish(&self, id: &str, debs_dir: &Path) -> Result<()> {
        let dir = self.snapshot_dir(id);
        if tokio::fs::metadata(&dir).await.is_ok() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(Self::io_err(&dir))?;

        if tokio::fs::metadata(debs_dir).await.is_ok() {
            let mut entries = tokio::fs::read_dir(debs_dir)
                .await
                .map_err(Self::io_err(debs_dir))?;
            while let Some(entry) = entries.next_entry().await.map_err(Self::io_err(debs_dir))? {
                let dest = dir.join(entry.file_name());
                tokio::fs::copy(entry.path(), &dest)
                    .await
                    .map_err(Self::io_err(&dest))?;
            }
        }

        let info = SnapshotInfo {
            snapshot_id: id.to_string(),
            prefix: split_snapshot_id(id).to_string(),
            channel: None,
            repository: Some(self.repository.clone()),
            created_at: Utc::now(),
        };
        let meta_path = self.meta_path(id);
        let body = serde_yaml::to_string(&info).expect("SnapshotInfo always serializes");
        tokio::fs::write(&meta_path, body)
            .await
            .map_err(Self::io_err(&meta_path))?;
        Ok(())
    }

    async fn promote(&self, id: &str, channel: &str) -> Result<()> {
        let dir = self.snapshot_dir(id);
        if tokio::fs::metadata(&dir).await.is_err() {
            return Err(Error::NotFound {
                snapshot_id: id.to_string(),
            });
        }
        let channels_dir = self.channels_dir();
        tokio::fs::create_dir_all(&channels_dir)
            .await
            .map_err(Self::io_err(&channels_dir))?;
        let channel_path = self.channel_path(channel);
        let _ = tokio::fs::remove_file(&channel_path).await;
        let _ = tokio::fs::remove_dir_all(&channel_path).await;

        let target = dir.clone();
        let link = channel_path.clone();
        let symlink_result = tokio::task::spawn_blocking(move || {
            #[cfg(unix)]
            {
                std::os::unix::fs::symlink(&target, &link)
            }
            #[cfg(not(unix))]
            {
                let _ = (&target, &link);
                Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "no symlinks"))
            }
        })
        .await
        .expect("spawn_blocking does not panic");

        if symlink_result.is_err() {
            tokio::fs::write(&channel_path, id.as_bytes())
                .await
                .map_err(Self::io_err(&channel_path))?;
        }
        Ok(())
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let snapshots_dir = self.repo_dir.join("snapshots");
        if tokio::fs::metadata(&snapshots_dir).await.is_err() {
            return Ok(Vec::new());
        }

        let mut channel_of: std::collections::HashMap<String, String> = Default::default();
        let channels_dir = self.channels_dir();
        if let Ok(mut entries) = tokio::fs::read_dir(&channels_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let channel_name = entry.file_name().to_string_lossy().to_string();
                if let Ok(target) = tokio::fs::read_link(entry.path()).await {
                    if let Some(stem) = target.file_stem().and_then(|s| s.to_str()) {
                        channel_of.insert(stem.to_string(), channel_name.clone());
                    }
                } else if let Ok(body) = tokio::fs::read_to_string(entry.path()).await {
                    channel_of.insert(body.trim().to_string(), channel_name);
                }
            }
        }

        let mut infos = Vec::new();
        let mut entries = tokio::fs::read_dir(&snapshots_dir)
            .await
            .map_err(Self::io_err(&snapshots_dir))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(Self::io_err(&snapshots_dir))?
        {
            let meta_path = entry.path().join("snapshot.meta");
            let Ok(body) = tokio::fs::read_to_string(&meta_path).await else {
                continue;
            };
            let Ok(mut info) = serde_yaml::from_str::<SnapshotInfo>(&body) else {
                continue;
            };
            info.channel = channel_of.get(&info.snapshot_id).cloned();
            infos.push(info);
        }
        infos.sort_by(|a, b| a.snapshot_id.cmp(&b.snapshot_id));
        Ok(infos)
    }

    async fn delete_snapshot(&self, id: &str) -> Result<()> {
        let dir = self.snapshot_dir(id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Io {
                backend: BACKEND,
                path: dir.display().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SnapshotBackend;

    #[tokio::test]
    async fn publish_is_idempotent_and_list_reflects_it() {
        let root = tempfile::tempdir().unwrap();
        let debs = tempfile::tempdir().unwrap();
        tokio::fs::write(debs.path().join("a.deb"), b"data").await.unwrap();

        let backend = FileBackend::new(root.path(), "fleet");
        backend.publish("alpha-1a2b3c4d5e6f", debs.path()).await.unwrap();
        backend.publish("alpha-1a2b3c4d5e6f", debs.path()).await.unwrap();

        let listed = backend.list_snapshots().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].prefix, "alpha");
    }

    #[tokio::test]
    async fn promote_requires_an_existing_snapshot() {
        let root = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(root.path(), "fleet");
        let err = backend.promote("missing-aaaaaaaaaaaa", "stable").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(root.path(), "fleet");
        backend.delete_snapshot("never-existed-aaaaaaaaaaaa").await.unwrap();
    }
}
