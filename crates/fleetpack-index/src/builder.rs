// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::time::Duration;

use crate::apt::AptSource;
use crate::cache::DiskCache;
use crate::http_client::HttpClient;
use crate::model::RepoIndex;
use crate::pool::{run_bounded, Job};
use crate::pypi::PypiSource;
use crate::retry::RetryConfig;
use crate::Result;

/// Everything needed to crawl a set of APT and PyPI sources into one
/// [`RepoIndex`] (spec §4.4): where to cache fetched bodies, how long a
/// cached body stays fresh, the retry policy, and how many fetches may run
/// concurrently.
#[derive(Clone, Debug)]
pub struct IndexBuildConfig {
    pub apt_sources: Vec<AptSource>,
    pub pypi_sources: Vec<PypiSource>,
    pub cache_dir: std::path::PathBuf,
    pub cache_ttl: Duration,
    pub retry: RetryConfig,
    pub concurrency: usize,
}

impl IndexBuildConfig {
    fn client(&self) -> HttpClient {
        HttpClient::new(
            reqwest::Client::new(),
            DiskCache::new(&self.cache_dir, self.cache_ttl),
            self.retry,
        )
    }
}

/// Concurrently crawls every configured source and assembles a canonical
/// [`RepoIndex`] (spec §4.4 "Output"). APT and PyPI sources are fetched as
/// independent bounded jobs; a failure in any job fails the whole build,
/// since a partial index would silently under-constrain resolution.
#[tracing::instrument(skip(config))]
pub async fn build_repo_index(config: &IndexBuildConfig) -> Result<RepoIndex> {
    let client = config.client();

    let mut jobs: Vec<Job<JobOutcome>> = Vec::new();
    for source in &config.apt_sources {
        let client = client.clone();
        let source = source.clone();
        jobs.push(Box::pin(async move {
            let entries = source.fetch(&client).await?;
            Ok(JobOutcome::Apt(entries))
        }));
    }
    for source in &config.pypi_sources {
        let client = client.clone();
        let source = source.clone();
        jobs.push(Box::pin(async move {
            let entries = source.fetch(&client).await?;
            Ok(JobOutcome::Pip(entries))
        }));
    }

    let outcomes = run_bounded(jobs, config.concurrency).await?;

    let mut index = RepoIndex::default();
    for outcome in outcomes {
        match outcome {
            JobOutcome::Apt(entries) => {
                for (name, entry) in entries {
                    index.apt.entry(name).or_default().push(entry);
                }
            }
            JobOutcome::Pip(entries) => {
                for (name, entry) in entries {
                    index.pip.entry(name).or_default().push(entry);
                }
            }
        }
    }
    index.canonicalize();
    tracing::info!(
        apt_packages = index.apt.len(),
        pip_packages = index.pip.len(),
        "built repo index"
    );
    Ok(index)
}

enum JobOutcome {
    Apt(Vec<(String, crate::model::AptIndexEntry)>),
    Pip(Vec<(String, crate::model::PipIndexEntry)>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_a_client() {
        let config = IndexBuildConfig {
            apt_sources: vec![],
            pypi_sources: vec![],
            cache_dir: std::env::temp_dir(),
            cache_ttl: Duration::from_secs(3600),
            retry: RetryConfig::default(),
            concurrency: 4,
        };
        let _client = config.client();
    }

    #[tokio::test]
    async fn empty_sources_produce_an_empty_index() {
        let config = IndexBuildConfig {
            apt_sources: vec![],
            pypi_sources: vec![],
            cache_dir: std::env::temp_dir().join("fleetpack-index-test-empty"),
            cache_ttl: Duration::from_secs(3600),
            retry: RetryConfig::default(),
            concurrency: 4,
        };
        let index = build_repo_index(&config).await.unwrap();
        assert!(index.apt.is_empty());
        assert!(index.pip.is_empty());
    }
}
