// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! The repo-index builder and cache (C5, spec §4.4): concurrent crawl of
//! APT `Packages` files and PyPI simple indexes, with retries, an on-disk
//! cache, and a canonical on-disk form the resolver consults.

mod apt;
mod builder;
mod cache;
mod error;
mod http_client;
mod model;
mod pool;
mod pypi;
mod retry;

pub use apt::AptSource;
pub use builder::{build_repo_index, IndexBuildConfig};
pub use cache::DiskCache;
pub use error::{Error, Result};
pub use http_client::HttpClient;
pub use model::{AptIndexEntry, PipIndexEntry, RepoIndex};
pub use pypi::PypiSource;
pub use retry::RetryConfig;
