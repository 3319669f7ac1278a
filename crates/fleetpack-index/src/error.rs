// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decompress {url}: {message}")]
    Decompress { url: String, message: String },

    #[error("failed to parse Packages entry in {url}: {message}")]
    Parse { url: String, message: String },

    #[error("cache I/O error at {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("index crawl cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::Status { status, .. } if *status == 404 => ErrorKind::NotFound,
            Error::Http { .. } | Error::Status { .. } | Error::CacheIo { .. } | Error::Io(_) => {
                ErrorKind::Internal
            }
            Error::Decompress { .. } | Error::Parse { .. } => ErrorKind::InvalidArgument,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }
}
