// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("snapshot {snapshot_id} not found")]
    NotFound { snapshot_id: String },

    #[error("{what} is required for {backend} backend")]
    MissingCredential { backend: &'static str, what: &'static str },

    #[error("{backend} denied the request: {message}")]
    Unauthorized { backend: &'static str, message: String },

    #[error("{backend} I/O error at {path}: {source}")]
    Io {
        backend: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend} request failed: {source}")]
    Http {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{backend} returned status {status}: {message}")]
    Status {
        backend: &'static str,
        status: u16,
        message: String,
    },

    #[error("{backend} process exited with status {status}: {stderr}")]
    ProcessFailed {
        backend: &'static str,
        status: i32,
        stderr: String,
    },
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::MissingCredential { .. } => ErrorKind::InvalidArgument,
            Error::Unauthorized { .. } => ErrorKind::PermissionDenied,
            Error::Io { .. } | Error::ProcessFailed { .. } => ErrorKind::Internal,
            Error::Http { .. } => ErrorKind::Internal,
            Error::Status { status, .. } if *status == 404 => ErrorKind::NotFound,
            Error::Status { status, .. } if *status == 401 || *status == 403 => {
                ErrorKind::PermissionDenied
            }
            Error::Status { .. } => ErrorKind::Internal,
        }
    }
}
