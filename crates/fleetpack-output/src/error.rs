// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode CSV for {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to encode YAML for {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV in {path}: {source}")]
    ParseCsv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed {path}: {message}")]
    Malformed { path: String, message: String },
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Internal,
            Error::Csv { .. } | Error::Yaml { .. } => ErrorKind::Internal,
            Error::Read { .. } | Error::ParseCsv { .. } | Error::Malformed { .. } => ErrorKind::Internal,
        }
    }
}
