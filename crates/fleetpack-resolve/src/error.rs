// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("conflict without resolution directive: {name}")]
    ConflictWithoutDirective { name: String },

    #[error("no compatible version for {name}")]
    NoCompatibleVersion { name: String },

    #[error("no available versions for {name}")]
    NoAvailableVersions { name: String },

    #[error("directive for {dependency} is invalid: {message}")]
    InvalidDirective { dependency: String, message: String },

    #[error("no satisfying assignment for {name}: {summary}")]
    SatUnsatisfiable { name: String, summary: String },
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::NoAvailableVersions { .. } => ErrorKind::NotFound,
            Error::InvalidDirective { .. } => ErrorKind::InvalidArgument,
            Error::ConflictWithoutDirective { .. }
            | Error::NoCompatibleVersion { .. }
            | Error::SatUnsatisfiable { .. } => ErrorKind::FailedPrecondition,
        }
    }

    /// §6: "conflict without resolution directive" is the one
    /// `FailedPrecondition` case that exits `3` instead of the default `4`.
    fn exit_code(&self) -> i32 {
        match self {
            Error::ConflictWithoutDirective { .. } => 3,
            other => other.error_kind().exit_code(),
        }
    }
}
