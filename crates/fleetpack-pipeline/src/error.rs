// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Wraps every stage's own error without reclassifying it (spec §7
/// "Propagation": "intermediate components... must not reclassify it").
/// `error_kind`/`exit_code` both delegate straight through to the wrapped
/// error so a crate like `fleetpack-resolve`, which splits one kind across
/// two exit codes, keeps doing so at this layer too.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] fleetpack_spec::Error),
    #[error(transparent)]
    Compose(#[from] fleetpack_compose::Error),
    #[error(transparent)]
    DepBuild(#[from] fleetpack_depbuild::Error),
    #[error(transparent)]
    Index(#[from] fleetpack_index::Error),
    #[error(transparent)]
    Resolve(#[from] fleetpack_resolve::Error),
    #[error(transparent)]
    Output(#[from] fleetpack_output::Error),
    #[error(transparent)]
    Snapshot(#[from] fleetpack_snapshot::Error),
    #[error(transparent)]
    Config(#[from] fleetpack_config::Error),

    #[error("{stage}: no publish configuration for repository {repository}")]
    PublishNotConfigured { stage: &'static str, repository: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("deb builder `{command}` exited with status {status}: {stderr}")]
    DebBuildFailed {
        command: String,
        status: i32,
        stderr: String,
    },
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::Spec(e) => e.error_kind(),
            Error::Compose(e) => e.error_kind(),
            Error::DepBuild(e) => e.error_kind(),
            Error::Index(e) => e.error_kind(),
            Error::Resolve(e) => e.error_kind(),
            Error::Output(e) => e.error_kind(),
            Error::Snapshot(e) => e.error_kind(),
            Error::Config(e) => e.error_kind(),
            Error::PublishNotConfigured { .. } => ErrorKind::InvalidArgument,
            Error::Io { .. } | Error::DebBuildFailed { .. } => ErrorKind::Internal,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Error::Spec(e) => e.exit_code(),
            Error::Compose(e) => e.exit_code(),
            Error::DepBuild(e) => e.exit_code(),
            Error::Index(e) => e.exit_code(),
            Error::Resolve(e) => e.exit_code(),
            Error::Output(e) => e.exit_code(),
            Error::Snapshot(e) => e.exit_code(),
            Error::Config(e) => e.exit_code(),
            Error::PublishNotConfigured { .. } | Error::Io { .. } | Error::DebBuildFailed { .. } => {
                self.error_kind().exit_code()
            }
        }
    }
}
