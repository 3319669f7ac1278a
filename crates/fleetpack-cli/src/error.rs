// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The CLI's own error type wraps the pipeline's without reclassifying it
/// (spec §7 "Propagation"), adding only the handful of failure modes that
/// originate at the command-line boundary itself: reading the sources file
/// and resolving configuration before a pipeline stage is ever reached.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(code(fleetpack::pipeline))]
    Pipeline(#[from] fleetpack_pipeline::Error),

    #[error(transparent)]
    #[diagnostic(code(fleetpack::config))]
    Config(#[from] fleetpack_config::Error),

    #[error(transparent)]
    #[diagnostic(code(fleetpack::snapshot))]
    Snapshot(#[from] fleetpack_snapshot::Error),

    #[error("failed to read sources file {path}: {source}")]
    #[diagnostic(code(fleetpack::cli::sources_io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in sources file {path}: {source}")]
    #[diagnostic(code(fleetpack::cli::sources_yaml))]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("the {command} command requires --repository")]
    #[diagnostic(code(fleetpack::cli::missing_repository))]
    MissingRepository { command: &'static str },
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::Pipeline(e) => e.error_kind(),
            Error::Config(e) => e.error_kind(),
            Error::Snapshot(e) => e.error_kind(),
            Error::Io { .. } => ErrorKind::Internal,
            Error::Yaml { .. } | Error::MissingRepository { .. } => ErrorKind::InvalidArgument,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Error::Pipeline(e) => e.exit_code(),
            Error::Config(e) => e.exit_code(),
            Error::Snapshot(e) => e.exit_code(),
            Error::Io { .. } | Error::Yaml { .. } | Error::MissingRepository { .. } => {
                self.error_kind().exit_code()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_repository_maps_to_invalid_argument_exit_code() {
        let err = Error::MissingRepository { command: "inspect" };
        assert_eq!(err.error_kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn a_wrapped_config_error_keeps_its_own_exit_code() {
        let inner = fleetpack_config::Error::InvalidValue {
            field: "http_timeout_secs",
            message: "must be positive".to_string(),
        };
        let err = Error::Config(inner);
        assert_eq!(err.exit_code(), 2);
    }
}
