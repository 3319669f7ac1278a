// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("reading configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Internal,
            Error::InvalidValue { .. } => ErrorKind::InvalidArgument,
        }
    }
}
