// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use fleetpack_foundation::{ErrorKind, HasErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] fleetpack_spec::Error),

    #[error("unknown inline profile \"{0}\" referenced by product")]
    UnknownInlineProfile(String),

    #[error("profile \"{profile}\" redefines \"{field}\" with an incompatible type")]
    IncompatibleOverride { profile: String, field: String },
}

impl HasErrorKind for Error {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Error::Spec(inner) => inner.error_kind(),
            Error::UnknownInlineProfile(_) => ErrorKind::InvalidArgument,
            Error::IncompatibleOverride { .. } => ErrorKind::FailedPrecondition,
        }
    }
}
