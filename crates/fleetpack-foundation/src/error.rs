// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

/// The error taxonomy of spec §7. This classifies errors by *kind*, not by
/// type: every crate keeps its own `thiserror` enum and implements
/// [`HasErrorKind`] to say which of these seven kinds each variant is.
///
/// Leaf components return the closest kind; intermediate components may
/// wrap an error with more context but must not reclassify it (§7
/// "Propagation"). Only the outermost command layer (`fleetpack-cli`) maps
/// a kind to a process exit code, via [`ErrorKind::exit_code`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    FailedPrecondition,
    PermissionDenied,
    NotFound,
    Internal,
    Cancelled,
}

impl ErrorKind {
    /// Default exit code for a kind, per spec §6. `FailedPrecondition`
    /// defaults to 4 ("no compatible version" / "other failed
    /// precondition"); the one exception is "conflict without resolution
    /// directive", which §6 maps to 3 instead. Error enums that can produce
    /// that specific case override [`HasErrorKind::exit_code`] rather than
    /// relying on this default — see `fleetpack-resolve::Error`.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument | ErrorKind::AlreadyExists => 2,
            ErrorKind::PermissionDenied => 3,
            ErrorKind::FailedPrecondition => 4,
            ErrorKind::NotFound | ErrorKind::Internal => 5,
            ErrorKind::Cancelled => 1,
        }
    }
}

/// Implemented by every crate's error enum so the outermost layer can read
/// off a kind without reclassifying the error.
pub trait HasErrorKind {
    fn error_kind(&self) -> ErrorKind;

    /// Process exit code for this error, per spec §6. Defaults to the kind's
    /// default mapping; override when a single kind splits across exit
    /// codes (e.g. the resolver's conflict-without-directive case).
    fn exit_code(&self) -> i32 {
        self.error_kind().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec_table() {
        assert_eq!(ErrorKind::InvalidArgument.exit_code(), 2);
        assert_eq!(ErrorKind::AlreadyExists.exit_code(), 2);
        assert_eq!(ErrorKind::PermissionDenied.exit_code(), 3);
        assert_eq!(ErrorKind::NotFound.exit_code(), 5);
        assert_eq!(ErrorKind::Internal.exit_code(), 5);
    }
}
