// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! Run configuration (C11, spec §4.10): layers explicit flags over
//! `FLEETPACK_`-prefixed environment variables, a config file, and the
//! product spec's own `defaults` section into one immutable [`RunConfig`]
//! per run — no global mutable cell (spec §9).

mod error;
mod flags;
mod run_config;

pub use error::{Error, Result};
pub use flags::{AptlyFlags, Command, Flags, ProGetFlags, RepoBackend};
pub use run_config::{Diagnostic, DiagnosticLevel, RunConfig};
