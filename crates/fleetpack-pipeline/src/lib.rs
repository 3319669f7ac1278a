// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! Orchestration (C12, spec §4.11): one function per pipeline stage plus
//! [`run_all`], which chains them in the order spec §2's control-flow
//! sentence names. `fleetpack-cli` is the only other crate that calls into
//! this one; it delegates precedence resolution to `fleetpack-config` and
//! otherwise just dispatches a subcommand to a prefix of this crate's
//! stages.

mod builder;
mod error;
mod run_all;
mod schema;
mod snapshot;
mod stages;

pub use builder::{DebBuilder, ProcessDebBuilder};
pub use error::{Error, Result};
pub use run_all::{run_all, PipelineInputs, RunOutcome};
pub use schema::{build_schema_resolver, discover_sibling_schemas};
pub use snapshot::{build_backend, execute_prune, plan_prune, promote, publish};
pub use stages::{build_deps, compose, inspect, repo_index, resolve, validate, write_outputs};
