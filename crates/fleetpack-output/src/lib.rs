// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! The output writer (C7, spec §4.6): atomic tmp+rename writers for every
//! file in §6's output directory layout, mandatory and optional.

mod error;
mod inspect;
mod writer;

pub use error::{Error, Result};
pub use inspect::{read_inspect_report, AptLockLine, InspectGroup, InspectReport};
pub use writer::{write_all, EmitFlags, OutputRequest, WrittenFiles};
