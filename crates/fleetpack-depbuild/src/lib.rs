// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! The dependency builder (C4, spec §4.3): collects dependencies declared
//! directly by the composed spec, discovers `package.xml` ROS tags under
//! the declared workspace roots, resolves those tags through the schema
//! resolver, and deduplicates everything by `(kind, name)`.

mod builder;
mod error;
mod package_xml;

pub use builder::{build_from_specs, BuildOutcome};
pub use error::{Error, Result};
pub use package_xml::{find_package_xml_files, parse_package_xml, ROSTagDependency};
