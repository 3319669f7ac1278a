// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! The composer (C2) and layered schema resolver (C3) of spec §4.1/§4.2:
//! merges a product spec with its ordered profile overlays into one
//! [`fleetpack_spec::ComposedSpec`], and resolves abstract schema keys
//! through a precedence stack of mapping layers.

mod composer;
mod error;
mod schema_resolver;

pub use composer::compose;
pub use error::{Error, Result};
pub use schema_resolver::{ResolveOutcome, SchemaResolver};
