// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

//! Typed in-memory representation of a product specification, its profile
//! overlays, and the schema mappings they reference (spec §4.1, C1), plus
//! the separate validation pass over an already-composed spec.

mod error;
mod loader;
mod model;
mod validate;

pub use error::{Error, Result};
pub use loader::{FsSpecLoader, SpecLoader};
pub use model::{
    ComposedSpec,
    FieldOrigin,
    InlineSchema,
    InputsConfig,
    Metadata,
    PackagingGroup,
    PackagingMode,
    PinPolicy,
    ProductSpec,
    ProfileRef,
    ProfileSpec,
    PublishConfig,
    ResolutionDirective,
    ResolutionAction,
    SchemaMappingEntry,
};
pub use validate::validate_spec;
