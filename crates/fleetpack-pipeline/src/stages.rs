// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;

use fleetpack_compose::SchemaResolver;
use fleetpack_depbuild::BuildOutcome;
use fleetpack_index::{IndexBuildConfig, RepoIndex};
use fleetpack_output::{InspectReport, OutputRequest, WrittenFiles};
use fleetpack_resolve::{ResolveOutput, ResolveRequest};
use fleetpack_spec::{ComposedSpec, ProductSpec, SpecLoader};

use crate::error::Result;
use crate::schema::{build_schema_resolver, discover_sibling_schemas};

/// `compose` stage (spec §2, §4.1): loads the product spec and merges it
/// with its profile overlays and discovered schemas into one [`ComposedSpec`].
#[tracing::instrument(skip(loader), fields(product_spec_path = %product_spec_path.display()))]
pub fn compose(loader: &dyn SpecLoader, product_spec_path: &Path) -> Result<ComposedSpec> {
    let product: ProductSpec = loader.load_product(product_spec_path)?;
    let discovered_schemas = discover_sibling_schemas(product_spec_path);
    let composed = fleetpack_compose::compose(&product, loader, &discovered_schemas)?;
    Ok(composed)
}

/// `validate` stage (spec §2, §4.1 "Validation").
#[tracing::instrument(skip(composed))]
pub fn validate(composed: &ComposedSpec) -> Result<()> {
    fleetpack_spec::validate_spec(composed)?;
    Ok(())
}

/// `build-deps` stage (spec §2, §4.3): builds the schema resolver for this
/// run, then walks the composed spec's ROS tags and the workspace's
/// `package.xml` files through it.
#[tracing::instrument(skip(loader, composed))]
pub fn build_deps(
    loader: &dyn SpecLoader,
    composed: &ComposedSpec,
    cli_schema_files: &[std::path::PathBuf],
) -> Result<(BuildOutcome, SchemaResolver)> {
    let resolver = build_schema_resolver(loader, composed, cli_schema_files)?;
    let outcome = fleetpack_depbuild::build_from_specs(composed, &resolver)?;
    Ok((outcome, resolver))
}

/// `repo-index` stage (spec §2, §4.4): concurrently crawls every configured
/// APT/PyPI source into one canonical [`RepoIndex`].
#[tracing::instrument(skip(config))]
pub async fn repo_index(config: &IndexBuildConfig) -> Result<RepoIndex> {
    let index = fleetpack_index::build_repo_index(config).await?;
    Ok(index)
}

/// `resolve` stage (spec §2, §4.5): version selection, directive
/// application, optional SAT closure, packaging grouping.
#[tracing::instrument(skip(request), fields(target_ubuntu = %request.target_ubuntu))]
pub fn resolve(request: &ResolveRequest<'_>) -> Result<ResolveOutput> {
    let output = fleetpack_resolve::resolve(request)?;
    Ok(output)
}

/// `write-outputs` stage (spec §2, §4.6).
#[tracing::instrument(skip(request), fields(output_dir = %request.output_dir.display()))]
pub async fn write_outputs(request: &OutputRequest<'_>) -> Result<WrittenFiles> {
    let written = fleetpack_output::write_all(request).await?;
    Ok(written)
}

/// `inspect` stage (spec §8 scenario 2): reads an existing output
/// directory's mandatory files back into an [`InspectReport`], independent
/// of any snapshot backend.
#[tracing::instrument(fields(output_dir = %output_dir.display()))]
pub async fn inspect(output_dir: &Path) -> Result<InspectReport> {
    let report = fleetpack_output::read_inspect_report(output_dir).await?;
    Ok(report)
}
