// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// The "build debs" stage of spec §2's control flow is delegated to an
/// external builder (spec §1 "deb-build invocation is delegated to an
/// external builder trait with a process-based default"). Implementations
/// turn the written `bundle.manifest` into `.deb` artifacts under
/// `debs_dir`; this crate never reimplements `dpkg-deb` itself.
pub trait DebBuilder {
    fn build(&self, manifest_path: &Path, debs_dir: &Path) -> Result<()>;
}

/// Shells out to an external command once per run, per spec §5 "External
/// processes are spawned synchronously and joined before the next stage
/// begins" — there is no pool here, just one blocking call.
#[derive(Clone, Debug)]
pub struct ProcessDebBuilder {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for ProcessDebBuilder {
    /// No universal deb-build command exists; `fleetpack-deb-build` is this
    /// expansion's placeholder name for an operator-supplied script, kept
    /// out of `PATH` assumptions by letting `command`/`args` be overridden.
    fn default() -> Self {
        Self {
            command: "fleetpack-deb-build".to_string(),
            args: Vec::new(),
        }
    }
}

impl DebBuilder for ProcessDebBuilder {
    fn build(&self, manifest_path: &Path, debs_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(debs_dir).map_err(|source| Error::Io {
            path: debs_dir.display().to_string(),
            source,
        })?;

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg("--manifest")
            .arg(manifest_path)
            .arg("--out")
            .arg(debs_dir)
            .output()
            .map_err(|source| Error::Io {
                path: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::DebBuildFailed {
                command: self.command.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
