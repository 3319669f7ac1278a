// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use std::path::{Path, PathBuf};

use fleetpack_foundation::Origin;
use quick_xml::events::Event;
use quick_xml::Reader;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// An abstract `package.xml` dependency reference, not yet bound to a
/// concrete [`fleetpack_foundation::Dependency`] (spec §3).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ROSTagDependency {
    pub key: String,
    pub origin: Origin,
}

const DEPEND_TAGS: &[&str] = &["depend", "exec_depend", "build_depend"];

/// Walks the declared workspace roots looking for `package.xml` files (spec
/// §4.3: "`package.xml` files are discovered by walking declared workspace
/// roots").
pub fn find_package_xml_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in roots {
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if entry.file_type().is_file() && entry.file_name() == "package.xml" {
                found.push(entry.path().to_path_buf());
            }
        }
    }
    found.sort();
    found
}

/// Extracts every `<depend>`/`<exec_depend>`/`<build_depend>` tag's text
/// content as a [`ROSTagDependency`], with `origin` set to the workspace
/// path the tag was found in.
pub fn parse_package_xml(path: &Path) -> Result<Vec<ROSTagDependency>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    let mut current_tag: Option<String> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if DEPEND_TAGS.contains(&name.as_str()) {
                    current_tag = Some(name);
                } else {
                    current_tag = None;
                }
            }
            Ok(Event::Text(e)) => {
                if current_tag.is_some() {
                    let key = e
                        .unescape()
                        .map_err(|source| Error::Xml {
                            path: path.display().to_string(),
                            source,
                        })?
                        .trim()
                        .to_string();
                    if !key.is_empty() {
                        deps.push(ROSTagDependency {
                            key,
                            origin: Origin::Workspace(path.display().to_string()),
                        });
                    }
                }
            }
            Ok(Event::End(_)) => current_tag = None,
            Ok(Event::Eof) => break,
            Err(source) => {
                return Err(Error::Xml {
                    path: path.display().to_string(),
                    source,
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_depend_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.xml");
        std::fs::write(
            &path,
            r#"<?xml version="1.0"?>
<package format="3">
  <name>demo_pkg</name>
  <depend>cv_bridge</depend>
  <exec_depend>rospy</exec_depend>
  <build_depend>catkin</build_depend>
  <test_depend>python3-pytest</test_depend>
</package>
"#,
        )
        .unwrap();

        let deps = parse_package_xml(&path).unwrap();
        let keys: Vec<_> = deps.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["cv_bridge", "rospy", "catkin"]);
    }

    #[test]
    fn find_package_xml_files_walks_workspace_roots() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("pkg_a");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("package.xml"), "<package/>").unwrap();

        let found = find_package_xml_files(&[dir.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
    }
}
