// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use serde::{Deserialize, Serialize};

/// The action recorded against a dependency whose resolution was influenced
/// by a directive, or flagged by the dependency builder (spec §3
/// `ResolutionRecord`, §4.3 "unknown schema keys produce a warning-level
/// entry... with `action = \"unknown\"`").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionAction {
    Pin,
    Prefer,
    Exclude,
    Replace,
    Unknown,
}

impl std::fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolutionAction::Pin => "pin",
            ResolutionAction::Prefer => "prefer",
            ResolutionAction::Exclude => "exclude",
            ResolutionAction::Replace => "replace",
            ResolutionAction::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ResolutionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pin" => Ok(ResolutionAction::Pin),
            "prefer" => Ok(ResolutionAction::Prefer),
            "exclude" => Ok(ResolutionAction::Exclude),
            "replace" => Ok(ResolutionAction::Replace),
            "unknown" => Ok(ResolutionAction::Unknown),
            other => Err(format!("unrecognized resolution action {other:?}")),
        }
    }
}

/// `{ dependency, action, value, reason, owner }` (spec §3): records why a
/// dependency's resolution changed, or that it references an unresolvable
/// schema key (spec P6: "a `ResolutionRecord` exists with non-empty `owner`
/// and `reason`").
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub dependency: String,
    pub action: ResolutionAction,
    pub value: String,
    pub reason: String,
    pub owner: String,
}
