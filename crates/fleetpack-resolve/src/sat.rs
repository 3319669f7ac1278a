// Copyright (c) Fleetpack Contributors.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/fleetpack-rs/fleetpack

use indexmap::IndexMap;

use fleetpack_foundation::DebianVersion;
use fleetpack_index::AptIndexEntry;
use fleetpack_spec::{ResolutionAction, ResolutionDirective};

use crate::error::{Error, Result};

/// A boolean literal over one `(name, version)` variable: positive means
/// "this version is selected", negative means "this version is excluded".
type Literal = i64;
type Clause = Vec<Literal>;

/// Computes the transitive closure over APT `Depends`/`Pre-Depends` starting
/// from `roots`, by encoding the problem as CNF clauses over one boolean
/// variable per `(name, version)` pair and solving with a small DPLL search
/// (spec §4.5 step 5). Returns the chosen `(name -> entry)` map, or an error
/// carrying a summary of the clauses that drove the search to failure.
pub fn solve_closure(
    roots: &[String],
    index: &IndexMap<String, Vec<AptIndexEntry>>,
    directives: &[ResolutionDirective],
) -> Result<IndexMap<String, AptIndexEntry>> {
    let mut reachable = std::collections::BTreeSet::new();
    let mut frontier: Vec<String> = roots.to_vec();
    while let Some(name) = frontier.pop() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        if let Some(entries) = index.get(&name) {
            for entry in entries {
                for dep in &entry.depends {
                    if !reachable.contains(dep) {
                        frontier.push(dep.clone());
                    }
                }
            }
        }
    }

    let mut var_id: IndexMap<(String, String), usize> = IndexMap::new();
    for name in &reachable {
        if let Some(entries) = index.get(name) {
            for entry in entries {
                let next = var_id.len();
                var_id.entry((name.clone(), entry.version.0.clone())).or_insert(next);
            }
        }
    }
    let num_vars = var_id.len();
    let lit = |name: &str, version: &str| -> Option<Literal> {
        var_id.get(&(name.to_string(), version.to_string())).map(|id| (*id as i64) + 1)
    };

    let mut clauses: Vec<Clause> = Vec::new();

    for name in &reachable {
        let Some(entries) = index.get(name) else {
            return Err(Error::NoAvailableVersions { name: name.clone() });
        };
        let options: Vec<Literal> = entries
            .iter()
            .filter_map(|e| lit(name, &e.version.0))
            .collect();
        if options.is_empty() {
            return Err(Error::NoAvailableVersions { name: name.clone() });
        }
        clauses.push(options.clone());
        for i in 0..options.len() {
            for j in (i + 1)..options.len() {
                clauses.push(vec![-options[i], -options[j]]);
            }
        }

        for entry in entries {
            let Some(a) = lit(name, &entry.version.0) else { continue };
            for dep_name in &entry.depends {
                let Some(dep_entries) = index.get(dep_name) else { continue };
                let dep_options: Vec<Literal> = dep_entries
                    .iter()
                    .filter_map(|e| lit(dep_name, &e.version.0))
                    .collect();
                if !dep_options.is_empty() {
                    let mut clause = vec![-a];
                    clause.extend(dep_options);
                    clauses.push(clause);
                }
            }
        }
    }

    for directive in directives {
        let Some(entries) = index.get(&directive.dependency) else { continue };
        match directive.action {
            ResolutionAction::Pin => {
                if let Some(l) = lit(&directive.dependency, &directive.value) {
                    clauses.push(vec![l]);
                }
            }
            ResolutionAction::Exclude => {
                if let Some(l) = lit(&directive.dependency, &directive.value) {
                    clauses.push(vec![-l]);
                }
            }
            ResolutionAction::Prefer | ResolutionAction::Replace => {
                let _ = entries;
            }
        }
    }

    let assignment = dpll(clauses.clone(), num_vars).ok_or_else(|| Error::SatUnsatisfiable {
        name: roots.join(", "),
        summary: summarize_unsat_core(&clauses, num_vars),
    })?;

    let mut selected = IndexMap::new();
    for ((name, version), id) in &var_id {
        if assignment[*id] {
            if let Some(entries) = index.get(name) {
                if let Some(entry) = entries.iter().find(|e| &e.version.0 == version) {
                    selected.insert(name.clone(), entry.clone());
                }
            }
        }
    }
    Ok(selected)
}

/// Plain recursive DPLL: unit propagation followed by branching on the
/// first unassigned variable. Adequate for the small, per-run dependency
/// graphs this resolver deals with; not a competitive SAT implementation.
fn dpll(mut clauses: Vec<Clause>, num_vars: usize) -> Option<Vec<bool>> {
    let mut assignment: Vec<Option<bool>> = vec![None; num_vars];
    dpll_rec(&mut clauses, &mut assignment)?;
    Some(assignment.into_iter().map(|v| v.unwrap_or(false)).collect())
}

fn dpll_rec(clauses: &mut Vec<Clause>, assignment: &mut Vec<Option<bool>>) -> Option<()> {
    loop {
        if clauses.iter().any(|c| c.is_empty()) {
            return None;
        }
        let unit = clauses.iter().find(|c| c.len() == 1).map(|c| c[0]);
        let Some(literal) = unit else { break };
        assign(assignment, literal);
        simplify(clauses, literal);
    }

    if clauses.is_empty() {
        return Some(());
    }

    let var = assignment.iter().position(|v| v.is_none())?;
    for &value in &[true, false] {
        let mut trial_clauses = clauses.clone();
        let mut trial_assignment = assignment.clone();
        let literal = (var as i64 + 1) * if value { 1 } else { -1 };
        assign(&mut trial_assignment, literal);
        simplify(&mut trial_clauses, literal);
        if dpll_rec(&mut trial_clauses, &mut trial_assignment).is_some() {
            *assignment = trial_assignment;
            *clauses = trial_clauses;
            return Some(());
        }
    }
    None
}

fn assign(assignment: &mut [Option<bool>], literal: Literal) {
    let index = (literal.unsigned_abs() as usize) - 1;
    assignment[index] = Some(literal > 0);
}

fn simplify(clauses: &mut Vec<Clause>, literal: Literal) {
    clauses.retain(|c| !c.contains(&literal));
    for clause in clauses.iter_mut() {
        clause.retain(|&l| l != -literal);
    }
}

/// Not a true minimal-unsat-core extraction (that needs repeated
/// solver calls over clause subsets); reports every clause that became
/// empty-or-unsatisfiable-looking as a human-readable summary, which is
/// enough to point an operator at the conflicting packages.
fn summarize_unsat_core(clauses: &[Clause], num_vars: usize) -> String {
    let unit_conflicts: Vec<String> = clauses
        .iter()
        .filter(|c| c.len() <= 2)
        .map(|c| format!("{:?}", c))
        .take(5)
        .collect();
    format!(
        "no satisfying assignment over {} variables; sample constraining clauses: [{}]",
        num_vars,
        unit_conflicts.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(version: &str, depends: Vec<&str>) -> AptIndexEntry {
        AptIndexEntry {
            version: DebianVersion::new(version),
            arch: "amd64".into(),
            component: "main".into(),
            uri: format!("pool/{}_{}.deb", "pkg", version),
            sha256: "sha".into(),
            depends: depends.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn resolves_a_simple_dependency_chain() {
        let mut index = IndexMap::new();
        index.insert("a".to_string(), vec![entry("1.0", vec!["b"])]);
        index.insert("b".to_string(), vec![entry("2.0", vec![])]);

        let selected = solve_closure(&["a".to_string()], &index, &[]).unwrap();
        assert_eq!(selected["a"].version.0, "1.0");
        assert_eq!(selected["b"].version.0, "2.0");
    }

    #[test]
    fn exclude_directive_removes_a_version_from_consideration() {
        let mut index = IndexMap::new();
        index.insert(
            "a".to_string(),
            vec![entry("1.0", vec![]), entry("2.0", vec![])],
        );
        let directive = ResolutionDirective {
            dependency: "a".to_string(),
            action: ResolutionAction::Exclude,
            value: "2.0".to_string(),
            reason: "known broken".to_string(),
            owner: "ops".to_string(),
        };
        let selected = solve_closure(&["a".to_string()], &index, &[directive]).unwrap();
        assert_eq!(selected["a"].version.0, "1.0");
    }

    #[test]
    fn missing_dependency_target_fails_with_not_found() {
        let mut index = IndexMap::new();
        index.insert("a".to_string(), vec![entry("1.0", vec!["missing"])]);
        let err = solve_closure(&["a".to_string()], &index, &[]).unwrap_err();
        assert!(matches!(err, Error::NoAvailableVersions { .. }));
    }
}
