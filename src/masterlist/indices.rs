//! Derived indices built once per parsed masterlist document.
//!
//! Grounded on spec §4.1's five derived structures; the symmetric
//! incompatibility-pair and keyed-patch-map shapes follow
//! `hostd/src/compatibility_analyzer.rs`'s `known_incompatibilities:
//! HashMap<String, Vec<String>>` pattern, generalized to hold richer values.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::model::MasterlistEntry;

use super::schema::MasterlistDocument;

/// Canonicalizes a name the same way the normalizer does: lowercase,
/// separator-normalized. Kept in sync with `normalizer::canonicalize`.
pub fn canonicalize(name: &str) -> String {
    crate::normalizer::canonicalize(name)
}

fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) }
}

#[derive(Debug, Clone, Default)]
pub struct MasterlistIndices {
    pub entries_by_name: HashMap<String, MasterlistEntry>,
    /// alias (canonicalized) -> canonical name
    pub name_index: HashMap<String, String>,
    /// dependent -> set of requirements
    pub requirement_edges: HashMap<String, HashSet<String>>,
    /// canonical (a, b) with a <= b
    pub incompat_pairs: HashSet<(String, String)>,
    /// later -> set of earlier (later must load after earlier)
    pub load_after_edges: HashMap<String, HashSet<String>>,
    pub patch_map: HashMap<(String, String), String>,
    pub weight_table: HashMap<String, u32>,
    pub dropped_cycle_edges: Vec<(String, String)>,
}

/// Reference tag weights used when an entry declares no explicit weight.
/// See spec §4.5.
pub fn tag_weight(tag: &str) -> u32 {
    match tag {
        "texture" => 2,
        "mesh" => 1,
        "script-heavy" => 5,
        "scripted-quest" => 3,
        "npc-overhaul" => 3,
        "animation" => 2,
        "enb" => 8,
        "weather" => 3,
        "survival" => 2,
        "perk-overhaul" => 2,
        "ui" => 1,
        _ => 0,
    }
}

pub fn build(doc: &MasterlistDocument) -> MasterlistIndices {
    let mut idx = MasterlistIndices::default();

    // Pass 1: collapse alias collisions, canonical name wins display (spec
    // §4.1 tie-break). Entries are processed in document order so the
    // first occurrence of a canonical name is authoritative.
    for entry in &doc.entries {
        let canon = canonicalize(&entry.name);
        if idx.entries_by_name.contains_key(&canon) {
            continue;
        }
        idx.name_index.insert(canon.clone(), canon.clone());
        for alias in &entry.aliases {
            let alias_key = canonicalize(alias);
            if !idx.name_index.contains_key(&alias_key) {
                debug!(alias = %alias_key, canonical = %canon, "alias collapsed");
            }
            idx.name_index.entry(alias_key).or_insert_with(|| canon.clone());
        }
        idx.entries_by_name.insert(canon, entry.clone());
    }

    // Pass 2: derived edges and weights, now that alias resolution is total.
    for (canon, entry) in idx.entries_by_name.clone() {
        let mut reqs = HashSet::new();
        for req in &entry.requires {
            let target = canonicalize(req);
            let target = idx.name_index.get(&target).cloned().unwrap_or(target);
            if target == canon {
                warn!(name = %canon, "self-referential requirement discarded");
                continue;
            }
            reqs.insert(target);
        }
        if !reqs.is_empty() {
            idx.requirement_edges.insert(canon.clone(), reqs);
        }

        for other in &entry.incompatible_with {
            let target = canonicalize(other);
            let target = idx.name_index.get(&target).cloned().unwrap_or(target);
            if target == canon {
                warn!(name = %canon, "self-referential incompatibility discarded");
                continue;
            }
            idx.incompat_pairs.insert(canonical_pair(&canon, &target));
        }

        for earlier in &entry.load_after {
            let target = canonicalize(earlier);
            let target = idx.name_index.get(&target).cloned().unwrap_or(target);
            if target == canon {
                warn!(name = %canon, "self-referential load_after discarded");
                continue;
            }
            idx.load_after_edges.entry(canon.clone()).or_default().insert(target);
        }

        for rule in &entry.patches {
            let a = idx.name_index.get(&canonicalize(&rule.pair.0)).cloned().unwrap_or_else(|| canonicalize(&rule.pair.0));
            let b = idx.name_index.get(&canonicalize(&rule.pair.1)).cloned().unwrap_or_else(|| canonicalize(&rule.pair.1));
            // `rule.name` is kept display-case (it's the patch's own
            // filename, shown verbatim in remediation text); callers that
            // need to look it up against the canonicalized user list must
            // canonicalize it themselves.
            idx.patch_map.insert(canonical_pair(&a, &b), rule.name.clone());
        }

        let weight = entry.weight.unwrap_or_else(|| entry.tags.iter().map(|t| tag_weight(t)).sum());
        idx.weight_table.insert(canon, weight);
    }

    break_load_after_cycles(&mut idx);

    idx
}

/// Breaks load-after cycles by dropping the edge whose target name sorts
/// later (spec §4.1). Operates on the raw edge set, not the bucketed
/// subgraphs the optimizer builds per analysis.
fn break_load_after_cycles(idx: &mut MasterlistIndices) {
    loop {
        match find_cycle_edge(&idx.load_after_edges) {
            None => break,
            Some((later, earlier)) => {
                if let Some(set) = idx.load_after_edges.get_mut(&later) {
                    set.remove(&earlier);
                    if set.is_empty() {
                        idx.load_after_edges.remove(&later);
                    }
                }
                idx.dropped_cycle_edges.push((later, earlier));
            }
        }
    }
}

/// DFS cycle detection over the `later -> earlier` edge set. Returns the
/// edge to drop: the one whose `later` endpoint sorts lexicographically
/// after the other node in the cycle.
fn find_cycle_edge(edges: &HashMap<String, HashSet<String>>) -> Option<(String, String)> {
    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    let mut stack: Vec<String> = Vec::new();

    let mut nodes: Vec<&String> = edges.keys().collect();
    nodes.sort();

    for start in nodes {
        if visited.contains(start) {
            continue;
        }
        if let Some(edge) = dfs(start, edges, &mut visiting, &mut visited, &mut stack) {
            return Some(edge);
        }
    }
    None
}

fn dfs(
    node: &str,
    edges: &HashMap<String, HashSet<String>>,
    visiting: &mut HashSet<String>,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> Option<(String, String)> {
    visiting.insert(node.to_string());
    stack.push(node.to_string());

    if let Some(neighbors) = edges.get(node) {
        let mut sorted_neighbors: Vec<&String> = neighbors.iter().collect();
        sorted_neighbors.sort();
        for neighbor in sorted_neighbors {
            if visiting.contains(neighbor) {
                // Found a cycle; drop the edge whose `later` endpoint sorts
                // later lexicographically among the two cycle-closing nodes.
                let (later, earlier) =
                    if node.as_bytes() >= neighbor.as_bytes() {
                        (node.to_string(), neighbor.clone())
                    } else {
                        (neighbor.clone(), node.to_string())
                    };
                return Some((later, earlier));
            }
            if !visited.contains(neighbor) {
                if let Some(edge) = dfs(neighbor, edges, visiting, visited, stack) {
                    return Some(edge);
                }
            }
        }
    }

    stack.pop();
    visiting.remove(node);
    visited.insert(node.to_string());
    None
}
