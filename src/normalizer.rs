//! List Normalizer (LN): parses free-form user input into a sequence of
//! `ModRecord`.
//!
//! Grounded on spec §4.2 verbatim. The line-classification approach
//! (leading-marker detection, trailing-comment stripping) follows the
//! keyword/line scanning style of `hostd/src/mod_classification.rs`.

use crate::model::{Extension, ModRecord};

#[derive(Debug, Clone, Default)]
pub struct NormalizeResult {
    pub records: Vec<ModRecord>,
    /// (duplicate position, canonical name) pairs, in emission order.
    pub duplicates: Vec<(usize, String)>,
}

/// Lowercases and collapses separator variance so that `My Mod.esp`,
/// `my_mod.esp`, and `MY-MOD.ESP` all resolve to the same key.
pub fn canonicalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            other => other,
        })
        .collect()
}

fn is_section_header(trimmed: &str) -> Option<bool> {
    let lower = trimmed.to_lowercase();
    if lower == "[disabled]" {
        Some(false)
    } else if lower == "[enabled]" {
        Some(true)
    } else {
        None
    }
}

/// Returns (enabled-by-marker, remainder) for one non-empty, non-header line.
fn strip_marker(line: &str) -> (bool, &str) {
    match line.chars().next() {
        Some('#') | Some('*') | Some('-') => (false, line[1..].trim_start()),
        _ => (true, line),
    }
}

fn strip_trailing_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim_end(),
        None => line.trim_end(),
    }
}

pub fn normalize(raw: &str) -> NormalizeResult {
    let mut result = NormalizeResult::default();
    let mut section_enabled = true;
    let mut seen = std::collections::HashSet::new();
    let mut position = 0usize;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(enabled) = is_section_header(trimmed) {
            section_enabled = enabled;
            continue;
        }

        // A line starting with `#` is ambiguous between "comment" and
        // "disabled marker"; per spec §4.2 a leading `#` is itself a
        // disable marker, so a pure-comment line must carry no filename
        // token after stripping it.
        let (marker_enabled, after_marker) = strip_marker(trimmed);
        let candidate = strip_trailing_comment(after_marker);
        let filename = candidate.trim();
        if filename.is_empty() {
            continue;
        }

        let canonical = canonicalize(filename);
        let enabled = section_enabled && marker_enabled;

        if seen.contains(&canonical) {
            result.duplicates.push((position, canonical));
            position += 1;
            continue;
        }
        seen.insert(canonical.clone());

        result.records.push(ModRecord {
            extension: Extension::from_filename(&canonical),
            name: canonical,
            display_name: filename.to_string(),
            enabled,
            position,
            raw: line.to_string(),
        });
        position += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_enabled_list() {
        let result = normalize("USSEP.esp\nSkyUI.esp");
        assert_eq!(result.records.len(), 2);
        assert!(result.records.iter().all(|r| r.enabled));
    }

    #[test]
    fn disable_markers_toggle_enabled() {
        let result = normalize("# Dead.esp\n* Also.esp\n- Third.esp\nLive.esp");
        assert!(result.records.iter().all(|r| !r.enabled || r.name == "live.esp"));
    }

    #[test]
    fn section_headers_toggle_state() {
        let raw = "[disabled]\nA.esp\n[enabled]\nB.esp";
        let result = normalize(raw);
        let a = result.records.iter().find(|r| r.name == "a.esp").unwrap();
        let b = result.records.iter().find(|r| r.name == "b.esp").unwrap();
        assert!(!a.enabled);
        assert!(b.enabled);
    }

    #[test]
    fn duplicate_canonical_names_collapse() {
        let result = normalize("Mod.esp\nMOD.ESP");
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.duplicates.len(), 1);
    }

    #[test]
    fn unknown_extension_is_tagged_not_rejected() {
        let result = normalize("readme.txt");
        assert_eq!(result.records[0].extension, Extension::Unknown);
    }

    #[test]
    fn positions_are_dense_including_duplicates() {
        let result = normalize("A.esp\nA.esp\nB.esp");
        assert_eq!(result.records[0].position, 0);
        assert_eq!(result.duplicates[0].0, 1);
        assert_eq!(result.records[1].position, 2);
    }
}
