//! Conflict Detector (CD): joins the normalized list against masterlist
//! indices to emit severity-classified findings.
//!
//! Grounded on spec §4.3 verbatim; the pairwise-incompatibility and
//! patch-lookup approach adapts `hostd/src/compatibility_analyzer.rs`'s
//! `analyze_mod`/`known_incompatibilities` table walk.

use std::collections::{HashMap, HashSet};

use crate::config::GameProfile;
use crate::masterlist::indices::MasterlistIndices;
use crate::model::{Extension, Finding, FindingKind, ModRecord, Remediation, Severity};
use crate::normalizer::canonicalize;

pub fn detect(
    records: &[ModRecord],
    duplicates: &[(usize, String)],
    ml: &MasterlistIndices,
    profile: &GameProfile,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    let enabled: HashMap<&str, &ModRecord> =
        records.iter().filter(|r| r.enabled).map(|r| (r.name.as_str(), r)).collect();
    let present: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let enabled_names: HashSet<&str> = enabled.keys().copied().collect();

    for record in records.iter().filter(|r| r.enabled) {
        if !ml.entries_by_name.contains_key(&record.name) {
            findings.push(Finding {
                kind: FindingKind::UnknownMod,
                severity: Severity::Info,
                subjects: vec![record.display_name.clone()],
                message: format!("{} is not present in the masterlist", record.display_name),
                remediation: None,
            });
        }
    }

    for (name, record) in &enabled {
        if let Some(reqs) = ml.requirement_edges.get(*name) {
            for req in reqs {
                if enabled_names.contains(req.as_str()) {
                    continue;
                }
                let display = display_for_or_masterlist(req, records, ml);
                if present.contains(req.as_str()) {
                    findings.push(Finding {
                        kind: FindingKind::MissingRequirement,
                        severity: Severity::Warning,
                        message: format!(
                            "{} requires {} but it is present and disabled",
                            record.display_name, display
                        ),
                        subjects: vec![record.display_name.clone(), display],
                        remediation: None,
                    });
                } else {
                    findings.push(Finding {
                        kind: FindingKind::MissingRequirement,
                        severity: Severity::Error,
                        message: format!("{} requires {} which is missing", record.display_name, display),
                        subjects: vec![record.display_name.clone(), display],
                        remediation: None,
                    });
                }
            }
        }
    }

    let mut seen_pairs = HashSet::new();
    for pair in &ml.incompat_pairs {
        if !enabled_names.contains(pair.0.as_str()) || !enabled_names.contains(pair.1.as_str()) {
            continue;
        }
        if !seen_pairs.insert(pair.clone()) {
            continue;
        }
        let display_a = display_for(&pair.0, records);
        let display_b = display_for(&pair.1, records);
        let patch = ml.patch_map.get(pair);
        let (severity, remediation, message) = match patch {
            Some(patch_name) if enabled_names.contains(canonicalize(patch_name).as_str()) => (
                Severity::Info,
                Some(Remediation {
                    patch_name: Some(patch_name.clone()),
                    url_reference: None,
                    suggested_action: Some("already reconciled".to_string()),
                }),
                format!("{display_a} and {display_b} are incompatible but already reconciled by {patch_name}"),
            ),
            Some(patch_name) => (
                Severity::Error,
                Some(Remediation {
                    patch_name: Some(patch_name.clone()),
                    url_reference: None,
                    suggested_action: Some(format!("install {patch_name}")),
                }),
                format!("{display_a} and {display_b} are incompatible"),
            ),
            None => (Severity::Error, None, format!("{display_a} and {display_b} are incompatible")),
        };
        findings.push(Finding {
            kind: FindingKind::Incompatible,
            severity,
            subjects: vec![display_a, display_b],
            message,
            remediation,
        });
    }

    for (name, record) in &enabled {
        if let Some(earlier_set) = ml.load_after_edges.get(*name) {
            for earlier in earlier_set {
                let Some(earlier_record) = enabled.get(earlier.as_str()) else { continue };
                if earlier_record.extension == Extension::Master && record.extension == Extension::Master {
                    continue;
                }
                if earlier_record.position < record.position {
                    continue;
                }
                findings.push(Finding {
                    kind: FindingKind::LoadOrderViolation,
                    severity: Severity::Warning,
                    subjects: vec![earlier_record.display_name.clone(), record.display_name.clone()],
                    message: format!(
                        "{} must load after {} but currently loads before it",
                        record.display_name, earlier_record.display_name
                    ),
                    remediation: None,
                });
            }
        }
    }

    for (name, record) in &enabled {
        if let Some(entry) = ml.entries_by_name.get(*name) {
            if entry.dirty {
                // Only a patch declared on this entry itself reconciles its
                // dirty edits; an unrelated patch elsewhere in the
                // masterlist does nothing for it.
                let has_patch =
                    entry.patches.iter().any(|rule| enabled_names.contains(canonicalize(&rule.name).as_str()));
                if !has_patch {
                    findings.push(Finding {
                        kind: FindingKind::DirtyEdit,
                        severity: Severity::Info,
                        subjects: vec![record.display_name.clone()],
                        message: format!("{} ships with known dirty edits", record.display_name),
                        remediation: entry.notes.clone().map(|n| Remediation {
                            patch_name: None,
                            url_reference: None,
                            suggested_action: Some(n),
                        }),
                    });
                }
            }
        }
    }

    for (position, canonical) in duplicates {
        let display = display_for(canonical, records);
        findings.push(Finding {
            kind: FindingKind::Duplicate,
            severity: Severity::Info,
            subjects: vec![display],
            message: format!("{canonical} appears more than once in the list (position {position})"),
            remediation: None,
        });
    }

    findings.extend(plugin_limit_findings(records, profile));

    for (name, record) in &enabled {
        if let Some(entry) = ml.entries_by_name.get(*name) {
            if let Some(min_version) = &entry.minimum_game_version {
                findings.push(Finding {
                    kind: FindingKind::VersionMismatch,
                    severity: Severity::Warning,
                    subjects: vec![record.display_name.clone()],
                    message: format!(
                        "{} declares a minimum game version of {} which may exceed the supplied game version",
                        record.display_name, min_version
                    ),
                    remediation: None,
                });
            }
        }
    }

    sort_findings(&mut findings);
    findings
}

fn display_for(canonical: &str, records: &[ModRecord]) -> String {
    records
        .iter()
        .find(|r| r.name == canonical)
        .map(|r| r.display_name.clone())
        .unwrap_or_else(|| canonical.to_string())
}

/// Like `display_for`, but when a referenced mod isn't in the user's list at
/// all, falls back to the masterlist's own declared spelling rather than the
/// lowercased canonical key.
fn display_for_or_masterlist(canonical: &str, records: &[ModRecord], ml: &MasterlistIndices) -> String {
    if let Some(record) = records.iter().find(|r| r.name == canonical) {
        return record.display_name.clone();
    }
    ml.entries_by_name.get(canonical).map(|e| e.name.clone()).unwrap_or_else(|| canonical.to_string())
}

fn plugin_limit_findings(records: &[ModRecord], profile: &GameProfile) -> Vec<Finding> {
    let mut findings = Vec::new();

    let plugin_subjects =
        enabled_display_names(records, |r| matches!(r.extension, Extension::Plugin | Extension::Master));
    let light_subjects = enabled_display_names(records, |r| r.extension == Extension::Light);
    let plugin_count = plugin_subjects.len();
    let light_count = light_subjects.len();

    if plugin_count > profile.plugin_hard {
        findings.push(Finding {
            kind: FindingKind::PluginLimitPressure,
            severity: Severity::Error,
            subjects: plugin_subjects.clone(),
            message: format!(
                "{plugin_count} enabled plugins/masters exceed the hard limit of {}",
                profile.plugin_hard
            ),
            remediation: None,
        });
    } else if plugin_count > profile.plugin_soft {
        findings.push(Finding {
            kind: FindingKind::PluginLimitPressure,
            severity: Severity::Warning,
            subjects: plugin_subjects.clone(),
            message: format!(
                "{plugin_count} enabled plugins/masters exceed the soft limit of {}",
                profile.plugin_soft
            ),
            remediation: None,
        });
    }

    if light_count > profile.light_hard {
        findings.push(Finding {
            kind: FindingKind::PluginLimitPressure,
            severity: Severity::Error,
            subjects: light_subjects.clone(),
            message: format!("{light_count} enabled light plugins exceed the hard limit of {}", profile.light_hard),
            remediation: None,
        });
    } else if light_count > profile.light_soft {
        findings.push(Finding {
            kind: FindingKind::PluginLimitPressure,
            severity: Severity::Warning,
            subjects: light_subjects.clone(),
            message: format!("{light_count} enabled light plugins exceed the soft limit of {}", profile.light_soft),
            remediation: None,
        });
    }

    findings
}

fn enabled_display_names(records: &[ModRecord], filter: impl Fn(&ModRecord) -> bool) -> Vec<String> {
    let mut names: Vec<String> =
        records.iter().filter(|r| r.enabled && filter(r)).map(|r| r.display_name.clone()).collect();
    names.sort();
    names
}

/// Severity descending (error > warning > info), then first subject
/// lexicographically, then kind. Total and reproducible (spec §4.3).
fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.subjects.first().cmp(&b.subjects.first()))
            .then_with(|| kind_rank(&a.kind).cmp(&kind_rank(&b.kind)))
    });
}

fn kind_rank(kind: &FindingKind) -> u8 {
    match kind {
        FindingKind::Incompatible => 0,
        FindingKind::MissingRequirement => 1,
        FindingKind::LoadOrderViolation => 2,
        FindingKind::DirtyEdit => 3,
        FindingKind::Duplicate => 4,
        FindingKind::PluginLimitPressure => 5,
        FindingKind::VersionMismatch => 6,
        FindingKind::UnknownMod => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRegistry;
    use crate::masterlist::schema::MasterlistDocument;
    use crate::model::MasterlistEntry;
    use crate::normalizer::normalize;

    fn profile() -> GameProfile {
        GameRegistry::default().get("skyrimse").unwrap().clone()
    }

    fn build_ml(entries: Vec<MasterlistEntry>) -> MasterlistIndices {
        crate::masterlist::indices::build(&MasterlistDocument { entries })
    }

    #[test]
    fn missing_requirement_emits_error_when_absent() {
        let ml = build_ml(vec![MasterlistEntry {
            name: "SkyUI.esp".into(),
            requires: vec!["SKSE.esp".into()],
            ..Default::default()
        }]);
        let parsed = normalize("USSEP.esp\nSkyUI.esp");
        let findings = detect(&parsed.records, &parsed.duplicates, &ml, &profile());
        assert!(findings.iter().any(|f| f.kind == FindingKind::MissingRequirement && f.severity == Severity::Error));
    }

    #[test]
    fn missing_requirement_downgrades_when_present_disabled() {
        let ml = build_ml(vec![MasterlistEntry {
            name: "X.esp".into(),
            requires: vec!["Y.esp".into()],
            ..Default::default()
        }]);
        let parsed = normalize("# Y.esp\nX.esp");
        let findings = detect(&parsed.records, &parsed.duplicates, &ml, &profile());
        assert!(findings.iter().any(|f| f.kind == FindingKind::MissingRequirement && f.severity == Severity::Warning));
    }

    #[test]
    fn incompatible_pair_without_patch_is_error() {
        let ml = build_ml(vec![MasterlistEntry {
            name: "Ordinator.esp".into(),
            incompatible_with: vec!["Adamant.esp".into()],
            ..Default::default()
        }]);
        let parsed = normalize("Ordinator.esp\nAdamant.esp");
        let findings = detect(&parsed.records, &parsed.duplicates, &ml, &profile());
        let found = findings.iter().find(|f| f.kind == FindingKind::Incompatible).unwrap();
        assert_eq!(found.severity, Severity::Error);
        assert_eq!(found.subjects, vec!["Adamant.esp".to_string(), "Ordinator.esp".to_string()]);
    }

    #[test]
    fn incompatible_pair_reconciled_by_an_enabled_patch_is_info() {
        let ml = build_ml(vec![MasterlistEntry {
            name: "Ordinator.esp".into(),
            incompatible_with: vec!["Adamant.esp".into()],
            patches: vec![crate::model::PatchRule {
                pair: ("Ordinator.esp".into(), "Adamant.esp".into()),
                name: "Ordinator - Adamant Patch.esp".into(),
            }],
            ..Default::default()
        }]);
        let parsed = normalize("Ordinator.esp\nAdamant.esp\nOrdinator - Adamant Patch.esp");
        let findings = detect(&parsed.records, &parsed.duplicates, &ml, &profile());
        let found = findings.iter().find(|f| f.kind == FindingKind::Incompatible).unwrap();
        assert_eq!(found.severity, Severity::Info);
        assert!(found.message.contains("already reconciled"));
    }

    #[test]
    fn dirty_edit_is_not_suppressed_by_an_unrelated_patch_elsewhere() {
        let ml = build_ml(vec![
            MasterlistEntry { name: "A.esp".into(), dirty: true, ..Default::default() },
            MasterlistEntry {
                name: "B.esp".into(),
                patches: vec![crate::model::PatchRule {
                    pair: ("B.esp".into(), "C.esp".into()),
                    name: "BC Patch.esp".into(),
                }],
                ..Default::default()
            },
        ]);
        let parsed = normalize("A.esp\nB.esp\nBC Patch.esp");
        let findings = detect(&parsed.records, &parsed.duplicates, &ml, &profile());
        assert!(findings.iter().any(|f| f.kind == FindingKind::DirtyEdit));
    }

    #[test]
    fn plugin_limit_pressure_names_the_contributing_mods() {
        let ml = build_ml(vec![]);
        let mut profile = profile();
        profile.plugin_soft = 1;
        profile.plugin_hard = 2;
        let parsed = normalize("A.esp\nB.esp\nC.esp");
        let findings = detect(&parsed.records, &parsed.duplicates, &ml, &profile);
        let found = findings.iter().find(|f| f.kind == FindingKind::PluginLimitPressure).unwrap();
        assert_eq!(found.severity, Severity::Error);
        assert!(!found.subjects.is_empty());
    }

    #[test]
    fn plugin_hard_limit_supersedes_soft_warning() {
        let ml = build_ml(vec![]);
        let mut profile = profile();
        profile.plugin_soft = 2;
        profile.plugin_hard = 3;
        let raw = (0..5).map(|i| format!("Mod{i}.esp")).collect::<Vec<_>>().join("\n");
        let parsed = normalize(&raw);
        let findings = detect(&parsed.records, &parsed.duplicates, &ml, &profile);
        let pressure: Vec<_> = findings.iter().filter(|f| f.kind == FindingKind::PluginLimitPressure).collect();
        assert_eq!(pressure.len(), 1);
        assert_eq!(pressure[0].severity, Severity::Error);
    }
}
