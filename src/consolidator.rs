//! Result Consolidator (RC): merges CD/LO/SI outputs into the canonical
//! report and applies size policy.
//!
//! Grounded on spec §4.6 verbatim; merge-then-cap shape grounded on
//! `hostd/src/compatibility_analyzer.rs`'s `CompatibilityReport` assembly.

use crate::config::AnalysisOptions;
use crate::masterlist::indices::MasterlistIndices;
use crate::model::{
    CanonicalReport, Finding, FindingsBySeverity, ImpactReport, ListSummary, ModRecord, Severity,
    SuggestedOrder,
};

pub fn consolidate(
    game: &str,
    masterlist_version: &str,
    records: &[ModRecord],
    mut findings: Vec<Finding>,
    suggested_order: SuggestedOrder,
    impact_report: ImpactReport,
    ml: &MasterlistIndices,
    options: &AnalysisOptions,
    degraded: bool,
) -> CanonicalReport {
    attach_patch_notes(&mut findings, ml);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut info = Vec::new();
    for finding in findings {
        match finding.severity {
            Severity::Error => errors.push(finding),
            Severity::Warning => warnings.push(finding),
            Severity::Info => info.push(finding),
        }
    }

    let raw_info_count = info.len();
    let info_capped = raw_info_count > options.info_cap;
    // Tail of the sorted info list drops first (CD emits info already
    // sorted; truncating from the front preserves that ordering).
    if info_capped {
        info.truncate(options.info_cap);
    }
    let dropped_info = raw_info_count - info.len();

    let list_summary = ListSummary {
        total_entries: records.len(),
        enabled_entries: records.iter().filter(|r| r.enabled).count(),
        disabled_entries: records.iter().filter(|r| !r.enabled).count(),
    };

    let warnings_generated = !warnings.is_empty() || !errors.is_empty();

    CanonicalReport {
        game: game.to_string(),
        masterlist_version: masterlist_version.to_string(),
        list_summary,
        findings_by_severity: FindingsBySeverity { errors, warnings, info },
        suggested_order,
        impact_report,
        warnings_generated,
        info_capped,
        dropped_info,
        deadline_exceeded: false,
        degraded,
    }
}

/// CD always pre-fills `suggested_action` with a generic instruction
/// ("install X", "already reconciled") whenever it sets `patch_name`, so
/// gating on a blank `suggested_action` here would never fire. The
/// masterlist entry's own notes (if any) are appended regardless.
fn attach_patch_notes(findings: &mut [Finding], ml: &MasterlistIndices) {
    for finding in findings.iter_mut() {
        if let Some(remediation) = &mut finding.remediation {
            if let Some(patch_name) = &remediation.patch_name {
                if let Some(entry) = ml.entries_by_name.get(&crate::normalizer::canonicalize(patch_name)) {
                    if let Some(notes) = &entry.notes {
                        remediation.suggested_action = match remediation.suggested_action.take() {
                            Some(existing) if !existing.is_empty() => Some(format!("{existing}; {notes}")),
                            _ => Some(notes.clone()),
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masterlist::schema::MasterlistDocument;
    use crate::model::{Finding, FindingKind};

    fn build_ml(entries: Vec<crate::model::MasterlistEntry>) -> MasterlistIndices {
        crate::masterlist::indices::build(&MasterlistDocument { entries })
    }

    fn info_finding(name: &str) -> Finding {
        Finding {
            kind: FindingKind::UnknownMod,
            severity: Severity::Info,
            subjects: vec![name.to_string()],
            message: format!("{name} unknown"),
            remediation: None,
        }
    }

    #[test]
    fn info_findings_are_capped_and_flagged() {
        let ml = build_ml(vec![]);
        let findings: Vec<_> = (0..15).map(|i| info_finding(&format!("mod{i}"))).collect();
        let mut options = AnalysisOptions::default();
        options.info_cap = 12;
        let report = consolidate(
            "skyrimse",
            "v1",
            &[],
            findings,
            SuggestedOrder::default(),
            ImpactReport::default(),
            &ml,
            &options,
            false,
        );
        assert!(report.info_capped);
        assert_eq!(report.findings_by_severity.info.len(), 12);
        assert_eq!(report.dropped_info, 3);
    }

    #[test]
    fn patch_notes_are_appended_even_though_cd_already_filled_suggested_action() {
        let ml = build_ml(vec![crate::model::MasterlistEntry {
            name: "Patch.esp".into(),
            notes: Some("load after both masters".to_string()),
            ..Default::default()
        }]);
        let findings = vec![Finding {
            kind: FindingKind::Incompatible,
            severity: Severity::Error,
            subjects: vec!["A.esp".to_string(), "B.esp".to_string()],
            message: "A.esp and B.esp are incompatible".to_string(),
            remediation: Some(crate::model::Remediation {
                patch_name: Some("Patch.esp".to_string()),
                url_reference: None,
                suggested_action: Some("install Patch.esp".to_string()),
            }),
        }];
        let report = consolidate(
            "skyrimse",
            "v1",
            &[],
            findings,
            SuggestedOrder::default(),
            ImpactReport::default(),
            &ml,
            &AnalysisOptions::default(),
            false,
        );
        let action = report.findings_by_severity.errors[0].remediation.as_ref().unwrap().suggested_action.clone();
        assert_eq!(action, Some("install Patch.esp; load after both masters".to_string()));
    }

    #[test]
    fn errors_and_warnings_are_never_capped() {
        let ml = build_ml(vec![]);
        let mut findings = vec![info_finding("a")];
        findings.push(Finding {
            kind: FindingKind::MissingRequirement,
            severity: Severity::Error,
            subjects: vec!["b".to_string()],
            message: "missing".to_string(),
            remediation: None,
        });
        let report = consolidate(
            "skyrimse",
            "v1",
            &[],
            findings,
            SuggestedOrder::default(),
            ImpactReport::default(),
            &ml,
            &AnalysisOptions::default(),
            false,
        );
        assert_eq!(report.findings_by_severity.errors.len(), 1);
        assert!(!report.info_capped);
    }
}
