//! Shared data types that cross component boundaries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// File-class of a mod entry, determined by filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extension {
    Plugin,
    Master,
    Light,
    Archive,
    Unknown,
}

impl Extension {
    pub fn from_filename(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".esm") {
            Extension::Master
        } else if lower.ends_with(".esl") {
            Extension::Light
        } else if lower.ends_with(".esp") {
            Extension::Plugin
        } else if lower.ends_with(".bsa") || lower.ends_with(".ba2") {
            Extension::Archive
        } else {
            Extension::Unknown
        }
    }
}

/// One entry in a user-supplied mod list, produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    /// Canonical (lowercased, separator-normalized) name, used for all lookups.
    pub name: String,
    /// Original-case name as it appeared in the input, kept for display.
    pub display_name: String,
    pub extension: Extension,
    pub enabled: bool,
    pub position: usize,
    pub raw: String,
}

/// A version → patch-name table keyed by an unordered pair, stored canonically.
pub type PatchMap = HashMap<(String, String), String>;

/// One entry in the masterlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterlistEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub incompatible_with: Vec<String>,
    #[serde(default)]
    pub load_after: Vec<String>,
    #[serde(default)]
    pub patches: Vec<PatchRule>,
    #[serde(default)]
    pub dirty: bool,
    pub weight: Option<u32>,
    pub notes: Option<String>,
    pub minimum_game_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRule {
    pub pair: (String, String),
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    // Ord: Info < Warning < Error, so sorting descending needs a reverse key.
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Incompatible,
    MissingRequirement,
    LoadOrderViolation,
    DirtyEdit,
    Duplicate,
    PluginLimitPressure,
    VersionMismatch,
    UnknownMod,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Remediation {
    pub patch_name: Option<String>,
    pub url_reference: Option<String>,
    pub suggested_action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub subjects: Vec<String>,
    pub message: String,
    pub remediation: Option<Remediation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DroppedEdge {
    pub later: String,
    pub earlier: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestedOrder {
    pub order: Vec<String>,
    pub dropped_edges: Vec<DroppedEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaviestEntry {
    pub name: String,
    pub weight: u32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactReport {
    pub total_pressure: u32,
    pub plugin_count_enabled: usize,
    pub light_plugin_count_enabled: usize,
    pub per_tag_pressure: HashMap<String, u32>,
    pub heaviest: Vec<HeaviestEntry>,
    pub hardware_pressure: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsBySeverity {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub info: Vec<Finding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSummary {
    pub total_entries: usize,
    pub enabled_entries: usize,
    pub disabled_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterlistInfo {
    pub version: String,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalReport {
    pub game: String,
    pub masterlist_version: String,
    pub list_summary: ListSummary,
    pub findings_by_severity: FindingsBySeverity,
    pub suggested_order: SuggestedOrder,
    pub impact_report: ImpactReport,
    pub warnings_generated: bool,
    pub info_capped: bool,
    pub dropped_info: usize,
    pub deadline_exceeded: bool,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, validator::Validate)]
pub struct HardwareProfile {
    #[validate(length(min = 1))]
    pub tier: String,
    #[validate(range(min = 0.0))]
    pub vram_gb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOverrides {
    pub info_cap: Option<usize>,
    pub freshness_window_days: Option<u32>,
    pub heaviest_n: Option<usize>,
    pub masterlist_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, validator::Validate)]
pub struct AnalysisRequest {
    pub raw_list: String,
    #[validate(length(min = 1))]
    pub game: String,
    pub hardware_profile: Option<HardwareProfile>,
    pub options: Option<AnalysisOverrides>,
}
