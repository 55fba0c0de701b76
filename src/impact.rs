//! System-Impact Estimator (SI): advisory resource-pressure scoring.
//!
//! Grounded on spec §4.5 verbatim; the weighted-factor scoring shape
//! follows `hostd/src/compatibility_analyzer.rs`'s `calculate_risk_score`
//! and the tag-weight table mirrors
//! `hostd/src/mod_classification.rs`'s `calculate_keyword_score`.

use std::collections::HashMap;

use crate::config::AnalysisOptions;
use crate::masterlist::indices::{tag_weight, MasterlistIndices};
use crate::model::{HardwareProfile, HeaviestEntry, ImpactReport, ModRecord};

pub fn estimate(
    records: &[ModRecord],
    ml: &MasterlistIndices,
    hardware: Option<&HardwareProfile>,
    options: &AnalysisOptions,
) -> ImpactReport {
    let enabled: Vec<&ModRecord> = records.iter().filter(|r| r.enabled).collect();

    let mut total_pressure = 0u32;
    let mut per_tag_pressure: HashMap<String, u32> = HashMap::new();
    let mut weighted: Vec<(String, u32, Vec<String>)> = Vec::new();

    for record in &enabled {
        let entry = ml.entries_by_name.get(&record.name);
        let tags = entry.map(|e| e.tags.clone()).unwrap_or_default();

        // A known masterlist entry's weight is already derived once by
        // `indices::build` (explicit weight, else summed tag weights, 0 for
        // an untagged entry); only a mod absent from the masterlist falls
        // back to the by-extension guess.
        let weight = match entry {
            Some(_) => ml.weight_table.get(&record.name).copied().unwrap_or(0),
            None => default_unknown_weight(record.extension),
        };

        total_pressure += weight;
        for tag in &tags {
            *per_tag_pressure.entry(tag.clone()).or_insert(0) += weight;
        }
        weighted.push((record.display_name.clone(), weight, tags));
    }

    weighted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase())));
    let heaviest = weighted
        .into_iter()
        .take(options.heaviest_n)
        .map(|(name, weight, tags)| HeaviestEntry { name, weight, tags })
        .collect();

    let plugin_count_enabled = enabled
        .iter()
        .filter(|r| matches!(r.extension, crate::model::Extension::Plugin | crate::model::Extension::Master))
        .count();
    let light_plugin_count_enabled =
        enabled.iter().filter(|r| r.extension == crate::model::Extension::Light).count();

    let hardware_pressure = hardware.map(|profile| {
        let numerator =
            (*per_tag_pressure.get("texture").unwrap_or(&0) + *per_tag_pressure.get("enb").unwrap_or(&0)) as f64;
        let ratio = if profile.vram_gb > 0.0 { numerator / profile.vram_gb } else { f64::INFINITY };
        if ratio < 0.5 {
            "ok".to_string()
        } else if ratio < 1.0 {
            "tight".to_string()
        } else {
            "over".to_string()
        }
    });

    ImpactReport {
        total_pressure,
        plugin_count_enabled,
        light_plugin_count_enabled,
        per_tag_pressure,
        heaviest,
        hardware_pressure,
    }
}

fn default_unknown_weight(ext: crate::model::Extension) -> u32 {
    match ext {
        crate::model::Extension::Archive => 0,
        _ => 1,
    }
}
