//! Fixed options record with documented defaults, plus the per-game
//! threshold table.
//!
//! Grounded on `hostd/src/config.rs`'s `Config::load`/env-driven
//! construction with hand-written defaults; game ids grounded on
//! `Ortham-libloadorder/src/enums.rs`'s `GameId`.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::model::AnalysisOverrides;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub info_cap: usize,
    pub freshness_window_days: u32,
    pub heaviest_n: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions { info_cap: 12, freshness_window_days: 7, heaviest_n: 10 }
    }
}

impl AnalysisOptions {
    /// Loads defaults, then applies environment overrides, then applies
    /// per-request overrides (request wins over env, env wins over default).
    pub fn resolve(overrides: Option<&AnalysisOverrides>) -> Self {
        let mut opts = Self::from_env();
        if let Some(o) = overrides {
            if let Some(v) = o.info_cap {
                opts.info_cap = v;
            }
            if let Some(v) = o.freshness_window_days {
                opts.freshness_window_days = v;
            }
            if let Some(v) = o.heaviest_n {
                opts.heaviest_n = v;
            }
        }
        opts
    }

    /// `freshness_window_days` as a `Duration`, for the Masterlist Store's
    /// freshness comparison.
    pub fn freshness_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.freshness_window_days) * 24 * 60 * 60)
    }

    fn from_env() -> Self {
        let default = Self::default();
        AnalysisOptions {
            info_cap: env_usize("ANALYSIS_INFO_CAP").unwrap_or(default.info_cap),
            freshness_window_days: env_u32("MASTERLIST_FRESHNESS_DAYS")
                .unwrap_or(default.freshness_window_days),
            heaviest_n: env_usize("ANALYSIS_HEAVIEST_N").unwrap_or(default.heaviest_n),
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Where on disk masterlist caches live. Defaults to `./cache` when
/// `CACHE_ROOT` is unset, matching the teacher's pattern of a sane local
/// default for every path-shaped config value.
pub fn cache_root() -> std::path::PathBuf {
    env::var("CACHE_ROOT").map(std::path::PathBuf::from).unwrap_or_else(|_| std::path::PathBuf::from("cache"))
}

/// Per-game plugin/light thresholds and upstream masterlist URL template.
#[derive(Debug, Clone)]
pub struct GameProfile {
    pub id: &'static str,
    pub display_name: &'static str,
    pub masterlist_url: &'static str,
    pub plugin_soft: usize,
    pub plugin_hard: usize,
    pub light_soft: usize,
    pub light_hard: usize,
}

#[derive(Debug, Clone)]
pub struct GameRegistry {
    profiles: HashMap<&'static str, GameProfile>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        for p in default_profiles() {
            profiles.insert(p.id, p);
        }
        GameRegistry { profiles }
    }
}

impl GameRegistry {
    pub fn get(&self, game: &str) -> Option<&GameProfile> {
        self.profiles.get(game)
    }

    pub fn all(&self) -> impl Iterator<Item = &GameProfile> {
        self.profiles.values()
    }
}

fn default_profiles() -> Vec<GameProfile> {
    // Skyrim Special Edition carries the spec's documented reference
    // defaults (§4.3). Earlier titles predate the light-plugin format, so
    // their light thresholds mirror the regular-plugin thresholds.
    vec![
        GameProfile {
            id: "morrowind",
            display_name: "Morrowind",
            masterlist_url: "https://masterlists.example/morrowind.yaml",
            plugin_soft: 220,
            plugin_hard: 255,
            light_soft: 220,
            light_hard: 255,
        },
        GameProfile {
            id: "oblivion",
            display_name: "Oblivion",
            masterlist_url: "https://masterlists.example/oblivion.yaml",
            plugin_soft: 220,
            plugin_hard: 255,
            light_soft: 220,
            light_hard: 255,
        },
        GameProfile {
            id: "skyrim",
            display_name: "Skyrim",
            masterlist_url: "https://masterlists.example/skyrim.yaml",
            plugin_soft: 220,
            plugin_hard: 255,
            light_soft: 220,
            light_hard: 255,
        },
        GameProfile {
            id: "skyrimse",
            display_name: "Skyrim Special Edition",
            masterlist_url: "https://masterlists.example/skyrimse.yaml",
            plugin_soft: 220,
            plugin_hard: 250,
            light_soft: 3500,
            light_hard: 4000,
        },
        GameProfile {
            id: "fallout3",
            display_name: "Fallout 3",
            masterlist_url: "https://masterlists.example/fallout3.yaml",
            plugin_soft: 220,
            plugin_hard: 255,
            light_soft: 220,
            light_hard: 255,
        },
        GameProfile {
            id: "falloutnv",
            display_name: "Fallout: New Vegas",
            masterlist_url: "https://masterlists.example/falloutnv.yaml",
            plugin_soft: 220,
            plugin_hard: 255,
            light_soft: 220,
            light_hard: 255,
        },
        GameProfile {
            id: "fallout4",
            display_name: "Fallout 4",
            masterlist_url: "https://masterlists.example/fallout4.yaml",
            plugin_soft: 220,
            plugin_hard: 250,
            light_soft: 3500,
            light_hard: 4000,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_documented_defaults() {
        let opts = AnalysisOptions::default();
        assert_eq!(opts.info_cap, 12);
        assert_eq!(opts.freshness_window_days, 7);
        assert_eq!(opts.heaviest_n, 10);
    }

    #[test]
    fn registry_knows_skyrimse_thresholds() {
        let registry = GameRegistry::default();
        let profile = registry.get("skyrimse").unwrap();
        assert_eq!(profile.plugin_soft, 220);
        assert_eq!(profile.plugin_hard, 250);
        assert_eq!(profile.light_soft, 3500);
        assert_eq!(profile.light_hard, 4000);
    }

    #[test]
    fn unknown_game_is_absent() {
        let registry = GameRegistry::default();
        assert!(registry.get("starfield").is_none());
    }
}
