//! Analysis Coordinator (AC): the public entry point orchestrating a
//! single analysis.
//!
//! Grounded on spec §5/§7 verbatim, plus the deadline-handling resolution
//! recorded in DESIGN.md (Open Question 1). Orchestration-with-timeout
//! shape grounded on `hostd/src/main.rs`'s top-level composition, reduced
//! to a single async call chain since there is no server loop to run.

use std::time::Duration;

use tokio::time::{timeout, Instant};
use validator::Validate;

use crate::config::{AnalysisOptions, GameProfile, GameRegistry};
use crate::consolidator;
use crate::detector;
use crate::error::AnalysisError;
use crate::impact;
use crate::masterlist::MasterlistStore;
use crate::model::{AnalysisRequest, CanonicalReport, MasterlistInfo};
use crate::normalizer;
use crate::optimizer;

pub struct AnalysisCoordinator {
    store: MasterlistStore,
    registry: GameRegistry,
}

impl AnalysisCoordinator {
    pub fn new(store: MasterlistStore, registry: GameRegistry) -> Self {
        AnalysisCoordinator { store, registry }
    }

    /// Runs ML -> LN -> {CD, LO, SI} -> RC for one request, honoring the
    /// supplied deadline. `source_unavailable` is the only fatal error from
    /// ML; `deadline_exceeded` carries whatever was completed as `partial`.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        deadline: Duration,
    ) -> Result<CanonicalReport, AnalysisError> {
        let start = Instant::now();

        request
            .validate()
            .map_err(|e| AnalysisError::validation_with_hint("malformed analysis request", e.to_string()))?;
        if let Some(hw) = &request.hardware_profile {
            hw.validate()
                .map_err(|e| AnalysisError::validation_with_hint("malformed hardware profile", e.to_string()))?;
        }

        let profile = self.registry.get(&request.game).ok_or_else(|| {
            AnalysisError::validation_with_hint(
                format!("unknown game: {}", request.game),
                "call SupportedGames() for the known set",
            )
        })?;

        let options = AnalysisOptions::resolve(request.options.as_ref());

        let remaining = deadline.checked_sub(start.elapsed()).unwrap_or(Duration::ZERO);
        let view = match timeout(remaining, self.acquire_view(profile, &request, options.freshness_duration())).await
        {
            Ok(result) => result?,
            Err(_) => return Err(AnalysisError::deadline_exceeded(None)),
        };

        if start.elapsed() >= deadline {
            return Err(AnalysisError::deadline_exceeded(None));
        }

        let normalized = normalizer::normalize(&request.raw_list);

        if start.elapsed() >= deadline {
            // LN completed; a partial report is owed to the caller.
            let partial = self.empty_report(&request.game, &view.version, &normalized, view.degraded);
            return Err(AnalysisError::deadline_exceeded(Some(partial)));
        }

        // CD, LO, and SI each read the same normalized records and indices
        // but write nothing the others depend on, so they run concurrently
        // (spec §4.7/§5) on the blocking pool rather than one after another.
        let records = normalized.records.clone();
        let duplicates = normalized.duplicates.clone();
        let indices = view.indices.clone();
        let profile_owned = profile.clone();
        let hardware_profile = request.hardware_profile.clone();
        let options_owned = options.clone();

        let (findings, suggested_order, impact_report) = {
            let (records_a, indices_a) = (records.clone(), indices.clone());
            let (records_b, indices_b) = (records.clone(), indices.clone());
            let (detect_result, optimize_result, estimate_result) = tokio::join!(
                tokio::task::spawn_blocking(move || detector::detect(
                    &records_a,
                    &duplicates,
                    &indices_a,
                    &profile_owned
                )),
                tokio::task::spawn_blocking(move || optimizer::optimize(&records_b, &indices_b)),
                tokio::task::spawn_blocking(move || impact::estimate(
                    &records,
                    &indices,
                    hardware_profile.as_ref(),
                    &options_owned
                )),
            );
            (
                detect_result.map_err(|e| AnalysisError::internal(e.to_string()))?,
                optimize_result.map_err(|e| AnalysisError::internal(e.to_string()))?,
                estimate_result.map_err(|e| AnalysisError::internal(e.to_string()))?,
            )
        };

        if start.elapsed() >= deadline {
            let partial = self.empty_report(&request.game, &view.version, &normalized, view.degraded);
            return Err(AnalysisError::deadline_exceeded(Some(partial)));
        }

        let report = consolidator::consolidate(
            &request.game,
            &view.version,
            &normalized.records,
            findings,
            suggested_order,
            impact_report,
            &view.indices,
            &options,
            view.degraded,
        );

        Ok(report)
    }

    /// `SupportedGames()`: the registry of games this engine knows
    /// thresholds and a masterlist source for, in no particular order.
    pub fn supported_games(&self) -> Vec<GameProfile> {
        self.registry.all().cloned().collect()
    }

    /// `MasterlistInfo(game)`: reports the cached masterlist's version,
    /// fetch time, and degraded status without triggering a refresh. Returns
    /// `None` if nothing has been loaded for this game yet (no analysis has
    /// run since process start, and no on-disk cache has been consulted).
    pub async fn masterlist_info(&self, game: &str) -> Result<Option<MasterlistInfo>, AnalysisError> {
        if self.registry.get(game).is_none() {
            return Err(AnalysisError::validation_with_hint(
                format!("unknown game: {game}"),
                "call SupportedGames() for the known set",
            ));
        }
        Ok(self.store.current_view(game).await.map(|view| MasterlistInfo {
            version: view.version.clone(),
            fetched_at: view.fetched_at,
            degraded: view.degraded,
        }))
    }

    async fn acquire_view(
        &self,
        profile: &crate::config::GameProfile,
        request: &AnalysisRequest,
        freshness: Duration,
    ) -> Result<std::sync::Arc<crate::masterlist::MasterlistView>, AnalysisError> {
        match request.options.as_ref().and_then(|o| o.masterlist_version.as_deref()) {
            Some(version) => self.store.load_version(profile, version).await,
            None => self.store.load(profile, freshness).await,
        }
    }

    fn empty_report(
        &self,
        game: &str,
        version: &str,
        normalized: &normalizer::NormalizeResult,
        degraded: bool,
    ) -> CanonicalReport {
        use crate::model::{FindingsBySeverity, ImpactReport, ListSummary, SuggestedOrder};
        CanonicalReport {
            game: game.to_string(),
            masterlist_version: version.to_string(),
            list_summary: ListSummary {
                total_entries: normalized.records.len(),
                enabled_entries: normalized.records.iter().filter(|r| r.enabled).count(),
                disabled_entries: normalized.records.iter().filter(|r| !r.enabled).count(),
            },
            findings_by_severity: FindingsBySeverity::default(),
            suggested_order: SuggestedOrder::default(),
            impact_report: ImpactReport::default(),
            warnings_generated: false,
            info_capped: false,
            dropped_info: 0,
            deadline_exceeded: true,
            degraded,
        }
    }
}
