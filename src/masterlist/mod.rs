//! Masterlist Store (ML): versioned, cached, read-only masterlist access.
//!
//! Grounded on spec §4.1/§6 for algorithm and on-disk layout; the
//! refresh-then-swap concurrency shape is grounded on the teacher's
//! `core/caching.rs` `Cache`/`CacheManager` pairing (single-writer lock per
//! key, readers never block on a refresh in flight).

pub mod indices;
pub mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::GameProfile;
use crate::error::AnalysisError;

use self::indices::MasterlistIndices;
use self::schema::MasterlistDocument;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    version: String,
    fetched_at: DateTime<Utc>,
    etag: Option<String>,
}

/// An immutable, shareable snapshot of one game's masterlist data plus its
/// derived indices. Readers clone the `Arc`, never the data.
#[derive(Debug, Clone)]
pub struct MasterlistView {
    pub version: String,
    pub fetched_at: DateTime<Utc>,
    pub degraded: bool,
    pub indices: Arc<MasterlistIndices>,
}

pub struct MasterlistStore {
    cache_root: PathBuf,
    http: reqwest::Client,
    cache: Cache<String, Arc<MasterlistView>>,
    // One refresh in flight per game at a time; readers never block on it,
    // they just keep serving the Arc they already hold.
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl MasterlistStore {
    pub fn new(cache_root: PathBuf) -> Self {
        MasterlistStore {
            cache_root,
            http: reqwest::Client::new(),
            cache: Cache::new(),
            locks: RwLock::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, game: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(game) {
            return lock.clone();
        }
        let mut locks = self.locks.write().await;
        locks.entry(game.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn game_dir(&self, game: &str) -> PathBuf {
        self.cache_root.join("masterlists").join(game)
    }

    /// Returns whatever view is currently cached for a game, fresh or
    /// degraded, without triggering a fetch. Backs `MasterlistInfo`.
    pub async fn current_view(&self, game: &str) -> Option<Arc<MasterlistView>> {
        self.cache.get_stale(&game.to_string()).await
    }

    /// Returns a cached view if fresh, otherwise fetches and replaces it.
    /// `freshness` is the caller's resolved freshness window (spec §6
    /// `freshness_window_days`, per-request overridable) — both the
    /// in-memory hit check and the on-disk staleness check below are judged
    /// against it, not a value fixed at construction time.
    /// Fails with `source_unavailable` only when neither path yields data.
    pub async fn load(
        &self,
        profile: &GameProfile,
        freshness: Duration,
    ) -> Result<Arc<MasterlistView>, AnalysisError> {
        if let Some(view) = self.cache.get(&profile.id.to_string()).await {
            debug!(game = profile.id, version = %view.version, "masterlist cache hit");
            return Ok(view);
        }

        if let Some(view) = self.load_disk_cache(profile.id, None).await {
            let elapsed = elapsed_since(view.fetched_at);
            if elapsed < freshness {
                debug!(game = profile.id, version = %view.version, "masterlist served from fresh on-disk cache");
                let view = Arc::new(view);
                self.cache.put(profile.id.to_string(), view.clone(), freshness - elapsed).await;
                return Ok(view);
            }
            debug!(game = profile.id, version = %view.version, "on-disk masterlist cache is stale, refreshing");
        } else {
            debug!(game = profile.id, "masterlist cache miss, refreshing");
        }

        self.refresh(profile, freshness).await
    }

    /// Forces re-download, falling back to the last cached view (marked
    /// degraded) if the fetch or parse fails.
    pub async fn refresh(
        &self,
        profile: &GameProfile,
        freshness: Duration,
    ) -> Result<Arc<MasterlistView>, AnalysisError> {
        let lock = self.lock_for(profile.id).await;
        let _guard = lock.lock().await;

        // A concurrent refresh may have already completed while this task
        // waited for the lock.
        if let Some(view) = self.cache.get(&profile.id.to_string()).await {
            return Ok(view);
        }

        match self.fetch_and_parse(profile).await {
            Ok(view) => {
                if let Err(e) = self.persist(profile.id, &view).await {
                    warn!(game = profile.id, error = %e, "failed to persist masterlist cache");
                }
                let view = Arc::new(view);
                self.cache.put(profile.id.to_string(), view.clone(), freshness).await;
                Ok(view)
            }
            Err(fetch_err) => {
                if let Some(mut degraded) = self.load_disk_cache(profile.id, None).await {
                    warn!(game = profile.id, error = %fetch_err, "refresh failed, serving degraded cache");
                    degraded.degraded = true;
                    let view = Arc::new(degraded);
                    // Zero TTL: the next `load()` retries the fetch instead
                    // of serving the degraded view as if it were healthy.
                    self.cache.put(profile.id.to_string(), view.clone(), Duration::ZERO).await;
                    Ok(view)
                } else {
                    Err(AnalysisError::source_unavailable(
                        format!("masterlist for {} is unavailable", profile.id),
                        fetch_err,
                    ))
                }
            }
        }
    }

    pub async fn list_versions(&self, profile: &GameProfile) -> Vec<String> {
        let dir = self.game_dir(profile.id).join("versions");
        let mut versions = Vec::new();
        if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(stripped) = name.strip_suffix(".document") {
                        versions.push(stripped.to_string());
                    }
                }
            }
        }
        versions.sort();
        versions
    }

    pub async fn load_version(
        &self,
        profile: &GameProfile,
        version: &str,
    ) -> Result<Arc<MasterlistView>, AnalysisError> {
        if let Some(view) = self.load_disk_cache(profile.id, Some(version)).await {
            return Ok(Arc::new(view));
        }
        Err(AnalysisError::source_unavailable(
            format!("masterlist version {version} for {} is unavailable", profile.id),
            "versions/<version>.document not found",
        ))
    }

    async fn fetch_and_parse(&self, profile: &GameProfile) -> Result<MasterlistView, String> {
        let response = self
            .http
            .get(profile.masterlist_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let text = response.text().await.map_err(|e| e.to_string())?;

        let doc: MasterlistDocument = schema::parse_and_validate(&text).map_err(|e| e.to_string())?;
        let version = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let idx = indices::build(&doc);

        info!(game = profile.id, version = %version, entries = doc.entries.len(), "masterlist refreshed");

        Ok(MasterlistView {
            version,
            fetched_at: Utc::now(),
            degraded: false,
            indices: Arc::new(idx),
        })
    }

    async fn persist(&self, game: &str, view: &MasterlistView) -> std::io::Result<()> {
        let dir = self.game_dir(game);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::create_dir_all(dir.join("versions")).await?;

        let document = self.rebuild_document(view);
        let serialized = serde_yaml::to_string(&document).unwrap_or_default();

        let tmp = dir.join("current.document.tmp");
        tokio::fs::write(&tmp, &serialized).await?;
        tokio::fs::rename(&tmp, dir.join("current.document")).await?;

        let meta = CacheMeta { version: view.version.clone(), fetched_at: view.fetched_at, etag: None };
        let meta_tmp = dir.join("current.meta.tmp");
        tokio::fs::write(&meta_tmp, serde_json::to_vec(&meta).unwrap_or_default()).await?;
        tokio::fs::rename(&meta_tmp, dir.join("current.meta")).await?;

        let versioned_tmp = dir.join(format!("versions/{}.document.tmp", view.version));
        tokio::fs::write(&versioned_tmp, &serialized).await?;
        tokio::fs::rename(&versioned_tmp, dir.join(format!("versions/{}.document", view.version))).await?;

        Ok(())
    }

    fn rebuild_document(&self, view: &MasterlistView) -> MasterlistDocument {
        MasterlistDocument { entries: view.indices.entries_by_name.values().cloned().collect() }
    }

    async fn load_disk_cache(&self, game: &str, version: Option<&str>) -> Option<MasterlistView> {
        let dir = self.game_dir(game);
        let (doc_path, meta_path) = match version {
            Some(v) => (dir.join(format!("versions/{v}.document")), None),
            None => (dir.join("current.document"), Some(dir.join("current.meta"))),
        };

        let text = tokio::fs::read_to_string(&doc_path).await.ok()?;
        let doc = schema::parse_and_validate(&text).ok()?;
        let idx = indices::build(&doc);

        let (version, fetched_at) = if let Some(meta_path) = meta_path {
            match tokio::fs::read(&meta_path).await.ok().and_then(|b| serde_json::from_slice::<CacheMeta>(&b).ok()) {
                Some(meta) => (meta.version, meta.fetched_at),
                None => ("unknown".to_string(), Utc::now()),
            }
        } else {
            (version.unwrap_or("unknown").to_string(), Utc::now())
        };

        Some(MasterlistView { version, fetched_at, degraded: false, indices: Arc::new(idx) })
    }
}

/// Wall-clock age of a timestamp, clamped to zero for clock skew (a
/// `fetched_at` that is slightly in the future reads as "just fetched"
/// rather than underflowing).
fn elapsed_since(fetched_at: DateTime<Utc>) -> Duration {
    Utc::now().signed_duration_since(fetched_at).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRegistry;
    use crate::masterlist::schema::MasterlistDocument;
    use crate::model::MasterlistEntry;

    fn profile() -> GameProfile {
        GameRegistry::default().get("skyrimse").unwrap().clone()
    }

    async fn write_disk_cache(cache_root: &std::path::Path, fetched_at: DateTime<Utc>) {
        let dir = cache_root.join("masterlists").join("skyrimse");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let doc = MasterlistDocument { entries: vec![MasterlistEntry { name: "A.esp".into(), ..Default::default() }] };
        tokio::fs::write(dir.join("current.document"), serde_yaml::to_string(&doc).unwrap()).await.unwrap();
        let meta = CacheMeta { version: "disk-1".to_string(), fetched_at, etag: None };
        tokio::fs::write(dir.join("current.meta"), serde_json::to_vec(&meta).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn fresh_disk_cache_is_served_without_being_marked_degraded() {
        let tmp = tempfile::tempdir().unwrap();
        write_disk_cache(tmp.path(), Utc::now()).await;

        let store = MasterlistStore::new(tmp.path().to_path_buf());
        let view = store.load(&profile(), Duration::from_secs(60 * 60 * 24 * 7)).await.unwrap();
        assert_eq!(view.version, "disk-1");
        assert!(!view.degraded);
    }

    #[tokio::test]
    async fn stale_disk_cache_falls_through_to_a_network_refresh_attempt() {
        let tmp = tempfile::tempdir().unwrap();
        write_disk_cache(tmp.path(), Utc::now() - chrono::Duration::days(30)).await;

        let store = MasterlistStore::new(tmp.path().to_path_buf());
        // The fetch fails (unreachable placeholder URL), so the stale entry
        // is still what comes back, but now correctly marked degraded.
        let view = store.load(&profile(), Duration::from_secs(60 * 60 * 24 * 7)).await.unwrap();
        assert_eq!(view.version, "disk-1");
        assert!(view.degraded);
    }
}
