// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Render cache and request coalescing.
//!
//! Two maps, both keyed by the case-folded username: a TTL cache of finished badges and
//! a pending map holding the shared outcome channel of the single in-flight render for
//! that key. Renders run in a spawned task so they settle even if every waiting request
//! disconnects; a drop guard clears the pending registration on any exit path.
//!
//! Locks are `std::sync::Mutex` held only for map access, never across an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;

use crate::avatar::AvatarFetcher;
use crate::model::{RecommendationRow, RenderedBadge};
use crate::render::render_badge;
use crate::store::StoreError;

pub const CACHE_TTL: Duration = Duration::from_secs(300);

/// Failure observed by every caller coalesced onto one render. Cloned across waiters,
/// so it carries messages rather than source errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// The storage row fetch failed.
    Storage(String),
    /// The render task settled without producing an outcome (task panic or shutdown).
    Aborted,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(message) => write!(f, "storage query failed: {message}"),
            Self::Aborted => write!(f, "render task aborted before settling"),
        }
    }
}

impl std::error::Error for RenderFailure {}

type RenderOutcome = Result<RenderedBadge, RenderFailure>;

struct CacheEntry {
    badge: RenderedBadge,
    expires_at: Instant,
}

/// Process-wide badge cache plus coalescer. Owned by the composition root and shared
/// via `Arc`; a restart simply starts empty.
pub struct BadgeCache {
    fetcher: AvatarFetcher,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    pending: Mutex<HashMap<String, watch::Receiver<Option<RenderOutcome>>>>,
}

impl BadgeCache {
    pub fn new(fetcher: AvatarFetcher) -> Self {
        Self::with_ttl(fetcher, CACHE_TTL)
    }

    pub fn with_ttl(fetcher: AvatarFetcher, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            entries: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached badge for `username`, or renders it exactly once no matter
    /// how many callers arrive concurrently.
    ///
    /// `fetch_rows` supplies the recommendation rows; it is only invoked on a cache
    /// miss with no render already in flight. The started render runs to completion
    /// and all coalesced callers observe its outcome, success or failure alike.
    pub async fn get_or_render<F, Fut>(
        self: &Arc<Self>,
        username: &str,
        fetch_rows: F,
    ) -> RenderOutcome
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<RecommendationRow>, StoreError>> + Send + 'static,
    {
        let key = cache_key(username);

        if let Some(badge) = self.cached(&key) {
            tracing::debug!(username, "badge cache hit");
            return Ok(badge);
        }

        let mut outcome_rx = self.subscribe_or_spawn(&key, username, fetch_rows);

        loop {
            if let Some(outcome) = outcome_rx.borrow_and_update().clone() {
                return outcome;
            }
            if outcome_rx.changed().await.is_err() {
                return Err(RenderFailure::Aborted);
            }
        }
    }

    /// Synchronously drops `username`'s cached badge so the next request recomputes.
    /// The pending map is left alone: an in-flight render still settles normally.
    pub fn invalidate(&self, username: &str) {
        let key = cache_key(username);
        let removed = self
            .entries
            .lock()
            .map(|mut entries| entries.remove(&key).is_some())
            .unwrap_or(false);
        if removed {
            tracing::info!(username, "badge cache invalidated");
        }
    }

    fn cached(&self, key: &str) -> Option<RenderedBadge> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if Instant::now() < entry.expires_at {
            Some(entry.badge.clone())
        } else {
            None
        }
    }

    /// Joins the in-flight render for `key` if one exists, otherwise registers one and
    /// spawns its task. Registration and lookup happen under one lock so a second
    /// leader can never slip in.
    fn subscribe_or_spawn<F, Fut>(
        self: &Arc<Self>,
        key: &str,
        username: &str,
        fetch_rows: F,
    ) -> watch::Receiver<Option<RenderOutcome>>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<RecommendationRow>, StoreError>> + Send + 'static,
    {
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(rx) = pending.get(key) {
            tracing::debug!(username, "joining in-flight badge render");
            return rx.clone();
        }

        let (tx, rx) = watch::channel(None);
        pending.insert(key.to_owned(), rx.clone());
        drop(pending);

        tracing::info!(username, "starting badge render");
        let cache = Arc::clone(self);
        let key = key.to_owned();
        let username = username.to_owned();
        tokio::spawn(async move {
            let guard = PendingGuard { cache: &cache, key: &key };

            let outcome = cache.render_once(&username, fetch_rows).await;
            if let Ok(badge) = &outcome {
                cache.insert(&key, badge.clone());
            }

            // Clear the registration before fanning out, so no late joiner can observe
            // a settled-but-still-pending render.
            drop(guard);
            let _ = tx.send(Some(outcome));
        });

        rx
    }

    async fn render_once<F, Fut>(&self, username: &str, fetch_rows: F) -> RenderOutcome
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Vec<RecommendationRow>, StoreError>>,
    {
        let rows = fetch_rows(username.to_owned())
            .await
            .map_err(|err| RenderFailure::Storage(err.to_string()))?;

        let last_modified_ms = rows
            .iter()
            .map(RecommendationRow::created_at_millis)
            .max()
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let svg = render_badge(username, &rows, &self.fetcher).await;
        tracing::info!(username, rows = rows.len(), "badge render complete");

        Ok(RenderedBadge { svg, last_modified_ms })
    }

    fn insert(&self, key: &str, badge: RenderedBadge) {
        let entry = CacheEntry { badge, expires_at: Instant::now() + self.ttl };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_owned(), entry);
        }
    }
}

fn cache_key(username: &str) -> String {
    username.to_lowercase()
}

/// Removes the pending registration when the render settles, on every exit path
/// including a panic inside the render future.
struct PendingGuard<'a> {
    cache: &'a BadgeCache,
    key: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pending = match self.cache.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.remove(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::{BadgeCache, RenderFailure};
    use crate::avatar::AvatarFetcher;
    use crate::model::RecommendationRow;
    use crate::store::StoreError;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_cache() -> Arc<BadgeCache> {
        let fetcher =
            AvatarFetcher::new("http://127.0.0.1:9", Duration::from_millis(100)).expect("fetcher");
        Arc::new(BadgeCache::new(fetcher))
    }

    fn sample_rows() -> Vec<RecommendationRow> {
        vec![RecommendationRow {
            recommender_username: Some("alice".to_owned()),
            recommender_name: Some("Alice".to_owned()),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
            recommendation_text: Some("dependable teammate".to_owned()),
        }]
    }

    #[tokio::test]
    async fn cache_hit_returns_identical_markup_without_refetching() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_first = Arc::clone(&calls);
        let first = cache
            .get_or_render("Octocat", move |_| async move {
                calls_first.fetch_add(1, Ordering::SeqCst);
                Ok(sample_rows())
            })
            .await
            .expect("first render");

        let calls_second = Arc::clone(&calls);
        let second = cache
            .get_or_render("octocat", move |_| async move {
                calls_second.fetch_add(1, Ordering::SeqCst);
                Ok(sample_rows())
            })
            .await
            .expect("cached render");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.svg, second.svg);
        assert_eq!(first.last_modified_ms, second.last_modified_ms);
    }

    #[tokio::test]
    async fn concurrent_requests_coalesce_into_one_fetch() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_render("octocat", move |_| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Hold the render open long enough for every caller to pile on.
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(sample_rows())
                    })
                    .await
            }));
        }

        let mut badges = Vec::new();
        for handle in handles {
            badges.push(handle.await.expect("join").expect("render"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let reference = &badges[0];
        assert!(badges.iter().all(|b| b.svg == reference.svg));
    }

    #[tokio::test]
    async fn failure_fans_out_to_all_waiters_and_is_not_cached() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_render("octocat", move |_| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<Vec<_>, _>(StoreError::Query("disk on fire".to_owned()))
                    })
                    .await
            }));
        }

        for handle in handles {
            let err = handle.await.expect("join").expect_err("must fail");
            assert_eq!(err, RenderFailure::Storage("query failed: disk on fire".to_owned()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The failure must not have been cached: the next call fetches again.
        let retry_calls = Arc::new(AtomicUsize::new(0));
        let retry_counter = Arc::clone(&retry_calls);
        cache
            .get_or_render("octocat", move |_| async move {
                retry_counter.fetch_add(1, Ordering::SeqCst);
                Ok(sample_rows())
            })
            .await
            .expect("recovers after failure");
        assert_eq!(retry_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_recompute() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            cache
                .get_or_render("octocat", move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_rows())
                })
                .await
                .expect("render");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("OCTOCAT");

        let calls_after = Arc::clone(&calls);
        cache
            .get_or_render("octocat", move |_| async move {
                calls_after.fetch_add(1, Ordering::SeqCst);
                Ok(sample_rows())
            })
            .await
            .expect("render after invalidation");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_recomputed() {
        let fetcher =
            AvatarFetcher::new("http://127.0.0.1:9", Duration::from_millis(100)).expect("fetcher");
        let cache = Arc::new(BadgeCache::with_ttl(fetcher, Duration::from_millis(20)));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            cache
                .get_or_render("octocat", move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_rows())
                })
                .await
                .expect("render");
            tokio::time::sleep(Duration::from_millis(40)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_rows_use_render_time_as_last_modified() {
        let cache = test_cache();
        let before = chrono::Utc::now().timestamp_millis();
        let badge = cache
            .get_or_render("octocat", |_| async { Ok(Vec::new()) })
            .await
            .expect("render");
        let after = chrono::Utc::now().timestamp_millis();
        assert!(badge.last_modified_ms >= before && badge.last_modified_ms <= after);
    }

    #[tokio::test]
    async fn last_modified_is_newest_row() {
        let cache = test_cache();
        let rows = sample_rows();
        let expected = rows[0].created_at_millis();
        let badge = cache
            .get_or_render("octocat", move |_| async move { Ok(rows) })
            .await
            .expect("render");
        assert_eq!(badge.last_modified_ms, expected);
    }
}
