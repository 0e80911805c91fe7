//! Leaderboard read cache
//!
//! Holds the global top list and the connected player's recent history as
//! fetched from the ledger. A failed refresh keeps the previous view and
//! records a classified error. Concurrent refreshes of one projection
//! coalesce into the running fetch plus at most one trailing re-run.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::chain::{Address, ChainClient, ClientPool, LeaderboardEntry, LeaderboardScope, RuntimeConfig};
use crate::consts::*;
use crate::error::{ChainError, ReadError};
use crate::platform;
use crate::submission::LeaderboardRefresh;

/// Sorted projection of ledger rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaderboardView {
    pub entries: Vec<LeaderboardEntry>,
    /// Wall time of the last successful fetch (ms since epoch)
    pub fetched_at_ms: f64,
    /// Cleared by invalidation; set by a successful fetch
    pub valid: bool,
}

impl LeaderboardView {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best score on the board (if any)
    pub fn top_score(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.score).max()
    }

    /// Check if a score would make the global board
    pub fn qualifies(&self, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < GLOBAL_TOP_N {
            return true;
        }
        // A new row is the newest, so it sorts ahead of equal scores
        self.entries.last().map(|e| score >= e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u32) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score >= e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }
}

/// Score desc, then newest first, then ledger order
pub fn global_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.timestamp.cmp(&a.timestamp))
        .then(a.sequence.cmp(&b.sequence))
}

/// Oldest first, then ledger order
pub fn player_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then(a.sequence.cmp(&b.sequence))
}

/// Sort and cap rows for a projection
pub fn project(scope: LeaderboardScope, mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    match scope {
        LeaderboardScope::Global => {
            entries.sort_by(global_order);
            entries.truncate(GLOBAL_TOP_N);
        }
        LeaderboardScope::Player(_) => {
            entries.sort_by(player_order);
            // Keep the most recent rows
            let excess = entries.len().saturating_sub(PLAYER_RECENT_N);
            entries.drain(..excess);
        }
    }
    entries
}

/// Result of a refresh call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This call ran the fetch (plus any re-run queued meanwhile)
    Completed(Result<(), ReadError>),
    /// Folded into a refresh already in flight
    Coalesced,
}

#[derive(Debug, Default)]
struct Slot {
    view: LeaderboardView,
    error: Option<ReadError>,
    in_flight: bool,
    rerun_queued: bool,
}

pub struct LeaderboardCache<C> {
    pool: Rc<ClientPool<C>>,
    config: Rc<RuntimeConfig>,
    slots: RefCell<HashMap<LeaderboardScope, Slot>>,
    now: fn() -> f64,
}

impl<C: ChainClient + 'static> LeaderboardCache<C> {
    pub fn new(pool: Rc<ClientPool<C>>, config: Rc<RuntimeConfig>) -> Self {
        Self {
            pool,
            config,
            slots: RefCell::new(HashMap::new()),
            now: platform::now_ms,
        }
    }

    /// Replace the wall clock used to stamp fetches
    pub fn with_clock(mut self, now: fn() -> f64) -> Self {
        self.now = now;
        self
    }

    pub fn view(&self, scope: LeaderboardScope) -> LeaderboardView {
        self.slots
            .borrow()
            .get(&scope)
            .map(|s| s.view.clone())
            .unwrap_or_default()
    }

    /// Error from the most recent refresh, cleared by the next success
    pub fn error(&self, scope: LeaderboardScope) -> Option<ReadError> {
        self.slots.borrow().get(&scope).and_then(|s| s.error.clone())
    }

    pub fn global(&self) -> LeaderboardView {
        self.view(LeaderboardScope::Global)
    }

    pub fn player(&self, player: Address) -> LeaderboardView {
        self.view(LeaderboardScope::Player(player))
    }

    /// Mark every projection stale
    pub fn invalidate(&self) {
        for slot in self.slots.borrow_mut().values_mut() {
            slot.view.valid = false;
        }
    }

    /// Stale, never fetched, or older than the auto-refresh period
    pub fn needs_refresh(&self, scope: LeaderboardScope, now_ms: f64) -> bool {
        match self.slots.borrow().get(&scope) {
            Some(slot) => {
                !slot.view.valid || now_ms - slot.view.fetched_at_ms >= AUTO_REFRESH_MS
            }
            None => true,
        }
    }

    pub async fn refresh_global(&self) -> RefreshOutcome {
        self.refresh(LeaderboardScope::Global).await
    }

    pub async fn refresh_for_player(&self, player: Address) -> RefreshOutcome {
        self.refresh(LeaderboardScope::Player(player)).await
    }

    /// Leaderboard panel opened: refresh both projections
    pub async fn on_panel_open(&self, player: Option<Address>) {
        self.refresh_global().await;
        if let Some(player) = player {
            self.refresh_for_player(player).await;
        }
    }

    /// A submission confirmed: drop cached views and refetch
    pub async fn on_refresh_signal(&self, signal: LeaderboardRefresh) {
        log::info!("Leaderboard invalidated by confirmed submission");
        self.invalidate();
        self.on_panel_open(signal.player).await;
    }

    pub async fn refresh(&self, scope: LeaderboardScope) -> RefreshOutcome {
        {
            let mut slots = self.slots.borrow_mut();
            let slot = slots.entry(scope).or_default();
            if slot.in_flight {
                slot.rerun_queued = true;
                log::debug!("Refresh of {:?} coalesced", scope);
                return RefreshOutcome::Coalesced;
            }
            slot.in_flight = true;
        }
        let _flight = InFlight {
            slots: &self.slots,
            scope,
        };

        loop {
            let fetched = self.fetch(scope).await;
            let result = fetched.as_ref().map(|_| ()).map_err(Clone::clone);

            let mut slots = self.slots.borrow_mut();
            let slot = slots.entry(scope).or_default();
            match fetched {
                Ok(entries) => {
                    log::info!("Fetched {} rows for {:?}", entries.len(), scope);
                    slot.view = LeaderboardView {
                        entries,
                        fetched_at_ms: (self.now)(),
                        valid: true,
                    };
                    slot.error = None;
                }
                Err(err) => {
                    log::warn!(
                        "Refresh of {:?} failed: {} ({}), keeping {} cached rows",
                        scope,
                        err,
                        err.code(),
                        slot.view.entries.len()
                    );
                    slot.error = Some(err);
                }
            }

            if slot.rerun_queued {
                slot.rerun_queued = false;
                continue;
            }
            return RefreshOutcome::Completed(result);
        }
    }

    async fn fetch(&self, scope: LeaderboardScope) -> Result<Vec<LeaderboardEntry>, ReadError> {
        let target = self.config.resolve().ok_or(ReadError::MissingAddress)?;
        let client = self.pool.client(&target);

        if !bounded(client.has_code(target.contract)).await? {
            return Err(ReadError::NoCode);
        }
        let rows = bounded(client.read_leaderboard(target.contract, scope)).await?;
        Ok(project(scope, rows))
    }
}

/// Releases a projection's in-flight flag when its refresh finishes or is dropped
struct InFlight<'a> {
    slots: &'a RefCell<HashMap<LeaderboardScope, Slot>>,
    scope: LeaderboardScope,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Ok(mut slots) = self.slots.try_borrow_mut() else {
            return;
        };
        if let Some(slot) = slots.get_mut(&self.scope) {
            if slot.rerun_queued {
                log::debug!("Refresh of {:?} dropped, queued re-run discarded", self.scope);
            }
            slot.in_flight = false;
            slot.rerun_queued = false;
        }
    }
}

/// Apply the read timeout and classify the failure
async fn bounded<T>(read: impl Future<Output = Result<T, ChainError>>) -> Result<T, ReadError> {
    match tokio::time::timeout(Duration::from_millis(READ_TIMEOUT_MS), read).await {
        Ok(result) => result.map_err(ReadError::from_chain),
        Err(_) => Err(ReadError::RpcTimeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MemoryLedger, PublishedConfig};
    use proptest::prelude::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn entry(score: u32, timestamp: u64, sequence: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            player: addr(2),
            score,
            duration_secs: 10,
            speed_peak: 10,
            timestamp,
            sequence,
        }
    }

    fn fixed_clock() -> f64 {
        1_000_000.0
    }

    fn make_cache(ledger: &Rc<MemoryLedger>, config: RuntimeConfig) -> LeaderboardCache<MemoryLedger> {
        LeaderboardCache::new(
            Rc::new(ClientPool::shared(Rc::clone(ledger))),
            Rc::new(config),
        )
        .with_clock(fixed_clock)
    }

    fn deployed() -> (Rc<MemoryLedger>, RuntimeConfig) {
        let ledger = Rc::new(MemoryLedger::default());
        ledger.deploy(addr(1));
        let config = RuntimeConfig::new().without_build_env();
        config.set_published(Some(PublishedConfig {
            address: Some(addr(1)),
            rpc_url: None,
        }));
        (ledger, config)
    }

    #[test]
    fn test_global_order() {
        let rows = vec![entry(5, 100, 1), entry(9, 50, 2), entry(5, 200, 3), entry(5, 200, 4)];
        let sorted = project(LeaderboardScope::Global, rows);
        let seqs: Vec<u64> = sorted.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![2, 3, 4, 1]);
    }

    #[test]
    fn test_player_order_keeps_recent() {
        let rows: Vec<_> = (0..30).rev().map(|i| entry(1, 1000 + i, i)).collect();
        let sorted = project(LeaderboardScope::Player(addr(2)), rows);
        assert_eq!(sorted.len(), PLAYER_RECENT_N);
        assert_eq!(sorted.first().map(|e| e.timestamp), Some(1010));
        assert_eq!(sorted.last().map(|e| e.timestamp), Some(1029));
    }

    #[test]
    fn test_potential_rank() {
        let view = LeaderboardView {
            entries: project(
                LeaderboardScope::Global,
                (1..=10).map(|i| entry(i * 10, i as u64, i as u64)).collect(),
            ),
            fetched_at_ms: 0.0,
            valid: true,
        };
        assert_eq!(view.top_score(), Some(100));
        assert_eq!(view.potential_rank(150), Some(1));
        assert_eq!(view.potential_rank(55), Some(6));
        assert_eq!(view.potential_rank(10), Some(10));
        assert_eq!(view.potential_rank(5), None);
        assert_eq!(view.potential_rank(0), None);
        assert_eq!(LeaderboardView::default().potential_rank(1), Some(1));
    }

    #[tokio::test]
    async fn test_refresh_fetches_and_sorts() {
        let (ledger, config) = deployed();
        ledger.seed(addr(2), 3, 10);
        ledger.seed(addr(3), 8, 11);
        let cache = make_cache(&ledger, config);

        assert_eq!(cache.refresh_global().await, RefreshOutcome::Completed(Ok(())));
        let view = cache.global();
        assert!(view.valid);
        assert_eq!(view.fetched_at_ms, fixed_clock());
        assert_eq!(view.entries.iter().map(|e| e.score).collect::<Vec<_>>(), vec![8, 3]);

        cache.refresh_for_player(addr(2)).await;
        assert_eq!(cache.player(addr(2)).entries.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce() {
        let (ledger, config) = deployed();
        let cache = make_cache(&ledger, config);

        let (a, b, c) = tokio::join!(
            cache.refresh_global(),
            cache.refresh_global(),
            cache.refresh_global()
        );
        assert_eq!(a, RefreshOutcome::Completed(Ok(())));
        assert_eq!(b, RefreshOutcome::Coalesced);
        assert_eq!(c, RefreshOutcome::Coalesced);
        // One fetch plus one trailing re-run
        assert_eq!(ledger.read_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_times_out() {
        let (ledger, config) = deployed();
        ledger.seed(addr(2), 3, 10);
        let cache = make_cache(&ledger, config);
        cache.refresh_global().await;

        ledger.stall_reads(Some(Duration::from_secs(20)));
        assert_eq!(
            cache.refresh_global().await,
            RefreshOutcome::Completed(Err(ReadError::RpcTimeout))
        );
        assert_eq!(cache.error(LeaderboardScope::Global), Some(ReadError::RpcTimeout));
        assert_eq!(cache.global().entries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_refresh_releases_projection() {
        let (ledger, config) = deployed();
        ledger.seed(addr(2), 3, 10);
        let cache = make_cache(&ledger, config);

        ledger.stall_reads(Some(Duration::from_secs(5)));
        let dropped = tokio::time::timeout(Duration::from_secs(1), cache.refresh_global()).await;
        assert!(dropped.is_err());

        ledger.stall_reads(None);
        assert_eq!(cache.refresh_global().await, RefreshOutcome::Completed(Ok(())));
        assert_eq!(cache.global().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_address_keeps_cached_entries() {
        let (ledger, config) = deployed();
        ledger.seed(addr(2), 3, 10);
        ledger.seed(addr(2), 4, 11);
        let config = Rc::new(config);
        let cache = LeaderboardCache::new(
            Rc::new(ClientPool::shared(Rc::clone(&ledger))),
            Rc::clone(&config),
        );
        cache.refresh_global().await;

        config.set_published(None);
        assert_eq!(
            cache.refresh_global().await,
            RefreshOutcome::Completed(Err(ReadError::MissingAddress))
        );
        assert_eq!(cache.global().entries.len(), 2);
        assert_eq!(
            cache.error(LeaderboardScope::Global).map(|e| e.code()),
            Some("missing_address")
        );
    }

    #[tokio::test]
    async fn test_missing_address_keeps_cached_player_rows() {
        let (ledger, config) = deployed();
        ledger.seed(addr(2), 3, 10);
        ledger.seed(addr(2), 4, 11);
        ledger.seed(addr(3), 9, 12);
        let config = Rc::new(config);
        let cache = LeaderboardCache::new(
            Rc::new(ClientPool::shared(Rc::clone(&ledger))),
            Rc::clone(&config),
        );
        cache.refresh_for_player(addr(2)).await;
        let before = cache.player(addr(2));
        assert_eq!(before.entries.len(), 2);

        config.set_published(None);
        assert_eq!(
            cache.refresh_for_player(addr(2)).await,
            RefreshOutcome::Completed(Err(ReadError::MissingAddress))
        );
        assert_eq!(cache.player(addr(2)).entries, before.entries);
        assert_eq!(
            cache.error(LeaderboardScope::Player(addr(2))).map(|e| e.code()),
            Some("missing_address")
        );
    }

    #[tokio::test]
    async fn test_no_code_and_rpc_errors() {
        let (ledger, _) = deployed();
        let config = RuntimeConfig::new()
            .without_build_env()
            .with_address(addr(9).to_string());
        let cache = make_cache(&ledger, config);
        assert_eq!(
            cache.refresh_global().await,
            RefreshOutcome::Completed(Err(ReadError::NoCode))
        );

        let (ledger, config) = deployed();
        ledger.fail_next_read(ChainError::Rpc("connection refused".to_string()));
        let cache = make_cache(&ledger, config);
        assert!(matches!(
            cache.refresh_global().await,
            RefreshOutcome::Completed(Err(ReadError::RpcError(_)))
        ));
    }

    #[tokio::test]
    async fn test_refresh_signal_invalidates_and_refetches() {
        let (ledger, config) = deployed();
        let cache = make_cache(&ledger, config);
        cache.refresh_global().await;
        assert!(!cache.needs_refresh(LeaderboardScope::Global, fixed_clock()));
        assert!(cache.needs_refresh(LeaderboardScope::Global, fixed_clock() + AUTO_REFRESH_MS));

        ledger.seed(addr(2), 7, 20);
        cache.invalidate();
        assert!(cache.needs_refresh(LeaderboardScope::Global, fixed_clock()));

        cache
            .on_refresh_signal(LeaderboardRefresh {
                player: Some(addr(2)),
            })
            .await;
        assert_eq!(cache.global().top_score(), Some(7));
        assert_eq!(cache.player(addr(2)).entries.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_global_order_is_total(
            rows in prop::collection::vec((0u32..20, 0u64..10), 0..40)
        ) {
            let entries: Vec<_> = rows
                .iter()
                .enumerate()
                .map(|(i, (score, ts))| entry(*score, *ts, i as u64))
                .collect();
            let mut forward = entries.clone();
            forward.sort_by(global_order);
            let mut backward: Vec<_> = entries.into_iter().rev().collect();
            backward.sort_by(global_order);

            // Input order never changes the result
            prop_assert_eq!(&forward, &backward);
            for pair in forward.windows(2) {
                prop_assert!(global_order(&pair[0], &pair[1]) == Ordering::Less);
            }
        }
    }
}
