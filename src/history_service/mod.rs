//! HistoryService - Detection History State
//!
//! ## Responsibilities
//!
//! - Fetch the detection list once on startup
//! - Re-fetch (full replacement) on live-channel signals, debounced
//! - Manual refresh, identical to the automatic path
//! - Reversible optimistic delete, one DELETE per id
//!
//! Every fetch carries a monotonic sequence number; a response that is
//! older than the newest started request is discarded, so a stale reply
//! can never overwrite fresher state. In-flight requests are not
//! cancelled.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::detection_client::DetectionClient;
use crate::error::Error;
use crate::models::DetectionRecord;

/// A record removed optimistically, held until its DELETE resolves
#[derive(Debug, Clone)]
struct PendingDelete {
    index: usize,
    record: DetectionRecord,
}

/// History state as rendered by the widgets
#[derive(Debug, Default)]
pub struct HistoryState {
    /// Detection list in server order; replaced wholesale on refresh
    pub detections: Vec<DetectionRecord>,
    /// Fetch error message; set on failure, cleared on success
    pub last_error: Option<String>,
    /// Number of fetches currently in flight
    in_flight: usize,
    /// Sequence number of the newest request started
    latest_started: u64,
    /// Optimistically removed records awaiting DELETE confirmation
    pending_deletes: HashMap<i64, PendingDelete>,
}

impl HistoryState {
    /// True only while at least one fetch is in flight
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    fn begin_fetch(&mut self, seq: u64) {
        self.in_flight += 1;
        self.latest_started = self.latest_started.max(seq);
    }

    /// Apply one finished fetch. Responses older than the newest started
    /// request are discarded; the latest fact wins regardless of arrival
    /// order.
    fn finish_fetch(&mut self, seq: u64, result: Result<Vec<DetectionRecord>, Error>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if seq < self.latest_started {
            tracing::debug!(seq, latest = self.latest_started, "Stale fetch discarded");
            return;
        }
        match result {
            Ok(records) => {
                self.detections = self.dedup(records);
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "History fetch failed");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Full-replacement list, dropping duplicate ids (first occurrence
    /// wins) and records that are optimistically removed
    fn dedup(&self, records: Vec<DetectionRecord>) -> Vec<DetectionRecord> {
        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter(|r| !self.pending_deletes.contains_key(&r.id))
            .filter(|r| seen.insert(r.id))
            .collect()
    }

    /// Remove a record from the visible list, remembering where it was
    fn remove_optimistic(&mut self, id: i64) -> bool {
        let Some(index) = self.detections.iter().position(|d| d.id == id) else {
            return false;
        };
        let record = self.detections.remove(index);
        self.pending_deletes.insert(id, PendingDelete { index, record });
        true
    }

    /// Resolve a pending delete. On failure the record is restored at its
    /// original index and the error surfaces; on success it is gone.
    fn finish_delete(&mut self, id: i64, error: Option<String>) {
        let Some(pending) = self.pending_deletes.remove(&id) else {
            return;
        };
        if let Some(message) = error {
            if !self.detections.iter().any(|d| d.id == id) {
                let index = pending.index.min(self.detections.len());
                self.detections.insert(index, pending.record);
            }
            self.last_error = Some(message);
        }
    }
}

/// Debounce gate for live-signal-triggered refreshes.
///
/// Signals mark a refresh as pending; at most one refresh fires per
/// `min_interval`, with a trailing fire for signals that arrived inside
/// the window.
#[derive(Debug)]
pub(crate) struct RefreshGate {
    min_interval: Duration,
    last_fired: Option<Instant>,
    pending: bool,
}

impl RefreshGate {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fired: None,
            pending: false,
        }
    }

    pub(crate) fn note_signal(&mut self) {
        self.pending = true;
    }

    /// Record an ungated fire (manual refresh) so the next signal waits a
    /// full interval again
    pub(crate) fn note_fired(&mut self, now: Instant) {
        self.last_fired = Some(now);
        self.pending = false;
    }

    pub(crate) fn should_fire(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        if let Some(last) = self.last_fired {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.pending = false;
        self.last_fired = Some(now);
        true
    }
}

/// Detection history service
///
/// Owns its state exclusively; widgets read snapshots, the root
/// composition drives `poll`/`refresh`/`delete`.
pub struct HistoryService {
    client: Arc<DetectionClient>,
    runtime: tokio::runtime::Handle,
    state: Arc<Mutex<HistoryState>>,
    next_seq: AtomicU64,
    gate: Mutex<RefreshGate>,
    seen_signal: AtomicU64,
}

impl HistoryService {
    /// Create the service and spawn the initial fetch
    pub fn new(
        client: Arc<DetectionClient>,
        runtime: tokio::runtime::Handle,
        refresh_min_interval: Duration,
    ) -> Self {
        let service = Self {
            client,
            runtime,
            state: Arc::new(Mutex::new(HistoryState::default())),
            next_seq: AtomicU64::new(0),
            gate: Mutex::new(RefreshGate::new(refresh_min_interval)),
            seen_signal: AtomicU64::new(0),
        };
        service.refresh();
        service
    }

    fn lock_state(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_gate(&self) -> MutexGuard<'_, RefreshGate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rendered view of the current state
    pub fn detections(&self) -> Vec<DetectionRecord> {
        self.lock_state().detections.clone()
    }

    pub fn loading(&self) -> bool {
        self.lock_state().loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// Manual refresh; same fetch routine as the automatic path
    pub fn refresh(&self) {
        self.lock_gate().note_fired(Instant::now());
        self.spawn_fetch();
    }

    /// Drive the debounced automatic refresh. Called once per UI frame
    /// with the live channel's current signal counter.
    pub fn poll(&self, live_signal: u64) {
        let seen = self.seen_signal.swap(live_signal, Ordering::SeqCst);
        let mut gate = self.lock_gate();
        if live_signal != seen {
            gate.note_signal();
        }
        let fire = gate.should_fire(Instant::now());
        drop(gate);
        if fire {
            self.spawn_fetch();
        }
    }

    /// Optimistically delete records: each leaves the visible list
    /// immediately, then one DELETE per id is issued. A failed DELETE
    /// restores its record and surfaces the error.
    pub fn delete(&self, ids: &[i64]) {
        {
            let mut state = self.lock_state();
            for &id in ids {
                state.remove_optimistic(id);
            }
        }
        for &id in ids {
            let client = self.client.clone();
            let state = self.state.clone();
            self.runtime.spawn(async move {
                let error = client.delete_detection(id).await.err().map(|e| e.to_string());
                state
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .finish_delete(id, error);
            });
        }
    }

    fn spawn_fetch(&self) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock_state().begin_fetch(seq);
        let client = self.client.clone();
        let state = self.state.clone();
        self.runtime.spawn(async move {
            let result = client.list_detections().await;
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .finish_fetch(seq, result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, person_count: u32) -> DetectionRecord {
        DetectionRecord {
            id,
            timestamp: "2026-08-07T10:15:30".to_string(),
            person_count,
            image_path: format!("detection_{}.jpg", id),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_fetch_replaces_list_and_clears_error() {
        let mut state = HistoryState::default();
        state.last_error = Some("old".to_string());
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1), record(2, 2)]));
        assert_eq!(state.detections.len(), 2);
        assert!(state.last_error.is_none());
        assert!(!state.loading());
    }

    #[test]
    fn test_fetch_preserves_server_order() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(9, 1), record(3, 1), record(7, 1)]));
        let ids: Vec<i64> = state.detections.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![9, 3, 7]);
    }

    #[test]
    fn test_fetch_drops_duplicate_ids() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1), record(1, 2), record(2, 1)]));
        let ids: Vec<i64> = state.detections.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(state.detections[0].person_count, 1);
    }

    #[test]
    fn test_identical_fetches_are_idempotent() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1), record(2, 2)]));
        let first = state.detections.clone();
        state.begin_fetch(2);
        state.finish_fetch(2, Ok(vec![record(1, 1), record(2, 2)]));
        assert_eq!(state.detections, first);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.begin_fetch(2);
        state.finish_fetch(2, Ok(vec![record(2, 2)]));
        // response 1 arrives after response 2 was applied
        state.finish_fetch(1, Ok(vec![record(1, 1)]));
        let ids: Vec<i64> = state.detections.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2]);
        assert!(!state.loading());
    }

    #[test]
    fn test_stale_response_discarded_before_newer_resolves() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.begin_fetch(2);
        // a newer request has been started, so response 1 is already stale
        state.finish_fetch(1, Ok(vec![record(1, 1)]));
        assert!(state.detections.is_empty());
        assert!(state.loading());
    }

    #[test]
    fn test_failed_fetch_sets_error_keeps_list() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1)]));
        state.begin_fetch(2);
        state.finish_fetch(2, Err(Error::Network("boom".to_string())));
        assert_eq!(state.detections.len(), 1);
        assert_eq!(state.last_error.as_deref(), Some("network error: boom"));
    }

    #[test]
    fn test_loading_only_while_in_flight() {
        let mut state = HistoryState::default();
        assert!(!state.loading());
        state.begin_fetch(1);
        assert!(state.loading());
        state.finish_fetch(1, Ok(Vec::new()));
        assert!(!state.loading());
    }

    #[test]
    fn test_optimistic_delete_removes_immediately() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1), record(2, 2), record(3, 3)]));
        assert!(state.remove_optimistic(2));
        let ids: Vec<i64> = state.detections.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_confirmed_delete_stays_gone() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1), record(2, 2)]));
        state.remove_optimistic(2);
        state.finish_delete(2, None);
        assert_eq!(state.detections.len(), 1);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_failed_delete_restores_at_index() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1), record(2, 2), record(3, 3)]));
        state.remove_optimistic(2);
        state.finish_delete(2, Some("delete failed".to_string()));
        let ids: Vec<i64> = state.detections.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(state.last_error.as_deref(), Some("delete failed"));
    }

    #[test]
    fn test_refresh_during_pending_delete_keeps_record_hidden() {
        let mut state = HistoryState::default();
        state.begin_fetch(1);
        state.finish_fetch(1, Ok(vec![record(1, 1), record(2, 2)]));
        state.remove_optimistic(2);
        // the server has not processed the delete yet, so its list still
        // contains the record
        state.begin_fetch(2);
        state.finish_fetch(2, Ok(vec![record(1, 1), record(2, 2)]));
        let ids: Vec<i64> = state.detections.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_gate_debounces_signal_bursts() {
        let mut gate = RefreshGate::new(Duration::from_secs(2));
        let t0 = Instant::now();
        gate.note_signal();
        assert!(gate.should_fire(t0));
        // burst inside the window: pending, but no fire
        gate.note_signal();
        gate.note_signal();
        assert!(!gate.should_fire(t0 + Duration::from_millis(500)));
        assert!(!gate.should_fire(t0 + Duration::from_millis(1500)));
        // trailing fire once the window elapses
        assert!(gate.should_fire(t0 + Duration::from_secs(2)));
        // nothing pending afterwards
        assert!(!gate.should_fire(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_gate_manual_fire_resets_window() {
        let mut gate = RefreshGate::new(Duration::from_secs(2));
        let t0 = Instant::now();
        gate.note_fired(t0);
        gate.note_signal();
        assert!(!gate.should_fire(t0 + Duration::from_secs(1)));
        assert!(gate.should_fire(t0 + Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_service_poll_triggers_single_fetch_per_burst() {
        // client pointed at a closed port: fetches fail fast but the
        // gating behaviour is what is under test
        let client = Arc::new(
            DetectionClient::with_timeouts(
                "http://127.0.0.1:1",
                Duration::from_millis(200),
                Duration::from_millis(200),
            )
            .unwrap(),
        );
        let service = HistoryService::new(
            client,
            tokio::runtime::Handle::current(),
            Duration::from_secs(60),
        );
        let after_initial = service.next_seq.load(Ordering::SeqCst);
        assert_eq!(after_initial, 1);

        // a burst of live signals inside the window starts no new fetch
        service.poll(1);
        service.poll(2);
        service.poll(3);
        assert_eq!(service.next_seq.load(Ordering::SeqCst), 1);

        // manual refresh is ungated
        service.refresh();
        assert_eq!(service.next_seq.load(Ordering::SeqCst), 2);
    }
}
