//! In-memory stand-ins for the external collaborators, shared by unit tests.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DedupStore;
use crate::error::{AppError, Result};
use crate::heartbeat::LivenessSignal;
use crate::notify::Notifier;
use crate::search::{SearchRequest, SearchSource};
use crate::supervisor::ProcessRestarter;
use crate::types::{ListingCandidate, ListingKey, Money};

pub fn candidate(key: &str, feedback: &str) -> ListingCandidate {
    ListingCandidate {
        key: Some(ListingKey::from(key)),
        title: Some(format!("Booster box {key}")),
        price: Some(Money::new("300.00", "AUD")),
        seller_username: Some("seller".to_string()),
        seller_feedback_percentage: Some(feedback.to_string()),
        web_url: Some(format!("https://www.ebay.com.au/itm/{key}")),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    keys: Mutex<BTreeSet<ListingKey>>,
    failing: AtomicBool,
    insert_failing: AtomicBool,
    insert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_keys(keys: &[&str]) -> Self {
        let store = Self::default();
        store
            .keys
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| ListingKey::from(*k)));
        store
    }

    pub fn set_failing(&self, v: bool) {
        self.failing.store(v, Ordering::SeqCst);
    }

    pub fn set_insert_failing(&self, v: bool) {
        self.insert_failing.store(v, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Sorted snapshot of every stored key.
    pub fn keys(&self) -> Vec<ListingKey> {
        self.keys.lock().unwrap().iter().cloned().collect()
    }

    pub fn contains(&self, key: &ListingKey) -> bool {
        self.keys.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn list_known_keys(&self) -> Result<HashSet<ListingKey>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("connection refused".to_string()));
        }
        Ok(self.keys.lock().unwrap().iter().cloned().collect())
    }

    async fn insert_keys(&self, keys: &[ListingKey]) -> Result<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) || self.insert_failing.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("write failed".to_string()));
        }
        self.keys.lock().unwrap().extend(keys.iter().cloned());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSearch {
    results: Mutex<Vec<ListingCandidate>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new(results: Vec<ListingCandidate>) -> Self {
        Self {
            results: Mutex::new(results),
            ..Default::default()
        }
    }

    pub fn set_failing(&self, v: bool) {
        self.failing.store(v, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchSource for FakeSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<ListingCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::SearchQueryFailed("401 Unauthorized".to_string()));
        }
        Ok(self.results.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ListingKey>>,
    fail_keys: Mutex<HashSet<ListingKey>>,
    persisted_in: Mutex<Option<Arc<MemoryStore>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<ListingKey> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_for(&self, key: &str) {
        self.fail_keys.lock().unwrap().insert(ListingKey::from(key));
    }

    /// Panic if an alert goes out for a key not yet in `store`.
    pub fn check_persisted_in(&self, store: Arc<MemoryStore>) {
        *self.persisted_in.lock().unwrap() = Some(store);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_alert(&self, candidate: &ListingCandidate) -> Result<()> {
        let key = candidate
            .listing_key()
            .cloned()
            .ok_or_else(|| AppError::NotifyFailed("candidate without key".to_string()))?;
        if let Some(store) = self.persisted_in.lock().unwrap().as_ref() {
            assert!(store.contains(&key), "alert for {key} sent before it was persisted");
        }
        if self.fail_keys.lock().unwrap().contains(&key) {
            return Err(AppError::NotifyFailed("channel unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLiveness {
    last: Mutex<Option<DateTime<Utc>>>,
    invalid: AtomicBool,
}

impl MemoryLiveness {
    pub fn at(t: DateTime<Utc>) -> Self {
        Self {
            last: Mutex::new(Some(t)),
            ..Default::default()
        }
    }

    pub fn invalid() -> Self {
        let s = Self::default();
        s.invalid.store(true, Ordering::SeqCst);
        s
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        *self.last.lock().unwrap()
    }
}

#[async_trait]
impl LivenessSignal for MemoryLiveness {
    async fn beat(&self, at: DateTime<Utc>) -> Result<()> {
        *self.last.lock().unwrap() = Some(at);
        Ok(())
    }

    async fn last_beat(&self) -> Result<Option<DateTime<Utc>>> {
        if self.invalid.load(Ordering::SeqCst) {
            return Err(AppError::SignalMissingOrInvalid("garbage".to_string()));
        }
        Ok(self.last())
    }
}

#[derive(Default)]
pub struct RecordingRestarter {
    restarts: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingRestarter {
    pub fn failing() -> Self {
        let s = Self::default();
        s.failing.store(true, Ordering::SeqCst);
        s
    }

    pub fn restarts(&self) -> Vec<String> {
        self.restarts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRestarter for RecordingRestarter {
    async fn restart(&self, process_name: &str) -> Result<()> {
        self.restarts.lock().unwrap().push(process_name.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::RestartFailed("pm2 not running".to_string()));
        }
        Ok(())
    }
}
