//! In-process entry store for dev mode and tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::{
    domain::{DiaryEntry, EntryId, NewEntry, StoreError},
    ports::{EntryStore, PageRange},
};

/// Entry store backed by a `Vec`.
///
/// Every call yields to the runtime once before touching the data, so
/// concurrent callers interleave the way they would against a real store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<DiaryEntry>,
    next_id: u64,
    list_calls: usize,
    body_calls: usize,
    fail_next: Option<StoreError>,
}

impl Inner {
    fn assign_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId::new(format!("entry-{}", self.next_id))
    }

    /// Creation times strictly increase, so the newest insert sorts first.
    fn next_timestamp(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        match self.entries.iter().map(|e| e.created_at).max() {
            Some(latest) if latest >= now => latest + Duration::microseconds(1),
            _ => now,
        }
    }

    fn take_failure(&mut self) -> Result<(), StoreError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `count` entries an hour apart, oldest first.
    pub fn seeded(count: usize) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            let start = OffsetDateTime::now_utc() - Duration::hours(count as i64 + 1);
            for n in 1..=count {
                let id = inner.assign_id();
                inner.entries.push(DiaryEntry {
                    id,
                    title: format!("Day {n}"),
                    body: seed_body(n),
                    created_at: start + Duration::hours(n as i64),
                });
            }
        }
        store
    }

    /// Inserts synchronously and returns the new id.
    pub fn push(&self, title: &str, body: &str) -> EntryId {
        let mut inner = self.lock();
        let id = inner.assign_id();
        let created_at = inner.next_timestamp();
        inner.entries.push(DiaryEntry {
            id: id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            created_at,
        });
        id
    }

    /// Makes the next store call fail with `err`.
    pub fn fail_next(&self, err: StoreError) {
        self.lock().fail_next = Some(err);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.lock().entries.iter().any(|e| &e.id == id)
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn body_calls(&self) -> usize {
        self.lock().body_calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

fn seed_body(n: usize) -> String {
    const LINE: &str = "Walked along the river after work and watched the boats. ";
    LINE.repeat(n % 4 + 1).trim_end().to_string()
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn list(&self, range: Option<PageRange>) -> Result<Vec<DiaryEntry>, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        inner.list_calls += 1;
        inner.take_failure()?;

        let mut rows = inner.entries.clone();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(match range {
            Some(range) => rows
                .into_iter()
                .skip(range.offset)
                .take(range.limit)
                .collect(),
            None => rows,
        })
    }

    async fn fetch_body(&self, id: &EntryId) -> Result<String, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        inner.body_calls += 1;
        inner.take_failure()?;

        inner
            .entries
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.body.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn insert(&self, entry: &NewEntry) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        inner.take_failure()?;

        let id = inner.assign_id();
        let created_at = inner.next_timestamp();
        inner.entries.push(DiaryEntry {
            id,
            title: entry.title.clone(),
            body: entry.body.clone(),
            created_at,
        });
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        inner.take_failure()?;

        inner.entries.retain(|e| &e.id != id);
        Ok(())
    }
}
