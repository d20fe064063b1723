//! Entry store port (outbound).
//!
//! The hosted diary table behind a small CRUD surface. No multi-row
//! transactions are assumed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DiaryEntry, EntryId, NewEntry, StoreError};

/// A window of rows, `offset..offset + limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub offset: usize,
    pub limit: usize,
}

impl PageRange {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

#[async_trait]
pub trait EntryStore: Send + Sync + 'static {
    /// Entries ordered by `created_at` descending. `None` lists everything.
    async fn list(&self, range: Option<PageRange>) -> Result<Vec<DiaryEntry>, StoreError>;

    /// Full body of a single entry.
    async fn fetch_body(&self, id: &EntryId) -> Result<String, StoreError>;

    async fn insert(&self, entry: &NewEntry) -> Result<(), StoreError>;

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: EntryStore + ?Sized> EntryStore for Arc<S> {
    async fn list(&self, range: Option<PageRange>) -> Result<Vec<DiaryEntry>, StoreError> {
        (**self).list(range).await
    }

    async fn fetch_body(&self, id: &EntryId) -> Result<String, StoreError> {
        (**self).fetch_body(id).await
    }

    async fn insert(&self, entry: &NewEntry) -> Result<(), StoreError> {
        (**self).insert(entry).await
    }

    async fn delete(&self, id: &EntryId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}
