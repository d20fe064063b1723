//! Adding and deleting entries. Each successful mutation is followed by a
//! full first-page reload; nothing is patched into the loaded list.

use tracing::{info, instrument};

use crate::{
    domain::{EntryId, ListingError, NewEntry},
    listing::{ListingController, LoadOutcome, Notice},
    ports::EntryStore,
};

/// The add-entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: String,
    pub body: String,
}

impl EntryDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.body.clear();
    }

    fn to_new_entry(&self) -> Result<NewEntry, ListingError> {
        if self.title.trim().is_empty() {
            return Err(ListingError::validation("title must not be empty"));
        }
        if self.body.trim().is_empty() {
            return Err(ListingError::validation("body must not be empty"));
        }
        Ok(NewEntry {
            title: self.title.clone(),
            body: self.body.clone(),
        })
    }
}

impl<S: EntryStore + ?Sized> ListingController<S> {
    /// Saves the draft, clears it and reloads the first page.
    ///
    /// On failure the draft and the listing are left as they were.
    #[instrument(name = "add_entry", skip_all)]
    pub async fn add_entry(&self, draft: &mut EntryDraft) -> Result<LoadOutcome, ListingError> {
        let entry = draft.to_new_entry()?;

        let result = self.store.insert(&entry).await;
        {
            let mut page = self.lock();
            self.check(&mut page, result)?;
            page.notice = Some(Notice::success("entry saved", self.clock.now()));
        }
        info!("entry added");
        draft.clear();

        self.load_first_page().await
    }

    /// Deletes `id`, forgets everything cached for it and reloads the first page.
    #[instrument(name = "delete_entry", skip(self, id), fields(id = %id))]
    pub async fn delete_entry(&self, id: &EntryId) -> Result<LoadOutcome, ListingError> {
        let result = self.store.delete(id).await;
        {
            let mut page = self.lock();
            self.check(&mut page, result)?;
            page.forget(id);
        }
        info!("entry deleted");

        self.load_first_page().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::{
        adapters::MemoryStore,
        clock::ManualClock,
        domain::{AccessState, StoreError},
        gate::VerifiedSession,
        listing::{ListingConfig, NoticeKind, SUCCESS_NOTICE_DURATION},
    };

    fn controller(store: &MemoryStore) -> ListingController<MemoryStore> {
        let state = AccessState {
            verified: true,
            ..AccessState::default()
        };
        let session = VerifiedSession::resume(&state, None).unwrap();
        ListingController::new(session, Arc::new(store.clone()), ListingConfig::default())
    }

    #[tokio::test]
    async fn added_entry_is_listed_first() {
        let store = MemoryStore::seeded(12);
        let controller = controller(&store);
        controller.load_first_page().await.unwrap();

        let mut draft = EntryDraft::new("T", "C");
        controller.add_entry(&mut draft).await.unwrap();

        assert_eq!(draft, EntryDraft::default());
        let page = controller.snapshot();
        let first = &page.entries()[0];
        assert_eq!(first.title, "T");
        assert_eq!(first.preview, "C");
        assert!(!first.has_more);
        assert_eq!(page.entries().len(), 10);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_without_a_store_call() {
        let store = MemoryStore::new();
        let controller = controller(&store);

        for mut draft in [
            EntryDraft::new("   ", "body"),
            EntryDraft::new("title", "\n\t"),
            EntryDraft::default(),
        ] {
            let before = draft.clone();
            let err = controller.add_entry(&mut draft).await.unwrap_err();
            assert!(matches!(err, ListingError::Validation(_)));
            assert_eq!(draft, before);
        }
        assert!(store.is_empty());
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn success_notice_clears_after_delay() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(datetime!(2024-05-01 12:00 UTC));
        let controller = controller(&store).with_clock(clock.clone());

        controller
            .add_entry(&mut EntryDraft::new("t", "b"))
            .await
            .unwrap();
        assert_eq!(
            controller.notice().map(|n| n.kind),
            Some(NoticeKind::Success)
        );

        clock.advance(SUCCESS_NOTICE_DURATION);
        assert_eq!(controller.notice(), None);
    }

    #[tokio::test]
    async fn failed_insert_keeps_draft_and_listing() {
        let store = MemoryStore::seeded(3);
        let controller = controller(&store);
        controller.load_first_page().await.unwrap();
        let calls = store.list_calls();

        store.fail_next(StoreError::Rejected {
            status: 409,
            message: "duplicate key value violates unique constraint".to_string(),
        });
        let mut draft = EntryDraft::new("t", "b");
        let err = controller.add_entry(&mut draft).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "duplicate key value violates unique constraint"
        );
        assert_eq!(draft, EntryDraft::new("t", "b"));
        assert_eq!(controller.snapshot().entries().len(), 3);
        assert_eq!(store.list_calls(), calls);
        assert_eq!(
            controller.notice().map(|n| n.kind),
            Some(NoticeKind::Error)
        );
    }

    #[tokio::test]
    async fn delete_forgets_entry_everywhere() {
        let store = MemoryStore::new();
        let id = store.push("long", &"z".repeat(150));
        store.push("other", "short");
        let controller = controller(&store);
        controller.load_first_page().await.unwrap();
        controller.expand(&id).await.unwrap();

        controller.delete_entry(&id).await.unwrap();

        let page = controller.snapshot();
        assert!(page.entries().iter().all(|e| e.id != id));
        assert_eq!(page.cached_body(&id), None);
        assert_ne!(page.expanded_id(), Some(&id));
        assert_eq!(page.entries().len(), 1);
    }

    #[tokio::test]
    async fn delete_keeps_other_expansion() {
        let store = MemoryStore::new();
        let keep = store.push("keep", &"k".repeat(120));
        let gone = store.push("gone", "bye");
        let controller = controller(&store);
        controller.load_first_page().await.unwrap();
        controller.expand(&keep).await.unwrap();

        controller.delete_entry(&gone).await.unwrap();

        let page = controller.snapshot();
        assert_eq!(page.expanded_id(), Some(&keep));
        assert!(page.cached_body(&keep).is_some());
    }

    #[tokio::test]
    async fn delete_racing_a_body_fetch_leaves_no_body() {
        let store = MemoryStore::new();
        let id = store.push("long", &"z".repeat(150));
        let controller = controller(&store);

        let (expanded, deleted) =
            tokio::join!(controller.expand(&id), controller.delete_entry(&id));

        expanded.unwrap();
        deleted.unwrap();
        let page = controller.snapshot();
        assert_eq!(page.cached_body(&id), None);
        assert_ne!(page.expanded_id(), Some(&id));
    }

    #[tokio::test]
    async fn failed_delete_leaves_state_alone() {
        let store = MemoryStore::new();
        let id = store.push("long", &"z".repeat(150));
        let controller = controller(&store);
        controller.load_first_page().await.unwrap();
        controller.expand(&id).await.unwrap();

        store.fail_next(StoreError::Transport("connection reset".to_string()));
        controller.delete_entry(&id).await.unwrap_err();

        let page = controller.snapshot();
        assert_eq!(page.entries().len(), 1);
        assert!(page.cached_body(&id).is_some());
        assert_eq!(page.expanded_id(), Some(&id));
        assert!(store.contains(&id));
    }
}
