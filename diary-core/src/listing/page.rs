use std::collections::{HashMap, HashSet};

use time::{Duration, OffsetDateTime};

use crate::domain::{DiaryEntry, EntryId, EntryPreview};

/// How long the "saved" notice stays up after an add.
pub const SUCCESS_NOTICE_DURATION: Duration = Duration::milliseconds(1600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Status line shown above the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub expires_at: Option<OffsetDateTime>,
}

impl Notice {
    pub fn success(text: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
            expires_at: Some(now + SUCCESS_NOTICE_DURATION),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
            expires_at: None,
        }
    }

    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Client-side view over the store: what is loaded, what is expanded and
/// which loads are in flight.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub(crate) entries: Vec<EntryPreview>,
    pub(crate) expanded_id: Option<EntryId>,
    pub(crate) body_cache: HashMap<EntryId, String>,
    pub(crate) end_reached: bool,
    pub(crate) page_in_flight: bool,
    pub(crate) bodies_in_flight: HashSet<EntryId>,
    /// Bumped whenever the list is rebuilt; older in-flight pages are dropped.
    pub(crate) generation: u64,
    pub(crate) closed: bool,
    pub(crate) notice: Option<Notice>,
}

impl ListingPage {
    pub fn entries(&self) -> &[EntryPreview] {
        &self.entries
    }

    pub fn expanded_id(&self) -> Option<&EntryId> {
        self.expanded_id.as_ref()
    }

    pub fn cached_body(&self, id: &EntryId) -> Option<&str> {
        self.body_cache.get(id).map(String::as_str)
    }

    pub fn end_reached(&self) -> bool {
        self.end_reached
    }

    pub fn is_loading(&self) -> bool {
        self.page_in_flight
    }

    pub fn notice(&self, now: OffsetDateTime) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| n.is_active(now))
    }

    /// Starts a rebuild; returns the generation the result must match.
    pub(crate) fn begin_rebuild(&mut self) -> u64 {
        self.generation += 1;
        self.page_in_flight = true;
        self.end_reached = false;
        self.generation
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.closed && self.generation == generation
    }

    pub(crate) fn replace(&mut self, rows: Vec<DiaryEntry>, preview_len: usize, end_reached: bool) {
        self.entries = rows
            .into_iter()
            .map(|row| EntryPreview::from_entry(row, preview_len))
            .collect();
        self.end_reached = end_reached;
    }

    /// Appends rows, skipping ids already listed. Returns how many were added.
    pub(crate) fn append(&mut self, rows: Vec<DiaryEntry>, preview_len: usize) -> usize {
        let known: HashSet<EntryId> = self.entries.iter().map(|e| e.id.clone()).collect();
        let before = self.entries.len();
        self.entries.extend(
            rows.into_iter()
                .filter(|row| !known.contains(&row.id))
                .map(|row| EntryPreview::from_entry(row, preview_len)),
        );
        self.entries.len() - before
    }

    /// Drops everything known about `id` after it was deleted.
    pub(crate) fn forget(&mut self, id: &EntryId) {
        self.entries.retain(|e| &e.id != id);
        self.body_cache.remove(id);
        self.bodies_in_flight.remove(id);
        if self.expanded_id.as_ref() == Some(id) {
            self.expanded_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(id: &str) -> DiaryEntry {
        DiaryEntry {
            id: EntryId::new(id),
            title: id.to_string(),
            body: "body".to_string(),
            created_at: datetime!(2024-05-01 12:00 UTC),
        }
    }

    #[test]
    fn append_skips_known_ids() {
        let mut page = ListingPage::default();
        page.replace(vec![row("a"), row("b")], 100, false);

        let added = page.append(vec![row("b"), row("c")], 100);

        assert_eq!(added, 1);
        let ids: Vec<_> = page.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn forget_clears_every_trace() {
        let mut page = ListingPage::default();
        page.replace(vec![row("a"), row("b")], 100, true);
        let id = EntryId::new("a");
        page.expanded_id = Some(id.clone());
        page.body_cache.insert(id.clone(), "full".to_string());

        page.forget(&id);

        assert!(page.entries().iter().all(|e| e.id != id));
        assert_eq!(page.cached_body(&id), None);
        assert_eq!(page.expanded_id(), None);
    }

    #[test]
    fn success_notice_expires() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let notice = Notice::success("saved", now);

        assert!(notice.is_active(now + Duration::milliseconds(1599)));
        assert!(!notice.is_active(now + SUCCESS_NOTICE_DURATION));
        assert!(Notice::error("boom").is_active(now + Duration::days(1)));
    }

    #[test]
    fn stale_generation_is_not_current() {
        let mut page = ListingPage::default();
        let first = page.begin_rebuild();
        let second = page.begin_rebuild();

        assert!(!page.is_current(first));
        assert!(page.is_current(second));

        page.closed = true;
        assert!(!page.is_current(second));
    }

    #[test]
    fn rebuild_forgets_previous_end() {
        let mut page = ListingPage::default();
        page.replace(vec![row("a")], 100, true);
        assert!(page.end_reached);

        page.begin_rebuild();

        assert!(!page.end_reached);
        assert_eq!(page.entries.len(), 1);
    }
}
