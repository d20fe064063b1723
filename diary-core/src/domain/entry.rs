use std::fmt;

use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, macros::offset,
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

/// Entries are always displayed in Asia/Shanghai, which has no DST.
pub const DISPLAY_OFFSET: UtcOffset = offset!(+8);

/// Store-assigned identifier of a diary entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryEntry {
    pub id: EntryId,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

impl DiaryEntry {
    pub fn created_at_display(&self) -> String {
        format_display_time(self.created_at)
    }
}

/// Payload of an insert; id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEntry {
    #[serde(rename = "name")]
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
}

/// A listed entry whose body may be cut down to a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPreview {
    pub id: EntryId,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub preview: String,
    pub has_more: bool,
}

impl EntryPreview {
    /// Keeps the first `preview_len` characters of the body.
    pub fn from_entry(entry: DiaryEntry, preview_len: usize) -> Self {
        let (preview, has_more) = match entry.body.char_indices().nth(preview_len) {
            Some((cut, _)) => (entry.body[..cut].to_string(), true),
            None => (entry.body, false),
        };

        Self {
            id: entry.id,
            title: entry.title,
            created_at: entry.created_at,
            preview,
            has_more,
        }
    }

    pub fn created_at_display(&self) -> String {
        format_display_time(self.created_at)
    }
}

/// Parses a `created_at` value coming out of the store.
///
/// Columns without a zone come back as `2024-05-01T12:34:56.123456` and are
/// UTC; zoned values are accepted as RFC 3339.
pub fn parse_store_timestamp(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(parsed);
    }

    let naive = PrimitiveDateTime::parse(
        raw,
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
        ),
    )?;
    Ok(naive.assume_utc())
}

/// `2024/5/1 20:34:56` in the display timezone.
pub fn format_display_time(at: OffsetDateTime) -> String {
    let local = at.to_offset(DISPLAY_OFFSET);
    local
        .format(format_description!(
            "[year]/[month padding:none]/[day padding:none] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| local.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry(body: &str) -> DiaryEntry {
        DiaryEntry {
            id: EntryId::new("a"),
            title: "title".to_string(),
            body: body.to_string(),
            created_at: datetime!(2024-05-01 12:00 UTC),
        }
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(150);
        let preview = EntryPreview::from_entry(entry(&body), 100);

        assert_eq!(preview.preview.chars().count(), 100);
        assert!(preview.has_more);
    }

    #[test]
    fn preview_keeps_short_bodies_whole() {
        let body = "y".repeat(100);
        let preview = EntryPreview::from_entry(entry(&body), 100);

        assert_eq!(preview.preview, body);
        assert!(!preview.has_more);
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let body = "今天天气很好".repeat(20);
        let preview = EntryPreview::from_entry(entry(&body), 100);

        assert_eq!(preview.preview.chars().count(), 100);
        assert!(preview.has_more);
    }

    #[test]
    fn offsetless_timestamps_are_utc() {
        let parsed = parse_store_timestamp("2024-05-01T12:34:56.123456").unwrap();
        assert_eq!(parsed.offset(), UtcOffset::UTC);
        assert_eq!(parsed.hour(), 12);

        let whole = parse_store_timestamp("2024-05-01T12:34:56").unwrap();
        assert_eq!(whole.second(), 56);
    }

    #[test]
    fn zoned_timestamps_keep_their_instant() {
        let parsed = parse_store_timestamp("2024-05-01T20:34:56+08:00").unwrap();
        assert_eq!(parsed, datetime!(2024-05-01 12:34:56 UTC));
    }

    #[test]
    fn display_is_shanghai_time() {
        let at = datetime!(2024-05-01 18:05:09 UTC);
        assert_eq!(format_display_time(at), "2024/5/2 02:05:09");
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_store_timestamp("yesterday").is_err());
    }
}
