//! Column decoding helpers shared by the repositories.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, StoreError};

/// Get a column value, reporting decode failures as [`StoreError::CorruptRow`].
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Render a timestamp for storage. Fixed width, so text order is time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_timestamp(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table,
            column,
            detail: format!("invalid timestamp {raw:?}: {e}"),
        })
}

/// Escape LIKE special characters for use with `ESCAPE '\'`.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn escape_like_special_chars() {
        assert_eq!(escape_like("hello"), "hello");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("foo_bar"), "foo\\_bar");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn timestamps_survive_storage() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 14, 12, 0, 0).unwrap();
        let raw = format_timestamp(ts);
        assert_eq!(raw, "2026-02-14T12:00:00.000000Z");
        assert_eq!(parse_timestamp(&raw, "messages", "timestamp").unwrap(), ts);
    }

    #[test]
    fn bad_timestamp_is_corrupt_row() {
        let err = parse_timestamp("yesterday", "messages", "timestamp").unwrap_err();
        assert!(matches!(
            err,
            StoreError::CorruptRow { table: "messages", column: "timestamp", .. }
        ));
    }
}
