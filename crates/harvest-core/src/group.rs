//! # Order Group Identity
//!
//! One logical order may span several sale rows. Rows of a multi-line order
//! share a `group_id`; a single-line order has none.
//!
//! Older data recorded the relation as a tag inside the free-text notes:
//!
//! ```text
//! notes = "deliver before noon [GROUP:5f0c…]"
//!                               └──────┬──────┘
//!                            legacy group marker
//! ```
//!
//! The helpers here mint new ids, read the legacy marker so stored rows can
//! be backfilled into the `group_id` column, and strip markers from incoming
//! notes so a client cannot attach a row to someone else's order by typing
//! the tag.

use uuid::Uuid;

const TAG_OPEN: &str = "[GROUP:";
const TAG_CLOSE: char = ']';

/// Mints a fresh opaque group id.
pub fn new_group_id() -> String {
    Uuid::new_v4().to_string()
}

/// Renders the legacy notes marker for a group id.
pub fn format_tag(group_id: &str) -> String {
    format!("{TAG_OPEN}{group_id}{TAG_CLOSE}")
}

/// Returns the group id of the first well-formed marker in `notes`.
///
/// ```rust
/// use harvest_core::group::extract_group_id;
///
/// assert_eq!(extract_group_id("rush [GROUP:abc-1]"), Some("abc-1"));
/// assert_eq!(extract_group_id("[GROUP:]"), None);
/// assert_eq!(extract_group_id("no tag"), None);
/// ```
pub fn extract_group_id(notes: &str) -> Option<&str> {
    let mut rest = notes;
    while let Some(start) = rest.find(TAG_OPEN) {
        let after = &rest[start + TAG_OPEN.len()..];
        let end = after.find(TAG_CLOSE)?;
        let id = after[..end].trim();
        if !id.is_empty() && !id.contains('[') {
            return Some(id);
        }
        rest = &after[end..];
    }
    None
}

/// Removes every group marker from `notes` and tidies whitespace.
///
/// Returns `None` when nothing but markers and whitespace was present.
pub fn strip_tags(notes: &str) -> Option<String> {
    let mut out = String::with_capacity(notes.len());
    let mut rest = notes;

    while let Some(start) = rest.find(TAG_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + TAG_OPEN.len()..];
        match after.find(TAG_CLOSE) {
            Some(end) => rest = &after[end + TAG_CLOSE.len_utf8()..],
            None => {
                // unterminated marker, keep it as plain text
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    let cleaned = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Sanitizes optional client notes.
pub fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes.and_then(strip_tags)
}
