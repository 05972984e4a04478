//! Pagination cursor and the typed parameters of a history query.

use crate::message::MessageRecord;

// ─── Direction ────────────────────────────────────────────────────────────────

/// Which side of the anchor message a page is taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Older messages (backfill, "scroll up").
    Before,
    /// Newer messages (catch-up, "scroll down").
    After,
    /// The anchor message itself.
    Exact,
}

impl Direction {
    /// Keyword used on the wire.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After  => "after",
            Self::Exact  => "",
        }
    }
}

// ─── Cursor ───────────────────────────────────────────────────────────────────

/// Where the next page query continues from.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cursor {
    /// Id of the anchor message; empty means "the most recent message".
    pub anchor_id:     String,
    /// Whether the anchor was sent by the session owner.
    pub anchor_is_own: bool,
    pub direction:     Direction,
}

impl Cursor {
    pub fn new(anchor_id: impl Into<String>, anchor_is_own: bool, direction: Direction) -> Self {
        Self { anchor_id: anchor_id.into(), anchor_is_own, direction }
    }

    /// Start of a backward scan: before the newest message.
    pub fn latest() -> Self {
        Self::new("", true, Direction::Before)
    }

    /// Forward scan starting after `message_id`, assuming it is our own.
    pub fn after(message_id: impl Into<String>) -> Self {
        Self::new(message_id, true, Direction::After)
    }

    /// Re-anchor on `record`, keeping the direction.
    pub fn advance_to(&mut self, record: &MessageRecord) {
        self.anchor_id.clone_from(&record.id);
        self.anchor_is_own = record.is_own_message;
    }

    /// Textual ownership flag used on the wire.
    pub fn owner_flag(&self) -> &'static str {
        if self.anchor_is_own { "true" } else { "false" }
    }
}

impl Default for Cursor {
    fn default() -> Self { Self::latest() }
}

// ─── QueryRequest ─────────────────────────────────────────────────────────────

/// One history query, as handed to [`crate::HistoryBackend::query`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    /// Query kind; history pages always use [`QueryRequest::MESSAGE_TAG`].
    pub tag:             &'static str,
    pub conversation_id: String,
    pub cursor:          Cursor,
    /// Number of records requested. Never zero.
    pub count:           usize,
}

impl QueryRequest {
    pub const MESSAGE_TAG: &'static str = "message";

    pub fn messages(conversation_id: impl Into<String>, cursor: Cursor, count: usize) -> Self {
        Self {
            tag:             Self::MESSAGE_TAG,
            conversation_id: conversation_id.into(),
            cursor,
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageContent;

    #[test]
    fn wire_encoding() {
        assert_eq!(Direction::Before.keyword(), "before");
        assert_eq!(Direction::After.keyword(), "after");
        assert_eq!(Direction::Exact.keyword(), "");
        assert_eq!(Cursor::latest().owner_flag(), "true");
        assert_eq!(Cursor::new("x", false, Direction::After).owner_flag(), "false");
    }

    #[test]
    fn advance_copies_id_and_ownership() {
        let mut cursor = Cursor::latest();
        let record = MessageRecord::new("m9", false, MessageContent::Text("hi".into()));
        cursor.advance_to(&record);
        assert_eq!(cursor, Cursor::new("m9", false, Direction::Before));
    }
}
