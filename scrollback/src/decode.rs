//! Page decoding: response node → ordered message records.

use crate::message::MessageRecord;
use crate::node::{Content, Entry, Node};

/// Extract the message records of a history response, in server order.
///
/// A missing response, or one without attributes or content, is an empty
/// page. Entries that are not messages are skipped with a warning; decoding
/// never fails on partial garbage.
pub fn decode_messages(node: Option<Node>) -> Vec<MessageRecord> {
    let Some(node) = node else { return Vec::new() };
    if node.attrs.is_none() {
        return Vec::new();
    }

    let entries = match node.content {
        Some(Content::List(entries)) => entries,
        None => return Vec::new(),
        Some(Content::Bytes(b)) => {
            tracing::warn!("[scrollback] <{}> response carries {} raw bytes instead of entries", node.tag, b.len());
            return Vec::new();
        }
        Some(Content::Text(_)) => {
            tracing::warn!("[scrollback] <{}> response carries text instead of entries", node.tag);
            return Vec::new();
        }
    };

    let mut messages = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Entry::Message(m) => messages.push(m),
            other => tracing::warn!("[scrollback] non-message entry in history response: {}", other.describe()),
        }
    }
    messages
}
