//! Pluggable history backend.
//!
//! The [`HistoryBackend`] trait is the seam between the history engine and
//! whatever speaks the wire protocol: it issues one history query at a time
//! and fetches media blobs. The backend is shared by concurrent crawls and
//! must synchronise itself.
//!
//! [`MemoryBackend`] keeps conversations in memory and reproduces the
//! protocol's paging and ownership rules. It backs the demo binary and the
//! integration tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cursor::{Direction, QueryRequest};
use crate::errors::QueryError;
use crate::message::{MediaMessage, MessageRecord};
use crate::node::Node;

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Query capability used by every history operation.
pub trait HistoryBackend: Send + Sync + 'static {
    /// Issue one history query and wait for its response.
    ///
    /// `Ok(None)` is an empty response. `request.count` is never zero.
    fn query(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<Option<Node>, QueryError>> + Send;

    /// Download the blob behind a media message.
    fn fetch_media(
        &self,
        media: &MediaMessage,
    ) -> impl Future<Output = Result<Vec<u8>, QueryError>> + Send;

    /// Human-readable name of this backend (for log messages).
    fn name(&self) -> &str;
}

// ─── MemoryBackend ────────────────────────────────────────────────────────────

/// In-memory conversation store speaking the history query contract.
///
/// Paging rules:
/// * `Before` returns up to `count` records older than the anchor (or the
///   newest ones for an empty anchor), oldest first, so element 0 is the
///   next backward anchor.
/// * `After` returns up to `count` records newer than the anchor, newest
///   first, so element 0 is the next forward anchor.
/// * `Exact` returns the anchor record itself.
///
/// A `Before`/`After` anchor addressed with the wrong own-message flag, or
/// an unknown anchor, is answered with status 404.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    /// Oldest first.
    conversations: HashMap<String, Vec<MessageRecord>>,
    media:         HashMap<String, Vec<u8>>,
    failures:      VecDeque<QueryError>,
    log:           Vec<QueryRequest>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `record` as the newest message of `conversation`.
    pub fn push(&self, conversation: &str, record: MessageRecord) {
        let record = record.in_conversation(conversation);
        self.state().conversations.entry(conversation.to_string()).or_default().push(record);
    }

    pub fn extend(&self, conversation: &str, records: impl IntoIterator<Item = MessageRecord>) {
        for record in records {
            self.push(conversation, record);
        }
    }

    /// Make `bytes` downloadable at `url`.
    pub fn put_media(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.state().media.insert(url.into(), bytes);
    }

    /// Fail the next query with `err` (queued failures are consumed in order).
    pub fn fail_next(&self, err: QueryError) {
        self.state().failures.push_back(err);
    }

    /// Every query received so far, in order.
    pub fn queries(&self) -> Vec<QueryRequest> {
        self.state().log.clone()
    }

    pub fn message_count(&self, conversation: &str) -> usize {
        self.state().conversations.get(conversation).map_or(0, Vec::len)
    }

    fn answer(&self, request: &QueryRequest) -> Result<Option<Node>, QueryError> {
        let mut state = self.state();
        state.log.push(request.clone());
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }

        let Some(records) = state.conversations.get(&request.conversation_id) else {
            return Err(QueryError::Status(QueryError::NOT_FOUND));
        };
        let cursor = &request.cursor;

        let anchor = if cursor.anchor_id.is_empty() {
            None
        } else {
            let idx = records.iter().position(|r| r.id == cursor.anchor_id)
                .ok_or(QueryError::Status(QueryError::NOT_FOUND))?;
            if cursor.direction != Direction::Exact && records[idx].is_own_message != cursor.anchor_is_own {
                return Err(QueryError::Status(QueryError::NOT_FOUND));
            }
            Some(idx)
        };

        let page: Vec<MessageRecord> = match (cursor.direction, anchor) {
            (Direction::Exact, Some(idx)) => vec![records[idx].clone()],
            (Direction::Exact, None) => Vec::new(),
            (Direction::Before, anchor) => {
                let end = anchor.unwrap_or(records.len());
                let start = end.saturating_sub(request.count);
                records[start..end].to_vec()
            }
            (Direction::After, anchor) => {
                let start = anchor.map_or(0, |i| i + 1);
                let end = (start + request.count).min(records.len());
                records[start..end].iter().rev().cloned().collect()
            }
        };
        Ok(Some(Node::history(page)))
    }
}

impl HistoryBackend for MemoryBackend {
    async fn query(&self, request: &QueryRequest) -> Result<Option<Node>, QueryError> {
        self.answer(request)
    }

    async fn fetch_media(&self, media: &MediaMessage) -> Result<Vec<u8>, QueryError> {
        self.state().media.get(&media.info.url).cloned()
            .ok_or(QueryError::Status(QueryError::NOT_FOUND))
    }

    fn name(&self) -> &str { "in-memory" }
}
