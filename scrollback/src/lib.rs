//! # scrollback
//!
//! Chat-history backfill and catch-up engine for session-oriented messaging
//! protocols.
//!
//! ## Features
//! - Bounded "scroll N messages" page loads before / after any message
//! - Full-history backfill: first page awaited, the rest crawled in the background
//! - Forward catch-up from a known message, recovering from the protocol's
//!   ambiguous "not found" answer for a wrong own-message flag
//! - Single message lookup and media download by message id
//! - Every decoded record dispatched to an ordered handler list, typed event first
//! - Pluggable [`HistoryBackend`], with an in-memory [`MemoryBackend`]

#![deny(unsafe_code)]

mod errors;
pub mod backend;
pub mod backfill;
pub mod catchup;
pub mod config;
pub mod cursor;
pub mod decode;
pub mod dispatch;
pub mod locate;
pub mod message;
pub mod node;

pub use backend::{HistoryBackend, MemoryBackend};
pub use backfill::Backfill;
pub use catchup::{CatchupState, Transition};
pub use config::{CrawlOptions, HistoryConfig};
pub use cursor::{Cursor, Direction, QueryRequest};
pub use dispatch::{Event, Handler, Handlers};
pub use errors::{HistoryError, QueryError};
pub use message::{
    ConversionError, MediaInfo, MediaKind, MediaMessage, MessageContent, MessageRecord, TypedMessage,
};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

// ─── HistoryInner ─────────────────────────────────────────────────────────────

struct HistoryInner<B> {
    backend:  B,
    config:   HistoryConfig,
    handlers: Handlers,
}

/// History engine bound to one session backend. Cheap to clone — internally
/// Arc-wrapped.
///
/// `handlers` given at construction are the session's default list; every
/// call that takes `Option<Handlers>` uses them when passed `None`.
pub struct History<B> {
    inner: Arc<HistoryInner<B>>,
}

impl<B> Clone for History<B> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<B: HistoryBackend> History<B> {
    pub fn new(backend: B, config: HistoryConfig, handlers: Handlers) -> Self {
        tracing::debug!("[scrollback] history engine on {} backend", backend.name());
        Self { inner: Arc::new(HistoryInner { backend, config, handlers }) }
    }

    pub fn backend(&self) -> &B { &self.inner.backend }

    pub fn config(&self) -> &HistoryConfig { &self.inner.config }

    /// The session's default handler list.
    pub fn default_handlers(&self) -> &Handlers { &self.inner.handlers }

    pub(crate) fn handlers_or_default(&self, handlers: Option<Handlers>) -> Handlers {
        handlers.unwrap_or_else(|| self.inner.handlers.clone())
    }

    // ── Single page ────────────────────────────────────────────────────────

    /// Load one page of `count` records next to `cursor` and dispatch it.
    ///
    /// `count == 0` is a no-op. A failed query is dispatched to the handlers
    /// and returned.
    pub async fn load_messages(
        &self,
        conversation: &str,
        count:        usize,
        cursor:       Cursor,
        handlers:     Option<Handlers>,
    ) -> Result<(), HistoryError> {
        if count == 0 {
            return Ok(());
        }
        let handlers = self.handlers_or_default(handlers);

        match self.fetch_page(conversation, &cursor, count).await {
            Ok(page) => {
                handlers.dispatch_page(&page);
                Ok(())
            }
            Err(e) => {
                let err = HistoryError::from_query(e, &cursor);
                handlers.dispatch_error(err.clone());
                Err(err)
            }
        }
    }

    /// Page through `conversation` from `cursor` without dispatching.
    ///
    /// # Example
    /// ```rust,no_run
    /// # async fn f(history: scrollback::History<scrollback::MemoryBackend>) -> Result<(), scrollback::HistoryError> {
    /// let mut iter = history.iter_messages("c1", scrollback::Cursor::latest(), 50);
    /// while let Some(record) = iter.next(&history).await? {
    ///     println!("{}", record.id);
    /// }
    /// # Ok(()) }
    /// ```
    pub fn iter_messages(&self, conversation: &str, cursor: Cursor, page_size: usize) -> PageIter {
        PageIter {
            conversation: conversation.to_string(),
            cursor,
            page_size,
            done:         page_size == 0,
            buffer:       VecDeque::new(),
        }
    }

    // ── Shared plumbing ────────────────────────────────────────────────────

    /// Query one page and decode it. `count` must be non-zero.
    pub(crate) async fn fetch_page(
        &self,
        conversation: &str,
        cursor:       &Cursor,
        count:        usize,
    ) -> Result<Vec<MessageRecord>, QueryError> {
        let request = QueryRequest::messages(conversation, cursor.clone(), count);
        tracing::debug!(
            "[scrollback] {conversation}: {} {:?} (own={}) x{count}",
            cursor.direction.keyword(), cursor.anchor_id, cursor.anchor_is_own,
        );
        let node = self.inner.backend.query(&request).await?;
        let page = decode::decode_messages(node);
        tracing::debug!("[scrollback] {conversation}: page of {} records", page.len());
        Ok(page)
    }
}

/// Sleep for `pause`; returns `false` if `cancel` fired first.
pub(crate) async fn pause_unless_cancelled(pause: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(pause) => true,
        _ = cancel.cancelled()        => false,
    }
}

// ─── PageIter ─────────────────────────────────────────────────────────────────

/// Cursor-based iterator over one direction of a conversation. Created by
/// [`History::iter_messages`].
///
/// Records are yielded in server order. Iteration ends after an empty or
/// short page.
pub struct PageIter {
    conversation: String,
    cursor:       Cursor,
    page_size:    usize,
    done:         bool,
    buffer:       VecDeque<MessageRecord>,
}

impl PageIter {
    /// Fetch the next record. Returns `None` once the history is exhausted.
    pub async fn next<B: HistoryBackend>(
        &mut self,
        history: &History<B>,
    ) -> Result<Option<MessageRecord>, HistoryError> {
        if let Some(m) = self.buffer.pop_front() { return Ok(Some(m)); }
        if self.done { return Ok(None); }

        let page = history.fetch_page(&self.conversation, &self.cursor, self.page_size).await
            .map_err(|e| HistoryError::from_query(e, &self.cursor))?;

        if page.len() < self.page_size {
            self.done = true;
        }
        if let Some(first) = page.first() {
            self.cursor.advance_to(first);
        }

        self.buffer.extend(page);
        Ok(self.buffer.pop_front())
    }

    /// Cursor the next page will be requested from.
    pub fn cursor(&self) -> &Cursor { &self.cursor }
}
