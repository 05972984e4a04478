//! Forward catch-up from a known message toward the live edge.
//!
//! The server answers "not found" both for unknown ids and for a known id
//! addressed with the wrong own-message flag. The crawl therefore starts by
//! assuming the anchor is our own, flips the flag once on "not found", and
//! gives up when two "not found" answers arrive back to back.

use crate::cursor::Cursor;
use crate::config::CrawlOptions;
use crate::dispatch::Handlers;
use crate::errors::{HistoryError, QueryError};
use crate::message::MessageRecord;
use crate::{History, HistoryBackend, pause_unless_cancelled};

// ─── CatchupState ─────────────────────────────────────────────────────────────

/// What the crawl does after a query outcome.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Page consumed, cursor moved to its element 0.
    Advance,
    /// Short page: the live edge has been reached.
    Done,
    /// Same anchor again with the own-message flag flipped.
    FlipOwner,
    /// Hand the error to the handlers and retry the same cursor.
    Report(HistoryError),
    /// Second consecutive "not found" for this anchor.
    GiveUp,
}

/// State of a catch-up crawl between two queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatchupState {
    pub cursor:         Cursor,
    /// The previous query was answered with "not found".
    pub prev_not_found: bool,
}

impl CatchupState {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self { cursor: Cursor::after(message_id), prev_not_found: false }
    }

    /// Consume a successful page of at most `chunk_size` records.
    pub fn on_page(&mut self, page: &[MessageRecord], chunk_size: usize) -> Transition {
        self.prev_not_found = false;
        match page.first() {
            Some(first) if page.len() >= chunk_size => {
                self.cursor.advance_to(first);
                Transition::Advance
            }
            _ => Transition::Done,
        }
    }

    /// Consume a failed query.
    ///
    /// A "not found" with the flag still set flips it. A "not found" with the
    /// flag already cleared is reported like any other failure but stays
    /// armed, so the next "not found" ends the crawl.
    pub fn on_error(&mut self, err: QueryError) -> Transition {
        if !err.is_not_found() {
            self.prev_not_found = false;
            return Transition::Report(HistoryError::from_query(err, &self.cursor));
        }
        if self.prev_not_found {
            return Transition::GiveUp;
        }
        self.prev_not_found = true;
        if self.cursor.anchor_is_own {
            self.cursor.anchor_is_own = false;
            return Transition::FlipOwner;
        }
        Transition::Report(HistoryError::from_query(err, &self.cursor))
    }
}

// ─── History methods ──────────────────────────────────────────────────────────

impl<B: HistoryBackend> History<B> {
    /// Load every message after `message_id`, page by page, until a short
    /// page arrives.
    ///
    /// Returns once the crawl ends; results and page errors go to the
    /// handlers only. A `chunk_size` of zero returns immediately.
    pub async fn load_history_after(
        &self,
        conversation: &str,
        message_id:   &str,
        handlers:     Option<Handlers>,
        options:      CrawlOptions,
    ) {
        let crawl = options.resolve(self.config());
        if crawl.chunk_size == 0 {
            return;
        }
        let handlers = self.handlers_or_default(handlers);
        let mut state = CatchupState::new(message_id);
        let mut pages = 0usize;

        tracing::info!("[scrollback] {conversation}: catching up after {message_id}");
        loop {
            if crawl.cancel.is_cancelled() {
                tracing::info!("[scrollback] {conversation}: catch-up cancelled");
                return;
            }

            let transition = match self.fetch_page(conversation, &state.cursor, crawl.chunk_size).await {
                Ok(page) => {
                    handlers.dispatch_page(&page);
                    pages += 1;
                    state.on_page(&page, crawl.chunk_size)
                }
                Err(e) => state.on_error(e),
            };

            let pause = match transition {
                Transition::Advance => crawl.pause,
                Transition::Done => {
                    tracing::info!("[scrollback] {conversation}: caught up ({pages} pages)");
                    return;
                }
                Transition::FlipOwner => {
                    tracing::debug!(
                        "[scrollback] {conversation}: {} not found as own message, retrying as foreign",
                        state.cursor.anchor_id,
                    );
                    self.config().ambiguity_retry_pause
                }
                Transition::Report(err) => {
                    handlers.dispatch_error(err);
                    crawl.pause
                }
                Transition::GiveUp => {
                    tracing::warn!(
                        "[scrollback] {conversation}: could not retrieve any messages after {}, wrong message id?",
                        state.cursor.anchor_id,
                    );
                    return;
                }
            };

            if !pause_unless_cancelled(pause, &crawl.cancel).await {
                tracing::info!("[scrollback] {conversation}: catch-up cancelled");
                return;
            }
        }
    }
}
