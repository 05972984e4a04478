//! Full-history backfill: backward crawl from the newest message to the
//! start of the conversation.
//!
//! The caller waits for the first page only (bounded by
//! [`HistoryConfig::handshake_timeout`]); the rest of the crawl runs in a
//! spawned task that outlives the call, including when the wait timed out.
//!
//! [`HistoryConfig::handshake_timeout`]: crate::HistoryConfig::handshake_timeout

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::CrawlOptions;
use crate::cursor::Cursor;
use crate::dispatch::Handlers;
use crate::errors::HistoryError;
use crate::{History, HistoryBackend, pause_unless_cancelled};

// ─── Backfill ─────────────────────────────────────────────────────────────────

/// Handle to a running backfill.
///
/// Dropping it detaches the crawl; it keeps running until it reaches the
/// start of the conversation or is cancelled.
pub struct Backfill {
    task:   Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Backfill {
    /// `true` once the background crawl has ended.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the crawl before its next query.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the crawl to end.
    pub async fn join(self) {
        if let Some(task) = self.task {
            if let Err(e) = task.await {
                tracing::warn!("[scrollback] backfill task failed: {e}");
            }
        }
    }
}

// ─── History methods ──────────────────────────────────────────────────────────

impl<B: HistoryBackend> History<B> {
    /// Load the whole history of `conversation`, newest pages first.
    ///
    /// Returns after the first page has been dispatched (or its error has
    /// been), or with [`HistoryError::Timeout`] if that takes longer than the
    /// handshake timeout. In both cases the crawl continues in the
    /// background, dispatching every later page and error to the handlers,
    /// until an empty page arrives. A failing page is retried forever.
    ///
    /// A `chunk_size` of zero returns immediately without crawling.
    pub async fn load_full_history(
        &self,
        conversation: &str,
        handlers:     Option<Handlers>,
        options:      CrawlOptions,
    ) -> Result<Backfill, HistoryError> {
        let crawl = options.resolve(self.config());
        if crawl.chunk_size == 0 {
            return Ok(Backfill { task: None, cancel: crawl.cancel });
        }

        let handlers     = self.handlers_or_default(handlers);
        let history      = self.clone();
        let conversation = conversation.to_string();
        let cancel       = crawl.cancel.clone();
        let (first_tx, first_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut first_tx = Some(first_tx);
            let mut cursor   = Cursor::latest();
            let mut records  = 0usize;

            tracing::info!("[scrollback] {conversation}: backfill started");
            loop {
                if crawl.cancel.is_cancelled() {
                    tracing::info!("[scrollback] {conversation}: backfill cancelled ({records} records)");
                    break;
                }

                let exhausted = match history.fetch_page(&conversation, &cursor, crawl.chunk_size).await {
                    Ok(page) => {
                        handlers.dispatch_page(&page);
                        records += page.len();
                        match page.first() {
                            Some(first) => {
                                cursor.advance_to(first);
                                false
                            }
                            None => true,
                        }
                    }
                    Err(e) => {
                        handlers.dispatch_error(HistoryError::from_query(e, &cursor));
                        false
                    }
                };

                if let Some(tx) = first_tx.take() {
                    // the caller may have timed out already
                    let _ = tx.send(());
                }
                if exhausted {
                    tracing::info!("[scrollback] {conversation}: backfill complete ({records} records)");
                    break;
                }
                if !pause_unless_cancelled(crawl.pause, &crawl.cancel).await {
                    tracing::info!("[scrollback] {conversation}: backfill cancelled ({records} records)");
                    break;
                }
            }
        });

        let timeout = self.config().handshake_timeout;
        match tokio::time::timeout(timeout, first_rx).await {
            Ok(_) => Ok(Backfill { task: Some(task), cancel }),
            Err(_) => {
                tracing::warn!("[scrollback] first backfill page not loaded within {timeout:?}, crawl continues");
                Err(HistoryError::Timeout(timeout))
            }
        }
    }
}
