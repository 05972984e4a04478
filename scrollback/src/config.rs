//! Crawl configuration.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Configuration for [`crate::History`].
#[derive(Clone, Debug)]
pub struct HistoryConfig {
    /// Records requested per page by the crawls.
    pub chunk_size:            usize,
    /// Sleep between two page queries of one crawl.
    pub pause_between_queries: Duration,
    /// Sleep before retrying a catch-up page with the ownership flag flipped.
    pub ambiguity_retry_pause: Duration,
    /// How long a full-history call waits for its first page.
    pub handshake_timeout:     Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            chunk_size:            50,
            pause_between_queries: Duration::from_secs(1),
            ambiguity_retry_pause: Duration::from_secs(1),
            handshake_timeout:     Duration::from_secs(30),
        }
    }
}

/// Per-call overrides for a crawl. Unset fields fall back to [`HistoryConfig`].
#[derive(Clone, Debug, Default)]
pub struct CrawlOptions {
    pub chunk_size: Option<usize>,
    pub pause:      Option<Duration>,
    /// Stops the crawl before its next query once cancelled.
    pub cancel:     Option<CancellationToken>,
}

impl CrawlOptions {
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    pub fn pause(mut self, d: Duration) -> Self {
        self.pause = Some(d);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn resolve(self, config: &HistoryConfig) -> Crawl {
        Crawl {
            chunk_size: self.chunk_size.unwrap_or(config.chunk_size),
            pause:      self.pause.unwrap_or(config.pause_between_queries),
            cancel:     self.cancel.unwrap_or_default(),
        }
    }
}

/// Settings of one running crawl.
#[derive(Clone, Debug)]
pub(crate) struct Crawl {
    pub chunk_size: usize,
    pub pause:      Duration,
    pub cancel:     CancellationToken,
}
