#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scrollback::{
    Event, Handlers, HistoryBackend, MediaInfo, MediaMessage, MessageContent, MessageRecord,
    QueryError, QueryRequest,
};
use scrollback::node::Node;
use tokio::sync::Notify;

// ── Scripted backend ──────────────────────────────────────────────────────────

pub enum Reply {
    Page(Vec<MessageRecord>),
    Fail(QueryError),
    /// Wait for the gate, then answer with the page.
    Gated(Arc<Notify>, Vec<MessageRecord>),
}

/// Answers queries from a script; an exhausted script answers empty pages.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    log:     Mutex<Vec<QueryRequest>>,
    media:   Mutex<Option<Result<Vec<u8>, QueryError>>>,
    fetches: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()), ..Default::default() }
    }

    pub fn with_media(self, result: Result<Vec<u8>, QueryError>) -> Self {
        *self.media.lock().unwrap() = Some(result);
        self
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl HistoryBackend for ScriptedBackend {
    async fn query(&self, request: &QueryRequest) -> Result<Option<Node>, QueryError> {
        self.log.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(Some(Node::history(Vec::new()))),
            Some(Reply::Page(page)) => Ok(Some(Node::history(page))),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Gated(gate, page)) => {
                gate.notified().await;
                Ok(Some(Node::history(page)))
            }
        }
    }

    async fn fetch_media(&self, _media: &MediaMessage) -> Result<Vec<u8>, QueryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.media.lock().unwrap().clone().unwrap_or(Err(QueryError::Dropped))
    }

    fn name(&self) -> &str { "scripted" }
}

// ── Records ───────────────────────────────────────────────────────────────────

pub fn text(id: &str, own: bool) -> MessageRecord {
    MessageRecord::new(id, own, MessageContent::Text(format!("text of {id}")))
}

pub fn texts(ids: &[&str]) -> Vec<MessageRecord> {
    ids.iter().map(|id| text(id, false)).collect()
}

pub fn image(id: &str, url: &str) -> MessageRecord {
    MessageRecord::new(id, false, MessageContent::Image(MediaInfo {
        url:         url.to_string(),
        media_key:   vec![7; 32],
        mime_type:   "image/jpeg".into(),
        file_length: 3,
        caption:     None,
    }))
}

// ── Event collection ──────────────────────────────────────────────────────────

pub type Seen = Arc<Mutex<Vec<Event>>>;

pub fn collector() -> (Handlers, Seen) {
    let seen: Seen = Arc::default();
    let sink = seen.clone();
    let handlers = Handlers::new().with(move |e: &Event| sink.lock().unwrap().push(e.clone()));
    (handlers, seen)
}

pub fn labels(seen: &Seen) -> Vec<String> {
    seen.lock().unwrap().iter().map(|e| match e {
        Event::Message(m) => format!("typed({})", m.id().unwrap_or("?")),
        Event::Raw(r)     => format!("raw({})", r.id),
        Event::Error(_)   => "error".to_string(),
    }).collect()
}

pub fn raw_ids(seen: &Seen) -> Vec<String> {
    seen.lock().unwrap().iter().filter_map(|e| match e {
        Event::Raw(r) => Some(r.id.clone()),
        _ => None,
    }).collect()
}
