//! Handler list and event dispatch.
//!
//! Every decoded record produces two events, in order: the classified
//! [`Event::Message`] followed by the raw [`Event::Raw`]. Page-level failures
//! of crawls are delivered as [`Event::Error`].

use std::fmt;
use std::sync::Arc;

use crate::errors::HistoryError;
use crate::message::{MessageRecord, TypedMessage};

// ─── Event ────────────────────────────────────────────────────────────────────

/// What a [`Handler`] receives.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Error(HistoryError),
    Message(TypedMessage),
    Raw(MessageRecord),
}

// ─── Handler ──────────────────────────────────────────────────────────────────

/// Receiver of history events.
///
/// Concurrent crawls may call the same handler at the same time, hence the
/// `Send + Sync` bound. Any `Fn(&Event) + Send + Sync` closure is a handler.
pub trait Handler: Send + Sync {
    fn handle(&self, event: &Event);
}

impl<F> Handler for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn handle(&self, event: &Event) {
        self(event)
    }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

/// Ordered list of handlers. Cheap to clone.
#[derive(Clone, Default)]
pub struct Handlers {
    list: Arc<Vec<Arc<dyn Handler>>>,
}

impl Handlers {
    pub fn new() -> Self { Self::default() }

    /// Append a handler; handlers run in insertion order.
    pub fn with(mut self, handler: impl Handler + 'static) -> Self {
        self.push(handler);
        self
    }

    pub fn push(&mut self, handler: impl Handler + 'static) {
        Arc::make_mut(&mut self.list).push(Arc::new(handler));
    }

    pub fn push_shared(&mut self, handler: Arc<dyn Handler>) {
        Arc::make_mut(&mut self.list).push(handler);
    }

    pub fn len(&self) -> usize { self.list.len() }

    pub fn is_empty(&self) -> bool { self.list.is_empty() }

    /// Deliver `event` to every handler, in order.
    pub fn dispatch(&self, event: &Event) {
        for handler in self.list.iter() {
            handler.handle(event);
        }
    }

    pub(crate) fn dispatch_error(&self, err: HistoryError) {
        tracing::warn!("[scrollback] {err}");
        self.dispatch(&Event::Error(err));
    }

    /// Deliver a whole page, record by record: typed event, then raw event.
    pub(crate) fn dispatch_page(&self, page: &[MessageRecord]) {
        for record in page {
            self.dispatch(&Event::Message(TypedMessage::from_record(record)));
            self.dispatch(&Event::Raw(record.clone()));
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handlers {{ len: {} }}", self.list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::message::MessageContent;

    #[test]
    fn typed_event_precedes_raw_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handlers = Handlers::new().with(move |e: &Event| {
            let tag = match e {
                Event::Message(m) => format!("typed({})", m.id().unwrap_or("?")),
                Event::Raw(r)     => format!("raw({})", r.id),
                Event::Error(_)   => "error".to_string(),
            };
            sink.lock().unwrap().push(tag);
        });

        let page = ["m2", "m1"].map(|id| MessageRecord::new(id, true, MessageContent::Text(id.into())));
        handlers.dispatch_page(&page);

        assert_eq!(*seen.lock().unwrap(), ["typed(m2)", "raw(m2)", "typed(m1)", "raw(m1)"]);
    }

    #[test]
    fn handlers_run_in_insertion_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());
        let handlers = Handlers::new()
            .with(move |_: &Event| a.lock().unwrap().push("first"))
            .with(move |_: &Event| b.lock().unwrap().push("second"));

        handlers.dispatch(&Event::Error(HistoryError::NotDownloadable));
        assert_eq!(*seen.lock().unwrap(), ["first", "second"]);
        assert_eq!(handlers.len(), 2);
    }
}
