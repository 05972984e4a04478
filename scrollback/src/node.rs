//! Raw query response tree.
//!
//! The protocol multiplexes heterogeneous entries under a single response
//! node; only [`Entry::Message`] entries are history records.

use std::collections::HashMap;

use crate::message::MessageRecord;

/// A response node as produced by the wire decoder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub tag:     String,
    pub attrs:   Option<HashMap<String, String>>,
    pub content: Option<Content>,
}

/// Body of a [`Node`].
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// Child entries, in server order.
    List(Vec<Entry>),
    Bytes(Vec<u8>),
    Text(String),
}

/// One child entry of a response.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    Message(MessageRecord),
    Node(Node),
    Bytes(Vec<u8>),
}

impl Entry {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Message(m) => format!("message {}", m.id),
            Self::Node(n)    => format!("node <{}>", n.tag),
            Self::Bytes(b)   => format!("{} raw bytes", b.len()),
        }
    }
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), attrs: None, content: None }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.get_or_insert_with(HashMap::new).insert(key.into(), value.into());
        self
    }

    pub fn with_entries(mut self, entries: Vec<Entry>) -> Self {
        self.content = Some(Content::List(entries));
        self
    }

    /// Build a history response the way the server shapes it.
    pub fn history(records: impl IntoIterator<Item = MessageRecord>) -> Self {
        Self::new("action")
            .with_attr("add", "before")
            .with_entries(records.into_iter().map(Entry::Message).collect())
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(key).map(String::as_str)
    }
}
