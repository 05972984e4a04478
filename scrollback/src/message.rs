//! Message records as returned by a history query, and their typed form.
//!
//! A [`MessageRecord`] is what the page decoder yields: the id, the
//! own-message flag that the protocol needs to address it again, and the raw
//! payload. [`TypedMessage`] is the classified view handed to handlers.

use std::fmt;

use crate::backend::HistoryBackend;
use crate::errors::HistoryError;

// ─── MessageRecord ────────────────────────────────────────────────────────────

/// One message as stored on the server.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageRecord {
    /// Unique message id within the conversation.
    pub id:              String,
    /// `true` if the message was sent by the session owner.
    pub is_own_message:  bool,
    /// Conversation the message belongs to (may be empty if the server omitted it).
    pub conversation_id: String,
    /// Unix timestamp, `0` if unknown.
    pub timestamp:       u64,
    /// Raw payload.
    pub content:         MessageContent,
}

impl MessageRecord {
    pub fn new(id: impl Into<String>, is_own_message: bool, content: MessageContent) -> Self {
        Self {
            id: id.into(),
            is_own_message,
            conversation_id: String::new(),
            timestamp: 0,
            content,
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Raw message payload, as carried by the protocol.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageContent {
    Text(String),
    Image(MediaInfo),
    Video(MediaInfo),
    Audio(MediaInfo),
    Document(MediaInfo),
    Sticker(MediaInfo),
    /// A payload kind this crate does not model (contacts, locations, ...).
    Unsupported(String),
    /// No payload at all (revoked or stub messages).
    Empty,
}

/// Everything needed to fetch a media blob.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaInfo {
    pub url:         String,
    pub media_key:   Vec<u8>,
    pub mime_type:   String,
    pub file_length: u64,
    pub caption:     Option<String>,
}

// ─── TypedMessage ─────────────────────────────────────────────────────────────

/// Kinds of media that expose a download capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image    => "image",
            Self::Video    => "video",
            Self::Audio    => "audio",
            Self::Document => "document",
            Self::Sticker  => "sticker",
        }
    }
}

/// A plain text message.
#[derive(Clone, Debug, PartialEq)]
pub struct TextMessage {
    pub id:             String,
    pub is_own_message: bool,
    pub timestamp:      u64,
    pub text:           String,
}

/// A message carrying a downloadable blob.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaMessage {
    pub id:             String,
    pub is_own_message: bool,
    pub timestamp:      u64,
    pub kind:           MediaKind,
    pub info:           MediaInfo,
}

impl MediaMessage {
    /// Fetch the blob through `backend`. Failures are returned as
    /// [`HistoryError::Download`].
    pub async fn download<B: HistoryBackend>(&self, backend: &B) -> Result<Vec<u8>, HistoryError> {
        backend.fetch_media(self).await.map_err(HistoryError::Download)
    }

    /// File name for saving the blob, with an extension guessed from the
    /// MIME type (`bin` if unknown).
    pub fn file_name(&self) -> String {
        let ext = mime_guess::get_mime_extensions_str(&self.info.mime_type)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin");
        format!("{}-{}.{ext}", self.kind.as_str(), self.id)
    }
}

/// A message with a payload kind this crate does not model.
#[derive(Clone, Debug, PartialEq)]
pub struct OtherMessage {
    pub id:             String,
    pub is_own_message: bool,
    pub kind:           String,
}

/// Classified message delivered to handlers.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedMessage {
    Text(TextMessage),
    Image(MediaMessage),
    Video(MediaMessage),
    Audio(MediaMessage),
    Document(MediaMessage),
    Sticker(MediaMessage),
    Other(OtherMessage),
    ConversionError(ConversionError),
}

impl TypedMessage {
    /// Classify a raw record. Never fails: a record that cannot be
    /// classified becomes [`TypedMessage::ConversionError`].
    pub fn from_record(record: &MessageRecord) -> Self {
        let media = |kind: MediaKind, info: &MediaInfo| -> Result<MediaMessage, ConversionError> {
            if info.url.is_empty() || info.media_key.is_empty() {
                return Err(ConversionError::new(
                    &record.id,
                    format!("{} message without url or media key", kind.as_str()),
                ));
            }
            Ok(MediaMessage {
                id:             record.id.clone(),
                is_own_message: record.is_own_message,
                timestamp:      record.timestamp,
                kind,
                info:           info.clone(),
            })
        };

        let typed = match &record.content {
            MessageContent::Text(text) => Ok(Self::Text(TextMessage {
                id:             record.id.clone(),
                is_own_message: record.is_own_message,
                timestamp:      record.timestamp,
                text:           text.clone(),
            })),
            MessageContent::Image(i)    => media(MediaKind::Image, i).map(Self::Image),
            MessageContent::Video(i)    => media(MediaKind::Video, i).map(Self::Video),
            MessageContent::Audio(i)    => media(MediaKind::Audio, i).map(Self::Audio),
            MessageContent::Document(i) => media(MediaKind::Document, i).map(Self::Document),
            MessageContent::Sticker(i)  => media(MediaKind::Sticker, i).map(Self::Sticker),
            MessageContent::Unsupported(kind) => Ok(Self::Other(OtherMessage {
                id:             record.id.clone(),
                is_own_message: record.is_own_message,
                kind:           kind.clone(),
            })),
            MessageContent::Empty => Err(ConversionError::new(&record.id, "message has no content")),
        };
        typed.unwrap_or_else(Self::ConversionError)
    }

    /// The download capability, if this variant has one.
    pub fn media(&self) -> Option<&MediaMessage> {
        match self {
            Self::Image(m) | Self::Video(m) | Self::Audio(m)
            | Self::Document(m) | Self::Sticker(m) => Some(m),
            _ => None,
        }
    }

    /// Message id, if the record could be classified.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Text(m) => Some(&m.id),
            Self::Other(m) => Some(&m.id),
            Self::ConversionError(_) => None,
            _ => self.media().map(|m| m.id.as_str()),
        }
    }
}

// ─── ConversionError ──────────────────────────────────────────────────────────

/// A record could not be turned into a [`TypedMessage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionError {
    pub message_id: String,
    pub reason:     String,
}

impl ConversionError {
    pub fn new(message_id: &str, reason: impl Into<String>) -> Self {
        Self { message_id: message_id.to_string(), reason: reason.into() }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot convert message {}: {}", self.message_id, self.reason)
    }
}

impl std::error::Error for ConversionError {}
