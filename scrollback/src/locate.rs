//! Single message lookup and media download by message id.
//!
//! Addressing a message needs its own-message flag, which the caller usually
//! does not know. The lookup first resolves the id, then re-addresses it
//! with the flag set and, if the server answers "not found", with the flag
//! cleared.

use crate::cursor::{Cursor, Direction};
use crate::errors::HistoryError;
use crate::message::{MessageRecord, TypedMessage};
use crate::{History, HistoryBackend};

impl<B: HistoryBackend> History<B> {
    /// Resolve `message_id` to a record.
    ///
    /// Returns the first record of the one-record page following the resolved
    /// id, or [`HistoryError::NotFound`] if the id cannot be resolved under
    /// either ownership flag.
    pub async fn locate_message(
        &self,
        conversation: &str,
        message_id:   &str,
    ) -> Result<MessageRecord, HistoryError> {
        let not_found = |cause| HistoryError::NotFound { message_id: message_id.to_string(), cause };

        let lookup = Cursor::new(message_id, false, Direction::Exact);
        let resolved = self.fetch_page(conversation, &lookup, 1).await
            .map_err(|e| not_found(Some(e)))?;

        for record in resolved {
            let mut cursor = Cursor::new(record.id, true, Direction::After);
            let page = match self.fetch_page(conversation, &cursor, 1).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::debug!("[scrollback] {conversation}: {} as own message: {e}", cursor.anchor_id);
                    cursor.anchor_is_own = false;
                    self.fetch_page(conversation, &cursor, 1).await
                        .map_err(|e| not_found(Some(e)))?
                }
            };
            if let Some(found) = page.into_iter().next() {
                return Ok(found);
            }
        }

        Err(not_found(None))
    }

    /// Locate `message_id` and download its media.
    ///
    /// Conversion failures and download failures are returned as they are;
    /// a message without a download capability yields
    /// [`HistoryError::NotDownloadable`].
    pub async fn download_media(
        &self,
        conversation: &str,
        message_id:   &str,
    ) -> Result<Vec<u8>, HistoryError> {
        let record = self.locate_message(conversation, message_id).await?;
        let typed = TypedMessage::from_record(&record);
        if let TypedMessage::ConversionError(e) = typed {
            return Err(e.into());
        }
        match typed.media() {
            Some(media) => {
                tracing::debug!(
                    "[scrollback] downloading {} of message {} ({} bytes)",
                    media.kind.as_str(), media.id, media.info.file_length,
                );
                media.download(self.backend()).await
            }
            None => Err(HistoryError::NotDownloadable),
        }
    }
}
