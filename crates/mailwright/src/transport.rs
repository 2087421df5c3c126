//! Mail transport collaborator.

use crate::error::Error;
use crate::message::Message;

/// Delivers a composed message.
///
/// Implementations own connection handling and any retry policy; errors are
/// handed back to the caller unchanged.
pub trait Transport {
    /// Error reported when delivery fails.
    type Error: std::error::Error + 'static;

    /// Sends `payload` from `sender` to every address in `recipients`.
    ///
    /// # Errors
    ///
    /// Returns the transport's own error if delivery fails.
    fn send(&self, sender: &str, recipients: &[String], payload: &[u8]) -> Result<(), Self::Error>;
}

/// Errors from [`Message::send`].
#[derive(Debug, thiserror::Error)]
pub enum SendError<E: std::error::Error + 'static> {
    /// The message could not be composed.
    #[error("Failed to compose message: {0}")]
    Compose(#[source] Error),

    /// The transport rejected the message.
    #[error("Transport failed: {0}")]
    Transport(#[source] E),
}

impl Message {
    /// Composes the message and hands it to `transport`, addressed to `to`
    /// followed by `cc`.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Compose`] if composing fails and
    /// [`SendError::Transport`] with the transport's error otherwise.
    pub fn send<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), SendError<T::Error>> {
        let payload = self.marshal().map_err(SendError::Compose)?;
        let recipients: Vec<String> = self.recipients().map(str::to_string).collect();

        tracing::debug!(
            id = %self.id,
            from = %self.from,
            recipients = recipients.len(),
            size = payload.len(),
            "Sending message"
        );
        transport
            .send(&self.from, &recipients, &payload)
            .map_err(SendError::Transport)
    }
}
