//! Chat transport abstraction.
//!
//! The pipeline only needs two operations from whatever messaging system
//! hosts it: send a text and send a file attachment, both addressed to an
//! opaque requester identity. Implementations live behind [`ChatTransport`]
//! so tests and local runs can swap the real messenger out.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque requester identity used for notification routing and registry
/// keying. The core never interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatAddress(String);

impl ChatAddress {
    /// Wraps a transport-specific identity string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from outbound chat sends.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying messenger refused or failed the send.
    #[error("Send to {to} failed: {reason}")]
    SendFailed { to: String, reason: String },

    /// The attachment could not be read from disk.
    #[error("Attachment unreadable: {reason}")]
    AttachmentUnreadable { reason: String },
}

/// Outbound side of the chat channel.
///
/// Sends are terminal: a failed send is reported to the caller and never
/// retried by the core.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a text message to the given requester.
    ///
    /// # Errors
    /// - `TransportError::SendFailed` - The messenger rejected the send
    async fn send_text(&self, to: &ChatAddress, body: &str) -> Result<(), TransportError>;

    /// Sends a file as a document attachment to the given requester.
    ///
    /// # Errors
    /// - `TransportError::SendFailed` - The messenger rejected the send
    /// - `TransportError::AttachmentUnreadable` - The file could not be read
    async fn send_file(&self, to: &ChatAddress, path: &Path) -> Result<(), TransportError>;
}

/// A message recorded by [`ChannelTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text {
        to: ChatAddress,
        body: String,
    },
    File {
        to: ChatAddress,
        path: std::path::PathBuf,
        /// Guessed content type of the attachment
        mime_type: String,
    },
}

/// In-memory transport recording every send.
///
/// Used by the test suites and available to embedders that want to inspect
/// outbound traffic instead of delivering it.
#[derive(Clone, Default)]
pub struct ChannelTransport {
    outbox: Arc<parking_lot::Mutex<Vec<OutboundMessage>>>,
    fail_sends: bool,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail, for delivery-failure tests.
    pub fn failing(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Returns a snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.outbox.lock().clone()
    }

    /// Returns the text bodies sent to one requester, in order.
    pub fn texts_to(&self, address: &ChatAddress) -> Vec<String> {
        self.outbox
            .lock()
            .iter()
            .filter_map(|message| match message {
                OutboundMessage::Text { to, body } if to == address => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the file paths sent to one requester, in order.
    pub fn files_to(&self, address: &ChatAddress) -> Vec<std::path::PathBuf> {
        self.outbox
            .lock()
            .iter()
            .filter_map(|message| match message {
                OutboundMessage::File { to, path, .. } if to == address => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for ChannelTransport {
    async fn send_text(&self, to: &ChatAddress, body: &str) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::SendFailed {
                to: to.to_string(),
                reason: "channel transport configured to fail".to_string(),
            });
        }
        self.outbox.lock().push(OutboundMessage::Text {
            to: to.clone(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn send_file(&self, to: &ChatAddress, path: &Path) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::SendFailed {
                to: to.to_string(),
                reason: "channel transport configured to fail".to_string(),
            });
        }
        let mime_type = mime_guess::from_path(path).first_or_octet_stream();
        self.outbox.lock().push(OutboundMessage::File {
            to: to.clone(),
            path: path.to_path_buf(),
            mime_type: mime_type.essence_str().to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_transport_records_sends() {
        let transport = ChannelTransport::new();
        let alice = ChatAddress::new("alice");

        transport.send_text(&alice, "hello").await.unwrap();
        transport
            .send_file(&alice, Path::new("abc-segment-000.mp4"))
            .await
            .unwrap();

        assert_eq!(transport.texts_to(&alice), vec!["hello".to_string()]);
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        match &sent[1] {
            OutboundMessage::File { mime_type, .. } => assert_eq!(mime_type, "video/mp4"),
            other => panic!("expected file message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_transport_rejects_sends() {
        let transport = ChannelTransport::new().failing();
        let alice = ChatAddress::new("alice");

        let result = transport.send_text(&alice, "hello").await;
        assert!(matches!(result, Err(TransportError::SendFailed { .. })));
        assert!(transport.sent().is_empty());
    }
}
