//! Console transport for local runs.
//!
//! Stands in for a real chat network: outbound messages print to stdout and
//! inbound messages are read line by line from stdin, all addressed to a
//! single local operator.

use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use tidecast_core::transport::{ChatAddress, ChatTransport, TransportError};

use crate::router::InboundMessage;

/// Transport that prints outbound traffic to stdout.
///
/// File sends print the path instead of streaming bytes; the operator already
/// has the file on local disk.
#[derive(Clone, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_text(&self, to: &ChatAddress, body: &str) -> Result<(), TransportError> {
        println!("[{to}] {body}");
        Ok(())
    }

    async fn send_file(&self, to: &ChatAddress, path: &Path) -> Result<(), TransportError> {
        println!("[{to}] <file: {}>", path.display());
        Ok(())
    }
}

/// Spawns a task reading stdin lines into an inbound-message channel.
///
/// Every line becomes a direct message from `from`. The channel closes when
/// stdin reaches end of file, which in turn stops the router loop.
pub fn spawn_stdin_inbox(from: ChatAddress) -> mpsc::Receiver<InboundMessage> {
    let (sender, receiver) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read console input: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let message = InboundMessage {
                from: from.clone(),
                body: line,
                is_group: false,
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
        tracing::debug!("Console input closed");
    });

    receiver
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_transport_accepts_sends() {
        let transport = ConsoleTransport::new();
        let operator = ChatAddress::new("console");
        transport.send_text(&operator, "hello").await.unwrap();
        transport
            .send_file(&operator, Path::new("a-segment-000.mp4"))
            .await
            .unwrap();
    }
}
