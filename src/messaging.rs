//! Outgoing chat messages.
//!
//! The battle engine only ever talks to players through [`ChatSink`]. Delivery
//! is fire-and-forget: a sink that cannot deliver drops the message and logs
//! it, it never fails the caller.

use log::{info, warn};
use tokio::sync::mpsc;

use crate::logutil::escape_log;

/// One message bound for a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub channel: String,
    pub text: String,
}

pub trait ChatSink: Send + Sync {
    fn send_message(&self, channel: &str, text: &str);
}

/// Forwards messages to an unbounded channel drained by the transport task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutgoingMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<OutgoingMessage>) -> Self {
        Self { tx }
    }

    /// A sink plus the receiving end for the transport.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ChatSink for ChannelSink {
    fn send_message(&self, channel: &str, text: &str) {
        let msg = OutgoingMessage {
            channel: channel.to_string(),
            text: text.to_string(),
        };
        if self.tx.send(msg).is_err() {
            warn!(
                "Dropping message for {}: transport closed ({})",
                channel,
                escape_log(text)
            );
        }
    }
}

/// Writes every message to the log. Used when no transport is attached.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl ChatSink for LogSink {
    fn send_message(&self, channel: &str, text: &str) {
        info!("[{}] {}", channel, escape_log(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::pair();
        sink.send_message("general", "one");
        sink.send_message("general", "two");
        assert_eq!(rx.recv().await.map(|m| m.text), Some("one".to_string()));
        assert_eq!(rx.recv().await.map(|m| m.text), Some("two".to_string()));
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (sink, rx) = ChannelSink::pair();
        drop(rx);
        sink.send_message("general", "lost");
    }
}
