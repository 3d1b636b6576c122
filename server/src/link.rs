//! Per-participant outbound channel owned by a transport adapter

use crate::error::TransportError;
use shared::{ParticipantId, ServerEvent};
use std::fmt;
use tokio::sync::mpsc;

/// Which transport adapter a participant arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Udp,
    WebSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Udp => f.write_str("udp"),
            TransportKind::WebSocket => f.write_str("websocket"),
        }
    }
}

/// Sending half of a participant's event stream.
///
/// The transport keeps the receiving half and drains it into its socket.
/// When the registry drops the participant, the last sender goes away and
/// the transport's writer observes a closed channel.
#[derive(Debug, Clone)]
pub struct Link {
    kind: TransportKind,
    outbox: mpsc::UnboundedSender<ServerEvent>,
}

impl Link {
    pub fn channel(kind: TransportKind) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        (Self { kind, outbox }, inbox)
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Queues an event without waiting on the network.
    pub fn send(&self, to: ParticipantId, event: ServerEvent) -> Result<(), TransportError> {
        self.outbox
            .send(event)
            .map_err(|_| TransportError::ChannelClosed(to))
    }
}
