//! UDP transport speaking the pipe-delimited text protocol
//!
//! A participant is identified by the source address of its datagrams. Each
//! admitted participant gets a writer task that drains its [`Link`] into the
//! socket; the task ends when the registry drops the link.

use crate::context::{Admission, ServerContext};
use crate::error::TransportError;
use crate::link::{Link, TransportKind};
use crate::network::{dispatch, Flow};
use log::{debug, error, info, warn};
use shared::{text, ClientCommand, ServerEvent};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

const MAX_DATAGRAM: usize = 2048;

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    context: Arc<ServerContext>,
    /// Source address -> admitted participant
    sessions: HashMap<SocketAddr, Admission>,
}

impl UdpTransport {
    pub async fn bind(addr: &str, context: Arc<ServerContext>) -> std::io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("UDP transport listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            context,
            sessions: HashMap::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive loop. Runs until the task is dropped.
    pub async fn run(mut self) {
        // One spare byte so an oversized datagram shows up as too long
        // instead of silently truncated
        let mut buffer = [0u8; MAX_DATAGRAM + 1];

        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => self.handle_datagram(&buffer[..len], addr).await,
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    async fn handle_datagram(&mut self, data: &[u8], addr: SocketAddr) {
        if data.len() > MAX_DATAGRAM {
            warn!(
                "Dropping oversized datagram from {} (more than {} bytes)",
                addr, MAX_DATAGRAM
            );
            return;
        }

        let command = match std::str::from_utf8(data)
            .map_err(|_| shared::DecodeError::InvalidField {
                field: "datagram",
                value: String::from_utf8_lossy(data).into_owned(),
            })
            .and_then(text::decode_command)
        {
            Ok(command) => command,
            Err(e) => {
                warn!("Dropping unparsable datagram from {}: {}", addr, e);
                return;
            }
        };
        debug!("{} -> {:?}", addr, command);

        match command {
            ClientCommand::Connect { card_id } => self.handle_connect(card_id, addr).await,
            command => self.handle_command(command, addr).await,
        }
    }

    async fn handle_connect(&mut self, card_id: String, addr: SocketAddr) {
        self.prune_departed().await;

        // A CONNECT from an endpoint that already holds a participant is a
        // reconnect: the old participant is dropped first.
        if let Some(existing) = self.sessions.remove(&addr) {
            info!(
                "Removing existing Player {} from {} before reconnect",
                existing.participant_id, addr
            );
            self.context.disconnect(existing.participant_id).await;
        }

        let (link, inbox) = Link::channel(TransportKind::Udp);
        match self.context.admit(&card_id, link).await {
            Ok(admission) => {
                spawn_writer(Arc::clone(&self.socket), addr, inbox);
                self.sessions.insert(addr, admission);
            }
            Err(e) => {
                warn!("Connection refused from {} (Card {}): {}", addr, card_id, e);
                if let Err(e) = send_event(&self.socket, &e.to_event(), addr).await {
                    error!("Failed to send rejection to {}: {}", addr, e);
                }
            }
        }
    }

    async fn handle_command(&mut self, command: ClientCommand, addr: SocketAddr) {
        self.prune_departed().await;

        let Some(session) = self.sessions.get(&addr).cloned() else {
            debug!("{:?} from unconnected endpoint {}", command, addr);
            let reply = ServerEvent::error(crate::error::CommandError::NotConnected.to_string());
            if let Err(e) = send_event(&self.socket, &reply, addr).await {
                error!("Failed to send to {}: {}", addr, e);
            }
            return;
        };

        if dispatch(&self.context, &session, command).await == Flow::Close {
            self.sessions.remove(&addr);
        }
    }

    /// Forgets endpoints whose participants were evicted meanwhile.
    async fn prune_departed(&mut self) {
        let connected = self.context.connected_ids().await;
        self.sessions
            .retain(|_, session| connected.contains(&session.participant_id));
    }
}

fn spawn_writer(socket: Arc<UdpSocket>, addr: SocketAddr, mut inbox: mpsc::UnboundedReceiver<ServerEvent>) {
    tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            if let Err(e) = send_event(&socket, &event, addr).await {
                error!("Failed to send to {}: {}", addr, e);
            }
        }
        debug!("Writer for {} finished", addr);
    });
}

async fn send_event(socket: &UdpSocket, event: &ServerEvent, addr: SocketAddr) -> Result<(), TransportError> {
    let data = text::encode_event(event);
    socket.send_to(data.as_bytes(), addr).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::LivenessPolicy;
    use shared::Slot;
    use tokio::time::timeout;

    async fn start() -> (SocketAddr, Arc<ServerContext>) {
        let context = Arc::new(ServerContext::new(LivenessPolicy::default()));
        let transport = UdpTransport::bind("127.0.0.1:0", Arc::clone(&context))
            .await
            .unwrap();
        let addr = transport.local_addr().unwrap();
        tokio::spawn(transport.run());
        (addr, context)
    }

    async fn client(server: SocketAddr) -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(server).await.unwrap();
        socket
    }

    async fn recv(socket: &UdpSocket) -> ServerEvent {
        let mut buf = [0u8; MAX_DATAGRAM];
        let len = timeout(Duration::from_secs(2), socket.recv(&mut buf))
            .await
            .expect("timed out waiting for server")
            .unwrap();
        text::decode_event(std::str::from_utf8(&buf[..len]).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_connect_over_udp() {
        let (server, _context) = start().await;
        let a = client(server).await;

        a.send(b"CONNECT|CARD_A").await.unwrap();

        assert_eq!(recv(&a).await, ServerEvent::connected(1, "CARD_A", Slot::A1));
        assert!(matches!(
            recv(&a).await,
            ServerEvent::GameState { player_count: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_unconnected_endpoint_gets_error() {
        let (server, _context) = start().await;
        let a = client(server).await;

        a.send(b"ATTACK").await.unwrap();

        assert_eq!(
            recv(&a).await,
            ServerEvent::error("Not connected. Send CONNECT first.")
        );
    }

    #[tokio::test]
    async fn test_garbage_is_dropped_silently() {
        let (server, context) = start().await;
        let a = client(server).await;

        a.send(b"\xff\xfe").await.unwrap();
        a.send(b"HELLO|there").await.unwrap();
        a.send(b"CONNECT|CARD_A").await.unwrap();

        // The first reply belongs to the CONNECT, not to the garbage
        assert!(matches!(recv(&a).await, ServerEvent::Connected { .. }));
        assert_eq!(context.len().await, 1);
    }

    #[tokio::test]
    async fn test_oversized_datagram_is_dropped_not_truncated() {
        let (server, context) = start().await;
        let a = client(server).await;

        let oversized = format!("CONNECT|{}", "X".repeat(3000));
        a.send(oversized.as_bytes()).await.unwrap();
        a.send(b"CONNECT|CARD_A").await.unwrap();

        assert_eq!(recv(&a).await, ServerEvent::connected(1, "CARD_A", Slot::A1));
        let snapshot = context.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.participants()[0].card_id, "CARD_A");
    }

    #[tokio::test]
    async fn test_third_connect_gets_full() {
        let (server, _context) = start().await;
        let a = client(server).await;
        let b = client(server).await;
        let c = client(server).await;

        a.send(b"CONNECT|CARD_A").await.unwrap();
        recv(&a).await;
        b.send(b"CONNECT|CARD_B").await.unwrap();
        recv(&b).await;
        c.send(b"CONNECT|CARD_C").await.unwrap();

        assert_eq!(
            recv(&c).await,
            ServerEvent::Full {
                message: "Server is full (2/2 players)".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_reconnect_from_same_endpoint_replaces_participant() {
        let (server, context) = start().await;
        let a = client(server).await;

        a.send(b"CONNECT|CARD_A").await.unwrap();
        assert!(matches!(recv(&a).await, ServerEvent::Connected { participant_id: 1, .. }));
        recv(&a).await;

        a.send(b"CONNECT|CARD_A").await.unwrap();
        assert_eq!(recv(&a).await, ServerEvent::connected(2, "CARD_A", Slot::A2));
        assert_eq!(context.len().await, 1);
    }

    #[tokio::test]
    async fn test_disconnect_removes_participant() {
        let (server, context) = start().await;
        let a = client(server).await;

        a.send(b"CONNECT|CARD_A").await.unwrap();
        recv(&a).await;
        a.send(b"DISCONNECT").await.unwrap();

        timeout(Duration::from_secs(2), async {
            while !context.is_empty().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("participant was not removed");
    }
}
