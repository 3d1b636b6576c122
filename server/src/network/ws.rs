//! WebSocket transport speaking the JSON protocol
//!
//! Each TCP connection is one participant. The first text frame must be a
//! `CONNECT` carrying a card id; after admission the socket is split into a
//! reader that dispatches commands and a writer that drains the
//! participant's [`Link`]. When the registry drops the link (disconnect or
//! eviction) the writer sends a Close frame, which ends the connection.

use crate::context::{Admission, ServerContext};
use crate::error::TransportError;
use crate::link::{Link, TransportKind};
use crate::network::{dispatch, Flow};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{json, ClientCommand, DecodeError, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const INVALID_CONNECT: &str = "Invalid connection request. CardID required.";

pub struct WsTransport {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl WsTransport {
    pub async fn bind(addr: &str, context: Arc<ServerContext>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("WebSocket transport listening on {}", listener.local_addr()?);
        Ok(Self { listener, context })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the task is dropped, which closes the listener.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let context = Arc::clone(&self.context);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, context).await {
                            warn!("WebSocket connection {} ended with error: {}", peer, e);
                        }
                    });
                }
                Err(e) => error!("Failed to accept connection: {}", e),
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<ServerContext>,
) -> Result<(), TransportError> {
    let mut ws = tokio_tungstenite::accept_async(stream).await?;
    debug!("WebSocket handshake completed with {}", peer);

    let card_id = match first_command(&mut ws).await? {
        Some(Ok(ClientCommand::Connect { card_id })) => card_id,
        Some(Ok(other)) => {
            warn!("First message from {} was {:?}, expected CONNECT", peer, other);
            return reject(ws, &ServerEvent::error(INVALID_CONNECT)).await;
        }
        Some(Err(e)) => {
            warn!("Unparsable connection request from {}: {}", peer, e);
            return reject(ws, &ServerEvent::error(INVALID_CONNECT)).await;
        }
        None => {
            debug!("{} closed before connecting", peer);
            return Ok(());
        }
    };

    let (link, mut inbox) = Link::channel(TransportKind::WebSocket);
    let session = match context.admit(&card_id, link).await {
        Ok(admission) => admission,
        Err(e) => {
            warn!("Connection refused from {} (Card {}): {}", peer, card_id, e);
            return reject(ws, &e.to_event()).await;
        }
    };

    let (mut sink, mut source) = ws.split();

    let mut writer = tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let text = match json::encode_event(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {:?}: {}", event, e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                error!("Failed to send to {}: {}", peer, e);
                break;
            }
        }
        // Link dropped by the registry: tell the peer we are done
        if let Err(e) = sink.send(Message::Close(None)).await {
            debug!("Failed to send Close to {}: {}", peer, e);
        }
    });

    // A finished writer means the participant is gone. The peer may never
    // answer the Close frame, so stop reading instead of waiting for it.
    let (result, writer_result) = tokio::select! {
        result = read_loop(&mut source, &context, &session, peer) => (result, None),
        joined = &mut writer => {
            debug!("Link for Card {} closed, dropping {}", session.card_id, peer);
            (Ok(()), Some(joined))
        }
    };

    if context.disconnect(session.participant_id).await {
        info!("WebSocket for Card {} closed", session.card_id);
    }
    let joined = match writer_result {
        Some(joined) => joined,
        None => writer.await,
    };
    if let Err(e) = joined {
        error!("Writer task for {} panicked: {}", peer, e);
    }
    result
}

async fn read_loop<S>(
    source: &mut S,
    context: &ServerContext,
    session: &Admission,
    peer: SocketAddr,
) -> Result<(), TransportError>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = source.next().await {
        let command = match message? {
            Message::Text(text) => match json::decode_command(&text) {
                Ok(command) => command,
                Err(e) => {
                    warn!("Dropping unparsable message from {}: {}", peer, e);
                    continue;
                }
            },
            Message::Ping(_) | Message::Pong(_) => {
                if !context.record_contact(session.participant_id).await {
                    break;
                }
                continue;
            }
            Message::Close(_) => break,
            Message::Binary(_) | Message::Frame(_) => {
                warn!("Dropping binary frame from {}", peer);
                continue;
            }
        };

        if dispatch(context, session, command).await == Flow::Close {
            break;
        }
    }
    Ok(())
}

/// Reads until the first data frame, or the peer goes away.
async fn first_command(
    ws: &mut WebSocketStream<TcpStream>,
) -> Result<Option<Result<ClientCommand, DecodeError>>, TransportError> {
    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => return Ok(Some(json::decode_command(&text))),
            Message::Binary(data) => {
                return Ok(Some(Err(DecodeError::InvalidField {
                    field: "frame",
                    value: format!("binary frame of {} bytes", data.len()),
                })))
            }
            Message::Close(_) => return Ok(None),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        }
    }
    Ok(None)
}

async fn reject(
    mut ws: WebSocketStream<TcpStream>,
    event: &ServerEvent,
) -> Result<(), TransportError> {
    ws.send(Message::Text(json::encode_event(event)?)).await?;
    ws.close(None).await?;
    Ok(())
}
