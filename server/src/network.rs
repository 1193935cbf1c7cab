//! TCP accept loop and per-connection handling
//!
//! Each connection sends its display name as the first line, then any number
//! of vote lines. A connection gets two tasks: the reader forwards lines into
//! the participant's inbox, the writer drains the participant's outbound queue
//! so lines reach the client in the order they were sent. Read errors and EOF
//! both count as a disconnect and remove the participant.

use crate::registry::{ConnectionRegistry, Participant, ParticipantId, ParticipantLink};
use log::{debug, error, info, warn};
use shared::display_name;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// How long shutdown waits for connection handlers to flush.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct ConnectionAcceptor {
    listener: TcpListener,
    registry: ConnectionRegistry,
    running: watch::Receiver<bool>,
    next_id: ParticipantId,
    connections: JoinSet<()>,
}

impl ConnectionAcceptor {
    pub async fn bind(
        addr: &str,
        registry: ConnectionRegistry,
        running: watch::Receiver<bool>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            registry,
            running,
            next_id: 1,
            connections: JoinSet::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the game stops running, then closes the
    /// remaining connections and waits briefly for their handlers.
    pub async fn run(mut self) {
        while *self.running.borrow() {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let id = self.next_id;
                        self.next_id += 1;
                        let registry = self.registry.clone();
                        self.connections
                            .spawn(handle_connection(stream, addr, id, registry));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                changed = self.running.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                Some(_) = self.connections.join_next(), if !self.connections.is_empty() => {}
            }
        }

        info!("No longer accepting connections");
        self.shutdown().await;
    }

    async fn shutdown(self) {
        let Self {
            listener,
            registry,
            mut connections,
            ..
        } = self;
        drop(listener);
        registry.close_all().await;

        let drained = timeout(SHUTDOWN_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("Connection handlers did not finish in time, aborting");
            connections.abort_all();
        }
    }
}

/// Runs one client connection from handshake to disconnect.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    id: ParticipantId,
    registry: ConnectionRegistry,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    let name = match lines.next_line().await {
        Ok(Some(handshake)) => display_name(&handshake),
        Ok(None) => {
            debug!("{} closed before sending a name", addr);
            return;
        }
        Err(e) => {
            debug!("{} failed during handshake: {}", addr, e);
            return;
        }
    };

    let (participant, link) = Participant::new(id, name, addr);
    let ParticipantLink {
        outbound,
        inbox,
        closed,
    } = link;
    registry.add(participant.clone()).await;

    let writer = tokio::spawn(write_lines(write_half, outbound, closed.clone()));

    let mut closed = closed;
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    debug!("{} sent {:?}", participant.name, line);
                    if inbox.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("Read error from {}: {}", participant.name, e);
                    break;
                }
            },
            _ = closed.changed() => break,
        }
    }

    drop(inbox);
    registry.remove(id).await;
    if let Err(e) = writer.await {
        warn!("Writer task for {} failed: {}", participant.name, e);
    }
}

/// Delivers queued lines, newline-terminated, until the participant is closed.
async fn write_lines<W>(
    mut writer: W,
    mut outbound: tokio::sync::mpsc::UnboundedReceiver<String>,
    mut closed: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            line = outbound.recv() => match line {
                Some(line) => {
                    if write_line(&mut writer, &line).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
            _ = closed.changed() => {
                while let Ok(line) = outbound.try_recv() {
                    if write_line(&mut writer, &line).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
