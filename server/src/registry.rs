//! Participant tracking for the game session
//!
//! Every accepted connection becomes a [`Participant`]. The registry owns the
//! set of live participants behind a single lock; the round engine works from
//! point-in-time snapshots so joins and drops never disturb a round in flight.
//!
//! A participant is a handle onto its connection: outbound lines go through an
//! unbounded queue drained by the connection's writer task, inbound vote lines
//! arrive on the participant's inbox. The connection side of those channels is
//! handed back as a [`ParticipantLink`] when the participant is created.

use log::{debug, info};
use shared::is_automated_name;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Connection identity. Assigned in accept order and never reused.
pub type ParticipantId = u32;

/// A connected player, human or automated
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    /// Display name from the join handshake, fixed for the session
    pub name: String,
    pub addr: SocketAddr,
    /// Set at join time from the name prefix; automated players never read votes from the network
    pub is_automated: bool,
    outbound: mpsc::UnboundedSender<String>,
    inbox: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    closed: Arc<watch::Sender<bool>>,
}

/// Connection-side ends of a participant's channels
#[derive(Debug)]
pub struct ParticipantLink {
    /// Lines queued for the client, in send order
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Raw lines received from the client
    pub inbox: mpsc::UnboundedSender<String>,
    /// Flips to `true` once the registry drops the participant
    pub closed: watch::Receiver<bool>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: String, addr: SocketAddr) -> (Self, ParticipantLink) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let participant = Self {
            id,
            is_automated: is_automated_name(&name),
            name,
            addr,
            outbound: outbound_tx,
            inbox: Arc::new(Mutex::new(inbox_rx)),
            closed: Arc::new(closed_tx),
        };
        let link = ParticipantLink {
            outbound: outbound_rx,
            inbox: inbox_tx,
            closed: closed_rx,
        };

        (participant, link)
    }

    /// Queues a line for delivery. A dead connection silently drops it.
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.outbound.send(line.into()).is_ok()
    }

    /// Waits for the next inbound line. `None` once the connection is gone.
    pub async fn next_line(&self) -> Option<String> {
        self.inbox.lock().await.recv().await
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// The live participant set, guarded by one lock
///
/// Cheap to clone; all clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    participants: Arc<Mutex<BTreeMap<ParticipantId, Participant>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, participant: Participant) {
        info!(
            "{} joined from {} (id {}{})",
            participant.name,
            participant.addr,
            participant.id,
            if participant.is_automated { ", automated" } else { "" }
        );
        self.participants
            .lock()
            .await
            .insert(participant.id, participant);
    }

    /// Drops a participant and closes its connection.
    ///
    /// Returns false if it was already gone.
    pub async fn remove(&self, id: ParticipantId) -> bool {
        let removed = self.participants.lock().await.remove(&id);
        match removed {
            Some(participant) => {
                participant.close();
                info!("{} left (id {})", participant.name, participant.id);
                true
            }
            None => {
                debug!("Participant {} already removed", id);
                false
            }
        }
    }

    /// Stable copy of the current participants, in join order.
    pub async fn snapshot(&self) -> Vec<Participant> {
        self.participants.lock().await.values().cloned().collect()
    }

    pub async fn contains(&self, id: ParticipantId) -> bool {
        self.participants.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.participants.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.participants.lock().await.is_empty()
    }

    /// Removes and closes every participant.
    pub async fn close_all(&self) {
        let drained = std::mem::take(&mut *self.participants.lock().await);
        for participant in drained.values() {
            participant.close();
        }
        if !drained.is_empty() {
            info!("Closed {} remaining connection(s)", drained.len());
        }
    }
}
