//! Best-effort fan-out of protocol lines.

use crate::registry::{ConnectionRegistry, Participant};
use log::debug;

#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: ConnectionRegistry,
}

impl Broadcaster {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Sends one line to one participant. Failures are swallowed; the
    /// connection handler is responsible for cleaning up dead peers.
    pub fn send(&self, participant: &Participant, line: impl ToString) {
        if !participant.send(line.to_string()) {
            debug!("Dropped line for {} (connection gone)", participant.name);
        }
    }

    /// Sends one line to everyone currently registered.
    pub async fn broadcast(&self, line: impl ToString) {
        let line = line.to_string();
        for participant in self.registry.snapshot().await {
            self.send(&participant, &line);
        }
    }

    /// Sends several lines to everyone, keeping their order per recipient.
    pub async fn broadcast_all<I, L>(&self, lines: I)
    where
        I: IntoIterator<Item = L>,
        L: ToString,
    {
        let lines: Vec<String> = lines.into_iter().map(|l| l.to_string()).collect();
        for participant in self.registry.snapshot().await {
            for line in &lines {
                self.send(&participant, line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParticipantLink;
    use shared::{Role, ServerLine};

    async fn join(registry: &ConnectionRegistry, id: u32, name: &str) -> ParticipantLink {
        let (p, link) = Participant::new(id, name.to_string(), "127.0.0.1:9000".parse().unwrap());
        registry.add(p).await;
        link
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_in_order() {
        let registry = ConnectionRegistry::new();
        let mut a = join(&registry, 1, "Ana").await;
        let mut b = join(&registry, 2, "Bo").await;
        let broadcaster = Broadcaster::new(registry);

        broadcaster.broadcast("one").await;
        broadcaster.broadcast(ServerLine::Role(Role::Explorer)).await;

        for link in [&mut a, &mut b] {
            assert_eq!(link.outbound.recv().await.as_deref(), Some("one"));
            assert_eq!(link.outbound.recv().await.as_deref(), Some("ROLE:Explorer"));
        }
    }

    #[tokio::test]
    async fn test_dead_recipient_does_not_block_others() {
        let registry = ConnectionRegistry::new();
        let dead = join(&registry, 1, "Ana").await;
        let mut alive = join(&registry, 2, "Bo").await;
        drop(dead);

        let broadcaster = Broadcaster::new(registry.clone());
        broadcaster.broadcast("still here").await;

        assert_eq!(alive.outbound.recv().await.as_deref(), Some("still here"));
        // a failed send removes no one
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_broadcast_all_keeps_line_order() {
        let registry = ConnectionRegistry::new();
        let mut a = join(&registry, 1, "Ana").await;
        let broadcaster = Broadcaster::new(registry);

        broadcaster.broadcast_all(["x", "y", "z"]).await;

        assert_eq!(a.outbound.recv().await.as_deref(), Some("x"));
        assert_eq!(a.outbound.recv().await.as_deref(), Some("y"));
        assert_eq!(a.outbound.recv().await.as_deref(), Some("z"));
    }
}
