//! Integration tests for the game server
//!
//! These tests run a complete server over real TCP on an ephemeral port.

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::config::GameConfig;
use server::content::ContentBank;
use server::game::{RoundEngine, EXPLORERS_WIN, RESULTS_HEADER, RULES};
use server::network::ConnectionAcceptor;
use server::registry::ConnectionRegistry;
use shared::{Role, ServerLine};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

fn test_config(rounds: u32) -> GameConfig {
    GameConfig {
        max_rounds: rounds,
        vote_timeout: Duration::from_millis(300),
        round_pause: Duration::from_millis(20),
        lobby_poll: Duration::from_millis(10),
        lie_threshold: 2,
    }
}

struct TestServer {
    addr: SocketAddr,
    registry: ConnectionRegistry,
    start: oneshot::Sender<()>,
    acceptor: JoinHandle<()>,
}

async fn spawn_server(config: GameConfig) -> TestServer {
    let registry = ConnectionRegistry::new();
    let engine = RoundEngine::new(
        config,
        ContentBank::default(),
        registry.clone(),
        StdRng::seed_from_u64(21),
    );
    let acceptor = ConnectionAcceptor::bind("127.0.0.1:0", registry.clone(), engine.subscribe())
        .await
        .expect("failed to bind test server");
    let addr = acceptor.local_addr().unwrap();

    let (start, start_rx) = oneshot::channel();
    tokio::spawn(engine.run(async move {
        let _ = start_rx.await;
    }));
    let acceptor = tokio::spawn(acceptor.run());

    TestServer {
        addr,
        registry,
        start,
        acceptor,
    }
}

/// Joins, answers every prompt with `vote` (or stays silent) and returns
/// every line received until the server hangs up.
fn spawn_player(addr: SocketAddr, name: &str, vote: Option<&'static str>) -> JoinHandle<Vec<String>> {
    let name = name.to_string();
    tokio::spawn(async move {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half
            .write_all(format!("{}\n", name).as_bytes())
            .await
            .unwrap();

        let mut lines = BufReader::new(read_half).lines();
        let mut received = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if ServerLine::parse(&line) == ServerLine::VotePrompt {
                if let Some(vote) = vote {
                    let _ = write_half.write_all(format!("{}\n", vote).as_bytes()).await;
                }
            }
            received.push(line);
        }
        received
    })
}

async fn wait_for_players(registry: &ConnectionRegistry, count: usize) {
    for _ in 0..400 {
        if registry.len().await == count {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {} players to join", count);
}

fn roles(lines: &[String]) -> Vec<Role> {
    lines
        .iter()
        .filter_map(|l| match ServerLine::parse(l) {
            ServerLine::Role(role) => Some(role),
            _ => None,
        })
        .collect()
}

/// FULL SESSION TESTS
mod session_tests {
    use super::*;

    /// Plays a short game with two voting humans and a silent one
    #[tokio::test]
    async fn full_game_over_tcp() {
        let server = spawn_server(test_config(2)).await;

        let ana = spawn_player(server.addr, "Ana", Some("2"));
        let bo = spawn_player(server.addr, "Bo", Some("2"));
        let cy = spawn_player(server.addr, "Cy", None);
        wait_for_players(&server.registry, 3).await;
        server.start.send(()).unwrap();

        let ana = timeout(Duration::from_secs(10), ana).await.unwrap().unwrap();
        let bo = timeout(Duration::from_secs(10), bo).await.unwrap().unwrap();
        let cy = timeout(Duration::from_secs(10), cy).await.unwrap().unwrap();

        for lines in [&ana, &bo, &cy] {
            assert_eq!(&lines[..RULES.len()], &RULES.map(String::from)[..]);
            assert_eq!(lines.iter().filter(|l| *l == RESULTS_HEADER).count(), 2);
            assert_eq!(
                lines
                    .iter()
                    .filter(|l| ServerLine::parse(l) == ServerLine::VotePrompt)
                    .count(),
                2
            );
            assert!(lines.contains(&"Ana voted for Echo 2.".to_string()));
            assert!(lines.contains(&"Cy voted for Echo 1.".to_string()));
            assert!(lines.contains(&"SUMMARY: Bo voted for Echo 2.".to_string()));
            assert_eq!(
                lines
                    .iter()
                    .filter(|l| matches!(ServerLine::parse(l), ServerLine::Echo { .. }))
                    .count(),
                6
            );
        }

        // exactly one Whisperer per round
        for round in 0..2 {
            let whisperers = [&ana, &bo, &cy]
                .iter()
                .filter(|lines| roles(lines)[round] == Role::Whisperer)
                .count();
            assert_eq!(whisperers, 1);
        }

        // only the Whisperer hears about the lie
        for lines in [&ana, &bo, &cy] {
            let notes = lines
                .iter()
                .filter(|l| matches!(ServerLine::parse(l), ServerLine::LieNote { .. }))
                .count();
            let whisperer_rounds = roles(lines)
                .iter()
                .filter(|r| **r == Role::Whisperer)
                .count();
            assert_eq!(notes, whisperer_rounds);
        }

        timeout(Duration::from_secs(5), server.acceptor)
            .await
            .unwrap()
            .unwrap();
        assert!(server.registry.is_empty().await);
    }

    /// One round can never reach the lie threshold
    #[tokio::test]
    async fn single_round_explorers_win() {
        let server = spawn_server(test_config(1)).await;

        let ana = spawn_player(server.addr, "Ana", Some("3"));
        wait_for_players(&server.registry, 1).await;
        server.start.send(()).unwrap();

        let lines = timeout(Duration::from_secs(10), ana).await.unwrap().unwrap();
        assert_eq!(lines.last().map(String::as_str), Some(EXPLORERS_WIN));
    }
}

/// CONNECTION LIFECYCLE TESTS
mod connection_tests {
    use super::*;

    /// Players who leave are dropped from the registry
    #[tokio::test]
    async fn disconnect_removes_player() {
        let server = spawn_server(test_config(1)).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(b"Ana\n").await.unwrap();
        wait_for_players(&server.registry, 1).await;

        drop(stream);
        wait_for_players(&server.registry, 0).await;
    }

    /// Automated players join over the network but never get prompted
    #[tokio::test]
    async fn automated_player_is_not_prompted() {
        let server = spawn_server(test_config(1)).await;

        let bot = spawn_player(server.addr, "AI-Watcher", None);
        wait_for_players(&server.registry, 1).await;
        assert!(server.registry.snapshot().await[0].is_automated);
        server.start.send(()).unwrap();

        let lines = timeout(Duration::from_secs(10), bot).await.unwrap().unwrap();
        assert!(!lines
            .iter()
            .any(|l| ServerLine::parse(l) == ServerLine::VotePrompt));
        assert!(lines.contains(&RESULTS_HEADER.to_string()));
        assert_eq!(roles(&lines), vec![Role::Whisperer]);
    }
}
