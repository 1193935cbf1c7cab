//! # Echoes & Lies Game Server
//!
//! Authoritative server for a small social-deduction guessing game. Every
//! round each connected player sees three "echoes", two true and one false.
//! One player, the Whisperer, is told which echo is the lie and tries to get
//! the group to pick it; everyone else is an Explorer hunting for a true echo.
//! After a fixed number of rounds the Whisperer wins if enough lies were
//! accepted.
//!
//! ## Architecture
//!
//! ### Connection Handling
//! The [`network::ConnectionAcceptor`] runs the accept loop. Each connection
//! gets a reader task (handshake, then vote lines into the participant's inbox)
//! and a writer task (outbound lines in send order). Read errors and EOF are
//! treated as a disconnect and remove the participant.
//!
//! ### Participant Registry
//! [`registry::ConnectionRegistry`] holds the live participants behind one
//! lock. Rounds work from snapshots, so joins and drops never disturb a round
//! that is already in flight.
//!
//! ### Round Engine
//! [`game::RoundEngine`] is the single writer of the session counters. It
//! drives `WaitingToStart -> RoundSetup -> Voting -> Resolution` for each round
//! and `Finished` at the end, then clears the running flag that keeps the
//! acceptor alive.
//!
//! ### Votes
//! [`votes::VoteCollector`] prompts every human at once and waits on all of
//! them concurrently, so a round never takes longer than one vote timeout.
//! Automated players (names starting with `ai`) vote through [`ai::ai_vote`].
//! Silence, garbage and disconnects all count as a vote for echo 1.
//!
//! ## Protocol
//!
//! Plain UTF-8 lines; see the `shared` crate for the grammar.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use server::config::GameConfig;
//! use server::content::ContentBank;
//! use server::game::RoundEngine;
//! use server::network::ConnectionAcceptor;
//! use server::registry::ConnectionRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ConnectionRegistry::new();
//!     let engine = RoundEngine::new(
//!         GameConfig::default(),
//!         ContentBank::default(),
//!         registry.clone(),
//!         StdRng::from_entropy(),
//!     );
//!
//!     let acceptor = ConnectionAcceptor::bind("127.0.0.1:12345", registry, engine.subscribe()).await?;
//!     tokio::spawn(engine.run(async {
//!         tokio::time::sleep(std::time::Duration::from_secs(20)).await;
//!     }));
//!     acceptor.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod broadcast;
pub mod config;
pub mod content;
pub mod game;
pub mod network;
pub mod registry;
pub mod votes;
