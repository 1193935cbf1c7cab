//! Round orchestration for Echoes & Lies
//!
//! The [`RoundEngine`] is the only writer of [`GameState`]. It waits for the
//! start signal, then for each round: snapshots the registry, picks a
//! Whisperer, deals the echoes, collects votes, resolves the tally and
//! announces the result. After the last round it declares the winning faction
//! and flips the session's running flag off.

use crate::broadcast::Broadcaster;
use crate::config::GameConfig;
use crate::content::{ContentBank, EchoSet, Statement};
use crate::registry::{ConnectionRegistry, Participant};
use crate::votes::{tally, winning_choice, Ballot, VoteCollector};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use shared::{Role, ServerLine};
use std::future::Future;
use tokio::sync::watch;
use tokio::time::sleep;

pub const RULES: [&str; 6] = [
    "Welcome to Echoes & Lies!",
    "--- ROLE EXPLANATIONS ---",
    "Whisperer: Knows which echoes are false and tries to mislead the others.",
    "Explorer: Tries to identify and vote for the true echo among the three.",
    "Two true echoes and one false are shown each round.",
    "Choose carefully! Too many lies and the library is lost...",
];

pub const RESULTS_HEADER: &str = "--- Round Results ---";
pub const LIE_OUTCOME: &str = "The chosen echo was a LIE! Library corruption increases.";
pub const TRUTH_OUTCOME: &str = "The chosen echo was TRUE. Wisdom preserved.";
pub const WHISPERER_WINS: &str = "Whisperer wins! Lies have corrupted the library.";
pub const EXPLORERS_WIN: &str = "Explorers win! The truth has been preserved.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingToStart,
    RoundSetup,
    Voting,
    Resolution,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Faction {
    Whisperer,
    Explorers,
}

impl Faction {
    pub fn announcement(&self) -> &'static str {
        match self {
            Faction::Whisperer => WHISPERER_WINS,
            Faction::Explorers => EXPLORERS_WIN,
        }
    }
}

/// Session-wide counters. Only the engine mutates them.
#[derive(Debug)]
pub struct GameState {
    /// Completed rounds so far
    pub current_round: u32,
    pub max_rounds: u32,
    /// Rounds whose winning vote picked the lie; never decreases
    pub accepted_lies: u32,
    running: watch::Sender<bool>,
}

impl GameState {
    pub fn new(max_rounds: u32) -> Self {
        let (running, _) = watch::channel(true);
        Self {
            current_round: 0,
            max_rounds,
            accepted_lies: 0,
            running,
        }
    }

    /// Observer for the running flag, for the acceptor.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub fn is_over(&self) -> bool {
        self.current_round >= self.max_rounds
    }

    fn stop(&self) {
        self.running.send_replace(false);
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub participant: Participant,
    pub role: Role,
}

/// One round's deal: the echoes and who plays what.
#[derive(Debug, Clone)]
pub struct Round {
    /// 0-based round number
    pub number: u32,
    pub echoes: EchoSet,
    pub assignments: Vec<Assignment>,
}

impl Round {
    pub fn whisperer(&self) -> Option<&Participant> {
        self.assignments
            .iter()
            .find(|a| a.role == Role::Whisperer)
            .map(|a| &a.participant)
    }

    /// Lines dealt privately to one participant.
    pub fn deal_lines(&self, role: Role) -> Vec<ServerLine> {
        let mut lines = vec![ServerLine::Role(role)];
        lines.extend(self.echoes.iter().map(|(index, statement)| ServerLine::Echo {
            index,
            text: statement.text.clone(),
        }));
        if role == Role::Whisperer {
            lines.extend(
                self.echoes
                    .false_indices()
                    .into_iter()
                    .map(|index| ServerLine::LieNote { index }),
            );
        }
        lines
    }
}

/// What a resolved round decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub chosen: u8,
    pub statement: Statement,
    /// Result lines in broadcast order: one per vote, then the outcome line
    pub lines: Vec<String>,
}

impl RoundOutcome {
    pub fn accepted_lie(&self) -> bool {
        !self.statement.is_true
    }
}

pub struct RoundEngine {
    config: GameConfig,
    bank: ContentBank,
    registry: ConnectionRegistry,
    broadcaster: Broadcaster,
    collector: VoteCollector,
    state: GameState,
    phase: Phase,
    rng: StdRng,
}

impl RoundEngine {
    pub fn new(
        config: GameConfig,
        bank: ContentBank,
        registry: ConnectionRegistry,
        rng: StdRng,
    ) -> Self {
        Self {
            broadcaster: Broadcaster::new(registry.clone()),
            collector: VoteCollector::new(config.vote_timeout),
            state: GameState::new(config.max_rounds),
            phase: Phase::WaitingToStart,
            config,
            bank,
            registry,
            rng,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Running flag observer, flips to false when the game is over.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Plays the whole session once `start` resolves.
    pub async fn run<S>(mut self, start: S) -> GameState
    where
        S: Future<Output = ()>,
    {
        start.await;
        info!("Game starting with {} rounds", self.state.max_rounds);
        self.broadcaster.broadcast_all(RULES).await;

        while !self.state.is_over() {
            self.phase = Phase::RoundSetup;
            let Some(round) = self.setup_round().await else {
                debug!("No participants yet, waiting");
                sleep(self.config.lobby_poll).await;
                continue;
            };

            self.phase = Phase::Voting;
            let ballots = self.collector.collect(&round, &self.broadcaster, &mut self.rng).await;

            self.phase = Phase::Resolution;
            self.resolve(&round, &ballots).await;

            sleep(self.config.round_pause).await;
        }

        self.finish().await;
        self.state
    }

    /// Snapshots the registry, assigns roles, deals the echoes.
    ///
    /// Returns `None` while nobody is connected.
    pub async fn setup_round(&mut self) -> Option<Round> {
        let snapshot = self.registry.snapshot().await;
        if snapshot.is_empty() {
            return None;
        }

        let whisperer = self.rng.gen_range(0..snapshot.len());
        let echoes = self.bank.sample(&mut self.rng);
        let assignments = snapshot
            .into_iter()
            .enumerate()
            .map(|(i, participant)| Assignment {
                participant,
                role: if i == whisperer {
                    Role::Whisperer
                } else {
                    Role::Explorer
                },
            })
            .collect();

        let round = Round {
            number: self.state.current_round,
            echoes,
            assignments,
        };

        if let Some(w) = round.whisperer() {
            info!(
                "Round {}: {} is the Whisperer, echo {} is the lie",
                round.number + 1,
                w.name,
                round.echoes.lie_index()
            );
        }

        for assignment in &round.assignments {
            for line in round.deal_lines(assignment.role) {
                self.broadcaster.send(&assignment.participant, line);
            }
        }

        Some(round)
    }

    /// Tallies the ballots, updates the counters and announces the result.
    pub async fn resolve(&mut self, round: &Round, ballots: &[Ballot]) -> RoundOutcome {
        let counts = tally(ballots);
        let chosen = winning_choice(&counts).unwrap_or(shared::DEFAULT_VOTE);
        let statement = round
            .echoes
            .get(chosen)
            .cloned()
            .unwrap_or_else(|| Statement::new("", true));

        let mut lines: Vec<String> = ballots
            .iter()
            .map(|b| format!("{} voted for Echo {}.", b.name, b.choice))
            .collect();

        let outcome_line = if statement.is_true {
            TRUTH_OUTCOME
        } else {
            self.state.accepted_lies += 1;
            LIE_OUTCOME
        };
        lines.push(outcome_line.to_string());

        info!(
            "Round {} resolved: echo {} chosen ({}), {} accepted lie(s) so far",
            round.number + 1,
            chosen,
            if statement.is_true { "true" } else { "lie" },
            self.state.accepted_lies
        );

        self.broadcaster.broadcast(RESULTS_HEADER).await;
        self.broadcaster.broadcast_all(&lines).await;
        self.broadcaster
            .broadcast_all(lines.iter().map(|l| ServerLine::Summary(l.clone())))
            .await;

        self.state.current_round += 1;

        RoundOutcome {
            chosen,
            statement,
            lines,
        }
    }

    /// Announces the winner and ends the session.
    pub async fn finish(&mut self) -> Faction {
        self.phase = Phase::Finished;
        let winner = winner(self.state.accepted_lies, self.config.lie_threshold);
        info!(
            "Game over after {} rounds with {} accepted lie(s): {:?} wins",
            self.state.current_round, self.state.accepted_lies, winner
        );
        self.broadcaster.broadcast(winner.announcement()).await;
        self.state.stop();
        winner
    }
}

pub fn winner(accepted_lies: u32, lie_threshold: u32) -> Faction {
    if accepted_lies >= lie_threshold {
        Faction::Whisperer
    } else {
        Faction::Explorers
    }
}
