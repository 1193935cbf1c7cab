//! Per-round vote collection and tallying.

use crate::ai::ai_vote;
use crate::broadcast::Broadcaster;
use crate::game::Round;
use crate::registry::{Participant, ParticipantId};
use log::{debug, info, warn};
use rand::Rng;
use shared::{parse_vote, ServerLine, DEFAULT_VOTE};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Where a recorded vote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSource {
    Submitted,
    Automated,
    /// Nothing arrived before the deadline
    TimedOut,
    /// The line was not `1`, `2` or `3`
    Invalid,
    /// The connection closed while we were waiting
    Disconnected,
}

impl VoteSource {
    pub fn is_default(&self) -> bool {
        matches!(
            self,
            VoteSource::TimedOut | VoteSource::Invalid | VoteSource::Disconnected
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub participant_id: ParticipantId,
    pub name: String,
    /// 1-based echo index
    pub choice: u8,
    pub source: VoteSource,
}

impl Ballot {
    pub fn new(participant: &Participant, choice: u8, source: VoteSource) -> Self {
        Self {
            participant_id: participant.id,
            name: participant.name.clone(),
            choice,
            source,
        }
    }
}

/// Gathers exactly one vote per participant of a round.
#[derive(Debug, Clone)]
pub struct VoteCollector {
    timeout: Duration,
}

impl VoteCollector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns one ballot per assignment, in assignment order.
    ///
    /// Automated participants vote immediately. Humans are prompted and then
    /// waited on concurrently, so the whole call takes at most one timeout.
    pub async fn collect<R: Rng + ?Sized>(
        &self,
        round: &Round,
        broadcaster: &Broadcaster,
        rng: &mut R,
    ) -> Vec<Ballot> {
        let mut ballots: Vec<Option<Ballot>> = vec![None; round.assignments.len()];
        let mut waiting = JoinSet::new();

        for (slot, assignment) in round.assignments.iter().enumerate() {
            let participant = &assignment.participant;

            if participant.is_automated {
                let choice = ai_vote(&round.echoes, assignment.role, rng);
                debug!("{} (automated {}) votes {}", participant.name, assignment.role, choice);
                ballots[slot] = Some(Ballot::new(participant, choice, VoteSource::Automated));
                continue;
            }

            broadcaster.send(participant, ServerLine::VotePrompt);
            let participant = participant.clone();
            let deadline = self.timeout;
            waiting.spawn(async move {
                let (choice, source) = await_vote(&participant, deadline).await;
                (slot, Ballot::new(&participant, choice, source))
            });
        }

        while let Some(result) = waiting.join_next().await {
            match result {
                Ok((slot, ballot)) => ballots[slot] = Some(ballot),
                Err(e) => warn!("Vote wait task failed: {}", e),
            }
        }

        round
            .assignments
            .iter()
            .zip(ballots)
            .map(|(assignment, ballot)| {
                ballot.unwrap_or_else(|| {
                    Ballot::new(&assignment.participant, DEFAULT_VOTE, VoteSource::Disconnected)
                })
            })
            .collect()
    }
}

/// Waits for one vote line, falling back to the default vote.
async fn await_vote(participant: &Participant, deadline: Duration) -> (u8, VoteSource) {
    match timeout(deadline, participant.next_line()).await {
        Ok(Some(line)) => match parse_vote(&line) {
            Some(choice) => (choice, VoteSource::Submitted),
            None => {
                info!("{} sent an invalid vote {:?}, using default", participant.name, line);
                (DEFAULT_VOTE, VoteSource::Invalid)
            }
        },
        Ok(None) => {
            info!("{} disconnected before voting, using default", participant.name);
            (DEFAULT_VOTE, VoteSource::Disconnected)
        }
        Err(_) => {
            info!("{} did not vote in time, using default", participant.name);
            (DEFAULT_VOTE, VoteSource::TimedOut)
        }
    }
}

/// Counts votes per echo index, ordered by first appearance.
pub fn tally(ballots: &[Ballot]) -> Vec<(u8, usize)> {
    let mut counts: Vec<(u8, usize)> = Vec::new();
    for ballot in ballots {
        match counts.iter_mut().find(|(index, _)| *index == ballot.choice) {
            Some((_, count)) => *count += 1,
            None => counts.push((ballot.choice, 1)),
        }
    }
    counts
}

/// Picks the most voted index. Ties go to the index that was voted first.
pub fn winning_choice(counts: &[(u8, usize)]) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for &(index, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((index, count)),
        }
    }
    best.map(|(index, _)| index)
}
