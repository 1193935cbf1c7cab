//! Vote policy for automated participants.
//!
//! An automated Explorer is only as good as a coin flip between "some true
//! echo" and "the lie". An automated Whisperer pushes the lie it knows about
//! most of the time.

use crate::content::EchoSet;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Role, DEFAULT_VOTE};

/// Chance an automated Explorer picks a true echo.
pub const EXPLORER_TRUTH_PROBABILITY: f64 = 0.5;
/// Chance an automated Whisperer picks the lie.
pub const WHISPERER_LIE_PROBABILITY: f64 = 0.7;

/// Picks a 1-based echo index for an automated participant.
pub fn ai_vote<R: Rng + ?Sized>(echoes: &EchoSet, role: Role, rng: &mut R) -> u8 {
    let truths = echoes.true_indices();
    let lies = echoes.false_indices();

    let pick_truth = match role {
        Role::Explorer => rng.gen_bool(EXPLORER_TRUTH_PROBABILITY),
        Role::Whisperer => !rng.gen_bool(WHISPERER_LIE_PROBABILITY),
    };
    let pool = if pick_truth { &truths } else { &lies };

    pool.choose(rng).copied().unwrap_or(DEFAULT_VOTE)
}
