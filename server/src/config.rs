use std::time::Duration;

/// Tunables for one game session.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Rounds played before the winner is announced
    pub max_rounds: u32,
    /// How long a human participant has to answer a vote prompt
    pub vote_timeout: Duration,
    /// Pause after each round so clients can render the results
    pub round_pause: Duration,
    /// Retry interval while nobody is connected at round setup
    pub lobby_poll: Duration,
    /// Accepted lies needed for the Whisperer faction to win
    pub lie_threshold: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            vote_timeout: Duration::from_secs(30),
            round_pause: Duration::from_secs(2),
            lobby_poll: Duration::from_millis(500),
            lie_threshold: 2,
        }
    }
}
