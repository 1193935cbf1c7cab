//! Line protocol shared by the Echoes & Lies server and its clients.
//!
//! Every message is a single UTF-8 line terminated by `\n`. The server speaks
//! the [`ServerLine`] grammar; clients answer vote prompts with a bare echo
//! index (`1`, `2` or `3`).

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 12345;

/// Display names starting with this prefix (case-insensitive) are played by the server.
pub const AUTOMATED_NAME_PREFIX: &str = "ai";

/// Number of echoes shown each round.
pub const ECHO_COUNT: u8 = 3;
/// Vote recorded for a participant who stays silent or sends garbage.
pub const DEFAULT_VOTE: u8 = 1;

pub const VOTE_PROMPT: &str = "Choose the echo you believe is TRUE (1/2/3):";
/// Clients treat any line containing this marker as a request for a vote.
pub const VOTE_PROMPT_MARKER: &str = "Choose the echo";

const ROLE_PREFIX: &str = "ROLE:";
const ECHO_PREFIX: &str = "ECHO ";
const NOTE_PREFIX: &str = "NOTE: Echo ";
const NOTE_SUFFIX: &str = " is the lie.";
const SUMMARY_PREFIX: &str = "SUMMARY: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Whisperer,
    Explorer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Whisperer => write!(f, "Whisperer"),
            Role::Explorer => write!(f, "Explorer"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Whisperer" => Ok(Role::Whisperer),
            "Explorer" => Ok(Role::Explorer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A single server-to-client line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// `ROLE:<role>`
    Role(Role),
    /// `ECHO <n>: <text>`, `index` is 1-based
    Echo { index: u8, text: String },
    /// `NOTE: Echo <n> is the lie.`, only ever sent to the Whisperer
    LieNote { index: u8 },
    /// The vote prompt; clients should answer with an index
    VotePrompt,
    /// `SUMMARY: <text>`, a round result repeated for scrollback
    Summary(String),
    /// Rules, vote tallies, outcome and winner announcements
    Plain(String),
}

impl ServerLine {
    /// Parses one received line. Anything that is not a tagged line is `Plain`.
    pub fn parse(line: &str) -> ServerLine {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix(ROLE_PREFIX) {
            if let Ok(role) = rest.parse() {
                return ServerLine::Role(role);
            }
        }

        if let Some(rest) = line.strip_prefix(ECHO_PREFIX) {
            if let Some((index, text)) = rest.split_once(": ") {
                if let Ok(index) = index.parse() {
                    return ServerLine::Echo {
                        index,
                        text: text.to_string(),
                    };
                }
            }
        }

        if let Some(rest) = line.strip_prefix(NOTE_PREFIX) {
            if let Some(index) = rest.strip_suffix(NOTE_SUFFIX) {
                if let Ok(index) = index.parse() {
                    return ServerLine::LieNote { index };
                }
            }
        }

        if let Some(rest) = line.strip_prefix(SUMMARY_PREFIX) {
            return ServerLine::Summary(rest.to_string());
        }

        if line.contains(VOTE_PROMPT_MARKER) {
            return ServerLine::VotePrompt;
        }

        ServerLine::Plain(line.to_string())
    }
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerLine::Role(role) => write!(f, "{}{}", ROLE_PREFIX, role),
            ServerLine::Echo { index, text } => write!(f, "{}{}: {}", ECHO_PREFIX, index, text),
            ServerLine::LieNote { index } => write!(f, "{}{}{}", NOTE_PREFIX, index, NOTE_SUFFIX),
            ServerLine::VotePrompt => write!(f, "{}", VOTE_PROMPT),
            ServerLine::Summary(text) => write!(f, "{}{}", SUMMARY_PREFIX, text),
            ServerLine::Plain(text) => write!(f, "{}", text),
        }
    }
}

/// Parses a client vote. Only the literals `1`, `2` and `3` are valid.
pub fn parse_vote(line: &str) -> Option<u8> {
    match line.trim().parse::<u8>() {
        Ok(index) if (1..=ECHO_COUNT).contains(&index) => Some(index),
        _ => None,
    }
}

/// Normalizes a join handshake line into a display name.
pub fn display_name(handshake: &str) -> String {
    handshake.trim().to_string()
}

pub fn is_automated_name(name: &str) -> bool {
    name.to_lowercase().starts_with(AUTOMATED_NAME_PREFIX)
}
