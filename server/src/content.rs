//! The pool of echoes a round draws from.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::ECHO_COUNT;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    pub is_true: bool,
}

impl Statement {
    pub fn new(text: impl Into<String>, is_true: bool) -> Self {
        Self {
            text: text.into(),
            is_true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentBankError {
    #[error("failed to read content bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse content bank: {0}")]
    Json(#[from] serde_json::Error),
    #[error("content bank needs at least 2 true and 1 false statement, got {truths} true and {lies} false")]
    Unsatisfiable { truths: usize, lies: usize },
}

/// The three echoes shown in one round: exactly two true, one false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoSet {
    echoes: [Statement; ECHO_COUNT as usize],
}

impl EchoSet {
    /// Returns `None` unless exactly one of the statements is false.
    pub fn new(echoes: [Statement; ECHO_COUNT as usize]) -> Option<Self> {
        let truths = echoes.iter().filter(|e| e.is_true).count();
        if truths == ECHO_COUNT as usize - 1 {
            Some(Self { echoes })
        } else {
            None
        }
    }

    /// Looks up an echo by its 1-based index.
    pub fn get(&self, index: u8) -> Option<&Statement> {
        (index as usize)
            .checked_sub(1)
            .and_then(|i| self.echoes.get(i))
    }

    /// Iterates `(1-based index, statement)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Statement)> {
        self.echoes
            .iter()
            .enumerate()
            .map(|(i, statement)| (i as u8 + 1, statement))
    }

    pub fn true_indices(&self) -> Vec<u8> {
        self.iter()
            .filter(|(_, s)| s.is_true)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn false_indices(&self) -> Vec<u8> {
        self.iter()
            .filter(|(_, s)| !s.is_true)
            .map(|(i, _)| i)
            .collect()
    }

    /// 1-based index of the lie.
    pub fn lie_index(&self) -> u8 {
        self.false_indices()
            .first()
            .copied()
            .unwrap_or(shared::DEFAULT_VOTE)
    }
}

/// Read-only, ordered pool of statements.
#[derive(Debug, Clone)]
pub struct ContentBank {
    statements: Vec<Statement>,
}

impl ContentBank {
    /// Builds a bank, rejecting pools that can never yield a valid echo set.
    pub fn new(statements: Vec<Statement>) -> Result<Self, ContentBankError> {
        let truths = statements.iter().filter(|s| s.is_true).count();
        let lies = statements.len() - truths;
        if truths < ECHO_COUNT as usize - 1 || lies < 1 {
            return Err(ContentBankError::Unsatisfiable { truths, lies });
        }
        Ok(Self { statements })
    }

    /// Loads a JSON array of `{ "text": ..., "is_true": ... }` objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ContentBankError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ContentBankError> {
        let statements: Vec<Statement> = serde_json::from_str(raw)?;
        Self::new(statements)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Draws three distinct statements, resampling until exactly one is a lie.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EchoSet {
        loop {
            let mut picked: Vec<Statement> = self
                .statements
                .choose_multiple(rng, ECHO_COUNT as usize)
                .cloned()
                .collect();
            picked.shuffle(rng);

            let Ok(echoes) = <[Statement; ECHO_COUNT as usize]>::try_from(picked) else {
                continue;
            };
            if let Some(set) = EchoSet::new(echoes) {
                return set;
            }
        }
    }
}

impl Default for ContentBank {
    fn default() -> Self {
        Self {
            statements: vec![
                Statement::new("The stars speak only to those who listen.", true),
                Statement::new("The world was flat before the Great Turn.", false),
                Statement::new("Magic once flowed through rivers like water.", true),
                Statement::new("Books can whisper only to Whisperers.", false),
                Statement::new("Truth is hidden in the third shelf of the East Wing.", true),
                Statement::new("Only lies can open the final door.", false),
            ],
        }
    }
}
