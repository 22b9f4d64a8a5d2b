//! Maze generation and grid queries
//!
//! One maze per group, generated lazily on first access after difficulty
//! selection and immutable for the rest of that game.

pub mod generator;
pub mod grid;

pub use grid::{Cell, CellPos, Direction, MazeDoc, Walls};

use serde::{Deserialize, Serialize};

/// Maze difficulty, selected once per game by any group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_serde_lowercase() {
        let json = serde_json::to_value(Difficulty::Medium).unwrap();
        assert_eq!(json, serde_json::json!("medium"));

        let back: Difficulty = serde_json::from_value(serde_json::json!("hard")).unwrap();
        assert_eq!(back, Difficulty::Hard);
    }
}
