//! Move validation and atomic application.
//!
//! A move's position, step count, and turn handoff (or win flag) commit as
//! one transaction unit keyed on the group document. Two racing moves can
//! never both apply: the loser's snapshot is stale and the store re-runs
//! it against the winner's committed state.

use tracing::{debug, warn};

use crate::game::turn::{advance_turn, TurnError};
use crate::lobby::group::{GroupDoc, GroupId};
use crate::lobby::player::PlayerId;
use crate::maze::{CellPos, Direction, MazeDoc};
use crate::store::{MemoryStore, StoreError};

/// Result of a legal-move attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The move was legal and the shared position advanced
    pub applied: bool,
    /// The move reached the exit and ended the game
    pub completed: bool,
}

/// Move errors
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("group not found: {0}")]
    GroupMissing(GroupId),
    #[error("no generated maze for group {0}")]
    MazeMissing(GroupId),
    #[error("game not in progress for group {0}")]
    NotInProgress(GroupId),
    #[error("not the turn of player {0}")]
    NotYourTurn(PlayerId),
    #[error("group position {0} is outside the maze grid")]
    PositionOutOfBounds(CellPos),
    #[error(transparent)]
    Turn(#[from] TurnError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Attempt a move on behalf of the turn holder.
///
/// A wall in the way is a normal negative outcome (`applied: false`),
/// not an error, and mutates nothing. A legal move lands either the turn
/// handoff or the win flag, never both.
pub async fn submit_move(
    store: &MemoryStore,
    group_id: GroupId,
    player_id: PlayerId,
    direction: Direction,
) -> Result<MoveOutcome, MoveError> {
    let result = store
        .transaction(|txn| {
            let mut group: GroupDoc = txn
                .get_as(&GroupDoc::path(group_id))?
                .ok_or(MoveError::GroupMissing(group_id))?;
            if !group.game_started || group.game_ended {
                return Err(MoveError::NotInProgress(group_id));
            }
            if group.current_turn != Some(player_id) {
                return Err(MoveError::NotYourTurn(player_id));
            }

            let maze: MazeDoc = txn
                .get_as(&MazeDoc::path(group_id))?
                .filter(|maze: &MazeDoc| maze.generated)
                .ok_or(MoveError::MazeMissing(group_id))?;
            let cell = maze
                .cell(group.position)
                .ok_or(MoveError::PositionOutOfBounds(group.position))?;

            if cell.walls.blocks(direction) {
                return Ok(MoveOutcome {
                    applied: false,
                    completed: false,
                });
            }
            let destination = maze
                .neighbor(group.position, direction)
                .ok_or(MoveError::PositionOutOfBounds(group.position))?;

            group.position = destination;
            group.steps_taken += 1;
            let completed = destination == maze.exit();
            if completed {
                // Win and turn handoff are mutually exclusive
                group.game_ended = true;
            } else {
                group.current_turn = Some(advance_turn(&group)?);
            }
            txn.set(&GroupDoc::path(group_id), &group)?;

            Ok(MoveOutcome {
                applied: true,
                completed,
            })
        })
        .await;

    match &result {
        Ok(outcome) => debug!(
            "move {:?} by {} in group {}: applied={} completed={}",
            direction, player_id, group_id, outcome.applied, outcome.completed
        ),
        Err(MoveError::Turn(e)) => warn!("turn state corrupted in group {}: {}", group_id, e),
        Err(e) => debug!("move rejected in group {}: {}", group_id, e),
    }
    result
}
