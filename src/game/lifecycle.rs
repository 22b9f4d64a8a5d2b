//! Group-level phase transitions
//!
//! Difficulty selection, create-once maze generation, reset ("quit"), and
//! departure. Transitions are observed by every member through the group
//! watch; each client re-derives its phase from the snapshot alone.

use serde_json::json;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::game::turn::advance_turn;
use crate::lobby::group::{GroupDoc, GroupId};
use crate::lobby::player::{PlayerDoc, PlayerId};
use crate::maze::{generator, CellPos, Difficulty, MazeDoc};
use crate::store::{MemoryStore, StoreError};

/// Lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("group not found: {0}")]
    GroupMissing(GroupId),
    #[error("group {0} has an empty roster")]
    EmptyRoster(GroupId),
    #[error("group {0} has no difficulty selected")]
    NoDifficulty(GroupId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Select the difficulty and start the game for every member.
///
/// Any single member may do this, no quorum. Seats the first roster
/// member as the opening turn holder. Plain update, no transaction:
/// these fields are being written for the first time, so there is no
/// read-modify-write to protect.
pub async fn select_difficulty(
    store: &MemoryStore,
    group_id: GroupId,
    difficulty: Difficulty,
) -> Result<(), LifecycleError> {
    let group: GroupDoc = store
        .get_as(&GroupDoc::path(group_id))
        .await?
        .ok_or(LifecycleError::GroupMissing(group_id))?;
    let first = group
        .players
        .first()
        .copied()
        .ok_or(LifecycleError::EmptyRoster(group_id))?;

    store
        .update(
            &GroupDoc::path(group_id),
            json!({
                "difficulty": difficulty,
                "game_started": true,
                "current_turn": first,
            }),
        )
        .await?;

    info!(
        "group {} started on {} difficulty, first turn {}",
        group_id, difficulty, first
    );
    Ok(())
}

/// Fetch the group's maze, generating it exactly once.
///
/// Create-once guard: the transaction checks the committed `generated`
/// flag; the first committer wins the race and racing losers re-run
/// against the winner's maze, discarding their own candidate.
pub async fn ensure_maze(
    store: &MemoryStore,
    config: &GameConfig,
    group_id: GroupId,
) -> Result<MazeDoc, LifecycleError> {
    store
        .transaction(|txn| {
            if let Some(maze) = txn.get_as::<MazeDoc>(&MazeDoc::path(group_id))? {
                if maze.generated {
                    return Ok(maze);
                }
            }

            let group: GroupDoc = txn
                .get_as(&GroupDoc::path(group_id))?
                .ok_or(LifecycleError::GroupMissing(group_id))?;
            let difficulty = group
                .difficulty
                .ok_or(LifecycleError::NoDifficulty(group_id))?;

            let maze = generator::generate(difficulty, config);
            txn.set(&MazeDoc::path(group_id), &maze)?;
            info!(
                "maze generated for group {}: {}x{}",
                group_id, maze.size, maze.size
            );
            Ok(maze)
        })
        .await
}

/// Reset the group to its pristine pre-start state and drop the maze.
///
/// The "quit" action: any single member, unilaterally, from a running
/// game. Every member's watch observes the cleared flags and navigates
/// back to difficulty selection; the next selection regenerates a fresh
/// maze.
pub async fn reset_game(store: &MemoryStore, group_id: GroupId) -> Result<(), LifecycleError> {
    store
        .transaction(|txn| -> Result<(), LifecycleError> {
            let mut group: GroupDoc = txn
                .get_as(&GroupDoc::path(group_id))?
                .ok_or(LifecycleError::GroupMissing(group_id))?;

            group.game_started = false;
            group.difficulty = None;
            group.current_turn = None;
            group.position = CellPos::ORIGIN;
            group.steps_taken = 0;
            group.game_ended = false;
            txn.set(&GroupDoc::path(group_id), &group)?;
            txn.delete(&MazeDoc::path(group_id));
            Ok(())
        })
        .await?;

    info!("group {} reset", group_id);
    Ok(())
}

/// Remove a player from the directory and their roster.
///
/// Dissolves the group (and its maze) when the last member leaves. If the
/// leaver held the turn, it is handed to their roster successor so the
/// remaining members can keep playing.
pub async fn leave_game(store: &MemoryStore, player_id: PlayerId) -> Result<(), LifecycleError> {
    store
        .transaction(|txn| -> Result<(), LifecycleError> {
            let player: Option<PlayerDoc> = txn.get_as(&PlayerDoc::path(player_id))?;
            let Some(player) = player else {
                return Ok(()); // already gone; nothing to unwind
            };

            if let Some(group_id) = player.group {
                if let Some(mut group) = txn.get_as::<GroupDoc>(&GroupDoc::path(group_id))? {
                    if group.current_turn == Some(player_id) {
                        group.current_turn = match advance_turn(&group) {
                            Ok(next) => Some(next),
                            Err(e) => {
                                warn!("turn handoff on leave failed: {}", e);
                                None
                            }
                        };
                    }
                    group.players.retain(|&mut member| member != player_id);

                    if group.players.is_empty() {
                        txn.delete(&GroupDoc::path(group_id));
                        txn.delete(&MazeDoc::path(group_id));
                    } else {
                        txn.set(&GroupDoc::path(group_id), &group)?;
                    }
                }
            }

            txn.delete(&PlayerDoc::path(player_id));
            Ok(())
        })
        .await?;

    info!("player {} left", player_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::group::GamePhase;
    use uuid::Uuid;

    async fn seed_full_group(store: &MemoryStore) -> (GroupId, Vec<PlayerId>) {
        let mut players = Vec::new();
        for name in ["a", "b", "c"] {
            let player = PlayerDoc::new(name.to_string());
            players.push(player.id);
            store.set(&PlayerDoc::path(player.id), &player).await.unwrap();
        }
        let group = GroupDoc::with_players(players.iter().copied());
        let group_id = group.id;
        store.set(&GroupDoc::path(group_id), &group).await.unwrap();

        // Point the members at their group
        for &id in &players {
            store
                .update(
                    &PlayerDoc::path(id),
                    json!({"group": group_id, "status": "assigned"}),
                )
                .await
                .unwrap();
        }
        (group_id, players)
    }

    async fn reload(store: &MemoryStore, group_id: GroupId) -> GroupDoc {
        store
            .get_as(&GroupDoc::path(group_id))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_select_difficulty_starts_game() {
        let store = MemoryStore::new();
        let config = GameConfig::default();
        let (group_id, players) = seed_full_group(&store).await;

        select_difficulty(&store, group_id, Difficulty::Easy)
            .await
            .unwrap();

        let group = reload(&store, group_id).await;
        assert!(group.game_started);
        assert_eq!(group.difficulty, Some(Difficulty::Easy));
        assert_eq!(group.current_turn, Some(players[0]));
        assert_eq!(group.phase(config.group_size), GamePhase::InProgress);
    }

    #[tokio::test]
    async fn test_ensure_maze_matches_difficulty() {
        let store = MemoryStore::new();
        let config = GameConfig::default();
        let (group_id, _) = seed_full_group(&store).await;
        select_difficulty(&store, group_id, Difficulty::Easy)
            .await
            .unwrap();

        let maze = ensure_maze(&store, &config, group_id).await.unwrap();
        assert_eq!(maze.size, 10);
        assert_eq!(maze.grid.len(), 100);
        assert!(maze.generated);
    }

    #[tokio::test]
    async fn test_ensure_maze_is_create_once() {
        let store = MemoryStore::new();
        let config = GameConfig::default();
        let (group_id, _) = seed_full_group(&store).await;
        select_difficulty(&store, group_id, Difficulty::Easy)
            .await
            .unwrap();

        let first = ensure_maze(&store, &config, group_id).await.unwrap();
        let second = ensure_maze(&store, &config, group_id).await.unwrap();

        // Late observers read the committed maze, never a fresh one
        for (a, b) in first.grid.iter().zip(&second.grid) {
            assert_eq!(a.walls, b.walls);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ensure_maze_single_winner_under_race() {
        let store = MemoryStore::new();
        let config = GameConfig::default();
        let (group_id, _) = seed_full_group(&store).await;
        select_difficulty(&store, group_id, Difficulty::Easy)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let store = store.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                ensure_maze(&store, &config, group_id).await.unwrap()
            }));
        }
        let mut mazes = Vec::new();
        for handle in handles {
            mazes.push(handle.await.unwrap());
        }

        // All racers converged on one committed maze
        for maze in &mazes[1..] {
            for (a, b) in mazes[0].grid.iter().zip(&maze.grid) {
                assert_eq!(a.walls, b.walls);
            }
        }
    }

    #[tokio::test]
    async fn test_ensure_maze_requires_difficulty() {
        let store = MemoryStore::new();
        let config = GameConfig::default();
        let (group_id, _) = seed_full_group(&store).await;

        let result = ensure_maze(&store, &config, group_id).await;
        assert!(matches!(result, Err(LifecycleError::NoDifficulty(_))));
    }

    #[tokio::test]
    async fn test_reset_restores_pristine_state() {
        let store = MemoryStore::new();
        let config = GameConfig::default();
        let (group_id, players) = seed_full_group(&store).await;
        select_difficulty(&store, group_id, Difficulty::Medium)
            .await
            .unwrap();
        ensure_maze(&store, &config, group_id).await.unwrap();

        // Simulate mid-game state
        store
            .update(
                &GroupDoc::path(group_id),
                json!({"position": {"row": 3, "col": 4}, "steps_taken": 9, "current_turn": players[2]}),
            )
            .await
            .unwrap();

        reset_game(&store, group_id).await.unwrap();

        let group = reload(&store, group_id).await;
        assert!(!group.game_started);
        assert_eq!(group.difficulty, None);
        assert_eq!(group.steps_taken, 0);
        assert_eq!(group.position, CellPos::ORIGIN);
        assert_eq!(group.current_turn, None);
        assert!(!group.game_ended);
        assert_eq!(group.phase(config.group_size), GamePhase::DifficultyPending);

        // The maze is gone; the next selection regenerates
        let maze = store
            .get_as::<MazeDoc>(&MazeDoc::path(group_id))
            .await
            .unwrap();
        assert!(maze.is_none());
    }

    #[tokio::test]
    async fn test_leave_removes_player_from_roster() {
        let store = MemoryStore::new();
        let (group_id, players) = seed_full_group(&store).await;

        leave_game(&store, players[1]).await.unwrap();

        let group = reload(&store, group_id).await;
        assert_eq!(group.players.to_vec(), vec![players[0], players[2]]);
        let gone = store
            .get_as::<PlayerDoc>(&PlayerDoc::path(players[1]))
            .await
            .unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_last_leaver_dissolves_group() {
        let store = MemoryStore::new();
        let (group_id, players) = seed_full_group(&store).await;

        for &player in &players {
            leave_game(&store, player).await.unwrap();
        }

        let group = store
            .get_as::<GroupDoc>(&GroupDoc::path(group_id))
            .await
            .unwrap();
        assert!(group.is_none());
    }

    #[tokio::test]
    async fn test_leaving_turn_holder_hands_off() {
        let store = MemoryStore::new();
        let (group_id, players) = seed_full_group(&store).await;
        select_difficulty(&store, group_id, Difficulty::Easy)
            .await
            .unwrap();

        // players[0] holds the opening turn and leaves
        leave_game(&store, players[0]).await.unwrap();

        let group = reload(&store, group_id).await;
        assert_eq!(group.current_turn, Some(players[1]));
        assert!(!group.contains(players[0]));
    }

    #[tokio::test]
    async fn test_leave_unknown_player_is_silent() {
        let store = MemoryStore::new();
        assert!(leave_game(&store, Uuid::new_v4()).await.is_ok());
    }
}
