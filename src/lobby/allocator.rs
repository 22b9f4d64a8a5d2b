//! Transactional first-fit group assignment.
//!
//! Concurrent joiners race freely; the whole read-evaluate-write runs as
//! one store transaction, so no player lands in two rosters and no roster
//! grows past capacity no matter how the races resolve.

use tracing::{debug, info};

use crate::config::GameConfig;
use crate::lobby::group::{GroupDoc, GroupId};
use crate::lobby::player::{PlayerDoc, PlayerId, PlayerStatus};
use crate::store::{MemoryStore, StoreError};

/// Allocation errors
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("player not found: {0}")]
    PlayerMissing(PlayerId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Evaluate group assignment for a player.
///
/// First fit: the oldest open group (`!game_started`, roster below
/// capacity) takes the joiner. With no open group, the earliest waiting
/// players in directory creation order are batched into a brand-new
/// group, all assigned in the same commit. With neither, nothing is
/// written and the player stays in the pool until a later join
/// re-evaluates.
///
/// Returns the group the player ended up in, or None while still waiting.
pub async fn assign_to_group(
    store: &MemoryStore,
    config: &GameConfig,
    player_id: PlayerId,
) -> Result<Option<GroupId>, AllocError> {
    let group_size = config.group_size;

    let assigned = store
        .transaction(|txn| -> Result<Option<GroupId>, AllocError> {
            let mut player: PlayerDoc = txn
                .get_as(&PlayerDoc::path(player_id))?
                .ok_or(AllocError::PlayerMissing(player_id))?;

            // Already placed; assignment is idempotent
            if let Some(existing) = player.group {
                return Ok(Some(existing));
            }

            // Prefer filling an existing open group over creating one
            let mut open_group: Option<GroupDoc> = None;
            for doc in txn.query(GroupDoc::COLLECTION) {
                let group: GroupDoc = doc.decode()?;
                if group.is_open(group_size) {
                    open_group = Some(group);
                    break;
                }
            }

            if let Some(mut group) = open_group {
                if !group.contains(player_id) {
                    group.players.push(player_id);
                }
                player.group = Some(group.id);
                player.status = PlayerStatus::Assigned;
                txn.set(&GroupDoc::path(group.id), &group)?;
                txn.set(&PlayerDoc::path(player_id), &player)?;
                return Ok(Some(group.id));
            }

            // No open group: batch the earliest waiting players
            let mut waiting: Vec<PlayerDoc> = Vec::new();
            for doc in txn.query(PlayerDoc::COLLECTION) {
                let candidate: PlayerDoc = doc.decode()?;
                if candidate.is_waiting() {
                    waiting.push(candidate);
                }
            }
            if waiting.len() < group_size {
                return Ok(None);
            }
            waiting.truncate(group_size);

            let group = GroupDoc::with_players(waiting.iter().map(|p| p.id));
            txn.set(&GroupDoc::path(group.id), &group)?;
            for mut member in waiting {
                member.group = Some(group.id);
                member.status = PlayerStatus::Assigned;
                txn.set(&PlayerDoc::path(member.id), &member)?;
            }

            // The batch is the *earliest* waiters; the caller may not be in it
            if group.contains(player_id) {
                Ok(Some(group.id))
            } else {
                Ok(None)
            }
        })
        .await?;

    match assigned {
        Some(group_id) => info!("player {} assigned to group {}", player_id, group_id),
        None => debug!("player {} still waiting for a group", player_id),
    }
    Ok(assigned)
}
