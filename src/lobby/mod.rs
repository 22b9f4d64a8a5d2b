//! Player directory and group matchmaking
//!
//! Joining mints an identity (player document + session token) and runs
//! one allocation pass; subsequent joins re-trigger allocation for anyone
//! still in the waiting pool.

pub mod allocator;
pub mod group;
pub mod player;

use tracing::info;

use crate::config::GameConfig;
use crate::lobby::allocator::AllocError;
use crate::lobby::group::GroupId;
use crate::lobby::player::{PlayerDoc, PlayerId};
use crate::session::SessionToken;
use crate::store::{MemoryStore, StoreError};

/// Join errors
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The one blocking input error: a blank display name
    #[error("username must not be empty")]
    EmptyUsername,
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identity handle a client keeps for the whole session.
#[derive(Debug, Clone)]
pub struct JoinTicket {
    pub player_id: PlayerId,
    pub session: SessionToken,
    /// Set when this join completed a batch or filled an open seat.
    pub group: Option<GroupId>,
}

/// Enter the waiting pool under a display name.
pub async fn join_game(
    store: &MemoryStore,
    config: &GameConfig,
    username: &str,
) -> Result<JoinTicket, JoinError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(JoinError::EmptyUsername);
    }

    let player = PlayerDoc::new(username.to_string());
    let player_id = player.id;
    let session = player.session.clone();
    store.set(&PlayerDoc::path(player_id), &player).await?;
    info!("player {} joined as '{}'", player_id, username);

    let group = allocator::assign_to_group(store, config, player_id).await?;
    Ok(JoinTicket {
        player_id,
        session,
        group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_rejects_blank_username() {
        let store = MemoryStore::new();
        let config = GameConfig::default();

        assert!(matches!(
            join_game(&store, &config, "").await,
            Err(JoinError::EmptyUsername)
        ));
        assert!(matches!(
            join_game(&store, &config, "   ").await,
            Err(JoinError::EmptyUsername)
        ));
    }

    #[tokio::test]
    async fn test_join_trims_username() {
        let store = MemoryStore::new();
        let config = GameConfig::default();

        let ticket = join_game(&store, &config, "  mouse  ").await.unwrap();
        let player: PlayerDoc = store
            .get_as(&PlayerDoc::path(ticket.player_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(player.username, "mouse");
    }

    #[tokio::test]
    async fn test_duplicate_usernames_stay_distinct() {
        let store = MemoryStore::new();
        let config = GameConfig::default();

        let t1 = join_game(&store, &config, "mouse").await.unwrap();
        let t2 = join_game(&store, &config, "mouse").await.unwrap();
        assert_ne!(t1.player_id, t2.player_id);
        assert_ne!(t1.session, t2.session);
    }

    #[tokio::test]
    async fn test_third_join_reports_group() {
        let store = MemoryStore::new();
        let config = GameConfig::default();

        let t1 = join_game(&store, &config, "a").await.unwrap();
        let t2 = join_game(&store, &config, "b").await.unwrap();
        assert_eq!(t1.group, None);
        assert_eq!(t2.group, None);

        let t3 = join_game(&store, &config, "c").await.unwrap();
        assert!(t3.group.is_some());
    }
}
