use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;
use uuid::Uuid;

use crate::lobby::player::{PlayerDoc, PlayerId};
use crate::maze::{CellPos, Difficulty};
use crate::store::{DocPath, DocWatch, MemoryStore, QueryWatch};

/// Unique group identifier
pub type GroupId = Uuid;

/// Group lifecycle phase, derived from the latest observed snapshot.
/// Clients navigate on phase alone; no locally cached flag combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Roster still filling
    Forming,
    /// Full roster, waiting for any member to pick a difficulty
    DifficultyPending,
    /// Navigating the maze in turn order
    InProgress,
    /// Exit reached
    Ended,
}

/// Shared group document: roster, phase flags, and navigation state.
///
/// No single client owns this document; every mutation with a read
/// dependency goes through a store transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDoc {
    pub id: GroupId,
    /// Ordered roster, append-only until full. Rotation order = roster order.
    pub players: SmallVec<[PlayerId; 3]>,
    pub game_started: bool,
    pub difficulty: Option<Difficulty>,
    /// Turn holder by stable player id, never by display name.
    pub current_turn: Option<PlayerId>,
    pub position: CellPos,
    pub steps_taken: u32,
    pub game_ended: bool,
}

impl GroupDoc {
    pub const COLLECTION: &'static str = "groups";

    pub fn with_players(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            players: players.into_iter().collect(),
            game_started: false,
            difficulty: None,
            current_turn: None,
            position: CellPos::ORIGIN,
            steps_taken: 0,
            game_ended: false,
        }
    }

    pub fn path(id: GroupId) -> DocPath {
        DocPath::new(Self::COLLECTION, id.to_string())
    }

    /// Accepting members: not started and roster below capacity.
    pub fn is_open(&self, group_size: usize) -> bool {
        !self.game_started && self.players.len() < group_size
    }

    pub fn is_full(&self, group_size: usize) -> bool {
        self.players.len() >= group_size
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|&p| p == player_id)
    }

    /// Phase as a pure function of this snapshot.
    pub fn phase(&self, group_size: usize) -> GamePhase {
        if self.game_ended {
            GamePhase::Ended
        } else if self.game_started {
            GamePhase::InProgress
        } else if self.is_full(group_size) {
            GamePhase::DifficultyPending
        } else {
            GamePhase::Forming
        }
    }
}

/// One observed change to a group document.
#[derive(Debug, Clone)]
pub enum GroupSnapshot {
    /// Latest committed state
    Current(GroupDoc),
    /// The document no longer exists (group dissolved)
    Removed,
}

/// Push subscription to a single group document.
/// Dropping the watch releases the underlying store subscription.
pub struct GroupWatch {
    inner: DocWatch,
}

impl GroupWatch {
    /// Next observed snapshot; None when the store is gone.
    pub async fn next(&mut self) -> Option<GroupSnapshot> {
        while let Some(snapshot) = self.inner.next().await {
            match snapshot {
                None => return Some(GroupSnapshot::Removed),
                Some(value) => match serde_json::from_value::<GroupDoc>(value) {
                    Ok(group) => return Some(GroupSnapshot::Current(group)),
                    Err(e) => {
                        // Data-integrity error; skip and wait for a sane snapshot
                        warn!("corrupt group snapshot: {}", e);
                    }
                },
            }
        }
        None
    }
}

/// Subscribe to a group document.
pub fn watch_group(store: &MemoryStore, group_id: GroupId) -> GroupWatch {
    GroupWatch {
        inner: store.watch_doc(&GroupDoc::path(group_id)),
    }
}

/// Push subscription to the players assigned to one group: the
/// waiting-room roster view.
pub struct RosterWatch {
    inner: QueryWatch,
}

impl RosterWatch {
    /// Next roster snapshot, in join order.
    pub async fn next(&mut self) -> Option<Vec<PlayerDoc>> {
        let docs = self.inner.next().await?;
        let mut roster = Vec::with_capacity(docs.len());
        for doc in docs {
            match doc.decode::<PlayerDoc>() {
                Ok(player) => roster.push(player),
                Err(e) => warn!("corrupt player doc {}: {}", doc.id, e),
            }
        }
        Some(roster)
    }
}

/// Subscribe to the roster of a group.
pub fn watch_roster(store: &MemoryStore, group_id: GroupId) -> RosterWatch {
    let group_field = group_id.to_string();
    RosterWatch {
        inner: store.watch_query(PlayerDoc::COLLECTION, move |value| {
            value.get("group").and_then(|g| g.as_str()) == Some(group_field.as_str())
        }),
    }
}
