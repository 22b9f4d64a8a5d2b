use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lobby::group::GroupId;
use crate::session::SessionToken;
use crate::store::DocPath;

/// Unique player identifier
pub type PlayerId = Uuid;

/// Where a player is in the matchmaking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// In the pool, not yet placed in a group
    Waiting,
    /// Placed in a group
    Assigned,
}

/// Player directory document.
///
/// Identity is `id` (and the session token it was issued with), never
/// `username`: display names are not unique and must not key anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDoc {
    pub id: PlayerId,
    pub username: String,
    pub group: Option<GroupId>,
    pub status: PlayerStatus,
    pub session: SessionToken,
}

impl PlayerDoc {
    pub const COLLECTION: &'static str = "players";

    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            group: None,
            status: PlayerStatus::Waiting,
            session: SessionToken::generate(),
        }
    }

    pub fn path(id: PlayerId) -> DocPath {
        DocPath::new(Self::COLLECTION, id.to_string())
    }

    /// Eligible for group assignment.
    pub fn is_waiting(&self) -> bool {
        self.status == PlayerStatus::Waiting && self.group.is_none()
    }
}
