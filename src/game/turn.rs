use crate::lobby::group::{GroupDoc, GroupId};
use crate::lobby::player::PlayerId;

/// Turn-state corruption. These signal an inconsistent group document,
/// not a recoverable condition: log and abort, never repair in place.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TurnError {
    #[error("group {0} has no turn holder")]
    NoTurnHolder(GroupId),
    #[error("turn holder {player} is not in the roster of group {group}")]
    HolderNotInRoster { group: GroupId, player: PlayerId },
}

/// Roster successor of the current turn holder, wrapping at the end.
/// Rotation order is roster order; identity is player id throughout.
pub fn advance_turn(group: &GroupDoc) -> Result<PlayerId, TurnError> {
    let holder = group
        .current_turn
        .ok_or(TurnError::NoTurnHolder(group.id))?;
    let index = group
        .players
        .iter()
        .position(|&player| player == holder)
        .ok_or(TurnError::HolderNotInRoster {
            group: group.id,
            player: holder,
        })?;
    Ok(group.players[(index + 1) % group.players.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn group_with_turn(players: &[PlayerId], turn: PlayerId) -> GroupDoc {
        let mut group = GroupDoc::with_players(players.iter().copied());
        group.current_turn = Some(turn);
        group
    }

    #[test]
    fn test_rotation_wraps() {
        let players: Vec<PlayerId> = (0..3).map(|_| Uuid::new_v4()).collect();

        let mut group = group_with_turn(&players, players[0]);
        // p0 -> p1 -> p2 -> p0
        for expected in [players[1], players[2], players[0], players[1]] {
            let next = advance_turn(&group).unwrap();
            assert_eq!(next, expected);
            group.current_turn = Some(next);
        }
    }

    #[test]
    fn test_rotation_with_two_players() {
        let players: Vec<PlayerId> = (0..2).map(|_| Uuid::new_v4()).collect();
        let group = group_with_turn(&players, players[1]);
        assert_eq!(advance_turn(&group).unwrap(), players[0]);
    }

    #[test]
    fn test_no_turn_holder() {
        let group = GroupDoc::with_players((0..3).map(|_| Uuid::new_v4()));
        assert!(matches!(
            advance_turn(&group),
            Err(TurnError::NoTurnHolder(_))
        ));
    }

    #[test]
    fn test_holder_outside_roster_is_fatal() {
        let players: Vec<PlayerId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let group = group_with_turn(&players, Uuid::new_v4());
        assert!(matches!(
            advance_turn(&group),
            Err(TurnError::HolderNotInRoster { .. })
        ));
    }
}
