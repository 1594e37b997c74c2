//! Match room membership.

use std::collections::{BTreeMap, BTreeSet};

use crate::{ConnId, MatchId};

/// Number of members a match room is expected to hold.
pub const EXPECTED_ROOM_SIZE: usize = 2;

/// Map of match identifier to the connections currently joined to it.
///
/// Rooms are created on first join and pruned once their last member leaves,
/// so an empty room and an unknown room look the same to callers.
#[derive(Debug, Default)]
pub struct Rooms {
    rooms: BTreeMap<MatchId, BTreeSet<ConnId>>,
}

impl Rooms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to the room `match_id`, creating the room if needed.
    ///
    /// Returns `false` if `conn` was already a member.
    pub fn join(&mut self, conn: ConnId, match_id: &str) -> bool {
        let members = self.rooms.entry(match_id.to_owned()).or_default();
        let inserted = members.insert(conn);

        if inserted && members.len() > EXPECTED_ROOM_SIZE {
            log::warn!(
                "Room '{match_id}' now has {} members (expected at most {EXPECTED_ROOM_SIZE})",
                members.len()
            );
        }

        inserted
    }

    /// Removes `conn` from the room `match_id`.
    ///
    /// Returns `true` if `conn` was a member.
    pub fn leave(&mut self, conn: ConnId, match_id: &str) -> bool {
        let Some(members) = self.rooms.get_mut(match_id) else {
            return false;
        };

        let removed = members.remove(&conn);

        if members.is_empty() {
            log::debug!("Room '{match_id}' is empty, removing");
            self.rooms.remove(match_id);
        }

        removed
    }

    /// Removes `conn` from each of the given rooms.
    pub fn leave_all<'a>(&mut self, conn: ConnId, match_ids: impl IntoIterator<Item = &'a MatchId>) {
        for match_id in match_ids {
            self.leave(conn, match_id);
        }
    }

    pub fn members(&self, match_id: &str) -> impl Iterator<Item = ConnId> + '_ {
        self.rooms
            .get(match_id)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }

    #[must_use]
    pub fn contains(&self, conn: ConnId, match_id: &str) -> bool {
        self.rooms
            .get(match_id)
            .is_some_and(|members| members.contains(&conn))
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
