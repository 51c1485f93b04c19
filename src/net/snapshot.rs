//! Versioned state snapshots.
//!
//! A snapshot is a cache of the state after a given log version. The hash
//! lets a replay prove it rebuilt the same state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::game_state::GameState;
use crate::ids::{MatchId, Version};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub match_id: MatchId,
    pub version: Version,
    pub state: GameState,
    pub state_hash: String,
}

impl Snapshot {
    pub fn capture(
        match_id: MatchId,
        version: Version,
        state: GameState,
    ) -> Result<Snapshot, serde_json::Error> {
        let state_hash = state_hash(&state)?;
        Ok(Snapshot {
            match_id,
            version,
            state,
            state_hash,
        })
    }

    /// Recomputes the hash of the carried state.
    pub fn verify(&self) -> bool {
        state_hash(&self.state).is_ok_and(|hash| hash == self.state_hash)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Snapshot, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Lowercase hex SHA-256 of the state's JSON encoding.
pub fn state_hash(state: &GameState) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(state)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::starter::starter_deck;
    use crate::config::DuelConfig;
    use crate::engine::start_duel;
    use crate::ids::Seat;

    fn started() -> GameState {
        let deck = starter_deck();
        let mut state = GameState::new(DuelConfig::default(), 77, Seat::Away, &deck, &deck);
        start_duel(&mut state);
        state
    }

    #[test]
    fn json_round_trip_keeps_hash() {
        let snapshot = Snapshot::capture(MatchId::new("m1"), 1, started()).unwrap();
        assert_eq!(snapshot.state_hash.len(), 64);
        let text = snapshot.to_json().unwrap();
        let back = Snapshot::from_json(&text).unwrap();
        assert_eq!(back, snapshot);
        assert!(back.verify());
    }

    #[test]
    fn tampered_state_fails_verification() {
        let mut snapshot = Snapshot::capture(MatchId::new("m1"), 1, started()).unwrap();
        snapshot.state.players[0].life -= 100;
        assert!(!snapshot.verify());
    }
}
