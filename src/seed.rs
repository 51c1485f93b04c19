//! Deterministic seeding.
//!
//! A match seed is a SHA-256 digest over the participants and their deck
//! lists, so the same pairing with the same decks always replays the same
//! shuffles, first player and random effects. Everything random inside the
//! engine is derived from `(seed, label)` or `(seed, cursor)`; nothing reads
//! thread-local randomness.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::ids::{DefinitionId, MatchId, PlayerIdentity, Seat};

pub const DOMAIN_MATCH_SEED: &[u8] = b"duelist/match_seed/v1";
pub const DOMAIN_SUB_SEED: &[u8] = b"duelist/sub_seed/v1";
pub const DOMAIN_CURSOR: &[u8] = b"duelist/cursor/v1";

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn first_u64(digest: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Seed for a whole match. Deck order is significant.
pub fn derive_match_seed(
    match_id: &MatchId,
    host: &PlayerIdentity,
    away: &PlayerIdentity,
    host_deck: &[DefinitionId],
    away_deck: &[DefinitionId],
) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_MATCH_SEED);
    update_field(&mut hasher, match_id.0.as_bytes());
    update_field(&mut hasher, host.0.as_bytes());
    update_field(&mut hasher, away.0.as_bytes());
    for deck in [host_deck, away_deck] {
        hasher.update((deck.len() as u64).to_le_bytes());
        for card in deck {
            update_field(&mut hasher, card.0.as_bytes());
        }
    }
    first_u64(&hasher.finalize())
}

/// Independent stream for a named purpose ("deck/host", "first_player", ...).
pub fn sub_seed(seed: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_SUB_SEED);
    hasher.update(seed.to_le_bytes());
    update_field(&mut hasher, label.as_bytes());
    first_u64(&hasher.finalize())
}

pub fn first_player(seed: u64) -> Seat {
    if sub_seed(seed, "first_player") % 2 == 0 {
        Seat::Host
    } else {
        Seat::Away
    }
}

/// The `cursor`-th draw of the match's random stream, in `0..bound`.
///
/// Each draw reseeds from `(seed, cursor)`, so a snapshot only needs the
/// cursor to continue the stream exactly.
pub fn random_at(seed: u64, cursor: u64, bound: u64) -> u64 {
    if bound == 0 {
        return 0;
    }
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_CURSOR);
    hasher.update(seed.to_le_bytes());
    hasher.update(cursor.to_le_bytes());
    let mut rng = StdRng::seed_from_u64(first_u64(&hasher.finalize()));
    rng.random_range(0..bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<DefinitionId> {
        names.iter().map(|n| DefinitionId::new(*n)).collect()
    }

    #[test]
    fn match_seed_is_reproducible() {
        let m = MatchId::new("m1");
        let host = PlayerIdentity::new("alice");
        let away = PlayerIdentity::new("bob");
        let a = derive_match_seed(&m, &host, &away, &ids(&["x", "y"]), &ids(&["z"]));
        let b = derive_match_seed(&m, &host, &away, &ids(&["x", "y"]), &ids(&["z"]));
        assert_eq!(a, b);
    }

    #[test]
    fn match_seed_depends_on_every_input() {
        let m = MatchId::new("m1");
        let host = PlayerIdentity::new("alice");
        let away = PlayerIdentity::new("bob");
        let base = derive_match_seed(&m, &host, &away, &ids(&["x", "y"]), &ids(&["z"]));

        assert_ne!(
            base,
            derive_match_seed(&MatchId::new("m2"), &host, &away, &ids(&["x", "y"]), &ids(&["z"]))
        );
        assert_ne!(
            base,
            derive_match_seed(&m, &away, &host, &ids(&["x", "y"]), &ids(&["z"]))
        );
        assert_ne!(
            base,
            derive_match_seed(&m, &host, &away, &ids(&["y", "x"]), &ids(&["z"]))
        );
        // Length prefixes keep field boundaries distinct.
        assert_ne!(
            base,
            derive_match_seed(&m, &host, &away, &ids(&["x"]), &ids(&["y", "z"]))
        );
    }

    #[test]
    fn cursor_stream_is_stable_and_bounded() {
        for cursor in 0..50 {
            let v = random_at(42, cursor, 6);
            assert!(v < 6);
            assert_eq!(v, random_at(42, cursor, 6));
        }
        assert_eq!(random_at(42, 0, 0), 0);
    }

    #[test]
    fn first_player_covers_both_seats() {
        let seats: Vec<Seat> = (0..64).map(first_player).collect();
        assert!(seats.contains(&Seat::Host));
        assert!(seats.contains(&Seat::Away));
    }
}
