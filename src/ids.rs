use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Log position of a match. Version 0 means "nothing appended yet".
pub type Version = u64;

/// One of the two fixed sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    Host,
    Away,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::Host, Seat::Away];

    pub fn other(self) -> Seat {
        match self {
            Seat::Host => Seat::Away,
            Seat::Away => Seat::Host,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::Host => 0,
            Seat::Away => 1,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::Host => f.write_str("host"),
            Seat::Away => f.write_str("away"),
        }
    }
}

/// Printed-card identity, shared by every copy of a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionId(pub String);

/// Per-copy identity. Opaque to clients; stable for the whole match.
///
/// Minted ids order by serial, so `c2` sorts before `c10`. Anything else
/// sorts after them, by string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

/// Authenticated caller identity as handed to the orchestrator by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerIdentity(pub String);

impl DefinitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl InstanceId {
    /// Mint the id for the `serial`-th physical card of a match. The id says
    /// nothing about the printed card.
    pub fn mint(serial: u32) -> Self {
        Self(format!("c{}", serial))
    }

    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The serial a minted id was made from.
    pub fn serial(&self) -> Option<u32> {
        let digits = self.0.strip_prefix('c')?;
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        if !canonical {
            return None;
        }
        digits.parse().ok()
    }
}

impl Ord for InstanceId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.serial(), other.serial()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for InstanceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PlayerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_other_round_trips() {
        assert_eq!(Seat::Host.other(), Seat::Away);
        assert_eq!(Seat::Away.other().other(), Seat::Away);
        assert_eq!(Seat::Host.index(), 0);
        assert_eq!(Seat::Away.index(), 1);
    }

    #[test]
    fn minted_instances_differ_per_serial() {
        let a = InstanceId::mint(1);
        let b = InstanceId::mint(2);
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "c1");
    }

    #[test]
    fn minted_instances_sort_by_serial() {
        let mut ids = vec![
            InstanceId::mint(10),
            InstanceId::from_raw("hall-monitor"),
            InstanceId::mint(2),
            InstanceId::mint(1),
        ];
        ids.sort();
        let order: Vec<&str> = ids.iter().map(InstanceId::as_str).collect();
        assert_eq!(order, vec!["c1", "c2", "c10", "hall-monitor"]);
        assert_eq!(InstanceId::mint(7).serial(), Some(7));
        assert_eq!(InstanceId::from_raw("c07").serial(), None);
        assert_eq!(InstanceId::from_raw("c+7").serial(), None);
        assert_eq!(InstanceId::from_raw("c"), InstanceId::from_raw("c"));
    }

    #[test]
    fn seat_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Seat::Away).unwrap(), "\"away\"");
        let seat: Seat = serde_json::from_str("\"host\"").unwrap();
        assert_eq!(seat, Seat::Host);
    }
}
