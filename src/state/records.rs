use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::models::{MemberId, PlayerProfile};

pub const EVENT_KEY: &str = "event";
pub const ROSTER_KEY: &str = "roster";
pub const PLAYERS_KEY: &str = "players";
pub const STRIKES_KEY: &str = "strikes";
pub const ACTIVITY_KEY: &str = "activity";

/// Event record as stored; `{}` means no active event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Date in the canonical zone, formatted with `EVENT_DATE_FORMAT`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Members registered for the current event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    pub members: BTreeSet<MemberId>,
}

impl Roster {
    /// Returns false if the member was already registered
    pub fn add(&mut self, member: MemberId) -> bool {
        self.members.insert(member)
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.members.contains(&member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

/// Player profiles keyed by Discord ID (as string)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileDirectory {
    pub players: HashMap<String, PlayerProfile>,
}

impl ProfileDirectory {
    pub fn get(&self, member: MemberId) -> Option<&PlayerProfile> {
        self.players.get(&member.to_string())
    }

    pub fn upsert(&mut self, member: MemberId, profile: PlayerProfile) {
        self.players.insert(member.to_string(), profile);
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.players.contains_key(&member.to_string())
    }
}

/// Strike counters keyed by Discord ID (as string)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrikeLedger {
    pub counts: HashMap<String, u32>,
}

impl StrikeLedger {
    pub fn get(&self, member: MemberId) -> u32 {
        self.counts.get(&member.to_string()).copied().unwrap_or(0)
    }

    /// Add `delta`, clamping at zero. Returns (previous, new) totals.
    pub fn apply(&mut self, member: MemberId, delta: i64) -> (u32, u32) {
        let previous = self.get(member);
        let new = i64::from(previous)
            .saturating_add(delta)
            .clamp(0, i64::from(u32::MAX)) as u32;
        self.counts.insert(member.to_string(), new);
        (previous, new)
    }
}

/// Weekly activity message whose reactions mark active members
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
}

impl ActivityMessage {
    pub fn location(&self) -> Option<(u64, u64)> {
        Some((self.channel_id?, self.message_id?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strike_ledger_clamps_at_zero() {
        let mut ledger = StrikeLedger::default();
        let member = MemberId(7);

        assert_eq!(ledger.apply(member, 2), (0, 2));
        assert_eq!(ledger.apply(member, -5), (2, 0));
        assert_eq!(ledger.get(member), 0);
        assert_eq!(ledger.get(MemberId(8)), 0);
    }

    #[test]
    fn test_strike_ledger_extreme_deltas() {
        let mut ledger = StrikeLedger::default();
        let member = MemberId(7);
        ledger.apply(member, 3);

        assert_eq!(ledger.apply(member, i64::MAX), (3, u32::MAX));
        assert_eq!(ledger.apply(member, i64::MAX), (u32::MAX, u32::MAX));
        assert_eq!(ledger.apply(member, i64::MIN), (u32::MAX, 0));
    }

    #[test]
    fn test_roster_is_a_set() {
        let mut roster = Roster::default();
        assert!(roster.add(MemberId(1)));
        assert!(!roster.add(MemberId(1)));
        assert_eq!(roster.len(), 1);
        assert_eq!(serde_json::to_string(&roster).unwrap(), "[1]");
    }

    #[test]
    fn test_empty_event_serializes_as_empty_object() {
        assert_eq!(serde_json::to_string(&StoredEvent::default()).unwrap(), "{}");
    }
}
