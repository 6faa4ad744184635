//! Room naming and admission policy.
//!
//! A room is the routing channel shared by the two participants of a
//! conversation. Clients connect with a [`RoomName`] token taken verbatim
//! from the connection path; the group layer keys membership by the derived
//! [`RoomKey`]. Both participants must resolve to the same name, which
//! [`canonical_room_name`] guarantees by ordering the two user ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Prefix applied to a room name to form its channel key.
const ROOM_KEY_PREFIX: &str = "chat_";

/// The opaque room token supplied at connection time (e.g. `"1_2"`).
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Wrap a room token as supplied by the client.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a canonical `"{low}_{high}"` name back into its two participants.
    ///
    /// Returns `None` for names that are not of that form.
    pub fn participants(&self) -> Option<(UserId, UserId)> {
        let (low, high) = self.0.split_once('_')?;
        let low: UserId = low.parse().ok()?;
        let high: UserId = high.parse().ok()?;
        if canonical_room_name(low, high) == *self {
            Some((low, high))
        } else {
            None
        }
    }

    /// Whether `user` is one of the two canonical participants.
    pub fn includes(&self, user: UserId) -> bool {
        self.participants()
            .is_some_and(|(a, b)| a == user || b == user)
    }

    /// The other participant, when `user` is one of the two.
    pub fn peer_of(&self, user: UserId) -> Option<UserId> {
        match self.participants()? {
            (a, b) if a == user => Some(b),
            (a, b) if b == user => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal channel key used by the group layer.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    /// Derive the channel key for a room name (`"chat_" + name`).
    pub fn for_room(name: &RoomName) -> Self {
        Self(format!("{ROOM_KEY_PREFIX}{}", name.as_str()))
    }

    /// Borrow the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical room name for a pair of users, independent of argument order.
pub fn canonical_room_name(a: UserId, b: UserId) -> RoomName {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    RoomName(format!("{low}_{high}"))
}

/// Who may open a chat connection into a room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionPolicy {
    /// Any authenticated principal may join any room.
    #[default]
    Authenticated,
    /// The room must be a canonical pair that includes the principal.
    Participant,
    /// As `Participant`, and the two participants must be friends.
    Friends,
}

impl AdmissionPolicy {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::Participant => "participant",
            Self::Friends => "friends",
        }
    }
}

impl FromStr for AdmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authenticated" => Ok(Self::Authenticated),
            "participant" => Ok(Self::Participant),
            "friends" => Ok(Self::Friends),
            other => Err(format!("unknown admission policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_name_sorts_ids() {
        let name = canonical_room_name(UserId::new(2), UserId::new(1));
        assert_eq!(name.as_str(), "1_2");
    }

    #[test]
    fn canonical_name_sorts_numerically_not_lexically() {
        let name = canonical_room_name(UserId::new(10), UserId::new(9));
        assert_eq!(name.as_str(), "9_10");
    }

    #[test]
    fn room_key_prefixes_name() {
        let key = RoomKey::for_room(&RoomName::new("1_2"));
        assert_eq!(key.as_str(), "chat_1_2");
    }

    #[test]
    fn room_key_uses_token_verbatim() {
        let key = RoomKey::for_room(&RoomName::new("lobby"));
        assert_eq!(key.as_str(), "chat_lobby");
    }

    #[test]
    fn participants_of_canonical_name() {
        let name = RoomName::new("3_7");
        assert_eq!(name.participants(), Some((UserId::new(3), UserId::new(7))));
        assert!(name.includes(UserId::new(7)));
        assert!(!name.includes(UserId::new(5)));
        assert_eq!(name.peer_of(UserId::new(3)), Some(UserId::new(7)));
        assert_eq!(name.peer_of(UserId::new(4)), None);
    }

    #[test]
    fn non_canonical_names_have_no_participants() {
        assert_eq!(RoomName::new("7_3").participants(), None);
        assert_eq!(RoomName::new("lobby").participants(), None);
        assert_eq!(RoomName::new("1_x").participants(), None);
        assert_eq!(RoomName::new("01_2").participants(), None);
    }

    #[test]
    fn admission_policy_parses() {
        assert_eq!("friends".parse::<AdmissionPolicy>(), Ok(AdmissionPolicy::Friends));
        assert_eq!(" Participant ".parse::<AdmissionPolicy>(), Ok(AdmissionPolicy::Participant));
        assert!("nobody".parse::<AdmissionPolicy>().is_err());
        assert_eq!(AdmissionPolicy::default(), AdmissionPolicy::Authenticated);
    }

    #[test]
    fn admission_policy_serde_lowercase() {
        let json = serde_json::to_string(&AdmissionPolicy::Participant).unwrap();
        assert_eq!(json, "\"participant\"");
    }

    proptest! {
        #[test]
        fn canonical_name_is_order_independent(a in any::<i64>(), b in any::<i64>()) {
            let ab = canonical_room_name(UserId::new(a), UserId::new(b));
            let ba = canonical_room_name(UserId::new(b), UserId::new(a));
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn canonical_name_round_trips_for_positive_ids(a in 1..i64::MAX, b in 1..i64::MAX) {
            let name = canonical_room_name(UserId::new(a), UserId::new(b));
            prop_assert!(name.includes(UserId::new(a)));
            prop_assert!(name.includes(UserId::new(b)));
        }
    }
}
