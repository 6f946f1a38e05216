//! Stable identifiers for bar items and rotators.
//!
//! Rotators refer to their owning item through an explicit [`ItemId`]
//! resolved via the bar's item table, never through a raw pointer, so an
//! animation tick can always be mapped back to the item that owns it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a bar item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a rotator registered with the rotator manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RotatorId(Uuid);

impl RotatorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RotatorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RotatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ItemId::new(), ItemId::new());
        assert_ne!(RotatorId::new(), RotatorId::new());
    }

    #[test]
    fn test_id_serialization_round_trip() {
        let id = ItemId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
