//! Event domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Set of NVML event type bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTypes(u64);

impl EventTypes {
    pub const NONE: EventTypes = EventTypes(0);
    pub const SINGLE_BIT_ECC_ERROR: EventTypes = EventTypes(0x0000_0000_0000_0001);
    pub const DOUBLE_BIT_ECC_ERROR: EventTypes = EventTypes(0x0000_0000_0000_0002);
    pub const PSTATE: EventTypes = EventTypes(0x0000_0000_0000_0004);
    pub const XID_CRITICAL_ERROR: EventTypes = EventTypes(0x0000_0000_0000_0008);
    pub const CLOCK: EventTypes = EventTypes(0x0000_0000_0000_0010);
    pub const ALL: EventTypes = EventTypes(0x1f);

    const NAMED: [(EventTypes, &'static str); 5] = [
        (Self::SINGLE_BIT_ECC_ERROR, "single-bit-ecc"),
        (Self::DOUBLE_BIT_ECC_ERROR, "double-bit-ecc"),
        (Self::PSTATE, "pstate"),
        (Self::XID_CRITICAL_ERROR, "xid"),
        (Self::CLOCK, "clock"),
    ];

    /// Wrap a raw bitmask; unknown bits are kept
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw bitmask
    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check whether every bit in `other` is set
    pub fn contains(&self, other: EventTypes) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bits set in both
    pub fn intersection(&self, other: EventTypes) -> EventTypes {
        EventTypes(self.0 & other.0)
    }

    /// The individual known event types that are set
    pub fn iter(&self) -> impl Iterator<Item = EventTypes> + '_ {
        Self::NAMED
            .iter()
            .filter(move |(bit, _)| self.contains(*bit))
            .map(|(bit, _)| *bit)
    }

    /// Names of the known event types that are set
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::ops::BitOr for EventTypes {
    type Output = EventTypes;

    fn bitor(self, rhs: EventTypes) -> EventTypes {
        EventTypes(self.0 | rhs.0)
    }
}

impl fmt::Display for EventTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.names().join("|"))
    }
}

/// An event delivered by an event set wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Index of the device the event came from, when NVML can tell
    pub device_index: Option<u32>,
    /// Which event(s) fired
    pub event_types: EventTypes,
    /// Event payload, e.g. the Xid code for Xid errors
    pub data: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_each_bit() {
        let types = EventTypes::from_bits(0x4 | 0x8);
        assert!(types.contains(EventTypes::PSTATE));
        assert!(types.contains(EventTypes::XID_CRITICAL_ERROR));
        assert!(!types.contains(EventTypes::CLOCK));
        assert_eq!(types.names(), vec!["pstate", "xid"]);
        assert_eq!(types.iter().count(), 2);
    }

    #[test]
    fn test_all_and_none() {
        assert_eq!(EventTypes::ALL.names().len(), 5);
        assert_eq!(EventTypes::NONE.to_string(), "none");
        assert!(EventTypes::NONE.iter().next().is_none());
    }

    #[test]
    fn test_display_and_bitor() {
        let types = EventTypes::SINGLE_BIT_ECC_ERROR | EventTypes::CLOCK;
        assert_eq!(types.to_string(), "single-bit-ecc|clock");
        assert_eq!(types.intersection(EventTypes::CLOCK), EventTypes::CLOCK);
    }
}
