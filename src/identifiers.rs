//! Type-safe identifiers for controller objects.
//!
//! The controller addresses loads, buttons, LEDs, tasks, thermostats
//! and variables by a single numeric object id (VID).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::parser::ParseError;

// ============================================================================
// Vid
// ============================================================================

/// Numeric object identifier used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vid(u32);

impl Vid {
    /// Creates a VID from its numeric value.
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for Vid {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Vid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Vid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| ParseError::invalid_number("vid", s))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vid_display_matches_wire() {
        assert_eq!(Vid::new(219).to_string(), "219");
    }

    #[test]
    fn test_vid_from_str() {
        assert_eq!("1591".parse::<Vid>().ok(), Some(Vid::new(1591)));
        assert!("-3".parse::<Vid>().is_err());
        assert!("abc".parse::<Vid>().is_err());
    }

    #[test]
    fn test_vid_serializes_as_number() {
        let json = serde_json::to_string(&Vid::new(42)).expect("serialize");
        assert_eq!(json, "42");
    }
}
