use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::parse_util;

/// Rules of Conway's Game of Life.
pub const B3S23: RuleSet = RuleSet::from_masks(0b1000, 0b1100);

/// Outer-totalistic Life-like rules over the Moore neighborhood.
///
/// # Representation
/// Births and survivals are each a 9 bit mask, where bit `i` is on if a cell with `i` live
/// neighbors is born (resp. survives).
/// ```notrust
/// b3s23:                births 0_0000_1000   survivals 0_0000_1100
/// b012345678s012345678: births 1_1111_1111   survivals 1_1111_1111
/// ```
///
/// See: https://conwaylife.com/wiki/Rulestring
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSet {
    births: u16,
    survivals: u16,
}

impl Default for RuleSet {
    fn default() -> Self {
        B3S23
    }
}

impl RuleSet {
    /// Create a new `RuleSet` for the given births and survivals masks. Any bit past the 8th is
    /// ignored.
    ///
    /// Births out of nothing (bit 0 of `b`) would fill the whole unbounded plane, so they are
    /// rejected.
    pub fn new(b: u16, s: u16) -> Result<Self, RuleError> {
        let set = Self::from_masks(b, s);

        if set.births & 1 == 1 {
            return Err(RuleError::BirthOnZero);
        }

        Ok(set)
    }

    const fn from_masks(b: u16, s: u16) -> Self {
        Self {
            births: b & 0x1FF,
            survivals: s & 0x1FF,
        }
    }

    pub fn births(&self) -> u16 {
        self.births
    }

    pub fn survivals(&self) -> u16 {
        self.survivals
    }

    /// Whether a cell is alive in the next generation, given whether it is alive now and how
    /// many of its 8 neighbors are.
    pub fn next_state(&self, alive: bool, neighbors: u8) -> bool {
        let mask = if alive { self.survivals } else { self.births };

        neighbors <= 8 && mask & (1 << neighbors) != 0
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleSet({self})")
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = |mask: u16| -> String {
            (0..=8)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| char::from(b'0' + i as u8))
                .collect()
        };

        write!(f, "B{}/S{}", digits(self.births), digits(self.survivals))
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Expected a rule, found end of input")]
    Empty,

    #[error("Expected '{exp}' in rule, found '{got}'")]
    MissingPart { exp: char, got: String },

    #[error("Neighbor count must be a digit in 0..=8, found '{got}'")]
    InvalidCount { got: char },

    #[error("Rules with birth on 0 neighbors are not supported on an unbounded grid")]
    BirthOnZero,
}

/// Parse rules that look like `B3/S23` or `b3s23`. Stops at the first whitespace byte.
pub(crate) fn parse_rule(bytes: &[u8]) -> Result<(RuleSet, &[u8]), RuleError> {
    let (Some(rule), rest) = parse_util::take_until_ws(bytes) else {
        return Err(RuleError::Empty);
    };

    let Some((&(b'b' | b'B'), rule)) = rule.split_first() else {
        return Err(RuleError::MissingPart {
            exp: 'B',
            got: String::from_utf8_lossy(rule).to_string(),
        });
    };

    let Some(split) = rule.iter().position(|&b| matches!(b, b's' | b'S')) else {
        return Err(RuleError::MissingPart {
            exp: 'S',
            got: String::from_utf8_lossy(rule).to_string(),
        });
    };

    let b = rule[..split].strip_suffix(b"/").unwrap_or(&rule[..split]);
    let s = &rule[split + 1..];

    let set = RuleSet::new(bytes_to_mask(b)?, bytes_to_mask(s)?)?;

    Ok((set, rest))
}

/// Parse rules that look like `23/3`, survivals first. These show up in RLE `#r` comment lines.
pub(crate) fn parse_nameless_rule(bytes: &[u8]) -> Result<(RuleSet, &[u8]), RuleError> {
    let (Some(rule), rest) = parse_util::take_until_ws(bytes) else {
        return Err(RuleError::Empty);
    };

    let Some(split) = rule.iter().position(|&b| b == b'/') else {
        return Err(RuleError::MissingPart {
            exp: '/',
            got: String::from_utf8_lossy(rule).to_string(),
        });
    };

    let s = bytes_to_mask(&rule[..split])?;
    let b = bytes_to_mask(&rule[split + 1..])?;

    Ok((RuleSet::new(b, s)?, rest))
}

/// Convert the human readable birth/survival digits to a packed bit representation
fn bytes_to_mask(bytes: &[u8]) -> Result<u16, RuleError> {
    let mut n = 0;

    for &b in bytes {
        if !(b'0'..=b'8').contains(&b) {
            return Err(RuleError::InvalidCount { got: b as char });
        }

        n |= 1 << (b - b'0');
    }

    Ok(n)
}

impl FromStr for RuleSet {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();

        let (set, _) = match bytes.first() {
            Some(b'b' | b'B') => parse_rule(bytes)?,
            _ => parse_nameless_rule(bytes)?,
        };

        Ok(set)
    }
}
