//! Cardinality ranges: `<min>..<max>` where `max` may be `*`, or a bare
//! `<n>` meaning exactly `n`.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// An inclusive occurrence range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    pub min: u64,
    /// `None` means unbounded (`*`).
    pub max: Option<u64>,
}

impl Cardinality {
    /// Whether an attribute with this cardinality must be present.
    pub fn is_required(&self) -> bool {
        self.min >= 1
    }

    /// Whether `count` occurrences fall within the range.
    pub fn contains(&self, count: u64) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

impl FromStr for Cardinality {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoreError::MalformedCardinality(s.to_string());

        let s = s.trim();
        let Some((min, max)) = s.split_once("..") else {
            let n = parse_bound(s).ok_or_else(malformed)?;
            return Ok(Self { min: n, max: Some(n) });
        };
        let min = parse_bound(min).ok_or_else(malformed)?;
        let max = match max {
            "*" => None,
            other => Some(parse_bound(other).ok_or_else(malformed)?),
        };

        if let Some(max) = max {
            if min > max {
                return Err(malformed());
            }
        }
        Ok(Self { min, max })
    }
}

/// Digits only: no sign, no whitespace.
fn parse_bound(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!("1..1".parse::<Cardinality>().unwrap(), Cardinality { min: 1, max: Some(1) });
        assert_eq!("0..*".parse::<Cardinality>().unwrap(), Cardinality { min: 0, max: None });
        assert_eq!("2..10".parse::<Cardinality>().unwrap().to_string(), "2..10");
        assert_eq!("1".parse::<Cardinality>().unwrap(), Cardinality { min: 1, max: Some(1) });
        assert_eq!(" 0 ".parse::<Cardinality>().unwrap().to_string(), "0..0");
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["", "*", "+1", "1-2", "a..b", "-1..2", "3..1", "*..2", "1..", "..1", "1...2"] {
            assert!(bad.parse::<Cardinality>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_required_and_contains() {
        let optional: Cardinality = "0..1".parse().unwrap();
        assert!(!optional.is_required());
        assert!(optional.contains(0));
        assert!(!optional.contains(2));

        let many: Cardinality = "1..*".parse().unwrap();
        assert!(many.is_required());
        assert!(many.contains(1000));
        assert!(!many.contains(0));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_display_parses_back(min in 0u64..1000, extra in prop::option::of(0u64..1000)) {
                let range = Cardinality { min, max: extra.map(|e| min + e) };
                prop_assert_eq!(range.to_string().parse::<Cardinality>().unwrap(), range);
            }

            #[test]
            fn prop_contains_bounds(min in 0u64..50, extra in 0u64..50, count in 0u64..200) {
                let range = Cardinality { min, max: Some(min + extra) };
                prop_assert_eq!(range.contains(count), count >= min && count <= min + extra);
            }
        }
    }
}
