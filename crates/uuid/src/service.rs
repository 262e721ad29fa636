//! Internal implementation of [`StableId`].

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// VFR's stable file identifier.
///
/// Once constructed the contained UUID always displays in canonical (lowercase, hyphenated)
/// form. Folders never carry one of these; their identity is their path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableId(Uuid);

impl Default for StableId {
    fn default() -> Self {
        Self::new()
    }
}

impl StableId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "identifier must be 36 lowercase hex characters in 8-4-4-4-12 groups, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("{}: {}", input, e)))
    }

    /// Parses any textual UUID form accepted by the `uuid` crate (simple, braced, urn,
    /// uppercase) and normalises it.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not a UUID at all.
    pub fn parse_lenient(input: &str) -> UuidResult<Self> {
        Uuid::parse_str(input.trim())
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("{}: {}", input, e)))
    }

    /// Returns true if `input` is in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 36
            && input.bytes().enumerate().all(|(i, b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
            })
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for StableId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for StableId {
    type Err = UuidError;

    /// Equivalent to [`StableId::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StableId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StableId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StableId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StableId::parse_lenient(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_canonical_and_unique() {
        let a = StableId::new();
        let b = StableId::new();
        assert_ne!(a, b);
        assert!(StableId::is_canonical(&a.to_string()));
        assert_eq!(a.uuid().get_version_num(), 4);
    }

    #[test]
    fn test_parse_accepts_canonical() {
        let id = StableId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        for input in [
            "550E8400-E29B-41D4-A716-446655440000",
            "550e8400e29b41d4a716446655440000",
            "{550e8400-e29b-41d4-a716-446655440000}",
            "550e8400-e29b-41d4-a716-44665544000g",
            "",
        ] {
            assert!(
                matches!(StableId::parse(input), Err(UuidError::InvalidInput(_))),
                "accepted {input}"
            );
        }
    }

    #[test]
    fn test_parse_lenient_normalises() {
        let id = StableId::parse_lenient("{550E8400-E29B-41D4-A716-446655440000}").unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
        assert!(StableId::parse_lenient("not-an-id").is_err());
    }

    #[test]
    fn test_from_str_matches_parse() {
        let id: StableId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(
            id,
            StableId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap()
        );
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = StableId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");

        let upper: StableId =
            serde_json::from_str("\"550E8400-E29B-41D4-A716-446655440000\"").unwrap();
        assert_eq!(upper, id);
    }
}
