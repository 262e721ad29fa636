//! Validated text types shared across the VFR workspace.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input was empty
    #[error("Text cannot be empty")]
    Empty,

    /// The input contained a path separator or NUL character
    #[error("Name cannot contain a path separator: '{0}'")]
    Separator(String),

    /// The input was `.` or `..`
    #[error("Name is reserved: '{0}'")]
    Reserved(String),
}

/// A single path component naming a file, folder or repository.
///
/// The input is taken verbatim (no trimming) so that a name maps one-to-one onto a physical
/// directory entry. A valid name:
///
/// - is not empty
/// - contains neither `/`, the host path separator, nor NUL
/// - is not `.` or `..`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryName(String);

impl EntryName {
    /// Validates `input` as a single path component.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`], [`TextError::Separator`] or [`TextError::Reserved`].
    pub fn new(input: impl Into<String>) -> Result<Self, TextError> {
        let input = input.into();
        if input.is_empty() {
            return Err(TextError::Empty);
        }
        if input
            .chars()
            .any(|c| c == '/' || c == std::path::MAIN_SEPARATOR || c == '\0')
        {
            return Err(TextError::Separator(input));
        }
        if input == "." || input == ".." {
            return Err(TextError::Reserved(input));
        }
        Ok(Self(input))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EntryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for EntryName {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryName::new(s)
    }
}

impl serde::Serialize for EntryName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EntryName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntryName::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_accepts_plain_names() {
        for name in ["readme.txt", " spaced ", ".dotfile", "a-1.tar.gz"] {
            let parsed = EntryName::new(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_entry_name_rejects_empty() {
        assert_eq!(EntryName::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_entry_name_rejects_separators() {
        assert!(matches!(
            EntryName::new("a/b"),
            Err(TextError::Separator(_))
        ));
        assert!(matches!(
            EntryName::new("/"),
            Err(TextError::Separator(_))
        ));
        assert!(matches!(
            EntryName::new("nul\0byte"),
            Err(TextError::Separator(_))
        ));
    }

    #[test]
    fn test_entry_name_rejects_dot_components() {
        assert!(matches!(EntryName::new("."), Err(TextError::Reserved(_))));
        assert!(matches!(EntryName::new(".."), Err(TextError::Reserved(_))));
    }

    #[test]
    fn test_entry_name_serde() {
        let name: EntryName = serde_json::from_str("\"report.pdf\"").unwrap();
        assert_eq!(name.as_str(), "report.pdf");
        assert!(serde_json::from_str::<EntryName>("\"x/y\"").is_err());
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"report.pdf\"");
    }
}
