//! Source identity
//!
//! A source is named by its module (or submodule) name plus an optional
//! revision date. The pair is the whole identity: a source without a revision
//! is a distinct source, not a wildcard for "any revision".
//!
//! Canonical file names follow `<name>[@<revision>].yang`.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ReactorError, Result};

/// File extension of sources in the textual syntax
pub const YANG_FILE_EXTENSION: &str = "yang";

const REVISION_FORMAT: &str = "%Y-%m-%d";

/// A module revision (`YYYY-MM-DD`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(NaiveDate);

impl Revision {
    /// Parse a revision, accepting only the zero-padded `YYYY-MM-DD` form
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        let shaped = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shaped {
            return Err(ReactorError::DateFormat {
                revision: text.to_string(),
            });
        }

        NaiveDate::parse_from_str(text, REVISION_FORMAT)
            .map(Revision)
            .map_err(|_| ReactorError::DateFormat {
                revision: text.to_string(),
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for Revision {
    fn from(date: NaiveDate) -> Self {
        Revision(date)
    }
}

impl FromStr for Revision {
    type Err = ReactorError;

    fn from_str(s: &str) -> Result<Self> {
        Revision::parse(s)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(REVISION_FORMAT))
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Revision::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Name and optional revision of a module or submodule source.
///
/// Ordering is by name, then by revision with an absent revision sorting
/// before every present one. The greatest identifier for a name is therefore
/// the "latest" source of that name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceIdentifier {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<Revision>,
}

impl SourceIdentifier {
    pub fn new(name: impl Into<String>, revision: Option<Revision>) -> Self {
        Self {
            name: name.into(),
            revision,
        }
    }

    /// Identifier without a revision
    pub fn unrevisioned(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    /// Identifier from a name and a textual revision
    pub fn with_revision(name: impl Into<String>, revision: &str) -> Result<Self> {
        Ok(Self::new(name, Some(Revision::parse(revision)?)))
    }

    /// Parse a canonical `<name>[@<revision>].yang` file name
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        Self::from_file_name_with_extension(file_name, YANG_FILE_EXTENSION)
    }

    /// Parse `<name>[@<revision>].<extension>`
    pub fn from_file_name_with_extension(file_name: &str, extension: &str) -> Result<Self> {
        let (name, revision) = split_file_name(file_name, extension)?;
        let revision = revision.map(Revision::parse).transpose()?;
        Ok(Self::new(name, revision))
    }

    /// Like [`Self::from_file_name`], but a malformed revision segment is dropped
    /// instead of rejected
    pub fn from_file_name_lenient(file_name: &str) -> Result<Self> {
        Self::from_file_name_lenient_with_extension(file_name, YANG_FILE_EXTENSION)
    }

    pub fn from_file_name_lenient_with_extension(file_name: &str, extension: &str) -> Result<Self> {
        let (name, revision) = split_file_name(file_name, extension)?;
        Ok(Self::new(
            name,
            revision.and_then(|r| Revision::parse(r).ok()),
        ))
    }

    /// Canonical file name for this identifier
    pub fn to_file_name(&self) -> String {
        match &self.revision {
            Some(rev) => format!("{}@{}.{}", self.name, rev, YANG_FILE_EXTENSION),
            None => format!("{}.{}", self.name, YANG_FILE_EXTENSION),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}@{}", self.name, rev),
            None => write!(f, "{}", self.name),
        }
    }
}

fn split_file_name<'a>(file_name: &'a str, extension: &str) -> Result<(&'a str, Option<&'a str>)> {
    let stem = file_name
        .strip_suffix(extension)
        .and_then(|s| s.strip_suffix('.'))
        .ok_or_else(|| {
            ReactorError::Format(format!(
                "file name '{}' does not end with .{}",
                file_name, extension
            ))
        })?;

    let (name, revision) = match stem.split_once('@') {
        Some((name, revision)) => (name, Some(revision)),
        None => (stem, None),
    };
    if name.is_empty() {
        return Err(ReactorError::Format(format!(
            "file name '{}' has an empty module name",
            file_name
        )));
    }
    Ok((name, revision))
}
