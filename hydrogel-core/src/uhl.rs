use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::segment::{LocatorError, Segment};

/// Separator between segments in the string form.
const SEGMENT_SEPARATOR: &str = "___";
/// Extension appended by the file-name form.
const FRAGMENT_EXTENSION: &str = ".json";

/// A Unique Hydratable Locator: an ordered path of segments addressing one
/// fragment. The empty path is the root.
///
/// Equality is structural: same length and pairwise segment equality, with
/// key order irrelevant inside each segment. The string codec is lawful:
/// `Uhl::parse(&u.to_string()) == u` for every constructible `u`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uhl {
    segments: Vec<Segment>,
}

impl Uhl {
    /// The empty locator.
    pub fn root() -> Self {
        Uhl::default()
    }

    /// Builds a locator from segments, in order.
    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Self {
        Uhl {
            segments: segments.into_iter().collect(),
        }
    }

    /// A one-segment locator.
    pub fn single(segment: Segment) -> Self {
        Uhl {
            segments: vec![segment],
        }
    }

    /// This locator extended by one more segment.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Uhl { segments }
    }

    /// Parses the string form. The empty string is the root locator.
    pub fn parse(text: &str) -> Result<Self, LocatorError> {
        if text.is_empty() {
            return Ok(Uhl::root());
        }
        let mut segments = Vec::new();
        for chunk in text.split(SEGMENT_SEPARATOR) {
            if chunk.is_empty() {
                return Err(LocatorError::MalformedLocator(format!(
                    "Invalid segment: {chunk}"
                )));
            }
            segments.push(Segment::parse(chunk)?);
        }
        Ok(Uhl { segments })
    }

    /// The fragment file name: string form plus `.json`.
    pub fn file_name(&self) -> String {
        format!("{self}{FRAGMENT_EXTENSION}")
    }

    /// Parses a fragment file name back into a locator.
    pub fn from_file_name(name: &str) -> Result<Self, LocatorError> {
        let stem = name.strip_suffix(FRAGMENT_EXTENSION).ok_or_else(|| {
            LocatorError::MalformedLocator(format!("Invalid fragment file name: {name}"))
        })?;
        Uhl::parse(stem)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True for the empty locator.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Uhl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(SEGMENT_SEPARATOR)?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Uhl {
    type Err = LocatorError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Uhl::parse(text)
    }
}

impl From<Segment> for Uhl {
    fn from(segment: Segment) -> Self {
        Uhl::single(segment)
    }
}

impl Serialize for Uhl {
    /// Locators serialize as their string form.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uhl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Uhl::parse(&text).map_err(serde::de::Error::custom)
    }
}
