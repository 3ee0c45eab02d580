//! Resolved playback events.

use cadenza_core::{Duration, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An opaque annotation carried from the notation to the voice factory.
///
/// The engine never interprets a tag. Factories that want structure can read
/// `key=value` tags through [`Tag::key_value`] and [`Tag::value_as`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split at the first `=`, trimming whitespace on both sides.
    pub fn key_value(&self) -> Option<(&str, &str)> {
        self.0
            .split_once('=')
            .map(|(key, value)| (key.trim(), value.trim()))
    }

    /// The key of a `key=value` tag, or the whole tag otherwise.
    pub fn key(&self) -> &str {
        self.key_value().map_or(self.0.trim(), |(key, _)| key)
    }

    pub fn value_as<T: FromStr>(&self) -> Option<T> {
        self.key_value().and_then(|(_, value)| value.parse().ok())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Tag {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// A fully resolved note: absolute start, wall-clock length, frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub start: Timestamp,
    pub length: Duration,
    /// Hz.
    pub frequency: f64,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
}

impl Tone {
    pub fn new(start: Timestamp, length: Duration, frequency: f64) -> Self {
        Self {
            start,
            length,
            frequency,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<T: Into<Tag>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn end(&self) -> Timestamp {
        self.start + self.length
    }

    /// Exact match against the raw tag text.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.as_str() == tag)
    }

    /// Parsed value of the first `key=value` tag whose key matches.
    pub fn tag_value<T: FromStr>(&self, key: &str) -> Option<T> {
        self.tags
            .iter()
            .filter(|tag| tag.key() == key)
            .find_map(Tag::value_as)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_key_value() {
        let tag = Tag::new(" gain = 0.5 ");
        assert_eq!(tag.key_value(), Some(("gain", "0.5")));
        assert_eq!(tag.key(), "gain");
        assert_eq!(tag.value_as::<f64>(), Some(0.5));
        assert_eq!(tag.value_as::<u32>(), None);

        let bare = Tag::new("staccato");
        assert_eq!(bare.key_value(), None);
        assert_eq!(bare.key(), "staccato");
        assert_eq!(bare.value_as::<f64>(), None);
    }

    #[test]
    fn test_tag_is_never_evaluated() {
        let tag = Tag::new("gain=1+1");
        assert_eq!(tag.value_as::<f64>(), None);
        assert_eq!(tag.as_str(), "gain=1+1");
    }

    #[test]
    fn test_tone_tags() {
        let tone = Tone::new(Timestamp::from_seconds(1.0), Duration::from_seconds(0.5), 440.0)
            .with_tags(["wave=square", "accent"]);
        assert!(tone.has_tag("accent"));
        assert!(!tone.has_tag("wave"));
        assert_eq!(tone.tag_value::<String>("wave").as_deref(), Some("square"));
        assert_eq!(tone.tag_value::<f64>("gain"), None);
        assert_eq!(tone.end().seconds(), 1.5);
    }
}
