use std::fmt;

use indexmap::IndexMap;
use serde_json::Number;
use serde_json::Value;

/// Substrings that carry meaning in the locator grammar and therefore must
/// not appear inside a tag, adt, key or value.
const RESERVED: [&str; 3] = ["@", "!", "___"];

/// Error type for locator construction and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    /// A grammar-reserved substring appeared in a tag, adt, key or value.
    /// Reserved characters are rejected, never escaped.
    #[error("reserved character in locator component: {0}")]
    ReservedCharacter(String),
    /// Input rejected by the locator grammar. The message echoes the
    /// offending fragment.
    #[error("{0}")]
    MalformedLocator(String),
}

/// The value half of a unique-key pair.
///
/// Values that print as canonical numbers are stored as numbers, mirroring
/// how locator strings decode. `"2"` becomes a number everywhere; `"007"`
/// and `"1.0.0"` stay text because their numeric forms print differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    Text(String),
    Number(Number),
}

impl KeyValue {
    /// Decodes a raw value chunk the way locator strings do.
    pub fn decode(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            if n.to_string() == raw {
                return KeyValue::Number(Number::from(n));
            }
        }
        if let Ok(f) = raw.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                if n.to_string() == raw {
                    return KeyValue::Number(n);
                }
            }
        }
        KeyValue::Text(raw.to_string())
    }

    /// Lifts a scalar JSON value into a key value. Containers, booleans and
    /// null have no locator form and return None.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(KeyValue::decode(s)),
            Value::Number(n) => Some(KeyValue::Number(n.clone())),
            _ => None,
        }
    }

    /// The JSON form used when a key value is embedded in a stub.
    pub fn to_json(&self) -> Value {
        match self {
            KeyValue::Text(s) => Value::String(s.clone()),
            KeyValue::Number(n) => Value::Number(n.clone()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Text(s) => f.write_str(s),
            KeyValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(raw: &str) -> Self {
        KeyValue::decode(raw)
    }
}

impl From<String> for KeyValue {
    fn from(raw: String) -> Self {
        KeyValue::decode(&raw)
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        KeyValue::Number(Number::from(n))
    }
}

impl From<u64> for KeyValue {
    fn from(n: u64) -> Self {
        KeyValue::Number(Number::from(n))
    }
}

impl From<i32> for KeyValue {
    fn from(n: i32) -> Self {
        KeyValue::Number(Number::from(n))
    }
}

impl From<Number> for KeyValue {
    fn from(n: Number) -> Self {
        KeyValue::Number(n)
    }
}

/// One element of a locator path: a variant tag, an optional enclosing
/// sum-type name, and the unique key/value set that pins down the instance.
///
/// Segments are validated at construction and immutable afterwards.
/// Equality is structural: tag, adt and key set must match, key order is
/// irrelevant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    tag: String,
    adt: Option<String>,
    unique_keys: IndexMap<String, KeyValue>,
}

impl Segment {
    /// Creates a segment with a bare tag and no keys.
    pub fn new(tag: impl Into<String>) -> Result<Self, LocatorError> {
        let tag = tag.into();
        check_component(&tag)?;
        Ok(Segment {
            tag,
            adt: None,
            unique_keys: IndexMap::new(),
        })
    }

    /// Creates a segment whose tag shares an address space with sibling
    /// variants of the named sum type.
    pub fn with_adt(adt: impl Into<String>, tag: impl Into<String>) -> Result<Self, LocatorError> {
        let adt = adt.into();
        check_component(&adt)?;
        let mut segment = Segment::new(tag)?;
        segment.adt = Some(adt);
        Ok(segment)
    }

    /// Adds unique keys. Text values are normalized like decoded locator
    /// chunks, so the string form round-trips.
    pub fn keys<K, V>(
        mut self,
        keys: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, LocatorError>
    where
        K: Into<String>,
        V: Into<KeyValue>,
    {
        for (key, value) in keys {
            let key = key.into();
            let value = value.into();
            check_component(&key)?;
            if let KeyValue::Text(text) = &value {
                check_component(text)?;
            }
            self.unique_keys.insert(key, value);
        }
        Ok(self)
    }

    /// Parses one `[adt@]tag[!key@value]*` chunk.
    pub fn parse(chunk: &str) -> Result<Self, LocatorError> {
        let mut parts = chunk.split('!');
        let head = parts.next().unwrap_or_default();
        if head.is_empty() {
            return Err(LocatorError::MalformedLocator(format!(
                "Invalid segment: {chunk}"
            )));
        }

        let mut at = head.split('@');
        let mut segment = match (at.next(), at.next(), at.next()) {
            (Some(tag), None, _) => Segment::new(tag)?,
            (Some(adt), Some(tag), None) if !adt.is_empty() && !tag.is_empty() => {
                Segment::with_adt(adt, tag)?
            }
            _ => {
                return Err(LocatorError::MalformedLocator(format!(
                    "Invalid segment: {chunk}"
                )));
            }
        };

        for property in parts {
            let mut at = property.split('@');
            match (at.next(), at.next(), at.next()) {
                (Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() => {
                    segment
                        .unique_keys
                        .insert(key.to_string(), KeyValue::decode(value));
                }
                _ => {
                    return Err(LocatorError::MalformedLocator(format!(
                        "Invalid property: {property}"
                    )));
                }
            }
        }
        Ok(segment)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn adt(&self) -> Option<&str> {
        self.adt.as_deref()
    }

    pub fn unique_keys(&self) -> &IndexMap<String, KeyValue> {
        &self.unique_keys
    }
}

impl fmt::Display for Segment {
    /// Canonical string form: `[adt@]tag[!key@value]*` with keys sorted
    /// lexicographically regardless of insertion order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(adt) = &self.adt {
            write!(f, "{adt}@")?;
        }
        f.write_str(&self.tag)?;
        let mut sorted: Vec<_> = self.unique_keys.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in sorted {
            write!(f, "!{key}@{value}")?;
        }
        Ok(())
    }
}

fn check_component(text: &str) -> Result<(), LocatorError> {
    if RESERVED.iter().any(|reserved| text.contains(reserved)) {
        return Err(LocatorError::ReservedCharacter(text.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_tag_display() {
        let segment = Segment::new("Post").unwrap();
        assert_eq!(segment.to_string(), "Post");
    }

    #[test]
    fn adt_qualified_display() {
        let segment = Segment::with_adt("Schema", "SchemaVersioned")
            .unwrap()
            .keys([("version", "1.0.0")])
            .unwrap();
        assert_eq!(segment.to_string(), "Schema@SchemaVersioned!version@1.0.0");
    }

    #[test]
    fn keys_sorted_lexicographically() {
        let segment = Segment::new("Test")
            .unwrap()
            .keys([("b", "2"), ("a", "1")])
            .unwrap();
        assert_eq!(segment.to_string(), "Test!a@1!b@2");
    }

    #[test]
    fn key_order_irrelevant_for_equality() {
        let forward = Segment::new("Test")
            .unwrap()
            .keys([("a", "1"), ("b", "2")])
            .unwrap();
        let backward = Segment::new("Test")
            .unwrap()
            .keys([("b", "2"), ("a", "1")])
            .unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn reserved_in_tag_rejected() {
        assert!(matches!(
            Segment::new("Tag@Bad"),
            Err(LocatorError::ReservedCharacter(_))
        ));
        assert!(matches!(
            Segment::new("Tag!Bad"),
            Err(LocatorError::ReservedCharacter(_))
        ));
        assert!(matches!(
            Segment::new("Tag___Bad"),
            Err(LocatorError::ReservedCharacter(_))
        ));
    }

    #[test]
    fn reserved_in_adt_key_value_rejected() {
        assert!(Segment::with_adt("A@B", "Tag").is_err());
        assert!(
            Segment::new("Tag")
                .unwrap()
                .keys([("k!", "v")])
                .is_err()
        );
        assert!(
            Segment::new("Tag")
                .unwrap()
                .keys([("k", "v___w")])
                .is_err()
        );
    }

    #[test]
    fn parse_properties() {
        let segment = Segment::parse("Post!slug@intro!rev@3").unwrap();
        assert_eq!(segment.tag(), "Post");
        assert_eq!(
            segment.unique_keys().get("rev"),
            Some(&KeyValue::Number(Number::from(3)))
        );
        assert_eq!(
            segment.unique_keys().get("slug"),
            Some(&KeyValue::Text("intro".into()))
        );
    }

    #[test]
    fn parse_property_missing_value() {
        let err = Segment::parse("A!k@").unwrap_err();
        assert_eq!(err.to_string(), "Invalid property: k@");
    }

    #[test]
    fn parse_property_missing_key() {
        let err = Segment::parse("A!@v").unwrap_err();
        assert_eq!(err.to_string(), "Invalid property: @v");
    }

    #[test]
    fn parse_property_extra_separator() {
        let err = Segment::parse("A!k@v@w").unwrap_err();
        assert_eq!(err.to_string(), "Invalid property: k@v@w");
    }

    #[test]
    fn numeric_looking_values_decode_as_numbers() {
        assert_eq!(KeyValue::decode("42"), KeyValue::Number(Number::from(42)));
        assert_eq!(KeyValue::decode("-7"), KeyValue::Number(Number::from(-7)));
        assert_eq!(KeyValue::decode("1.0.0"), KeyValue::Text("1.0.0".into()));
        assert_eq!(KeyValue::decode("007"), KeyValue::Text("007".into()));
    }

    #[test]
    fn text_and_number_keys_compare_equal_after_normalization() {
        let text = Segment::new("T").unwrap().keys([("n", "5")]).unwrap();
        let number = Segment::new("T").unwrap().keys([("n", 5i64)]).unwrap();
        assert_eq!(text, number);
    }
}
