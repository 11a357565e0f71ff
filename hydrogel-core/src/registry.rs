use chrono::SecondsFormat;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::schema::{Addressing, HydratableDef, Schema};
use crate::segment::{KeyValue, LocatorError, Segment};

/// Key name used by content-hash addressing.
pub const HASH_KEY: &str = "hash";

/// Error type for registry construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A hydratable without unique keys or singleton status has no valid
    /// address.
    #[error("hydratable tag {0:?} declares neither unique keys nor singleton addressing")]
    Unaddressable(String),
    /// Two hydratable declarations collide on one tag.
    #[error("hydratable tag {0:?} is declared more than once")]
    DuplicateTag(String),
}

/// Addressing metadata for one hydratable tag.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressInfo {
    pub tag: String,
    /// Enclosing sum-type name, when the tag shares an address space with
    /// sibling variants.
    pub adt: Option<String>,
    /// Declared unique-key field names, in order. Empty for singletons.
    pub unique_keys: Vec<String>,
    /// Content-hash addressing flag.
    pub singleton: bool,
}

/// Structural → serializable transform for one hydratable's fields.
///
/// The declared transform is `Timestamp`: epoch-millisecond numbers encode
/// to RFC 3339 strings. Everything else passes through; encoding is
/// idempotent, so re-encoding an already-encoded fragment is harmless.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoder {
    fields: IndexMap<String, Schema>,
}

impl Encoder {
    fn new(def: &HydratableDef) -> Self {
        Encoder {
            fields: def.fields.clone(),
        }
    }

    /// Encodes a value of this hydratable's shape.
    pub fn encode(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (name, field) in map {
                    let encoded = match self.fields.get(name) {
                        Some(schema) => encode_field(schema, field),
                        None => field.clone(),
                    };
                    out.insert(name.clone(), encoded);
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }
}

fn encode_field(schema: &Schema, value: &Value) -> Value {
    match (schema, value) {
        (Schema::Timestamp, Value::Number(n)) => n
            .as_i64()
            .and_then(rfc3339)
            .map(Value::String)
            .unwrap_or_else(|| value.clone()),
        (Schema::Array(inner), Value::Array(items)) => {
            Value::Array(items.iter().map(|item| encode_field(inner, item)).collect())
        }
        (Schema::Record(fields), Value::Object(map)) => {
            let mut out = Map::with_capacity(map.len());
            for (name, field) in map {
                let encoded = match fields.get(name) {
                    Some(field_schema) => encode_field(field_schema, field),
                    None => field.clone(),
                };
                out.insert(name.clone(), encoded);
            }
            Value::Object(out)
        }
        (Schema::Union { variants, .. }, _) => variants
            .iter()
            .find(|variant| variant.matches(value))
            .map(|variant| encode_field(variant, value))
            .unwrap_or_else(|| value.clone()),
        (Schema::Hydratable(def), Value::Object(_)) => Encoder::new(def).encode(value),
        _ => value.clone(),
    }
}

fn rfc3339(millis: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Per-tag addressing metadata and encoders, derived from a schema in one
/// walk. Built once, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    entries: IndexMap<String, AddressInfo>,
    encoders: IndexMap<String, Encoder>,
}

impl Registry {
    /// Walks the schema and derives addressing metadata for every
    /// hydratable tag. Fails fast on unaddressable or duplicate tags.
    pub fn from_schema(schema: &Schema) -> Result<Self, RegistryError> {
        let mut registry = Registry {
            entries: IndexMap::new(),
            encoders: IndexMap::new(),
        };
        registry.walk(schema, None)?;
        Ok(registry)
    }

    fn walk(&mut self, schema: &Schema, adt: Option<&str>) -> Result<(), RegistryError> {
        match schema {
            Schema::Array(inner) => self.walk(inner, None),
            Schema::Record(fields) => {
                for field in fields.values() {
                    self.walk(field, None)?;
                }
                Ok(())
            }
            Schema::Union { adt: name, variants } => {
                for variant in variants {
                    self.walk(variant, name.as_deref())?;
                }
                Ok(())
            }
            Schema::Hydratable(def) => {
                self.register(def, adt)?;
                for field in def.fields.values() {
                    self.walk(field, None)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn register(&mut self, def: &HydratableDef, adt: Option<&str>) -> Result<(), RegistryError> {
        let (unique_keys, singleton) = match &def.addressing {
            Addressing::Keys(keys) if keys.is_empty() => {
                return Err(RegistryError::Unaddressable(def.tag.clone()));
            }
            Addressing::Keys(keys) => (keys.clone(), false),
            Addressing::Singleton => (Vec::new(), true),
        };
        if self.entries.contains_key(&def.tag) {
            return Err(RegistryError::DuplicateTag(def.tag.clone()));
        }
        self.entries.insert(
            def.tag.clone(),
            AddressInfo {
                tag: def.tag.clone(),
                adt: adt.map(str::to_string),
                unique_keys,
                singleton,
            },
        );
        self.encoders.insert(def.tag.clone(), Encoder::new(def));
        Ok(())
    }

    /// Addressing metadata for a tag.
    pub fn info(&self, tag: &str) -> Option<&AddressInfo> {
        self.entries.get(tag)
    }

    /// The encoder for a tag.
    pub fn encoder(&self, tag: &str) -> Option<&Encoder> {
        self.encoders.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// All registered tags, in schema order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Declared unique-key field names for a tag; empty when unknown or
    /// singleton.
    pub fn hydration_keys(&self, tag: &str) -> &[String] {
        self.info(tag).map(|info| info.unique_keys.as_slice()).unwrap_or(&[])
    }

    /// True when the tag is addressed by content hash.
    pub fn is_singleton(&self, tag: &str) -> bool {
        self.info(tag).is_some_and(|info| info.singleton)
    }

    /// Structural → serializable form; unknown tags pass through.
    pub fn encode(&self, tag: &str, value: &Value) -> Value {
        match self.encoder(tag) {
            Some(encoder) => encoder.encode(value),
            None => value.clone(),
        }
    }

    /// Deterministic content hash over the canonical encoded form.
    ///
    /// serde_json maps serialize with sorted keys, so compact output is
    /// canonical for structurally equal values.
    pub fn singleton_hash(&self, tag: &str, value: &Value) -> String {
        let encoded = self.encode(tag, value);
        let bytes =
            serde_json::to_vec(&encoded).expect("fragment serialization should not fail");
        blake3::hash(&bytes).to_hex().to_string()
    }

    /// Builds the addressing segment for an encoded hydratable value: the
    /// encoded unique keys, or the singleton hash as the sole `hash` key.
    /// Returns None when the tag is unregistered or an address field is
    /// absent or non-scalar.
    pub fn segment_for(
        &self,
        tag: &str,
        encoded: &Value,
    ) -> Result<Option<Segment>, LocatorError> {
        let Some(info) = self.info(tag) else {
            return Ok(None);
        };
        let mut segment = match &info.adt {
            Some(adt) => Segment::with_adt(adt.clone(), tag)?,
            None => Segment::new(tag)?,
        };
        if info.singleton {
            segment = segment.keys([(HASH_KEY, self.singleton_hash(tag, encoded))])?;
        } else {
            for key in &info.unique_keys {
                let Some(field) = encoded.get(key) else {
                    return Ok(None);
                };
                let Some(value) = KeyValue::from_json(field) else {
                    return Ok(None);
                };
                segment = segment.keys([(key.clone(), value)])?;
            }
        }
        Ok(Some(segment))
    }
}
