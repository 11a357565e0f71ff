use indexmap::IndexMap;
use serde_json::Value;

use crate::stub;

/// Type description for hydratable value trees.
///
/// The schema is an explicit enumeration of the shapes the persistence
/// layer can encounter. Addressing metadata is never inferred from values
/// at runtime; every hydratable tag declares its unique keys or singleton
/// status here, and the registry derives everything else in one walk.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Boolean.
    Bool,
    /// JSON number.
    Number,
    /// UTF-8 text.
    Text,
    /// Epoch-millisecond instant. Encodes to an RFC 3339 string.
    Timestamp,
    /// Homogeneous list.
    Array(Box<Schema>),
    /// Record with named fields.
    Record(IndexMap<String, Schema>),
    /// Sum type. A named union shares one address space: hydratable
    /// variants directly under it carry the union name as their adt.
    Union {
        adt: Option<String>,
        variants: Vec<Schema>,
    },
    /// A tagged value addressed by its own fields or a content hash.
    Hydratable(Box<HydratableDef>),
}

/// Declaration of one hydratable variant.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratableDef {
    pub tag: String,
    pub addressing: Addressing,
    pub fields: IndexMap<String, Schema>,
}

/// How a hydratable derives its address.
#[derive(Debug, Clone, PartialEq)]
pub enum Addressing {
    /// Addressed by the named fields, in declaration order.
    Keys(Vec<String>),
    /// Addressed by a hash of the canonical encoded form.
    Singleton,
}

impl Schema {
    /// Creates an array type.
    pub fn array(inner: Schema) -> Self {
        Schema::Array(Box::new(inner))
    }

    /// Creates a record type from field definitions.
    pub fn record(fields: impl IntoIterator<Item = (&'static str, Schema)>) -> Self {
        Schema::Record(
            fields
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
        )
    }

    /// Creates an anonymous union.
    pub fn union(variants: impl IntoIterator<Item = Schema>) -> Self {
        Schema::Union {
            adt: None,
            variants: variants.into_iter().collect(),
        }
    }

    /// Creates a named union whose hydratable variants share one address
    /// space under the given adt name.
    pub fn adt(name: &str, variants: impl IntoIterator<Item = Schema>) -> Self {
        Schema::Union {
            adt: Some(name.to_string()),
            variants: variants.into_iter().collect(),
        }
    }

    /// Declares a key-addressed hydratable.
    pub fn hydratable(
        tag: &str,
        keys: impl IntoIterator<Item = &'static str>,
        fields: impl IntoIterator<Item = (&'static str, Schema)>,
    ) -> Self {
        Schema::Hydratable(Box::new(HydratableDef {
            tag: tag.to_string(),
            addressing: Addressing::Keys(keys.into_iter().map(str::to_string).collect()),
            fields: fields
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
        }))
    }

    /// Declares a content-hash-addressed hydratable.
    pub fn singleton(
        tag: &str,
        fields: impl IntoIterator<Item = (&'static str, Schema)>,
    ) -> Self {
        Schema::Hydratable(Box::new(HydratableDef {
            tag: tag.to_string(),
            addressing: Addressing::Singleton,
            fields: fields
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
        }))
    }

    /// Structural validation of a value against this schema.
    ///
    /// Lenient on purpose: absent record fields are tolerated (partial data
    /// is data, not an error) and a hydratable matches any object carrying
    /// its tag, so dehydrated stubs validate where the full value would.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Schema::Bool, Value::Bool(_)) => true,
            (Schema::Number, Value::Number(_)) => true,
            (Schema::Text, Value::String(_)) => true,
            (Schema::Timestamp, Value::Number(_) | Value::String(_)) => true,
            (Schema::Array(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.matches(item))
            }
            (Schema::Record(fields), Value::Object(map)) => fields
                .iter()
                .all(|(name, schema)| map.get(name).is_none_or(|field| schema.matches(field))),
            (Schema::Union { variants, .. }, _) => {
                variants.iter().any(|variant| variant.matches(value))
            }
            (Schema::Hydratable(def), Value::Object(map)) => {
                if stub::tag_of(value) != Some(def.tag.as_str()) {
                    return false;
                }
                if stub::is_stub(value) {
                    return true;
                }
                def.fields
                    .iter()
                    .all(|(name, schema)| map.get(name).is_none_or(|field| schema.matches(field)))
            }
            _ => false,
        }
    }
}
