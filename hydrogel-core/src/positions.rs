use indexmap::IndexMap;

use crate::schema::{Addressing, Schema};

/// Where one hydratable tag sits in the schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub tag: String,
    pub adt: Option<String>,
    /// Record-field path from the root to the position. Array hops add no
    /// step.
    pub path: Vec<String>,
    pub unique_keys: Vec<String>,
    pub singleton: bool,
}

/// Shape of the schema root, steering `view`'s root search.
#[derive(Debug, Clone, PartialEq)]
pub enum RootKind {
    /// The root is a single hydratable tag.
    Hydratable { tag: String },
    /// The root is a union whose members are all hydratables.
    Union {
        adt: Option<String>,
        tags: Vec<String>,
    },
    /// Anything else; `view` falls back to schema validation.
    Opaque,
}

/// Schema-derived lookup from tag to addressable position.
///
/// Distinct job from the Registry: this resolves selection expressions to
/// concrete locators, the Registry maps tags to addressing metadata.
#[derive(Debug, Clone)]
pub struct Positions {
    root: RootKind,
    by_tag: IndexMap<String, Position>,
}

impl Positions {
    /// Derives the position table and root shape from a schema.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut by_tag = IndexMap::new();
        collect(schema, None, &mut Vec::new(), &mut by_tag);
        Positions {
            root: root_kind(schema),
            by_tag,
        }
    }

    pub fn root(&self) -> &RootKind {
        &self.root
    }

    pub fn get(&self, tag: &str) -> Option<&Position> {
        self.by_tag.get(tag)
    }

    /// All addressable tags, in schema order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }
}

fn root_kind(schema: &Schema) -> RootKind {
    match schema {
        Schema::Hydratable(def) => RootKind::Hydratable {
            tag: def.tag.clone(),
        },
        Schema::Union { adt, variants } if !variants.is_empty() => {
            let mut tags = Vec::with_capacity(variants.len());
            for variant in variants {
                match variant {
                    Schema::Hydratable(def) => tags.push(def.tag.clone()),
                    _ => return RootKind::Opaque,
                }
            }
            RootKind::Union {
                adt: adt.clone(),
                tags,
            }
        }
        _ => RootKind::Opaque,
    }
}

fn collect(
    schema: &Schema,
    adt: Option<&str>,
    path: &mut Vec<String>,
    out: &mut IndexMap<String, Position>,
) {
    match schema {
        Schema::Array(inner) => collect(inner, None, path, out),
        Schema::Record(fields) => {
            for (name, field) in fields {
                path.push(name.clone());
                collect(field, None, path, out);
                path.pop();
            }
        }
        Schema::Union { adt: name, variants } => {
            for variant in variants {
                collect(variant, name.as_deref(), path, out);
            }
        }
        Schema::Hydratable(def) => {
            let unique_keys = match &def.addressing {
                Addressing::Keys(keys) => keys.clone(),
                Addressing::Singleton => Vec::new(),
            };
            out.insert(
                def.tag.clone(),
                Position {
                    tag: def.tag.clone(),
                    adt: adt.map(str::to_string),
                    path: path.clone(),
                    unique_keys,
                    singleton: matches!(def.addressing, Addressing::Singleton),
                },
            );
            for (name, field) in &def.fields {
                path.push(name.clone());
                collect(field, None, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}
