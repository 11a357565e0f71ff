use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::index::FragmentIndex;
use crate::registry::Registry;
use crate::segment::LocatorError;
use crate::stub;
use crate::uhl::Uhl;

/// Directed parent→child locator edges recorded during one dehydration.
///
/// Rebuilt per call and handed back to the caller; nothing in the
/// persistence layer consumes it. Callers can drive incremental exports
/// from the edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    edges: Vec<(String, String)>,
}

impl DependencyGraph {
    /// Records one parent→child edge.
    pub fn record(&mut self, parent: &Uhl, child: &Uhl) {
        self.edges.push((parent.to_string(), child.to_string()));
    }

    /// All edges, in discovery order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Locators reachable in one step from the given parent.
    pub fn dependencies_of(&self, parent: &Uhl) -> Vec<&str> {
        let parent = parent.to_string();
        self.edges
            .iter()
            .filter(|(p, _)| *p == parent)
            .map(|(_, c)| c.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A dehydrated value together with the dependency graph built while
/// extracting its fragments.
#[derive(Debug)]
pub struct Dehydrated {
    pub value: Value,
    pub graph: DependencyGraph,
}

/// Dehydrates a value at the root context, discarding the graph.
///
/// Every registered hydratable in the tree is encoded, indexed under its
/// locator and replaced in place by a stub.
pub fn dehydrate(
    value: &Value,
    registry: &Registry,
    index: &mut FragmentIndex,
) -> Result<Value, LocatorError> {
    Ok(dehydrate_with_dependencies(value, &Uhl::root(), registry, index)?.value)
}

/// Dehydrates a value below the given ancestor locator, returning the
/// transformed value and the dependency graph.
///
/// Keyed fragments are indexed under the ancestor chain: addressing
/// happens where the parent reaches the child. Singletons are indexed at
/// top level so structurally identical values share one locator.
pub fn dehydrate_with_dependencies(
    value: &Value,
    at: &Uhl,
    registry: &Registry,
    index: &mut FragmentIndex,
) -> Result<Dehydrated, LocatorError> {
    let mut walker = Dehydrator {
        registry,
        index,
        graph: DependencyGraph::default(),
        on_path: HashSet::new(),
    };
    let value = walker.walk(value, at)?;
    Ok(Dehydrated {
        value,
        graph: walker.graph,
    })
}

/// Dehydrates only the children of a fragment body, leaving the body
/// itself encoded rather than re-stubbed. Export runs every indexed
/// fragment through this.
pub(crate) fn dehydrate_children(
    value: &Value,
    at: &Uhl,
    registry: &Registry,
    index: &mut FragmentIndex,
) -> Result<Value, LocatorError> {
    let mut walker = Dehydrator {
        registry,
        index,
        graph: DependencyGraph::default(),
        on_path: HashSet::new(),
    };
    walker.walk_fields(value, at)
}

struct Dehydrator<'a> {
    registry: &'a Registry,
    index: &'a mut FragmentIndex,
    graph: DependencyGraph,
    /// Identities of nodes on the current recursion path. Checked before
    /// descending; a revisit returns the value unchanged. Termination, not
    /// cycle-faithful reconstruction.
    on_path: HashSet<usize>,
}

impl Dehydrator<'_> {
    fn walk(&mut self, value: &Value, at: &Uhl) -> Result<Value, LocatorError> {
        let id = value as *const Value as usize;
        if !self.on_path.insert(id) {
            return Ok(value.clone());
        }
        let out = match value {
            Value::Object(_) if stub::is_stub(value) => value.clone(),
            Value::Object(_) => match stub::tag_of(value) {
                Some(tag) if self.registry.contains(tag) => {
                    let tag = tag.to_string();
                    self.extract(&tag, value, at)?
                }
                _ => self.walk_fields(value, at)?,
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.walk(item, at))
                    .collect::<Result<_, _>>()?,
            ),
            other => other.clone(),
        };
        self.on_path.remove(&id);
        Ok(out)
    }

    /// Encodes a registered hydratable, indexes its body under its own
    /// locator, records the dependency edge and returns the stub that
    /// replaces it.
    fn extract(&mut self, tag: &str, value: &Value, at: &Uhl) -> Result<Value, LocatorError> {
        let encoded = self.registry.encode(tag, value);
        let Some(segment) = self.registry.segment_for(tag, &encoded)? else {
            // Address fields absent or non-scalar: traverse transparently.
            return self.walk_fields(value, at);
        };
        let child = if self.registry.is_singleton(tag) {
            Uhl::single(segment.clone())
        } else {
            at.child(segment.clone())
        };
        self.graph.record(at, &child);
        let body = self.walk_fields(&encoded, &child)?;
        self.index.add(&child, body);
        Ok(stub::stub_of(&segment))
    }

    fn walk_fields(&mut self, value: &Value, at: &Uhl) -> Result<Value, LocatorError> {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (name, field) in map {
                    out.insert(name.clone(), self.walk(field, at)?);
                }
                Ok(Value::Object(out))
            }
            other => self.walk(other, at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::hydratable(
            "Site",
            ["name"],
            [
                ("name", Schema::Text),
                (
                    "posts",
                    Schema::array(Schema::hydratable(
                        "Post",
                        ["slug"],
                        [("slug", Schema::Text), ("title", Schema::Text)],
                    )),
                ),
                ("theme", Schema::singleton("Theme", [("accent", Schema::Text)])),
            ],
        )
    }

    fn site() -> Value {
        json!({
            "_tag": "Site",
            "name": "blog",
            "posts": [
                {"_tag": "Post", "slug": "intro", "title": "Intro"},
                {"_tag": "Post", "slug": "next", "title": "Next"},
            ],
            "theme": {"_tag": "Theme", "accent": "teal"},
        })
    }

    #[test]
    fn primitives_pass_through() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        for value in [json!(null), json!(true), json!(7), json!("text")] {
            assert_eq!(dehydrate(&value, &registry, &mut index).unwrap(), value);
        }
        assert!(index.is_empty());
    }

    #[test]
    fn hydratables_become_stubs_and_fragments() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        let out = dehydrate(&site(), &registry, &mut index).unwrap();

        assert_eq!(
            out,
            json!({"_tag": "Site", "name": "blog", "_dehydrated": true})
        );
        // Root fragment plus two posts and the theme.
        assert_eq!(index.len(), 4);

        let root = index.get_str("Site!name@blog").unwrap();
        assert_eq!(root["posts"][0]["_dehydrated"], json!(true));
        assert_eq!(root["posts"][0]["slug"], json!("intro"));
        assert_eq!(root["theme"]["_tag"], json!("Theme"));
    }

    #[test]
    fn keyed_fragments_chain_under_parent() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        dehydrate(&site(), &registry, &mut index).unwrap();

        let nested = index.get_str("Site!name@blog___Post!slug@intro").unwrap();
        assert_eq!(nested["title"], json!("Intro"));
    }

    #[test]
    fn singletons_index_at_top_level() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        dehydrate(&site(), &registry, &mut index).unwrap();

        let theme_locator = index
            .locators()
            .find(|locator| locator.starts_with("Theme!hash@"))
            .unwrap();
        assert!(!theme_locator.contains("___"));
    }

    #[test]
    fn identical_singletons_share_a_locator() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        let tree = json!([
            {"_tag": "Theme", "accent": "teal"},
            {"_tag": "Theme", "accent": "teal"},
            {"_tag": "Theme", "accent": "plum"},
        ]);
        let out = dehydrate(&tree, &registry, &mut index).unwrap();

        assert_eq!(out[0], out[1]);
        assert_ne!(out[0], out[2]);
        // Two distinct themes, not three.
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn dependency_graph_records_edges() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        let dehydrated =
            dehydrate_with_dependencies(&site(), &Uhl::root(), &registry, &mut index).unwrap();

        let root = Uhl::parse("Site!name@blog").unwrap();
        let children = dehydrated.graph.dependencies_of(&root);
        assert_eq!(children.len(), 3);
        assert!(children.contains(&"Site!name@blog___Post!slug@intro"));
        // The root itself hangs off the empty context.
        assert_eq!(
            dehydrated.graph.dependencies_of(&Uhl::root()),
            vec!["Site!name@blog"]
        );
    }

    #[test]
    fn stubs_pass_through_unchanged() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        let stub = json!({"_tag": "Post", "slug": "intro", "_dehydrated": true});
        assert_eq!(dehydrate(&stub, &registry, &mut index).unwrap(), stub);
        assert!(index.is_empty());
    }

    #[test]
    fn unregistered_tags_traverse_transparently() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        let value = json!({
            "_tag": "Wrapper",
            "inner": {"_tag": "Post", "slug": "deep", "title": "Deep"},
        });
        let out = dehydrate(&value, &registry, &mut index).unwrap();

        assert_eq!(out["_tag"], json!("Wrapper"));
        assert_eq!(out["inner"]["_dehydrated"], json!(true));
        assert!(index.get_str("Post!slug@deep").is_some());
    }

    #[test]
    fn missing_address_field_leaves_value_inline() {
        let registry = Registry::from_schema(&schema()).unwrap();
        let mut index = FragmentIndex::new();
        let value = json!({"_tag": "Post", "title": "No slug"});
        let out = dehydrate(&value, &registry, &mut index).unwrap();

        assert_eq!(out, value);
        assert!(index.is_empty());
    }
}
