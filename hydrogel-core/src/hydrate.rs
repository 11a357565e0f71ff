use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::index::FragmentIndex;
use crate::registry::{HASH_KEY, Registry};
use crate::segment::{KeyValue, Segment};
use crate::stub;
use crate::uhl::Uhl;

/// Replaces stubs with real fragment values, recursively.
///
/// A stub rebuilds its one-segment locator from tag and fields, tried
/// first appended to the parent chain (fragments unique only within a
/// parent namespace), then at top level. A found fragment is recursed
/// into with its own locator as context. A miss (or a stub too
/// malformed to address) is returned unresolved: partial hydration is a
/// valid terminal state, not an error.
pub fn hydrate(value: &Value, registry: &Registry, index: &FragmentIndex, parent: &Uhl) -> Value {
    let mut walker = Hydrator {
        registry,
        index,
        resolving: HashSet::new(),
    };
    walker.walk(value, parent)
}

struct Hydrator<'a> {
    registry: &'a Registry,
    index: &'a FragmentIndex,
    /// Locators currently being resolved. Mutually-referencing stored
    /// fragments resolve to unresolved stubs instead of recursing forever.
    resolving: HashSet<String>,
}

impl Hydrator<'_> {
    fn walk(&mut self, value: &Value, chain: &Uhl) -> Value {
        match value {
            Value::Object(_) if stub::is_stub(value) => self.resolve(value, chain),
            Value::Object(map) => {
                // A non-stub hydratable switches the context handed to its
                // children to its own locator; plain containers forward the
                // chain unchanged.
                let next = self.context_for(value, chain);
                let mut out = Map::with_capacity(map.len());
                for (name, field) in map {
                    out.insert(name.clone(), self.walk(field, &next));
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.walk(item, chain)).collect())
            }
            other => other.clone(),
        }
    }

    /// Walks a fragment body whose locator is already known, so the
    /// context is not re-derived from the body (a singleton body with
    /// stubbed children would re-hash differently).
    fn walk_body(&mut self, value: &Value, at: &Uhl) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (name, field) in map {
                    out.insert(name.clone(), self.walk(field, at));
                }
                Value::Object(out)
            }
            other => self.walk(other, at),
        }
    }

    fn context_for(&self, value: &Value, chain: &Uhl) -> Uhl {
        let Some(tag) = stub::tag_of(value) else {
            return chain.clone();
        };
        if !self.registry.contains(tag) {
            return chain.clone();
        }
        let encoded = self.registry.encode(tag, value);
        match self.registry.segment_for(tag, &encoded) {
            // The chain already ends at this value's own locator when the
            // caller handed us the fragment itself (resolve does exactly
            // that); only inline values extend it.
            Ok(Some(segment)) if chain.last() == Some(&segment) => chain.clone(),
            Ok(Some(segment)) if self.registry.is_singleton(tag) => Uhl::single(segment),
            Ok(Some(segment)) => chain.child(segment),
            _ => chain.clone(),
        }
    }

    fn resolve(&mut self, stub_value: &Value, chain: &Uhl) -> Value {
        let index = self.index;
        let Some(segment) = self.segment_from_stub(stub_value) else {
            return stub_value.clone();
        };
        let nested = chain.child(segment.clone());
        let top = Uhl::single(segment);
        for locator in [nested, top] {
            let key = locator.to_string();
            if self.resolving.contains(&key) {
                continue;
            }
            if let Some(found) = index.get_str(&key) {
                if stub::is_stub(found) {
                    return found.clone();
                }
                self.resolving.insert(key.clone());
                let hydrated = self.walk_body(found, &locator);
                self.resolving.remove(&key);
                return hydrated;
            }
        }
        stub_value.clone()
    }

    /// Rebuilds the one-segment locator a stub points at, or None when the
    /// stub is missing address fields.
    fn segment_from_stub(&self, value: &Value) -> Option<Segment> {
        let tag = stub::tag_of(value)?;
        let info = self.registry.info(tag)?;
        let mut segment = match &info.adt {
            Some(adt) => Segment::with_adt(adt.clone(), tag).ok()?,
            None => Segment::new(tag).ok()?,
        };
        let keys: Vec<String> = if info.singleton {
            vec![HASH_KEY.to_string()]
        } else {
            info.unique_keys.clone()
        };
        for key in keys {
            let field = value.get(&key)?;
            let key_value = KeyValue::from_json(field)?;
            segment = segment.keys([(key, key_value)]).ok()?;
        }
        Some(segment)
    }
}
