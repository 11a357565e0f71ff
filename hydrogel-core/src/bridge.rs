use std::collections::VecDeque;

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::dehydrate;
use crate::hydrate;
use crate::index::FragmentIndex;
use crate::positions::{Position, Positions, RootKind};
use crate::registry::{Registry, RegistryError};
use crate::schema::Schema;
use crate::segment::{KeyValue, LocatorError, Segment};
use crate::selection::{Selection, Selector};
use crate::store::FragmentStore;
use crate::uhl::Uhl;

/// Error type for Bridge operations. `E` is the bound store's error type.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError<E: std::error::Error + Send + Sync + 'static> {
    /// Locator construction or parsing failed.
    #[error(transparent)]
    Locator(#[from] LocatorError),
    /// A fragment body could not be encoded or decoded.
    #[error("fragment codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// `view` found no entry satisfying the root schema.
    #[error("no fragment satisfies the root schema")]
    NotFound,
    /// The bound store failed.
    #[error("store error: {0}")]
    Store(#[source] E),
}

/// Index population state of one Bridge instance.
///
/// `Empty` → `Populated` after any import, peek or dehydration that lands
/// fragments in the index; `clear` returns to `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Empty,
    Populated,
}

/// Persistence façade: Registry + Positions + FragmentIndex bound to an
/// injectable fragment store.
///
/// Single-writer, cooperative: the index is not designed for concurrent
/// mutation; callers serialize access to a shared instance. Store calls
/// are the only suspension points; their errors propagate without retry.
pub struct Bridge<S: FragmentStore> {
    schema: Schema,
    registry: Registry,
    positions: Positions,
    index: FragmentIndex,
    store: S,
    state: BridgeState,
}

impl<S: FragmentStore> Bridge<S> {
    /// Binds a schema to a store. Fails fast when the schema declares an
    /// unaddressable or duplicated hydratable tag.
    pub fn new(schema: &Schema, store: S) -> Result<Self, RegistryError> {
        Ok(Bridge {
            schema: schema.clone(),
            registry: Registry::from_schema(schema)?,
            positions: Positions::from_schema(schema),
            index: FragmentIndex::new(),
            store,
            state: BridgeState::Empty,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn index(&self) -> &FragmentIndex {
        &self.index
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn refresh_state(&mut self) {
        self.state = if self.index.is_empty() {
            BridgeState::Empty
        } else {
            BridgeState::Populated
        };
    }

    /// Dehydrates nested hydratables of every indexed fragment and writes
    /// each one as `<locator>.json`.
    ///
    /// Fragments are written independently, not atomically as a set;
    /// callers needing atomicity stage into a fresh directory and rename.
    pub fn export(&mut self) -> Result<(), BridgeError<S::Error>> {
        let fragments = self.normalized_fragments()?;
        debug!("exporting {} fragment(s)", fragments.len());
        for (locator, value) in &fragments {
            let name = Uhl::parse(locator)?.file_name();
            let bytes = serde_json::to_vec(value)?;
            self.store.write(&name, &bytes).map_err(BridgeError::Store)?;
        }
        Ok(())
    }

    /// The export transform without I/O: locator string → fragment body.
    pub fn export_to_memory(&mut self) -> Result<IndexMap<String, Value>, BridgeError<S::Error>> {
        Ok(self.normalized_fragments()?)
    }

    /// Brings every indexed fragment to its exported form: nested
    /// hydratables stubbed out under the fragment's locator, the fragment
    /// itself kept encoded, never re-stubbed. Fragments extracted along
    /// the way join the worklist.
    fn normalized_fragments(&mut self) -> Result<IndexMap<String, Value>, LocatorError> {
        let mut out = IndexMap::new();
        let mut pending: VecDeque<String> =
            self.index.locators().map(str::to_string).collect();
        while let Some(locator) = pending.pop_front() {
            if out.contains_key(&locator) {
                continue;
            }
            let Some(value) = self.index.get_str(&locator) else {
                continue;
            };
            let mut value = value.clone();
            // The fragment itself stays encoded, never re-stubbed.
            if let Some(tag) = crate::stub::tag_of(&value).map(str::to_string) {
                value = self.registry.encode(&tag, &value);
            }
            let at = Uhl::parse(&locator)?;
            let before = self.index.len();
            let body =
                dehydrate::dehydrate_children(&value, &at, &self.registry, &mut self.index)?;
            self.index.add(&at, body.clone());
            pending.extend(self.index.locators().skip(before).map(str::to_string));
            out.insert(locator, body);
        }
        self.refresh_state();
        Ok(out)
    }

    /// Loads every stored `*.json` fragment into the index. Names that are
    /// listed but unreadable count as absent; other file names are
    /// skipped.
    pub fn import(&mut self) -> Result<(), BridgeError<S::Error>> {
        let names = self.store.list().map_err(BridgeError::Store)?;
        let mut loaded = 0usize;
        for name in names {
            if !name.ends_with(".json") {
                continue;
            }
            let locator = Uhl::from_file_name(&name)?;
            let Some(bytes) = self.store.read(&name).map_err(BridgeError::Store)? else {
                continue;
            };
            let value: Value = serde_json::from_slice(&bytes)?;
            self.index.add(&locator, value);
            loaded += 1;
        }
        debug!("imported {loaded} fragment(s)");
        self.refresh_state();
        Ok(())
    }

    /// Seeds the index from an already-hydrated value without touching the
    /// store. Every registered hydratable in the tree, the root included
    /// when addressable, lands in the index.
    pub fn import_from_memory(&mut self, value: &Value) -> Result<(), BridgeError<S::Error>> {
        dehydrate::dehydrate(value, &self.registry, &mut self.index)?;
        self.refresh_state();
        Ok(())
    }

    /// Deletes every stored fragment file and empties the index.
    pub fn clear(&mut self) -> Result<(), BridgeError<S::Error>> {
        let names = self.store.list().map_err(BridgeError::Store)?;
        for name in names {
            if name.ends_with(".json") {
                self.store.remove(&name).map_err(BridgeError::Store)?;
            }
        }
        self.index.clear();
        self.state = BridgeState::Empty;
        debug!("cleared fragment store and index");
        Ok(())
    }

    /// Resolves a selection to concrete locators and satisfies each from
    /// the index, reading through the store on a miss. Returned values may
    /// still be dehydrated; absent fragments are absent keys. An absent or
    /// empty selection returns an empty result and performs no I/O.
    pub fn peek(
        &mut self,
        selection: Option<&Selection>,
    ) -> Result<IndexMap<String, Value>, BridgeError<S::Error>> {
        let mut out = IndexMap::new();
        let Some(selection) = selection else {
            return Ok(out);
        };
        if selection.is_empty() {
            return Ok(out);
        }
        for (tag, selector) in selection.iter() {
            let Some(position) = self.positions.get(tag).cloned() else {
                continue;
            };
            match selector {
                Selector::Keys(keys) => {
                    let locator = Uhl::single(selection_segment(&position, keys)?);
                    if let Some(value) = self.load_fragment(&locator)? {
                        out.insert(tag.to_string(), value);
                    }
                }
                Selector::Each(sets) => {
                    let mut found = Vec::new();
                    for keys in sets {
                        let locator = Uhl::single(selection_segment(&position, keys)?);
                        if let Some(value) = self.load_fragment(&locator)? {
                            found.push(value);
                        }
                    }
                    out.insert(tag.to_string(), Value::Array(found));
                }
                Selector::All => {
                    let names = self.store.list().map_err(BridgeError::Store)?;
                    let mut found = Vec::new();
                    for name in names {
                        if !name.ends_with(".json") {
                            continue;
                        }
                        let Ok(locator) = Uhl::from_file_name(&name) else {
                            continue;
                        };
                        let covered = locator.last().is_some_and(|segment| {
                            segment.tag() == position.tag
                                && segment.adt() == position.adt.as_deref()
                        });
                        if covered {
                            if let Some(value) = self.load_fragment(&locator)? {
                                found.push(value);
                            }
                        }
                    }
                    out.insert(tag.to_string(), Value::Array(found));
                }
            }
        }
        self.refresh_state();
        Ok(out)
    }

    fn load_fragment(&mut self, locator: &Uhl) -> Result<Option<Value>, BridgeError<S::Error>> {
        if let Some(value) = self.index.get(locator) {
            return Ok(Some(value.clone()));
        }
        let name = locator.file_name();
        let Some(bytes) = self.store.read(&name).map_err(BridgeError::Store)? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_slice(&bytes)?;
        self.index.add(locator, value.clone());
        Ok(Some(value))
    }

    /// Imports everything, locates the root fragment per the schema's root
    /// shape and hydrates it fully. Fails with `NotFound` when no entry
    /// satisfies the root schema.
    pub fn view(&mut self) -> Result<Value, BridgeError<S::Error>> {
        self.import()?;
        let entry = match self.positions.root().clone() {
            RootKind::Hydratable { tag } => self.find_by_tag(&[tag]),
            RootKind::Union { tags, .. } => self.find_by_tag(&tags),
            RootKind::Opaque => self.find_by_schema(),
        };
        let Some((locator, value)) = entry else {
            return Err(BridgeError::NotFound);
        };
        let at = Uhl::parse(&locator)?;
        Ok(hydrate::hydrate(&value, &self.registry, &self.index, &at))
    }

    /// First top-level index entry whose tag (exact, or adt-qualified for
    /// union members) is one of the candidates.
    fn find_by_tag(&self, tags: &[String]) -> Option<(String, Value)> {
        for (locator, value) in self.index.iter() {
            let Ok(parsed) = Uhl::parse(locator) else {
                continue;
            };
            let [segment] = parsed.segments() else {
                continue;
            };
            let matched = tags.iter().any(|tag| {
                segment.tag() == tag
                    && segment.adt()
                        == self
                            .registry
                            .info(tag)
                            .and_then(|info| info.adt.as_deref())
            });
            if matched {
                return Some((locator.to_string(), value.clone()));
            }
        }
        None
    }

    /// Decode-until-validates fallback: only meaningful when the root
    /// schema is a union.
    fn find_by_schema(&self) -> Option<(String, Value)> {
        if !matches!(self.schema, Schema::Union { .. }) {
            return None;
        }
        for (locator, value) in self.index.iter() {
            if self.schema.matches(value) {
                return Some((locator.to_string(), value.clone()));
            }
        }
        None
    }

    /// The dehydrate transform alone: registered hydratables in `value`
    /// are stubbed into the index. No dependency graph, no I/O.
    pub fn dehydrate(&mut self, value: &Value) -> Result<Value, BridgeError<S::Error>> {
        let out = dehydrate::dehydrate(value, &self.registry, &mut self.index)?;
        self.refresh_state();
        Ok(out)
    }
}

/// Builds the one-segment locator a selector's key-set names.
fn selection_segment(
    position: &Position,
    keys: &IndexMap<String, KeyValue>,
) -> Result<Segment, LocatorError> {
    let segment = match &position.adt {
        Some(adt) => Segment::with_adt(adt.clone(), position.tag.clone())?,
        None => Segment::new(position.tag.clone())?,
    };
    segment.keys(keys.iter().map(|(key, value)| (key.clone(), value.clone())))
}
