//! Hydrogel is a hydratable-value persistence layer: it breaks a tree of
//! tagged values into independently addressable fragments, persists each
//! fragment as its own JSON file, and reconstructs the graph, or named
//! parts of it, on demand.
//!
//! Core concepts:
//! - **Segment / Uhl**: a Unique Hydratable Locator, a path of typed
//!   segments addressing one fragment
//! - **Schema / Registry**: explicit type description and the per-tag
//!   addressing metadata derived from it in one walk
//! - **Dehydrate / Hydrate**: traversals swapping hydratables for
//!   address-only stubs and back
//! - **FragmentIndex**: in-memory map from locator string to raw value
//! - **Bridge**: persistence façade over an injectable fragment store
//!
//! # Example
//!
//! ```
//! use hydrogel_core::{Bridge, MemoryStore, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::hydratable(
//!     "Post",
//!     ["slug"],
//!     [("slug", Schema::Text), ("title", Schema::Text)],
//! );
//! let mut bridge = Bridge::new(&schema, MemoryStore::new()).unwrap();
//!
//! bridge
//!     .import_from_memory(&json!({"_tag": "Post", "slug": "intro", "title": "Intro"}))
//!     .unwrap();
//! bridge.export().unwrap();
//!
//! let restored = bridge.view().unwrap();
//! assert_eq!(restored["title"], "Intro");
//! ```

mod async_store;
mod bridge;
mod dehydrate;
mod hydrate;
mod index;
mod positions;
mod registry;
mod schema;
mod segment;
mod selection;
mod store;
pub mod stub;
mod uhl;

pub use async_store::AsyncFragmentStore;
pub use bridge::{Bridge, BridgeError, BridgeState};
pub use dehydrate::{Dehydrated, DependencyGraph, dehydrate, dehydrate_with_dependencies};
pub use hydrate::hydrate;
pub use index::FragmentIndex;
pub use positions::{Position, Positions, RootKind};
pub use registry::{AddressInfo, Encoder, HASH_KEY, Registry, RegistryError};
pub use schema::{Addressing, HydratableDef, Schema};
pub use segment::{KeyValue, LocatorError, Segment};
pub use selection::{Selection, Selector};
pub use store::{FragmentStore, MemoryStore};
pub use uhl::Uhl;
