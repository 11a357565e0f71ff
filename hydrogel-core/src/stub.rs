//! Wire markers for dehydrated values.
//!
//! A hydratable value carries its variant tag in [`TAG_FIELD`]. Dehydration
//! replaces the value, in place, with a stub: the same tag, the addressing
//! keys, and [`DEHYDRATED_FIELD`] set to `true`. Nothing else distinguishes
//! a stub from a full value.

use serde_json::{Map, Value};

use crate::segment::Segment;

/// Field naming the concrete variant of a tagged value.
pub const TAG_FIELD: &str = "_tag";
/// Marker distinguishing an address-only stub from the full value.
pub const DEHYDRATED_FIELD: &str = "_dehydrated";

/// The variant tag of a tagged object, if any.
pub fn tag_of(value: &Value) -> Option<&str> {
    value.get(TAG_FIELD)?.as_str()
}

/// True when the value is an address-only stub.
pub fn is_stub(value: &Value) -> bool {
    value
        .get(DEHYDRATED_FIELD)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Builds the stub standing in for a dehydrated value: tag, addressing
/// keys, marker.
pub fn stub_of(segment: &Segment) -> Value {
    let mut map = Map::new();
    map.insert(TAG_FIELD.into(), Value::String(segment.tag().to_string()));
    for (key, value) in segment.unique_keys() {
        map.insert(key.clone(), value.to_json());
    }
    map.insert(DEHYDRATED_FIELD.into(), Value::Bool(true));
    Value::Object(map)
}
