use indexmap::IndexMap;

use crate::segment::KeyValue;

/// One selector within a selection expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// A single key-set naming one fragment.
    Keys(IndexMap<String, KeyValue>),
    /// Several key-sets naming a set of fragments.
    Each(Vec<IndexMap<String, KeyValue>>),
    /// Coverage: every stored fragment of the tag.
    All,
}

/// Selection expression handed to `peek`: top-level hydratable tag →
/// selector. Key values are validated when the selection is resolved to
/// locators, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    entries: IndexMap<String, Selector>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects one fragment of a tag by its unique keys.
    pub fn keys<K, V>(
        mut self,
        tag: impl Into<String>,
        keys: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<KeyValue>,
    {
        let keys = keys
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.entries.insert(tag.into(), Selector::Keys(keys));
        self
    }

    /// Selects several fragments of a tag, one per key-set.
    pub fn each<K, V>(
        mut self,
        tag: impl Into<String>,
        sets: impl IntoIterator<Item = Vec<(K, V)>>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<KeyValue>,
    {
        let sets = sets
            .into_iter()
            .map(|set| {
                set.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect()
            })
            .collect();
        self.entries.insert(tag.into(), Selector::Each(sets));
        self
    }

    /// Selects every stored fragment of a tag.
    pub fn all(mut self, tag: impl Into<String>) -> Self {
        self.entries.insert(tag.into(), Selector::All);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.entries.iter().map(|(tag, sel)| (tag.as_str(), sel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_in_order() {
        let selection = Selection::new()
            .keys("Site", [("name", "blog")])
            .all("Theme");
        assert!(!selection.is_empty());
        let tags: Vec<_> = selection.iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["Site", "Theme"]);
    }

    #[test]
    fn empty_selection() {
        assert!(Selection::new().is_empty());
    }
}
