use linked_hash_map::LinkedHashMap;
use std::iter::IntoIterator;
use thiserror::Error;

/// An insertion-ordered map from member names to values that rejects
/// duplicate keys instead of silently overwriting them. Member order is
/// semantic for projection documents, so plain hash maps are not enough,
/// and a duplicate member name always indicates a caller bug.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UniqueLinkedHashMap<V>(LinkedHashMap<String, V>);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("duplicate key found: {0}")]
pub struct DuplicateKeyError(pub String);

impl<V> UniqueLinkedHashMap<V> {
    pub fn new() -> Self {
        Self(LinkedHashMap::new())
    }

    /// Inserts a key-value pair, erroring if the key is already present.
    /// The membership check runs before insertion so the error can report
    /// the key without cloning on the success path.
    pub fn insert(&mut self, k: impl Into<String>, v: V) -> Result<(), DuplicateKeyError> {
        let k = k.into();
        if self.0.contains_key(&k) {
            return Err(DuplicateKeyError(k));
        }
        self.0.insert(k, v);
        Ok(())
    }

    pub fn insert_many(
        &mut self,
        entries: impl IntoIterator<Item = (String, V)>,
    ) -> Result<(), DuplicateKeyError> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }

    pub fn get(&self, k: &str) -> Option<&V> {
        self.0.get(k)
    }

    pub fn contains_key(&self, k: &str) -> bool {
        self.0.contains_key(k)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.0.iter()
    }

    /// Maps the values while keeping keys and order. Key uniqueness is
    /// preserved by construction, so this cannot fail.
    pub fn map_values<W>(self, mut f: impl FnMut(V) -> W) -> UniqueLinkedHashMap<W> {
        UniqueLinkedHashMap(self.0.into_iter().map(|(k, v)| (k, f(v))).collect())
    }
}

impl<V> IntoIterator for UniqueLinkedHashMap<V> {
    type Item = (String, V);
    type IntoIter = linked_hash_map::IntoIter<String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a UniqueLinkedHashMap<V> {
    type Item = (&'a String, &'a V);
    type IntoIter = linked_hash_map::Iter<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
