//! Ordered, case-preserving header map shared by requests and responses.
//!
//! # Design
//! Entries keep their insertion order and the exact name spelling the client
//! used. A `None` value means "header not set": such entries survive in the
//! map (they can be recorded and compared) but are dropped when headers are
//! emitted as wire lines and when two maps are compared for matching.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Insertion-ordered header map. Duplicate names are coalesced by
/// comma-joining when the map is emitted as header lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<(String, Option<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// First value recorded under `name`, if any is set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Sets `name` to `value`, replacing every existing entry of that name.
    /// The position of the first existing entry is preserved.
    pub fn set(&mut self, name: &str, value: impl Into<Option<String>>) {
        let value = value.into();
        let mut slot: Option<usize> = None;
        let mut index = 0;
        self.entries.retain(|(n, _)| {
            let keep = n != name || {
                if slot.is_none() {
                    slot = Some(index);
                    true
                } else {
                    false
                }
            };
            if keep {
                index += 1;
            }
            keep
        });
        match slot {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Removes every entry of `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    /// Name/value view with unset entries dropped. This is the shape header
    /// matching compares, so two maps that only differ in unset entries or
    /// entry order are considered equal.
    pub fn filtered(&self) -> BTreeMap<&str, String> {
        let mut map: BTreeMap<&str, String> = BTreeMap::new();
        for (name, value) in &self.entries {
            if let Some(value) = value {
                map.entry(name.as_str())
                    .and_modify(|joined| {
                        joined.push_str(", ");
                        joined.push_str(value);
                    })
                    .or_insert_with(|| value.clone());
            }
        }
        map
    }

    /// Wire-format lines (`Name: Value`), one per set header, duplicates
    /// comma-joined, in insertion order of the first occurrence.
    pub fn emit_lines(&self) -> Vec<String> {
        let mut order: Vec<&str> = Vec::new();
        let mut joined: BTreeMap<&str, String> = BTreeMap::new();
        for (name, value) in &self.entries {
            if let Some(value) = value {
                match joined.get_mut(name.as_str()) {
                    Some(existing) => {
                        existing.push_str(", ");
                        existing.push_str(value);
                    }
                    None => {
                        order.push(name.as_str());
                        joined.insert(name.as_str(), value.clone());
                    }
                }
            }
        }
        order
            .into_iter()
            .map(|name| format!("{name}: {}", joined[name]))
            .collect()
    }
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.set(&name, Some(value));
        }
        map
    }
}

impl<const N: usize> From<[(&str, &str); N]> for HeaderMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }
}

impl Serialize for HeaderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeaderMapVisitor;

        impl<'de> Visitor<'de> for HeaderMapVisitor {
            type Value = HeaderMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of header names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, Option<String>>()? {
                    entries.push((name, value));
                }
                Ok(HeaderMap { entries })
            }
        }

        deserializer.deserialize_map(HeaderMapVisitor)
    }
}
