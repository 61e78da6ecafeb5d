//! first-writer-wins merging
//!
//! Environment variables and tags are layered: the base layers are what the template author wrote (on
//! the resource itself and in `Globals`), the overlay is what the engine wants to add. A key present in
//! any base layer is never touched. Merging happens in two phases so the base can be read before the
//! target is borrowed mutably:
//!
//! 1. [absent] picks the overlay entries no base layer has
//! 2. [apply] inserts them into the target
use serde_json::{Map, Value};

/// Something that holds values by key: a mapping, or a CloudFormation tag list
pub trait Keyed {
    fn contains_key(&self, key: &str) -> bool;
}

pub trait KeyedMut: Keyed {
    fn insert(&mut self, key: String, value: Value);
}

impl Keyed for Map<String, Value> {
    fn contains_key(&self, key: &str) -> bool {
        Map::contains_key(self, key)
    }
}

impl KeyedMut for Map<String, Value> {
    fn insert(&mut self, key: String, value: Value) {
        Map::insert(self, key, value);
    }
}

/// CloudFormation style tags: `[{"Key": k, "Value": v}, ...]`
impl Keyed for Vec<Value> {
    fn contains_key(&self, key: &str) -> bool {
        self.iter()
            .any(|tag| tag.get("Key").and_then(Value::as_str) == Some(key))
    }
}

impl KeyedMut for Vec<Value> {
    fn insert(&mut self, key: String, value: Value) {
        let mut tag = Map::with_capacity(2);
        tag.insert("Key".to_string(), Value::String(key));
        tag.insert("Value".to_string(), value);
        self.push(Value::Object(tag));
    }
}

/// Overlay entries no base layer has, in overlay order
///
/// When the overlay names a key twice the first entry wins as well.
pub fn absent<I, K>(base: &[&dyn Keyed], overlay: I) -> Vec<(String, Value)>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let mut entries: Vec<(String, Value)> = vec![];

    for (key, value) in overlay {
        let key = key.into();
        let present = base.iter().any(|layer| layer.contains_key(&key))
            || entries.iter().any(|(existing, _)| *existing == key);

        if present {
            tracing::trace!(%key, "keeping existing value");
            continue;
        }

        entries.push((key, value));
    }

    entries
}

/// Insert entries selected by [absent]
pub fn apply<T: KeyedMut + ?Sized>(target: &mut T, entries: Vec<(String, Value)>) {
    for (key, value) in entries {
        tracing::trace!(%key, "setting value");
        target.insert(key, value);
    }
}
