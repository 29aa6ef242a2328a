//! Hierarchical property tree
//!
//! Device state lives in a tree of nodes addressed by slash separated paths
//! (e.g. "/mboards/0/sensors/using_ref"). The [`PropertyTree`] trait is the
//! only thing the board-level API depends on; [`JsonPropertyTree`] is an
//! in-memory implementation backed by a JSON document.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{ClockError, Result};

/// Path-addressed key-value store
///
/// Implementations decide their own thread-safety; callers sharing a tree
/// across threads get exactly the guarantees the implementation provides.
pub trait PropertyTree: Send + Sync + fmt::Debug {
    /// Child names under `path`, in the tree's iteration order.
    /// Empty when the path is absent or names a leaf.
    fn list(&self, path: &str) -> Vec<String>;

    /// Whether a node exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Raw value stored at `path`
    fn get_value(&self, path: &str) -> Result<Value>;

    /// Store a raw value at `path`, creating parent nodes as needed
    fn set_value(&self, path: &str, value: Value) -> Result<()>;
}

impl<'a> dyn PropertyTree + 'a {
    /// Typed handle to the node at `path`
    ///
    /// Nothing is read until [`Property::get`] is called.
    pub fn access<T>(&self, path: impl Into<String>) -> Property<'_, T> {
        Property {
            tree: self,
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

/// Typed accessor for one tree node
pub struct Property<'a, T> {
    tree: &'a dyn PropertyTree,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<'_, T> {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T: DeserializeOwned> Property<'_, T> {
    /// Read the current value
    pub fn get(&self) -> Result<T> {
        trace!(path = %self.path, "property get");
        let value = self.tree.get_value(&self.path)?;

        serde_json::from_value(value).map_err(|e| ClockError::TypeMismatch {
            path: self.path.clone(),
            expected: std::any::type_name::<T>(),
            reason: e.to_string(),
        })
    }
}

impl<T: Serialize> Property<'_, T> {
    /// Replace the current value
    pub fn set(&self, value: T) -> Result<()> {
        trace!(path = %self.path, "property set");
        let value = serde_json::to_value(value)?;
        self.tree.set_value(&self.path, value)
    }
}

impl<T> fmt::Debug for Property<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("path", &self.path)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Split a path into its non-empty components
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Append a child component to a path
pub fn join(base: &str, child: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        child.trim_start_matches('/')
    )
}

/// In-memory property tree over a JSON document
///
/// Objects are branch nodes, everything else is a leaf. Child order is the
/// order in which nodes were inserted.
#[derive(Debug)]
pub struct JsonPropertyTree {
    data: RwLock<Value>,
}

impl JsonPropertyTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    /// Create a tree with initial data
    pub fn from_value(data: Value) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Create a tree from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(data))
    }

    /// Create a tree from CBOR bytes
    pub fn from_cbor(cbor: &[u8]) -> Result<Self> {
        let data: Value =
            ciborium::from_reader(cbor).map_err(|e| ClockError::CborDecode(e.to_string()))?;
        Ok(Self::from_value(data))
    }

    /// Load a tree from a file; `.cbor` files are decoded as CBOR, anything
    /// else as JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;

        let is_cbor = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cbor"));

        if is_cbor {
            Self::from_cbor(&bytes)
        } else {
            let data: Value = serde_json::from_slice(&bytes)?;
            Ok(Self::from_value(data))
        }
    }

    /// Copy of the whole document
    pub fn snapshot(&self) -> Value {
        self.read().clone()
    }

    /// Set a value by path, creating intermediate nodes
    pub fn set_by_path(&self, path: &str, value: Value) -> Result<()> {
        let parts = split_path(path);
        let mut data = self.write();

        let Some((leaf, parents)) = parts.split_last() else {
            *data = value;
            return Ok(());
        };

        let mut current = &mut *data;
        for (i, part) in parents.iter().enumerate() {
            let Value::Object(map) = current else {
                return Err(leaf_in_path(&parts[..i]));
            };
            current = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        match current {
            Value::Object(map) => {
                map.insert(leaf.to_string(), value);
                Ok(())
            }
            _ => Err(leaf_in_path(parents)),
        }
    }

    /// Remove the node at `path`; returns whether anything was removed
    pub fn remove(&self, path: &str) -> bool {
        let parts = split_path(path);
        let mut data = self.write();

        let Some((leaf, parents)) = parts.split_last() else {
            *data = Value::Object(Map::new());
            return true;
        };

        let mut current = &mut *data;
        for part in parents {
            match current.get_mut(*part) {
                Some(v) => current = v,
                None => return false,
            }
        }

        match current {
            // shift_remove keeps sibling order intact
            Value::Object(map) => map.shift_remove(*leaf).is_some(),
            _ => false,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_node<R>(&self, path: &str, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let data = self.read();
        let mut current = Some(&*data);

        for part in split_path(path) {
            current = current.and_then(|node| node.get(part));
        }

        f(current)
    }
}

impl PropertyTree for JsonPropertyTree {
    fn list(&self, path: &str) -> Vec<String> {
        self.with_node(path, |node| match node {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.with_node(path, |node| node.is_some())
    }

    fn get_value(&self, path: &str) -> Result<Value> {
        self.with_node(path, |node| {
            node.cloned()
                .ok_or_else(|| ClockError::PathNotFound(path.to_string()))
        })
    }

    fn set_value(&self, path: &str, value: Value) -> Result<()> {
        self.set_by_path(path, value)
    }
}

impl Default for JsonPropertyTree {
    fn default() -> Self {
        Self::new()
    }
}

fn leaf_in_path(parts: &[&str]) -> ClockError {
    ClockError::TypeMismatch {
        path: format!("/{}", parts.join("/")),
        expected: "branch node",
        reason: "found a leaf value".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TREE: &str = r#"{
        "name": "OctoClock",
        "mboards": {
            "0": {
                "time": 42,
                "sensors": {
                    "using_ref": {"name": "Using Reference", "type": "STRING", "unit": "", "value": "internal"}
                }
            }
        }
    }"#;

    #[test]
    fn test_tree_set_get() {
        let tree = JsonPropertyTree::new();

        tree.set_by_path("/mboards/0/time", Value::from(7)).unwrap();

        let value = tree.get_value("/mboards/0/time").unwrap();
        assert_eq!(value, Value::from(7));
        assert!(tree.exists("/mboards/0"));
    }

    #[test]
    fn test_tree_missing_path() {
        let tree = JsonPropertyTree::from_json(SAMPLE_TREE).unwrap();

        let err = tree.get_value("/mboards/3/time").unwrap_err();
        assert!(err.is_not_found());
        assert!(tree.list("/mboards/3/sensors").is_empty());
        assert!(tree.list("/mboards/0/time").is_empty());
    }

    #[test]
    fn test_tree_list_keeps_insertion_order() {
        let tree = JsonPropertyTree::new();
        for name in ["using_ref", "ext_ref_detected", "gps_detected", "switch_pos"] {
            tree.set_by_path(&format!("/mboards/0/sensors/{name}"), Value::Null)
                .unwrap();
        }

        assert_eq!(
            tree.list("/mboards/0/sensors"),
            vec!["using_ref", "ext_ref_detected", "gps_detected", "switch_pos"]
        );
    }

    #[test]
    fn test_tree_remove() {
        let tree = JsonPropertyTree::from_json(SAMPLE_TREE).unwrap();

        assert!(tree.remove("/mboards/0/sensors/using_ref"));
        assert!(!tree.remove("/mboards/0/sensors/using_ref"));
        assert!(!tree.exists("/mboards/0/sensors/using_ref"));
    }

    #[test]
    fn test_set_below_leaf_fails() {
        let tree = JsonPropertyTree::from_json(SAMPLE_TREE).unwrap();

        let err = tree.set_by_path("/name/child", Value::Null).unwrap_err();
        assert!(matches!(err, ClockError::TypeMismatch { .. }));
    }

    #[test]
    fn test_path_normalization() {
        let tree = JsonPropertyTree::from_json(SAMPLE_TREE).unwrap();

        assert_eq!(tree.get_value("//mboards/0/time/").unwrap(), Value::from(42));
        assert_eq!(join("/mboards/0/", "/sensors"), "/mboards/0/sensors");
    }

    #[test]
    fn test_typed_access() {
        let tree = JsonPropertyTree::from_json(SAMPLE_TREE).unwrap();
        let tree: &dyn PropertyTree = &tree;

        let time = tree.access::<u32>("/mboards/0/time");
        assert_eq!(time.get().unwrap(), 42);

        time.set(43).unwrap();
        assert_eq!(time.get().unwrap(), 43);

        let err = tree.access::<u32>("/name").get().unwrap_err();
        assert!(matches!(err, ClockError::TypeMismatch { .. }));
    }

    #[test]
    fn test_from_cbor() {
        let value: Value = serde_json::from_str(SAMPLE_TREE).unwrap();
        let mut cbor = Vec::new();
        ciborium::into_writer(&value, &mut cbor).unwrap();

        let tree = JsonPropertyTree::from_cbor(&cbor).unwrap();
        assert_eq!(tree.list("/mboards"), vec!["0"]);
    }
}
