//! Configuration nodes: named, ordered sets of settings.

use super::setting::{NodeRef, Setting};
use crate::error::SchemaError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, trace, warn};

/// One level of a configuration tree.
///
/// The key set is fixed when the node is built from a
/// [`Schema`](super::Schema); afterwards only values change. Unknown keys
/// are never an error: reads return `None` and writes are ignored.
///
/// `Clone` is shallow. Nested nodes stay shared with the original until the
/// entry holding them is reassigned; use [`ConfigNode::deep_clone`] for a
/// fully independent copy.
///
/// A node must not contain itself, directly or through nesting. Recursive
/// operations on such a cycle do not terminate or panic on a `RefCell`
/// borrow.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    name: String,
    doc: Option<String>,
    entries: Vec<(String, Setting)>,
}

impl ConfigNode {
    /// Assemble a node from entries that were already validated.
    pub(crate) fn from_parts(
        name: String,
        doc: Option<String>,
        entries: Vec<(String, Setting)>,
    ) -> Self {
        Self { name, doc, entries }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared keys in definition order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Setting)> {
        self.entries.iter().map(|(key, setting)| (key.as_str(), setting))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Current value for `key`, or `None` if the key is not declared.
    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Setting> {
        let idx = self.position(key)?;
        Some(&mut self.entries[idx].1)
    }

    /// Nested node bound to `key`, if that entry holds one.
    pub fn node(&self, key: &str) -> Option<NodeRef> {
        self.get(key).and_then(Setting::as_node).cloned()
    }

    /// Overwrite the value for a declared key.
    ///
    /// Undeclared keys are ignored. The value replaces the old one wholesale,
    /// whatever its kind. Returns whether anything was written.
    pub fn set(&mut self, key: &str, value: impl Into<Setting>) -> bool {
        if let Some(slot) = self.get_mut(key) {
            *slot = value.into();
            return true;
        }
        debug!(node = %self.name, key, "ignoring set of undeclared key");
        false
    }

    /// Look up a setting through nested nodes by dotted path (`"model.depth"`).
    pub fn get_path(&self, path: &str) -> Option<Setting> {
        match path.split_once('.') {
            None => self.get(path).cloned(),
            Some((head, rest)) => self.get(head)?.as_node()?.borrow().get_path(rest),
        }
    }

    /// Set a setting through nested nodes by dotted path.
    ///
    /// Writing into a nested node mutates it in place, so a shallow clone
    /// sharing that node observes the change.
    pub fn set_path(&mut self, path: &str, value: impl Into<Setting>) -> bool {
        match path.split_once('.') {
            None => self.set(path, value),
            Some((head, rest)) => match self.node(head) {
                Some(nested) => nested.borrow_mut().set_path(rest, value),
                None => {
                    debug!(node = %self.name, path, "ignoring set of undeclared path");
                    false
                }
            },
        }
    }

    /// Plain ordered mapping of every entry, nested nodes exported recursively.
    pub fn to_dict(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(key, setting)| (key.clone(), setting.to_plain()))
            .collect()
    }

    /// Merge plain data into this node.
    ///
    /// For each key of `data`:
    /// - a nested node entry is updated recursively with the sub-mapping;
    /// - otherwise a non-null value overwrites the entry, re-wrapped into
    ///   the entry's container kind when it is a list or tuple;
    /// - null leaves the entry alone.
    ///
    /// Keys absent from `data` are untouched and keys the node does not
    /// declare are ignored. Data that does not fit an entry's shape (a
    /// scalar for a nested node, a non-array for a sequence) is skipped.
    pub fn update(&mut self, data: &Value) {
        let Some(map) = data.as_object() else {
            if !data.is_null() {
                warn!(node = %self.name, "update data is not a mapping, ignoring");
            }
            return;
        };

        for (key, incoming) in map {
            let Some(idx) = self.position(key) else {
                trace!(node = %self.name, key = %key, "ignoring undeclared key");
                continue;
            };
            let slot = &mut self.entries[idx].1;

            if let Setting::Node(nested) = &*slot {
                if incoming.is_object() {
                    nested.borrow_mut().update(incoming);
                } else if !incoming.is_null() {
                    warn!(
                        node = %self.name,
                        key = %key,
                        "expected a mapping for nested node, ignoring"
                    );
                }
                continue;
            }

            if incoming.is_null() {
                continue;
            }

            match slot.rewrap(incoming) {
                Some(setting) => *slot = setting,
                None => warn!(
                    node = %self.name,
                    key = %key,
                    kind = %slot.kind(),
                    "incoming value does not fit entry, ignoring"
                ),
            }
        }
    }

    /// Apply several data layers in order; later layers take precedence.
    pub fn update_all<I>(&mut self, layers: I)
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<Value>,
    {
        // Scoped so `Borrow` does not shadow `RefCell::borrow` on `NodeRef`s.
        use std::borrow::Borrow;

        for layer in layers {
            self.update(layer.borrow());
        }
    }

    /// Parse a YAML document as plain data and merge it with [`update`].
    ///
    /// [`update`]: ConfigNode::update
    pub fn update_from_yaml(&mut self, yaml: &str) -> Result<(), SchemaError> {
        let data: Value = serde_yaml::from_str(yaml)?;
        self.update(&data);
        Ok(())
    }

    /// Copy that shares no nested node with `self`.
    pub fn deep_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            doc: self.doc.clone(),
            entries: self
                .entries
                .iter()
                .map(|(key, setting)| (key.clone(), setting.deep_clone()))
                .collect(),
        }
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, setting) in &self.entries {
            map.serialize_entry(key, &setting.to_plain())?;
        }
        map.end()
    }
}

/// Same content as [`ConfigNode::to_dict`], with tuples shown as `(..)`.
impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, setting)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: {}", key, setting)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Schema;
    use serde_json::json;
    use std::rc::Rc;

    fn training() -> ConfigNode {
        Schema::new("Training")
            .doc("Optimizer settings")
            .field("lr", 0.01)
            .field("epochs", 10)
            .list("milestones", [3, 6])
            .tuple("betas", [0.9, 0.999])
            .nested(
                "model",
                Schema::new("Model").field("depth", 4).field("act", "relu"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_get_declared_and_undeclared() {
        let node = training();
        assert_eq!(node.get("epochs"), Some(&Setting::from(10)));
        assert_eq!(node.get("missing"), None);
        assert!(node.get("__doc__").is_none());
    }

    #[test]
    fn test_set_undeclared_is_noop() {
        let mut node = training();
        let before = node.to_dict();
        assert!(!node.set("missing", 1));
        assert_eq!(node.to_dict(), before);
        assert!(node.set("epochs", 20));
        assert_eq!(node.get("epochs"), Some(&Setting::from(20)));
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let mut node = training();
        node.set("betas", json!([1, 2]));
        assert_eq!(node.get("betas"), Some(&Setting::Value(json!([1, 2]))));
    }

    #[test]
    fn test_get_mut_in_place() {
        let mut node = training();
        if let Some(Setting::List(items)) = node.get_mut("milestones") {
            items.push(json!(9));
        }
        assert_eq!(node.to_dict()["milestones"], json!([3, 6, 9]));
    }

    #[test]
    fn test_to_dict_is_ordered_and_nested() {
        let node = training();
        let dict = node.to_dict();
        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["lr", "epochs", "milestones", "betas", "model"]);
        assert_eq!(dict["model"], json!({"depth": 4, "act": "relu"}));
        assert_eq!(dict["betas"], json!([0.9, 0.999]));
    }

    #[test]
    fn test_update_partial() {
        let mut node = training();
        node.update(&json!({"lr": 0.5, "unknown": true}));
        let dict = node.to_dict();
        assert_eq!(dict["lr"], json!(0.5));
        assert_eq!(dict["epochs"], json!(10));
        assert!(!dict.contains_key("unknown"));
    }

    #[test]
    fn test_update_null_leaves_entry() {
        let mut node = training();
        node.update(&json!({"lr": null, "model": null}));
        assert_eq!(node.to_dict()["lr"], json!(0.01));
        assert!(node.get("model").unwrap().as_node().is_some());
    }

    #[test]
    fn test_update_keeps_tuple_kind() {
        let mut node = training();
        node.update(&json!({"betas": [0.5, 0.6, 0.7], "milestones": [1]}));
        assert_eq!(node.get("betas"), Some(&Setting::tuple([0.5, 0.6, 0.7])));
        assert_eq!(node.get("milestones"), Some(&Setting::list([1])));
    }

    #[test]
    fn test_update_sequence_with_scalar_is_skipped() {
        let mut node = training();
        node.update(&json!({"milestones": 5}));
        assert_eq!(node.get("milestones"), Some(&Setting::list([3, 6])));
    }

    #[test]
    fn test_update_recurses_into_same_nested_instance() {
        let mut node = training();
        let model = node.node("model").unwrap();
        node.update(&json!({"model": {"depth": 8}}));
        assert!(Rc::ptr_eq(&model, &node.node("model").unwrap()));
        assert_eq!(node.to_dict()["model"], json!({"depth": 8, "act": "relu"}));
    }

    #[test]
    fn test_update_nested_with_scalar_is_skipped() {
        let mut node = training();
        node.update(&json!({"model": 3}));
        assert_eq!(node.to_dict()["model"], json!({"depth": 4, "act": "relu"}));
    }

    #[test]
    fn test_update_non_mapping_is_ignored() {
        let mut node = training();
        let before = node.to_dict();
        node.update(&json!([1, 2]));
        node.update(&Value::Null);
        assert_eq!(node.to_dict(), before);
    }

    #[test]
    fn test_update_all_later_wins() {
        let mut node = training();
        node.update_all([json!({"lr": 1.0, "epochs": 2}), json!({"lr": 2.0})]);
        assert_eq!(node.to_dict()["lr"], json!(2.0));
        assert_eq!(node.to_dict()["epochs"], json!(2));
    }

    #[test]
    fn test_update_all_accepts_borrowed_layers() {
        let mut node = training();
        let layers = vec![json!({"epochs": 4}), json!({"model": {"depth": 2}})];
        node.update_all(&layers);
        assert_eq!(node.get("epochs"), Some(&Setting::from(4)));
        assert_eq!(node.get_path("model.depth"), Some(Setting::from(2)));
        assert_eq!(layers.len(), 2);
    }

    #[test]
    fn test_update_from_yaml() {
        let mut node = training();
        node.update_from_yaml("epochs: 3\nmodel:\n  act: gelu\n").unwrap();
        assert_eq!(node.get_path("model.act"), Some(Setting::from("gelu")));
        assert_eq!(node.get("epochs"), Some(&Setting::from(3)));

        assert!(matches!(
            node.update_from_yaml("epochs: [unclosed"),
            Err(SchemaError::Yaml(_))
        ));
    }

    #[test]
    fn test_paths() {
        let mut node = training();
        assert_eq!(node.get_path("model.depth"), Some(Setting::from(4)));
        assert_eq!(node.get_path("model.width"), None);
        assert_eq!(node.get_path("lr.x"), None);

        assert!(node.set_path("model.depth", 12));
        assert!(!node.set_path("model.width", 1));
        assert!(!node.set_path("nothing.depth", 1));
        assert_eq!(node.to_dict()["model"]["depth"], json!(12));
    }

    #[test]
    fn test_clone_is_shallow() {
        let node = training();
        let mut copy = node.clone();
        copy.set("lr", 1.0);
        copy.set_path("model.depth", 99);
        assert_eq!(node.get("lr"), Some(&Setting::from(0.01)));
        assert_eq!(node.get_path("model.depth"), Some(Setting::from(99)));
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let node = training();
        let mut copy = node.deep_clone();
        copy.set_path("model.depth", 99);
        assert_eq!(node.get_path("model.depth"), Some(Setting::from(4)));
        assert!(!Rc::ptr_eq(
            &node.node("model").unwrap(),
            &copy.node("model").unwrap()
        ));
    }

    #[test]
    fn test_display_expands_nested_nodes() {
        let mut node = training();
        node.set_path("model.depth", 6);
        assert_eq!(
            node.to_string(),
            r#"{"lr": 0.01, "epochs": 10, "milestones": [3, 6], "betas": (0.9, 0.999), "model": {"depth": 6, "act": "relu"}}"#
        );
    }

    #[test]
    fn test_serialize_matches_export() {
        let node = training();
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value, Value::Object(node.to_dict()));
    }

    #[test]
    fn test_metadata() {
        let node = training();
        assert_eq!(node.name(), "Training");
        assert_eq!(node.doc(), Some("Optimizer settings"));
        assert_eq!(node.len(), 5);
        assert!(!node.is_empty());
        assert!(node.contains_key("model"));
        assert_eq!(node.keys().count(), 5);
        assert_eq!(node.iter().next().map(|(k, _)| k), Some("lr"));
    }
}
