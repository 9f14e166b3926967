//! Declarative node definitions.
//!
//! A [`Schema`] is the shape of a node: its name, an optional doc string and
//! an ordered list of fields with their default values. It can be written in
//! code with the builder methods or declared in YAML:
//!
//! ```yaml
//! name: Training
//! doc: Optimizer settings
//! fields:
//!   - key: lr
//!     value: 0.001
//!   - key: betas
//!     kind: tuple
//!     value: [0.9, 0.999]
//!   - key: model
//!     node:
//!       name: Model
//!       fields:
//!         - key: depth
//!           value: 4
//! ```
//!
//! Every call to [`Schema::build`] produces a fresh, independent node.

use super::node::ConfigNode;
use super::setting::{Setting, SettingKind};
use crate::error::{SchemaError, check_key};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

/// Shape of a configuration node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// One declared entry of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub key: String,

    /// Container kind. Implied `node` when `node` is given.
    #[serde(default)]
    pub kind: SettingKind,

    /// Default value. Omitted means null, or an empty sequence for lists
    /// and tuples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Nested node definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Schema>,
}

impl FieldDef {
    fn new(key: impl Into<String>, kind: SettingKind, value: Value) -> Self {
        Self {
            key: key.into(),
            kind,
            value: Some(value),
            node: None,
        }
    }

    fn instantiate(&self, owner: &str) -> Result<Setting, SchemaError> {
        if let Some(schema) = &self.node {
            if self.value.is_some() {
                return Err(SchemaError::invalid_field(
                    owner,
                    &self.key,
                    "declares both a value and a nested node",
                ));
            }
            if !matches!(self.kind, SettingKind::Value | SettingKind::Node) {
                return Err(SchemaError::invalid_field(
                    owner,
                    &self.key,
                    format!("is a nested node and cannot have kind {}", self.kind),
                ));
            }
            return Ok(Setting::from(schema.build()?));
        }

        let value = self.value.clone().unwrap_or(Value::Null);
        match self.kind {
            SettingKind::Value => Ok(Setting::Value(value)),
            SettingKind::List | SettingKind::Tuple => {
                let items = match value {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => {
                        return Err(SchemaError::invalid_field(
                            owner,
                            &self.key,
                            format!(
                                "has kind {} but default {} is not a sequence",
                                self.kind, other
                            ),
                        ));
                    }
                };
                Ok(if self.kind == SettingKind::List {
                    Setting::List(items)
                } else {
                    Setting::Tuple(items)
                })
            }
            SettingKind::Node => Err(SchemaError::invalid_field(
                owner,
                &self.key,
                "has kind node but no nested node definition",
            )),
        }
    }
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            fields: Vec::new(),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declare a plain setting.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(FieldDef::new(key, SettingKind::Value, value.into()));
        self
    }

    pub fn list<I, T>(mut self, key: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.fields.push(FieldDef::new(key, SettingKind::List, Value::Array(items)));
        self
    }

    pub fn tuple<I, T>(mut self, key: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.fields.push(FieldDef::new(key, SettingKind::Tuple, Value::Array(items)));
        self
    }

    /// Declare a nested node.
    pub fn nested(mut self, key: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(FieldDef {
            key: key.into(),
            kind: SettingKind::Node,
            value: None,
            node: Some(schema),
        });
        self
    }

    /// Parse a schema declared in YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Build a new node with every field at its default value.
    pub fn build(&self) -> Result<ConfigNode, SchemaError> {
        check_node_name(&self.name)?;

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            check_key(&self.name, &field.key)?;
            if !seen.insert(field.key.as_str()) {
                return Err(SchemaError::DuplicateKey {
                    node: self.name.clone(),
                    key: field.key.clone(),
                });
            }
            entries.push((field.key.clone(), field.instantiate(&self.name)?));
        }

        trace!(node = %self.name, entries = entries.len(), "built config node");
        Ok(ConfigNode::from_parts(self.name.clone(), self.doc.clone(), entries))
    }
}

fn check_node_name(name: &str) -> Result<(), SchemaError> {
    if name.trim().is_empty() {
        return Err(SchemaError::InvalidKey {
            node: "<unnamed>".to_string(),
            reason: "node name must not be empty".to_string(),
        });
    }
    Ok(())
}
