//! Values bound to configuration entries.

use super::node::ConfigNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a nested node.
///
/// A node and its shallow clone hold the same handle until the entry is
/// reassigned on one of them.
pub type NodeRef = Rc<RefCell<ConfigNode>>;

/// Container kind of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    /// Scalar or any other plain data, assigned as-is.
    #[default]
    Value,
    /// Growable sequence.
    List,
    /// Fixed sequence. Updates re-wrap incoming arrays as tuples.
    Tuple,
    /// Nested configuration node.
    Node,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingKind::Value => write!(f, "value"),
            SettingKind::List => write!(f, "list"),
            SettingKind::Tuple => write!(f, "tuple"),
            SettingKind::Node => write!(f, "node"),
        }
    }
}

/// The value currently bound to a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Value(Value),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Node(NodeRef),
}

impl Setting {
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Setting::List(items.into_iter().map(Into::into).collect())
    }

    pub fn tuple<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Setting::Tuple(items.into_iter().map(Into::into).collect())
    }

    pub fn kind(&self) -> SettingKind {
        match self {
            Setting::Value(_) => SettingKind::Value,
            Setting::List(_) => SettingKind::List,
            Setting::Tuple(_) => SettingKind::Tuple,
            Setting::Node(_) => SettingKind::Node,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Setting::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Items of a list or tuple setting.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Setting::List(items) | Setting::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            Setting::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Plain data snapshot. Nested nodes are exported recursively and both
    /// sequence kinds become arrays.
    pub fn to_plain(&self) -> Value {
        match self {
            Setting::Value(value) => value.clone(),
            Setting::List(items) | Setting::Tuple(items) => Value::Array(items.clone()),
            Setting::Node(node) => Value::Object(node.borrow().to_dict()),
        }
    }

    /// Wrap incoming plain data into this setting's container kind.
    ///
    /// Returns `None` when the data does not fit: a sequence setting given a
    /// non-array, or a nested node (which is merged, never replaced).
    pub(crate) fn rewrap(&self, incoming: &Value) -> Option<Setting> {
        match self {
            Setting::Value(_) => Some(Setting::Value(incoming.clone())),
            Setting::List(_) => incoming.as_array().map(|items| Setting::List(items.clone())),
            Setting::Tuple(_) => incoming.as_array().map(|items| Setting::Tuple(items.clone())),
            Setting::Node(_) => None,
        }
    }

    /// Copy that shares no nested node with `self`.
    pub fn deep_clone(&self) -> Self {
        match self {
            Setting::Node(node) => Setting::from(node.borrow().deep_clone()),
            other => other.clone(),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Value(value) => write!(f, "{}", value),
            Setting::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Setting::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, ")")
            }
            Setting::Node(node) => write!(f, "{}", node.borrow()),
        }
    }
}

impl From<Value> for Setting {
    fn from(value: Value) -> Self {
        Setting::Value(value)
    }
}

impl From<ConfigNode> for Setting {
    fn from(node: ConfigNode) -> Self {
        Setting::Node(Rc::new(RefCell::new(node)))
    }
}

impl From<NodeRef> for Setting {
    fn from(node: NodeRef) -> Self {
        Setting::Node(node)
    }
}

macro_rules! setting_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Setting {
                fn from(value: $ty) -> Self {
                    Setting::Value(Value::from(value))
                }
            }
        )*
    };
}

setting_from_scalar!(bool, i32, i64, u32, u64, f64, &str, String);
