//! Hierarchical configuration nodes.
//!
//! A configuration tree is made of [`ConfigNode`]s, each built from a
//! [`Schema`] that fixes its keys and default values. Values are changed with
//! [`ConfigNode::set`] or merged in bulk from plain data with
//! [`ConfigNode::update`], and exported back to plain data with
//! [`ConfigNode::to_dict`].
//!
//! ## Merge Strategy
//! - Nested nodes: merged key by key, never replaced
//! - Lists and tuples: replaced, keeping the entry's container kind
//! - Scalars: replaced
//! - Null or missing data: entry left untouched
//! - Undeclared keys: ignored
//!
//! Plain data is `serde_json::Value`; mappings keep insertion order.

mod node;
mod schema;
mod setting;

pub use node::ConfigNode;
pub use schema::{FieldDef, Schema};
pub use setting::{NodeRef, Setting, SettingKind};
