//! Settree Configuration Library
//!
//! Declaratively-defined, nested configuration nodes with dictionary-style
//! access, shape-preserving merge from plain data and recursive export.

pub mod config;
pub mod error;

pub use config::{ConfigNode, NodeRef, Schema, Setting, SettingKind};
pub use error::SchemaError;
