//! Errors raised while defining a configuration shape or parsing a document.
//!
//! Runtime access on a [`ConfigNode`](crate::config::ConfigNode) never fails;
//! unknown keys and mismatched data degrade to no-ops. Errors come from
//! building a node from a [`Schema`](crate::config::Schema) and from parsing
//! YAML, either a schema declaration or data passed to
//! [`ConfigNode::update_from_yaml`](crate::config::ConfigNode::update_from_yaml).

use thiserror::Error;

/// Keys reserved for node bookkeeping. They can never be declared as entries.
pub const RESERVED_KEYS: &[&str] = &["__module__", "__annotations__", "__doc__"];

/// Error produced when a schema cannot be turned into a node, or a YAML
/// schema or data document cannot be parsed.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("node {node}: duplicate key '{key}'")]
    DuplicateKey { node: String, key: String },

    #[error("node {node}: key '{key}' is reserved for bookkeeping")]
    ReservedKey { node: String, key: String },

    #[error("node {node}: {reason}")]
    InvalidKey { node: String, reason: String },

    #[error("node {node}: field '{key}' {reason}")]
    InvalidField {
        node: String,
        key: String,
        reason: String,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    pub fn invalid_field(node: &str, key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            node: node.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Check a declared key, returning the error that rejects it, if any.
pub(crate) fn check_key(node: &str, key: &str) -> Result<(), SchemaError> {
    if key.is_empty() {
        return Err(SchemaError::InvalidKey {
            node: node.to_string(),
            reason: "empty key".to_string(),
        });
    }
    if key.contains('.') {
        return Err(SchemaError::InvalidKey {
            node: node.to_string(),
            reason: format!("key '{}' must not contain '.'", key),
        });
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(SchemaError::ReservedKey {
            node: node.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key_accepts_plain_names() {
        assert!(check_key("Root", "learning_rate").is_ok());
        assert!(check_key("Root", "Inner").is_ok());
    }

    #[test]
    fn test_check_key_rejects_reserved() {
        for key in RESERVED_KEYS {
            let err = check_key("Root", key).unwrap_err();
            assert!(matches!(err, SchemaError::ReservedKey { .. }));
        }
    }

    #[test]
    fn test_check_key_rejects_empty_and_dotted() {
        assert!(matches!(
            check_key("Root", ""),
            Err(SchemaError::InvalidKey { .. })
        ));
        let err = check_key("Root", "a.b").unwrap_err();
        assert!(err.to_string().contains("'a.b'"));
    }
}
