//! Stored field values with provenance

use bail_schema::Value;
use serde::{Deserialize, Serialize};

/// Who filled a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilledBy {
    /// Set through the mutation protocol
    User,
    /// Cleared; the node is a tombstone
    Unset,
}

/// Current value of one field plus write metadata
///
/// Serialized as `{value, filledBy, lastModifiedVersion}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueNode {
    value: Option<Value>,
    filled_by: FilledBy,
    last_modified_version: u64,
}

impl ValueNode {
    /// Node holding a user-supplied value
    #[inline]
    #[must_use]
    pub fn user(value: Value, version: u64) -> Self {
        Self {
            value: Some(value),
            filled_by: FilledBy::User,
            last_modified_version: version,
        }
    }

    /// Tombstone recording when the field was cleared
    #[inline]
    #[must_use]
    pub fn cleared(version: u64) -> Self {
        Self {
            value: None,
            filled_by: FilledBy::Unset,
            last_modified_version: version,
        }
    }

    /// Current value, `None` for tombstones
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Provenance
    #[inline]
    #[must_use]
    pub fn filled_by(&self) -> FilledBy {
        self.filled_by
    }

    /// State version of the last write
    #[inline]
    #[must_use]
    pub fn last_modified_version(&self) -> u64 {
        self.last_modified_version
    }

    /// Provenance agrees with the presence of a value
    #[inline]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        matches!(
            (&self.value, self.filled_by),
            (Some(_), FilledBy::User) | (None, FilledBy::Unset)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_serializes_camel_case() {
        let node = ValueNode::user(Value::Boolean(true), 3);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["filledBy"], "user");
        assert_eq!(json["lastModifiedVersion"], 3);
        assert_eq!(json["value"]["type"], "boolean");

        let tomb = serde_json::to_value(ValueNode::cleared(4)).unwrap();
        assert!(tomb["value"].is_null());
        assert_eq!(tomb["filledBy"], "unset");
    }

    #[test]
    fn consistency() {
        assert!(ValueNode::user(Value::Text("x".into()), 1).is_consistent());
        assert!(ValueNode::cleared(1).is_consistent());
        let bad: ValueNode = serde_json::from_value(serde_json::json!({
            "value": null, "filledBy": "user", "lastModifiedVersion": 1
        }))
        .unwrap();
        assert!(!bad.is_consistent());
    }
}
