//! Stable ID newtypes for IR entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `ValueId` cannot be accidentally used where a `BasicBlockId` is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable value identifier, unique within the method that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Stable basic-block identifier, unique within the method that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicBlockId(pub u32);

/// Method identity within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId(pub u32);

/// Compute-graph node identity (runtime layer, §3 "Compute graph").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComputeNodeId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for BasicBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl fmt::Display for ComputeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cn{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let value = ValueId(1);
        let block = BasicBlockId(1);
        assert_eq!(value.0, block.0);
    }

    #[test]
    fn display_formats_are_prefixed() {
        assert_eq!(format!("{}", ValueId(3)), "v3");
        assert_eq!(format!("{}", BasicBlockId(3)), "bb3");
        assert_eq!(format!("{}", MethodId(3)), "m3");
        assert_eq!(format!("{}", ComputeNodeId(3)), "cn3");
    }

    #[test]
    fn serde_roundtrip() {
        let value = ValueId(42);
        let json = serde_json::to_string(&value).unwrap();
        let back: ValueId = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}
