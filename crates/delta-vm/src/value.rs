//! Stack values

use delta_image::PrimitiveType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an object on the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeapPtr(pub usize);

impl fmt::Display for HeapPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Value held in a global slot, a frame slot or on the operand stack
///
/// Strings and arrays live on the heap; the value only carries the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum StackValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(HeapPtr),
    Array(HeapPtr),
    /// Entry of the executable's function pointer table
    FunctionPointer(usize),
}

impl StackValue {
    #[must_use]
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Null => PrimitiveType::Null,
            Self::Bool(_) => PrimitiveType::Bool,
            Self::Int(_) => PrimitiveType::Int,
            Self::Double(_) => PrimitiveType::Double,
            Self::String(_) => PrimitiveType::String,
            Self::Array(_) => PrimitiveType::Array,
            Self::FunctionPointer(_) => PrimitiveType::FunctionPointer,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Heap object the value points to, if any
    #[inline]
    #[must_use]
    pub fn heap_ptr(&self) -> Option<HeapPtr> {
        match self {
            Self::String(ptr) | Self::Array(ptr) => Some(*ptr),
            _ => None,
        }
    }

    /// Numeric view for arithmetic and comparisons
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }
}
