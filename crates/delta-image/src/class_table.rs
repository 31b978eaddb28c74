//! Class table
//!
//! Only the built-in value types are registered; user classes are not part
//! of the language.

use serde::{Deserialize, Serialize};

/// Built-in value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Null,
    Bool,
    Int,
    Double,
    String,
    Array,
    FunctionPointer,
}

impl PrimitiveType {
    /// Registration order in [`ClassTable::with_primitives`]
    pub const ALL: [Self; 7] = [
        Self::Null,
        Self::Bool,
        Self::Int,
        Self::Double,
        Self::String,
        Self::Array,
        Self::FunctionPointer,
    ];

    /// Class index of the type
    #[inline]
    #[must_use]
    pub fn class_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
            Self::Array => "array",
            Self::FunctionPointer => "function",
        }
    }
}

/// One registered class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    pub name: String,
    pub index: usize,
    /// Primitive the class stands for
    pub primitive: Option<PrimitiveType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTable {
    classes: Vec<ClassNode>,
}

impl ClassTable {
    /// Table with every [`PrimitiveType`] registered at its class index
    #[must_use]
    pub fn with_primitives() -> Self {
        let classes = PrimitiveType::ALL
            .iter()
            .map(|ty| ClassNode {
                name: ty.name().to_string(),
                index: ty.class_index(),
                primitive: Some(*ty),
            })
            .collect();
        Self { classes }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ClassNode> {
        self.classes.get(index)
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|class| class.name == name)
    }

    /// Registered name of a primitive, falling back to its built-in name
    #[must_use]
    pub fn type_name(&self, ty: PrimitiveType) -> &str {
        self.get(ty.class_index())
            .map_or(ty.name(), |class| class.name.as_str())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::with_primitives()
    }
}
