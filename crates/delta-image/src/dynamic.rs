//! Tables shared by every code block
//!
//! Variables read before any assignment are declared on the fly and
//! recorded in the [`DynamicVariableTable`]. Calls to functions that are not
//! defined yet are recorded in the [`DynamicFunctionTable`] until a
//! definition resolves them. Functions used as values go through the
//! [`FunctionPointerTable`].

use crate::code_block::CodeBlockId;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Implicitly declared variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicVariable {
    pub name: String,
    pub block: CodeBlockId,
    pub slot: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicVariableTable {
    variables: Vec<DynamicVariable>,
}

impl DynamicVariableTable {
    /// Record an implicit declaration; repeated names are ignored
    pub fn record(&mut self, name: &str, block: CodeBlockId, slot: usize) {
        if !self.contains(name, block) {
            self.variables.push(DynamicVariable {
                name: name.to_string(),
                block,
                slot,
            });
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str, block: CodeBlockId) -> bool {
        self.variables.iter().any(|v| v.name == name && v.block == block)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynamicVariable> {
        self.variables.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Call to a function that had no definition when it was compiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicFunction {
    pub name: String,
    pub procedure_index: usize,
    /// Argument count at the first call site
    pub argc: usize,
    pub resolved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicFunctionTable {
    functions: Vec<DynamicFunction>,
}

impl DynamicFunctionTable {
    /// Record a forward reference; repeated names are ignored
    pub fn record(&mut self, name: &str, procedure_index: usize, argc: usize) {
        if self.functions.iter().all(|f| f.name != name) {
            self.functions.push(DynamicFunction {
                name: name.to_string(),
                procedure_index,
                argc,
                resolved: false,
            });
        }
    }

    /// Mark a forward reference as defined
    ///
    /// Returns `true` if `name` had an unresolved entry.
    pub fn resolve(&mut self, name: &str) -> bool {
        match self.functions.iter_mut().find(|f| f.name == name && !f.resolved) {
            Some(function) => {
                function.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Forward references still waiting for a definition
    pub fn unresolved(&self) -> impl Iterator<Item = &DynamicFunction> {
        self.functions.iter().filter(|f| !f.resolved)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Procedures used as first-class values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPointerTable {
    pointers: IndexSet<(CodeBlockId, usize)>,
}

impl FunctionPointerTable {
    /// Pointer for a procedure, allocating one on first use
    pub fn pointer_to(&mut self, block: CodeBlockId, procedure: usize) -> usize {
        self.pointers.insert_full((block, procedure)).0
    }

    /// Procedure a pointer refers to
    #[must_use]
    pub fn procedure(&self, pointer: usize) -> Option<(CodeBlockId, usize)> {
        self.pointers.get_index(pointer).copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_variables_deduplicate() {
        let mut table = DynamicVariableTable::default();
        table.record("a", CodeBlockId::ROOT, 0);
        table.record("a", CodeBlockId::ROOT, 0);
        table.record("a", CodeBlockId(1), 0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_forward_reference_resolution() {
        let mut table = DynamicFunctionTable::default();
        table.record("f", 0, 2);
        assert_eq!(table.unresolved().count(), 1);
        assert!(table.resolve("f"));
        assert!(!table.resolve("f"));
        assert!(!table.resolve("g"));
        assert_eq!(table.unresolved().count(), 0);
    }

    #[test]
    fn test_function_pointers_are_stable() {
        let mut table = FunctionPointerTable::default();
        let f = table.pointer_to(CodeBlockId::ROOT, 3);
        let g = table.pointer_to(CodeBlockId::ROOT, 1);
        assert_ne!(f, g);
        assert_eq!(table.pointer_to(CodeBlockId::ROOT, 3), f);
        assert_eq!(table.procedure(g), Some((CodeBlockId::ROOT, 1)));
        assert_eq!(table.procedure(9), None);
    }
}
