//! Value mirrors
//!
//! A mirror copies a runtime value out of memory so it can outlive the lock
//! that guards the runtime: query results, events and dumps all carry
//! [`MirrorData`].

use crate::memory::RuntimeMemory;
use crate::value::StackValue;
use delta_image::Executable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owned snapshot of a runtime value
///
/// Serializes to plain JSON; a function pointer becomes `{"function": name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MirrorData {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<MirrorData>),
    Function { function: String },
}

impl MirrorData {
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for MirrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value:?}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Self::Function { function } => write!(f, "<function {function}>"),
        }
    }
}

/// Reads values out of runtime memory
pub struct RuntimeMirror<'a> {
    memory: &'a RuntimeMemory,
    executable: &'a Executable,
}

impl<'a> RuntimeMirror<'a> {
    #[must_use]
    pub fn new(memory: &'a RuntimeMemory, executable: &'a Executable) -> Self {
        Self { memory, executable }
    }

    /// Deep copy of a value
    #[must_use]
    pub fn data(&self, value: &StackValue) -> MirrorData {
        match value {
            StackValue::Null => MirrorData::Null,
            StackValue::Bool(v) => MirrorData::Bool(*v),
            StackValue::Int(v) => MirrorData::Int(*v),
            StackValue::Double(v) => MirrorData::Double(*v),
            StackValue::String(ptr) => self
                .memory
                .string(*ptr)
                .map_or(MirrorData::Null, |s| MirrorData::String(s.to_string())),
            StackValue::Array(ptr) => self.memory.array(*ptr).map_or(MirrorData::Null, |items| {
                MirrorData::Array(items.iter().map(|item| self.data(item)).collect())
            }),
            StackValue::FunctionPointer(pointer) => MirrorData::Function {
                function: self.function_name(*pointer),
            },
        }
    }

    /// Value of a global slot; `None` if the slot is not allocated
    #[must_use]
    pub fn global(&self, slot: usize) -> Option<MirrorData> {
        self.memory.global(slot).map(|value| self.data(&value))
    }

    /// Value of a top-level symbol; `None` if no such symbol was compiled
    #[must_use]
    pub fn global_by_name(&self, name: &str) -> Option<MirrorData> {
        let symbol = self.executable.global_symbol(name)?;
        self.global(symbol.index)
    }

    /// Name of a value's type as registered in the class table
    #[must_use]
    pub fn type_name(&self, value: &StackValue) -> &str {
        self.executable.class_table.type_name(value.primitive_type())
    }

    /// Every user-visible top-level symbol with its value, in slot order
    #[must_use]
    pub fn globals(&self) -> Vec<(String, MirrorData)> {
        let Some(symbols) = self.executable.symbols(delta_image::CodeBlockId::ROOT) else {
            return Vec::new();
        };
        symbols
            .iter()
            .filter(|s| s.is_user_global())
            .map(|s| (s.name.clone(), self.global(s.index).unwrap_or(MirrorData::Null)))
            .collect()
    }

    /// `name = value` for every user-visible top-level symbol, one per line
    #[must_use]
    pub fn dump_globals(&self) -> String {
        self.globals()
            .into_iter()
            .map(|(name, value)| format!("{name} = {value}\n"))
            .collect()
    }

    fn function_name(&self, pointer: usize) -> String {
        self.executable
            .function_pointers
            .procedure(pointer)
            .and_then(|(block, index)| self.executable.procedure_tables.get(block.index())?.get(index))
            .map_or_else(|| format!("#{pointer}"), |procedure| procedure.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let data = MirrorData::Array(vec![
            MirrorData::Int(1),
            MirrorData::Double(2.0),
            MirrorData::String("x".into()),
            MirrorData::Null,
        ]);
        assert_eq!(data.to_string(), "{1, 2.0, \"x\", null}");
    }

    #[test]
    fn test_json_shape() {
        let data = MirrorData::Array(vec![
            MirrorData::Bool(true),
            MirrorData::Function {
                function: "f".into(),
            },
        ]);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"[true,{"function":"f"}]"#);
        let back: MirrorData = serde_json::from_str("[1, 2.5, null]").unwrap();
        assert_eq!(
            back,
            MirrorData::Array(vec![MirrorData::Int(1), MirrorData::Double(2.5), MirrorData::Null])
        );
    }

    #[test]
    fn test_mirror_reads_heap() {
        let executable = Executable::empty();
        let mut memory = RuntimeMemory::new();
        memory.reallocate(1);
        let s = memory.alloc_string("hi");
        let array = memory.alloc_array(vec![StackValue::Int(4), s]);
        memory.set_global(0, array).unwrap();

        let mirror = RuntimeMirror::new(&memory, &executable);
        assert_eq!(
            mirror.global(0),
            Some(MirrorData::Array(vec![MirrorData::Int(4), MirrorData::String("hi".into())]))
        );
        assert_eq!(mirror.global(1), None);
        assert_eq!(mirror.type_name(&array), "array");
        assert_eq!(mirror.data(&StackValue::FunctionPointer(2)).to_string(), "<function #2>");
    }
}
