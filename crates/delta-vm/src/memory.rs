//! Runtime memory
//!
//! Global slot `i` belongs to the top-level symbol with index `i`. The slot
//! count only grows within a session: a deleted symbol keeps its slot and
//! nothing else is ever placed there.

use crate::error::ExecuteFault;
use crate::heap::{Heap, HeapObject};
use crate::value::{HeapPtr, StackValue};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct RuntimeMemory {
    globals: Vec<StackValue>,
    heap: Heap,
    modified: BTreeSet<usize>,
}

impl RuntimeMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow global storage by `additional` null slots
    pub fn reallocate(&mut self, additional: usize) {
        if additional == 0 {
            return;
        }
        let total = self.globals.len() + additional;
        self.globals.resize(total, StackValue::Null);
        tracing::debug!(additional, total, "global memory grown");
    }

    /// Allocated global slots
    #[inline]
    #[must_use]
    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    #[inline]
    #[must_use]
    pub fn global(&self, slot: usize) -> Option<StackValue> {
        self.globals.get(slot).copied()
    }

    pub fn globals(&self) -> &[StackValue] {
        &self.globals
    }

    /// Store a global
    ///
    /// Returns whether the stored value actually changed (deep comparison);
    /// changed slots join the modified set.
    ///
    /// # Errors
    /// Returns [`ExecuteFault::UnallocatedGlobal`] for a slot past the end.
    pub fn set_global(&mut self, slot: usize, value: StackValue) -> Result<bool, ExecuteFault> {
        let allocated = self.globals.len();
        let current = self
            .globals
            .get(slot)
            .copied()
            .ok_or(ExecuteFault::UnallocatedGlobal { slot, allocated })?;

        if self.values_equal(&current, &value) {
            return Ok(false);
        }
        self.globals[slot] = value;
        self.modified.insert(slot);
        Ok(true)
    }

    /// Null every slot from `start` on without recording changes
    ///
    /// Used when a failed run is rolled back and symbols from `start` on no
    /// longer exist; whatever gets those slots next starts from null.
    pub fn clear_globals_from(&mut self, start: usize) {
        for (slot, value) in self.globals.iter_mut().enumerate().skip(start) {
            *value = StackValue::Null;
            self.modified.remove(&slot);
        }
    }

    /// Slots whose value changed since the last reset
    #[inline]
    #[must_use]
    pub fn modified_symbols(&self) -> &BTreeSet<usize> {
        &self.modified
    }

    /// Clear the per-run modified set
    pub fn reset_modified_symbols(&mut self) {
        self.modified.clear();
    }

    #[inline]
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn alloc_string(&mut self, value: impl Into<String>) -> StackValue {
        StackValue::String(self.heap.alloc(HeapObject::String(value.into())))
    }

    pub fn alloc_array(&mut self, items: Vec<StackValue>) -> StackValue {
        StackValue::Array(self.heap.alloc(HeapObject::Array(items)))
    }

    #[inline]
    #[must_use]
    pub fn string(&self, ptr: HeapPtr) -> Option<&str> {
        self.heap.string(ptr)
    }

    #[inline]
    #[must_use]
    pub fn array(&self, ptr: HeapPtr) -> Option<&[StackValue]> {
        self.heap.array(ptr)
    }

    /// Free heap objects no global can reach
    pub fn collect_garbage(&mut self) -> usize {
        self.heap.collect(&self.globals)
    }

    /// Structural equality; NaN equals NaN so a NaN store is not a change
    #[must_use]
    pub fn values_equal(&self, a: &StackValue, b: &StackValue) -> bool {
        match (a, b) {
            (StackValue::Null, StackValue::Null) => true,
            (StackValue::Bool(x), StackValue::Bool(y)) => x == y,
            (StackValue::Int(x), StackValue::Int(y)) => x == y,
            (StackValue::Double(x), StackValue::Double(y)) => x == y || (x.is_nan() && y.is_nan()),
            (StackValue::FunctionPointer(x), StackValue::FunctionPointer(y)) => x == y,
            (StackValue::String(x), StackValue::String(y)) => {
                x == y || self.string(*x) == self.string(*y)
            }
            (StackValue::Array(x), StackValue::Array(y)) => {
                if x == y {
                    return true;
                }
                match (self.array(*x), self.array(*y)) {
                    (Some(xs), Some(ys)) => {
                        xs.len() == ys.len()
                            && xs.iter().zip(ys).all(|(p, q)| self.values_equal(p, q))
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }
}
