//! Heap for reference values
//!
//! Objects are never freed while an execution is running. Between
//! executions the runner calls [`Heap::collect`] with the global slots as
//! roots, and unreachable objects go to a free list.

use crate::value::{HeapPtr, StackValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeapObject {
    String(String),
    Array(Vec<StackValue>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Heap {
    objects: Vec<Option<HeapObject>>,
    free: Vec<usize>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, reusing a freed cell when there is one
    pub fn alloc(&mut self, object: HeapObject) -> HeapPtr {
        if let Some(index) = self.free.pop() {
            self.objects[index] = Some(object);
            HeapPtr(index)
        } else {
            self.objects.push(Some(object));
            HeapPtr(self.objects.len() - 1)
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, ptr: HeapPtr) -> Option<&HeapObject> {
        self.objects.get(ptr.0).and_then(Option::as_ref)
    }

    /// String behind `ptr`, if it points to one
    #[must_use]
    pub fn string(&self, ptr: HeapPtr) -> Option<&str> {
        match self.get(ptr)? {
            HeapObject::String(value) => Some(value),
            HeapObject::Array(_) => None,
        }
    }

    /// Elements behind `ptr`, if it points to an array
    #[must_use]
    pub fn array(&self, ptr: HeapPtr) -> Option<&[StackValue]> {
        match self.get(ptr)? {
            HeapObject::Array(items) => Some(items),
            HeapObject::String(_) => None,
        }
    }

    /// Live objects
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.objects.len() - self.free.len()
    }

    /// Free every object not reachable from `roots`
    ///
    /// Returns the number of objects freed.
    pub fn collect<'a>(&mut self, roots: impl IntoIterator<Item = &'a StackValue>) -> usize {
        let mut marked = vec![false; self.objects.len()];
        let mut pending: Vec<HeapPtr> = roots.into_iter().filter_map(StackValue::heap_ptr).collect();

        while let Some(ptr) = pending.pop() {
            let Some(mark) = marked.get_mut(ptr.0) else {
                continue;
            };
            if *mark {
                continue;
            }
            *mark = true;
            if let Some(HeapObject::Array(items)) = self.get(ptr) {
                pending.extend(items.iter().filter_map(StackValue::heap_ptr));
            }
        }

        let mut freed = 0;
        for (index, reachable) in marked.into_iter().enumerate() {
            if !reachable && self.objects[index].take().is_some() {
                self.free.push(index);
                freed += 1;
            }
        }
        if freed > 0 {
            tracing::debug!(freed, live = self.live_count(), "heap collected");
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_read() {
        let mut heap = Heap::new();
        let s = heap.alloc(HeapObject::String("hi".into()));
        let a = heap.alloc(HeapObject::Array(vec![StackValue::Int(1), StackValue::String(s)]));
        assert_eq!(heap.string(s), Some("hi"));
        assert_eq!(heap.array(a).unwrap().len(), 2);
        assert_eq!(heap.string(a), None);
        assert_eq!(heap.live_count(), 2);
    }

    #[test]
    fn test_collect_keeps_reachable_objects() {
        let mut heap = Heap::new();
        let inner = heap.alloc(HeapObject::String("kept".into()));
        let outer = heap.alloc(HeapObject::Array(vec![StackValue::String(inner)]));
        let garbage = heap.alloc(HeapObject::String("dropped".into()));

        let roots = [StackValue::Array(outer), StackValue::Int(3)];
        assert_eq!(heap.collect(&roots), 1);
        assert_eq!(heap.string(inner), Some("kept"));
        assert!(heap.get(garbage).is_none());

        let reused = heap.alloc(HeapObject::String("new".into()));
        assert_eq!(reused, garbage);
    }
}
