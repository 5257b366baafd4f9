// Copyright 2025 the chassis authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A doubly-linked list that recycles the storage of removed nodes.
//!
//! Nodes live in an arena of slots addressed by index rather than behind
//! raw pointers. Removing a node drops its value out of the slot and parks
//! the slot index on a free list; the next insertion pops that list before
//! growing the arena, so steady-state insert/remove traffic (handler
//! chains, task queues) causes no allocation churn.

/// A copyable handle to a node in a [`RecyclableList`].
///
/// Handles stay valid until their node is removed or the list is cleared.
/// A stale handle is harmless: lookups through it simply return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug)]
enum Entry<T> {
    Occupied(Node<T>),
    Free,
}

/// A doubly-linked list whose removed nodes are cached and reused for
/// future insertions.
///
/// Enumeration is forward-only and single-pass. Structural mutation while
/// iterating is ruled out by the borrow checker; the `NodeId` cursor
/// methods ([`next`](Self::next), [`prev`](Self::prev)) are the escape
/// hatch for walks that interleave with mutation, and tolerate the node
/// under the cursor being removed mid-walk.
#[derive(Debug)]
pub struct RecyclableList<T> {
    slots: Vec<Entry<T>>,
    /// Stack of recycled slot indices, popped before the arena grows.
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> RecyclableList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Returns the number of live nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no live nodes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of recycled slots waiting to be reused.
    #[inline]
    #[must_use]
    pub fn cached_node_count(&self) -> usize {
        self.free.len()
    }

    /// Returns the first node, or `None` if the list is empty.
    #[inline]
    #[must_use]
    pub fn front(&self) -> Option<NodeId> {
        self.head
    }

    /// Returns the last node, or `None` if the list is empty.
    #[inline]
    #[must_use]
    pub fn back(&self) -> Option<NodeId> {
        self.tail
    }

    /// Returns a reference to the value of `id`, or `None` if the handle
    /// is stale.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.0) {
            Some(Entry::Occupied(node)) => Some(&node.value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value of `id`, or `None` if the
    /// handle is stale.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.slots.get_mut(id.0) {
            Some(Entry::Occupied(node)) => Some(&mut node.value),
            _ => None,
        }
    }

    /// Returns the node after `id`, or `None` at the end of the list or
    /// for a stale handle.
    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        match self.slots.get(id.0) {
            Some(Entry::Occupied(node)) => node.next,
            _ => None,
        }
    }

    /// Returns the node before `id`, or `None` at the front of the list or
    /// for a stale handle.
    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        match self.slots.get(id.0) {
            Some(Entry::Occupied(node)) => node.prev,
            _ => None,
        }
    }

    /// Inserts a value at the front of the list.
    pub fn push_front(&mut self, value: T) -> NodeId {
        let id = self.acquire_slot(value, None, self.head);
        match self.head {
            Some(old) => self.node_mut(old).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    /// Inserts a value at the back of the list.
    pub fn push_back(&mut self, value: T) -> NodeId {
        let id = self.acquire_slot(value, self.tail, None);
        match self.tail {
            Some(old) => self.node_mut(old).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Inserts a value immediately before an existing node.
    ///
    /// # Panics
    ///
    /// Panics if `anchor` is stale.
    pub fn insert_before(&mut self, anchor: NodeId, value: T) -> NodeId {
        let prev = self.expect_occupied(anchor).prev;
        match prev {
            None => self.push_front(value),
            Some(prev) => {
                let id = self.acquire_slot(value, Some(prev), Some(anchor));
                self.node_mut(prev).next = Some(id);
                self.node_mut(anchor).prev = Some(id);
                self.len += 1;
                id
            }
        }
    }

    /// Inserts a value immediately after an existing node.
    ///
    /// # Panics
    ///
    /// Panics if `anchor` is stale.
    pub fn insert_after(&mut self, anchor: NodeId, value: T) -> NodeId {
        let next = self.expect_occupied(anchor).next;
        match next {
            None => self.push_back(value),
            Some(next) => {
                let id = self.acquire_slot(value, Some(anchor), Some(next));
                self.node_mut(anchor).next = Some(id);
                self.node_mut(next).prev = Some(id);
                self.len += 1;
                id
            }
        }
    }

    /// Removes the node `id` and returns its value, recycling the slot.
    ///
    /// Returns `None` if the handle is stale.
    pub fn remove_node(&mut self, id: NodeId) -> Option<T> {
        let entry = self.slots.get_mut(id.0)?;
        if matches!(entry, Entry::Free) {
            return None;
        }
        let node = match std::mem::replace(entry, Entry::Free) {
            Entry::Occupied(node) => node,
            Entry::Free => unreachable!(),
        };

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    /// Removes the first node from the front, if any.
    pub fn pop_front(&mut self) -> Option<T> {
        self.head.and_then(|id| self.remove_node(id))
    }

    /// Removes the last node from the back, if any.
    pub fn pop_back(&mut self) -> Option<T> {
        self.tail.and_then(|id| self.remove_node(id))
    }

    /// Removes the first node whose value equals `value`.
    ///
    /// Returns `true` if a node was removed.
    pub fn remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            if self.get(id).is_some_and(|v| v == value) {
                self.remove_node(id);
                return true;
            }
            cursor = self.next(id);
        }
        false
    }

    /// Returns `true` if any live node holds a value equal to `value`.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|v| v == value)
    }

    /// Removes every live node, recycling all slots into the cache.
    pub fn clear(&mut self) {
        for entry in &mut self.slots {
            *entry = Entry::Free;
        }
        self.free.clear();
        self.free.extend((0..self.slots.len()).rev());
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Empties the recycle cache without touching the live list.
    ///
    /// Trailing arena slots are handed back to the allocator. Interior
    /// slots cannot be released without invalidating live handles; they
    /// stay parked until the next [`clear`](Self::clear) sweeps them back
    /// into the cache.
    pub fn clear_cached_nodes(&mut self) {
        self.free.sort_unstable_by(|a, b| b.cmp(a));
        for idx in self.free.drain(..) {
            if idx + 1 == self.slots.len() {
                self.slots.pop();
            }
        }
    }

    /// Returns a forward iterator over the live values.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn acquire_slot(&mut self, value: T, prev: Option<NodeId>, next: Option<NodeId>) -> NodeId {
        let node = Node { value, prev, next };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Entry::Occupied(node);
                NodeId(idx)
            }
            None => {
                self.slots.push(Entry::Occupied(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.slots.get_mut(id.0) {
            Some(Entry::Occupied(node)) => node,
            _ => panic!("node handle {id:?} does not refer to a live node"),
        }
    }

    fn expect_occupied(&self, id: NodeId) -> &Node<T> {
        match self.slots.get(id.0) {
            Some(Entry::Occupied(node)) => node,
            _ => panic!("node handle {id:?} does not refer to a live node"),
        }
    }
}

impl<T> Default for RecyclableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward iterator over a [`RecyclableList`].
pub struct Iter<'a, T> {
    list: &'a RecyclableList<T>,
    cursor: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.cursor = self.list.next(id);
        self.list.get(id)
    }
}

impl<'a, T> IntoIterator for &'a RecyclableList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(list: &RecyclableList<i32>) -> Vec<i32> {
        list.iter().copied().collect()
    }

    #[test]
    fn push_and_iterate_in_order() {
        let mut list = RecyclableList::new();
        list.push_back(2);
        list.push_back(3);
        list.push_front(1);
        assert_eq!(collect(&list), vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn insert_relative_to_anchor() {
        let mut list = RecyclableList::new();
        let a = list.push_back(1);
        let c = list.push_back(3);
        list.insert_after(a, 2);
        list.insert_before(c, 25);
        assert_eq!(collect(&list), vec![1, 2, 25, 3]);
    }

    #[test]
    fn removed_slots_are_recycled() {
        let mut list = RecyclableList::new();
        let a = list.push_back(1);
        list.push_back(2);
        assert_eq!(list.cached_node_count(), 0);

        list.remove_node(a);
        assert_eq!(list.cached_node_count(), 1);

        // The next insertion reuses the cached slot instead of growing.
        let b = list.push_back(3);
        assert_eq!(list.cached_node_count(), 0);
        assert_eq!(b, a);
        assert_eq!(collect(&list), vec![2, 3]);
    }

    #[test]
    fn remove_by_value_takes_first_match() {
        let mut list = RecyclableList::new();
        list.push_back(1);
        list.push_back(2);
        list.push_back(1);
        assert!(list.remove(&1));
        assert_eq!(collect(&list), vec![2, 1]);
        assert!(!list.remove(&9));
    }

    #[test]
    fn stale_handles_resolve_to_none() {
        let mut list = RecyclableList::new();
        let a = list.push_back(1);
        list.remove_node(a);
        assert!(list.get(a).is_none());
        assert!(list.next(a).is_none());
        assert!(list.remove_node(a).is_none());
    }

    #[test]
    fn pop_front_and_back() {
        let mut list = RecyclableList::new();
        assert_eq!(list.pop_front(), None);
        list.push_back(1);
        list.push_back(2);
        list.push_back(3);
        assert_eq!(list.pop_front(), Some(1));
        assert_eq!(list.pop_back(), Some(3));
        assert_eq!(collect(&list), vec![2]);
    }

    #[test]
    fn clear_keeps_slots_as_cache() {
        let mut list = RecyclableList::new();
        list.push_back(1);
        list.push_back(2);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.cached_node_count(), 2);

        // Reinsertion consumes the cache.
        list.push_back(5);
        assert_eq!(list.cached_node_count(), 1);
        assert_eq!(collect(&list), vec![5]);
    }

    #[test]
    fn clear_cached_nodes_leaves_live_list_intact() {
        let mut list = RecyclableList::new();
        list.push_back(1);
        let b = list.push_back(2);
        list.push_back(3);
        list.remove_node(b);
        assert_eq!(list.cached_node_count(), 1);

        list.clear_cached_nodes();
        assert_eq!(list.cached_node_count(), 0);
        assert_eq!(collect(&list), vec![1, 3]);
    }

    #[test]
    fn cursor_walk_survives_removal_of_current_node() {
        let mut list = RecyclableList::new();
        list.push_back(1);
        let b = list.push_back(2);
        list.push_back(3);

        let mut seen = Vec::new();
        let mut cursor = list.front();
        while let Some(id) = cursor {
            let next = list.next(id);
            if let Some(v) = list.get(id) {
                seen.push(*v);
            }
            if id == b {
                list.remove_node(id);
            }
            cursor = next;
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(collect(&list), vec![1, 3]);
    }

    #[test]
    fn contains_checks_live_nodes_only() {
        let mut list = RecyclableList::new();
        let a = list.push_back(7);
        assert!(list.contains(&7));
        list.remove_node(a);
        assert!(!list.contains(&7));
    }
}
