use std::{cmp::Ordering, fmt};

use crate::error::Error;

mod cursor;
mod search;


pub use cursor::{Cursor, CursorMut, Position};

type NodeId = usize;

// Slot 0 is the end marker. It is allocated with the list, never holds a
// value and is never handed to the free list.
const SENTINEL: NodeId = 0;

#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    prev: Option<NodeId>,
    // The sentinel's successor is itself.
    next: NodeId,
    // Bumped every time the slot is released, so positions taken before the
    // release stop resolving.
    generation: u32,
}

/// A doubly linked list whose nodes live in an arena of slots addressed by
/// index.
///
/// Traversal order is insertion order until `sort_by` (or `sort`) reorders
/// values. Nodes never move between slots, and sorting swaps values rather
/// than links, so a node keeps its identity across a sort while the value it
/// holds may change.
pub struct OrderedList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
    head: NodeId,
    len: usize,
}

impl<T> OrderedList<T> {
    pub fn new() -> Self {
        OrderedList {
            nodes: vec![Node {
                value: None,
                prev: None,
                next: SENTINEL,
                generation: 0,
            }],
            free: Vec::new(),
            head: SENTINEL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cursor at the first element, or at the end marker if the list is empty.
    pub fn begin(&self) -> Cursor<'_, T> {
        Cursor::new(self, self.head)
    }

    /// Cursor at the end marker. It never denotes an element.
    pub fn end(&self) -> Cursor<'_, T> {
        Cursor::new(self, SENTINEL)
    }

    pub fn front(&self) -> Option<&T> {
        self.nodes[self.head].value.as_ref()
    }

    pub fn back(&self) -> Option<&T> {
        self.nodes[SENTINEL]
            .prev
            .and_then(|id| self.nodes[id].value.as_ref())
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            front: self.head,
            back: SENTINEL,
            remaining: self.len,
        }
    }

    /// Resolves a position taken from an earlier cursor. Fails if the node
    /// it referred to has been removed since.
    pub fn cursor_at(&self, pos: Position) -> Result<Cursor<'_, T>, Error> {
        self.check_position(pos)?;
        Ok(Cursor::new(self, pos.node))
    }

    pub fn cursor_mut_at(&mut self, pos: Position) -> Result<CursorMut<'_, T>, Error> {
        self.check_position(pos)?;
        Ok(CursorMut::new(self, pos.node))
    }

    fn check_position(&self, pos: Position) -> Result<(), Error> {
        match self.nodes.get(pos.node) {
            Some(node)
                if node.generation == pos.generation
                    && (pos.node == SENTINEL || node.value.is_some()) =>
            {
                Ok(())
            }
            _ => Err(Error::InvalidPrecondition(
                "position refers to a node that is no longer in the list",
            )),
        }
    }

    fn position_of(&self, node: NodeId) -> Position {
        Position {
            node,
            generation: self.nodes[node].generation,
        }
    }

    fn alloc(&mut self, value: T) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                let node = &mut self.nodes[id];
                node.value = Some(value);
                node.prev = None;
                node.next = SENTINEL;
                id
            }
            None => {
                self.nodes.push(Node {
                    value: Some(value),
                    prev: None,
                    next: SENTINEL,
                    generation: 0,
                });
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Option<T> {
        let node = &mut self.nodes[id];
        node.prev = None;
        node.next = SENTINEL;
        node.generation = node.generation.wrapping_add(1);
        self.free.push(id);
        node.value.take()
    }

    /// Links `value` in as the new last element.
    pub fn append(&mut self, value: T) {
        let id = self.alloc(value);
        let tail = self.nodes[SENTINEL].prev;
        self.nodes[id].prev = tail;
        self.nodes[id].next = SENTINEL;
        self.nodes[SENTINEL].prev = Some(id);
        match tail {
            Some(t) => self.nodes[t].next = id,
            None => self.head = id,
        }
        self.len += 1;
    }

    fn unlink(&mut self, id: NodeId) -> Option<T> {
        debug_assert_ne!(id, SENTINEL);
        let prev = self.nodes[id].prev;
        let next = self.nodes[id].next;
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        self.nodes[next].prev = prev;
        self.len -= 1;
        self.release(id)
    }

    /// Removes every element matching `pred` in a single pass and returns how
    /// many were removed.
    pub fn remove_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        let mut id = self.head;
        while id != SENTINEL {
            let next = self.nodes[id].next;
            if self.nodes[id].value.as_ref().is_some_and(&mut pred) {
                self.unlink(id);
                removed += 1;
            }
            id = next;
        }
        removed
    }

    pub fn remove_by_equality<K>(&mut self, key: &K) -> usize
    where
        T: PartialEq<K>,
        K: ?Sized,
    {
        self.remove_where(|v| v == key)
    }

    /// First element, scanning from the front, that satisfies `pred`.
    pub fn find_linear<F>(&self, mut pred: F) -> Option<Cursor<'_, T>>
    where
        F: FnMut(&T) -> bool,
    {
        self.find_node(&mut pred).map(|id| Cursor::new(self, id))
    }

    pub fn find_linear_mut<F>(&mut self, mut pred: F) -> Option<CursorMut<'_, T>>
    where
        F: FnMut(&T) -> bool,
    {
        let id = self.find_node(&mut pred)?;
        Some(CursorMut::new(self, id))
    }

    fn find_node<F>(&self, pred: &mut F) -> Option<NodeId>
    where
        F: FnMut(&T) -> bool,
    {
        let mut id = self.head;
        while id != SENTINEL {
            if self.nodes[id].value.as_ref().is_some_and(&mut *pred) {
                return Some(id);
            }
            id = self.nodes[id].next;
        }
        None
    }

    /// Bound-search for `key`.
    ///
    /// The list must already be ascending under `cmp`; otherwise the result
    /// is unspecified (a wrong element or `None`), though the list itself is
    /// left untouched. Returns the first element that is not less than `key`
    /// if that element compares equal to it.
    ///
    /// Positions are re-derived by walking links on every probe, so this
    /// costs time linear in the length of the list despite bisecting.
    pub fn find_sorted_by<K, F>(&self, key: &K, mut cmp: F) -> Option<Cursor<'_, T>>
    where
        K: ?Sized,
        F: FnMut(&T, &K) -> Ordering,
    {
        let lower = search::lower_bound(self.begin(), self.end(), key, &mut cmp);
        match lower.value() {
            Some(v) if cmp(v, key) == Ordering::Equal => Some(lower),
            _ => None,
        }
    }

    /// Like `find_sorted_by`, but also returns the upper bound: the first
    /// cursor whose element is greater than `key`, or `end()`.
    pub fn find_range_sorted_by<K, F>(
        &self,
        key: &K,
        mut cmp: F,
    ) -> Option<(Cursor<'_, T>, Cursor<'_, T>)>
    where
        K: ?Sized,
        F: FnMut(&T, &K) -> Ordering,
    {
        let lower = self.find_sorted_by(key, &mut cmp)?;
        let mut upper = search::upper_bound(self.begin(), self.end(), key, &mut cmp);
        // The bisection never probes the last element, so it lands there
        // both when the last element is greater than the key and when it is
        // still part of the matching run.
        if upper.value().is_some_and(|v| cmp(v, key) != Ordering::Greater) {
            upper = self.end();
        }
        Some((lower, upper))
    }

    pub fn find_sorted(&self, key: &T) -> Option<Cursor<'_, T>>
    where
        T: Ord,
    {
        self.find_sorted_by(key, T::cmp)
    }

    pub fn find_range_sorted(&self, key: &T) -> Option<(Cursor<'_, T>, Cursor<'_, T>)>
    where
        T: Ord,
    {
        self.find_range_sorted_by(key, T::cmp)
    }

    /// Sorts ascending under `cmp` by swapping values between nodes; links
    /// are never touched. Quadratic, and not stable across equal elements.
    pub fn sort_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut i = self.head;
        while i != SENTINEL {
            let mut j = self.head;
            while j != i {
                let less = match (&self.nodes[i].value, &self.nodes[j].value) {
                    (Some(a), Some(b)) => cmp(a, b) == Ordering::Less,
                    _ => false,
                };
                if less {
                    self.swap_node_values(i, j);
                }
                j = self.nodes[j].next;
            }
            i = self.nodes[i].next;
        }
    }

    pub fn sort(&mut self)
    where
        T: Ord,
    {
        self.sort_by(T::cmp)
    }

    fn swap_node_values(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let va = self.nodes[a].value.take();
        let vb = std::mem::replace(&mut self.nodes[b].value, va);
        self.nodes[a].value = vb;
    }

    /// Releases every element. Positions taken before the clear stop
    /// resolving.
    pub fn clear(&mut self) {
        let mut id = self.head;
        while id != SENTINEL {
            let next = self.nodes[id].next;
            self.release(id);
            id = next;
        }
        self.nodes[SENTINEL].prev = None;
        self.head = SENTINEL;
        self.len = 0;
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let sentinel = &self.nodes[SENTINEL];
        assert!(sentinel.value.is_none());
        assert_eq!(sentinel.next, SENTINEL);
        if self.len == 0 {
            assert_eq!(self.head, SENTINEL);
            assert_eq!(sentinel.prev, None);
        }

        let mut prev = None;
        let mut id = self.head;
        for _ in 0..self.len {
            assert_ne!(id, SENTINEL, "reached the end marker early");
            let node = &self.nodes[id];
            assert!(node.value.is_some());
            assert_eq!(node.prev, prev);
            prev = Some(id);
            id = node.next;
        }
        assert_eq!(id, SENTINEL, "end marker not reached after len steps");
        assert_eq!(sentinel.prev, prev);
        assert_eq!(self.nodes.len(), 1 + self.len + self.free.len());
    }
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for OrderedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for OrderedList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.append(v);
        }
    }
}

impl<T> FromIterator<T> for OrderedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = OrderedList::new();
        list.extend(iter);
        list
    }
}

impl<'a, T> IntoIterator for &'a OrderedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T> {
    list: &'a OrderedList<T>,
    front: NodeId,
    // Exclusive.
    back: NodeId,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.list.nodes[self.front];
        self.front = node.next;
        self.remaining -= 1;
        node.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.back = self.list.nodes[self.back].prev?;
        self.remaining -= 1;
        self.list.nodes[self.back].value.as_ref()
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
