use std::fmt;

use crate::error::{Bound, Error};

use super::{NodeId, OrderedList, SENTINEL};

/// A handle to a node that outlives the borrow it was taken from.
///
/// A position has to be resolved against its list again before use; it stops
/// resolving once its node is removed or the list is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub(super) node: NodeId,
    pub(super) generation: u32,
}

/// A read-only bidirectional cursor into an `OrderedList`.
///
/// Two cursors are equal when they denote the same node, regardless of the
/// values held.
pub struct Cursor<'a, T> {
    list: &'a OrderedList<T>,
    node: NodeId,
}

impl<'a, T> Clone for Cursor<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Cursor<'a, T> {}

impl<'a, T> PartialEq for Cursor<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.list, other.list) && self.node == other.node
    }
}

impl<'a, T> Eq for Cursor<'a, T> {}

impl<'a, T> fmt::Debug for Cursor<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.node == SENTINEL {
            write!(f, "Cursor(end)")
        } else {
            write!(f, "Cursor({})", self.node)
        }
    }
}

impl<'a, T> Cursor<'a, T> {
    pub(super) fn new(list: &'a OrderedList<T>, node: NodeId) -> Self {
        Cursor { list, node }
    }

    pub fn is_end(&self) -> bool {
        self.node == SENTINEL
    }

    /// The element under the cursor; `None` at the end marker.
    pub fn value(&self) -> Option<&'a T> {
        self.list.nodes[self.node].value.as_ref()
    }

    pub fn position(&self) -> Position {
        self.list.position_of(self.node)
    }

    pub fn step_forward(&mut self) -> Result<(), Error> {
        if self.node == SENTINEL {
            return Err(Error::OutOfRange(Bound::End));
        }
        self.node = self.list.nodes[self.node].next;
        Ok(())
    }

    pub fn step_backward(&mut self) -> Result<(), Error> {
        match self.list.nodes[self.node].prev {
            Some(prev) => {
                self.node = prev;
                Ok(())
            }
            None => Err(Error::OutOfRange(Bound::Front)),
        }
    }

    /// Steps `n` times, forward for positive `n` and backward for negative.
    ///
    /// Stops quietly at the end marker or at the first element if a boundary
    /// comes before `n` steps are taken.
    pub fn offset(self, n: isize) -> Self {
        let mut c = self;
        if n >= 0 {
            for _ in 0..n {
                if c.step_forward().is_err() {
                    break;
                }
            }
        } else {
            for _ in 0..n.unsigned_abs() {
                if c.step_backward().is_err() {
                    break;
                }
            }
        }
        c
    }

    /// Number of backward steps from `self` to `other`.
    ///
    /// `other` must precede (or be) `self` in traversal order. If walking
    /// backward reaches the first element without meeting `other`, this
    /// fails with `InvalidPrecondition`.
    pub fn distance(&self, other: &Cursor<'a, T>) -> Result<usize, Error> {
        if !std::ptr::eq(self.list, other.list) {
            return Err(Error::InvalidPrecondition("cursors belong to different lists"));
        }
        let mut count = 0;
        let mut node = self.node;
        while node != other.node {
            node = self.list.nodes[node].prev.ok_or(Error::InvalidPrecondition(
                "target does not precede the cursor",
            ))?;
            count += 1;
        }
        Ok(count)
    }
}

/// A cursor with exclusive access to its list, for editing values in place.
pub struct CursorMut<'a, T> {
    list: &'a mut OrderedList<T>,
    node: NodeId,
}

impl<'a, T> CursorMut<'a, T> {
    pub(super) fn new(list: &'a mut OrderedList<T>, node: NodeId) -> Self {
        CursorMut { list, node }
    }

    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor::new(&*self.list, self.node)
    }

    pub fn is_end(&self) -> bool {
        self.node == SENTINEL
    }

    pub fn value(&self) -> Option<&T> {
        self.list.nodes[self.node].value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.list.nodes[self.node].value.as_mut()
    }

    pub fn into_value_mut(self) -> Option<&'a mut T> {
        let node = self.node;
        let list = self.list;
        list.nodes[node].value.as_mut()
    }

    /// Overwrites the element under the cursor and returns the old one. At
    /// the end marker nothing is stored and `value` is handed back.
    pub fn replace(&mut self, value: T) -> Result<T, T> {
        match self.value_mut() {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(value),
        }
    }

    pub fn position(&self) -> Position {
        self.list.position_of(self.node)
    }

    pub fn step_forward(&mut self) -> Result<(), Error> {
        if self.node == SENTINEL {
            return Err(Error::OutOfRange(Bound::End));
        }
        self.node = self.list.nodes[self.node].next;
        Ok(())
    }

    pub fn step_backward(&mut self) -> Result<(), Error> {
        self.node = self.list.nodes[self.node]
            .prev
            .ok_or(Error::OutOfRange(Bound::Front))?;
        Ok(())
    }

    /// Exchanges the values of this node and the node at `other`. Links are
    /// left alone, so both nodes stay where they are.
    pub fn swap_values(&mut self, other: Position) -> Result<(), Error> {
        self.list.check_position(other)?;
        if self.node == SENTINEL || other.node == SENTINEL {
            return Err(Error::InvalidPrecondition("the end marker holds no value"));
        }
        self.list.swap_node_values(self.node, other.node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::Error, list::OrderedList};

    #[test]
    fn test_offset_clamps() {
        let list: OrderedList<char> = "abcd".chars().collect();
        assert_eq!(list.begin().offset(2).value(), Some(&'c'));
        assert!(list.begin().offset(10).is_end());
        assert_eq!(list.end().offset(-1).value(), Some(&'d'));
        assert_eq!(list.end().offset(-10).value(), Some(&'a'));
        assert_eq!(list.begin().offset(0), list.begin());
    }

    #[test]
    fn test_distance() {
        let list: OrderedList<char> = "abcd".chars().collect();
        let b = list.begin().offset(1);
        let d = list.begin().offset(3);
        assert_eq!(d.distance(&b).unwrap(), 2);
        assert_eq!(list.end().distance(&list.begin()).unwrap(), 4);
        assert_eq!(b.distance(&b).unwrap(), 0);
        assert!(matches!(b.distance(&d), Err(Error::InvalidPrecondition(_))));

        let other: OrderedList<char> = "abcd".chars().collect();
        assert!(b.distance(&other.begin()).is_err());
    }

    #[test]
    fn test_identity_not_value() {
        let list: OrderedList<u32> = [7, 7].into_iter().collect();
        let first = list.begin();
        let second = first.offset(1);
        assert_eq!(first.value(), second.value());
        assert_ne!(first, second);
    }

    #[test]
    fn test_swap_values() {
        let mut list: OrderedList<u32> = [1, 2, 3].into_iter().collect();
        let last = list.end().offset(-1).position();
        let end = list.end().position();
        {
            let mut c = list.find_linear_mut(|v| *v == 1).unwrap();
            c.swap_values(last).unwrap();
            assert_eq!(c.value(), Some(&3));
            assert!(matches!(c.swap_values(end), Err(Error::InvalidPrecondition(_))));
        }
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
        list.check_invariants();
    }

    #[test]
    fn test_stale_position_rejected() {
        let mut list: OrderedList<u32> = [1, 2, 3].into_iter().collect();
        let two = list.find_linear(|v| *v == 2).unwrap().position();
        list.remove_by_equality(&2);
        assert!(list.cursor_at(two).is_err());

        let mut c = list.find_linear_mut(|v| *v == 1).unwrap();
        assert!(matches!(c.swap_values(two), Err(Error::InvalidPrecondition(_))));
    }

    #[test]
    fn test_cursor_mut_edit() {
        let mut list: OrderedList<u32> = [1, 2, 3].into_iter().collect();
        let first = list.begin().position();
        let mut c = list.cursor_mut_at(first).unwrap();
        *c.value_mut().unwrap() += 10;
        c.step_forward().unwrap();
        assert_eq!(c.replace(20), Ok(2));
        c.step_forward().unwrap();
        c.step_forward().unwrap();
        assert!(c.is_end());
        assert_eq!(c.replace(99), Err(99));
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![11, 20, 3]);
    }
}
