// Bisection over a linked traversal. Every probe re-walks from the current
// lower edge, so the hop counts shrink geometrically but each hop still costs
// its length in link traversals.
//
// The span bisected is `first..last`, where `last` is the final element: the
// final element is never probed, and the search lands on it whenever every
// probed element falls on the near side of the key. Callers check the
// landing element themselves.

use std::cmp::Ordering;

use super::Cursor;

fn span<'a, T>(first: Cursor<'a, T>, end: Cursor<'a, T>) -> usize {
    let last = end.offset(-1);
    // `first` is the head, which precedes every node.
    last.distance(&first).unwrap_or(0)
}

fn partition_point<'a, T, P>(first: Cursor<'a, T>, end: Cursor<'a, T>, mut before: P) -> Cursor<'a, T>
where
    P: FnMut(&T) -> bool,
{
    let mut first = first;
    let mut count = span(first, end);
    while count > 0 {
        let step = count / 2;
        let it = first.offset(step as isize);
        if it.value().is_some_and(&mut before) {
            first = it.offset(1);
            count -= step + 1;
        } else {
            count = step;
        }
    }
    first
}

/// First cursor in `first..end` whose element is not less than `key`.
pub(super) fn lower_bound<'a, T, K, F>(
    first: Cursor<'a, T>,
    end: Cursor<'a, T>,
    key: &K,
    cmp: &mut F,
) -> Cursor<'a, T>
where
    K: ?Sized,
    F: FnMut(&T, &K) -> Ordering,
{
    partition_point(first, end, |v| cmp(v, key) == Ordering::Less)
}

/// First cursor in `first..end` whose element is greater than `key`.
pub(super) fn upper_bound<'a, T, K, F>(
    first: Cursor<'a, T>,
    end: Cursor<'a, T>,
    key: &K,
    cmp: &mut F,
) -> Cursor<'a, T>
where
    K: ?Sized,
    F: FnMut(&T, &K) -> Ordering,
{
    partition_point(first, end, |v| cmp(v, key) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use crate::list::OrderedList;

    use super::{lower_bound, upper_bound};

    fn bounds(values: &[u32], key: u32) -> (usize, usize) {
        let list: OrderedList<u32> = values.iter().copied().collect();
        let mut cmp = |v: &u32, k: &u32| v.cmp(k);
        let lo = lower_bound(list.begin(), list.end(), &key, &mut cmp);
        let hi = upper_bound(list.begin(), list.end(), &key, &mut cmp);
        (
            lo.distance(&list.begin()).unwrap(),
            hi.distance(&list.begin()).unwrap(),
        )
    }

    #[test]
    fn test_bounds_stop_at_last_element() {
        let data = [1, 2, 2, 2, 5, 8];
        assert_eq!(bounds(&data, 2), (1, 4));
        assert_eq!(bounds(&data, 0), (0, 0));
        assert_eq!(bounds(&data, 3), (4, 4));
        // Never past the last element, even when every element is smaller.
        assert_eq!(bounds(&data, 8), (5, 5));
        assert_eq!(bounds(&data, 100), (5, 5));
    }

    #[test]
    fn test_bounds_tiny_lists() {
        assert_eq!(bounds(&[], 1), (0, 0));
        assert_eq!(bounds(&[4], 1), (0, 0));
        assert_eq!(bounds(&[4], 4), (0, 0));
        assert_eq!(bounds(&[4], 9), (0, 0));
        assert_eq!(bounds(&[3, 4], 4), (1, 1));
        assert_eq!(bounds(&[3, 4], 3), (0, 1));
    }
}
