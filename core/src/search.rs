//! Searching within slices of items ordered by their lower key bound.
//!
//! Segments are stored sorted by their starting key, so locating the segment
//! responsible for a key is a "floor" search: the last item whose lower bound
//! is less than or equal to the key.

/// An item which is responsible for every key starting at `lower_bound()`.
pub trait KeyBounded<K> {
    fn lower_bound(&self) -> &K;
}

/// An algorithm for searching a sorted slice, e.g. Binary or Linear
pub trait Search {
    /// Search a slice of items by their lower bound.
    ///
    /// Returns `Ok` with the index of an item whose bound equals `x`, or `Err`
    /// with the index at which an item with bound `x` would be inserted to keep
    /// the slice sorted. Assumes the slice is sorted and its bounds are unique.
    fn search_by_key<K: Ord, T: KeyBounded<K>>(slice: &[T], x: &K) -> Result<usize, usize>;
}

/// Binary search, `O(log n)`.
pub struct BinarySearch;

impl Search for BinarySearch {
    fn search_by_key<K: Ord, T: KeyBounded<K>>(slice: &[T], x: &K) -> Result<usize, usize> {
        slice.binary_search_by(|item| item.lower_bound().cmp(x))
    }
}

/// Linear scan, `O(n)`, faster than binary search on a handful of items.
pub struct LinearSearch;

impl Search for LinearSearch {
    fn search_by_key<K: Ord, T: KeyBounded<K>>(slice: &[T], x: &K) -> Result<usize, usize> {
        match slice.iter().position(|item| item.lower_bound() >= x) {
            Some(index) if slice[index].lower_bound() == x => Ok(index),
            Some(index) => Err(index),
            None => Err(slice.len()),
        }
    }
}

const BINARY_SEARCH_CUTOFF: usize = 32;

/// Chooses between binary and linear search depending on the size of the slice to search
pub struct OptimalSearch;

impl Search for OptimalSearch {
    fn search_by_key<K: Ord, T: KeyBounded<K>>(slice: &[T], x: &K) -> Result<usize, usize> {
        if slice.len() > BINARY_SEARCH_CUTOFF {
            BinarySearch::search_by_key(slice, x)
        } else {
            LinearSearch::search_by_key(slice, x)
        }
    }
}

/// Index of the last item whose bound is less than or equal to the searched key,
/// or `None` if the key precedes every item.
#[inline(always)]
pub fn floor_index(search: Result<usize, usize>) -> Option<usize> {
    match search {
        Ok(index) => Some(index),
        Err(0) => None,
        Err(index) => Some(index - 1),
    }
}
