//! Our implemention of bit vector is modifed from `rustc_index::bit_set`, see
//! <https://doc.rust-lang.org/stable/nightly-rustc/src/rustc_index/bit_set.rs.html>
//!
//! Only the operations needed by the monotone analysis sets are kept: the sets never
//! shrink, so there is no removal.

use std::fmt;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::mem;
use std::slice;

use super::index::Idx;

type Word = u64;
const WORD_BYTES: usize = mem::size_of::<Word>();
const WORD_BITS: usize = WORD_BYTES * 8;

/// A growable bit-vector type with a dense representation.
///
/// `T` is an index type, typically a newtyped `u32` wrapper, but it can also
/// just be `usize`.
#[derive(Eq, PartialEq, Hash)]
pub struct BitVec<T> {
    words: Vec<Word>,
    marker: PhantomData<T>,
}

impl<T: Idx> Default for BitVec<T> {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl<T: Idx> BitVec<T> {
    /// Creates a new, empty bitvec with 0 elements.
    #[inline]
    pub fn new_empty() -> BitVec<T> {
        BitVec {
            words: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Creates a new, empty bitvec able to hold `capacity` elements without growing.
    #[inline]
    pub fn with_capacity(capacity: usize) -> BitVec<T> {
        BitVec {
            words: vec![0; num_words(capacity)],
            marker: PhantomData,
        }
    }

    /// Ensure that the set can hold at least `capacity` elements.
    #[inline]
    pub fn ensure(&mut self, capacity: usize) {
        let min_num_words = num_words(capacity);
        if self.words.len() < min_num_words {
            self.words.resize(min_num_words, 0)
        }
    }

    /// Count the number of set bits in the set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|e| e.count_ones() as usize).sum()
    }

    /// Returns `true` if `self` contains `elem`.
    #[inline]
    pub fn contains(&self, elem: T) -> bool {
        if self.words.len() * WORD_BITS <= elem.index() {
            return false;
        }
        let (word_index, mask) = word_index_and_mask(elem);
        (self.words[word_index] & mask) != 0
    }

    /// Is the set empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|a| *a == 0)
    }

    /// Insert `elem`. Returns whether the set has changed.
    #[inline]
    pub fn insert(&mut self, elem: T) -> bool {
        self.ensure(elem.index() + 1);
        let (word_index, mask) = word_index_and_mask(elem);
        let word_ref = &mut self.words[word_index];
        let word = *word_ref;
        *word_ref = word | mask;
        *word_ref != word
    }

    /// Iterates over the indices of set bits in a sorted order.
    #[inline]
    pub fn iter(&self) -> BitIter<'_, T> {
        BitIter {
            word: 0,
            offset: usize::MAX - (WORD_BITS - 1),
            iter: self.words.iter(),
            marker: PhantomData,
        }
    }
}

impl<T> Clone for BitVec<T> {
    fn clone(&self) -> Self {
        BitVec {
            words: self.words.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: Idx> Debug for BitVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct BitIter<'a, T: Idx> {
    /// A copy of the current word with the already-visited bits cleared.
    word: Word,

    /// The offset (measured in bits) of the current word.
    offset: usize,

    iter: slice::Iter<'a, Word>,

    marker: PhantomData<T>,
}

impl<'a, T: Idx> Iterator for BitIter<'a, T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        loop {
            if self.word != 0 {
                let bit_pos = self.word.trailing_zeros() as usize;
                self.word ^= 1 << bit_pos;
                return Some(T::new(bit_pos + self.offset));
            }

            // `wrapping_add()` handles the degenerate initial offset.
            let word = self.iter.next()?;
            self.word = *word;
            self.offset = self.offset.wrapping_add(WORD_BITS);
        }
    }
}

#[inline]
fn num_words(capacity: usize) -> usize {
    (capacity + WORD_BITS - 1) / WORD_BITS
}

#[inline]
fn word_index_and_mask<T: Idx>(elem: T) -> (usize, Word) {
    let elem = elem.index();
    (elem / WORD_BITS, 1 << (elem % WORD_BITS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_change_once() {
        let mut set: BitVec<usize> = BitVec::new_empty();
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(130));
        assert!(set.contains(130));
        assert!(!set.contains(129));
        assert!(!set.contains(10_000));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn iter_is_sorted() {
        let mut set: BitVec<usize> = BitVec::with_capacity(8);
        for i in [200, 5, 64, 63, 0] {
            set.insert(i);
        }
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 5, 63, 64, 200]);
    }
}
