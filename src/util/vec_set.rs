// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Index;

use super::index::Idx;

/// An interning set: elements are unique and randomly accessible by the index
/// returned on insertion, like an array.
#[derive(Clone, Debug)]
pub struct VecSet<I: Idx, T: Eq + Hash + Clone> {
    data: Vec<T>,
    included: HashMap<T, I>,
}

impl<I: Idx, T: Eq + Hash + Clone> Index<I> for VecSet<I, T> {
    type Output = T;

    fn index(&self, index: I) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<I: Idx, T: Eq + Hash + Clone> Default for VecSet<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T: Eq + Hash + Clone> VecSet<I, T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            included: HashMap::new(),
        }
    }

    /// Returns the index of `value`, inserting it first if needed.
    pub fn insert(&mut self, value: T) -> I {
        let next = I::new(self.data.len());
        match self.included.entry(value) {
            Entry::Occupied(oe) => *oe.get(),
            Entry::Vacant(ve) => {
                self.data.push(ve.key().clone());
                *ve.insert(next)
            }
        }
    }

    pub fn get_index(&self, value: &T) -> Option<I> {
        self.included.get(value).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.data.iter().enumerate().map(|(i, t)| (I::new(i), t))
    }
}
