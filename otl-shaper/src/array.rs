//! Zero-copy arrays of big-endian scalars

use std::fmt::Debug;

use otl_types::Scalar;

/// A borrowed array of big-endian scalars.
///
/// Items are decoded on access.
pub struct BeArray<'a, T: Scalar> {
    raw: &'a [T::Raw],
}

fn from_raw_ref<T: Scalar>(raw: &T::Raw) -> T {
    T::from_raw(*raw)
}

impl<'a, T: Scalar> BeArray<'a, T> {
    pub(crate) fn new(raw: &'a [T::Raw]) -> Self {
        BeArray { raw }
    }

    /// An array with no items
    pub fn empty() -> Self {
        BeArray { raw: &[] }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        self.raw.get(idx).map(from_raw_ref::<T>)
    }

    pub fn first(&self) -> Option<T> {
        self.get(0)
    }

    pub fn last(&self) -> Option<T> {
        self.raw.last().map(from_raw_ref::<T>)
    }

    pub fn iter(&self) -> std::iter::Map<std::slice::Iter<'a, T::Raw>, fn(&T::Raw) -> T> {
        self.raw.iter().map(from_raw_ref::<T> as fn(&T::Raw) -> T)
    }

    /// Binary search over the decoded items, as with [`slice::binary_search_by`].
    pub fn binary_search_by(
        &self,
        mut f: impl FnMut(T) -> std::cmp::Ordering,
    ) -> Result<usize, usize> {
        self.raw.binary_search_by(|raw| f(T::from_raw(*raw)))
    }
}

impl<T: Scalar> Clone for BeArray<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Scalar> Copy for BeArray<'_, T> {}

impl<T: Scalar> Default for BeArray<'_, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Scalar + Debug> Debug for BeArray<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
