//! A sparse, ordered set of small unsigned integers.
//!
//! The set is stored as fixed size bit pages keyed by their page number, which
//! keeps it compact when members are clustered together, as glyph ids and
//! lookup indices usually are.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::RangeInclusive;

use otl_types::GlyphId;

const PAGE_BITS: u32 = 512;
const WORDS_PER_PAGE: usize = (PAGE_BITS / 64) as usize;

type Page = [u64; WORDS_PER_PAGE];

/// An ordered set of values that map to `u32`.
#[derive(Clone, PartialEq, Eq)]
pub struct IntSet<T> {
    pages: BTreeMap<u32, Page>,
    len: u64,
    phantom: PhantomData<T>,
}

/// Defines the domain of `IntSet` member types.
///
/// Every value must map to a unique `u32`, and the mapping must preserve the
/// ordering of `T`.
pub trait Domain: Sized + Copy {
    /// Converts this value of `T` to a value in u32.
    fn to_u32(&self) -> u32;

    /// Converts a mapped u32 value back to T.
    ///
    /// Will only ever be called with values produced by `to_u32`.
    fn from_u32(member: u32) -> Self;
}

impl Domain for u32 {
    fn to_u32(&self) -> u32 {
        *self
    }

    fn from_u32(member: u32) -> Self {
        member
    }
}

impl Domain for u16 {
    fn to_u32(&self) -> u32 {
        *self as u32
    }

    fn from_u32(member: u32) -> Self {
        member as u16
    }
}

impl Domain for GlyphId {
    fn to_u32(&self) -> u32 {
        GlyphId::to_u32(*self)
    }

    fn from_u32(member: u32) -> Self {
        GlyphId::new(member as u16)
    }
}

fn split(value: u32) -> (u32, usize, u64) {
    let major = value / PAGE_BITS;
    let minor = value % PAGE_BITS;
    (major, (minor / 64) as usize, 1u64 << (minor % 64))
}

impl<T> Default for IntSet<T> {
    fn default() -> Self {
        IntSet::empty()
    }
}

impl<T> IntSet<T> {
    /// Create a new empty set.
    pub fn empty() -> Self {
        IntSet {
            pages: BTreeMap::new(),
            len: 0,
            phantom: PhantomData,
        }
    }

    /// The number of members in this set.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the set contains no members.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove all members.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.len = 0;
    }
}

impl<T: Domain> IntSet<T> {
    /// Adds a value to the set.
    ///
    /// Returns `true` if the value was newly inserted.
    pub fn insert(&mut self, val: T) -> bool {
        let (major, word, bit) = split(val.to_u32());
        let page = self.pages.entry(major).or_insert([0; WORDS_PER_PAGE]);
        let inserted = page[word] & bit == 0;
        page[word] |= bit;
        self.len += inserted as u64;
        inserted
    }

    /// Adds all values in the inclusive range to the set.
    pub fn insert_range(&mut self, range: RangeInclusive<T>) {
        let start = range.start().to_u32();
        let end = range.end().to_u32();
        for value in start..=end {
            let (major, word, bit) = split(value);
            let page = self.pages.entry(major).or_insert([0; WORDS_PER_PAGE]);
            if page[word] & bit == 0 {
                page[word] |= bit;
                self.len += 1;
            }
        }
    }

    /// Removes a value from the set.
    ///
    /// Returns `true` if the value was present.
    pub fn remove(&mut self, val: T) -> bool {
        let (major, word, bit) = split(val.to_u32());
        let Some(page) = self.pages.get_mut(&major) else {
            return false;
        };
        let removed = page[word] & bit != 0;
        page[word] &= !bit;
        if page.iter().all(|w| *w == 0) {
            self.pages.remove(&major);
        }
        self.len -= removed as u64;
        removed
    }

    /// Returns `true` if the set contains `val`.
    pub fn contains(&self, val: T) -> bool {
        let (major, word, bit) = split(val.to_u32());
        self.pages
            .get(&major)
            .map(|page| page[word] & bit != 0)
            .unwrap_or(false)
    }

    /// An iterator over the members of the set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.pages.iter().flat_map(|(major, page)| {
            let base = major * PAGE_BITS;
            page.iter().enumerate().flat_map(move |(i, word)| {
                let mut bits = *word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let tz = bits.trailing_zeros();
                    bits &= bits - 1;
                    Some(T::from_u32(base + i as u32 * 64 + tz))
                })
            })
        })
    }

    /// The smallest member of the set, if any.
    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }

    /// The largest member of the set, if any.
    pub fn last(&self) -> Option<T> {
        let (major, page) = self.pages.iter().next_back()?;
        let (i, word) = page.iter().enumerate().rev().find(|(_, w)| **w != 0)?;
        let bit = 63 - word.leading_zeros();
        Some(T::from_u32(major * PAGE_BITS + i as u32 * 64 + bit))
    }

    /// Add all members of `other` to this set.
    pub fn union(&mut self, other: &IntSet<T>) {
        for (major, other_page) in &other.pages {
            let page = self.pages.entry(*major).or_insert([0; WORDS_PER_PAGE]);
            for (word, other_word) in page.iter_mut().zip(other_page) {
                self.len += (other_word & !*word).count_ones() as u64;
                *word |= other_word;
            }
        }
    }

    /// Returns `true` if this set and `other` share at least one member.
    pub fn intersects(&self, other: &IntSet<T>) -> bool {
        let (small, large) = if self.pages.len() <= other.pages.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.pages.iter().any(|(major, page)| {
            large
                .pages
                .get(major)
                .map(|other| page.iter().zip(other).any(|(a, b)| a & b != 0))
                .unwrap_or(false)
        })
    }

    /// Returns `true` if every member of this set is also in `other`.
    pub fn is_subset(&self, other: &IntSet<T>) -> bool {
        self.pages.iter().all(|(major, page)| {
            let empty = [0; WORDS_PER_PAGE];
            let other = other.pages.get(major).unwrap_or(&empty);
            page.iter().zip(other).all(|(a, b)| a & !b == 0)
        })
    }
}

impl<T: Domain> Extend<T> for IntSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Domain> FromIterator<T> for IntSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = IntSet::empty();
        set.extend(iter);
        set
    }
}

impl<T: Domain + Debug> Debug for IntSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_len() {
        let mut set = IntSet::<u32>::empty();
        assert!(set.insert(5));
        assert!(!set.insert(5));
        assert!(set.insert(70_000));
        assert_eq!(set.len(), 2);
        assert!(set.contains(70_000));
        assert!(set.remove(5));
        assert!(!set.remove(5));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), [70_000]);
    }

    #[test]
    fn ordered_iteration_and_bounds() {
        let set: IntSet<u16> = [900, 3, 64, 63, 511, 512].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), [3, 63, 64, 511, 512, 900]);
        assert_eq!(set.first(), Some(3));
        assert_eq!(set.last(), Some(900));
        assert_eq!(IntSet::<u16>::empty().last(), None);
    }

    #[test]
    fn ranges_union_intersect() {
        let mut a = IntSet::<GlyphId>::empty();
        a.insert_range(GlyphId::new(10)..=GlyphId::new(20));
        assert_eq!(a.len(), 11);
        let b: IntSet<GlyphId> = [GlyphId::new(20), GlyphId::new(600)].into_iter().collect();
        assert!(a.intersects(&b));
        assert!(!b.is_subset(&a));
        a.union(&b);
        assert_eq!(a.len(), 12);
        assert!(b.is_subset(&a));
        let c: IntSet<GlyphId> = [GlyphId::new(9)].into_iter().collect();
        assert!(!a.intersects(&c));
    }
}
