//! A small probabilistic set used to skip work that cannot match.
//!
//! The digest answers "might this glyph be a member?" with no false negatives.
//! It is made of three 64-bit masks, each keyed by a different slice of the
//! glyph id's bits.

use otl_types::GlyphId;

use crate::tables::layout::CoverageTable;

const SHIFTS: [u32; 3] = [4, 0, 9];
const MASK_BITS: u32 = u64::BITS;

/// A bloom-filter-like set of glyph ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetDigest {
    masks: [u64; 3],
}

fn mask_for(shift: u32, value: u32) -> u64 {
    1u64 << ((value >> shift) & (MASK_BITS - 1))
}

impl SetDigest {
    /// A digest that claims to contain everything.
    pub fn full() -> Self {
        SetDigest {
            masks: [u64::MAX; 3],
        }
    }

    pub fn add(&mut self, glyph: GlyphId) {
        let value = glyph.to_u32();
        for (mask, shift) in self.masks.iter_mut().zip(SHIFTS) {
            *mask |= mask_for(shift, value);
        }
    }

    /// Add every glyph in the inclusive range.
    pub fn add_range(&mut self, first: GlyphId, last: GlyphId) {
        let (a, b) = (first.to_u32(), last.to_u32());
        if a > b {
            return;
        }
        for (mask, shift) in self.masks.iter_mut().zip(SHIFTS) {
            if (b >> shift) - (a >> shift) >= MASK_BITS - 1 {
                *mask = u64::MAX;
            } else {
                let ma = mask_for(shift, a);
                let mb = mask_for(shift, b);
                // set every bit from ma to mb, wrapping around if mb < ma
                let wrapped = (ma > mb) as u64;
                *mask |= mb.wrapping_add(mb).wrapping_sub(ma).wrapping_sub(wrapped);
            }
        }
    }

    pub fn add_coverage(&mut self, coverage: &CoverageTable) {
        coverage.for_each_range(|first, last| self.add_range(first, last));
    }

    pub fn union(&mut self, other: &SetDigest) {
        for (mask, other) in self.masks.iter_mut().zip(other.masks) {
            *mask |= other;
        }
    }

    /// `false` only if the glyph is definitely not a member.
    pub fn may_have(&self, glyph: GlyphId) -> bool {
        let value = glyph.to_u32();
        self.masks
            .iter()
            .zip(SHIFTS)
            .all(|(mask, shift)| mask & mask_for(shift, value) != 0)
    }

    /// `false` only if the two digests definitely have no member in common.
    pub fn may_intersect(&self, other: &SetDigest) -> bool {
        self.masks
            .iter()
            .zip(other.masks)
            .all(|(mask, other)| mask & other != 0)
    }
}

impl FromIterator<GlyphId> for SetDigest {
    fn from_iter<I: IntoIterator<Item = GlyphId>>(iter: I) -> Self {
        let mut digest = SetDigest::default();
        for glyph in iter {
            digest.add(glyph);
        }
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_negatives() {
        let glyphs = [3u16, 17, 64, 65, 1000, 40_000].map(GlyphId::new);
        let digest: SetDigest = glyphs.iter().copied().collect();
        for gid in glyphs {
            assert!(digest.may_have(gid), "{gid}");
        }
        assert!(!SetDigest::default().may_have(GlyphId::new(3)));
    }

    #[test]
    fn ranges() {
        let mut digest = SetDigest::default();
        digest.add_range(GlyphId::new(60), GlyphId::new(70));
        for gid in 60..=70 {
            assert!(digest.may_have(GlyphId::new(gid)));
        }
        let mut wide = SetDigest::default();
        wide.add_range(GlyphId::new(0), GlyphId::new(u16::MAX));
        assert_eq!(wide, SetDigest::full());
    }

    #[test]
    fn wrapping_range() {
        let mut digest = SetDigest::default();
        digest.add_range(GlyphId::new(62), GlyphId::new(66));
        for gid in 62..=66 {
            assert!(digest.may_have(GlyphId::new(gid)));
        }
    }

    #[test]
    fn intersection() {
        let a: SetDigest = [GlyphId::new(1)].into_iter().collect();
        let b: SetDigest = [GlyphId::new(1), GlyphId::new(2)].into_iter().collect();
        assert!(a.may_intersect(&b));
        assert!(!a.may_intersect(&SetDigest::default()));
    }
}
