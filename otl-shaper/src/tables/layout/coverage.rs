//! Coverage tables: sorted glyph id to coverage index maps

use otl_types::GlyphId;

use crate::array::BeArray;
use crate::collections::IntSet;
use crate::sanitize::Sanitize;
use crate::{FontData, FontRead, ReadError};

/// A [Coverage Table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-table).
///
/// The default value covers nothing; it stands in for absent or invalid
/// coverage.
#[derive(Clone, Copy, Debug, Default)]
pub enum CoverageTable<'a> {
    #[default]
    Empty,
    /// A sorted list of covered glyphs; the coverage index is the position
    /// in the list.
    Format1(BeArray<'a, GlyphId>),
    /// Sorted, non-overlapping ranges of glyphs.
    Format2(&'a [RangeRecord]),
}

/// A range of glyphs with consecutive coverage (or class) values.
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct RangeRecord {
    start_glyph_id: [u8; 2],
    end_glyph_id: [u8; 2],
    start_coverage_index: [u8; 2],
}

impl RangeRecord {
    /// First glyph ID in the range
    pub fn start_glyph_id(&self) -> GlyphId {
        GlyphId::new(u16::from_be_bytes(self.start_glyph_id))
    }

    /// Last glyph ID in the range
    pub fn end_glyph_id(&self) -> GlyphId {
        GlyphId::new(u16::from_be_bytes(self.end_glyph_id))
    }

    /// Coverage Index of first glyph ID in range
    pub fn start_coverage_index(&self) -> u16 {
        u16::from_be_bytes(self.start_coverage_index)
    }

    /// Iterate over the glyphs in this range.
    pub fn iter(&self) -> impl Iterator<Item = GlyphId> {
        (self.start_glyph_id().to_u16()..=self.end_glyph_id().to_u16()).map(GlyphId::new)
    }

    fn contains(&self, glyph: GlyphId) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        if glyph < self.start_glyph_id() {
            Ordering::Greater
        } else if glyph > self.end_glyph_id() {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl<'a> FontRead<'a> for CoverageTable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        let count: u16 = cursor.read()?;
        match format {
            1 => cursor.read_be_array(count as usize).map(Self::Format1),
            2 => cursor.read_records(count as usize).map(Self::Format2),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for CoverageTable<'a> {}

impl<'a> CoverageTable<'a> {
    /// If this glyph is in the coverage table, returns its index
    pub fn get(&self, glyph: GlyphId) -> Option<u16> {
        match self {
            CoverageTable::Empty => None,
            CoverageTable::Format1(glyphs) => glyphs
                .binary_search_by(|probe| probe.cmp(&glyph))
                .ok()
                .map(|idx| idx as u16),
            CoverageTable::Format2(ranges) => ranges
                .binary_search_by(|rec| rec.contains(glyph))
                .ok()
                .and_then(|idx| {
                    let rec = &ranges[idx];
                    let delta = glyph.to_u16() - rec.start_glyph_id().to_u16();
                    rec.start_coverage_index().checked_add(delta)
                }),
        }
    }

    /// Iterate over all the glyphs in this coverage table, in index order.
    pub fn iter(&self) -> impl Iterator<Item = GlyphId> + 'a {
        let (glyphs, ranges) = match *self {
            CoverageTable::Empty => (None, None),
            CoverageTable::Format1(glyphs) => (Some(glyphs.iter()), None),
            CoverageTable::Format2(ranges) => (None, Some(ranges.iter())),
        };
        glyphs
            .into_iter()
            .flatten()
            .chain(ranges.into_iter().flatten().flat_map(RangeRecord::iter))
    }

    /// The number of glyphs covered.
    pub fn population(&self) -> usize {
        match self {
            CoverageTable::Empty => 0,
            CoverageTable::Format1(glyphs) => glyphs.len(),
            CoverageTable::Format2(ranges) => ranges
                .iter()
                .map(|rec| {
                    (rec.end_glyph_id().to_u32() + 1).saturating_sub(rec.start_glyph_id().to_u32())
                        as usize
                })
                .sum(),
        }
    }

    /// Call `f` with each contiguous (first, last) run of covered glyphs.
    pub(crate) fn for_each_range(&self, mut f: impl FnMut(GlyphId, GlyphId)) {
        match self {
            CoverageTable::Empty => (),
            CoverageTable::Format1(glyphs) => glyphs.iter().for_each(|gid| f(gid, gid)),
            CoverageTable::Format2(ranges) => ranges
                .iter()
                .for_each(|rec| f(rec.start_glyph_id(), rec.end_glyph_id())),
        }
    }

    /// Add every covered glyph to `glyphs`.
    pub fn add_coverage(&self, glyphs: &mut IntSet<GlyphId>) {
        self.for_each_range(|first, last| {
            if first <= last {
                glyphs.insert_range(first..=last)
            }
        });
    }

    /// Returns `true` if any glyph in `glyphs` is covered.
    pub fn intersects(&self, glyphs: &IntSet<GlyphId>) -> bool {
        if (self.population() as u64) < glyphs.len() {
            self.iter().any(|gid| glyphs.contains(gid))
        } else {
            glyphs.iter().any(|gid| self.get(gid).is_some())
        }
    }

    /// The covered glyphs that are also members of `glyphs`.
    pub fn intersect_set(&self, glyphs: &IntSet<GlyphId>) -> IntSet<GlyphId> {
        if (self.population() as u64) < glyphs.len() {
            self.iter().filter(|gid| glyphs.contains(*gid)).collect()
        } else {
            glyphs.iter().filter(|gid| self.get(*gid).is_some()).collect()
        }
    }
}
