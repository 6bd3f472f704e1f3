//! Class definition tables

use otl_types::GlyphId;

use crate::array::BeArray;
use crate::collections::IntSet;
use crate::sanitize::Sanitize;
use crate::{FontData, FontRead, ReadError};

/// A [Class Definition Table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#class-definition-table).
///
/// Glyphs not assigned a class by the table are in class 0.
#[derive(Clone, Copy, Debug, Default)]
pub enum ClassDef<'a> {
    #[default]
    Empty,
    Format1 {
        start_glyph_id: GlyphId,
        class_values: BeArray<'a, u16>,
    },
    Format2(&'a [ClassRangeRecord]),
}

/// A range of glyphs that share a class.
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ClassRangeRecord {
    start_glyph_id: [u8; 2],
    end_glyph_id: [u8; 2],
    class: [u8; 2],
}

impl ClassRangeRecord {
    pub fn start_glyph_id(&self) -> GlyphId {
        GlyphId::new(u16::from_be_bytes(self.start_glyph_id))
    }

    pub fn end_glyph_id(&self) -> GlyphId {
        GlyphId::new(u16::from_be_bytes(self.end_glyph_id))
    }

    pub fn class(&self) -> u16 {
        u16::from_be_bytes(self.class)
    }
}

impl<'a> FontRead<'a> for ClassDef<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        match format {
            1 => {
                let start_glyph_id = cursor.read()?;
                let count: u16 = cursor.read()?;
                let class_values = cursor.read_be_array(count as usize)?;
                Ok(ClassDef::Format1 {
                    start_glyph_id,
                    class_values,
                })
            }
            2 => {
                let count: u16 = cursor.read()?;
                cursor.read_records(count as usize).map(ClassDef::Format2)
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for ClassDef<'a> {}

impl<'a> ClassDef<'a> {
    /// Get the class for this glyph id
    pub fn get(&self, glyph: GlyphId) -> u16 {
        match self {
            ClassDef::Empty => 0,
            ClassDef::Format1 {
                start_glyph_id,
                class_values,
            } => glyph
                .to_u16()
                .checked_sub(start_glyph_id.to_u16())
                .and_then(|idx| class_values.get(idx as usize))
                .unwrap_or(0),
            ClassDef::Format2(ranges) => ranges
                .binary_search_by(|rec| {
                    if glyph < rec.start_glyph_id() {
                        std::cmp::Ordering::Greater
                    } else if glyph > rec.end_glyph_id() {
                        std::cmp::Ordering::Less
                    } else {
                        std::cmp::Ordering::Equal
                    }
                })
                .map(|idx| ranges[idx].class())
                .unwrap_or(0),
        }
    }

    /// Iterate over each glyph with an explicitly assigned class.
    ///
    /// Glyphs assigned class 0 explicitly are included.
    pub fn iter(&self) -> impl Iterator<Item = (GlyphId, u16)> + 'a {
        let (format1, format2) = match *self {
            ClassDef::Empty => (None, None),
            ClassDef::Format1 {
                start_glyph_id,
                class_values,
            } => (Some((start_glyph_id, class_values)), None),
            ClassDef::Format2(ranges) => (None, Some(ranges)),
        };
        let format1 = format1.into_iter().flat_map(|(start, values)| {
            values
                .iter()
                .enumerate()
                .map(move |(i, class)| (GlyphId::new(start.to_u16().wrapping_add(i as u16)), class))
        });
        let format2 = format2.into_iter().flatten().flat_map(|rec| {
            let class = rec.class();
            (rec.start_glyph_id().to_u16()..=rec.end_glyph_id().to_u16())
                .map(move |gid| (GlyphId::new(gid), class))
        });
        format1.chain(format2)
    }

    /// Add every glyph assigned `class` to `glyphs`.
    ///
    /// Class 0 is the set of glyphs *not* listed, which can't be enumerated
    /// without knowing the number of glyphs in the font, so it adds nothing.
    pub fn add_class(&self, class: u16, glyphs: &mut IntSet<GlyphId>) {
        if class == 0 {
            return;
        }
        match self {
            ClassDef::Format2(ranges) => ranges
                .iter()
                .filter(|rec| rec.class() == class && rec.start_glyph_id() <= rec.end_glyph_id())
                .for_each(|rec| glyphs.insert_range(rec.start_glyph_id()..=rec.end_glyph_id())),
            _ => glyphs.extend(
                self.iter()
                    .filter(|(_, cls)| *cls == class)
                    .map(|(gid, _)| gid),
            ),
        }
    }

    /// Returns `true` if any glyph in `glyphs` has class `class`.
    pub fn intersects_class(&self, glyphs: &IntSet<GlyphId>, class: u16) -> bool {
        glyphs.iter().any(|gid| self.get(gid) == class)
    }

    /// The members of `glyphs` that have class `class`.
    pub fn intersected_class_glyphs(&self, glyphs: &IntSet<GlyphId>, class: u16) -> IntSet<GlyphId> {
        glyphs.iter().filter(|gid| self.get(*gid) == class).collect()
    }
}
