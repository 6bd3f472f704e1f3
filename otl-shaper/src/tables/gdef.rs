//! The [GDEF](https://docs.microsoft.com/en-us/typography/opentype/spec/gdef) table

use otl_types::{GlyphId, Offset16, Offset32, Tag};

use crate::array::BeArray;
use crate::buffer::GlyphPropsFlags;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext, SanitizeTable};
use crate::{FontData, FontRead, ReadError};

use super::layout::{ClassDef, CoverageTable, DeviceOrVariationIndex};

/// 'GDEF'
pub const TAG: Tag = Tag::new(b"GDEF");

/// The glyph classes assigned by the GDEF glyph class definition table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GlyphClassDef {
    #[default]
    Unclassified,
    /// Single character, spacing glyph
    Base,
    /// Multiple character, spacing glyph
    Ligature,
    /// Non-spacing combining glyph
    Mark,
    /// Part of single character, spacing glyph
    Component,
}

impl GlyphClassDef {
    pub fn new(raw: u16) -> Self {
        match raw {
            1 => GlyphClassDef::Base,
            2 => GlyphClassDef::Ligature,
            3 => GlyphClassDef::Mark,
            4 => GlyphClassDef::Component,
            _ => GlyphClassDef::Unclassified,
        }
    }
}

/// The [Glyph Definition](https://docs.microsoft.com/en-us/typography/opentype/spec/gdef) table.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gdef<'a> {
    version: (u16, u16),
    glyph_class_def: Option<ClassDef<'a>>,
    attach_list: Option<AttachList<'a>>,
    lig_caret_list: Option<LigCaretList<'a>>,
    mark_attach_class_def: ClassDef<'a>,
    mark_glyph_sets: Option<MarkGlyphSets<'a>>,
}

impl<'a> FontRead<'a> for Gdef<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let major: u16 = cursor.read()?;
        let minor: u16 = cursor.read()?;
        if major != 1 {
            return Err(ReadError::InvalidFormat(major.into()));
        }
        let glyph_class_def_offset: Offset16 = cursor.read()?;
        let attach_list_offset: Offset16 = cursor.read()?;
        let lig_caret_list_offset: Offset16 = cursor.read()?;
        let mark_attach_class_def_offset: Offset16 = cursor.read()?;
        let mark_glyph_sets_offset: Offset16 = if minor >= 2 {
            cursor.read()?
        } else {
            Offset16::null()
        };
        let _item_var_store_offset: Offset32 = if minor >= 3 {
            cursor.read()?
        } else {
            Offset32::null()
        };
        cursor.finish()?;

        Ok(Gdef {
            version: (major, minor),
            glyph_class_def: glyph_class_def_offset.resolve_nullable(data).transpose()?,
            attach_list: attach_list_offset.resolve_nullable(data).transpose()?,
            lig_caret_list: lig_caret_list_offset.resolve_nullable(data).transpose()?,
            mark_attach_class_def: mark_attach_class_def_offset
                .resolve_nullable(data)
                .transpose()?
                .unwrap_or_default(),
            mark_glyph_sets: mark_glyph_sets_offset.resolve_nullable(data).transpose()?,
        })
    }
}

impl<'a> Sanitize<'a> for Gdef<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        if let Some(attach_list) = &self.attach_list {
            attach_list.sanitize(c)?;
        }
        if let Some(lig_caret_list) = &self.lig_caret_list {
            lig_caret_list.sanitize(c)?;
        }
        if let Some(mark_glyph_sets) = &self.mark_glyph_sets {
            mark_glyph_sets.sanitize(c)?;
        }
        Ok(())
    }
}

impl<'a> SanitizeTable<'a> for Gdef<'a> {
    const TAG: Tag = TAG;

    fn read_sanitized(data: FontData<'a>, c: &mut SanitizeContext) -> Result<Self, ReadError> {
        c.check(data)
    }

    fn null() -> Self {
        Gdef::default()
    }
}

impl<'a> Gdef<'a> {
    pub fn version(&self) -> (u16, u16) {
        self.version
    }

    /// `true` if the table assigns glyph classes.
    ///
    /// When it doesn't, callers are expected to synthesize classes themselves.
    pub fn has_glyph_classes(&self) -> bool {
        self.glyph_class_def.is_some()
    }

    pub fn glyph_class_def(&self) -> Option<ClassDef<'a>> {
        self.glyph_class_def
    }

    pub fn glyph_class(&self, glyph: GlyphId) -> GlyphClassDef {
        self.glyph_class_def
            .map(|class_def| GlyphClassDef::new(class_def.get(glyph)))
            .unwrap_or_default()
    }

    /// The mark attachment class of this glyph, or 0.
    pub fn mark_attachment_class(&self, glyph: GlyphId) -> u16 {
        self.mark_attach_class_def.get(glyph)
    }

    /// The glyph property bits used while applying lookups.
    pub fn glyph_props(&self, glyph: GlyphId) -> u16 {
        match self.glyph_class(glyph) {
            GlyphClassDef::Base => GlyphPropsFlags::BASE_GLYPH.bits(),
            GlyphClassDef::Ligature => GlyphPropsFlags::LIGATURE.bits(),
            GlyphClassDef::Mark => {
                let class = self.mark_attachment_class(glyph);
                GlyphPropsFlags::MARK.bits() | (class << 8)
            }
            _ => 0,
        }
    }

    /// `true` if the glyph is in the mark glyph set at this index.
    pub fn is_mark_glyph(&self, glyph: GlyphId, set_index: u16) -> bool {
        self.mark_glyph_sets
            .map(|sets| sets.contains(set_index, glyph))
            .unwrap_or(false)
    }

    pub fn mark_glyph_sets(&self) -> Option<MarkGlyphSets<'a>> {
        self.mark_glyph_sets
    }

    /// The contour point indices of the attachment points for this glyph.
    pub fn attach_points(&self, glyph: GlyphId) -> Option<BeArray<'a, u16>> {
        self.attach_list?.points(glyph)
    }

    /// The caret positions for this ligature glyph, in font units.
    ///
    /// Carets defined by contour points can't be resolved without outlines
    /// and are reported as zero.
    pub fn ligature_carets(&self, glyph: GlyphId, ppem: u16, units_per_em: u16) -> Vec<i32> {
        let Some(lig_glyph) = self.lig_caret_list.and_then(|list| list.lig_glyph(glyph)) else {
            return Vec::new();
        };
        lig_glyph
            .carets()
            .map(|caret| caret.value(ppem, units_per_em))
            .collect()
    }
}

/// Attachment point list.
#[derive(Clone, Copy, Debug)]
pub struct AttachList<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    attach_point_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for AttachList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let coverage = cursor.read::<Offset16>()?.resolve(data)?;
        let count: u16 = cursor.read()?;
        let attach_point_offsets = cursor.read_be_array(count as usize)?;
        Ok(AttachList {
            data,
            coverage,
            attach_point_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for AttachList<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.attach_point_offsets.iter() {
            c.resolve::<AttachPoint>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> AttachList<'a> {
    pub fn points(&self, glyph: GlyphId) -> Option<BeArray<'a, u16>> {
        let index = self.coverage.get(glyph)?;
        let point: AttachPoint = self
            .attach_point_offsets
            .get(index as usize)?
            .resolve(self.data)
            .ok()?;
        Some(point.point_indices)
    }
}

#[derive(Clone, Copy, Debug)]
struct AttachPoint<'a> {
    point_indices: BeArray<'a, u16>,
}

impl<'a> FontRead<'a> for AttachPoint<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let point_indices = cursor.read_be_array(count as usize)?;
        Ok(AttachPoint { point_indices })
    }
}

impl<'a> Sanitize<'a> for AttachPoint<'a> {}

/// Ligature caret list.
#[derive(Clone, Copy, Debug)]
pub struct LigCaretList<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    lig_glyph_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for LigCaretList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let coverage = cursor.read::<Offset16>()?.resolve(data)?;
        let count: u16 = cursor.read()?;
        let lig_glyph_offsets = cursor.read_be_array(count as usize)?;
        Ok(LigCaretList {
            data,
            coverage,
            lig_glyph_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for LigCaretList<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.lig_glyph_offsets.iter() {
            c.resolve::<LigGlyph>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> LigCaretList<'a> {
    pub fn lig_glyph(&self, glyph: GlyphId) -> Option<LigGlyph<'a>> {
        let index = self.coverage.get(glyph)?;
        self.lig_glyph_offsets
            .get(index as usize)?
            .resolve(self.data)
            .ok()
    }
}

/// The caret values for one ligature glyph.
#[derive(Clone, Copy, Debug)]
pub struct LigGlyph<'a> {
    data: FontData<'a>,
    caret_value_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for LigGlyph<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let caret_value_offsets = cursor.read_be_array(count as usize)?;
        Ok(LigGlyph {
            data,
            caret_value_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for LigGlyph<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.caret_value_offsets.iter() {
            c.resolve::<CaretValue>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> LigGlyph<'a> {
    pub fn carets(&self) -> impl Iterator<Item = CaretValue<'a>> + 'a {
        let data = self.data;
        self.caret_value_offsets
            .iter()
            .filter_map(move |offset| offset.resolve(data).ok())
    }
}

/// A ligature caret position.
#[derive(Clone, Copy, Debug)]
pub enum CaretValue<'a> {
    /// A coordinate in font units.
    Coordinate(i16),
    /// A contour point index.
    ContourPoint(u16),
    /// A coordinate adjusted by a device table.
    CoordinateWithDevice(i16, Option<DeviceOrVariationIndex<'a>>),
}

impl<'a> FontRead<'a> for CaretValue<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        match format {
            1 => Ok(CaretValue::Coordinate(cursor.read()?)),
            2 => Ok(CaretValue::ContourPoint(cursor.read()?)),
            3 => {
                let coordinate = cursor.read()?;
                let device = cursor
                    .read::<Offset16>()?
                    .resolve_nullable(data)
                    .transpose()?;
                Ok(CaretValue::CoordinateWithDevice(coordinate, device))
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for CaretValue<'a> {}

impl CaretValue<'_> {
    /// The caret position in font units.
    pub fn value(&self, ppem: u16, units_per_em: u16) -> i32 {
        match self {
            CaretValue::Coordinate(coord) => *coord as i32,
            CaretValue::ContourPoint(_) => 0,
            CaretValue::CoordinateWithDevice(coord, device) => {
                *coord as i32
                    + device
                        .map(|device| device.delta(ppem, units_per_em))
                        .unwrap_or(0)
            }
        }
    }
}

/// Mark glyph sets, used by lookups with the mark filtering set flag.
#[derive(Clone, Copy, Debug)]
pub struct MarkGlyphSets<'a> {
    data: FontData<'a>,
    coverage_offsets: BeArray<'a, Offset32>,
}

impl<'a> FontRead<'a> for MarkGlyphSets<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format.into()));
        }
        let count: u16 = cursor.read()?;
        let coverage_offsets = cursor.read_be_array(count as usize)?;
        Ok(MarkGlyphSets {
            data,
            coverage_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for MarkGlyphSets<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.coverage_offsets.iter() {
            c.resolve::<CoverageTable>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> MarkGlyphSets<'a> {
    pub fn len(&self) -> usize {
        self.coverage_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coverage_offsets.is_empty()
    }

    pub fn coverage(&self, set_index: u16) -> Option<CoverageTable<'a>> {
        self.coverage_offsets
            .get(set_index as usize)?
            .resolve(self.data)
            .ok()
    }

    pub fn contains(&self, set_index: u16, glyph: GlyphId) -> bool {
        self.coverage(set_index)
            .and_then(|coverage| coverage.get(glyph))
            .is_some()
    }
}
