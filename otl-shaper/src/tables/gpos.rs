//! The [GPOS](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos) table

mod anchor;
mod value_record;

use bytemuck::{Pod, Zeroable};
use otl_types::{GlyphId, Offset16, Scalar, Tag};

use crate::array::BeArray;
use crate::digest::SetDigest;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext, SanitizeTable};
use crate::{FontData, FontRead, FontReadWithArgs, ReadError};

use super::layout::{
    ChainedSequenceContext, ClassDef, CoverageTable, LayoutTable, Lookup, LookupList,
    LookupSubtable, SequenceContext,
};

pub use anchor::{AnchorMatrix, AnchorTable, LigatureArray, MarkArray, MarkRecord};
pub use value_record::{Adjustment, ValueFormat, ValueRecord};

/// 'GPOS'
pub const TAG: Tag = Tag::new(b"GPOS");

/// The [Glyph Positioning](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos) table.
pub type Gpos<'a> = LayoutTable<'a, PositionSubtable<'a>>;
/// A GPOS lookup.
pub type PositionLookup<'a> = Lookup<PositionSubtable<'a>>;
/// The GPOS lookup list.
pub type PositionLookupList<'a> = LookupList<PositionSubtable<'a>>;

/// The lookup type of extension subtables in GPOS.
pub const EXTENSION_POS: u16 = 9;

/// A GPOS subtable, of any lookup type.
#[derive(Clone, Copy, Debug)]
pub enum PositionSubtable<'a> {
    Single(SinglePos<'a>),
    Pair(PairPos<'a>),
    Cursive(CursivePosFormat1<'a>),
    MarkToBase(MarkBasePosFormat1<'a>),
    MarkToLigature(MarkLigPosFormat1<'a>),
    MarkToMark(MarkMarkPosFormat1<'a>),
    Contextual(SequenceContext<'a>),
    ChainContextual(ChainedSequenceContext<'a>),
}

impl<'a> LookupSubtable<'a> for PositionSubtable<'a> {
    const EXTENSION_TYPE: u16 = EXTENSION_POS;

    fn read_subtable(
        lookup_type: u16,
        data: FontData<'a>,
        c: &mut SanitizeContext,
    ) -> Result<Self, ReadError> {
        Ok(match lookup_type {
            1 => PositionSubtable::Single(c.check(data)?),
            2 => PositionSubtable::Pair(c.check(data)?),
            3 => PositionSubtable::Cursive(c.check(data)?),
            4 => PositionSubtable::MarkToBase(c.check(data)?),
            5 => PositionSubtable::MarkToLigature(c.check(data)?),
            6 => PositionSubtable::MarkToMark(c.check(data)?),
            7 => PositionSubtable::Contextual(c.check(data)?),
            8 => PositionSubtable::ChainContextual(c.check(data)?),
            other => return Err(ReadError::InvalidFormat(other.into())),
        })
    }

    fn add_to_digest(&self, digest: &mut SetDigest) {
        digest.add_coverage(&self.coverage());
    }
}

impl<'a> PositionSubtable<'a> {
    /// The coverage of the glyph this subtable is applied at.
    pub fn coverage(&self) -> CoverageTable<'a> {
        match self {
            PositionSubtable::Single(table) => table.coverage(),
            PositionSubtable::Pair(table) => table.coverage(),
            PositionSubtable::Cursive(table) => table.coverage,
            PositionSubtable::MarkToBase(table) => table.mark_coverage,
            PositionSubtable::MarkToLigature(table) => table.mark_coverage,
            PositionSubtable::MarkToMark(table) => table.mark1_coverage,
            PositionSubtable::Contextual(table) => table.coverage(),
            PositionSubtable::ChainContextual(table) => table.coverage(),
        }
    }
}

impl<'a> SanitizeTable<'a> for Gpos<'a> {
    const TAG: Tag = TAG;

    fn read_sanitized(data: FontData<'a>, c: &mut SanitizeContext) -> Result<Self, ReadError> {
        LayoutTable::read_sanitized(data, c)
    }

    fn null() -> Self {
        LayoutTable::empty()
    }
}

/// [Single Adjustment Positioning](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#lookup-type-1-single-adjustment-positioning-subtable)
#[derive(Clone, Copy, Debug)]
pub enum SinglePos<'a> {
    /// One value record for every covered glyph.
    Format1 {
        coverage: CoverageTable<'a>,
        value_record: ValueRecord<'a>,
    },
    /// One value record per coverage index.
    Format2 {
        data: FontData<'a>,
        coverage: CoverageTable<'a>,
        value_format: ValueFormat,
        value_count: u16,
        values_offset: usize,
    },
}

impl<'a> FontRead<'a> for SinglePos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        let coverage = cursor.read::<Offset16>()?.resolve(data)?;
        let value_format: ValueFormat = cursor.read()?;
        match format {
            1 => {
                let value_record =
                    ValueRecord::read(data, data, cursor.position(), value_format)?;
                Ok(SinglePos::Format1 {
                    coverage,
                    value_record,
                })
            }
            2 => {
                let value_count: u16 = cursor.read()?;
                let values_offset = cursor.position();
                cursor.advance_by(value_count as usize * value_format.record_byte_len());
                cursor.finish()?;
                Ok(SinglePos::Format2 {
                    data,
                    coverage,
                    value_format,
                    value_count,
                    values_offset,
                })
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for SinglePos<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        match self {
            SinglePos::Format1 { value_record, .. } => value_record.sanitize(c),
            SinglePos::Format2 {
                value_format,
                value_count,
                ..
            } => {
                if value_format.intersects(ValueFormat::ANY_DEVICE_OR_VARIDX) {
                    for i in 0..*value_count {
                        if let Some(record) = self.value_record(i) {
                            record.sanitize(c)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

impl<'a> SinglePos<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        match self {
            SinglePos::Format1 { coverage, .. } | SinglePos::Format2 { coverage, .. } => *coverage,
        }
    }

    /// The value record for the glyph at this coverage index.
    pub fn value_record(&self, index: u16) -> Option<ValueRecord<'a>> {
        match self {
            SinglePos::Format1 { value_record, .. } => Some(*value_record),
            SinglePos::Format2 {
                data,
                value_format,
                value_count,
                values_offset,
                ..
            } => {
                if index >= *value_count {
                    return None;
                }
                let offset = values_offset + index as usize * value_format.record_byte_len();
                ValueRecord::read(*data, *data, offset, *value_format).ok()
            }
        }
    }
}

/// [Pair Adjustment Positioning](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#lookup-type-2-pair-adjustment-positioning-subtable)
#[derive(Clone, Copy, Debug)]
pub enum PairPos<'a> {
    Format1(PairPosFormat1<'a>),
    Format2(PairPosFormat2<'a>),
}

/// Pair adjustment for individual glyph pairs.
#[derive(Clone, Copy, Debug)]
pub struct PairPosFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    value_formats: (ValueFormat, ValueFormat),
    pair_set_offsets: BeArray<'a, Offset16>,
}

/// Pair adjustment by class of the first and second glyph.
#[derive(Clone, Copy, Debug)]
pub struct PairPosFormat2<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    value_formats: (ValueFormat, ValueFormat),
    class_def1: ClassDef<'a>,
    class_def2: ClassDef<'a>,
    class1_count: u16,
    class2_count: u16,
    records_offset: usize,
}

impl<'a> FontRead<'a> for PairPos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        let coverage = cursor.read::<Offset16>()?.resolve(data)?;
        let value_formats = (cursor.read()?, cursor.read()?);
        match format {
            1 => {
                let count: u16 = cursor.read()?;
                let pair_set_offsets = cursor.read_be_array(count as usize)?;
                Ok(PairPos::Format1(PairPosFormat1 {
                    data,
                    coverage,
                    value_formats,
                    pair_set_offsets,
                }))
            }
            2 => {
                let class_def1 = cursor.read::<Offset16>()?.resolve(data)?;
                let class_def2 = cursor.read::<Offset16>()?.resolve(data)?;
                let class1_count: u16 = cursor.read()?;
                let class2_count: u16 = cursor.read()?;
                let records_offset = cursor.position();
                let record_len =
                    value_formats.0.record_byte_len() + value_formats.1.record_byte_len();
                cursor.advance_by(class1_count as usize * class2_count as usize * record_len);
                cursor.finish()?;
                Ok(PairPos::Format2(PairPosFormat2 {
                    data,
                    coverage,
                    value_formats,
                    class_def1,
                    class_def2,
                    class1_count,
                    class2_count,
                    records_offset,
                }))
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for PairPos<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        match self {
            PairPos::Format1(table) => {
                for offset in table.pair_set_offsets.iter() {
                    c.charge(1)?;
                    let set: PairSet = offset.resolve_with_args(table.data, &table.value_formats)?;
                    set.sanitize(c)?;
                }
                Ok(())
            }
            PairPos::Format2(table) => {
                let (format1, format2) = table.value_formats;
                if (format1 | format2).intersects(ValueFormat::ANY_DEVICE_OR_VARIDX) {
                    for class1 in 0..table.class1_count {
                        for class2 in 0..table.class2_count {
                            if let Some((first, second)) = table.values(class1, class2) {
                                first.sanitize(c)?;
                                second.sanitize(c)?;
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

impl<'a> PairPos<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        match self {
            PairPos::Format1(table) => table.coverage,
            PairPos::Format2(table) => table.coverage,
        }
    }

    /// The formats of the records for the first and second glyph.
    pub fn value_formats(&self) -> (ValueFormat, ValueFormat) {
        match self {
            PairPos::Format1(table) => table.value_formats,
            PairPos::Format2(table) => table.value_formats,
        }
    }

    /// The adjustments for a pair, given the first glyph's coverage index.
    pub fn adjustments(
        &self,
        coverage_index: u16,
        first: GlyphId,
        second: GlyphId,
    ) -> Option<(ValueRecord<'a>, ValueRecord<'a>)> {
        match self {
            PairPos::Format1(table) => table.pair_set(coverage_index)?.find(second),
            PairPos::Format2(table) => {
                let class1 = table.class_def1.get(first);
                let class2 = table.class_def2.get(second);
                table.values(class1, class2)
            }
        }
    }
}

impl<'a> PairPosFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn pair_set_count(&self) -> usize {
        self.pair_set_offsets.len()
    }

    /// The pairs beginning with the glyph at this coverage index.
    pub fn pair_set(&self, index: u16) -> Option<PairSet<'a>> {
        self.pair_set_offsets
            .get(index as usize)?
            .resolve_with_args(self.data, &self.value_formats)
            .ok()
    }
}

impl<'a> PairPosFormat2<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn class_def1(&self) -> ClassDef<'a> {
        self.class_def1
    }

    pub fn class_def2(&self) -> ClassDef<'a> {
        self.class_def2
    }

    pub fn class1_count(&self) -> u16 {
        self.class1_count
    }

    pub fn class2_count(&self) -> u16 {
        self.class2_count
    }

    /// The value records for a (class1, class2) pair.
    pub fn values(&self, class1: u16, class2: u16) -> Option<(ValueRecord<'a>, ValueRecord<'a>)> {
        if class1 >= self.class1_count || class2 >= self.class2_count {
            return None;
        }
        let (format1, format2) = self.value_formats;
        let record_len = format1.record_byte_len() + format2.record_byte_len();
        let index = class1 as usize * self.class2_count as usize + class2 as usize;
        let offset = self.records_offset + index * record_len;
        let first = ValueRecord::read(self.data, self.data, offset, format1).ok()?;
        let second = ValueRecord::read(
            self.data,
            self.data,
            offset + format1.record_byte_len(),
            format2,
        )
        .ok()?;
        Some((first, second))
    }
}

/// A set of [PairValueRecords](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#pair-adjustment-positioning-format-1-adjustments-for-glyph-pairs),
/// sorted by second glyph.
///
/// Device offsets in these records resolve against the PairSet itself.
#[derive(Clone, Copy, Debug)]
pub struct PairSet<'a> {
    data: FontData<'a>,
    value_formats: (ValueFormat, ValueFormat),
    count: u16,
}

impl<'a> FontReadWithArgs<'a> for PairSet<'a> {
    type Args = (ValueFormat, ValueFormat);

    fn read_with_args(
        data: FontData<'a>,
        value_formats: &(ValueFormat, ValueFormat),
    ) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let set = PairSet {
            data,
            value_formats: *value_formats,
            count,
        };
        cursor.advance_by(count as usize * set.record_len());
        cursor.finish()?;
        Ok(set)
    }
}

impl<'a> PairSet<'a> {
    const RECORDS_OFFSET: usize = u16::RAW_BYTE_LEN;

    fn record_len(&self) -> usize {
        GlyphId::RAW_BYTE_LEN
            + self.value_formats.0.record_byte_len()
            + self.value_formats.1.record_byte_len()
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn second_glyph(&self, index: usize) -> Option<GlyphId> {
        self.data
            .read_at(Self::RECORDS_OFFSET + index * self.record_len())
            .ok()
    }

    fn records_at(&self, index: usize) -> Option<(ValueRecord<'a>, ValueRecord<'a>)> {
        let start = Self::RECORDS_OFFSET + index * self.record_len() + GlyphId::RAW_BYTE_LEN;
        let (format1, format2) = self.value_formats;
        let first = ValueRecord::read(self.data, self.data, start, format1).ok()?;
        let second = ValueRecord::read(
            self.data,
            self.data,
            start + format1.record_byte_len(),
            format2,
        )
        .ok()?;
        Some((first, second))
    }

    /// The records for the pair ending in `second`.
    pub fn find(&self, second: GlyphId) -> Option<(ValueRecord<'a>, ValueRecord<'a>)> {
        let (mut lo, mut hi) = (0usize, self.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            let glyph = self.second_glyph(mid)?;
            match glyph.cmp(&second) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return self.records_at(mid),
            }
        }
        None
    }

    /// The second glyphs of every pair in the set.
    pub fn second_glyphs(&self) -> impl Iterator<Item = GlyphId> + '_ {
        (0..self.len()).filter_map(|i| self.second_glyph(i))
    }

    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        let (format1, format2) = self.value_formats;
        if !(format1 | format2).intersects(ValueFormat::ANY_DEVICE_OR_VARIDX) {
            return Ok(());
        }
        for i in 0..self.len() {
            if let Some((first, second)) = self.records_at(i) {
                first.sanitize(c)?;
                second.sanitize(c)?;
            }
        }
        Ok(())
    }
}

/// Part of [CursivePosFormat1]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct EntryExitRecord {
    entry_anchor_offset: [u8; 2],
    exit_anchor_offset: [u8; 2],
}

impl EntryExitRecord {
    /// Offset to entryAnchor table, from beginning of CursivePos subtable (may be NULL).
    pub fn entry_anchor_offset(&self) -> Offset16 {
        Offset16::from_raw(self.entry_anchor_offset)
    }

    /// Offset to exitAnchor table, from beginning of CursivePos subtable (may be NULL).
    pub fn exit_anchor_offset(&self) -> Offset16 {
        Offset16::from_raw(self.exit_anchor_offset)
    }
}

/// [Cursive Attachment Positioning](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#lookup-type-3-cursive-attachment-positioning-subtable)
#[derive(Clone, Copy, Debug)]
pub struct CursivePosFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    entry_exit_records: &'a [EntryExitRecord],
}

impl<'a> FontRead<'a> for CursivePosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format.into()));
        }
        let coverage = cursor.read::<Offset16>()?.resolve(data)?;
        let count: u16 = cursor.read()?;
        let entry_exit_records = cursor.read_records(count as usize)?;
        Ok(CursivePosFormat1 {
            data,
            coverage,
            entry_exit_records,
        })
    }
}

impl<'a> Sanitize<'a> for CursivePosFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for record in self.entry_exit_records {
            c.resolve_nullable::<AnchorTable>(record.entry_anchor_offset(), self.data)?;
            c.resolve_nullable::<AnchorTable>(record.exit_anchor_offset(), self.data)?;
        }
        Ok(())
    }
}

impl<'a> CursivePosFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn entry_exit_records(&self) -> &'a [EntryExitRecord] {
        self.entry_exit_records
    }

    /// The entry anchor of the glyph at this coverage index.
    pub fn entry_anchor(&self, index: u16) -> Option<AnchorTable<'a>> {
        let record = self.entry_exit_records.get(index as usize)?;
        record.entry_anchor_offset().resolve_nullable(self.data)?.ok()
    }

    /// The exit anchor of the glyph at this coverage index.
    pub fn exit_anchor(&self, index: u16) -> Option<AnchorTable<'a>> {
        let record = self.entry_exit_records.get(index as usize)?;
        record.exit_anchor_offset().resolve_nullable(self.data)?.ok()
    }
}

// the three mark attachment formats share a header:
// format, coverage, coverage, class count, mark array, anchor array
struct MarkAttachHeader<'a> {
    mark_coverage: CoverageTable<'a>,
    target_coverage: CoverageTable<'a>,
    mark_class_count: u16,
    mark_array: MarkArray<'a>,
    target_array_offset: Offset16,
}

impl<'a> MarkAttachHeader<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format.into()));
        }
        Ok(MarkAttachHeader {
            mark_coverage: cursor.read::<Offset16>()?.resolve(data)?,
            target_coverage: cursor.read::<Offset16>()?.resolve(data)?,
            mark_class_count: cursor.read()?,
            mark_array: cursor.read::<Offset16>()?.resolve(data)?,
            target_array_offset: cursor.read()?,
        })
    }
}

/// [Mark-to-Base Attachment Positioning](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#lookup-type-4-mark-to-base-attachment-positioning-subtable)
#[derive(Clone, Copy, Debug)]
pub struct MarkBasePosFormat1<'a> {
    mark_coverage: CoverageTable<'a>,
    base_coverage: CoverageTable<'a>,
    mark_class_count: u16,
    mark_array: MarkArray<'a>,
    base_array: AnchorMatrix<'a>,
}

impl<'a> FontRead<'a> for MarkBasePosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let header = MarkAttachHeader::read(data)?;
        let base_array = header
            .target_array_offset
            .resolve_with_args(data, &header.mark_class_count)?;
        Ok(MarkBasePosFormat1 {
            mark_coverage: header.mark_coverage,
            base_coverage: header.target_coverage,
            mark_class_count: header.mark_class_count,
            mark_array: header.mark_array,
            base_array,
        })
    }
}

impl<'a> Sanitize<'a> for MarkBasePosFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        self.mark_array.sanitize(c)?;
        self.base_array.sanitize(c)
    }
}

impl<'a> MarkBasePosFormat1<'a> {
    pub fn mark_coverage(&self) -> CoverageTable<'a> {
        self.mark_coverage
    }

    pub fn base_coverage(&self) -> CoverageTable<'a> {
        self.base_coverage
    }

    pub fn mark_class_count(&self) -> u16 {
        self.mark_class_count
    }

    pub fn mark_array(&self) -> MarkArray<'a> {
        self.mark_array
    }

    /// The base anchors: one row per covered base, one column per mark class.
    pub fn base_array(&self) -> AnchorMatrix<'a> {
        self.base_array
    }
}

/// [Mark-to-Ligature Attachment Positioning](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#lookup-type-5-mark-to-ligature-attachment-positioning-subtable)
#[derive(Clone, Copy, Debug)]
pub struct MarkLigPosFormat1<'a> {
    mark_coverage: CoverageTable<'a>,
    ligature_coverage: CoverageTable<'a>,
    mark_class_count: u16,
    mark_array: MarkArray<'a>,
    ligature_array: LigatureArray<'a>,
}

impl<'a> FontRead<'a> for MarkLigPosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let header = MarkAttachHeader::read(data)?;
        let ligature_array = header
            .target_array_offset
            .resolve_with_args(data, &header.mark_class_count)?;
        Ok(MarkLigPosFormat1 {
            mark_coverage: header.mark_coverage,
            ligature_coverage: header.target_coverage,
            mark_class_count: header.mark_class_count,
            mark_array: header.mark_array,
            ligature_array,
        })
    }
}

impl<'a> Sanitize<'a> for MarkLigPosFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        self.mark_array.sanitize(c)?;
        self.ligature_array.sanitize(c)
    }
}

impl<'a> MarkLigPosFormat1<'a> {
    pub fn mark_coverage(&self) -> CoverageTable<'a> {
        self.mark_coverage
    }

    pub fn ligature_coverage(&self) -> CoverageTable<'a> {
        self.ligature_coverage
    }

    pub fn mark_class_count(&self) -> u16 {
        self.mark_class_count
    }

    pub fn mark_array(&self) -> MarkArray<'a> {
        self.mark_array
    }

    pub fn ligature_array(&self) -> LigatureArray<'a> {
        self.ligature_array
    }
}

/// [Mark-to-Mark Attachment Positioning](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#lookup-type-6-mark-to-mark-attachment-positioning-subtable)
#[derive(Clone, Copy, Debug)]
pub struct MarkMarkPosFormat1<'a> {
    mark1_coverage: CoverageTable<'a>,
    mark2_coverage: CoverageTable<'a>,
    mark_class_count: u16,
    mark1_array: MarkArray<'a>,
    mark2_array: AnchorMatrix<'a>,
}

impl<'a> FontRead<'a> for MarkMarkPosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let header = MarkAttachHeader::read(data)?;
        let mark2_array = header
            .target_array_offset
            .resolve_with_args(data, &header.mark_class_count)?;
        Ok(MarkMarkPosFormat1 {
            mark1_coverage: header.mark_coverage,
            mark2_coverage: header.target_coverage,
            mark_class_count: header.mark_class_count,
            mark1_array: header.mark_array,
            mark2_array,
        })
    }
}

impl<'a> Sanitize<'a> for MarkMarkPosFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        self.mark1_array.sanitize(c)?;
        self.mark2_array.sanitize(c)
    }
}

impl<'a> MarkMarkPosFormat1<'a> {
    /// The coverage of the attaching mark.
    pub fn mark1_coverage(&self) -> CoverageTable<'a> {
        self.mark1_coverage
    }

    /// The coverage of the mark being attached to.
    pub fn mark2_coverage(&self) -> CoverageTable<'a> {
        self.mark2_coverage
    }

    pub fn mark_class_count(&self) -> u16 {
        self.mark_class_count
    }

    pub fn mark1_array(&self) -> MarkArray<'a> {
        self.mark1_array
    }

    pub fn mark2_array(&self) -> AnchorMatrix<'a> {
        self.mark2_array
    }
}

#[cfg(test)]
#[path = "../tests/gpos.rs"]
mod tests;
