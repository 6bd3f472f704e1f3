//! The [GSUB](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub) table

use otl_types::{GlyphId, Offset16, Tag};

use crate::array::BeArray;
use crate::digest::SetDigest;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext, SanitizeTable};
use crate::{FontData, FontRead, ReadError};

use super::layout::{
    coverage_at, ChainedSequenceContext, CoverageTable, LayoutTable, Lookup, LookupList,
    LookupSubtable, SequenceContext,
};

/// 'GSUB'
pub const TAG: Tag = Tag::new(b"GSUB");

/// The [Glyph Substitution](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub) table.
pub type Gsub<'a> = LayoutTable<'a, SubstitutionSubtable<'a>>;
/// A GSUB lookup.
pub type SubstitutionLookup<'a> = Lookup<SubstitutionSubtable<'a>>;
/// The GSUB lookup list.
pub type SubstitutionLookupList<'a> = LookupList<SubstitutionSubtable<'a>>;

/// The lookup type of extension subtables in GSUB.
pub const EXTENSION_SUBST: u16 = 7;
/// The lookup type of reverse chaining contextual single substitution.
pub const REVERSE_CHAIN_SINGLE_SUBST: u16 = 8;

/// A GSUB subtable, of any lookup type.
#[derive(Clone, Copy, Debug)]
pub enum SubstitutionSubtable<'a> {
    Single(SingleSubst<'a>),
    Multiple(MultipleSubstFormat1<'a>),
    Alternate(AlternateSubstFormat1<'a>),
    Ligature(LigatureSubstFormat1<'a>),
    Contextual(SequenceContext<'a>),
    ChainContextual(ChainedSequenceContext<'a>),
    Reverse(ReverseChainSingleSubstFormat1<'a>),
}

impl<'a> LookupSubtable<'a> for SubstitutionSubtable<'a> {
    const EXTENSION_TYPE: u16 = EXTENSION_SUBST;

    fn read_subtable(
        lookup_type: u16,
        data: FontData<'a>,
        c: &mut SanitizeContext,
    ) -> Result<Self, ReadError> {
        Ok(match lookup_type {
            1 => SubstitutionSubtable::Single(c.check(data)?),
            2 => SubstitutionSubtable::Multiple(c.check(data)?),
            3 => SubstitutionSubtable::Alternate(c.check(data)?),
            4 => SubstitutionSubtable::Ligature(c.check(data)?),
            5 => SubstitutionSubtable::Contextual(c.check(data)?),
            6 => SubstitutionSubtable::ChainContextual(c.check(data)?),
            8 => SubstitutionSubtable::Reverse(c.check(data)?),
            other => return Err(ReadError::InvalidFormat(other.into())),
        })
    }

    fn add_to_digest(&self, digest: &mut SetDigest) {
        digest.add_coverage(&self.coverage());
    }
}

impl<'a> SubstitutionSubtable<'a> {
    /// The coverage of the first glyph this subtable can match.
    pub fn coverage(&self) -> CoverageTable<'a> {
        match self {
            SubstitutionSubtable::Single(table) => table.coverage(),
            SubstitutionSubtable::Multiple(table) => table.coverage,
            SubstitutionSubtable::Alternate(table) => table.coverage,
            SubstitutionSubtable::Ligature(table) => table.coverage,
            SubstitutionSubtable::Contextual(table) => table.coverage(),
            SubstitutionSubtable::ChainContextual(table) => table.coverage(),
            SubstitutionSubtable::Reverse(table) => table.coverage,
        }
    }
}

impl<'a> SanitizeTable<'a> for Gsub<'a> {
    const TAG: Tag = TAG;

    fn read_sanitized(data: FontData<'a>, c: &mut SanitizeContext) -> Result<Self, ReadError> {
        LayoutTable::read_sanitized(data, c)
    }

    fn null() -> Self {
        LayoutTable::empty()
    }
}

impl SubstitutionLookup<'_> {
    /// `true` if this lookup is applied from the end of the buffer to the start.
    pub fn is_reverse(&self) -> bool {
        self.lookup_type() == REVERSE_CHAIN_SINGLE_SUBST
    }
}

/// [Single Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#lookuptype-1-single-substitution-subtable)
#[derive(Clone, Copy, Debug)]
pub enum SingleSubst<'a> {
    /// Add a delta to the glyph id.
    Format1 {
        coverage: CoverageTable<'a>,
        delta_glyph_id: i16,
    },
    /// Replace the glyph with the substitute at its coverage index.
    Format2 {
        coverage: CoverageTable<'a>,
        substitute_glyph_ids: BeArray<'a, GlyphId>,
    },
}

impl<'a> FontRead<'a> for SingleSubst<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        let coverage = cursor.read::<Offset16>()?.resolve(data)?;
        match format {
            1 => Ok(SingleSubst::Format1 {
                coverage,
                delta_glyph_id: cursor.read()?,
            }),
            2 => {
                let count: u16 = cursor.read()?;
                let substitute_glyph_ids = cursor.read_be_array(count as usize)?;
                Ok(SingleSubst::Format2 {
                    coverage,
                    substitute_glyph_ids,
                })
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for SingleSubst<'a> {}

impl<'a> SingleSubst<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        match self {
            SingleSubst::Format1 { coverage, .. } | SingleSubst::Format2 { coverage, .. } => {
                *coverage
            }
        }
    }

    /// The substitute for this glyph, if it is covered.
    pub fn substitute(&self, glyph: GlyphId) -> Option<GlyphId> {
        let index = self.coverage().get(glyph)?;
        self.substitute_for_index(glyph, index)
    }

    pub(crate) fn substitute_for_index(&self, glyph: GlyphId, index: u16) -> Option<GlyphId> {
        match self {
            SingleSubst::Format1 { delta_glyph_id, .. } => Some(GlyphId::new(
                // glyph ids wrap modulo 65536
                (glyph.to_u16() as i32 + *delta_glyph_id as i32) as u16,
            )),
            SingleSubst::Format2 {
                substitute_glyph_ids,
                ..
            } => substitute_glyph_ids.get(index as usize),
        }
    }
}

/// A list of glyphs, as used by Multiple and Alternate substitution.
#[derive(Clone, Copy, Debug)]
struct GlyphSequence<'a>(BeArray<'a, GlyphId>);

impl<'a> FontRead<'a> for GlyphSequence<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        cursor.read_be_array(count as usize).map(GlyphSequence)
    }
}

impl<'a> Sanitize<'a> for GlyphSequence<'a> {}

/// [Multiple Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#lookuptype-2-multiple-substitution-subtable)
#[derive(Clone, Copy, Debug)]
pub struct MultipleSubstFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    sequence_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for MultipleSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let (coverage, sequence_offsets) = read_format1_offsets(data)?;
        Ok(MultipleSubstFormat1 {
            data,
            coverage,
            sequence_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for MultipleSubstFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.sequence_offsets.iter() {
            c.resolve::<GlyphSequence>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> MultipleSubstFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn sequence_count(&self) -> usize {
        self.sequence_offsets.len()
    }

    /// The replacement sequence at this coverage index.
    pub fn sequence(&self, index: u16) -> Option<BeArray<'a, GlyphId>> {
        let seq: GlyphSequence = self
            .sequence_offsets
            .get(index as usize)?
            .resolve(self.data)
            .ok()?;
        Some(seq.0)
    }
}

/// [Alternate Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#lookuptype-3-alternate-substitution-subtable)
#[derive(Clone, Copy, Debug)]
pub struct AlternateSubstFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    alternate_set_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for AlternateSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let (coverage, alternate_set_offsets) = read_format1_offsets(data)?;
        Ok(AlternateSubstFormat1 {
            data,
            coverage,
            alternate_set_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for AlternateSubstFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.alternate_set_offsets.iter() {
            c.resolve::<GlyphSequence>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> AlternateSubstFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn alternate_set_count(&self) -> usize {
        self.alternate_set_offsets.len()
    }

    /// The alternates for the glyph at this coverage index.
    pub fn alternate_set(&self, index: u16) -> Option<BeArray<'a, GlyphId>> {
        let set: GlyphSequence = self
            .alternate_set_offsets
            .get(index as usize)?
            .resolve(self.data)
            .ok()?;
        Some(set.0)
    }
}

/// [Ligature Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#lookuptype-4-ligature-substitution-subtable)
#[derive(Clone, Copy, Debug)]
pub struct LigatureSubstFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    ligature_set_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for LigatureSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let (coverage, ligature_set_offsets) = read_format1_offsets(data)?;
        Ok(LigatureSubstFormat1 {
            data,
            coverage,
            ligature_set_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for LigatureSubstFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.ligature_set_offsets.iter() {
            c.resolve::<LigatureSet>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> LigatureSubstFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn ligature_set_count(&self) -> usize {
        self.ligature_set_offsets.len()
    }

    /// The ligatures starting with the glyph at this coverage index.
    pub fn ligature_set(&self, index: u16) -> Option<LigatureSet<'a>> {
        self.ligature_set_offsets
            .get(index as usize)?
            .resolve(self.data)
            .ok()
    }
}

/// All ligatures beginning with the same glyph, in order of preference.
#[derive(Clone, Copy, Debug)]
pub struct LigatureSet<'a> {
    data: FontData<'a>,
    ligature_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for LigatureSet<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let ligature_offsets = cursor.read_be_array(count as usize)?;
        Ok(LigatureSet {
            data,
            ligature_offsets,
        })
    }
}

impl<'a> Sanitize<'a> for LigatureSet<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.ligature_offsets.iter() {
            c.resolve::<Ligature>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> LigatureSet<'a> {
    pub fn len(&self) -> usize {
        self.ligature_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ligature_offsets.is_empty()
    }

    pub fn ligatures(&self) -> impl Iterator<Item = Ligature<'a>> + 'a {
        let data = self.data;
        self.ligature_offsets
            .iter()
            .filter_map(move |offset| offset.resolve(data).ok())
    }
}

/// A single ligature: the output glyph and the components after the first.
#[derive(Clone, Copy, Debug)]
pub struct Ligature<'a> {
    ligature_glyph: GlyphId,
    component_count: u16,
    component_glyph_ids: BeArray<'a, GlyphId>,
}

impl<'a> FontRead<'a> for Ligature<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let ligature_glyph = cursor.read()?;
        let component_count: u16 = cursor.read()?;
        let component_glyph_ids =
            cursor.read_be_array(component_count.saturating_sub(1) as usize)?;
        Ok(Ligature {
            ligature_glyph,
            component_count,
            component_glyph_ids,
        })
    }
}

impl<'a> Sanitize<'a> for Ligature<'a> {}

impl<'a> Ligature<'a> {
    pub fn ligature_glyph(&self) -> GlyphId {
        self.ligature_glyph
    }

    /// The number of components, including the first.
    pub fn component_count(&self) -> u16 {
        self.component_count
    }

    /// The components after the first.
    pub fn component_glyph_ids(&self) -> BeArray<'a, GlyphId> {
        self.component_glyph_ids
    }
}

/// [Reverse Chaining Contextual Single Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#lookuptype-8-reverse-chaining-contextual-single-substitution-subtable)
#[derive(Clone, Copy, Debug)]
pub struct ReverseChainSingleSubstFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    backtrack_coverage_offsets: BeArray<'a, Offset16>,
    lookahead_coverage_offsets: BeArray<'a, Offset16>,
    substitute_glyph_ids: BeArray<'a, GlyphId>,
}

impl<'a> FontRead<'a> for ReverseChainSingleSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format.into()));
        }
        let coverage = cursor.read::<Offset16>()?.resolve(data)?;
        let backtrack_count: u16 = cursor.read()?;
        let backtrack_coverage_offsets = cursor.read_be_array(backtrack_count as usize)?;
        let lookahead_count: u16 = cursor.read()?;
        let lookahead_coverage_offsets = cursor.read_be_array(lookahead_count as usize)?;
        let glyph_count: u16 = cursor.read()?;
        let substitute_glyph_ids = cursor.read_be_array(glyph_count as usize)?;
        Ok(ReverseChainSingleSubstFormat1 {
            data,
            coverage,
            backtrack_coverage_offsets,
            lookahead_coverage_offsets,
            substitute_glyph_ids,
        })
    }
}

impl<'a> Sanitize<'a> for ReverseChainSingleSubstFormat1<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self
            .backtrack_coverage_offsets
            .iter()
            .chain(self.lookahead_coverage_offsets.iter())
        {
            c.resolve::<CoverageTable>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> ReverseChainSingleSubstFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn backtrack_glyph_count(&self) -> usize {
        self.backtrack_coverage_offsets.len()
    }

    pub fn lookahead_glyph_count(&self) -> usize {
        self.lookahead_coverage_offsets.len()
    }

    /// Backtrack coverages, nearest to the input glyph first.
    pub fn backtrack_coverage(&self, index: usize) -> CoverageTable<'a> {
        coverage_at(self.data, self.backtrack_coverage_offsets.get(index))
    }

    pub fn lookahead_coverage(&self, index: usize) -> CoverageTable<'a> {
        coverage_at(self.data, self.lookahead_coverage_offsets.get(index))
    }

    pub fn substitute_glyph_ids(&self) -> BeArray<'a, GlyphId> {
        self.substitute_glyph_ids
    }
}

// format 1 subtables of types 2, 3 and 4 share a header:
// format, coverage offset, count, offsets
fn read_format1_offsets(
    data: FontData,
) -> Result<(CoverageTable, BeArray<Offset16>), ReadError> {
    let mut cursor = data.cursor();
    let format: u16 = cursor.read()?;
    if format != 1 {
        return Err(ReadError::InvalidFormat(format.into()));
    }
    let coverage = cursor.read::<Offset16>()?.resolve(data)?;
    let count: u16 = cursor.read()?;
    let offsets = cursor.read_be_array(count as usize)?;
    Ok((coverage, offsets))
}
