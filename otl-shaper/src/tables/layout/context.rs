//! Sequence context tables, used by contextual lookups in both GSUB and GPOS

use otl_types::Offset16;

use crate::array::BeArray;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext};
use crate::{FontData, FontRead, ReadError};

use super::{ClassDef, CoverageTable};

/// A (sequence index, lookup index) pair naming a nested lookup to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SequenceLookupRecord {
    sequence_index: [u8; 2],
    lookup_list_index: [u8; 2],
}

impl SequenceLookupRecord {
    /// Index (zero-based) into the input glyph sequence
    pub fn sequence_index(&self) -> u16 {
        u16::from_be_bytes(self.sequence_index)
    }

    /// Index (zero-based) into the LookupList
    pub fn lookup_list_index(&self) -> u16 {
        u16::from_be_bytes(self.lookup_list_index)
    }
}

/// Resolve a coverage offset that has already been sanitized.
pub(crate) fn coverage_at<'a>(data: FontData<'a>, offset: Option<Offset16>) -> CoverageTable<'a> {
    offset
        .and_then(|offset| offset.resolve(data).ok())
        .unwrap_or_default()
}

fn sanitize_coverages(
    data: FontData,
    offsets: BeArray<Offset16>,
    c: &mut SanitizeContext,
) -> Result<(), ReadError> {
    for offset in offsets.iter() {
        c.resolve::<CoverageTable>(offset, data)?;
    }
    Ok(())
}

/// A set of rules, shared by format 1 and format 2 sequence contexts.
///
/// In format 1 the rule values are glyph ids; in format 2 they are classes.
#[derive(Clone, Copy, Debug)]
pub struct SequenceRuleSet<'a> {
    data: FontData<'a>,
    rule_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for SequenceRuleSet<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let rule_offsets = cursor.read_be_array(count as usize)?;
        Ok(SequenceRuleSet { data, rule_offsets })
    }
}

impl<'a> Sanitize<'a> for SequenceRuleSet<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.rule_offsets.iter() {
            c.resolve::<SequenceRule>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> SequenceRuleSet<'a> {
    pub fn len(&self) -> usize {
        self.rule_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_offsets.is_empty()
    }

    /// The rules, in order of preference.
    pub fn rules(&self) -> impl Iterator<Item = SequenceRule<'a>> + 'a {
        let data = self.data;
        self.rule_offsets
            .iter()
            .filter_map(move |offset| offset.resolve(data).ok())
    }
}

/// A single rule: the input sequence after the first glyph, and the
/// lookups to apply when it matches.
#[derive(Clone, Copy, Debug)]
pub struct SequenceRule<'a> {
    glyph_count: u16,
    input_sequence: BeArray<'a, u16>,
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for SequenceRule<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let glyph_count: u16 = cursor.read()?;
        let seq_lookup_count: u16 = cursor.read()?;
        let input_sequence = cursor.read_be_array(glyph_count.saturating_sub(1) as usize)?;
        let seq_lookup_records = cursor.read_records(seq_lookup_count as usize)?;
        Ok(SequenceRule {
            glyph_count,
            input_sequence,
            seq_lookup_records,
        })
    }
}

impl<'a> Sanitize<'a> for SequenceRule<'a> {}

impl<'a> SequenceRule<'a> {
    /// The number of glyphs in the input sequence, including the first.
    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    /// The input values, not including the first glyph.
    pub fn input_sequence(&self) -> BeArray<'a, u16> {
        self.input_sequence
    }

    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}

/// [Sequence Context](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#sequence-context-format-1-simple-glyph-contexts)
#[derive(Clone, Copy, Debug)]
pub enum SequenceContext<'a> {
    Format1(SequenceContextFormat1<'a>),
    Format2(SequenceContextFormat2<'a>),
    Format3(SequenceContextFormat3<'a>),
}

/// Simple glyph contexts.
#[derive(Clone, Copy, Debug)]
pub struct SequenceContextFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    rule_set_offsets: BeArray<'a, Offset16>,
}

/// Class-based glyph contexts.
#[derive(Clone, Copy, Debug)]
pub struct SequenceContextFormat2<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    class_def: ClassDef<'a>,
    rule_set_offsets: BeArray<'a, Offset16>,
}

/// Coverage-based glyph contexts.
#[derive(Clone, Copy, Debug)]
pub struct SequenceContextFormat3<'a> {
    data: FontData<'a>,
    coverage_offsets: BeArray<'a, Offset16>,
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for SequenceContext<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        match format {
            1 => {
                let coverage = cursor.read::<Offset16>()?.resolve(data)?;
                let count: u16 = cursor.read()?;
                let rule_set_offsets = cursor.read_be_array(count as usize)?;
                Ok(SequenceContext::Format1(SequenceContextFormat1 {
                    data,
                    coverage,
                    rule_set_offsets,
                }))
            }
            2 => {
                let coverage = cursor.read::<Offset16>()?.resolve(data)?;
                let class_def = cursor.read::<Offset16>()?.resolve(data)?;
                let count: u16 = cursor.read()?;
                let rule_set_offsets = cursor.read_be_array(count as usize)?;
                Ok(SequenceContext::Format2(SequenceContextFormat2 {
                    data,
                    coverage,
                    class_def,
                    rule_set_offsets,
                }))
            }
            3 => {
                let glyph_count: u16 = cursor.read()?;
                let seq_lookup_count: u16 = cursor.read()?;
                let coverage_offsets = cursor.read_be_array(glyph_count as usize)?;
                let seq_lookup_records = cursor.read_records(seq_lookup_count as usize)?;
                Ok(SequenceContext::Format3(SequenceContextFormat3 {
                    data,
                    coverage_offsets,
                    seq_lookup_records,
                }))
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for SequenceContext<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        let (data, offsets) = match self {
            SequenceContext::Format1(table) => (table.data, table.rule_set_offsets),
            SequenceContext::Format2(table) => (table.data, table.rule_set_offsets),
            SequenceContext::Format3(table) => {
                if table.coverage_offsets.is_empty() {
                    return Err(ReadError::MalformedData("empty input sequence"));
                }
                return sanitize_coverages(table.data, table.coverage_offsets, c);
            }
        };
        for offset in offsets.iter() {
            c.resolve_nullable::<SequenceRuleSet>(offset, data)?;
        }
        Ok(())
    }
}

impl<'a> SequenceContext<'a> {
    /// The coverage of the first glyph of the input sequence.
    pub fn coverage(&self) -> CoverageTable<'a> {
        match self {
            SequenceContext::Format1(table) => table.coverage,
            SequenceContext::Format2(table) => table.coverage,
            SequenceContext::Format3(table) => table.coverage(0),
        }
    }
}

impl<'a> SequenceContextFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn rule_set_count(&self) -> usize {
        self.rule_set_offsets.len()
    }

    /// The rule set for the glyph with this coverage index, if any.
    pub fn rule_set(&self, index: u16) -> Option<SequenceRuleSet<'a>> {
        self.rule_set_offsets
            .get(index as usize)?
            .resolve_nullable(self.data)?
            .ok()
    }
}

impl<'a> SequenceContextFormat2<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn class_def(&self) -> ClassDef<'a> {
        self.class_def
    }

    pub fn rule_set_count(&self) -> usize {
        self.rule_set_offsets.len()
    }

    /// The rule set for glyphs of this class, if any.
    pub fn rule_set(&self, class: u16) -> Option<SequenceRuleSet<'a>> {
        self.rule_set_offsets
            .get(class as usize)?
            .resolve_nullable(self.data)?
            .ok()
    }
}

impl<'a> SequenceContextFormat3<'a> {
    /// The number of glyphs in the input sequence.
    pub fn glyph_count(&self) -> usize {
        self.coverage_offsets.len()
    }

    /// The coverage for the glyph at this position in the input sequence.
    pub fn coverage(&self, index: usize) -> CoverageTable<'a> {
        coverage_at(self.data, self.coverage_offsets.get(index))
    }

    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}

/// A set of chained rules, shared by format 1 and format 2 chained contexts.
#[derive(Clone, Copy, Debug)]
pub struct ChainedSequenceRuleSet<'a> {
    data: FontData<'a>,
    rule_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontRead<'a> for ChainedSequenceRuleSet<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let rule_offsets = cursor.read_be_array(count as usize)?;
        Ok(ChainedSequenceRuleSet { data, rule_offsets })
    }
}

impl<'a> Sanitize<'a> for ChainedSequenceRuleSet<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.rule_offsets.iter() {
            c.resolve::<ChainedSequenceRule>(offset, self.data)?;
        }
        Ok(())
    }
}

impl<'a> ChainedSequenceRuleSet<'a> {
    pub fn len(&self) -> usize {
        self.rule_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_offsets.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = ChainedSequenceRule<'a>> + 'a {
        let data = self.data;
        self.rule_offsets
            .iter()
            .filter_map(move |offset| offset.resolve(data).ok())
    }
}

/// A chained rule: backtrack, input (after the first glyph) and lookahead
/// sequences.
///
/// The backtrack sequence is stored in reverse order: its first value is
/// matched against the glyph immediately before the input.
#[derive(Clone, Copy, Debug)]
pub struct ChainedSequenceRule<'a> {
    backtrack_sequence: BeArray<'a, u16>,
    input_glyph_count: u16,
    input_sequence: BeArray<'a, u16>,
    lookahead_sequence: BeArray<'a, u16>,
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for ChainedSequenceRule<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let backtrack_count: u16 = cursor.read()?;
        let backtrack_sequence = cursor.read_be_array(backtrack_count as usize)?;
        let input_glyph_count: u16 = cursor.read()?;
        let input_sequence = cursor.read_be_array(input_glyph_count.saturating_sub(1) as usize)?;
        let lookahead_count: u16 = cursor.read()?;
        let lookahead_sequence = cursor.read_be_array(lookahead_count as usize)?;
        let seq_lookup_count: u16 = cursor.read()?;
        let seq_lookup_records = cursor.read_records(seq_lookup_count as usize)?;
        Ok(ChainedSequenceRule {
            backtrack_sequence,
            input_glyph_count,
            input_sequence,
            lookahead_sequence,
            seq_lookup_records,
        })
    }
}

impl<'a> Sanitize<'a> for ChainedSequenceRule<'a> {}

impl<'a> ChainedSequenceRule<'a> {
    pub fn backtrack_sequence(&self) -> BeArray<'a, u16> {
        self.backtrack_sequence
    }

    /// The number of glyphs in the input sequence, including the first.
    pub fn input_glyph_count(&self) -> u16 {
        self.input_glyph_count
    }

    pub fn input_sequence(&self) -> BeArray<'a, u16> {
        self.input_sequence
    }

    pub fn lookahead_sequence(&self) -> BeArray<'a, u16> {
        self.lookahead_sequence
    }

    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}

/// [Chained Sequence Context](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#chained-sequence-context-format-1-simple-glyph-contexts)
#[derive(Clone, Copy, Debug)]
pub enum ChainedSequenceContext<'a> {
    Format1(ChainedSequenceContextFormat1<'a>),
    Format2(ChainedSequenceContextFormat2<'a>),
    Format3(ChainedSequenceContextFormat3<'a>),
}

#[derive(Clone, Copy, Debug)]
pub struct ChainedSequenceContextFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    rule_set_offsets: BeArray<'a, Offset16>,
}

#[derive(Clone, Copy, Debug)]
pub struct ChainedSequenceContextFormat2<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    backtrack_class_def: ClassDef<'a>,
    input_class_def: ClassDef<'a>,
    lookahead_class_def: ClassDef<'a>,
    rule_set_offsets: BeArray<'a, Offset16>,
}

#[derive(Clone, Copy, Debug)]
pub struct ChainedSequenceContextFormat3<'a> {
    data: FontData<'a>,
    backtrack_coverage_offsets: BeArray<'a, Offset16>,
    input_coverage_offsets: BeArray<'a, Offset16>,
    lookahead_coverage_offsets: BeArray<'a, Offset16>,
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for ChainedSequenceContext<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        match format {
            1 => {
                let coverage = cursor.read::<Offset16>()?.resolve(data)?;
                let count: u16 = cursor.read()?;
                let rule_set_offsets = cursor.read_be_array(count as usize)?;
                Ok(ChainedSequenceContext::Format1(
                    ChainedSequenceContextFormat1 {
                        data,
                        coverage,
                        rule_set_offsets,
                    },
                ))
            }
            2 => {
                let coverage = cursor.read::<Offset16>()?.resolve(data)?;
                let backtrack_class_def = class_def_at(cursor.read()?, data)?;
                let input_class_def = class_def_at(cursor.read()?, data)?;
                let lookahead_class_def = class_def_at(cursor.read()?, data)?;
                let count: u16 = cursor.read()?;
                let rule_set_offsets = cursor.read_be_array(count as usize)?;
                Ok(ChainedSequenceContext::Format2(
                    ChainedSequenceContextFormat2 {
                        data,
                        coverage,
                        backtrack_class_def,
                        input_class_def,
                        lookahead_class_def,
                        rule_set_offsets,
                    },
                ))
            }
            3 => {
                let backtrack_count: u16 = cursor.read()?;
                let backtrack_coverage_offsets = cursor.read_be_array(backtrack_count as usize)?;
                let input_count: u16 = cursor.read()?;
                let input_coverage_offsets = cursor.read_be_array(input_count as usize)?;
                let lookahead_count: u16 = cursor.read()?;
                let lookahead_coverage_offsets = cursor.read_be_array(lookahead_count as usize)?;
                let seq_lookup_count: u16 = cursor.read()?;
                let seq_lookup_records = cursor.read_records(seq_lookup_count as usize)?;
                Ok(ChainedSequenceContext::Format3(
                    ChainedSequenceContextFormat3 {
                        data,
                        backtrack_coverage_offsets,
                        input_coverage_offsets,
                        lookahead_coverage_offsets,
                        seq_lookup_records,
                    },
                ))
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

// class defs in chained contexts may be null, which means every glyph is class 0
fn class_def_at(offset: Offset16, data: FontData) -> Result<ClassDef, ReadError> {
    offset
        .resolve_nullable(data)
        .transpose()
        .map(Option::unwrap_or_default)
}

impl<'a> Sanitize<'a> for ChainedSequenceContext<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        let (data, offsets) = match self {
            ChainedSequenceContext::Format1(table) => (table.data, table.rule_set_offsets),
            ChainedSequenceContext::Format2(table) => (table.data, table.rule_set_offsets),
            ChainedSequenceContext::Format3(table) => {
                if table.input_coverage_offsets.is_empty() {
                    return Err(ReadError::MalformedData("empty input sequence"));
                }
                sanitize_coverages(table.data, table.backtrack_coverage_offsets, c)?;
                sanitize_coverages(table.data, table.input_coverage_offsets, c)?;
                return sanitize_coverages(table.data, table.lookahead_coverage_offsets, c);
            }
        };
        for offset in offsets.iter() {
            c.resolve_nullable::<ChainedSequenceRuleSet>(offset, data)?;
        }
        Ok(())
    }
}

impl<'a> ChainedSequenceContext<'a> {
    /// The coverage of the first glyph of the input sequence.
    pub fn coverage(&self) -> CoverageTable<'a> {
        match self {
            ChainedSequenceContext::Format1(table) => table.coverage,
            ChainedSequenceContext::Format2(table) => table.coverage,
            ChainedSequenceContext::Format3(table) => table.input_coverage(0),
        }
    }
}

impl<'a> ChainedSequenceContextFormat1<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn rule_set_count(&self) -> usize {
        self.rule_set_offsets.len()
    }

    pub fn rule_set(&self, index: u16) -> Option<ChainedSequenceRuleSet<'a>> {
        self.rule_set_offsets
            .get(index as usize)?
            .resolve_nullable(self.data)?
            .ok()
    }
}

impl<'a> ChainedSequenceContextFormat2<'a> {
    pub fn coverage(&self) -> CoverageTable<'a> {
        self.coverage
    }

    pub fn backtrack_class_def(&self) -> ClassDef<'a> {
        self.backtrack_class_def
    }

    pub fn input_class_def(&self) -> ClassDef<'a> {
        self.input_class_def
    }

    pub fn lookahead_class_def(&self) -> ClassDef<'a> {
        self.lookahead_class_def
    }

    pub fn rule_set_count(&self) -> usize {
        self.rule_set_offsets.len()
    }

    pub fn rule_set(&self, class: u16) -> Option<ChainedSequenceRuleSet<'a>> {
        self.rule_set_offsets
            .get(class as usize)?
            .resolve_nullable(self.data)?
            .ok()
    }
}

impl<'a> ChainedSequenceContextFormat3<'a> {
    pub fn backtrack_glyph_count(&self) -> usize {
        self.backtrack_coverage_offsets.len()
    }

    pub fn input_glyph_count(&self) -> usize {
        self.input_coverage_offsets.len()
    }

    pub fn lookahead_glyph_count(&self) -> usize {
        self.lookahead_coverage_offsets.len()
    }

    pub fn backtrack_coverage(&self, index: usize) -> CoverageTable<'a> {
        coverage_at(self.data, self.backtrack_coverage_offsets.get(index))
    }

    pub fn input_coverage(&self, index: usize) -> CoverageTable<'a> {
        coverage_at(self.data, self.input_coverage_offsets.get(index))
    }

    pub fn lookahead_coverage(&self, index: usize) -> CoverageTable<'a> {
        coverage_at(self.data, self.lookahead_coverage_offsets.get(index))
    }

    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}
