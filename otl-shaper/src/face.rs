//! Locating and validating the layout tables of a font.

use bytemuck::{Pod, Zeroable};
use otl_types::{GlyphId, Offset, Offset32, Tag, CFF_SFNT_VERSION, TRUE_SFNT_VERSION, TT_SFNT_VERSION};

use crate::apply::{TableKind, WouldApply, WouldApplyContext};
use crate::collections::IntSet;
use crate::sanitize::{sanitize, SanitizeTable};
use crate::shape::Instance;
use crate::tables::gdef::Gdef;
use crate::tables::gpos::Gpos;
use crate::tables::gsub::Gsub;
use crate::tables::layout::LayoutTable;
use crate::tables::metrics::{Head, Hhea, Hmtx, DEFAULT_UNITS_PER_EM, HEAD_TAG, HHEA_TAG, HMTX_TAG};
use crate::{FontData, FontRead, FontReadWithArgs, ReadError};

/// A record in the [table directory](https://learn.microsoft.com/en-us/typography/opentype/spec/otff#table-directory).
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct TableRecord {
    tag: [u8; 4],
    checksum: [u8; 4],
    offset: [u8; 4],
    length: [u8; 4],
}

impl TableRecord {
    pub fn tag(&self) -> Tag {
        Tag::from_be_bytes(self.tag)
    }

    pub fn checksum(&self) -> u32 {
        u32::from_be_bytes(self.checksum)
    }

    pub fn offset(&self) -> u32 {
        u32::from_be_bytes(self.offset)
    }

    pub fn length(&self) -> u32 {
        u32::from_be_bytes(self.length)
    }
}

/// The table directory at the start of an sfnt font file.
#[derive(Clone, Copy, Debug)]
pub struct TableDirectory<'a> {
    sfnt_version: u32,
    table_records: &'a [TableRecord],
}

impl<'a> FontRead<'a> for TableDirectory<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let sfnt_version: u32 = cursor.read()?;
        if ![TT_SFNT_VERSION, CFF_SFNT_VERSION, TRUE_SFNT_VERSION].contains(&sfnt_version) {
            return Err(ReadError::InvalidSfnt(sfnt_version));
        }
        let num_tables: u16 = cursor.read()?;
        // searchRange, entrySelector, rangeShift
        cursor.advance_by(6);
        let table_records = cursor.read_records(num_tables as usize)?;
        Ok(TableDirectory {
            sfnt_version,
            table_records,
        })
    }
}

impl<'a> TableDirectory<'a> {
    pub fn sfnt_version(&self) -> u32 {
        self.sfnt_version
    }

    pub fn table_records(&self) -> &'a [TableRecord] {
        self.table_records
    }

    /// The data for the table with this tag, if present and in bounds.
    pub fn table_data(&self, font: FontData<'a>, tag: Tag) -> Option<FontData<'a>> {
        let records = self.table_records;
        let idx = records
            .binary_search_by(|rec| rec.tag().cmp(&tag))
            .ok()
            // the directory should be sorted, but some fonts aren't
            .or_else(|| records.iter().position(|rec| rec.tag() == tag))?;
        let record = records[idx];
        let start = Offset32::new(record.offset()).non_null()?;
        let len = record.length() as usize;
        font.slice(start..start.checked_add(len)?)
    }
}

/// The layout tables of a font, validated and ready for shaping.
///
/// Each table is sanitized when the face is created. A table that is
/// missing or fails validation is replaced by an empty one, so shaping
/// with a damaged font applies whatever remains usable.
#[derive(Clone, Debug)]
pub struct LayoutFace<'a> {
    gdef: Gdef<'a>,
    gsub: Gsub<'a>,
    gpos: Gpos<'a>,
    hmtx: Option<Hmtx<'a>>,
    units_per_em: u16,
    ppem: u16,
}

impl<'a> LayoutFace<'a> {
    /// Load the layout tables from a font file.
    ///
    /// Only the table directory must be valid; problems in individual
    /// tables are logged and the table treated as empty.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ReadError> {
        let font = FontData::new(bytes);
        let directory = TableDirectory::read(font)?;
        let table = |tag| directory.table_data(font, tag);

        let units_per_em = table(HEAD_TAG)
            .and_then(|data| Head::read(data).ok())
            .map(|head| head.units_per_em())
            .unwrap_or(DEFAULT_UNITS_PER_EM);
        let hmtx = table(HHEA_TAG)
            .and_then(|data| Hhea::read(data).ok())
            .zip(table(HMTX_TAG))
            .and_then(|(hhea, data)| {
                Hmtx::read_with_args(data, &hhea.number_of_h_metrics())
                    .inspect_err(|e| log::warn!("ignoring hmtx: {e}"))
                    .ok()
            });

        Ok(LayoutFace {
            gdef: load(table(Gdef::TAG)),
            gsub: load(table(Gsub::TAG)),
            gpos: load(table(Gpos::TAG)),
            hmtx,
            units_per_em,
            ppem: 0,
        })
    }

    /// Create a face from individual table blobs.
    pub fn from_tables(
        gdef: Option<&'a [u8]>,
        gsub: Option<&'a [u8]>,
        gpos: Option<&'a [u8]>,
    ) -> Self {
        LayoutFace {
            gdef: load(gdef.map(FontData::new)),
            gsub: load(gsub.map(FontData::new)),
            gpos: load(gpos.map(FontData::new)),
            hmtx: None,
            units_per_em: DEFAULT_UNITS_PER_EM,
            ppem: 0,
        }
    }

    pub fn with_units_per_em(mut self, units_per_em: u16) -> Self {
        self.units_per_em = units_per_em;
        self
    }

    /// Set the size used to apply device table adjustments.
    pub fn with_ppem(mut self, ppem: u16) -> Self {
        self.ppem = ppem;
        self
    }

    pub fn gdef(&self) -> &Gdef<'a> {
        &self.gdef
    }

    pub fn gsub(&self) -> &Gsub<'a> {
        &self.gsub
    }

    pub fn gpos(&self) -> &Gpos<'a> {
        &self.gpos
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn instance(&self) -> Instance {
        Instance {
            ppem: self.ppem,
            units_per_em: self.units_per_em,
        }
    }

    /// The advance width of a glyph from `hmtx`, if the font has one.
    pub fn advance(&self, glyph: GlyphId) -> Option<i32> {
        self.hmtx?.advance(glyph).map(i32::from)
    }

    /// The tags of the scripts in a table.
    pub fn script_tags(&self, table: TableKind) -> Vec<Tag> {
        match table {
            TableKind::Gsub => self.gsub.script_list().tags().collect(),
            TableKind::Gpos => self.gpos.script_list().tags().collect(),
        }
    }

    /// The tags of the language systems of a script, not including the default.
    pub fn language_tags(&self, table: TableKind, script: Tag) -> Vec<Tag> {
        match table {
            TableKind::Gsub => language_tags(&self.gsub, script),
            TableKind::Gpos => language_tags(&self.gpos, script),
        }
    }

    /// The tags of the features in a language system, with the required feature first.
    ///
    /// A `language` of `None` selects the script's default language system.
    pub fn feature_tags(&self, table: TableKind, script: Tag, language: Option<Tag>) -> Vec<Tag> {
        match table {
            TableKind::Gsub => feature_tags(&self.gsub, script, language),
            TableKind::Gpos => feature_tags(&self.gpos, script, language),
        }
    }

    /// The lookups reachable from the given scripts, languages and features.
    ///
    /// `None` for any filter means "all".
    pub fn collect_lookups(
        &self,
        table: TableKind,
        scripts: Option<&[Tag]>,
        languages: Option<&[Tag]>,
        features: Option<&[Tag]>,
    ) -> IntSet<u16> {
        match table {
            TableKind::Gsub => {
                let indices = self.gsub.collect_features(scripts, languages, features);
                self.gsub.collect_lookups(&indices)
            }
            TableKind::Gpos => {
                let indices = self.gpos.collect_features(scripts, languages, features);
                self.gpos.collect_lookups(&indices)
            }
        }
    }

    /// `true` if the GSUB lookup at `lookup_index` would substitute `glyphs`.
    ///
    /// With `zero_context`, rules that need glyphs before or after the
    /// sequence never match.
    pub fn would_substitute(&self, lookup_index: u16, glyphs: &[GlyphId], zero_context: bool) -> bool {
        self.would_substitute_in_context(lookup_index, &WouldApplyContext::new(glyphs, zero_context))
    }

    /// As [`would_substitute`](Self::would_substitute), with explicit
    /// backtrack and lookahead glyphs.
    pub fn would_substitute_in_context(&self, lookup_index: u16, ctx: &WouldApplyContext) -> bool {
        self.gsub
            .lookup(lookup_index)
            .is_some_and(|lookup| lookup.would_apply(ctx))
    }
}

fn load<'a, T: SanitizeTable<'a>>(data: Option<FontData<'a>>) -> T {
    match data {
        Some(data) => sanitize(data),
        None => T::null(),
    }
}

fn language_tags<T>(table: &LayoutTable<T>, script: Tag) -> Vec<Tag> {
    table
        .script_list()
        .script(script)
        .map(|script| script.lang_sys_records().iter().map(|rec| rec.tag()).collect())
        .unwrap_or_default()
}

fn feature_tags<T>(table: &LayoutTable<T>, script: Tag, language: Option<Tag>) -> Vec<Tag> {
    let Some(lang_sys) = table
        .script_list()
        .script(script)
        .and_then(|script| match language {
            Some(tag) => script.lang_sys(tag),
            None => script.default_lang_sys(),
        })
    else {
        return Vec::new();
    };
    lang_sys
        .required_feature_index()
        .into_iter()
        .chain(lang_sys.feature_indices().iter())
        .filter_map(|idx| table.feature_list().tag(idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use otl_test_data::bebuffer::BeBuffer;

    use super::*;

    fn font(tables: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let header_len = 12 + 16 * tables.len();
        let mut buf = BeBuffer::new()
            .push(TT_SFNT_VERSION)
            .push(tables.len() as u16)
            .extend([0u16; 3]);
        let mut offset = header_len as u32;
        for (tag, data) in tables {
            buf = buf
                .push(Tag::new(tag))
                .push(0u32)
                .push(offset)
                .push(data.len() as u32);
            offset += data.len() as u32;
        }
        let mut bytes = buf.to_vec();
        for (_, data) in tables {
            bytes.extend_from_slice(data);
        }
        bytes
    }

    #[test]
    fn missing_tables_are_empty() {
        let bytes = font(&[]);
        let face = LayoutFace::new(&bytes).unwrap();
        assert_eq!(face.gsub().lookup_count(), 0);
        assert_eq!(face.units_per_em(), DEFAULT_UNITS_PER_EM);
        assert_eq!(face.advance(GlyphId::new(1)), None);
    }

    #[test]
    fn invalid_directory() {
        assert_eq!(
            LayoutFace::new(&[0xde, 0xad, 0xbe, 0xef, 0, 0]).err(),
            Some(ReadError::InvalidSfnt(0xdeadbeef))
        );
    }

    #[test]
    fn metrics_from_directory() {
        let mut head = vec![0u8; 54];
        head[18..20].copy_from_slice(&2048u16.to_be_bytes());
        let mut hhea = vec![0u8; 36];
        hhea[34..36].copy_from_slice(&1u16.to_be_bytes());
        let hmtx = BeBuffer::new().extend([1200u16, 0]);
        // out of order, to exercise the linear fallback
        let bytes = font(&[
            (b"hmtx", hmtx.as_slice()),
            (b"head", &head[..]),
            (b"hhea", &hhea[..]),
        ]);
        let face = LayoutFace::new(&bytes).unwrap();
        assert_eq!(face.units_per_em(), 2048);
        assert_eq!(face.advance(GlyphId::new(3)), Some(1200));
    }

    #[test]
    fn truncated_table_is_out_of_bounds() {
        let bytes = font(&[(b"GSUB", &[0u8, 1, 0, 0][..])]);
        let directory = TableDirectory::read(FontData::new(&bytes)).unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(directory
            .table_data(FontData::new(truncated), Gsub::TAG)
            .is_none());
    }
}
