//! Script and language system tables

use otl_types::{Offset16, Tag};

use crate::array::BeArray;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext};
use crate::{FontData, FontRead, ReadError};

/// The script tag used when no specific script matches.
pub const DEFAULT_SCRIPT: Tag = Tag::new(b"DFLT");
/// Some old fonts use this tag for their fallback script.
pub const DEFAULT_LANGUAGE: Tag = Tag::new(b"dflt");
/// Legacy fallback script tag.
pub const LATIN_SCRIPT: Tag = Tag::new(b"latn");

/// Sentinel for "no required feature" in a LangSys table.
const NO_REQUIRED_FEATURE: u16 = 0xFFFF;

/// A (tag, offset) pair, used by script, language system and feature records.
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct TagRecord {
    tag: [u8; 4],
    offset: [u8; 2],
}

impl TagRecord {
    pub fn tag(&self) -> Tag {
        Tag::from_be_bytes(self.tag)
    }

    pub fn offset(&self) -> Offset16 {
        Offset16::new(u16::from_be_bytes(self.offset))
    }
}

fn search_tag(records: &[TagRecord], tag: Tag) -> Option<usize> {
    records
        .binary_search_by(|rec| rec.tag().cmp(&tag))
        .ok()
        // records should be sorted, but some fonts aren't
        .or_else(|| records.iter().position(|rec| rec.tag() == tag))
}

/// [Script List Table](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#script-list-table-and-script-record)
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptList<'a> {
    data: FontData<'a>,
    records: &'a [TagRecord],
}

impl<'a> FontRead<'a> for ScriptList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let records = cursor.read_records(count as usize)?;
        Ok(ScriptList { data, records })
    }
}

impl<'a> Sanitize<'a> for ScriptList<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for record in self.records {
            c.resolve::<Script>(record.offset(), self.data)?;
        }
        Ok(())
    }
}

impl<'a> ScriptList<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &'a [TagRecord] {
        self.records
    }

    /// The tags of all scripts, in table order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + 'a {
        self.records.iter().map(TagRecord::tag)
    }

    /// Return the index of the script with this tag.
    pub fn index_for_tag(&self, tag: Tag) -> Option<u16> {
        search_tag(self.records, tag).map(|idx| idx as u16)
    }

    /// Return the script at this index.
    pub fn get(&self, index: u16) -> Option<Script<'a>> {
        let record = self.records.get(index as usize)?;
        record.offset().resolve(self.data).ok()
    }

    /// Return the script with this tag.
    pub fn script(&self, tag: Tag) -> Option<Script<'a>> {
        self.index_for_tag(tag).and_then(|idx| self.get(idx))
    }

    /// Iterate over (tag, script) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, Script<'a>)> + 'a {
        let data = self.data;
        self.records
            .iter()
            .filter_map(move |rec| Some((rec.tag(), rec.offset().resolve(data).ok()?)))
    }

    /// Select a script for shaping.
    ///
    /// Tries each of `tags` in order, then the `DFLT`, `dflt` and `latn`
    /// fallbacks. Returns the tag that was chosen along with the script.
    pub fn select(&self, tags: &[Tag]) -> Option<(Tag, Script<'a>)> {
        tags.iter()
            .copied()
            .chain([DEFAULT_SCRIPT, DEFAULT_LANGUAGE, LATIN_SCRIPT])
            .find_map(|tag| Some((tag, self.script(tag)?)))
    }
}

/// [Script Table](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#script-table-and-language-system-record)
#[derive(Clone, Copy, Debug)]
pub struct Script<'a> {
    data: FontData<'a>,
    default_lang_sys_offset: Offset16,
    records: &'a [TagRecord],
}

impl<'a> FontRead<'a> for Script<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let default_lang_sys_offset = cursor.read()?;
        let count: u16 = cursor.read()?;
        let records = cursor.read_records(count as usize)?;
        Ok(Script {
            data,
            default_lang_sys_offset,
            records,
        })
    }
}

impl<'a> Sanitize<'a> for Script<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        c.resolve_nullable::<LangSys>(self.default_lang_sys_offset, self.data)?;
        for record in self.records {
            c.resolve::<LangSys>(record.offset(), self.data)?;
        }
        Ok(())
    }
}

impl<'a> Script<'a> {
    /// The default language system, if any.
    pub fn default_lang_sys(&self) -> Option<LangSys<'a>> {
        self.default_lang_sys_offset
            .resolve_nullable(self.data)
            .and_then(Result::ok)
    }

    pub fn lang_sys_records(&self) -> &'a [TagRecord] {
        self.records
    }

    /// Return the index of the language system with this tag.
    pub fn lang_sys_index_for_tag(&self, tag: Tag) -> Option<u16> {
        search_tag(self.records, tag).map(|idx| idx as u16)
    }

    /// The language system with this tag, if present.
    pub fn lang_sys(&self, tag: Tag) -> Option<LangSys<'a>> {
        let idx = self.lang_sys_index_for_tag(tag)?;
        self.records[idx as usize].offset().resolve(self.data).ok()
    }

    /// Iterate over (tag, language system) pairs, not including the default.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, LangSys<'a>)> + 'a {
        let data = self.data;
        self.records
            .iter()
            .filter_map(move |rec| Some((rec.tag(), rec.offset().resolve(data).ok()?)))
    }

    /// The language system with this tag, falling back to the default.
    pub fn lang_sys_or_default(&self, tag: Option<Tag>) -> Option<LangSys<'a>> {
        tag.and_then(|tag| self.lang_sys(tag))
            .or_else(|| self.default_lang_sys())
    }
}

/// [Language System Table](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#language-system-table)
#[derive(Clone, Copy, Debug, Default)]
pub struct LangSys<'a> {
    required_feature_index: u16,
    feature_indices: BeArray<'a, u16>,
}

impl<'a> FontRead<'a> for LangSys<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let _lookup_order_offset: u16 = cursor.read()?;
        let required_feature_index = cursor.read()?;
        let count: u16 = cursor.read()?;
        let feature_indices = cursor.read_be_array(count as usize)?;
        Ok(LangSys {
            required_feature_index,
            feature_indices,
        })
    }
}

impl<'a> Sanitize<'a> for LangSys<'a> {}

impl<'a> LangSys<'a> {
    /// Index of a feature required for this language system, if any.
    pub fn required_feature_index(&self) -> Option<u16> {
        (self.required_feature_index != NO_REQUIRED_FEATURE).then_some(self.required_feature_index)
    }

    /// Indices into the FeatureList, in arbitrary order.
    pub fn feature_indices(&self) -> BeArray<'a, u16> {
        self.feature_indices
    }
}
