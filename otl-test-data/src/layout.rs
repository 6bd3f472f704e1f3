//! Builders for the structures shared by GSUB and GPOS.
//!
//! Every builder returns the serialized bytes of one table. Offsets are
//! 16-bit, so the tables these produce must stay small.

use otl_types::Tag;

use crate::bebuffer::BeBuffer;

/// Append `children` to `head`, writing the offset of each child (relative
/// to the start of `head`) into the 16-bit field at the paired position.
///
/// The offset fields in `head` should be zero placeholders.
pub fn assemble(head: &[u8], children: Vec<(usize, Vec<u8>)>) -> Vec<u8> {
    let mut out = head.to_vec();
    for (pos, child) in children {
        let offset = u16::try_from(out.len()).expect("test table too large for Offset16");
        out[pos..pos + 2].copy_from_slice(&offset.to_be_bytes());
        out.extend(child);
    }
    out
}

/// A format 1 coverage table. `glyphs` must be sorted.
pub fn coverage(glyphs: &[u16]) -> Vec<u8> {
    BeBuffer::new()
        .push(1u16)
        .push(glyphs.len() as u16)
        .extend(glyphs.iter().copied())
        .to_vec()
}

/// A format 2 coverage table from inclusive glyph ranges.
///
/// Coverage indices are assigned in range order.
pub fn coverage_ranges(ranges: &[(u16, u16)]) -> Vec<u8> {
    let mut buf = BeBuffer::new().push(2u16).push(ranges.len() as u16);
    let mut index = 0u16;
    for (start, end) in ranges {
        buf = buf.push(*start).push(*end).push(index);
        index += end - start + 1;
    }
    buf.to_vec()
}

/// A format 1 class definition: consecutive classes from `start`.
pub fn class_def_format1(start: u16, classes: &[u16]) -> Vec<u8> {
    BeBuffer::new()
        .push(1u16)
        .push(start)
        .push(classes.len() as u16)
        .extend(classes.iter().copied())
        .to_vec()
}

/// A format 2 class definition from `(start, end, class)` ranges.
pub fn class_def_format2(ranges: &[(u16, u16, u16)]) -> Vec<u8> {
    let mut buf = BeBuffer::new().push(2u16).push(ranges.len() as u16);
    for (start, end, class) in ranges {
        buf = buf.push(*start).push(*end).push(*class);
    }
    buf.to_vec()
}

/// A class definition assigning each listed glyph its own range.
pub fn class_def(glyph_classes: &[(u16, u16)]) -> Vec<u8> {
    let mut sorted = glyph_classes.to_vec();
    sorted.sort();
    let ranges: Vec<_> = sorted.iter().map(|(gid, class)| (*gid, *gid, *class)).collect();
    class_def_format2(&ranges)
}

/// A lookup to serialize into a lookup list.
#[derive(Clone, Debug, Default)]
pub struct LookupDef {
    pub lookup_type: u16,
    pub flag: u16,
    pub mark_filtering_set: Option<u16>,
    pub subtables: Vec<Vec<u8>>,
}

impl LookupDef {
    pub fn new(lookup_type: u16, subtables: Vec<Vec<u8>>) -> Self {
        LookupDef {
            lookup_type,
            subtables,
            ..Default::default()
        }
    }

    pub fn with_flag(mut self, flag: u16) -> Self {
        self.flag = flag;
        self
    }

    /// Use a GDEF mark glyph set; sets the UseMarkFilteringSet flag.
    pub fn with_mark_filtering_set(mut self, set: u16) -> Self {
        self.flag |= 0x0010;
        self.mark_filtering_set = Some(set);
        self
    }

    fn serialize(&self) -> Vec<u8> {
        let mut head = BeBuffer::new()
            .push(self.lookup_type)
            .push(self.flag)
            .push(self.subtables.len() as u16)
            .extend(self.subtables.iter().map(|_| 0u16));
        if let Some(set) = self.mark_filtering_set {
            head = head.push(set);
        }
        let children = self
            .subtables
            .iter()
            .enumerate()
            .map(|(i, sub)| (6 + 2 * i, sub.clone()))
            .collect();
        assemble(&head, children)
    }
}

/// An extension subtable wrapping `subtable` of `lookup_type`.
pub fn extension(lookup_type: u16, subtable: &[u8]) -> Vec<u8> {
    BeBuffer::new()
        .push(1u16)
        .push(lookup_type)
        .push(8u32)
        .extend_bytes(subtable)
        .to_vec()
}

/// A language system enabling features by index.
#[derive(Clone, Debug, Default)]
pub struct LangSysDef {
    pub required_feature: Option<u16>,
    pub features: Vec<u16>,
}

impl LangSysDef {
    pub fn new(features: &[u16]) -> Self {
        LangSysDef {
            required_feature: None,
            features: features.to_vec(),
        }
    }

    pub fn with_required(mut self, index: u16) -> Self {
        self.required_feature = Some(index);
        self
    }

    fn serialize(&self) -> Vec<u8> {
        BeBuffer::new()
            .push(0u16)
            .push(self.required_feature.unwrap_or(0xFFFF))
            .push(self.features.len() as u16)
            .extend(self.features.iter().copied())
            .to_vec()
    }
}

/// A script with an optional default language system and tagged ones.
#[derive(Clone, Debug)]
pub struct ScriptDef {
    pub tag: Tag,
    pub default_lang_sys: Option<LangSysDef>,
    pub lang_systems: Vec<(Tag, LangSysDef)>,
}

impl ScriptDef {
    pub fn new(tag: &[u8; 4], default_lang_sys: LangSysDef) -> Self {
        ScriptDef {
            tag: Tag::new(tag),
            default_lang_sys: Some(default_lang_sys),
            lang_systems: Vec::new(),
        }
    }

    pub fn with_lang_sys(mut self, tag: &[u8; 4], lang_sys: LangSysDef) -> Self {
        self.lang_systems.push((Tag::new(tag), lang_sys));
        self
    }

    fn serialize(&self) -> Vec<u8> {
        let mut head = BeBuffer::new()
            .push(0u16)
            .push(self.lang_systems.len() as u16);
        for (tag, _) in &self.lang_systems {
            head = head.push(*tag).push(0u16);
        }
        let mut children = Vec::new();
        if let Some(lang_sys) = &self.default_lang_sys {
            children.push((0, lang_sys.serialize()));
        }
        for (i, (_, lang_sys)) in self.lang_systems.iter().enumerate() {
            children.push((4 + 6 * i + 4, lang_sys.serialize()));
        }
        assemble(&head, children)
    }
}

/// A GSUB or GPOS table.
#[derive(Clone, Debug, Default)]
pub struct LayoutDef {
    pub scripts: Vec<ScriptDef>,
    pub features: Vec<(Tag, Vec<u16>)>,
    pub lookups: Vec<LookupDef>,
}

impl LayoutDef {
    /// A table whose `DFLT` script enables every feature.
    pub fn new(features: &[(&[u8; 4], &[u16])], lookups: Vec<LookupDef>) -> Self {
        let all: Vec<u16> = (0..features.len() as u16).collect();
        LayoutDef {
            scripts: vec![ScriptDef::new(b"DFLT", LangSysDef::new(&all))],
            features: features
                .iter()
                .map(|(tag, lookups)| (Tag::new(tag), lookups.to_vec()))
                .collect(),
            lookups,
        }
    }

    /// A table with a single lookup and no features.
    pub fn single_lookup(lookup: LookupDef) -> Self {
        LayoutDef {
            lookups: vec![lookup],
            ..Default::default()
        }
    }

    pub fn with_scripts(mut self, scripts: Vec<ScriptDef>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        // ScriptList: sorted by tag
        let mut scripts: Vec<_> = self.scripts.iter().collect();
        scripts.sort_by_key(|script| script.tag);
        let mut head = BeBuffer::new().push(scripts.len() as u16);
        for script in &scripts {
            head = head.push(script.tag).push(0u16);
        }
        let script_list = assemble(
            &head,
            scripts
                .iter()
                .enumerate()
                .map(|(i, script)| (2 + 6 * i + 4, script.serialize()))
                .collect(),
        );

        let mut head = BeBuffer::new().push(self.features.len() as u16);
        for (tag, _) in &self.features {
            head = head.push(*tag).push(0u16);
        }
        let feature_list = assemble(
            &head,
            self.features
                .iter()
                .enumerate()
                .map(|(i, (_, lookups))| {
                    let feature = BeBuffer::new()
                        .push(0u16)
                        .push(lookups.len() as u16)
                        .extend(lookups.iter().copied())
                        .to_vec();
                    (2 + 6 * i + 4, feature)
                })
                .collect(),
        );

        let head = BeBuffer::new()
            .push(self.lookups.len() as u16)
            .extend(self.lookups.iter().map(|_| 0u16));
        let lookup_list = assemble(
            &head,
            self.lookups
                .iter()
                .enumerate()
                .map(|(i, lookup)| (2 + 2 * i, lookup.serialize()))
                .collect(),
        );

        let head = BeBuffer::new()
            .push(1u16)
            .push(0u16)
            .extend([0u16; 3]);
        assemble(
            &head,
            vec![(4, script_list), (6, feature_list), (8, lookup_list)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_patches_offsets() {
        let table = assemble(&[0, 1, 0, 0, 0, 0], vec![(2, vec![0xAA]), (4, vec![0xBB])]);
        assert_eq!(table, [0, 1, 0, 6, 0, 7, 0xAA, 0xBB]);
    }

    #[test]
    fn range_coverage_indices() {
        assert_eq!(
            coverage_ranges(&[(5, 7), (10, 10)]),
            [0, 2, 0, 2, 0, 5, 0, 7, 0, 0, 0, 10, 0, 10, 0, 3]
        );
    }
}
