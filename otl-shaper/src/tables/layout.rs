//! OpenType Layout common table formats, and the GSUB/GPOS table header

mod class_def;
mod context;
mod coverage;
mod device;
mod feature;
mod lookup;
mod lookup_flag;
mod script;

#[cfg(test)]
#[path = "../tests/layout.rs"]
mod tests;

use otl_types::{Offset, Offset16, Offset32, Tag};

use crate::collections::IntSet;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext};
use crate::{FontData, ReadError};

pub use class_def::{ClassDef, ClassRangeRecord};
pub(crate) use context::coverage_at;
pub use context::{
    ChainedSequenceContext, ChainedSequenceContextFormat1, ChainedSequenceContextFormat2,
    ChainedSequenceContextFormat3, ChainedSequenceRule, ChainedSequenceRuleSet, SequenceContext,
    SequenceContextFormat1, SequenceContextFormat2, SequenceContextFormat3, SequenceLookupRecord,
    SequenceRule, SequenceRuleSet,
};
pub use coverage::{CoverageTable, RangeRecord};
pub use device::{Device, DeviceOrVariationIndex, VARIATION_INDEX_FORMAT};
pub use feature::{Feature, FeatureList};
pub use lookup::{Lookup, LookupList, LookupSubtable};
pub use lookup_flag::LookupFlag;
pub use script::{LangSys, Script, ScriptList, TagRecord, DEFAULT_LANGUAGE, DEFAULT_SCRIPT};

/// The shared structure of the GSUB and GPOS tables.
///
/// `T` is the subtable type, [`SubstitutionSubtable`](crate::tables::gsub::SubstitutionSubtable)
/// or [`PositionSubtable`](crate::tables::gpos::PositionSubtable).
#[derive(Clone, Debug)]
pub struct LayoutTable<'a, T> {
    version: (u16, u16),
    script_list: ScriptList<'a>,
    feature_list: FeatureList<'a>,
    lookup_list: LookupList<T>,
    has_feature_variations: bool,
}

impl<T> LayoutTable<'_, T> {
    /// The empty table used in place of a missing or invalid one.
    pub fn empty() -> Self {
        LayoutTable {
            version: (1, 0),
            script_list: ScriptList::default(),
            feature_list: FeatureList::default(),
            lookup_list: LookupList::default(),
            has_feature_variations: false,
        }
    }
}

impl<'a, T: LookupSubtable<'a>> LayoutTable<'a, T> {
    /// Read the table header and every list it references.
    pub(crate) fn read_sanitized(
        data: FontData<'a>,
        c: &mut SanitizeContext,
    ) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let major: u16 = cursor.read()?;
        let minor: u16 = cursor.read()?;
        if major != 1 {
            return Err(ReadError::InvalidFormat(major.into()));
        }
        let script_list_offset: Offset16 = cursor.read()?;
        let feature_list_offset: Offset16 = cursor.read()?;
        let lookup_list_offset: Offset16 = cursor.read()?;
        let feature_variations_offset: Offset32 = if minor >= 1 {
            cursor.read()?
        } else {
            Offset32::null()
        };

        let script_list = read_list::<ScriptList>(script_list_offset, data, c)?;
        let feature_list = read_list::<FeatureList>(feature_list_offset, data, c)?;
        let lookup_list = match lookup_list_offset.non_null() {
            Some(off) => {
                let lookup_data = data.split_off(off).ok_or(ReadError::OutOfBounds)?;
                LookupList::read_sanitized(lookup_data, c)?
            }
            None => LookupList::default(),
        };
        Ok(LayoutTable {
            version: (major, minor),
            script_list,
            feature_list,
            lookup_list,
            has_feature_variations: !feature_variations_offset.is_null(),
        })
    }
}

fn read_list<'a, L: Sanitize<'a> + Default>(
    offset: Offset16,
    data: FontData<'a>,
    c: &mut SanitizeContext,
) -> Result<L, ReadError> {
    c.resolve_nullable(offset, data).map(Option::unwrap_or_default)
}

impl<'a, T> LayoutTable<'a, T> {
    /// The (major, minor) version of the table.
    pub fn version(&self) -> (u16, u16) {
        self.version
    }

    pub fn script_list(&self) -> &ScriptList<'a> {
        &self.script_list
    }

    pub fn feature_list(&self) -> &FeatureList<'a> {
        &self.feature_list
    }

    pub fn lookup_list(&self) -> &LookupList<T> {
        &self.lookup_list
    }

    pub fn lookup(&self, index: u16) -> Option<&Lookup<T>> {
        self.lookup_list.get(index)
    }

    pub fn lookup_count(&self) -> u16 {
        self.lookup_list.len() as u16
    }

    /// `true` if the font has a FeatureVariations table.
    ///
    /// Feature variations are not applied; the default features are always used.
    pub fn has_feature_variations(&self) -> bool {
        self.has_feature_variations
    }

    /// Return the set of feature indices reachable from the given scripts,
    /// languages and feature tags.
    ///
    /// `None` for any argument means "all". When languages are given, only
    /// those language systems are visited; otherwise every language system,
    /// including the default, is visited.
    pub fn collect_features(
        &self,
        scripts: Option<&[Tag]>,
        languages: Option<&[Tag]>,
        features: Option<&[Tag]>,
    ) -> IntSet<u16> {
        let feature_filter: IntSet<u16> = self
            .feature_list
            .records()
            .iter()
            .enumerate()
            .filter(|(_, rec)| features.is_none_or(|tags| tags.contains(&rec.tag())))
            .map(|(i, _)| i as u16)
            .collect();

        let mut result = IntSet::empty();
        let mut add_lang_sys = |lang_sys: LangSys| {
            if let Some(required) = lang_sys.required_feature_index() {
                if feature_filter.contains(required) {
                    result.insert(required);
                }
            }
            result.extend(
                lang_sys
                    .feature_indices()
                    .iter()
                    .filter(|idx| feature_filter.contains(*idx)),
            );
        };

        for (tag, script) in self.script_list.iter() {
            if scripts.is_some_and(|tags| !tags.contains(&tag)) {
                continue;
            }
            match languages {
                None => {
                    if let Some(lang_sys) = script.default_lang_sys() {
                        add_lang_sys(lang_sys);
                    }
                    script.iter().for_each(|(_, lang_sys)| add_lang_sys(lang_sys));
                }
                Some(languages) => languages
                    .iter()
                    .filter_map(|tag| script.lang_sys(*tag))
                    .for_each(&mut add_lang_sys),
            }
        }
        result
    }

    /// Return the set of lookups referenced by the specified features.
    pub fn collect_lookups(&self, feature_indices: &IntSet<u16>) -> IntSet<u16> {
        feature_indices
            .iter()
            .filter_map(|idx| self.feature_list.get(idx))
            .flat_map(|(_, feature)| feature.lookup_list_indices().iter())
            .filter(|idx| (*idx as usize) < self.lookup_list.len())
            .collect()
    }

    /// The index of the feature with this tag in a language system.
    ///
    /// The required feature is considered first.
    pub fn find_feature_index(&self, lang_sys: &LangSys, feature: Tag) -> Option<u16> {
        lang_sys
            .required_feature_index()
            .into_iter()
            .chain(lang_sys.feature_indices().iter())
            .find(|idx| self.feature_list.tag(*idx) == Some(feature))
    }

    /// The index of the first feature with this tag, in any language system.
    pub fn feature_index_for_tag(&self, feature: Tag) -> Option<u16> {
        self.feature_list
            .records()
            .iter()
            .position(|rec| rec.tag() == feature)
            .map(|idx| idx as u16)
    }

    /// The lookups, in feature order, for a feature in the given language system.
    ///
    /// Returns `None` if the language system does not reference the feature.
    pub fn feature_lookups(&self, lang_sys: &LangSys, feature: Tag) -> Option<Vec<u16>> {
        let index = self.find_feature_index(lang_sys, feature)?;
        let (_, feature) = self.feature_list.get(index)?;
        Some(feature.lookup_list_indices().iter().collect())
    }
}
