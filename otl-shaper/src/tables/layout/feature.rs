//! Feature list and feature tables

use otl_types::{Offset16, Tag};

use crate::array::BeArray;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext};
use crate::{FontData, FontRead, ReadError};

use super::script::TagRecord;

/// [Feature List Table](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#feature-list-table)
#[derive(Clone, Copy, Debug, Default)]
pub struct FeatureList<'a> {
    data: FontData<'a>,
    records: &'a [TagRecord],
}

impl<'a> FontRead<'a> for FeatureList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let records = cursor.read_records(count as usize)?;
        Ok(FeatureList { data, records })
    }
}

impl<'a> Sanitize<'a> for FeatureList<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for record in self.records {
            c.resolve::<Feature>(record.offset(), self.data)?;
        }
        Ok(())
    }
}

impl<'a> FeatureList<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &'a [TagRecord] {
        self.records
    }

    /// The feature at this index, with its tag.
    pub fn get(&self, index: u16) -> Option<(Tag, Feature<'a>)> {
        let record = self.records.get(index as usize)?;
        Some((record.tag(), record.offset().resolve(self.data).ok()?))
    }

    /// The tag of the feature at this index.
    pub fn tag(&self, index: u16) -> Option<Tag> {
        self.records.get(index as usize).map(TagRecord::tag)
    }

    /// Iterate over (tag, feature) pairs, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, Feature<'a>)> + 'a {
        let data = self.data;
        self.records
            .iter()
            .filter_map(move |rec| Some((rec.tag(), rec.offset().resolve(data).ok()?)))
    }
}

/// [Feature Table](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#feature-table)
#[derive(Clone, Copy, Debug, Default)]
pub struct Feature<'a> {
    feature_params_offset: Offset16,
    lookup_list_indices: BeArray<'a, u16>,
}

impl<'a> FontRead<'a> for Feature<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let feature_params_offset = cursor.read()?;
        let count: u16 = cursor.read()?;
        let lookup_list_indices = cursor.read_be_array(count as usize)?;
        Ok(Feature {
            feature_params_offset,
            lookup_list_indices,
        })
    }
}

impl<'a> Sanitize<'a> for Feature<'a> {}

impl<'a> Feature<'a> {
    /// Indices into the LookupList, in application order.
    pub fn lookup_list_indices(&self) -> BeArray<'a, u16> {
        self.lookup_list_indices
    }

    /// `true` if this feature has a FeatureParams table.
    pub fn has_feature_params(&self) -> bool {
        self.feature_params_offset.to_u32() != 0
    }
}
