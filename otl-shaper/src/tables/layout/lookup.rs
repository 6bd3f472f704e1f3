//! Lookups and the lookup list, shared by GSUB and GPOS

use otl_types::{Offset, Offset16, Offset32};

use crate::digest::SetDigest;
use crate::offset::ResolveOffset;
use crate::sanitize::SanitizeContext;
use crate::{FontData, ReadError};

use super::LookupFlag;

/// A subtable type that can appear in a lookup.
///
/// This is implemented by the GSUB and GPOS subtable enums; it lets the
/// lookup machinery (including extension resolution) be shared.
pub trait LookupSubtable<'a>: Sized {
    /// The lookup type used for extension subtables in this table.
    const EXTENSION_TYPE: u16;

    /// Read and sanitize a subtable of the given (non-extension) lookup type.
    fn read_subtable(
        lookup_type: u16,
        data: FontData<'a>,
        c: &mut SanitizeContext,
    ) -> Result<Self, ReadError>;

    /// Add the glyphs that may start a match to `digest`.
    fn add_to_digest(&self, digest: &mut SetDigest);
}

/// A validated [Lookup Table](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#lookup-table).
///
/// Extension subtables are resolved when the lookup is loaded, and
/// [`Lookup::lookup_type`] reports the type of the extended subtables.
/// Subtables that fail validation are dropped individually; the rest of the
/// lookup stays usable.
#[derive(Clone, Debug)]
pub struct Lookup<T> {
    lookup_type: u16,
    flag: LookupFlag,
    mark_filtering_set: Option<u16>,
    declared_subtable_count: u16,
    subtables: Vec<T>,
    digest: SetDigest,
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Lookup {
            lookup_type: 0,
            flag: LookupFlag::empty(),
            mark_filtering_set: None,
            declared_subtable_count: 0,
            subtables: Vec::new(),
            digest: SetDigest::default(),
        }
    }
}

impl<T> Lookup<T> {
    /// The lookup type; for extension lookups, the type of the extended subtables.
    pub fn lookup_type(&self) -> u16 {
        self.lookup_type
    }

    pub fn flag(&self) -> LookupFlag {
        self.flag
    }

    /// The index of the mark glyph set in GDEF, if the flag requests one.
    pub fn mark_filtering_set(&self) -> Option<u16> {
        self.mark_filtering_set
    }

    /// The flags and mark filtering set packed as a single value.
    ///
    /// The low 16 bits are the lookup flag, the high 16 bits the mark
    /// filtering set index.
    pub fn props(&self) -> u32 {
        self.flag.to_bits() as u32 | (self.mark_filtering_set.unwrap_or(0) as u32) << 16
    }

    /// The subtables that passed validation.
    pub fn subtables(&self) -> &[T] {
        &self.subtables
    }

    /// The number of subtables in the font data, including any that were dropped.
    pub fn declared_subtable_count(&self) -> u16 {
        self.declared_subtable_count
    }

    /// A digest of every glyph that could start a match in this lookup.
    pub fn digest(&self) -> &SetDigest {
        &self.digest
    }
}

impl<'a, T: LookupSubtable<'a>> Lookup<T> {
    /// Read a lookup and all of its subtables.
    ///
    /// An error is returned only if the lookup header itself is invalid.
    pub fn read_sanitized(data: FontData<'a>, c: &mut SanitizeContext) -> Result<Self, ReadError> {
        c.charge(1)?;
        let mut cursor = data.cursor();
        let declared_type: u16 = cursor.read()?;
        let flag: LookupFlag = cursor.read()?;
        let subtable_count: u16 = cursor.read()?;
        let offsets = cursor.read_be_array::<Offset16>(subtable_count as usize)?;
        let mark_filtering_set = if flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
            Some(cursor.read::<u16>()?)
        } else {
            None
        };

        let mut lookup_type = declared_type;
        let mut subtables = Vec::with_capacity(offsets.len());
        for (i, offset) in offsets.iter().enumerate() {
            let result = if declared_type == T::EXTENSION_TYPE {
                read_extension::<T>(offset, data, c).and_then(|(ext_type, subtable)| {
                    if subtables.is_empty() {
                        lookup_type = ext_type;
                    } else if ext_type != lookup_type {
                        return Err(ReadError::MalformedData(
                            "extension subtables of differing types",
                        ));
                    }
                    Ok(subtable)
                })
            } else {
                c.charge(1)?;
                offset
                    .non_null()
                    .ok_or(ReadError::NullOffset)
                    .and_then(|off| data.split_off(off).ok_or(ReadError::OutOfBounds))
                    .and_then(|sub_data| T::read_subtable(declared_type, sub_data, c))
            };
            match result {
                Ok(subtable) => subtables.push(subtable),
                Err(ReadError::SanitizeBudget) => return Err(ReadError::SanitizeBudget),
                Err(e) => {
                    log::debug!("dropping subtable {i} of type {declared_type} lookup: {e}");
                }
            }
        }

        let mut digest = SetDigest::default();
        for subtable in &subtables {
            subtable.add_to_digest(&mut digest);
        }

        Ok(Lookup {
            lookup_type,
            flag,
            mark_filtering_set,
            declared_subtable_count: subtable_count,
            subtables,
            digest,
        })
    }
}

fn read_extension<'a, T: LookupSubtable<'a>>(
    offset: Offset16,
    base: FontData<'a>,
    c: &mut SanitizeContext,
) -> Result<(u16, T), ReadError> {
    c.charge(1)?;
    let off = offset.non_null().ok_or(ReadError::NullOffset)?;
    let data = base.split_off(off).ok_or(ReadError::OutOfBounds)?;
    let mut cursor = data.cursor();
    let format: u16 = cursor.read()?;
    if format != 1 {
        return Err(ReadError::InvalidFormat(format.into()));
    }
    let extension_type: u16 = cursor.read()?;
    let extension_offset: Offset32 = cursor.read()?;
    if extension_type == T::EXTENSION_TYPE {
        return Err(ReadError::MalformedData("nested extension subtable"));
    }
    let ext_data = extension_offset
        .non_null()
        .ok_or(ReadError::NullOffset)
        .and_then(|off| data.split_off(off).ok_or(ReadError::OutOfBounds))?;
    T::read_subtable(extension_type, ext_data, c).map(|sub| (extension_type, sub))
}

/// A validated [Lookup List Table](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#lookup-list-table).
#[derive(Clone, Debug)]
pub struct LookupList<T> {
    lookups: Vec<Lookup<T>>,
}

impl<T> Default for LookupList<T> {
    fn default() -> Self {
        LookupList {
            lookups: Vec::new(),
        }
    }
}

impl<'a, T: LookupSubtable<'a>> LookupList<T> {
    pub fn read_sanitized(data: FontData<'a>, c: &mut SanitizeContext) -> Result<Self, ReadError> {
        c.charge(1)?;
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let offsets = cursor.read_be_array::<Offset16>(count as usize)?;
        let lookups = offsets
            .iter()
            .map(|offset| {
                let lookup_data = offset.resolve::<FontData>(data)?;
                Lookup::read_sanitized(lookup_data, c)
            })
            .collect::<Result<_, _>>()?;
        Ok(LookupList { lookups })
    }
}

impl<T> LookupList<T> {
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&Lookup<T>> {
        self.lookups.get(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lookup<T>> + '_ {
        self.lookups.iter()
    }
}
