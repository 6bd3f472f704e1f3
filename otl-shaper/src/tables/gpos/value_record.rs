//! A GPOS ValueRecord

use core::ops::BitOr;

use otl_types::{Offset16, Scalar};

use crate::array::BeArray;
use crate::offset::ResolveOffset;
use crate::sanitize::SanitizeContext;
use crate::tables::layout::DeviceOrVariationIndex;
use crate::{FontData, ReadError};

/// The [ValueFormat](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#value-record)
/// flags, describing which fields are present in a [`ValueRecord`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ValueFormat(u16);

impl ValueFormat {
    /// Includes horizontal adjustment for placement
    pub const X_PLACEMENT: Self = ValueFormat(0x0001);
    /// Includes vertical adjustment for placement
    pub const Y_PLACEMENT: Self = ValueFormat(0x0002);
    /// Includes horizontal adjustment for advance
    pub const X_ADVANCE: Self = ValueFormat(0x0004);
    /// Includes vertical adjustment for advance
    pub const Y_ADVANCE: Self = ValueFormat(0x0008);
    /// Includes Device table (non-variable font) / VariationIndex table (variable font) for horizontal placement
    pub const X_PLACEMENT_DEVICE: Self = ValueFormat(0x0010);
    /// Includes Device table (non-variable font) / VariationIndex table (variable font) for vertical placement
    pub const Y_PLACEMENT_DEVICE: Self = ValueFormat(0x0020);
    /// Includes Device table (non-variable font) / VariationIndex table (variable font) for horizontal advance
    pub const X_ADVANCE_DEVICE: Self = ValueFormat(0x0040);
    /// Includes Device table (non-variable font) / VariationIndex table (variable font) for vertical advance
    pub const Y_ADVANCE_DEVICE: Self = ValueFormat(0x0080);

    /// A mask with all the device/variation index bits set
    pub const ANY_DEVICE_OR_VARIDX: Self = ValueFormat(0x00F0);

    pub fn empty() -> Self {
        ValueFormat(0)
    }

    /// Construct from raw bits, discarding the reserved ones.
    pub fn from_bits_truncate(bits: u16) -> Self {
        ValueFormat(bits & 0x00FF)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// The number of 16-bit fields in a record of this format.
    #[inline]
    pub fn record_len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Return the number of bytes required to store a [`ValueRecord`] in this format.
    #[inline]
    pub fn record_byte_len(self) -> usize {
        self.record_len() * u16::RAW_BYTE_LEN
    }
}

impl BitOr for ValueFormat {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        ValueFormat(self.0 | rhs.0)
    }
}

impl Scalar for ValueFormat {
    type Raw = <u16 as Scalar>::Raw;
    fn to_raw(self) -> Self::Raw {
        Scalar::to_raw(self.0)
    }
    fn from_raw(raw: Self::Raw) -> Self {
        Self::from_bits_truncate(<u16 as Scalar>::from_raw(raw))
    }
}

/// A positioning ValueRecord.
///
/// Records have a variable size determined by their [`ValueFormat`], so they
/// are stored as the raw 16-bit fields along with the data that device
/// offsets are relative to.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueRecord<'a> {
    base: FontData<'a>,
    format: ValueFormat,
    fields: BeArray<'a, u16>,
}

/// The total adjustment described by a [`ValueRecord`], in font units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Adjustment {
    pub x_placement: i32,
    pub y_placement: i32,
    pub x_advance: i32,
    pub y_advance: i32,
}

impl<'a> ValueRecord<'a> {
    /// Read the record at `offset` in `data`; device offsets resolve against `base`.
    pub(crate) fn read(
        base: FontData<'a>,
        data: FontData<'a>,
        offset: usize,
        format: ValueFormat,
    ) -> Result<Self, ReadError> {
        let fields = data.read_be_array(offset, format.record_len())?;
        Ok(ValueRecord {
            base,
            format,
            fields,
        })
    }

    pub fn format(&self) -> ValueFormat {
        self.format
    }

    /// `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.format.is_empty()
    }

    fn field(&self, flag: ValueFormat) -> Option<u16> {
        if !self.format.contains(flag) {
            return None;
        }
        // fields are stored in flag order; count the set bits below this one
        let index = (self.format.0 & (flag.0 - 1)).count_ones();
        self.fields.get(index as usize)
    }

    pub fn x_placement(&self) -> Option<i16> {
        self.field(ValueFormat::X_PLACEMENT).map(|v| v as i16)
    }

    pub fn y_placement(&self) -> Option<i16> {
        self.field(ValueFormat::Y_PLACEMENT).map(|v| v as i16)
    }

    pub fn x_advance(&self) -> Option<i16> {
        self.field(ValueFormat::X_ADVANCE).map(|v| v as i16)
    }

    pub fn y_advance(&self) -> Option<i16> {
        self.field(ValueFormat::Y_ADVANCE).map(|v| v as i16)
    }

    fn device(&self, flag: ValueFormat) -> Option<DeviceOrVariationIndex<'a>> {
        let offset = Offset16::new(self.field(flag)?);
        offset.resolve_nullable(self.base)?.ok()
    }

    pub fn x_placement_device(&self) -> Option<DeviceOrVariationIndex<'a>> {
        self.device(ValueFormat::X_PLACEMENT_DEVICE)
    }

    pub fn y_placement_device(&self) -> Option<DeviceOrVariationIndex<'a>> {
        self.device(ValueFormat::Y_PLACEMENT_DEVICE)
    }

    pub fn x_advance_device(&self) -> Option<DeviceOrVariationIndex<'a>> {
        self.device(ValueFormat::X_ADVANCE_DEVICE)
    }

    pub fn y_advance_device(&self) -> Option<DeviceOrVariationIndex<'a>> {
        self.device(ValueFormat::Y_ADVANCE_DEVICE)
    }

    /// The adjustment at a given size, including device deltas.
    ///
    /// `ppem` of zero disables device tables.
    pub fn adjustment(&self, ppem: u16, units_per_em: u16) -> Adjustment {
        let with_device = |value: Option<i16>, device: Option<DeviceOrVariationIndex>| {
            value.unwrap_or(0) as i32
                + device
                    .map(|device| device.delta(ppem, units_per_em))
                    .unwrap_or(0)
        };
        let devices = ppem != 0 && self.format.intersects(ValueFormat::ANY_DEVICE_OR_VARIDX);
        if !devices {
            return Adjustment {
                x_placement: self.x_placement().unwrap_or(0) as i32,
                y_placement: self.y_placement().unwrap_or(0) as i32,
                x_advance: self.x_advance().unwrap_or(0) as i32,
                y_advance: self.y_advance().unwrap_or(0) as i32,
            };
        }
        Adjustment {
            x_placement: with_device(self.x_placement(), self.x_placement_device()),
            y_placement: with_device(self.y_placement(), self.y_placement_device()),
            x_advance: with_device(self.x_advance(), self.x_advance_device()),
            y_advance: with_device(self.y_advance(), self.y_advance_device()),
        }
    }

    pub(crate) fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        if !self.format.intersects(ValueFormat::ANY_DEVICE_OR_VARIDX) {
            return Ok(());
        }
        for flag in [
            ValueFormat::X_PLACEMENT_DEVICE,
            ValueFormat::Y_PLACEMENT_DEVICE,
            ValueFormat::X_ADVANCE_DEVICE,
            ValueFormat::Y_ADVANCE_DEVICE,
        ] {
            if let Some(offset) = self.field(flag) {
                c.resolve_nullable::<DeviceOrVariationIndex>(Offset16::new(offset), self.base)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_found_by_flag_position() {
        // x_placement, x_advance, x_advance_device
        let format = ValueFormat::X_PLACEMENT | ValueFormat::X_ADVANCE | ValueFormat::X_ADVANCE_DEVICE;
        let bytes = [0xFF, 0xF6, 0x00, 0x32, 0x00, 0x06, 0x00, 0x0B, 0x00, 0x0B, 0x00, 0x03, 0x70, 0x00];
        let data = FontData::new(&bytes);
        let record = ValueRecord::read(data, data, 0, format).unwrap();
        assert_eq!(format.record_byte_len(), 6);
        assert_eq!(record.x_placement(), Some(-10));
        assert_eq!(record.y_placement(), None);
        assert_eq!(record.x_advance(), Some(50));
        assert!(record.x_advance_device().is_some());

        // format 3 device: one 8-bit delta of 0x70 (112) at ppem 11
        let adjusted = record.adjustment(11, 11);
        assert_eq!(adjusted.x_advance, 50 + 112);
        assert_eq!(record.adjustment(0, 1000).x_advance, 50);
        assert_eq!(record.adjustment(12, 1000).x_advance, 50);
    }

    #[test]
    fn empty_format_reads_nothing() {
        let data = FontData::new(&[]);
        let record = ValueRecord::read(data, data, 0, ValueFormat::empty()).unwrap();
        assert!(record.is_empty());
        assert_eq!(record.adjustment(12, 1000), Adjustment::default());
    }
}
