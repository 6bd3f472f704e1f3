//! Device tables: ppem-dependent adjustments

use crate::array::BeArray;
use crate::sanitize::Sanitize;
use crate::{FontData, FontRead, ReadError};

/// The format value that marks a VariationIndex table.
pub const VARIATION_INDEX_FORMAT: u16 = 0x8000;

/// A [Device](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#device-and-variationindex-tables)
/// or VariationIndex table.
#[derive(Clone, Copy, Debug)]
pub enum DeviceOrVariationIndex<'a> {
    Device(Device<'a>),
    /// Variation data is not applied; these always have a zero delta.
    VariationIndex { outer: u16, inner: u16 },
    /// A format this crate does not understand, treated as no adjustment.
    Unknown(u16),
}

/// A hinting device table, storing packed pixel deltas for a range of sizes.
#[derive(Clone, Copy, Debug)]
pub struct Device<'a> {
    start_size: u16,
    end_size: u16,
    delta_format: u16,
    delta_values: BeArray<'a, u16>,
}

impl<'a> FontRead<'a> for DeviceOrVariationIndex<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let start_size: u16 = cursor.read()?;
        let end_size: u16 = cursor.read()?;
        let delta_format: u16 = cursor.read()?;
        match delta_format {
            1..=3 => {
                let count = if start_size > end_size {
                    0
                } else {
                    let bits = 1usize << delta_format;
                    let sizes = (end_size - start_size) as usize + 1;
                    (sizes * bits).div_ceil(16)
                };
                let delta_values = cursor.read_be_array(count)?;
                Ok(DeviceOrVariationIndex::Device(Device {
                    start_size,
                    end_size,
                    delta_format,
                    delta_values,
                }))
            }
            VARIATION_INDEX_FORMAT => Ok(DeviceOrVariationIndex::VariationIndex {
                outer: start_size,
                inner: end_size,
            }),
            other => Ok(DeviceOrVariationIndex::Unknown(other)),
        }
    }
}

impl<'a> Sanitize<'a> for DeviceOrVariationIndex<'a> {}

impl DeviceOrVariationIndex<'_> {
    /// The adjustment, in font units, at this size.
    ///
    /// `ppem` of zero means the size is unknown and no adjustment is made.
    pub fn delta(&self, ppem: u16, units_per_em: u16) -> i32 {
        match self {
            DeviceOrVariationIndex::Device(device) => device.delta(ppem, units_per_em),
            _ => 0,
        }
    }
}

impl Device<'_> {
    pub fn start_size(&self) -> u16 {
        self.start_size
    }

    pub fn end_size(&self) -> u16 {
        self.end_size
    }

    /// The adjustment in pixels at this size.
    pub fn delta_pixels(&self, ppem: u16) -> i32 {
        if ppem < self.start_size || ppem > self.end_size {
            return 0;
        }
        let f = self.delta_format as u32;
        let s = (ppem - self.start_size) as u32;
        let Some(word) = self.delta_values.get((s >> (4 - f)) as usize) else {
            return 0;
        };
        let word = word as u32;
        let bits = word >> (16 - (((s & ((1 << (4 - f)) - 1)) + 1) << f));
        let mask = 0xFFFFu32 >> (16 - (1 << f));
        let mut delta = (bits & mask) as i32;
        if delta as u32 >= (mask + 1) >> 1 {
            delta -= (mask + 1) as i32;
        }
        delta
    }

    /// The adjustment, scaled from pixels to font units.
    pub fn delta(&self, ppem: u16, units_per_em: u16) -> i32 {
        if ppem == 0 {
            return 0;
        }
        let pixels = self.delta_pixels(ppem);
        if pixels == 0 {
            return 0;
        }
        (pixels as i64 * units_per_em as i64 / ppem as i64) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format1_deltas() {
        // sizes 11..=15, 2-bit deltas [1, 1, 1, 1, 1]
        let data = [0x00, 0x0B, 0x00, 0x0F, 0x00, 0x01, 0x55, 0x40];
        let DeviceOrVariationIndex::Device(device) =
            DeviceOrVariationIndex::read(FontData::new(&data)).unwrap()
        else {
            panic!("expected device");
        };
        assert_eq!(device.delta_pixels(10), 0);
        assert_eq!(device.delta_pixels(11), 1);
        assert_eq!(device.delta_pixels(12), 1);
        assert_eq!(device.delta_pixels(14), 1);
        assert_eq!(device.delta_pixels(15), 1);
        assert_eq!(device.delta_pixels(16), 0);
        assert_eq!(device.delta(12, 1200), 100);
        assert_eq!(device.delta(0, 1200), 0);
    }

    #[test]
    fn negative_deltas() {
        // format 2 (4 bit), sizes 8..=9 with deltas [-1, 2]
        let data = [0x00, 0x08, 0x00, 0x09, 0x00, 0x02, 0xF2, 0x00];
        let device = DeviceOrVariationIndex::read(FontData::new(&data)).unwrap();
        let DeviceOrVariationIndex::Device(device) = device else {
            panic!("expected device");
        };
        assert_eq!(device.delta_pixels(8), -1);
        assert_eq!(device.delta_pixels(9), 2);
    }

    #[test]
    fn variation_index_is_zero() {
        let data = [0x00, 0x01, 0x00, 0x02, 0x80, 0x00];
        let table = DeviceOrVariationIndex::read(FontData::new(&data)).unwrap();
        assert!(matches!(
            table,
            DeviceOrVariationIndex::VariationIndex { outer: 1, inner: 2 }
        ));
        assert_eq!(table.delta(12, 1000), 0);
    }
}
