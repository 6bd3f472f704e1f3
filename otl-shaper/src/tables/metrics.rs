//! The `head`, `hhea` and `hmtx` fields needed for default advances

use bytemuck::{Pod, Zeroable};
use otl_types::{GlyphId, Tag};

use crate::{FontData, FontRead, FontReadWithArgs, ReadError};

/// 'head'
pub const HEAD_TAG: Tag = Tag::new(b"head");
/// 'hhea'
pub const HHEA_TAG: Tag = Tag::new(b"hhea");
/// 'hmtx'
pub const HMTX_TAG: Tag = Tag::new(b"hmtx");

/// The units per em used when a font has no usable `head` table.
pub const DEFAULT_UNITS_PER_EM: u16 = 1000;

/// The [head](https://docs.microsoft.com/en-us/typography/opentype/spec/head) table.
#[derive(Clone, Copy, Debug)]
pub struct Head {
    units_per_em: u16,
}

impl<'a> FontRead<'a> for Head {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        // version, fontRevision, checksumAdjustment, magicNumber, flags
        let units_per_em: u16 = data.read_at(18)?;
        if !(16..=16384).contains(&units_per_em) {
            return Err(ReadError::MalformedData("unitsPerEm out of range"));
        }
        Ok(Head { units_per_em })
    }
}

impl Head {
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }
}

/// The [hhea](https://docs.microsoft.com/en-us/typography/opentype/spec/hhea) table.
#[derive(Clone, Copy, Debug)]
pub struct Hhea {
    number_of_h_metrics: u16,
}

impl<'a> FontRead<'a> for Hhea {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        Ok(Hhea {
            number_of_h_metrics: data.read_at(34)?,
        })
    }
}

impl Hhea {
    pub fn number_of_h_metrics(&self) -> u16 {
        self.number_of_h_metrics
    }
}

/// An advance width and left side bearing.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct LongMetric {
    advance: [u8; 2],
    side_bearing: [u8; 2],
}

impl LongMetric {
    pub fn advance(&self) -> u16 {
        u16::from_be_bytes(self.advance)
    }

    pub fn side_bearing(&self) -> i16 {
        i16::from_be_bytes(self.side_bearing)
    }
}

/// The [hmtx](https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx) table.
///
/// The trailing array of side bearings is not read; only advances are used.
#[derive(Clone, Copy, Debug)]
pub struct Hmtx<'a> {
    h_metrics: &'a [LongMetric],
}

impl<'a> FontReadWithArgs<'a> for Hmtx<'a> {
    /// The `numberOfHMetrics` field of `hhea`.
    type Args = u16;

    fn read_with_args(data: FontData<'a>, number_of_h_metrics: &u16) -> Result<Self, ReadError> {
        let h_metrics = data.read_records(0, *number_of_h_metrics as usize)?;
        Ok(Hmtx { h_metrics })
    }
}

impl<'a> Hmtx<'a> {
    pub fn h_metrics(&self) -> &'a [LongMetric] {
        self.h_metrics
    }

    /// The advance width of a glyph.
    ///
    /// Glyphs past the end of the metrics array share the last advance.
    pub fn advance(&self, glyph: GlyphId) -> Option<u16> {
        self.h_metrics
            .get(glyph.to_u16() as usize)
            .or_else(|| self.h_metrics.last())
            .map(LongMetric::advance)
    }
}

#[cfg(test)]
mod tests {
    use otl_test_data::bebuffer::BeBuffer;

    use super::*;

    #[test]
    fn advances_repeat_last_metric() {
        let buf = BeBuffer::new().extend([500u16, 10, 600, 20, 30, 40]);
        let hmtx = Hmtx::read_with_args(FontData::new(&buf), &2).unwrap();
        assert_eq!(hmtx.advance(GlyphId::new(0)), Some(500));
        assert_eq!(hmtx.advance(GlyphId::new(1)), Some(600));
        assert_eq!(hmtx.advance(GlyphId::new(7)), Some(600));
        assert_eq!(hmtx.h_metrics()[0].side_bearing(), 10);
    }

    #[test]
    fn empty_hmtx_has_no_advances() {
        let hmtx = Hmtx::read_with_args(FontData::EMPTY, &0).unwrap();
        assert_eq!(hmtx.advance(GlyphId::new(0)), None);
    }

    #[test]
    fn head_units_per_em() {
        let mut buf = BeBuffer::new().extend([0u16; 9]);
        buf = buf.push(2048u16).extend([0u16; 17]);
        let head = Head::read(FontData::new(&buf)).unwrap();
        assert_eq!(head.units_per_em(), 2048);
        assert!(Head::read(FontData::new(&[0; 10])).is_err());
    }
}
