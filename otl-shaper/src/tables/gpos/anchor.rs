//! Anchor tables and the arrays of them used by attachment positioning

use bytemuck::{Pod, Zeroable};
use otl_types::{Offset16, Scalar};

use crate::array::BeArray;
use crate::offset::ResolveOffset;
use crate::sanitize::{Sanitize, SanitizeContext};
use crate::tables::layout::DeviceOrVariationIndex;
use crate::{FontData, FontRead, FontReadWithArgs, ReadError};

/// An [Anchor Table](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#anchor-tables)
#[derive(Clone, Copy, Debug)]
pub enum AnchorTable<'a> {
    Format1 {
        x_coordinate: i16,
        y_coordinate: i16,
    },
    /// Design units plus a contour point index.
    ///
    /// Outlines are not available to the engine, so the coordinates are used.
    Format2 {
        x_coordinate: i16,
        y_coordinate: i16,
        anchor_point: u16,
    },
    Format3 {
        x_coordinate: i16,
        y_coordinate: i16,
        x_device: Option<DeviceOrVariationIndex<'a>>,
        y_device: Option<DeviceOrVariationIndex<'a>>,
    },
}

impl<'a> FontRead<'a> for AnchorTable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        let x_coordinate = cursor.read()?;
        let y_coordinate = cursor.read()?;
        match format {
            1 => Ok(AnchorTable::Format1 {
                x_coordinate,
                y_coordinate,
            }),
            2 => Ok(AnchorTable::Format2 {
                x_coordinate,
                y_coordinate,
                anchor_point: cursor.read()?,
            }),
            3 => {
                let x_device = cursor.read::<Offset16>()?;
                let y_device = cursor.read::<Offset16>()?;
                Ok(AnchorTable::Format3 {
                    x_coordinate,
                    y_coordinate,
                    x_device: x_device.resolve_nullable(data).transpose()?,
                    y_device: y_device.resolve_nullable(data).transpose()?,
                })
            }
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> Sanitize<'a> for AnchorTable<'a> {}

impl AnchorTable<'_> {
    /// The anchor position in font units at the given size.
    pub fn position(&self, ppem: u16, units_per_em: u16) -> (i32, i32) {
        match self {
            AnchorTable::Format1 {
                x_coordinate,
                y_coordinate,
            }
            | AnchorTable::Format2 {
                x_coordinate,
                y_coordinate,
                ..
            } => (*x_coordinate as i32, *y_coordinate as i32),
            AnchorTable::Format3 {
                x_coordinate,
                y_coordinate,
                x_device,
                y_device,
            } => {
                let delta = |device: &Option<DeviceOrVariationIndex>| {
                    device
                        .map(|device| device.delta(ppem, units_per_em))
                        .unwrap_or(0)
                };
                (
                    *x_coordinate as i32 + delta(x_device),
                    *y_coordinate as i32 + delta(y_device),
                )
            }
        }
    }
}

/// Part of [MarkArray]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct MarkRecord {
    mark_class: [u8; 2],
    mark_anchor_offset: [u8; 2],
}

impl MarkRecord {
    /// Class defined for the associated mark.
    pub fn mark_class(&self) -> u16 {
        u16::from_raw(self.mark_class)
    }

    /// Offset to Anchor table, from beginning of MarkArray table.
    pub fn mark_anchor_offset(&self) -> Offset16 {
        Offset16::from_raw(self.mark_anchor_offset)
    }
}

/// The [MarkArray](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#mark-array-table):
/// a class and anchor for each covered mark.
#[derive(Clone, Copy, Debug)]
pub struct MarkArray<'a> {
    data: FontData<'a>,
    mark_records: &'a [MarkRecord],
}

impl<'a> FontRead<'a> for MarkArray<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let mark_records = cursor.read_records(count as usize)?;
        Ok(MarkArray { data, mark_records })
    }
}

impl<'a> Sanitize<'a> for MarkArray<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for record in self.mark_records {
            c.resolve::<AnchorTable>(record.mark_anchor_offset(), self.data)?;
        }
        Ok(())
    }
}

impl<'a> MarkArray<'a> {
    pub fn len(&self) -> usize {
        self.mark_records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mark_records.is_empty()
    }

    pub fn mark_records(&self) -> &'a [MarkRecord] {
        self.mark_records
    }

    /// The class and anchor of the mark at this coverage index.
    pub fn get(&self, index: u16) -> Option<(u16, AnchorTable<'a>)> {
        let record = self.mark_records.get(index as usize)?;
        let anchor = record.mark_anchor_offset().resolve(self.data).ok()?;
        Some((record.mark_class(), anchor))
    }
}

/// A row-major matrix of anchor offsets, one row per glyph and one column
/// per mark class.
///
/// This is the shape of the BaseArray, Mark2Array and LigatureAttach tables.
/// Null offsets are allowed and mean there is no anchor for that class.
#[derive(Clone, Copy, Debug)]
pub struct AnchorMatrix<'a> {
    data: FontData<'a>,
    rows: u16,
    cols: u16,
    anchor_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontReadWithArgs<'a> for AnchorMatrix<'a> {
    type Args = u16;

    fn read_with_args(data: FontData<'a>, mark_class_count: &u16) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let rows: u16 = cursor.read()?;
        let count = rows as usize * *mark_class_count as usize;
        let anchor_offsets = cursor.read_be_array(count)?;
        Ok(AnchorMatrix {
            data,
            rows,
            cols: *mark_class_count,
            anchor_offsets,
        })
    }
}

impl<'a> AnchorMatrix<'a> {
    /// The number of rows: base glyphs, mark2 glyphs or ligature components.
    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// The anchor for `row` and mark class `col`, if present.
    pub fn get(&self, row: u16, col: u16) -> Option<AnchorTable<'a>> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let index = row as usize * self.cols as usize + col as usize;
        self.anchor_offsets
            .get(index)?
            .resolve_nullable(self.data)?
            .ok()
    }

    pub(crate) fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.anchor_offsets.iter() {
            c.resolve_nullable::<AnchorTable>(offset, self.data)?;
        }
        Ok(())
    }
}

/// The [LigatureArray](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#mark-to-ligature-attachment-positioning-format-1-mark-to-ligature-attachment):
/// one [`AnchorMatrix`] (a LigatureAttach table) per covered ligature.
#[derive(Clone, Copy, Debug)]
pub struct LigatureArray<'a> {
    data: FontData<'a>,
    mark_class_count: u16,
    ligature_attach_offsets: BeArray<'a, Offset16>,
}

impl<'a> FontReadWithArgs<'a> for LigatureArray<'a> {
    type Args = u16;

    fn read_with_args(data: FontData<'a>, mark_class_count: &u16) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let count: u16 = cursor.read()?;
        let ligature_attach_offsets = cursor.read_be_array(count as usize)?;
        Ok(LigatureArray {
            data,
            mark_class_count: *mark_class_count,
            ligature_attach_offsets,
        })
    }
}

impl<'a> LigatureArray<'a> {
    pub fn len(&self) -> usize {
        self.ligature_attach_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ligature_attach_offsets.is_empty()
    }

    /// The component anchors of the ligature at this coverage index.
    pub fn ligature_attach(&self, index: u16) -> Option<AnchorMatrix<'a>> {
        self.ligature_attach_offsets
            .get(index as usize)?
            .resolve_with_args(self.data, &self.mark_class_count)
            .ok()
    }

    pub(crate) fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        for offset in self.ligature_attach_offsets.iter() {
            c.charge(1)?;
            let matrix: AnchorMatrix =
                offset.resolve_with_args(self.data, &self.mark_class_count)?;
            matrix.sanitize(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_matrix_allows_null_entries() {
        // two rows, two classes; row 1 class 0 is null
        let bytes = [
            0x00, 0x02, // rows
            0x00, 0x0A, 0x00, 0x10, 0x00, 0x00, 0x00, 0x0A, // offsets
            0x00, 0x01, 0x00, 0x64, 0xFF, 0x9C, // anchor 1 (100, -100)
            0x00, 0x01, 0x00, 0x00, 0x02, 0x58, // anchor 1 (0, 600)
        ];
        let matrix = AnchorMatrix::read_with_args(FontData::new(&bytes), &2).unwrap();
        let mut c = SanitizeContext::new(bytes.len());
        matrix.sanitize(&mut c).unwrap();
        assert_eq!(matrix.get(0, 0).unwrap().position(0, 1000), (100, -100));
        assert_eq!(matrix.get(0, 1).unwrap().position(0, 1000), (0, 600));
        assert!(matrix.get(1, 0).is_none());
        assert!(matrix.get(1, 1).is_some());
        assert!(matrix.get(2, 0).is_none());
        assert!(matrix.get(0, 2).is_none());
    }
}
