//! raw font bytes

use std::ops::{Bound, Range, RangeBounds};

use bytemuck::AnyBitPattern;
use otl_types::Scalar;

use crate::array::BeArray;
use crate::read::ReadError;

/// A reference to raw binary font data.
///
/// This is a wrapper around a byte slice, that provides convenience methods
/// for parsing and validating that data.
#[derive(Debug, Default, Clone, Copy)]
pub struct FontData<'a> {
    bytes: &'a [u8],
}

/// A cursor for validating bytes during parsing.
///
/// Every read advances the cursor, whether or not it succeeds, so that a
/// sequence of reads can be checked once with `?` at each step.
pub struct Cursor<'a> {
    pos: usize,
    data: FontData<'a>,
}

impl<'a> FontData<'a> {
    /// Empty data, useful for some tests and examples
    pub const EMPTY: FontData<'static> = FontData { bytes: &[] };

    /// Create a new `FontData` with these bytes.
    pub const fn new(bytes: &'a [u8]) -> Self {
        FontData { bytes }
    }

    /// The length of the data, in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if the data has a length of zero bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns self[pos..]
    pub fn split_off(&self, pos: usize) -> Option<FontData<'a>> {
        self.bytes.get(pos..).map(|bytes| FontData { bytes })
    }

    /// Returns self[range]
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Option<FontData<'a>> {
        let bounds = (range.start_bound().cloned(), range.end_bound().cloned());
        if let (Bound::Included(start), Bound::Excluded(end)) = bounds {
            if start > end {
                return None;
            }
        }
        self.bytes.get(bounds).map(|bytes| FontData { bytes })
    }

    /// Read a scalar at the provided location in the data.
    pub fn read_at<T: Scalar>(&self, offset: usize) -> Result<T, ReadError> {
        let end = offset
            .checked_add(T::RAW_BYTE_LEN)
            .ok_or(ReadError::OutOfBounds)?;
        self.bytes
            .get(offset..end)
            .and_then(T::read)
            .ok_or(ReadError::OutOfBounds)
    }

    /// Interpret the bytes in `range` as a slice of `T`.
    ///
    /// `T` is expected to be a record made up of raw byte arrays, which means
    /// it has an alignment of 1 and any bit pattern is valid.
    pub fn read_array<T: AnyBitPattern>(&self, range: Range<usize>) -> Result<&'a [T], ReadError> {
        let bytes = self.bytes.get(range).ok_or(ReadError::OutOfBounds)?;
        bytemuck::try_cast_slice(bytes).map_err(|_| ReadError::InvalidArrayLen)
    }

    /// Read `count` big-endian scalars starting at `offset`.
    pub fn read_be_array<T: Scalar>(
        &self,
        offset: usize,
        count: usize,
    ) -> Result<BeArray<'a, T>, ReadError> {
        let len = count
            .checked_mul(T::RAW_BYTE_LEN)
            .and_then(|len| len.checked_add(offset))
            .ok_or(ReadError::OutOfBounds)?;
        self.read_array::<T::Raw>(offset..len).map(BeArray::new)
    }

    /// Read `count` fixed-size records starting at `offset`.
    pub fn read_records<T: AnyBitPattern>(
        &self,
        offset: usize,
        count: usize,
    ) -> Result<&'a [T], ReadError> {
        let len = count
            .checked_mul(std::mem::size_of::<T>())
            .and_then(|len| len.checked_add(offset))
            .ok_or(ReadError::OutOfBounds)?;
        self.read_array(offset..len)
    }

    pub(crate) fn check_in_bounds(&self, end: usize) -> Result<(), ReadError> {
        if end <= self.bytes.len() {
            Ok(())
        } else {
            Err(ReadError::OutOfBounds)
        }
    }

    pub(crate) fn cursor(&self) -> Cursor<'a> {
        Cursor {
            pos: 0,
            data: *self,
        }
    }

    /// Return the data as a byte slice
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a> Cursor<'a> {
    pub(crate) fn advance_by(&mut self, n_bytes: usize) {
        self.pos = self.pos.saturating_add(n_bytes);
    }

    pub(crate) fn read<T: Scalar>(&mut self) -> Result<T, ReadError> {
        let temp = self.data.read_at(self.pos);
        self.pos = self.pos.saturating_add(T::RAW_BYTE_LEN);
        temp
    }

    pub(crate) fn read_be_array<T: Scalar>(
        &mut self,
        count: usize,
    ) -> Result<BeArray<'a, T>, ReadError> {
        let temp = self.data.read_be_array(self.pos, count);
        self.pos = self
            .pos
            .saturating_add(count.saturating_mul(T::RAW_BYTE_LEN));
        temp
    }

    pub(crate) fn read_records<T: AnyBitPattern>(
        &mut self,
        count: usize,
    ) -> Result<&'a [T], ReadError> {
        let temp = self.data.read_records(self.pos, count);
        self.pos = self
            .pos
            .saturating_add(count.saturating_mul(std::mem::size_of::<T>()));
        temp
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Return an error if we have read past the end of the data.
    pub(crate) fn finish(&self) -> Result<(), ReadError> {
        self.data.check_in_bounds(self.pos)
    }
}

// lets offsets resolve to the raw data they point at
impl<'a> crate::read::FontRead<'a> for FontData<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        Ok(data)
    }
}

impl AsRef<[u8]> for FontData<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> From<&'a [u8]> for FontData<'a> {
    fn from(src: &'a [u8]) -> FontData<'a> {
        FontData::new(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_reads() {
        let data = FontData::new(&[0, 1, 0, 2, 0xFF]);
        assert_eq!(data.read_at::<u16>(0), Ok(1));
        assert_eq!(data.read_at::<u16>(2), Ok(2));
        assert_eq!(data.read_at::<u16>(4), Err(ReadError::OutOfBounds));
        assert_eq!(data.read_at::<u32>(usize::MAX), Err(ReadError::OutOfBounds));
        assert!(data.slice(3..2).is_none());
        assert!(data.split_off(6).is_none());
    }

    #[test]
    fn arrays() {
        let data = FontData::new(&[0, 1, 0, 2, 0xFF]);
        let arr = data.read_be_array::<u16>(0, 2).unwrap();
        assert_eq!(arr.iter().collect::<Vec<_>>(), [1, 2]);
        assert!(data.read_be_array::<u16>(2, 2).is_err());
        assert_eq!(
            data.read_array::<[u8; 2]>(0..5),
            Err(ReadError::InvalidArrayLen)
        );
    }

    #[test]
    fn cursor_reports_overrun_on_finish() {
        let data = FontData::new(&[0, 1, 0]);
        let mut cursor = data.cursor();
        assert_eq!(cursor.read::<u16>(), Ok(1));
        assert!(cursor.read::<u16>().is_err());
        assert!(cursor.finish().is_err());
    }
}
