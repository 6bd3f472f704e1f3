//! Traits for interpreting font data

use otl_types::Tag;

use crate::font_data::FontData;

/// A type that can be read from raw table data.
///
/// This trait is implemented for all tables that are self-describing: that
/// is, tables that do not require any external state in order to interpret
/// their underlying bytes. (Tables that require external state implement
/// [`FontReadWithArgs`] instead)
pub trait FontRead<'a>: Sized {
    /// Read an instance of `Self` from the provided data, performing validation.
    ///
    /// This checks that the fixed-size header and any inline arrays are in
    /// bounds; it does not follow offsets. Following offsets is the job of
    /// [`Sanitize`](crate::sanitize::Sanitize).
    fn read(data: FontData<'a>) -> Result<Self, ReadError>;
}

/// A trait for types that require external data in order to be constructed.
pub trait FontReadWithArgs<'a>: Sized {
    type Args: Copy;

    /// read an item, using the provided args.
    fn read_with_args(data: FontData<'a>, args: &Self::Args) -> Result<Self, ReadError>;
}

/// An error that occurs when reading font data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("An offset was out of bounds")]
    OutOfBounds,
    /// A format field had an unsupported value.
    #[error("Invalid format '{0}'")]
    InvalidFormat(i64),
    #[error("Specified array length not a multiple of item size")]
    InvalidArrayLen,
    #[error("A non-nullable offset was null")]
    NullOffset,
    #[error("the {0} table is missing")]
    TableIsMissing(Tag),
    #[error("Invalid sfnt version 0x{0:08X}")]
    InvalidSfnt(u32),
    #[error("Sanitize budget exceeded")]
    SanitizeBudget,
    #[error("Malformed data: '{0}'")]
    MalformedData(&'static str),
}

impl ReadError {
    /// `true` if this error means the data violates the structure of a table.
    ///
    /// The remaining kinds describe data that is well formed but not
    /// understood (an unknown format) or not present at all.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ReadError::OutOfBounds
                | ReadError::InvalidArrayLen
                | ReadError::NullOffset
                | ReadError::SanitizeBudget
                | ReadError::MalformedData(_)
        )
    }

    /// `true` if this error is an unrecognized format discriminant.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, ReadError::InvalidFormat(_))
    }
}
