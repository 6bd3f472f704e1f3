//! Resolving offsets against their base data

use otl_types::Offset;

use crate::{FontData, FontRead, FontReadWithArgs, ReadError};

/// Resolve the bytes at an offset into a concrete type.
///
/// Offsets in layout tables are relative to the start of the table (or
/// subtable) that contains them; `data` must be that base.
pub trait ResolveOffset: Offset {
    /// Resolve a non-nullable offset. A null offset is an error.
    fn resolve<'a, T: FontRead<'a>>(self, data: FontData<'a>) -> Result<T, ReadError> {
        let off = self.non_null().ok_or(ReadError::NullOffset)?;
        data.split_off(off)
            .ok_or(ReadError::OutOfBounds)
            .and_then(T::read)
    }

    /// Resolve an offset that is permitted to be null.
    fn resolve_nullable<'a, T: FontRead<'a>>(
        self,
        data: FontData<'a>,
    ) -> Option<Result<T, ReadError>> {
        let off = self.non_null()?;
        Some(
            data.split_off(off)
                .ok_or(ReadError::OutOfBounds)
                .and_then(T::read),
        )
    }

    /// Resolve a non-nullable offset to a type that requires arguments.
    fn resolve_with_args<'a, T: FontReadWithArgs<'a>>(
        self,
        data: FontData<'a>,
        args: &T::Args,
    ) -> Result<T, ReadError> {
        let off = self.non_null().ok_or(ReadError::NullOffset)?;
        data.split_off(off)
            .ok_or(ReadError::OutOfBounds)
            .and_then(|data| T::read_with_args(data, args))
    }
}

impl<O: Offset> ResolveOffset for O {}
