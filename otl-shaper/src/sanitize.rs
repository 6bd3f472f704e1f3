//! Validating untrusted table data before it is used.
//!
//! Reading a table with [`FontRead`] only checks the fixed-size header and
//! inline arrays. Sanitizing walks every offset reachable from a table and
//! checks that the referenced data is also well formed, so that the code
//! that applies lookups never has to handle a read error.
//!
//! The walk is bounded by an operation budget proportional to the size of
//! the data, which keeps adversarial fonts (for instance, many offsets that
//! point at the same large subtable) from causing excessive work.

use otl_types::{Offset, Tag};

use crate::{offset::ResolveOffset, FontData, FontRead, ReadError};

/// The number of checks allowed per byte of input.
pub const SANITIZE_MAX_OPS_FACTOR: usize = 8;
/// The minimum number of checks allowed, regardless of input size.
pub const SANITIZE_MAX_OPS_MIN: usize = 16384;
/// The maximum number of checks allowed, regardless of input size.
pub const SANITIZE_MAX_OPS_MAX: usize = 0x3FFF_FFFF;

/// State shared across a sanitize pass.
#[derive(Debug, Clone)]
pub struct SanitizeContext {
    ops_left: usize,
}

impl SanitizeContext {
    /// Create a context for sanitizing a blob of `len` bytes.
    pub fn new(len: usize) -> Self {
        let ops = len
            .saturating_mul(SANITIZE_MAX_OPS_FACTOR)
            .clamp(SANITIZE_MAX_OPS_MIN, SANITIZE_MAX_OPS_MAX);
        SanitizeContext { ops_left: ops }
    }

    /// Create a context with an explicit budget.
    pub fn with_budget(ops: usize) -> Self {
        SanitizeContext { ops_left: ops }
    }

    /// Charge `n` operations against the budget.
    pub fn charge(&mut self, n: usize) -> Result<(), ReadError> {
        self.ops_left = self
            .ops_left
            .checked_sub(n)
            .ok_or(ReadError::SanitizeBudget)?;
        Ok(())
    }

    pub fn ops_left(&self) -> usize {
        self.ops_left
    }

    /// Read and sanitize a value from `data`.
    pub fn check<'a, T: Sanitize<'a>>(&mut self, data: FontData<'a>) -> Result<T, ReadError> {
        self.charge(1)?;
        let item = T::read(data)?;
        item.sanitize(self)?;
        Ok(item)
    }

    /// Resolve a non-nullable offset against `base`, then sanitize the result.
    pub fn resolve<'a, T: Sanitize<'a>>(
        &mut self,
        offset: impl Offset,
        base: FontData<'a>,
    ) -> Result<T, ReadError> {
        self.charge(1)?;
        let item: T = offset.resolve(base)?;
        item.sanitize(self)?;
        Ok(item)
    }

    /// Resolve a nullable offset against `base`, then sanitize the result.
    pub fn resolve_nullable<'a, T: Sanitize<'a>>(
        &mut self,
        offset: impl Offset,
        base: FontData<'a>,
    ) -> Result<Option<T>, ReadError> {
        if offset.is_null() {
            return Ok(None);
        }
        self.resolve(offset, base).map(Some)
    }
}

/// A type whose nested data can be validated.
pub trait Sanitize<'a>: FontRead<'a> {
    /// Check everything reachable from `self`.
    ///
    /// The default implementation is for types with no offsets; those are
    /// fully validated by [`FontRead::read`].
    fn sanitize(&self, c: &mut SanitizeContext) -> Result<(), ReadError> {
        let _ = c;
        Ok(())
    }
}

/// A top-level table: the root of a sanitize pass.
///
/// Loading a table validates everything reachable from it. When the root
/// structure is invalid the caller gets [`SanitizeTable::null`] instead,
/// which behaves as if the table were present but empty: no scripts,
/// features or lookups, and every glyph unclassified.
pub trait SanitizeTable<'a>: Sized {
    /// The tag of this table in the font's table directory.
    const TAG: Tag;

    /// Read the table, validating everything reachable from it.
    fn read_sanitized(data: FontData<'a>, c: &mut SanitizeContext) -> Result<Self, ReadError>;

    /// The empty stand-in for a missing or invalid table.
    fn null() -> Self;
}

/// Sanitize a top-level table, returning the reason if it is invalid.
pub fn try_sanitize<'a, T: SanitizeTable<'a>>(data: FontData<'a>) -> Result<T, ReadError> {
    let mut c = SanitizeContext::new(data.len());
    T::read_sanitized(data, &mut c)
}

/// Sanitize a top-level table, substituting the null table on failure.
pub fn sanitize<'a, T: SanitizeTable<'a>>(data: FontData<'a>) -> T {
    match try_sanitize(data) {
        Ok(table) => table,
        Err(e) => {
            log::warn!("'{}' table failed to sanitize ({e}); using an empty table", T::TAG);
            T::null()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_clamped() {
        assert_eq!(SanitizeContext::new(0).ops_left(), SANITIZE_MAX_OPS_MIN);
        assert_eq!(SanitizeContext::new(10_000).ops_left(), 80_000);
        assert_eq!(
            SanitizeContext::new(usize::MAX).ops_left(),
            SANITIZE_MAX_OPS_MAX
        );
    }

    #[test]
    fn budget_exhaustion_is_an_error() {
        let mut c = SanitizeContext::with_budget(2);
        assert!(c.charge(2).is_ok());
        assert_eq!(c.charge(1), Err(ReadError::SanitizeBudget));
    }
}
