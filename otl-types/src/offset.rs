//! Offsets to tables

/// A trait for the different offset representations.
pub trait Offset: Sized + Copy {
    /// Returns this offset as a `usize`, or `None` if it is `0`.
    fn non_null(self) -> Option<usize>;

    /// Returns this offset as a `usize`, treating null as zero.
    fn to_usize(self) -> usize {
        self.non_null().unwrap_or_default()
    }

    /// `true` if this offset is zero.
    fn is_null(self) -> bool {
        self.non_null().is_none()
    }
}

macro_rules! impl_offset {
    ($name:ident, $bits:literal, $rawty:ty) => {
        #[doc = concat!("A", stringify!($bits), "-bit offset to a table.")]
        ///
        /// Specific offset fields may or may not permit NULL values; however we
        /// assume that errors are possible, and expect the caller to handle
        /// the `None` case.
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($rawty);

        impl $name {
            /// Create a new offset.
            pub const fn new(raw: $rawty) -> Self {
                Self(raw)
            }

            /// Return a null offset
            pub const fn null() -> Self {
                Self(0)
            }

            /// The raw value of this offset.
            pub const fn to_u32(self) -> u32 {
                self.0 as u32
            }
        }

        impl crate::raw::Scalar for $name {
            type Raw = <$rawty as crate::raw::Scalar>::Raw;
            fn from_raw(raw: Self::Raw) -> Self {
                let raw = <$rawty as crate::raw::Scalar>::from_raw(raw);
                $name::new(raw)
            }

            fn to_raw(self) -> Self::Raw {
                crate::raw::Scalar::to_raw(self.0)
            }
        }

        impl Offset for $name {
            fn non_null(self) -> Option<usize> {
                match self.0 {
                    0 => None,
                    other => Some(other as usize),
                }
            }
        }
    };
}

impl_offset!(Offset16, 16, u16);
impl_offset!(Offset32, 32, u32);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scalar;

    #[test]
    fn null_offsets() {
        assert_eq!(Offset16::null().non_null(), None);
        assert!(Offset32::new(0).is_null());
        assert_eq!(Offset16::new(12).non_null(), Some(12));
        assert_eq!(Offset32::read(&[0, 1, 0, 0]).map(Offset::to_usize), Some(0x10000));
    }
}
