//! Data structures useful for font work.

mod int_set;

pub use int_set::{Domain, IntSet};
