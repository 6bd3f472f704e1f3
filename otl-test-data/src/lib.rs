//! test data shared between the otl crates.
//!
//! Tables are assembled from small builders rather than checked in as
//! binaries, so a test can say what it is testing in a line or two.

pub mod bebuffer;
pub mod gdef;
pub mod gpos;
pub mod gsub;
pub mod layout;
