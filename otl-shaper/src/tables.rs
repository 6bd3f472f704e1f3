//! The layout tables and the metrics tables used for default advances

pub mod gdef;
pub mod gpos;
pub mod gsub;
pub mod layout;
pub mod metrics;
