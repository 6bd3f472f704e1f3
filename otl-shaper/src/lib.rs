//! Applying OpenType Layout tables to glyph runs
//!
//! This crate validates the [`GDEF`], [`GSUB`] and [`GPOS`] tables of a font
//! and applies their lookups to a [`GlyphBuffer`]. It sits between
//! character-to-glyph mapping (which it does not do) and rendering: the
//! input is a run of glyph identifiers, the output is the substituted run
//! with final advances and offsets.
//!
//! Font data is untrusted. Every table is sanitized once, when the
//! [`LayoutFace`] is created; a table (or a lookup subtable) that fails
//! validation is replaced by an empty one, so shaping never fails because
//! of a damaged font and never reads out of bounds.
//!
//! # Example
//!
//! ```no_run
//! # let path_to_my_font_file = std::path::Path::new("");
//! use otl_shaper::{shape, Direction, GlyphBuffer, LayoutFace, PlanBuilder};
//! use otl_types::{GlyphId, Tag};
//!
//! let font_bytes = std::fs::read(path_to_my_font_file).unwrap();
//! let face = LayoutFace::new(&font_bytes).expect("failed to read font data");
//! let mut builder = PlanBuilder::new(&face, Some(Tag::new(b"latn")), None, Direction::LeftToRight);
//! builder.add_default_features();
//! let plan = builder.build();
//!
//! let mut buffer = GlyphBuffer::new();
//! for (cluster, gid) in [12u16, 13, 14].into_iter().enumerate() {
//!     buffer.push(GlyphId::new(gid), cluster as u32);
//! }
//! plan.setup_masks(&mut buffer);
//! shape(&face, &plan, &mut buffer).unwrap();
//! for (info, pos) in buffer.glyph_infos().iter().zip(buffer.glyph_positions()) {
//!     println!("{} +{}", info.glyph_id, pos.x_advance);
//! }
//! ```
//!
//! [`GDEF`]: https://learn.microsoft.com/en-us/typography/opentype/spec/gdef
//! [`GSUB`]: https://learn.microsoft.com/en-us/typography/opentype/spec/gsub
//! [`GPOS`]: https://learn.microsoft.com/en-us/typography/opentype/spec/gpos

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod apply;
pub mod array;
mod buffer;
mod closure;
pub mod collections;
mod digest;
mod face;
mod font_data;
mod offset;
mod plan;
mod read;
pub mod sanitize;
mod shape;
pub mod tables;

pub use apply::{TableKind, WouldApplyContext, MAX_CONTEXT_LENGTH, MAX_NESTING_LEVEL};
pub use buffer::{
    Direction, GlyphBuffer, GlyphInfo, GlyphPosition, GlyphPropsFlags, UnicodeFlags,
};
pub use closure::GlyphSets;
pub use digest::SetDigest;
pub use face::{LayoutFace, TableDirectory, TableRecord};
pub use font_data::FontData;
pub use plan::{
    FeatureFlags, FeatureMap, LookupMap, PauseFn, PlanBuilder, ShapePlan, Stage,
    MAX_FEATURE_VALUE,
};
pub use read::{FontRead, FontReadWithArgs, ReadError};
pub use shape::{shape, Instance, ShapeConfig, ShapeError};

/// Public re-export of the otl-types crate.
pub extern crate otl_types as types;
