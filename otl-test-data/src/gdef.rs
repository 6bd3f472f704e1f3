//! GDEF tables.

use crate::bebuffer::BeBuffer;
use crate::layout::{assemble, class_def, coverage};

pub const BASE: u16 = 1;
pub const LIGATURE: u16 = 2;
pub const MARK: u16 = 3;
pub const COMPONENT: u16 = 4;

/// A version 1.0 GDEF with a glyph class definition and, if non-empty, a
/// mark attachment class definition.
pub fn gdef(glyph_classes: &[(u16, u16)], mark_attach_classes: &[(u16, u16)]) -> Vec<u8> {
    let head = BeBuffer::new().push(1u16).push(0u16).extend([0u16; 4]);
    let mut children = vec![(4, class_def(glyph_classes))];
    if !mark_attach_classes.is_empty() {
        children.push((10, class_def(mark_attach_classes)));
    }
    assemble(&head, children)
}

/// A version 1.2 GDEF with glyph classes and mark glyph sets.
///
/// Each set must be sorted.
pub fn gdef_with_mark_sets(glyph_classes: &[(u16, u16)], mark_sets: &[&[u16]]) -> Vec<u8> {
    let head = BeBuffer::new().push(1u16).push(2u16).extend([0u16; 5]);
    let sets_head = BeBuffer::new()
        .push(1u16)
        .push(mark_sets.len() as u16)
        .extend(mark_sets.iter().map(|_| 0u32));
    // MarkGlyphSets uses 32-bit offsets, patched by hand
    let mut sets = sets_head.to_vec();
    for (i, set) in mark_sets.iter().enumerate() {
        let offset = sets.len() as u32;
        let pos = 4 + 4 * i;
        sets[pos..pos + 4].copy_from_slice(&offset.to_be_bytes());
        sets.extend(coverage(set));
    }
    assemble(&head, vec![(4, class_def(glyph_classes)), (12, sets)])
}
