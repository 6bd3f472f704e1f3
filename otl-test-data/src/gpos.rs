//! GPOS subtables.

use crate::bebuffer::BeBuffer;
use crate::layout::{assemble, class_def, coverage};

// https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#example-2-singleposformat1-subtable
#[rustfmt::skip]
pub static SINGLEPOSFORMAT1_TABLE: &[u8] = &[
    0x00, 0x01, // format 1
    0x00, 0x08, // coverage offset
    0x00, 0x02, // valueFormat: Y_PLACEMENT
    0xFF, 0xB0, // yPlacement -80
    0x00, 0x02, // coverage format 2
    0x00, 0x01, // range count
    0x01, 0xB3, 0x01, 0xBC, 0x00, 0x00, // 435..=444, start index 0
];

/// The X_ADVANCE value format.
pub const X_ADVANCE: u16 = 0x0004;

/// Single positioning, format 1: the same x advance adjustment for every glyph.
pub fn single_pos_x_advance(glyphs: &[u16], x_advance: i16) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(X_ADVANCE)
        .push(x_advance);
    assemble(&head, vec![(2, coverage(glyphs))])
}

/// Single positioning, format 2: one `(x_placement, y_placement)` per glyph.
pub fn single_pos_placements(entries: &[(u16, i16, i16)]) -> Vec<u8> {
    let mut head = BeBuffer::new()
        .push(2u16)
        .push(0u16)
        .push(0x0003u16)
        .push(entries.len() as u16);
    for (_, x, y) in entries {
        head = head.push(*x).push(*y);
    }
    let glyphs: Vec<_> = entries.iter().map(|(gid, ..)| *gid).collect();
    assemble(&head, vec![(2, coverage(&glyphs))])
}

/// Pair positioning, format 1, from `(first, second, x_advance)` sorted by
/// first and then second glyph.
///
/// The adjustment applies to the first glyph; the second value format is
/// empty.
pub fn pair_pos_format1(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
    let mut firsts: Vec<u16> = pairs.iter().map(|(first, ..)| *first).collect();
    firsts.dedup();
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(X_ADVANCE)
        .push(0u16)
        .push(firsts.len() as u16)
        .extend(firsts.iter().map(|_| 0u16));
    let mut children = vec![(2, coverage(&firsts))];
    for (i, first) in firsts.iter().enumerate() {
        let records: Vec<_> = pairs.iter().filter(|(f, ..)| f == first).collect();
        let mut set = BeBuffer::new().push(records.len() as u16);
        for (_, second, x_advance) in records {
            set = set.push(*second).push(*x_advance);
        }
        children.push((10 + 2 * i, set.to_vec()));
    }
    assemble(&head, children)
}

/// Pair positioning, format 2: x advance adjustments of the first glyph in
/// a `class1_count` by `class2_count` matrix, row major.
pub fn pair_pos_format2(
    first_glyphs: &[u16],
    class_def1: &[(u16, u16)],
    class_def2: &[(u16, u16)],
    class2_count: u16,
    values: &[i16],
) -> Vec<u8> {
    let class1_count = values.len() as u16 / class2_count;
    let head = BeBuffer::new()
        .push(2u16)
        .push(0u16)
        .push(X_ADVANCE)
        .push(0u16)
        .push(0u16)
        .push(0u16)
        .push(class1_count)
        .push(class2_count)
        .extend(values.iter().copied());
    assemble(
        &head,
        vec![
            (2, coverage(first_glyphs)),
            (8, class_def(class_def1)),
            (10, class_def(class_def2)),
        ],
    )
}

/// An anchor, format 1.
pub fn anchor(x: i16, y: i16) -> Vec<u8> {
    BeBuffer::new().push(1u16).push(x).push(y).to_vec()
}

/// Cursive attachment from `(glyph, entry, exit)` entries sorted by glyph.
pub fn cursive_pos(entries: &[(u16, Option<(i16, i16)>, Option<(i16, i16)>)]) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(entries.len() as u16)
        .extend(entries.iter().flat_map(|_| [0u16, 0u16]));
    let glyphs: Vec<_> = entries.iter().map(|(gid, ..)| *gid).collect();
    let mut children = vec![(2, coverage(&glyphs))];
    for (i, (_, entry, exit)) in entries.iter().enumerate() {
        if let Some((x, y)) = entry {
            children.push((6 + 4 * i, anchor(*x, *y)));
        }
        if let Some((x, y)) = exit {
            children.push((8 + 4 * i, anchor(*x, *y)));
        }
    }
    assemble(&head, children)
}

/// A mark array from `(class, anchor)` records in coverage order.
fn mark_array(marks: &[(u16, u16, (i16, i16))]) -> Vec<u8> {
    let mut head = BeBuffer::new().push(marks.len() as u16);
    for (_, class, _) in marks {
        head = head.push(*class).push(0u16);
    }
    let children = marks
        .iter()
        .enumerate()
        .map(|(i, (_, _, (x, y)))| (4 + 4 * i, anchor(*x, *y)))
        .collect();
    assemble(&head, children)
}

/// An anchor matrix; each row has one optional anchor per mark class.
fn anchor_matrix(rows: &[Vec<Option<(i16, i16)>>]) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(rows.len() as u16)
        .extend(rows.iter().flatten().map(|_| 0u16));
    let children = rows
        .iter()
        .flatten()
        .enumerate()
        .filter_map(|(i, anchor_pos)| anchor_pos.map(|(x, y)| (2 + 2 * i, anchor(x, y))))
        .collect();
    assemble(&head, children)
}

// mark-to-base and mark-to-mark share a layout
fn mark_attach(
    marks: &[(u16, u16, (i16, i16))],
    targets: &[(u16, Vec<Option<(i16, i16)>>)],
    class_count: u16,
) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(0u16)
        .push(class_count)
        .push(0u16)
        .push(0u16);
    let mark_glyphs: Vec<_> = marks.iter().map(|(gid, ..)| *gid).collect();
    let target_glyphs: Vec<_> = targets.iter().map(|(gid, _)| *gid).collect();
    let rows: Vec<_> = targets.iter().map(|(_, row)| row.clone()).collect();
    assemble(
        &head,
        vec![
            (2, coverage(&mark_glyphs)),
            (4, coverage(&target_glyphs)),
            (8, mark_array(marks)),
            (10, anchor_matrix(&rows)),
        ],
    )
}

/// Mark-to-base attachment.
///
/// `marks` are `(glyph, class, anchor)` sorted by glyph; `bases` are
/// `(glyph, anchor per class)` sorted by glyph.
pub fn mark_base_pos(
    marks: &[(u16, u16, (i16, i16))],
    bases: &[(u16, Vec<Option<(i16, i16)>>)],
    class_count: u16,
) -> Vec<u8> {
    mark_attach(marks, bases, class_count)
}

/// Mark-to-mark attachment; `mark2s` are the marks being attached to.
pub fn mark_mark_pos(
    mark1s: &[(u16, u16, (i16, i16))],
    mark2s: &[(u16, Vec<Option<(i16, i16)>>)],
    class_count: u16,
) -> Vec<u8> {
    mark_attach(mark1s, mark2s, class_count)
}

/// Mark-to-ligature attachment.
///
/// Each ligature has one row of anchors (one per class) per component.
pub fn mark_lig_pos(
    marks: &[(u16, u16, (i16, i16))],
    ligatures: &[(u16, Vec<Vec<Option<(i16, i16)>>>)],
    class_count: u16,
) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(0u16)
        .push(class_count)
        .push(0u16)
        .push(0u16);
    let mark_glyphs: Vec<_> = marks.iter().map(|(gid, ..)| *gid).collect();
    let lig_glyphs: Vec<_> = ligatures.iter().map(|(gid, _)| *gid).collect();
    let array_head = BeBuffer::new()
        .push(ligatures.len() as u16)
        .extend(ligatures.iter().map(|_| 0u16));
    let ligature_array = assemble(
        &array_head,
        ligatures
            .iter()
            .enumerate()
            .map(|(i, (_, components))| (2 + 2 * i, anchor_matrix(components)))
            .collect(),
    );
    assemble(
        &head,
        vec![
            (2, coverage(&mark_glyphs)),
            (4, coverage(&lig_glyphs)),
            (8, mark_array(marks)),
            (10, ligature_array),
        ],
    )
}
