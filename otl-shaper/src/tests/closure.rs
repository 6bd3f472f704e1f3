use otl_test_data::gpos as gpos_data;
use otl_test_data::gsub as gsub_data;
use otl_test_data::layout::{LayoutDef, LookupDef};
use pretty_assertions::assert_eq;

use super::*;
use crate::sanitize::sanitize;
use crate::FontData;

fn glyph_set(raw: &[u16]) -> IntSet<GlyphId> {
    raw.iter().copied().map(GlyphId::new).collect()
}

fn raw(set: &IntSet<GlyphId>) -> Vec<u16> {
    set.iter().map(GlyphId::to_u16).collect()
}

fn gsub_bytes(lookups: Vec<LookupDef>) -> Vec<u8> {
    let indices: Vec<u16> = (0..lookups.len() as u16).collect();
    LayoutDef::new(&[(b"test", indices.as_slice())], lookups).build()
}

fn single(from: u16, to: u16) -> LookupDef {
    LookupDef::new(1, vec![gsub_data::single_subst_format2(&[(from, to)])])
}

fn close(bytes: &[u8], lookups: &[u16], glyphs: &[u16]) -> Vec<u16> {
    let gsub: Gsub = sanitize(FontData::new(bytes));
    let lookups: IntSet<u16> = lookups.iter().copied().collect();
    let mut glyphs = glyph_set(glyphs);
    gsub.closure_glyphs(&lookups, &mut glyphs);
    raw(&glyphs)
}

#[test]
fn closure_follows_chained_singles() {
    // the second lookup only fires on the output of the first
    let bytes = gsub_bytes(vec![single(6, 7), single(5, 6)]);
    assert_eq!(close(&bytes, &[0, 1], &[5]), [5, 6, 7]);
    assert_eq!(close(&bytes, &[0], &[5]), [5]);
}

#[test]
fn closure_multiple_and_alternate() {
    let bytes = gsub_bytes(vec![
        LookupDef::new(2, vec![gsub_data::multiple_subst(&[(10, &[11, 12])])]),
        LookupDef::new(3, vec![gsub_data::alternate_subst(&[(11, &[30, 31])])]),
    ]);
    assert_eq!(close(&bytes, &[0, 1], &[10]), [10, 11, 12, 30, 31]);
}

#[test]
fn ligature_needs_every_component() {
    let bytes = gsub_bytes(vec![LookupDef::new(
        4,
        vec![gsub_data::ligature_subst(&[(&[1, 2], 50), (&[1, 3], 51)])],
    )]);
    assert_eq!(close(&bytes, &[0], &[1]), [1]);
    assert_eq!(close(&bytes, &[0], &[1, 2]), [1, 2, 50]);
    assert_eq!(close(&bytes, &[0], &[1, 2, 3]), [1, 2, 3, 50, 51]);
}

#[test]
fn context_recurses_only_when_input_is_reachable() {
    let bytes = gsub_bytes(vec![
        LookupDef::new(5, vec![gsub_data::context_format3(&[&[3], &[4]], &[(1, 1)])]),
        single(4, 40),
    ]);
    assert_eq!(close(&bytes, &[0], &[4]), [4]);
    assert_eq!(close(&bytes, &[0], &[3, 4]), [3, 4, 40]);
}

#[test]
fn chain_context_checks_backtrack() {
    let bytes = gsub_bytes(vec![
        LookupDef::new(
            6,
            vec![gsub_data::chain_context_format3(&[&[1]], &[&[2]], &[], &[(0, 1)])],
        ),
        single(2, 20),
    ]);
    assert_eq!(close(&bytes, &[0], &[2]), [2]);
    assert_eq!(close(&bytes, &[0], &[1, 2]), [1, 2, 20]);
}

#[test]
fn self_recursive_context_terminates() {
    let bytes = gsub_bytes(vec![LookupDef::new(
        5,
        vec![gsub_data::context_format1(&[(&[3, 3], &[(0, 0), (1, 0)])])],
    )]);
    assert_eq!(close(&bytes, &[0], &[3]), [3]);
}

#[test]
fn reverse_chain_substitutes_with_context() {
    let bytes = gsub_bytes(vec![LookupDef::new(
        8,
        vec![gsub_data::reverse_chain_single_subst(&[(5, 55)], &[], &[&[9]])],
    )]);
    assert_eq!(close(&bytes, &[0], &[5]), [5]);
    assert_eq!(close(&bytes, &[0], &[5, 9]), [5, 9, 55]);
}

#[test]
fn missing_lookups_are_ignored() {
    let bytes = gsub_bytes(vec![single(1, 2)]);
    assert_eq!(close(&bytes, &[0, 7], &[1]), [1, 2]);
}

#[test]
fn collect_chain_context_sets() {
    let bytes = gsub_bytes(vec![
        LookupDef::new(
            6,
            vec![gsub_data::chain_context_format3(
                &[&[1]],
                &[&[2], &[4]],
                &[&[3]],
                &[(0, 1)],
            )],
        ),
        single(2, 20),
    ]);
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    let sets = gsub.collect_glyphs(0);
    assert_eq!(raw(&sets.before), [1]);
    assert_eq!(raw(&sets.input), [2, 4]);
    assert_eq!(raw(&sets.after), [3]);
    // the nested lookup contributes its output but not its input
    assert_eq!(raw(&sets.output), [20]);
}

#[test]
fn collect_ligature_sets() {
    let bytes = gsub_bytes(vec![LookupDef::new(
        4,
        vec![gsub_data::ligature_subst(&[(&[1, 2, 3], 50)])],
    )]);
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    let sets = gsub.collect_glyphs(0);
    assert_eq!(
        sets,
        GlyphSets {
            input: glyph_set(&[1, 2, 3]),
            output: glyph_set(&[50]),
            ..Default::default()
        }
    );
    assert_eq!(gsub.collect_glyphs(9), GlyphSets::default());
}

#[test]
fn collect_gpos_has_no_output() {
    let bytes = LayoutDef::new(
        &[(b"kern", &[0])],
        vec![LookupDef::new(
            2,
            vec![gpos_data::pair_pos_format1(&[(10, 20, -5), (10, 21, -6)])],
        )],
    )
    .build();
    let gpos: Gpos = sanitize(FontData::new(&bytes));
    let sets = gpos.collect_glyphs(0);
    assert_eq!(raw(&sets.input), [10, 20, 21]);
    assert!(sets.output.is_empty());
}
