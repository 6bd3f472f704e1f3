use otl_test_data::gdef::{gdef, BASE, MARK};
use otl_test_data::gpos as test_data;
use otl_test_data::layout::{LayoutDef, LookupDef};

use super::*;
use crate::apply::{apply_lookup_to_buffer, ApplyContext, LookupSource};
use crate::buffer::AttachType;
use crate::plan::{LookupMap, ShapePlan, Stage};
use crate::sanitize::sanitize;
use crate::shape::substitute_start;
use crate::{shape, GlyphBuffer, GlyphPosition, LayoutFace};

fn gid(raw: u16) -> GlyphId {
    GlyphId::new(raw)
}

#[test]
fn singleposformat1() {
    // https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#example-2-singleposformat1-subtable
    let table = SinglePos::read(test_data::SINGLEPOSFORMAT1_TABLE.into()).unwrap();
    let SinglePos::Format1 { value_record, .. } = table else {
        panic!("expected format 1");
    };
    assert_eq!(value_record.format(), ValueFormat::Y_PLACEMENT);
    assert_eq!(value_record.y_placement(), Some(-80));
    assert_eq!(value_record.x_advance(), None);
    assert_eq!(table.coverage().iter().count(), 10);
    // every covered glyph shares the one record
    assert!(table.value_record(9).is_some());
}

#[test]
fn singleposformat2() {
    let bytes = test_data::single_pos_placements(&[(10, 5, -5), (12, 7, 0)]);
    let table = SinglePos::read(FontData::new(&bytes)).unwrap();
    let second = table.value_record(1).unwrap();
    assert_eq!(
        second.adjustment(0, 1000),
        Adjustment {
            x_placement: 7,
            ..Default::default()
        }
    );
    assert!(table.value_record(2).is_none());
}

#[test]
fn pairposformat1() {
    let bytes = test_data::pair_pos_format1(&[(10, 20, -30), (10, 22, -40), (11, 20, 15)]);
    let PairPos::Format1(table) = PairPos::read(FontData::new(&bytes)).unwrap() else {
        panic!("expected format 1");
    };
    assert_eq!(table.pair_set_count(), 2);
    let set = table.pair_set(0).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(
        set.second_glyphs().collect::<Vec<_>>(),
        [gid(20), gid(22)]
    );
    let (first, second) = set.find(gid(22)).unwrap();
    assert_eq!(first.x_advance(), Some(-40));
    assert!(second.is_empty());
    assert!(set.find(gid(21)).is_none());
}

#[test]
fn pairposformat2() {
    let bytes = test_data::pair_pos_format2(
        &[10, 11],
        &[(10, 1), (11, 1)],
        &[(20, 1), (21, 2)],
        3,
        &[0, 0, 0, 0, -50, -60],
    );
    let pair = PairPos::read(FontData::new(&bytes)).unwrap();
    let PairPos::Format2(table) = pair else {
        panic!("expected format 2");
    };
    assert_eq!(table.class1_count(), 2);
    assert_eq!(table.class2_count(), 3);
    let (first, _) = pair.adjustments(0, gid(10), gid(21)).unwrap();
    assert_eq!(first.x_advance(), Some(-60));
    // an unlisted second glyph is class 0
    let (first, _) = pair.adjustments(0, gid(10), gid(30)).unwrap();
    assert_eq!(first.x_advance(), Some(0));
    assert!(table.values(2, 0).is_none());
}

#[test]
fn cursive_anchors() {
    let bytes = test_data::cursive_pos(&[(5, None, Some((500, 0))), (6, Some((0, 0)), None)]);
    let table = CursivePosFormat1::read(FontData::new(&bytes)).unwrap();
    assert_eq!(table.entry_exit_records().len(), 2);
    assert!(table.entry_anchor(0).is_none());
    assert_eq!(table.exit_anchor(0).unwrap().position(0, 1000), (500, 0));
    assert_eq!(table.entry_anchor(1).unwrap().position(0, 1000), (0, 0));
    assert!(table.exit_anchor(1).is_none());
}

#[test]
fn mark_to_base_arrays() {
    let bytes = test_data::mark_base_pos(
        &[(50, 0, (100, 600)), (51, 1, (0, -20))],
        &[(5, vec![Some((250, 700)), None])],
        2,
    );
    let table = MarkBasePosFormat1::read(FontData::new(&bytes)).unwrap();
    assert_eq!(table.mark_class_count(), 2);
    let (class, anchor) = table.mark_array().get(1).unwrap();
    assert_eq!(class, 1);
    assert_eq!(anchor.position(0, 1000), (0, -20));
    let base = table.base_array();
    assert_eq!(base.rows(), 1);
    assert_eq!(base.get(0, 0).unwrap().position(0, 1000), (250, 700));
    assert!(base.get(0, 1).is_none());
    assert!(base.get(1, 0).is_none());
}

#[test]
fn mark_to_ligature_components() {
    let bytes = test_data::mark_lig_pos(
        &[(50, 0, (0, 0))],
        &[(
            7,
            vec![vec![Some((100, 500))], vec![None], vec![Some((900, 500))]],
        )],
        1,
    );
    let table = MarkLigPosFormat1::read(FontData::new(&bytes)).unwrap();
    let components = table.ligature_array().ligature_attach(0).unwrap();
    assert_eq!(components.rows(), 3);
    assert!(components.get(1, 0).is_none());
    assert_eq!(components.get(2, 0).unwrap().position(0, 1000), (900, 500));
}

#[test]
fn lookup_types_in_table() {
    let gpos = LayoutDef::new(
        &[(b"kern", &[0]), (b"mark", &[1])],
        vec![
            LookupDef::new(2, vec![test_data::pair_pos_format1(&[(1, 2, -10)])]),
            LookupDef::new(
                4,
                vec![test_data::mark_base_pos(
                    &[(9, 0, (0, 0))],
                    &[(1, vec![Some((0, 0))])],
                    1,
                )],
            ),
        ],
    )
    .build();
    let gpos: Gpos = sanitize(FontData::new(&gpos));
    assert_eq!(gpos.lookup_count(), 2);
    assert!(matches!(
        gpos.lookup(0).unwrap().subtables(),
        [PositionSubtable::Pair(_)]
    ));
    let mark = gpos.lookup(1).unwrap();
    assert!(matches!(mark.subtables(), [PositionSubtable::MarkToBase(_)]));
    // digests are keyed on the mark, not the base
    assert!(mark.digest().may_have(gid(9)));
}

#[test]
fn bad_anchor_offset_drops_subtable() {
    let mut bytes = test_data::cursive_pos(&[(5, Some((0, 0)), None)]);
    // point the entry anchor past the end
    bytes[6..8].copy_from_slice(&0x7FFFu16.to_be_bytes());
    let gpos = LayoutDef::single_lookup(LookupDef::new(3, vec![bytes])).build();
    let gpos: Gpos = sanitize(FontData::new(&gpos));
    let lookup = gpos.lookup(0).unwrap();
    assert!(lookup.subtables().is_empty());
    assert_eq!(lookup.declared_subtable_count(), 1);
}

// a base with one mark, and a second mark stacked on the first
fn stacked_marks_tables() -> (Vec<u8>, Vec<u8>) {
    let gdef = gdef(&[(5, BASE), (50, MARK), (51, MARK)], &[]);
    let gpos = LayoutDef::new(
        &[(b"mark", &[0]), (b"mkmk", &[1])],
        vec![
            LookupDef::new(
                4,
                vec![test_data::mark_base_pos(
                    &[(50, 0, (100, 600))],
                    &[(5, vec![Some((250, 700))])],
                    1,
                )],
            ),
            LookupDef::new(
                6,
                vec![test_data::mark_mark_pos(
                    &[(51, 0, (100, 0))],
                    &[(50, vec![Some((120, 900))])],
                    1,
                )],
            ),
        ],
    )
    .build();
    (gdef, gpos)
}

/// Apply the mark-to-mark lookup to base, mark, mark with the given
/// ligature (id, component) of both marks; returns the second mark's position.
fn stack_marks(lig_props: [(u8, u8); 2]) -> GlyphPosition {
    let (gdef, gpos) = stacked_marks_tables();
    let face = LayoutFace::from_tables(Some(gdef.as_slice()), None, Some(gpos.as_slice()));
    let lookups = face.gpos().lookup_list();
    let mut buffer = GlyphBuffer::new();
    for (cluster, glyph) in [5, 50, 51].into_iter().enumerate() {
        buffer.push(gid(glyph), cluster as u32);
    }
    buffer.reset_masks(1);
    substitute_start(&face, &mut buffer);
    for (info, (lig_id, lig_comp)) in buffer.glyph_infos_mut()[1..].iter_mut().zip(lig_props) {
        info.set_lig_props_for_mark(lig_id, lig_comp);
    }

    let mut ctx = ApplyContext::new(LookupSource::Gpos(lookups), face.gdef(), &mut buffer);
    apply_lookup_to_buffer(&mut ctx, lookups.get(1).unwrap(), false);
    buffer.glyph_positions()[2]
}

#[test]
fn mark_to_mark_records_attachment() {
    let pos = stack_marks([(0, 0), (0, 0)]);
    assert_eq!((pos.x_offset, pos.y_offset), (20, 900));
    assert_eq!(pos.attach_type, AttachType::Mark);
    assert_eq!(pos.attach_chain, -1);
}

#[test]
fn mark_to_mark_needs_matching_ligature_component() {
    // same ligature, same component
    assert!(stack_marks([(1, 2), (1, 2)]).has_pending_attachment());
    // same ligature, different components
    let pos = stack_marks([(1, 1), (1, 2)]);
    assert!(!pos.has_pending_attachment());
    assert_eq!(pos.attach_type, AttachType::None);
    // the first mark belongs to a ligature component, the second does not
    assert!(!stack_marks([(1, 1), (0, 0)]).has_pending_attachment());
}

#[test]
fn mark_to_mark_resolves_through_the_first_mark() {
    let (gdef, gpos) = stacked_marks_tables();
    let face = LayoutFace::from_tables(Some(gdef.as_slice()), None, Some(gpos.as_slice()));
    let stage = |index| Stage::new(vec![LookupMap::new(index)]);
    let plan = ShapePlan::from_stages(vec![], vec![stage(0), stage(1)]);

    let mut buffer = GlyphBuffer::new();
    for (cluster, (glyph, advance)) in [(5, 600), (50, 0), (51, 0)].into_iter().enumerate() {
        buffer.push(gid(glyph), cluster as u32);
        buffer.glyph_positions_mut()[cluster].x_advance = advance;
    }
    plan.setup_masks(&mut buffer);
    shape(&face, &plan, &mut buffer).unwrap();

    let offsets: Vec<_> = buffer
        .glyph_positions()
        .iter()
        .map(|pos| (pos.x_offset, pos.y_offset))
        .collect();
    // the first mark sits at (150, 100) from the base, the second at
    // (20, 900) from the first
    assert_eq!(offsets, [(0, 0), (150 - 600, 100), (150 - 600 + 20, 1000)]);
}
