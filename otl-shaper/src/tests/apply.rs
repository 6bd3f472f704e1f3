use otl_test_data::bebuffer::BeBuffer;
use otl_test_data::gdef::{self as gdef_data, BASE, LIGATURE, MARK};
use otl_test_data::gpos as gpos_data;
use otl_test_data::gsub as gsub_data;
use otl_test_data::layout::{assemble, coverage, extension, LayoutDef, LookupDef};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::plan::{LookupMap, ShapePlan, Stage};
use crate::sanitize::sanitize;
use crate::shape::substitute_start;
use crate::tables::gsub::Gsub;
use crate::tables::layout::LookupFlag;
use crate::{
    shape, Direction, FeatureFlags, FontData, GlyphBuffer, LayoutFace, PlanBuilder, ShapeConfig,
    ShapeError,
};
use otl_types::Tag;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn gid(raw: u16) -> GlyphId {
    GlyphId::new(raw)
}

fn buffer_of(glyphs: &[u16]) -> GlyphBuffer {
    let mut buffer = GlyphBuffer::new();
    for (cluster, glyph) in glyphs.iter().enumerate() {
        buffer.push(gid(*glyph), cluster as u32);
    }
    buffer
}

fn ids(buffer: &GlyphBuffer) -> Vec<u16> {
    buffer.glyph_ids().map(GlyphId::to_u16).collect()
}

fn clusters(buffer: &GlyphBuffer) -> Vec<u32> {
    buffer.glyph_infos().iter().map(|info| info.cluster).collect()
}

/// A GSUB or GPOS table with every lookup under one feature.
fn table(lookups: Vec<LookupDef>) -> Vec<u8> {
    let indices: Vec<u16> = (0..lookups.len() as u16).collect();
    LayoutDef::new(&[(b"test", indices.as_slice())], lookups).build()
}

/// A plan applying each listed lookup in its own stage.
fn plan(gsub: &[u16], gpos: &[u16]) -> ShapePlan {
    let stages = |lookups: &[u16]| -> Vec<Stage> {
        lookups
            .iter()
            .map(|index| Stage::new(vec![LookupMap::new(*index)]))
            .collect()
    };
    ShapePlan::from_stages(stages(gsub), stages(gpos))
}

fn run_with_advances(
    face: &LayoutFace,
    plan: &ShapePlan,
    glyphs: &[u16],
    advances: &[i32],
) -> GlyphBuffer {
    init_logging();
    let mut buffer = buffer_of(glyphs);
    for (pos, advance) in buffer.glyph_positions_mut().iter_mut().zip(advances) {
        pos.x_advance = *advance;
    }
    plan.setup_masks(&mut buffer);
    shape(face, plan, &mut buffer).unwrap();
    buffer
}

fn run(face: &LayoutFace, plan: &ShapePlan, glyphs: &[u16]) -> GlyphBuffer {
    run_with_advances(face, plan, glyphs, &[])
}

fn single(from: u16, to: u16) -> LookupDef {
    LookupDef::new(1, vec![gsub_data::single_subst_format2(&[(from, to)])])
}

#[test]
fn single_substitution_pass() {
    let gsub = table(vec![single(5, 9)]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let lookups = face.gsub().lookup_list();
    let lookup = lookups.get(0).unwrap();

    let mut buffer = buffer_of(&[5, 5, 7]);
    buffer.reset_masks(1);
    buffer.enter(64, 1024);
    let mut ctx = ApplyContext::new(LookupSource::Gsub(lookups), face.gdef(), &mut buffer);
    ctx.lookup_props = lookup.props();
    ctx.buffer.clear_output();
    assert!(apply_forward(&mut ctx, lookup));
    assert_eq!(ctx.buffer.idx, 3);
    ctx.buffer.sync();

    assert_eq!(ids(&buffer), [9, 9, 7]);
    assert_eq!(clusters(&buffer), [0, 1, 2]);
}

#[test]
fn masked_out_lookup_does_nothing() {
    let gsub = table(vec![single(5, 9)]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let lookups = face.gsub().lookup_list();
    let mut buffer = buffer_of(&[5]);
    buffer.reset_masks(1);
    let mut ctx = ApplyContext::new(LookupSource::Gsub(lookups), face.gdef(), &mut buffer);
    ctx.lookup_mask = 0;
    assert!(!apply_lookup_to_buffer(&mut ctx, lookups.get(0).unwrap(), false));
    assert_eq!(ids(&buffer), [5]);
}

#[test]
fn ligature_merges_clusters() {
    let gsub = table(vec![LookupDef::new(
        4,
        vec![gsub_data::ligature_subst(&[(&[1, 2], 200)])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let plan = plan(&[0], &[]);

    let buffer = run(&face, &plan, &[1, 2, 3]);
    assert_eq!(ids(&buffer), [200, 3]);
    assert_eq!(clusters(&buffer), [0, 2]);
    let infos = buffer.glyph_infos();
    assert!(infos[0].is_ligated());
    assert_eq!(infos[0].lig_num_comps(), 2);
    assert_eq!(infos[1].lig_id(), 0);

    // the ligature glyph is not itself a component
    let again = run(&face, &plan, &[200]);
    assert_eq!(ids(&again), [200]);
}

// a pair adjustment with both value formats set, so the second glyph is consumed
fn pair_adjusting_both(first: u16, second: u16, x_advance: i16) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(gpos_data::X_ADVANCE)
        .push(gpos_data::X_ADVANCE)
        .push(1u16)
        .push(0u16);
    let set = BeBuffer::new()
        .push(1u16)
        .push(second)
        .push(x_advance)
        .push(0i16)
        .to_vec();
    assemble(&head, vec![(2, coverage(&[first])), (10, set)])
}

fn pair_cursor_after(subtable: Vec<u8>) -> (usize, i32) {
    let gpos = LayoutDef::single_lookup(LookupDef::new(2, vec![subtable])).build();
    let face = LayoutFace::from_tables(None, None, Some(gpos.as_slice()));
    let lookups = face.gpos().lookup_list();
    let lookup = lookups.get(0).unwrap();

    let mut buffer = buffer_of(&[10, 20]);
    buffer.reset_masks(1);
    buffer.glyph_positions_mut()[0].x_advance = 500;
    let mut ctx = ApplyContext::new(LookupSource::Gpos(lookups), face.gdef(), &mut buffer);
    ctx.lookup_props = lookup.props();
    ctx.buffer.idx = 0;
    assert!(lookup.subtables()[0].apply(&mut ctx).is_some());
    let idx = ctx.buffer.idx;
    (idx, buffer.glyph_positions()[0].x_advance)
}

#[test]
fn pair_consumes_second_glyph_only_when_adjusted() {
    assert_eq!(pair_cursor_after(pair_adjusting_both(10, 20, 50)), (2, 550));
    assert_eq!(
        pair_cursor_after(gpos_data::pair_pos_format1(&[(10, 20, 50)])),
        (1, 550)
    );
}

#[test]
fn malformed_subtable_is_skipped() {
    let mut broken = gsub_data::single_subst_format2(&[(5, 9)]);
    broken[2..4].copy_from_slice(&0x7FFFu16.to_be_bytes());
    let gsub = table(vec![LookupDef::new(
        1,
        vec![broken, gsub_data::single_subst_format2(&[(5, 8)])],
    )]);
    let gsub_table: Gsub = sanitize(FontData::new(&gsub));
    let lookup = gsub_table.lookup(0).unwrap();
    assert_eq!(lookup.subtables().len(), 1);
    assert_eq!(lookup.declared_subtable_count(), 2);

    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    assert_eq!(ids(&run(&face, &plan(&[0], &[]), &[5])), [8]);
}

#[test]
fn would_apply_agrees_with_apply() {
    let gsub = table(vec![
        LookupDef::new(
            6,
            vec![gsub_data::chain_context_format3(&[&[1]], &[&[2]], &[&[3]], &[(0, 1)])],
        ),
        single(2, 20),
    ]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let plan = plan(&[0], &[]);
    for x in 1..=4 {
        for y in 1..=4 {
            for z in 1..=4 {
                let (back, input, ahead) = ([gid(x)], [gid(y)], [gid(z)]);
                let query = WouldApplyContext::new(&input, true).with_context(&back, &ahead);
                let would = face.would_substitute_in_context(0, &query);
                let applied = ids(&run(&face, &plan, &[x, y, z]))[1] == 20;
                assert_eq!(would, applied, "[{x}, {y}, {z}]");
            }
        }
    }
    // without context, only a zero-context query refuses the rule
    assert!(!face.would_substitute(0, &[gid(2)], true));
    assert!(face.would_substitute(0, &[gid(2)], false));
}

#[test]
fn self_recursive_context_terminates() {
    let gsub = table(vec![LookupDef::new(
        5,
        vec![gsub_data::context_format1(&[(&[3, 3], &[(0, 0), (1, 0)])])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let plan = plan(&[0], &[]);
    let mut buffer = buffer_of(&[3, 3, 3, 3]);
    plan.setup_masks(&mut buffer);
    assert!(shape(&face, &plan, &mut buffer).is_ok());
    assert_eq!(ids(&buffer), [3, 3, 3, 3]);
}

#[test]
fn deleting_the_first_glyph_merges_its_cluster() {
    let gsub = table(vec![LookupDef::new(
        2,
        vec![gsub_data::multiple_subst(&[(10, &[])])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let buffer = run(&face, &plan(&[0], &[]), &[10, 2]);
    assert_eq!(ids(&buffer), [2]);
    assert_eq!(clusters(&buffer), [0]);
}

#[test]
fn deleting_lowers_trailing_output_clusters() {
    let gsub = table(vec![LookupDef::new(
        2,
        vec![gsub_data::multiple_subst(&[(10, &[])])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let plan = plan(&[0], &[]);
    let mut buffer = GlyphBuffer::new();
    buffer.push(gid(3), 5);
    buffer.push(gid(4), 5);
    buffer.push(gid(10), 1);
    plan.setup_masks(&mut buffer);
    shape(&face, &plan, &mut buffer).unwrap();
    assert_eq!(ids(&buffer), [3, 4]);
    assert_eq!(clusters(&buffer), [1, 1]);
}

#[test]
fn multiple_substitution_outputs_components() {
    let gsub = table(vec![LookupDef::new(
        2,
        vec![gsub_data::multiple_subst(&[(10, &[11, 12, 13]), (20, &[21])])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let buffer = run(&face, &plan(&[0], &[]), &[10, 20]);
    assert_eq!(ids(&buffer), [11, 12, 13, 21]);
    assert_eq!(clusters(&buffer), [0, 0, 0, 1]);
    let infos = buffer.glyph_infos();
    assert!(infos[..3].iter().all(|info| info.is_multiplied()));
    // a one-glyph sequence is a plain substitution
    assert!(!infos[3].is_multiplied());
    assert!(infos[3].is_substituted());
}

#[test]
fn cursive_chain_accumulates_offsets() {
    let entry_exit = Some((0, 0));
    let exit = Some((500, 100));
    let gpos = table(vec![LookupDef::new(
        3,
        vec![gpos_data::cursive_pos(&[
            (5, entry_exit, exit),
            (6, entry_exit, exit),
            (7, entry_exit, exit),
        ])],
    )]);
    let face = LayoutFace::from_tables(None, None, Some(gpos.as_slice()));
    let buffer = run_with_advances(&face, &plan(&[], &[0]), &[5, 6, 7], &[600, 600, 600]);
    let positions = buffer.glyph_positions();
    assert_eq!(
        positions.iter().map(|pos| pos.x_advance).collect::<Vec<_>>(),
        [500, 500, 600]
    );
    assert_eq!(
        positions.iter().map(|pos| pos.y_offset).collect::<Vec<_>>(),
        [0, 100, 200]
    );
    assert!(positions.iter().all(|pos| !pos.has_pending_attachment()));
}

fn mark_to_base_face_data() -> (Vec<u8>, Vec<u8>) {
    let gdef = gdef_data::gdef(&[(5, BASE), (50, MARK)], &[]);
    let gpos = table(vec![
        LookupDef::new(1, vec![gpos_data::single_pos_x_advance(&[5], 100)]),
        LookupDef::new(
            4,
            vec![gpos_data::mark_base_pos(
                &[(50, 0, (100, 600))],
                &[(5, vec![Some((250, 700))])],
                1,
            )],
        ),
    ]);
    (gdef, gpos)
}

// the mark offset recorded by the lookup, before attachments are resolved
fn recorded_mark_offset(base_advance: i32) -> (i32, i32) {
    let (gdef, gpos) = mark_to_base_face_data();
    let face = LayoutFace::from_tables(Some(gdef.as_slice()), None, Some(gpos.as_slice()));
    let lookups = face.gpos().lookup_list();
    let mut buffer = buffer_of(&[5, 50]);
    buffer.reset_masks(1);
    buffer.glyph_positions_mut()[0].x_advance = base_advance;
    substitute_start(&face, &mut buffer);

    let mut ctx = ApplyContext::new(LookupSource::Gpos(lookups), face.gdef(), &mut buffer);
    assert!(apply_lookup_to_buffer(&mut ctx, lookups.get(1).unwrap(), false));
    let pos = buffer.glyph_positions()[1];
    assert!(pos.has_pending_attachment());
    (pos.x_offset, pos.y_offset)
}

#[test]
fn mark_to_base_offset_is_anchor_difference() {
    assert_eq!(recorded_mark_offset(600), (150, 100));
    assert_eq!(recorded_mark_offset(900), (150, 100));
}

#[test]
fn mark_to_base_resolves_against_base_advance() {
    let (gdef, gpos) = mark_to_base_face_data();
    let face = LayoutFace::from_tables(Some(gdef.as_slice()), None, Some(gpos.as_slice()));

    let buffer = run_with_advances(&face, &plan(&[], &[1]), &[5, 50], &[600, 0]);
    let mark = buffer.glyph_positions()[1];
    assert_eq!((mark.x_offset, mark.y_offset), (150 - 600, 100));
    assert!(!mark.has_pending_attachment());

    // a kerned base moves the mark's origin further away
    let buffer = run_with_advances(&face, &plan(&[], &[0, 1]), &[5, 50], &[600, 0]);
    let positions = buffer.glyph_positions();
    assert_eq!(positions[0].x_advance, 700);
    assert_eq!(positions[1].x_offset, 150 - 700);
}

#[test]
fn mark_inside_ligature_attaches_to_its_component() {
    let gdef = gdef_data::gdef(&[(1, BASE), (2, BASE), (50, MARK), (200, LIGATURE)], &[]);
    let gsub = table(vec![LookupDef::new(
        4,
        vec![gsub_data::ligature_subst(&[(&[1, 2], 200)])],
    )
    .with_flag(LookupFlag::IGNORE_MARKS.to_bits())]);
    let gpos = table(vec![LookupDef::new(
        5,
        vec![gpos_data::mark_lig_pos(
            &[(50, 0, (0, 0))],
            &[(200, vec![vec![Some((100, 500))], vec![Some((400, 500))]])],
            1,
        )],
    )]);
    let face = LayoutFace::from_tables(
        Some(gdef.as_slice()),
        Some(gsub.as_slice()),
        Some(gpos.as_slice()),
    );

    let buffer = run_with_advances(&face, &plan(&[0], &[0]), &[1, 50, 2], &[800, 0, 500]);
    assert_eq!(ids(&buffer), [200, 50]);
    let infos = buffer.glyph_infos();
    assert_eq!(infos[1].lig_id(), infos[0].lig_id());
    assert_eq!(infos[1].lig_comp(), 1);
    let mark = buffer.glyph_positions()[1];
    assert_eq!((mark.x_offset, mark.y_offset), (100 - 800, 500));

    // a mark after the ligature goes on the last component
    let buffer = run_with_advances(&face, &plan(&[], &[0]), &[200, 50], &[800, 0]);
    let mark = buffer.glyph_positions()[1];
    assert_eq!((mark.x_offset, mark.y_offset), (400 - 800, 500));
}

fn alternate_face_data() -> Vec<u8> {
    LayoutDef::new(
        &[(b"salt", &[0])],
        vec![LookupDef::new(
            3,
            vec![gsub_data::ALTERNATESUBSTFORMAT1_TABLE.to_vec()],
        )],
    )
    .build()
}

#[test]
fn feature_value_selects_alternate() {
    let gsub = alternate_face_data();
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let salt = Tag::new(b"salt");

    for (value, expected) in [(0, 58), (1, 201), (2, 202), (3, 58)] {
        let mut builder = PlanBuilder::new(&face, None, None, Direction::LeftToRight);
        builder.enable_feature(salt, FeatureFlags::empty(), value);
        let plan = builder.build();
        assert_eq!(ids(&run(&face, &plan, &[58])), [expected], "salt={value}");
    }
}

#[test]
fn range_feature_applies_to_its_clusters() {
    let gsub = alternate_face_data();
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let mut builder = PlanBuilder::new(&face, None, None, Direction::LeftToRight);
    builder.add_feature_range(Tag::new(b"salt"), 1, 1..2);
    let plan = builder.build();
    assert_eq!(ids(&run(&face, &plan, &[58, 58, 58])), [58, 201, 58]);
}

#[test]
fn operation_budget_stops_shaping() {
    let gsub = table(vec![single(5, 9)]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let config = ShapeConfig {
        max_ops_min: 2,
        max_ops_factor: 0,
        ..Default::default()
    };
    let plan = plan(&[0], &[]).with_config(config);
    let mut buffer = buffer_of(&[5, 5, 5]);
    plan.setup_masks(&mut buffer);
    assert_eq!(
        shape(&face, &plan, &mut buffer),
        Err(ShapeError::OperationBudgetExhausted)
    );
    assert_eq!(ids(&buffer), [9, 9, 5]);
    assert_eq!(buffer.glyph_positions().len(), 3);
}

#[test]
fn length_limit_discards_the_pass() {
    let gsub = table(vec![LookupDef::new(
        2,
        vec![gsub_data::multiple_subst(&[(5, &[6, 6])])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let config = ShapeConfig {
        max_len_min: 4,
        max_len_factor: 1,
        ..Default::default()
    };
    let plan = plan(&[0], &[]).with_config(config);
    let mut buffer = buffer_of(&[5, 5, 5]);
    plan.setup_masks(&mut buffer);
    assert_eq!(
        shape(&face, &plan, &mut buffer),
        Err(ShapeError::BufferTooLong(4))
    );
    assert_eq!(ids(&buffer), [5, 5, 5]);
}

#[test]
fn digest_has_no_false_negatives() {
    let mut rng = StdRng::seed_from_u64(0x0715);
    for _ in 0..20 {
        let count = rng.gen_range(1..200);
        let mut glyphs: Vec<u16> = (0..count).map(|_| rng.gen_range(0..5000)).collect();
        glyphs.sort_unstable();
        glyphs.dedup();

        let bytes = table(vec![LookupDef::new(
            1,
            vec![gsub_data::single_subst_format1(&glyphs, 1)],
        )]);
        let gsub: Gsub = sanitize(FontData::new(&bytes));
        let digest = gsub.lookup(0).unwrap().digest();
        for glyph in &glyphs {
            assert!(digest.may_have(gid(*glyph)), "glyph {glyph}");
        }
    }
}

#[test]
fn truncated_tables_never_panic() {
    init_logging();
    let bytes = table(vec![
        LookupDef::new(
            6,
            vec![gsub_data::chain_context_format3(&[&[1]], &[&[2]], &[&[3]], &[(0, 1)])],
        ),
        single(2, 20),
        LookupDef::new(4, vec![gsub_data::ligature_subst(&[(&[1, 2], 200)])]),
    ]);
    let full: Gsub = sanitize(FontData::new(&bytes));
    assert_eq!(full.lookup_count(), 3);
    let plan = plan(&[0, 1, 2], &[]);

    for len in 0..bytes.len() {
        let prefix = &bytes[..len];
        let gsub: Gsub = sanitize(FontData::new(prefix));
        assert!(gsub.lookup_count() <= full.lookup_count());
        if len < 10 {
            assert_eq!(gsub.lookup_count(), 0);
        }
        let face = LayoutFace::from_tables(None, Some(prefix), None);
        let mut buffer = buffer_of(&[1, 2, 3]);
        plan.setup_masks(&mut buffer);
        assert!(shape(&face, &plan, &mut buffer).is_ok());
    }
}

#[test]
fn reverse_chain_scans_right_to_left() {
    let gsub = table(vec![LookupDef::new(
        8,
        vec![gsub_data::reverse_chain_single_subst(&[(1, 2)], &[], &[&[2]])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let plan = plan(&[0], &[]);
    // each substitution becomes the lookahead of the glyph before it
    assert_eq!(ids(&run(&face, &plan, &[1, 1, 1, 2])), [2, 2, 2, 2]);
    assert_eq!(ids(&run(&face, &plan, &[1, 1, 3])), [1, 1, 3]);
}

#[test]
fn reverse_chain_substitutes_in_place() {
    let gsub = table(vec![LookupDef::new(
        8,
        vec![gsub_data::reverse_chain_single_subst(&[(1, 2)], &[&[7]], &[])],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let lookups = face.gsub().lookup_list();
    let lookup = lookups.get(0).unwrap();

    let mut buffer = buffer_of(&[7, 1, 1]);
    buffer.reset_masks(1);
    let mut ctx = ApplyContext::new(LookupSource::Gsub(lookups), face.gdef(), &mut buffer);
    ctx.lookup_props = lookup.props();
    ctx.buffer.idx = 1;
    assert!(lookup.apply(&mut ctx).is_some());
    assert_eq!(ctx.buffer.idx, 1);
    assert!(!ctx.buffer.have_output);
    // the backtrack of the last glyph is now the substitute
    ctx.buffer.idx = 2;
    assert!(lookup.apply(&mut ctx).is_none());
    assert_eq!(ids(&buffer), [7, 2, 1]);
}

#[test]
fn reverse_chain_is_not_applied_as_a_nested_lookup() {
    let gsub = table(vec![
        LookupDef::new(5, vec![gsub_data::context_format1(&[(&[1], &[(0, 1)])])]),
        LookupDef::new(
            8,
            vec![gsub_data::reverse_chain_single_subst(&[(1, 2)], &[], &[])],
        ),
    ]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    assert_eq!(ids(&run(&face, &plan(&[0], &[]), &[1, 1])), [1, 1]);
    assert_eq!(ids(&run(&face, &plan(&[1], &[]), &[1, 1])), [2, 2]);
}

fn skip_gdef() -> Vec<u8> {
    gdef_data::gdef(
        &[
            (1, BASE),
            (2, BASE),
            (7, BASE),
            (50, MARK),
            (51, MARK),
            (200, LIGATURE),
        ],
        &[(50, 1), (51, 2)],
    )
}

fn ligature_of_1_2() -> LookupDef {
    LookupDef::new(4, vec![gsub_data::ligature_subst(&[(&[1, 2], 200)])])
}

fn ligate(gdef: &[u8], lookup: LookupDef, glyphs: &[u16]) -> Vec<u16> {
    let gsub = table(vec![lookup]);
    let face = LayoutFace::from_tables(Some(gdef), Some(gsub.as_slice()), None);
    ids(&run(&face, &plan(&[0], &[]), glyphs))
}

// replace `second` with 99 when it follows `first`
fn substitute_in_context(
    gdef: &[u8],
    flag: LookupFlag,
    (first, second): (u16, u16),
    glyphs: &[u16],
) -> Vec<u16> {
    let gsub = table(vec![
        LookupDef::new(
            5,
            vec![gsub_data::context_format3(&[&[first], &[second]], &[(1, 1)])],
        )
        .with_flag(flag.to_bits()),
        single(second, 99),
    ]);
    let face = LayoutFace::from_tables(Some(gdef), Some(gsub.as_slice()), None);
    ids(&run(&face, &plan(&[0], &[]), glyphs))
}

#[test]
fn ignore_marks_lets_a_ligature_span_a_mark() {
    let gdef = skip_gdef();
    assert_eq!(ligate(&gdef, ligature_of_1_2(), &[1, 50, 2]), [1, 50, 2]);
    let lookup = ligature_of_1_2().with_flag(LookupFlag::IGNORE_MARKS.to_bits());
    assert_eq!(ligate(&gdef, lookup, &[1, 50, 2]), [200, 50]);
}

#[test]
fn mark_filtering_set_skips_marks_outside_the_set() {
    let gdef = gdef_data::gdef_with_mark_sets(
        &[(1, BASE), (2, BASE), (50, MARK), (51, MARK)],
        &[&[50]],
    );
    let lookup = || ligature_of_1_2().with_mark_filtering_set(0);
    assert_eq!(ligate(&gdef, lookup(), &[1, 51, 2]), [200, 51]);
    // a mark in the set takes part in matching, and 1 50 2 is no ligature
    assert_eq!(ligate(&gdef, lookup(), &[1, 50, 2]), [1, 50, 2]);
}

#[test]
fn mark_attachment_type_skips_other_classes() {
    let gdef = skip_gdef();
    let lookup = || ligature_of_1_2().with_flag(0x0100);
    assert_eq!(ligate(&gdef, lookup(), &[1, 51, 2]), [200, 51]);
    assert_eq!(ligate(&gdef, lookup(), &[1, 50, 2]), [1, 50, 2]);
}

#[test]
fn context_input_skips_ignored_glyphs() {
    let gdef = skip_gdef();
    let pair = (1, 2);
    assert_eq!(
        substitute_in_context(&gdef, LookupFlag::empty(), pair, &[1, 50, 2]),
        [1, 50, 2]
    );
    assert_eq!(
        substitute_in_context(&gdef, LookupFlag::IGNORE_MARKS, pair, &[1, 50, 2]),
        [1, 50, 99]
    );
    assert_eq!(
        substitute_in_context(&gdef, LookupFlag::IGNORE_LIGATURES, pair, &[1, 200, 2]),
        [1, 200, 99]
    );
    assert_eq!(
        substitute_in_context(&gdef, LookupFlag::IGNORE_MARKS, pair, &[1, 200, 2]),
        [1, 200, 2]
    );
    // marks matched across a base
    assert_eq!(
        substitute_in_context(&gdef, LookupFlag::IGNORE_BASE_GLYPHS, (50, 51), &[50, 7, 51]),
        [50, 7, 99]
    );
    assert_eq!(
        substitute_in_context(&gdef, LookupFlag::empty(), (50, 51), &[50, 7, 51]),
        [50, 7, 51]
    );
}

#[test]
fn class_context_matches_each_position_by_class() {
    let gsub = table(vec![
        LookupDef::new(
            5,
            vec![gsub_data::context_format2(
                &[1, 2, 4],
                &[(1, 1), (2, 1), (3, 2)],
                &[
                    // an unclassed glyph followed by class 1
                    &[(&[1], &[(0, 1)])],
                    // class 1 followed by class 2
                    &[(&[2], &[(1, 1)])],
                ],
            )],
        ),
        LookupDef::new(
            1,
            vec![gsub_data::single_subst_format2(&[(1, 10), (2, 20), (3, 30), (4, 40)])],
        ),
    ]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let plan = plan(&[0], &[]);
    assert_eq!(ids(&run(&face, &plan, &[2, 3])), [2, 30]);
    assert_eq!(ids(&run(&face, &plan, &[1, 3])), [1, 30]);
    assert_eq!(ids(&run(&face, &plan, &[2, 4])), [2, 4]);
    assert_eq!(ids(&run(&face, &plan, &[4, 1])), [40, 1]);
    // class 0, but not covered
    assert_eq!(ids(&run(&face, &plan, &[5, 1])), [5, 1]);
}

#[test]
fn class_chain_context_checks_backtrack_and_lookahead_classes() {
    let gsub = table(vec![
        LookupDef::new(
            6,
            vec![gsub_data::chain_context_format2(
                &[1],
                [&[(7, 1)], &[(1, 1)], &[(8, 1)]],
                &[
                    &[],
                    &[
                        (&[1], &[], &[1], &[(0, 1)]),
                        // anything unclassed after
                        (&[], &[], &[0], &[(0, 2)]),
                    ],
                ],
            )],
        ),
        single(1, 10),
        single(1, 11),
    ]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    let plan = plan(&[0], &[]);
    assert_eq!(ids(&run(&face, &plan, &[7, 1, 8])), [7, 10, 8]);
    assert_eq!(ids(&run(&face, &plan, &[6, 1, 8])), [6, 1, 8]);
    assert_eq!(ids(&run(&face, &plan, &[7, 1, 9])), [7, 11, 9]);
    assert_eq!(ids(&run(&face, &plan, &[1])), [1]);
}

#[test]
fn extension_lookups_apply_their_subtables() {
    let gsub = table(vec![
        LookupDef::new(
            7,
            vec![extension(1, &gsub_data::single_subst_format2(&[(5, 9)]))],
        ),
        LookupDef::new(
            7,
            vec![extension(
                8,
                &gsub_data::reverse_chain_single_subst(&[(1, 2)], &[], &[&[2]]),
            )],
        ),
    ]);
    let gpos = table(vec![LookupDef::new(
        9,
        vec![extension(2, &gpos_data::pair_pos_format1(&[(10, 20, 50)]))],
    )]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), Some(gpos.as_slice()));
    assert_eq!(ids(&run(&face, &plan(&[0], &[]), &[5, 6])), [9, 6]);
    // the wrapped type decides the direction of the pass
    assert_eq!(ids(&run(&face, &plan(&[1], &[]), &[1, 1, 2])), [2, 2, 2]);
    let buffer = run_with_advances(&face, &plan(&[], &[0]), &[10, 20], &[500, 500]);
    assert_eq!(buffer.glyph_positions()[0].x_advance, 550);
}

#[test]
fn cursive_cycle_releases_the_old_child() {
    let gpos = table(vec![
        LookupDef::new(
            3,
            vec![gpos_data::cursive_pos(&[
                (5, None, Some((500, 100))),
                (6, Some((0, 0)), None),
            ])],
        ),
        LookupDef::new(
            3,
            vec![gpos_data::cursive_pos(&[
                (5, None, Some((500, 100))),
                (6, Some((0, 0)), None),
            ])],
        )
        .with_flag(LookupFlag::RIGHT_TO_LEFT.to_bits()),
    ]);
    let face = LayoutFace::from_tables(None, None, Some(gpos.as_slice()));
    // the second lookup attaches 5 to 6, undoing 6's attachment to 5
    let buffer = run_with_advances(&face, &plan(&[], &[0, 1]), &[5, 6], &[600, 600]);
    let positions = buffer.glyph_positions();
    assert_eq!(
        positions.iter().map(|pos| pos.y_offset).collect::<Vec<_>>(),
        [-100, 0]
    );
    assert!(positions.iter().all(|pos| !pos.has_pending_attachment()));
}

#[test]
fn nested_lookup_consuming_past_the_match_rewinds_to_its_start() {
    let gsub = table(vec![
        LookupDef::new(
            5,
            vec![gsub_data::context_format1(&[
                (&[1], &[(0, 1)]),
                (&[9], &[(0, 2)]),
            ])],
        ),
        LookupDef::new(4, vec![gsub_data::ligature_subst(&[(&[1, 2, 2, 2], 9)])]),
        single(9, 10),
    ]);
    let face = LayoutFace::from_tables(None, Some(gsub.as_slice()), None);
    // the ligature swallows three glyphs after the one-glyph context, and
    // the context lookup then continues from the ligature itself
    let buffer = run(&face, &plan(&[0], &[]), &[1, 2, 2, 2]);
    assert_eq!(ids(&buffer), [10]);
    assert_eq!(clusters(&buffer), [0]);
}
