use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use otl_shaper::collections::IntSet;
use otl_shaper::{shape, GlyphBuffer, LayoutFace, LookupMap, ShapePlan, Stage};
use otl_test_data::gdef::{gdef, BASE, MARK};
use otl_test_data::gpos as gpos_data;
use otl_test_data::gsub as gsub_data;
use otl_test_data::layout::{LayoutDef, LookupDef};
use otl_types::GlyphId;
use rand::Rng;

const MARK_GLYPH: u16 = 90;

struct Tables {
    gdef: Vec<u8>,
    gsub: Vec<u8>,
    gpos: Vec<u8>,
}

fn layout_table(feature: &[u8; 4], lookups: Vec<LookupDef>) -> Vec<u8> {
    let indices: Vec<u16> = (0..lookups.len() as u16).collect();
    LayoutDef::new(&[(feature, indices.as_slice())], lookups).build()
}

// a small latin-like font: contextual alternates, ligatures, kerning and marks
fn tables() -> Tables {
    let gsub = layout_table(
        b"liga",
        vec![
            LookupDef::new(
                6,
                vec![gsub_data::chain_context_format3(
                    &[&[10, 11, 12]],
                    &[&[20]],
                    &[],
                    &[(0, 1)],
                )],
            ),
            LookupDef::new(1, vec![gsub_data::single_subst_format1(&[20], 100)]),
            LookupDef::new(
                4,
                vec![gsub_data::ligature_subst(&[
                    (&[30, 31, 32], 200),
                    (&[30, 31], 201),
                    (&[33, 34], 202),
                ])],
            )
            .with_flag(0x0008),
        ],
    );

    let kern_pairs: Vec<(u16, u16, i16)> = (10..40)
        .flat_map(|first| (10..40).map(move |second| (first, second, -((first + second) as i16 % 50))))
        .collect();
    let gpos = layout_table(
        b"kern",
        vec![
            LookupDef::new(2, vec![gpos_data::pair_pos_format1(&kern_pairs)]),
            LookupDef::new(
                4,
                vec![gpos_data::mark_base_pos(
                    &[(MARK_GLYPH, 0, (0, 500))],
                    &(10..40).map(|base| (base, vec![Some((250, 700))])).collect::<Vec<_>>(),
                    1,
                )],
            ),
        ],
    );

    let mut classes: Vec<(u16, u16)> = (10..40).map(|glyph| (glyph, BASE)).collect();
    classes.push((MARK_GLYPH, MARK));
    Tables {
        gdef: gdef(&classes, &[]),
        gsub,
        gpos,
    }
}

fn plan() -> ShapePlan {
    let stage = |lookups: &[u16]| Stage::new(lookups.iter().copied().map(LookupMap::new).collect());
    ShapePlan::from_stages(vec![stage(&[0, 2])], vec![stage(&[0, 1])])
}

fn random_run(len: usize) -> GlyphBuffer {
    let mut rng = rand::thread_rng();
    let mut buffer = GlyphBuffer::new();
    for cluster in 0..len {
        let glyph = if rng.gen_ratio(1, 8) {
            MARK_GLYPH
        } else {
            rng.gen_range(10..40)
        };
        buffer.push(GlyphId::new(glyph), cluster as u32);
    }
    buffer
}

pub fn shape_benchmark(c: &mut Criterion) {
    let tables = tables();
    let face = LayoutFace::from_tables(
        Some(tables.gdef.as_slice()),
        Some(tables.gsub.as_slice()),
        Some(tables.gpos.as_slice()),
    );
    let plan = plan();

    for len in [16, 256, 4096] {
        c.bench_with_input(BenchmarkId::new("BM_Shape", len), &len, |b, len| {
            let run = random_run(*len);
            b.iter_batched(
                || {
                    let mut buffer = run.clone();
                    plan.setup_masks(&mut buffer);
                    buffer
                },
                |mut buffer| {
                    let _ = shape(&face, &plan, &mut buffer);
                    black_box(buffer)
                },
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn closure_benchmark(c: &mut Criterion) {
    let tables = tables();
    let face = LayoutFace::from_tables(None, Some(tables.gsub.as_slice()), None);
    let lookups: IntSet<u16> = (0..3).collect();
    let glyphs: IntSet<GlyphId> = (10..40).map(GlyphId::new).collect();

    c.bench_function("BM_Closure", |b| {
        b.iter_batched(
            || glyphs.clone(),
            |mut glyphs| {
                face.gsub().closure_glyphs(&lookups, &mut glyphs);
                black_box(glyphs)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, shape_benchmark, closure_benchmark);
criterion_main!(benches);
