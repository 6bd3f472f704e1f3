use otl_test_data::gsub as gsub_data;
use otl_test_data::layout::{
    class_def_format1, class_def_format2, coverage, coverage_ranges, extension, LangSysDef,
    LayoutDef, LookupDef, ScriptDef,
};
use otl_types::GlyphId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::sanitize::sanitize;
use crate::tables::gsub::{Gsub, SubstitutionSubtable};
use crate::FontRead;

fn gid(raw: u16) -> GlyphId {
    GlyphId::new(raw)
}

fn single(glyph: u16, delta: i16) -> LookupDef {
    LookupDef::new(1, vec![gsub_data::single_subst_format1(&[glyph], delta)])
}

// liga: 0, smcp: 1, locl: 2 (required for ENG)
fn three_feature_table() -> Vec<u8> {
    let mut def = LayoutDef::new(
        &[(b"liga", &[0]), (b"smcp", &[1, 2]), (b"locl", &[3, 9])],
        vec![single(1, 1), single(2, 1), single(3, 1), single(4, 1)],
    );
    def = def.with_scripts(vec![
        ScriptDef::new(b"DFLT", LangSysDef::new(&[0])),
        ScriptDef::new(b"latn", LangSysDef::new(&[0, 1]))
            .with_lang_sys(b"ENG ", LangSysDef::new(&[1]).with_required(2)),
    ]);
    def.build()
}

#[test]
fn read_header_and_lists() {
    let bytes = three_feature_table();
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    assert_eq!(gsub.version(), (1, 0));
    assert!(!gsub.has_feature_variations());
    assert_eq!(
        gsub.script_list().tags().collect::<Vec<_>>(),
        [Tag::new(b"DFLT"), Tag::new(b"latn")]
    );
    assert_eq!(gsub.feature_list().len(), 3);
    assert_eq!(gsub.feature_list().tag(2), Some(Tag::new(b"locl")));
    assert_eq!(gsub.lookup_count(), 4);
}

#[test]
fn script_selection_falls_back_to_default() {
    let bytes = three_feature_table();
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    let scripts = gsub.script_list();
    let (tag, _) = scripts.select(&[Tag::new(b"latn")]).unwrap();
    assert_eq!(tag, Tag::new(b"latn"));
    let (tag, _) = scripts.select(&[Tag::new(b"cyrl")]).unwrap();
    assert_eq!(tag, DEFAULT_SCRIPT);

    let latn = scripts.script(Tag::new(b"latn")).unwrap();
    let eng = latn.lang_sys_or_default(Some(Tag::new(b"ENG "))).unwrap();
    assert_eq!(eng.required_feature_index(), Some(2));
    let fallback = latn.lang_sys_or_default(Some(Tag::new(b"TRK "))).unwrap();
    assert_eq!(fallback.required_feature_index(), None);
    assert_eq!(fallback.feature_indices().len(), 2);
}

#[test]
fn feature_lookups_prefer_required() {
    let bytes = three_feature_table();
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    let latn = gsub.script_list().script(Tag::new(b"latn")).unwrap();
    let eng = latn.lang_sys(Tag::new(b"ENG ")).unwrap();
    assert_eq!(gsub.find_feature_index(&eng, Tag::new(b"locl")), Some(2));
    assert_eq!(gsub.feature_lookups(&eng, Tag::new(b"smcp")), Some(vec![1, 2]));
    assert_eq!(gsub.feature_lookups(&eng, Tag::new(b"liga")), None);
    assert_eq!(gsub.feature_index_for_tag(Tag::new(b"liga")), Some(0));
}

#[test]
fn collect_features_and_lookups() {
    let bytes = three_feature_table();
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    let latn = [Tag::new(b"latn")];
    let eng = [Tag::new(b"ENG ")];

    let all = gsub.collect_features(None, None, None);
    assert_eq!(all.iter().collect::<Vec<_>>(), [0, 1, 2]);

    let eng_only = gsub.collect_features(Some(&latn), Some(&eng), None);
    assert_eq!(eng_only.iter().collect::<Vec<_>>(), [1, 2]);

    let liga_only = gsub.collect_features(None, None, Some(&[Tag::new(b"liga")]));
    assert_eq!(liga_only.iter().collect::<Vec<_>>(), [0]);

    // lookup 9 does not exist and is left out
    let lookups = gsub.collect_lookups(&eng_only);
    assert_eq!(lookups.iter().collect::<Vec<_>>(), [1, 2, 3]);
}

#[test]
fn extension_lookup_reports_wrapped_type() {
    let inner = gsub_data::single_subst_format1(&[5], 10);
    let bytes = LayoutDef::single_lookup(LookupDef::new(7, vec![extension(1, &inner)])).build();
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    let lookup = gsub.lookup(0).unwrap();
    assert_eq!(lookup.lookup_type(), 1);
    let [SubstitutionSubtable::Single(single)] = lookup.subtables() else {
        panic!("expected one single substitution");
    };
    assert_eq!(single.substitute(gid(5)), Some(gid(15)));
}

#[test]
fn mark_filtering_set_is_read() {
    let bytes =
        LayoutDef::single_lookup(single(1, 1).with_flag(0x0008).with_mark_filtering_set(3))
            .build();
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    let lookup = gsub.lookup(0).unwrap();
    assert!(lookup.flag().contains(LookupFlag::IGNORE_MARKS));
    assert!(lookup.flag().contains(LookupFlag::USE_MARK_FILTERING_SET));
    assert_eq!(lookup.mark_filtering_set(), Some(3));
}

#[test]
fn unsupported_major_version_is_null() {
    let mut bytes = three_feature_table();
    bytes[1] = 2;
    let gsub: Gsub = sanitize(FontData::new(&bytes));
    assert_eq!(gsub.lookup_count(), 0);
    assert!(gsub.script_list().is_empty());
}

#[test]
fn coverage_formats() {
    let list = coverage(&[3, 7, 8, 40]);
    let list = CoverageTable::read(FontData::new(&list)).unwrap();
    assert_eq!(list.get(gid(8)), Some(2));
    assert_eq!(list.get(gid(9)), None);
    assert_eq!(list.population(), 4);

    let ranges = coverage_ranges(&[(10, 12), (20, 20)]);
    let ranges = CoverageTable::read(FontData::new(&ranges)).unwrap();
    assert_eq!(ranges.get(gid(12)), Some(2));
    assert_eq!(ranges.get(gid(20)), Some(3));
    assert_eq!(
        ranges.iter().map(GlyphId::to_u16).collect::<Vec<_>>(),
        [10, 11, 12, 20]
    );

    let mut glyphs = IntSet::empty();
    ranges.add_coverage(&mut glyphs);
    assert!(list.intersects(&IntSet::from_iter([gid(40)])));
    assert!(!list.intersects(&glyphs));
}

#[test]
fn class_def_formats() {
    let format1 = class_def_format1(10, &[1, 0, 2]);
    let format1 = ClassDef::read(FontData::new(&format1)).unwrap();
    assert_eq!(format1.get(gid(10)), 1);
    assert_eq!(format1.get(gid(11)), 0);
    assert_eq!(format1.get(gid(12)), 2);
    assert_eq!(format1.get(gid(13)), 0);

    let format2 = class_def_format2(&[(5, 9, 3), (20, 21, 1)]);
    let format2 = ClassDef::read(FontData::new(&format2)).unwrap();
    assert_eq!(format2.get(gid(7)), 3);
    assert_eq!(format2.get(gid(21)), 1);
    assert_eq!(format2.get(gid(15)), 0);

    let mut glyphs = IntSet::empty();
    format2.add_class(3, &mut glyphs);
    assert_eq!(glyphs.len(), 5);
    assert!(format2.intersects_class(&glyphs, 3));
    assert!(!format2.intersects_class(&glyphs, 1));
}

#[test]
fn bad_class_format_is_an_error() {
    let bytes = [0u8, 3, 0, 0];
    assert!(matches!(
        ClassDef::read(FontData::new(&bytes)),
        Err(ReadError::InvalidFormat(3))
    ));
}

fn random_glyphs(rng: &mut StdRng) -> Vec<u16> {
    let count = rng.gen_range(1..300);
    let mut glyphs: Vec<u16> = (0..count).map(|_| rng.gen_range(0..1000)).collect();
    glyphs.sort_unstable();
    glyphs.dedup();
    glyphs
}

// consecutive glyphs collapsed into inclusive ranges
fn runs(glyphs: &[u16]) -> Vec<(u16, u16)> {
    let mut ranges: Vec<(u16, u16)> = Vec::new();
    for glyph in glyphs {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == *glyph => *end = *glyph,
            _ => ranges.push((*glyph, *glyph)),
        }
    }
    ranges
}

#[test]
fn coverage_formats_agree() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let glyphs = random_glyphs(&mut rng);
        let list = coverage(&glyphs);
        let list = CoverageTable::read(FontData::new(&list)).unwrap();
        let ranges = coverage_ranges(&runs(&glyphs));
        let ranges = CoverageTable::read(FontData::new(&ranges)).unwrap();

        let mut last = None;
        for raw in 0..1010 {
            let index = list.get(gid(raw));
            assert_eq!(index, ranges.get(gid(raw)), "glyph {raw}");
            if let Some(index) = index {
                assert!(last.map_or(true, |last| index > last));
                last = Some(index);
            }
        }
        assert_eq!(last, Some(glyphs.len() as u16 - 1));
    }
}

#[test]
fn class_def_formats_agree() {
    let mut rng = StdRng::seed_from_u64(7);
    let start = 100;
    let classes: Vec<u16> = (0..200).map(|_| rng.gen_range(0..4)).collect();
    let format1 = class_def_format1(start, &classes);
    let format1 = ClassDef::read(FontData::new(&format1)).unwrap();

    let mut ranges: Vec<(u16, u16, u16)> = Vec::new();
    for (i, class) in classes.iter().enumerate() {
        let glyph = start + i as u16;
        match ranges.last_mut() {
            Some((_, end, last)) if last == class => *end = glyph,
            _ => ranges.push((glyph, glyph, *class)),
        }
    }
    ranges.retain(|(.., class)| *class != 0);
    let format2 = class_def_format2(&ranges);
    let format2 = ClassDef::read(FontData::new(&format2)).unwrap();

    for raw in 0..400 {
        assert_eq!(format1.get(gid(raw)), format2.get(gid(raw)), "glyph {raw}");
    }
}
