use super::*;

#[test]
fn glyph_id_and_tag_round_trip_json() {
    let gid = GlyphId::new(42);
    let json = serde_json::to_string(&gid).unwrap();
    assert_eq!(serde_json::from_str::<GlyphId>(&json).unwrap(), gid);

    let tag = Tag::new(b"kern");
    let json = serde_json::to_string(&tag).unwrap();
    assert_eq!(serde_json::from_str::<Tag>(&json).unwrap(), tag);
}
