//! Inspect and exercise the layout tables of a font.
//!
//! `--list` prints the scripts, language systems, features and lookups of
//! GSUB and GPOS. `--glyphs` shapes a run of glyph ids with the default
//! features (plus any given with `--features`) and prints one line per
//! output glyph: `gid@cluster +x_advance,y_advance (x_offset,y_offset)`.

use std::path::PathBuf;
use std::str::FromStr;

use otl_shaper::tables::layout::LayoutTable;
use otl_shaper::{
    shape, Direction, FeatureFlags, GlyphBuffer, LayoutFace, PlanBuilder, ReadError, TableKind,
};
use otl_types::{GlyphId, InvalidTag, Tag};

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = flags::Args::from_env().map_err(|e| Error::Args(e.to_string()))?;
    let bytes = std::fs::read(&args.input).map_err(|source| Error::Io {
        path: args.input.clone(),
        source,
    })?;
    let face = LayoutFace::new(&bytes)?;

    if args.list || args.glyphs.is_none() {
        list_layout(&face);
    }
    if let Some(glyphs) = &args.glyphs {
        shape_run(&face, &args, glyphs)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("{0}")]
    Args(String),
    #[error("could not read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not load font: {0}")]
    Font(#[from] ReadError),
    #[error("invalid tag '{raw}': {source}")]
    Tag { raw: String, source: InvalidTag },
    #[error("invalid glyph id '{0}'")]
    Glyph(String),
}

fn parse_tag(raw: &str) -> Result<Tag, Error> {
    Tag::from_str(raw).map_err(|source| Error::Tag {
        raw: raw.escape_default().to_string(),
        source,
    })
}

fn parse_glyphs(raw: &str) -> Result<Vec<GlyphId>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u16>()
                .map(GlyphId::new)
                .map_err(|_| Error::Glyph(item.to_string()))
        })
        .collect()
}

fn list_layout(face: &LayoutFace) {
    for (name, kind) in [("GSUB", TableKind::Gsub), ("GPOS", TableKind::Gpos)] {
        println!("{name}");
        for script in face.script_tags(kind) {
            println!("  script {script}");
            let features = face.feature_tags(kind, script, None);
            println!("    dflt: {}", join_tags(&features));
            for language in face.language_tags(kind, script) {
                let features = face.feature_tags(kind, script, Some(language));
                println!("    {language}: {}", join_tags(&features));
            }
        }
        match kind {
            TableKind::Gsub => list_lookups(face.gsub(), kind),
            TableKind::Gpos => list_lookups(face.gpos(), kind),
        }
    }
}

fn list_lookups<T>(table: &LayoutTable<T>, kind: TableKind) {
    for index in 0..table.lookup_count() {
        let Some(lookup) = table.lookup(index) else {
            continue;
        };
        let kept = lookup.subtables().len();
        let declared = lookup.declared_subtable_count() as usize;
        let dropped = declared.saturating_sub(kept);
        print!(
            "  lookup {index}: {} flag 0x{:04X} subtables {kept}",
            lookup_type_name(kind, lookup.lookup_type()),
            lookup.flag().to_bits(),
        );
        if dropped > 0 {
            print!(" ({dropped} dropped)");
        }
        println!();
    }
}

fn lookup_type_name(kind: TableKind, lookup_type: u16) -> &'static str {
    match (kind, lookup_type) {
        (TableKind::Gsub, 1) => "single",
        (TableKind::Gsub, 2) => "multiple",
        (TableKind::Gsub, 3) => "alternate",
        (TableKind::Gsub, 4) => "ligature",
        (TableKind::Gsub, 5) | (TableKind::Gpos, 7) => "context",
        (TableKind::Gsub, 6) | (TableKind::Gpos, 8) => "chain-context",
        (TableKind::Gsub, 8) => "reverse-chain-single",
        (TableKind::Gpos, 1) => "single",
        (TableKind::Gpos, 2) => "pair",
        (TableKind::Gpos, 3) => "cursive",
        (TableKind::Gpos, 4) => "mark-to-base",
        (TableKind::Gpos, 5) => "mark-to-ligature",
        (TableKind::Gpos, 6) => "mark-to-mark",
        _ => "unknown",
    }
}

fn join_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(Tag::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn shape_run(face: &LayoutFace, args: &flags::Args, glyphs: &str) -> Result<(), Error> {
    let glyphs = parse_glyphs(glyphs)?;
    let script = args.script.as_deref().map(parse_tag).transpose()?;
    let language = args.lang.as_deref().map(parse_tag).transpose()?;
    let direction = if args.rtl {
        Direction::RightToLeft
    } else {
        Direction::LeftToRight
    };

    let mut builder = PlanBuilder::new(face, script, language, direction);
    builder.add_default_features();
    for raw in args.features.as_deref().unwrap_or_default().split_whitespace() {
        builder.enable_feature(parse_tag(raw)?, FeatureFlags::empty(), 1);
    }
    let plan = builder.build();
    log::debug!(
        "shaping {} glyphs with script {:?}",
        glyphs.len(),
        plan.chosen_script(TableKind::Gsub)
    );

    let mut buffer = GlyphBuffer::new();
    buffer.set_direction(direction);
    for (cluster, glyph) in glyphs.into_iter().enumerate() {
        buffer.push(glyph, cluster as u32);
    }
    plan.setup_masks(&mut buffer);
    if let Err(e) = shape(face, &plan, &mut buffer) {
        log::warn!("shaping stopped early: {e}");
    }

    for (info, pos) in buffer.glyph_infos().iter().zip(buffer.glyph_positions()) {
        println!(
            "{}@{} +{},{} ({},{})",
            info.glyph_id.to_u16(),
            info.cluster,
            pos.x_advance,
            pos.y_advance,
            pos.x_offset,
            pos.y_offset
        );
    }
    Ok(())
}

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// List the layout tables of a font, or shape a run of glyphs
        cmd args {
                required input: PathBuf
                optional -l, --list
                /// comma separated glyph ids to shape
                optional -g, --glyphs glyphs: String
                /// space separated feature tags to enable
                optional -f, --features features: String
                optional -s, --script script: String
                optional --lang lang: String
                optional --rtl
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_lists() {
        assert_eq!(
            parse_glyphs("12, 13,14,").unwrap(),
            [GlyphId::new(12), GlyphId::new(13), GlyphId::new(14)]
        );
        assert!(matches!(parse_glyphs("12,x"), Err(Error::Glyph(raw)) if raw == "x"));
    }

    #[test]
    fn short_tags_are_padded() {
        assert_eq!(parse_tag("ENG").unwrap(), Tag::new(b"ENG "));
        assert!(parse_tag("toolong").is_err());
    }
}
