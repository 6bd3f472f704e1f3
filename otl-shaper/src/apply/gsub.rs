//! Applying GSUB subtables.

use otl_types::GlyphId;

use crate::buffer::GlyphPropsFlags;
use crate::plan::MAX_FEATURE_VALUE;
use crate::tables::gsub::{
    AlternateSubstFormat1, LigatureSubstFormat1, MultipleSubstFormat1,
    ReverseChainSingleSubstFormat1, SingleSubst, SubstitutionSubtable,
};
use crate::tables::layout::CoverageTable;

use super::matching::{ligate_input, match_backtrack, match_input, match_lookahead};
use super::{Apply, ApplyContext, WouldApply, WouldApplyContext};

impl Apply for SubstitutionSubtable<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        match self {
            SubstitutionSubtable::Single(table) => table.apply(ctx),
            SubstitutionSubtable::Multiple(table) => table.apply(ctx),
            SubstitutionSubtable::Alternate(table) => table.apply(ctx),
            SubstitutionSubtable::Ligature(table) => table.apply(ctx),
            SubstitutionSubtable::Contextual(table) => table.apply(ctx),
            SubstitutionSubtable::ChainContextual(table) => table.apply(ctx),
            SubstitutionSubtable::Reverse(table) => table.apply(ctx),
        }
    }
}

impl WouldApply for SubstitutionSubtable<'_> {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool {
        match self {
            SubstitutionSubtable::Single(table) => table.would_apply(ctx),
            SubstitutionSubtable::Multiple(table) => single_glyph_covered(ctx, table.coverage()),
            SubstitutionSubtable::Alternate(table) => single_glyph_covered(ctx, table.coverage()),
            SubstitutionSubtable::Ligature(table) => table.would_apply(ctx),
            SubstitutionSubtable::Contextual(table) => table.would_apply(ctx),
            SubstitutionSubtable::ChainContextual(table) => table.would_apply(ctx),
            SubstitutionSubtable::Reverse(table) => table.would_apply(ctx),
        }
    }
}

fn single_glyph_covered(ctx: &WouldApplyContext, coverage: CoverageTable) -> bool {
    matches!(ctx.glyphs, [glyph] if coverage.get(*glyph).is_some())
}

impl Apply for SingleSubst<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).glyph_id;
        let index = self.coverage().get(glyph)?;
        let substitute = self.substitute_for_index(glyph, index)?;
        ctx.replace_glyph(substitute);
        Some(())
    }
}

impl WouldApply for SingleSubst<'_> {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool {
        single_glyph_covered(ctx, self.coverage())
    }
}

impl Apply for MultipleSubstFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).glyph_id;
        let index = self.coverage().get(glyph)?;
        let sequence = self.sequence(index)?;

        match sequence.len() {
            // in-place, and not a "multiplied" substitution
            1 => ctx.replace_glyph(sequence.get(0)?),
            // not permitted by the OpenType spec, but fonts rely on it
            0 => ctx.buffer.delete_glyph(),
            _ => {
                let class = if ctx.buffer.cur(0).is_ligature() {
                    GlyphPropsFlags::BASE_GLYPH
                } else {
                    GlyphPropsFlags::empty()
                };
                let lig_id = ctx.buffer.cur(0).lig_id();
                for (i, substitute) in sequence.iter().enumerate() {
                    // components attached to a ligature keep their ligature props
                    if lig_id == 0 {
                        ctx.buffer
                            .cur_mut(0)
                            .set_lig_props_for_component(i.min(u8::MAX as usize) as u8);
                    }
                    ctx.output_glyph_for_component(substitute, class);
                }
                ctx.buffer.skip_glyph();
            }
        }
        Some(())
    }
}

impl Apply for AlternateSubstFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).glyph_id;
        let index = self.coverage().get(glyph)?;
        let alternates = self.alternate_set(index)?;
        let count = alternates.len() as u32;
        if count == 0 {
            return None;
        }

        // the feature value selects the alternate, 1-based
        let glyph_mask = ctx.buffer.cur(0).mask;
        let lookup_mask = ctx.lookup_mask;
        let shift = lookup_mask.trailing_zeros();
        let mut alt_index = (lookup_mask & glyph_mask).checked_shr(shift).unwrap_or(0);

        if alt_index == MAX_FEATURE_VALUE && ctx.random {
            alt_index = ctx.random_number() % count + 1;
        }
        if alt_index == 0 || alt_index > count {
            return None;
        }
        let alternate = alternates.get(alt_index as usize - 1)?;
        ctx.replace_glyph(alternate);
        Some(())
    }
}

impl Apply for LigatureSubstFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).glyph_id;
        let index = self.coverage().get(glyph)?;
        let ligature_set = self.ligature_set(index)?;

        for ligature in ligature_set.ligatures() {
            let components = ligature.component_glyph_ids();
            match ligature.component_count() {
                0 => continue,
                // a single-component ligature is a plain substitution
                1 => {
                    ctx.replace_glyph(ligature.ligature_glyph());
                    return Some(());
                }
                _ => {
                    let matcher = |glyph: GlyphId, index: u16| {
                        components.get(index as usize) == Some(glyph)
                    };
                    let Some(matched) = match_input(ctx, components.len() as u16, &matcher)
                    else {
                        continue;
                    };
                    ligate_input(ctx, &matched, ligature.ligature_glyph());
                    return Some(());
                }
            }
        }
        None
    }
}

impl WouldApply for LigatureSubstFormat1<'_> {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool {
        let Some(&first) = ctx.glyphs.first() else {
            return false;
        };
        let Some(ligature_set) = self
            .coverage()
            .get(first)
            .and_then(|index| self.ligature_set(index))
        else {
            return false;
        };
        ligature_set.ligatures().any(|ligature| {
            let components = ligature.component_glyph_ids();
            ligature.component_count() as usize == ctx.glyphs.len()
                && components
                    .iter()
                    .zip(&ctx.glyphs[1..])
                    .all(|(component, glyph)| component == *glyph)
        })
    }
}

impl Apply for ReverseChainSingleSubstFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        // only applied directly, never as a nested lookup
        if !ctx.is_top_level() {
            return None;
        }
        let glyph = ctx.buffer.cur(0).glyph_id;
        let index = self.coverage().get(glyph)?;
        let substitute = self.substitute_glyph_ids().get(index as usize)?;

        let backtrack = |glyph: GlyphId, index: u16| {
            self.backtrack_coverage(index as usize)
                .get(glyph)
                .is_some()
        };
        let lookahead = |glyph: GlyphId, index: u16| {
            self.lookahead_coverage(index as usize)
                .get(glyph)
                .is_some()
        };
        match_backtrack(ctx, self.backtrack_glyph_count() as u16, &backtrack)?;
        match_lookahead(
            ctx,
            self.lookahead_glyph_count() as u16,
            &lookahead,
            ctx.buffer.idx + 1,
        )?;

        // the cursor is moved back by the caller
        ctx.replace_glyph_inplace(substitute);
        Some(())
    }
}

impl WouldApply for ReverseChainSingleSubstFormat1<'_> {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool {
        single_glyph_covered(ctx, self.coverage())
            && ctx.backtrack_matches(self.backtrack_glyph_count(), |i, glyph| {
                self.backtrack_coverage(i).get(glyph).is_some()
            })
            && ctx.lookahead_matches(self.lookahead_glyph_count(), |i, glyph| {
                self.lookahead_coverage(i).get(glyph).is_some()
            })
    }
}
