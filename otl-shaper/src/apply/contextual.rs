//! Sequence context and chained sequence context, shared by GSUB and GPOS.

use otl_types::GlyphId;

use crate::array::BeArray;
use crate::tables::layout::{
    ChainedSequenceContext, ChainedSequenceRule, SequenceContext, SequenceLookupRecord,
    SequenceRule,
};

use super::matching::{apply_lookup_records, match_backtrack, match_input, match_lookahead};
use super::{Apply, ApplyContext, WouldApply, WouldApplyContext};

fn match_glyph(glyph: GlyphId, value: u16) -> bool {
    glyph.to_u16() == value
}

/// Match an input sequence and apply the nested lookups of the rule.
fn apply_context(
    ctx: &mut ApplyContext,
    input_len: u16,
    input: &dyn Fn(GlyphId, u16) -> bool,
    records: &[SequenceLookupRecord],
) -> Option<()> {
    let mut matched = match_input(ctx, input_len, input)?;
    apply_lookup_records(ctx, &mut matched, records);
    Some(())
}

/// As [`apply_context`], with backtrack and lookahead sequences.
fn apply_chain_context(
    ctx: &mut ApplyContext,
    lens: [u16; 3],
    matchers: [&dyn Fn(GlyphId, u16) -> bool; 3],
    records: &[SequenceLookupRecord],
) -> Option<()> {
    let [backtrack_len, input_len, lookahead_len] = lens;
    let [backtrack, input, lookahead] = matchers;
    let mut matched = match_input(ctx, input_len, input)?;
    match_lookahead(ctx, lookahead_len, lookahead, matched.end)?;
    match_backtrack(ctx, backtrack_len, backtrack)?;
    apply_lookup_records(ctx, &mut matched, records);
    Some(())
}

fn sequence_matcher<'r>(
    sequence: BeArray<'r, u16>,
    value_matches: &'r dyn Fn(GlyphId, u16) -> bool,
) -> impl Fn(GlyphId, u16) -> bool + 'r {
    move |glyph: GlyphId, index: u16| {
        sequence
            .get(index as usize)
            .is_some_and(|value| value_matches(glyph, value))
    }
}

fn apply_rules<'a>(
    ctx: &mut ApplyContext,
    rules: impl Iterator<Item = SequenceRule<'a>>,
    value_matches: &dyn Fn(GlyphId, u16) -> bool,
) -> Option<()> {
    for rule in rules {
        let input = rule.input_sequence();
        let matcher = sequence_matcher(input, value_matches);
        if apply_context(ctx, input.len() as u16, &matcher, rule.seq_lookup_records()).is_some() {
            return Some(());
        }
    }
    None
}

fn apply_chained_rules<'a>(
    ctx: &mut ApplyContext,
    rules: impl Iterator<Item = ChainedSequenceRule<'a>>,
    value_matches: [&dyn Fn(GlyphId, u16) -> bool; 3],
) -> Option<()> {
    let [backtrack_fn, input_fn, lookahead_fn] = value_matches;
    for rule in rules {
        let backtrack = rule.backtrack_sequence();
        let input = rule.input_sequence();
        let lookahead = rule.lookahead_sequence();
        let backtrack_matcher = sequence_matcher(backtrack, backtrack_fn);
        let input_matcher = sequence_matcher(input, input_fn);
        let lookahead_matcher = sequence_matcher(lookahead, lookahead_fn);
        let applied = apply_chain_context(
            ctx,
            [
                backtrack.len() as u16,
                input.len() as u16,
                lookahead.len() as u16,
            ],
            [&backtrack_matcher, &input_matcher, &lookahead_matcher],
            rule.seq_lookup_records(),
        );
        if applied.is_some() {
            return Some(());
        }
    }
    None
}

impl Apply for SequenceContext<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).glyph_id;
        match self {
            SequenceContext::Format1(table) => {
                let index = table.coverage().get(glyph)?;
                let rule_set = table.rule_set(index)?;
                apply_rules(ctx, rule_set.rules(), &match_glyph)
            }
            SequenceContext::Format2(table) => {
                table.coverage().get(glyph)?;
                let class_def = table.class_def();
                let rule_set = table.rule_set(class_def.get(glyph))?;
                let match_class = move |glyph: GlyphId, value: u16| class_def.get(glyph) == value;
                apply_rules(ctx, rule_set.rules(), &match_class)
            }
            SequenceContext::Format3(table) => {
                table.coverage(0).get(glyph)?;
                let input_len = table.glyph_count().checked_sub(1)? as u16;
                let match_coverage = |glyph: GlyphId, index: u16| {
                    table.coverage(index as usize + 1).get(glyph).is_some()
                };
                apply_context(ctx, input_len, &match_coverage, table.seq_lookup_records())
            }
        }
    }
}

impl Apply for ChainedSequenceContext<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).glyph_id;
        match self {
            ChainedSequenceContext::Format1(table) => {
                let index = table.coverage().get(glyph)?;
                let rule_set = table.rule_set(index)?;
                apply_chained_rules(
                    ctx,
                    rule_set.rules(),
                    [&match_glyph, &match_glyph, &match_glyph],
                )
            }
            ChainedSequenceContext::Format2(table) => {
                table.coverage().get(glyph)?;
                let backtrack_classes = table.backtrack_class_def();
                let input_classes = table.input_class_def();
                let lookahead_classes = table.lookahead_class_def();
                let rule_set = table.rule_set(input_classes.get(glyph))?;
                let backtrack =
                    move |glyph: GlyphId, value: u16| backtrack_classes.get(glyph) == value;
                let input = move |glyph: GlyphId, value: u16| input_classes.get(glyph) == value;
                let lookahead =
                    move |glyph: GlyphId, value: u16| lookahead_classes.get(glyph) == value;
                apply_chained_rules(ctx, rule_set.rules(), [&backtrack, &input, &lookahead])
            }
            ChainedSequenceContext::Format3(table) => {
                table.input_coverage(0).get(glyph)?;
                let lens = [
                    table.backtrack_glyph_count() as u16,
                    table.input_glyph_count().checked_sub(1)? as u16,
                    table.lookahead_glyph_count() as u16,
                ];
                let backtrack = |glyph: GlyphId, index: u16| {
                    table
                        .backtrack_coverage(index as usize)
                        .get(glyph)
                        .is_some()
                };
                let input = |glyph: GlyphId, index: u16| {
                    table
                        .input_coverage(index as usize + 1)
                        .get(glyph)
                        .is_some()
                };
                let lookahead = |glyph: GlyphId, index: u16| {
                    table
                        .lookahead_coverage(index as usize)
                        .get(glyph)
                        .is_some()
                };
                apply_chain_context(
                    ctx,
                    lens,
                    [&backtrack, &input, &lookahead],
                    table.seq_lookup_records(),
                )
            }
        }
    }
}

/// `true` if the glyphs after the first match a rule's input sequence.
fn would_match_input(
    ctx: &WouldApplyContext,
    len: usize,
    matches: impl Fn(usize, GlyphId) -> bool,
) -> bool {
    ctx.glyphs.len() == len + 1
        && ctx.glyphs[1..]
            .iter()
            .enumerate()
            .all(|(i, glyph)| matches(i, *glyph))
}

fn would_match_sequence(
    ctx: &WouldApplyContext,
    sequence: BeArray<u16>,
    value_matches: &dyn Fn(GlyphId, u16) -> bool,
) -> bool {
    would_match_input(ctx, sequence.len(), |i, glyph| {
        sequence.get(i).is_some_and(|value| value_matches(glyph, value))
    })
}

fn would_match_chained_rule(
    ctx: &WouldApplyContext,
    rule: &ChainedSequenceRule,
    value_matches: [&dyn Fn(GlyphId, u16) -> bool; 3],
) -> bool {
    let [backtrack_fn, input_fn, lookahead_fn] = value_matches;
    let backtrack = rule.backtrack_sequence();
    let lookahead = rule.lookahead_sequence();
    ctx.backtrack_matches(backtrack.len(), |i, glyph| {
        backtrack.get(i).is_some_and(|value| backtrack_fn(glyph, value))
    }) && ctx.lookahead_matches(lookahead.len(), |i, glyph| {
        lookahead.get(i).is_some_and(|value| lookahead_fn(glyph, value))
    }) && would_match_sequence(ctx, rule.input_sequence(), input_fn)
}

impl WouldApply for SequenceContext<'_> {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool {
        let Some(&first) = ctx.glyphs.first() else {
            return false;
        };
        match self {
            SequenceContext::Format1(table) => table
                .coverage()
                .get(first)
                .and_then(|index| table.rule_set(index))
                .is_some_and(|rule_set| {
                    rule_set
                        .rules()
                        .any(|rule| would_match_sequence(ctx, rule.input_sequence(), &match_glyph))
                }),
            SequenceContext::Format2(table) => {
                let class_def = table.class_def();
                let match_class =
                    move |glyph: GlyphId, value: u16| class_def.get(glyph) == value;
                table.coverage().get(first).is_some()
                    && table
                        .rule_set(class_def.get(first))
                        .is_some_and(|rule_set| {
                            rule_set.rules().any(|rule| {
                                would_match_sequence(ctx, rule.input_sequence(), &match_class)
                            })
                        })
            }
            SequenceContext::Format3(table) => {
                let input_len = table.glyph_count().saturating_sub(1);
                table.coverage(0).get(first).is_some()
                    && would_match_input(ctx, input_len, |i, glyph| {
                        table.coverage(i + 1).get(glyph).is_some()
                    })
            }
        }
    }
}

impl WouldApply for ChainedSequenceContext<'_> {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool {
        let Some(&first) = ctx.glyphs.first() else {
            return false;
        };
        match self {
            ChainedSequenceContext::Format1(table) => table
                .coverage()
                .get(first)
                .and_then(|index| table.rule_set(index))
                .is_some_and(|rule_set| {
                    rule_set.rules().any(|rule| {
                        would_match_chained_rule(
                            ctx,
                            &rule,
                            [&match_glyph, &match_glyph, &match_glyph],
                        )
                    })
                }),
            ChainedSequenceContext::Format2(table) => {
                let backtrack_classes = table.backtrack_class_def();
                let input_classes = table.input_class_def();
                let lookahead_classes = table.lookahead_class_def();
                let backtrack =
                    move |glyph: GlyphId, value: u16| backtrack_classes.get(glyph) == value;
                let input = move |glyph: GlyphId, value: u16| input_classes.get(glyph) == value;
                let lookahead =
                    move |glyph: GlyphId, value: u16| lookahead_classes.get(glyph) == value;
                table.coverage().get(first).is_some()
                    && table
                        .rule_set(input_classes.get(first))
                        .is_some_and(|rule_set| {
                            rule_set.rules().any(|rule| {
                                would_match_chained_rule(
                                    ctx,
                                    &rule,
                                    [&backtrack, &input, &lookahead],
                                )
                            })
                        })
            }
            ChainedSequenceContext::Format3(table) => {
                let input_len = table.input_glyph_count().saturating_sub(1);
                table.input_coverage(0).get(first).is_some()
                    && ctx.backtrack_matches(table.backtrack_glyph_count(), |i, glyph| {
                        table.backtrack_coverage(i).get(glyph).is_some()
                    })
                    && ctx.lookahead_matches(table.lookahead_glyph_count(), |i, glyph| {
                        table.lookahead_coverage(i).get(glyph).is_some()
                    })
                    && would_match_input(ctx, input_len, |i, glyph| {
                        table.input_coverage(i + 1).get(glyph).is_some()
                    })
            }
        }
    }
}
