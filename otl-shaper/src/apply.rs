//! Applying GSUB and GPOS lookups to a [`GlyphBuffer`].
//!
//! Every subtable type implements [`Apply`], which attempts a match at the
//! buffer cursor and performs the edit on success. The [`ApplyContext`]
//! carries the state of the lookup being applied (its flags, the feature
//! mask, the nesting budget) and the primitives shared by all subtables:
//! glyph skipping, input/backtrack/lookahead matching and nested lookup
//! application.
//!
//! [`GlyphBuffer`]: crate::GlyphBuffer

mod context;
mod contextual;
mod gpos;
mod gsub;
mod iter;
mod matching;

#[cfg(test)]
#[path = "tests/apply.rs"]
mod tests;

use otl_types::GlyphId;

use crate::tables::layout::Lookup;

pub use context::TableKind;
pub(crate) use context::{ApplyContext, LookupSource};
pub(crate) use gpos::position_finish;

/// Maximum depth of nested lookup application.
pub const MAX_NESTING_LEVEL: usize = 8;

/// Maximum number of glyphs an input sequence may span.
pub const MAX_CONTEXT_LENGTH: usize = 64;

/// A table that can be applied at the current position of the buffer.
///
/// Implementations return `None` if they do not match at the cursor; the
/// cursor is then left where it was. On success, the cursor has been
/// advanced past whatever the subtable consumed.
pub(crate) trait Apply {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()>;
}

/// A glyph sequence probed with [`WouldApply::would_apply`].
///
/// Backtrack glyphs are ordered nearest first, matching the order used in
/// chained context rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct WouldApplyContext<'g> {
    /// The input glyphs, starting with the glyph the lookup is applied at.
    pub glyphs: &'g [GlyphId],
    /// If `true`, rules with backtrack or lookahead context never match
    /// unless that context is supplied below.
    pub zero_context: bool,
    pub backtrack: Option<&'g [GlyphId]>,
    pub lookahead: Option<&'g [GlyphId]>,
}

impl<'g> WouldApplyContext<'g> {
    pub fn new(glyphs: &'g [GlyphId], zero_context: bool) -> Self {
        WouldApplyContext {
            glyphs,
            zero_context,
            backtrack: None,
            lookahead: None,
        }
    }

    pub fn with_context(mut self, backtrack: &'g [GlyphId], lookahead: &'g [GlyphId]) -> Self {
        self.backtrack = Some(backtrack);
        self.lookahead = Some(lookahead);
        self
    }

    /// `true` if a backtrack sequence of `len` glyphs matched by `f` is satisfied.
    pub(crate) fn backtrack_matches(&self, len: usize, f: impl Fn(usize, GlyphId) -> bool) -> bool {
        side_matches(self.backtrack, self.zero_context, len, f)
    }

    pub(crate) fn lookahead_matches(&self, len: usize, f: impl Fn(usize, GlyphId) -> bool) -> bool {
        side_matches(self.lookahead, self.zero_context, len, f)
    }
}

fn side_matches(
    glyphs: Option<&[GlyphId]>,
    zero_context: bool,
    len: usize,
    f: impl Fn(usize, GlyphId) -> bool,
) -> bool {
    match glyphs {
        Some(glyphs) => {
            glyphs.len() >= len && glyphs.iter().take(len).enumerate().all(|(i, g)| f(i, *g))
        }
        None => !zero_context || len == 0,
    }
}

/// Check whether a lookup would match a glyph sequence, without a buffer.
pub(crate) trait WouldApply {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool;
}

impl<T: Apply> Apply for Lookup<T> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        if !self.digest().may_have(ctx.buffer.cur(0).glyph_id) {
            return None;
        }
        self.subtables()
            .iter()
            .find_map(|subtable| subtable.apply(ctx))
    }
}

impl<T: WouldApply> WouldApply for Lookup<T> {
    fn would_apply(&self, ctx: &WouldApplyContext) -> bool {
        let Some(first) = ctx.glyphs.first() else {
            return false;
        };
        self.digest().may_have(*first)
            && self
                .subtables()
                .iter()
                .any(|subtable| subtable.would_apply(ctx))
    }
}

/// Apply `lookup` to the whole buffer.
///
/// Substitution lookups that are not applied in place write to the
/// buffer's output and swap it in at the end; reverse lookups run from the
/// last glyph to the first. Returns `true` if the lookup matched anywhere.
pub(crate) fn apply_lookup_to_buffer<T: Apply>(
    ctx: &mut ApplyContext,
    lookup: &Lookup<T>,
    reverse: bool,
) -> bool {
    if ctx.buffer.is_empty() || ctx.lookup_mask == 0 {
        return false;
    }
    ctx.lookup_props = lookup.props();
    let in_place = ctx.table == TableKind::Gpos;

    if !reverse {
        if !in_place {
            ctx.buffer.clear_output();
        }
        ctx.buffer.idx = 0;
        let applied = apply_forward(ctx, lookup);
        if !in_place {
            ctx.buffer.sync();
        }
        applied
    } else {
        debug_assert!(!ctx.buffer.have_output);
        ctx.buffer.idx = ctx.buffer.len() - 1;
        apply_backward(ctx, lookup)
    }
}

fn applies_here<T: Apply>(ctx: &mut ApplyContext, lookup: &Lookup<T>) -> bool {
    let cur = *ctx.buffer.cur(0);
    lookup.digest().may_have(cur.glyph_id)
        && cur.mask & ctx.lookup_mask != 0
        && ctx.check_glyph_property(&cur, ctx.lookup_props)
        && lookup.apply(ctx).is_some()
}

fn apply_forward<T: Apply>(ctx: &mut ApplyContext, lookup: &Lookup<T>) -> bool {
    let mut applied = false;
    while ctx.buffer.idx < ctx.buffer.len() && ctx.buffer.successful() {
        if applies_here(ctx, lookup) {
            applied = true;
            if !ctx.buffer.consume_op() {
                log::debug!("operation budget exhausted in lookup {}", ctx.lookup_index);
                break;
            }
        } else {
            ctx.buffer.next_glyph();
        }
    }
    applied
}

fn apply_backward<T: Apply>(ctx: &mut ApplyContext, lookup: &Lookup<T>) -> bool {
    let mut applied = false;
    loop {
        if applies_here(ctx, lookup) {
            applied = true;
            if !ctx.buffer.consume_op() {
                log::debug!("operation budget exhausted in lookup {}", ctx.lookup_index);
                break;
            }
        }
        if ctx.buffer.idx == 0 {
            break;
        }
        ctx.buffer.idx -= 1;
    }
    applied
}
