//! Walking the buffer while skipping glyphs the current lookup ignores.

use otl_types::GlyphId;

use crate::buffer::GlyphInfo;
use crate::tables::layout::LookupFlag;

use super::{ApplyContext, TableKind};

/// Decides whether a glyph matches the value at an index of a rule's sequence.
///
/// The second argument is the position in the sequence being matched.
pub(crate) type MatchFn<'f> = dyn Fn(GlyphId, u16) -> bool + 'f;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Skip {
    No,
    Yes,
    Maybe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Match {
    No,
    Yes,
    Maybe,
}

/// Finds the next or previous glyph that a lookup can see.
///
/// Glyphs rejected by the lookup flags are skipped, as are default
/// ignorable glyphs that the matcher does not explicitly accept.
pub(crate) struct SkippingIterator<'c, 't, 'a> {
    ctx: &'c ApplyContext<'t, 'a>,
    lookup_props: u32,
    ignore_zwnj: bool,
    ignore_zwj: bool,
    ignore_hidden: bool,
    mask: u32,
    syllable: u8,
    matcher: Option<&'c MatchFn<'c>>,
    // index into the sequence passed to the matcher
    glyph_data: u16,
    idx: usize,
}

impl<'c, 't, 'a> SkippingIterator<'c, 't, 'a> {
    /// Create an iterator positioned at `start`.
    ///
    /// In context mode (backtrack and lookahead) the feature mask is not
    /// checked and joiners are always skippable.
    pub(crate) fn new(ctx: &'c ApplyContext<'t, 'a>, start: usize, context_match: bool) -> Self {
        let is_gpos = ctx.table == TableKind::Gpos;
        let syllable = if ctx.buffer.idx == start && ctx.per_syllable {
            ctx.buffer.cur(0).syllable()
        } else {
            0
        };
        SkippingIterator {
            ctx,
            lookup_props: ctx.lookup_props,
            // ZWNJ is never skipped in GSUB input, so that it can block ligatures
            ignore_zwnj: is_gpos || (context_match && ctx.auto_zwnj),
            ignore_zwj: context_match || ctx.auto_zwj,
            ignore_hidden: is_gpos,
            mask: if context_match {
                u32::MAX
            } else {
                ctx.lookup_mask
            },
            syllable,
            matcher: None,
            glyph_data: 0,
            idx: start,
        }
    }

    pub(crate) fn with_matcher(mut self, matcher: &'c MatchFn<'c>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub(crate) fn set_lookup_props(&mut self, lookup_props: u32) {
        self.lookup_props = lookup_props;
    }

    pub(crate) fn ignore_marks(mut self) -> Self {
        self.lookup_props = LookupFlag::IGNORE_MARKS.to_bits() as u32;
        self
    }

    /// The index of the last glyph found.
    pub(crate) fn index(&self) -> usize {
        self.idx
    }

    /// Advance to the next unskipped glyph in the input.
    ///
    /// Returns `false` if the end of the buffer is reached or a glyph that
    /// cannot be skipped fails to match.
    pub(crate) fn next(&mut self) -> bool {
        let info = &self.ctx.buffer.info;
        while self.idx + 1 < info.len() {
            self.idx += 1;
            let glyph = &info[self.idx];
            match self.step(glyph) {
                Some(true) => {
                    self.glyph_data += 1;
                    return true;
                }
                Some(false) => return false,
                None => {}
            }
        }
        false
    }

    /// Move back to the previous unskipped glyph, searching the output.
    pub(crate) fn prev(&mut self) -> bool {
        let out = self.ctx.buffer.out_info();
        while self.idx > 0 {
            self.idx -= 1;
            let Some(glyph) = out.get(self.idx) else {
                return false;
            };
            match self.step(glyph) {
                Some(true) => {
                    self.glyph_data += 1;
                    return true;
                }
                Some(false) => return false,
                None => {}
            }
        }
        false
    }

    // Some(matched) to stop, None to skip the glyph
    fn step(&self, info: &GlyphInfo) -> Option<bool> {
        let skip = self.may_skip(info);
        if skip == Skip::Yes {
            return None;
        }
        let matched = self.may_match(info);
        if matched == Match::Yes || (matched == Match::Maybe && skip == Skip::No) {
            return Some(true);
        }
        if skip == Skip::No {
            return Some(false);
        }
        None
    }

    pub(crate) fn may_skip(&self, info: &GlyphInfo) -> Skip {
        if !self.ctx.check_glyph_property(info, self.lookup_props) {
            return Skip::Yes;
        }
        if info.is_default_ignorable()
            && (self.ignore_zwnj || !info.is_zwnj())
            && (self.ignore_zwj || !info.is_zwj())
            && (self.ignore_hidden || !info.is_hidden())
        {
            return Skip::Maybe;
        }
        Skip::No
    }

    fn may_match(&self, info: &GlyphInfo) -> Match {
        if info.mask & self.mask == 0 {
            return Match::No;
        }
        if self.syllable != 0 && self.syllable != info.syllable() {
            return Match::No;
        }
        match self.matcher {
            Some(matcher) if matcher(info.glyph_id, self.glyph_data) => Match::Yes,
            Some(_) => Match::No,
            None => Match::Maybe,
        }
    }
}
