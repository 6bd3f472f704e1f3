//! Sequence matching, ligature formation and nested lookup application.

use otl_types::GlyphId;
use smallvec::SmallVec;

use crate::buffer::GlyphPropsFlags;
use crate::tables::layout::SequenceLookupRecord;

use super::iter::{MatchFn, Skip, SkippingIterator};
use super::ApplyContext;

pub(crate) type MatchPositions = SmallVec<[usize; 8]>;

/// The result of matching an input sequence at the cursor.
#[derive(Clone, Debug)]
pub(crate) struct InputMatch {
    /// The index of each matched glyph, starting with the cursor.
    pub(crate) positions: MatchPositions,
    /// One past the last matched glyph.
    pub(crate) end: usize,
    /// The sum of the component counts of the matched glyphs.
    pub(crate) total_component_count: u8,
}

/// Match `input_len` glyphs following the cursor.
///
/// The glyph at the cursor itself is assumed to have matched already (by
/// coverage); `matcher` is called with indices `0..input_len` for the
/// glyphs after it.
pub(crate) fn match_input(
    ctx: &ApplyContext,
    input_len: u16,
    matcher: &MatchFn,
) -> Option<InputMatch> {
    let count = input_len as usize + 1;
    if count > ctx.max_context_length {
        return None;
    }

    let buffer = &*ctx.buffer;
    let mut iter = SkippingIterator::new(ctx, buffer.idx, false).with_matcher(matcher);

    // Ligatures and their components can match only if every component
    // belongs to the same ligature, or none of them belong to any ligature
    // (with marks in between attached to the components of the first).
    let first = buffer.cur(0);
    let first_lig_id = first.lig_id();
    let first_lig_comp = first.lig_comp();

    let mut positions = MatchPositions::new();
    positions.push(buffer.idx);
    let mut total_component_count = first.lig_num_comps();

    #[derive(PartialEq)]
    enum LigBase {
        NotChecked,
        MayNotSkip,
        MaySkip,
    }
    let mut ligbase = LigBase::NotChecked;

    for _ in 1..count {
        if !iter.next() {
            return None;
        }
        let index = iter.index();
        positions.push(index);

        let this = &buffer.info[index];
        let this_lig_id = this.lig_id();
        let this_lig_comp = this.lig_comp();

        if first_lig_id != 0 && first_lig_comp != 0 {
            // first is a ligature component; the rest must belong to the
            // same ligature, unless it is a base that is already ignored
            if first_lig_id != this_lig_id || first_lig_comp != this_lig_comp {
                if ligbase == LigBase::NotChecked {
                    let out = buffer.out_info();
                    let mut found = false;
                    let mut j = buffer.out_len();
                    while j > 0 && out[j - 1].lig_id() == first_lig_id {
                        if out[j - 1].lig_comp() == 0 {
                            found = true;
                            j -= 1;
                            break;
                        }
                        j -= 1;
                    }
                    ligbase = if found && iter.may_skip(&out[j]) == Skip::Yes {
                        LigBase::MaySkip
                    } else {
                        LigBase::MayNotSkip
                    };
                }
                if ligbase == LigBase::MayNotSkip {
                    return None;
                }
            }
        } else if this_lig_id != 0 && this_lig_comp != 0 && this_lig_id != first_lig_id {
            // a component of a different ligature
            return None;
        }

        total_component_count = total_component_count.saturating_add(this.lig_num_comps());
    }

    Some(InputMatch {
        positions,
        end: iter.index() + 1,
        total_component_count,
    })
}

/// Match `len` glyphs before the cursor, nearest first.
///
/// Returns the index (into the output) of the earliest matched glyph.
pub(crate) fn match_backtrack(ctx: &ApplyContext, len: u16, matcher: &MatchFn) -> Option<usize> {
    let mut iter =
        SkippingIterator::new(ctx, ctx.buffer.backtrack_len(), true).with_matcher(matcher);
    for _ in 0..len {
        if !iter.prev() {
            return None;
        }
    }
    Some(iter.index())
}

/// Match `len` glyphs starting at `start`, which is one past the input.
///
/// Returns one past the last matched glyph.
pub(crate) fn match_lookahead(
    ctx: &ApplyContext,
    len: u16,
    matcher: &MatchFn,
    start: usize,
) -> Option<usize> {
    let mut iter = SkippingIterator::new(ctx, start - 1, true).with_matcher(matcher);
    for _ in 0..len {
        if !iter.next() {
            return None;
        }
    }
    Some(iter.index() + 1)
}

/// Replace a matched input sequence with a ligature glyph.
///
/// Marks between the components are kept, following the ligature, and are
/// assigned to the component they followed so that mark-to-ligature
/// positioning can find the right anchor.
pub(crate) fn ligate_input(
    ctx: &mut ApplyContext,
    matched: &InputMatch,
    lig_glyph: GlyphId,
) {
    let count = matched.positions.len();
    let positions = &matched.positions;
    let buffer = &mut *ctx.buffer;
    buffer.merge_clusters(buffer.idx, matched.end);

    // A ligature of only marks is itself a mark, and keeps whatever
    // ligature id the marks had. A ligature of a base with marks is not
    // really a ligature.
    let mut is_base_ligature = buffer.info[positions[0]].is_base_glyph();
    let mut is_mark_ligature = buffer.info[positions[0]].is_mark();
    for position in &positions[1..] {
        if !buffer.info[*position].is_mark() {
            is_base_ligature = false;
            is_mark_ligature = false;
        }
    }
    let is_ligature = !is_base_ligature && !is_mark_ligature;

    let class = if is_ligature {
        GlyphPropsFlags::LIGATURE
    } else {
        GlyphPropsFlags::empty()
    };
    let lig_id = if is_ligature {
        buffer.allocate_lig_id()
    } else {
        0
    };

    let first = buffer.cur(0);
    let mut last_lig_id = first.lig_id();
    let mut last_num_comps = first.lig_num_comps();
    let mut comps_so_far = last_num_comps;

    if is_ligature {
        buffer
            .cur_mut(0)
            .set_lig_props_for_ligature(lig_id, matched.total_component_count);
    }
    ctx.replace_glyph_with_ligature(lig_glyph, class);

    let buffer = &mut *ctx.buffer;
    for position in &positions[1..count] {
        while buffer.idx < *position && buffer.successful() {
            if is_ligature {
                let cur = buffer.cur(0);
                let this_comp = match cur.lig_comp() {
                    0 => last_num_comps,
                    comp => comp,
                };
                let new_lig_comp = comps_so_far
                    .saturating_sub(last_num_comps)
                    .saturating_add(this_comp.min(last_num_comps));
                buffer.cur_mut(0).set_lig_props_for_mark(lig_id, new_lig_comp);
            }
            buffer.next_glyph();
        }

        let cur = buffer.cur(0);
        last_lig_id = cur.lig_id();
        last_num_comps = cur.lig_num_comps();
        comps_so_far = comps_so_far.saturating_add(last_num_comps);

        // the component itself is dropped
        buffer.skip_glyph();
    }

    if !is_mark_ligature && last_lig_id != 0 {
        // marks following the last component still point at the old ligature
        for info in buffer.info[buffer.idx..].iter_mut() {
            if info.lig_id() != last_lig_id {
                break;
            }
            let this_comp = info.lig_comp();
            if this_comp == 0 {
                break;
            }
            let new_lig_comp = comps_so_far
                .saturating_sub(last_num_comps)
                .saturating_add(this_comp.min(last_num_comps));
            info.set_lig_props_for_mark(lig_id, new_lig_comp);
        }
    }
}

/// Apply the nested lookups of a matched context rule.
///
/// `positions` holds the matched input glyphs; nested lookups may change
/// the length of the buffer, in which case the remaining positions are
/// shifted to follow the glyphs they refer to.
pub(crate) fn apply_lookup_records(
    ctx: &mut ApplyContext,
    input: &mut InputMatch,
    records: &[SequenceLookupRecord],
) {
    let mut count = input.positions.len();
    let positions = &mut input.positions;

    // convert positions to the logical sequence (output, then input)
    let mut end = {
        let backtrack_len = ctx.buffer.backtrack_len();
        let idx = ctx.buffer.idx;
        for position in positions.iter_mut() {
            *position = *position + backtrack_len - idx;
        }
        backtrack_len + input.end - idx
    };

    for record in records {
        if !ctx.buffer.successful() {
            break;
        }
        let idx = record.sequence_index() as usize;
        if idx >= count {
            continue;
        }

        let orig_len = ctx.buffer.backtrack_len() + ctx.buffer.lookahead_len();

        // a previous record may have deleted the glyph this one targets
        if positions[idx] >= orig_len {
            continue;
        }
        if !ctx.buffer.move_to(positions[idx]) {
            break;
        }
        if ctx.buffer.ops_exhausted() {
            break;
        }

        if ctx.recurse(record.lookup_list_index()).is_none() {
            continue;
        }

        let new_len = ctx.buffer.backtrack_len() + ctx.buffer.lookahead_len();
        let mut delta = new_len as isize - orig_len as isize;
        if delta == 0 {
            continue;
        }

        // The lookup matched somewhere in the range starting at
        // positions[idx]; glyphs after that range have moved by delta.
        // may go negative if the lookup consumed glyphs past our match
        let moved_end = end as isize + delta;
        if moved_end < positions[idx] as isize {
            // the lookup removed glyphs before the end of our match; we
            // cannot tell where the removed glyphs were, so clamp
            delta += positions[idx] as isize - moved_end;
            end = positions[idx];
        } else {
            end = moved_end as usize;
        }

        let next = idx + 1;
        if delta > 0 {
            if delta as usize + count > ctx.max_context_length {
                break;
            }
        } else {
            // glyphs were removed
            delta = delta.max(next as isize - count as isize);
            let shrink = delta.unsigned_abs();
            positions.drain(next..next + shrink);
            count -= shrink;
        }

        if delta > 0 {
            let grow = delta as usize;
            let fill = positions[idx];
            positions.insert_many(next, std::iter::repeat_n(fill, grow));
            count += grow;
            for (k, position) in positions.iter_mut().enumerate().skip(next).take(grow) {
                *position = fill + k - idx;
            }
            for position in positions.iter_mut().skip(next + grow) {
                *position = (*position as isize + delta) as usize;
            }
        } else {
            for position in positions.iter_mut().skip(next) {
                *position = (*position as isize + delta) as usize;
            }
        }
    }

    ctx.buffer.move_to(end);
}
