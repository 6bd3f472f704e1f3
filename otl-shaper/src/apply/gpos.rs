//! Applying GPOS subtables, and resolving attachments once all lookups ran.

use crate::buffer::{AttachType, Direction, GlyphBuffer, GlyphPosition};
use crate::tables::gpos::{
    AnchorMatrix, CursivePosFormat1, MarkArray, MarkBasePosFormat1, MarkLigPosFormat1,
    MarkMarkPosFormat1, PairPos, PositionSubtable, SinglePos, ValueRecord,
};
use crate::tables::layout::LookupFlag;

use super::iter::SkippingIterator;
use super::{Apply, ApplyContext};

impl Apply for PositionSubtable<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        match self {
            PositionSubtable::Single(table) => table.apply(ctx),
            PositionSubtable::Pair(table) => table.apply(ctx),
            PositionSubtable::Cursive(table) => table.apply(ctx),
            PositionSubtable::MarkToBase(table) => table.apply(ctx),
            PositionSubtable::MarkToLigature(table) => table.apply(ctx),
            PositionSubtable::MarkToMark(table) => table.apply(ctx),
            PositionSubtable::Contextual(table) => table.apply(ctx),
            PositionSubtable::ChainContextual(table) => table.apply(ctx),
        }
    }
}

/// Add the adjustments of `record` to the glyph at `idx`.
///
/// Advance adjustments only apply along the direction of the run.
fn apply_value(ctx: &mut ApplyContext, record: &ValueRecord, idx: usize) {
    let adjustment = record.adjustment(ctx.ppem, ctx.units_per_em);
    let horizontal = ctx.buffer.direction().is_horizontal();
    let pos = &mut ctx.buffer.pos[idx];
    pos.x_offset += adjustment.x_placement;
    pos.y_offset += adjustment.y_placement;
    if horizontal {
        pos.x_advance += adjustment.x_advance;
    } else {
        // y advances grow downward in the buffer
        pos.y_advance -= adjustment.y_advance;
    }
}

impl Apply for SinglePos<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).glyph_id;
        let index = self.coverage().get(glyph)?;
        let record = self.value_record(index)?;
        apply_value(ctx, &record, ctx.buffer.idx);
        ctx.buffer.idx += 1;
        Some(())
    }
}

impl Apply for PairPos<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let first = ctx.buffer.cur(0).glyph_id;
        let index = self.coverage().get(first)?;

        let mut iter = SkippingIterator::new(ctx, ctx.buffer.idx, false);
        if !iter.next() {
            return None;
        }
        let second_idx = iter.index();
        let second = ctx.buffer.info[second_idx].glyph_id;

        let (record1, record2) = self.adjustments(index, first, second)?;
        apply_value(ctx, &record1, ctx.buffer.idx);
        apply_value(ctx, &record2, second_idx);

        // the second glyph is consumed only if it was adjusted
        ctx.buffer.idx = second_idx + usize::from(!record2.is_empty());
        Some(())
    }
}

impl Apply for CursivePosFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let this = ctx.buffer.cur(0).glyph_id;
        let entry = self.entry_anchor(self.coverage().get(this)?)?;

        let mut iter = SkippingIterator::new(ctx, ctx.buffer.idx, false);
        if !iter.prev() {
            return None;
        }
        let i = iter.index();
        let prev = ctx.buffer.info[i].glyph_id;
        let exit = self.exit_anchor(self.coverage().get(prev)?)?;

        let (exit_x, exit_y) = exit.position(ctx.ppem, ctx.units_per_em);
        let (entry_x, entry_y) = entry.position(ctx.ppem, ctx.units_per_em);

        let direction = ctx.buffer.direction();
        let right_to_left = ctx.lookup_props as u16 & LookupFlag::RIGHT_TO_LEFT.to_bits() != 0;
        let j = ctx.buffer.idx;
        let pos = &mut ctx.buffer.pos;

        // the exit of the previous glyph meets the entry of this one
        match direction {
            Direction::LeftToRight => {
                pos[i].x_advance = exit_x + pos[i].x_offset;
                let d = entry_x + pos[j].x_offset;
                pos[j].x_advance -= d;
                pos[j].x_offset -= d;
            }
            Direction::RightToLeft => {
                let d = exit_x + pos[i].x_offset;
                pos[i].x_advance -= d;
                pos[i].x_offset -= d;
                pos[j].x_advance = entry_x + pos[j].x_offset;
            }
            Direction::TopToBottom => {
                pos[i].y_advance = exit_y + pos[i].y_offset;
                let d = entry_y + pos[j].y_offset;
                pos[j].y_advance -= d;
                pos[j].y_offset -= d;
            }
            Direction::BottomToTop => {
                let d = exit_y + pos[i].y_offset;
                pos[i].y_advance -= d;
                pos[i].y_offset -= d;
                pos[j].y_advance = entry_y;
            }
        }

        // Cross-axis: the child aligns itself against its parent, and the
        // root of each chain stays on the baseline. Right-to-left lookups
        // make the earlier glyph the child.
        let (child, parent, x_offset, y_offset) = if right_to_left {
            (i, j, entry_x - exit_x, entry_y - exit_y)
        } else {
            (j, i, exit_x - entry_x, exit_y - entry_y)
        };

        // if the child was attached elsewhere, its old chain now hangs off the new parent
        reverse_cursive_minor_offset(pos, child, direction, parent);

        pos[child].attach_type = AttachType::Cursive;
        pos[child].attach_chain = (parent as isize - child as isize) as i16;
        if direction.is_horizontal() {
            pos[child].y_offset = y_offset;
        } else {
            pos[child].x_offset = x_offset;
        }

        // a parent attached to its own child is set free
        if pos[parent].attach_chain == -pos[child].attach_chain {
            pos[parent].attach_chain = 0;
            if direction.is_horizontal() {
                pos[parent].y_offset = 0;
            } else {
                pos[parent].x_offset = 0;
            }
        }

        ctx.buffer.has_attachments = true;
        ctx.buffer.idx += 1;
        Some(())
    }
}

/// Reverse the cursive chain starting at `i`, stopping at `new_parent`.
fn reverse_cursive_minor_offset(
    pos: &mut [GlyphPosition],
    i: usize,
    direction: Direction,
    new_parent: usize,
) {
    let mut links = Vec::new();
    let mut child = i;
    loop {
        let chain = pos[child].attach_chain;
        if chain == 0 || pos[child].attach_type != AttachType::Cursive {
            break;
        }
        pos[child].attach_chain = 0;
        let parent = (child as isize + chain as isize) as usize;
        if parent == new_parent || parent >= pos.len() {
            break;
        }
        links.push((child, parent, chain));
        child = parent;
    }

    // the far end of the chain is fixed up first
    for (child, parent, chain) in links.into_iter().rev() {
        if direction.is_horizontal() {
            pos[parent].y_offset = -pos[child].y_offset;
        } else {
            pos[parent].x_offset = -pos[child].x_offset;
        }
        pos[parent].attach_chain = -chain;
        pos[parent].attach_type = AttachType::Cursive;
    }
}

/// Attach the mark at the cursor to the glyph at `glyph_pos`.
fn attach_mark(
    ctx: &mut ApplyContext,
    marks: &MarkArray,
    anchors: &AnchorMatrix,
    mark_index: u16,
    glyph_index: u16,
    glyph_pos: usize,
) -> Option<()> {
    let (mark_class, mark_anchor) = marks.get(mark_index)?;
    let glyph_anchor = anchors.get(glyph_index, mark_class)?;

    let (mark_x, mark_y) = mark_anchor.position(ctx.ppem, ctx.units_per_em);
    let (base_x, base_y) = glyph_anchor.position(ctx.ppem, ctx.units_per_em);

    let idx = ctx.buffer.idx;
    let pos = &mut ctx.buffer.pos[idx];
    pos.x_offset = base_x - mark_x;
    pos.y_offset = base_y - mark_y;
    pos.attach_type = AttachType::Mark;
    pos.attach_chain = (glyph_pos as isize - idx as isize) as i16;

    ctx.buffer.has_attachments = true;
    ctx.buffer.idx += 1;
    Some(())
}

impl Apply for MarkBasePosFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let mark = ctx.buffer.cur(0).glyph_id;
        let mark_index = self.mark_coverage().get(mark)?;

        // search backwards for a non-mark glyph
        let mut iter = SkippingIterator::new(ctx, ctx.buffer.idx, false).ignore_marks();
        let info = &ctx.buffer.info;
        loop {
            if !iter.prev() {
                return None;
            }
            // Attach only to the first glyph of a multiple substitution,
            // unless a mark sits inside the sequence.
            let idx = iter.index();
            if !info[idx].is_multiplied()
                || info[idx].lig_comp() == 0
                || idx == 0
                || info[idx - 1].is_mark()
                || info[idx].lig_id() != info[idx - 1].lig_id()
                || info[idx].lig_comp() != info[idx - 1].lig_comp() + 1
            {
                break;
            }
        }

        let base_pos = iter.index();
        let base_index = self.base_coverage().get(info[base_pos].glyph_id)?;
        attach_mark(
            ctx,
            &self.mark_array(),
            &self.base_array(),
            mark_index,
            base_index,
            base_pos,
        )
    }
}

impl Apply for MarkLigPosFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let mark = ctx.buffer.cur(0);
        let mark_index = self.mark_coverage().get(mark.glyph_id)?;

        let mut iter = SkippingIterator::new(ctx, ctx.buffer.idx, false).ignore_marks();
        if !iter.prev() {
            return None;
        }
        let lig_pos = iter.index();
        let lig = &ctx.buffer.info[lig_pos];
        let lig_index = self.ligature_coverage().get(lig.glyph_id)?;
        let lig_attach = self.ligature_array().ligature_attach(lig_index)?;

        let comp_count = lig_attach.rows();
        if comp_count == 0 {
            return None;
        }

        // A mark that belongs to this ligature attaches to its own
        // component; any other mark goes on the last component.
        let lig_id = lig.lig_id();
        let mark_id = mark.lig_id();
        let mark_comp = mark.lig_comp() as u16;
        let matches = lig_id != 0 && lig_id == mark_id && mark_comp > 0;
        let comp_index = if matches {
            mark_comp.min(comp_count)
        } else {
            comp_count
        } - 1;

        attach_mark(
            ctx,
            &self.mark_array(),
            &lig_attach,
            mark_index,
            comp_index,
            lig_pos,
        )
    }
}

impl Apply for MarkMarkPosFormat1<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let mark1 = ctx.buffer.cur(0);
        let mark1_index = self.mark1_coverage().get(mark1.glyph_id)?;

        // search backwards for a mark, stopping at anything else
        let mut iter = SkippingIterator::new(ctx, ctx.buffer.idx, false);
        iter.set_lookup_props(ctx.lookup_props & !(LookupFlag::IGNORE_FLAGS.to_bits() as u32));
        if !iter.prev() {
            return None;
        }
        let mark2_pos = iter.index();
        let mark2 = &ctx.buffer.info[mark2_pos];
        if !mark2.is_mark() {
            return None;
        }

        let id1 = mark1.lig_id();
        let id2 = mark2.lig_id();
        let comp1 = mark1.lig_comp();
        let comp2 = mark2.lig_comp();
        let matches = if id1 == id2 {
            // marks on the same base, or the same ligature component
            id1 == 0 || comp1 == comp2
        } else {
            // one of the marks may itself be a ligature
            (id1 > 0 && comp1 == 0) || (id2 > 0 && comp2 == 0)
        };
        if !matches {
            return None;
        }

        let mark2_index = self.mark2_coverage().get(mark2.glyph_id)?;
        attach_mark(
            ctx,
            &self.mark1_array(),
            &self.mark2_array(),
            mark1_index,
            mark2_index,
            mark2_pos,
        )
    }
}

/// Resolve attachments recorded by cursive and mark positioning.
///
/// Each attached glyph has its offset made relative to the glyph it is
/// attached to, following chains of attachments to their root. Attachment
/// state is cleared afterwards.
pub(crate) fn position_finish(buffer: &mut GlyphBuffer) {
    if !buffer.has_attachments {
        return;
    }
    let direction = buffer.direction();
    let pos = &mut buffer.pos;
    let mut path = Vec::new();

    for i in 0..pos.len() {
        // collect the chain of unresolved attachments starting at i; each
        // link is cleared as it is visited, so cycles terminate
        let mut child = i;
        while pos[child].attach_chain != 0 {
            let chain = pos[child].attach_chain;
            pos[child].attach_chain = 0;
            let parent = child as isize + chain as isize;
            if parent < 0 || parent as usize >= pos.len() {
                break;
            }
            path.push((child, parent as usize, pos[child].attach_type));
            child = parent as usize;
        }

        // resolve from the root outward
        while let Some((child, parent, attach_type)) = path.pop() {
            propagate_offset(pos, child, parent, attach_type, direction);
        }
    }

    for pos in pos.iter_mut() {
        pos.attach_type = AttachType::None;
    }
    buffer.has_attachments = false;
}

fn propagate_offset(
    pos: &mut [GlyphPosition],
    child: usize,
    parent: usize,
    attach_type: AttachType,
    direction: Direction,
) {
    match attach_type {
        AttachType::Mark => {
            pos[child].x_offset += pos[parent].x_offset;
            pos[child].y_offset += pos[parent].y_offset;
            // the mark is positioned relative to its own origin, which
            // sits after the advances of the glyphs in between
            if parent < child {
                if direction.is_forward() {
                    for k in parent..child {
                        pos[child].x_offset -= pos[k].x_advance;
                        pos[child].y_offset -= pos[k].y_advance;
                    }
                } else {
                    for k in parent + 1..=child {
                        pos[child].x_offset += pos[k].x_advance;
                        pos[child].y_offset += pos[k].y_advance;
                    }
                }
            }
        }
        AttachType::Cursive => {
            if direction.is_horizontal() {
                pos[child].y_offset += pos[parent].y_offset;
            } else {
                pos[child].x_offset += pos[parent].x_offset;
            }
        }
        AttachType::None => {}
    }
}
