//! The glyph buffer that lookups are applied to.
//!
//! The buffer holds a run of [`GlyphInfo`] records and their
//! [`GlyphPosition`]s. Substitution passes read from the input records and
//! write to a separate output list, which replaces the input when the pass
//! is finished (see [`GlyphBuffer::sync`]); this lets lookups insert and
//! delete glyphs while the scan is in progress. Positioning passes work in
//! place.

use core::ops::{BitOr, BitOrAssign};

use otl_types::GlyphId;

use crate::digest::SetDigest;

/// The per-glyph property bits used while applying lookups.
///
/// The low byte holds these flags; the high byte of a glyph's properties
/// holds its mark attachment class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GlyphPropsFlags(u16);

impl GlyphPropsFlags {
    pub const BASE_GLYPH: Self = GlyphPropsFlags(0x02);
    pub const LIGATURE: Self = GlyphPropsFlags(0x04);
    pub const MARK: Self = GlyphPropsFlags(0x08);
    /// The union of the three glyph class flags.
    pub const CLASS_MASK: Self = GlyphPropsFlags(0x0E);

    /// The glyph was produced by a substitution.
    pub const SUBSTITUTED: Self = GlyphPropsFlags(0x10);
    /// The glyph was produced by a ligature substitution.
    pub const LIGATED: Self = GlyphPropsFlags(0x20);
    /// The glyph was produced by a multiple substitution.
    pub const MULTIPLIED: Self = GlyphPropsFlags(0x40);

    /// Flags kept when a glyph's class is reassigned after substitution.
    pub const PRESERVE: Self = GlyphPropsFlags(0x70);

    pub const fn empty() -> Self {
        GlyphPropsFlags(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        GlyphPropsFlags(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for GlyphPropsFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        GlyphPropsFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for GlyphPropsFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

/// Properties of the character a glyph came from, supplied by the caller.
///
/// These control whether a glyph can be skipped while matching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnicodeFlags(u8);

impl UnicodeFlags {
    /// A default-ignorable code point.
    pub const DEFAULT_IGNORABLE: Self = UnicodeFlags(0x01);
    /// U+200D ZERO WIDTH JOINER
    pub const ZWJ: Self = UnicodeFlags(0x02);
    /// U+200C ZERO WIDTH NON-JOINER
    pub const ZWNJ: Self = UnicodeFlags(0x04);
    /// A default-ignorable that must not be skipped, such as U+034F COMBINING GRAPHEME JOINER.
    pub const HIDDEN: Self = UnicodeFlags(0x08);

    pub const fn empty() -> Self {
        UnicodeFlags(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for UnicodeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        UnicodeFlags(self.0 | rhs.0)
    }
}

/// The text direction of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    pub fn is_vertical(self) -> bool {
        !self.is_horizontal()
    }

    /// `true` if glyphs are laid out in buffer order.
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    pub fn is_backward(self) -> bool {
        !self.is_forward()
    }
}

/// A glyph and its shaping state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphInfo {
    pub glyph_id: GlyphId,
    /// The source code point, if known; carried through unchanged.
    pub codepoint: u32,
    /// The index of the source text cluster this glyph belongs to.
    pub cluster: u32,
    /// The feature mask; a lookup only applies where its mask intersects this.
    pub mask: u32,
    pub(crate) glyph_props: u16,
    pub(crate) lig_id: u8,
    // component index, or the component count for a ligature base
    pub(crate) lig_comp: u8,
    pub(crate) lig_base: bool,
    pub(crate) syllable: u8,
    pub(crate) unicode_flags: UnicodeFlags,
}

impl GlyphInfo {
    pub fn new(glyph_id: GlyphId, cluster: u32) -> Self {
        GlyphInfo {
            glyph_id,
            cluster,
            ..Default::default()
        }
    }

    pub fn glyph_props(&self) -> GlyphPropsFlags {
        GlyphPropsFlags(self.glyph_props)
    }

    /// Set the glyph class (and mark attachment class) for fonts without GDEF classes.
    pub fn set_glyph_props(&mut self, props: GlyphPropsFlags) {
        self.glyph_props = props.bits();
    }

    pub fn is_base_glyph(&self) -> bool {
        self.glyph_props().intersects(GlyphPropsFlags::BASE_GLYPH)
    }

    pub fn is_ligature(&self) -> bool {
        self.glyph_props().intersects(GlyphPropsFlags::LIGATURE)
    }

    pub fn is_mark(&self) -> bool {
        self.glyph_props().intersects(GlyphPropsFlags::MARK)
    }

    pub fn is_substituted(&self) -> bool {
        self.glyph_props().intersects(GlyphPropsFlags::SUBSTITUTED)
    }

    pub fn is_ligated(&self) -> bool {
        self.glyph_props().intersects(GlyphPropsFlags::LIGATED)
    }

    pub fn is_multiplied(&self) -> bool {
        self.glyph_props().intersects(GlyphPropsFlags::MULTIPLIED)
    }

    /// The mark attachment class from GDEF, for marks.
    pub fn mark_attachment_class(&self) -> u8 {
        (self.glyph_props >> 8) as u8
    }

    /// The id shared by a ligature and the marks and components that belong to it.
    pub fn lig_id(&self) -> u8 {
        self.lig_id
    }

    /// The ligature component this glyph belongs to, or 0.
    pub fn lig_comp(&self) -> u8 {
        if self.lig_base {
            0
        } else {
            self.lig_comp
        }
    }

    /// The number of components of a ligature glyph; 1 for anything else.
    pub fn lig_num_comps(&self) -> u8 {
        if self.lig_base && self.is_ligature() {
            self.lig_comp
        } else {
            1
        }
    }

    pub(crate) fn set_lig_props_for_ligature(&mut self, lig_id: u8, num_comps: u8) {
        self.lig_id = lig_id;
        self.lig_comp = num_comps;
        self.lig_base = true;
    }

    pub(crate) fn set_lig_props_for_mark(&mut self, lig_id: u8, lig_comp: u8) {
        self.lig_id = lig_id;
        self.lig_comp = lig_comp;
        self.lig_base = false;
    }

    pub(crate) fn set_lig_props_for_component(&mut self, lig_comp: u8) {
        self.set_lig_props_for_mark(0, lig_comp);
    }

    pub(crate) fn clear_lig_props(&mut self) {
        self.set_lig_props_for_mark(0, 0);
    }

    /// A caller-assigned syllable index, for lookups applied per syllable.
    pub fn syllable(&self) -> u8 {
        self.syllable
    }

    pub fn set_syllable(&mut self, syllable: u8) {
        self.syllable = syllable;
    }

    pub fn unicode_flags(&self) -> UnicodeFlags {
        self.unicode_flags
    }

    pub fn set_unicode_flags(&mut self, flags: UnicodeFlags) {
        self.unicode_flags = flags;
    }

    /// Default ignorables that survived ligation are skippable.
    pub(crate) fn is_default_ignorable(&self) -> bool {
        self.unicode_flags
            .contains(UnicodeFlags::DEFAULT_IGNORABLE)
            && !self.is_ligated()
    }

    pub(crate) fn is_zwj(&self) -> bool {
        self.unicode_flags.contains(UnicodeFlags::ZWJ)
    }

    pub(crate) fn is_zwnj(&self) -> bool {
        self.unicode_flags.contains(UnicodeFlags::ZWNJ)
    }

    pub(crate) fn is_hidden(&self) -> bool {
        self.unicode_flags.contains(UnicodeFlags::HIDDEN)
    }
}

/// How a glyph is attached to the glyph named by its attach chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) enum AttachType {
    #[default]
    None,
    Mark,
    Cursive,
}

/// The position of a glyph, in font units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphPosition {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    // relative index of the glyph this one is attached to; resolved and
    // cleared by the finishing passes
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) attach_chain: i16,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) attach_type: AttachType,
}

impl GlyphPosition {
    pub fn new(x_advance: i32, y_advance: i32) -> Self {
        GlyphPosition {
            x_advance,
            y_advance,
            ..Default::default()
        }
    }

    /// `true` if the glyph is still waiting for an attachment to be resolved.
    pub fn has_pending_attachment(&self) -> bool {
        self.attach_chain != 0
    }
}

/// A run of glyphs being shaped.
#[derive(Clone, Debug, Default)]
pub struct GlyphBuffer {
    pub(crate) info: Vec<GlyphInfo>,
    pub(crate) pos: Vec<GlyphPosition>,
    out_info: Vec<GlyphInfo>,
    pub(crate) have_output: bool,
    pub(crate) idx: usize,
    direction: Direction,
    serial: u8,
    // false once an edit was refused for exceeding max_len
    successful: bool,
    pub(crate) max_len: usize,
    pub(crate) max_ops: isize,
    pub(crate) digest: SetDigest,
    pub(crate) has_attachments: bool,
}

impl GlyphBuffer {
    pub fn new() -> Self {
        GlyphBuffer {
            successful: true,
            max_len: usize::MAX,
            max_ops: isize::MAX,
            ..Default::default()
        }
    }

    /// Append a glyph.
    pub fn push(&mut self, glyph_id: GlyphId, cluster: u32) {
        self.push_info(GlyphInfo::new(glyph_id, cluster));
    }

    /// Append a glyph with caller-provided state (mask, unicode flags, syllable).
    pub fn push_info(&mut self, info: GlyphInfo) {
        self.info.push(info);
        self.pos.push(GlyphPosition::default());
    }

    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    /// Remove all glyphs, keeping the direction.
    pub fn clear(&mut self) {
        let direction = self.direction;
        *self = GlyphBuffer::new();
        self.direction = direction;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        &self.info
    }

    pub fn glyph_infos_mut(&mut self) -> &mut [GlyphInfo] {
        &mut self.info
    }

    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        &self.pos
    }

    pub fn glyph_positions_mut(&mut self) -> &mut [GlyphPosition] {
        &mut self.pos
    }

    /// The glyph ids in the buffer, in order.
    pub fn glyph_ids(&self) -> impl Iterator<Item = GlyphId> + '_ {
        self.info.iter().map(|info| info.glyph_id)
    }

    /// Set the mask of every glyph.
    pub fn reset_masks(&mut self, mask: u32) {
        for info in &mut self.info {
            info.mask = mask;
        }
    }

    /// Set the `mask` bits to `value` for glyphs in clusters `cluster_start..cluster_end`.
    pub fn set_masks(&mut self, value: u32, mask: u32, cluster_start: u32, cluster_end: u32) {
        if mask == 0 {
            return;
        }
        let value = value & mask;
        for info in self
            .info
            .iter_mut()
            .filter(|info| cluster_start <= info.cluster && info.cluster < cluster_end)
        {
            info.mask = (info.mask & !mask) | value;
        }
    }

    /// Prepare for a shaping call.
    pub(crate) fn enter(&mut self, max_len: usize, max_ops: isize) {
        self.serial = 0;
        self.successful = true;
        self.max_len = max_len;
        self.max_ops = max_ops;
        self.have_output = false;
        self.idx = 0;
        self.out_info.clear();
        self.pos.resize(self.info.len(), GlyphPosition::default());
    }

    pub(crate) fn successful(&self) -> bool {
        self.successful
    }

    /// Recompute the digest of every glyph in the buffer.
    pub(crate) fn update_digest(&mut self) {
        self.digest = self.info.iter().map(|info| info.glyph_id).collect();
    }

    pub(crate) fn next_serial(&mut self) -> u8 {
        self.serial = self.serial.wrapping_add(1);
        // zero is reserved for "not part of a ligature"
        if self.serial == 0 {
            self.serial = 1;
        }
        self.serial
    }

    pub(crate) fn allocate_lig_id(&mut self) -> u8 {
        self.next_serial()
    }

    /// The glyph at `i` past the cursor.
    pub(crate) fn cur(&self, i: usize) -> &GlyphInfo {
        &self.info[self.idx + i]
    }

    pub(crate) fn cur_mut(&mut self, i: usize) -> &mut GlyphInfo {
        let idx = self.idx + i;
        &mut self.info[idx]
    }

    /// The glyphs before the cursor: the output when substituting, the input otherwise.
    pub(crate) fn out_info(&self) -> &[GlyphInfo] {
        if self.have_output {
            &self.out_info
        } else {
            &self.info
        }
    }

    /// The number of glyphs available before the cursor.
    pub(crate) fn backtrack_len(&self) -> usize {
        if self.have_output {
            self.out_info.len()
        } else {
            self.idx
        }
    }

    /// The number of glyphs at or after the cursor.
    pub(crate) fn lookahead_len(&self) -> usize {
        self.info.len() - self.idx
    }

    pub(crate) fn out_len(&self) -> usize {
        if self.have_output {
            self.out_info.len()
        } else {
            self.idx
        }
    }

    pub(crate) fn prev(&self) -> Option<&GlyphInfo> {
        self.out_info.last()
    }

    /// Start a substitution pass.
    pub(crate) fn clear_output(&mut self) {
        self.have_output = true;
        self.idx = 0;
        self.out_info.clear();
    }

    /// Finish a substitution pass, making the output the new input.
    ///
    /// If an edit was refused for exceeding the length limit the output is
    /// discarded and the input kept as it was before the pass.
    pub(crate) fn sync(&mut self) {
        debug_assert!(self.have_output);
        if self.successful {
            self.next_glyphs(self.info.len() - self.idx);
        }
        if self.successful {
            std::mem::swap(&mut self.info, &mut self.out_info);
            self.pos.resize(self.info.len(), GlyphPosition::default());
        }
        self.have_output = false;
        self.out_info.clear();
        self.idx = 0;
    }

    fn make_room_for(&mut self, num_out: usize) -> bool {
        if !self.successful {
            return false;
        }
        if self.out_info.len() + num_out > self.max_len {
            log::debug!("buffer length limit of {} reached", self.max_len);
            self.successful = false;
            return false;
        }
        true
    }

    /// Copy the current glyph to the output and advance.
    pub(crate) fn next_glyph(&mut self) {
        if self.have_output {
            if !self.make_room_for(1) {
                return;
            }
            self.out_info.push(self.info[self.idx]);
        }
        self.idx += 1;
    }

    pub(crate) fn next_glyphs(&mut self, n: usize) {
        if self.have_output {
            if !self.make_room_for(n) {
                return;
            }
            self.out_info
                .extend_from_slice(&self.info[self.idx..self.idx + n]);
        }
        self.idx += n;
    }

    /// Advance without copying the current glyph to the output.
    pub(crate) fn skip_glyph(&mut self) {
        self.idx += 1;
    }

    /// Output the current glyph with a new id, and advance.
    pub(crate) fn replace_glyph(&mut self, glyph_id: GlyphId) {
        if !self.make_room_for(1) {
            return;
        }
        let mut info = self.info[self.idx];
        info.glyph_id = glyph_id;
        self.out_info.push(info);
        self.idx += 1;
    }

    /// Output a copy of the current glyph with a new id, without advancing.
    pub(crate) fn output_glyph(&mut self, glyph_id: GlyphId) -> Option<&mut GlyphInfo> {
        if !self.make_room_for(1) {
            return None;
        }
        let mut info = match self.info.get(self.idx) {
            Some(info) => *info,
            None => *self.out_info.last()?,
        };
        info.glyph_id = glyph_id;
        self.out_info.push(info);
        self.out_info.last_mut()
    }

    /// Move the cursor to position `i` of the logical sequence (output
    /// followed by the rest of the input).
    ///
    /// Moving backwards returns glyphs from the output to the input.
    pub(crate) fn move_to(&mut self, i: usize) -> bool {
        if !self.have_output {
            if i > self.info.len() {
                return false;
            }
            self.idx = i;
            return true;
        }
        if !self.successful {
            return false;
        }
        let out_len = self.out_info.len();
        if i > out_len + (self.info.len() - self.idx) {
            return false;
        }
        if out_len < i {
            let count = i - out_len;
            if !self.make_room_for(count) {
                return false;
            }
            self.out_info
                .extend_from_slice(&self.info[self.idx..self.idx + count]);
            self.idx += count;
        } else if out_len > i {
            // slots before idx have already been copied out, so they can be
            // overwritten; if there aren't enough of them the input grows
            let count = out_len - i;
            let start = self.idx.saturating_sub(count);
            let moved: Vec<_> = self.out_info.drain(i..).collect();
            self.info.splice(start..self.idx, moved);
            self.idx = start;
        }
        true
    }

    /// Set the cluster of glyphs `start..end` to the smallest among them,
    /// extending the range to cover whole clusters.
    pub(crate) fn merge_clusters(&mut self, start: usize, end: usize) {
        if end.saturating_sub(start) < 2 {
            return;
        }
        let mut start = start;
        let mut end = end;
        let cluster = self.info[start..end]
            .iter()
            .map(|info| info.cluster)
            .min()
            .unwrap_or_default();

        while end < self.info.len() && self.info[end - 1].cluster == self.info[end].cluster {
            end += 1;
        }
        while start > self.idx && self.info[start - 1].cluster == self.info[start].cluster {
            start -= 1;
        }

        // the cluster may continue into the output
        if self.have_output && self.idx == start {
            let old = self.info[start].cluster;
            for info in self
                .out_info
                .iter_mut()
                .rev()
                .take_while(|info| info.cluster == old)
            {
                info.cluster = cluster;
            }
        }

        for info in &mut self.info[start..end] {
            info.cluster = cluster;
        }
    }

    /// Remove the current glyph, merging its cluster into a neighbor.
    pub(crate) fn delete_glyph(&mut self) {
        let cluster = self.info[self.idx].cluster;
        if self.idx + 1 < self.info.len() && cluster == self.info[self.idx + 1].cluster {
            // the cluster survives
            self.skip_glyph();
            return;
        }

        if let Some(last) = self.out_info.last() {
            let old = last.cluster;
            if cluster < old {
                for info in self
                    .out_info
                    .iter_mut()
                    .rev()
                    .take_while(|info| info.cluster == old)
                {
                    info.cluster = cluster;
                }
            }
            self.skip_glyph();
            return;
        }

        if self.idx + 1 < self.info.len() {
            self.merge_clusters(self.idx, self.idx + 2);
        }
        self.skip_glyph();
    }

    /// Charge one operation against the budget; `false` once it is spent.
    pub(crate) fn consume_op(&mut self) -> bool {
        self.max_ops -= 1;
        self.max_ops > 0
    }

    pub(crate) fn ops_exhausted(&self) -> bool {
        self.max_ops <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(glyphs: &[u16]) -> GlyphBuffer {
        let mut buffer = GlyphBuffer::new();
        for (i, gid) in glyphs.iter().enumerate() {
            buffer.push(GlyphId::new(*gid), i as u32);
        }
        buffer.enter(1024, 1024);
        buffer
    }

    fn ids(buffer: &GlyphBuffer) -> Vec<u16> {
        buffer.glyph_ids().map(GlyphId::to_u16).collect()
    }

    #[test]
    fn output_pass_replaces_input() {
        let mut buf = buffer(&[1, 2, 3]);
        buf.clear_output();
        buf.replace_glyph(GlyphId::new(10));
        buf.output_glyph(GlyphId::new(11));
        buf.output_glyph(GlyphId::new(12));
        buf.skip_glyph();
        buf.sync();
        assert_eq!(ids(&buf), [10, 11, 12, 3]);
        assert_eq!(buf.glyph_positions().len(), 4);
        assert_eq!(buf.glyph_infos()[2].cluster, 1);
    }

    #[test]
    fn move_to_rewinds_into_input() {
        let mut buf = buffer(&[1, 2, 3, 4]);
        buf.clear_output();
        buf.next_glyph();
        // grow by one, so the rewind has to make room
        buf.output_glyph(GlyphId::new(20));
        buf.output_glyph(GlyphId::new(21));
        buf.skip_glyph();
        assert_eq!(buf.out_len(), 3);
        assert!(buf.move_to(1));
        assert_eq!(buf.out_len(), 1);
        assert_eq!(buf.cur(0).glyph_id, GlyphId::new(20));
        assert!(buf.move_to(5));
        buf.sync();
        assert_eq!(ids(&buf), [1, 20, 21, 3, 4]);
    }

    #[test]
    fn merge_clusters_takes_minimum() {
        let mut buf = buffer(&[1, 2, 3, 4]);
        buf.info[3].cluster = 2;
        buf.merge_clusters(1, 3);
        let clusters: Vec<_> = buf.glyph_infos().iter().map(|i| i.cluster).collect();
        // the cluster of glyph 2 continues into glyph 3
        assert_eq!(clusters, [0, 1, 1, 1]);
    }

    #[test]
    fn delete_merges_backward() {
        let mut buf = buffer(&[1, 2, 3]);
        buf.clear_output();
        buf.next_glyph();
        buf.info[1].cluster = 0;
        buf.delete_glyph();
        buf.next_glyph();
        buf.sync();
        assert_eq!(ids(&buf), [1, 3]);
    }

    #[test]
    fn length_limit_discards_pass() {
        let mut buf = buffer(&[1, 2]);
        buf.max_len = 3;
        buf.clear_output();
        buf.output_glyph(GlyphId::new(5));
        buf.output_glyph(GlyphId::new(6));
        buf.output_glyph(GlyphId::new(7));
        buf.output_glyph(GlyphId::new(8));
        assert!(!buf.successful());
        buf.sync();
        assert_eq!(ids(&buf), [1, 2]);
    }

    #[test]
    fn lig_ids_skip_zero() {
        let mut buf = buffer(&[]);
        let ids: Vec<_> = (0..300).map(|_| buf.allocate_lig_id()).collect();
        assert!(ids.iter().all(|id| *id != 0));
        assert_eq!(ids[0], 1);
        assert_eq!(ids[255], 1);
    }
}
