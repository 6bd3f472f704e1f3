//! The state shared by every subtable while a lookup is applied.

use otl_types::GlyphId;

use crate::buffer::{GlyphBuffer, GlyphInfo, GlyphPropsFlags};
use crate::tables::gdef::Gdef;
use crate::tables::gpos::PositionLookupList;
use crate::tables::gsub::SubstitutionLookupList;
use crate::tables::layout::LookupFlag;

use super::{Apply, MAX_CONTEXT_LENGTH, MAX_NESTING_LEVEL};

/// Which layout table a lookup belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableKind {
    Gsub,
    Gpos,
}

/// The lookup list nested lookups are resolved against.
#[derive(Clone, Copy)]
pub(crate) enum LookupSource<'t, 'a> {
    Gsub(&'t SubstitutionLookupList<'a>),
    Gpos(&'t PositionLookupList<'a>),
}

pub(crate) struct ApplyContext<'t, 'a> {
    pub(crate) table: TableKind,
    lookups: LookupSource<'t, 'a>,
    pub(crate) gdef: &'t Gdef<'a>,
    pub(crate) buffer: &'t mut GlyphBuffer,
    pub(crate) lookup_mask: u32,
    pub(crate) lookup_index: u16,
    pub(crate) lookup_props: u32,
    pub(crate) auto_zwnj: bool,
    pub(crate) auto_zwj: bool,
    pub(crate) per_syllable: bool,
    pub(crate) random: bool,
    random_state: u32,
    pub(crate) nesting_level_left: usize,
    max_nesting_level: usize,
    pub(crate) max_context_length: usize,
    pub(crate) ppem: u16,
    pub(crate) units_per_em: u16,
}

impl<'t, 'a> ApplyContext<'t, 'a> {
    pub(crate) fn new(
        lookups: LookupSource<'t, 'a>,
        gdef: &'t Gdef<'a>,
        buffer: &'t mut GlyphBuffer,
    ) -> Self {
        let table = match lookups {
            LookupSource::Gsub(_) => TableKind::Gsub,
            LookupSource::Gpos(_) => TableKind::Gpos,
        };
        ApplyContext {
            table,
            lookups,
            gdef,
            buffer,
            lookup_mask: 1,
            lookup_index: 0,
            lookup_props: 0,
            auto_zwnj: true,
            auto_zwj: true,
            per_syllable: false,
            random: false,
            random_state: 1,
            nesting_level_left: MAX_NESTING_LEVEL,
            max_nesting_level: MAX_NESTING_LEVEL,
            max_context_length: MAX_CONTEXT_LENGTH,
            ppem: 0,
            units_per_em: 0,
        }
    }

    pub(crate) fn with_limits(mut self, max_nesting_level: usize, max_context_length: usize) -> Self {
        self.nesting_level_left = max_nesting_level;
        self.max_nesting_level = max_nesting_level;
        self.max_context_length = max_context_length;
        self
    }

    pub(crate) fn with_instance(mut self, ppem: u16, units_per_em: u16) -> Self {
        self.ppem = ppem;
        self.units_per_em = units_per_em;
        self
    }

    /// `true` while applying a top-level lookup rather than a nested one.
    pub(crate) fn is_top_level(&self) -> bool {
        self.nesting_level_left == self.max_nesting_level
    }

    /// A deterministic pseudo-random number, for `rand`-style alternates.
    pub(crate) fn random_number(&mut self) -> u32 {
        // Park-Miller minimal standard generator
        self.random_state = ((self.random_state as u64 * 48271) % 2_147_483_647) as u32;
        self.random_state
    }

    /// Apply the lookup at `lookup_index` at the current position.
    pub(crate) fn recurse(&mut self, lookup_index: u16) -> Option<()> {
        if self.nesting_level_left == 0 {
            log::debug!("nesting limit reached applying lookup {lookup_index}");
            return None;
        }
        if !self.buffer.consume_op() {
            return None;
        }

        let saved_props = self.lookup_props;
        let saved_index = self.lookup_index;
        self.nesting_level_left -= 1;
        self.lookup_index = lookup_index;

        let lookups = self.lookups;
        let applied = match lookups {
            LookupSource::Gsub(list) => list.get(lookup_index).and_then(|lookup| {
                self.lookup_props = lookup.props();
                lookup.apply(self)
            }),
            LookupSource::Gpos(list) => list.get(lookup_index).and_then(|lookup| {
                self.lookup_props = lookup.props();
                lookup.apply(self)
            }),
        };

        self.nesting_level_left += 1;
        self.lookup_props = saved_props;
        self.lookup_index = saved_index;
        applied
    }

    /// `true` if `info` is not skipped by the lookup flags in `match_props`.
    pub(crate) fn check_glyph_property(&self, info: &GlyphInfo, match_props: u32) -> bool {
        let glyph_props = info.glyph_props().bits();
        let lookup_flags = match_props as u16;

        if glyph_props & lookup_flags & LookupFlag::IGNORE_FLAGS.to_bits() != 0 {
            return false;
        }

        if info.is_mark() {
            if lookup_flags & LookupFlag::USE_MARK_FILTERING_SET.to_bits() != 0 {
                return self
                    .gdef
                    .is_mark_glyph(info.glyph_id, (match_props >> 16) as u16);
            }
            // mark attachment type
            if lookup_flags & 0xFF00 != 0 {
                return lookup_flags & 0xFF00 == glyph_props & 0xFF00;
            }
        }
        true
    }

    /// Update the properties of the current glyph for a substitution.
    fn set_glyph_class(
        &mut self,
        glyph_id: GlyphId,
        class_guess: GlyphPropsFlags,
        ligature: bool,
        component: bool,
    ) {
        self.buffer.digest.add(glyph_id);

        let has_glyph_classes = self.gdef.has_glyph_classes();
        let new_props = if has_glyph_classes {
            Some(self.gdef.glyph_props(glyph_id))
        } else if class_guess != GlyphPropsFlags::empty() {
            Some(class_guess.bits())
        } else {
            None
        };

        let cur = self.buffer.cur_mut(0);
        let mut props = cur.glyph_props() | GlyphPropsFlags::SUBSTITUTED;
        if ligature {
            props |= GlyphPropsFlags::LIGATED;
            // a ligature formed from multiplied glyphs is no longer multiplied
            props = GlyphPropsFlags::from_bits(props.bits() & !GlyphPropsFlags::MULTIPLIED.bits());
        }
        if component {
            props |= GlyphPropsFlags::MULTIPLIED;
        }
        if let Some(new_props) = new_props {
            props = GlyphPropsFlags::from_bits(
                (props.bits() & GlyphPropsFlags::PRESERVE.bits()) | new_props,
            );
        }
        cur.set_glyph_props(props);
    }

    /// Output `glyph_id` in place of the current glyph and advance.
    pub(crate) fn replace_glyph(&mut self, glyph_id: GlyphId) {
        self.set_glyph_class(glyph_id, GlyphPropsFlags::empty(), false, false);
        self.buffer.replace_glyph(glyph_id);
    }

    /// Replace the current glyph without touching the output.
    pub(crate) fn replace_glyph_inplace(&mut self, glyph_id: GlyphId) {
        self.set_glyph_class(glyph_id, GlyphPropsFlags::empty(), false, false);
        self.buffer.cur_mut(0).glyph_id = glyph_id;
    }

    pub(crate) fn replace_glyph_with_ligature(&mut self, glyph_id: GlyphId, class: GlyphPropsFlags) {
        self.set_glyph_class(glyph_id, class, true, false);
        self.buffer.replace_glyph(glyph_id);
    }

    /// Output one component of a multiple substitution, without advancing.
    pub(crate) fn output_glyph_for_component(&mut self, glyph_id: GlyphId, class: GlyphPropsFlags) {
        self.set_glyph_class(glyph_id, class, false, true);
        self.buffer.output_glyph(glyph_id);
    }
}
