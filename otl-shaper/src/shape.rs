//! Running a plan's lookups over a glyph buffer.

use crate::apply::{
    apply_lookup_to_buffer, position_finish, ApplyContext, LookupSource, TableKind,
    MAX_CONTEXT_LENGTH, MAX_NESTING_LEVEL,
};
use crate::buffer::{AttachType, GlyphBuffer};
use crate::face::LayoutFace;
use crate::plan::{LookupMap, ShapePlan};

/// The buffer may grow to this many times its initial length.
pub const MAX_LEN_FACTOR: usize = 64;
pub const MAX_LEN_MIN: usize = 16384;
/// Lookups may perform this many operations per glyph.
pub const MAX_OPS_FACTOR: usize = 1024;
pub const MAX_OPS_MIN: usize = 16384;

/// Limits on the work done by a single call to [`shape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeConfig {
    /// How deeply contextual lookups may nest.
    pub max_nesting_level: usize,
    /// The longest glyph sequence a rule can match.
    pub max_context_length: usize,
    pub max_len_factor: usize,
    pub max_len_min: usize,
    pub max_ops_factor: usize,
    pub max_ops_min: usize,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        ShapeConfig {
            max_nesting_level: MAX_NESTING_LEVEL,
            max_context_length: MAX_CONTEXT_LENGTH,
            max_len_factor: MAX_LEN_FACTOR,
            max_len_min: MAX_LEN_MIN,
            max_ops_factor: MAX_OPS_FACTOR,
            max_ops_min: MAX_OPS_MIN,
        }
    }
}

impl ShapeConfig {
    /// The length a buffer of `len` glyphs may grow to.
    pub fn max_len(&self, len: usize) -> usize {
        len.saturating_mul(self.max_len_factor)
            .max(self.max_len_min)
    }

    /// The operation budget for a buffer of `len` glyphs.
    pub fn max_ops(&self, len: usize) -> isize {
        let ops = len
            .saturating_mul(self.max_ops_factor)
            .max(self.max_ops_min);
        isize::try_from(ops).unwrap_or(isize::MAX)
    }
}

/// Size settings that affect device table adjustments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Instance {
    /// Pixels per em; 0 disables hinting adjustments from device tables.
    pub ppem: u16,
    pub units_per_em: u16,
}

/// A problem that stopped shaping before every lookup was applied.
///
/// The buffer is still consistent when one of these is returned: it holds
/// the result of the lookups that did run.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A substitution would have grown the buffer past this many glyphs.
    #[error("the buffer would grow past {0} glyphs")]
    BufferTooLong(usize),
    #[error("the operation budget was exhausted")]
    OperationBudgetExhausted,
}

/// Apply the GSUB and then the GPOS lookups of `plan` to `buffer`.
///
/// Glyph masks are used as they are; call [`ShapePlan::setup_masks`] first
/// to start from the plan's defaults. On return, positions are final: all
/// cursive and mark attachments have been resolved.
pub fn shape(
    face: &LayoutFace,
    plan: &ShapePlan,
    buffer: &mut GlyphBuffer,
) -> Result<(), ShapeError> {
    let config = plan.config();
    let max_len = config.max_len(buffer.len());
    buffer.enter(max_len, config.max_ops(buffer.len()));

    substitute_start(face, buffer);
    buffer.update_digest();
    substitute(face, plan, buffer);

    position_start(face, buffer);
    position(face, plan, buffer);
    position_finish(buffer);

    if !buffer.successful() {
        Err(ShapeError::BufferTooLong(max_len))
    } else if buffer.ops_exhausted() {
        Err(ShapeError::OperationBudgetExhausted)
    } else {
        Ok(())
    }
}

/// Assign glyph classes from GDEF and clear ligature state.
///
/// Fonts without GDEF glyph classes keep whatever classes the caller set.
pub(crate) fn substitute_start(face: &LayoutFace, buffer: &mut GlyphBuffer) {
    let gdef = face.gdef();
    let has_classes = gdef.has_glyph_classes();
    for info in buffer.glyph_infos_mut() {
        if has_classes {
            info.glyph_props = gdef.glyph_props(info.glyph_id);
        }
        info.clear_lig_props();
    }
}

/// Reset positions to the default advances and clear attachments.
///
/// Horizontal advances come from `hmtx` when the face has it; otherwise
/// the advances the caller stored in the buffer are kept. Vertical runs
/// default to an advance of one em.
pub(crate) fn position_start(face: &LayoutFace, buffer: &mut GlyphBuffer) {
    let horizontal = buffer.direction().is_horizontal();
    let em = face.units_per_em() as i32;
    let GlyphBuffer { info, pos, .. } = buffer;
    for (info, pos) in info.iter().zip(pos.iter_mut()) {
        if horizontal {
            if let Some(advance) = face.advance(info.glyph_id) {
                pos.x_advance = advance;
            }
            pos.y_advance = 0;
        } else {
            pos.x_advance = 0;
            if pos.y_advance == 0 {
                pos.y_advance = -em;
            }
        }
        pos.x_offset = 0;
        pos.y_offset = 0;
        pos.attach_chain = 0;
        pos.attach_type = AttachType::None;
    }
    buffer.has_attachments = false;
}

fn configure(ctx: &mut ApplyContext, map: &LookupMap) {
    ctx.lookup_index = map.index;
    ctx.lookup_mask = map.mask;
    ctx.auto_zwnj = map.auto_zwnj;
    ctx.auto_zwj = map.auto_zwj;
    ctx.random = map.random;
    ctx.per_syllable = map.per_syllable;
}

fn substitute(face: &LayoutFace, plan: &ShapePlan, buffer: &mut GlyphBuffer) {
    let lookups = face.gsub().lookup_list();
    let config = plan.config();
    let instance = face.instance();
    let mut ctx = ApplyContext::new(LookupSource::Gsub(lookups), face.gdef(), buffer)
        .with_limits(config.max_nesting_level, config.max_context_length)
        .with_instance(instance.ppem, instance.units_per_em);

    for stage in plan.stages(TableKind::Gsub) {
        for map in &stage.lookups {
            let Some(lookup) = lookups.get(map.index) else {
                continue;
            };
            if !lookup.digest().may_intersect(&ctx.buffer.digest) {
                continue;
            }
            configure(&mut ctx, map);
            let applied = apply_lookup_to_buffer(&mut ctx, lookup, lookup.is_reverse());
            log::trace!("GSUB lookup {} applied: {applied}", map.index);
            if ctx.buffer.ops_exhausted() || !ctx.buffer.successful() {
                log::debug!("stopping GSUB after lookup {}", map.index);
                return;
            }
        }
        if let Some(pause) = stage.pause {
            if pause(&mut *ctx.buffer) {
                ctx.buffer.update_digest();
            }
        }
    }
}

fn position(face: &LayoutFace, plan: &ShapePlan, buffer: &mut GlyphBuffer) {
    let lookups = face.gpos().lookup_list();
    let config = plan.config();
    let instance = face.instance();
    let mut ctx = ApplyContext::new(LookupSource::Gpos(lookups), face.gdef(), buffer)
        .with_limits(config.max_nesting_level, config.max_context_length)
        .with_instance(instance.ppem, instance.units_per_em);

    for stage in plan.stages(TableKind::Gpos) {
        for map in &stage.lookups {
            let Some(lookup) = lookups.get(map.index) else {
                continue;
            };
            if !lookup.digest().may_intersect(&ctx.buffer.digest) {
                continue;
            }
            configure(&mut ctx, map);
            let applied = apply_lookup_to_buffer(&mut ctx, lookup, false);
            log::trace!("GPOS lookup {} applied: {applied}", map.index);
            if ctx.buffer.ops_exhausted() {
                log::debug!("stopping GPOS after lookup {}", map.index);
                return;
            }
        }
        if let Some(pause) = stage.pause {
            if pause(&mut *ctx.buffer) {
                ctx.buffer.update_digest();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_scale_with_length() {
        let config = ShapeConfig::default();
        assert_eq!(config.max_len(10), MAX_LEN_MIN);
        assert_eq!(config.max_len(1000), 64_000);
        assert_eq!(config.max_ops(1), MAX_OPS_MIN as isize);
        assert_eq!(config.max_ops(100), 102_400);
        assert_eq!(config.max_ops(usize::MAX), isize::MAX);
    }
}
