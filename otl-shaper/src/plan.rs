//! Resolving features to the lookups applied during shaping.
//!
//! A [`ShapePlan`] lists, for GSUB and for GPOS, the lookups to apply in
//! order along with the feature mask that gates each one. Lookups are
//! grouped into stages; a stage may end with a pause callback, which lets
//! a script shaper inspect or edit the buffer between groups of features.
//!
//! Plans can be assembled directly from stages (when feature resolution
//! happens elsewhere) or built from feature tags with a [`PlanBuilder`],
//! which selects the script and language system in each table and
//! allocates mask bits for every feature it finds.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Range};

use otl_types::Tag;

use crate::apply::TableKind;
use crate::buffer::{Direction, GlyphBuffer};
use crate::face::LayoutFace;
use crate::shape::ShapeConfig;
use crate::tables::layout::{LangSys, LayoutTable};

/// The largest value a feature can take.
///
/// Features with the [`RANDOM`](FeatureFlags::RANDOM) flag pick a random
/// alternate when set to this value.
pub const MAX_FEATURE_VALUE: u32 = (1 << MAX_FEATURE_BITS) - 1;
const MAX_FEATURE_BITS: u32 = 8;

/// The mask bit shared by every global feature with a value of 1.
const GLOBAL_BIT_SHIFT: u32 = 0;
const GLOBAL_BIT_MASK: u32 = 1 << GLOBAL_BIT_SHIFT;

/// How a feature is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeatureFlags(u8);

impl FeatureFlags {
    /// The feature applies to the whole buffer.
    pub const GLOBAL: Self = FeatureFlags(0x01);
    /// Zero width non-joiners are not skipped automatically while matching.
    pub const MANUAL_ZWNJ: Self = FeatureFlags(0x02);
    /// Zero width joiners are not skipped automatically while matching.
    pub const MANUAL_ZWJ: Self = FeatureFlags(0x04);
    pub const MANUAL_JOINERS: Self = FeatureFlags(0x06);
    /// Alternates are chosen at random when the feature has its maximum value.
    pub const RANDOM: Self = FeatureFlags(0x08);
    /// Matching does not cross syllable boundaries.
    pub const PER_SYLLABLE: Self = FeatureFlags(0x10);
    /// If the language system lacks the feature, use it from anywhere in the table.
    pub const GLOBAL_SEARCH: Self = FeatureFlags(0x20);

    pub const fn empty() -> Self {
        FeatureFlags(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FeatureFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        FeatureFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FeatureFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A lookup as scheduled by a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupMap {
    /// The index in the table's lookup list.
    pub index: u16,
    /// The lookup applies only to glyphs whose mask intersects this.
    pub mask: u32,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
    pub random: bool,
    pub per_syllable: bool,
}

impl LookupMap {
    /// A lookup applied to every glyph with the global feature bit set.
    pub fn new(index: u16) -> Self {
        LookupMap {
            index,
            mask: GLOBAL_BIT_MASK,
            auto_zwnj: true,
            auto_zwj: true,
            random: false,
            per_syllable: false,
        }
    }

    pub fn with_mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }
}

/// Called after the lookups of a stage have been applied.
///
/// Returns `true` if it changed the glyphs in the buffer.
pub type PauseFn = fn(&mut GlyphBuffer) -> bool;

/// A group of lookups applied together, optionally followed by a pause.
#[derive(Clone, Default)]
pub struct Stage {
    pub lookups: Vec<LookupMap>,
    pub pause: Option<PauseFn>,
}

impl Stage {
    pub fn new(lookups: Vec<LookupMap>) -> Self {
        Stage {
            lookups,
            pause: None,
        }
    }

    pub fn with_pause(mut self, pause: PauseFn) -> Self {
        self.pause = Some(pause);
        self
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("lookups", &self.lookups)
            .field("pause", &self.pause.is_some())
            .finish()
    }
}

/// A feature that was found in the font and assigned mask bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureMap {
    pub tag: Tag,
    /// The feature index in GSUB and GPOS.
    pub index: [Option<u16>; 2],
    pub stage: [usize; 2],
    /// The bits in the glyph mask that hold the feature value.
    pub mask: u32,
    /// The mask for a value of 1.
    pub one_mask: u32,
    pub shift: u32,
}

// a non-global feature value applied to a cluster range
#[derive(Clone, Debug)]
struct RangeFeature {
    tag: Tag,
    value: u32,
    clusters: Range<u32>,
}

/// The lookups to apply when shaping a run.
#[derive(Clone, Debug)]
pub struct ShapePlan {
    stages: [Vec<Stage>; 2],
    features: Vec<FeatureMap>,
    range_features: Vec<RangeFeature>,
    global_mask: u32,
    chosen_script: [Option<Tag>; 2],
    direction: Direction,
    config: ShapeConfig,
}

fn table_index(table: TableKind) -> usize {
    match table {
        TableKind::Gsub => 0,
        TableKind::Gpos => 1,
    }
}

impl ShapePlan {
    /// A plan made from externally resolved stages.
    ///
    /// Every glyph gets the global mask bit; each lookup's own mask decides
    /// where it applies.
    pub fn from_stages(gsub: Vec<Stage>, gpos: Vec<Stage>) -> Self {
        ShapePlan {
            stages: [gsub, gpos],
            features: Vec::new(),
            range_features: Vec::new(),
            global_mask: GLOBAL_BIT_MASK,
            chosen_script: [None; 2],
            direction: Direction::default(),
            config: ShapeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ShapeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    pub fn stages(&self, table: TableKind) -> &[Stage] {
        &self.stages[table_index(table)]
    }

    /// Iterate over all lookups of a table, in application order.
    pub fn lookups(&self, table: TableKind) -> impl Iterator<Item = &LookupMap> + '_ {
        self.stages(table)
            .iter()
            .flat_map(|stage| stage.lookups.iter())
    }

    /// The mask every glyph starts with.
    pub fn global_mask(&self) -> u32 {
        self.global_mask
    }

    /// The script tag selected in a table, if any script was found.
    pub fn chosen_script(&self, table: TableKind) -> Option<Tag> {
        self.chosen_script[table_index(table)]
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The features that made it into the plan, sorted by tag.
    pub fn features(&self) -> &[FeatureMap] {
        &self.features
    }

    pub fn feature(&self, tag: Tag) -> Option<&FeatureMap> {
        self.features
            .binary_search_by(|map| map.tag.cmp(&tag))
            .ok()
            .map(|idx| &self.features[idx])
    }

    /// The mask bits of a feature, or 0 if it is not in the plan.
    pub fn mask(&self, tag: Tag) -> u32 {
        self.feature(tag).map(|map| map.mask).unwrap_or(0)
    }

    /// Reset the masks of every glyph and apply range-limited features.
    ///
    /// This is the starting state expected by [`shape`](crate::shape);
    /// callers that manage masks themselves may skip it.
    pub fn setup_masks(&self, buffer: &mut GlyphBuffer) {
        buffer.reset_masks(self.global_mask);
        for feature in &self.range_features {
            self.set_feature_value(buffer, feature.tag, feature.value, feature.clusters.clone());
        }
    }

    /// Set the value of a feature for the glyphs in a cluster range.
    pub fn set_feature_value(
        &self,
        buffer: &mut GlyphBuffer,
        tag: Tag,
        value: u32,
        clusters: Range<u32>,
    ) {
        if let Some(map) = self.feature(tag) {
            buffer.set_masks(
                value.wrapping_shl(map.shift),
                map.mask,
                clusters.start,
                clusters.end,
            );
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct FeatureInfo {
    tag: Tag,
    // insertion order, for a stable sort
    seq: usize,
    max_value: u32,
    flags: FeatureFlags,
    default_value: u32,
    stage: [usize; 2],
}

#[derive(Clone, Copy, Debug)]
struct StagePause {
    stage: usize,
    pause: Option<PauseFn>,
}

/// Builds a [`ShapePlan`] from feature tags.
///
/// ```no_run
/// # use otl_shaper::{LayoutFace, PlanBuilder, Direction, FeatureFlags};
/// # use otl_types::Tag;
/// # let bytes = Vec::new();
/// let face = LayoutFace::new(&bytes).unwrap();
/// let mut builder = PlanBuilder::new(&face, Some(Tag::new(b"latn")), None, Direction::LeftToRight);
/// builder.enable_feature(Tag::new(b"liga"), FeatureFlags::empty(), 1);
/// builder.enable_feature(Tag::new(b"kern"), FeatureFlags::empty(), 1);
/// let plan = builder.build();
/// ```
pub struct PlanBuilder<'f, 'a> {
    face: &'f LayoutFace<'a>,
    script: Option<Tag>,
    language: Option<Tag>,
    direction: Direction,
    features: Vec<FeatureInfo>,
    range_features: Vec<RangeFeature>,
    current_stage: [usize; 2],
    pauses: [Vec<StagePause>; 2],
    config: ShapeConfig,
}

impl<'f, 'a> PlanBuilder<'f, 'a> {
    pub fn new(
        face: &'f LayoutFace<'a>,
        script: Option<Tag>,
        language: Option<Tag>,
        direction: Direction,
    ) -> Self {
        PlanBuilder {
            face,
            script,
            language,
            direction,
            features: Vec::new(),
            range_features: Vec::new(),
            current_stage: [0; 2],
            pauses: [Vec::new(), Vec::new()],
            config: ShapeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ShapeConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a feature; it applies wherever glyph masks enable it.
    pub fn add_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        let seq = self.features.len();
        self.features.push(FeatureInfo {
            tag,
            seq,
            max_value: value,
            flags,
            default_value: if flags.contains(FeatureFlags::GLOBAL) {
                value
            } else {
                0
            },
            stage: self.current_stage,
        });
    }

    /// Add a feature that applies to the whole buffer.
    pub fn enable_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        self.add_feature(tag, flags | FeatureFlags::GLOBAL, value);
    }

    /// Turn a feature off, overriding any earlier request for it.
    pub fn disable_feature(&mut self, tag: Tag) {
        self.add_feature(tag, FeatureFlags::GLOBAL, 0);
    }

    /// Set a feature to `value` for the glyphs in a cluster range.
    ///
    /// A range covering every cluster is the same as [`enable_feature`](Self::enable_feature).
    pub fn add_feature_range(&mut self, tag: Tag, value: u32, clusters: Range<u32>) {
        if clusters.start == 0 && clusters.end == u32::MAX {
            self.enable_feature(tag, FeatureFlags::empty(), value);
        } else {
            self.add_feature(tag, FeatureFlags::empty(), value);
            self.range_features.push(RangeFeature {
                tag,
                value,
                clusters,
            });
        }
    }

    /// Add the features applied to every run, whatever its script.
    pub fn add_default_features(&mut self) {
        const COMMON: &[(&[u8; 4], FeatureFlags)] = &[
            (b"abvm", FeatureFlags::empty()),
            (b"blwm", FeatureFlags::empty()),
            (b"ccmp", FeatureFlags::empty()),
            (b"locl", FeatureFlags::empty()),
            (b"mark", FeatureFlags::MANUAL_JOINERS),
            (b"mkmk", FeatureFlags::MANUAL_JOINERS),
            (b"rlig", FeatureFlags::empty()),
        ];
        const HORIZONTAL: &[&[u8; 4]] = &[
            b"calt", b"clig", b"curs", b"dist", b"kern", b"liga", b"rclt",
        ];

        match self.direction {
            Direction::LeftToRight => {
                self.enable_feature(Tag::new(b"ltra"), FeatureFlags::empty(), 1);
                self.enable_feature(Tag::new(b"ltrm"), FeatureFlags::empty(), 1);
            }
            Direction::RightToLeft => {
                self.enable_feature(Tag::new(b"rtla"), FeatureFlags::empty(), 1);
                self.add_feature(Tag::new(b"rtlm"), FeatureFlags::empty(), 1);
            }
            _ => {}
        }
        self.enable_feature(Tag::new(b"rand"), FeatureFlags::RANDOM, MAX_FEATURE_VALUE);
        for (tag, flags) in COMMON {
            self.enable_feature(Tag::new(tag), *flags, 1);
        }
        if self.direction.is_horizontal() {
            for tag in HORIZONTAL {
                self.enable_feature(Tag::new(tag), FeatureFlags::empty(), 1);
            }
        } else {
            self.enable_feature(Tag::new(b"vert"), FeatureFlags::GLOBAL_SEARCH, 1);
        }
    }

    /// End the current GSUB stage; `pause` runs after its lookups.
    pub fn add_gsub_pause(&mut self, pause: Option<PauseFn>) {
        self.add_pause(TableKind::Gsub, pause);
    }

    /// End the current GPOS stage; `pause` runs after its lookups.
    pub fn add_gpos_pause(&mut self, pause: Option<PauseFn>) {
        self.add_pause(TableKind::Gpos, pause);
    }

    fn add_pause(&mut self, table: TableKind, pause: Option<PauseFn>) {
        let idx = table_index(table);
        self.pauses[idx].push(StagePause {
            stage: self.current_stage[idx],
            pause,
        });
        self.current_stage[idx] += 1;
    }

    pub fn build(mut self) -> ShapePlan {
        let gsub = self.face.gsub();
        let gpos = self.face.gpos();
        let gsub_sys = select_lang_sys(gsub, self.script, self.language);
        let gpos_sys = select_lang_sys(gpos, self.script, self.language);
        let chosen_script = [
            gsub_sys.as_ref().map(|(tag, _)| *tag),
            gpos_sys.as_ref().map(|(tag, _)| *tag),
        ];
        let lang_sys = [
            gsub_sys.and_then(|(_, sys)| sys),
            gpos_sys.and_then(|(_, sys)| sys),
        ];
        let required = [
            lang_sys[0].and_then(|sys| sys.required_feature_index()),
            lang_sys[1].and_then(|sys| sys.required_feature_index()),
        ];

        let infos = merge_features(std::mem::take(&mut self.features));

        // allocate mask bits
        let mut global_mask = GLOBAL_BIT_MASK;
        let mut next_bit = GLOBAL_BIT_SHIFT + 1;
        let mut required_stage = [0usize; 2];
        let mut features = Vec::with_capacity(infos.len());
        for info in &infos {
            let global = info.flags.contains(FeatureFlags::GLOBAL);
            let bits_needed = if global && info.max_value == 1 {
                // uses the global bit
                0
            } else {
                bit_storage(info.max_value).min(MAX_FEATURE_BITS)
            };
            if info.max_value == 0 || next_bit + bits_needed > u32::BITS {
                continue;
            }

            let global_search = info.flags.contains(FeatureFlags::GLOBAL_SEARCH);
            let index = [
                find_feature(gsub, lang_sys[0].as_ref(), info.tag, global_search),
                find_feature(gpos, lang_sys[1].as_ref(), info.tag, global_search),
            ];
            for (table, index) in index.iter().enumerate() {
                if index.is_some() && *index == required[table] {
                    required_stage[table] = info.stage[table];
                }
            }
            if index == [None, None] {
                continue;
            }

            let (shift, mask) = if global && bits_needed == 0 {
                (GLOBAL_BIT_SHIFT, GLOBAL_BIT_MASK)
            } else {
                let shift = next_bit;
                let mask = (u32::MAX >> (u32::BITS - bits_needed)) << shift;
                next_bit += bits_needed;
                (shift, mask)
            };
            if global {
                global_mask |= (info.default_value << shift) & mask;
            }
            features.push((
                FeatureMap {
                    tag: info.tag,
                    index,
                    stage: info.stage,
                    mask,
                    one_mask: (1 << shift) & mask,
                    shift,
                },
                *info,
            ));
        }

        // collect lookups, stage by stage
        let mut stages: [Vec<Stage>; 2] = [Vec::new(), Vec::new()];
        for (table, table_stages) in stages.iter_mut().enumerate() {
            let mut pauses = self.pauses[table].iter().peekable();
            for stage in 0..=self.current_stage[table] {
                let mut lookups = Vec::new();
                if let Some(required) = required[table] {
                    if required_stage[table] == stage {
                        let map = LookupMap::new(0);
                        self.add_lookups(table, required, map, &mut lookups);
                    }
                }
                for (feature, info) in &features {
                    if feature.stage[table] != stage {
                        continue;
                    }
                    let Some(index) = feature.index[table] else {
                        continue;
                    };
                    let map = LookupMap {
                        index: 0,
                        mask: feature.mask,
                        auto_zwnj: !info.flags.contains(FeatureFlags::MANUAL_ZWNJ),
                        auto_zwj: !info.flags.contains(FeatureFlags::MANUAL_ZWJ),
                        random: info.flags.contains(FeatureFlags::RANDOM),
                        per_syllable: info.flags.contains(FeatureFlags::PER_SYLLABLE),
                    };
                    self.add_lookups(table, index, map, &mut lookups);
                }
                merge_lookups(&mut lookups);

                let pause = pauses
                    .next_if(|pause| pause.stage == stage)
                    .and_then(|pause| pause.pause);
                table_stages.push(Stage { lookups, pause });
            }
        }

        let mut features: Vec<_> = features.into_iter().map(|(map, _)| map).collect();
        features.sort_by_key(|map| map.tag);
        log::debug!(
            "plan: {} features, {} GSUB and {} GPOS lookups",
            features.len(),
            stages[0].iter().map(|s| s.lookups.len()).sum::<usize>(),
            stages[1].iter().map(|s| s.lookups.len()).sum::<usize>(),
        );

        ShapePlan {
            stages,
            features,
            range_features: self.range_features,
            global_mask,
            chosen_script,
            direction: self.direction,
            config: self.config,
        }
    }

    fn add_lookups(&self, table: usize, feature_index: u16, map: LookupMap, out: &mut Vec<LookupMap>) {
        let indices = if table == 0 {
            feature_lookup_indices(self.face.gsub(), feature_index)
        } else {
            feature_lookup_indices(self.face.gpos(), feature_index)
        };
        out.extend(indices.into_iter().map(|index| LookupMap { index, ..map }));
    }
}

fn select_lang_sys<'a, T>(
    table: &LayoutTable<'a, T>,
    script: Option<Tag>,
    language: Option<Tag>,
) -> Option<(Tag, Option<LangSys<'a>>)> {
    let (tag, script) = table.script_list().select(script.as_slice())?;
    Some((tag, script.lang_sys_or_default(language)))
}

fn find_feature<T>(
    table: &LayoutTable<T>,
    lang_sys: Option<&LangSys>,
    tag: Tag,
    global_search: bool,
) -> Option<u16> {
    lang_sys
        .and_then(|sys| table.find_feature_index(sys, tag))
        .or_else(|| {
            global_search
                .then(|| table.feature_index_for_tag(tag))
                .flatten()
        })
}

fn feature_lookup_indices<T>(table: &LayoutTable<T>, feature_index: u16) -> Vec<u16> {
    let lookup_count = table.lookup_count();
    table
        .feature_list()
        .get(feature_index)
        .map(|(_, feature)| {
            feature
                .lookup_list_indices()
                .iter()
                .filter(|idx| *idx < lookup_count)
                .collect()
        })
        .unwrap_or_default()
}

/// Sort features by tag and merge repeated requests for the same one.
///
/// A later global request replaces earlier ones; otherwise the largest
/// value wins, and the feature runs in the earliest stage it was added to.
fn merge_features(mut infos: Vec<FeatureInfo>) -> Vec<FeatureInfo> {
    infos.sort_by_key(|info| (info.tag, info.seq));
    let mut merged: Vec<FeatureInfo> = Vec::with_capacity(infos.len());
    for info in infos {
        match merged.last_mut() {
            Some(prev) if prev.tag == info.tag => {
                if info.flags.contains(FeatureFlags::GLOBAL) {
                    prev.flags |= FeatureFlags::GLOBAL;
                    prev.max_value = info.max_value;
                    prev.default_value = info.default_value;
                } else {
                    prev.flags = FeatureFlags(prev.flags.bits() & !FeatureFlags::GLOBAL.bits());
                    prev.max_value = prev.max_value.max(info.max_value);
                }
                prev.stage[0] = prev.stage[0].min(info.stage[0]);
                prev.stage[1] = prev.stage[1].min(info.stage[1]);
            }
            _ => merged.push(info),
        }
    }
    merged
}

/// Sort lookups by index and merge duplicates.
fn merge_lookups(lookups: &mut Vec<LookupMap>) {
    lookups.sort_by_key(|map| map.index);
    lookups.dedup_by(|next, prev| {
        if next.index != prev.index {
            return false;
        }
        prev.mask |= next.mask;
        prev.auto_zwnj &= next.auto_zwnj;
        prev.auto_zwj &= next.auto_zwj;
        prev.random |= next.random;
        true
    });
}

/// The number of bits needed to store `value`.
fn bit_storage(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(tag: &[u8; 4], seq: usize, flags: FeatureFlags, value: u32, stage: usize) -> FeatureInfo {
        FeatureInfo {
            tag: Tag::new(tag),
            seq,
            max_value: value,
            flags,
            default_value: if flags.contains(FeatureFlags::GLOBAL) {
                value
            } else {
                0
            },
            stage: [stage; 2],
        }
    }

    #[test]
    fn later_global_request_wins() {
        let merged = merge_features(vec![
            info(b"liga", 0, FeatureFlags::GLOBAL, 1, 1),
            info(b"kern", 1, FeatureFlags::GLOBAL, 1, 0),
            info(b"liga", 2, FeatureFlags::GLOBAL, 0, 0),
        ]);
        assert_eq!(merged.len(), 2);
        let liga = merged[1];
        assert_eq!(liga.tag, Tag::new(b"liga"));
        assert_eq!(liga.max_value, 0);
        assert_eq!(liga.stage, [0, 0]);
    }

    #[test]
    fn ranged_request_keeps_max_value() {
        let merged = merge_features(vec![
            info(b"salt", 0, FeatureFlags::GLOBAL, 1, 0),
            info(b"salt", 1, FeatureFlags::empty(), 3, 0),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].max_value, 3);
        assert!(!merged[0].flags.contains(FeatureFlags::GLOBAL));
        assert_eq!(merged[0].default_value, 1);
    }

    #[test]
    fn duplicate_lookups_merge_masks() {
        let mut lookups = vec![
            LookupMap::new(3).with_mask(0b100),
            LookupMap::new(1),
            LookupMap {
                auto_zwj: false,
                ..LookupMap::new(3).with_mask(0b010)
            },
        ];
        merge_lookups(&mut lookups);
        assert_eq!(lookups.len(), 2);
        assert_eq!(lookups[0].index, 1);
        assert_eq!(lookups[1].mask, 0b110);
        assert!(!lookups[1].auto_zwj);
    }

    #[test]
    fn bits() {
        assert_eq!(bit_storage(0), 0);
        assert_eq!(bit_storage(1), 1);
        assert_eq!(bit_storage(2), 2);
        assert_eq!(bit_storage(MAX_FEATURE_VALUE), 8);
    }
}
