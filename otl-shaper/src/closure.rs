//! Glyph sets reachable through layout lookups.
//!
//! [`Gsub::closure_glyphs`] grows a set of glyphs with everything the given
//! substitution lookups can produce from it, repeating until the set stops
//! changing. `collect_glyphs` reports, for a single lookup, the glyphs it
//! may read as context, the glyphs it may match as input and, for GSUB, the
//! glyphs it may write.

use std::collections::HashMap;

use otl_types::GlyphId;

use crate::apply::MAX_NESTING_LEVEL;
use crate::collections::IntSet;
use crate::tables::gpos::{Gpos, PairPos, PositionSubtable};
use crate::tables::gsub::{Gsub, SubstitutionLookupList, SubstitutionSubtable};
use crate::tables::layout::{
    ChainedSequenceContext, ClassDef, CoverageTable, LookupList, SequenceContext,
    SequenceLookupRecord,
};

/// Closure stops after this many passes over the lookups.
const CLOSURE_MAX_STAGES: usize = 12;
/// Bound on lookup visits in a single closure pass.
const MAX_LOOKUP_VISIT_COUNT: usize = 35000;

/// The glyphs a lookup may touch, as reported by `collect_glyphs`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphSets {
    /// Glyphs matched as backtrack context.
    pub before: IntSet<GlyphId>,
    /// Glyphs matched as input.
    pub input: IntSet<GlyphId>,
    /// Glyphs matched as lookahead context.
    pub after: IntSet<GlyphId>,
    /// Glyphs written by substitutions, including those of nested lookups.
    pub output: IntSet<GlyphId>,
}

impl Gsub<'_> {
    /// Add to `glyphs` every glyph reachable from it through `lookups`.
    pub fn closure_glyphs(&self, lookups: &IntSet<u16>, glyphs: &mut IntSet<GlyphId>) {
        let mut ctx = ClosureCtx::new(self.lookup_list(), glyphs);
        for _ in 0..CLOSURE_MAX_STAGES {
            let len = ctx.glyphs.len();
            ctx.visits = 0;
            for index in lookups.iter() {
                ctx.closure_lookup(index);
                ctx.flush();
            }
            if ctx.glyphs.len() == len {
                return;
            }
        }
        log::debug!("glyph closure did not settle after {CLOSURE_MAX_STAGES} stages");
    }

    /// The glyphs the lookup at `lookup_index` may read and write.
    pub fn collect_glyphs(&self, lookup_index: u16) -> GlyphSets {
        collect_glyphs(self.lookup_list(), lookup_index)
    }
}

impl Gpos<'_> {
    /// The glyphs the lookup at `lookup_index` may read.
    ///
    /// The output set is always empty.
    pub fn collect_glyphs(&self, lookup_index: u16) -> GlyphSets {
        collect_glyphs(self.lookup_list(), lookup_index)
    }
}

struct ClosureCtx<'t, 'a> {
    lookups: &'t SubstitutionLookupList<'a>,
    /// The closure so far; only grows when a top-level lookup is flushed.
    glyphs: &'t mut IntSet<GlyphId>,
    output: IntSet<GlyphId>,
    /// The glyphs each nested lookup may be applied to.
    active: Vec<IntSet<GlyphId>>,
    nesting_left: usize,
    visits: usize,
    /// For each lookup: the closure size when it was last visited, and the
    /// active glyphs it has been visited with since.
    done: HashMap<u16, (u64, IntSet<GlyphId>)>,
}

impl<'t, 'a> ClosureCtx<'t, 'a> {
    fn new(lookups: &'t SubstitutionLookupList<'a>, glyphs: &'t mut IntSet<GlyphId>) -> Self {
        ClosureCtx {
            lookups,
            glyphs,
            output: IntSet::empty(),
            active: Vec::new(),
            nesting_left: MAX_NESTING_LEVEL,
            visits: 0,
            done: HashMap::new(),
        }
    }

    fn flush(&mut self) {
        self.glyphs.union(&self.output);
        self.output.clear();
        self.active.clear();
    }

    /// `false` if the lookup was already visited with these active glyphs.
    fn should_visit(&mut self, index: u16) -> bool {
        if self.visits >= MAX_LOOKUP_VISIT_COUNT {
            return false;
        }
        self.visits += 1;
        let active = self.active.last().unwrap_or(&*self.glyphs);
        let (len, covered) = self
            .done
            .entry(index)
            .or_insert_with(|| (u64::MAX, IntSet::empty()));
        if *len != self.glyphs.len() {
            *len = self.glyphs.len();
            covered.clear();
        }
        if active.is_subset(covered) {
            return false;
        }
        covered.union(active);
        true
    }

    fn closure_lookup(&mut self, index: u16) {
        let lookups = self.lookups;
        let Some(lookup) = lookups.get(index) else {
            return;
        };
        if !self.should_visit(index) {
            return;
        }
        for subtable in lookup.subtables() {
            let active = self.active.last().unwrap_or(&*self.glyphs);
            let mut nested = Vec::new();
            match subtable {
                SubstitutionSubtable::Contextual(context) => {
                    context_recursions(context, active, self.glyphs, &mut nested)
                }
                SubstitutionSubtable::ChainContextual(context) => {
                    chain_context_recursions(context, active, self.glyphs, &mut nested)
                }
                other => closure_subtable(other, active, self.glyphs, &mut self.output),
            }
            for (lookup_index, glyphs) in nested {
                self.recurse(lookup_index, glyphs);
            }
        }
    }

    fn recurse(&mut self, lookup_index: u16, active: IntSet<GlyphId>) {
        if self.nesting_left == 0 {
            log::debug!("closure nesting limit reached at lookup {lookup_index}");
            return;
        }
        self.nesting_left -= 1;
        self.active.push(active);
        self.closure_lookup(lookup_index);
        self.active.pop();
        self.nesting_left += 1;
    }
}

/// The glyphs a substitution subtable produces from `active`.
fn closure_subtable(
    subtable: &SubstitutionSubtable,
    active: &IntSet<GlyphId>,
    glyphs: &IntSet<GlyphId>,
    output: &mut IntSet<GlyphId>,
) {
    let covered = |coverage: CoverageTable| {
        coverage
            .iter()
            .enumerate()
            .filter(|(_, gid)| active.contains(*gid))
            .map(|(idx, gid)| (idx as u16, gid))
            .collect::<Vec<_>>()
    };
    match subtable {
        SubstitutionSubtable::Single(single) => {
            for (idx, gid) in covered(single.coverage()) {
                output.extend(single.substitute_for_index(gid, idx));
            }
        }
        SubstitutionSubtable::Multiple(multiple) => {
            for (idx, _) in covered(multiple.coverage()) {
                if let Some(sequence) = multiple.sequence(idx) {
                    output.extend(sequence.iter());
                }
            }
        }
        SubstitutionSubtable::Alternate(alternate) => {
            for (idx, _) in covered(alternate.coverage()) {
                if let Some(alternates) = alternate.alternate_set(idx) {
                    output.extend(alternates.iter());
                }
            }
        }
        SubstitutionSubtable::Ligature(ligature) => {
            for (idx, _) in covered(ligature.coverage()) {
                let Some(set) = ligature.ligature_set(idx) else {
                    continue;
                };
                for lig in set.ligatures() {
                    if lig.component_glyph_ids().iter().all(|gid| glyphs.contains(gid)) {
                        output.insert(lig.ligature_glyph());
                    }
                }
            }
        }
        SubstitutionSubtable::Reverse(reverse) => {
            let context_matches = (0..reverse.backtrack_glyph_count())
                .all(|i| reverse.backtrack_coverage(i).intersects(glyphs))
                && (0..reverse.lookahead_glyph_count())
                    .all(|i| reverse.lookahead_coverage(i).intersects(glyphs));
            if !context_matches {
                return;
            }
            let substitutes = reverse.substitute_glyph_ids();
            for (idx, _) in covered(reverse.coverage()) {
                output.extend(substitutes.get(idx as usize));
            }
        }
        SubstitutionSubtable::Contextual(_) | SubstitutionSubtable::ChainContextual(_) => (),
    }
}

/// Queue the nested lookups of a rule whose every input position can be
/// filled from the closure.
///
/// `positions` holds the glyphs that may appear at each input position.
fn push_rule_recursions(
    positions: Vec<IntSet<GlyphId>>,
    records: &[SequenceLookupRecord],
    nested: &mut Vec<(u16, IntSet<GlyphId>)>,
) {
    if positions.iter().any(IntSet::is_empty) {
        return;
    }
    for record in records {
        if let Some(glyphs) = positions.get(record.sequence_index() as usize) {
            nested.push((record.lookup_list_index(), glyphs.clone()));
        }
    }
}

fn single(glyph: GlyphId, glyphs: &IntSet<GlyphId>) -> IntSet<GlyphId> {
    let mut set = IntSet::empty();
    if glyphs.contains(glyph) {
        set.insert(glyph);
    }
    set
}

fn context_recursions(
    context: &SequenceContext,
    active: &IntSet<GlyphId>,
    glyphs: &IntSet<GlyphId>,
    nested: &mut Vec<(u16, IntSet<GlyphId>)>,
) {
    match context {
        SequenceContext::Format1(table) => {
            for (idx, first) in table.coverage().iter().enumerate() {
                if !active.contains(first) {
                    continue;
                }
                let Some(rule_set) = table.rule_set(idx as u16) else {
                    continue;
                };
                for rule in rule_set.rules() {
                    let positions = std::iter::once(single(first, active))
                        .chain(
                            rule.input_sequence()
                                .iter()
                                .map(|gid| single(GlyphId::new(gid), glyphs)),
                        )
                        .collect();
                    push_rule_recursions(positions, rule.seq_lookup_records(), nested);
                }
            }
        }
        SequenceContext::Format2(table) => {
            let start = table.coverage().intersect_set(active);
            let class_def = table.class_def();
            for class in 0..table.rule_set_count() as u16 {
                let Some(rule_set) = table.rule_set(class) else {
                    continue;
                };
                let first = class_def.intersected_class_glyphs(&start, class);
                if first.is_empty() {
                    continue;
                }
                for rule in rule_set.rules() {
                    let positions = std::iter::once(first.clone())
                        .chain(
                            rule.input_sequence()
                                .iter()
                                .map(|class| class_def.intersected_class_glyphs(glyphs, class)),
                        )
                        .collect();
                    push_rule_recursions(positions, rule.seq_lookup_records(), nested);
                }
            }
        }
        SequenceContext::Format3(table) => {
            let positions = (0..table.glyph_count())
                .map(|i| {
                    let source = if i == 0 { active } else { glyphs };
                    table.coverage(i).intersect_set(source)
                })
                .collect();
            push_rule_recursions(positions, table.seq_lookup_records(), nested);
        }
    }
}

fn classes_intersect(
    class_def: &ClassDef,
    classes: impl IntoIterator<Item = u16>,
    glyphs: &IntSet<GlyphId>,
) -> bool {
    classes
        .into_iter()
        .all(|class| class_def.intersects_class(glyphs, class))
}

fn chain_context_recursions(
    context: &ChainedSequenceContext,
    active: &IntSet<GlyphId>,
    glyphs: &IntSet<GlyphId>,
    nested: &mut Vec<(u16, IntSet<GlyphId>)>,
) {
    match context {
        ChainedSequenceContext::Format1(table) => {
            for (idx, first) in table.coverage().iter().enumerate() {
                if !active.contains(first) {
                    continue;
                }
                let Some(rule_set) = table.rule_set(idx as u16) else {
                    continue;
                };
                for rule in rule_set.rules() {
                    let context_matches = rule
                        .backtrack_sequence()
                        .iter()
                        .chain(rule.lookahead_sequence().iter())
                        .all(|gid| glyphs.contains(GlyphId::new(gid)));
                    if !context_matches {
                        continue;
                    }
                    let positions = std::iter::once(single(first, active))
                        .chain(
                            rule.input_sequence()
                                .iter()
                                .map(|gid| single(GlyphId::new(gid), glyphs)),
                        )
                        .collect();
                    push_rule_recursions(positions, rule.seq_lookup_records(), nested);
                }
            }
        }
        ChainedSequenceContext::Format2(table) => {
            let start = table.coverage().intersect_set(active);
            let input_class_def = table.input_class_def();
            for class in 0..table.rule_set_count() as u16 {
                let Some(rule_set) = table.rule_set(class) else {
                    continue;
                };
                let first = input_class_def.intersected_class_glyphs(&start, class);
                if first.is_empty() {
                    continue;
                }
                for rule in rule_set.rules() {
                    let context_matches = classes_intersect(
                        &table.backtrack_class_def(),
                        rule.backtrack_sequence().iter(),
                        glyphs,
                    ) && classes_intersect(
                        &table.lookahead_class_def(),
                        rule.lookahead_sequence().iter(),
                        glyphs,
                    );
                    if !context_matches {
                        continue;
                    }
                    let positions = std::iter::once(first.clone())
                        .chain(
                            rule.input_sequence()
                                .iter()
                                .map(|class| input_class_def.intersected_class_glyphs(glyphs, class)),
                        )
                        .collect();
                    push_rule_recursions(positions, rule.seq_lookup_records(), nested);
                }
            }
        }
        ChainedSequenceContext::Format3(table) => {
            let context_matches = (0..table.backtrack_glyph_count())
                .all(|i| table.backtrack_coverage(i).intersects(glyphs))
                && (0..table.lookahead_glyph_count())
                    .all(|i| table.lookahead_coverage(i).intersects(glyphs));
            if !context_matches {
                return;
            }
            let positions = (0..table.input_glyph_count())
                .map(|i| {
                    let source = if i == 0 { active } else { glyphs };
                    table.input_coverage(i).intersect_set(source)
                })
                .collect();
            push_rule_recursions(positions, table.seq_lookup_records(), nested);
        }
    }
}

/// A subtable type that can report the glyphs it touches.
trait CollectGlyphs: Sized {
    /// `false` for tables that never change glyphs; nested lookups in
    /// these tables have nothing to contribute.
    const PRODUCES_OUTPUT: bool;

    fn collect_glyphs(&self, c: &mut CollectCtx<Self>);
}

struct CollectCtx<'t, T> {
    lookups: &'t LookupList<T>,
    sets: GlyphSets,
    visited: IntSet<u16>,
    nesting_left: usize,
}

fn collect_glyphs<T: CollectGlyphs>(lookups: &LookupList<T>, lookup_index: u16) -> GlyphSets {
    let mut c = CollectCtx {
        lookups,
        sets: GlyphSets::default(),
        visited: IntSet::empty(),
        nesting_left: MAX_NESTING_LEVEL,
    };
    c.visited.insert(lookup_index);
    c.collect_lookup(lookup_index);
    c.sets
}

impl<T: CollectGlyphs> CollectCtx<'_, T> {
    fn collect_lookup(&mut self, index: u16) {
        let lookups = self.lookups;
        if let Some(lookup) = lookups.get(index) {
            for subtable in lookup.subtables() {
                subtable.collect_glyphs(self);
            }
        }
    }

    /// Collect only the output of the nested lookups of a contextual rule.
    fn recurse(&mut self, records: &[SequenceLookupRecord]) {
        if !T::PRODUCES_OUTPUT {
            return;
        }
        for record in records {
            let index = record.lookup_list_index();
            if self.nesting_left == 0 || !self.visited.insert(index) {
                continue;
            }
            let before = std::mem::take(&mut self.sets.before);
            let input = std::mem::take(&mut self.sets.input);
            let after = std::mem::take(&mut self.sets.after);
            self.nesting_left -= 1;
            self.collect_lookup(index);
            self.nesting_left += 1;
            self.sets.before = before;
            self.sets.input = input;
            self.sets.after = after;
        }
    }

    fn collect_context(&mut self, context: &SequenceContext) {
        match context {
            SequenceContext::Format1(table) => {
                table.coverage().add_coverage(&mut self.sets.input);
                for rule_set in (0..table.rule_set_count() as u16).filter_map(|i| table.rule_set(i)) {
                    for rule in rule_set.rules() {
                        self.sets
                            .input
                            .extend(rule.input_sequence().iter().map(GlyphId::new));
                        self.recurse(rule.seq_lookup_records());
                    }
                }
            }
            SequenceContext::Format2(table) => {
                table.coverage().add_coverage(&mut self.sets.input);
                let class_def = table.class_def();
                for rule_set in (0..table.rule_set_count() as u16).filter_map(|i| table.rule_set(i)) {
                    for rule in rule_set.rules() {
                        for class in rule.input_sequence().iter() {
                            class_def.add_class(class, &mut self.sets.input);
                        }
                        self.recurse(rule.seq_lookup_records());
                    }
                }
            }
            SequenceContext::Format3(table) => {
                for i in 0..table.glyph_count() {
                    table.coverage(i).add_coverage(&mut self.sets.input);
                }
                self.recurse(table.seq_lookup_records());
            }
        }
    }

    fn collect_chain_context(&mut self, context: &ChainedSequenceContext) {
        match context {
            ChainedSequenceContext::Format1(table) => {
                table.coverage().add_coverage(&mut self.sets.input);
                for rule_set in (0..table.rule_set_count() as u16).filter_map(|i| table.rule_set(i)) {
                    for rule in rule_set.rules() {
                        let sets = &mut self.sets;
                        sets.before
                            .extend(rule.backtrack_sequence().iter().map(GlyphId::new));
                        sets.input
                            .extend(rule.input_sequence().iter().map(GlyphId::new));
                        sets.after
                            .extend(rule.lookahead_sequence().iter().map(GlyphId::new));
                        self.recurse(rule.seq_lookup_records());
                    }
                }
            }
            ChainedSequenceContext::Format2(table) => {
                table.coverage().add_coverage(&mut self.sets.input);
                let backtrack = table.backtrack_class_def();
                let input = table.input_class_def();
                let lookahead = table.lookahead_class_def();
                for rule_set in (0..table.rule_set_count() as u16).filter_map(|i| table.rule_set(i)) {
                    for rule in rule_set.rules() {
                        let sets = &mut self.sets;
                        for class in rule.backtrack_sequence().iter() {
                            backtrack.add_class(class, &mut sets.before);
                        }
                        for class in rule.input_sequence().iter() {
                            input.add_class(class, &mut sets.input);
                        }
                        for class in rule.lookahead_sequence().iter() {
                            lookahead.add_class(class, &mut sets.after);
                        }
                        self.recurse(rule.seq_lookup_records());
                    }
                }
            }
            ChainedSequenceContext::Format3(table) => {
                let sets = &mut self.sets;
                for i in 0..table.backtrack_glyph_count() {
                    table.backtrack_coverage(i).add_coverage(&mut sets.before);
                }
                for i in 0..table.input_glyph_count() {
                    table.input_coverage(i).add_coverage(&mut sets.input);
                }
                for i in 0..table.lookahead_glyph_count() {
                    table.lookahead_coverage(i).add_coverage(&mut sets.after);
                }
                self.recurse(table.seq_lookup_records());
            }
        }
    }
}

impl CollectGlyphs for SubstitutionSubtable<'_> {
    const PRODUCES_OUTPUT: bool = true;

    fn collect_glyphs(&self, c: &mut CollectCtx<Self>) {
        let sets = &mut c.sets;
        match self {
            SubstitutionSubtable::Single(single) => {
                single.coverage().add_coverage(&mut sets.input);
                for (idx, gid) in single.coverage().iter().enumerate() {
                    sets.output
                        .extend(single.substitute_for_index(gid, idx as u16));
                }
            }
            SubstitutionSubtable::Multiple(multiple) => {
                multiple.coverage().add_coverage(&mut sets.input);
                for idx in 0..multiple.sequence_count() as u16 {
                    if let Some(sequence) = multiple.sequence(idx) {
                        sets.output.extend(sequence.iter());
                    }
                }
            }
            SubstitutionSubtable::Alternate(alternate) => {
                alternate.coverage().add_coverage(&mut sets.input);
                for idx in 0..alternate.alternate_set_count() as u16 {
                    if let Some(alternates) = alternate.alternate_set(idx) {
                        sets.output.extend(alternates.iter());
                    }
                }
            }
            SubstitutionSubtable::Ligature(ligature) => {
                ligature.coverage().add_coverage(&mut sets.input);
                for idx in 0..ligature.ligature_set_count() as u16 {
                    let Some(set) = ligature.ligature_set(idx) else {
                        continue;
                    };
                    for lig in set.ligatures() {
                        sets.input.extend(lig.component_glyph_ids().iter());
                        sets.output.insert(lig.ligature_glyph());
                    }
                }
            }
            SubstitutionSubtable::Reverse(reverse) => {
                reverse.coverage().add_coverage(&mut sets.input);
                for i in 0..reverse.backtrack_glyph_count() {
                    reverse.backtrack_coverage(i).add_coverage(&mut sets.before);
                }
                for i in 0..reverse.lookahead_glyph_count() {
                    reverse.lookahead_coverage(i).add_coverage(&mut sets.after);
                }
                sets.output.extend(reverse.substitute_glyph_ids().iter());
            }
            SubstitutionSubtable::Contextual(context) => c.collect_context(context),
            SubstitutionSubtable::ChainContextual(context) => c.collect_chain_context(context),
        }
    }
}

impl CollectGlyphs for PositionSubtable<'_> {
    const PRODUCES_OUTPUT: bool = false;

    fn collect_glyphs(&self, c: &mut CollectCtx<Self>) {
        let input = &mut c.sets.input;
        match self {
            PositionSubtable::Single(single) => single.coverage().add_coverage(input),
            PositionSubtable::Pair(PairPos::Format1(pair)) => {
                pair.coverage().add_coverage(input);
                for idx in 0..pair.pair_set_count() as u16 {
                    if let Some(set) = pair.pair_set(idx) {
                        input.extend(set.second_glyphs());
                    }
                }
            }
            PositionSubtable::Pair(PairPos::Format2(pair)) => {
                pair.coverage().add_coverage(input);
                input.extend(
                    pair.class_def2()
                        .iter()
                        .filter(|(_, class)| *class != 0)
                        .map(|(gid, _)| gid),
                );
            }
            PositionSubtable::Cursive(cursive) => cursive.coverage().add_coverage(input),
            PositionSubtable::MarkToBase(mark) => {
                mark.mark_coverage().add_coverage(input);
                mark.base_coverage().add_coverage(input);
            }
            PositionSubtable::MarkToLigature(mark) => {
                mark.mark_coverage().add_coverage(input);
                mark.ligature_coverage().add_coverage(input);
            }
            PositionSubtable::MarkToMark(mark) => {
                mark.mark1_coverage().add_coverage(input);
                mark.mark2_coverage().add_coverage(input);
            }
            PositionSubtable::Contextual(context) => c.collect_context(context),
            PositionSubtable::ChainContextual(context) => c.collect_chain_context(context),
        }
    }
}

#[cfg(test)]
#[path = "tests/closure.rs"]
mod tests;
