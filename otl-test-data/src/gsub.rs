//! GSUB subtables.

use crate::bebuffer::BeBuffer;
use crate::layout::{assemble, class_def, coverage};

// https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#example-2-singlesubstformat1-subtable
#[rustfmt::skip]
pub static SINGLESUBSTFORMAT1_TABLE: &[u8] = &[
    0x00, 0x01, // format 1
    0x00, 0x06, // coverage offset
    0x00, 0xC0, // deltaGlyphID 192
    0x00, 0x02, // coverage format 2
    0x00, 0x01, // range count
    0x00, 0x4E, 0x00, 0x58, 0x00, 0x00, // 78..=88, start index 0
];

// https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#example-3-singlesubstformat2-subtable
#[rustfmt::skip]
pub static SINGLESUBSTFORMAT2_TABLE: &[u8] = &[
    0x00, 0x02, // format 2
    0x00, 0x0E, // coverage offset
    0x00, 0x04, // glyph count
    0x01, 0x31, 0x01, 0x35, 0x01, 0x3E, 0x01, 0x43, // 305, 309, 318, 323
    0x00, 0x01, // coverage format 1
    0x00, 0x04, // glyph count
    0x00, 0x3C, 0x00, 0x40, 0x00, 0x4B, 0x00, 0x4F, // 60, 64, 75, 79
];

// https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#example-4-multiplesubstformat1-subtable
#[rustfmt::skip]
pub static MULTIPLESUBSTFORMAT1_TABLE: &[u8] = &[
    0x00, 0x01, // format 1
    0x00, 0x08, // coverage offset
    0x00, 0x01, // sequence count
    0x00, 0x0E, // sequence offset
    0x00, 0x01, 0x00, 0x01, 0x00, 0xF1, // coverage: [241]
    0x00, 0x03, 0x00, 0x1A, 0x00, 0x1A, 0x00, 0x1D, // sequence: 26, 26, 29
];

// https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#example-5-alternatesubstformat-1-subtable
#[rustfmt::skip]
pub static ALTERNATESUBSTFORMAT1_TABLE: &[u8] = &[
    0x00, 0x01, // format 1
    0x00, 0x08, // coverage offset
    0x00, 0x01, // alternate set count
    0x00, 0x0E, // alternate set offset
    0x00, 0x01, 0x00, 0x01, 0x00, 0x3A, // coverage: [58]
    0x00, 0x02, 0x00, 0xC9, 0x00, 0xCA, // alternates: 201, 202
];

/// Single substitution, format 1: add `delta` to each glyph in `glyphs`.
pub fn single_subst_format1(glyphs: &[u16], delta: i16) -> Vec<u8> {
    let head = BeBuffer::new().push(1u16).push(0u16).push(delta);
    assemble(&head, vec![(2, coverage(glyphs))])
}

/// Single substitution, format 2, from `(glyph, substitute)` pairs sorted by glyph.
pub fn single_subst_format2(pairs: &[(u16, u16)]) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(2u16)
        .push(0u16)
        .push(pairs.len() as u16)
        .extend(pairs.iter().map(|(_, sub)| *sub));
    let glyphs: Vec<_> = pairs.iter().map(|(gid, _)| *gid).collect();
    assemble(&head, vec![(2, coverage(&glyphs))])
}

// the shared layout of multiple and alternate substitution
fn glyph_sequences(entries: &[(u16, &[u16])]) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(entries.len() as u16)
        .extend(entries.iter().map(|_| 0u16));
    let glyphs: Vec<_> = entries.iter().map(|(gid, _)| *gid).collect();
    let mut children = vec![(2, coverage(&glyphs))];
    for (i, (_, sequence)) in entries.iter().enumerate() {
        let sequence = BeBuffer::new()
            .push(sequence.len() as u16)
            .extend(sequence.iter().copied())
            .to_vec();
        children.push((6 + 2 * i, sequence));
    }
    assemble(&head, children)
}

/// Multiple substitution from `(glyph, sequence)` entries sorted by glyph.
///
/// An empty sequence deletes the glyph.
pub fn multiple_subst(entries: &[(u16, &[u16])]) -> Vec<u8> {
    glyph_sequences(entries)
}

/// Alternate substitution from `(glyph, alternates)` entries sorted by glyph.
pub fn alternate_subst(entries: &[(u16, &[u16])]) -> Vec<u8> {
    glyph_sequences(entries)
}

/// Ligature substitution from `(components, ligature)` rules.
///
/// Rules are grouped by first component; within a group they keep the
/// given order, which is the order they are tried in.
pub fn ligature_subst(rules: &[(&[u16], u16)]) -> Vec<u8> {
    let mut firsts: Vec<u16> = rules.iter().map(|(components, _)| components[0]).collect();
    firsts.sort();
    firsts.dedup();

    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(firsts.len() as u16)
        .extend(firsts.iter().map(|_| 0u16));
    let mut children = vec![(2, coverage(&firsts))];
    for (i, first) in firsts.iter().enumerate() {
        let ligatures: Vec<_> = rules
            .iter()
            .filter(|(components, _)| components[0] == *first)
            .map(|(components, ligature)| {
                BeBuffer::new()
                    .push(*ligature)
                    .push(components.len() as u16)
                    .extend(components[1..].iter().copied())
                    .to_vec()
            })
            .collect();
        let set_head = BeBuffer::new()
            .push(ligatures.len() as u16)
            .extend(ligatures.iter().map(|_| 0u16));
        let set = assemble(
            &set_head,
            ligatures
                .into_iter()
                .enumerate()
                .map(|(j, lig)| (2 + 2 * j, lig))
                .collect(),
        );
        children.push((6 + 2 * i, set));
    }
    assemble(&head, children)
}

/// Sequence context, format 3: one coverage per input position.
///
/// `records` are `(sequence index, lookup index)` pairs.
pub fn context_format3(input: &[&[u16]], records: &[(u16, u16)]) -> Vec<u8> {
    let mut head = BeBuffer::new()
        .push(3u16)
        .push(input.len() as u16)
        .push(records.len() as u16)
        .extend(input.iter().map(|_| 0u16));
    for (seq, lookup) in records {
        head = head.push(*seq).push(*lookup);
    }
    let children = input
        .iter()
        .enumerate()
        .map(|(i, glyphs)| (6 + 2 * i, coverage(glyphs)))
        .collect();
    assemble(&head, children)
}

// glyph count, lookup count, the input after its first glyph, then records
fn sequence_rule(rest: &[u16], records: &[(u16, u16)]) -> Vec<u8> {
    let mut rule = BeBuffer::new()
        .push(rest.len() as u16 + 1)
        .push(records.len() as u16)
        .extend(rest.iter().copied());
    for (seq, lookup) in records {
        rule = rule.push(*seq).push(*lookup);
    }
    rule.to_vec()
}

fn chained_rule(rule: &ChainedClassRule) -> Vec<u8> {
    let (backtrack, rest, lookahead, records) = *rule;
    let mut rule = BeBuffer::new()
        .push(backtrack.len() as u16)
        .extend(backtrack.iter().copied())
        .push(rest.len() as u16 + 1)
        .extend(rest.iter().copied())
        .push(lookahead.len() as u16)
        .extend(lookahead.iter().copied())
        .push(records.len() as u16);
    for (seq, lookup) in records {
        rule = rule.push(*seq).push(*lookup);
    }
    rule.to_vec()
}

fn rule_set(rules: Vec<Vec<u8>>) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(rules.len() as u16)
        .extend(rules.iter().map(|_| 0u16));
    assemble(
        &head,
        rules
            .into_iter()
            .enumerate()
            .map(|(i, rule)| (2 + 2 * i, rule))
            .collect(),
    )
}

/// Sequence context, format 1: glyph sequences keyed by first glyph.
///
/// Each rule is `(input glyphs, records)`; rules are grouped by their
/// first glyph.
pub fn context_format1(rules: &[(&[u16], &[(u16, u16)])]) -> Vec<u8> {
    let mut firsts: Vec<u16> = rules.iter().map(|(input, _)| input[0]).collect();
    firsts.sort();
    firsts.dedup();
    let head = BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(firsts.len() as u16)
        .extend(firsts.iter().map(|_| 0u16));
    let mut children = vec![(2, coverage(&firsts))];
    for (i, first) in firsts.iter().enumerate() {
        let rules = rules
            .iter()
            .filter(|(input, _)| input[0] == *first)
            .map(|(input, records)| sequence_rule(&input[1..], records))
            .collect();
        children.push((6 + 2 * i, rule_set(rules)));
    }
    assemble(&head, children)
}

/// Sequence context, format 2: rules on glyph classes.
///
/// `rule_sets[class]` holds the rules for input sequences whose first
/// glyph has that class, as `(classes after the first, records)`. Classes
/// without rules get a null rule set.
pub fn context_format2(
    covered: &[u16],
    classes: &[(u16, u16)],
    rule_sets: &[&[(&[u16], &[(u16, u16)])]],
) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(2u16)
        .push(0u16)
        .push(0u16)
        .push(rule_sets.len() as u16)
        .extend(rule_sets.iter().map(|_| 0u16));
    let mut children = vec![(2, coverage(covered)), (4, class_def(classes))];
    for (i, rules) in rule_sets.iter().enumerate() {
        if !rules.is_empty() {
            let rules = rules
                .iter()
                .map(|(rest, records)| sequence_rule(rest, records))
                .collect();
            children.push((8 + 2 * i, rule_set(rules)));
        }
    }
    assemble(&head, children)
}

/// A chained rule on classes: `(backtrack, input after the first,
/// lookahead, records)`, with the backtrack nearest first.
pub type ChainedClassRule<'r> = (&'r [u16], &'r [u16], &'r [u16], &'r [(u16, u16)]);

/// Chained sequence context, format 2: rules on glyph classes.
///
/// `class_defs` are the backtrack, input and lookahead class definitions;
/// an empty one is written as a null offset. `rule_sets` is indexed by the
/// input class of the first glyph, as in [`context_format2`].
pub fn chain_context_format2(
    covered: &[u16],
    class_defs: [&[(u16, u16)]; 3],
    rule_sets: &[&[ChainedClassRule]],
) -> Vec<u8> {
    let head = BeBuffer::new()
        .push(2u16)
        .extend([0u16; 4])
        .push(rule_sets.len() as u16)
        .extend(rule_sets.iter().map(|_| 0u16));
    let mut children = vec![(2, coverage(covered))];
    for (i, classes) in class_defs.iter().enumerate() {
        if !classes.is_empty() {
            children.push((4 + 2 * i, class_def(classes)));
        }
    }
    for (i, rules) in rule_sets.iter().enumerate() {
        if !rules.is_empty() {
            children.push((12 + 2 * i, rule_set(rules.iter().map(chained_rule).collect())));
        }
    }
    assemble(&head, children)
}

/// Chained sequence context, format 3.
///
/// Backtrack coverages are listed nearest to the input first.
pub fn chain_context_format3(
    backtrack: &[&[u16]],
    input: &[&[u16]],
    lookahead: &[&[u16]],
    records: &[(u16, u16)],
) -> Vec<u8> {
    let mut head = BeBuffer::new().push(3u16);
    let mut children = Vec::new();
    for group in [backtrack, input, lookahead] {
        head = head.push(group.len() as u16);
        for glyphs in group {
            children.push((head.len(), coverage(glyphs)));
            head = head.push(0u16);
        }
    }
    head = head.push(records.len() as u16);
    for (seq, lookup) in records {
        head = head.push(*seq).push(*lookup);
    }
    assemble(&head, children)
}

/// Reverse chaining single substitution.
///
/// `pairs` maps covered glyphs (sorted) to their substitutes.
pub fn reverse_chain_single_subst(
    pairs: &[(u16, u16)],
    backtrack: &[&[u16]],
    lookahead: &[&[u16]],
) -> Vec<u8> {
    let glyphs: Vec<_> = pairs.iter().map(|(gid, _)| *gid).collect();
    let mut head = BeBuffer::new().push(1u16).push(0u16);
    let mut children = vec![(2, coverage(&glyphs))];
    for group in [backtrack, lookahead] {
        head = head.push(group.len() as u16);
        for glyphs in group {
            children.push((head.len(), coverage(glyphs)));
            head = head.push(0u16);
        }
    }
    head = head
        .push(pairs.len() as u16)
        .extend(pairs.iter().map(|(_, sub)| *sub));
    assemble(&head, children)
}
