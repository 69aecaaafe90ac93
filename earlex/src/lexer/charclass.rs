//! Character ranges and classes.
//!
//! A range's `greatest` of `-1` means "up to and including the largest
//! codepoint". Classes keep literals and ranges overlap-free as they are
//! built; regularization and inversion work on plain range lists.

use std::collections::BTreeSet;
use std::fmt;

pub const MAX_CODEPOINT: i32 = 0x10FFFF;

/// A closed codepoint interval, possibly open-ended on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharacterRange {
    pub least: i32,
    pub greatest: i32,
}

impl CharacterRange {
    pub fn new(least: i32, greatest: i32) -> Self {
        debug_assert!(least >= 0);
        debug_assert!(greatest == -1 || greatest >= least);
        CharacterRange { least, greatest }
    }

    pub fn single(c: char) -> Self {
        CharacterRange::new(c as i32, c as i32)
    }

    pub fn open_ended(&self) -> bool {
        self.greatest < 0
    }

    /// The inclusive right bound with the open end made concrete.
    pub fn bounded_greatest(&self) -> i32 {
        if self.open_ended() {
            MAX_CODEPOINT
        } else {
            self.greatest
        }
    }

    pub fn contains(&self, c: char) -> bool {
        let c = c as i32;
        self.least <= c && c <= self.bounded_greatest()
    }
}

impl fmt::Display for CharacterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = char::from_u32(self.least as u32).unwrap_or('\u{FFFD}');
        if self.open_ended() {
            write!(f, "[{}-]", escape_class_char(lo))
        } else {
            let hi = char::from_u32(self.greatest as u32).unwrap_or('\u{FFFD}');
            write!(f, "[{}-{}]", escape_class_char(lo), escape_class_char(hi))
        }
    }
}

/// Sort and fuse a range list into a minimal, disjoint, ordered list with
/// the same union.
pub fn regularize(ranges: &[CharacterRange]) -> Vec<CharacterRange> {
    let mut sorted: Vec<CharacterRange> = ranges.to_vec();
    sorted.sort_by_key(|r| r.least);
    let mut out: Vec<CharacterRange> = Vec::new();
    for r in sorted {
        match out.last_mut() {
            Some(prev) if !prev.open_ended() && r.least <= prev.greatest + 1 => {
                if r.open_ended() {
                    prev.greatest = -1;
                } else if r.greatest > prev.greatest {
                    prev.greatest = r.greatest;
                }
            }
            Some(prev) if prev.open_ended() => break,
            _ => out.push(r),
        }
    }
    out
}

/// The complement of a regularized list with respect to `[0, max]`.
/// Inverting twice restores the input.
pub fn invert(regularized: &[CharacterRange]) -> Vec<CharacterRange> {
    let mut out = Vec::new();
    let mut next = 0i32;
    for r in regularized {
        if r.least > next {
            out.push(CharacterRange::new(next, r.least - 1));
        }
        if r.open_ended() {
            return out;
        }
        next = r.greatest + 1;
    }
    out.push(CharacterRange::new(next, -1));
    out
}

/// A character class: literals plus ranges, with optional negation.
/// Membership is `(literal or range hit) XOR negated`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterClass {
    negated: bool,
    literals: BTreeSet<char>,
    ranges: Vec<CharacterRange>,
}

impl CharacterClass {
    pub fn new() -> Self {
        CharacterClass::default()
    }

    pub fn negate(&mut self) {
        self.negated = !self.negated;
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn literals(&self) -> impl Iterator<Item = char> + '_ {
        self.literals.iter().copied()
    }

    pub fn ranges(&self) -> &[CharacterRange] {
        &self.ranges
    }

    /// Add a literal; rejected if it already sits inside the class.
    pub fn add_char(&mut self, c: char) -> bool {
        if self.ranges.iter().any(|r| r.contains(c)) {
            return false;
        }
        self.literals.insert(c)
    }

    /// Add a range; rejected if it overlaps existing content.
    pub fn add_range(&mut self, least: char, greatest: char) -> bool {
        let r = CharacterRange::new(least as i32, greatest as i32);
        if r.greatest < r.least {
            return false;
        }
        if self.literals.iter().any(|c| r.contains(*c)) {
            return false;
        }
        let overlaps = self
            .ranges
            .iter()
            .any(|old| old.bounded_greatest() >= r.least && r.bounded_greatest() >= old.least);
        if overlaps {
            return false;
        }
        self.ranges.push(r);
        true
    }

    pub fn contains(&self, c: char) -> bool {
        let hit = self.literals.contains(&c) || self.ranges.iter().any(|r| r.contains(c));
        hit != self.negated
    }

    /// Merge another class in (union of members; negation flags must
    /// already agree).
    pub fn union(&mut self, other: &CharacterClass) {
        for c in &other.literals {
            self.literals.insert(*c);
        }
        let mut all = self.ranges.clone();
        all.extend(other.ranges.iter().copied());
        self.ranges = regularize(&all);
        // Regularized ranges may now swallow literals.
        let ranges = &self.ranges;
        self.literals.retain(|c| !ranges.iter().any(|r| r.contains(*c)));
    }

    /// The concrete transition ranges of the class: regularized, and
    /// complemented for a negated class.
    pub fn to_ranges(&self) -> Vec<CharacterRange> {
        let mut all: Vec<CharacterRange> =
            self.literals.iter().map(|c| CharacterRange::single(*c)).collect();
        all.extend(self.ranges.iter().copied());
        let reg = regularize(&all);
        if self.negated {
            invert(&reg)
        } else {
            reg
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if self.negated {
            write!(f, "^")?;
        }
        for c in &self.literals {
            write!(f, "{}", escape_class_char(*c))?;
        }
        for r in &self.ranges {
            let lo = char::from_u32(r.least as u32).unwrap_or('\u{FFFD}');
            write!(f, "{}-", escape_class_char(lo))?;
            if !r.open_ended() {
                let hi = char::from_u32(r.greatest as u32).unwrap_or('\u{FFFD}');
                write!(f, "{}", escape_class_char(hi))?;
            }
        }
        write!(f, "]")
    }
}

pub(crate) fn escape_class_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        '\x0c' => "\\f".to_string(),
        '^' | '$' | '\\' | '-' | ']' | '[' => format!("\\{c}"),
        c if c.is_ascii_graphic() || c == ' ' => c.to_string(),
        c => format!("\\x{:04x}", c as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(lo: i32, hi: i32) -> CharacterRange {
        CharacterRange::new(lo, hi)
    }

    #[test]
    fn test_regularize_merges_overlap_and_adjacency() {
        let out = regularize(&[r(10, 20), r(2, 4), r(5, 7), r(15, 30)]);
        assert_eq!(out, vec![r(2, 7), r(10, 30)]);
    }

    #[test]
    fn test_regularize_keeps_widest_upper_bound() {
        let out = regularize(&[r(1, 10), r(2, 3)]);
        assert_eq!(out, vec![r(1, 10)]);
    }

    #[test]
    fn test_regularize_open_end() {
        let out = regularize(&[r(5, -1), r(0, 2), r(7, 9)]);
        assert_eq!(out, vec![r(0, 2), r(5, -1)]);
    }

    #[test]
    fn test_invert() {
        assert_eq!(invert(&[]), vec![r(0, -1)]);
        assert_eq!(invert(&[r(0, -1)]), Vec::<CharacterRange>::new());
        assert_eq!(invert(&[r(3, 5)]), vec![r(0, 2), r(6, -1)]);
        assert_eq!(
            invert(&[r(0, 2), r(5, 9)]),
            vec![r(3, 4), r(10, -1)]
        );
    }

    #[test]
    fn test_class_overlap_rejection() {
        let mut cc = CharacterClass::new();
        assert!(cc.add_range('a', 'z'));
        assert!(!cc.add_char('q'));
        assert!(cc.add_char('0'));
        assert!(!cc.add_range('0', '3'));
        assert!(cc.contains('m'));
        assert!(!cc.contains('A'));
        cc.negate();
        assert!(cc.contains('A'));
        assert!(!cc.contains('m'));
    }

    #[test]
    fn test_negated_to_ranges() {
        let mut cc = CharacterClass::new();
        cc.add_char('\n');
        cc.negate();
        let ranges = cc.to_ranges();
        assert_eq!(ranges, vec![r(0, 9), r(11, -1)]);
    }

    proptest! {
        #[test]
        fn prop_regularize_is_sorted_disjoint_same_union(
            raw in proptest::collection::vec((0i32..300, 0i32..50), 0..10)
        ) {
            let input: Vec<CharacterRange> =
                raw.iter().map(|(lo, len)| r(*lo, lo + len)).collect();
            let out = regularize(&input);
            for w in out.windows(2) {
                prop_assert!(w[0].greatest + 1 < w[1].least);
            }
            for x in 0..360u32 {
                let c = char::from_u32(x).unwrap();
                let in_input = input.iter().any(|iv| iv.contains(c));
                let in_out = out.iter().any(|iv| iv.contains(c));
                prop_assert_eq!(in_input, in_out);
            }
        }

        #[test]
        fn prop_invert_is_involutive(
            raw in proptest::collection::vec((0i32..300, 0i32..50), 0..10),
            open in proptest::bool::ANY
        ) {
            let mut input: Vec<CharacterRange> =
                raw.iter().map(|(lo, len)| r(*lo, lo + len)).collect();
            if open {
                input.push(r(301, -1));
            }
            let reg = regularize(&input);
            prop_assert_eq!(invert(&invert(&reg)), reg);
        }
    }
}
