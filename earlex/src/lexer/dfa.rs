//! Subset construction.
//!
//! Powerset states over precomputed ε-closures; outgoing transitions are
//! gathered from every covered NDFA node, wrapped in intervals carrying the
//! closure of their targets, and split into a disjoint partition. A state
//! accepts the terminal of the lowest-indexed termdef among its accepting
//! nodes, with the ignore expression outranking all of them.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::lexer::charclass::MAX_CODEPOINT;
use crate::lexer::interval::{resolve_merging, Interval};
use crate::lexer::ndfa::{Ndfa, NodeId};
use crate::particle::Particle;

/// One cell of a DFA state's transition partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaInterval {
    pub lower: i32,
    pub upper: i32,
    /// Successor state, or a dead cell.
    pub next: Option<usize>,
}

/// The accept action of a DFA state: emit `terminal` and resume in the
/// forward block's initial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaAccept {
    pub terminal: Particle,
    pub next: usize,
}

#[derive(Debug, Clone)]
pub struct DfaState {
    pub id: usize,
    /// Ordered intervals partitioning the codepoint space.
    pub intervals: Vec<DfaInterval>,
    pub accept: Option<DfaAccept>,
}

impl DfaState {
    /// The successor after consuming `c`, if the interval under `c` is
    /// live.
    pub fn query(&self, c: char) -> Option<usize> {
        let c = c as i32;
        let idx = self
            .intervals
            .partition_point(|iv| iv.upper < c);
        let iv = self.intervals.get(idx)?;
        if iv.lower <= c {
            iv.next
        } else {
            None
        }
    }
}

impl fmt::Display for DfaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.id)?;
        for iv in &self.intervals {
            match iv.next {
                Some(next) => writeln!(f, "     {:#06x}-{:#06x} [{}]", iv.lower, iv.upper, next)?,
                None => writeln!(f, "     {:#06x}-{:#06x} X", iv.lower, iv.upper)?,
            }
        }
        if let Some(acc) = &self.accept {
            writeln!(f, "     (accept) [{}]", acc.next)?;
        }
        Ok(())
    }
}

/// The combined automaton of a compiled lexer domain. `initial` is the
/// initial state of block 0.
#[derive(Debug)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub initial: usize,
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for st in &self.states {
            st.fmt(f)?;
        }
        Ok(())
    }
}

/// A block-local state produced by subset construction; accepts are still
/// symbolic (termdef index or ignore) until the domain wires the forward
/// blocks.
#[derive(Debug)]
pub(crate) struct ProtoState {
    pub intervals: Vec<DfaInterval>,
    /// `Some(None)` accepts the ignore expression; `Some(Some(i))` accepts
    /// termdef `i`.
    pub accept: Option<Option<usize>>,
}

pub(crate) fn subset_construct(ndfa: &Ndfa) -> Vec<ProtoState> {
    // Per-node ε-closures, computed once up front.
    let closures: Vec<Vec<NodeId>> = (0..ndfa.nodes.len())
        .map(|id| epsilon_closure(ndfa, id))
        .collect();

    let mut canon: HashMap<Vec<NodeId>, usize> = HashMap::new();
    let mut sets: Vec<Vec<NodeId>> = Vec::new();
    let mut intern = |set: Vec<NodeId>, sets: &mut Vec<Vec<NodeId>>| -> usize {
        if let Some(id) = canon.get(&set) {
            return *id;
        }
        let id = sets.len();
        canon.insert(set.clone(), id);
        sets.push(set);
        id
    };

    let initial = closures[ndfa.initial].clone();
    intern(initial, &mut sets);

    let mut proto: Vec<ProtoState> = Vec::new();
    let mut next_state = 0usize;
    while next_state < sets.len() {
        let set = sets[next_state].clone();
        next_state += 1;

        let mut inputs: Vec<Interval<BTreeSet<NodeId>>> = Vec::new();
        let mut best: Option<(i64, Option<usize>)> = None;
        for id in &set {
            let node = &ndfa.nodes[*id];
            for (c, targets) in &node.literals {
                inputs.push(Interval::new(
                    *c as i32,
                    *c as i32,
                    closure_union(&closures, targets),
                ));
            }
            for (r, targets) in &node.ranges {
                inputs.push(Interval::new(
                    r.least,
                    r.bounded_greatest(),
                    closure_union(&closures, targets),
                ));
            }
            if node.accepting {
                if let Some(origin) = node.origin {
                    let priority = match origin.termdef {
                        None => -1i64,
                        Some(i) => i as i64,
                    };
                    if best.map(|(p, _)| priority < p).unwrap_or(true) {
                        best = Some((priority, origin.termdef));
                    }
                }
            }
        }

        let merged = resolve_merging(&inputs, |a, b| a.union(b).copied().collect());

        let mut intervals = Vec::new();
        let mut cursor = 0i32;
        for cell in merged {
            if cell.lower > cursor {
                intervals.push(DfaInterval {
                    lower: cursor,
                    upper: cell.lower - 1,
                    next: None,
                });
            }
            let target: Vec<NodeId> = cell.payload.into_iter().collect();
            let target_id = intern(target, &mut sets);
            intervals.push(DfaInterval {
                lower: cell.lower,
                upper: cell.upper,
                next: Some(target_id),
            });
            cursor = cell.upper + 1;
        }
        if cursor <= MAX_CODEPOINT {
            intervals.push(DfaInterval {
                lower: cursor,
                upper: MAX_CODEPOINT,
                next: None,
            });
        }

        proto.push(ProtoState {
            intervals,
            accept: best.map(|(_, termdef)| termdef),
        });
    }
    proto
}

fn epsilon_closure(ndfa: &Ndfa, id: NodeId) -> Vec<NodeId> {
    let mut out = vec![id];
    let mut i = 0;
    while i < out.len() {
        let cur = out[i];
        i += 1;
        for next in &ndfa.nodes[cur].epsilons {
            if !out.contains(next) {
                out.push(*next);
            }
        }
    }
    out.sort_unstable();
    out
}

fn closure_union(closures: &[Vec<NodeId>], targets: &[NodeId]) -> BTreeSet<NodeId> {
    let mut set = BTreeSet::new();
    for t in targets {
        set.extend(closures[*t].iter().copied());
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::ndfa::{AcceptOrigin, NdfaBuilder};
    use crate::regex::parse::parse;

    fn compile(srcs: &[&str]) -> Vec<ProtoState> {
        let mut b = NdfaBuilder::new();
        let virtual_initial = b.add_node();
        for (i, src) in srcs.iter().enumerate() {
            let frag = parse(src).unwrap().emit(&mut b);
            b.mark_accepting(
                &frag,
                AcceptOrigin {
                    block: 0,
                    termdef: Some(i),
                },
            );
            b.epsilon_edge(virtual_initial, frag.start);
        }
        subset_construct(&b.finish(virtual_initial))
    }

    fn walk(states: &[ProtoState], input: &str) -> Option<usize> {
        let mut cur = 0usize;
        for c in input.chars() {
            let x = c as i32;
            let idx = states[cur].intervals.partition_point(|iv| iv.upper < x);
            let iv = states[cur].intervals.get(idx)?;
            if iv.lower > x {
                return None;
            }
            cur = iv.next?;
        }
        Some(cur)
    }

    #[test]
    fn test_partition_covers_space() {
        let states = compile(&["[a-z]+", "0|[1-9][0-9]*"]);
        for st in &states {
            assert_eq!(st.intervals.first().unwrap().lower, 0);
            assert_eq!(st.intervals.last().unwrap().upper, MAX_CODEPOINT);
            for w in st.intervals.windows(2) {
                assert_eq!(w[0].upper + 1, w[1].lower);
            }
        }
    }

    #[test]
    fn test_lowest_termdef_wins() {
        let states = compile(&["if", "[a-z]+"]);
        let after_if = walk(&states, "if").unwrap();
        assert_eq!(states[after_if].accept, Some(Some(0)));
        let after_ifx = walk(&states, "ifx").unwrap();
        assert_eq!(states[after_ifx].accept, Some(Some(1)));
        let after_i = walk(&states, "i").unwrap();
        assert_eq!(states[after_i].accept, Some(Some(1)));
    }

    #[test]
    fn test_dead_input_has_no_transition(){
        let states = compile(&["[a-z]+"]);
        assert!(walk(&states, "9").is_none());
        assert!(walk(&states, "a9").is_none());
    }
}
