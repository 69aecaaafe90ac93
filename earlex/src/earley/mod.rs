//! The Earley recognizer over the ε-LR(0) automaton.
//!
//! A chart cell per input position holds entries `(dfa_state, parent)`
//! linked by causal pairs. Scanning moves over terminal edges, completion
//! replays reductions against the parent cell, and the kernel/non-kernel
//! ε-edges carry predictions. The recognizer is purely sequential; one
//! parse invocation owns its chart.

pub mod chart;
pub mod tree;

use std::collections::HashMap;

use itertools::Itertools;

use crate::earley::chart::{Chart, Link};
use crate::earley::tree::{TreeBuilder, TreeNode};
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::index::IndexedGrammar;
use crate::lr::EpsilonLr0Dfa;
use crate::nnf::{is_nihilistic, nihilistic_augment, NnfInverse};
use crate::particle::Particle;
use crate::token::Token;

/// A generated parser: the conditioned grammar, its automaton, and the
/// inverse transform that maps trees back onto the grammar the caller
/// actually built.
pub struct EarleyParser {
    original: Grammar,
    dfa: EpsilonLr0Dfa,
    inverse: Option<NnfInverse>,
    nullable: Vec<bool>,
    nihilistic: Vec<bool>,
    /// Original terminal particle id → parse-grammar particle.
    bridge: HashMap<usize, Particle>,
}

impl EarleyParser {
    /// Condition the grammar (nihilistic normal form, when needed) and
    /// construct the automaton.
    pub fn generate(grammar: &Grammar) -> Result<Self> {
        let transform = nihilistic_augment(grammar)?;
        let dfa = EpsilonLr0Dfa::build(&transform.grammar)?;

        let parse_grammar = dfa.grammar();
        let ig = IndexedGrammar::new(parse_grammar);
        let basic = ig.basic()?;
        let mut nullable = vec![false; parse_grammar.num_particles()];
        let mut nihilistic = vec![false; parse_grammar.num_particles()];
        for nt in parse_grammar.nonterminals() {
            nullable[nt.id()] = basic.is_nullable(*nt);
            nihilistic[nt.id()] = is_nihilistic(&ig, *nt)?;
        }

        let mut bridge = HashMap::new();
        for t in grammar.terminals() {
            if let Some(p) = parse_grammar.particle_by_name(grammar.particle_name(*t)) {
                bridge.insert(t.id(), p);
            }
        }
        bridge.insert(grammar.bottom().id(), parse_grammar.bottom());

        Ok(EarleyParser {
            original: grammar.clone(),
            dfa,
            inverse: transform.inverse,
            nullable,
            nihilistic,
            bridge,
        })
    }

    /// The grammar the parser was generated from.
    pub fn grammar(&self) -> &Grammar {
        &self.original
    }

    /// The grammar the automaton actually runs on (the NNF augmentation,
    /// or a copy of the original when no conditioning was needed).
    pub fn parse_grammar(&self) -> &Grammar {
        self.dfa.grammar()
    }

    pub fn dfa(&self) -> &EpsilonLr0Dfa {
        &self.dfa
    }

    /// Run the recognizer over a token stream and materialize the syntax
    /// tree, mapped back onto the source grammar.
    ///
    /// The stream must deliver tokens of [`EarleyParser::grammar`]'s
    /// terminals and end with one `` `. `` token, as the lexer driver
    /// does.
    pub fn parse<I>(&self, tokens: I) -> Result<TreeNode>
    where
        I: IntoIterator<Item = Result<Token>>,
    {
        let g = self.dfa.grammar();
        let asterisk_id = g.asterisk().id();

        let mut chart = Chart::new();
        chart.add(0, 0, 0, None, None);
        if let Some(nk) = self.dfa.epsilon_successor(0) {
            chart.add(0, nk, 0, None, None);
        }

        let mut i = 0usize;
        let mut last_token: Option<Token> = None;

        for result in tokens {
            let token = result?;
            let term = self.bridge.get(&token.terminal.id()).copied().ok_or_else(|| {
                Error::Internal(format!(
                    "token terminal '{}' is not part of the grammar",
                    self.original.particle_name(token.terminal)
                ))
            })?;

            chart.push_cell();
            let mut j = 0;
            while j < chart.cells[i].len() {
                let entry_idx = chart.cells[i][j];
                j += 1;
                let (entry_state, entry_parent) = {
                    let e = &chart.entries[entry_idx];
                    (e.state, e.parent)
                };

                // Scan.
                if let Some(next) = self.dfa.goto(entry_state, term) {
                    chart.add(
                        i + 1,
                        next,
                        entry_parent,
                        Some(Link {
                            pred: entry_idx,
                            cause: None,
                        }),
                        Some(token.clone()),
                    );
                    if let Some(nk) = self.dfa.epsilon_successor(next) {
                        chart.add(i + 1, nk, i + 1, None, None);
                    }
                }

                // Complete. The current cell is not finished, so entries
                // parented here must wait for a later position.
                if entry_parent == i {
                    continue;
                }
                let reduced: Vec<usize> = self
                    .dfa
                    .state(entry_state)
                    .reductions
                    .keys()
                    .copied()
                    .collect();
                for lhs_id in reduced {
                    let lhs = particle_of(g, lhs_id);
                    let parent_len = chart.cells[entry_parent].len();
                    for k in 0..parent_len {
                        let pidx = chart.cells[entry_parent][k];
                        let (pstate, pparent) = {
                            let e = &chart.entries[pidx];
                            (e.state, e.parent)
                        };
                        if let Some(next) = self.dfa.goto(pstate, lhs) {
                            chart.add(
                                i,
                                next,
                                pparent,
                                Some(Link {
                                    pred: pidx,
                                    cause: Some(entry_idx),
                                }),
                                None,
                            );
                            if let Some(nk) = self.dfa.epsilon_successor(next) {
                                chart.add(i, nk, i, None, None);
                            }
                        }
                    }
                }
            }

            if chart.cells[i + 1].is_empty() {
                return Err(self.failure(&chart, i, Some(&token)));
            }
            last_token = Some(token);
            i += 1;
        }

        // Success means some final entry reduces the start particle.
        let accept = chart
            .last_cell()
            .iter()
            .copied()
            .find(|idx| {
                self.dfa
                    .state(chart.entries[*idx].state)
                    .reductions
                    .contains_key(&asterisk_id)
            })
            .ok_or_else(|| self.failure(&chart, i, last_token.as_ref()))?;

        let ig = IndexedGrammar::new(g);
        let builder = TreeBuilder {
            chart: &chart,
            dfa: &self.dfa,
            ig: &ig,
            nullable: &self.nullable,
            nihilistic: &self.nihilistic,
        };
        let full = builder.node_for(g.asterisk(), accept)?;
        let root = full
            .children
            .into_iter()
            .next()
            .ok_or_else(|| Error::Internal("initial production without children".into()))?;

        match &self.inverse {
            None => Ok(root),
            Some(inv) => {
                let orig_ig = IndexedGrammar::new(&self.original);
                inv.apply(&orig_ig, &root)
            }
        }
    }

    /// The terminals that would have let some entry at `pos` progress.
    fn failure(&self, chart: &Chart, pos: usize, token: Option<&Token>) -> Error {
        let g = self.dfa.grammar();
        let expected: Vec<String> = chart.cells[pos]
            .iter()
            .flat_map(|idx| {
                self.dfa
                    .state(chart.entries[*idx].state)
                    .transitions
                    .keys()
                    .copied()
                    .collect::<Vec<_>>()
            })
            .map(|pid| particle_of(g, pid))
            .filter(Particle::is_scannable)
            .map(|p| g.particle_name(p).to_string())
            .sorted()
            .dedup()
            .collect();
        Error::Parse {
            token_index: pos,
            last_token: token.map(|t| {
                format!(
                    "{}({:?})",
                    self.original.particle_name(t.terminal),
                    t.literal
                )
            }),
            expected,
        }
    }
}

fn particle_of(g: &Grammar, id: usize) -> Particle {
    g.particles().nth(id).expect("particle id out of range")
}
