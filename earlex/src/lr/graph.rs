//! The ε-aware LR(0) item-set automaton.
//!
//! States come in kernel/non-kernel pairs. A kernel state holds the seed
//! items (caret past zero, or the initial item) together with their
//! ε-forwarded variants; its non-kernel companion, reached over a single
//! ε-edge, holds the closure predictions and *their* forwarded variants.
//! Keeping a forwarded kernel item on the kernel side matters: its origin
//! is the kernel entry's origin, while predictions always originate at the
//! position that predicts them.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use itertools::Itertools;
use prettytable::{Cell, Row, Table};

use crate::error::Result;
use crate::grammar::Grammar;
use crate::index::{BasicIndex, IndexedGrammar};
use crate::lr::item::{ItemSet, Lr0Item};
use crate::particle::{Particle, ParticleKind};
use crate::production::ProductionId;

#[derive(Debug)]
pub struct DfaState {
    pub id: usize,
    pub kernel: bool,
    pub items: ItemSet,
    /// Particle id → successor state id. The ε entry, when present, is the
    /// kernel → non-kernel edge.
    pub transitions: BTreeMap<usize, usize>,
    /// Lhs particle id → productions completed in this state.
    pub reductions: BTreeMap<usize, Vec<ProductionId>>,
}

/// The full automaton; state 0 is the initial kernel state.
pub struct EpsilonLr0Dfa {
    grammar: Grammar,
    pub states: Vec<DfaState>,
}

impl EpsilonLr0Dfa {
    pub fn build(grammar: &Grammar) -> Result<Self> {
        let ig = IndexedGrammar::new(grammar);
        let basic = ig.basic()?;

        let mut builder = DfaBuilder {
            grammar,
            basic,
            states: Vec::new(),
            canon: HashMap::new(),
            worklist: VecDeque::new(),
        };

        let mut seed = ItemSet::new();
        seed.insert(Lr0Item::initial(grammar.initial_production().id));
        builder.forward_closure(&mut seed);
        let init = builder.intern(seed, true);
        builder.attach_predictions(init);

        while let Some(sid) = builder.worklist.pop_front() {
            builder.expand(sid);
        }

        Ok(EpsilonLr0Dfa {
            grammar: grammar.clone(),
            states: builder.states,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn state(&self, id: usize) -> &DfaState {
        &self.states[id]
    }

    /// Successor over `on`, if the state has one.
    pub fn goto(&self, state: usize, on: Particle) -> Option<usize> {
        self.states[state].transitions.get(&on.id()).copied()
    }

    pub fn epsilon_successor(&self, state: usize) -> Option<usize> {
        self.goto(state, self.grammar.epsilon())
    }

    /// An overview table: one row per state, one column per particle.
    pub fn summary_table(&self) -> Table {
        let g = &self.grammar;
        let particles: Vec<Particle> = g
            .terminals()
            .iter()
            .chain(g.nonterminals().iter())
            .copied()
            .chain(std::iter::once(g.bottom()))
            .collect();
        let mut table = Table::new();
        let mut header = vec![Cell::new("#"), Cell::new("role")];
        header.extend(particles.iter().map(|p| Cell::new(&g.particle_def(*p).to_string())));
        header.push(Cell::new("reduce"));
        table.add_row(Row::new(header));
        for st in &self.states {
            let mut row = vec![
                Cell::new(&st.id.to_string()),
                Cell::new(if st.kernel { "k" } else { "nk" }),
            ];
            for p in &particles {
                let cell = st
                    .transitions
                    .get(&p.id())
                    .map(|t| format!("s{t}"))
                    .unwrap_or_default();
                row.push(Cell::new(&cell));
            }
            let reduce = st
                .reductions
                .values()
                .flatten()
                .map(|pid| format!("r{pid}"))
                .join(" ");
            row.push(Cell::new(&reduce));
            table.add_row(Row::new(row));
        }
        table
    }
}

impl fmt::Display for EpsilonLr0Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.grammar;
        for st in &self.states {
            writeln!(f, "[{}] {}", st.id, if st.kernel { "k" } else { "nk" })?;
            for item in &st.items {
                writeln!(f, "   {}", item.render(g))?;
            }
            for (pid, next) in &st.transitions {
                let p = g
                    .particles()
                    .nth(*pid)
                    .expect("transition on unknown particle");
                writeln!(f, "   {} => [{}]", g.particle_def(p), next)?;
            }
            for prods in st.reductions.values() {
                for pid in prods {
                    writeln!(f, "   <- {}", g.production_string(g.production(*pid)))?;
                }
            }
        }
        Ok(())
    }
}

struct DfaBuilder<'a> {
    grammar: &'a Grammar,
    basic: &'a BasicIndex,
    states: Vec<DfaState>,
    canon: HashMap<ItemSet, usize>,
    worklist: VecDeque<usize>,
}

impl<'a> DfaBuilder<'a> {
    /// Add every ε-forwarded variant: an item whose caret sits on a
    /// nullable nonterminal also appears with the caret past it.
    fn forward_closure(&self, items: &mut ItemSet) {
        let mut pending: Vec<Lr0Item> = items.iter().copied().collect();
        while let Some(item) = pending.pop() {
            if let Some(x) = item.caret_particle(self.grammar) {
                if x.is_nonterminal() && self.basic.is_nullable(x) {
                    let next = item.advanced();
                    if items.insert(next) {
                        pending.push(next);
                    }
                }
            }
        }
    }

    /// The prediction closure of a kernel: initial items of every
    /// nonterminal reachable after a caret, with their forwarded variants.
    fn predictions(&self, kernel: &ItemSet) -> ItemSet {
        let mut nk = ItemSet::new();
        let mut expanded: Vec<bool> = vec![false; self.grammar.num_particles()];
        let mut pending: Vec<Lr0Item> = kernel.iter().copied().collect();
        while let Some(item) = pending.pop() {
            let Some(x) = item.caret_particle(self.grammar) else {
                continue;
            };
            if !x.is_nonterminal() || expanded[x.id()] {
                continue;
            }
            expanded[x.id()] = true;
            for pid in self.basic.lhs_starts(x) {
                let mut new_item = Lr0Item::initial(*pid);
                if nk.insert(new_item) {
                    pending.push(new_item);
                }
                // Forwarded variants of a prediction stay in the
                // non-kernel state.
                while let Some(y) = new_item.caret_particle(self.grammar) {
                    if !(y.is_nonterminal() && self.basic.is_nullable(y)) {
                        break;
                    }
                    new_item = new_item.advanced();
                    if nk.insert(new_item) {
                        pending.push(new_item);
                    }
                }
            }
        }
        nk
    }

    fn intern(&mut self, items: ItemSet, kernel: bool) -> usize {
        if let Some(id) = self.canon.get(&items) {
            return *id;
        }
        let id = self.states.len();
        self.canon.insert(items.clone(), id);
        let mut reductions: BTreeMap<usize, Vec<ProductionId>> = BTreeMap::new();
        for item in &items {
            if item.is_exhausted(self.grammar) {
                let lhs = self.grammar.production(item.production).head();
                let list = reductions.entry(lhs.id()).or_default();
                if !list.contains(&item.production) {
                    list.push(item.production);
                }
            }
        }
        self.states.push(DfaState {
            id,
            kernel,
            items,
            transitions: BTreeMap::new(),
            reductions,
        });
        self.worklist.push_back(id);
        id
    }

    /// Pair a kernel state with its non-kernel companion, if it has one.
    fn attach_predictions(&mut self, kernel_id: usize) {
        let nk_items = self.predictions(&self.states[kernel_id].items);
        if nk_items.is_empty() {
            return;
        }
        let nk_id = self.intern(nk_items, false);
        let eps = self.grammar.epsilon().id();
        self.states[kernel_id].transitions.insert(eps, nk_id);
    }

    fn expand(&mut self, sid: usize) {
        let mut seeds: BTreeMap<Particle, ItemSet> = BTreeMap::new();
        for item in self.states[sid].items.iter().copied().collect::<Vec<_>>() {
            let Some(x) = item.caret_particle(self.grammar) else {
                continue;
            };
            if x.kind() == ParticleKind::Epsilon {
                continue;
            }
            seeds.entry(x).or_default().insert(item.advanced());
        }
        for (x, mut seed) in seeds {
            self.forward_closure(&mut seed);
            let known = self.canon.contains_key(&seed);
            let kid = self.intern(seed, true);
            self.states[sid].transitions.insert(x.id(), kid);
            if !known {
                self.attach_predictions(kid);
            }
        }
    }
}
