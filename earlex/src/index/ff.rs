use std::collections::BTreeSet;

use crate::grammar::Grammar;
use crate::index::BasicIndex;
use crate::particle::Particle;

/// First / last / in / follow / precede sets.
///
/// Sets contain particles (terminals and nonterminals alike, as reachable)
/// and are materialized as vectors sorted in the canonical particle order,
/// so two builds of the same grammar agree element for element.
#[derive(Debug)]
pub struct FfIndex {
    firsts: Vec<Vec<Particle>>,
    lasts: Vec<Vec<Particle>>,
    ins: Vec<Vec<Particle>>,
    follows: Vec<Vec<Particle>>,
    precedes: Vec<Vec<Particle>>,
}

impl FfIndex {
    pub(crate) fn build(g: &Grammar, basic: &BasicIndex) -> Self {
        let n = g.num_particles();
        let mut firsts = vec![Vec::new(); n];
        let mut lasts = vec![Vec::new(); n];
        let mut ins = vec![Vec::new(); n];

        for t in g.terminals() {
            if t.is_epsilon() {
                continue;
            }
            firsts[t.id()] = vec![*t];
            lasts[t.id()] = vec![*t];
        }

        for nt in g.nonterminals() {
            firsts[nt.id()] = edge_set(g, basic, *nt, Edge::First);
            lasts[nt.id()] = edge_set(g, basic, *nt, Edge::Last);
            ins[nt.id()] = in_set(g, basic, *nt);
        }

        let follows = adjacency_closure(g, basic, Direction::Follow);
        let precedes = adjacency_closure(g, basic, Direction::Precede);

        FfIndex {
            firsts,
            lasts,
            ins,
            follows,
            precedes,
        }
    }

    pub fn firsts(&self, p: Particle) -> &[Particle] {
        &self.firsts[p.id()]
    }

    pub fn lasts(&self, p: Particle) -> &[Particle] {
        &self.lasts[p.id()]
    }

    /// Every particle reachable anywhere inside a derivation of `p`.
    pub fn ins(&self, p: Particle) -> &[Particle] {
        &self.ins[p.id()]
    }

    pub fn follows(&self, p: Particle) -> &[Particle] {
        &self.follows[p.id()]
    }

    pub fn precedes(&self, p: Particle) -> &[Particle] {
        &self.precedes[p.id()]
    }
}

enum Edge {
    First,
    Last,
}

enum Direction {
    Follow,
    Precede,
}

fn sorted(g: &Grammar, set: BTreeSet<Particle>) -> Vec<Particle> {
    let mut v: Vec<Particle> = set.into_iter().collect();
    v.sort_by(|a, b| g.cmp_particles(*a, *b));
    v
}

/// Particles reachable at the leading (or trailing) edge of a derivation,
/// skipping over nullable prefixes (suffixes).
fn edge_set(g: &Grammar, basic: &BasicIndex, nt: Particle, edge: Edge) -> Vec<Particle> {
    let mut set = BTreeSet::new();
    let mut seen = BTreeSet::new();
    let mut pending = vec![nt];
    seen.insert(nt);
    while let Some(cnt) = pending.pop() {
        for pid in basic.lhs_starts(cnt) {
            let p = g.production(*pid);
            let walk: Box<dyn Iterator<Item = &Particle> + '_> = match edge {
                Edge::First => Box::new(p.rhs.iter()),
                Edge::Last => Box::new(p.rhs.iter().rev()),
            };
            for t in walk {
                if t.is_terminal() {
                    set.insert(*t);
                    break;
                }
                if t.is_nonterminal() {
                    set.insert(*t);
                    if seen.insert(*t) {
                        pending.push(*t);
                    }
                    if !basic.is_nullable(*t) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
    }
    sorted(g, set)
}

fn in_set(g: &Grammar, basic: &BasicIndex, nt: Particle) -> Vec<Particle> {
    let mut set = BTreeSet::new();
    let mut seen = BTreeSet::new();
    let mut pending = vec![nt];
    seen.insert(nt);
    while let Some(cnt) = pending.pop() {
        for pid in basic.lhs_starts(cnt) {
            let p = g.production(*pid);
            for t in &p.rhs {
                if t.is_terminal() {
                    set.insert(*t);
                }
                if t.is_nonterminal() {
                    set.insert(*t);
                    if seen.insert(*t) {
                        pending.push(*t);
                    }
                }
            }
        }
    }
    sorted(g, set)
}

/// Immediate neighbourhood sets with lhs inheritance at the nullable edge,
/// closed to a fixed point.
fn adjacency_closure(g: &Grammar, basic: &BasicIndex, dir: Direction) -> Vec<Vec<Particle>> {
    let n = g.num_particles();
    let mut sets: Vec<BTreeSet<Particle>> = vec![BTreeSet::new(); n];
    // refs[x] holds the lhs particles whose own set flows into x's set.
    let mut refs: Vec<BTreeSet<Particle>> = vec![BTreeSet::new(); n];

    for p in g.productions() {
        let len = p.rhs.len();
        for i in 0..len {
            let here = p.rhs[i];
            if here.is_epsilon() {
                continue;
            }
            let neighbours: Box<dyn Iterator<Item = usize>> = match dir {
                Direction::Follow => Box::new(i + 1..len),
                Direction::Precede => Box::new((0..i).rev()),
            };
            for j in neighbours {
                let there = p.rhs[j];
                sets[here.id()].insert(there);
                if !(there.is_nonterminal() && basic.is_nullable(there)) {
                    break;
                }
            }
        }
        // The edge run of the rhs inherits the lhs neighbourhood, through
        // any nullable particles at that edge.
        let edge: Box<dyn Iterator<Item = &Particle> + '_> = match dir {
            Direction::Follow => Box::new(p.rhs.iter().rev()),
            Direction::Precede => Box::new(p.rhs.iter()),
        };
        for t in edge {
            if t.is_epsilon() {
                continue;
            }
            refs[t.id()].insert(p.head());
            if !(t.is_nonterminal() && basic.is_nullable(*t)) {
                break;
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for x in 0..n {
            let sources: Vec<Particle> = refs[x].iter().copied().collect();
            for src in sources {
                let inherited: Vec<Particle> = sets[src.id()].iter().copied().collect();
                for t in inherited {
                    if sets[x].insert(t) {
                        changed = true;
                    }
                }
            }
        }
    }

    sets.into_iter().map(|s| sorted(g, s)).collect()
}

#[cfg(test)]
mod tests {
    use crate::grammar::GrammarBuilder;
    use crate::index::IndexedGrammar;

    fn expr_grammar() -> crate::grammar::Grammar {
        GrammarBuilder::new()
            .name("expr")
            .terminals(&["n", "+", "(", ")"])
            .nonterminals(&["E", "T"])
            .rule("`*", &["E", "`."])
            .rule("E", &["(", "E", ")"])
            .rule("E", &["T"])
            .rule("T", &["n"])
            .rule("T", &["+", "T"])
            .rule("T", &["T", "+", "n"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_first_sets() {
        let g = expr_grammar();
        let ig = IndexedGrammar::new(&g);
        let ff = ig.ff().unwrap();
        let names = |ps: &[crate::particle::Particle]| {
            ps.iter().map(|p| g.particle_name(*p).to_string()).collect::<Vec<_>>()
        };
        let e = g.particle_by_name("E").unwrap();
        let t = g.particle_by_name("T").unwrap();
        assert_eq!(names(ff.firsts(t)), vec!["+", "n", "T"]);
        assert_eq!(names(ff.firsts(e)), vec!["(", "+", "n", "T"]);
    }

    #[test]
    fn test_follow_sets() {
        let g = expr_grammar();
        let ig = IndexedGrammar::new(&g);
        let ff = ig.ff().unwrap();
        let e = g.particle_by_name("E").unwrap();
        let follows = ff.follows(e);
        let names: Vec<_> = follows.iter().map(|p| g.particle_name(*p)).collect();
        assert!(names.contains(&")"));
        assert!(names.contains(&"`."));
    }

    #[test]
    fn test_in_sets() {
        let g = expr_grammar();
        let ig = IndexedGrammar::new(&g);
        let ff = ig.ff().unwrap();
        let t = g.particle_by_name("T").unwrap();
        let names: Vec<_> = ff.ins(t).iter().map(|p| g.particle_name(*p)).collect();
        assert_eq!(names, vec!["+", "n", "T"]);
    }

    #[test]
    fn test_determinism_across_insertion_order() {
        let g1 = expr_grammar();
        let g2 = GrammarBuilder::new()
            .name("expr")
            .nonterminals(&["T", "E"])
            .terminals(&[")", "(", "+", "n"])
            .rule("T", &["T", "+", "n"])
            .rule("T", &["+", "T"])
            .rule("T", &["n"])
            .rule("E", &["T"])
            .rule("E", &["(", "E", ")"])
            .rule("`*", &["E", "`."])
            .build()
            .unwrap();
        let ig1 = IndexedGrammar::new(&g1);
        let ig2 = IndexedGrammar::new(&g2);
        let ff1 = ig1.ff().unwrap();
        let ff2 = ig2.ff().unwrap();
        for nt in g1.nonterminals() {
            assert_eq!(ff1.firsts(*nt), ff2.firsts(*nt));
            assert_eq!(ff1.follows(*nt), ff2.follows(*nt));
            assert_eq!(ff1.ins(*nt), ff2.ins(*nt));
            assert_eq!(ff1.lasts(*nt), ff2.lasts(*nt));
            assert_eq!(ff1.precedes(*nt), ff2.precedes(*nt));
        }
    }
}
