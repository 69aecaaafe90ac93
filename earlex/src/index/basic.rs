use crate::grammar::Grammar;
use crate::particle::Particle;
use crate::production::ProductionId;

/// Positional production lookups plus the transitive nullability closure.
///
/// All tables are dense over particle ids. `rhs_contains` accumulates every
/// production carrying the particle on its rhs, the initial production
/// included.
#[derive(Debug)]
pub struct BasicIndex {
    lhs_starts: Vec<Vec<ProductionId>>,
    rhs_starts: Vec<Vec<ProductionId>>,
    lhs_ends: Vec<Vec<ProductionId>>,
    rhs_ends: Vec<Vec<ProductionId>>,
    lhs_contains: Vec<Vec<ProductionId>>,
    rhs_contains: Vec<Vec<ProductionId>>,
    /// For each nullable nonterminal, the production that witnesses its
    /// ε-derivation: a direct ε-rule when one exists, otherwise the first
    /// closing production found.
    epsilons: Vec<Option<ProductionId>>,
}

impl BasicIndex {
    pub(crate) fn build(g: &Grammar) -> Self {
        let n = g.num_particles();
        let mut idx = BasicIndex {
            lhs_starts: vec![Vec::new(); n],
            rhs_starts: vec![Vec::new(); n],
            lhs_ends: vec![Vec::new(); n],
            rhs_ends: vec![Vec::new(); n],
            lhs_contains: vec![Vec::new(); n],
            rhs_contains: vec![Vec::new(); n],
            epsilons: vec![None; n],
        };

        for p in g.productions() {
            idx.lhs_starts[p.lhs[0].id()].push(p.id);
            idx.lhs_ends[p.lhs[p.lhs.len() - 1].id()].push(p.id);
            idx.rhs_starts[p.rhs[0].id()].push(p.id);
            idx.rhs_ends[p.rhs[p.rhs.len() - 1].id()].push(p.id);
            for t in dedup_particles(&p.lhs) {
                idx.lhs_contains[t.id()].push(p.id);
            }
            for t in dedup_particles(&p.rhs) {
                idx.rhs_contains[t.id()].push(p.id);
            }
            if p.is_epsilon() {
                idx.epsilons[p.head().id()] = Some(p.id);
            }
        }

        // Close nullability: a nonterminal is nullable when some production
        // rewrites it to nothing but ε and nullable nonterminals.
        let mut changed = true;
        while changed {
            changed = false;
            for p in g.productions() {
                if p.lhs.len() != 1 || !p.head().is_nonterminal() {
                    continue;
                }
                if idx.epsilons[p.head().id()].is_some() {
                    continue;
                }
                let all_null = p.rhs.iter().all(|t| {
                    t.is_epsilon() || (t.is_nonterminal() && idx.epsilons[t.id()].is_some())
                });
                if all_null {
                    idx.epsilons[p.head().id()] = Some(p.id);
                    changed = true;
                }
            }
        }

        idx
    }

    /// True iff the nonterminal derives the empty string.
    pub fn is_nullable(&self, p: Particle) -> bool {
        p.is_epsilon() || self.epsilons[p.id()].is_some()
    }

    /// The witnessing ε-derivation production of a nullable nonterminal.
    pub fn epsilon_production(&self, p: Particle) -> Option<ProductionId> {
        self.epsilons[p.id()]
    }

    pub fn lhs_starts(&self, p: Particle) -> &[ProductionId] {
        &self.lhs_starts[p.id()]
    }

    pub fn rhs_starts(&self, p: Particle) -> &[ProductionId] {
        &self.rhs_starts[p.id()]
    }

    pub fn lhs_ends(&self, p: Particle) -> &[ProductionId] {
        &self.lhs_ends[p.id()]
    }

    pub fn rhs_ends(&self, p: Particle) -> &[ProductionId] {
        &self.rhs_ends[p.id()]
    }

    pub fn lhs_contains(&self, p: Particle) -> &[ProductionId] {
        &self.lhs_contains[p.id()]
    }

    pub fn rhs_contains(&self, p: Particle) -> &[ProductionId] {
        &self.rhs_contains[p.id()]
    }
}

fn dedup_particles(side: &[Particle]) -> Vec<Particle> {
    let mut seen = Vec::new();
    for t in side {
        if !seen.contains(t) {
            seen.push(*t);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::a4_grammar as a4;
    use crate::index::IndexedGrammar;

    #[test]
    fn test_nullability_closure() {
        let g = a4();
        let ig = IndexedGrammar::new(&g);
        let b = ig.basic().unwrap();
        let s = g.particle_by_name("S").unwrap();
        let a = g.particle_by_name("A").unwrap();
        let e = g.particle_by_name("E").unwrap();
        assert!(b.is_nullable(e));
        assert!(b.is_nullable(a));
        assert!(b.is_nullable(s));
        // E's witness is its direct ε-rule; A's is the closing A -> E.
        let e_prod = g.production(b.epsilon_production(e).unwrap());
        assert!(e_prod.is_epsilon());
        let a_prod = g.production(b.epsilon_production(a).unwrap());
        assert_eq!(a_prod.rhs, vec![e]);
    }

    #[test]
    fn test_initial_production_indexed_normally() {
        let g = a4();
        let ig = IndexedGrammar::new(&g);
        let b = ig.basic().unwrap();
        let s = g.particle_by_name("S").unwrap();
        // S heads the rhs of the initial production and of nothing else.
        assert_eq!(b.rhs_starts(s), &[0]);
        assert_eq!(b.rhs_contains(s), &[0]);
        assert_eq!(b.rhs_contains(g.bottom()), &[0]);
    }

    #[test]
    fn test_positional_maps() {
        let g = a4();
        let ig = IndexedGrammar::new(&g);
        let b = ig.basic().unwrap();
        let a = g.particle_by_name("A").unwrap();
        assert_eq!(b.lhs_starts(a).len(), 2);
        // A AAAA rhs registers once in contains.
        let s = g.particle_by_name("S").unwrap();
        let s_rules = b.lhs_starts(s);
        assert_eq!(s_rules.len(), 1);
        assert_eq!(b.rhs_contains(a), s_rules);
    }
}
