use std::collections::HashMap;

use crate::grammar::Grammar;
use crate::particle::Particle;
use crate::production::ProductionId;

/// Particle and production lookup by name.
#[derive(Debug)]
pub struct NameIndex {
    terminals: HashMap<String, Particle>,
    nonterminals: HashMap<String, Particle>,
    lhs_names: HashMap<String, Vec<ProductionId>>,
    rhs_names: HashMap<String, Vec<ProductionId>>,
}

fn join_names(g: &Grammar, side: &[Particle]) -> String {
    let mut key = String::new();
    for (i, p) in side.iter().enumerate() {
        if i > 0 {
            key.push('|');
        }
        key.push_str(g.particle_name(*p));
    }
    key
}

impl NameIndex {
    pub(crate) fn build(g: &Grammar) -> Self {
        let mut terminals = HashMap::new();
        let mut nonterminals = HashMap::new();
        for t in g.terminals() {
            terminals.insert(g.particle_name(*t).to_string(), *t);
        }
        for nt in g.nonterminals() {
            nonterminals.insert(g.particle_name(*nt).to_string(), *nt);
        }

        let mut lhs_names: HashMap<String, Vec<ProductionId>> = HashMap::new();
        let mut rhs_names: HashMap<String, Vec<ProductionId>> = HashMap::new();
        for p in g.productions() {
            lhs_names
                .entry(join_names(g, &p.lhs))
                .or_default()
                .push(p.id);
            rhs_names
                .entry(join_names(g, &p.rhs))
                .or_default()
                .push(p.id);
        }

        NameIndex {
            terminals,
            nonterminals,
            lhs_names,
            rhs_names,
        }
    }

    pub fn terminal(&self, name: &str) -> Option<Particle> {
        self.terminals.get(name).copied()
    }

    pub fn nonterminal(&self, name: &str) -> Option<Particle> {
        self.nonterminals.get(name).copied()
    }

    /// Productions whose lhs names equal the given sequence.
    pub fn lhs_names(&self, names: &[&str]) -> &[ProductionId] {
        self.lhs_names
            .get(&names.join("|"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Productions whose rhs names equal the given sequence.
    pub fn rhs_names(&self, names: &[&str]) -> &[ProductionId] {
        self.rhs_names
            .get(&names.join("|"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::GrammarBuilder;
    use crate::index::IndexedGrammar;

    #[test]
    fn test_name_lookup() {
        let g = GrammarBuilder::new()
            .name("g")
            .terminals(&["x", "y"])
            .nonterminals(&["S"])
            .rule("S", &["x", "y"])
            .rule("S", &["x"])
            .rule("`*", &["S", "`."])
            .build()
            .unwrap();
        let ig = IndexedGrammar::new(&g);
        let names = ig.names().unwrap();
        assert_eq!(names.terminal("x"), g.particle_by_name("x"));
        assert_eq!(names.nonterminal("S"), g.particle_by_name("S"));
        assert!(names.terminal("S").is_none());
        assert_eq!(names.rhs_names(&["x", "y"]).len(), 1);
        assert_eq!(names.lhs_names(&["S"]).len(), 2);
        assert!(names.rhs_names(&["y", "x"]).is_empty());
    }
}
