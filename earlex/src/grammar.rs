use std::collections::{BTreeSet, HashMap};
use std::fmt;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::particle::{
    Particle, ParticleDef, ParticleKind, ASTERISK_NAME, BOTTOM_NAME, EPSILON_NAME, RESERVED_PREFIX,
};
use crate::production::{Production, ProductionId};

/// An immutable context-free grammar.
///
/// Built through [`GrammarBuilder`]; once built, a grammar never changes and
/// may be shared freely across threads for reading. Particle ids index the
/// grammar's arena, with the start particle always first among the
/// nonterminals and the ε terminal present iff some rule uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    name: String,
    defs: Vec<ParticleDef>,
    nonterminals: Vec<Particle>,
    terminals: Vec<Particle>,
    productions: Vec<Production>,
    epsilon: Particle,
    asterisk: Particle,
    bottom: Particle,
    by_name: HashMap<String, Particle>,
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epsilon(&self) -> Particle {
        self.epsilon
    }

    pub fn asterisk(&self) -> Particle {
        self.asterisk
    }

    pub fn bottom(&self) -> Particle {
        self.bottom
    }

    /// All nonterminals; the start particle is at index 0.
    pub fn nonterminals(&self) -> &[Particle] {
        &self.nonterminals
    }

    /// All terminals; ε leads iff the grammar uses it.
    pub fn terminals(&self) -> &[Particle] {
        &self.terminals
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    /// The unique production with the start particle on the lhs.
    pub fn initial_production(&self) -> &Production {
        &self.productions[0]
    }

    pub fn num_particles(&self) -> usize {
        self.defs.len()
    }

    pub fn particle_name(&self, p: Particle) -> &str {
        &self.defs[p.id].name
    }

    pub fn particle_def(&self, p: Particle) -> &ParticleDef {
        &self.defs[p.id]
    }

    pub fn particle_by_name(&self, name: &str) -> Option<Particle> {
        self.by_name.get(name).copied()
    }

    /// Every particle of the grammar, in arena order.
    pub fn particles(&self) -> impl Iterator<Item = Particle> + '_ {
        self.defs
            .iter()
            .enumerate()
            .map(|(id, def)| Particle::new(id, def.kind))
    }

    /// Canonical particle order: variant tag first, then name.
    pub fn cmp_particles(&self, a: Particle, b: Particle) -> std::cmp::Ordering {
        a.kind
            .cmp(&b.kind)
            .then_with(|| self.particle_name(a).cmp(self.particle_name(b)))
    }

    pub fn production_string(&self, p: &Production) -> String {
        format!(
            "{} -> {}",
            p.lhs.iter().map(|t| self.particle_def(*t).to_string()).join(" "),
            p.rhs.iter().map(|t| self.particle_def(*t).to_string()).join(" "),
        )
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grammar {} {{", self.name)?;
        for p in &self.productions {
            writeln!(f, "    {}", self.production_string(p))?;
        }
        write!(f, "}}")
    }
}

/// Fluent grammar construction.
///
/// Misuse is remembered and reported by [`GrammarBuilder::build`], so call
/// chains stay clean:
///
/// ```
/// use earlex::grammar::GrammarBuilder;
///
/// let g = GrammarBuilder::new()
///     .name("parens")
///     .terminals(&["(", ")"])
///     .nonterminals(&["E"])
///     .rule("E", &["(", "E", ")"])
///     .rule("E", &["(", ")"])
///     .rule("`*", &["E", "`."])
///     .build()
///     .unwrap();
/// assert_eq!(g.nonterminals().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    name: Option<String>,
    terms: BTreeSet<String>,
    nonterms: BTreeSet<String>,
    rules: Vec<(String, Vec<String>)>,
    seen: BTreeSet<(String, Vec<String>)>,
    initial: Option<usize>,
    uses_epsilon: bool,
    error: Option<Error>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        GrammarBuilder::default()
    }

    fn fail(&mut self, reason: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(Error::GrammarBuild(reason.into()));
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        if self.name.is_some() {
            self.fail("grammar name given twice");
        } else {
            self.name = Some(name.to_string());
        }
        self
    }

    pub fn terminals(mut self, names: &[&str]) -> Self {
        for name in names {
            if name.starts_with(RESERVED_PREFIX) || name.is_empty() {
                self.fail(format!("illegal terminal name '{name}'"));
                return self;
            }
            if self.nonterms.contains(*name) || !self.terms.insert(name.to_string()) {
                self.fail(format!("particle named '{name}' already exists"));
                return self;
            }
        }
        self
    }

    pub fn nonterminals(mut self, names: &[&str]) -> Self {
        for name in names {
            if name.starts_with(RESERVED_PREFIX) || name.is_empty() {
                self.fail(format!("illegal nonterminal name '{name}'"));
                return self;
            }
            if self.terms.contains(*name) || !self.nonterms.insert(name.to_string()) {
                self.fail(format!("particle named '{name}' already exists"));
                return self;
            }
        }
        self
    }

    /// Append the production `lhs -> rhs`.
    ///
    /// An lhs of `` `* `` declares the initial rule, whose rhs must be a
    /// nonterminal followed by `` `. ``. An ε-rule is written with the
    /// single rhs particle `` `e ``.
    pub fn rule(mut self, lhs: &str, rhs: &[&str]) -> Self {
        if self.error.is_some() {
            return self;
        }
        let is_initial = lhs == ASTERISK_NAME;
        if !is_initial && !self.nonterms.contains(lhs) {
            self.fail(format!("unknown nonterminal '{lhs}' on lhs"));
            return self;
        }
        if rhs.is_empty() {
            self.fail("empty rhs");
            return self;
        }
        for name in rhs.iter() {
            match *name {
                EPSILON_NAME => {
                    if rhs.len() > 1 {
                        self.fail("an ε rhs must stand alone");
                        return self;
                    }
                    self.uses_epsilon = true;
                }
                BOTTOM_NAME => {
                    if !is_initial {
                        self.fail("`. may only appear in the initial rule");
                        return self;
                    }
                }
                _ => {
                    if name.starts_with(RESERVED_PREFIX) {
                        self.fail(format!("unknown reserved particle '{name}'"));
                        return self;
                    }
                    if !self.terms.contains(*name) && !self.nonterms.contains(*name) {
                        self.fail(format!("unknown particle '{name}' on rhs"));
                        return self;
                    }
                }
            }
        }
        if is_initial {
            if self.initial.is_some() {
                self.fail("initial rule `* -> ... given twice");
                return self;
            }
            if rhs.len() != 2 || !self.nonterms.contains(rhs[0]) || rhs[1] != BOTTOM_NAME {
                self.fail("initial rule must be `* -> <nonterminal> `.");
                return self;
            }
            self.initial = Some(self.rules.len());
        }
        let key = (
            lhs.to_string(),
            rhs.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        );
        if !self.seen.insert(key.clone()) {
            self.fail(format!("duplicate rule {lhs} -> {}", rhs.join(" ")));
            return self;
        }
        self.rules.push(key);
        self
    }

    pub fn build(self) -> Result<Grammar> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let name = self
            .name
            .ok_or_else(|| Error::GrammarBuild("grammar name not given".into()))?;
        let initial = self
            .initial
            .ok_or_else(|| Error::GrammarBuild("no initial rule `* -> ... given".into()))?;

        let mut defs = Vec::new();
        let mut by_name = HashMap::new();
        let mut intern = |defs: &mut Vec<ParticleDef>,
                          by_name: &mut HashMap<String, Particle>,
                          kind: ParticleKind,
                          name: &str| {
            let p = Particle::new(defs.len(), kind);
            defs.push(ParticleDef {
                kind,
                name: name.to_string(),
            });
            by_name.insert(name.to_string(), p);
            p
        };

        let asterisk = intern(&mut defs, &mut by_name, ParticleKind::Asterisk, ASTERISK_NAME);
        let epsilon = intern(&mut defs, &mut by_name, ParticleKind::Epsilon, EPSILON_NAME);
        let bottom = intern(&mut defs, &mut by_name, ParticleKind::Bottom, BOTTOM_NAME);

        let mut nonterminals = vec![asterisk];
        for nt in &self.nonterms {
            nonterminals.push(intern(&mut defs, &mut by_name, ParticleKind::Nonterminal, nt));
        }
        let mut terminals = Vec::new();
        if self.uses_epsilon {
            terminals.push(epsilon);
        }
        for t in &self.terms {
            terminals.push(intern(&mut defs, &mut by_name, ParticleKind::Terminal, t));
        }

        // The initial rule gets id 0; the rest follow in a canonical sorted
        // order so identical rule sets build identical grammars.
        let mut ordered: Vec<&(String, Vec<String>)> = Vec::with_capacity(self.rules.len());
        ordered.push(&self.rules[initial]);
        let mut rest: Vec<&(String, Vec<String>)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != initial)
            .map(|(_, r)| r)
            .collect();
        rest.sort();
        ordered.extend(rest);

        let productions = ordered
            .into_iter()
            .enumerate()
            .map(|(id, (lhs, rhs))| Production {
                id,
                lhs: vec![by_name[lhs]],
                rhs: rhs.iter().map(|n| by_name[n]).collect(),
            })
            .collect();

        Ok(Grammar {
            name,
            defs,
            nonterminals,
            terminals,
            productions,
            epsilon,
            asterisk,
            bottom,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> Grammar {
        GrammarBuilder::new()
            .name("a4")
            .terminals(&["a"])
            .nonterminals(&["S", "A", "E"])
            .rule("`*", &["S", "`."])
            .rule("S", &["A", "A", "A", "A"])
            .rule("A", &["a"])
            .rule("A", &["E"])
            .rule("E", &["`e"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_canonical() {
        let g = a4();
        assert_eq!(g.nonterminals()[0], g.asterisk());
        assert_eq!(g.terminals()[0], g.epsilon());
        assert!(g.initial_production().is_initial());
        assert_eq!(g.initial_production().rhs.len(), 2);
        assert!(g.initial_production().rhs[1].is_bottom());
        assert_eq!(g.particle_by_name("S").unwrap().kind(), ParticleKind::Nonterminal);
    }

    #[test]
    fn test_build_deterministic() {
        // Same rules, different insertion order.
        let g2 = GrammarBuilder::new()
            .name("a4")
            .nonterminals(&["E", "A", "S"])
            .terminals(&["a"])
            .rule("E", &["`e"])
            .rule("A", &["E"])
            .rule("A", &["a"])
            .rule("S", &["A", "A", "A", "A"])
            .rule("`*", &["S", "`."])
            .build()
            .unwrap();
        assert_eq!(a4(), g2);
    }

    #[test]
    fn test_rejects_misuse() {
        assert!(matches!(
            GrammarBuilder::new().terminals(&["`x"]).build(),
            Err(Error::GrammarBuild(_))
        ));
        assert!(matches!(
            GrammarBuilder::new()
                .name("g")
                .nonterminals(&["S"])
                .rule("S", &["S"])
                .rule("S", &["S"])
                .build(),
            Err(Error::GrammarBuild(_))
        ));
        // Missing initial rule.
        assert!(matches!(
            GrammarBuilder::new().name("g").nonterminals(&["S"]).rule("S", &["S"]).build(),
            Err(Error::GrammarBuild(_))
        ));
        // Malformed initial rule.
        assert!(matches!(
            GrammarBuilder::new()
                .name("g")
                .nonterminals(&["S"])
                .rule("`*", &["S"])
                .build(),
            Err(Error::GrammarBuild(_))
        ));
    }

    #[test]
    fn test_epsilon_terminal_only_when_used() {
        let g = GrammarBuilder::new()
            .name("g")
            .terminals(&["x"])
            .nonterminals(&["S"])
            .rule("S", &["x"])
            .rule("`*", &["S", "`."])
            .build()
            .unwrap();
        assert!(!g.terminals().contains(&g.epsilon()));
    }
}
