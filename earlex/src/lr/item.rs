use std::collections::BTreeSet;

use itertools::Itertools;

use crate::grammar::Grammar;
use crate::particle::Particle;
use crate::production::ProductionId;

/// A dotted production.
///
/// `caret` ranges over `0..=rhs.len()`; items order by production id, then
/// caret position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lr0Item {
    pub production: ProductionId,
    pub caret: usize,
}

pub type ItemSet = BTreeSet<Lr0Item>;

impl Lr0Item {
    pub fn initial(production: ProductionId) -> Self {
        Lr0Item {
            production,
            caret: 0,
        }
    }

    pub fn advanced(&self) -> Self {
        Lr0Item {
            production: self.production,
            caret: self.caret + 1,
        }
    }

    /// The particle immediately after the caret, if any.
    pub fn caret_particle(&self, g: &Grammar) -> Option<Particle> {
        g.production(self.production).rhs.get(self.caret).copied()
    }

    pub fn is_exhausted(&self, g: &Grammar) -> bool {
        self.caret >= g.production(self.production).rhs.len()
    }

    pub fn render(&self, g: &Grammar) -> String {
        let p = g.production(self.production);
        let mut rhs = p
            .rhs
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let s = g.particle_def(*t).to_string();
                if i == self.caret {
                    format!(". {s}")
                } else {
                    s
                }
            })
            .join(" ");
        if self.caret == p.rhs.len() {
            rhs.push_str(" .");
        }
        format!("{} -> {}", g.particle_def(p.head()), rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    #[test]
    fn test_item_ordering_and_render() {
        let g = GrammarBuilder::new()
            .name("g")
            .terminals(&["x", "y"])
            .nonterminals(&["S"])
            .rule("S", &["x", "y"])
            .rule("`*", &["S", "`."])
            .build()
            .unwrap();
        let rule = g
            .productions()
            .iter()
            .find(|p| !p.is_initial())
            .unwrap()
            .id;
        let i0 = Lr0Item::initial(rule);
        let i1 = i0.advanced();
        assert!(i0 < i1);
        assert_eq!(i0.render(&g), "<S> -> . x y");
        assert_eq!(i1.render(&g), "<S> -> x . y");
        assert_eq!(i1.advanced().render(&g), "<S> -> x y .");
        assert!(i1.advanced().is_exhausted(&g));
        assert_eq!(i1.caret_particle(&g), g.particle_by_name("y"));
    }
}
