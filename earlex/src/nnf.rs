//! Nihilistic normal form.
//!
//! The augmentation rewrites a grammar so that every nullable nonterminal
//! reachable from a non-initial rhs derives *only* the empty string. A
//! nullable nonterminal that also derives nonempty input (an *exceptional*
//! one) is split: the original keeps the nonempty derivations, and a fresh
//! shadow nonterminal takes over the ε facet with a single `N⁻ → ε` rule.
//! Every production is replaced by one variant per subset of its
//! exceptional rhs positions, with the chosen positions rewritten to their
//! shadows; a variant whose remaining positions produce nothing is headed
//! by the shadow of its lhs.
//!
//! The transform also returns the inverse syntax-tree mapping, which
//! recovers a derivation of the input grammar from a derivation of the
//! augmented one.

use std::collections::BTreeSet;

use crate::earley::tree::{epsilon_subtree, TreeNode};
use crate::error::{Error, Result};
use crate::grammar::{Grammar, GrammarBuilder};
use crate::index::IndexedGrammar;
use crate::particle::{Particle, ASTERISK_NAME, BOTTOM_NAME, EPSILON_NAME};
use crate::production::ProductionId;

/// Suffix that turns a nonterminal name into its shadow's name.
const SHADOW_SUFFIX: &str = "-ε";

/// True iff the nonterminal derives the empty string and nothing else.
pub fn is_nihilistic(ig: &IndexedGrammar, p: Particle) -> Result<bool> {
    if p.is_epsilon() {
        return Ok(true);
    }
    if !p.is_nonterminal() {
        return Ok(false);
    }
    if !ig.basic()?.is_nullable(p) {
        return Ok(false);
    }
    Ok(ig.ff()?.ins(p).iter().all(|t| !t.is_terminal()))
}

/// True iff every nullable nonterminal used by a non-initial rhs is
/// nihilistic. The start symbol itself may stay nullable (through its
/// shadow unit rule) without disqualifying the grammar; nothing forwards
/// over it except the initial item.
pub fn is_nnf(ig: &IndexedGrammar) -> Result<bool> {
    let g = ig.grammar();
    let basic = ig.basic()?;
    for nt in g.nonterminals() {
        if nt.is_asterisk() || !basic.is_nullable(*nt) {
            continue;
        }
        if is_nihilistic(ig, *nt)? {
            continue;
        }
        let used = basic
            .rhs_contains(*nt)
            .iter()
            .any(|pid| !g.production(*pid).is_initial());
        if used {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The result of the NNF augmentation.
pub struct NnfTransform {
    pub grammar: Grammar,
    /// `None` when the input already was in normal form (the transform is
    /// the identity and `grammar` is a structural copy).
    pub inverse: Option<NnfInverse>,
}

/// Inverse syntax-tree transform from the augmented grammar back onto the
/// original one.
#[derive(Debug)]
pub struct NnfInverse {
    /// Augmented particle id → original particle; shadows map to their
    /// preimage.
    particle_map: Vec<Particle>,
    /// Augmented production id → original production id; the shadow ε rules
    /// and the start unit rules have no preimage.
    production_map: Vec<Option<ProductionId>>,
    /// The ε route out of the start: `N -> N⁻`, or the wrapper's
    /// `N' -> N⁻`.
    start_unit: Option<ProductionId>,
    /// The wrapper's pass-through rule `N' -> N`, when a wrapper start
    /// symbol was introduced.
    wrapper_unit: Option<ProductionId>,
    shadow: Vec<bool>,
}

pub fn nihilistic_augment(g: &Grammar) -> Result<NnfTransform> {
    let ig = IndexedGrammar::new(g);
    if is_nnf(&ig)? {
        return Ok(NnfTransform {
            grammar: g.clone(),
            inverse: None,
        });
    }
    let basic = ig.basic()?;

    let mut exceptional = Vec::new();
    for nt in g.nonterminals() {
        if nt.is_asterisk() {
            continue;
        }
        if basic.is_nullable(*nt) && !is_nihilistic(&ig, *nt)? {
            exceptional.push(*nt);
        }
    }

    let shadow_name = |p: Particle| format!("{}{}", g.particle_name(p), SHADOW_SUFFIX);
    let is_exceptional = |p: Particle| exceptional.contains(&p);

    let mut rules: BTreeSet<(String, Vec<String>)> = BTreeSet::new();
    let mut emit = |lhs: String, rhs: Vec<String>| {
        rules.insert((lhs, rhs));
    };

    for e in &exceptional {
        emit(shadow_name(*e), vec![EPSILON_NAME.to_string()]);
    }

    let mut nihilistic = vec![false; g.num_particles()];
    for nt in g.nonterminals() {
        nihilistic[nt.id()] = is_nihilistic(&ig, *nt)?;
    }

    // A nullable start symbol needs an ε route from the initial item. A
    // plain `N -> N⁻` unit rule works only while N occurs on no other rhs;
    // for a recursive start it would make N nullable again and reopen the
    // ambiguity the shadows just removed, so that case gets a fresh
    // wrapper start symbol instead.
    let mut wrapper: Option<(String, String)> = None;
    let start = g.initial_production().rhs[0];
    if is_exceptional(start) {
        let recursive = basic
            .rhs_contains(start)
            .iter()
            .any(|pid| !g.production(*pid).is_initial());
        if recursive {
            let mut name = format!("{}-start", g.particle_name(start));
            while g.particle_by_name(&name).is_some() {
                name.push('\'');
            }
            wrapper = Some((name, g.particle_name(start).to_string()));
        }
    }

    for p in g.productions() {
        if p.is_initial() {
            let start = p.rhs[0];
            match &wrapper {
                Some((wrapper_name, start_name)) => {
                    emit(
                        ASTERISK_NAME.to_string(),
                        vec![wrapper_name.clone(), BOTTOM_NAME.to_string()],
                    );
                    emit(wrapper_name.clone(), vec![start_name.clone()]);
                    emit(wrapper_name.clone(), vec![shadow_name(start)]);
                }
                None => {
                    let rhs: Vec<String> =
                        p.rhs.iter().map(|t| g.particle_name(*t).to_string()).collect();
                    emit(ASTERISK_NAME.to_string(), rhs);
                    if is_exceptional(start) {
                        emit(
                            g.particle_name(start).to_string(),
                            vec![shadow_name(start)],
                        );
                    }
                }
            }
            continue;
        }
        if p.is_epsilon() {
            // Exceptional heads lose their direct ε rule to the shadow.
            if !is_exceptional(p.head()) {
                emit(
                    g.particle_name(p.head()).to_string(),
                    vec![EPSILON_NAME.to_string()],
                );
            }
            continue;
        }

        let ex_positions: Vec<usize> = p
            .rhs
            .iter()
            .enumerate()
            .filter(|(_, t)| is_exceptional(**t))
            .map(|(j, _)| j)
            .collect();

        for mask in 0u32..(1 << ex_positions.len()) {
            let mut rhs_inst = Vec::with_capacity(p.rhs.len());
            let mut shadowed = vec![false; p.rhs.len()];
            for (bit, pos) in ex_positions.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    shadowed[*pos] = true;
                }
            }
            let mut nn_count = 0usize;
            for (j, t) in p.rhs.iter().enumerate() {
                if shadowed[j] {
                    rhs_inst.push(shadow_name(*t));
                } else {
                    rhs_inst.push(g.particle_name(*t).to_string());
                    let produces_nothing = t.is_nonterminal() && nihilistic[t.id()];
                    if !produces_nothing {
                        nn_count += 1;
                    }
                }
            }
            let head = p.head();
            let lhs = if nn_count == 0 && is_exceptional(head) {
                shadow_name(head)
            } else {
                g.particle_name(head).to_string()
            };
            emit(lhs, rhs_inst);
        }
    }

    // Rebuild through the ordinary builder so the augmented grammar is as
    // canonical as any other.
    let mut gb = GrammarBuilder::new().name(&format!("{}{}", g.name(), SHADOW_SUFFIX));
    for nt in g.nonterminals() {
        if nt.is_asterisk() {
            continue;
        }
        gb = gb.nonterminals(&[g.particle_name(*nt)]);
    }
    for e in &exceptional {
        gb = gb.nonterminals(&[&shadow_name(*e)]);
    }
    if let Some((wrapper_name, _)) = &wrapper {
        gb = gb.nonterminals(&[wrapper_name]);
    }
    for t in g.terminals() {
        if t.is_epsilon() {
            continue;
        }
        gb = gb.terminals(&[g.particle_name(*t)]);
    }
    for (lhs, rhs) in &rules {
        let rhs_refs: Vec<&str> = rhs.iter().map(String::as_str).collect();
        gb = gb.rule(lhs, &rhs_refs);
    }
    let aug = gb.build()?;

    let inverse = build_inverse(g, &aug, wrapper.as_ref().map(|(w, _)| w.as_str()))?;
    Ok(NnfTransform {
        grammar: aug,
        inverse: Some(inverse),
    })
}

fn build_inverse(orig: &Grammar, aug: &Grammar, wrapper: Option<&str>) -> Result<NnfInverse> {
    let orig_ig = IndexedGrammar::new(orig);
    let orig_names = orig_ig.names()?;

    // The wrapper, when present, is the initial rhs nonterminal; it maps
    // to the original start symbol.
    let orig_start = orig.initial_production().rhs[0];

    let mut particle_map = Vec::with_capacity(aug.num_particles());
    let mut shadow = vec![false; aug.num_particles()];
    for p in aug.particles() {
        let name = aug.particle_name(p);
        if wrapper == Some(name) {
            shadow[p.id()] = false;
            particle_map.push(orig_start);
            continue;
        }
        let (preimage_name, is_shadow) = if orig.particle_by_name(name).is_some() {
            (name, false)
        } else {
            match name.strip_suffix(SHADOW_SUFFIX) {
                Some(base) if orig.particle_by_name(base).is_some() => (base, true),
                _ => (name, false),
            }
        };
        let target = orig.particle_by_name(preimage_name).ok_or_else(|| {
            Error::Internal(format!("no preimage particle for '{name}'"))
        })?;
        shadow[p.id()] = is_shadow;
        particle_map.push(target);
    }

    let initial_start = aug.initial_production().rhs[0];
    let is_wrapper =
        |p: Particle| wrapper.is_some() && aug.particle_name(p) == wrapper.unwrap();
    let mut start_unit = None;
    let mut wrapper_unit = None;
    let mut production_map = vec![None; aug.productions().len()];

    for p in aug.productions() {
        // The start unit rules and the shadow ε rules exist only in the
        // augmentation; the tree transform erases them.
        if p.lhs.len() == 1
            && p.head() == initial_start
            && p.rhs.len() == 1
            && shadow[p.rhs[0].id()]
            && particle_map[p.rhs[0].id()] == particle_map[p.head().id()]
        {
            start_unit = Some(p.id);
            continue;
        }
        if p.lhs.len() == 1 && is_wrapper(p.head()) && p.rhs.len() == 1 && !shadow[p.rhs[0].id()]
        {
            wrapper_unit = Some(p.id);
            continue;
        }
        if p.is_epsilon() && shadow[p.head().id()] {
            continue;
        }

        let preimage_rhs: Vec<&str> = p
            .rhs
            .iter()
            .map(|t| orig.particle_name(particle_map[t.id()]))
            .collect();
        let want_lhs = particle_map[p.head().id()];
        let target = orig_names
            .rhs_names(&preimage_rhs)
            .iter()
            .map(|pid| orig.production(*pid))
            .find(|cand| cand.head() == want_lhs);
        match target {
            Some(cand) => production_map[p.id] = Some(cand.id),
            None => {
                return Err(Error::Internal(format!(
                    "no preimage for augmented production {}",
                    aug.production_string(p)
                )))
            }
        }
    }

    Ok(NnfInverse {
        particle_map,
        production_map,
        start_unit,
        wrapper_unit,
        shadow,
    })
}

impl NnfInverse {
    /// Map a derivation tree of the augmented grammar onto the original
    /// grammar. Shadow subtrees (and the start unit step) are replaced by
    /// the preimage's canonical ε-derivation.
    pub fn apply(&self, orig: &IndexedGrammar, node: &TreeNode) -> Result<TreeNode> {
        let mapped = self.particle_map[node.particle.id()];
        if self.shadow[node.particle.id()] {
            return epsilon_subtree(orig, mapped, node.span.start);
        }
        if node.production.is_some() && node.production == self.start_unit {
            return epsilon_subtree(orig, mapped, node.span.start);
        }
        if node.production.is_some() && node.production == self.wrapper_unit {
            return self.apply(orig, &node.children[0]);
        }
        let production = match node.production {
            None => None,
            Some(pid) => Some(self.production_map[pid].ok_or_else(|| {
                Error::Internal("unmapped production in augmented derivation".to_string())
            })?),
        };
        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            children.push(self.apply(orig, child)?);
        }
        Ok(TreeNode {
            particle: mapped,
            production,
            token: node.token.clone(),
            span: node.span.clone(),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::a4_grammar as a4;
    use crate::grammar::GrammarBuilder;

    #[test]
    fn test_nihilistic_classification() {
        let g = a4();
        let ig = IndexedGrammar::new(&g);
        let s = g.particle_by_name("S").unwrap();
        let a = g.particle_by_name("A").unwrap();
        let e = g.particle_by_name("E").unwrap();
        assert!(is_nihilistic(&ig, e).unwrap());
        assert!(!is_nihilistic(&ig, a).unwrap());
        assert!(!is_nihilistic(&ig, s).unwrap());
        assert!(!is_nnf(&ig).unwrap());
    }

    #[test]
    fn test_augment_a4() {
        let g = a4();
        let t = nihilistic_augment(&g).unwrap();
        let aug = &t.grammar;
        assert!(t.inverse.is_some());
        assert!(aug.particle_by_name("A-ε").is_some());
        assert!(aug.particle_by_name("S-ε").is_some());
        // E is nihilistic, not exceptional: no shadow.
        assert!(aug.particle_by_name("E-ε").is_none());

        let ig = IndexedGrammar::new(aug);
        assert!(is_nnf(&ig).unwrap());

        // Mixed variants exist, the all-shadow variant is headed by S⁻.
        let names = |pid: crate::production::ProductionId| {
            let p = aug.production(pid);
            (
                aug.particle_name(p.head()).to_string(),
                p.rhs
                    .iter()
                    .map(|t| aug.particle_name(*t).to_string())
                    .collect::<Vec<_>>(),
            )
        };
        let all: Vec<_> = aug.productions().iter().map(|p| names(p.id)).collect();
        assert!(all.contains(&(
            "S".into(),
            vec!["A".into(), "A-ε".into(), "A-ε".into(), "A-ε".into()]
        )));
        assert!(all.contains(&(
            "S-ε".into(),
            vec!["A-ε".into(), "A-ε".into(), "A-ε".into(), "A-ε".into()]
        )));
        assert!(all.contains(&("A-ε".into(), vec!["E".into()])));
        assert!(all.contains(&("A-ε".into(), vec!["`e".into()])));
        assert!(all.contains(&("S".into(), vec!["S-ε".into()])));
        // A's nonempty facet no longer derives ε.
        assert!(!all.contains(&("A".into(), vec!["E".into()])));
    }

    #[test]
    fn test_augment_idempotent() {
        let g = a4();
        let once = nihilistic_augment(&g).unwrap();
        let twice = nihilistic_augment(&once.grammar).unwrap();
        assert!(twice.inverse.is_none());
        assert_eq!(once.grammar, twice.grammar);
    }

    #[test]
    fn test_recursive_nullable_start_gets_a_wrapper() {
        let g = GrammarBuilder::new()
            .name("list")
            .terminals(&["x", ","])
            .nonterminals(&["list", "item"])
            .rule("`*", &["list", "`."])
            .rule("list", &["item"])
            .rule("list", &["item", ",", "list"])
            .rule("item", &["x"])
            .rule("item", &["`e"])
            .build()
            .unwrap();
        let t = nihilistic_augment(&g).unwrap();
        let aug = &t.grammar;

        let wrapper = aug.particle_by_name("list-start").expect("wrapper start");
        assert_eq!(aug.initial_production().rhs[0], wrapper);
        // The wrapper carries the ε route; list itself is no longer
        // nullable, so recursive rhs occurrences stay unambiguous.
        let ig = IndexedGrammar::new(aug);
        let basic = ig.basic().unwrap();
        assert!(basic.is_nullable(wrapper));
        assert!(!basic.is_nullable(aug.particle_by_name("list").unwrap()));
        assert!(is_nnf(&ig).unwrap());

        let twice = nihilistic_augment(aug).unwrap();
        assert!(twice.inverse.is_none());
    }

    #[test]
    fn test_identity_on_nnf_grammar() {
        let g = GrammarBuilder::new()
            .name("plain")
            .terminals(&["x"])
            .nonterminals(&["S"])
            .rule("S", &["x"])
            .rule("`*", &["S", "`."])
            .build()
            .unwrap();
        let t = nihilistic_augment(&g).unwrap();
        assert!(t.inverse.is_none());
        assert_eq!(t.grammar, g);
    }
}
