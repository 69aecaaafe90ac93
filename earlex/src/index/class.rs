use crate::grammar::Grammar;
use crate::production::{production_class, production_regularity, ProductionClass, Regularity};

/// Grammar-wide class and regularity, joined over the non-initial
/// productions.
#[derive(Debug, Clone, Copy)]
pub struct ClassIndex {
    class: ProductionClass,
    regularity: Regularity,
}

impl ClassIndex {
    pub(crate) fn build(g: &Grammar) -> Self {
        let mut class = ProductionClass::Constant;
        let mut regularity = Regularity::StrictUnitary;
        for p in g.productions() {
            if p.is_initial() {
                continue;
            }
            let pc = production_class(p);
            if pc > class {
                class = pc;
                if class > ProductionClass::Regular {
                    regularity = Regularity::Nonregular;
                }
            }
            if class <= ProductionClass::Regular {
                regularity = regularity.join(production_regularity(p));
            }
        }
        ClassIndex { class, regularity }
    }

    pub fn class(&self) -> ProductionClass {
        self.class
    }

    pub fn regularity(&self) -> Regularity {
        self.regularity
    }
}
