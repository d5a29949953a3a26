//! Structural link templates for compound terms.
//!
//! A concept for a compound term precomputes, once, which sub-terms it
//! should link to and how. Propagation then walks the cached list instead of
//! re-decomposing the term each time.

use std::fmt;

use crate::term::{Compound, Operator, Term};

/// Role of a link, read from the concept that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// From a concept to its own task.
    SelfLink,
    /// Target is a component of this compound.
    Component,
    /// Target is a compound containing this term.
    Compound,
    /// Target is a component of this statement.
    ComponentStatement,
    /// Target is a statement containing this term.
    CompoundStatement,
    /// Target is a component of this conditional's condition.
    ComponentCondition,
    /// Target is a conditional whose condition contains this term.
    CompoundCondition,
    /// Target is reachable through a product or image inside this term.
    Transform,
}

impl LinkType {
    /// The type of the same link seen from the other end.
    pub fn reverse(self) -> LinkType {
        match self {
            Self::Component => Self::Compound,
            Self::Compound => Self::Component,
            Self::ComponentStatement => Self::CompoundStatement,
            Self::CompoundStatement => Self::ComponentStatement,
            Self::ComponentCondition => Self::CompoundCondition,
            Self::CompoundCondition => Self::ComponentCondition,
            Self::SelfLink | Self::Transform => self,
        }
    }

    pub fn is_transform(self) -> bool {
        self == Self::Transform
    }

    /// Short numeric tag used in link keys.
    pub fn code(self) -> u8 {
        match self {
            Self::SelfLink => 0,
            Self::Component => 1,
            Self::Compound => 2,
            Self::ComponentStatement => 3,
            Self::CompoundStatement => 4,
            Self::ComponentCondition => 5,
            Self::CompoundCondition => 6,
            Self::Transform => 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermLinkTemplate {
    target: Term,
    link_type: LinkType,
    index: Vec<u16>,
}

impl TermLinkTemplate {
    /// The sub-term this template points at.
    pub fn target(&self) -> &Term {
        &self.target
    }

    /// Link type from the compound toward `target`.
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Component path from the compound down to `target`.
    pub fn index(&self) -> &[u16] {
        &self.index
    }
}

impl fmt::Display for TermLinkTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?} {}", self.link_type, self.index, self.target)
    }
}

/// Ordered templates for one term. Non-transform templates come first;
/// `non_transforms()` of them are budget recipients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkTemplates {
    templates: Vec<TermLinkTemplate>,
    non_transforms: usize,
}

impl LinkTemplates {
    /// Decompose `term`. Atoms and variables yield no templates.
    ///
    /// Direct constant components are linked. One level further down,
    /// components of inner compounds are linked as well, except that parts of
    /// products and images become transform templates. A conjunction or
    /// negation in condition position (an equivalence side or an
    /// implication's antecedent) is decomposed with condition links.
    pub fn build(term: &Term) -> LinkTemplates {
        let mut templates = Vec::new();
        if let Some(c) = term.as_compound() {
            let link_type = if c.op().is_statement() {
                LinkType::ComponentStatement
            } else {
                LinkType::Component
            };
            collect(&mut templates, c, link_type, &[]);
        }
        // stable: keeps structural order within each group
        templates.sort_by_key(|t| t.link_type.is_transform());
        let non_transforms = templates
            .iter()
            .filter(|t| !t.link_type.is_transform())
            .count();
        LinkTemplates {
            templates,
            non_transforms,
        }
    }

    pub fn templates(&self) -> &[TermLinkTemplate] {
        &self.templates
    }

    /// Templates that receive a share of propagated budget.
    pub fn recipients(&self) -> &[TermLinkTemplate] {
        &self.templates[..self.non_transforms]
    }

    pub fn transforms(&self) -> &[TermLinkTemplate] {
        &self.templates[self.non_transforms..]
    }

    pub fn non_transforms(&self) -> usize {
        self.non_transforms
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn child_index(prefix: &[u16], i: usize) -> Vec<u16> {
    let mut index = Vec::with_capacity(prefix.len() + 1);
    index.extend_from_slice(prefix);
    index.push(i as u16);
    index
}

fn linkable(term: &Term) -> bool {
    term.is_constant() && !term.is_placeholder()
}

fn is_transform_host(c: &Compound) -> bool {
    c.op() == Operator::Product || c.op().is_image()
}

fn collect(out: &mut Vec<TermLinkTemplate>, compound: &Compound, link_type: LinkType, prefix: &[u16]) {
    let op = compound.op();
    for (i, t1) in compound.components().iter().enumerate() {
        let index = child_index(prefix, i);
        if linkable(t1) {
            out.push(TermLinkTemplate {
                target: t1.clone(),
                link_type,
                index: index.clone(),
            });
        }

        let condition_position = op == Operator::Equivalence || (op == Operator::Implication && i == 0);
        if condition_position
            && matches!(t1.operator(), Some(Operator::Conjunction | Operator::Negation))
            && let Some(condition) = t1.as_compound()
        {
            collect(out, condition, LinkType::ComponentCondition, &index);
            continue;
        }

        let Some(c1) = t1.as_compound() else {
            continue;
        };
        let inner_type = if is_transform_host(c1) {
            LinkType::Transform
        } else {
            link_type
        };
        for (j, t2) in c1.components().iter().enumerate() {
            let index2 = child_index(&index, j);
            if linkable(t2) {
                out.push(TermLinkTemplate {
                    target: t2.clone(),
                    link_type: inner_type,
                    index: index2.clone(),
                });
            }
            if let Some(c2) = t2.as_compound()
                && is_transform_host(c2)
            {
                for (k, t3) in c2.components().iter().enumerate() {
                    if linkable(t3) {
                        out.push(TermLinkTemplate {
                            target: t3.clone(),
                            link_type: LinkType::Transform,
                            index: child_index(&index2, k),
                        });
                    }
                }
            }
        }
    }
}
