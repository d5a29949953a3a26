//! Task links and term links, the two kinds of bag item a concept owns.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::bag::{Item, ItemBuilder};
use crate::budget::Budget;
use crate::sentence::Task;
use crate::template::{LinkType, TermLinkTemplate};
use crate::term::Term;

/// Bag key for a link: type tag, component path, then the target's name.
pub fn link_key(link_type: LinkType, index: &[u16], name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 8);
    let _ = write!(key, "{}", link_type.code());
    for i in index {
        let _ = write!(key, ",{i}");
    }
    key.push(' ');
    key.push_str(name);
    key
}

/// Reference from a concept to a task it should keep working on.
#[derive(Debug, Clone)]
pub struct TaskLink {
    key: String,
    task: Arc<Task>,
    budget: Budget,
    link_type: LinkType,
    index: Vec<u16>,
    /// Recently paired term-link keys and the cycle they were paired at.
    records: VecDeque<(String, u64)>,
    record_length: usize,
}

impl TaskLink {
    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn index(&self) -> &[u16] {
        &self.index
    }

    /// Whether pairing with `term_link` at `now` would be new work. A term
    /// link pointing back at the task's own term is never novel; otherwise a
    /// pairing is novel unless it was recorded within `horizon` cycles. Novel
    /// pairings are recorded.
    pub fn novel(&mut self, term_link: &TermLink, now: u64, horizon: u64) -> bool {
        if term_link.target() == self.task.term() {
            return false;
        }
        if self.record_length == 0 {
            return true;
        }
        let key = term_link.key();
        if let Some(pos) = self.records.iter().position(|(k, _)| k == key) {
            if now < self.records[pos].1.saturating_add(horizon) {
                return false;
            }
            self.records.remove(pos);
        }
        while self.records.len() >= self.record_length {
            self.records.pop_front();
        }
        self.records.push_back((key.clone(), now));
        true
    }
}

impl Item for TaskLink {
    type Key = String;

    fn key(&self) -> &String {
        &self.key
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

/// Reference from a concept to a structurally related term.
#[derive(Debug, Clone)]
pub struct TermLink {
    key: String,
    target: Term,
    budget: Budget,
    link_type: LinkType,
    index: Vec<u16>,
}

impl TermLink {
    pub fn target(&self) -> &Term {
        &self.target
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn index(&self) -> &[u16] {
        &self.index
    }
}

impl Item for TermLink {
    type Key = String;

    fn key(&self) -> &String {
        &self.key
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

/// Builds the task link a concept gets for `task`: a self link when there
/// is no template, otherwise a link of the template's reversed type placed
/// in the component's concept.
pub struct TaskLinkBuilder<'a> {
    pub task: &'a Arc<Task>,
    pub template: Option<&'a TermLinkTemplate>,
    pub budget: Budget,
    pub record_length: usize,
    pub now: u64,
}

impl TaskLinkBuilder<'_> {
    fn link_type(&self) -> LinkType {
        self.template
            .map_or(LinkType::SelfLink, |t| t.link_type().reverse())
    }

    fn index(&self) -> &[u16] {
        match self.template {
            Some(t) => t.index(),
            None => &[],
        }
    }
}

impl ItemBuilder<TaskLink> for TaskLinkBuilder<'_> {
    fn key(&self) -> String {
        link_key(self.link_type(), self.index(), &self.task.sentence().key())
    }

    fn budget(&self) -> Budget {
        self.budget
    }

    fn build(&self) -> TaskLink {
        let mut budget = self.budget;
        budget.touch(self.now);
        TaskLink {
            key: self.key(),
            task: Arc::clone(self.task),
            budget,
            link_type: self.link_type(),
            index: self.index().to_vec(),
            records: VecDeque::with_capacity(self.record_length),
            record_length: self.record_length,
        }
    }
}

/// Builds one direction of a term link for a template. `toward_component`
/// is the compound's link down to the template target; the other direction
/// is the component's link back up to `target`.
pub struct TermLinkBuilder<'a> {
    pub template: &'a TermLinkTemplate,
    pub target: &'a Term,
    pub toward_component: bool,
    pub budget: Budget,
    pub now: u64,
}

impl TermLinkBuilder<'_> {
    fn link_type(&self) -> LinkType {
        if self.toward_component {
            self.template.link_type()
        } else {
            self.template.link_type().reverse()
        }
    }
}

impl ItemBuilder<TermLink> for TermLinkBuilder<'_> {
    fn key(&self) -> String {
        link_key(self.link_type(), self.template.index(), &self.target.to_string())
    }

    fn budget(&self) -> Budget {
        self.budget
    }

    fn build(&self) -> TermLink {
        let mut budget = self.budget;
        budget.touch(self.now);
        TermLink {
            key: self.key(),
            target: self.target.clone(),
            budget,
            link_type: self.link_type(),
            index: self.template.index().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::Sentence;
    use crate::stamp::Stamp;
    use crate::template::LinkTemplates;
    use crate::truth::TruthValue;

    fn fixture() -> (Arc<Task>, LinkTemplates, Term) {
        let term = Term::inheritance(Term::atom("a"), Term::atom("b")).unwrap();
        let task = Task::new(
            Sentence::judgment(term.clone(), TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0)),
            Budget::new(0.8, 0.8, 0.5),
        );
        (task, LinkTemplates::build(&term), term)
    }

    #[test]
    fn test_keys_distinguish_type_and_index() {
        let k1 = link_key(LinkType::Component, &[0], "a");
        let k2 = link_key(LinkType::Compound, &[0], "a");
        let k3 = link_key(LinkType::Component, &[1], "a");
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
        assert_eq!(k1, "1,0 a");
    }

    #[test]
    fn test_self_task_link() {
        let (task, _, _) = fixture();
        let link = TaskLinkBuilder {
            task: &task,
            template: None,
            budget: task.budget(),
            record_length: 4,
            now: 3,
        }
        .build();
        assert_eq!(link.link_type(), LinkType::SelfLink);
        assert!(link.index().is_empty());
        assert_eq!(link.budget().last_forget_time(), Some(3));
    }

    #[test]
    fn test_term_link_directions() {
        let (_, templates, compound) = fixture();
        let template = &templates.templates()[0];
        let down = TermLinkBuilder {
            template,
            target: template.target(),
            toward_component: true,
            budget: Budget::new(0.2, 0.5, 0.5),
            now: 0,
        }
        .build();
        let up = TermLinkBuilder {
            template,
            target: &compound,
            toward_component: false,
            budget: Budget::new(0.2, 0.5, 0.5),
            now: 0,
        }
        .build();
        assert_eq!(down.link_type(), LinkType::ComponentStatement);
        assert_eq!(up.link_type(), LinkType::CompoundStatement);
        assert_eq!(up.target(), &compound);
        assert_ne!(down.key(), up.key());
    }

    #[test]
    fn test_novelty_horizon() {
        let (task, templates, _) = fixture();
        let mut link = TaskLinkBuilder {
            task: &task,
            template: None,
            budget: task.budget(),
            record_length: 4,
            now: 0,
        }
        .build();
        let template = &templates.templates()[0];
        let term_link = TermLinkBuilder {
            template,
            target: template.target(),
            toward_component: true,
            budget: Budget::new(0.2, 0.5, 0.5),
            now: 0,
        }
        .build();

        assert!(link.novel(&term_link, 10, 5));
        assert!(!link.novel(&term_link, 12, 5));
        assert!(link.novel(&term_link, 15, 5));
    }

    #[test]
    fn test_link_to_own_term_is_never_novel() {
        let (task, templates, compound) = fixture();
        let mut link = TaskLinkBuilder {
            task: &task,
            template: None,
            budget: task.budget(),
            record_length: 4,
            now: 0,
        }
        .build();
        let back = TermLinkBuilder {
            template: &templates.templates()[0],
            target: &compound,
            toward_component: false,
            budget: Budget::new(0.2, 0.5, 0.5),
            now: 0,
        }
        .build();
        assert!(!link.novel(&back, 100, 5));
    }
}
