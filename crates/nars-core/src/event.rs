//! Fire-and-forget notifications from concepts and memory.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::sentence::{Sentence, Task};
use crate::term::{Bindings, Term};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConceptNew,
    ConceptForget,
    BeliefAdd,
    BeliefRemove,
    GoalAdd,
    GoalRemove,
    QuestionAdd,
    QuestionRemove,
    QuestAdd,
    QuestRemove,
    TaskRemove,
    UnexecutableGoal,
    BeliefSelect,
    Answer,
    TaskLinkRemove,
    TermLinkRemove,
}

#[derive(Clone, Debug)]
pub enum Event {
    ConceptNew { term: Term },
    ConceptForget { term: Term },
    BeliefAdd { concept: Term, task: Arc<Task> },
    BeliefRemove { concept: Term, removed: Sentence },
    GoalAdd { concept: Term, task: Arc<Task> },
    GoalRemove { concept: Term, removed: Sentence },
    QuestionAdd { concept: Term, task: Arc<Task> },
    QuestionRemove { concept: Term, task: Arc<Task> },
    QuestAdd { concept: Term, task: Arc<Task> },
    QuestRemove { concept: Term, task: Arc<Task> },
    /// A task dropped without being stored, e.g. a duplicate judgment.
    TaskRemove { task: Arc<Task>, reason: &'static str },
    UnexecutableGoal { concept: Term, task: Arc<Task> },
    BeliefSelect { concept: Term, belief: Sentence },
    Answer {
        question: Arc<Task>,
        solution: Sentence,
        bindings: Bindings,
    },
    TaskLinkRemove { concept: Term, key: String },
    TermLinkRemove { concept: Term, key: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ConceptNew { .. } => EventKind::ConceptNew,
            Event::ConceptForget { .. } => EventKind::ConceptForget,
            Event::BeliefAdd { .. } => EventKind::BeliefAdd,
            Event::BeliefRemove { .. } => EventKind::BeliefRemove,
            Event::GoalAdd { .. } => EventKind::GoalAdd,
            Event::GoalRemove { .. } => EventKind::GoalRemove,
            Event::QuestionAdd { .. } => EventKind::QuestionAdd,
            Event::QuestionRemove { .. } => EventKind::QuestionRemove,
            Event::QuestAdd { .. } => EventKind::QuestAdd,
            Event::QuestRemove { .. } => EventKind::QuestRemove,
            Event::TaskRemove { .. } => EventKind::TaskRemove,
            Event::UnexecutableGoal { .. } => EventKind::UnexecutableGoal,
            Event::BeliefSelect { .. } => EventKind::BeliefSelect,
            Event::Answer { .. } => EventKind::Answer,
            Event::TaskLinkRemove { .. } => EventKind::TaskLinkRemove,
            Event::TermLinkRemove { .. } => EventKind::TermLinkRemove,
        }
    }
}

type Subscriber = Arc<dyn Fn(&Event) + Send + Sync>;

/// Synchronous broadcast to registered closures. Subscribers run on the
/// emitting thread after the subscriber list lock is released, so they may
/// emit or subscribe themselves.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, f: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscribers.write().push(Arc::new(f));
    }

    pub fn emit(&self, event: Event) {
        tracing::trace!(kind = ?event.kind(), "event");
        let subscribers = {
            let guard = self.subscribers.read();
            if guard.is_empty() {
                return;
            }
            guard.clone()
        };
        for s in &subscribers {
            s(&event);
        }
    }
}
