//! Seam between the attention substrate and whatever draws conclusions.
//!
//! The memory selects a concept, one of its task links and a novel term
//! link, and hands them to an [`Inference`] implementation. Conclusions are
//! collected in the [`ReasonContext`] and fed back as new tasks.

use std::sync::Arc;

use crate::concept::Concept;
use crate::event::Event;
use crate::link::{TaskLink, TermLink};
use crate::memory::MemoryContext;
use crate::params::Parameters;
use crate::sentence::{Sentence, Task};

/// Per-step scratch state: the memory being worked on, tasks derived so
/// far, and the belief most recently selected as a premise.
pub struct ReasonContext<'a> {
    memory: &'a dyn MemoryContext,
    derived: Vec<Arc<Task>>,
    current_belief: Option<Sentence>,
}

impl<'a> ReasonContext<'a> {
    pub fn new(memory: &'a dyn MemoryContext) -> Self {
        Self {
            memory,
            derived: Vec::new(),
            current_belief: None,
        }
    }

    pub fn memory(&self) -> &'a dyn MemoryContext {
        self.memory
    }

    pub fn time(&self) -> u64 {
        self.memory.time()
    }

    pub fn params(&self) -> &Parameters {
        self.memory.params()
    }

    pub fn emit(&self, event: Event) {
        self.memory.emit(event);
    }

    /// Queue a conclusion for processing once the current step finishes.
    pub fn derive(&mut self, task: Arc<Task>) {
        tracing::trace!(task = %task, "derived");
        self.derived.push(task);
    }

    pub fn derived(&self) -> &[Arc<Task>] {
        &self.derived
    }

    pub fn take_derived(&mut self) -> Vec<Arc<Task>> {
        std::mem::take(&mut self.derived)
    }

    pub fn current_belief(&self) -> Option<&Sentence> {
        self.current_belief.as_ref()
    }

    pub fn set_current_belief(&mut self, belief: Option<Sentence>) {
        self.current_belief = belief;
    }
}

/// Rule layer invoked once per memory cycle.
pub trait Inference: Send + Sync {
    fn reason(
        &self,
        ctx: &mut ReasonContext<'_>,
        concept: &Concept,
        task_link: &TaskLink,
        term_link: Option<&TermLink>,
    );
}

/// Draws no conclusions. Cycles still select, forget and return links, so
/// attention dynamics run on their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passive;

impl Inference for Passive {
    fn reason(
        &self,
        _ctx: &mut ReasonContext<'_>,
        _concept: &Concept,
        _task_link: &TaskLink,
        _term_link: Option<&TermLink>,
    ) {
    }
}
