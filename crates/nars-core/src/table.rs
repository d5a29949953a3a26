//! Bounded tables held by a concept: rank-ordered beliefs/desires and the
//! FIFO of pending questions/quests.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::sentence::{Sentence, Task};

/// Result of offering a sentence to a [`BeliefTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Inserted; `removed` is the lowest-ranked resident pushed out, if any.
    Added { removed: Option<Sentence> },
    /// An equivalent sentence is already held; the table is unchanged.
    Duplicate,
    /// Ranked below every resident of a full table.
    Rejected,
}

/// Sentences kept in descending rank order, at most `capacity` of them.
#[derive(Debug, Clone)]
pub struct BeliefTable {
    capacity: usize,
    entries: Vec<Sentence>,
}

impl BeliefTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, sentence: Sentence) -> Admission {
        if self.entries.iter().any(|e| e.equivalent_to(&sentence)) {
            return Admission::Duplicate;
        }
        let rank = sentence.rank();
        match self.entries.iter().position(|e| rank >= e.rank()) {
            Some(i) => {
                self.entries.insert(i, sentence);
                let removed = if self.entries.len() > self.capacity {
                    self.entries.pop()
                } else {
                    None
                };
                Admission::Added { removed }
            }
            None if self.entries.len() < self.capacity => {
                self.entries.push(sentence);
                Admission::Added { removed: None }
            }
            None => Admission::Rejected,
        }
    }

    /// Highest-ranked entry.
    pub fn first(&self) -> Option<&Sentence> {
        self.entries.first()
    }

    pub fn get(&self, i: usize) -> Option<&Sentence> {
        self.entries.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Sentence] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Scale every entry's confidence by `factor` and restore rank order.
    pub fn discount_confidence(&mut self, factor: f64) {
        for s in &mut self.entries {
            s.discount_confidence(factor);
        }
        self.entries.sort_by(|a, b| b.rank().total_cmp(&a.rank()));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Result of offering a task to a [`QuestionTable`].
#[derive(Debug, Clone)]
pub enum QuestionAdmission {
    /// A pending task with the same content; the new one was not stored.
    Existing(Arc<Task>),
    /// Stored; `removed` is the oldest entry dropped on overflow.
    Added { removed: Option<Arc<Task>> },
}

/// Pending questions (or quests), oldest first.
#[derive(Debug, Clone)]
pub struct QuestionTable {
    capacity: usize,
    entries: VecDeque<Arc<Task>>,
}

impl QuestionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, task: Arc<Task>) -> QuestionAdmission {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|t| t.sentence().equals_content(task.sentence()))
        {
            return QuestionAdmission::Existing(Arc::clone(existing));
        }
        let removed = if self.entries.len() + 1 > self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(task);
        QuestionAdmission::Added { removed }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
