//! Sentences and tasks: the units of reasoning that flow into concepts.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::budget::Budget;
use crate::stamp::Stamp;
use crate::term::Term;
use crate::truth::{TruthValue, rank_belief};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Punctuation {
    Judgment,
    Goal,
    Question,
    Quest,
}

impl Punctuation {
    pub fn mark(self) -> char {
        match self {
            Self::Judgment => '.',
            Self::Goal => '!',
            Self::Question => '?',
            Self::Quest => '@',
        }
    }

    pub fn from_mark(mark: char) -> Option<Self> {
        match mark {
            '.' => Some(Self::Judgment),
            '!' => Some(Self::Goal),
            '?' => Some(Self::Question),
            '@' => Some(Self::Quest),
            _ => None,
        }
    }

    /// Judgments and goals carry a truth value; questions and quests don't.
    pub fn has_truth(self) -> bool {
        matches!(self, Self::Judgment | Self::Goal)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sentence {
    term: Term,
    mark: char,
    truth: Option<TruthValue>,
    stamp: Stamp,
    revisible: bool,
}

impl Sentence {
    /// Raw constructor. `mark` is kept as given; a mark that is not one of
    /// the four known punctuations makes the sentence unprocessable.
    pub fn new(term: Term, mark: char, truth: Option<TruthValue>, stamp: Stamp) -> Self {
        Self {
            term,
            mark,
            truth,
            stamp,
            revisible: true,
        }
    }

    pub fn judgment(term: Term, truth: TruthValue, stamp: Stamp) -> Self {
        Self::new(term, Punctuation::Judgment.mark(), Some(truth), stamp)
    }

    pub fn goal(term: Term, truth: TruthValue, stamp: Stamp) -> Self {
        Self::new(term, Punctuation::Goal.mark(), Some(truth), stamp)
    }

    pub fn question(term: Term, stamp: Stamp) -> Self {
        Self::new(term, Punctuation::Question.mark(), None, stamp)
    }

    pub fn quest(term: Term, stamp: Stamp) -> Self {
        Self::new(term, Punctuation::Quest.mark(), None, stamp)
    }

    pub fn with_revisible(mut self, revisible: bool) -> Self {
        self.revisible = revisible;
        self
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn mark(&self) -> char {
        self.mark
    }

    pub fn punctuation(&self) -> Option<Punctuation> {
        Punctuation::from_mark(self.mark)
    }

    pub fn truth(&self) -> Option<&TruthValue> {
        self.truth.as_ref()
    }

    pub fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    pub fn occurrence_time(&self) -> Option<i64> {
        self.stamp.occurrence_time()
    }

    pub fn is_revisible(&self) -> bool {
        self.revisible
    }

    pub fn is_judgment(&self) -> bool {
        self.punctuation() == Some(Punctuation::Judgment)
    }

    pub fn is_goal(&self) -> bool {
        self.punctuation() == Some(Punctuation::Goal)
    }

    pub fn is_question(&self) -> bool {
        self.punctuation() == Some(Punctuation::Question)
    }

    pub fn is_quest(&self) -> bool {
        self.punctuation() == Some(Punctuation::Quest)
    }

    /// Same term and punctuation.
    pub fn equals_content(&self, other: &Sentence) -> bool {
        self.mark == other.mark && self.term == other.term
    }

    /// Same content, truth, evidence, and occurrence time.
    pub fn equivalent_to(&self, other: &Sentence) -> bool {
        self.equals_content(other)
            && self.truth == other.truth
            && self.stamp.same_evidence(&other.stamp)
            && self.stamp.occurrence_time() == other.stamp.occurrence_time()
    }

    /// Two judgments (or goals) about the same content whose evidence can
    /// be pooled without counting any of it twice.
    pub fn revisible_with(&self, other: &Sentence) -> bool {
        self.equals_content(other)
            && self.revisible
            && other.revisible
            && !self.stamp.overlaps(&other.stamp)
    }

    /// Table rank: confidence OR'd with originality.
    pub fn rank(&self) -> f64 {
        self.truth
            .as_ref()
            .map_or(0.0, |t| rank_belief(t, self.stamp.evidence().len()))
    }

    /// Move this sentence to `target_time`. Eternal sentences are returned
    /// unchanged; temporal ones lose confidence in proportion to how far the
    /// target is from the source relative to now.
    pub fn projection(&self, target_time: Option<i64>, now: u64) -> Sentence {
        let (Some(source), Some(target)) = (self.occurrence_time(), target_time) else {
            return self.clone();
        };
        if source == target {
            return self.clone();
        }
        let now = now as i64;
        let span = ((source - now).abs() + (target - now).abs()) as f64;
        let rate = if span > 0.0 {
            ((source - target).abs() as f64 / span).min(1.0)
        } else {
            1.0
        };
        Sentence {
            truth: self.truth.map(|t| t.discounted(1.0 - rate)),
            stamp: self.stamp.with_occurrence(Some(target)),
            ..self.clone()
        }
    }

    pub fn discount_confidence(&mut self, factor: f64) {
        if let Some(t) = &mut self.truth {
            *t = t.discounted(factor);
        }
    }

    /// Stable identity used to key task links.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.term, self.mark)?;
        if let Some(t) = &self.truth {
            write!(f, " {t}")?;
        }
        write!(f, " {}", self.stamp)
    }
}

/// A sentence with a budget: the unit of work the system spends attention
/// on. Shared between concepts through `Arc`; budget and best solution are
/// interior-mutable.
#[derive(Debug)]
pub struct Task {
    sentence: Sentence,
    budget: Mutex<Budget>,
    best_solution: Mutex<Option<Sentence>>,
}

impl Task {
    pub fn new(sentence: Sentence, budget: Budget) -> Arc<Task> {
        Arc::new(Self {
            sentence,
            budget: Mutex::new(budget),
            best_solution: Mutex::new(None),
        })
    }

    pub fn sentence(&self) -> &Sentence {
        &self.sentence
    }

    pub fn term(&self) -> &Term {
        self.sentence.term()
    }

    pub fn budget(&self) -> Budget {
        *self.budget.lock()
    }

    pub fn update_budget(&self, f: impl FnOnce(&mut Budget)) {
        let mut budget = self.budget.lock();
        f(&mut *budget);
    }

    pub fn above_threshold(&self, threshold: f64) -> bool {
        self.budget.lock().above_threshold(threshold)
    }

    pub fn best_solution(&self) -> Option<Sentence> {
        self.best_solution.lock().clone()
    }

    pub fn set_best_solution(&self, solution: Sentence) {
        *self.best_solution.lock() = Some(solution);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.budget(), self.sentence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ab() -> Term {
        Term::inheritance(Term::atom("a"), Term::atom("b")).unwrap()
    }

    #[test]
    fn test_punctuation_marks() {
        for p in [
            Punctuation::Judgment,
            Punctuation::Goal,
            Punctuation::Question,
            Punctuation::Quest,
        ] {
            assert_eq!(Punctuation::from_mark(p.mark()), Some(p));
        }
        assert_eq!(Punctuation::from_mark(';'), None);
    }

    #[test]
    fn test_display() {
        let s = Sentence::judgment(ab(), TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0));
        assert_eq!(s.to_string(), "<a --> b>. %1.00;0.90% {0 : 1}");
    }

    #[test]
    fn test_equivalence_and_revisibility() {
        let t = TruthValue::new(1.0, 0.9);
        let s1 = Sentence::judgment(ab(), t, Stamp::eternal(1, 0));
        let s1_again = Sentence::judgment(ab(), t, Stamp::eternal(1, 7));
        let s2 = Sentence::judgment(ab(), TruthValue::new(0.0, 0.9), Stamp::eternal(2, 0));
        assert!(s1.equivalent_to(&s1_again));
        assert!(!s1.revisible_with(&s1_again));
        assert!(s1.revisible_with(&s2));
        assert!(!s1.revisible_with(&s2.clone().with_revisible(false)));
    }

    #[test]
    fn test_projection_discounts_confidence() {
        let s = Sentence::judgment(ab(), TruthValue::new(1.0, 0.9), Stamp::new(1, 0, Some(0)));
        let p = s.projection(Some(10), 10);
        assert_eq!(p.occurrence_time(), Some(10));
        // span = 10 + 0, distance 10 → rate 1 → confidence 0
        assert_abs_diff_eq!(p.truth().unwrap().confidence(), 0.0);

        let near = s.projection(Some(2), 10);
        // span = 10 + 8, distance 2
        assert_abs_diff_eq!(
            near.truth().unwrap().confidence(),
            0.9 * (1.0 - 2.0 / 18.0),
            epsilon = 1e-12
        );

        let eternal = Sentence::judgment(ab(), TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0));
        assert_eq!(eternal.projection(Some(5), 10), eternal);
    }

    #[test]
    fn test_task_budget_mutation() {
        let task = Task::new(
            Sentence::question(ab(), Stamp::eternal(1, 0)),
            Budget::new(0.8, 0.5, 0.5),
        );
        task.update_budget(|b| b.decrease_priority(0.5));
        assert_abs_diff_eq!(task.budget().priority(), 0.4);
        assert!(task.above_threshold(0.3));
        assert!(task.best_solution().is_none());
    }
}
