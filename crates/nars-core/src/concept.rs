//! The memory node for one term.
//!
//! A concept owns two link bags and four bounded tables behind a single
//! lock. Incoming tasks are handled by [`Concept::direct_process`], which
//! updates the tables and then spreads the task's budget to structurally
//! related concepts through task links and term links.
//!
//! No operation here holds two concept locks at once: a concept's own state
//! is locked only for short sections, and neighbours are reached through the
//! memory with that lock released. Events are emitted after unlocking.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, trace};

use crate::bag::{Bag, Item};
use crate::budget::{Budget, or};
use crate::constants::DISCOUNT_RATE;
use crate::event::Event;
use crate::inference::ReasonContext;
use crate::link::{TaskLink, TaskLinkBuilder, TermLink, TermLinkBuilder};
use crate::params::Parameters;
use crate::sentence::{Punctuation, Sentence, Task};
use crate::stamp::Stamp;
use crate::table::{Admission, BeliefTable, QuestionAdmission, QuestionTable};
use crate::template::LinkTemplates;
use crate::term::{Bindings, Term};
use crate::truth::TruthValue;

/// Accounting for one fan-out step. Every unit of `input` priority is
/// either `delivered` to a neighbour's bag or `diverted` to a balance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Propagation {
    pub input: f64,
    pub delivered: f64,
    pub diverted: f64,
}

impl Propagation {
    pub fn is_conserved(&self, epsilon: f64) -> bool {
        (self.delivered + self.diverted - self.input).abs() <= epsilon
    }
}

struct ConceptState {
    task_links: Bag<TaskLink>,
    term_links: Bag<TermLink>,
    beliefs: BeliefTable,
    desires: BeliefTable,
    questions: QuestionTable,
    quests: QuestionTable,
    task_balance: f64,
    term_balance: f64,
}

#[derive(Clone, Copy)]
enum Table {
    Beliefs,
    Desires,
}

pub struct Concept {
    term: Term,
    params: Arc<Parameters>,
    templates: OnceLock<LinkTemplates>,
    state: Mutex<ConceptState>,
}

impl Concept {
    /// `seed` drives both link bags' sampling.
    pub fn new(term: Term, params: Arc<Parameters>, seed: u64) -> Self {
        let relative = params.forget_quality_relative;
        let state = ConceptState {
            task_links: Bag::with_seed(params.task_link_bag_size, params.link_bag_levels, seed)
                .with_forget_relative(relative),
            term_links: Bag::with_seed(
                params.term_link_bag_size,
                params.link_bag_levels,
                seed.rotate_left(32) ^ 0x9e37_79b9_7f4a_7c15,
            )
            .with_forget_relative(relative),
            beliefs: BeliefTable::new(params.concept_beliefs_max),
            desires: BeliefTable::new(params.concept_goals_max),
            questions: QuestionTable::new(params.concept_questions_max),
            quests: QuestionTable::new(params.concept_questions_max),
            task_balance: 0.0,
            term_balance: 0.0,
        };
        Self {
            term,
            params,
            templates: OnceLock::new(),
            state: Mutex::new(state),
        }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Link templates for this concept's term, computed on first use.
    pub fn templates(&self) -> &LinkTemplates {
        self.templates.get_or_init(|| LinkTemplates::build(&self.term))
    }

    fn threshold(&self) -> f64 {
        self.params.budget_threshold
    }

    // --- direct processing ---

    /// Handle a task aimed at this concept. Returns `false` only when the
    /// task's punctuation is not recognized; nothing is changed then.
    pub fn direct_process(&self, ctx: &mut ReasonContext<'_>, task: &Arc<Task>) -> bool {
        let Some(punctuation) = task.sentence().punctuation() else {
            debug!(mark = %task.sentence().mark(), "unrecognized punctuation");
            return false;
        };
        match punctuation {
            Punctuation::Judgment => self.process_judgment(ctx, task),
            Punctuation::Goal => self.process_goal(ctx, task),
            Punctuation::Question | Punctuation::Quest => self.process_question(ctx, task),
        }

        if task.above_threshold(self.threshold()) {
            self.link_to_task(ctx, task);
        }
        true
    }

    fn process_judgment(&self, ctx: &mut ReasonContext<'_>, task: &Arc<Task>) {
        let judgment = task.sentence();
        let now = ctx.time();
        let old = {
            let state = self.state.lock();
            select_candidate(judgment, state.beliefs.as_slice(), now).cloned()
        };

        if let Some(old) = old {
            if is_duplicate(judgment, &old) {
                ctx.emit(Event::TaskRemove {
                    task: Arc::clone(task),
                    reason: "duplicated",
                });
                return;
            }
            if judgment.revisible_with(&old) {
                let projected = old.projection(judgment.occurrence_time(), now);
                if projected.occurrence_time() != old.occurrence_time() {
                    ctx.derive(Task::new(projected.clone(), task.budget()));
                }
                ctx.set_current_belief(Some(projected.clone()));
                if let Some(revised) = revise(judgment, &projected, task, now) {
                    ctx.derive(revised);
                }
            }
        }

        if task.above_threshold(self.threshold()) {
            let questions: Vec<Arc<Task>> = self.state.lock().questions.iter().cloned().collect();
            for question in &questions {
                self.try_solution(ctx, judgment, question);
            }
            self.add_to_table(ctx, task, Table::Beliefs);
        }
    }

    fn process_goal(&self, ctx: &mut ReasonContext<'_>, task: &Arc<Task>) {
        let goal = task.sentence();
        let now = ctx.time();
        let old = {
            let state = self.state.lock();
            select_candidate(goal, state.desires.as_slice(), now).cloned()
        };

        if let Some(old) = old {
            if is_duplicate(goal, &old) {
                ctx.emit(Event::TaskRemove {
                    task: Arc::clone(task),
                    reason: "duplicated",
                });
                return;
            }
            if goal.revisible_with(&old)
                && let Some(revised) = revise(goal, &old, task, now)
                && revised.above_threshold(self.threshold())
            {
                // the revised goal comes back through here on its own
                ctx.derive(revised);
                return;
            }
        }

        if !task.above_threshold(self.threshold()) {
            return;
        }
        let belief = {
            let state = self.state.lock();
            select_candidate(goal, state.beliefs.as_slice(), now).cloned()
        };
        if let Some(belief) = belief {
            self.try_solution(ctx, &belief, task);
        }

        if task.above_threshold(self.threshold()) {
            self.add_to_table(ctx, task, Table::Desires);
            let fresh = goal
                .occurrence_time()
                .is_none_or(|t| t >= now as i64 - self.params.duration as i64);
            if fresh && !self.execute_decision(ctx, task) {
                ctx.emit(Event::UnexecutableGoal {
                    concept: self.term.clone(),
                    task: Arc::clone(task),
                });
            }
        }
    }

    fn process_question(&self, ctx: &mut ReasonContext<'_>, task: &Arc<Task>) {
        let is_question = task.sentence().is_question();
        let admission = {
            let mut state = self.state.lock();
            if is_question {
                state.questions.add(Arc::clone(task))
            } else {
                state.quests.add(Arc::clone(task))
            }
        };

        let pending = match admission {
            QuestionAdmission::Existing(existing) => existing,
            QuestionAdmission::Added { removed } => {
                self.emit_question_events(ctx, is_question, removed, task);
                Arc::clone(task)
            }
        };

        let now = ctx.time();
        let candidate = {
            let state = self.state.lock();
            let table = if is_question {
                &state.beliefs
            } else {
                &state.desires
            };
            select_candidate(pending.sentence(), table.as_slice(), now).cloned()
        };
        if let Some(candidate) = candidate {
            self.try_solution(ctx, &candidate, task);
        }
    }

    fn emit_question_events(
        &self,
        ctx: &ReasonContext<'_>,
        is_question: bool,
        removed: Option<Arc<Task>>,
        added: &Arc<Task>,
    ) {
        let concept = self.term.clone();
        if let Some(task) = removed {
            let concept = concept.clone();
            ctx.emit(if is_question {
                Event::QuestionRemove { concept, task }
            } else {
                Event::QuestRemove { concept, task }
            });
        }
        let task = Arc::clone(added);
        ctx.emit(if is_question {
            Event::QuestionAdd { concept, task }
        } else {
            Event::QuestAdd { concept, task }
        });
    }

    fn add_to_table(&self, ctx: &ReasonContext<'_>, task: &Arc<Task>, table: Table) {
        let admission = {
            let mut state = self.state.lock();
            match table {
                Table::Beliefs => state.beliefs.add(task.sentence().clone()),
                Table::Desires => state.desires.add(task.sentence().clone()),
            }
        };
        let Admission::Added { removed } = admission else {
            return;
        };
        let concept = self.term.clone();
        if let Some(removed) = removed {
            let concept = concept.clone();
            ctx.emit(match table {
                Table::Beliefs => Event::BeliefRemove { concept, removed },
                Table::Desires => Event::GoalRemove { concept, removed },
            });
        }
        let task = Arc::clone(task);
        ctx.emit(match table {
            Table::Beliefs => Event::BeliefAdd { concept, task },
            Table::Desires => Event::GoalAdd { concept, task },
        });
    }

    /// Offer `belief` as an answer to `task` (a question, quest, or goal).
    /// When it beats the task's best solution so far it is recorded, the
    /// task's priority is lowered by the solution quality, and the belief is
    /// re-activated as a derived task. Returns whether it was recorded.
    pub fn try_solution(&self, ctx: &mut ReasonContext<'_>, belief: &Sentence, task: &Arc<Task>) -> bool {
        let problem = task.sentence();
        let now = ctx.time();
        let Some((quality, bindings)) = solution_quality(problem, belief, now) else {
            return false;
        };
        if let Some(best) = task.best_solution() {
            let best_quality = solution_quality(problem, &best, now).map_or(0.0, |(q, _)| q);
            if best_quality >= quality {
                return false;
            }
        }

        task.set_best_solution(belief.clone());
        if problem.is_question() || problem.is_quest() {
            debug!(question = %problem, solution = %belief, quality, "answer");
            ctx.emit(Event::Answer {
                question: Arc::clone(task),
                solution: belief.clone(),
                bindings,
            });
        }

        let budget = task.budget();
        let activation = Budget::new(
            or(budget.priority(), quality),
            budget.durability(),
            belief.truth().map_or(0.0, TruthValue::to_quality),
        );
        task.update_budget(|b| b.set_priority(b.priority().min(1.0 - quality)));
        if activation.above_threshold(self.threshold()) {
            ctx.derive(Task::new(belief.clone(), activation));
        }
        true
    }

    // --- decisions ---

    /// Truth of the strongest desire, if any.
    pub fn get_desire(&self) -> Option<TruthValue> {
        self.state
            .lock()
            .desires
            .first()
            .and_then(|s| s.truth().copied())
    }

    pub fn is_desired(&self) -> bool {
        self.get_desire()
            .is_some_and(|d| d.expectation() > self.params.decision_threshold)
    }

    /// Run this concept's operation for `task` if the concept is desired
    /// enough and its term is an operation. Returns whether it ran.
    pub fn execute_decision(&self, ctx: &ReasonContext<'_>, task: &Arc<Task>) -> bool {
        if !self.is_desired() || self.term.as_operation().is_none() {
            return false;
        }
        ctx.memory().execute(&self.term, task)
    }

    // --- link propagation ---

    /// Link `task` to this concept and to every concept reachable through
    /// the recipient templates, then build term links with the full budget.
    /// Returns the accounting for the task-link fan-out; atoms fan out
    /// nothing.
    pub fn link_to_task(&self, ctx: &mut ReasonContext<'_>, task: &Arc<Task>) -> Propagation {
        let now = ctx.time();
        let budget = task.budget();
        let record_length = self.params.term_link_record_length;
        self.activate_task_link(
            ctx,
            &TaskLinkBuilder {
                task,
                template: None,
                budget,
                record_length,
                now,
            },
        );

        let templates = self.templates();
        let recipients = templates.non_transforms();
        if !self.term.is_compound() || recipients == 0 {
            return Propagation::default();
        }

        let mut report = Propagation {
            input: budget.priority(),
            ..Propagation::default()
        };
        let sub = budget.divide(recipients);
        if !sub.above_threshold(self.threshold()) {
            self.state.lock().task_balance += budget.priority();
            report.diverted = budget.priority();
            trace!(concept = %self.term, diverted = report.diverted, "task link budget below threshold");
            return report;
        }

        for template in templates.recipients() {
            let delivered = ctx
                .memory()
                .conceptualize(&sub, template.target())
                .is_some_and(|neighbour| {
                    neighbour.activate_task_link(
                        ctx,
                        &TaskLinkBuilder {
                            task,
                            template: Some(template),
                            budget: sub,
                            record_length,
                            now,
                        },
                    )
                });
            if delivered {
                report.delivered += sub.priority();
            } else {
                self.state.lock().task_balance += sub.priority();
                report.diverted += sub.priority();
            }
        }
        trace!(
            concept = %self.term,
            input = report.input,
            delivered = report.delivered,
            diverted = report.diverted,
            "task link fan-out"
        );

        self.build_term_links(ctx, &budget);
        report
    }

    /// Install term links in both directions between this concept and each
    /// recipient template target, descending into compound targets. Each
    /// link carries `priority / (2 * recipients)`. Walks an explicit work
    /// list; returns one accounting record per fan-out step.
    pub fn build_term_links(&self, ctx: &mut ReasonContext<'_>, budget: &Budget) -> Vec<Propagation> {
        let (first, mut pending) = self.term_link_step(ctx, budget);
        let mut steps = vec![first];
        while let Some((concept, sub)) = pending.pop() {
            let (step, more) = concept.term_link_step(ctx, &sub);
            steps.push(step);
            pending.extend(more);
        }
        steps
    }

    fn term_link_step(
        &self,
        ctx: &mut ReasonContext<'_>,
        budget: &Budget,
    ) -> (Propagation, Vec<(Arc<Concept>, Budget)>) {
        let templates = self.templates();
        let recipients = templates.non_transforms();
        if recipients == 0 {
            return (Propagation::default(), Vec::new());
        }

        let mut report = Propagation {
            input: budget.priority(),
            ..Propagation::default()
        };
        let sub = budget.divide(recipients * 2);
        if !sub.above_threshold(self.threshold()) {
            self.state.lock().term_balance += budget.priority();
            report.diverted = budget.priority();
            return (report, Vec::new());
        }

        let now = ctx.time();
        let mut next = Vec::new();
        let account = |resident: bool, report: &mut Propagation| {
            if resident {
                report.delivered += sub.priority();
            } else {
                self.state.lock().term_balance += sub.priority();
                report.diverted += sub.priority();
            }
        };
        for template in templates.recipients() {
            let target = template.target();
            let Some(other) = ctx.memory().conceptualize(budget, target) else {
                self.state.lock().term_balance += sub.priority() * 2.0;
                report.diverted += sub.priority() * 2.0;
                continue;
            };

            let down = self.activate_term_link(
                ctx,
                &TermLinkBuilder {
                    template,
                    target,
                    toward_component: true,
                    budget: sub,
                    now,
                },
            );
            account(down, &mut report);
            let up = other.activate_term_link(
                ctx,
                &TermLinkBuilder {
                    template,
                    target: &self.term,
                    toward_component: false,
                    budget: sub,
                    now,
                },
            );
            account(up, &mut report);

            if target.is_compound() {
                next.push((other, sub));
            }
        }
        trace!(
            concept = %self.term,
            input = report.input,
            delivered = report.delivered,
            diverted = report.diverted,
            "term link fan-out"
        );
        (report, next)
    }

    /// Merge or insert a task link. Returns whether the link is resident
    /// afterwards; a newcomer ranking below everything in a full bag is not.
    fn activate_task_link(&self, ctx: &ReasonContext<'_>, builder: &TaskLinkBuilder<'_>) -> bool {
        let (resident, evicted) = {
            let mut state = self.state.lock();
            let result = state.task_links.update(builder);
            (result.item.is_some(), result.evicted)
        };
        if resident && let Some(link) = evicted {
            ctx.emit(Event::TaskLinkRemove {
                concept: self.term.clone(),
                key: link.key().clone(),
            });
        }
        resident
    }

    /// Term-link counterpart of [`Concept::activate_task_link`].
    fn activate_term_link(&self, ctx: &ReasonContext<'_>, builder: &TermLinkBuilder<'_>) -> bool {
        let (resident, evicted) = {
            let mut state = self.state.lock();
            let result = state.term_links.update(builder);
            (result.item.is_some(), result.evicted)
        };
        if resident && let Some(link) = evicted {
            ctx.emit(Event::TermLinkRemove {
                concept: self.term.clone(),
                key: link.key().clone(),
            });
        }
        resident
    }

    // --- selection for the inference cycle ---

    pub fn take_task_link(&self) -> Option<TaskLink> {
        self.state.lock().task_links.take_next()
    }

    pub fn return_task_link(&self, ctx: &ReasonContext<'_>, link: TaskLink) {
        let cycles = self.params.cycles(self.params.task_link_forget_durations);
        let evicted = self
            .state
            .lock()
            .task_links
            .put_back(link, cycles, ctx.time());
        if let Some(link) = evicted {
            ctx.emit(Event::TaskLinkRemove {
                concept: self.term.clone(),
                key: link.key().clone(),
            });
        }
    }

    /// Take a term link that is novel for `task_link`, trying at most
    /// `term_link_max_matched` candidates. Rejected candidates go straight
    /// back with forgetting applied. The selected link must be handed back
    /// with [`Concept::return_term_link`].
    pub fn select_term_link(&self, task_link: &mut TaskLink, now: u64, horizon: u64) -> Option<TermLink> {
        let cycles = self.params.cycles(self.params.term_link_forget_durations);
        let mut state = self.state.lock();
        let attempts = self.params.term_link_max_matched.min(state.term_links.len());
        let mut rejected = Vec::new();
        let mut selected = None;
        for _ in 0..attempts {
            let Some(link) = state.term_links.take_next() else {
                break;
            };
            if task_link.novel(&link, now, horizon) {
                selected = Some(link);
                break;
            }
            rejected.push(link);
        }
        for link in rejected {
            // the bag only shrank, so nothing can be evicted here
            let _ = state.term_links.put_back(link, cycles, now);
        }
        selected
    }

    pub fn return_term_link(&self, ctx: &ReasonContext<'_>, link: TermLink) {
        let cycles = self.params.cycles(self.params.term_link_forget_durations);
        let evicted = self
            .state
            .lock()
            .term_links
            .put_back(link, cycles, ctx.time());
        if let Some(link) = evicted {
            ctx.emit(Event::TermLinkRemove {
                concept: self.term.clone(),
                key: link.key().clone(),
            });
        }
    }

    /// Strongest belief whose evidence does not overlap the task's,
    /// projected to the task's occurrence time.
    pub fn get_belief(&self, ctx: &mut ReasonContext<'_>, task: &Task) -> Option<Sentence> {
        let stamp = task.sentence().stamp();
        let belief = self
            .state
            .lock()
            .beliefs
            .iter()
            .find(|b| !b.stamp().overlaps(stamp))
            .cloned()?;
        ctx.emit(Event::BeliefSelect {
            concept: self.term.clone(),
            belief: belief.clone(),
        });
        let projected = belief.projection(task.sentence().occurrence_time(), ctx.time());
        ctx.set_current_belief(Some(projected.clone()));
        Some(projected)
    }

    // --- belief statistics ---

    /// A belief drawn with probability proportional to its confidence.
    /// With `eternal` set only eternal beliefs are considered.
    pub fn belief_random_by_confidence<R: Rng>(&self, rng: &mut R, eternal: bool) -> Option<Sentence> {
        let state = self.state.lock();
        let candidates: Vec<&Sentence> = state
            .beliefs
            .iter()
            .filter(|b| !eternal || b.stamp().is_eternal())
            .collect();
        let confidence = |s: &Sentence| s.truth().map_or(0.0, TruthValue::confidence);
        let total: f64 = candidates.iter().map(|s| confidence(s)).sum();
        if total <= 0.0 {
            return candidates.first().map(|s| (*s).clone());
        }
        let mut r = rng.random_range(0.0..total);
        for s in &candidates {
            let c = confidence(s);
            if r < c {
                return Some((*s).clone());
            }
            r -= c;
        }
        candidates.last().map(|s| (*s).clone())
    }

    pub fn beliefs_confidence_sum(&self) -> f64 {
        self.state
            .lock()
            .beliefs
            .iter()
            .filter_map(|b| b.truth().map(TruthValue::confidence))
            .sum()
    }

    pub fn beliefs_frequency_mean(&self) -> f64 {
        let state = self.state.lock();
        if state.beliefs.is_empty() {
            return 0.0;
        }
        let sum: f64 = state
            .beliefs
            .iter()
            .filter_map(|b| b.truth().map(TruthValue::frequency))
            .sum();
        sum / state.beliefs.len() as f64
    }

    /// Scale the confidence of every belief (or every desire) by the
    /// discount rate.
    pub fn discount_confidence(&self, on_beliefs: bool) {
        let mut state = self.state.lock();
        if on_beliefs {
            state.beliefs.discount_confidence(DISCOUNT_RATE);
        } else {
            state.desires.discount_confidence(DISCOUNT_RATE);
        }
    }

    /// How worth keeping the concept is: well-linked or simple concepts
    /// score higher.
    pub fn quality(&self) -> f64 {
        let link_priority = self.state.lock().term_links.average_priority();
        let complexity = f64::from(self.term.complexity().max(1));
        or(link_priority, 1.0 / complexity)
    }

    /// Drop everything the concept holds. Called when the memory forgets it.
    pub fn end(&self) {
        let mut state = self.state.lock();
        state.task_links.clear();
        state.term_links.clear();
        state.beliefs.clear();
        state.desires.clear();
        state.questions.clear();
        state.quests.clear();
    }

    // --- read-only views ---

    pub fn beliefs(&self) -> Vec<Sentence> {
        self.state.lock().beliefs.as_slice().to_vec()
    }

    pub fn desires(&self) -> Vec<Sentence> {
        self.state.lock().desires.as_slice().to_vec()
    }

    pub fn questions(&self) -> Vec<Arc<Task>> {
        self.state.lock().questions.iter().cloned().collect()
    }

    pub fn quests(&self) -> Vec<Arc<Task>> {
        self.state.lock().quests.iter().cloned().collect()
    }

    pub fn task_links(&self) -> Vec<TaskLink> {
        self.state.lock().task_links.iter().cloned().collect()
    }

    pub fn term_links(&self) -> Vec<TermLink> {
        self.state.lock().term_links.iter().cloned().collect()
    }

    pub fn task_link_count(&self) -> usize {
        self.state.lock().task_links.len()
    }

    pub fn term_link_count(&self) -> usize {
        self.state.lock().term_links.len()
    }

    /// Accumulated (task-link, term-link) budget that found no recipient.
    pub fn balances(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.task_balance, state.term_balance)
    }

    /// Multi-line summary of the tables, for diagnostics.
    pub fn display_content(&self) -> String {
        let state = self.state.lock();
        let mut out = String::new();
        let _ = writeln!(out, "concept {}", self.term);
        let sections: [(&str, Vec<String>); 4] = [
            ("beliefs", state.beliefs.iter().map(ToString::to_string).collect()),
            ("desires", state.desires.iter().map(ToString::to_string).collect()),
            ("questions", state.questions.iter().map(|t| t.to_string()).collect()),
            ("quests", state.quests.iter().map(|t| t.to_string()).collect()),
        ];
        for (title, lines) in sections {
            if lines.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {title}:");
            for line in lines {
                let _ = writeln!(out, "    {line}");
            }
        }
        out
    }
}

impl std::fmt::Debug for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concept").field("term", &self.term).finish_non_exhaustive()
    }
}

/// Same evidential base and occurrence time; creation time is ignored.
fn is_duplicate(new: &Sentence, old: &Sentence) -> bool {
    new.stamp().same_evidence(old.stamp()) && new.occurrence_time() == old.occurrence_time()
}

/// How well `solution` answers `problem`, with the query-variable bindings
/// that make the terms match. `None` when the terms do not match.
fn solution_quality(problem: &Sentence, solution: &Sentence, now: u64) -> Option<(f64, Bindings)> {
    let bindings = problem.term().unify_query(solution.term())?;
    let projected = solution.projection(problem.occurrence_time(), now);
    let truth = projected.truth()?;
    let quality = if problem.term().has_query_var() {
        truth.expectation() / f64::from(solution.term().complexity().max(1))
    } else {
        truth.confidence()
    };
    Some((quality, bindings))
}

/// First entry with the highest solution quality for `query`.
fn select_candidate<'a>(query: &Sentence, table: &'a [Sentence], now: u64) -> Option<&'a Sentence> {
    let mut best = 0.0;
    let mut candidate = None;
    for s in table {
        if let Some((quality, _)) = solution_quality(query, s, now)
            && quality > best
        {
            best = quality;
            candidate = Some(s);
        }
    }
    candidate
}

/// Revise `new` with `old` into a task carrying the pooled truth. The
/// triggering task loses priority and durability in proportion to how
/// little the revision changed its expectation.
fn revise(new: &Sentence, old: &Sentence, task: &Task, now: u64) -> Option<Arc<Task>> {
    let (Some(t1), Some(t2)) = (new.truth(), old.truth()) else {
        return None;
    };
    let truth = t1.revise(t2);
    let difference = (truth.expectation() - t1.expectation()).abs();
    task.update_budget(|b| {
        b.decrease_priority(1.0 - difference);
        b.set_durability(b.durability() * (1.0 - difference));
    });
    let after = task.budget();
    let budget = Budget::new(
        or(difference, after.priority()),
        (difference + after.durability()) / 2.0,
        truth.to_quality(),
    );
    let stamp = Stamp::merge(new.stamp(), old.stamp(), now);
    let sentence = Sentence::new(new.term().clone(), new.mark(), Some(truth), stamp);
    trace!(revised = %sentence, "revision");
    Some(Task::new(sentence, budget))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::memory::MemoryContext;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashMap;

    /// Memory stand-in that creates every concept on demand, except for
    /// terms listed in `refuse`.
    struct Fixture {
        params: Arc<Parameters>,
        concepts: Mutex<HashMap<Term, Arc<Concept>>>,
        refuse: Vec<Term>,
        events: Mutex<Vec<Event>>,
        executed: Mutex<Vec<Term>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::refusing(Vec::new())
        }

        fn refusing(refuse: Vec<Term>) -> Self {
            Self::with_params(Parameters::default(), refuse)
        }

        fn with_params(params: Parameters, refuse: Vec<Term>) -> Self {
            Self {
                params: Arc::new(params),
                concepts: Mutex::new(HashMap::new()),
                refuse,
                events: Mutex::new(Vec::new()),
                executed: Mutex::new(Vec::new()),
            }
        }

        fn concept(&self, term: &Term) -> Arc<Concept> {
            self.conceptualize(&Budget::new(0.5, 0.5, 0.5), term)
                .expect("fixture creates concepts")
        }

        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().iter().map(Event::kind).collect()
        }
    }

    impl MemoryContext for Fixture {
        fn conceptualize(&self, _budget: &Budget, term: &Term) -> Option<Arc<Concept>> {
            if self.refuse.contains(term) {
                return None;
            }
            let mut concepts = self.concepts.lock();
            let concept = concepts.entry(term.clone()).or_insert_with(|| {
                Arc::new(Concept::new(term.clone(), Arc::clone(&self.params), 1))
            });
            Some(Arc::clone(concept))
        }

        fn time(&self) -> u64 {
            10
        }

        fn params(&self) -> &Parameters {
            &self.params
        }

        fn emit(&self, event: Event) {
            self.events.lock().push(event);
        }

        fn execute(&self, operation: &Term, _task: &Arc<Task>) -> bool {
            self.executed.lock().push(operation.clone());
            true
        }
    }

    fn inh(s: &str, p: &str) -> Term {
        Term::inheritance(Term::named(s).unwrap(), Term::named(p).unwrap()).unwrap()
    }

    fn judgment(term: Term, f: f64, c: f64, serial: u64) -> Arc<Task> {
        Task::new(
            Sentence::judgment(term, TruthValue::new(f, c), Stamp::eternal(serial, 0)),
            Budget::new(0.8, 0.8, 0.9),
        )
    }

    fn question(term: Term, serial: u64) -> Arc<Task> {
        Task::new(Sentence::question(term, Stamp::eternal(serial, 0)), Budget::new(0.9, 0.9, 0.9))
    }

    #[test]
    fn test_unknown_punctuation_rejected() {
        let fx = Fixture::new();
        let concept = fx.concept(&inh("a", "b"));
        let task = Task::new(
            Sentence::new(inh("a", "b"), ';', None, Stamp::eternal(1, 0)),
            Budget::new(0.9, 0.9, 0.9),
        );
        let mut ctx = ReasonContext::new(&fx);
        assert!(!concept.direct_process(&mut ctx, &task));
        assert_eq!(concept.task_link_count(), 0);
        assert!(fx.kinds().is_empty());
    }

    #[test]
    fn test_judgment_stored_and_linked() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        assert!(concept.direct_process(&mut ctx, &judgment(term, 1.0, 0.9, 1)));

        assert_eq!(concept.beliefs().len(), 1);
        assert!(fx.kinds().contains(&EventKind::BeliefAdd));
        // self link
        assert_eq!(concept.task_link_count(), 1);
        // both components got a task link and a reverse term link
        for name in ["a", "b"] {
            let component = fx.concept(&Term::atom(name));
            assert_eq!(component.task_link_count(), 1, "{name}");
            assert_eq!(component.term_link_count(), 1, "{name}");
        }
        assert_eq!(concept.term_link_count(), 2);
    }

    #[test]
    fn test_duplicate_judgment_is_dropped() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &judgment(term.clone(), 1.0, 0.9, 1));
        fx.events.lock().clear();

        concept.direct_process(&mut ctx, &judgment(term, 1.0, 0.9, 1));
        assert_eq!(concept.beliefs().len(), 1);
        let kinds = fx.kinds();
        assert!(kinds.contains(&EventKind::TaskRemove));
        assert!(!kinds.contains(&EventKind::BeliefAdd));
    }

    #[test]
    fn test_revision_derives_pooled_task() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &judgment(term.clone(), 1.0, 0.9, 1));
        concept.direct_process(&mut ctx, &judgment(term, 0.0, 0.9, 2));

        let derived = ctx.take_derived();
        let revised = derived
            .iter()
            .find(|t| t.sentence().stamp().evidence().len() == 2)
            .expect("revised task");
        let truth = revised.sentence().truth().unwrap();
        assert_abs_diff_eq!(truth.frequency(), 0.5, epsilon = 1e-9);
        assert!(truth.confidence() > 0.9);
        assert!(ctx.current_belief().is_some());
    }

    #[test]
    fn test_question_answered_with_binding() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &judgment(term.clone(), 1.0, 0.9, 1));

        let q = question(inh("?x", "b"), 2);
        concept.direct_process(&mut ctx, &q);

        let best = q.best_solution().expect("answered");
        assert_eq!(best.term(), &term);
        let events = fx.events.lock();
        let bindings = events
            .iter()
            .find_map(|e| match e {
                Event::Answer { bindings, .. } => Some(bindings.clone()),
                _ => None,
            })
            .expect("answer event");
        let value = bindings.values().next().unwrap();
        assert_eq!(value, &Term::atom("a"));
        // priority lowered by the solution quality
        assert!(q.budget().priority() < 0.9);
    }

    #[test]
    fn test_pending_question_answered_by_later_judgment() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        let q = question(term.clone(), 1);
        concept.direct_process(&mut ctx, &q);
        assert!(q.best_solution().is_none());
        assert_eq!(concept.questions().len(), 1);

        concept.direct_process(&mut ctx, &judgment(term, 1.0, 0.9, 2));
        assert!(q.best_solution().is_some());
        assert!(fx.kinds().contains(&EventKind::Answer));
    }

    #[test]
    fn test_repeated_question_not_stored_twice() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &question(term.clone(), 1));
        concept.direct_process(&mut ctx, &question(term, 2));
        assert_eq!(concept.questions().len(), 1);
        let adds = fx
            .kinds()
            .iter()
            .filter(|k| **k == EventKind::QuestionAdd)
            .count();
        assert_eq!(adds, 1);
    }

    #[test]
    fn test_goal_without_operation_is_unexecutable() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        let goal = Task::new(
            Sentence::goal(term, TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0)),
            Budget::new(0.8, 0.8, 0.8),
        );
        concept.direct_process(&mut ctx, &goal);
        assert_eq!(concept.desires().len(), 1);
        assert!(concept.is_desired());
        let kinds = fx.kinds();
        assert!(kinds.contains(&EventKind::GoalAdd));
        assert!(kinds.contains(&EventKind::UnexecutableGoal));
    }

    #[test]
    fn test_desired_operation_executes() {
        let fx = Fixture::new();
        let op = Term::operation("say", vec![Term::atom("hello")]).unwrap();
        let concept = fx.concept(&op);
        let mut ctx = ReasonContext::new(&fx);
        let goal = Task::new(
            Sentence::goal(op.clone(), TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0)),
            Budget::new(0.8, 0.8, 0.8),
        );
        concept.direct_process(&mut ctx, &goal);
        assert_eq!(fx.executed.lock().as_slice(), &[op]);
        assert!(!fx.kinds().contains(&EventKind::UnexecutableGoal));
    }

    #[test]
    fn test_link_to_task_conserves_budget() {
        let x = Term::atom("x");
        let fx = Fixture::refusing(vec![x.clone()]);
        let term = Term::conjunction(vec![x, Term::atom("y"), Term::atom("z")]).unwrap();
        let concept = fx.concept(&term);
        let task = Task::new(
            Sentence::judgment(term, TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0)),
            Budget::new(0.6, 0.8, 0.5),
        );
        let mut ctx = ReasonContext::new(&fx);
        let report = concept.link_to_task(&mut ctx, &task);

        assert_abs_diff_eq!(report.input, 0.6);
        assert_abs_diff_eq!(report.delivered, 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(report.diverted, 0.2, epsilon = 1e-9);
        assert!(report.is_conserved(1e-9));
        let (task_balance, term_balance) = concept.balances();
        assert_abs_diff_eq!(task_balance, 0.2, epsilon = 1e-9);
        // x refused again when term links are built: 2 * 0.6 / 6
        assert_abs_diff_eq!(term_balance, 0.2, epsilon = 1e-9);

        let y = fx.concept(&Term::atom("y"));
        let link = &y.task_links()[0];
        assert_abs_diff_eq!(link.budget().priority(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_low_budget_goes_to_balance() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let task = Task::new(
            Sentence::judgment(term, TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0)),
            Budget::new(0.015, 0.8, 0.5),
        );
        let mut ctx = ReasonContext::new(&fx);
        let report = concept.link_to_task(&mut ctx, &task);
        assert_abs_diff_eq!(report.diverted, 0.015);
        assert!(report.is_conserved(1e-12));
        assert_eq!(concept.task_link_count(), 1);
    }

    #[test]
    fn test_term_links_recurse_into_compound_components() {
        let fx = Fixture::new();
        let inner = inh("a", "b");
        let term = Term::implication(inner.clone(), inh("c", "d")).unwrap();
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        let steps = concept.build_term_links(&mut ctx, &Budget::new(0.9, 0.9, 0.9));
        // outer step plus one per compound component
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|s| s.is_conserved(1e-9)));
        assert_eq!(fx.concept(&inner).term_link_count(), 3);
        assert!(fx.concept(&Term::atom("a")).term_link_count() >= 1);
    }

    #[test]
    fn test_select_term_link_requires_novelty() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &judgment(term, 1.0, 0.9, 1));

        let mut link = concept.take_task_link().unwrap();
        let first = concept.select_term_link(&mut link, 10, 100).unwrap();
        concept.return_term_link(&ctx, first);
        let second = concept.select_term_link(&mut link, 10, 100).unwrap();
        concept.return_term_link(&ctx, second);
        assert!(concept.select_term_link(&mut link, 11, 100).is_none());
        assert_eq!(concept.term_link_count(), 2);
        concept.return_task_link(&ctx, link);
        assert_eq!(concept.task_link_count(), 1);
    }

    #[test]
    fn test_get_belief_skips_overlapping_evidence() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        let stored = judgment(term.clone(), 1.0, 0.9, 1);
        concept.direct_process(&mut ctx, &stored);

        assert!(concept.get_belief(&mut ctx, &stored).is_none());
        let other = question(term, 5);
        let belief = concept.get_belief(&mut ctx, &other).unwrap();
        assert_eq!(belief.stamp().evidence(), &[1]);
        assert!(fx.kinds().contains(&EventKind::BeliefSelect));
    }

    #[test]
    fn test_statistics_and_end() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &judgment(term.clone(), 1.0, 0.8, 1));
        concept.direct_process(&mut ctx, &judgment(term, 0.0, 0.4, 2));

        assert_abs_diff_eq!(concept.beliefs_confidence_sum(), 1.2, epsilon = 1e-9);
        let mean = concept.beliefs_frequency_mean();
        assert!((0.0..=1.0).contains(&mean));
        let mut rng = SmallRng::seed_from_u64(42);
        assert!(concept.belief_random_by_confidence(&mut rng, true).is_some());
        assert!(concept.quality() > 0.0);
        assert!(concept.display_content().contains("beliefs:"));

        concept.discount_confidence(true);
        assert!(concept.beliefs()[0].truth().unwrap().confidence() < 0.9);

        concept.end();
        assert!(concept.beliefs().is_empty());
        assert_eq!(concept.task_link_count(), 0);
        assert_eq!(concept.term_link_count(), 0);
    }

    fn removed_link_keys(fx: &Fixture) -> Vec<(EventKind, Term, String)> {
        fx.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::TaskLinkRemove { concept, key } => {
                    Some((EventKind::TaskLinkRemove, concept.clone(), key.clone()))
                }
                Event::TermLinkRemove { concept, key } => {
                    Some((EventKind::TermLinkRemove, concept.clone(), key.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_neighbour_task_bag_diverts_share() {
        let x = Term::atom("x");
        let y = Term::atom("y");
        let fx = Fixture::with_params(
            Parameters {
                task_link_bag_size: 1,
                ..Parameters::default()
            },
            vec![x.clone()],
        );
        let mut ctx = ReasonContext::new(&fx);

        // y's only slot holds a link stronger than the share it will be offered
        let neighbour = fx.concept(&y);
        let strong = Task::new(
            Sentence::judgment(y.clone(), TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0)),
            Budget::new(0.9, 0.8, 0.5),
        );
        neighbour.link_to_task(&mut ctx, &strong);

        let term = Term::conjunction(vec![x, y, Term::atom("z")]).unwrap();
        let concept = fx.concept(&term);
        let task = Task::new(
            Sentence::judgment(term, TruthValue::new(1.0, 0.9), Stamp::eternal(2, 0)),
            Budget::new(0.6, 0.8, 0.5),
        );
        let report = concept.link_to_task(&mut ctx, &task);

        assert_abs_diff_eq!(report.delivered, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(report.diverted, 0.4, epsilon = 1e-9);
        assert!(report.is_conserved(1e-9));
        let (task_balance, _) = concept.balances();
        assert_abs_diff_eq!(task_balance, 0.4, epsilon = 1e-9);

        let links = neighbour.task_links();
        assert_eq!(links.len(), 1);
        assert_abs_diff_eq!(links[0].budget().priority(), 0.9);
        // a rejected newcomer is accounted in the balance, not reported as removed
        assert!(removed_link_keys(&fx).is_empty());
    }

    #[test]
    fn test_full_term_bags_divert_and_report_eviction() {
        let fx = Fixture::with_params(
            Parameters {
                term_link_bag_size: 1,
                ..Parameters::default()
            },
            Vec::new(),
        );
        let mut ctx = ReasonContext::new(&fx);
        let a = fx.concept(&Term::atom("a"));

        // a's slot takes the reverse link of <a --> c> at 1.0 / 4
        let ac = fx.concept(&inh("a", "c"));
        ac.build_term_links(&mut ctx, &Budget::new(1.0, 0.8, 0.5));
        let held = a.term_links()[0].key().clone();
        fx.events.lock().clear();

        let ab = inh("a", "b");
        let concept = fx.concept(&ab);
        let steps = concept.build_term_links(&mut ctx, &Budget::new(0.8, 0.8, 0.5));
        assert_eq!(steps.len(), 1);
        let step = steps[0];
        // 0.2 per direction: a rejects its 0.2, the other three land
        assert_abs_diff_eq!(step.delivered, 0.6, epsilon = 1e-9);
        assert_abs_diff_eq!(step.diverted, 0.2, epsilon = 1e-9);
        assert!(step.is_conserved(1e-9));
        let (_, term_balance) = concept.balances();
        assert_abs_diff_eq!(term_balance, 0.2, epsilon = 1e-9);
        assert_eq!(a.term_links()[0].key(), &held);

        // <a --> b> kept the newer of its two equal links and reported the older
        let kept = concept.term_links();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].target(), &Term::atom("b"));
        let removed = removed_link_keys(&fx);
        assert_eq!(removed.len(), 1);
        let (kind, owner, key) = &removed[0];
        assert_eq!(*kind, EventKind::TermLinkRemove);
        assert_eq!(owner, &ab);
        assert!(key.ends_with(" a"), "{key}");
    }

    #[test]
    fn test_task_link_eviction_is_reported() {
        let fx = Fixture::with_params(
            Parameters {
                task_link_bag_size: 1,
                ..Parameters::default()
            },
            Vec::new(),
        );
        let term = Term::atom("a");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        let weak = Task::new(
            Sentence::judgment(term.clone(), TruthValue::new(1.0, 0.9), Stamp::eternal(1, 0)),
            Budget::new(0.3, 0.8, 0.5),
        );
        concept.link_to_task(&mut ctx, &weak);
        let weak_key = concept.task_links()[0].key().clone();

        let strong = Task::new(
            Sentence::judgment(term.clone(), TruthValue::new(0.0, 0.9), Stamp::eternal(2, 0)),
            Budget::new(0.6, 0.8, 0.5),
        );
        concept.link_to_task(&mut ctx, &strong);

        let links = concept.task_links();
        assert_eq!(links.len(), 1);
        assert!(Arc::ptr_eq(links[0].task(), &strong));
        assert_eq!(
            removed_link_keys(&fx),
            vec![(EventKind::TaskLinkRemove, term, weak_key)]
        );
    }

    #[test]
    fn test_belief_overflow_reports_dropped_belief() {
        let fx = Fixture::with_params(
            Parameters {
                concept_beliefs_max: 1,
                ..Parameters::default()
            },
            Vec::new(),
        );
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &judgment(term.clone(), 1.0, 0.5, 1));
        concept.direct_process(&mut ctx, &judgment(term, 1.0, 0.9, 2));

        let beliefs = concept.beliefs();
        assert_eq!(beliefs.len(), 1);
        assert_eq!(beliefs[0].stamp().evidence(), &[2]);
        let events = fx.events.lock();
        let removed = events
            .iter()
            .find_map(|e| match e {
                Event::BeliefRemove { removed, .. } => Some(removed.clone()),
                _ => None,
            })
            .expect("belief removal");
        assert_eq!(removed.stamp().evidence(), &[1]);
        let adds = events.iter().filter(|e| e.kind() == EventKind::BeliefAdd).count();
        assert_eq!(adds, 2);
    }

    #[test]
    fn test_desire_overflow_reports_dropped_goal() {
        let fx = Fixture::with_params(
            Parameters {
                concept_goals_max: 1,
                ..Parameters::default()
            },
            Vec::new(),
        );
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        let goal = |c: f64, serial: u64| {
            Task::new(
                Sentence::goal(term.clone(), TruthValue::new(1.0, c), Stamp::eternal(serial, 0))
                    .with_revisible(false),
                Budget::new(0.8, 0.8, 0.8),
            )
        };
        concept.direct_process(&mut ctx, &goal(0.5, 1));
        concept.direct_process(&mut ctx, &goal(0.9, 2));

        assert_eq!(concept.desires()[0].stamp().evidence(), &[2]);
        let removed: Vec<Sentence> = fx
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::GoalRemove { removed, .. } => Some(removed.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].stamp().evidence(), &[1]);
    }

    #[test]
    fn test_question_fifo_overflow_reports_oldest() {
        let fx = Fixture::with_params(
            Parameters {
                concept_questions_max: 1,
                ..Parameters::default()
            },
            Vec::new(),
        );
        let concept = fx.concept(&inh("a", "b"));
        let mut ctx = ReasonContext::new(&fx);
        let first = question(inh("a", "b"), 1);
        let second = question(inh("?x", "b"), 2);
        concept.direct_process(&mut ctx, &first);
        concept.direct_process(&mut ctx, &second);

        let pending = concept.questions();
        assert_eq!(pending.len(), 1);
        assert!(Arc::ptr_eq(&pending[0], &second));
        let events = fx.events.lock();
        let removed = events
            .iter()
            .find_map(|e| match e {
                Event::QuestionRemove { task, .. } => Some(Arc::clone(task)),
                _ => None,
            })
            .expect("question removal");
        assert!(Arc::ptr_eq(&removed, &first));
    }

    #[test]
    fn test_quest_fifo_overflow_reports_oldest() {
        let fx = Fixture::with_params(
            Parameters {
                concept_questions_max: 1,
                ..Parameters::default()
            },
            Vec::new(),
        );
        let concept = fx.concept(&inh("a", "b"));
        let mut ctx = ReasonContext::new(&fx);
        let quest = |term: Term, serial: u64| {
            Task::new(Sentence::quest(term, Stamp::eternal(serial, 0)), Budget::new(0.9, 0.9, 0.9))
        };
        let first = quest(inh("a", "b"), 1);
        let second = quest(inh("?x", "b"), 2);
        concept.direct_process(&mut ctx, &first);
        concept.direct_process(&mut ctx, &second);

        assert_eq!(concept.quests().len(), 1);
        assert!(concept.questions().is_empty());
        let removed: Vec<Arc<Task>> = fx
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::QuestRemove { task, .. } => Some(Arc::clone(task)),
                _ => None,
            })
            .collect();
        assert_eq!(removed.len(), 1);
        assert!(Arc::ptr_eq(&removed[0], &first));
    }

    #[test]
    fn test_revision_derives_projected_temporal_belief() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        let at = |time: i64, serial: u64| {
            Task::new(
                Sentence::judgment(
                    term.clone(),
                    TruthValue::new(1.0, 0.9),
                    Stamp::new(serial, 0, Some(time)),
                ),
                Budget::new(0.8, 0.8, 0.9),
            )
        };
        // both before now (10), so projection keeps some confidence
        concept.direct_process(&mut ctx, &at(4, 1));
        concept.direct_process(&mut ctx, &at(6, 2));

        let derived = ctx.take_derived();
        let projected = derived
            .iter()
            .find(|t| t.sentence().stamp().evidence() == [1])
            .expect("projected belief");
        assert_eq!(projected.sentence().occurrence_time(), Some(6));
        assert!(
            derived
                .iter()
                .any(|t| t.sentence().stamp().evidence().len() == 2)
        );
    }

    #[test]
    fn test_eternal_revision_derives_no_projection() {
        let fx = Fixture::new();
        let term = inh("a", "b");
        let concept = fx.concept(&term);
        let mut ctx = ReasonContext::new(&fx);
        concept.direct_process(&mut ctx, &judgment(term.clone(), 1.0, 0.9, 1));
        concept.direct_process(&mut ctx, &judgment(term, 0.0, 0.9, 2));

        let derived = ctx.take_derived();
        assert!(
            derived
                .iter()
                .all(|t| t.sentence().stamp().evidence().len() == 2)
        );
    }
}
