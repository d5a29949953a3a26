//! Owner of all live concepts and the driver of reasoning cycles.
//!
//! Concepts live in a [`DelayBag`] (so unused ones fade) and in an index
//! keyed by term. Only the memory creates or forgets concepts. Lock order is
//! index, then bag, then pending activations; none is held while a concept
//! is being worked on.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::bag::{Bag, Item, ItemBuilder};
use crate::budget::Budget;
use crate::concept::Concept;
use crate::constants::DERIVED_TASK_LIMIT;
use crate::delay_bag::DelayBag;
use crate::error::ConfigError;
use crate::event::{Event, EventBus};
use crate::inference::{Inference, ReasonContext};
use crate::params::Parameters;
use crate::sentence::Task;
use crate::stamp::Stamp;
use crate::term::{OPERATOR_PREFIX, Term};

/// What a concept needs from the memory that owns it.
pub trait MemoryContext: Send + Sync {
    /// Get or create the concept for `term`, activating it with `budget`.
    /// May refuse under capacity pressure.
    fn conceptualize(&self, budget: &Budget, term: &Term) -> Option<Arc<Concept>>;

    /// Current cycle.
    fn time(&self) -> u64;

    fn params(&self) -> &Parameters;

    fn emit(&self, event: Event);

    /// Run the operator named by `operation`. Returns whether it ran.
    fn execute(&self, _operation: &Term, _task: &Arc<Task>) -> bool {
        false
    }
}

/// Callback for an executable operation. Receives the operation's arguments.
pub type OperatorFn = Arc<dyn Fn(&[Term], &Arc<Task>) -> bool + Send + Sync>;

pub struct ConceptEntry {
    concept: Arc<Concept>,
    budget: Budget,
}

impl ConceptEntry {
    pub fn concept(&self) -> &Arc<Concept> {
        &self.concept
    }
}

impl Item for ConceptEntry {
    type Key = Term;

    fn key(&self) -> &Term {
        self.concept.term()
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

struct Activation<'a> {
    concept: &'a Arc<Concept>,
    budget: Budget,
}

impl ItemBuilder<ConceptEntry> for Activation<'_> {
    fn key(&self) -> Term {
        self.concept.term().clone()
    }

    fn budget(&self) -> Budget {
        self.budget
    }

    fn build(&self) -> ConceptEntry {
        ConceptEntry {
            concept: Arc::clone(self.concept),
            budget: self.budget,
        }
    }
}

/// Point-in-time counters across all live concepts.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub time: u64,
    pub concepts: usize,
    pub task_links: usize,
    pub term_links: usize,
    pub beliefs: usize,
    pub desires: usize,
    pub questions: usize,
    pub task_balance: f64,
    pub term_balance: f64,
}

pub struct Memory {
    params: Arc<Parameters>,
    clock: AtomicU64,
    serial: AtomicU64,
    concepts: Mutex<DelayBag<ConceptEntry>>,
    index: RwLock<HashMap<Term, Arc<Concept>>>,
    /// Activation received while a cycle holds the concept out of the bag,
    /// merged back when the cycle returns it.
    pending: Mutex<HashMap<Term, Budget>>,
    events: EventBus,
    operators: RwLock<HashMap<String, OperatorFn>>,
    rng: Mutex<SmallRng>,
}

impl Memory {
    pub fn new(params: Parameters) -> Result<Self, ConfigError> {
        params.validate()?;
        let mut rng = match params.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        let bag = Bag::with_seed(params.concept_bag_size, params.concept_bag_levels, rng.random())
            .with_forget_relative(params.forget_quality_relative);
        let forget_cycles = params.cycles(params.concept_forget_durations);
        Ok(Self {
            concepts: Mutex::new(DelayBag::new(bag, forget_cycles)),
            params: Arc::new(params),
            clock: AtomicU64::new(0),
            serial: AtomicU64::new(0),
            index: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            events: EventBus::new(),
            operators: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Next evidence serial for an input sentence.
    pub fn new_serial(&self) -> u64 {
        self.serial.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Fresh stamp at the current time. `occurrence` of `None` is eternal.
    pub fn new_stamp(&self, occurrence: Option<i64>) -> Stamp {
        Stamp::new(self.new_serial(), self.time(), occurrence)
    }

    /// Register an operator. The name may be given with or without the `^`
    /// prefix.
    pub fn register_operator(
        &self,
        name: &str,
        f: impl Fn(&[Term], &Arc<Task>) -> bool + Send + Sync + 'static,
    ) {
        let name = name.trim_start_matches(OPERATOR_PREFIX).to_string();
        self.operators.write().insert(name, Arc::new(f));
    }

    pub fn concept(&self, term: &Term) -> Option<Arc<Concept>> {
        self.index.read().get(term).cloned()
    }

    pub fn concept_count(&self) -> usize {
        self.index.read().len()
    }

    /// Process `task` immediately, then everything it derives, breadth
    /// first. At most `DERIVED_TASK_LIMIT` tasks are handled per call.
    /// Returns how many tasks reached a concept.
    pub fn input(&self, task: Arc<Task>) -> usize {
        let threshold = self.params.budget_threshold;
        let mut queue = VecDeque::from([task]);
        let mut handled = 0;
        let mut popped = 0;
        while let Some(task) = queue.pop_front() {
            if popped == DERIVED_TASK_LIMIT {
                debug!(dropped = queue.len() + 1, "derived task limit reached");
                break;
            }
            popped += 1;
            if !task.above_threshold(threshold) {
                continue;
            }
            let Some(concept) = self.conceptualize(&task.budget(), task.term()) else {
                continue;
            };
            let mut ctx = ReasonContext::new(self);
            if concept.direct_process(&mut ctx, &task) {
                handled += 1;
            }
            queue.extend(ctx.take_derived());
        }
        handled
    }

    /// One reasoning step: select a concept, one of its task links and a
    /// novel term link, run `inference` on them, return everything with
    /// forgetting applied, and feed conclusions back through `input`.
    /// Returns `false` when memory is empty.
    pub fn cycle(&self, inference: &dyn Inference) -> bool {
        let now = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(entry) = self.concepts.lock().take_next(now) else {
            return false;
        };
        let concept = Arc::clone(entry.concept());

        let mut ctx = ReasonContext::new(self);
        if let Some(mut task_link) = concept.take_task_link() {
            let term_link = concept.select_term_link(&mut task_link, now, self.params.novelty_horizon);
            inference.reason(&mut ctx, &concept, &task_link, term_link.as_ref());
            if let Some(term_link) = term_link {
                concept.return_term_link(&ctx, term_link);
            }
            concept.return_task_link(&ctx, task_link);
        }
        let derived = ctx.take_derived();

        self.restore(entry);
        for task in derived {
            self.input(task);
        }
        true
    }

    pub fn stats(&self) -> MemoryStats {
        let concepts: Vec<Arc<Concept>> = self.index.read().values().cloned().collect();
        let mut stats = MemoryStats {
            time: self.time(),
            concepts: concepts.len(),
            ..MemoryStats::default()
        };
        for c in &concepts {
            stats.task_links += c.task_link_count();
            stats.term_links += c.term_link_count();
            stats.beliefs += c.beliefs().len();
            stats.desires += c.desires().len();
            stats.questions += c.questions().len();
            let (task_balance, term_balance) = c.balances();
            stats.task_balance += task_balance;
            stats.term_balance += term_balance;
        }
        stats
    }

    /// Return a concept taken by a cycle, with any activation it received
    /// meanwhile.
    fn restore(&self, mut entry: ConceptEntry) {
        if let Some(boost) = self.pending.lock().remove(entry.key()) {
            entry.budget_mut().merge(&boost);
        }
        let evicted = self.concepts.lock().put_back(entry);
        if let Some(evicted) = evicted {
            self.forget(evicted);
        }
    }

    /// Remove a concept pushed out of the bag. The index entry is only
    /// removed if it still refers to the same concept.
    fn forget(&self, entry: ConceptEntry) {
        let term = entry.concept.term().clone();
        {
            let mut index = self.index.write();
            if index
                .get(&term)
                .is_some_and(|c| Arc::ptr_eq(c, &entry.concept))
            {
                index.remove(&term);
            }
        }
        self.pending.lock().remove(&term);
        self.finish(entry.concept);
    }

    fn finish(&self, concept: Arc<Concept>) {
        debug!(concept = %concept.term(), "concept forgotten");
        concept.end();
        self.events.emit(Event::ConceptForget {
            term: concept.term().clone(),
        });
    }
}

impl MemoryContext for Memory {
    fn conceptualize(&self, budget: &Budget, term: &Term) -> Option<Arc<Concept>> {
        if matches!(term, Term::Variable(_)) {
            return None;
        }

        if let Some(concept) = self.concept(term) {
            let mut concepts = self.concepts.lock();
            if concepts.contains(term) {
                let _ = concepts.update(&Activation {
                    concept: &concept,
                    budget: *budget,
                });
            } else {
                // held by a running cycle; merged when the cycle returns it
                trace!(concept = %term, priority = budget.priority(), "activation deferred");
                self.pending
                    .lock()
                    .entry(term.clone())
                    .and_modify(|b| b.merge(budget))
                    .or_insert(*budget);
            }
            return Some(concept);
        }

        let now = self.time();
        let (concept, evicted) = {
            let mut index = self.index.write();
            if let Some(concept) = index.get(term) {
                return Some(Arc::clone(concept));
            }
            let mut concepts = self.concepts.lock();
            if concepts.len() >= concepts.capacity()
                && concepts
                    .lowest_priority()
                    .is_some_and(|lowest| budget.priority() < lowest)
            {
                warn!(term = %term, priority = budget.priority(), "concept refused under capacity pressure");
                return None;
            }

            let seed = self.rng.lock().random();
            let concept = Arc::new(Concept::new(term.clone(), Arc::clone(&self.params), seed));
            let mut entry_budget = *budget;
            entry_budget.touch(now);
            let evicted = concepts.put(ConceptEntry {
                concept: Arc::clone(&concept),
                budget: entry_budget,
            });
            index.insert(term.clone(), Arc::clone(&concept));
            let evicted = evicted.map(|e| {
                index.remove(e.concept.term());
                e.concept
            });
            (concept, evicted)
        };

        debug!(concept = %term, "concept created");
        self.events.emit(Event::ConceptNew { term: term.clone() });
        if let Some(evicted) = evicted {
            self.finish(evicted);
        }
        Some(concept)
    }

    fn time(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    fn params(&self) -> &Parameters {
        &self.params
    }

    fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    fn execute(&self, operation: &Term, task: &Arc<Task>) -> bool {
        let Some((name, args)) = operation.as_operation() else {
            return false;
        };
        let name = name.trim_start_matches(OPERATOR_PREFIX);
        let Some(op) = self.operators.read().get(name).cloned() else {
            return false;
        };
        debug!(operator = name, "executing operation");
        op(args, task)
    }
}
