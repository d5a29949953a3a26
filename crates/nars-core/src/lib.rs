//! Attention substrate for a non-axiomatic reasoner.
//!
//! Every unit of work carries a budget (priority, durability, quality).
//! Bounded bags select items at random, biased by priority, and forget them
//! over time. Concepts hold link bags and ranked belief tables, and spread a
//! task's budget across the structure of its term without creating or losing
//! any of it.
//!
//! Zero I/O: inference rules, parsing and persistence live elsewhere.

pub mod bag;
pub mod budget;
pub mod concept;
pub mod constants;
pub mod delay_bag;
pub mod error;
pub mod event;
pub mod inference;
pub mod link;
pub mod memory;
pub mod params;
pub mod sentence;
pub mod stamp;
pub mod table;
pub mod template;
pub mod term;
pub mod truth;

pub use bag::{Bag, Item, ItemBuilder, UpdateResult};
pub use budget::Budget;
pub use concept::{Concept, Propagation};
pub use constants::{BAG_LEVELS, EPSILON};
pub use delay_bag::DelayBag;
pub use error::{ConfigError, TermError};
pub use event::{Event, EventBus, EventKind};
pub use inference::{Inference, Passive, ReasonContext};
pub use link::{TaskLink, TermLink};
pub use memory::{Memory, MemoryContext, MemoryStats};
pub use params::Parameters;
pub use sentence::{Punctuation, Sentence, Task};
pub use stamp::Stamp;
pub use table::{Admission, BeliefTable, QuestionAdmission, QuestionTable};
pub use template::{LinkTemplates, LinkType, TermLinkTemplate};
pub use term::{Bindings, Operator, Term, VarKind, Variable};
pub use truth::TruthValue;
