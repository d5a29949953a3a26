use std::fmt;
use std::sync::Arc;

use crate::constants::MAX_EVIDENTIAL_BASE_LENGTH;

/// Evidential record of a sentence: which input serials it rests on, when it
/// was made, and when the event it describes happens (`None` = eternal).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Stamp {
    evidence: Arc<[u64]>,
    creation_time: u64,
    occurrence_time: Option<i64>,
}

impl Stamp {
    /// Stamp for a fresh input sentence carrying a single serial.
    pub fn new(serial: u64, creation_time: u64, occurrence_time: Option<i64>) -> Self {
        Self {
            evidence: Arc::from(vec![serial]),
            creation_time,
            occurrence_time,
        }
    }

    pub fn eternal(serial: u64, creation_time: u64) -> Self {
        Self::new(serial, creation_time, None)
    }

    /// Stamp of a conclusion drawn from two premises. Bases are interleaved,
    /// duplicates dropped, and truncated to the maximum base length. The
    /// occurrence time follows the first premise.
    pub fn merge(first: &Stamp, second: &Stamp, now: u64) -> Self {
        let mut evidence = Vec::with_capacity(first.evidence.len() + second.evidence.len());
        let mut a = first.evidence.iter();
        let mut b = second.evidence.iter();
        loop {
            let (x, y) = (a.next(), b.next());
            if x.is_none() && y.is_none() {
                break;
            }
            for serial in [x, y].into_iter().flatten() {
                if evidence.len() < MAX_EVIDENTIAL_BASE_LENGTH && !evidence.contains(serial) {
                    evidence.push(*serial);
                }
            }
        }
        Self {
            evidence: Arc::from(evidence),
            creation_time: now,
            occurrence_time: first.occurrence_time,
        }
    }

    pub fn evidence(&self) -> &[u64] {
        &self.evidence
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn occurrence_time(&self) -> Option<i64> {
        self.occurrence_time
    }

    pub fn is_eternal(&self) -> bool {
        self.occurrence_time.is_none()
    }

    pub fn with_occurrence(&self, occurrence_time: Option<i64>) -> Self {
        Self {
            occurrence_time,
            ..self.clone()
        }
    }

    /// Both stamps rest on exactly the same set of serials.
    pub fn same_evidence(&self, other: &Stamp) -> bool {
        self.evidence.len() == other.evidence.len()
            && self.evidence.iter().all(|s| other.evidence.contains(s))
    }

    /// At least one serial is shared.
    pub fn overlaps(&self, other: &Stamp) -> bool {
        self.evidence.iter().any(|s| other.evidence.contains(s))
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.creation_time)?;
        if let Some(t) = self.occurrence_time {
            write!(f, "|{t}")?;
        }
        write!(f, " :")?;
        for (i, serial) in self.evidence.iter().enumerate() {
            let sep = if i == 0 { " " } else { ";" };
            write!(f, "{sep}{serial}")?;
        }
        write!(f, "}}")
    }
}
