use cb_core::messages::FALLBACK_ASK;
use cb_core::{Candidate, ContextFrame};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.55;
pub const SCORE_EPSILON: f64 = 1e-6;
/// Intents that never count as an interruption of the active procedure.
pub const SYSTEM_INTENTS: [&str; 1] = ["user_confirms_step"];

#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    threshold: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl Policy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best candidate; ties at the top score prefer the active domain, then
    /// interruptible intents, then original order.
    pub fn choose<'a>(
        &self,
        candidates: &'a [Candidate],
        active: Option<&ContextFrame>,
    ) -> Option<&'a Candidate> {
        let best_score = candidates
            .iter()
            .map(|candidate| candidate.score)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut tied = candidates
            .iter()
            .filter(|candidate| (candidate.score - best_score).abs() < SCORE_EPSILON)
            .collect::<Vec<_>>();

        if tied.len() > 1 {
            if let Some(active) = active {
                narrow(&mut tied, |candidate| candidate.domain == active.domain);
            }
        }
        if tied.len() > 1 {
            narrow(&mut tied, |candidate| candidate.can_interrupt);
        }
        tied.first().copied()
    }

    pub fn is_below_threshold(&self, candidate: Option<&Candidate>) -> bool {
        match candidate {
            None => true,
            Some(candidate) => candidate.score < self.threshold,
        }
    }

    pub fn should_interrupt(&self, candidate: &Candidate, active: Option<&ContextFrame>) -> bool {
        let Some(active) = active else {
            return false;
        };
        if SYSTEM_INTENTS.contains(&candidate.intent_id.as_str()) {
            return false;
        }
        candidate.can_interrupt && candidate.intent_id != active.intent_id
    }

    pub fn fallback_ask(&self) -> &'static str {
        FALLBACK_ASK
    }
}

fn narrow(tied: &mut Vec<&Candidate>, keep: impl Fn(&Candidate) -> bool) {
    if tied.iter().any(|candidate| keep(*candidate)) {
        tied.retain(|candidate| keep(*candidate));
    }
}
