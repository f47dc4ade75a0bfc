use std::collections::HashMap;

use cb_core::{ContextFrame, ContextState};

pub const DEFAULT_MAX_DEPTH: usize = 2;

/// What happens when a push would exceed the depth cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop frames from the bottom of the stack.
    #[default]
    EvictOldest,
    /// Refuse the new frame and leave the stack untouched.
    RejectNewest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Pushed,
    Evicted(Vec<ContextFrame>),
    Rejected(ContextFrame),
}

/// Per-session bounded frame stacks plus the pending-resume marker.
#[derive(Debug, Clone)]
pub struct ContextManager {
    max_depth: usize,
    overflow_policy: OverflowPolicy,
    sessions: HashMap<String, Vec<ContextFrame>>,
    pending_resume: HashMap<String, String>,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, OverflowPolicy::default())
    }
}

impl ContextManager {
    pub fn new(max_depth: usize, overflow_policy: OverflowPolicy) -> Self {
        Self {
            max_depth: max_depth.max(1),
            overflow_policy,
            sessions: HashMap::new(),
            pending_resume: HashMap::new(),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    pub fn stack(&self, session_id: &str) -> &[ContextFrame] {
        self.sessions
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn depth(&self, session_id: &str) -> usize {
        self.stack(session_id).len()
    }

    pub fn push(&mut self, session_id: &str, frame: ContextFrame) -> PushOutcome {
        let stack = self.sessions.entry(session_id.to_string()).or_default();
        if stack.len() >= self.max_depth && self.overflow_policy == OverflowPolicy::RejectNewest {
            return PushOutcome::Rejected(frame);
        }

        stack.push(frame);
        let overflow = stack.len().saturating_sub(self.max_depth);
        if overflow == 0 {
            return PushOutcome::Pushed;
        }
        PushOutcome::Evicted(stack.drain(..overflow).collect())
    }

    pub fn pop(&mut self, session_id: &str) -> Option<ContextFrame> {
        let stack = self.sessions.get_mut(session_id)?;
        let frame = stack.pop();
        if stack.is_empty() {
            self.sessions.remove(session_id);
            self.pending_resume.remove(session_id);
        }
        frame
    }

    pub fn peek(&self, session_id: &str) -> Option<&ContextFrame> {
        self.stack(session_id).last()
    }

    pub fn peek_mut(&mut self, session_id: &str) -> Option<&mut ContextFrame> {
        self.sessions.get_mut(session_id)?.last_mut()
    }

    pub fn clear(&mut self, session_id: &str) {
        self.sessions.remove(session_id);
        self.pending_resume.remove(session_id);
    }

    pub fn is_task_active(&self, session_id: &str) -> bool {
        self.peek(session_id).is_some()
    }

    pub fn set_pending_resume(&mut self, session_id: &str, intent_id: &str) {
        self.pending_resume
            .insert(session_id.to_string(), intent_id.to_string());
    }

    pub fn pop_pending_resume(&mut self, session_id: &str) -> Option<String> {
        self.pending_resume.remove(session_id)
    }

    pub fn pending_resume(&self, session_id: &str) -> Option<&str> {
        self.pending_resume.get(session_id).map(String::as_str)
    }

    pub fn state(&self, session_id: &str) -> ContextState {
        ContextState {
            session_id: session_id.to_string(),
            stack: self.stack(session_id).to_vec(),
            pending_resume: self.pending_resume(session_id).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod context_tests {
    use super::*;
    use crate::runtime_test_support::pack_from;

    fn frame(intent_id: &str) -> ContextFrame {
        let pack = pack_from(&[(
            "a.yaml",
            "intents:\n  - {id: a, domain: d, version: 1, steps: [{id: s, say: x}]}\n  - {id: b, domain: d, version: 1, steps: [{id: s, say: x}]}\n  - {id: c, domain: d, version: 1, steps: [{id: s, say: x}]}\n",
        )]);
        let intent = pack.intent_by_id(intent_id).expect("intent");
        ContextFrame::enter(intent, false)
    }

    fn ids(manager: &ContextManager, session_id: &str) -> Vec<String> {
        manager
            .stack(session_id)
            .iter()
            .map(|frame| frame.intent_id.clone())
            .collect()
    }

    #[test]
    fn push_evicts_oldest_beyond_cap() {
        let mut manager = ContextManager::default();
        assert_eq!(manager.push("s", frame("a")), PushOutcome::Pushed);
        assert_eq!(manager.push("s", frame("b")), PushOutcome::Pushed);
        let outcome = manager.push("s", frame("c"));
        assert!(matches!(
            outcome,
            PushOutcome::Evicted(ref evicted) if evicted.len() == 1 && evicted[0].intent_id == "a"
        ));
        assert_eq!(ids(&manager, "s"), vec!["b", "c"]);
        assert!(manager.depth("s") <= manager.max_depth());
    }

    #[test]
    fn reject_policy_keeps_stack() {
        let mut manager = ContextManager::new(1, OverflowPolicy::RejectNewest);
        assert_eq!(manager.push("s", frame("a")), PushOutcome::Pushed);
        assert!(matches!(
            manager.push("s", frame("b")),
            PushOutcome::Rejected(ref rejected) if rejected.intent_id == "b"
        ));
        assert_eq!(ids(&manager, "s"), vec!["a"]);
        assert_eq!(manager.overflow_policy(), OverflowPolicy::RejectNewest);
    }

    #[test]
    fn depth_cap_is_at_least_one() {
        let mut manager = ContextManager::new(0, OverflowPolicy::EvictOldest);
        assert_eq!(manager.max_depth(), 1);
        manager.push("s", frame("a"));
        manager.push("s", frame("b"));
        assert_eq!(ids(&manager, "s"), vec!["b"]);
    }

    #[test]
    fn pop_clears_pending_resume_when_empty() {
        let mut manager = ContextManager::default();
        manager.push("s", frame("a"));
        manager.push("s", frame("b"));
        manager.set_pending_resume("s", "a");

        assert_eq!(manager.pop("s").map(|f| f.intent_id), Some("b".to_string()));
        assert_eq!(manager.pending_resume("s"), Some("a"));
        assert!(manager.pop("s").is_some());
        assert_eq!(manager.pending_resume("s"), None);
        assert!(manager.pop("s").is_none());
    }

    #[test]
    fn unknown_sessions_behave_as_empty() {
        let mut manager = ContextManager::default();
        assert!(manager.peek("ghost").is_none());
        assert!(manager.pop("ghost").is_none());
        assert!(!manager.is_task_active("ghost"));
        assert!(manager.pop_pending_resume("ghost").is_none());
        manager.clear("ghost");
        let state = manager.state("ghost");
        assert!(state.stack.is_empty());
        assert!(state.pending_resume.is_none());
    }

    #[test]
    fn sessions_are_isolated_and_clear_drops_marker() {
        let mut manager = ContextManager::default();
        manager.push("one", frame("a"));
        manager.push("two", frame("b"));
        manager.set_pending_resume("one", "a");

        manager.clear("one");
        assert!(manager.stack("one").is_empty());
        assert!(manager.pending_resume("one").is_none());
        assert_eq!(ids(&manager, "two"), vec!["b"]);

        manager.peek_mut("two").expect("frame").step_index = 3;
        assert_eq!(manager.state("two").stack[0].step_index, 3);
        assert_eq!(manager.pop_pending_resume("one"), None);
    }
}
