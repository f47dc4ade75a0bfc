use cb_core::Intent;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChatCommandAction {
    Continue,
    Quit,
    NotHandled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct IntentSummary {
    pub(crate) id: String,
    pub(crate) domain: String,
    pub(crate) version: i64,
    pub(crate) can_interrupt: bool,
    pub(crate) steps: usize,
    pub(crate) source_file: Option<String>,
}

impl From<&Intent> for IntentSummary {
    fn from(intent: &Intent) -> Self {
        Self {
            id: intent.id.clone(),
            domain: intent.domain.clone(),
            version: intent.version,
            can_interrupt: intent.can_interrupt,
            steps: intent.steps.len(),
            source_file: intent.source_file.clone(),
        }
    }
}
