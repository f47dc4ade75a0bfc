use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatBrainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUi {
    #[serde(default)]
    pub buttons: Vec<String>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
}

impl StepUi {
    pub fn with_buttons(labels: &[&str]) -> Self {
        Self {
            buttons: labels.iter().map(|label| (*label).to_string()).collect(),
            media: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.media.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookSlot {
    Before,
    Action,
    After,
}

impl HookSlot {
    pub const ORDER: [HookSlot; 3] = [HookSlot::Before, HookSlot::Action, HookSlot::After];

    pub fn field_name(self) -> &'static str {
        match self {
            Self::Before => "before_hook",
            Self::Action => "action",
            Self::After => "after_hook",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub say: String,
    #[serde(default)]
    pub ui: StepUi,
    #[serde(default)]
    pub before_hook: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub after_hook: Option<String>,
}

impl Step {
    pub fn hook(&self, slot: HookSlot) -> Option<&str> {
        let name = match slot {
            HookSlot::Before => self.before_hook.as_deref(),
            HookSlot::Action => self.action.as_deref(),
            HookSlot::After => self.after_hook.as_deref(),
        };
        name.filter(|name| !name.is_empty())
    }

    /// Declared hook names in execution order.
    pub fn hooks(&self) -> impl Iterator<Item = (HookSlot, &str)> + '_ {
        HookSlot::ORDER
            .into_iter()
            .filter_map(move |slot| self.hook(slot).map(|name| (slot, name)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    pub domain: String,
    pub version: i64,
    #[serde(default)]
    pub can_interrupt: bool,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub required_slots: Vec<String>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub source_file: Option<String>,
}

impl Intent {
    pub fn validate(&self) -> Result<(), ChatBrainError> {
        if self.id.trim().is_empty() {
            return Err(ChatBrainError::load(
                "LOAD_INTENT_INVALID",
                "Intent id must not be empty.",
            ));
        }
        if self.steps.is_empty() {
            return Err(ChatBrainError::load(
                "LOAD_STEPS_INVALID",
                format!("Intent \"{}\" must declare at least one step.", self.id),
            ));
        }
        let mut seen = BTreeSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(ChatBrainError::load(
                    "LOAD_DUPLICATE_STEP",
                    format!("Intent \"{}\" repeats step id \"{}\".", self.id, step.id),
                ));
            }
        }
        Ok(())
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Text indexed for ranking: trigger phrases, or the id with separators
    /// turned into spaces when none are declared.
    pub fn ranking_document(&self) -> String {
        let parts = self
            .synonyms
            .iter()
            .chain(self.examples.iter())
            .map(String::as_str)
            .collect::<Vec<_>>();
        if parts.is_empty() {
            return self.id.replace(['_', '-', '.'], " ");
        }
        parts.join(" \n ")
    }
}

/// Immutable result of one successful load.
#[derive(Debug, Clone, Default)]
pub struct ScriptPack {
    intents: Vec<Intent>,
    by_id: HashMap<String, usize>,
    by_domain: HashMap<String, Vec<usize>>,
}

impl ScriptPack {
    pub fn new(intents: Vec<Intent>) -> Result<Self, ChatBrainError> {
        let mut by_id = HashMap::with_capacity(intents.len());
        let mut by_domain: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, intent) in intents.iter().enumerate() {
            if by_id.insert(intent.id.clone(), index).is_some() {
                return Err(ChatBrainError::load(
                    "LOAD_DUPLICATE_INTENT",
                    format!("Duplicate intent id \"{}\".", intent.id),
                ));
            }
            by_domain
                .entry(intent.domain.clone())
                .or_default()
                .push(index);
        }
        Ok(Self {
            intents,
            by_id,
            by_domain,
        })
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn intent_by_id(&self, intent_id: &str) -> Option<&Intent> {
        self.by_id.get(intent_id).map(|index| &self.intents[*index])
    }

    pub fn intents_by_domain(&self, domain: &str) -> Vec<&Intent> {
        self.by_domain
            .get(domain)
            .map(|indexes| indexes.iter().map(|index| &self.intents[*index]).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub intent_id: String,
    pub file: Option<String>,
    pub score: f64,
    pub can_interrupt: bool,
    pub domain: String,
}

impl Candidate {
    pub fn from_intent(intent: &Intent, score: f64) -> Self {
        Self {
            intent_id: intent.id.clone(),
            file: intent.source_file.clone(),
            score,
            can_interrupt: intent.can_interrupt,
            domain: intent.domain.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFrame {
    pub script_file: String,
    pub intent_id: String,
    pub domain: String,
    pub step_id: String,
    pub step_index: usize,
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
    pub version: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub interruption: bool,
}

impl ContextFrame {
    /// Frame positioned at the first step of `intent`.
    pub fn enter(intent: &Intent, interruption: bool) -> Self {
        Self {
            script_file: intent
                .source_file
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            intent_id: intent.id.clone(),
            domain: intent.domain.clone(),
            step_id: intent
                .steps
                .first()
                .map(|step| step.id.clone())
                .unwrap_or_default(),
            step_index: 0,
            slots: BTreeMap::new(),
            version: intent.version,
            timestamp: Utc::now(),
            interruption,
        }
    }

    pub fn move_to(&mut self, intent: &Intent, step_index: usize) {
        if let Some(step) = intent.step(step_index) {
            self.step_index = step_index;
            self.step_id = step.id.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    pub session_id: String,
    pub stack: Vec<ContextFrame>,
    pub pending_resume: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub reply: String,
    pub ui: StepUi,
}

impl Reply {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            ui: StepUi::default(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            reply: text.into(),
            ui: StepUi::with_buttons(labels),
        }
    }

    pub fn step(step: &Step) -> Self {
        Self {
            reply: step.say.clone(),
            ui: step.ui.clone(),
        }
    }
}
