use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use cb_core::{ChatBrainError, HookSlot, Intent, ScriptPack, Step};
use tracing::{info, warn};

pub struct HookContext<'a> {
    pub session_id: &'a str,
    pub intent: &'a Intent,
    pub step: &'a Step,
    pub slot: HookSlot,
}

pub trait Hook: Send + Sync {
    fn invoke(&self, context: &HookContext<'_>) -> Result<(), ChatBrainError>;
}

impl<F> Hook for F
where
    F: Fn(&HookContext<'_>) -> Result<(), ChatBrainError> + Send + Sync,
{
    fn invoke(&self, context: &HookContext<'_>) -> Result<(), ChatBrainError> {
        self(context)
    }
}

#[derive(Debug, Default)]
pub struct NoopHook;

impl Hook for NoopHook {
    fn invoke(&self, _context: &HookContext<'_>) -> Result<(), ChatBrainError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogStepHook;

impl Hook for LogStepHook {
    fn invoke(&self, context: &HookContext<'_>) -> Result<(), ChatBrainError> {
        info!(
            session = context.session_id,
            intent = %context.intent.id,
            step = %context.step.id,
            slot = context.slot.field_name(),
            "step rendered"
        );
        Ok(())
    }
}

/// Named hooks that script steps may reference.
#[derive(Clone)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Arc<dyn Hook>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl HookRegistry {
    pub fn empty() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("noop", NoopHook);
        registry.register("log_step", LogStepHook);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, hook: impl Hook + 'static) -> &mut Self {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Hook>> {
        self.hooks.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.keys().map(String::as_str).collect()
    }

    /// Resolves every hook named in `pack`; an unknown name fails the bind.
    pub fn bind(&self, pack: &ScriptPack) -> Result<HookBindings, ChatBrainError> {
        let mut by_intent = HashMap::with_capacity(pack.len());
        for intent in pack.intents() {
            let mut steps = Vec::with_capacity(intent.steps.len());
            for step in &intent.steps {
                let mut bound = Vec::new();
                for (slot, name) in step.hooks() {
                    let hook = self.get(name).ok_or_else(|| {
                        let error = ChatBrainError::load(
                            "LOAD_HOOK_UNKNOWN",
                            format!(
                                "Step \"{}\" of intent \"{}\" references unknown {} \"{}\".",
                                step.id,
                                intent.id,
                                slot.field_name(),
                                name
                            ),
                        );
                        match &intent.source_file {
                            Some(file) => error.with_source_file(file.clone()),
                            None => error,
                        }
                    })?;
                    bound.push(BoundHook {
                        slot,
                        name: name.to_string(),
                        hook,
                    });
                }
                steps.push(bound);
            }
            by_intent.insert(intent.id.clone(), steps);
        }
        Ok(HookBindings { by_intent })
    }
}

struct BoundHook {
    slot: HookSlot,
    name: String,
    hook: Arc<dyn Hook>,
}

/// Hooks resolved for one script pack, indexed by intent and step position.
#[derive(Default)]
pub struct HookBindings {
    by_intent: HashMap<String, Vec<Vec<BoundHook>>>,
}

impl fmt::Debug for HookBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBindings")
            .field("intents", &self.by_intent.len())
            .finish()
    }
}

impl HookBindings {
    /// Runs the step's hooks in before, action, after order. Failures are
    /// logged and do not stop the remaining hooks. Returns how many ran.
    pub fn run(&self, session_id: &str, intent: &Intent, step_index: usize) -> usize {
        let Some(bound) = self
            .by_intent
            .get(&intent.id)
            .and_then(|steps| steps.get(step_index))
        else {
            return 0;
        };
        let Some(step) = intent.step(step_index) else {
            return 0;
        };

        for entry in bound {
            let context = HookContext {
                session_id,
                intent,
                step,
                slot: entry.slot,
            };
            if let Err(error) = entry.hook.invoke(&context) {
                warn!(
                    hook = %entry.name,
                    intent = %intent.id,
                    step = %step.id,
                    %error,
                    "hook failed"
                );
            }
        }
        bound.len()
    }
}
