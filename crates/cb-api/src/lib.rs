use std::path::Path;
use std::sync::Arc;

use cb_core::{Button, Candidate, ChatBrainError, ContextState, Intent, Reply, ScriptPack, StepUi};
use cb_nlu::{NluIndex, Policy, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TOP_K};
use cb_runtime::{ContextManager, Executor, DEFAULT_MAX_DEPTH};
use serde::Serialize;
use tracing::{info, instrument, warn};

pub use cb_nlu::{Embedder, HashedTrigramEmbedder};
pub use cb_runtime::{Hook, HookContext, HookRegistry, OverflowPolicy};

#[derive(Clone, Default)]
pub struct ChatBrainOptions {
    pub max_depth: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub use_embedding: Option<bool>,
    pub overflow_policy: Option<OverflowPolicy>,
    pub top_k: Option<usize>,
    pub hooks: Option<HookRegistry>,
    pub embedder: Option<Arc<dyn Embedder>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub intents_count: usize,
    pub folder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDebug {
    pub top_k: Vec<Candidate>,
    pub chosen: Option<Candidate>,
    pub stack_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub reply: String,
    pub ui: StepUi,
    pub debug: MessageDebug,
}

struct Turn {
    reply: Reply,
    top_k: Vec<Candidate>,
    chosen: Option<Candidate>,
}

impl Turn {
    fn plain(reply: Reply) -> Self {
        Self {
            reply,
            top_k: Vec::new(),
            chosen: None,
        }
    }
}

/// Dialogue engine: script loading, ranking, selection and execution behind
/// one call surface.
pub struct ChatBrain {
    nlu: NluIndex,
    policy: Policy,
    executor: Executor,
    hooks: HookRegistry,
    top_k: usize,
    embedder: Option<Arc<dyn Embedder>>,
}

impl Default for ChatBrain {
    fn default() -> Self {
        Self::new(ChatBrainOptions::default())
    }
}

impl ChatBrain {
    pub fn new(options: ChatBrainOptions) -> Self {
        let context = ContextManager::new(
            options.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            options.overflow_policy.unwrap_or_default(),
        );
        let embedder = options
            .use_embedding
            .unwrap_or(false)
            .then(|| options.embedder.unwrap_or_else(cb_nlu::default_embedder));
        let mut engine = Self {
            nlu: NluIndex::new(false),
            policy: Policy::new(
                options
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            ),
            executor: Executor::new(context),
            hooks: options.hooks.unwrap_or_default(),
            top_k: options.top_k.unwrap_or(DEFAULT_TOP_K).max(1),
            embedder,
        };
        engine.nlu = engine.fresh_index();
        engine
    }

    /// Engine that tries `folder` at start-up and starts empty when the load
    /// fails.
    pub fn with_default_scripts(options: ChatBrainOptions, folder: impl AsRef<Path>) -> Self {
        let mut engine = Self::new(options);
        if let Err(error) = engine.load_scripts(folder.as_ref()) {
            warn!(
                folder = %folder.as_ref().display(),
                %error,
                "default scripts not loaded, starting empty"
            );
        }
        engine
    }

    pub fn load_scripts(&mut self, folder: impl AsRef<Path>) -> Result<LoadSummary, ChatBrainError> {
        let folder = folder.as_ref();
        let pack = cb_loader::load_from_folder(folder)?;
        self.load_script_pack(pack, folder.display().to_string())
    }

    /// Commits `pack` together with its ranking index and hook bindings; on
    /// error the previous pack stays active.
    pub fn load_script_pack(
        &mut self,
        pack: ScriptPack,
        origin: impl Into<String>,
    ) -> Result<LoadSummary, ChatBrainError> {
        let pack = Arc::new(pack);
        let bindings = self.hooks.bind(&pack)?;
        let mut nlu = self.fresh_index();
        nlu.build(Arc::clone(&pack))?;

        let summary = LoadSummary {
            intents_count: pack.len(),
            folder: origin.into(),
        };
        self.nlu = nlu;
        self.executor.load_script_pack(pack, bindings);
        info!(
            intents = summary.intents_count,
            folder = %summary.folder,
            "scripts loaded"
        );
        Ok(summary)
    }

    pub fn is_loaded(&self) -> bool {
        self.nlu.is_built()
    }

    #[instrument(skip(self, text), fields(session = session_id))]
    pub fn handle_message(
        &mut self,
        session_id: &str,
        text: &str,
    ) -> Result<MessageResponse, ChatBrainError> {
        let message = text.trim();
        let turn = self.dispatch(session_id, message)?;
        let stack_depth = self.executor.context().depth(session_id);

        info!(
            session = session_id,
            text = message,
            chosen = ?turn.chosen.as_ref().map(|candidate| candidate.intent_id.as_str()),
            score = turn.chosen.as_ref().map_or(0.0, |candidate| candidate.score),
            stack_depth,
            reply = %turn.reply.reply,
            "interaction"
        );

        Ok(MessageResponse {
            reply: turn.reply.reply,
            ui: turn.reply.ui,
            debug: MessageDebug {
                top_k: turn.top_k,
                chosen: turn.chosen,
                stack_depth,
            },
        })
    }

    fn dispatch(&mut self, session_id: &str, message: &str) -> Result<Turn, ChatBrainError> {
        if message.is_empty() {
            return Ok(Turn::plain(Reply::message(self.policy.fallback_ask())));
        }

        let button = Button::parse(message);
        if !button.is_some_and(Button::is_resume_answer) {
            if let Some(paused) = self.executor.paused_reply(session_id) {
                return Ok(Turn::plain(paused));
            }
        }
        if self.executor.version_prompt(session_id).is_some()
            && !button.is_some_and(Button::is_version_answer)
        {
            return Ok(Turn::plain(Executor::version_conflict_reply()));
        }
        if button.is_some() {
            return Ok(Turn::plain(self.executor.handle_button(session_id, message)));
        }

        let top_k = self.nlu.rank(message, self.top_k)?;
        let chosen = self
            .policy
            .choose(&top_k, self.executor.context().peek(session_id))
            .filter(|candidate| !self.policy.is_below_threshold(Some(*candidate)))
            .cloned();
        let Some(chosen) = chosen else {
            return Ok(Turn {
                reply: Reply::message(self.policy.fallback_ask()),
                top_k,
                chosen: None,
            });
        };

        let interruption = self
            .policy
            .should_interrupt(&chosen, self.executor.context().peek(session_id));
        let reply = self
            .executor
            .execute_intent(session_id, &chosen.intent_id, interruption)?;
        Ok(Turn {
            reply,
            top_k,
            chosen: Some(chosen),
        })
    }

    /// Loaded procedures in load order, optionally restricted to `domain`.
    pub fn list_intents(&self, domain: Option<&str>) -> Vec<&Intent> {
        let pack = self.executor.script_pack();
        match domain {
            Some(domain) => pack.intents_by_domain(domain),
            None => pack.intents().iter().collect(),
        }
    }

    pub fn rank(&self, text: &str) -> Result<Vec<Candidate>, ChatBrainError> {
        self.nlu.rank(text.trim(), self.top_k)
    }

    pub fn context_state(&self, session_id: &str) -> ContextState {
        self.executor.context().state(session_id)
    }

    pub fn clear_context(&mut self, session_id: &str) {
        self.executor.clear_session(session_id);
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    fn fresh_index(&self) -> NluIndex {
        match &self.embedder {
            Some(embedder) => NluIndex::with_embedder(Arc::clone(embedder)),
            None => NluIndex::new(false),
        }
    }
}
